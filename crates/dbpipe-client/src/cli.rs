//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// dbpipe - talk to a database driver process
#[derive(Debug, Parser)]
#[command(name = "dbpipe")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "DBPIPE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,

    /// Path to the driver socket
    #[arg(long, env = "DBPIPE_SOCKET")]
    pub socket: Option<PathBuf>,

    /// Skip the ABI handshake (for older drivers)
    #[arg(long)]
    pub no_handshake: bool,

    /// Open this database before running the command
    #[arg(long, short)]
    pub database: Option<String>,

    /// Schema used with --database
    #[arg(long, default_value = "")]
    pub schema: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Connect, run the handshake and print the driver name
    Handshake,

    /// List databases known to the driver
    Databases {
        /// Where to look; meaning is driver specific
        #[arg(default_value = "")]
        location: String,
    },

    /// List tables in the open database
    Tables {
        /// Include system tables
        #[arg(long)]
        system: bool,
    },

    /// Count rows in a table
    Rows { table: String },

    /// Drop a column from a table
    DropColumn { table: String, column: String },

    /// Execute a statement that returns no rows
    Exec { sql: String },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}
