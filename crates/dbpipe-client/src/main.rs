//! dbpipe CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use tracing::debug;

use dbpipe_client::cli::{Cli, Command, ConfigAction};
use dbpipe_client::commands::driver::{self, Output};
use dbpipe_client::config::ClientConfig;
use dbpipe_client::error::ClientResult;
use dbpipe_client::procedures;
use dbpipe_client::session::{DriverSession, UnixSocketConnector};
use dbpipe_core::{TracingConfig, TracingOutputFormat, init_tracing};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut tracing_config = TracingConfig::cli(cli.debug);
    if cli.json {
        tracing_config = tracing_config.with_format(TracingOutputFormat::Json);
    }
    if let Err(e) = init_tracing(tracing_config) {
        eprintln!("warning: {}", e);
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> ClientResult<()> {
    let config_path = cli.config.clone().unwrap_or_else(ClientConfig::default_path);
    let config = if cli.config.is_some() {
        ClientConfig::load_from(&config_path)?
    } else {
        ClientConfig::load()?
    };

    if let Command::Config { action } = &cli.command {
        return match action {
            ConfigAction::Dump => dbpipe_client::commands::config::dump(&config, &config_path),
            ConfigAction::Validate => dbpipe_client::commands::config::validate(&config),
            ConfigAction::Path => dbpipe_client::commands::config::path(&config_path),
        };
    }

    config.validate()?;
    let socket = cli.socket.clone().unwrap_or_else(|| config.socket_path());
    let mut session_config = config.session_config();
    if cli.no_handshake {
        session_config = session_config.with_handshake(false);
    }
    debug!(socket = %socket.display(), "connecting to driver");

    let connector = UnixSocketConnector::new(socket);
    let mut session = DriverSession::open(&connector, session_config)?;
    if let Some(database) = &cli.database {
        procedures::open_database(&mut session, database, &cli.schema)?;
    }

    let output = Output::from_json_flag(cli.json);
    let result = match &cli.command {
        Command::Handshake => driver::handshake(&session, output),
        Command::Databases { location } => driver::databases(&mut session, location, output),
        Command::Tables { system } => driver::tables(&mut session, *system, output),
        Command::Rows { table } => driver::rows(&mut session, table, output),
        Command::DropColumn { table, column } => {
            driver::drop_column(&mut session, table, column, output)
        }
        Command::Exec { sql } => driver::exec(&mut session, sql, output),
        Command::Config { .. } => Ok(()),
    };

    let cleanup = if session.database().is_some() && session.is_alive() {
        procedures::close_database(&mut session)
    } else {
        Ok(())
    };
    let closed = session.close();
    result.and(cleanup).and(closed)
}
