//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/dbpipe/config.toml` by default. Every field has a default, so
//! a missing file or a partial one is fine.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use dbpipe_protocol::WireLimits;
use dbpipe_protocol::wire::{DEFAULT_MAX_FIELD_LEN, DEFAULT_MAX_SEQUENCE_LEN};

use crate::error::{ClientError, ClientResult};
use crate::session::SessionConfig;

/// Socket file name used when none is configured.
pub const DEFAULT_SOCKET_NAME: &str = "dbpipe.sock";

/// Configuration for the dbpipe client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Debug mode.
    pub debug: bool,

    /// Driver connection settings.
    pub connection: ConnectionSettings,

    /// Decoding limits for driver replies.
    pub limits: LimitSettings,

    /// Session settings.
    pub session: SessionSettings,
}

/// Driver connection settings. Timeouts are off unless configured.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionSettings {
    /// Path to the driver socket.
    pub socket_path: Option<PathBuf>,

    /// Read timeout in seconds; 0 waits forever.
    pub read_timeout: u64,

    /// Write timeout in seconds; 0 waits forever.
    pub write_timeout: u64,
}

/// Limits on what a driver may send.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitSettings {
    /// Largest string or record accepted, in bytes.
    pub max_field_len: u32,

    /// Largest sequence accepted, in elements.
    pub max_sequence_len: u32,
}

impl Default for LimitSettings {
    fn default() -> Self {
        Self {
            max_field_len: DEFAULT_MAX_FIELD_LEN,
            max_sequence_len: DEFAULT_MAX_SEQUENCE_LEN,
        }
    }
}

/// Session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Exchange ABI tokens on connect. Disable for drivers that predate it.
    pub handshake: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self { handshake: true }
    }
}

impl ClientConfig {
    /// Loads configuration from the default path.
    pub fn load() -> ClientResult<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> ClientResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ClientError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str(&content)
            .map_err(|e| ClientError::Config(format!("failed to parse {}: {}", path.display(), e)))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("dbpipe")
    }

    /// Configured socket path, or the default one.
    pub fn socket_path(&self) -> PathBuf {
        self.connection
            .socket_path
            .clone()
            .unwrap_or_else(default_socket_path)
    }

    /// Checks values that parse but cannot work.
    pub fn validate(&self) -> ClientResult<()> {
        if self.limits.max_field_len == 0 {
            return Err(ClientError::Config(
                "limits.max_field_len must be greater than 0".to_string(),
            ));
        }
        if self.limits.max_sequence_len == 0 {
            return Err(ClientError::Config(
                "limits.max_sequence_len must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Session settings derived from this configuration.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::default()
            .with_limits(WireLimits {
                max_field_len: self.limits.max_field_len,
                max_sequence_len: self.limits.max_sequence_len,
            })
            .with_handshake(self.session.handshake)
            .with_timeouts(
                timeout(self.connection.read_timeout),
                timeout(self.connection.write_timeout),
            )
    }
}

fn timeout(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

/// Default driver socket: `$XDG_RUNTIME_DIR/dbpipe.sock`, else the temp dir.
pub fn default_socket_path() -> PathBuf {
    dirs::runtime_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(DEFAULT_SOCKET_NAME)
}
