//! Driver sessions.
//!
//! A session owns the call protocol (and through it the channel) to one
//! driver process, from the handshake until [`DriverSession::close`] or drop.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info, warn};

use dbpipe_protocol::{Channel, ProcedureDescriptor, WireLimits, WireValue};

use crate::call::CallProtocol;
use crate::error::{ClientError, ClientResult};
use crate::procedures;

/// Session settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Decoding limits for driver replies.
    pub limits: WireLimits,
    /// Exchange ABI tokens before the first call.
    pub handshake: bool,
    /// Read timeout applied by connectors that support one. `None` waits
    /// until the driver answers or the connection dies.
    pub read_timeout: Option<Duration>,
    /// Write timeout applied by connectors that support one.
    pub write_timeout: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            limits: WireLimits::default(),
            handshake: true,
            read_timeout: None,
            write_timeout: None,
        }
    }
}

impl SessionConfig {
    /// Sets the decoding limits.
    pub fn with_limits(mut self, limits: WireLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Enables or disables the handshake.
    pub fn with_handshake(mut self, handshake: bool) -> Self {
        self.handshake = handshake;
        self
    }

    /// Sets both I/O timeouts. `None` blocks indefinitely.
    pub fn with_timeouts(mut self, read: Option<Duration>, write: Option<Duration>) -> Self {
        self.read_timeout = read;
        self.write_timeout = write;
        self
    }
}

/// Produces a connected channel to a driver.
///
/// Locating, spawning and supervising driver processes lives behind this
/// trait; a session only needs the resulting byte pipe.
pub trait Connector {
    /// Opens a channel to the driver.
    fn connect(&self, config: &SessionConfig) -> ClientResult<Channel>;

    /// Human-readable target, for logs.
    fn describe(&self) -> String;
}

/// Connects to a driver listening on a Unix domain socket.
#[derive(Debug, Clone)]
pub struct UnixSocketConnector {
    path: PathBuf,
}

impl UnixSocketConnector {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(unix)]
impl Connector for UnixSocketConnector {
    fn connect(&self, config: &SessionConfig) -> ClientResult<Channel> {
        use std::os::unix::net::UnixStream;

        let stream = UnixStream::connect(&self.path).map_err(|e| {
            ClientError::Connection(format!(
                "failed to connect to {}: {}",
                self.path.display(),
                e
            ))
        })?;
        stream
            .set_read_timeout(config.read_timeout)
            .map_err(|e| ClientError::Connection(format!("failed to set read timeout: {e}")))?;
        stream
            .set_write_timeout(config.write_timeout)
            .map_err(|e| ClientError::Connection(format!("failed to set write timeout: {e}")))?;

        debug!(path = %self.path.display(), "connected to driver socket");
        Ok(Channel::from_unix_stream(stream)?)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Database and schema selected with `open_database`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseHandle {
    pub database: String,
    pub schema: String,
}

/// Open connection to one driver.
#[derive(Debug)]
pub struct DriverSession {
    protocol: Option<CallProtocol>,
    target: String,
    driver_name: Option<String>,
    database: Option<DatabaseHandle>,
}

impl DriverSession {
    /// Connects through `connector` and runs the handshake if enabled.
    pub fn open(connector: &impl Connector, config: SessionConfig) -> ClientResult<Self> {
        let channel = connector.connect(&config)?;
        Self::establish(channel, config, connector.describe())
    }

    /// Starts a session over an already-connected channel.
    pub fn open_channel(channel: Channel, config: SessionConfig) -> ClientResult<Self> {
        Self::establish(channel, config, "channel".to_string())
    }

    fn establish(channel: Channel, config: SessionConfig, target: String) -> ClientResult<Self> {
        let mut session = Self {
            protocol: Some(CallProtocol::new(channel, config.limits)),
            target,
            driver_name: None,
            database: None,
        };

        if config.handshake {
            let name = procedures::handshake(&mut session)?;
            session.driver_name = Some(name);
        }

        info!(
            peer = %session.target,
            driver = session.driver_name.as_deref().unwrap_or("unknown"),
            "driver session open"
        );
        Ok(session)
    }

    /// Runs one call on this session.
    pub fn call(
        &mut self,
        procedure: &'static ProcedureDescriptor,
        args: &[WireValue],
    ) -> ClientResult<Vec<WireValue>> {
        let protocol = self.protocol_mut()?;
        let result = protocol.call(procedure, args);
        match &result {
            Err(err) if err.is_connection_error() => warn!(
                peer = %self.target,
                procedure = procedure.name,
                error = %err,
                "driver channel unusable"
            ),
            _ => {}
        }
        result
    }

    /// The call protocol, for callers driving the primitives themselves.
    pub fn protocol_mut(&mut self) -> ClientResult<&mut CallProtocol> {
        self.protocol.as_mut().ok_or(ClientError::SessionClosed)
    }

    /// Closes the channel. Later calls fail with [`ClientError::SessionClosed`].
    ///
    /// Closing an already closed session does nothing.
    pub fn close(&mut self) -> ClientResult<()> {
        let Some(protocol) = self.protocol.take() else {
            return Ok(());
        };
        self.database = None;

        let channel = protocol.into_channel();
        info!(
            peer = %self.target,
            sent = channel.bytes_sent(),
            received = channel.bytes_received(),
            "driver session closed"
        );
        channel.close()?;
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.protocol.is_some()
    }

    /// True while the session is open and its channel has not failed.
    pub fn is_alive(&self) -> bool {
        self.protocol
            .as_ref()
            .is_some_and(|protocol| !protocol.channel().is_dead())
    }

    /// Driver name reported by the handshake.
    pub fn driver_name(&self) -> Option<&str> {
        self.driver_name.as_deref()
    }

    /// Currently open database, if any.
    pub fn database(&self) -> Option<&DatabaseHandle> {
        self.database.as_ref()
    }

    pub(crate) fn set_database(&mut self, database: Option<DatabaseHandle>) {
        self.database = database;
    }
}

impl Drop for DriverSession {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            debug!(error = %e, "error closing driver session on drop");
        }
    }
}
