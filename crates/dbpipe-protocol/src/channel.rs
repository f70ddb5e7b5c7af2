//! Byte channel to one driver process.
//!
//! A [`Channel`] owns the two halves of the connection (what we read from
//! the driver and what we write to it) and moves raw bytes between them.
//! It never looks at payload content.
//!
//! The first I/O failure kills the channel. From then on every operation
//! returns `Disconnected` without touching the handles, so a dead driver
//! is reported immediately instead of hanging a later call.

use std::fmt;
use std::io::{self, Read, Write};
use std::process::Child;

use tracing::{trace, warn};

use crate::error::ChannelError;

/// Bidirectional byte pipe to a driver process.
pub struct Channel {
    recv: Box<dyn Read + Send>,
    send: Box<dyn Write + Send>,
    dead: Option<ChannelError>,
    bytes_sent: u64,
    bytes_received: u64,
}

impl Channel {
    /// Creates a channel from an already-open receive/send pair.
    ///
    /// Both handles must lead to the same peer.
    pub fn new<R, W>(recv: R, send: W) -> Self
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        Self {
            recv: Box::new(recv),
            send: Box::new(send),
            dead: None,
            bytes_sent: 0,
            bytes_received: 0,
        }
    }

    /// Creates a channel over a connected Unix socket.
    #[cfg(unix)]
    pub fn from_unix_stream(stream: std::os::unix::net::UnixStream) -> Result<Self, ChannelError> {
        let recv = stream
            .try_clone()
            .map_err(|e| ChannelError::disconnected(format!("failed to clone socket: {e}")))?;
        Ok(Self::new(recv, stream))
    }

    /// Creates a channel over a child's piped stdout (receive) and stdin (send).
    ///
    /// The child must have been spawned with both streams piped; they are
    /// taken out of `child`, which keeps ownership of the process itself.
    pub fn from_child(child: &mut Child) -> Result<Self, ChannelError> {
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ChannelError::disconnected("driver stdout is not piped"))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ChannelError::disconnected("driver stdin is not piped"))?;
        Ok(Self::new(stdout, stdin))
    }

    /// Writes all of `bytes` and flushes.
    pub fn send(&mut self, bytes: &[u8]) -> Result<(), ChannelError> {
        self.ensure_alive()?;
        if bytes.is_empty() {
            return Ok(());
        }

        let result = self
            .send
            .write_all(bytes)
            .and_then(|()| self.send.flush());
        match result {
            Ok(()) => {
                self.bytes_sent += bytes.len() as u64;
                trace!(len = bytes.len(), "sent");
                Ok(())
            }
            Err(e) => Err(self.fail("send", e)),
        }
    }

    /// Reads exactly `n` bytes, or fewer if the peer closed the stream first.
    ///
    /// The buffer grows with the data actually received, so a large `n` does
    /// not allocate up front. `n == 0` performs no I/O.
    pub fn recv(&mut self, n: usize) -> Result<Vec<u8>, ChannelError> {
        self.ensure_alive()?;
        if n == 0 {
            return Ok(Vec::new());
        }

        let mut buf = Vec::new();
        match self.recv.by_ref().take(n as u64).read_to_end(&mut buf) {
            Ok(received) => {
                self.bytes_received += received as u64;
                trace!(requested = n, received, "received");
                Ok(buf)
            }
            Err(e) => Err(self.fail("recv", e)),
        }
    }

    /// Fills `buf` from the stream, returning how many bytes arrived.
    ///
    /// Less than `buf.len()` means the peer closed the stream.
    pub fn recv_exact_into(&mut self, buf: &mut [u8]) -> Result<usize, ChannelError> {
        self.ensure_alive()?;
        let mut filled = 0;
        while filled < buf.len() {
            match self.recv.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(read) => filled += read,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(self.fail("recv", e)),
            }
        }
        self.bytes_received += filled as u64;
        Ok(filled)
    }

    /// Marks the channel dead after the byte stream lost its alignment.
    pub fn poison(&mut self, reason: impl Into<String>) {
        if self.dead.is_none() {
            let err = ChannelError::disconnected(reason);
            warn!(error = %err, "channel poisoned");
            self.dead = Some(err);
        }
    }

    /// Returns true once an I/O failure or [`poison`](Self::poison) killed the channel.
    pub fn is_dead(&self) -> bool {
        self.dead.is_some()
    }

    /// Returns the error that killed the channel, if any.
    pub fn error(&self) -> Option<&ChannelError> {
        self.dead.as_ref()
    }

    /// Total bytes written to the driver.
    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    /// Total bytes read from the driver.
    pub fn bytes_received(&self) -> u64 {
        self.bytes_received
    }

    /// Flushes pending output and releases both handles.
    pub fn close(mut self) -> Result<(), ChannelError> {
        if self.dead.is_none() {
            self.send
                .flush()
                .map_err(|e| ChannelError::disconnected(format!("flush on close: {e}")))?;
        }
        trace!(
            sent = self.bytes_sent,
            received = self.bytes_received,
            "channel closed"
        );
        Ok(())
    }

    fn ensure_alive(&self) -> Result<(), ChannelError> {
        match &self.dead {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn fail(&mut self, operation: &'static str, err: io::Error) -> ChannelError {
        warn!(operation, error = %err, "driver channel failed");
        match err.kind() {
            // Later operations see a dead channel, not a timeout of their own.
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => {
                self.dead = Some(ChannelError::disconnected(format!(
                    "{operation} timed out"
                )));
                ChannelError::TimedOut { operation }
            }
            _ => {
                let failure = ChannelError::disconnected(format!("{operation}: {err}"));
                self.dead = Some(failure.clone());
                failure
            }
        }
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("dead", &self.dead)
            .field("bytes_sent", &self.bytes_sent)
            .field("bytes_received", &self.bytes_received)
            .finish_non_exhaustive()
    }
}
