//! Client side of the dbpipe driver protocol.
//!
//! - [`call`]: the one-call-at-a-time state machine over a channel
//! - [`session`]: connecting to a driver and owning its channel
//! - [`procedures`]: typed wrappers for every catalog procedure
//! - [`config`], [`cli`], [`commands`]: the `dbpipe` command-line tool
//!
//! ```no_run
//! use dbpipe_client::procedures;
//! use dbpipe_client::session::{DriverSession, SessionConfig, UnixSocketConnector};
//!
//! # fn main() -> dbpipe_client::ClientResult<()> {
//! let connector = UnixSocketConnector::new("/run/user/1000/dbpipe.sock");
//! let mut session = DriverSession::open(&connector, SessionConfig::default())?;
//! procedures::open_database(&mut session, "hr", "public")?;
//! procedures::drop_column(&mut session, "employees", "salary")?;
//! session.close()?;
//! # Ok(())
//! # }
//! ```

pub mod call;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod procedures;
pub mod session;

#[cfg(test)]
mod testing;

pub use call::{CallProtocol, CallState};
pub use cli::Cli;
pub use error::{ClientError, ClientResult};
pub use session::{Connector, DatabaseHandle, DriverSession, SessionConfig, UnixSocketConnector};
