//! Wire protocol shared by dbpipe clients and database driver processes.
//!
//! A driver is a separate process implementing database operations for one
//! storage back end. The client talks to it over a private byte stream using
//! a fixed, synchronous procedure-call protocol:
//!
//! - the client writes a procedure id followed by the arguments;
//! - the driver answers with a status code and, only on success, the results.
//!
//! This crate holds the pieces both ends agree on:
//!
//! - [`wire`]: encoding of the primitive field types
//! - [`channel`]: the blocking byte pipe to one driver
//! - [`status`]: call status codes
//! - [`catalog`]: procedure ids and their argument/result shapes
//!
//! # Example
//!
//! ```rust
//! use std::io::Cursor;
//! use dbpipe_protocol::{Channel, WireLimits, WireType, WireValue, decode_value, encode_value};
//!
//! let mut bytes = Vec::new();
//! encode_value(&WireValue::from("employees"), &mut bytes).unwrap();
//!
//! let mut channel = Channel::new(Cursor::new(bytes), std::io::sink());
//! let value = decode_value(&WireType::String, &mut channel, &WireLimits::default()).unwrap();
//! assert_eq!(value, WireValue::from("employees"));
//! ```

pub mod catalog;
pub mod channel;
mod error;
pub mod status;
pub mod wire;

pub use catalog::{ABI_TOKEN_LEN, PROTOCOL_VERSION, ProcedureDescriptor, abi_token};
pub use channel::Channel;
pub use error::{ChannelError, ProtocolError, WireError, WireResult};
pub use status::{CallStatus, FailureCode, STATUS_OK};
pub use wire::{
    WireLimits, WireType, WireValue, decode_value, encode_value, encoded_len, read_i32,
    write_value,
};
