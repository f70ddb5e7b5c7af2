//! Shared runtime plumbing for the dbpipe crates.
//!
//! The protocol and client libraries only emit `tracing` events; binaries
//! install a subscriber once at startup through [`init_tracing`].

pub mod tracing;

pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
