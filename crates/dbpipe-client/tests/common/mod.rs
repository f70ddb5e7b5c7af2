//! Mock driver process for integration tests.
//!
//! Runs on its own thread at the far end of a Unix socket, decodes calls with
//! the same catalog the client uses and answers through a handler closure.

#![allow(dead_code)]

use std::os::unix::net::{UnixListener, UnixStream};
use std::path::Path;
use std::thread::{self, JoinHandle};

use dbpipe_protocol::catalog::{self, HANDSHAKE};
use dbpipe_protocol::{
    CallStatus, Channel, FailureCode, ProcedureDescriptor, WireLimits, WireValue, abi_token,
    decode_value, encode_value, read_i32,
};

/// What the mock sends back for one call.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Success status followed by these results.
    Ok(Vec<WireValue>),
    /// Failure status, no results.
    Fail(FailureCode),
    /// Exactly these bytes.
    Raw(Vec<u8>),
    /// Close the connection without answering.
    Hangup,
}

/// One call as the driver saw it.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub procedure: &'static str,
    pub args: Vec<WireValue>,
}

/// Handle to a running mock driver.
pub struct MockDriver {
    thread: JoinHandle<Vec<RecordedCall>>,
}

impl MockDriver {
    /// Waits for the driver to exit and returns every call it served.
    pub fn finish(self) -> Vec<RecordedCall> {
        self.thread.join().expect("mock driver panicked")
    }
}

/// Starts a driver on one end of a socket pair and returns the client end.
pub fn spawn_driver<F>(handler: F) -> (Channel, MockDriver)
where
    F: FnMut(&'static ProcedureDescriptor, &[WireValue]) -> Reply + Send + 'static,
{
    let (client, driver) = UnixStream::pair().expect("socket pair");
    let thread = thread::spawn(move || serve(driver, handler));
    let channel = Channel::from_unix_stream(client).expect("client channel");
    (channel, MockDriver { thread })
}

/// Starts a driver that accepts one connection on `path`.
pub fn listen<F>(path: &Path, handler: F) -> MockDriver
where
    F: FnMut(&'static ProcedureDescriptor, &[WireValue]) -> Reply + Send + 'static,
{
    let listener = UnixListener::bind(path).expect("bind mock driver socket");
    let thread = thread::spawn(move || {
        let (stream, _) = listener.accept().expect("accept");
        serve(stream, handler)
    });
    MockDriver { thread }
}

/// Handler for a driver that only knows `drop_column`.
pub fn drop_column_only(
    mut drop_column: impl FnMut(&str, &str) -> Reply + Send + 'static,
) -> impl FnMut(&'static ProcedureDescriptor, &[WireValue]) -> Reply + Send + 'static {
    move |procedure, args| {
        if procedure.id != catalog::DROP_COLUMN.id {
            return Reply::Fail(FailureCode::NotImplemented);
        }
        let table = string_arg(args, 0);
        let column = string_arg(args, 1);
        drop_column(&table, &column)
    }
}

/// Answers a handshake the way a compatible driver does.
pub fn answer_handshake(name: &str, args: &[WireValue]) -> Reply {
    match args.first() {
        Some(WireValue::Record(token)) if token.as_slice() == abi_token() => {
            Reply::Ok(vec![WireValue::from(name)])
        }
        _ => Reply::Fail(FailureCode::Generic),
    }
}

pub fn string_arg(args: &[WireValue], index: usize) -> String {
    args[index].clone().into_string().expect("string argument")
}

fn serve<F>(stream: UnixStream, mut handler: F) -> Vec<RecordedCall>
where
    F: FnMut(&'static ProcedureDescriptor, &[WireValue]) -> Reply,
{
    let mut channel = Channel::from_unix_stream(stream).expect("driver channel");
    let limits = WireLimits::default();
    let mut calls = Vec::new();

    // Client hung up or sent garbage.
    while let Ok(id) = read_i32(&mut channel) {
        let Some(procedure) = catalog::lookup(id) else {
            break;
        };
        let mut args = Vec::with_capacity(procedure.args.len());
        for shape in procedure.args {
            match decode_value(shape, &mut channel, &limits) {
                Ok(value) => args.push(value),
                Err(_) => return calls,
            }
        }
        calls.push(RecordedCall {
            procedure: procedure.name,
            args: args.clone(),
        });

        let bytes = match handler(procedure, &args) {
            Reply::Ok(results) => {
                let mut bytes = CallStatus::Success.to_be_bytes().to_vec();
                for value in &results {
                    encode_value(value, &mut bytes).expect("encode result");
                }
                bytes
            }
            Reply::Fail(code) => CallStatus::Failure(code).to_be_bytes().to_vec(),
            Reply::Raw(bytes) => bytes,
            Reply::Hangup => break,
        };
        if channel.send(&bytes).is_err() {
            break;
        }
    }
    calls
}

/// Convenience for a driver that accepts the handshake and delegates the rest.
pub fn with_handshake<F>(
    name: &'static str,
    mut handler: F,
) -> impl FnMut(&'static ProcedureDescriptor, &[WireValue]) -> Reply + Send + 'static
where
    F: FnMut(&'static ProcedureDescriptor, &[WireValue]) -> Reply + Send + 'static,
{
    move |procedure, args| {
        if procedure.id == HANDSHAKE.id {
            answer_handshake(name, args)
        } else {
            handler(procedure, args)
        }
    }
}
