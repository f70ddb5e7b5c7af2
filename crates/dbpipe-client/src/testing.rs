//! In-memory driver stand-in for unit tests.

use std::io::{self, Cursor, Read, Write};
use std::sync::{Arc, Mutex};

use dbpipe_protocol::{CallStatus, Channel, ProcedureDescriptor, WireValue, encode_value};

/// Channel peer with pre-recorded replies that captures everything sent to it.
pub struct ScriptedPeer {
    sent: Arc<Mutex<Vec<u8>>>,
    replies: Arc<Mutex<Cursor<Vec<u8>>>>,
}

struct SharedWriter(Arc<Mutex<Vec<u8>>>);

struct SharedReader(Arc<Mutex<Cursor<Vec<u8>>>>);

impl Write for SharedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Read for SharedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.lock().unwrap().read(buf)
    }
}

impl ScriptedPeer {
    /// Returns the peer and a channel whose reads come from `replies`.
    pub fn new(replies: Vec<u8>) -> (Self, Channel) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let replies = Arc::new(Mutex::new(Cursor::new(replies)));
        let channel = Channel::new(SharedReader(replies.clone()), SharedWriter(sent.clone()));
        (Self { sent, replies }, channel)
    }

    /// Everything the client wrote so far.
    pub fn sent(&self) -> Vec<u8> {
        self.sent.lock().unwrap().clone()
    }

    /// Reply bytes the client has not read.
    pub fn unread(&self) -> Vec<u8> {
        let replies = self.replies.lock().unwrap();
        let pos = replies.position() as usize;
        replies.get_ref()[pos..].to_vec()
    }
}

/// Bytes a client writes for one call.
pub fn request(procedure: &ProcedureDescriptor, args: &[WireValue]) -> Vec<u8> {
    let mut buf = procedure.id.to_be_bytes().to_vec();
    for arg in args {
        encode_value(arg, &mut buf).unwrap();
    }
    buf
}

/// Bytes a driver writes to answer one call.
pub fn reply(status: CallStatus, results: &[WireValue]) -> Vec<u8> {
    let mut buf = status.to_be_bytes().to_vec();
    for value in results {
        encode_value(value, &mut buf).unwrap();
    }
    buf
}
