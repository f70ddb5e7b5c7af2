//! Procedure-call state machine.
//!
//! One call at a time per channel, strictly in order:
//!
//! ```text
//! Idle -> CallStarted -> ArgsSent -> StatusReceived -> Idle
//!                                  \-> Idle (failure status or no results)
//! ```
//!
//! The protocol has no request ids, so interleaving two calls on one channel
//! would be undefined. Using the primitives out of order is a bug in the
//! caller and panics; transport and decoding problems come back as errors.

use tracing::{debug, debug_span, trace};

use dbpipe_protocol::{
    CallStatus, Channel, ProcedureDescriptor, WireLimits, WireValue, decode_value, read_i32,
    write_value,
};

use crate::error::{ClientError, ClientResult};

/// Where the current call stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    /// No call in flight.
    Idle,
    /// Procedure id written, no arguments yet.
    CallStarted {
        procedure: &'static ProcedureDescriptor,
    },
    /// `sent` arguments written.
    ArgsSent {
        procedure: &'static ProcedureDescriptor,
        sent: usize,
    },
    /// Success status read, `received` results decoded so far.
    StatusReceived {
        procedure: &'static ProcedureDescriptor,
        received: usize,
    },
}

impl CallState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

/// Call protocol over one driver channel.
#[derive(Debug)]
pub struct CallProtocol {
    channel: Channel,
    limits: WireLimits,
    state: CallState,
}

impl CallProtocol {
    pub fn new(channel: Channel, limits: WireLimits) -> Self {
        Self {
            channel,
            limits,
            state: CallState::Idle,
        }
    }

    pub fn state(&self) -> CallState {
        self.state
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    pub fn limits(&self) -> &WireLimits {
        &self.limits
    }

    /// Gives the channel back, e.g. to close it.
    pub fn into_channel(self) -> Channel {
        self.channel
    }

    /// Starts a call by writing the procedure id.
    ///
    /// # Panics
    ///
    /// Panics if another call is still in flight.
    pub fn begin_call(&mut self, procedure: &'static ProcedureDescriptor) -> ClientResult<()> {
        assert!(
            self.state.is_idle(),
            "begin_call({}) while {:?}: calls cannot be pipelined",
            procedure.name,
            self.state
        );
        trace!(procedure = procedure.name, id = procedure.id, "begin call");

        self.state = CallState::CallStarted { procedure };
        let sent = self
            .channel
            .send(&procedure.id.to_be_bytes())
            .map_err(ClientError::from);
        self.abort_on_error(sent)
    }

    /// Writes the next argument.
    ///
    /// # Panics
    ///
    /// Panics outside of a call, when every argument was already sent, or
    /// when `value` does not have the shape of the next argument slot.
    pub fn send_arg(&mut self, value: &WireValue) -> ClientResult<()> {
        let (procedure, sent) = match self.state {
            CallState::CallStarted { procedure } => (procedure, 0),
            CallState::ArgsSent { procedure, sent } => (procedure, sent),
            state => panic!("send_arg outside of an open call (state: {state:?})"),
        };
        let Some(slot) = procedure.args.get(sent) else {
            panic!(
                "{}: all {} arguments already sent",
                procedure.name,
                procedure.args.len()
            );
        };
        assert!(
            value.matches(slot),
            "{}: argument {} must be {}, got {}",
            procedure.name,
            sent,
            slot.name(),
            value.kind()
        );

        let written = write_value(value, &mut self.channel).map_err(ClientError::from);
        self.abort_on_error(written)?;
        trace!(procedure = procedure.name, index = sent, "argument sent");
        self.state = CallState::ArgsSent {
            procedure,
            sent: sent + 1,
        };
        Ok(())
    }

    /// Reads the status of the call.
    ///
    /// On failure the call is over and no result bytes are read.
    ///
    /// # Panics
    ///
    /// Panics unless every argument of the procedure has been sent.
    pub fn recv_status(&mut self) -> ClientResult<CallStatus> {
        let (procedure, sent) = match self.state {
            CallState::CallStarted { procedure } => (procedure, 0),
            CallState::ArgsSent { procedure, sent } => (procedure, sent),
            state => panic!("recv_status outside of an open call (state: {state:?})"),
        };
        assert_eq!(
            sent,
            procedure.args.len(),
            "{}: status requested after {} of {} arguments",
            procedure.name,
            sent,
            procedure.args.len()
        );

        let code = read_i32(&mut self.channel).map_err(ClientError::from);
        let code = self.abort_on_error(code)?;
        let status = CallStatus::from_code(code);
        debug!(procedure = procedure.name, code, "status received");

        self.state = match status {
            CallStatus::Success if !procedure.results.is_empty() => CallState::StatusReceived {
                procedure,
                received: 0,
            },
            _ => CallState::Idle,
        };
        Ok(status)
    }

    /// Decodes the next result field.
    ///
    /// # Panics
    ///
    /// Panics unless a success status was read and results remain.
    pub fn recv_result(&mut self) -> ClientResult<WireValue> {
        let CallState::StatusReceived {
            procedure,
            received,
        } = self.state
        else {
            panic!(
                "recv_result without a pending successful status (state: {:?})",
                self.state
            );
        };
        let shape = &procedure.results[received];

        let value = decode_value(shape, &mut self.channel, &self.limits).map_err(ClientError::from);
        let value = self.abort_on_error(value)?;

        let received = received + 1;
        self.state = if received == procedure.results.len() {
            CallState::Idle
        } else {
            CallState::StatusReceived {
                procedure,
                received,
            }
        };
        Ok(value)
    }

    /// Runs one complete call: id, arguments, status, then results on success.
    ///
    /// A failure status becomes [`ClientError::Driver`].
    pub fn call(
        &mut self,
        procedure: &'static ProcedureDescriptor,
        args: &[WireValue],
    ) -> ClientResult<Vec<WireValue>> {
        assert_eq!(
            args.len(),
            procedure.args.len(),
            "{} takes {} arguments",
            procedure.name,
            procedure.args.len()
        );
        let span = debug_span!("call", procedure = procedure.name, id = procedure.id);
        let _entered = span.enter();

        self.begin_call(procedure)?;
        for arg in args {
            self.send_arg(arg)?;
        }
        if let CallStatus::Failure(code) = self.recv_status()? {
            debug!(%code, "driver rejected call");
            return Err(ClientError::Driver {
                procedure: procedure.name,
                code,
            });
        }

        let mut results = Vec::with_capacity(procedure.results.len());
        for _ in procedure.results {
            results.push(self.recv_result()?);
        }
        Ok(results)
    }

    /// Ends the call on error. A partial call leaves the stream misaligned,
    /// so the channel is poisoned unless it is already dead.
    fn abort_on_error<T>(&mut self, result: ClientResult<T>) -> ClientResult<T> {
        if let Err(err) = &result {
            debug!(state = ?self.state, error = %err, "call aborted");
            self.channel.poison(format!("call aborted: {err}"));
            self.state = CallState::Idle;
        }
        result
    }
}
