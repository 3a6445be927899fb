//! Translation between channel requests and engine operations.
//!
//! | Request | Engine call | Response |
//! |---------|-------------|----------|
//! | `Read { len >= 4 }` | `pop` | 4-byte value, or zero bytes when empty |
//! | `Write { 4 bytes }` | `push` | empty; `Full` surfaces as ERANGE |
//! | `Control { CMD_SET_SIZE, 4 bytes }` | `resize` | empty |
//!
//! Anything else is rejected with `InvalidArgument` before reaching the
//! engine.

use std::sync::Arc;

use is_core::{BudgetAllocator, BufferAllocator, StackEngine, StackError};
use is_proto::{decode_value, Request, Response, CMD_SET_SIZE, VALUE_SIZE};
use tracing::trace;

/// The stack as seen through the byte channel.
pub struct StackDevice<A = BudgetAllocator> {
    engine: Arc<StackEngine<A>>,
}

impl<A> Clone for StackDevice<A> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
        }
    }
}

impl<A: BufferAllocator> StackDevice<A> {
    #[must_use]
    pub fn new(engine: Arc<StackEngine<A>>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Arc<StackEngine<A>> {
        &self.engine
    }

    pub fn handle(&self, request: &Request) -> Response {
        let response = match request {
            Request::Read { len } => self.read(*len),
            Request::Write { payload } => self.write(payload),
            Request::Control { cmd, arg } => self.control(*cmd, arg),
        };
        trace!(?request, ?response, "request handled");
        response
    }

    fn read(&self, len: u32) -> Response {
        if (len as usize) < VALUE_SIZE {
            return Response::Failed(StackError::InvalidArgument);
        }
        match self.engine.pop() {
            Some(value) => Response::value(value),
            None => Response::empty(),
        }
    }

    fn write(&self, payload: &[u8]) -> Response {
        let Some(value) = decode_value(payload) else {
            return Response::Failed(StackError::InvalidArgument);
        };
        match self.engine.push(value) {
            Ok(()) => Response::empty(),
            Err(e) => Response::Failed(e),
        }
    }

    fn control(&self, cmd: u32, arg: &[u8]) -> Response {
        if cmd != CMD_SET_SIZE {
            return Response::Failed(StackError::InvalidArgument);
        }
        let Some(capacity) = decode_value(arg) else {
            return Response::Failed(StackError::InvalidArgument);
        };
        match self.engine.resize(capacity) {
            Ok(()) => Response::empty(),
            Err(e) => Response::Failed(e),
        }
    }
}
