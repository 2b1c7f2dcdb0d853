use std::cell::RefCell;
use std::rc::Rc;

use replica_client::{Envelope, SendError, Transport};

/// Transport double that records every envelope it is handed. The `sent`
/// handle stays valid after the transport is boxed into a room.
#[derive(Clone, Default)]
pub struct TestTransport {
    sent: Rc<RefCell<Vec<Envelope>>>,
}

impl TestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Envelope> {
        self.sent.borrow().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.borrow().len()
    }
}

impl Transport for TestTransport {
    fn send(&mut self, envelope: Envelope) -> Result<(), SendError> {
        self.sent.borrow_mut().push(envelope);
        Ok(())
    }
}
