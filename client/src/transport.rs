use thiserror::Error;

use crate::protocol::Envelope;

/// The transport refused or failed to take the envelope. Framing,
/// reconnection, and retry policy all live behind the trait.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Transport failed to accept outbound envelope")]
pub struct SendError;

/// Outbound seam to the connection layer. The engine only ever hands over
/// fully formed envelopes; everything below that is the transport's
/// business.
pub trait Transport {
    fn send(&mut self, envelope: Envelope) -> Result<(), SendError>;
}
