/// Failures of the serial or MIDI handles the bridge is bound to.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("transport closed")]
    Closed,
    #[error("i/o error : {0}")]
    Io(#[from] std::io::Error),
    #[error("midi error : {0}")]
    Midi(String),
}

impl TransportError {
    /// Whether the handle is gone for good, as opposed to a single failed operation.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}
