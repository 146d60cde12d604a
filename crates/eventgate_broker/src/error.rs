use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BrokerError {
    /// The coordinator task has stopped; nothing can be registered or published.
    #[error("broker is closed")]
    Closed,
}
