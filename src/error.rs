//! Error taxonomy for IDKIT sessions
//!
//! The variation engine and the latent store never swallow errors; they
//! bubble up to the session controller, which decides whether a failure ends
//! the round, ends the session, or can be retried.

use crate::generative::DecodeError;

/// Errors surfaced by IDKIT operations
#[derive(Debug, thiserror::Error)]
pub enum IdkitError {
    /// Bad configuration or model unavailable at start; the session cannot start
    #[error("initialization failed: {0}")]
    Initialization(String),

    /// Generative model boundary failure, after bounded retries
    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("history out of order: expected round {expected}, got {got}")]
    OrderViolation { expected: u32, got: u32 },

    #[error("at least one candidate must be selected to advance")]
    EmptySelection,

    #[error("finalization requires exactly one selected candidate, got {0}")]
    AmbiguousFinalization(usize),

    /// Operation not allowed in the session's current state
    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("candidate {0} is not part of the current population")]
    UnknownCandidate(String),

    #[error("persistence error: {0}")]
    Persistence(String),
}

impl From<std::io::Error> for IdkitError {
    fn from(err: std::io::Error) -> Self {
        IdkitError::Persistence(err.to_string())
    }
}

impl From<serde_json::Error> for IdkitError {
    fn from(err: serde_json::Error) -> Self {
        IdkitError::Persistence(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, IdkitError>;
