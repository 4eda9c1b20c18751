//! The typed error taxonomy carried at every fallible library boundary.
//!
//! Three categories, matching the spec's error-handling design: a bad call
//! (`PreconditionViolation`), parameters that can never produce a usable
//! kernel (`NumericOutOfRange`), and a broken worker channel
//! (`TransportError`). None of these are retried internally — see
//! `orchestrator.rs` for how a `TransportError` cancels the rest of a run.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConstantQError {
    #[error("precondition violated: {0}")]
    PreconditionViolation(String),

    #[error("numeric parameters out of range: {0}")]
    NumericOutOfRange(String),

    #[error("worker transport failed: {0}")]
    TransportError(String),
}

pub type Result<T> = std::result::Result<T, ConstantQError>;
