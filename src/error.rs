//! Validation errors.
//!
//! Network outcomes (refused, unreachable, timeout, ...) are not errors here;
//! they are reported as a [`ProbeStatus`](crate::types::ProbeStatus) inside a result.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    #[error("Host is required")]
    EmptyHost,

    #[error("Invalid host: {0}")]
    InvalidHost(String),

    #[error("Invalid port {0}: must be between 1-65535")]
    InvalidPort(i64),

    #[error("Timeout must be a positive number of milliseconds")]
    InvalidTimeout,

    #[error("Maximum {max} ports can be tested at once (got {requested})")]
    BatchTooLarge { requested: usize, max: usize },
}
