//! Error types shared by the backends, the anonymizer and the harness.

use thiserror::Error;

use crate::backend::BackendId;
use crate::common::Family;

/// Errors returned by this crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("backend `{backend}` is unavailable: {reason}")]
    BackendUnavailable { backend: BackendId, reason: String },

    #[error("unsupported backend: {0:?}")]
    UnsupportedBackend(String),

    #[error("invalid key: expected {expected} bytes, got {actual}")]
    InvalidKey { expected: usize, actual: usize },

    #[error("malformed address {input:?}: {reason}")]
    MalformedAddress { input: String, reason: &'static str },

    #[error("backend `{backend}` does not handle {family} addresses")]
    UnsupportedFamily { backend: BackendId, family: Family },

    /// Only produced by the equivalence harness when reporting findings.
    #[error("backend `{backend}` disagrees on {input}: expected {expected}, got {actual}")]
    EquivalenceMismatch {
        backend: BackendId,
        input: String,
        expected: String,
        actual: String,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub(crate) fn malformed(input: impl ToString, reason: &'static str) -> Self {
        Error::MalformedAddress {
            input: input.to_string(),
            reason,
        }
    }
}
