//! Error types for mirror synthesis.

use metamirror_core::MirrorError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SynthesisError {
    /// A statement for a mirror (or trigger) failed or raised warnings.
    /// Mirrors committed before it are left in place.
    #[error("synthesis failed for {mirror}: {reason}")]
    SynthesisFailure { mirror: String, reason: String },

    /// The store itself could not be queried.
    #[error("store error: {0:#}")]
    Store(anyhow::Error),

    #[error(transparent)]
    Definition(#[from] MirrorError),
}

impl SynthesisError {
    pub(crate) fn failure(mirror: impl Into<String>, reason: impl Into<String>) -> Self {
        SynthesisError::SynthesisFailure {
            mirror: mirror.into(),
            reason: reason.into(),
        }
    }
}
