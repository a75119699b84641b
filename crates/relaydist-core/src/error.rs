//! Error types surfaced by the distribution engine.

use thiserror::Error;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the builder, planner, and applier.
///
/// The four kinds named by the design (io, verification, differ, generic I/O)
/// map onto these variants; differ failures never reach the caller, the
/// builder recovers from them internally and degrades to a full write.
#[derive(Error, Debug)]
pub enum Error {
    /// A resource the engine needed was not available: a missing manifest, an
    /// unreachable reader target, a distribution directory that does not
    /// exist.
    #[error("io error: {0}")]
    Io(String),

    /// A signature check or a post-assembly content hash did not match.
    #[error("verification failed: {0}")]
    Verification(String),

    /// A manifest (or a field within one) could not be parsed.
    #[error("invalid manifest: {0}")]
    InvalidManifest(#[from] serde_json::Error),

    /// An ignore pattern failed to compile.
    #[error("invalid ignore pattern {pattern:?}: {source}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// The underlying regex compile error.
        #[source]
        source: regex::Error,
    },

    /// Underlying host I/O error (file open/read/write/link).
    #[error(transparent)]
    HostIo(#[from] std::io::Error),
}

impl Error {
    /// Build an [`Error::Io`] from a reader or manifest-lookup failure.
    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    /// Build an [`Error::Verification`] from a hash or signature mismatch.
    pub fn verification(msg: impl Into<String>) -> Self {
        Self::Verification(msg.into())
    }
}
