//! The binary-diff adapter.

use std::fmt;

/// A binary differ.
///
/// Implementations must satisfy `patch(source, diff(source, target)) ==
/// target` bytewise. Either operation may fail with [`DifferError`] to
/// indicate this particular file pair is not deltifiable; the builder
/// recovers from a `diff` failure by falling back to a full write (the
/// failure never reaches the caller of [`crate::builder::build`]).
pub trait Differ: fmt::Debug + Send + Sync {
    /// Produce a delta transforming `source` into `target`.
    fn diff(&self, source: &[u8], target: &[u8]) -> Result<Vec<u8>, DifferError>;

    /// Apply a delta produced by [`Differ::diff`] to `source`, reproducing
    /// `target`.
    fn patch(&self, source: &[u8], patch: &[u8]) -> Result<Vec<u8>, DifferError>;

    /// The filename suffix delta payloads are stored under for this differ.
    fn extension(&self) -> &str;
}

/// This file pair could not be deltified, or a delta could not be applied.
#[derive(Debug, thiserror::Error)]
#[error("diff not available: {0}")]
pub struct DifferError(pub String);

/// The identity differ: `diff` always fails (so the builder always falls
/// back to a full write) and `patch` is unreachable in practice. This is the
/// engine's default [`Differ`] — it makes every distribution a full-transfer
/// distribution, which is always correct, just not bandwidth-optimal.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityDiffer;

impl Differ for IdentityDiffer {
    fn diff(&self, _source: &[u8], _target: &[u8]) -> Result<Vec<u8>, DifferError> {
        Err(DifferError("identity differ never produces deltas".into()))
    }

    fn patch(&self, _source: &[u8], _patch: &[u8]) -> Result<Vec<u8>, DifferError> {
        Err(DifferError("identity differ never applies deltas".into()))
    }

    fn extension(&self) -> &str {
        ".delta"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_always_fails() {
        let d = IdentityDiffer;
        assert!(d.diff(b"a", b"b").is_err());
        assert!(d.patch(b"a", b"b").is_err());
    }
}
