//! The compression adapter.

use std::fmt;

/// A file compression codec.
///
/// The core never assumes compressed output is smaller than input; callers
/// that build distributions compare sizes explicitly before deciding whether
/// to keep a delta (see `builder::build`).
pub trait Compressor: fmt::Debug + Send + Sync {
    /// Compress `contents`.
    fn compress(&self, contents: &[u8]) -> Vec<u8>;

    /// Decompress `contents`. Fails if `contents` is not valid output of
    /// [`Compressor::compress`] for this codec.
    fn decompress(&self, contents: &[u8]) -> Result<Vec<u8>, CompressError>;

    /// The filename suffix this codec's output is stored under (may be
    /// empty for an identity codec).
    fn compressed_extension(&self) -> &str;
}

/// Decompression failure from a concrete [`Compressor`].
#[derive(Debug, thiserror::Error)]
#[error("decompression failed: {0}")]
pub struct CompressError(pub String);

/// The identity codec: `compress`/`decompress` are no-ops, and the extension
/// is empty. This is the engine's default [`Compressor`].
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityCompressor;

impl Compressor for IdentityCompressor {
    fn compress(&self, contents: &[u8]) -> Vec<u8> {
        contents.to_vec()
    }

    fn decompress(&self, contents: &[u8]) -> Result<Vec<u8>, CompressError> {
        Ok(contents.to_vec())
    }

    fn compressed_extension(&self) -> &str {
        ""
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_round_trips() {
        let c = IdentityCompressor;
        let data = b"hello world";
        assert_eq!(c.decompress(&c.compress(data)).unwrap(), data);
        assert_eq!(c.compressed_extension(), "");
    }
}
