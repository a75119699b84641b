//! A [`relaydist_core::adapters::Compressor`] backed by raw DEFLATE
//! (`flate2`), grounded in the same `flate2::write::DeflateEncoder` /
//! `flate2::read::DeflateDecoder` pairing `blte::compress` and
//! `ngdp_patch::zbsdiff` already use for their own block compression.

use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use relaydist_core::adapters::{CompressError, Compressor};
use tracing::trace;

/// Compression level, 0 (none) through 9 (best), mirroring the range
/// `blte::compress::compress_zlib` accepts.
#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("invalid DEFLATE compression level {0} (expected 0-9)")]
pub struct InvalidLevel(pub u8);

/// A [`Compressor`] that stores full payloads and deltas DEFLATE-compressed,
/// under the `.z` extension.
#[derive(Debug, Clone, Copy)]
pub struct DeflateCompressor {
    level: Compression,
}

impl DeflateCompressor {
    /// Build a compressor at the given level (0-9).
    pub fn new(level: u8) -> Result<Self, InvalidLevel> {
        if level > 9 {
            return Err(InvalidLevel(level));
        }
        Ok(Self {
            level: Compression::new(u32::from(level)),
        })
    }

    /// Build a compressor at `flate2`'s default level.
    #[must_use]
    pub fn default_level() -> Self {
        Self {
            level: Compression::default(),
        }
    }
}

impl Default for DeflateCompressor {
    fn default() -> Self {
        Self::default_level()
    }
}

impl Compressor for DeflateCompressor {
    fn compress(&self, contents: &[u8]) -> Vec<u8> {
        let mut encoder = DeflateEncoder::new(Vec::with_capacity(contents.len()), self.level);
        // In-memory Vec writers never fail; an I/O error here would mean an
        // allocation failure, which we let unwind like any other OOM.
        encoder
            .write_all(contents)
            .expect("compressing into an in-memory buffer cannot fail");
        let out = encoder.finish().expect("finishing an in-memory encoder cannot fail");
        trace!(input = contents.len(), output = out.len(), "deflate compressed");
        out
    }

    fn decompress(&self, contents: &[u8]) -> Result<Vec<u8>, CompressError> {
        let mut decoder = DeflateDecoder::new(contents);
        let mut out = Vec::new();
        decoder
            .read_to_end(&mut out)
            .map_err(|e| CompressError(e.to_string()))?;
        Ok(out)
    }

    fn compressed_extension(&self) -> &str {
        ".z"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn round_trips_empty_input() {
        let c = DeflateCompressor::default();
        assert_eq!(c.decompress(&c.compress(b"")).unwrap(), b"");
    }

    #[test]
    fn extension_is_dot_z() {
        assert_eq!(DeflateCompressor::default().compressed_extension(), ".z");
    }

    #[test]
    fn rejects_out_of_range_level() {
        assert!(DeflateCompressor::new(10).is_err());
    }

    proptest! {
        #[test]
        fn round_trips_arbitrary_bytes(data in proptest::collection::vec(any::<u8>(), 0..4096)) {
            let c = DeflateCompressor::default();
            prop_assert_eq!(c.decompress(&c.compress(&data)).unwrap(), data);
        }
    }
}
