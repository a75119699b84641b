//! The manifest: a signed, compressed index of one distribution's files.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::adapters::{Compressor, Signer};
use crate::error::{Error, Result};

/// A delta record: a file entry's pointer back to the prior version it was
/// diffed against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeltaRecord {
    /// The distribution version in which this delta was produced.
    pub version: String,
    /// Compressed size of the delta payload, in bytes.
    pub size: u64,
    /// Hash of the file this delta was computed against.
    pub old_hash: String,
    /// The version that `old_hash` itself recorded as its own `delta.version`,
    /// or `None` if that predecessor stored the file in full.
    pub old_version: Option<String>,
}

/// One file's entry in a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Hex lowercase SHA-256 of the uncompressed file contents.
    pub hash: String,
    /// Byte length of the compressed full payload as stored at the
    /// distribution.
    pub dlsize: u64,
    /// The delta this entry was produced from, if any. Always serialized
    /// (as `null` when absent) — unlike `mode`, which is omitted entirely
    /// when unavailable.
    #[serde(default)]
    pub delta: Option<DeltaRecord>,
    /// POSIX permission bits of the source file, if the host could provide
    /// them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<u32>,
}

impl FileEntry {
    /// An entry carrying only a hash, as produced by
    /// [`crate::engine::Engine::create_client_manifest`] — a client manifest
    /// never records `dlsize`/`delta`/`mode`, only what it has on disk now.
    #[must_use]
    pub fn hash_only(hash: String) -> Self {
        Self {
            hash,
            dlsize: 0,
            delta: None,
            mode: None,
        }
    }
}

/// A versioned index of a distribution's files, keyed by portable path.
///
/// Serializes to canonical JSON: sorted keys (via `BTreeMap`), 4-space
/// indent, trailing newline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// The version this manifest describes.
    pub version: String,
    /// Files in this distribution, keyed by portable relative path.
    pub files: BTreeMap<String, FileEntry>,
}

impl Manifest {
    /// An empty manifest for `version`.
    #[must_use]
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            files: BTreeMap::new(),
        }
    }

    /// Serialize to the canonical JSON form: sorted keys, 4-space indent,
    /// trailing newline.
    pub fn to_canonical_json(&self) -> Result<Vec<u8>> {
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut buf = Vec::new();
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        serde::Serialize::serialize(self, &mut serializer)?;
        buf.push(b'\n');
        Ok(buf)
    }

    /// Parse the canonical JSON form.
    pub fn from_canonical_json(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Sign and compress this manifest for on-disk storage
    /// (`decompress -> verify -> parse` is the inverse, see
    /// [`Manifest::read`]).
    pub fn write(&self, compressor: &dyn Compressor, signer: &dyn Signer) -> Result<Vec<u8>> {
        let json = self.to_canonical_json()?;
        let signed = signer
            .sign(&json)
            .map_err(|e| Error::verification(e.to_string()))?;
        Ok(compressor.compress(&signed))
    }

    /// Inverse of [`Manifest::write`]: decompress, verify the signature, then
    /// parse.
    pub fn read(bytes: &[u8], compressor: &dyn Compressor, signer: &dyn Signer) -> Result<Self> {
        let decompressed = compressor
            .decompress(bytes)
            .map_err(|e| Error::io(e.to_string()))?;
        let verified = signer
            .verify(&decompressed)
            .map_err(|e| Error::verification(e.to_string()))?;
        Self::from_canonical_json(&verified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{IdentityCompressor, IdentitySigner};

    #[test]
    fn round_trips_bytewise() {
        let mut manifest = Manifest::new("1");
        manifest.files.insert(
            "a".to_string(),
            FileEntry {
                hash: "h".repeat(64),
                dlsize: 500,
                delta: None,
                mode: Some(0o644),
            },
        );
        let bytes = manifest.write(&IdentityCompressor, &IdentitySigner).unwrap();
        let parsed = Manifest::read(&bytes, &IdentityCompressor, &IdentitySigner).unwrap();
        assert_eq!(manifest, parsed);
    }

    #[test]
    fn empty_manifest_json_shape() {
        let manifest = Manifest::new("1");
        let json = manifest.to_canonical_json().unwrap();
        let text = String::from_utf8(json).unwrap();
        assert!(text.ends_with('\n'));
        let reparsed: Manifest = serde_json::from_str(&text).unwrap();
        assert_eq!(reparsed.version, "1");
        assert!(reparsed.files.is_empty());
    }
}
