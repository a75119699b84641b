//! The patch planner: a client manifest and a target version in, a minimal
//! update plan out.

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, trace};

use crate::adapters::{Compressor, Reader, Signer};
use crate::error::{Error, Result};
use crate::manifest::Manifest;

/// A computed update plan: which names to delete, which to download in
/// full, and which to reconstruct via a chain of deltas, plus the total
/// bytes the plan will transfer.
#[derive(Debug, Clone)]
pub struct PatchPlan {
    /// Names present on the client but absent from the target.
    pub delete: Vec<String>,
    /// Names to fetch in full (new, or too expensive to patch).
    pub download: Vec<String>,
    /// Names to reconstruct via a delta chain, oldest patch first.
    pub patch: Vec<(String, Vec<String>)>,
    /// Total bytes this plan will transfer (sum of full downloads and delta
    /// chain sizes).
    pub size: u64,
    /// The target manifest, to be used by the applier for final
    /// verification.
    pub manifest: Manifest,
}

/// Compute the plan to bring `client_manifest` up to `target_version`.
///
/// Returns `Ok(None)` if the client is already at `target_version`. Fetching
/// the target manifest itself is fatal on failure; failing to load an
/// intermediate manifest while walking a delta chain only aborts that one
/// chain, falling back to a full download for that name.
pub fn plan(
    client_manifest: &Manifest,
    target_version: &str,
    reader: &dyn Reader,
    compressor: &dyn Compressor,
    signer: &dyn Signer,
) -> Result<Option<PatchPlan>> {
    if client_manifest.version == target_version {
        return Ok(None);
    }

    let mut cache: HashMap<String, Manifest> = HashMap::new();
    let target_manifest = load_manifest(reader, compressor, signer, &mut cache, target_version)
        .ok_or_else(|| Error::io(format!("target manifest {target_version} unavailable")))?;

    let client_names: BTreeSet<&String> = client_manifest.files.keys().collect();
    let target_names: BTreeSet<&String> = target_manifest.files.keys().collect();

    let delete: Vec<String> = client_names
        .difference(&target_names)
        .map(|s| (*s).clone())
        .collect();
    let download_initial: Vec<String> = target_names
        .difference(&client_names)
        .map(|s| (*s).clone())
        .collect();
    let common: Vec<String> = client_names
        .intersection(&target_names)
        .map(|s| (*s).clone())
        .collect();

    let mut size: u64 = download_initial
        .iter()
        .map(|n| target_manifest.files[n].dlsize)
        .sum();
    let mut download = download_initial;
    let mut patch = Vec::new();

    for name in common {
        let client_entry = &client_manifest.files[&name];
        let target_entry = &target_manifest.files[&name];
        if client_entry.hash == target_entry.hash {
            continue;
        }

        match build_chain(
            &name,
            client_entry.hash.as_str(),
            target_entry.dlsize,
            target_entry.delta.as_ref(),
            reader,
            compressor,
            signer,
            &mut cache,
        ) {
            Some((chain, chain_size)) => {
                trace!(name, chain_len = chain.len(), "delta chain found");
                size += chain_size;
                patch.push((name, chain));
            }
            None => {
                trace!(name, "no usable delta chain, falling back to download");
                size += target_entry.dlsize;
                download.push(name);
            }
        }
    }

    debug!(
        target_version,
        delete = delete.len(),
        download = download.len(),
        patch = patch.len(),
        size,
        "computed patch plan"
    );

    Ok(Some(PatchPlan {
        delete,
        download,
        patch,
        size,
        manifest: target_manifest,
    }))
}

/// Walk backward from the target's delta record to one whose `old_hash`
/// equals the client's current hash, collecting a contiguous,
/// oldest-first chain. Returns `None` if the search aborts for any reason
/// (no delta at all, a missing intermediate manifest, a missing entry or
/// delta within it, or the chain growing at least as large as a full
/// download).
#[allow(clippy::too_many_arguments)]
fn build_chain(
    name: &str,
    client_hash: &str,
    target_dlsize: u64,
    target_delta: Option<&crate::manifest::DeltaRecord>,
    reader: &dyn Reader,
    compressor: &dyn Compressor,
    signer: &dyn Signer,
    cache: &mut HashMap<String, Manifest>,
) -> Option<(Vec<String>, u64)> {
    let mut delta = target_delta?.clone();
    let mut chain = vec![delta.version.clone()];
    let mut chain_size = delta.size;

    while delta.old_hash != client_hash {
        let old_version = delta.old_version.as_ref()?;
        let old_manifest = load_manifest(reader, compressor, signer, cache, old_version)?;
        let entry = old_manifest.files.get(name)?;
        delta = entry.delta.clone()?;
        chain.insert(0, delta.version.clone());
        chain_size += delta.size;

        if chain_size >= target_dlsize {
            return None;
        }
    }

    Some((chain, chain_size))
}

/// Fetch, decompress, verify, and parse the manifest for `version`, caching
/// the result for the lifetime of one planning call.
fn load_manifest(
    reader: &dyn Reader,
    compressor: &dyn Compressor,
    signer: &dyn Signer,
    cache: &mut HashMap<String, Manifest>,
    version: &str,
) -> Option<Manifest> {
    if let Some(m) = cache.get(version) {
        return Some(m.clone());
    }
    let name = format!("manifest{}", compressor.compressed_extension());
    let bytes = reader.get(version, &name).ok()?;
    let manifest = Manifest::read(&bytes, compressor, signer).ok()?;
    cache.insert(version.to_string(), manifest.clone());
    Some(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{IdentityCompressor, IdentitySigner, Reader, ReaderError};
    use crate::manifest::{DeltaRecord, FileEntry};
    use std::collections::BTreeMap as Map;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct MapReader(Mutex<Map<(String, String), Vec<u8>>>);

    impl MapReader {
        fn put(&self, version: &str, name: &str, bytes: Vec<u8>) {
            self.0
                .lock()
                .unwrap()
                .insert((version.to_string(), name.to_string()), bytes);
        }
    }

    impl Reader for MapReader {
        fn get(&self, version: &str, name: &str) -> std::result::Result<Vec<u8>, ReaderError> {
            self.0
                .lock()
                .unwrap()
                .get(&(version.to_string(), name.to_string()))
                .cloned()
                .ok_or_else(|| ReaderError("not found".into()))
        }
    }

    fn put_manifest(reader: &MapReader, manifest: &Manifest) {
        let bytes = manifest.write(&IdentityCompressor, &IdentitySigner).unwrap();
        reader.put(&manifest.version, "manifest", bytes);
    }

    #[test]
    fn same_version_yields_no_plan() {
        let manifest = Manifest::new("1");
        let reader = MapReader::default();
        let result = plan(&manifest, "1", &reader, &IdentityCompressor, &IdentitySigner).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn three_way_partition_and_chain() {
        let reader = MapReader::default();

        // v1: a (base), c (base)
        let mut v1 = Manifest::new("1");
        v1.files.insert("a".into(), FileEntry::hash_only("ha".into()));
        v1.files.insert(
            "c".into(),
            FileEntry {
                hash: "hc1".into(),
                dlsize: 1000,
                delta: None,
                mode: None,
            },
        );
        put_manifest(&reader, &v1);

        // v2: a unchanged, b new, c deltified against v1, d removed-from-client only
        let mut v2 = Manifest::new("2");
        v2.files.insert("a".into(), FileEntry::hash_only("ha".into()));
        v2.files.insert(
            "b".into(),
            FileEntry {
                hash: "hb".into(),
                dlsize: 50,
                delta: None,
                mode: None,
            },
        );
        v2.files.insert(
            "c".into(),
            FileEntry {
                hash: "hc2".into(),
                dlsize: 1000,
                delta: Some(DeltaRecord {
                    version: "2".into(),
                    size: 10,
                    old_hash: "hc1".into(),
                    old_version: None,
                }),
                mode: None,
            },
        );
        put_manifest(&reader, &v2);

        let mut client = Manifest::new("1");
        client.files.insert("a".into(), FileEntry::hash_only("ha".into()));
        client.files.insert("c".into(), FileEntry::hash_only("hc1".into()));
        client
            .files
            .insert("d".into(), FileEntry::hash_only("hd".into()));

        let result = plan(&client, "2", &reader, &IdentityCompressor, &IdentitySigner)
            .unwrap()
            .unwrap();

        assert_eq!(result.delete, vec!["d".to_string()]);
        assert_eq!(result.download, vec!["b".to_string()]);
        assert_eq!(result.patch, vec![("c".to_string(), vec!["2".to_string()])]);
        assert_eq!(result.size, 50 + 10);
    }

    #[test]
    fn missing_intermediate_manifest_falls_back_to_download() {
        let reader = MapReader::default();

        let mut v3 = Manifest::new("3");
        v3.files.insert(
            "c".into(),
            FileEntry {
                hash: "hc3".into(),
                dlsize: 1000,
                delta: Some(DeltaRecord {
                    version: "3".into(),
                    size: 10,
                    old_hash: "hc2".into(),
                    old_version: Some("2".into()),
                }),
                mode: None,
            },
        );
        put_manifest(&reader, &v3);
        // version "2" manifest is deliberately never registered with the reader.

        let mut client = Manifest::new("1");
        client.files.insert("c".into(), FileEntry::hash_only("hc1".into()));

        let result = plan(&client, "3", &reader, &IdentityCompressor, &IdentitySigner)
            .unwrap()
            .unwrap();

        assert!(result.patch.is_empty());
        assert_eq!(result.download, vec!["c".to_string()]);
    }
}
