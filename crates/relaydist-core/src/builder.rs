//! The distribution builder: source tree (+ optional prior distribution) in,
//! a new distribution tree and signed manifest out.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::{debug, trace, warn};

use crate::adapters::{ArchiveHandler, Compressor, Differ, Signer};
use crate::error::{Error, Result};
use crate::hash::sha256_hex;
use crate::manifest::{DeltaRecord, FileEntry, Manifest};
use crate::walk::{walk, WalkEntry};

/// Everything [`build`] needs beyond the source/target/prior directories.
pub struct BuildOptions<'a> {
    /// The full-payload compressor.
    pub compressor: &'a dyn Compressor,
    /// The binary differ used to try for a smaller delta against the prior
    /// version.
    pub differ: &'a dyn Differ,
    /// The signer applied to the manifest before it is compressed.
    pub signer: &'a dyn Signer,
    /// Registered archive handlers, keyed by extension.
    pub archive_handlers: &'a BTreeMap<String, Box<dyn ArchiveHandler>>,
    /// Ignore patterns applied to the post-expansion relative path.
    pub ignore: &'a [Regex],
}

/// Build distribution `version` from `source_dir` into `target_dir`,
/// optionally diffing against `prior_target_dir`. Returns the manifest that
/// was written (sorted-key canonical JSON, signed, compressed, at
/// `<target_dir>/manifest<cext>`; the plaintext `<target_dir>/version`
/// sibling is written alongside it).
pub fn build(
    version: &str,
    source_dir: &Path,
    target_dir: &Path,
    prior_target_dir: Option<&Path>,
    opts: &BuildOptions<'_>,
) -> Result<Manifest> {
    let cext = opts.compressor.compressed_extension();
    let dext = opts.differ.extension();

    let prior_manifest = match prior_target_dir {
        Some(prior_dir) => Some(read_distribution_manifest(
            prior_dir,
            opts.compressor,
            opts.signer,
        )?),
        None => None,
    };

    let entries_in = walk(source_dir, opts.archive_handlers, opts.ignore)?;
    debug!(version, files = entries_in.len(), "walked source tree");

    let mut files = BTreeMap::new();
    for WalkEntry {
        rel_path,
        contents,
        mode,
    } in entries_in
    {
        let hash = sha256_hex(&contents);
        let prev = prior_manifest
            .as_ref()
            .and_then(|m| m.files.get(&rel_path));

        let dest_path = target_dir.join(format!("{rel_path}{cext}"));
        let delta_path = target_dir.join(format!("{rel_path}{dext}"));
        if let Some(parent) = dest_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut linked = false;
        let mut delta: Option<DeltaRecord> = None;
        let mut full_compressed: Option<Vec<u8>> = None;
        let dlsize: u64;

        if let Some(prev) = prev {
            if prev.hash == hash {
                // Unchanged: dedup by hardlink (or copy) against the prior
                // distribution's full payload, carrying its delta forward
                // unchanged.
                let prior_dir = prior_target_dir.expect("prev implies prior_manifest");
                let prior_path = prior_dir.join(format!("{rel_path}{cext}"));
                link_or_copy(&prior_path, &dest_path)?;
                delta = prev.delta.clone();
                linked = true;
                trace!(path = %rel_path, "hardlink-deduplicated against prior version");
            } else {
                // Changed: try a delta against the prior version's contents.
                let prior_dir = prior_target_dir.expect("prev implies prior_manifest");
                let prior_full_path = prior_dir.join(format!("{rel_path}{cext}"));
                let prior_compressed = std::fs::read(&prior_full_path)?;
                let prior_contents = opts
                    .compressor
                    .decompress(&prior_compressed)
                    .map_err(|e| Error::io(e.to_string()))?;

                let candidate_compressed = opts.compressor.compress(&contents);
                match opts.differ.diff(&prior_contents, &contents) {
                    Ok(raw_delta) => {
                        let compressed_delta = opts.compressor.compress(&raw_delta);
                        if compressed_delta.len() < candidate_compressed.len() {
                            std::fs::write(&delta_path, &compressed_delta)?;
                            delta = Some(DeltaRecord {
                                version: version.to_string(),
                                size: compressed_delta.len() as u64,
                                old_hash: prev.hash.clone(),
                                old_version: prev.delta.as_ref().map(|d| d.version.clone()),
                            });
                            trace!(path = %rel_path, delta_size = compressed_delta.len(), "accepted delta");
                        }
                    }
                    Err(e) => {
                        warn!(path = %rel_path, error = %e, "differ could not produce a delta, falling back to full transfer");
                    }
                }
                full_compressed = Some(candidate_compressed);
            }
        }

        if !linked {
            let compressed =
                full_compressed.unwrap_or_else(|| opts.compressor.compress(&contents));
            std::fs::write(&dest_path, &compressed)?;
            dlsize = compressed.len() as u64;

            // Stricter re-check (see DESIGN.md open question 1): a delta
            // that is not strictly smaller than the full compressed form is
            // never recorded, even if it was already confirmed once above.
            if let Some(candidate) = &delta {
                if candidate.size >= dlsize {
                    let _ = std::fs::remove_file(&delta_path);
                    delta = None;
                }
            }
        } else {
            dlsize = std::fs::metadata(&dest_path)?.len();
        }

        files.insert(
            rel_path,
            FileEntry {
                hash,
                dlsize,
                delta,
                mode,
            },
        );
    }

    let manifest = Manifest {
        version: version.to_string(),
        files,
    };

    std::fs::create_dir_all(target_dir)?;
    let manifest_bytes = manifest.write(opts.compressor, opts.signer)?;
    std::fs::write(target_dir.join(format!("manifest{cext}")), manifest_bytes)?;
    std::fs::write(target_dir.join("version"), format!("{version}\n"))?;

    debug!(version, files = manifest.files.len(), "wrote distribution");
    Ok(manifest)
}

/// Read and verify the manifest stored at `<dist_dir>/manifest<cext>`.
pub fn read_distribution_manifest(
    dist_dir: &Path,
    compressor: &dyn Compressor,
    signer: &dyn Signer,
) -> Result<Manifest> {
    let cext = compressor.compressed_extension();
    let path = dist_dir.join(format!("manifest{cext}"));
    let bytes = std::fs::read(&path)
        .map_err(|e| Error::io(format!("reading {}: {e}", path.display())))?;
    Manifest::read(&bytes, compressor, signer)
}

/// Hard-link `src` to `dst`, replacing any pre-existing `dst`. Falls back to
/// a mode-preserving copy when the host (or filesystem boundary) does not
/// support hard links.
fn link_or_copy(src: &Path, dst: &Path) -> Result<()> {
    if dst.exists() {
        std::fs::remove_file(dst)?;
    }
    if std::fs::hard_link(src, dst).is_err() {
        std::fs::copy(src, dst)?;
        let perms = std::fs::metadata(src)?.permissions();
        std::fs::set_permissions(dst, perms)?;
    }
    Ok(())
}
