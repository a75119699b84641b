//! The [`Engine`] facade: wires the adapters and owns the archive-handler
//! registry and ignore-pattern list that the builder, planner, and applier
//! all need.
//!
//! This mirrors the reference implementation's `PixiePatch` class: one
//! long-lived object constructed with the four adapters, then configured
//! with `register_archive_handler`/`register_ignore_pattern` equivalents
//! before use.

use std::collections::BTreeMap;
use std::path::Path;

use regex::Regex;

use crate::adapters::{
    ArchiveHandler, Compressor, Differ, FailingReader, IdentityCompressor, IdentityDiffer,
    IdentitySigner, Reader, Signer,
};
use crate::builder::{self, BuildOptions};
use crate::error::{Error, Result};
use crate::hash::sha256_hex;
use crate::manifest::{FileEntry, Manifest};
use crate::planner::{self, PatchPlan};
use crate::walk::walk;

/// Owns the four pluggable adapters plus the archive-handler registry and
/// ignore-pattern list, and exposes the builder/planner/applier operations
/// as methods so callers configure the engine once and reuse it across
/// versions.
pub struct Engine {
    compressor: Box<dyn Compressor>,
    differ: Box<dyn Differ>,
    signer: Box<dyn Signer>,
    reader: Box<dyn Reader>,
    archive_handlers: BTreeMap<String, Box<dyn ArchiveHandler>>,
    ignore: Vec<Regex>,
}

impl Engine {
    /// Build an engine from explicit adapters.
    #[must_use]
    pub fn new(
        compressor: Box<dyn Compressor>,
        differ: Box<dyn Differ>,
        signer: Box<dyn Signer>,
        reader: Box<dyn Reader>,
    ) -> Self {
        Self {
            compressor,
            differ,
            signer,
            reader,
            archive_handlers: BTreeMap::new(),
            ignore: Vec::new(),
        }
    }

    /// Register `handler` for every path ending in `extension` (which should
    /// include the leading dot, e.g. `.zip`).
    #[must_use]
    pub fn with_archive_handler(
        mut self,
        extension: impl Into<String>,
        handler: Box<dyn ArchiveHandler>,
    ) -> Self {
        self.archive_handlers.insert(extension.into(), handler);
        self
    }

    /// Add an ignore pattern, tested prefix-anchored against the
    /// post-expansion portable relative path.
    pub fn with_ignore_pattern(mut self, pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern).map_err(|source| Error::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        self.ignore.push(regex);
        Ok(self)
    }

    /// Build distribution `version` from `source_dir` into `target_dir`,
    /// optionally diffing against `prior_target_dir`. See
    /// [`builder::build`].
    pub fn build_distribution(
        &self,
        version: &str,
        source_dir: &Path,
        target_dir: &Path,
        prior_target_dir: Option<&Path>,
    ) -> Result<Manifest> {
        let opts = BuildOptions {
            compressor: self.compressor.as_ref(),
            differ: self.differ.as_ref(),
            signer: self.signer.as_ref(),
            archive_handlers: &self.archive_handlers,
            ignore: &self.ignore,
        };
        builder::build(version, source_dir, target_dir, prior_target_dir, &opts)
    }

    /// Walk `source_dir` (a client tree, declared to be at `version`) and
    /// produce a manifest recording only the hash of each file — the form a
    /// client publishes of itself before planning an update. Mirrors the
    /// reference implementation's `create_client_manifest`.
    pub fn create_client_manifest(&self, version: &str, source_dir: &Path) -> Result<Manifest> {
        let entries = walk(source_dir, &self.archive_handlers, &self.ignore)?;
        let mut manifest = Manifest::new(version);
        for entry in entries {
            let hash = sha256_hex(&entry.contents);
            manifest
                .files
                .insert(entry.rel_path, FileEntry::hash_only(hash));
        }
        Ok(manifest)
    }

    /// Compute the plan to bring `client_manifest` up to `target_version`.
    /// See [`planner::plan`].
    pub fn plan(
        &self,
        client_manifest: &Manifest,
        target_version: &str,
    ) -> Result<Option<PatchPlan>> {
        planner::plan(
            client_manifest,
            target_version,
            self.reader.as_ref(),
            self.compressor.as_ref(),
            self.signer.as_ref(),
        )
    }

    /// Apply `plan` to `directory`. See [`crate::applier::apply`].
    pub fn apply(&self, directory: &Path, plan: &PatchPlan, target_version: &str) -> Result<()> {
        crate::applier::apply(
            directory,
            plan,
            target_version,
            self.reader.as_ref(),
            self.compressor.as_ref(),
            self.differ.as_ref(),
            &self.archive_handlers,
        )
    }
}

impl Default for Engine {
    /// An engine with every adapter at its identity default and a
    /// permanently-failing reader — usable for building distributions
    /// without ever being able to plan or apply a patch (the same posture
    /// the reference implementation's `PixiePatch()` with no arguments
    /// takes).
    fn default() -> Self {
        Self::new(
            Box::new(IdentityCompressor),
            Box::new(IdentityDiffer),
            Box::new(IdentitySigner),
            Box::new(FailingReader),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_engine_builds_empty_distribution() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source");
        let target = dir.path().join("dist");
        std::fs::create_dir_all(&source).unwrap();

        let engine = Engine::default();
        let manifest = engine
            .build_distribution("1", &source, &target, None)
            .unwrap();
        assert_eq!(manifest.version, "1");
        assert!(manifest.files.is_empty());
    }

    #[test]
    fn client_manifest_records_hash_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a"), b"hello").unwrap();

        let engine = Engine::default();
        let manifest = engine.create_client_manifest("1", dir.path()).unwrap();
        let entry = &manifest.files["a"];
        assert_eq!(entry.hash, sha256_hex(b"hello"));
        assert_eq!(entry.dlsize, 0);
        assert!(entry.delta.is_none());
    }

    #[test]
    fn same_version_plan_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Engine::default();
        let manifest = engine.create_client_manifest("1", dir.path()).unwrap();
        assert!(engine.plan(&manifest, "1").unwrap().is_none());
    }
}
