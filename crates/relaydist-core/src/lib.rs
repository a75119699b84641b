//! Content-addressed incremental distribution engine.
//!
//! This crate is the substrate for software-update delivery: it produces
//! versioned distribution trees from source directories ([`builder`]),
//! computes minimal update plans for a client at an arbitrary prior version
//! ([`planner`]), and applies those plans in-place ([`applier`]). Bandwidth
//! savings come from per-file binary deltas chained across versions; disk
//! savings at the distribution side come from hardlink-deduplicating files
//! that did not change between versions.
//!
//! The engine is polymorphic over five capability sets — compression,
//! binary diffing, signing, network fetching, and archive-container
//! handling — defined as traits in [`adapters`]. It never picks a concrete
//! implementation of any of them; [`Engine::default`] wires up identity
//! defaults (no compression, no deltas, no signature, no reader) so the
//! crate is usable standalone, and real implementations are provided by
//! sibling crates (`relaydist-compress-deflate`, `relaydist-differ-bsdiff`,
//! `relaydist-sign-rsa`, `relaydist-archive-zip`).
//!
//! Use [`Engine`] for the common path; the free functions in [`builder`],
//! [`planner`], and [`applier`] are available directly for callers that
//! want to manage the adapters themselves rather than go through one
//! long-lived facade.

pub mod adapters;
mod applier;
mod builder;
mod engine;
mod error;
mod hash;
pub mod manifest;
mod path;
mod planner;
mod walk;

pub use applier::apply;
pub use builder::{build, read_distribution_manifest, BuildOptions};
pub use engine::Engine;
pub use error::{Error, Result};
pub use hash::sha256_hex;
pub use manifest::{DeltaRecord, FileEntry, Manifest};
pub use path::{portable_join, to_host, to_portable};
pub use planner::{plan, PatchPlan};
pub use walk::{walk, WalkEntry};
