//! The archive-container adapter.
//!
//! An [`ArchiveHandler`] presents a container file (a ZIP, say) as a
//! mountable subtree of named members, so that `outer/a.zip/inner/file` can
//! be treated as an ordinary manifest path.

use std::fmt;

/// One member yielded while walking an archive.
#[derive(Debug, Clone)]
pub struct ArchiveMember {
    /// Portable name of the member within the archive.
    pub name: String,
    /// The member's raw (uncompressed, as-stored) contents.
    pub contents: Vec<u8>,
    /// POSIX permission bits, if the archive format records them.
    pub mode: Option<u32>,
}

/// Handles reading, writing, and deleting members of one archive format.
///
/// `walk` drives the directory walker's archive-expansion step (see
/// `walk::walk`); `get`/`set`/`delete` are used by the applier once a path
/// has been resolved to `(archive, member)` (see `applier::resolve_handler`).
pub trait ArchiveHandler: fmt::Debug + Send + Sync {
    /// List every member of `archive` as `(member_name, contents, mode)`.
    fn walk(&self, archive: &std::path::Path) -> std::io::Result<Vec<ArchiveMember>>;

    /// Read one member's contents.
    fn get(&self, archive: &std::path::Path, member: &str) -> std::io::Result<Vec<u8>>;

    /// Create or replace `member` in `archive` with `contents`, creating the
    /// archive itself if it does not yet exist.
    fn set(
        &self,
        archive: &std::path::Path,
        member: &str,
        contents: &[u8],
        mode: Option<u32>,
    ) -> std::io::Result<()>;

    /// Remove `member` from `archive`.
    fn delete(&self, archive: &std::path::Path, member: &str) -> std::io::Result<()>;
}
