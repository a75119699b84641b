//! The portable-path walker: descends a source tree, expanding registered
//! archive extensions into their member subtrees and filtering by ignore
//! pattern.

use std::collections::BTreeMap;
use std::path::Path;

use regex::Regex;
use tracing::trace;

use crate::adapters::ArchiveHandler;
use crate::error::{Error, Result};
use crate::path::{portable_join, to_portable};

/// One entry produced by [`walk`]: a portable relative path, its raw
/// contents, and its permission bits if the host (or archive format) could
/// provide them.
#[derive(Debug, Clone)]
pub struct WalkEntry {
    /// Portable relative path, possibly including an archive mount
    /// component (`outer/a.zip/inner/file`).
    pub rel_path: String,
    /// Raw file contents.
    pub contents: Vec<u8>,
    /// POSIX permission bits, if available.
    pub mode: Option<u32>,
}

/// Walk `root`, yielding one [`WalkEntry`] per file, expanding any path whose
/// name ends with a registered archive extension into its members, and
/// dropping any (post-expansion) path matched by `ignore`.
///
/// Registered extensions are tried in `archive_handlers`' iteration order;
/// the first match wins, mirroring the reference implementation's "first
/// registered handler whose extension matches" rule.
pub fn walk(
    root: &Path,
    archive_handlers: &BTreeMap<String, Box<dyn ArchiveHandler>>,
    ignore: &[Regex],
) -> Result<Vec<WalkEntry>> {
    let mut out = Vec::new();
    for entry in walkdir::WalkDir::new(root)
        .follow_links(false)
        .into_iter()
    {
        let entry = entry.map_err(|e| Error::io(e.to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let abs_path = entry.path();
        let rel_path = abs_path
            .strip_prefix(root)
            .map_err(|e| Error::io(e.to_string()))?;
        let portable_rel = to_portable(rel_path);

        let matched_ext = archive_handlers
            .keys()
            .find(|ext| portable_rel.ends_with(ext.as_str()));

        if let Some(ext) = matched_ext {
            let handler = &archive_handlers[ext];
            trace!(path = %portable_rel, ext, "expanding archive mount point");
            for member in handler.walk(abs_path).map_err(Error::HostIo)? {
                let member_path = portable_join(&portable_rel, &member.name);
                if is_ignored(&member_path, ignore) {
                    continue;
                }
                out.push(WalkEntry {
                    rel_path: member_path,
                    contents: member.contents,
                    mode: member.mode,
                });
            }
        } else {
            if is_ignored(&portable_rel, ignore) {
                continue;
            }
            let contents = std::fs::read(abs_path)?;
            let mode = file_mode(abs_path);
            trace!(path = %portable_rel, bytes = contents.len(), "walked file");
            out.push(WalkEntry {
                rel_path: portable_rel,
                contents,
                mode,
            });
        }
    }
    Ok(out)
}

/// A pattern matches if it matches starting at offset 0 of `path` (a
/// "prefix-anchored" match, not a full-string match — a pattern of `a/b`
/// excludes `a/b/c` too, the same way the reference implementation's
/// `re.match` behaves).
fn is_ignored(path: &str, ignore: &[Regex]) -> bool {
    ignore
        .iter()
        .any(|pattern| matches!(pattern.find(path), Some(m) if m.start() == 0))
}

#[cfg(unix)]
fn file_mode(path: &Path) -> Option<u32> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path).ok().map(|m| m.permissions().mode())
}

#[cfg(not(unix))]
fn file_mode(_path: &Path) -> Option<u32> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignore_is_prefix_anchored() {
        let patterns = vec![Regex::new(r"a/b").unwrap()];
        assert!(is_ignored("a/b", &patterns));
        assert!(is_ignored("a/b/c", &patterns));
        assert!(!is_ignored("x/a/b", &patterns));
    }

    #[test]
    fn walks_plain_tree() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a"), b"hello").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub/b"), b"world").unwrap();

        let handlers = BTreeMap::new();
        let entries = walk(dir.path(), &handlers, &[]).unwrap();
        let mut names: Vec<_> = entries.iter().map(|e| e.rel_path.clone()).collect();
        names.sort();
        assert_eq!(names, vec!["a", "sub/b"]);
    }
}
