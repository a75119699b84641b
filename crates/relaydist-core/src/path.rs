//! Host-native <-> portable path conversion.
//!
//! This is the only place in the crate that translates path separators.
//! Manifests, archive members, and reader names always use portable
//! (forward-slash) form; the filesystem always sees host-native form.

use std::path::{Component, Path, PathBuf};

/// Convert a host-native relative path to its portable (`/`-separated) form.
#[must_use]
pub fn to_portable(path: &Path) -> String {
    let mut out = String::new();
    for component in path.components() {
        if let Component::Normal(part) = component {
            if !out.is_empty() {
                out.push('/');
            }
            out.push_str(&part.to_string_lossy());
        }
    }
    out
}

/// Convert a portable (`/`-separated) path back to host-native form.
#[must_use]
pub fn to_host(portable: &str) -> PathBuf {
    let mut buf = PathBuf::new();
    for part in portable.split('/') {
        if !part.is_empty() {
            buf.push(part);
        }
    }
    buf
}

/// Join a portable parent and a portable child, producing a portable path.
#[must_use]
pub fn portable_join(parent: &str, child: &str) -> String {
    if parent.is_empty() {
        child.to_string()
    } else if child.is_empty() {
        parent.to_string()
    } else {
        format!("{parent}/{child}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_simple_path() {
        let host = to_host("a/b/c");
        assert_eq!(to_portable(&host), "a/b/c");
    }

    #[test]
    fn join_handles_empty_sides() {
        assert_eq!(portable_join("", "a"), "a");
        assert_eq!(portable_join("a", ""), "a");
        assert_eq!(portable_join("a.zip", "inner/file"), "a.zip/inner/file");
    }
}
