//! A [`relaydist_core::adapters::Differ`] in the bsdiff tradition: a
//! suffix array over the source file anchors matches against the target,
//! and the gaps between anchors are stored as literal bytes. Grounded in
//! `ngdp_patch::zbsdiff`'s control/diff/extra block shape (see
//! [`container`]) and enriched with a real suffix-array search —
//! `ngdp_patch::zbsdiff::create_patch` is explicitly a placeholder that
//! stores the whole target as one literal block; this crate does the
//! anchor search that placeholder's doc comment says a full implementation
//! needs.

mod container;
mod error;
mod suffix;

use container::{Container, ControlEntry};
use relaydist_core::adapters::{Differ, DifferError};
use tracing::trace;

/// Matches shorter than this are not worth anchoring — the control triple
/// overhead (24 bytes) would exceed the bytes saved.
const MIN_MATCH: usize = 16;

/// A suffix-array-anchored binary differ storing deltas under the `.bsdiff`
/// extension.
#[derive(Debug, Clone, Copy, Default)]
pub struct BsdiffDiffer;

impl Differ for BsdiffDiffer {
    fn diff(&self, source: &[u8], target: &[u8]) -> Result<Vec<u8>, DifferError> {
        let sa = suffix::SuffixArray::build(source);

        let mut control = Vec::new();
        let mut diff_buf = Vec::new();
        let mut extra_buf = Vec::new();

        let mut new_scan = 0usize;
        let mut old_cursor: i64 = 0;

        while new_scan < target.len() {
            let (match_pos, match_len) = sa.longest_match(&target[new_scan..]);

            if match_len >= MIN_MATCH {
                let mut block = Vec::with_capacity(match_len);
                for k in 0..match_len {
                    block.push(target[new_scan + k].wrapping_sub(source[match_pos + k]));
                }
                diff_buf.extend_from_slice(&block);
                control.push(ControlEntry {
                    diff_len: match_len as i64,
                    extra_len: 0,
                    seek: match_pos as i64 - old_cursor,
                });
                old_cursor = match_pos as i64 + match_len as i64;
                new_scan += match_len;
            } else {
                // No anchor here: consume literal bytes until the next
                // position that does anchor, or end of input.
                let run_start = new_scan;
                new_scan += 1;
                while new_scan < target.len() {
                    let (_, len) = sa.longest_match(&target[new_scan..]);
                    if len >= MIN_MATCH {
                        break;
                    }
                    new_scan += 1;
                }
                let run = &target[run_start..new_scan];
                extra_buf.extend_from_slice(run);
                control.push(ControlEntry {
                    diff_len: 0,
                    extra_len: run.len() as i64,
                    seek: 0,
                });
            }
        }

        trace!(
            source_len = source.len(),
            target_len = target.len(),
            control_entries = control.len(),
            diff_bytes = diff_buf.len(),
            extra_bytes = extra_buf.len(),
            "built bsdiff delta"
        );

        let container = Container {
            output_len: target.len() as u64,
            control,
            diff: diff_buf,
            extra: extra_buf,
        };
        Ok(container.write())
    }

    fn patch(&self, source: &[u8], patch: &[u8]) -> Result<Vec<u8>, DifferError> {
        let container =
            Container::read(patch).map_err(|e| DifferError(format!("invalid bsdiff patch: {e}")))?;

        let mut output = Vec::with_capacity(container.output_len as usize);
        let mut old_pos: i64 = 0;
        let mut diff_cursor = 0usize;
        let mut extra_cursor = 0usize;

        for entry in &container.control {
            old_pos += entry.seek;

            let diff_len = entry.diff_len as usize;
            for k in 0..diff_len {
                let old_byte = source
                    .get((old_pos as usize) + k)
                    .copied()
                    .unwrap_or(0);
                let delta_byte = *container
                    .diff
                    .get(diff_cursor + k)
                    .ok_or_else(|| DifferError("diff block shorter than declared".into()))?;
                output.push(old_byte.wrapping_add(delta_byte));
            }
            diff_cursor += diff_len;
            old_pos += diff_len as i64;

            let extra_len = entry.extra_len as usize;
            let extra_slice = container
                .extra
                .get(extra_cursor..extra_cursor + extra_len)
                .ok_or_else(|| DifferError("extra block shorter than declared".into()))?;
            output.extend_from_slice(extra_slice);
            extra_cursor += extra_len;
        }

        if output.len() as u64 != container.output_len {
            return Err(DifferError(format!(
                "reconstructed {} bytes, expected {}",
                output.len(),
                container.output_len
            )));
        }
        Ok(output)
    }

    fn extension(&self) -> &str {
        ".bsdiff"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(source: &[u8], target: &[u8]) {
        let d = BsdiffDiffer;
        let patch = d.diff(source, target).unwrap();
        let result = d.patch(source, &patch).unwrap();
        assert_eq!(result, target);
    }

    #[test]
    fn identical_files_round_trip() {
        roundtrip(b"the quick brown fox", b"the quick brown fox");
    }

    #[test]
    fn small_edit_round_trips_with_a_single_anchor() {
        // The raw container isn't itself guaranteed to be smaller than the
        // target (a long matched run becomes a long run of zero diff
        // bytes) — the builder's outer `Compressor` is what turns that
        // into a bandwidth win. What this differ must get right is
        // anchoring the whole unchanged prefix as one match instead of
        // falling back to a wall of literal bytes.
        let source = "test\n".repeat(100);
        let mut target = source.clone();
        target.push_str("one more line\n");
        roundtrip(source.as_bytes(), target.as_bytes());

        let d = BsdiffDiffer;
        let patch = d.diff(source.as_bytes(), target.as_bytes()).unwrap();
        let container = container::Container::read(&patch).unwrap();
        assert_eq!(container.control.len(), 2);
        assert_eq!(container.control[0].diff_len, source.len() as i64);
        assert_eq!(container.control[1].extra_len, 14);
    }

    #[test]
    fn empty_source_round_trips() {
        roundtrip(b"", b"brand new content");
    }

    #[test]
    fn empty_target_round_trips() {
        roundtrip(b"old content here", b"");
    }

    #[test]
    fn completely_different_content_round_trips() {
        roundtrip(b"aaaaaaaaaaaaaaaaaaaa", b"zzzzzzzzzzzzzzzzzzzz");
    }

    #[test]
    fn extension_is_bsdiff() {
        assert_eq!(BsdiffDiffer.extension(), ".bsdiff");
    }
}
