//! A [`relaydist_core::adapters::ArchiveHandler`] over ZIP files, grounded
//! in the reference `ZIPHandler`: `walk` lists every non-directory member,
//! `get`/`set`/`delete` let the applier treat archive members as ordinary
//! manifest paths once `walk::walk` has mounted the archive as a subtree.
//!
//! `set` and `delete` both need to rewrite members in an archive the `zip`
//! crate has already opened for reading, so both go through a
//! [`tempfile::NamedTempFile`] written alongside the archive and then
//! persisted over it — the same delete-then-rewrite shape the reference
//! implementation uses via `tempfile.mkstemp`, but with the temp file
//! cleaned up automatically on every exit path, including an error partway
//! through rewriting.

use std::fs::{self, File};
use std::io::{self, BufReader, Read, Write};
use std::path::Path;

use relaydist_core::adapters::ArchiveMember;
use tempfile::NamedTempFile;
use tracing::trace;
use zip::write::FileOptions;
use zip::{ZipArchive, ZipWriter};

fn to_io_error(err: zip::result::ZipError) -> io::Error {
    io::Error::new(io::ErrorKind::Other, err)
}

/// A ZIP-backed [`relaydist_core::adapters::ArchiveHandler`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipArchiveHandler;

impl relaydist_core::adapters::ArchiveHandler for ZipArchiveHandler {
    fn walk(&self, archive: &Path) -> io::Result<Vec<ArchiveMember>> {
        let file = File::open(archive)?;
        let mut zip = ZipArchive::new(BufReader::new(file)).map_err(to_io_error)?;

        let mut members = Vec::with_capacity(zip.len());
        for i in 0..zip.len() {
            let mut entry = zip.by_index(i).map_err(to_io_error)?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().to_string();
            let mode = entry.unix_mode();
            let mut contents = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut contents)?;
            members.push(ArchiveMember { name, contents, mode });
        }
        trace!(archive = %archive.display(), members = members.len(), "walked archive");
        Ok(members)
    }

    fn get(&self, archive: &Path, member: &str) -> io::Result<Vec<u8>> {
        let file = File::open(archive)?;
        let mut zip = ZipArchive::new(BufReader::new(file)).map_err(to_io_error)?;
        let mut entry = zip.by_name(member).map_err(to_io_error)?;
        let mut contents = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut contents)?;
        Ok(contents)
    }

    fn set(
        &self,
        archive: &Path,
        member: &str,
        contents: &[u8],
        mode: Option<u32>,
    ) -> io::Result<()> {
        if let Some(parent) = archive.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        if archive.exists() {
            let already_present = {
                let file = File::open(archive)?;
                let zip = ZipArchive::new(BufReader::new(file)).map_err(to_io_error)?;
                zip.file_names().any(|name| name == member)
            };
            if already_present {
                self.delete(archive, member)?;
            }
        }

        let file = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(archive)?;
        let has_content = file.metadata()?.len() > 0;

        let mut zip = if has_content {
            ZipWriter::new_append(file).map_err(to_io_error)?
        } else {
            ZipWriter::new(file)
        };

        let mut options = FileOptions::default();
        if let Some(mode) = mode {
            options = options.unix_permissions(mode);
        }
        zip.start_file(member, options).map_err(to_io_error)?;
        zip.write_all(contents)?;
        zip.finish().map_err(to_io_error)?;
        trace!(archive = %archive.display(), member, bytes = contents.len(), "wrote archive member");
        Ok(())
    }

    fn delete(&self, archive: &Path, member: &str) -> io::Result<()> {
        let old_file = File::open(archive)?;
        let mut old_zip = ZipArchive::new(BufReader::new(old_file)).map_err(to_io_error)?;

        let parent = archive.parent().filter(|p| !p.as_os_str().is_empty());
        let tmp = match parent {
            Some(dir) => NamedTempFile::new_in(dir)?,
            None => NamedTempFile::new()?,
        };

        {
            let mut new_zip = ZipWriter::new(tmp.as_file());
            for i in 0..old_zip.len() {
                let mut entry = old_zip.by_index(i).map_err(to_io_error)?;
                if entry.name() == member {
                    continue;
                }
                let mut options = FileOptions::default();
                if let Some(mode) = entry.unix_mode() {
                    options = options.unix_permissions(mode);
                }
                let name = entry.name().to_string();
                new_zip.start_file(name, options).map_err(to_io_error)?;
                io::copy(&mut entry, &mut new_zip)?;
            }
            new_zip.finish().map_err(to_io_error)?;
        }

        tmp.persist(archive)
            .map_err(|persist_err| persist_err.error)?;
        trace!(archive = %archive.display(), member, "deleted archive member");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relaydist_core::adapters::ArchiveHandler;

    fn fixture_zip(dir: &Path, entries: &[(&str, &str)]) -> std::path::PathBuf {
        let path = dir.join("fixture.zip");
        let file = File::create(&path).unwrap();
        let mut zip = ZipWriter::new(file);
        let options = FileOptions::default();
        for &(name, data) in entries {
            zip.start_file(name, options).unwrap();
            zip.write_all(data.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
        path
    }

    #[test]
    fn walk_lists_members_skipping_directories() {
        let dir = tempfile::tempdir().unwrap();
        let archive = fixture_zip(dir.path(), &[("a.txt", "alpha"), ("sub/b.txt", "beta")]);

        let members = ZipArchiveHandler.walk(&archive).unwrap();
        let names: Vec<_> = members.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "sub/b.txt"]);
        assert_eq!(members[0].contents, b"alpha");
    }

    #[test]
    fn get_reads_named_member() {
        let dir = tempfile::tempdir().unwrap();
        let archive = fixture_zip(dir.path(), &[("a.txt", "alpha")]);
        let contents = ZipArchiveHandler.get(&archive, "a.txt").unwrap();
        assert_eq!(contents, b"alpha");
    }

    #[test]
    fn set_creates_new_archive_then_appends_a_second_member() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("out.zip");

        ZipArchiveHandler
            .set(&archive, "a.txt", b"alpha", None)
            .unwrap();
        ZipArchiveHandler
            .set(&archive, "b.txt", b"beta", None)
            .unwrap();

        let members = ZipArchiveHandler.walk(&archive).unwrap();
        let mut names: Vec<_> = members.iter().map(|m| m.name.clone()).collect();
        names.sort();
        assert_eq!(names, vec!["a.txt".to_string(), "b.txt".to_string()]);
    }

    #[test]
    fn set_replaces_existing_member_contents() {
        let dir = tempfile::tempdir().unwrap();
        let archive = fixture_zip(dir.path(), &[("a.txt", "old"), ("b.txt", "beta")]);

        ZipArchiveHandler.set(&archive, "a.txt", b"new", None).unwrap();

        let members = ZipArchiveHandler.walk(&archive).unwrap();
        assert_eq!(members.len(), 2);
        let a = members.iter().find(|m| m.name == "a.txt").unwrap();
        assert_eq!(a.contents, b"new");
    }

    #[test]
    fn delete_removes_only_the_named_member() {
        let dir = tempfile::tempdir().unwrap();
        let archive = fixture_zip(dir.path(), &[("a.txt", "alpha"), ("b.txt", "beta")]);

        ZipArchiveHandler.delete(&archive, "a.txt").unwrap();

        let members = ZipArchiveHandler.walk(&archive).unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].name, "b.txt");
    }
}
