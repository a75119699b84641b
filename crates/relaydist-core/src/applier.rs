//! The patch applier: executes a [`PatchPlan`] against an on-disk directory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::adapters::{ArchiveHandler, Compressor, Differ, Reader};
use crate::error::{Error, Result};
use crate::hash::sha256_hex;
use crate::path::to_host;
use crate::planner::PatchPlan;

/// Where one manifest name resolves to on disk: either a plain file, or a
/// member of a registered archive mounted at some ancestor path component.
enum Target<'a> {
    Plain(PathBuf),
    Archive {
        handler: &'a dyn ArchiveHandler,
        archive_path: PathBuf,
        member: String,
    },
}

/// Resolve a portable manifest `name` to its on-disk target, scanning path
/// components left to right for the first one ending in a registered
/// archive extension (see spec §4.6). A file literally named `foo.zip.txt`
/// is not an archive mount; only a whole component's suffix counts.
fn resolve<'a>(
    directory: &Path,
    name: &str,
    archive_handlers: &'a BTreeMap<String, Box<dyn ArchiveHandler>>,
) -> Target<'a> {
    let parts: Vec<&str> = name.split('/').collect();
    for (i, part) in parts.iter().enumerate() {
        if let Some(ext) = archive_handlers.keys().find(|ext| part.ends_with(ext.as_str())) {
            let archive_rel = parts[..=i].join("/");
            let archive_path = directory.join(to_host(&archive_rel));
            let member = parts[i + 1..].join("/");
            return Target::Archive {
                handler: archive_handlers[ext].as_ref(),
                archive_path,
                member,
            };
        }
    }
    Target::Plain(directory.join(to_host(name)))
}

fn read_target(target: &Target<'_>) -> Result<Vec<u8>> {
    match target {
        Target::Plain(path) => Ok(std::fs::read(path)?),
        Target::Archive {
            handler,
            archive_path,
            member,
        } => Ok(handler.get(archive_path, member).map_err(Error::HostIo)?),
    }
}

fn write_target(target: &Target<'_>, contents: &[u8], mode: Option<u32>) -> Result<()> {
    match target {
        Target::Plain(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, contents)?;
            #[cfg(unix)]
            if let Some(mode) = mode {
                use std::os::unix::fs::PermissionsExt;
                std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))?;
            }
            #[cfg(not(unix))]
            let _ = mode;
            Ok(())
        }
        Target::Archive {
            handler,
            archive_path,
            member,
        } => {
            if let Some(parent) = archive_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            handler
                .set(archive_path, member, contents, mode)
                .map_err(Error::HostIo)
        }
    }
}

fn delete_target(target: &Target<'_>) -> Result<()> {
    match target {
        Target::Plain(path) => match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        },
        Target::Archive {
            handler,
            archive_path,
            member,
        } => handler.delete(archive_path, member).map_err(Error::HostIo),
    }
}

fn verify_hash(name: &str, contents: &[u8], expected: &str) -> Result<()> {
    let actual = sha256_hex(contents);
    if actual != expected {
        return Err(Error::verification(format!(
            "{name}: expected hash {expected}, got {actual}"
        )));
    }
    Ok(())
}

/// Apply `plan` to `directory`, executing the three phases in the
/// contractual order: delete, download, patch. Halts on the first
/// verification failure, leaving the directory partially updated.
pub fn apply(
    directory: &Path,
    plan: &PatchPlan,
    target_version: &str,
    reader: &dyn Reader,
    compressor: &dyn Compressor,
    differ: &dyn Differ,
    archive_handlers: &BTreeMap<String, Box<dyn ArchiveHandler>>,
) -> Result<()> {
    let cext = compressor.compressed_extension();
    let dext = differ.extension();

    for name in &plan.delete {
        trace!(name, "deleting");
        let target = resolve(directory, name, archive_handlers);
        delete_target(&target)?;
    }

    for name in &plan.download {
        let entry = plan
            .manifest
            .files
            .get(name)
            .ok_or_else(|| Error::io(format!("{name} missing from target manifest")))?;
        trace!(name, "downloading full payload");
        let bytes = reader
            .get(target_version, &format!("{name}{cext}"))
            .map_err(|e| Error::io(e.to_string()))?;
        let contents = compressor
            .decompress(&bytes)
            .map_err(|e| Error::io(e.to_string()))?;
        verify_hash(name, &contents, &entry.hash)?;
        let target = resolve(directory, name, archive_handlers);
        write_target(&target, &contents, entry.mode)?;
    }

    for (name, chain) in &plan.patch {
        let entry = plan
            .manifest
            .files
            .get(name)
            .ok_or_else(|| Error::io(format!("{name} missing from target manifest")))?;
        let target = resolve(directory, name, archive_handlers);
        let mut contents = read_target(&target)?;

        for version in chain {
            trace!(name, version, "applying delta hop");
            let bytes = reader
                .get(version, &format!("{name}{dext}"))
                .map_err(|e| Error::io(e.to_string()))?;
            let delta = compressor
                .decompress(&bytes)
                .map_err(|e| Error::io(e.to_string()))?;
            contents = differ
                .patch(&contents, &delta)
                .map_err(|e| Error::io(e.to_string()))?;
        }

        verify_hash(name, &contents, &entry.hash)?;
        write_target(&target, &contents, entry.mode)?;
    }

    debug!(
        target_version,
        deleted = plan.delete.len(),
        downloaded = plan.download.len(),
        patched = plan.patch.len(),
        "applied patch plan"
    );

    Ok(())
}
