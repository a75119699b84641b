//! Pluggable adapter traits the engine is polymorphic over.
//!
//! The core never picks a compression codec, a diff algorithm, a signature
//! scheme, a network transport, or an archive format; it only calls through
//! these traits. Concrete implementations live in sibling crates
//! (`relaydist-compress-deflate`, `relaydist-differ-bsdiff`,
//! `relaydist-sign-rsa`, `relaydist-archive-zip`) except for the identity
//! defaults, which are trivial enough to belong here.

mod archive;
mod compress;
mod differ;
mod reader;
mod signer;

pub use archive::{ArchiveHandler, ArchiveMember};
pub use compress::{Compressor, IdentityCompressor};
pub use differ::{Differ, DifferError, IdentityDiffer};
pub use reader::{FailingReader, Reader, ReaderError};
#[cfg(feature = "url-reader")]
pub use reader::UrlReader;
pub use signer::{IdentitySigner, Signer, VerificationError};
