//! The on-wire container format: a magic, four size fields, a control
//! block of fixed-size triples, a diff block, and an extra block — the
//! same four-section shape as `ngdp_patch::zbsdiff::ZBSDiffHeader` and its
//! control/diff/extra blocks, minus that format's own internal zlib
//! framing (redundant here: the outer [`relaydist_core::adapters::Compressor`]
//! the builder already runs every delta through makes a second compression
//! layer pure overhead).

use std::io::{Cursor, Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{Error, Result};

const MAGIC: &[u8; 8] = b"RDIFF1\0\0";

/// One bsdiff control triple: seek the old position by `seek`, copy
/// `diff_len` bytes from there (applying the byte-wise diff), then append
/// `extra_len` literal bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlEntry {
    pub diff_len: i64,
    pub extra_len: i64,
    pub seek: i64,
}

/// A parsed or about-to-be-written patch container.
#[derive(Debug, Clone)]
pub struct Container {
    pub output_len: u64,
    pub control: Vec<ControlEntry>,
    pub diff: Vec<u8>,
    pub extra: Vec<u8>,
}

impl Container {
    pub fn write(&self) -> Vec<u8> {
        // Writes to a `Vec<u8>` never fail; ignoring the `io::Result` here
        // is the standard pattern rather than unwrapping it.
        let mut out = Vec::new();
        let _ = out.write_all(MAGIC);
        let _ = out.write_u64::<BigEndian>(self.output_len);
        let _ = out.write_u64::<BigEndian>(self.control.len() as u64);
        let _ = out.write_u64::<BigEndian>(self.diff.len() as u64);
        let _ = out.write_u64::<BigEndian>(self.extra.len() as u64);
        for entry in &self.control {
            let _ = out.write_i64::<BigEndian>(entry.diff_len);
            let _ = out.write_i64::<BigEndian>(entry.extra_len);
            let _ = out.write_i64::<BigEndian>(entry.seek);
        }
        out.extend_from_slice(&self.diff);
        out.extend_from_slice(&self.extra);
        out
    }

    pub fn read(bytes: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(bytes);
        let mut magic = [0u8; 8];
        cursor.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(Error::BadMagic);
        }
        let output_len = cursor.read_u64::<BigEndian>()?;
        let control_count = cursor.read_u64::<BigEndian>()?;
        let diff_len = cursor.read_u64::<BigEndian>()?;
        let extra_len = cursor.read_u64::<BigEndian>()?;

        let mut control = Vec::with_capacity(control_count as usize);
        for _ in 0..control_count {
            control.push(ControlEntry {
                diff_len: cursor.read_i64::<BigEndian>()?,
                extra_len: cursor.read_i64::<BigEndian>()?,
                seek: cursor.read_i64::<BigEndian>()?,
            });
        }

        let mut diff = vec![0u8; diff_len as usize];
        cursor.read_exact(&mut diff)?;
        let mut extra = vec![0u8; extra_len as usize];
        cursor.read_exact(&mut extra)?;

        Ok(Self {
            output_len,
            control,
            diff,
            extra,
        })
    }
}
