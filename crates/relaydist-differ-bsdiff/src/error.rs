//! Errors internal to the container codec. These never reach
//! [`relaydist_core::adapters::Differ`] callers directly — `diff`/`patch`
//! translate them into [`relaydist_core::adapters::DifferError`].

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("not a bsdiff container (bad magic)")]
    BadMagic,

    #[error("corrupt patch container: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
