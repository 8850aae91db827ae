//! Crate-wide error type for fallible setup and I/O operations.
//!
//! Per-command errors returned to clients over RESP live in
//! [`crate::dispatch::DispatchError`] instead — this type is for the
//! things that can fail before or around a command: binding a listener,
//! touching the AOF/RDB files, parsing CLI flags.

use std::io;

pub type SkyResult<T> = Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("I/O error while {1}: {0}")]
    IoExtra(#[source] io::Error, String),

    #[error("failed to bind listener: {0}")]
    Bind(#[source] io::Error),

    #[error("RDB error: {0}")]
    Rdb(String),
}

impl Error {
    pub fn io_extra(ioe: io::Error, extra: impl ToString) -> Self {
        Self::IoExtra(ioe, extra.to_string())
    }
}
