//! Error taxonomy for the file-editing core.
//!
//! Most read-side operations report failure through sentinels (`None`, empty
//! vectors) and handle state; these variants surface where a caller has to
//! know a mutation did not happen.

use std::io;

/// Errors raised by handle, search and splice operations.
#[derive(Debug, thiserror::Error)]
pub enum FileError {
    /// No backend could be opened for the given name
    #[error("could not open {name}")]
    Open { name: String },

    /// Operation attempted on a closed or invalid handle
    #[error("file handle is not open")]
    InvalidState,

    /// Needle longer than the search buffer
    #[error("search needle of {len} bytes exceeds the {buffer} byte buffer")]
    SearchBounds { len: usize, buffer: usize },

    /// Backend refused to reopen in read-write mode
    #[error("{name} is read-only")]
    WritePermission { name: String },

    /// Splice range falls outside the file
    #[error("range {start}..{end} is outside a file of {length} bytes")]
    OutOfRange { start: u64, end: u64, length: u64 },

    /// I/O failed after the tail relocation had started
    #[error("tail relocation failed at offset {offset}")]
    PartialShift {
        offset: u64,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type FileResult<T> = std::result::Result<T, FileError>;
