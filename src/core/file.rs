//! File handle used by format-specific tag layers.
//!
//! A [`TagFile`] owns exactly one backend, chosen by the resolver chain at
//! open time, and exposes block reads and writes, buffered search and splice
//! editing over it. Failures on the read side come back as sentinels (`None`,
//! empty vectors, `0`) so tag readers can keep going on unreadable files;
//! mutations return [`FileResult`] and never leave a half-shifted file
//! because write access was refused.
//!
//! States: `Closed` → `OpenReadWrite` | `OpenReadOnly` | `Invalid`. A read-only
//! handle is upgraded lazily the first time something writes.
//!
//! At most one handle per physical file is assumed. Nothing here arbitrates
//! between processes writing the same file.

use std::{fmt, io};

use tracing::{debug, instrument, warn};

use crate::core::{
    error::{FileError, FileResult},
    io::{FileIo, OpenMode, Position, seek_to},
    resolver,
    search::{self, BUFFER_SIZE, SearchLimits},
    splice::{self, SPLICE_CHUNK_SIZE},
};

/// Lifecycle of a [`TagFile`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    Closed,
    OpenReadOnly,
    OpenReadWrite,
    Invalid,
}

pub struct TagFile {
    name: Option<String>,
    io: Option<Box<dyn FileIo>>,
    state: FileState,
    valid: bool,
    max_scan_bytes: Option<u64>,
}

impl Default for TagFile {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TagFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TagFile")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("valid", &self.valid)
            .field("max_scan_bytes", &self.max_scan_bytes)
            .finish()
    }
}

impl TagFile {
    /// Closed handle; fields may be configured before [`open`](Self::open)
    pub fn new() -> Self {
        Self {
            name: None,
            io: None,
            state: FileState::Closed,
            valid: false,
            max_scan_bytes: None,
        }
    }

    /// Open `name` through the resolver chain
    pub fn from_name(name: &str) -> Self {
        let mut file = Self::new();
        file.open(name);
        file
    }

    /// Open an already constructed backend, bypassing the resolver chain
    pub fn with_io(io: Box<dyn FileIo>) -> Self {
        let mut file = Self::new();
        let name = io.name().to_owned();
        file.attach(name, io);
        file
    }

    /// Open `name`, replacing any backend held so far.
    ///
    /// Never fails outright: check [`is_open`](Self::is_open) afterwards.
    pub fn open(&mut self, name: &str) {
        let io = resolver::resolve(name);
        self.attach(name.to_owned(), io);
    }

    #[instrument(level = "debug", skip(self, io))]
    fn attach(&mut self, name: String, mut io: Box<dyn FileIo>) {
        self.io = None;

        let state = match io.open(OpenMode::ReadWrite) {
            Ok(()) => FileState::OpenReadWrite,
            Err(rw) => {
                debug!(error = %rw, "read-write open refused, trying read-only");
                match io.open(OpenMode::ReadOnly) {
                    Ok(()) => FileState::OpenReadOnly,
                    Err(ro) => {
                        warn!(error = %ro, "could not open file");
                        self.name = Some(name);
                        self.state = FileState::Invalid;
                        self.valid = false;
                        return;
                    }
                }
            }
        };

        debug!(?state, "file opened");
        self.name = Some(name);
        self.io = Some(io);
        self.state = state;
        self.valid = true;
    }

    /// Release the backend
    pub fn close(&mut self) {
        self.io = None;
        self.state = FileState::Closed;
        self.valid = false;
    }

    /// Name passed to `open`
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn state(&self) -> FileState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.io.as_ref().is_some_and(|io| io.is_open())
    }

    /// Open and not flagged invalid by a format layer
    pub fn is_valid(&self) -> bool {
        self.is_open() && self.valid
    }

    /// Hook for format layers to record whether parsing succeeded
    pub fn set_valid(&mut self, valid: bool) {
        self.valid = valid;
    }

    /// True unless the backend is currently writable
    pub fn read_only(&self) -> bool {
        self.state != FileState::OpenReadWrite
    }

    pub fn max_scan_bytes(&self) -> Option<u64> {
        self.max_scan_bytes
    }

    /// Cap every later `find`/`rfind` at `max` bytes read; `None` removes it
    pub fn set_max_scan_bytes(&mut self, max: Option<u64>) {
        self.max_scan_bytes = max;
    }

    /// Read buffer size; also the longest pattern `find`/`rfind` accept
    pub const fn buffer_size() -> usize {
        BUFFER_SIZE
    }

    fn readable_io(&mut self) -> Option<&mut dyn FileIo> {
        match self.io.as_deref_mut() {
            Some(io) if io.is_open() => Some(io),
            _ => None,
        }
    }

    /// Backend ready for writing, reopening a read-only one first
    fn writable_io(&mut self) -> FileResult<&mut dyn FileIo> {
        let state = self.state;
        let Some(io) = self.io.as_deref_mut() else {
            return Err(match (state, &self.name) {
                (FileState::Invalid, Some(name)) => FileError::Open { name: name.clone() },
                _ => FileError::InvalidState,
            });
        };

        if state == FileState::OpenReadOnly {
            let position = io.tell();
            if let Err(e) = io.open(OpenMode::ReadWrite) {
                warn!(name = io.name(), error = %e, "reopen for writing refused");
                return Err(FileError::WritePermission { name: io.name().to_owned() });
            }
            seek_to(io, position)?;
            self.state = FileState::OpenReadWrite;
            debug!(name = io.name(), "reopened for writing");
        }
        Ok(io)
    }

    /// Read up to `length` bytes at the current position.
    ///
    /// Short at end of file; empty on error or when not open.
    pub fn read_block(&mut self, length: usize) -> Vec<u8> {
        let Some(io) = self.readable_io() else {
            return Vec::new();
        };
        io.read(length).unwrap_or_else(|e| {
            debug!(error = %e, "read failed");
            Vec::new()
        })
    }

    /// Write `data` at the current position, upgrading to read-write first
    pub fn write_block(&mut self, data: &[u8]) -> FileResult<()> {
        self.writable_io()?.write(data)?;
        Ok(())
    }

    fn limits(&self) -> SearchLimits {
        SearchLimits::default().with_max_scan_bytes(self.max_scan_bytes)
    }

    /// Offset of the first `pattern` at or after `from`.
    ///
    /// With `before` set the search gives up once that delimiter shows up
    /// ahead of any match, e.g. a tag header ahead of the first sync frame.
    /// `pattern` and `before` may not exceed [`buffer_size`](Self::buffer_size).
    pub fn find(&mut self, pattern: &[u8], from: u64, before: Option<&[u8]>) -> Option<u64> {
        let limits = self.limits();
        let io = self.readable_io()?;
        search::find(io, pattern, from, before, limits)
            .unwrap_or_else(search_failed)
    }

    /// Offset of the last `pattern` ending at or before `from`, searching
    /// toward the start. `None` or `Some(0)` start at the end of the file.
    pub fn rfind(
        &mut self,
        pattern: &[u8],
        from: Option<u64>,
        before: Option<&[u8]>,
    ) -> Option<u64> {
        let limits = self.limits();
        let io = self.readable_io()?;
        search::rfind(io, pattern, from, before, limits)
            .unwrap_or_else(search_failed)
    }

    /// Replace `replace` bytes at `start` with `data`.
    ///
    /// Rewrites everything after the replaced range, so cost grows with the
    /// distance to the end of the file.
    pub fn insert(&mut self, data: &[u8], start: u64, replace: u64) -> FileResult<()> {
        let io = self.writable_io()?;
        splice::splice(io, data, start, replace, SPLICE_CHUNK_SIZE)
    }

    /// Remove `length` bytes at `start`
    pub fn remove_block(&mut self, start: u64, length: u64) -> FileResult<()> {
        let io = self.writable_io()?;
        splice::remove(io, start, length, SPLICE_CHUNK_SIZE)
    }

    /// Move to `offset` relative to `anchor`; the target must lie in
    /// `[0, length]`.
    pub fn seek(&mut self, offset: i64, anchor: Position) -> FileResult<u64> {
        let io = self.readable_io().ok_or(FileError::InvalidState)?;
        let length = io.length()?;
        let base = match anchor {
            Position::Beginning => 0,
            Position::Current => io.tell(),
            Position::End => length,
        };

        let target = i64::try_from(base)
            .ok()
            .and_then(|b| b.checked_add(offset))
            .and_then(|t| u64::try_from(t).ok())
            .filter(|t| *t <= length)
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("seek {offset} from {anchor:?} leaves a file of {length} bytes"),
                )
            })?;

        seek_to(io, target)?;
        Ok(target)
    }

    /// Reset the backend's end-of-file and error latches
    pub fn clear(&mut self) {
        if let Some(io) = self.readable_io() {
            io.clear();
        }
    }

    /// Current offset; `0` when not open
    pub fn tell(&self) -> u64 {
        self.io
            .as_ref()
            .filter(|io| io.is_open())
            .map_or(0, |io| io.tell())
    }

    /// File length; `0` when not open or unmeasurable
    pub fn length(&mut self) -> u64 {
        self.readable_io()
            .and_then(|io| io.length().ok())
            .unwrap_or(0)
    }

    /// Cut the file to exactly `length` bytes
    pub fn truncate(&mut self, length: u64) -> FileResult<()> {
        let io = self.writable_io()?;
        let current = io.length()?;
        if length > current {
            return Err(FileError::OutOfRange { start: length, end: length, length: current });
        }
        io.truncate(length)?;
        Ok(())
    }

    /// True if `name` can be opened for reading
    pub fn is_readable(name: &str) -> bool {
        probe(name, OpenMode::ReadOnly)
    }

    /// True if `name` can be opened for writing
    pub fn is_writable(name: &str) -> bool {
        probe(name, OpenMode::ReadWrite)
    }
}

fn search_failed(e: FileError) -> Option<u64> {
    match e {
        FileError::SearchBounds { .. } => warn!(error = %e, "search rejected"),
        _ => debug!(error = %e, "search failed"),
    }
    None
}

fn probe(name: &str, mode: OpenMode) -> bool {
    resolver::resolve(name).open(mode).is_ok()
}
