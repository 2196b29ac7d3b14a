//! Chunked splice of byte ranges inside a [`FileIo`].
//!
//! `splice(io, data, start, replace)` replaces `[start, start + replace)` with
//! `data`, moving the tail of the file by `len(data) - replace` bytes. Only
//! the tail after the replaced range is rewritten, one chunk at a time, so
//! peak memory is one chunk plus `data` regardless of file size.
//!
//! Write order
//! - grow: tail relocated back-to-front, then `data` written
//! - shrink: `data` written, tail shifted front-to-back, then truncated
//! - same size: `data` overwrites in place
//!
//! `data` is caller memory and can never alias the shift source, so no
//! ordering above overwrites it. The caller must have the backend open for
//! writing; see [`TagFile::insert`](crate::core::file::TagFile::insert).

use std::io;

use bstr::ByteSlice;
use tracing::{debug, instrument};

use crate::core::{
    error::{FileError, FileResult},
    io::{FileIo, read_exact_at, seek_to},
};

/// Bytes moved per read/write round trip
pub const SPLICE_CHUNK_SIZE: usize = 64 * 1024;

/// Validated splice geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplicePlan {
    pub start: u64,
    pub replace: u64,
    pub inserted: u64,
    pub old_length: u64,
}

impl SplicePlan {
    /// Check `[start, start + replace)` against a file of `old_length` bytes
    pub fn new(start: u64, replace: u64, inserted: u64, old_length: u64) -> FileResult<Self> {
        start
            .checked_add(replace)
            .filter(|end| *end <= old_length)
            .ok_or(FileError::OutOfRange {
                start,
                end: start.saturating_add(replace),
                length: old_length,
            })?;
        Ok(Self { start, replace, inserted, old_length })
    }

    /// First byte after the replaced range
    pub fn tail_start(&self) -> u64 {
        self.start + self.replace
    }

    pub fn tail_len(&self) -> u64 {
        self.old_length - self.tail_start()
    }

    pub fn new_length(&self) -> u64 {
        self.old_length - self.replace + self.inserted
    }
}

/// Replace `replace` bytes at `start` with `data`.
#[instrument(level = "debug", skip(io, data), fields(name = io.name(), inserted = data.len()))]
pub fn splice(
    io: &mut dyn FileIo,
    data: &[u8],
    start: u64,
    replace: u64,
    chunk_size: usize,
) -> FileResult<()> {
    let chunk_size = chunk_size.max(1);
    let plan = SplicePlan::new(start, replace, data.len() as u64, io.length()?)?;
    debug!(
        preview = %data[..data.len().min(16)].as_bstr(),
        tail = plan.tail_len(),
        new_length = plan.new_length(),
        "splice planned"
    );

    if plan.inserted == plan.replace {
        seek_to(io, start)?;
        io.write(data)?;
        return Ok(());
    }

    if plan.inserted > plan.replace {
        shift_tail_back(io, &plan, plan.inserted - plan.replace, chunk_size)?;
        seek_to(io, start)?;
        io.write(data)?;
    } else {
        seek_to(io, start)?;
        io.write(data)?;
        shift_tail_forward(io, &plan, plan.replace - plan.inserted, chunk_size)?;
        io.truncate(plan.new_length())
            .map_err(|source| FileError::PartialShift { offset: plan.old_length, source })?;
    }

    Ok(())
}

/// Remove `length` bytes at `start`
pub fn remove(io: &mut dyn FileIo, start: u64, length: u64, chunk_size: usize) -> FileResult<()> {
    splice(io, &[], start, length, chunk_size)
}

fn move_chunk(io: &mut dyn FileIo, from: u64, to: u64, len: usize) -> io::Result<()> {
    let buf = read_exact_at(io, from, len)?;
    seek_to(io, to)?;
    io.write(&buf)
}

/// Move the tail `delta` bytes toward the end, last chunk first
fn shift_tail_back(
    io: &mut dyn FileIo,
    plan: &SplicePlan,
    delta: u64,
    chunk_size: usize,
) -> FileResult<()> {
    let mut remaining = plan.tail_len();
    while remaining > 0 {
        let n = remaining.min(chunk_size as u64);
        let src = plan.tail_start() + remaining - n;
        move_chunk(io, src, src + delta, n as usize)
            .map_err(|source| FileError::PartialShift { offset: src, source })?;
        remaining -= n;
    }
    Ok(())
}

/// Move the tail `delta` bytes toward the start, first chunk first
fn shift_tail_forward(
    io: &mut dyn FileIo,
    plan: &SplicePlan,
    delta: u64,
    chunk_size: usize,
) -> FileResult<()> {
    let mut src = plan.tail_start();
    while src < plan.old_length {
        let n = (plan.old_length - src).min(chunk_size as u64);
        move_chunk(io, src, src - delta, n as usize)
            .map_err(|source| FileError::PartialShift { offset: src, source })?;
        src += n;
    }
    Ok(())
}
