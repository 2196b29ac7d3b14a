//! Buffered pattern search over a [`FileIo`].
//!
//! Both directions read the file through a fixed-size buffer and keep the
//! last `max(len(pattern), len(before)) - 1` bytes of the previous read so
//! matches straddling two reads are still seen. Needles may not be longer
//! than the buffer.
//!
//! Semantics
//! - `find` reports the lowest match lying entirely in `[from, length)`.
//! - `rfind` reports the highest match lying entirely in `[0, from)`.
//! - A `before` delimiter aborts the search when it starts ahead of the best
//!   pattern match in scan order. Equal starts favor the pattern.
//! - An empty pattern never matches.
//! - `max_scan_bytes` caps the bytes read from the backend per call.
//!
//! Both functions leave the backend position wherever the last read ended.

use memchr::memmem;
use tracing::trace;

use crate::core::{
    error::{FileError, FileResult},
    io::{FileIo, read_exact_at, seek_to},
};

/// Read buffer used by [`TagFile`](crate::core::file::TagFile) searches
pub const BUFFER_SIZE: usize = 1024;

/// Buffer size and scan cap for one search call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchLimits {
    pub buffer_size: usize,
    pub max_scan_bytes: Option<u64>,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            buffer_size: BUFFER_SIZE,
            max_scan_bytes: None,
        }
    }
}

impl SearchLimits {
    pub fn with_max_scan_bytes(mut self, max_scan_bytes: Option<u64>) -> Self {
        self.max_scan_bytes = max_scan_bytes;
        self
    }
}

/// Remaining read allowance for one call
struct ScanBudget(Option<u64>);

impl ScanBudget {
    /// Clamp `want` to the allowance and charge for it
    fn take(&mut self, want: u64) -> usize {
        let granted = match self.0.as_mut() {
            Some(left) => {
                let g = want.min(*left);
                *left -= g;
                g
            }
            None => want,
        };
        granted as usize
    }
}

/// Validate needles; returns the straddle overlap, or `None` for an empty pattern
fn overlap_for(
    pattern: &[u8],
    before: Option<&[u8]>,
    buffer_size: usize,
) -> FileResult<Option<usize>> {
    if pattern.is_empty() {
        return Ok(None);
    }
    let longest = pattern.len().max(before.map_or(0, <[u8]>::len));
    if longest > buffer_size {
        return Err(FileError::SearchBounds { len: longest, buffer: buffer_size });
    }
    Ok(Some(longest - 1))
}

/// Forward search from `from` toward the end of the file.
pub fn find(
    io: &mut dyn FileIo,
    pattern: &[u8],
    from: u64,
    before: Option<&[u8]>,
    limits: SearchLimits,
) -> FileResult<Option<u64>> {
    let before = before.filter(|b| !b.is_empty());
    let Some(overlap) = overlap_for(pattern, before, limits.buffer_size)? else {
        return Ok(None);
    };

    let length = io.length()?;
    if from >= length {
        return Ok(None);
    }

    let finder = memmem::Finder::new(pattern);
    let stop = before.map(|b| memmem::Finder::new(b));
    let stop_len = before.map_or(0, <[u8]>::len) as u64;
    let mut budget = ScanBudget(limits.max_scan_bytes);

    // Bytes [window_start, offset) are buffered in `window`
    let mut window: Vec<u8> = Vec::with_capacity(limits.buffer_size + overlap);
    let mut window_start = from;
    let mut offset = from;
    let mut candidate: Option<u64> = None;

    seek_to(io, from)?;
    while offset < length {
        let want = budget.take((limits.buffer_size as u64).min(length - offset));
        if want == 0 {
            break;
        }
        let chunk = io.read(want)?;
        if chunk.is_empty() {
            break;
        }
        offset += chunk.len() as u64;
        window.extend_from_slice(&chunk);

        if candidate.is_none() {
            candidate = finder
                .find(&window)
                .map(|p| window_start + p as u64);
        }

        if let Some(s) = stop.as_ref().and_then(|s| s.find(&window)) {
            let s = window_start + s as u64;
            let aborts = match candidate {
                Some(c) => s < c,
                // A match starting at or before `s` may still be cut off
                None => s + pattern.len() as u64 <= offset,
            };
            if aborts {
                trace!(delimiter = s, "find aborted at delimiter");
                return Ok(None);
            }
        }

        if let Some(c) = candidate {
            // A longer delimiter starting ahead of `c` may still be cut off
            if stop.is_none() || c + stop_len <= offset + 1 {
                return Ok(Some(c));
            }
        }

        // Keep only the straddle region
        let drop_n = window.len() - overlap.min(window.len());
        window.drain(..drop_n);
        window_start += drop_n as u64;
    }

    Ok(candidate)
}

/// Backward search from `from` (end of file for `None` or `Some(0)`) toward
/// the beginning.
pub fn rfind(
    io: &mut dyn FileIo,
    pattern: &[u8],
    from: Option<u64>,
    before: Option<&[u8]>,
    limits: SearchLimits,
) -> FileResult<Option<u64>> {
    let before = before.filter(|b| !b.is_empty());
    let Some(overlap) = overlap_for(pattern, before, limits.buffer_size)? else {
        return Ok(None);
    };

    let length = io.length()?;
    let end = match from {
        None | Some(0) => length,
        Some(f) => f.min(length),
    };

    let finder = memmem::FinderRev::new(pattern);
    let stop = before.map(|b| memmem::FinderRev::new(b));
    let mut budget = ScanBudget(limits.max_scan_bytes);

    // `window` holds [window_start, window_start + window.len())
    let mut window: Vec<u8> = Vec::with_capacity(limits.buffer_size + overlap);
    let mut window_start = end;

    while window_start > 0 {
        let want = budget.take((limits.buffer_size as u64).min(window_start));
        if want == 0 {
            break;
        }
        let start = window_start - want as u64;
        let mut chunk = read_exact_at(io, start, want)?;
        chunk.extend_from_slice(&window);
        window = chunk;
        window_start = start;

        let hit = finder.rfind(&window).map(|p| window_start + p as u64);
        if let Some(s) = stop.as_ref().and_then(|s| s.rfind(&window)) {
            let s = window_start + s as u64;
            if hit.is_none_or(|p| s > p) {
                trace!(delimiter = s, "rfind aborted at delimiter");
                return Ok(None);
            }
        }
        if hit.is_some() {
            return Ok(hit);
        }

        window.truncate(overlap.min(window.len()));
    }

    Ok(None)
}
