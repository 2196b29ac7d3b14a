//! Backend capability: the byte-addressable resource a [`TagFile`] edits.
//!
//! The core never assumes a filesystem. It talks to a [`FileIo`] which can be
//! opened, read, written, sought within, measured and truncated. Two backends
//! ship with the crate:
//!
//! - [`LocalFileIo`] over `std::fs::File`, the resolver chain fallback
//! - [`MemoryIo`] over a shared in-memory buffer, for virtual sources
//!
//! [`TagFile`]: crate::core::file::TagFile

use std::{
    fmt,
    fs::{File, OpenOptions},
    io::{self, Read, Seek, SeekFrom, Write},
    path::PathBuf,
    sync::{Arc, Mutex, MutexGuard},
};

/// Seek origin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Position {
    #[default]
    Beginning,
    Current,
    End,
}

impl Position {
    fn to_seek_from(self, offset: i64) -> io::Result<SeekFrom> {
        match self {
            Position::Beginning => u64::try_from(offset)
                .map(SeekFrom::Start)
                .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "negative absolute seek")),
            Position::Current => Ok(SeekFrom::Current(offset)),
            Position::End => Ok(SeekFrom::End(offset)),
        }
    }
}

/// Access mode requested when (re)opening a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    ReadOnly,
    ReadWrite,
}

/// Opened byte-addressable resource.
///
/// `open` may be called again on an already open backend to switch modes; a
/// failed reopen must leave the previous handle usable.
pub trait FileIo: Send {
    /// Name the backend was created for
    fn name(&self) -> &str;

    fn open(&mut self, mode: OpenMode) -> io::Result<()>;

    fn is_open(&self) -> bool;

    /// True when the current handle cannot be written through
    fn is_read_only(&self) -> bool;

    /// Read up to `max_len` bytes at the current position
    fn read(&mut self, max_len: usize) -> io::Result<Vec<u8>>;

    /// Write all of `data` at the current position
    fn write(&mut self, data: &[u8]) -> io::Result<()>;

    /// Move the position and return the new absolute offset
    fn seek(&mut self, offset: i64, anchor: Position) -> io::Result<u64>;

    fn tell(&self) -> u64;

    fn length(&mut self) -> io::Result<u64>;

    fn truncate(&mut self, length: u64) -> io::Result<()>;

    /// Reset end-of-file and error latches
    fn clear(&mut self);
}

/// Seek to an absolute offset
pub(crate) fn seek_to(io: &mut dyn FileIo, offset: u64) -> io::Result<()> {
    let offset = i64::try_from(offset)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "offset exceeds i64"))?;
    io.seek(offset, Position::Beginning)?;
    Ok(())
}

/// Read exactly `len` bytes at `offset`, looping over short reads
pub(crate) fn read_exact_at(io: &mut dyn FileIo, offset: u64, len: usize) -> io::Result<Vec<u8>> {
    seek_to(io, offset)?;
    let mut out = io.read(len)?;
    while out.len() < len {
        let more = io.read(len - out.len())?;
        if more.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("short read at offset {offset}"),
            ));
        }
        out.extend_from_slice(&more);
    }
    Ok(out)
}

fn not_open(name: &str) -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, format!("{name} is not open"))
}

fn read_only(name: &str) -> io::Error {
    io::Error::new(io::ErrorKind::PermissionDenied, format!("{name} is open read-only"))
}

/// Local filesystem backend
pub struct LocalFileIo {
    name: String,
    path: PathBuf,
    file: Option<File>,
    read_only: bool,
    position: u64,
    eof: bool,
}

impl LocalFileIo {
    /// Create an unopened backend for `name`
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            path: PathBuf::from(&name),
            name,
            file: None,
            read_only: true,
            position: 0,
            eof: false,
        }
    }

    /// True once a short read hit the end of the file
    pub fn at_eof(&self) -> bool {
        self.eof
    }

    fn file(&mut self) -> io::Result<&mut File> {
        match self.file.as_mut() {
            Some(f) => Ok(f),
            None => Err(not_open(&self.name)),
        }
    }
}

impl fmt::Debug for LocalFileIo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalFileIo")
            .field("path", &self.path)
            .field("open", &self.file.is_some())
            .field("read_only", &self.read_only)
            .field("position", &self.position)
            .finish()
    }
}

impl FileIo for LocalFileIo {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&mut self, mode: OpenMode) -> io::Result<()> {
        // Open the new handle first so a refused upgrade keeps the old one
        let file = match mode {
            OpenMode::ReadOnly => File::open(&self.path)?,
            OpenMode::ReadWrite => OpenOptions::new()
                .read(true)
                .write(true)
                .open(&self.path)?,
        };

        self.file = Some(file);
        self.read_only = mode == OpenMode::ReadOnly;
        self.position = 0;
        self.eof = false;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.file.is_some()
    }

    fn is_read_only(&self) -> bool {
        self.file.is_none() || self.read_only
    }

    fn read(&mut self, max_len: usize) -> io::Result<Vec<u8>> {
        let position = self.position;
        let file = self.file()?;

        // Capacity bounded by the bytes left in the file
        let remaining = file.metadata()?.len().saturating_sub(position);
        let capacity = usize::try_from(remaining).map_or(max_len, |r| r.min(max_len));
        let mut buf = Vec::with_capacity(capacity);
        Read::by_ref(file)
            .take(u64::try_from(max_len).unwrap_or(u64::MAX))
            .read_to_end(&mut buf)?;

        self.position += buf.len() as u64;
        if buf.len() < max_len {
            self.eof = true;
        }
        Ok(buf)
    }

    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        if self.read_only {
            return Err(read_only(&self.name));
        }
        self.file()?.write_all(data)?;
        self.position += data.len() as u64;
        Ok(())
    }

    fn seek(&mut self, offset: i64, anchor: Position) -> io::Result<u64> {
        let from = anchor.to_seek_from(offset)?;
        let pos = self.file()?.seek(from)?;
        self.position = pos;
        Ok(pos)
    }

    fn tell(&self) -> u64 {
        self.position
    }

    fn length(&mut self) -> io::Result<u64> {
        Ok(self.file()?.metadata()?.len())
    }

    fn truncate(&mut self, length: u64) -> io::Result<()> {
        if self.read_only {
            return Err(read_only(&self.name));
        }
        let position = self.position;
        let file = self.file()?;
        file.set_len(length)?;

        // Keep the cursor inside the file
        if position > length {
            file.seek(SeekFrom::Start(length))?;
            self.position = length;
        }
        Ok(())
    }

    fn clear(&mut self) {
        self.eof = false;
    }
}

/// Shared byte buffer behind one or more [`MemoryIo`] handles
pub type SharedBuffer = Arc<Mutex<Vec<u8>>>;

/// In-memory backend.
///
/// The bytes live in a [`SharedBuffer`] so the creator can inspect them after
/// the owning handle is gone. A read-only medium refuses `ReadWrite` opens,
/// mirroring a file without write permission.
#[derive(Debug)]
pub struct MemoryIo {
    name: String,
    buffer: SharedBuffer,
    open: bool,
    read_only: bool,
    writable_medium: bool,
    position: u64,
}

impl MemoryIo {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self::with_buffer(name, Arc::new(Mutex::new(bytes.into())))
    }

    pub fn with_buffer(name: impl Into<String>, buffer: SharedBuffer) -> Self {
        Self {
            name: name.into(),
            buffer,
            open: false,
            read_only: true,
            writable_medium: true,
            position: 0,
        }
    }

    /// Refuse every `ReadWrite` open
    pub fn read_only_medium(mut self) -> Self {
        self.writable_medium = false;
        self
    }

    /// Handle to the underlying bytes
    pub fn buffer(&self) -> SharedBuffer {
        Arc::clone(&self.buffer)
    }

    fn bytes(&self) -> io::Result<MutexGuard<'_, Vec<u8>>> {
        if !self.open {
            return Err(not_open(&self.name));
        }
        self.buffer
            .lock()
            .map_err(|_| io::Error::other(format!("{} buffer poisoned", self.name)))
    }
}

impl FileIo for MemoryIo {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&mut self, mode: OpenMode) -> io::Result<()> {
        if mode == OpenMode::ReadWrite && !self.writable_medium {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("{} is on a read-only medium", self.name),
            ));
        }
        self.open = true;
        self.read_only = mode == OpenMode::ReadOnly;
        self.position = 0;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn is_read_only(&self) -> bool {
        !self.open || self.read_only
    }

    fn read(&mut self, max_len: usize) -> io::Result<Vec<u8>> {
        let position = self.position;
        let bytes = self.bytes()?;
        let start = (position as usize).min(bytes.len());
        let end = start.saturating_add(max_len).min(bytes.len());
        let out = bytes[start..end].to_vec();
        drop(bytes);

        self.position += out.len() as u64;
        Ok(out)
    }

    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        if self.read_only {
            return Err(read_only(&self.name));
        }
        let start = self.position as usize;
        let mut bytes = self.bytes()?;
        let end = start + data.len();

        // Writing past the end zero-fills the gap, like a sparse file
        if bytes.len() < end {
            bytes.resize(end, 0);
        }
        bytes[start..end].copy_from_slice(data);
        drop(bytes);

        self.position = end as u64;
        Ok(())
    }

    fn seek(&mut self, offset: i64, anchor: Position) -> io::Result<u64> {
        let base = match anchor {
            Position::Beginning => 0,
            Position::Current => self.position as i64,
            Position::End => self.bytes()?.len() as i64,
        };
        let target = base
            .checked_add(offset)
            .filter(|t| *t >= 0)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "seek before start"))?;

        self.position = target as u64;
        Ok(self.position)
    }

    fn tell(&self) -> u64 {
        self.position
    }

    fn length(&mut self) -> io::Result<u64> {
        Ok(self.bytes()?.len() as u64)
    }

    fn truncate(&mut self, length: u64) -> io::Result<()> {
        if self.read_only {
            return Err(read_only(&self.name));
        }
        self.bytes()?.truncate(length as usize);
        self.position = self.position.min(length);
        Ok(())
    }

    fn clear(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn local_reopen_failure_keeps_existing_handle() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("missing.bin");
        let mut io = LocalFileIo::new(missing.to_string_lossy());

        assert!(io.open(OpenMode::ReadOnly).is_err());
        assert!(!io.is_open());

        let path = tmp.path().join("a.bin");
        fs::write(&path, b"abcdef").unwrap();
        let mut io = LocalFileIo::new(path.to_string_lossy());
        io.open(OpenMode::ReadOnly).unwrap();
        assert!(io.is_read_only());

        fs::remove_file(&path).unwrap();
        assert!(io.open(OpenMode::ReadWrite).is_err());
        assert!(io.is_open(), "old handle must survive a refused upgrade");
    }

    #[test]
    fn local_read_write_seek_truncate() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("b.bin");
        fs::write(&path, b"0123456789").unwrap();

        let mut io = LocalFileIo::new(path.to_string_lossy());
        io.open(OpenMode::ReadWrite).unwrap();

        assert_eq!(io.seek(3, Position::Beginning).unwrap(), 3);
        assert_eq!(io.read(4).unwrap(), b"3456");
        assert_eq!(io.tell(), 7);

        io.seek(-2, Position::End).unwrap();
        assert_eq!(io.read(10).unwrap(), b"89");
        assert!(io.at_eof());

        // Oversized requests are clamped to what the file holds
        io.seek(6, Position::Beginning).unwrap();
        assert_eq!(io.read(usize::MAX).unwrap(), b"6789");
        io.clear();
        assert!(!io.at_eof());

        io.seek(0, Position::Beginning).unwrap();
        io.write(b"AB").unwrap();
        io.truncate(5).unwrap();
        assert_eq!(io.length().unwrap(), 5);
        assert_eq!(fs::read(&path).unwrap(), b"AB234");
    }

    #[test]
    fn memory_read_only_medium_refuses_write_mode() {
        let mut io = MemoryIo::new("mem", b"xyz".to_vec()).read_only_medium();
        assert!(io.open(OpenMode::ReadWrite).is_err());
        io.open(OpenMode::ReadOnly).unwrap();
        assert!(io.write(b"q").is_err());
        assert_eq!(io.read(8).unwrap(), b"xyz");
    }

    #[test]
    fn memory_buffer_outlives_handle() {
        let mut io = MemoryIo::new("mem", b"hello".to_vec());
        let shared = io.buffer();
        io.open(OpenMode::ReadWrite).unwrap();
        io.seek(-1, Position::End).unwrap();
        io.write(b"O!").unwrap();
        drop(io);

        assert_eq!(shared.lock().unwrap().as_slice(), b"hellO!");
    }

    #[test]
    fn memory_seek_before_start_is_rejected() {
        let mut io = MemoryIo::new("mem", b"abc".to_vec());
        io.open(OpenMode::ReadOnly).unwrap();
        assert!(io.seek(-4, Position::End).is_err());
        assert_eq!(io.tell(), 0);
    }
}
