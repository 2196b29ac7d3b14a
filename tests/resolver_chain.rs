//! Backend selection through the process-wide resolver chain.
//!
//! Every resolver here claims only its own URL scheme so tests running in
//! parallel never see each other's entries.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use tagsplice::core::{FileIo, FileIoResolver, MemoryIo, SharedBuffer};
use tagsplice::{FileState, TagFile, add_resolver, remove_resolver};

mod util;
use util::fixture;

/// Serves `scheme://key` names from an in-memory map
struct MemoryStore
{
    scheme: &'static str,
    label: &'static [u8],
    files: Mutex<HashMap<String, SharedBuffer>>,
    read_only: bool,
}

impl MemoryStore
{
    fn new(scheme: &'static str, label: &'static [u8]) -> Self
    {
        Self { scheme, label, files: Mutex::new(HashMap::new()), read_only: false }
    }

    fn read_only(mut self) -> Self
    {
        self.read_only = true;
        self
    }

    fn put(&self, key: &str, bytes: &[u8]) -> SharedBuffer
    {
        let buf: SharedBuffer = Arc::new(Mutex::new(bytes.to_vec()));
        self.files
            .lock()
            .unwrap()
            .insert(key.to_string(), Arc::clone(&buf));
        buf
    }
}

impl FileIoResolver for MemoryStore
{
    fn create_file_io(&self, name: &str) -> Option<Box<dyn FileIo>>
    {
        let key = name.strip_prefix(self.scheme)?;
        let buf = self
            .files
            .lock()
            .ok()?
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(self.label.to_vec())))
            .clone();

        let io = MemoryIo::with_buffer(name, buf);
        let io: Box<dyn FileIo> =
            if self.read_only { Box::new(io.read_only_medium()) } else { Box::new(io) };
        Some(io)
    }
}

#[test]
fn most_recent_resolver_is_tried_first()
{
    let a = add_resolver(Arc::new(MemoryStore::new("stack://", b"from-a")));
    let b = add_resolver(Arc::new(MemoryStore::new("stack://", b"from-b")));

    let mut file = TagFile::from_name("stack://song");
    assert_eq!(file.read_block(16), b"from-b");

    remove_resolver(&b);
    let mut file = TagFile::from_name("stack://other");
    assert_eq!(file.read_block(16), b"from-a");

    remove_resolver(&a);
    remove_resolver(&a);
    let file = TagFile::from_name("stack://song");
    assert_eq!(file.state(), FileState::Invalid, "no resolver left; local path does not exist");
}

#[test]
fn edits_land_in_the_resolved_backend()
{
    let store = add_resolver(Arc::new(MemoryStore::new("virt://", b"")));
    let buf = store.put("track", b"AUDIO-FRAMES<TAG>old</TAG>");

    let mut file = TagFile::from_name("virt://track");
    assert_eq!(file.state(), FileState::OpenReadWrite);
    let start = file.rfind(b"<TAG>", None, None).unwrap();
    let end = file.find(b"</TAG>", start, None).unwrap() + 6;
    file.insert(b"<TAG>brand new</TAG>", start, end - start)
        .unwrap();

    assert_eq!(buf.lock().unwrap().as_slice(), b"AUDIO-FRAMES<TAG>brand new</TAG>");
    remove_resolver(&store);
}

#[test]
fn read_only_backend_refuses_edits_without_touching_bytes()
{
    let store = add_resolver(Arc::new(MemoryStore::new("ro://", b"").read_only()));
    let buf = store.put("disc", b"0123456789");

    let mut file = TagFile::from_name("ro://disc");
    assert_eq!(file.state(), FileState::OpenReadOnly);
    assert!(file.read_only());
    assert!(file.insert(b"abc", 2, 0).is_err());
    assert!(file.remove_block(0, 5).is_err());
    assert_eq!(buf.lock().unwrap().as_slice(), b"0123456789");

    assert!(TagFile::is_readable("ro://disc"));
    assert!(!TagFile::is_writable("ro://disc"));
    remove_resolver(&store);
}

#[test]
fn unclaimed_names_use_the_local_filesystem()
{
    let store = add_resolver(Arc::new(MemoryStore::new("claimed://", b"memory")));
    let (_tmp, path) = fixture("local.mp3", b"on disk");

    let mut file = TagFile::from_name(&path);
    assert_eq!(file.read_block(16), b"on disk");
    remove_resolver(&store);
}
