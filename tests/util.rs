//! Shared test utilities for integration tests
//!
//! Provides media-like fixtures on disk and helpers to read them back.

#![allow(dead_code)]

use assert_fs::prelude::*;

/// Write `bytes` into a fresh temp dir as `name`; returns the dir and path string
pub fn fixture(name: &str, bytes: &[u8]) -> (assert_fs::TempDir, String)
{
    let tmp = assert_fs::TempDir::new().expect("tempdir");
    let child = tmp.child(name);
    child
        .write_binary(bytes)
        .expect("write fixture");
    let path = child
        .path()
        .to_string_lossy()
        .into_owned();
    (tmp, path)
}

/// Deterministic pseudo-audio payload of `len` bytes
///
/// Avoids ASCII letters so tag markers never match by accident.
pub fn noise(len: usize) -> Vec<u8>
{
    (0..len)
        .map(|i| 0x80 | ((i * 31 + i / 7) % 0x7f) as u8)
        .collect()
}

/// Current on-disk contents
pub fn contents(path: &str) -> Vec<u8>
{
    std::fs::read(path).expect("read fixture")
}
