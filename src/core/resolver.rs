//! Process-wide chain of backend resolvers.
//!
//! Calling code extends storage beyond the local filesystem by registering a
//! [`FileIoResolver`]. The most recently added resolver is asked first; the
//! first backend returned wins and becomes owned by the opening handle. When
//! no resolver claims a name the local filesystem backend is used.
//!
//! The chain keeps `Weak` references only. A registrant owns its resolver and
//! dropping the last `Arc` takes it out of service; the chain never drops one.
//!
//! ```
//! use std::sync::Arc;
//! use tagsplice::core::{FileIo, FileIoResolver, MemoryIo, add_resolver, remove_resolver};
//!
//! struct Ram;
//!
//! impl FileIoResolver for Ram {
//!     fn create_file_io(&self, name: &str) -> Option<Box<dyn FileIo>> {
//!         name.starts_with("ram://")
//!             .then(|| Box::new(MemoryIo::new(name, b"ID3".to_vec())) as Box<dyn FileIo>)
//!     }
//! }
//!
//! let ram = add_resolver(Arc::new(Ram));
//! // ... open "ram://clip" through TagFile ...
//! remove_resolver(&ram);
//! ```

use std::{
    ptr,
    sync::{Arc, LazyLock, PoisonError, RwLock, Weak},
};

use tracing::{debug, trace};

use crate::core::io::{FileIo, LocalFileIo};

/// Strategy that may supply a backend for a file name
pub trait FileIoResolver: Send + Sync {
    /// Return a backend for `name`, or `None` to let older resolvers try.
    ///
    /// The backend is returned unopened; the handle opens it.
    fn create_file_io(&self, name: &str) -> Option<Box<dyn FileIo>>;
}

type Chain = Vec<Weak<dyn FileIoResolver>>;

static RESOLVERS: LazyLock<RwLock<Chain>> = LazyLock::new(|| RwLock::new(Vec::new()));

/// Register `resolver` ahead of every existing one and hand it back.
pub fn add_resolver<R>(resolver: Arc<R>) -> Arc<R>
where
    R: FileIoResolver + 'static,
{
    let erased: Arc<dyn FileIoResolver> = resolver.clone();
    let weak = Arc::downgrade(&erased);
    let mut chain = RESOLVERS
        .write()
        .unwrap_or_else(PoisonError::into_inner);

    chain.retain(|w| w.strong_count() > 0);
    chain.push(weak);
    debug!(resolvers = chain.len(), "resolver added");
    resolver
}

/// Unregister `resolver`; absent entries are ignored.
pub fn remove_resolver<R>(resolver: &Arc<R>)
where
    R: FileIoResolver + ?Sized,
{
    let target = Arc::as_ptr(resolver);
    let mut chain = RESOLVERS
        .write()
        .unwrap_or_else(PoisonError::into_inner);

    let before = chain.len();
    chain.retain(|w| w.strong_count() > 0 && !ptr::addr_eq(w.as_ptr(), target));
    debug!(removed = before - chain.len(), "resolver removed");
}

/// Backend for `name`: newest resolver first, local filesystem last.
pub fn resolve(name: &str) -> Box<dyn FileIo> {
    // Snapshot so resolvers may touch the chain themselves
    let live: Vec<Arc<dyn FileIoResolver>> = RESOLVERS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .iter()
        .rev()
        .filter_map(Weak::upgrade)
        .collect();

    for resolver in live {
        if let Some(io) = resolver.create_file_io(name) {
            trace!(name, backend = io.name(), "resolver matched");
            return io;
        }
    }

    trace!(name, "falling back to local file");
    Box::new(LocalFileIo::new(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::MemoryIo;

    /// Claims names under `prefix` and tags the backend name with `label`
    struct Tagged {
        prefix: &'static str,
        label: &'static str,
    }

    impl FileIoResolver for Tagged {
        fn create_file_io(&self, name: &str) -> Option<Box<dyn FileIo>> {
            name.starts_with(self.prefix).then(|| {
                Box::new(MemoryIo::new(format!("{}:{name}", self.label), Vec::new()))
                    as Box<dyn FileIo>
            })
        }
    }

    #[test]
    fn newest_resolver_wins_and_removal_restores_order() {
        let a = add_resolver(Arc::new(Tagged { prefix: "order://", label: "A" }));
        let b = add_resolver(Arc::new(Tagged { prefix: "order://", label: "B" }));

        assert_eq!(resolve("order://x").name(), "B:order://x");

        remove_resolver(&b);
        assert_eq!(resolve("order://x").name(), "A:order://x");

        // Idempotent
        remove_resolver(&b);
        assert_eq!(resolve("order://x").name(), "A:order://x");

        remove_resolver(&a);
        assert_eq!(resolve("order://x").name(), "order://x");
    }

    #[test]
    fn unmatched_name_falls_back_to_local_file() {
        let r = add_resolver(Arc::new(Tagged { prefix: "fallback://", label: "F" }));
        assert_eq!(resolve("/tmp/plain.mp3").name(), "/tmp/plain.mp3");
        assert_eq!(resolve("fallback://y").name(), "F:fallback://y");
        remove_resolver(&r);
    }

    #[test]
    fn dropped_resolver_leaves_service() {
        let r = add_resolver(Arc::new(Tagged { prefix: "dropped://", label: "D" }));
        assert_eq!(resolve("dropped://z").name(), "D:dropped://z");
        drop(r);
        assert_eq!(resolve("dropped://z").name(), "dropped://z");
    }

    #[test]
    fn add_returns_the_same_reference() {
        let original = Arc::new(Tagged { prefix: "same://", label: "S" });
        let returned = add_resolver(Arc::clone(&original));
        assert!(Arc::ptr_eq(&original, &returned));
        remove_resolver(&returned);
    }
}
