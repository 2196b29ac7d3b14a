//! **tagsplice** - Low-level file editing core for audio tag readers and writers
//!
//! Locates, reads and surgically rewrites byte ranges inside arbitrarily large
//! media files without loading them into memory. Buffered pattern search,
//! chunked splice editing and a pluggable backend resolver chain.

/// Command-line interface with clap integration
pub mod cli;

/// Command handlers behind the `tsplice` subcommands
pub mod cli_ext {
    /// find / rfind / read / insert / remove / probe
    pub mod edit_cmd;
}

/// Shell completion generation
pub mod completion;

/// File editing core - backend capability, search, splice and the file handle
pub mod core {
    /// Error taxonomy shared by every core operation
    pub mod error;
    pub use error::{FileError, FileResult};

    /// Backend capability trait plus local-file and in-memory backends
    pub mod io;
    pub use io::{FileIo, LocalFileIo, MemoryIo, OpenMode, Position, SharedBuffer};

    /// Process-wide, newest-first backend resolver chain
    pub mod resolver;
    pub use resolver::{FileIoResolver, add_resolver, remove_resolver};

    /// Forward/backward buffered search with delimiter and scan cap
    pub mod search;
    pub use search::{BUFFER_SIZE, SearchLimits};

    /// Chunked insert/remove of byte ranges
    pub mod splice;
    pub use splice::{SPLICE_CHUNK_SIZE, SplicePlan};

    /// File handle state machine tying the above together
    pub mod file;
    pub use file::{FileState, TagFile};

    /// Tag / audio-properties / save capability for format variants
    pub mod format;
    pub use format::AudioFile;
}

/// Infrastructure - Configuration and logging
pub mod infra {
    /// Configuration management with TOML support and env overrides
    pub mod config;
    pub use config::{Config, init as config_init, load_config};

    /// Tracing subscriber setup for the binary
    pub mod logging;
    pub use logging::init as logging_init;
}

// Strategic re-exports for format layers
pub use cli::{AppContext, Cli, Commands};
pub use core::{
    AudioFile, FileError, FileIo, FileIoResolver, FileResult, FileState, Position, TagFile,
    add_resolver, remove_resolver,
};
pub use infra::{Config, load_config, logging_init};
