//! Tracing subscriber for the `tsplice` binary.
//!
//! `RUST_LOG` wins; otherwise the configured level applies. Output goes to
//! stderr so command results on stdout stay pipeable.

use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber. Safe to call more than once.
pub fn init(default_level: &str, quiet: bool) {
    let fallback = if quiet { "error" } else { default_level };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
