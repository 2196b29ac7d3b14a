use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shared application context for global flags
#[derive(Clone, Debug)]
pub struct AppContext {
    pub quiet: bool,    // global --quiet
    pub no_color: bool, // global --no-color
    pub dry_run: bool,  // global --dry-run
}

#[derive(Parser)]
#[command(name = "tsplice")]
#[command(about = "Search and splice byte ranges inside large media files")]
#[command(version, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Only print results, no status lines or logs
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Show the splice plan without modifying files
    #[arg(long, global = true)]
    pub dry_run: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the offset of the first match at or after --from
    Find(SearchArgs),

    /// Print the offset of the last match ending at or before --from
    Rfind(SearchArgs),

    /// Dump bytes starting at an offset
    Read(ReadArgs),

    /// Insert bytes at an offset, optionally replacing existing ones
    Insert(InsertArgs),

    /// Remove a byte range
    Remove(RemoveArgs),

    /// Report whether a file can be opened for reading and writing
    Probe(ProbeArgs),

    /// Initialize a tagsplice.toml config file
    Init(InitArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Byte string argument: plain text, or `hex:` followed by hex digits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByteArg(pub Vec<u8>);

impl std::str::FromStr for ByteArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.strip_prefix("hex:") {
            Some(digits) => hex::decode(digits)
                .map(ByteArg)
                .map_err(|e| format!("invalid hex: {e}")),
            None => Ok(ByteArg(s.as_bytes().to_vec())),
        }
    }
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// File to search
    pub file: String,

    /// Pattern to look for (text or hex:..)
    pub pattern: ByteArg,

    /// Start offset (for rfind: end offset, default end of file)
    #[arg(long)]
    pub from: Option<u64>,

    /// Give up once this delimiter is seen ahead of a match
    #[arg(long)]
    pub before: Option<ByteArg>,

    /// Maximum bytes to scan (overrides config)
    #[arg(long)]
    pub max_scan: Option<u64>,
}

#[derive(Debug, Args)]
pub struct ReadArgs {
    /// File to read
    pub file: String,

    /// Start offset
    #[arg(long, default_value = "0")]
    pub offset: u64,

    /// Number of bytes to read
    #[arg(long)]
    pub length: usize,

    /// Print as hex instead of escaped text
    #[arg(long)]
    pub hex: bool,
}

#[derive(Debug, Args)]
pub struct InsertArgs {
    /// File to edit
    pub file: String,

    /// Bytes to insert (text or hex:..)
    pub data: ByteArg,

    /// Insertion offset
    #[arg(long)]
    pub at: u64,

    /// Number of existing bytes to replace
    #[arg(long, default_value = "0")]
    pub replace: u64,
}

#[derive(Debug, Args)]
pub struct RemoveArgs {
    /// File to edit
    pub file: String,

    /// First byte to remove
    #[arg(long)]
    pub at: u64,

    /// Number of bytes to remove
    #[arg(long)]
    pub length: u64,
}

#[derive(Debug, Args)]
pub struct ProbeArgs {
    /// File to probe
    pub file: String,
}

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Directory to initialize config in
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Overwrite existing config file
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,

    /// Output directory; if omitted and --stdout not set, prints error
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Print completion script to stdout instead of a file
    #[arg(long)]
    pub stdout: bool,
}
