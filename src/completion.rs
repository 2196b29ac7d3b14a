//! Shell completions for `tsplice`, rendered by clap_complete.

use std::{fs, io::Write, path::PathBuf};

use anyhow::{Context, Result, bail};
use clap::CommandFactory;
use clap_complete::{Shell as CompletionShell, generate, generate_to};
use tracing::debug;

use crate::cli::{Cli, CompletionsArgs, Shell};

const BIN_NAME: &str = "tsplice";

impl From<Shell> for CompletionShell {
    fn from(shell: Shell) -> Self {
        match shell {
            Shell::Bash => CompletionShell::Bash,
            Shell::Zsh => CompletionShell::Zsh,
            Shell::Fish => CompletionShell::Fish,
            Shell::PowerShell => CompletionShell::PowerShell,
            Shell::Elvish => CompletionShell::Elvish,
        }
    }
}

/// Completion script for `shell` as bytes
pub fn render(shell: Shell) -> Vec<u8> {
    let mut out = Vec::new();
    generate(CompletionShell::from(shell), &mut Cli::command(), BIN_NAME, &mut out);
    out
}

/// Write the script under `dir`, returning the file path
fn write_into(shell: Shell, dir: PathBuf) -> Result<PathBuf> {
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    let path = generate_to(CompletionShell::from(shell), &mut Cli::command(), BIN_NAME, &dir)
        .context("generate completion file")?;
    debug!(path = %path.display(), "completion written");
    Ok(path)
}

pub fn run(args: CompletionsArgs) -> Result<()> {
    match (args.stdout, args.out_dir) {
        (true, _) => {
            std::io::stdout()
                .write_all(&render(args.shell))
                .context("write completion to stdout")?;
        }
        (false, Some(dir)) => {
            let path = write_into(args.shell, dir)?;
            eprintln!("Wrote completion to {}", path.display());
        }
        (false, None) => bail!("--out-dir is required unless --stdout is set"),
    }
    Ok(())
}
