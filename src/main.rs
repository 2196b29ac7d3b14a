use anyhow::Result;
use clap::Parser;
use tagsplice::cli::{AppContext, Cli, Commands};
use tagsplice::cli_ext::edit_cmd;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Build a context once, pass everywhere
    let ctx = AppContext {
        quiet: cli.quiet,
        no_color: cli.no_color,
        dry_run: cli.dry_run,
    };

    let cfg = tagsplice::load_config()?;
    tagsplice::infra::logging_init(&cfg.log_level, ctx.quiet);

    match cli.command {
        Commands::Find(args) => edit_cmd::find_run(args, &ctx, &cfg),
        Commands::Rfind(args) => edit_cmd::rfind_run(args, &ctx, &cfg),
        Commands::Read(args) => edit_cmd::read_run(args, &ctx),
        Commands::Insert(args) => edit_cmd::insert_run(args, &ctx),
        Commands::Remove(args) => edit_cmd::remove_run(args, &ctx),
        Commands::Probe(args) => edit_cmd::probe_run(args, &ctx),
        Commands::Init(args) => tagsplice::infra::config_init(args, &ctx),
        Commands::Completions(args) => tagsplice::completion::run(args),
    }
}
