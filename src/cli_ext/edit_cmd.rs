//! CLI command handlers for search, read and splice operations.
//!
//! Thin wrappers over [`TagFile`]: open through the resolver chain, run one
//! operation, print the outcome.

use anyhow::{Context, Result, bail};
use bstr::ByteSlice;
use owo_colors::OwoColorize;
use tracing::{info, instrument};

use crate::{
    cli::{AppContext, InsertArgs, ProbeArgs, ReadArgs, RemoveArgs, SearchArgs},
    core::{Position, SplicePlan, TagFile},
    infra::Config,
};

/// Open `name` or fail with a readable error
fn open(name: &str) -> Result<TagFile> {
    let file = TagFile::from_name(name);
    if !file.is_open() {
        bail!("could not open {name}");
    }
    Ok(file)
}

fn print_offset(found: Option<u64>, ctx: &AppContext) {
    match found {
        Some(offset) => println!("{offset}"),
        None if ctx.no_color => println!("not found"),
        None => println!("{}", "not found".yellow()),
    }
}

fn search_file(args: &SearchArgs, cfg: &Config) -> Result<TagFile> {
    let mut file = open(&args.file)?;
    file.set_max_scan_bytes(args.max_scan.or(cfg.search.max_scan_bytes));
    Ok(file)
}

#[instrument(skip_all, fields(file = %args.file))]
pub fn find_run(args: SearchArgs, ctx: &AppContext, cfg: &Config) -> Result<()> {
    let mut file = search_file(&args, cfg)?;
    let before = args.before.as_ref().map(|b| b.0.as_slice());
    let found = file.find(&args.pattern.0, args.from.unwrap_or(0), before);
    print_offset(found, ctx);
    Ok(())
}

#[instrument(skip_all, fields(file = %args.file))]
pub fn rfind_run(args: SearchArgs, ctx: &AppContext, cfg: &Config) -> Result<()> {
    let mut file = search_file(&args, cfg)?;
    let before = args.before.as_ref().map(|b| b.0.as_slice());
    let found = file.rfind(&args.pattern.0, args.from, before);
    print_offset(found, ctx);
    Ok(())
}

pub fn read_run(args: ReadArgs, _ctx: &AppContext) -> Result<()> {
    let mut file = open(&args.file)?;
    let offset = i64::try_from(args.offset).context("offset too large")?;
    file.seek(offset, Position::Beginning)
        .with_context(|| format!("seek to {} in {}", args.offset, args.file))?;

    let bytes = file.read_block(args.length);
    if args.hex {
        println!("{}", hex::encode(&bytes));
    } else {
        println!("{}", bytes.as_bstr());
    }
    Ok(())
}

fn report_plan(action: &str, plan: &SplicePlan, name: &str, ctx: &AppContext) {
    if ctx.quiet {
        return;
    }
    let line = format!(
        "{action} {name}: [{}, {}) -> {} bytes, length {} -> {}",
        plan.start,
        plan.tail_start(),
        plan.inserted,
        plan.old_length,
        plan.new_length()
    );
    if ctx.no_color {
        println!("{line}");
    } else {
        println!("{}", line.green());
    }
}

fn splice_run(
    name: &str,
    data: &[u8],
    start: u64,
    replace: u64,
    ctx: &AppContext,
) -> Result<()> {
    let mut file = open(name)?;
    let plan = SplicePlan::new(start, replace, data.len() as u64, file.length())?;

    if ctx.dry_run {
        report_plan("Would splice", &plan, name, ctx);
        return Ok(());
    }

    file.insert(data, start, replace)
        .with_context(|| format!("splice {name}"))?;
    info!(new_length = plan.new_length(), "splice complete");
    report_plan("Spliced", &plan, name, ctx);
    Ok(())
}

#[instrument(skip_all, fields(file = %args.file))]
pub fn insert_run(args: InsertArgs, ctx: &AppContext) -> Result<()> {
    splice_run(&args.file, &args.data.0, args.at, args.replace, ctx)
}

#[instrument(skip_all, fields(file = %args.file))]
pub fn remove_run(args: RemoveArgs, ctx: &AppContext) -> Result<()> {
    splice_run(&args.file, &[], args.at, args.length, ctx)
}

pub fn probe_run(args: ProbeArgs, ctx: &AppContext) -> Result<()> {
    let readable = TagFile::is_readable(&args.file);
    let writable = TagFile::is_writable(&args.file);

    let mark = |ok: bool| -> String {
        match (ok, ctx.no_color) {
            (true, true) => "yes".to_string(),
            (false, true) => "no".to_string(),
            (true, false) => "yes".green().to_string(),
            (false, false) => "no".red().to_string(),
        }
    };
    println!("readable: {}", mark(readable));
    println!("writable: {}", mark(writable));
    Ok(())
}
