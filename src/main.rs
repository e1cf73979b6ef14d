// memtrace: replay an instrumentation trace into memory snapshots

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use clap::Parser;
use eyre::{Result, WrapErr};
use tracing_subscriber::EnvFilter;

use memtrace::{interpret, synthesize, ModeHint, Recipe, StepHistory};

/// Replay a trace file and print one snapshot per event as JSON
#[derive(Debug, Parser)]
#[command(name = "memtrace", version, about)]
struct Args {
    /// Trace payload (JSON), or a recipe with --recipe
    file: PathBuf,

    /// Trace format: auto, call-log or shim-log
    #[arg(long, default_value = "auto", value_parser = parse_mode)]
    mode: ModeHint,

    /// Treat the file as a recipe instead of a trace
    #[arg(long)]
    recipe: bool,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,

    /// Print one line per step instead of JSON
    #[arg(long, conflicts_with = "pretty")]
    summary: bool,
}

fn parse_mode(s: &str) -> Result<ModeHint, String> {
    s.parse()
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let source = fs::read_to_string(&args.file)
        .wrap_err_with(|| format!("failed to read {}", args.file.display()))?;
    let payload: serde_json::Value = serde_json::from_str(&source)
        .wrap_err_with(|| format!("{} is not valid JSON", args.file.display()))?;

    let steps = if args.recipe {
        let recipe: Recipe =
            serde_json::from_value(payload).wrap_err("recipe has an unexpected shape")?;
        synthesize(&recipe)?
    } else {
        interpret(&payload, args.mode)?
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if args.summary {
        write_summary(&mut out, &steps)?;
    } else if args.pretty {
        serde_json::to_writer_pretty(&mut out, &steps)?;
        writeln!(out)?;
    } else {
        serde_json::to_writer(&mut out, &steps)?;
        writeln!(out)?;
    }

    Ok(())
}

fn write_summary(out: &mut impl Write, steps: &StepHistory) -> io::Result<()> {
    for (i, step) in steps.iter().enumerate() {
        let lines: Vec<String> = step.highlighted_lines.iter().map(u32::to_string).collect();
        writeln!(
            out,
            "{:>4}  [{}]  {}",
            i,
            lines.join(","),
            step.description
        )?;
    }
    Ok(())
}
