// nrf-catalog - catalog every softdevice variant of extracted nRF5 SDKs
//
// Usage:
//   nrf-catalog SDKs/ -o catalog.jsonl
//   nrf-catalog SDKs/ --dialect dialect.json -j 4 -v

use anyhow::{Context, Result};
use clap::Parser;
use nrf_sdk_catalog::{run, FallbackSigner, JsonLinesSink};
use nrf_sdk_parse::Dialect;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "nrf-catalog")]
#[command(about = "Catalog SVC interfaces and memory maps of every softdevice in a set of SDK trees")]
#[command(version)]
struct Args {
    /// Directory holding one extracted SDK per subdirectory
    root: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JSON file overriding the recognized macro names
    #[arg(long)]
    dialect: Option<PathBuf>,

    /// Worker threads (default: one per core)
    #[arg(short = 'j', long)]
    jobs: Option<usize>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(io::stderr)
        .init();

    if let Some(jobs) = args.jobs {
        rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build_global()
            .context("Failed to start worker threads")?;
    }

    let dialect = match args.dialect {
        Some(ref path) => Dialect::from_json_file(path)?,
        None => Dialect::default(),
    };

    let out: Box<dyn Write + Send> = match args.output {
        Some(ref path) => Box::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        ),
        None => Box::new(io::stdout()),
    };
    let sink = JsonLinesSink::new(BufWriter::new(out));

    let summary = run(&args.root, &sink, &FallbackSigner, &dialect)
        .with_context(|| format!("Failed to catalog {}", args.root.display()))?;
    sink.into_inner().context("Failed to write records")?;

    if args.verbose {
        eprintln!(
            "{} variants, {} records, {} diagnostics",
            summary.variants, summary.records, summary.diagnostics
        );
    }

    Ok(())
}
