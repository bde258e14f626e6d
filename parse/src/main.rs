// nrfparse - extract one softdevice variant's SVC catalog
//
// Usage:
//   nrfparse --softdevice s132 --chip nrf52 --sdk-version 15.3.0 \
//       -H headers/ble.h -H headers/ble_gap.h -L armgcc_s132_nrf52832_xxaa.ld
//
// Records are written as JSON lines, one object per record.

use anyhow::{Context, Result};
use clap::Parser;
use nrf_sdk_parse::{parse_variant, Dialect, FirmwareSignature, VariantInput};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "nrfparse")]
#[command(about = "Extract SVC numbers, prototypes, structures and memory maps from nRF5 SDK files")]
#[command(version)]
struct Args {
    /// Header files, in processing order
    #[arg(short = 'H', long = "header")]
    headers: Vec<PathBuf>,

    /// Linker scripts
    #[arg(short = 'L', long = "linker")]
    linkers: Vec<PathBuf>,

    /// Softdevice version (e.g. s132)
    #[arg(long)]
    softdevice: String,

    /// Chip family, used when linker paths don't name the chip
    #[arg(long, default_value = "hex")]
    chip: String,

    /// SDK version the files come from
    #[arg(long)]
    sdk_version: Option<String>,

    /// Firmware signature (default: <sdk-version>_<chip>_<softdevice>)
    #[arg(long)]
    signature: Option<String>,

    /// JSON file overriding the recognized macro names
    #[arg(long)]
    dialect: Option<PathBuf>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

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

    let dialect = match args.dialect {
        Some(ref path) => Dialect::from_json_file(path)?,
        None => Dialect::default(),
    };

    let signature = match args.signature {
        Some(ref sig) => FirmwareSignature::new(sig.as_str()),
        None => FirmwareSignature::fallback(
            args.sdk_version.as_deref().unwrap_or("unknown"),
            &args.chip,
            &args.softdevice,
        ),
    };

    let input = VariantInput {
        signature,
        sdk_version: args.sdk_version,
        softdevice: args.softdevice,
        chip_family: args.chip,
        headers: args.headers,
        linkers: args.linkers,
    };

    let set = parse_variant(&input, &dialect);

    let out: Box<dyn Write> = match args.output {
        Some(ref path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };
    let mut out = out;
    set.write_json_lines(&mut out).context("Failed to write records")?;
    out.flush().context("Failed to write records")?;

    if args.verbose {
        eprintln!(
            "{}: {} records, {} diagnostics",
            input.signature,
            set.len(),
            set.diagnostics.len()
        );
    }

    Ok(())
}
