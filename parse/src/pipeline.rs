// pipeline.rs - Per-variant pass ordering
//
// Pass 1 builds the range table from every header, pass 2 resolves SVC
// numbers (structures are extracted alongside), and only then does pass 3
// read call bindings, since a binding may use a symbol numbered in another
// header. Linker scripts are independent of all three.

use crate::context::ParseContext;
use crate::dialect::Dialect;
use crate::error::Diagnostics;
use crate::model::{FirmwareSignature, RecordSet, VariantRecord};
use crate::source::SourceFile;
use crate::{memory, ranges, structs, svcall, svcs};
use std::path::PathBuf;
use tracing::{debug, info, info_span};

/// Inputs for one firmware variant
#[derive(Debug, Clone)]
pub struct VariantInput {
    pub signature: FirmwareSignature,
    pub sdk_version: Option<String>,
    /// Softdevice version, e.g. `s132`; matched against linker paths
    pub softdevice: String,
    /// Chip family used when the linker paths do not name one
    pub chip_family: String,
    pub headers: Vec<PathBuf>,
    pub linkers: Vec<PathBuf>,
}

fn load_all(paths: &[PathBuf], diags: &mut Diagnostics) -> Vec<SourceFile> {
    paths
        .iter()
        .filter_map(|path| match SourceFile::load(path) {
            Ok(file) => Some(file),
            Err(diag) => {
                diags.report(diag);
                None
            }
        })
        .collect()
}

/// Read a variant's files and run every pass over them
pub fn parse_variant(input: &VariantInput, dialect: &Dialect) -> RecordSet {
    let mut diags = Diagnostics::default();
    let headers = load_all(&input.headers, &mut diags);
    let linkers = load_all(&input.linkers, &mut diags);
    run(input, &headers, &linkers, dialect, diags)
}

/// Run every pass over files already in memory. `input.headers` and
/// `input.linkers` are ignored.
pub fn parse_sources(
    input: &VariantInput,
    headers: &[SourceFile],
    linkers: &[SourceFile],
    dialect: &Dialect,
) -> RecordSet {
    run(input, headers, linkers, dialect, Diagnostics::default())
}

fn run(
    input: &VariantInput,
    headers: &[SourceFile],
    linkers: &[SourceFile],
    dialect: &Dialect,
    mut diags: Diagnostics,
) -> RecordSet {
    let signature = &input.signature;
    let _span = info_span!("variant", %signature).entered();

    // Pass 1: range markers from every header
    let (range_table, range_entries) = ranges::build(headers, dialect, signature);

    // Pass 2: SVC numbers, plus structures which need nothing else
    let svc_table = svcs::resolve(headers, &range_table, dialect, &mut diags);
    let mut structures = Vec::new();
    let mut structure_args = Vec::new();
    for header in headers {
        for structure in structs::extract(header, signature, &mut diags) {
            structures.push(structure.record);
            structure_args.extend(structure.arguments);
        }
    }

    // Pass 3: call bindings against the finished lookups
    let ctx = ParseContext::new(signature.clone(), svc_table);
    let mut calls = Vec::new();
    for header in headers {
        calls.extend(svcall::extract(header, &ctx, dialect, &mut diags));
    }
    drop(ctx);

    let linker_paths: Vec<&PathBuf> = linkers.iter().map(|file| &file.path).collect();
    let chip = memory::detect_chip(&linker_paths, &input.softdevice)
        .unwrap_or_else(|| input.chip_family.clone());
    debug!(%chip, "chip variant");

    let mut regions = Vec::new();
    for linker in linkers {
        regions.extend(memory::extract(
            linker,
            &input.softdevice,
            input.sdk_version.as_deref(),
            signature,
            &mut diags,
        ));
    }

    let set = RecordSet {
        variant: Some(VariantRecord {
            signature: signature.clone(),
            sdk_version: input.sdk_version.clone(),
            softdevice: input.softdevice.clone(),
            chip,
        }),
        ranges: range_entries,
        calls,
        structures,
        structure_args,
        regions,
        diagnostics: diags.into_vec(),
    };

    info!(
        ranges = set.ranges.len(),
        calls = set.calls.len(),
        structures = set.structures.len(),
        regions = set.regions.len(),
        diagnostics = set.diagnostics.len(),
        "variant parsed"
    );
    set
}
