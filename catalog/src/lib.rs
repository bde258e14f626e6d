// nrf-sdk-catalog - Whole-tree driver for nrf-sdk-parse
//
// Walks a directory of extracted SDK releases, enumerates every softdevice
// variant they ship, and runs the parser over each one. Variants share
// nothing, so they run in parallel and hand their records to a sink.

pub mod layout;
pub mod sink;

use anyhow::Result;
use nrf_sdk_parse::{parse_variant, Dialect, FirmwareSignature};
use rayon::prelude::*;
use std::path::Path;
use tracing::{info, info_span};

pub use layout::{discover_sdks, sdk_version_from_archive_name, Sdk, Variant, VariantLayout};
pub use sink::{JsonLinesSink, MemorySink, RecordSink};

/// Computes the firmware signature of a variant
pub trait Signer: Sync {
    fn sign(&self, variant: &Variant) -> FirmwareSignature;
}

/// `<sdk>_<chip family>_<softdevice>`, for trees without firmware images
#[derive(Debug, Default, Clone, Copy)]
pub struct FallbackSigner;

impl Signer for FallbackSigner {
    fn sign(&self, variant: &Variant) -> FirmwareSignature {
        FirmwareSignature::fallback(&variant.sdk_version, &variant.chip_family, &variant.softdevice)
    }
}

/// Totals over a catalog run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CatalogSummary {
    pub variants: usize,
    pub records: usize,
    pub diagnostics: usize,
}

/// Every variant of every SDK under `root`
pub fn variants(root: &Path) -> Result<Vec<Variant>> {
    let mut variants = Vec::new();
    for sdk in discover_sdks(root)? {
        variants.extend(sdk.variants()?);
    }
    Ok(variants)
}

/// Parse every variant under `root` into `sink`
pub fn run<S>(root: &Path, sink: &S, signer: &dyn Signer, dialect: &Dialect) -> Result<CatalogSummary>
where
    S: RecordSink + ?Sized,
{
    let variants = variants(root)?;
    info!(root = %root.display(), variants = variants.len(), "cataloging");

    let totals = variants
        .par_iter()
        .map(|variant| -> Result<CatalogSummary> {
            let _span = info_span!(
                "catalog",
                sdk = %variant.sdk_version,
                softdevice = %variant.softdevice,
                chip = %variant.chip_family
            )
            .entered();
            let input = variant.input(signer.sign(variant))?;
            let set = parse_variant(&input, dialect);
            sink.write_set(&set)?;
            Ok(CatalogSummary {
                variants: 1,
                records: set.len(),
                diagnostics: set.diagnostics.len(),
            })
        })
        .try_reduce(CatalogSummary::default, |a, b| {
            Ok(CatalogSummary {
                variants: a.variants + b.variants,
                records: a.records + b.records,
                diagnostics: a.diagnostics + b.diagnostics,
            })
        })?;

    info!(
        variants = totals.variants,
        records = totals.records,
        diagnostics = totals.diagnostics,
        "catalog complete"
    );
    Ok(totals)
}
