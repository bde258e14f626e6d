// model.rs - Records emitted for one firmware variant
//
// Every record carries the signature of the variant it was extracted from.
// Records are plain values: built once by an extractor, never mutated.

use crate::error::Diagnostic;
use anyhow::Result;
use serde::Serialize;
use std::fmt;
use std::io::Write;

/// Identity of one firmware variant, computed outside this crate
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct FirmwareSignature(String);

impl FirmwareSignature {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Signature used when no firmware image is available to hash
    pub fn fallback(sdk_version: &str, chip: &str, softdevice: &str) -> Self {
        Self(format!("{}_{}_{}", sdk_version, chip, softdevice))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FirmwareSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FirmwareSignature {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// The variant itself; parent row of everything else
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantRecord {
    pub signature: FirmwareSignature,
    pub sdk_version: Option<String>,
    pub softdevice: String,
    pub chip: String,
}

/// Which end of an SVC range a marker names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RangeKind {
    Base,
    Last,
}

/// An `..._SVC_BASE` or `..._SVC_LAST` macro
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SvcRangeEntry {
    pub name: String,
    /// Literal token text, not validated
    pub hex_value: String,
    pub kind: RangeKind,
    pub signature: FirmwareSignature,
}

/// A system call bound to its prototype
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SvcCallRecord {
    pub syscall_symbol: String,
    pub syscall_number: String,
    pub function_name: String,
    pub return_type: String,
    pub argument_list: Vec<String>,
    pub signature: FirmwareSignature,
}

/// A `typedef struct` definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureRecord {
    pub name: String,
    pub contains_union: bool,
    pub contains_struct: bool,
    pub signature: FirmwareSignature,
}

/// One member declaration of a structure, in declaration order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureArgument {
    pub struct_name: String,
    pub text: String,
    /// 0-based position among the structure's members
    pub ordinal_position: usize,
    pub signature: FirmwareSignature,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MemoryKind {
    Ram,
    Flash,
}

/// A RAM or FLASH region reserved for the application
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryRegion {
    pub kind: MemoryKind,
    pub origin: String,
    pub length: String,
    pub chip_variant: String,
    pub card_version: String,
    /// Softdevice version read from the linker file name, if it has one
    pub softdevice: Option<String>,
    pub sdk_version: Option<String>,
    pub signature: FirmwareSignature,
}

/// Any record, tagged with its table name when serialized
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(tag = "table")]
pub enum Record<'a> {
    Variant(&'a VariantRecord),
    SvcRange(&'a SvcRangeEntry),
    SvcCall(&'a SvcCallRecord),
    Structure(&'a StructureRecord),
    StructureArgument(&'a StructureArgument),
    MemoryRegion(&'a MemoryRegion),
}

/// Everything one variant run produced
#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    pub variant: Option<VariantRecord>,
    pub ranges: Vec<SvcRangeEntry>,
    pub calls: Vec<SvcCallRecord>,
    pub structures: Vec<StructureRecord>,
    pub structure_args: Vec<StructureArgument>,
    pub regions: Vec<MemoryRegion>,
    pub diagnostics: Vec<Diagnostic>,
}

impl RecordSet {
    /// All records, parents before the rows that reference them
    pub fn records(&self) -> impl Iterator<Item = Record<'_>> {
        self.variant
            .iter()
            .map(Record::Variant)
            .chain(self.ranges.iter().map(Record::SvcRange))
            .chain(self.calls.iter().map(Record::SvcCall))
            .chain(self.structures.iter().map(Record::Structure))
            .chain(self.structure_args.iter().map(Record::StructureArgument))
            .chain(self.regions.iter().map(Record::MemoryRegion))
    }

    /// Number of records (diagnostics excluded)
    pub fn len(&self) -> usize {
        usize::from(self.variant.is_some())
            + self.ranges.len()
            + self.calls.len()
            + self.structures.len()
            + self.structure_args.len()
            + self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write one JSON object per record
    pub fn write_json_lines<W: Write>(&self, mut out: W) -> Result<()> {
        for record in self.records() {
            serde_json::to_writer(&mut out, &record)?;
            out.write_all(b"\n")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig() -> FirmwareSignature {
        FirmwareSignature::from("15.3.0_nrf52_s132")
    }

    #[test]
    fn test_fallback_signature() {
        assert_eq!(FirmwareSignature::fallback("12.0.0", "hex", "s130"), "12.0.0_hex_s130".into());
    }

    #[test]
    fn test_json_lines_tagged_and_ordered() {
        let set = RecordSet {
            variant: Some(VariantRecord {
                signature: sig(),
                sdk_version: Some("15.3.0".into()),
                softdevice: "s132".into(),
                chip: "nrf52".into(),
            }),
            ranges: vec![SvcRangeEntry {
                name: "BLE_SVC_BASE".into(),
                hex_value: "0x60".into(),
                kind: RangeKind::Base,
                signature: sig(),
            }],
            ..Default::default()
        };

        let mut out = Vec::new();
        set.write_json_lines(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(set.len(), 2);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with(r#"{"table":"Variant","signature":"15.3.0_nrf52_s132""#));
        assert!(lines[1].contains(r#""hexValue":"0x60""#));
        assert!(lines[1].contains(r#""kind":"base""#));
    }
}
