// ranges.rs - SVC range table builder
//
// First pass over a variant's headers: collect the `*_SVC_BASE` and
// `*_SVC_LAST` macros each subsystem uses to reserve a block of SVC numbers.

use crate::dialect::Dialect;
use crate::lex;
use crate::model::{FirmwareSignature, RangeKind, SvcRangeEntry};
use crate::source::SourceFile;
use std::collections::HashMap;

/// Name -> literal lookup of base markers for one variant. LAST markers are
/// emitted as records but nothing resolves against them.
#[derive(Debug, Clone, Default)]
pub struct RangeTable {
    bases: HashMap<String, String>,
}

impl RangeTable {
    /// Build the lookup; later entries replace earlier ones of the same name
    pub fn from_entries(entries: &[SvcRangeEntry]) -> Self {
        let bases = entries
            .iter()
            .filter(|entry| entry.kind == RangeKind::Base)
            .map(|entry| (entry.name.clone(), entry.hex_value.clone()))
            .collect();
        Self { bases }
    }

    pub fn base(&self, name: &str) -> Option<&str> {
        self.bases.get(name).map(String::as_str)
    }

    /// Numeric value of a base marker whose literal is hex-prefixed
    pub fn base_value(&self, name: &str) -> Option<u64> {
        self.base(name).and_then(lex::parse_hex)
    }

    pub fn len(&self) -> usize {
        self.bases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Range markers defined in one header, in file order
pub fn scan(file: &SourceFile, dialect: &Dialect, signature: &FirmwareSignature) -> Vec<SvcRangeEntry> {
    let mut entries = Vec::new();

    for line in file.cursor() {
        let text = line.trimmed();
        if !text.contains("#define")
            || !(text.contains(&dialect.base_marker) || text.contains(&dialect.last_marker))
        {
            continue;
        }

        let tokens = lex::tokenize(text);
        let Some(define) = lex::parse_define(&tokens) else {
            continue;
        };
        let Some(value) = define.value else {
            continue;
        };

        // Classify by the macro's own name; the value may mention the other marker
        let kind = if define.name.contains(&dialect.base_marker) {
            RangeKind::Base
        } else if define.name.contains(&dialect.last_marker) {
            RangeKind::Last
        } else {
            continue;
        };

        entries.push(SvcRangeEntry {
            name: define.name.to_string(),
            hex_value: value.text.to_string(),
            kind,
            signature: signature.clone(),
        });
    }

    entries
}

/// Scan every header of a variant. Entries are unique by name: a redefinition
/// replaces the earlier entry in place.
pub fn build(
    files: &[SourceFile],
    dialect: &Dialect,
    signature: &FirmwareSignature,
) -> (RangeTable, Vec<SvcRangeEntry>) {
    let mut entries: Vec<SvcRangeEntry> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for file in files {
        for entry in scan(file, dialect, signature) {
            match index.get(&entry.name) {
                Some(&slot) => entries[slot] = entry,
                None => {
                    index.insert(entry.name.clone(), entries.len());
                    entries.push(entry);
                }
            }
        }
    }

    let table = RangeTable::from_entries(&entries);
    tracing::debug!(entries = entries.len(), bases = table.len(), "range table built");
    (table, entries)
}
