// error.rs - Per-file and per-record diagnostics
//
// Nothing in here aborts a run. Each diagnostic is logged when reported and
// kept with the run's output so callers can inspect what was skipped.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, warn};

/// Multi-line constructs that can run off the end of a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Construct {
    CallBinding,
    Enum,
    Struct,
}

impl fmt::Display for Construct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Construct::CallBinding => "call binding",
            Construct::Enum => "enum block",
            Construct::Struct => "struct block",
        })
    }
}

/// A recoverable problem found while parsing one variant
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Diagnostic {
    #[error("{}: file does not exist", path.display())]
    MissingInput { path: PathBuf },

    #[error("{}: cannot read: {reason}", path.display())]
    Unreadable { path: PathBuf, reason: String },

    #[error("{}:{line}: {construct} not terminated before end of file", path.display())]
    UnterminatedConstruct {
        path: PathBuf,
        line: usize,
        construct: Construct,
    },

    #[error("{}:{line}: symbol {symbol} has no resolved value", path.display())]
    UnresolvedSymbol {
        path: PathBuf,
        line: usize,
        symbol: String,
    },

    #[error("{}: linker script path matches no known SDK layout", path.display())]
    AmbiguousPathClassification { path: PathBuf },
}

/// Diagnostics collected during one run
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Log and keep a diagnostic
    pub fn report(&mut self, diag: Diagnostic) {
        match diag {
            // Routine: plenty of enum members reference bases a variant lacks
            Diagnostic::UnresolvedSymbol { .. } => debug!("{}", diag),
            _ => warn!("{}", diag),
        }
        self.entries.push(diag);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_messages() {
        let diag = Diagnostic::UnterminatedConstruct {
            path: PathBuf::from("ble_gap.h"),
            line: 12,
            construct: Construct::Struct,
        };
        assert_eq!(
            diag.to_string(),
            "ble_gap.h:12: struct block not terminated before end of file"
        );
    }

    #[test]
    fn test_report_keeps_order() {
        let mut diags = Diagnostics::default();
        diags.report(Diagnostic::MissingInput {
            path: PathBuf::from("a.h"),
        });
        diags.report(Diagnostic::AmbiguousPathClassification {
            path: PathBuf::from("b.ld"),
        });
        let entries = diags.into_vec();
        assert_eq!(entries.len(), 2);
        assert!(matches!(entries[0], Diagnostic::MissingInput { .. }));
    }
}
