// dialect.rs - Vendor idioms recognized in SDK headers
//
// The token names the extractors look for. Defaults describe the Nordic
// nRF5 SDK family; a JSON file can override any subset of them.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Token names and markers the extractors match against
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Dialect {
    /// Substring marking an SVC range start macro
    pub base_marker: String,
    /// Substring marking an SVC range end macro
    pub last_marker: String,
    /// Substring on an `enum` line that marks an SVC number enumeration
    pub enum_marker: String,
    /// Header whose enums all number SVCs from one fixed base
    pub vendor_enum_file: String,
    /// Macros that redefine an SVC number with a literal
    pub direct_numbers: Vec<String>,
    /// Macro binding an SVC number to a prototype
    pub call_macro: String,
    /// First argument of the call macro's own definition
    pub call_placeholder: String,
}

impl Default for Dialect {
    fn default() -> Self {
        Self {
            base_marker: "SVC_BASE".to_string(),
            last_marker: "SVC_LAST".to_string(),
            enum_marker: "_SVCS".to_string(),
            vendor_enum_file: "ant_interface.h".to_string(),
            direct_numbers: vec![
                "SD_RADIO_REQUEST".to_string(),
                "SD_RADIO_SESSION_OPEN".to_string(),
                "SD_RADIO_SESSION_CLOSE".to_string(),
            ],
            call_macro: "SVCALL".to_string(),
            call_placeholder: "number".to_string(),
        }
    }
}

impl Dialect {
    /// Load a dialect from a JSON file; absent keys keep their defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read dialect {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Invalid dialect {}", path.display()))
    }

    pub fn is_direct_number(&self, name: &str) -> bool {
        self.direct_numbers.iter().any(|n| n == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_override() {
        let dialect: Dialect = serde_json::from_str(r#"{ "call_macro": "SVC_CALL" }"#).unwrap();
        assert_eq!(dialect.call_macro, "SVC_CALL");
        assert_eq!(dialect.enum_marker, "_SVCS");
        assert!(dialect.is_direct_number("SD_RADIO_REQUEST"));
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(serde_json::from_str::<Dialect>(r#"{ "svcall": "X" }"#).is_err());
    }
}
