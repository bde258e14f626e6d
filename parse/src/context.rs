// context.rs - Per-variant parse context
//
// Holds the SVC numbers the range and resolver passes produced. Built once,
// read-only afterwards, dropped at the end of the variant's run.

use crate::model::FirmwareSignature;
use crate::svcs::SvcTable;

#[derive(Debug, Clone)]
pub struct ParseContext {
    signature: FirmwareSignature,
    svcs: SvcTable,
}

impl ParseContext {
    pub fn new(signature: FirmwareSignature, svcs: SvcTable) -> Self {
        Self { signature, svcs }
    }

    pub fn signature(&self) -> &FirmwareSignature {
        &self.signature
    }

    /// Resolved SVC number of a function or macro name
    pub fn syscall_number(&self, symbol: &str) -> Option<&str> {
        self.svcs.get(symbol)
    }
}
