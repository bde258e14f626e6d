// sink.rs - Destinations for finished record sets
//
// Variant runs finish on rayon worker threads, so sinks take `&self` and
// serialize access internally. A set is always written as one unit.

use anyhow::{anyhow, Result};
use nrf_sdk_parse::RecordSet;
use std::io::Write;
use std::sync::Mutex;

/// Receives the records of each finished variant
pub trait RecordSink: Sync {
    fn write_set(&self, set: &RecordSet) -> Result<()>;
}

/// JSON lines writer; lines of two variants never interleave
pub struct JsonLinesSink<W> {
    out: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    /// Flush and return the underlying writer
    pub fn into_inner(self) -> Result<W> {
        let mut out = self
            .out
            .into_inner()
            .map_err(|_| anyhow!("output writer poisoned"))?;
        out.flush()?;
        Ok(out)
    }
}

impl<W: Write + Send> RecordSink for JsonLinesSink<W> {
    fn write_set(&self, set: &RecordSet) -> Result<()> {
        // Serialize outside the lock
        let mut buf = Vec::new();
        set.write_json_lines(&mut buf)?;

        let mut out = self
            .out
            .lock()
            .map_err(|_| anyhow!("output writer poisoned"))?;
        out.write_all(&buf)?;
        Ok(())
    }
}

/// Keeps every set in memory
#[derive(Default)]
pub struct MemorySink {
    sets: Mutex<Vec<RecordSet>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_sets(self) -> Result<Vec<RecordSet>> {
        self.sets
            .into_inner()
            .map_err(|_| anyhow!("record store poisoned"))
    }
}

impl RecordSink for MemorySink {
    fn write_set(&self, set: &RecordSet) -> Result<()> {
        self.sets
            .lock()
            .map_err(|_| anyhow!("record store poisoned"))?
            .push(set.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nrf_sdk_parse::{FirmwareSignature, VariantRecord};
    use rayon::prelude::*;

    fn set(signature: &str) -> RecordSet {
        RecordSet {
            variant: Some(VariantRecord {
                signature: FirmwareSignature::from(signature),
                sdk_version: None,
                softdevice: "s132".into(),
                chip: "hex".into(),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_json_lines_sink_writes_whole_sets() {
        let sink = JsonLinesSink::new(Vec::new());
        let signatures: Vec<String> = (0..32).map(|i| format!("sig{}", i)).collect();
        signatures
            .par_iter()
            .try_for_each(|sig| sink.write_set(&set(sig)))
            .unwrap();

        let out = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        assert_eq!(out.lines().count(), 32);
        assert!(out.lines().all(|line| line.starts_with(r#"{"table":"Variant""#)));
    }

    #[test]
    fn test_memory_sink() {
        let sink = MemorySink::new();
        sink.write_set(&set("a")).unwrap();
        sink.write_set(&set("b")).unwrap();
        let sets = sink.into_sets().unwrap();
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[1].variant.as_ref().unwrap().signature.as_str(), "b");
    }
}
