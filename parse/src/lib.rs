// nrf-sdk-parse - SVC interface catalog extraction for nRF5 SDK releases
//
// Turns the C headers and linker scripts shipped with one softdevice variant
// into flat records keyed by the variant's firmware signature.
//
// # Architecture
//
// The parser works in several passes over a variant's files:
//
// 1. **Range table** (`ranges.rs`): `*_SVC_BASE` / `*_SVC_LAST` macros
// 2. **SVC numbers** (`svcs.rs`): enum members resolved to base + offset
// 3. **Structures** (`structs.rs`): `typedef struct` blocks, independent of 1-2
// 4. **Call bindings** (`svcall.rs`): `SVCALL(...)` prototypes, needs 1-2
//    complete over *all* headers
// 5. **Memory map** (`memory.rs`): RAM/FLASH regions from linker scripts
//
// `pipeline.rs` enforces that ordering. The lookups produced by passes 1-2
// travel in a `ParseContext` that is built once and only read afterwards.
//
// # Text handling
//
// Files are read as lines with C comments stripped (`source.rs`), and each
// multi-line construct has a small sub-parser pulling continuation lines
// from a shared cursor. Token-level work goes through `lex.rs`.
//
// Nothing a single file contains can abort a run: problems become
// `Diagnostic`s attached to the run's `RecordSet`.

pub mod context;
pub mod dialect;
pub mod error;
pub mod lex;
pub mod memory;
pub mod model;
pub mod pipeline;
pub mod ranges;
pub mod source;
pub mod structs;
pub mod svcall;
pub mod svcs;

pub use context::ParseContext;
pub use dialect::Dialect;
pub use error::{Construct, Diagnostic, Diagnostics};
pub use model::{
    FirmwareSignature, MemoryKind, MemoryRegion, RangeKind, Record, RecordSet, StructureArgument,
    StructureRecord, SvcCallRecord, SvcRangeEntry, VariantRecord,
};
pub use pipeline::{parse_sources, parse_variant, VariantInput};
pub use source::SourceFile;
