// memory.rs - Linker script memory map extractor
//
// Reads the RAM and FLASH regions a linker script reserves for the
// application. Which chip, softdevice and card revision a script belongs to
// is encoded in its path; three SDK layouts are recognized.

use crate::error::{Diagnostic, Diagnostics};
use crate::lex;
use crate::model::{FirmwareSignature, MemoryKind, MemoryRegion};
use crate::source::SourceFile;
use std::path::Path;
use tracing::debug;

/// Directory layouts linker scripts are shipped in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathShape {
    /// `<chip>/Source/templates/gcc/gcc_<chip>_<sd>_<card>.ld`
    SourceTemplates,
    /// `components/softdevice/<sd>/toolchain/armgcc/armgcc_<sd>_<chip>_<card>.ld`
    SoftdeviceToolchain,
    /// `components/toolchain/gcc/gcc_nrf5..._<chip>_<sd>_<card>.ld`
    GenericToolchain,
}

impl PathShape {
    const ALL: [PathShape; 3] = [
        PathShape::SourceTemplates,
        PathShape::SoftdeviceToolchain,
        PathShape::GenericToolchain,
    ];

    fn matches(self, path: &str, softdevice: &str) -> bool {
        if !path.contains(softdevice) {
            return false;
        }
        match self {
            PathShape::SourceTemplates => path.contains("/Source/templates/gcc/"),
            PathShape::SoftdeviceToolchain => {
                path.contains("/components/softdevice/")
                    && path.contains("/toolchain/armgcc/armgcc_s")
                    && path.contains("xx")
            }
            PathShape::GenericToolchain => {
                path.contains("/components/toolchain/gcc/gcc_nrf5") && path.contains("xx")
            }
        }
    }

    /// First layout the path fits
    pub fn classify(path: &str, softdevice: &str) -> Option<PathShape> {
        Self::ALL
            .into_iter()
            .find(|shape| shape.matches(path, softdevice))
    }
}

/// What a linker script's path says about it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkerIdentity {
    pub shape: PathShape,
    pub chip: String,
    pub softdevice: Option<String>,
    pub card: String,
}

fn normalized(path: &Path) -> String {
    // Leading slash lets the `/components/...` markers match relative paths
    let text = path.to_string_lossy().replace('\\', "/");
    if text.starts_with('/') {
        text
    } else {
        format!("/{}", text)
    }
}

/// Classify a linker script path and read the chip, softdevice and card
/// revision from it. The file name must have four `_`-separated parts.
pub fn identify(path: &Path, softdevice: &str) -> Option<LinkerIdentity> {
    let text = normalized(path);
    let file_name = text.rsplit('/').next()?;
    let parts: Vec<&str> = file_name.split('_').collect();
    let [_, second, third, fourth] = parts[..] else {
        return None;
    };
    let card = fourth.trim_end_matches(".ld").to_string();
    let versioned = |part: &str| part.starts_with('s').then(|| part.to_string());

    let shape = PathShape::classify(&text, softdevice)?;
    let (chip, softdevice) = match shape {
        PathShape::SourceTemplates => {
            // Chip directory sits right above Source/templates/gcc
            let segments: Vec<&str> = text.split('/').collect();
            let chip = segments
                .windows(4)
                .find(|w| w[1..] == ["Source", "templates", "gcc"])
                .map(|w| w[0].to_string())?;
            (chip, Some(third.to_string()))
        }
        PathShape::SoftdeviceToolchain => (third.to_string(), versioned(second)),
        PathShape::GenericToolchain => (second.to_string(), versioned(third)),
    };

    Some(LinkerIdentity {
        shape,
        chip,
        softdevice,
        card,
    })
}

/// Chip variant named by the linker scripts of a softdevice. Only scripts
/// whose card revision carries the `xx` marker count; the last one wins.
pub fn detect_chip<P: AsRef<Path>>(paths: &[P], softdevice: &str) -> Option<String> {
    paths
        .iter()
        .filter_map(|path| identify(path.as_ref(), softdevice))
        .filter(|identity| identity.card.contains("xx"))
        .last()
        .map(|identity| identity.chip)
}

/// Origin and length found on one region declaration line
#[derive(Debug, Clone, PartialEq, Eq)]
struct RegionLine {
    kind: MemoryKind,
    origin: String,
    length: String,
}

/// `FLASH (rx) : ORIGIN = 0x1f000, LENGTH = 0x61000`
fn parse_region_line(text: &str) -> Option<RegionLine> {
    if !text.contains("ORIGIN") || !text.contains("LENGTH") {
        return None;
    }
    let (name, attributes) = text.split_once(':')?;
    // `FLASH (rx)` and `FLASH(rx)` alike
    let kind = match lex::tokenize(name).first()?.text {
        "FLASH" => MemoryKind::Flash,
        "RAM" => MemoryKind::Ram,
        _ => return None,
    };

    let mut origin = None;
    let mut length = None;
    for fragment in attributes.split(',') {
        let Some((key, value)) = fragment.split_once('=') else {
            continue;
        };
        match key.trim() {
            "ORIGIN" => origin = Some(value.trim().to_string()),
            "LENGTH" => length = Some(value.trim().to_string()),
            _ => {}
        }
    }

    Some(RegionLine {
        kind,
        origin: origin?,
        length: length?,
    })
}

/// Memory regions of one linker script. Both the RAM and the FLASH region
/// must be declared completely, otherwise nothing is emitted.
pub fn extract(
    file: &SourceFile,
    softdevice: &str,
    sdk_version: Option<&str>,
    signature: &FirmwareSignature,
    diags: &mut Diagnostics,
) -> Vec<MemoryRegion> {
    let Some(identity) = identify(&file.path, softdevice) else {
        diags.report(Diagnostic::AmbiguousPathClassification {
            path: file.path.clone(),
        });
        return Vec::new();
    };

    let mut ram = None;
    let mut flash = None;
    for line in file.cursor() {
        if let Some(region) = parse_region_line(line.trimmed()) {
            match region.kind {
                MemoryKind::Ram => ram = Some(region),
                MemoryKind::Flash => flash = Some(region),
            }
        }
    }

    let (Some(ram), Some(flash)) = (ram, flash) else {
        debug!(path = %file.path.display(), "incomplete memory map");
        return Vec::new();
    };

    [ram, flash]
        .into_iter()
        .map(|region| MemoryRegion {
            kind: region.kind,
            origin: region.origin,
            length: region.length,
            chip_variant: identity.chip.clone(),
            card_version: identity.card.clone(),
            softdevice: identity.softdevice.clone(),
            sdk_version: sdk_version.map(str::to_string),
            signature: signature.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = "/* Linker script to configure memory regions. */\n\
        SEARCH_DIR(.)\n\
        GROUP(-lgcc -lc -lnosys)\n\
        MEMORY\n\
        {\n\
          FLASH (rx) : ORIGIN = 0x1f000, LENGTH = 0x61000\n\
          RAM (rwx) :  ORIGIN = 0x20002128, LENGTH = 0xded8\n\
        }\n";

    fn sig() -> FirmwareSignature {
        FirmwareSignature::from("sig")
    }

    #[test]
    fn test_source_templates_shape() {
        let id = identify(
            Path::new("SDKs/8.0.0/nrf51/Source/templates/gcc/gcc_nrf51_s110_xxaa.ld"),
            "s110",
        )
        .unwrap();
        assert_eq!(id.shape, PathShape::SourceTemplates);
        assert_eq!(id.chip, "nrf51");
        assert_eq!(id.softdevice.as_deref(), Some("s110"));
        assert_eq!(id.card, "xxaa");
    }

    #[test]
    fn test_softdevice_toolchain_shape() {
        let id = identify(
            Path::new("/sdk/components/softdevice/s132/toolchain/armgcc/armgcc_s132_nrf52832_xxaa.ld"),
            "s132",
        )
        .unwrap();
        assert_eq!(id.shape, PathShape::SoftdeviceToolchain);
        assert_eq!(id.chip, "nrf52832");
        assert_eq!(id.softdevice.as_deref(), Some("s132"));
    }

    #[test]
    fn test_generic_toolchain_shape() {
        let id = identify(Path::new("components/toolchain/gcc/gcc_nrf51_s130_xxac.ld"), "s130").unwrap();
        assert_eq!(id.shape, PathShape::GenericToolchain);
        assert_eq!(id.chip, "nrf51");
        assert_eq!(id.softdevice.as_deref(), Some("s130"));
        assert_eq!(id.card, "xxac");
    }

    #[test]
    fn test_file_name_must_have_four_parts() {
        let path = Path::new("components/toolchain/gcc/gcc_nrf51_s130_xxac_extra.ld");
        assert!(identify(path, "s130").is_none());
    }

    #[test]
    fn test_unrecognized_path_skipped() {
        let file = SourceFile::new("board/custom_s132_nrf52_xxaa.ld", SCRIPT);
        let mut diags = Diagnostics::default();
        assert!(extract(&file, "s132", None, &sig(), &mut diags).is_empty());
        assert!(matches!(
            diags.into_vec()[..],
            [Diagnostic::AmbiguousPathClassification { .. }]
        ));
    }

    #[test]
    fn test_regions_extracted() {
        let file = SourceFile::new(
            "components/softdevice/s132/toolchain/armgcc/armgcc_s132_nrf52832_xxaa.ld",
            SCRIPT,
        );
        let mut diags = Diagnostics::default();
        let regions = extract(&file, "s132", Some("12.0.0"), &sig(), &mut diags);
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].kind, MemoryKind::Ram);
        assert_eq!(regions[0].origin, "0x20002128");
        assert_eq!(regions[0].length, "0xded8");
        assert_eq!(regions[1].kind, MemoryKind::Flash);
        assert_eq!(regions[1].origin, "0x1f000");
        assert_eq!(regions[1].chip_variant, "nrf52832");
        assert_eq!(regions[1].card_version, "xxaa");
        assert!(diags.is_empty());
    }

    #[test]
    fn test_region_name_without_space() {
        let file = SourceFile::new(
            "components/softdevice/s132/toolchain/armgcc/armgcc_s132_nrf52832_xxaa.ld",
            "MEMORY\n{\n  FLASH(rx) : ORIGIN = 0x1f000, LENGTH = 0x61000\n  RAM(rwx) : ORIGIN = 0x20002128, LENGTH = 0xded8\n}\n",
        );
        let mut diags = Diagnostics::default();
        let regions = extract(&file, "s132", None, &sig(), &mut diags);
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].kind, MemoryKind::Ram);
        assert_eq!(regions[0].origin, "0x20002128");
        assert_eq!(regions[1].length, "0x61000");
    }

    #[test]
    fn test_flash_only_emits_nothing() {
        let file = SourceFile::new(
            "components/softdevice/s132/toolchain/armgcc/armgcc_s132_nrf52832_xxaa.ld",
            "MEMORY\n{\n  FLASH (rx) : ORIGIN = 0x1f000, LENGTH = 0x61000\n}\n",
        );
        let mut diags = Diagnostics::default();
        assert!(extract(&file, "s132", None, &sig(), &mut diags).is_empty());
    }

    #[test]
    fn test_detect_chip_needs_card_marker() {
        let paths = [
            "nrf51/Source/templates/gcc/gcc_nrf51_s110_xxaa.ld",
            "nrf52/Source/templates/gcc/gcc_nrf52_s110_aa.ld",
        ];
        assert_eq!(detect_chip(&paths, "s110").as_deref(), Some("nrf51"));
        assert_eq!(detect_chip(&paths, "s212"), None);
    }
}
