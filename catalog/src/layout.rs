// layout.rs - SDK tree discovery
//
// A catalog root holds one extracted SDK per subdirectory, named either by
// version (`15.3.0`) or by the vendor archive name
// (`nRF5_SDK_15.3.0_59ac345`). Each SDK ships softdevices in one of two
// layouts:
//
//   compiled: components/softdevice/<sNNN>/{headers,toolchain/armgcc}/
//   source:   <nrfXX>/Include/<sNNN>/ and <nrfXX>/Source/templates/gcc/

use anyhow::{Context, Result};
use nrf_sdk_parse::{FirmwareSignature, VariantInput};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Chip family of compiled softdevices until linker scripts name one
pub const COMPILED_CHIP_FAMILY: &str = "hex";

/// The one release that keeps source softdevice headers directly in `Include/`
const FLAT_INCLUDE_VERSION: &str = "4.4.2";

/// Version in a vendor archive name: `nRF5_SDK_15.3.0_59ac345.zip` -> `15.3.0`
pub fn sdk_version_from_archive_name(name: &str) -> Option<String> {
    let stem = name.strip_suffix(".zip").unwrap_or(name);
    let rest = stem.splitn(3, '_').nth(2)?;
    let (version, _hash) = rest.rsplit_once('_')?;
    (!version.is_empty()).then(|| version.replace('_', "."))
}

/// One extracted SDK release
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sdk {
    pub version: String,
    pub root: PathBuf,
}

/// How a softdevice is shipped inside an SDK
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantLayout {
    Compiled,
    Source,
}

/// A softdevice of one SDK, with the directories its files live in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    pub sdk_version: String,
    pub softdevice: String,
    pub chip_family: String,
    pub layout: VariantLayout,
    pub header_dir: PathBuf,
    pub linker_dir: PathBuf,
}

/// Sorted subdirectories of `dir`; a missing directory has none
fn subdirs(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err).with_context(|| format!("Failed to list {}", dir.display())),
    };

    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("Failed to list {}", dir.display()))?;
        if entry.file_type()?.is_dir() {
            dirs.push((entry.file_name().to_string_lossy().into_owned(), entry.path()));
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Sorted files of `dir` with the given extension
fn files_with_extension(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!(dir = %dir.display(), "directory missing");
            return Ok(Vec::new());
        }
        Err(err) => return Err(err).with_context(|| format!("Failed to list {}", dir.display())),
    };

    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .with_context(|| format!("Failed to list {}", dir.display()))?
            .path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == extension) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn is_compiled_softdevice(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next() == Some('s') && chars.next().is_some_and(|c| c.is_ascii_digit())
}

fn is_source_softdevice(name: &str) -> bool {
    name.len() == 4 && name.starts_with('s')
}

/// SDKs under a catalog root, sorted by directory name
pub fn discover_sdks(root: &Path) -> Result<Vec<Sdk>> {
    if !root.is_dir() {
        anyhow::bail!("SDK root {} is not a directory", root.display());
    }
    Ok(subdirs(root)?
        .into_iter()
        .map(|(name, path)| Sdk {
            version: sdk_version_from_archive_name(&name).unwrap_or(name),
            root: path,
        })
        .collect())
}

impl Sdk {
    /// Every softdevice the SDK ships, compiled ones first
    pub fn variants(&self) -> Result<Vec<Variant>> {
        let mut variants = Vec::new();

        let softdevices = self.root.join("components/softdevice");
        for (name, dir) in subdirs(&softdevices)? {
            if !is_compiled_softdevice(&name) {
                continue;
            }
            let mut linker_dir = dir.join("toolchain/armgcc");
            if !linker_dir.is_dir() {
                linker_dir = self.root.join("components/toolchain/gcc");
            }
            variants.push(Variant {
                sdk_version: self.version.clone(),
                softdevice: name,
                chip_family: COMPILED_CHIP_FAMILY.to_string(),
                layout: VariantLayout::Compiled,
                header_dir: dir.join("headers"),
                linker_dir,
            });
        }

        for (chip, chip_dir) in subdirs(&self.root)? {
            if !chip.starts_with("nrf") {
                continue;
            }
            let include = chip_dir.join("Include");
            for (name, dir) in subdirs(&include)? {
                if !is_source_softdevice(&name) {
                    continue;
                }
                let header_dir = if self.version == FLAT_INCLUDE_VERSION {
                    include.clone()
                } else {
                    dir
                };
                variants.push(Variant {
                    sdk_version: self.version.clone(),
                    softdevice: name,
                    chip_family: chip.clone(),
                    layout: VariantLayout::Source,
                    header_dir,
                    linker_dir: chip_dir.join("Source/templates/gcc"),
                });
            }
        }

        debug!(sdk = %self.version, variants = variants.len(), "softdevices found");
        Ok(variants)
    }
}

impl Variant {
    /// Parser input for this variant. Linker directories are shared between
    /// softdevices, so only scripts naming this one are kept.
    pub fn input(&self, signature: FirmwareSignature) -> Result<VariantInput> {
        let headers = files_with_extension(&self.header_dir, "h")?;
        let linkers = files_with_extension(&self.linker_dir, "ld")?
            .into_iter()
            .filter(|path| {
                path.file_name()
                    .is_some_and(|name| name.to_string_lossy().contains(self.softdevice.as_str()))
            })
            .collect();

        Ok(VariantInput {
            signature,
            sdk_version: Some(self.sdk_version.clone()),
            softdevice: self.softdevice.clone(),
            chip_family: self.chip_family.clone(),
            headers,
            linkers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    #[test]
    fn test_archive_name_version() {
        assert_eq!(
            sdk_version_from_archive_name("nRF5_SDK_15.3.0_59ac345.zip").as_deref(),
            Some("15.3.0")
        );
        assert_eq!(
            sdk_version_from_archive_name("nRF51_SDK_8.0.0_5fc2c3a").as_deref(),
            Some("8.0.0")
        );
        assert_eq!(sdk_version_from_archive_name("15.3.0"), None);
    }

    #[test]
    fn test_discover_names_sdks_by_version() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("nRF5_SDK_15.3.0_59ac345")).unwrap();
        fs::create_dir_all(dir.path().join("4.4.2")).unwrap();
        touch(dir.path(), "README.txt");

        let sdks = discover_sdks(dir.path()).unwrap();
        let versions: Vec<&str> = sdks.iter().map(|sdk| sdk.version.as_str()).collect();
        assert_eq!(versions, ["4.4.2", "15.3.0"]);
    }

    #[test]
    fn test_discover_rejects_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover_sdks(&dir.path().join("nope")).is_err());
    }

    #[test]
    fn test_compiled_variants() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "components/softdevice/s132/headers/ble.h");
        touch(root, "components/softdevice/s132/headers/ble_gap.h");
        touch(root, "components/softdevice/s132/headers/readme.txt");
        touch(root, "components/softdevice/s132/toolchain/armgcc/armgcc_s132_nrf52832_xxaa.ld");
        touch(root, "components/softdevice/s212/headers/ant_interface.h");
        touch(root, "components/softdevice/common/softdevice_handler.h");
        touch(root, "components/toolchain/gcc/gcc_nrf52_s212_xxaa.ld");
        touch(root, "components/toolchain/gcc/gcc_nrf51_s130_xxaa.ld");

        let sdk = Sdk {
            version: "12.0.0".into(),
            root: root.to_path_buf(),
        };
        let variants = sdk.variants().unwrap();
        assert_eq!(variants.len(), 2);
        assert_eq!(variants[0].softdevice, "s132");
        assert_eq!(variants[0].chip_family, "hex");
        assert_eq!(variants[0].layout, VariantLayout::Compiled);

        let input = variants[0].input(FirmwareSignature::from("sig")).unwrap();
        let names: Vec<_> = input.headers.iter().map(|p| p.file_name().unwrap()).collect();
        assert_eq!(names, ["ble.h", "ble_gap.h"]);
        assert_eq!(input.linkers.len(), 1);
        assert_eq!(input.sdk_version.as_deref(), Some("12.0.0"));

        // s212 has no armgcc directory and falls back to the shared one
        assert!(variants[1].linker_dir.ends_with("components/toolchain/gcc"));
        let input = variants[1].input(FirmwareSignature::from("sig")).unwrap();
        assert_eq!(input.linkers.len(), 1);
        assert!(input.linkers[0].ends_with("gcc_nrf52_s212_xxaa.ld"));
    }

    #[test]
    fn test_source_variants() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "nrf51/Include/s110/ble.h");
        touch(root, "nrf51/Include/nrf51.h");
        touch(root, "nrf51/Include/s1xx_iot/ble.h");
        touch(root, "nrf51/Source/templates/gcc/gcc_nrf51_s110_xxaa.ld");
        touch(root, "nrf51/Source/templates/gcc/gcc_nrf51_blank_xxaa.ld");

        let sdk = Sdk {
            version: "6.0.0".into(),
            root: root.to_path_buf(),
        };
        let variants = sdk.variants().unwrap();
        assert_eq!(variants.len(), 1);
        assert_eq!(variants[0].chip_family, "nrf51");
        assert_eq!(variants[0].layout, VariantLayout::Source);

        let input = variants[0].input(FirmwareSignature::from("sig")).unwrap();
        assert_eq!(input.headers.len(), 1);
        assert!(input.headers[0].ends_with("s110/ble.h"));
        assert_eq!(input.linkers.len(), 1);
    }

    #[test]
    fn test_flat_include_release() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "nrf51/Include/s110/placeholder.txt");
        touch(root, "nrf51/Include/ble.h");

        let sdk = Sdk {
            version: "4.4.2".into(),
            root: root.to_path_buf(),
        };
        let variants = sdk.variants().unwrap();
        assert!(variants[0].header_dir.ends_with("nrf51/Include"));
        let input = variants[0].input(FirmwareSignature::from("sig")).unwrap();
        assert_eq!(input.headers.len(), 1);
    }
}
