//! Resolves the boot sector, stage-two, and filesystem-loader payloads
//! that the builder embeds in an image. Grounded in
//! `get_root_resource_path`/`get_full_resource_path`/`bootsector_open`.

use std::env;
use std::path::PathBuf;

use crate::config::{Bootsector, Config};
use crate::error::Result;

pub const ENV_VAR: &str = "BOOTABLE_RESOURCE_PATH";
pub const DEFAULT_RESOURCE_PATH: &str = "/opt/return-infinity/share/bootable/resources";

/// Filename misspelling preserved from the original resource tree.
const MULTIBOOT_SYS: &str = "mulitboot.sys";
/// Filename misspelling preserved from the original resource tree.
const MULTIBOOT2_SYS: &str = "mulitboot2.sys";
const MBR_SYS: &str = "mbr.sys";
const PXESTART_SYS: &str = "pxestart.sys";
const FS_LOADER_SYS: &str = "fs-loader.sys";
const STAGE_TWO_SYS: &str = "bootable.sys";

fn root_resource_path(config: &Config) -> PathBuf {
    if let Some(resource_path) = &config.resource_path {
        return resource_path.clone();
    }
    if let Ok(from_env) = env::var(ENV_VAR) {
        return PathBuf::from(from_env);
    }
    PathBuf::from(DEFAULT_RESOURCE_PATH)
}

fn full_resource_path(config: &Config, suffix: &str) -> PathBuf {
    root_resource_path(config).join("x86_64").join(suffix)
}

/// Resolves the path to the boot sector resource for `config.bootsector`.
pub fn bootsector_path(config: &Config) -> Result<PathBuf> {
    let suffix = match config.bootsector {
        Bootsector::Mbr => format!("bootsectors/{MBR_SYS}"),
        Bootsector::Pxe => format!("bootsectors/{PXESTART_SYS}"),
        Bootsector::Multiboot => format!("bootsectors/{MULTIBOOT_SYS}"),
        Bootsector::Multiboot2 => format!("bootsectors/{MULTIBOOT2_SYS}"),
    };
    Ok(full_resource_path(config, &suffix))
}

/// Resolves the path to the filesystem loader stage that is embedded
/// when `config.fs_loader` is set.
pub fn fs_loader_path(config: &Config) -> PathBuf {
    full_resource_path(config, FS_LOADER_SYS)
}

/// Resolves the path to the second-stage boot loader, embedded in GPT
/// entry 0 regardless of `config.bootsector`.
pub fn stage_two_path(config: &Config) -> PathBuf {
    full_resource_path(config, STAGE_TWO_SYS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Arch, PartitionScheme};

    fn config_with(resource_path: Option<PathBuf>, bootsector: Bootsector) -> Config {
        Config {
            arch: Arch::X86_64,
            bootsector,
            partition_scheme: PartitionScheme::None,
            fs_loader: false,
            disk_size: crate::config::ByteSize(1),
            fs_size: None,
            kernel_path: None,
            resource_path,
            partitions: Vec::new(),
        }
    }

    #[test]
    fn bootsector_path_preserves_the_misspelled_filenames() {
        let config = config_with(Some(PathBuf::from("/res")), Bootsector::Multiboot);
        assert_eq!(
            bootsector_path(&config).unwrap(),
            PathBuf::from("/res/x86_64/bootsectors/mulitboot.sys")
        );

        let config = config_with(Some(PathBuf::from("/res")), Bootsector::Multiboot2);
        assert_eq!(
            bootsector_path(&config).unwrap(),
            PathBuf::from("/res/x86_64/bootsectors/mulitboot2.sys")
        );
    }

    #[test]
    fn falls_back_to_compiled_in_default_when_unset() {
        let config = config_with(None, Bootsector::Mbr);
        let path = bootsector_path(&config).unwrap();
        assert!(path.starts_with(DEFAULT_RESOURCE_PATH) || env::var(ENV_VAR).is_ok());
    }
}
