//! Disk configuration: the set of options that determine how large an
//! image is, what boot sector it carries, and which partitions get
//! created. Grounded in `bootable_config`/`bootable_config_partition`,
//! reworked from a hand-rolled parser into TOML via `serde`.

use std::path::{Path as StdPath, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Arch {
    X86_64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Bootsector {
    Mbr,
    Pxe,
    Multiboot,
    Multiboot2,
}

impl Bootsector {
    /// Size in bytes of the boot sector resource this variant loads:
    /// `pxe` loads 1024 bytes, everything else loads a single 512-byte
    /// sector.
    pub fn size(self) -> u64 {
        match self {
            Bootsector::Pxe => 1024,
            _ => 512,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PartitionScheme {
    None,
    Gpt,
}

/// Wraps a byte count so it can be written in a config file as a plain
/// integer or with a `K`/`M`/`G`/`T` (optionally `iB`-suffixed) multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ByteSize(pub u64);

impl FromStr for ByteSize {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let upper_owned = s.to_ascii_uppercase();
        let upper = upper_owned.strip_suffix("IB").unwrap_or(&upper_owned);
        let (number_part, multiplier) = if let Some(rest) = upper.strip_suffix('K') {
            (rest, 1024u64)
        } else if let Some(rest) = upper.strip_suffix('M') {
            (rest, 1024 * 1024)
        } else if let Some(rest) = upper.strip_suffix('G') {
            (rest, 1024 * 1024 * 1024)
        } else if let Some(rest) = upper.strip_suffix('T') {
            (rest, 1024u64 * 1024 * 1024 * 1024)
        } else {
            (upper, 1u64)
        };

        let number: u64 = number_part
            .trim()
            .parse()
            .map_err(|_| Error::invalid_argument(format!("invalid size {s:?}")))?;

        Ok(ByteSize(number * multiplier))
    }
}

impl<'de> Deserialize<'de> for ByteSize {
    fn deserialize<D>(deserializer: D) -> core::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Int(u64),
            Text(String),
        }
        match Repr::deserialize(deserializer)? {
            Repr::Int(n) => Ok(ByteSize(n)),
            Repr::Text(s) => ByteSize::from_str(&s).map_err(serde::de::Error::custom),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfigPartition {
    pub name: Option<String>,
    pub file: Option<PathBuf>,
    pub size: Option<ByteSize>,
    pub offset: Option<ByteSize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub arch: Arch,
    #[serde(default = "default_bootsector")]
    pub bootsector: Bootsector,
    #[serde(default = "default_partition_scheme")]
    pub partition_scheme: PartitionScheme,
    #[serde(default)]
    pub fs_loader: bool,
    pub disk_size: ByteSize,
    #[serde(default)]
    pub fs_size: Option<ByteSize>,
    pub kernel_path: Option<PathBuf>,
    pub resource_path: Option<PathBuf>,
    #[serde(default)]
    pub partitions: Vec<ConfigPartition>,
}

/// Unset `bootsector` defaults to `mbr`, matching `validate_vars`'
/// "allow 'mbr' to be the default one" promotion. Unlike
/// `partition_scheme`, `bootsector` has no user-facing `none` value to
/// preserve — the sentinel only ever arose from a field being absent.
fn default_bootsector() -> Bootsector {
    Bootsector::Mbr
}

/// Unset `partition_scheme` defaults to `gpt`, matching `validate_vars`'
/// "allow GPT to be the default" promotion. An explicit `"none"` is a
/// distinct, meaningful request (flat layout, see `Builder::write_flat_partition`)
/// and is left alone here.
fn default_partition_scheme() -> PartitionScheme {
    PartitionScheme::Gpt
}

impl Config {
    pub fn parse(source: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(source).map_err(|e| Error::invalid_argument(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<StdPath>) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::parse(&source)
    }

    /// Mirrors the option-combination checks `bootable_config_parse`
    /// performs after reading every field.
    fn validate(&self) -> Result<()> {
        if self.fs_loader && self.bootsector != Bootsector::Mbr {
            return Err(Error::invalid_argument(
                "fs_loader requires bootsector = \"mbr\"",
            ));
        }
        if !self.fs_loader && self.kernel_path.is_none() {
            return Err(Error::invalid_argument(
                "kernel_path is required unless fs_loader is set",
            ));
        }
        for partition in &self.partitions {
            if partition.size.is_none() && self.partition_scheme == PartitionScheme::None {
                return Err(Error::invalid_argument(
                    "partition size is required when partition_scheme is \"none\"",
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_byte_size_suffixes() {
        assert_eq!(ByteSize::from_str("64").unwrap(), ByteSize(64));
        assert_eq!(ByteSize::from_str("64K").unwrap(), ByteSize(64 * 1024));
        assert_eq!(ByteSize::from_str("1MiB").unwrap(), ByteSize(1024 * 1024));
        assert_eq!(ByteSize::from_str("2G").unwrap(), ByteSize(2 * 1024 * 1024 * 1024));
    }

    #[test]
    fn minimal_valid_config_parses() {
        let config = Config::parse(
            r#"
            arch = "x86-64"
            disk_size = "16M"
            kernel_path = "kernel.bin"
            "#,
        )
        .unwrap();
        assert_eq!(config.disk_size, ByteSize(16 * 1024 * 1024));
        assert_eq!(config.bootsector, Bootsector::Mbr);
        assert_eq!(config.partition_scheme, PartitionScheme::Gpt);
    }

    #[test]
    fn flat_partition_scheme_is_honored_when_set_explicitly() {
        let config = Config::parse(
            r#"
            arch = "x86-64"
            disk_size = "16M"
            kernel_path = "kernel.bin"
            partition_scheme = "none"
            "#,
        )
        .unwrap();
        assert_eq!(config.partition_scheme, PartitionScheme::None);
    }

    #[test]
    fn fs_loader_without_mbr_bootsector_is_rejected() {
        let result = Config::parse(
            r#"
            arch = "x86-64"
            disk_size = "16M"
            fs_loader = true
            bootsector = "pxe"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn missing_kernel_path_without_fs_loader_is_rejected() {
        let result = Config::parse(
            r#"
            arch = "x86-64"
            disk_size = "16M"
            "#,
        );
        assert!(result.is_err());
    }
}
