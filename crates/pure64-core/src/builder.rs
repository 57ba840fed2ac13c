//! Orchestrates the pieces in this crate into the three disk-image
//! workflows the CLI exposes: building a fresh image, reopening one to
//! inspect it, and saving filesystem changes back. Grounded in
//! `bootable_util_create_disk`/`open_disk`/`save_disk`.

use std::fs::{File as StdFile, OpenOptions};
use std::io::Write as _;

use crate::config::{Config, PartitionScheme};
use crate::error::{Error, Result};
use crate::fs::Fs;
use crate::gpt::Gpt;
use crate::io::zero_fill;
use crate::mbr::Mbr;
use crate::partition::PartitionStream;
use crate::resources;

/// UUID of the stage-two boot loader partition.
const UUID_STAGE_TWO: &str = "daa1ab4e-7a2c-4404-8208-61a12c660382";
/// UUID of the stage-three (kernel or filesystem loader) partition.
const UUID_STAGE_THREE: &str = "32cfd7f2-0e0a-4908-8d3b-16d7fb3a3c57";
/// UUID of the Pure64FS filesystem partition.
const UUID_FILE_SYSTEM: &str = "f7439905-43da-4df0-b863-1f456e008b58";

const STAGE_TWO_ENTRY: u32 = 0;
const STAGE_THREE_ENTRY: u32 = 1;
const FS_ENTRY: u32 = 2;

/// Ties a config together with the disk file and filesystem snapshot
/// the builder is currently operating on.
pub struct Builder {
    pub config: Config,
    disk: StdFile,
    pub fs: Fs,
}

/// Bytes reserved for the stage-two payload in a GPT image, and the
/// offset (past the bootsector) the kernel is placed at in a flat one.
const DATA_SIZE: u64 = 4096;

impl Builder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            disk: tempfile::tempfile().expect("failed to create scratch disk file"),
            fs: Fs::default(),
        }
    }

    /// Creates a fresh disk image at `path`, sized and laid out per
    /// `self.config`.
    pub fn create_disk(&mut self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let result = self.create_disk_inner(path);
        if let Err(ref err) = result {
            log::error!("create_disk failed: {err}");
        }
        result
    }

    fn create_disk_inner(&mut self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let mut disk = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        zero_fill(&mut disk, self.config.disk_size.0)?;

        self.write_bootsector(&mut disk)?;
        self.write_partitions(&mut disk)?;

        self.disk = disk;
        Ok(())
    }

    /// Reopens an existing disk image, importing its GPT (and the
    /// filesystem partition, if `fs_loader` is set) so subsequent calls
    /// can inspect or mutate it.
    pub fn open_disk(&mut self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let result = self.open_disk_inner(path);
        if let Err(ref err) = result {
            log::error!("open_disk failed: {err}");
        }
        result
    }

    fn open_disk_inner(&mut self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let mut disk = OpenOptions::new().read(true).write(true).open(path)?;

        if self.config.partition_scheme == PartitionScheme::Gpt {
            let gpt = Gpt::import(&mut disk)?;
            if self.config.fs_loader {
                let offset = gpt.get_partition_offset(FS_ENTRY)?;
                let size = self.fs_size()?;
                let mut partition = PartitionStream::new(&mut disk, offset, size);
                self.fs = Fs::import(&mut partition)?;
            }
        }

        self.disk = disk;
        Ok(())
    }

    /// Writes the in-memory filesystem back to its partition. A no-op
    /// unless `fs_loader` is set.
    pub fn save_disk(&mut self) -> Result<()> {
        let result = self.save_disk_inner();
        if let Err(ref err) = result {
            log::error!("save_disk failed: {err}");
        }
        result
    }

    fn save_disk_inner(&mut self) -> Result<()> {
        if !self.config.fs_loader {
            return Ok(());
        }
        if self.config.partition_scheme != PartitionScheme::Gpt {
            return Ok(());
        }

        let gpt = Gpt::import(&mut self.disk)?;
        let offset = gpt.get_partition_offset(FS_ENTRY)?;
        let size = self.fs_size()?;
        {
            let mut partition = PartitionStream::new(&mut self.disk, offset, size);
            self.fs.export(&mut partition)?;
        }
        gpt.export(&mut self.disk)?;
        Ok(())
    }

    fn fs_size(&self) -> Result<u64> {
        self.config
            .fs_size
            .map(|s| s.0)
            .ok_or_else(|| Error::invalid_argument("fs_size is required when fs_loader is set"))
    }

    fn write_bootsector(&mut self, disk: &mut StdFile) -> Result<()> {
        let path = resources::bootsector_path(&self.config)?;
        let data = std::fs::read(&path)?;
        disk.flush()?;
        std::io::Seek::seek(disk, std::io::SeekFrom::Start(0))?;
        disk.write_all(&data)?;
        log::debug!("wrote boot sector from {}", path.display());
        Ok(())
    }

    fn write_partitions(&mut self, disk: &mut StdFile) -> Result<()> {
        match self.config.partition_scheme {
            PartitionScheme::None => self.write_flat_partition(disk),
            PartitionScheme::Gpt => self.write_gpt_partitions(disk),
        }
    }

    /// `partition_scheme = "none"`: no GPT, no MBR patching. Stage two is
    /// written right after the bootsector; the kernel follows it at a
    /// fixed `DATA_SIZE` offset. Mirrors `write_flat_partition`/
    /// `write_stage_two_bin`/`write_kernel_bin`.
    fn write_flat_partition(&mut self, disk: &mut StdFile) -> Result<()> {
        let stage_two_offset = self.config.bootsector.size();
        let path = resources::stage_two_path(&self.config);
        let data = std::fs::read(&path)?;
        write_at(disk, stage_two_offset, &data)?;
        log::debug!("wrote flat stage two from {} at {stage_two_offset:#x}", path.display());

        if self.config.fs_loader {
            // write_flat_partition returns BOOTABLE_ENOSYS here; the
            // filesystem loader has no flat-layout counterpart.
            return Err(Error::NotImplemented(
                "fs_loader is not supported with partition_scheme = \"none\"",
            ));
        }

        let kernel_path = self
            .config
            .kernel_path
            .clone()
            .ok_or_else(|| Error::invalid_argument("kernel_path is required"))?;
        let kernel_offset = stage_two_offset + DATA_SIZE;
        let data = std::fs::read(&kernel_path)?;
        write_at(disk, kernel_offset, &data)?;
        log::debug!("wrote flat kernel from {} at {kernel_offset:#x}", kernel_path.display());
        Ok(())
    }

    fn write_gpt_partitions(&mut self, disk: &mut StdFile) -> Result<()> {
        let mut gpt = Gpt::default();
        gpt.format(self.config.disk_size.0);

        self.write_stage_two(&mut gpt, disk)?;
        self.write_stage_three(&mut gpt, disk)?;
        self.write_fs_partition(&mut gpt, disk)?;

        // TODO: write_gpt_config_partition in the original never actually
        // sizes or writes the partition's file contents. Custom partition
        // content writing is unimplemented here for the same reason.
        if !self.config.partitions.is_empty() {
            log::warn!(
                "{} custom partition(s) configured, but writing their contents is not implemented",
                self.config.partitions.len()
            );
        }

        self.update_mbr(&gpt, disk)?;
        gpt.export(disk)?;
        Ok(())
    }

    fn write_stage_two(&mut self, gpt: &mut Gpt, disk: &mut StdFile) -> Result<()> {
        gpt.set_entry_type(STAGE_TWO_ENTRY, UUID_STAGE_TWO)?;
        gpt.set_entry_name_utf8(STAGE_TWO_ENTRY, "Pure64 Stage Two")?;

        let path = resources::stage_two_path(&self.config);
        let data = std::fs::read(&path)?;
        gpt.set_entry_size(STAGE_TWO_ENTRY, data.len() as u64)?;

        let offset = gpt.get_partition_offset(STAGE_TWO_ENTRY)?;
        write_at(disk, offset, &data)
    }

    fn write_stage_three(&mut self, gpt: &mut Gpt, disk: &mut StdFile) -> Result<()> {
        gpt.set_entry_type(STAGE_THREE_ENTRY, UUID_STAGE_THREE)?;

        let data = if self.config.fs_loader {
            gpt.set_entry_name_utf8(STAGE_THREE_ENTRY, "Pure64 FS Loader")?;
            let path = resources::fs_loader_path(&self.config);
            std::fs::read(&path)?
        } else {
            let kernel_path = self
                .config
                .kernel_path
                .clone()
                .ok_or_else(|| Error::invalid_argument("kernel_path is required"))?;
            gpt.set_entry_name_utf8(STAGE_THREE_ENTRY, "Pure64 Kernel")?;
            std::fs::read(&kernel_path)?
        };

        gpt.set_entry_size(STAGE_THREE_ENTRY, data.len() as u64)?;
        let offset = gpt.get_partition_offset(STAGE_THREE_ENTRY)?;
        write_at(disk, offset, &data)
    }

    fn write_fs_partition(&mut self, gpt: &mut Gpt, disk: &mut StdFile) -> Result<()> {
        if !self.config.fs_loader {
            return Ok(());
        }

        gpt.set_entry_type(FS_ENTRY, UUID_FILE_SYSTEM)?;
        gpt.set_entry_name_utf8(FS_ENTRY, "Pure64 File System")?;
        gpt.set_entry_size(FS_ENTRY, self.fs_size()?)?;

        self.fs.make_dir("/boot")?;

        let offset = gpt.get_partition_offset(FS_ENTRY)?;
        let size = self.fs_size()?;
        let mut partition = PartitionStream::new(disk, offset, size);
        self.fs.export(&mut partition)
    }

    fn update_mbr(&self, gpt: &Gpt, disk: &mut StdFile) -> Result<()> {
        let mut mbr = Mbr::read(disk)?;

        let stage_two_bytes = std::fs::metadata(resources::stage_two_path(&self.config))
            .map(|m| m.len())
            .unwrap_or(0);
        let stage_three_bytes = if self.config.fs_loader {
            std::fs::metadata(resources::fs_loader_path(&self.config))
                .map(|m| m.len())
                .unwrap_or(0)
        } else {
            0
        };

        mbr.stage2_dap.starting_lba = gpt.get_partition_offset(STAGE_TWO_ENTRY)? / 512;
        mbr.stage2_dap.sector_count = stage_two_bytes.div_ceil(512) as u16;

        mbr.stage3_dap.starting_lba = gpt.get_partition_offset(STAGE_THREE_ENTRY)? / 512;
        mbr.stage3_dap.sector_count = stage_three_bytes.div_ceil(512) as u16;

        mbr.write(disk)
    }
}

fn write_at(disk: &mut StdFile, offset: u64, data: &[u8]) -> Result<()> {
    std::io::Seek::seek(disk, std::io::SeekFrom::Start(offset))?;
    disk.write_all(data)?;
    Ok(())
}
