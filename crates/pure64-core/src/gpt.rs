//! GPT primary/backup header + entry-array management: formatting,
//! partition placement, naming, typing, checksumming, import/export.
//!
//! Grounded in `bootable_gpt_format`/`set_entry_size`/`export` et al.
//! The layout, placement algorithm, and checksum pass are reproduced
//! bit-for-bit, including the documented quirks called out inline.

use crate::codec::{decode_u32, decode_u64, encode_u32, encode_u64};
use crate::error::{Error, Result};
use crate::io::{Read, Seek, SeekFrom, Write};
use pure64_common::alg::hash::crc::Crc32HasherIsoHdlc;
use pure64_common::part::gpt::{
    Guid, GptPartitionEntry, GptPartitionTableHeader, GPT_ENTRY_COUNT, GPT_ENTRY_SIZE,
};
use pure64_common::types::endian::Endian;
use pure64_common::uuid;

pub const SECTOR_SIZE: u64 = 512;
const HEADER_SIZE: u64 = 92;

#[derive(Debug, Clone)]
pub struct Gpt {
    pub primary_header: GptPartitionTableHeader,
    pub backup_header: GptPartitionTableHeader,
    pub primary_entries: Vec<GptPartitionEntry>,
    pub backup_entries: Vec<GptPartitionEntry>,
}

impl Default for Gpt {
    fn default() -> Self {
        Self {
            primary_header: GptPartitionTableHeader::default(),
            backup_header: GptPartitionTableHeader::default(),
            primary_entries: vec![GptPartitionEntry::default(); GPT_ENTRY_COUNT as usize],
            backup_entries: vec![GptPartitionEntry::default(); GPT_ENTRY_COUNT as usize],
        }
    }
}

/// Bound check used by the per-entry mutators. This reproduces the
/// original's `entry_index > count` comparison rather than `>=`: index
/// `== count` is (incorrectly, but observably) accepted. See design notes.
fn check_index_loose(gpt: &Gpt, entry_index: u32) -> Result<()> {
    if entry_index > gpt.primary_header.num_partition_entries.get()
        || entry_index > gpt.backup_header.num_partition_entries.get()
    {
        return Err(Error::invalid_argument(format!(
            "entry index {entry_index} out of range"
        )));
    }
    Ok(())
}

impl Gpt {
    /// Establishes the primary/backup header and entry-array layout for a
    /// disk of `disk_size` bytes.
    pub fn format(&mut self, disk_size: u64) {
        let backup_lba = (disk_size - SECTOR_SIZE) / SECTOR_SIZE;
        let mut first_usable_lba = (1 + 1) * SECTOR_SIZE;
        first_usable_lba += u64::from(GPT_ENTRY_COUNT) * GPT_ENTRY_SIZE;
        first_usable_lba /= SECTOR_SIZE;

        let mut last_usable_lba = backup_lba * SECTOR_SIZE;
        last_usable_lba -= u64::from(GPT_ENTRY_COUNT) * GPT_ENTRY_SIZE;
        last_usable_lba -= SECTOR_SIZE;
        last_usable_lba /= SECTOR_SIZE;

        self.primary_header.current_lba.set(1);
        self.primary_header.backup_lba.set(backup_lba);
        self.primary_header.first_usable_lba.set(first_usable_lba);
        self.primary_header.last_usable_lba.set(last_usable_lba);
        self.primary_header.partition_entry_lba.set(2);
        self.primary_header
            .num_partition_entries
            .set(GPT_ENTRY_COUNT);

        self.backup_header.first_usable_lba.set(first_usable_lba);
        self.backup_header.last_usable_lba.set(last_usable_lba);
        self.backup_header.num_partition_entries.set(GPT_ENTRY_COUNT);
        self.backup_header.current_lba.set(backup_lba);
        self.backup_header.backup_lba.set(1);
        let mut backup_entries_lba = self.backup_header.current_lba.get() * SECTOR_SIZE;
        backup_entries_lba -= u64::from(GPT_ENTRY_COUNT) * GPT_ENTRY_SIZE;
        backup_entries_lba /= SECTOR_SIZE;
        self.backup_header.partition_entry_lba.set(backup_entries_lba);

        self.primary_entries = vec![GptPartitionEntry::default(); GPT_ENTRY_COUNT as usize];
        self.backup_entries = vec![GptPartitionEntry::default(); GPT_ENTRY_COUNT as usize];

        log::debug!(
            "formatted GPT for {disk_size} bytes: first_usable={first_usable_lba} last_usable={last_usable_lba} backup_lba={backup_lba}"
        );
    }

    pub fn set_disk_uuid(&mut self, disk_uuid: Guid) {
        self.primary_header.disk_guid = disk_uuid;
        self.backup_header.disk_guid = disk_uuid;
    }

    /// First entry whose LBAs are both zero (unused).
    pub fn find_unused_entry(&self) -> Result<u32> {
        for (i, entry) in self.primary_entries.iter().enumerate() {
            if !entry.is_used() {
                return Ok(i as u32);
            }
        }
        Err(Error::no_space("no unused GPT entry available"))
    }

    /// `entry_index == count` is accepted here, via `check_index_loose`.
    pub fn get_partition_offset(&self, entry_index: u32) -> Result<u64> {
        check_index_loose(self, entry_index)?;
        Ok(self.primary_entries[entry_index as usize].offset())
    }

    pub fn get_partition_size(&self, entry_index: u32) -> Result<u64> {
        check_index_loose(self, entry_index)?;
        Ok(self.primary_entries[entry_index as usize].size())
    }

    /// Unlike the setters, lookup uses a strict `>=` bound (matches
    /// `bootable_gpt_get_entry`, which is stricter than its siblings).
    pub fn get_entry(&self, entry_index: u32) -> Option<&GptPartitionEntry> {
        if entry_index >= self.primary_header.num_partition_entries.get() {
            None
        } else {
            Some(&self.primary_entries[entry_index as usize])
        }
    }

    pub fn set_entry_name_utf16(&mut self, entry_index: u32, units: &[u16]) -> Result<()> {
        check_index_loose(self, entry_index)?;
        self.primary_entries[entry_index as usize]
            .partition_name
            .set_utf16(units);
        self.backup_entries[entry_index as usize]
            .partition_name
            .set_utf16(units);
        Ok(())
    }

    /// Zero-extends each input byte into a UTF-16 code unit, matching the
    /// original's `set_entry_name_utf8` TODO (ASCII-correct, mangles
    /// multi-byte UTF-8 input). See design notes item 2.
    pub fn set_entry_name_utf8(&mut self, entry_index: u32, name: &str) -> Result<()> {
        check_index_loose(self, entry_index)?;
        self.primary_entries[entry_index as usize]
            .partition_name
            .set_ascii_zero_extend(name.as_bytes());
        self.backup_entries[entry_index as usize]
            .partition_name
            .set_ascii_zero_extend(name.as_bytes());
        Ok(())
    }

    pub fn set_entry_type(&mut self, entry_index: u32, type_uuid_text: &str) -> Result<()> {
        check_index_loose(self, entry_index)?;
        let type_guid =
            uuid::parse(type_uuid_text).map_err(|e| Error::invalid_argument(e.to_string()))?;
        self.primary_entries[entry_index as usize].type_guid = type_guid;
        self.backup_entries[entry_index as usize].type_guid = type_guid;
        Ok(())
    }

    /// Places `entry_index` at the first LBA range big enough for `size`
    /// bytes that the single-pass sweep over existing used entries
    /// produces. See design notes item 1: this does not guarantee
    /// non-overlap when entries are sized out of order — reproduced as-is.
    pub fn set_entry_size(&mut self, entry_index: u32, size: u64) -> Result<()> {
        check_index_loose(self, entry_index)?;

        let mut first_lba = self.primary_header.first_usable_lba.get();
        let mut lba_count = size.div_ceil(SECTOR_SIZE);
        if lba_count == 0 {
            lba_count = 1;
        }
        let mut last_lba = first_lba + lba_count - 1;

        for (i, entry) in self.primary_entries.iter().enumerate() {
            if !entry.is_used() {
                continue;
            }
            if first_lba >= entry.first_lba.get() || last_lba >= entry.first_lba.get() {
                log::warn!(
                    "GPT entry {entry_index} placement swept past entry {i}; overlap possible with later entries"
                );
                first_lba = entry.last_lba.get() + 1;
                last_lba = first_lba + lba_count - 1;
            }
        }

        if last_lba > self.primary_header.last_usable_lba.get() {
            return Err(Error::no_space(format!(
                "partition of {size} bytes does not fit in the usable GPT region"
            )));
        }

        self.primary_entries[entry_index as usize].first_lba.set(first_lba);
        self.primary_entries[entry_index as usize].last_lba.set(last_lba);
        self.backup_entries[entry_index as usize].first_lba.set(first_lba);
        self.backup_entries[entry_index as usize].last_lba.set(last_lba);

        Ok(())
    }

    /// Reads the primary header+entries, then the backup header+entries,
    /// from their respective locations. Does not verify checksums — see
    /// [`Gpt::verify_checksums`] and design notes item 3.
    pub fn import<T: Read + Write + Seek>(stream: &mut T) -> Result<Self> {
        let mut gpt = Self::default();

        stream.seek(SeekFrom::Start(SECTOR_SIZE))?;
        gpt.primary_header = read_header(stream)?;

        stream.seek(SeekFrom::Start(2 * SECTOR_SIZE))?;
        for entry in gpt.primary_entries.iter_mut() {
            *entry = read_entry(stream)?;
        }

        stream.seek(SeekFrom::Start(
            gpt.primary_header.backup_lba.get() * SECTOR_SIZE,
        ))?;
        gpt.backup_header = read_header(stream)?;

        stream.seek(SeekFrom::Start(
            gpt.backup_header.partition_entry_lba.get() * SECTOR_SIZE,
        ))?;
        for entry in gpt.backup_entries.iter_mut() {
            *entry = read_entry(stream)?;
        }

        log::debug!("imported GPT: backup_lba={}", gpt.primary_header.backup_lba.get());
        Ok(gpt)
    }

    /// Writes primary header, primary entries, backup entries, backup
    /// header (in that order) and finally stamps all four checksums.
    pub fn export<T: Read + Write + Seek>(&self, stream: &mut T) -> Result<()> {
        stream.seek(SeekFrom::Start(SECTOR_SIZE))?;
        write_header(&self.primary_header, stream)?;

        for entry in self.primary_entries.iter() {
            write_entry(entry, stream)?;
        }

        stream.seek(SeekFrom::Start(
            self.backup_header.partition_entry_lba.get() * SECTOR_SIZE,
        ))?;
        for entry in self.backup_entries.iter() {
            write_entry(entry, stream)?;
        }

        write_header(&self.backup_header, stream)?;

        compute_checksums(stream)?;
        log::debug!("exported GPT and stamped checksums");
        Ok(())
    }

    /// Not called by `export`/`import` (see design notes item 3); provided
    /// for callers that want to verify checksums on read explicitly.
    pub fn verify_checksums<T: Read + Write + Seek>(stream: &mut T) -> Result<bool> {
        let primary_ok = verify_header_checksum(stream, SECTOR_SIZE)?;
        stream.seek(SeekFrom::Start(SECTOR_SIZE + 32))?;
        let backup_lba = decode_u64(stream)?;
        let backup_ok = verify_header_checksum(stream, backup_lba * SECTOR_SIZE)?;
        Ok(primary_ok && backup_ok)
    }
}

fn read_header<T: Read>(stream: &mut T) -> Result<GptPartitionTableHeader> {
    let mut signature = [0u8; 8];
    stream.read_exact(&mut signature)?;
    let revision = decode_u32(stream)?;
    let header_size = decode_u32(stream)?;
    let crc32 = decode_u32(stream)?;
    let reserved = decode_u32(stream)?;
    let current_lba = decode_u64(stream)?;
    let backup_lba = decode_u64(stream)?;
    let first_usable_lba = decode_u64(stream)?;
    let last_usable_lba = decode_u64(stream)?;
    let mut disk_guid = [0u8; 16];
    stream.read_exact(&mut disk_guid)?;
    let partition_entry_lba = decode_u64(stream)?;
    let num_partition_entries = decode_u32(stream)?;
    let size_of_partition_entry = decode_u32(stream)?;
    let partition_entry_array_crc32 = decode_u32(stream)?;

    use pure64_common::types::number::{U32, U64};
    Ok(GptPartitionTableHeader {
        signature,
        revision: U32::new(revision),
        header_size: U32::new(header_size),
        crc32: U32::new(crc32),
        reserved: U32::new(reserved),
        current_lba: U64::new(current_lba),
        backup_lba: U64::new(backup_lba),
        first_usable_lba: U64::new(first_usable_lba),
        last_usable_lba: U64::new(last_usable_lba),
        disk_guid: Guid(disk_guid),
        partition_entry_lba: U64::new(partition_entry_lba),
        num_partition_entries: U32::new(num_partition_entries),
        size_of_partition_entry: U32::new(size_of_partition_entry),
        partition_entry_array_crc32: U32::new(partition_entry_array_crc32),
    })
}

fn write_header<T: Write>(header: &GptPartitionTableHeader, stream: &mut T) -> Result<()> {
    stream.write_all(&header.signature)?;
    encode_u32(header.revision.get(), stream)?;
    encode_u32(header.header_size.get(), stream)?;
    encode_u32(header.crc32.get(), stream)?;
    encode_u32(header.reserved.get(), stream)?;
    encode_u64(header.current_lba.get(), stream)?;
    encode_u64(header.backup_lba.get(), stream)?;
    encode_u64(header.first_usable_lba.get(), stream)?;
    encode_u64(header.last_usable_lba.get(), stream)?;
    stream.write_all(&header.disk_guid.0)?;
    encode_u64(header.partition_entry_lba.get(), stream)?;
    encode_u32(header.num_partition_entries.get(), stream)?;
    encode_u32(header.size_of_partition_entry.get(), stream)?;
    encode_u32(header.partition_entry_array_crc32.get(), stream)?;
    Ok(())
}

fn read_entry<T: Read>(stream: &mut T) -> Result<GptPartitionEntry> {
    let mut buf = [0u8; 128];
    stream.read_exact(&mut buf)?;
    Ok(*bytemuck::from_bytes(&buf))
}

fn write_entry<T: Write>(entry: &GptPartitionEntry, stream: &mut T) -> Result<()> {
    stream.write_all(bytemuck::bytes_of(entry))?;
    Ok(())
}

/// Implements the four-step checksum pass from `calculate_checksums`:
/// entries first (primary then backup), then headers (primary then
/// backup), each computed over the on-disk bytes with the header's own
/// checksum field held at zero during the computation.
fn compute_checksums<T: Read + Write + Seek>(stream: &mut T) -> Result<()> {
    let entries_size = GPT_ENTRY_SIZE * u64::from(GPT_ENTRY_COUNT);

    stream.seek(SeekFrom::Start(2 * SECTOR_SIZE))?;
    let mut primary_entries = vec![0u8; entries_size as usize];
    stream.read_exact(&mut primary_entries)?;
    let primary_entries_crc = Crc32HasherIsoHdlc::checksum(&primary_entries);

    stream.seek(SeekFrom::Start(SECTOR_SIZE + 88))?;
    encode_u32(primary_entries_crc, stream)?;

    stream.seek(SeekFrom::Start(SECTOR_SIZE + 32))?;
    let backup_lba = decode_u64(stream)?;

    let backup_entries_pos = backup_lba * SECTOR_SIZE - entries_size;
    stream.seek(SeekFrom::Start(backup_entries_pos))?;
    let mut backup_entries = vec![0u8; entries_size as usize];
    stream.read_exact(&mut backup_entries)?;
    let backup_entries_crc = Crc32HasherIsoHdlc::checksum(&backup_entries);

    stream.seek(SeekFrom::Start(backup_lba * SECTOR_SIZE + 88))?;
    encode_u32(backup_entries_crc, stream)?;

    stamp_header_checksum(stream, SECTOR_SIZE)?;
    stamp_header_checksum(stream, backup_lba * SECTOR_SIZE)?;

    Ok(())
}

fn stamp_header_checksum<T: Read + Write + Seek>(stream: &mut T, header_location: u64) -> Result<()> {
    // Zero the checksum field before computing, matching the original's
    // "checksum field zero during computation" contract.
    stream.seek(SeekFrom::Start(header_location + 16))?;
    encode_u32(0, stream)?;

    stream.seek(SeekFrom::Start(header_location))?;
    let mut buf = [0u8; HEADER_SIZE as usize];
    stream.read_exact(&mut buf)?;
    let checksum = Crc32HasherIsoHdlc::checksum(&buf);

    stream.seek(SeekFrom::Start(header_location + 16))?;
    encode_u32(checksum, stream)?;
    Ok(())
}

fn verify_header_checksum<T: Read + Write + Seek>(stream: &mut T, header_location: u64) -> Result<bool> {
    stream.seek(SeekFrom::Start(header_location))?;
    let mut buf = [0u8; HEADER_SIZE as usize];
    stream.read_exact(&mut buf)?;
    let stored = u32::from_le_bytes(buf[16..20].try_into().unwrap());
    buf[16..20].copy_from_slice(&0u32.to_le_bytes());
    let recomputed = Crc32HasherIsoHdlc::checksum(&buf);
    Ok(stored == recomputed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn disk_of(size: u64) -> Cursor<Vec<u8>> {
        Cursor::new(vec![0u8; size as usize])
    }

    #[test]
    fn format_matches_layout_property() {
        let disk_size = 64 * 1024 * 1024;
        let mut gpt = Gpt::default();
        gpt.format(disk_size);

        assert_eq!(gpt.primary_header.current_lba.get(), 1);
        let backup_lba = (disk_size - 512) / 512;
        assert_eq!(gpt.backup_header.current_lba.get(), backup_lba);
        assert_eq!(gpt.primary_header.first_usable_lba.get(), 34);
        assert_eq!(gpt.primary_header.last_usable_lba.get(), backup_lba - 33);
        assert_eq!(gpt.backup_header.partition_entry_lba.get(), backup_lba - 32);
    }

    #[test]
    fn export_then_reread_checksums_verify() {
        let disk_size = 16 * 1024 * 1024;
        let mut gpt = Gpt::default();
        gpt.format(disk_size);
        gpt.set_entry_size(0, 4096).unwrap();
        gpt.set_entry_type(0, "daa1ab4e-7a2c-4404-8208-61a12c660382")
            .unwrap();

        let mut disk = disk_of(disk_size);
        gpt.export(&mut disk).unwrap();

        assert!(Gpt::verify_checksums(&mut disk).unwrap());
    }

    #[test]
    fn import_round_trips_a_formatted_gpt() {
        let disk_size = 16 * 1024 * 1024;
        let mut gpt = Gpt::default();
        gpt.format(disk_size);
        gpt.set_entry_size(0, 4096).unwrap();

        let mut disk = disk_of(disk_size);
        gpt.export(&mut disk).unwrap();

        let imported = Gpt::import(&mut disk).unwrap();
        assert_eq!(
            imported.primary_header.backup_lba.get(),
            gpt.primary_header.backup_lba.get()
        );
        assert_eq!(
            imported.primary_entries[0].first_lba.get(),
            gpt.primary_entries[0].first_lba.get()
        );
    }

    #[test]
    fn entry_size_overflow_fails_with_no_space() {
        let disk_size = 2 * 1024 * 1024;
        let mut gpt = Gpt::default();
        gpt.format(disk_size);
        assert!(gpt.set_entry_size(0, disk_size).is_err());
    }

    #[test]
    fn get_entry_uses_strict_bound() {
        let mut gpt = Gpt::default();
        gpt.format(16 * 1024 * 1024);
        assert!(gpt.get_entry(GPT_ENTRY_COUNT).is_none());
        assert!(gpt.get_entry(GPT_ENTRY_COUNT - 1).is_some());
    }

    #[test]
    fn set_entry_accepts_index_equal_to_count() {
        // Reproduces the `index > count` (not `>=`) bound check.
        let mut gpt = Gpt::default();
        gpt.format(16 * 1024 * 1024);
        assert!(check_index_loose(&gpt, GPT_ENTRY_COUNT).is_ok());
        assert!(check_index_loose(&gpt, GPT_ENTRY_COUNT + 1).is_err());
    }

    #[test]
    fn utf8_name_zero_extends_ascii_bytes() {
        let mut gpt = Gpt::default();
        gpt.format(16 * 1024 * 1024);
        gpt.set_entry_name_utf8(0, "Pure64 Stage Two").unwrap();
        assert_eq!(
            gpt.primary_entries[0].partition_name.to_string().unwrap(),
            "Pure64 Stage Two"
        );
    }
}
