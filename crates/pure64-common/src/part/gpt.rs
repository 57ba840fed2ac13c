//! On-disk wire types for the GUID Partition Table.
//!
//! These are plain, `bytemuck`-`Pod` structs matching the UEFI GPT layout
//! byte-for-byte; the mutation algorithms (formatting, entry placement,
//! checksumming) live in `pure64_core::gpt` and operate on these types.

use crate::{
    str::utf16::FixedUtf16Str,
    types::{
        endian::{Endian, LittleEndian},
        number::{U32, U64},
    },
};

#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "bytemuck", derive(bytemuck::Pod, bytemuck::Zeroable))]
pub struct Guid(pub [u8; 16]);

impl Default for Guid {
    fn default() -> Self {
        Self([0; 16])
    }
}

impl Guid {
    pub const ZERO: Self = Self([0; 16]);

    pub const fn is_zero(&self) -> bool {
        let mut i = 0;
        while i < 16 {
            if self.0[i] != 0 {
                return false;
            }
            i += 1;
        }
        true
    }
}

/// 92-byte GPT header, little-endian, matching the UEFI specification.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "bytemuck", derive(bytemuck::Pod, bytemuck::Zeroable))]
pub struct GptPartitionTableHeader {
    /// Must be `"EFI PART"`.
    pub signature: [u8; 8],
    pub revision: U32<LittleEndian>,
    pub header_size: U32<LittleEndian>,
    pub crc32: U32<LittleEndian>,
    pub reserved: U32<LittleEndian>,
    pub current_lba: U64<LittleEndian>,
    pub backup_lba: U64<LittleEndian>,
    pub first_usable_lba: U64<LittleEndian>,
    pub last_usable_lba: U64<LittleEndian>,
    pub disk_guid: Guid,
    pub partition_entry_lba: U64<LittleEndian>,
    pub num_partition_entries: U32<LittleEndian>,
    /// Size of each partition entry, in bytes. Must be `128 * 2^n`.
    pub size_of_partition_entry: U32<LittleEndian>,
    pub partition_entry_array_crc32: U32<LittleEndian>,
}

impl GptPartitionTableHeader {
    pub const SIGNATURE: [u8; 8] = *b"EFI PART";
    pub const REVISION: u32 = 0x0001_0000;
    pub const HEADER_SIZE: u32 = 0x5C;
}

impl Default for GptPartitionTableHeader {
    fn default() -> Self {
        Self {
            signature: Self::SIGNATURE,
            revision: U32::new(Self::REVISION),
            header_size: U32::new(Self::HEADER_SIZE),
            crc32: U32::new(0),
            reserved: U32::new(0),
            current_lba: U64::new(0),
            backup_lba: U64::new(0),
            first_usable_lba: U64::new(0),
            last_usable_lba: U64::new(0),
            disk_guid: Guid::default(),
            partition_entry_lba: U64::new(0),
            num_partition_entries: U32::new(0),
            size_of_partition_entry: U32::new(128),
            partition_entry_array_crc32: U32::new(0),
        }
    }
}

static_assertions::const_assert_eq!(core::mem::size_of::<GptPartitionTableHeader>(), 92);

/// 128-byte GPT partition entry.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "bytemuck", derive(bytemuck::Pod, bytemuck::Zeroable))]
pub struct GptPartitionEntry {
    pub type_guid: Guid,
    pub unique_partition_guid: Guid,
    pub first_lba: U64<LittleEndian>,
    pub last_lba: U64<LittleEndian>,
    pub attributes: U64<LittleEndian>,
    pub partition_name: FixedUtf16Str<36>,
}

impl Default for GptPartitionEntry {
    fn default() -> Self {
        Self {
            type_guid: Guid::ZERO,
            unique_partition_guid: Guid::ZERO,
            first_lba: U64::new(0),
            last_lba: U64::new(0),
            attributes: U64::new(0),
            partition_name: FixedUtf16Str::default(),
        }
    }
}

impl GptPartitionEntry {
    /// An entry is used when either LBA field is non-zero, matching the
    /// original implementation's `is_used` check.
    pub fn is_used(&self) -> bool {
        self.first_lba.get() != 0 || self.last_lba.get() != 0
    }

    pub fn offset(&self) -> u64 {
        self.first_lba.get() * 512
    }

    pub fn size(&self) -> u64 {
        (self.last_lba.get() - self.first_lba.get() + 1) * 512
    }
}

static_assertions::const_assert_eq!(core::mem::size_of::<GptPartitionEntry>(), 128);

pub const GPT_ENTRY_SIZE: u64 = 128;
pub const GPT_ENTRY_COUNT: u32 = 128;
