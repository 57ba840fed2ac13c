//! Disk Address Packet: the 16-byte structure the MBR's boot code passes
//! to the BIOS extended-read service (INT 13h, AH=42h) to load a stage
//! from an absolute LBA.

use crate::codec::{decode_u16, decode_u64, encode_u16, encode_u64};
use crate::io::{Read, Result, Write};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Dap {
    pub sector_count: u16,
    pub load_offset: u16,
    pub load_segment: u16,
    pub starting_lba: u64,
}

impl Dap {
    pub const SIZE: usize = 16;

    pub fn read<T: Read>(stream: &mut T) -> Result<Self> {
        let mut reserved = [0u8; 2];
        stream.read_exact(&mut reserved)?;
        let sector_count = decode_u16(stream)?;
        let load_offset = decode_u16(stream)?;
        let load_segment = decode_u16(stream)?;
        let starting_lba = decode_u64(stream)?;
        Ok(Self {
            sector_count,
            load_offset,
            load_segment,
            starting_lba,
        })
    }

    pub fn write<T: Write>(&self, stream: &mut T) -> Result<()> {
        stream.write_all(&[0u8; 2])?;
        encode_u16(self.sector_count, stream)?;
        encode_u16(self.load_offset, stream)?;
        encode_u16(self.load_segment, stream)?;
        encode_u64(self.starting_lba, stream)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trips() {
        let dap = Dap {
            sector_count: 8,
            load_offset: 0x7c00,
            load_segment: 0,
            starting_lba: 34,
        };
        let mut buf = Cursor::new(Vec::new());
        dap.write(&mut buf).unwrap();
        assert_eq!(buf.get_ref().len(), Dap::SIZE);

        buf.set_position(0);
        assert_eq!(Dap::read(&mut buf).unwrap(), dap);
    }

    #[test]
    fn reserved_bytes_are_zero_on_write() {
        let dap = Dap::default();
        let mut buf = Cursor::new(Vec::new());
        dap.write(&mut buf).unwrap();
        assert_eq!(&buf.get_ref()[0..2], &[0, 0]);
    }
}
