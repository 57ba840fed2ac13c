//! The 512-byte master boot record: 476 bytes of opaque boot code, two
//! back-to-back Disk Address Packets, and the `0xAA55` signature.
//!
//! Unlike a conventional MBR this format carries no partition table of
//! its own (`partition_scheme = gpt` is the only scheme this crate
//! formats) — the two DAPs are how the boot code finds the stage-two and
//! stage-three payloads.

use crate::dap::Dap;
use crate::error::{Error, Result};
use crate::io::{Read, Seek, SeekFrom, Write};

pub const SIZE: usize = 512;
pub const BOOT_CODE_SIZE: usize = 476;
pub const SIGNATURE: u16 = 0xAA55;

#[derive(Debug, Clone)]
pub struct Mbr {
    pub boot_code: Vec<u8>,
    pub stage2_dap: Dap,
    pub stage3_dap: Dap,
    pub signature: u16,
}

impl Default for Mbr {
    fn default() -> Self {
        Self {
            boot_code: vec![0u8; BOOT_CODE_SIZE],
            stage2_dap: Dap::default(),
            stage3_dap: Dap::default(),
            signature: 0,
        }
    }
}

impl Mbr {
    pub fn read<T: Read + Seek>(stream: &mut T) -> Result<Self> {
        stream.seek(SeekFrom::Start(0))?;
        let mut boot_code = vec![0u8; BOOT_CODE_SIZE];
        stream.read_exact(&mut boot_code)?;
        let stage2_dap = Dap::read(stream)?;
        let stage3_dap = Dap::read(stream)?;
        let mut sig = [0u8; 2];
        stream.read_exact(&mut sig)?;
        let signature = u16::from_le_bytes(sig);
        Ok(Self {
            boot_code,
            stage2_dap,
            stage3_dap,
            signature,
        })
    }

    pub fn write<T: Write + Seek>(&self, stream: &mut T) -> Result<()> {
        stream.seek(SeekFrom::Start(0))?;
        let mut boot_code = self.boot_code.clone();
        boot_code.resize(BOOT_CODE_SIZE, 0);
        stream.write_all(&boot_code)?;
        self.stage2_dap.write(stream)?;
        self.stage3_dap.write(stream)?;
        stream.write_all(&self.signature.to_le_bytes())?;
        Ok(())
    }

    /// Fails with `invalid-argument` unless the signature is `0xAA55`.
    pub fn check(&self) -> Result<()> {
        if self.signature != SIGNATURE {
            return Err(Error::invalid_argument(format!(
                "MBR signature {:#06x} != {SIGNATURE:#06x}",
                self.signature
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn backing() -> Cursor<Vec<u8>> {
        Cursor::new(vec![0u8; SIZE])
    }

    #[test]
    fn zeroed_mbr_fails_check() {
        let mbr = Mbr::default();
        assert!(mbr.check().is_err());
    }

    #[test]
    fn signed_mbr_passes_check() {
        let mut mbr = Mbr::default();
        mbr.signature = SIGNATURE;
        assert!(mbr.check().is_ok());
    }

    #[test]
    fn round_trips_through_a_stream() {
        let mut mbr = Mbr::default();
        mbr.signature = SIGNATURE;
        mbr.stage2_dap.starting_lba = 34;
        mbr.stage3_dap.starting_lba = 42;

        let mut stream = backing();
        mbr.write(&mut stream).unwrap();
        assert_eq!(stream.get_ref().len(), SIZE);

        let read_back = Mbr::read(&mut stream).unwrap();
        assert_eq!(read_back.signature, SIGNATURE);
        assert_eq!(read_back.stage2_dap.starting_lba, 34);
        assert_eq!(read_back.stage3_dap.starting_lba, 42);
    }
}
