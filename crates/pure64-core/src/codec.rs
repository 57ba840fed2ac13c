//! Little-endian fixed-width integer encode/decode over a byte stream.
//!
//! Pure functions, no buffering beyond the fixed-size arrays the
//! primitive itself occupies; every read or write is exact or it fails.

use crate::io::{Read, Result, Write};

pub fn encode_u16<T: Write>(value: u16, stream: &mut T) -> Result<()> {
    stream.write_all(&value.to_le_bytes())
}

pub fn encode_u32<T: Write>(value: u32, stream: &mut T) -> Result<()> {
    stream.write_all(&value.to_le_bytes())
}

pub fn encode_u64<T: Write>(value: u64, stream: &mut T) -> Result<()> {
    stream.write_all(&value.to_le_bytes())
}

pub fn decode_u16<T: Read>(stream: &mut T) -> Result<u16> {
    let mut buf = [0u8; 2];
    stream.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

pub fn decode_u32<T: Read>(stream: &mut T) -> Result<u32> {
    let mut buf = [0u8; 4];
    stream.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

pub fn decode_u64<T: Read>(stream: &mut T) -> Result<u64> {
    let mut buf = [0u8; 8];
    stream.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trips_all_widths() {
        let mut buf = Cursor::new(Vec::new());
        encode_u16(0x1234, &mut buf).unwrap();
        encode_u32(0xdead_beef, &mut buf).unwrap();
        encode_u64(0x0123_4567_89ab_cdef, &mut buf).unwrap();

        buf.set_position(0);
        assert_eq!(decode_u16(&mut buf).unwrap(), 0x1234);
        assert_eq!(decode_u32(&mut buf).unwrap(), 0xdead_beef);
        assert_eq!(decode_u64(&mut buf).unwrap(), 0x0123_4567_89ab_cdef);
    }

    #[test]
    fn short_read_is_io_error() {
        let mut buf = Cursor::new(vec![0x01]);
        assert!(decode_u32(&mut buf).is_err());
    }
}
