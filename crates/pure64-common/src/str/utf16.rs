use crate::types::{
    endian::{Endian, LittleEndian},
    number::U16,
};

/// A fixed-capacity, null-padded UTF-16LE string, as used by GPT partition
/// names (`N = 36` code units).
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct FixedUtf16Str<const N: usize> {
    data: [U16<LittleEndian>; N],
}

impl<const N: usize> Default for FixedUtf16Str<N> {
    fn default() -> Self {
        Self {
            data: [U16::new(0); N],
        }
    }
}

impl<const N: usize> FixedUtf16Str<N> {
    /// Decodes the stored code units as UTF-16, stopping at the first NUL.
    pub fn to_string(&self) -> Result<String, core::char::DecodeUtf16Error> {
        let units: Vec<u16> = self
            .data
            .iter()
            .map(|c| c.get())
            .take_while(|&c| c != 0)
            .collect();
        char::decode_utf16(units)
            .collect::<Result<String, _>>()
    }

    /// Sets the string from proper UTF-16 code units, truncating to `N - 1`
    /// units and always null-terminating, matching `set_entry_name`'s
    /// "copy up to 35 code units, null-terminate at index 35" behavior for
    /// `N = 36`.
    pub fn set_utf16(&mut self, units: &[u16]) {
        self.data = [U16::new(0); N];
        let copy_len = units.len().min(N - 1);
        for (slot, value) in self.data.iter_mut().zip(&units[..copy_len]) {
            slot.set(*value);
        }
    }

    /// Sets the string from a UTF-8 slice by zero-extending each byte into a
    /// code unit, reproducing the original implementation's ASCII-only
    /// `set_entry_name_utf8` behavior verbatim (non-ASCII input is mangled,
    /// not transcoded).
    pub fn set_ascii_zero_extend(&mut self, bytes: &[u8]) {
        self.data = [U16::new(0); N];
        let copy_len = bytes.len().min(N - 1);
        for (slot, value) in self.data.iter_mut().zip(&bytes[..copy_len]) {
            slot.set(*value as u16);
        }
    }
}

#[cfg(feature = "bytemuck")]
unsafe impl<const N: usize> bytemuck::Pod for FixedUtf16Str<N> {}
#[cfg(feature = "bytemuck")]
unsafe impl<const N: usize> bytemuck::Zeroable for FixedUtf16Str<N> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_zero_extend_matches_bytes() {
        let mut name = FixedUtf16Str::<36>::default();
        name.set_ascii_zero_extend(b"Pure64 Stage Two");
        assert_eq!(name.to_string().unwrap(), "Pure64 Stage Two");
    }

    #[test]
    fn truncates_and_null_terminates() {
        let mut name = FixedUtf16Str::<4>::default();
        name.set_ascii_zero_extend(b"abcdef");
        // Only 3 code units fit before the mandatory terminator.
        assert_eq!(name.to_string().unwrap(), "abc");
    }
}
