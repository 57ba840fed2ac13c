/// Endianness markers and conversion helpers.
pub mod endian;
/// Endian-aware fixed-width integer wrapper types.
pub mod number;
