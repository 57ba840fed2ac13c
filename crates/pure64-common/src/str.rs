/// Fixed-width UTF-16 string types.
pub mod utf16;
