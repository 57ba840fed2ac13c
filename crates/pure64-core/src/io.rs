//! The byte-stream capability: a uniform seekable read/write interface
//! over files, memory buffers, or windowed sub-regions.
//!
//! This crate does not define its own trait for this — `pure64_io`'s
//! `Read + Write + Seek` bounds already name exactly the capability set
//! described by the byte stream component (get-size via `Seek::seek`
//! with `SeekFrom::End(0)`, get-position via `stream_position`,
//! set-position via `seek`, and `read`/`write`). A missing capability
//! (§4.1's "not-implemented") shows up as the host's own I/O error when a
//! caller tries to `Write` through a read-only-opened file; Rust's trait
//! bounds make the capability set static per call site rather than
//! queried at runtime.

pub use pure64_io::{Error, ErrorKind, Read, Result, Seek, SeekFrom, Write};

/// Returns the total size of a stream without disturbing its current
/// position, the common pattern every size-dependent operation in this
/// crate needs (GPT formatting, filesystem export sizing, bootsector
/// writes).
pub fn stream_len<T: Read + Write + Seek>(stream: &mut T) -> Result<u64> {
    let current = stream.stream_position()?;
    let len = stream.seek(SeekFrom::End(0))?;
    stream.seek(SeekFrom::Start(current))?;
    Ok(len)
}

/// Zero-fills `stream` to exactly `size` bytes, truncating or extending
/// as needed. Used by the image builder's `init` step to pre-size the
/// output file before any content is written.
pub fn zero_fill<T: Read + Write + Seek>(stream: &mut T, size: u64) -> Result<()> {
    stream.seek(SeekFrom::Start(0))?;
    stream.set_len_zeroed(size)
}

/// Extension point so `zero_fill` works identically over a `File` (which
/// has a native `set_len`) and an in-memory `Cursor<Vec<u8>>` (which
/// does not).
pub trait SetLenZeroed {
    fn set_len_zeroed(&mut self, size: u64) -> Result<()>;
}

impl SetLenZeroed for std::fs::File {
    fn set_len_zeroed(&mut self, size: u64) -> Result<()> {
        self.set_len(size)
    }
}

impl SetLenZeroed for std::io::Cursor<Vec<u8>> {
    fn set_len_zeroed(&mut self, size: u64) -> Result<()> {
        self.get_mut().resize(size as usize, 0);
        Ok(())
    }
}
