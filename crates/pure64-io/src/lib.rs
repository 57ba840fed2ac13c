//! Seekable byte-stream traits used across the pure64 crates.
//!
//! The disk image, partition windows, and in-memory test fixtures all
//! implement the same `Read + Write + Seek` capability set described by
//! the byte stream component; this crate is where that capability set
//! is named so it works unmodified under `no_std`.

#![no_std]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;
#[cfg(feature = "std")]
pub use std::io::{Error, ErrorKind, Result, Read, Write, Seek, SeekFrom};

#[cfg(not(feature = "std"))]
mod error;
#[cfg(not(feature = "std"))]
pub use error::Error;
