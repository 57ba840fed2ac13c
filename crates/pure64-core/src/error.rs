//! The error taxonomy shared by every component in this crate.
//!
//! Mirrors the finite set of error kinds the image-construction engine has
//! always reported (bad address, out of memory, is/not-directory, not
//! found, already exists, invalid argument, not implemented, I/O, no
//! space) as a single `thiserror`-derived sum type.

/// `Result` alias used throughout this crate.
pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("bad address: {0}")]
    BadAddress(&'static str),

    #[error("out of memory")]
    OutOfMemory,

    #[error("{0} is a directory")]
    IsDirectory(String),

    #[error("{0} is not a directory")]
    NotDirectory(String),

    #[error("no such file or directory: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not implemented: {0}")]
    NotImplemented(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no space left: {0}")]
    NoSpace(String),
}

impl Error {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    pub fn already_exists(path: impl Into<String>) -> Self {
        Self::AlreadyExists(path.into())
    }

    pub fn no_space(msg: impl Into<String>) -> Self {
        Self::NoSpace(msg.into())
    }
}
