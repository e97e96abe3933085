//! Errors

use std::io;

use thiserror::Error;

use crate::compressor::Compressor;

/// Errors generated while decoding a SquashFS image.
///
/// The enum is detailed for logging and debugging; callers that only care
/// about success vs. failure can match on `Result::is_ok()` instead of the
/// individual variants.
#[derive(Error, Debug)]
pub enum SquashfsError {
    #[error("std io error: {0}")]
    Io(#[from] io::Error),

    #[error("short read: expected {expected} bytes, got {got}")]
    ShortRead { expected: usize, got: usize },

    #[error("decompression failed: {0}")]
    Decompression(String),

    #[error("decompressed output too large: got {got}, max {max}")]
    OutputTooLarge { got: usize, max: usize },

    #[error("malformed block header: {0}")]
    MalformedHeader(String),

    #[error("unknown compressor id: {0}")]
    UnknownCompressor(u16),

    #[error("unsupported compressor: {0:?} (crate feature not enabled)")]
    UnsupportedCompressor(Compressor),

    #[error("unknown inode type code: {0}")]
    UnknownInodeType(u16),

    #[error("inode number {got} out of range (max {max})")]
    InodeNumberOutOfRange { got: u32, max: u32 },

    #[error("parent inode {got} out of range (max {max})")]
    ParentInodeOutOfRange { got: u32, max: u32 },

    #[error("corrupt superblock: {0}")]
    CorruptSuperblock(String),
}

impl SquashfsError {
    /// Coarse classification for callers that only need "ok or not" at the
    /// VFS-adapter boundary, without matching every internal variant.
    pub fn is_corrupt(&self) -> bool {
        !matches!(self, SquashfsError::Io(_))
    }
}

impl From<SquashfsError> for io::Error {
    fn from(value: SquashfsError) -> Self {
        match value {
            SquashfsError::Io(io) => io,
            other => Self::new(io::ErrorKind::InvalidData, other.to_string()),
        }
    }
}
