//! Positional reads over the backing image.

use std::cell::RefCell;
use std::io::{Read, Seek, SeekFrom};

use crate::error::SquashfsError;

/// A source of bytes at arbitrary offsets within a SquashFS image.
///
/// This is the one seam between the decoder and wherever the image bytes
/// actually live (a file, a memory buffer, a caller-supplied reader). There
/// is no caching here and none is added by any caller in this crate: every
/// `read_at` goes straight through to the underlying reader, per the
/// single-threaded, no-cache mount model this crate implements.
pub trait BackingIO {
    /// Read exactly `len` bytes starting at `pos`. Returns
    /// `SquashfsError::ShortRead` if fewer bytes are available.
    fn read_at(&self, pos: u64, len: usize) -> Result<Vec<u8>, SquashfsError>;
}

/// Wraps any `Read + Seek` reader (a `File`, a `Cursor<Vec<u8>>`, ...) as a
/// [`BackingIO`]. Reads are serialized through a `RefCell` since seeking and
/// reading both require `&mut`, but the trait above wants `&self` so
/// `Mount` doesn't need to be `&mut` just to resolve an inode.
pub struct IoBackend<R> {
    inner: RefCell<R>,
}

impl<R: Read + Seek> IoBackend<R> {
    pub fn new(reader: R) -> Self {
        Self { inner: RefCell::new(reader) }
    }
}

impl<R: Read + Seek> BackingIO for IoBackend<R> {
    fn read_at(&self, pos: u64, len: usize) -> Result<Vec<u8>, SquashfsError> {
        let mut reader = self.inner.borrow_mut();
        reader.seek(SeekFrom::Start(pos))?;
        let mut buf = vec![0u8; len];
        let mut got = 0;
        while got < len {
            match reader.read(&mut buf[got..])? {
                0 => break,
                n => got += n,
            }
        }
        if got != len {
            return Err(SquashfsError::ShortRead { expected: len, got });
        }
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn reads_at_offset() {
        let data = (0u8..32).collect::<Vec<_>>();
        let io = IoBackend::new(Cursor::new(data));
        let got = io.read_at(8, 4).unwrap();
        assert_eq!(got, vec![8, 9, 10, 11]);
    }

    #[test]
    fn short_read_is_an_error() {
        let io = IoBackend::new(Cursor::new(vec![1, 2, 3]));
        let err = io.read_at(0, 10).unwrap_err();
        assert!(matches!(err, SquashfsError::ShortRead { expected: 10, got: 3 }));
    }
}
