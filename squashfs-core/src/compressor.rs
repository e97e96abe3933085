//! Decompressor registry.
//!
//! Only the decode side of each backend is implemented — this crate never
//! writes a SquashFS image, so there is nothing analogous to a
//! `compress`/`compression_options` method here.

use tracing::{error, trace};

use crate::error::SquashfsError;

/// Compressor id, as stored in the superblock. Discriminants match the
/// on-disk values.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u16)]
pub enum Compressor {
    None = 0,
    Gzip = 1,
    Lzma = 2,
    Lzo = 3,
    Xz = 4,
    Lz4 = 5,
    Zstd = 6,
}

impl Compressor {
    pub fn from_u16(id: u16) -> Result<Self, SquashfsError> {
        Ok(match id {
            0 => Self::None,
            1 => Self::Gzip,
            2 => Self::Lzma,
            3 => Self::Lzo,
            4 => Self::Xz,
            5 => Self::Lz4,
            6 => Self::Zstd,
            other => return Err(SquashfsError::UnknownCompressor(other)),
        })
    }
}

/// A decompression backend for one or more [`Compressor`] ids.
pub trait Decompressor {
    /// Decompress `bytes` into `out`, appending the decompressed payload.
    /// `max_output` bounds how large the payload is allowed to grow to
    /// (the caller knows the expected uncompressed size up front — a
    /// metadata block is at most 8192 bytes, a data block at most the
    /// superblock's block size).
    fn decompress(
        &self,
        bytes: &[u8],
        compressor: Compressor,
        max_output: usize,
        out: &mut Vec<u8>,
    ) -> Result<(), SquashfsError>;
}

/// Decompressor implementing every backend this crate was built with.
#[derive(Copy, Clone, Default)]
pub struct DefaultDecompressor;

impl Decompressor for DefaultDecompressor {
    fn decompress(
        &self,
        bytes: &[u8],
        compressor: Compressor,
        max_output: usize,
        out: &mut Vec<u8>,
    ) -> Result<(), SquashfsError> {
        trace!(?compressor, input_len = bytes.len(), "decompressing block");
        match compressor {
            Compressor::None => out.extend_from_slice(bytes),
            #[cfg(feature = "gzip")]
            Compressor::Gzip => {
                use std::io::Read;
                let mut decoder = flate2::read::ZlibDecoder::new(bytes);
                decoder
                    .read_to_end(out)
                    .map_err(|e| SquashfsError::Decompression(e.to_string()))?;
            }
            #[cfg(feature = "xz")]
            Compressor::Xz => {
                use std::io::Read;
                let mut decoder = xz2::read::XzDecoder::new(bytes);
                decoder
                    .read_to_end(out)
                    .map_err(|e| SquashfsError::Decompression(e.to_string()))?;
            }
            // Raw LZMA streams carry no xz container framing, so they can't
            // go through `XzDecoder` the way `Xz` does; rejected explicitly
            // until a dedicated raw-LZMA decoder is wired up.
            Compressor::Lzma => return Err(SquashfsError::UnsupportedCompressor(compressor)),
            #[cfg(feature = "lzo")]
            Compressor::Lzo => {
                let start = out.len();
                out.resize(start + max_output, 0);
                let (decoded, error) =
                    rust_lzo::LZOContext::decompress_to_slice(bytes, &mut out[start..]);
                let decoded_len = decoded.len();
                out.truncate(start + decoded_len);
                if error != rust_lzo::LZOError::OK {
                    return Err(SquashfsError::Decompression(format!("{error:?}")));
                }
            }
            #[cfg(feature = "zstd")]
            Compressor::Zstd => {
                let mut decoder = zstd::bulk::Decompressor::new()
                    .map_err(|e| SquashfsError::Decompression(e.to_string()))?;
                decoder
                    .decompress_to_buffer(bytes, out)
                    .map_err(|e| SquashfsError::Decompression(e.to_string()))?;
            }
            #[cfg(feature = "lz4")]
            Compressor::Lz4 => {
                let start = out.len();
                out.resize(start + max_output, 0);
                let decoded_len = lz4_flex::decompress_into(bytes, &mut out[start..])
                    .map_err(|e| SquashfsError::Decompression(e.to_string()))?;
                out.truncate(start + decoded_len);
            }
            #[allow(unreachable_patterns)]
            other => return Err(SquashfsError::UnsupportedCompressor(other)),
        }
        if out.len() > max_output {
            error!(got = out.len(), max = max_output, "decompressed output too large");
            return Err(SquashfsError::OutputTooLarge { got: out.len(), max: max_output });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_is_a_passthrough() {
        let mut out = Vec::new();
        DefaultDecompressor
            .decompress(b"raw bytes", Compressor::None, 16, &mut out)
            .unwrap();
        assert_eq!(out, b"raw bytes");
    }

    #[test]
    fn unknown_id_is_rejected_before_decompression() {
        assert!(matches!(
            Compressor::from_u16(99),
            Err(SquashfsError::UnknownCompressor(99))
        ));
    }

    // Raw LZMA streams carry no xz container framing, so they must not be
    // decoded by the xz decoder even though both ids share that feature gate.
    #[test]
    fn lzma_is_unsupported_not_aliased_to_xz() {
        let mut out = Vec::new();
        let err = DefaultDecompressor
            .decompress(b"whatever", Compressor::Lzma, 16, &mut out)
            .unwrap_err();
        assert!(matches!(err, SquashfsError::UnsupportedCompressor(Compressor::Lzma)));
    }
}
