//! Metadata block reading and the block-run cursor.
//!
//! A metadata block is a header-prefixed, optionally compressed unit of at
//! most 8192 decompressed bytes. Inodes, directory entries, and the other
//! auxiliary tables are all packed end-to-end as a stream of these blocks;
//! [`MetadataCursor`] is the stream-style reader that walks that packing
//! transparently across block boundaries.

use tracing::{error, trace};

use crate::compressor::{Compressor, Decompressor};
use crate::error::SquashfsError;
use crate::io::BackingIO;

/// Maximum decompressed size of one metadata block.
pub const METADATA_MAXSIZE: usize = 0x2000;

const UNCOMPRESSED_BIT: u16 = 1 << 15;

/// Decoded metadata block header: whether the payload is stored raw, and
/// how many bytes of payload follow on disk.
///
/// The masked-zero-means-full-size quirk (§3 of the format) lives here: a
/// masked size of zero means a full 0x8000-byte raw payload, not an empty
/// block. This is an intentional on-disk ambiguity, not a bug to paper
/// over — the decoder must reproduce it exactly.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MetadataHeader {
    pub compressed: bool,
    pub size: u16,
}

impl MetadataHeader {
    pub fn parse(raw: u16) -> Self {
        let compressed = raw & UNCOMPRESSED_BIT == 0;
        let mut size = raw & !UNCOMPRESSED_BIT;
        if size == 0 {
            size = UNCOMPRESSED_BIT;
        }
        Self { compressed, size }
    }
}

/// One decompressed metadata block, plus the on-disk footprint (header +
/// payload bytes) that a cursor needs to step past it.
pub struct MetadataBlock {
    pub payload: Vec<u8>,
    pub footprint: u64,
}

/// Reads metadata blocks from a backing store, decompressing on demand.
/// Every call allocates a fresh block; there is no cache here by design
/// (see crate-level docs) — any future cache sits above this type.
pub struct BlockReader<'a, Io, D> {
    io: &'a Io,
    decompressor: &'a D,
    compressor: Compressor,
}

impl<'a, Io: BackingIO, D: Decompressor> BlockReader<'a, Io, D> {
    pub fn new(io: &'a Io, decompressor: &'a D, compressor: Compressor) -> Self {
        Self { io, decompressor, compressor }
    }

    /// Read the metadata block whose 2-byte header starts at `pos`.
    pub fn read_metadata_block(&self, pos: u64) -> Result<MetadataBlock, SquashfsError> {
        let raw = self.io.read_at(pos, 2)?;
        let header = MetadataHeader::parse(u16::from_le_bytes([raw[0], raw[1]]));
        trace!(pos, ?header, "read metadata header");

        let on_disk = self.io.read_at(pos + 2, header.size as usize)?;
        let payload = if header.compressed {
            let mut out = Vec::with_capacity(METADATA_MAXSIZE);
            self.decompressor.decompress(&on_disk, self.compressor, METADATA_MAXSIZE, &mut out)?;
            out
        } else {
            on_disk
        };

        Ok(MetadataBlock { payload, footprint: 2 + header.size as u64 })
    }
}

/// A `(block, offset)` cursor into the metadata stream: `block` is the
/// absolute byte offset of a metadata block header, `offset` is the byte
/// index inside that block's decompressed payload.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BlockRun {
    pub block: u64,
    pub offset: u16,
}

/// A stream-style reader over a chain of metadata blocks, advancing a
/// [`BlockRun`] cursor as bytes are consumed.
pub struct MetadataCursor<'a, Io, D> {
    reader: BlockReader<'a, Io, D>,
}

impl<'a, Io: BackingIO, D: Decompressor> MetadataCursor<'a, Io, D> {
    pub fn new(io: &'a Io, decompressor: &'a D, compressor: Compressor) -> Self {
        Self { reader: BlockReader::new(io, decompressor, compressor) }
    }

    /// Copy exactly `size` bytes into `dst` (or discard them if `dst` is
    /// `None`), advancing `cursor` across as many metadata blocks as
    /// needed. On error `cursor` is left in an unspecified position and
    /// must be discarded by the caller.
    pub fn get(
        &self,
        cursor: &mut BlockRun,
        mut dst: Option<&mut Vec<u8>>,
        size: usize,
    ) -> Result<(), SquashfsError> {
        let mut remaining = size;
        while remaining > 0 {
            let block = self.reader.read_metadata_block(cursor.block)?;
            let payload_len = block.payload.len();
            let start = cursor.offset as usize;
            if start > payload_len {
                error!(start, payload_len, "cursor offset past block payload");
                return Err(SquashfsError::MalformedHeader(format!(
                    "cursor offset {start} past block payload {payload_len}"
                )));
            }
            let take = remaining.min(payload_len - start);
            if let Some(dst) = dst.as_deref_mut() {
                dst.extend_from_slice(&block.payload[start..start + take]);
            }

            if start + take == payload_len {
                cursor.block += block.footprint;
                cursor.offset = 0;
            } else {
                cursor.offset += take as u16;
            }
            remaining -= take;
        }
        Ok(())
    }
}
