//! The SquashFS superblock: on-disk layout, parsing, and validation.
//!
//! This crate treats the superblock as config: it's read once at mount
//! time from the image itself, validated, and never mutated afterward
//! (§3 of the format — "immutable after mount"). Only the fields the
//! inode-resolution pipeline or its logging touch are kept; table readers
//! for ids/exports/fragments/directory entries are VFS-glue concerns out
//! of scope here.

use tracing::{debug, error, trace};

use crate::compressor::Compressor;
use crate::error::SquashfsError;

/// `"hsqs"` as a little-endian u32.
pub const MAGIC: u32 = 0x7371_7368;

/// log2 of the smallest legal block size (4 KiB).
pub const MIN_BLOCK_LOG: u32 = 12;
/// log2 of the largest legal block size (1 MiB).
pub const MAX_BLOCK_LOG: u32 = 20;

pub const SUPERBLOCK_SIZE: usize = 96;

/// Superblock flag bits, matching the on-disk bit positions. Only a
/// subset affects this crate's read path (none of them gate inode
/// decoding directly, since compression is always attempted per the
/// block header's own flag bit) but they are kept and exposed for
/// logging/diagnostics parity with the on-disk format.
#[repr(u16)]
#[derive(Copy, Clone, Debug)]
pub enum FlagBit {
    InodesStoredUncompressed = 0b0000_0000_0000_0001,
    DataBlockStoredUncompressed = 0b0000_0000_0000_0010,
    FragmentsStoredUncompressed = 0b0000_0000_0000_1000,
    FragmentsAreNotUsed = 0b0000_0000_0001_0000,
    FragmentsAreAlwaysGenerated = 0b0000_0000_0010_0000,
    DataHasBeenDeduplicated = 0b0000_0000_0100_0000,
    NfsExportTableExists = 0b0000_0000_1000_0000,
    XattrsStoredUncompressed = 0b0000_0001_0000_0000,
    NoXattrsInArchive = 0b0000_0010_0000_0000,
    CompressorOptionsArePresent = 0b0000_0100_0000_0000,
}

/// Raw superblock flags, queried bit-by-bit rather than wrapped in a
/// bitflags type.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Flags(u16);

impl Flags {
    pub fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    pub fn contains(self, bit: FlagBit) -> bool {
        self.0 & bit as u16 != 0
    }
}

/// The 96-byte v4 superblock.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SuperBlock {
    pub magic: u32,
    pub inode_count: u32,
    pub mod_time: u32,
    pub block_size: u32,
    pub frag_count: u32,
    pub compressor: Compressor,
    pub block_log: u16,
    pub flags: Flags,
    pub id_count: u16,
    pub version_major: u16,
    pub version_minor: u16,
    pub root_inode: u64,
    pub bytes_used: u64,
    pub id_table: u64,
    pub xattr_table: u64,
    pub inode_table: u64,
    pub dir_table: u64,
    pub frag_table: u64,
    pub export_table: u64,
}

fn u16le(b: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([b[at], b[at + 1]])
}

fn u32le(b: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([b[at], b[at + 1], b[at + 2], b[at + 3]])
}

fn u64le(b: &[u8], at: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&b[at..at + 8]);
    u64::from_le_bytes(buf)
}

impl SuperBlock {
    /// Parse and validate a 96-byte superblock buffer.
    ///
    /// Validation is limited to what a mount needs before it can safely
    /// hand addresses to [`crate::resolver::Mount`]: the magic number, a
    /// power-of-two `block_size` consistent with `block_log`, and a
    /// recognized compressor id. Anything more (table bounds checking,
    /// flag-combination sanity) is left to the caller/VFS adapter.
    pub fn parse(bytes: &[u8]) -> Result<Self, SquashfsError> {
        if bytes.len() < SUPERBLOCK_SIZE {
            return Err(SquashfsError::ShortRead { expected: SUPERBLOCK_SIZE, got: bytes.len() });
        }

        let magic = u32le(bytes, 0);
        if magic != MAGIC {
            error!(magic, expected = MAGIC, "bad superblock magic");
            return Err(SquashfsError::CorruptSuperblock(format!(
                "bad magic: {magic:#010x}, expected {MAGIC:#010x}"
            )));
        }

        let inode_count = u32le(bytes, 4);
        let mod_time = u32le(bytes, 8);
        let block_size = u32le(bytes, 12);
        let frag_count = u32le(bytes, 16);
        let compressor = Compressor::from_u16(u16le(bytes, 20))?;
        let block_log = u16le(bytes, 22);
        let flags = Flags::from_bits(u16le(bytes, 24));
        let id_count = u16le(bytes, 26);
        let version_major = u16le(bytes, 28);
        let version_minor = u16le(bytes, 30);
        if version_major != 4 {
            error!(version_major, version_minor, "unsupported superblock version");
            return Err(SquashfsError::CorruptSuperblock(format!(
                "unsupported version {version_major}.{version_minor}, only v4 is supported"
            )));
        }
        let root_inode = u64le(bytes, 32);
        let bytes_used = u64le(bytes, 40);
        let id_table = u64le(bytes, 48);
        let xattr_table = u64le(bytes, 56);
        let inode_table = u64le(bytes, 64);
        let dir_table = u64le(bytes, 72);
        let frag_table = u64le(bytes, 80);
        let export_table = u64le(bytes, 88);

        if !block_size.is_power_of_two()
            || !(MIN_BLOCK_LOG..=MAX_BLOCK_LOG).contains(&(block_log as u32))
            || block_size != 1u32 << block_log
        {
            error!(block_size, block_log, "block_size inconsistent with block_log");
            return Err(SquashfsError::CorruptSuperblock(format!(
                "block_size {block_size:#x} inconsistent with block_log {block_log}"
            )));
        }

        debug!(inode_count, block_size, ?compressor, "parsed superblock");
        trace!(root_inode, inode_table, "superblock table offsets");

        let superblock = Self {
            magic,
            inode_count,
            mod_time,
            block_size,
            frag_count,
            compressor,
            block_log,
            flags,
            id_count,
            version_major,
            version_minor,
            root_inode,
            bytes_used,
            id_table,
            xattr_table,
            inode_table,
            dir_table,
            frag_table,
            export_table,
        };

        // Flags that change how the rest of the pipeline must read the
        // image are worth a line each, the way a mount log records them.
        if superblock.inodes_uncompressed() {
            debug!("flag: inodes stored uncompressed");
        }
        if superblock.data_block_stored_uncompressed() {
            debug!("flag: data blocks stored uncompressed");
        }
        if superblock.compressor_options_are_present() {
            debug!("flag: compressor options are present");
        }

        Ok(superblock)
    }

    pub fn inodes_uncompressed(&self) -> bool {
        self.flags.contains(FlagBit::InodesStoredUncompressed)
    }

    pub fn data_block_stored_uncompressed(&self) -> bool {
        self.flags.contains(FlagBit::DataBlockStoredUncompressed)
    }

    pub fn compressor_options_are_present(&self) -> bool {
        self.flags.contains(FlagBit::CompressorOptionsArePresent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_superblock_bytes(compressor: u16) -> Vec<u8> {
        let mut b = vec![0u8; SUPERBLOCK_SIZE];
        b[0..4].copy_from_slice(&MAGIC.to_le_bytes());
        b[4..8].copy_from_slice(&10u32.to_le_bytes()); // inode_count
        b[12..16].copy_from_slice(&0x20000u32.to_le_bytes()); // block_size
        b[20..22].copy_from_slice(&compressor.to_le_bytes());
        b[22..24].copy_from_slice(&17u16.to_le_bytes()); // block_log = log2(0x20000)
        b[28..30].copy_from_slice(&4u16.to_le_bytes()); // version_major
        b[32..40].copy_from_slice(&16u64.to_le_bytes()); // root_inode
        b[64..72].copy_from_slice(&0x1000u64.to_le_bytes()); // inode_table
        b
    }

    #[test]
    fn parses_valid_superblock() {
        let bytes = minimal_superblock_bytes(4);
        let sb = SuperBlock::parse(&bytes).unwrap();
        assert_eq!(sb.magic, MAGIC);
        assert_eq!(sb.block_size, 0x20000);
        assert_eq!(sb.compressor, Compressor::Xz);
        assert_eq!(sb.inode_table, 0x1000);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = minimal_superblock_bytes(0);
        bytes[0] = 0;
        assert!(matches!(SuperBlock::parse(&bytes), Err(SquashfsError::CorruptSuperblock(_))));
    }

    #[test]
    fn rejects_inconsistent_block_size_and_log() {
        let mut bytes = minimal_superblock_bytes(0);
        bytes[22..24].copy_from_slice(&10u16.to_le_bytes());
        assert!(matches!(SuperBlock::parse(&bytes), Err(SquashfsError::CorruptSuperblock(_))));
    }

    #[test]
    fn rejects_unknown_compressor() {
        let bytes = minimal_superblock_bytes(99);
        assert!(matches!(SuperBlock::parse(&bytes), Err(SquashfsError::UnknownCompressor(99))));
    }

    #[test]
    fn flag_accessors_read_their_own_bit_only() {
        let mut bytes = minimal_superblock_bytes(0);
        let bits = FlagBit::InodesStoredUncompressed as u16 | FlagBit::CompressorOptionsArePresent as u16;
        bytes[24..26].copy_from_slice(&bits.to_le_bytes());

        let sb = SuperBlock::parse(&bytes).unwrap();
        assert!(sb.inodes_uncompressed());
        assert!(sb.compressor_options_are_present());
        assert!(!sb.data_block_stored_uncompressed());
    }

    #[test]
    fn flag_accessors_are_false_when_clear() {
        let bytes = minimal_superblock_bytes(0);
        let sb = SuperBlock::parse(&bytes).unwrap();
        assert!(!sb.inodes_uncompressed());
        assert!(!sb.data_block_stored_uncompressed());
        assert!(!sb.compressor_options_are_present());
    }
}
