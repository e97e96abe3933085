//! Fixed-layout little-endian inode decoders.
//!
//! SquashFS packs nine on-disk inode type codes into seven logical node
//! kinds, each with a compact and (for six of the seven) an extended
//! encoding that adds `nlink`, `xattr`, and sometimes 64-bit sizes. Rather
//! than mirror the on-disk type-code dispatch with nine near-identical
//! structs, this module decodes every variant's tail into one shared
//! [`Inode`] with a [`NodeKind`] tag and an [`InodeVariant`] payload union —
//! the dispatch in [`crate::resolver`] becomes a single exhaustive match.

use crate::error::SquashfsError;
use crate::metadata::BlockRun;

/// Sentinel xattr id meaning "this inode has no extended attributes".
pub const XATTR_INVALID: u32 = 0xFFFF_FFFF;

/// The 16-byte header shared by every inode variant.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct InodeHeader {
    pub inode_type: u16,
    pub mode: u16,
    pub uid: u16,
    pub guid: u16,
    pub mtime: u32,
    pub inode_number: u32,
}

pub const INODE_HEADER_SIZE: usize = 16;

impl InodeHeader {
    pub fn parse(bytes: &[u8]) -> Result<Self, SquashfsError> {
        if bytes.len() < INODE_HEADER_SIZE {
            return Err(SquashfsError::ShortRead { expected: INODE_HEADER_SIZE, got: bytes.len() });
        }
        Ok(Self {
            inode_type: u16::from_le_bytes([bytes[0], bytes[1]]),
            mode: u16::from_le_bytes([bytes[2], bytes[3]]),
            uid: u16::from_le_bytes([bytes[4], bytes[5]]),
            guid: u16::from_le_bytes([bytes[6], bytes[7]]),
            mtime: u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
            inode_number: u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]),
        })
    }
}

/// On-disk inode type codes. The valid range is `DIR..=LSOCKET` (1..=14).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u16)]
pub enum InodeType {
    Dir = 1,
    Reg = 2,
    Symlink = 3,
    BlkDev = 4,
    ChrDev = 5,
    Fifo = 6,
    Socket = 7,
    LDir = 8,
    LReg = 9,
    LSymlink = 10,
    LBlkDev = 11,
    LChrDev = 12,
    LFifo = 13,
    LSocket = 14,
}

pub const TYPE_MIN_VALID: u16 = InodeType::Dir as u16;
pub const TYPE_MAX_VALID: u16 = InodeType::LSocket as u16;

impl InodeType {
    pub fn from_u16(code: u16) -> Result<Self, SquashfsError> {
        Ok(match code {
            1 => Self::Dir,
            2 => Self::Reg,
            3 => Self::Symlink,
            4 => Self::BlkDev,
            5 => Self::ChrDev,
            6 => Self::Fifo,
            7 => Self::Socket,
            8 => Self::LDir,
            9 => Self::LReg,
            10 => Self::LSymlink,
            11 => Self::LBlkDev,
            12 => Self::LChrDev,
            13 => Self::LFifo,
            14 => Self::LSocket,
            other => return Err(SquashfsError::UnknownInodeType(other)),
        })
    }
}

/// Abstract node-kind tag, independent of compact/extended encoding.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Directory,
    Regular,
    Symlink,
    Block,
    Char,
    Fifo,
    Socket,
    Invalid,
}

/// Returns the [`NodeKind`] a given on-disk `inode_type` code maps to.
/// Unknown codes map to `NodeKind::Invalid` rather than erroring — callers
/// that need to reject unknown codes hard do so via [`InodeType::from_u16`]
/// before this is ever called.
pub fn inode_type(type_code: u16) -> NodeKind {
    match InodeType::from_u16(type_code) {
        Ok(InodeType::Dir | InodeType::LDir) => NodeKind::Directory,
        Ok(InodeType::Reg | InodeType::LReg) => NodeKind::Regular,
        Ok(InodeType::Symlink | InodeType::LSymlink) => NodeKind::Symlink,
        Ok(InodeType::BlkDev | InodeType::LBlkDev) => NodeKind::Block,
        Ok(InodeType::ChrDev | InodeType::LChrDev) => NodeKind::Char,
        Ok(InodeType::Fifo | InodeType::LFifo) => NodeKind::Fifo,
        Ok(InodeType::Socket | InodeType::LSocket) => NodeKind::Socket,
        Err(_) => NodeKind::Invalid,
    }
}

/// Variant-specific payload, keyed by [`NodeKind`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InodeVariant {
    Regular { start_block: u64, frag_index: u32, frag_offset: u32 },
    Directory { start_block: u32, offset: u16, parent_inode: u32, index_count: u16 },
    Symlink,
    Device { major: u32, minor: u32 },
    Ipc,
}

/// A fully decoded inode: the base header plus the normalized, variant-
/// independent fields a caller needs, plus the variant's own payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Inode {
    pub header: InodeHeader,
    pub nlink: u32,
    pub xattr: u32,
    pub size: u64,
    pub kind: NodeKind,
    /// Cursor immediately after the variant's tail, for callers that go on
    /// to read inline data (directory entries, a file's block-size list).
    pub next: BlockRun,
    pub variant: InodeVariant,
}

/// Packs `(major, minor)` into the non-POSIX on-disk `rdev` encoding.
pub fn pack_rdev(major: u32, minor: u32) -> u32 {
    ((major & 0xFFF) << 8) | (minor & 0xFF) | ((minor & 0xFFF00) << 12)
}

/// Unpacks the on-disk `rdev` encoding into `(major, minor)`.
pub fn unpack_rdev(rdev: u32) -> (u32, u32) {
    let major = (rdev >> 8) & 0xFFF;
    let minor = (rdev & 0xFF) | ((rdev >> 12) & 0xFFF00);
    (major, minor)
}

fn need(bytes: &[u8], expected: usize) -> Result<(), SquashfsError> {
    if bytes.len() < expected {
        return Err(SquashfsError::ShortRead { expected, got: bytes.len() });
    }
    Ok(())
}

fn u32le(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

fn u64le(bytes: &[u8], at: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[at..at + 8]);
    u64::from_le_bytes(buf)
}

fn u16le(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

/// Compact regular-file tail (16 bytes): start_block, fragment, offset,
/// file_size. `nlink` defaults to 1, `xattr` to the "none" sentinel — this
/// crate's variant is never present on disk for the compact encoding.
pub fn decode_reg(bytes: &[u8]) -> Result<(u32, InodeVariant, u64, u32), SquashfsError> {
    need(bytes, 16)?;
    let start_block = u32le(bytes, 0);
    let fragment = u32le(bytes, 4);
    let offset = u32le(bytes, 8);
    let file_size = u32le(bytes, 12);
    let variant = InodeVariant::Regular {
        start_block: start_block as u64,
        frag_index: fragment,
        frag_offset: offset,
    };
    Ok((1, variant, file_size as u64, XATTR_INVALID))
}

/// Extended regular-file tail (40 bytes): start_block, file_size, sparse,
/// nlink, fragment, offset, xattr — all on-disk per original_source.
pub fn decode_lreg(bytes: &[u8]) -> Result<(u32, InodeVariant, u64, u32), SquashfsError> {
    need(bytes, 40)?;
    let start_block = u64le(bytes, 0);
    let file_size = u64le(bytes, 8);
    // sparse (bytes 16..24) is write-path accounting, not read here.
    let nlink = u32le(bytes, 24);
    let fragment = u32le(bytes, 28);
    let offset = u32le(bytes, 32);
    let xattr = u32le(bytes, 36);
    let variant =
        InodeVariant::Regular { start_block, frag_index: fragment, frag_offset: offset };
    Ok((nlink, variant, file_size, xattr))
}

/// Compact directory tail (16 bytes): start_block, nlink, file_size,
/// offset, parent_inode.
pub fn decode_dir(bytes: &[u8]) -> Result<(u32, InodeVariant, u64, u32), SquashfsError> {
    need(bytes, 16)?;
    let start_block = u32le(bytes, 0);
    let nlink = u32le(bytes, 4);
    let file_size = u16le(bytes, 8);
    let offset = u16le(bytes, 10);
    let parent_inode = u32le(bytes, 12);
    let variant =
        InodeVariant::Directory { start_block, offset, parent_inode, index_count: 0 };
    Ok((nlink, variant, file_size as u64, XATTR_INVALID))
}

/// Extended directory tail (24 bytes, plus a variable directory index this
/// crate does not read): nlink, file_size, start_block, parent_inode,
/// i_count, offset, xattr.
pub fn decode_ldir(bytes: &[u8]) -> Result<(u32, InodeVariant, u64, u32), SquashfsError> {
    need(bytes, 24)?;
    let nlink = u32le(bytes, 0);
    let file_size = u32le(bytes, 4);
    let start_block = u32le(bytes, 8);
    let parent_inode = u32le(bytes, 12);
    let index_count = u16le(bytes, 16);
    let offset = u16le(bytes, 18);
    let xattr = u32le(bytes, 20);
    let variant =
        InodeVariant::Directory { start_block, offset, parent_inode, index_count };
    Ok((nlink, variant, file_size as u64, xattr))
}

/// Symlink tail (8 bytes, plus `symlink_size` bytes of target name this
/// crate does not read): nlink, symlink_size. Same layout for both the
/// compact and extended type codes — there is no "LSYMLINK adds a field"
/// distinction on disk, only the type code itself differs.
pub fn decode_symlink(bytes: &[u8]) -> Result<(u32, InodeVariant, u64, u32), SquashfsError> {
    need(bytes, 8)?;
    let nlink = u32le(bytes, 0);
    let symlink_size = u32le(bytes, 4);
    Ok((nlink, InodeVariant::Symlink, symlink_size as u64, XATTR_INVALID))
}

/// Compact device tail (8 bytes): nlink, rdev.
pub fn decode_dev(bytes: &[u8]) -> Result<(u32, InodeVariant, u64, u32), SquashfsError> {
    need(bytes, 8)?;
    let nlink = u32le(bytes, 0);
    let rdev = u32le(bytes, 4);
    let (major, minor) = unpack_rdev(rdev);
    Ok((nlink, InodeVariant::Device { major, minor }, 0, XATTR_INVALID))
}

/// Extended device tail (12 bytes): nlink, rdev, xattr.
pub fn decode_ldev(bytes: &[u8]) -> Result<(u32, InodeVariant, u64, u32), SquashfsError> {
    need(bytes, 12)?;
    let nlink = u32le(bytes, 0);
    let rdev = u32le(bytes, 4);
    let xattr = u32le(bytes, 8);
    let (major, minor) = unpack_rdev(rdev);
    Ok((nlink, InodeVariant::Device { major, minor }, 0, xattr))
}

/// Compact FIFO/socket tail (4 bytes): nlink only — these inodes carry no
/// `rdev`, unlike device nodes.
pub fn decode_ipc(bytes: &[u8]) -> Result<(u32, InodeVariant, u64, u32), SquashfsError> {
    need(bytes, 4)?;
    let nlink = u32le(bytes, 0);
    Ok((nlink, InodeVariant::Ipc, 0, XATTR_INVALID))
}

/// Extended FIFO/socket tail (8 bytes): nlink, xattr.
pub fn decode_lipc(bytes: &[u8]) -> Result<(u32, InodeVariant, u64, u32), SquashfsError> {
    need(bytes, 8)?;
    let nlink = u32le(bytes, 0);
    let xattr = u32le(bytes, 4);
    Ok((nlink, InodeVariant::Ipc, 0, xattr))
}

/// Byte length of the on-disk tail for each inode type, for callers that
/// need to size a `MetadataCursor::get` call before decoding.
pub fn variant_tail_len(ty: InodeType) -> usize {
    match ty {
        InodeType::Reg => 16,
        InodeType::LReg => 40,
        InodeType::Dir => 16,
        InodeType::LDir => 24,
        InodeType::Symlink | InodeType::LSymlink => 8,
        InodeType::BlkDev | InodeType::ChrDev => 8,
        InodeType::LBlkDev | InodeType::LChrDev => 12,
        InodeType::Fifo | InodeType::Socket => 4,
        InodeType::LFifo | InodeType::LSocket => 8,
    }
}
