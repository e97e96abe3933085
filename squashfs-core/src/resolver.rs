//! Inode id resolution: the public entry point a VFS adapter calls to turn
//! a 64-bit inode id into a fully decoded [`Inode`].
//!
//! Unlike readers that resolve every inode eagerly up front, this one
//! resolves on demand by id: seed a cursor from the id, pull the base
//! header, dispatch on type code, validate. Matches the shape of
//! `sqsh_get_inode`/`sqsh_verify_inode` in the FreeBSD SquashFS driver
//! (`original_source/sys/fs/squashfs/squashfs_inode.c`).

use tracing::error;

use crate::compressor::Decompressor;
use crate::inode::{
    decode_dev, decode_dir, decode_ipc, decode_ldev, decode_ldir, decode_lipc, decode_lreg,
    decode_reg, decode_symlink, inode_type, Inode, InodeHeader, InodeType, INODE_HEADER_SIZE,
    TYPE_MAX_VALID, TYPE_MIN_VALID,
};
use crate::io::BackingIO;
use crate::metadata::{BlockRun, MetadataCursor};
use crate::squashfs::SuperBlock;
use crate::SquashfsError;

/// A mounted SquashFS image: a borrowed backing store, its parsed
/// superblock, and the decompressor resolved for its compressor id.
///
/// Borrows everything and owns nothing beyond the decompressor choice —
/// per the crate's single-threaded, no-cache, immutable-after-mount
/// design (§5 of the format).
pub struct Mount<'a, Io, D> {
    io: &'a Io,
    superblock: &'a SuperBlock,
    decompressor: &'a D,
}

impl<'a, Io: BackingIO, D: Decompressor> Mount<'a, Io, D> {
    pub fn new(io: &'a Io, superblock: &'a SuperBlock, decompressor: &'a D) -> Self {
        Self { io, superblock, decompressor }
    }

    /// The root directory's inode id, straight from the superblock.
    pub fn root_inode_id(&self) -> u64 {
        self.superblock.root_inode
    }

    fn cursor(&self) -> MetadataCursor<'_, Io, D> {
        MetadataCursor::new(self.io, self.decompressor, self.superblock.compressor)
    }

    /// Split a 64-bit inode id into its block-run cursor, per §3: the
    /// upper 48 bits plus the inode-table base give a metadata block's
    /// absolute offset, the lower 16 bits give the in-block byte offset.
    fn seed_cursor(&self, id: u64) -> BlockRun {
        BlockRun { block: (id >> 16) + self.superblock.inode_table, offset: (id & 0xFFFF) as u16 }
    }

    /// Resolve an inode id into a fully decoded, validated [`Inode`].
    pub fn get_inode(&self, id: u64) -> Result<Inode, SquashfsError> {
        let cursor = self.cursor();
        let mut run = self.seed_cursor(id);

        let mut header_bytes = Vec::with_capacity(INODE_HEADER_SIZE);
        cursor.get(&mut run, Some(&mut header_bytes), INODE_HEADER_SIZE).map_err(|e| {
            error!(id, error = %e, "failed to read base inode header");
            e
        })?;
        let header = InodeHeader::parse(&header_bytes)?;

        let kind = inode_type(header.inode_type);
        let ty = InodeType::from_u16(header.inode_type).map_err(|e| {
            error!(id, inode_type = header.inode_type, "unknown inode type code");
            e
        })?;

        let tail_len = crate::inode::variant_tail_len(ty);
        let mut tail_bytes = Vec::with_capacity(tail_len);
        cursor.get(&mut run, Some(&mut tail_bytes), tail_len)?;

        let (nlink, variant, size, xattr) = match ty {
            InodeType::Reg => decode_reg(&tail_bytes)?,
            InodeType::LReg => decode_lreg(&tail_bytes)?,
            InodeType::Dir => decode_dir(&tail_bytes)?,
            InodeType::LDir => decode_ldir(&tail_bytes)?,
            InodeType::Symlink | InodeType::LSymlink => decode_symlink(&tail_bytes)?,
            InodeType::BlkDev | InodeType::ChrDev => decode_dev(&tail_bytes)?,
            InodeType::LBlkDev | InodeType::LChrDev => decode_ldev(&tail_bytes)?,
            InodeType::Fifo | InodeType::Socket => decode_ipc(&tail_bytes)?,
            InodeType::LFifo | InodeType::LSocket => decode_lipc(&tail_bytes)?,
        };

        let inode = Inode { header, nlink, xattr, size, kind, next: run, variant };
        self.validate(&inode)?;
        Ok(inode)
    }

    fn validate(&self, inode: &Inode) -> Result<(), SquashfsError> {
        if !(TYPE_MIN_VALID..=TYPE_MAX_VALID).contains(&inode.header.inode_type) {
            return Err(SquashfsError::UnknownInodeType(inode.header.inode_type));
        }

        let inodes = self.superblock.inode_count;
        if inode.header.inode_number < 1 || inode.header.inode_number > inodes {
            error!(got = inode.header.inode_number, max = inodes, "inode number out of range");
            return Err(SquashfsError::InodeNumberOutOfRange { got: inode.header.inode_number, max: inodes });
        }

        if let crate::inode::InodeVariant::Directory { parent_inode, .. } = inode.variant {
            if parent_inode < 1 || parent_inode > inodes + 1 {
                error!(got = parent_inode, max = inodes + 1, "parent inode out of range");
                return Err(SquashfsError::ParentInodeOutOfRange { got: parent_inode, max: inodes + 1 });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compressor::DefaultDecompressor;
    use crate::inode::{InodeVariant, NodeKind, XATTR_INVALID};
    use crate::io::IoBackend;
    use crate::squashfs::SuperBlock;

    fn raw_metadata_block(payload: &[u8]) -> Vec<u8> {
        let header = payload.len() as u16; // compressed bit clear = uncompressed
        let header = header | 0x8000;
        let mut out = header.to_le_bytes().to_vec();
        out.extend_from_slice(payload);
        out
    }

    fn minimal_superblock(inode_count: u32, inode_table: u64, root_inode: u64) -> SuperBlock {
        let mut bytes = vec![0u8; crate::squashfs::SUPERBLOCK_SIZE];
        bytes[0..4].copy_from_slice(&crate::squashfs::MAGIC.to_le_bytes());
        bytes[4..8].copy_from_slice(&inode_count.to_le_bytes());
        bytes[12..16].copy_from_slice(&0x20000u32.to_le_bytes());
        bytes[22..24].copy_from_slice(&17u16.to_le_bytes());
        bytes[28..30].copy_from_slice(&4u16.to_le_bytes());
        bytes[32..40].copy_from_slice(&root_inode.to_le_bytes());
        bytes[64..72].copy_from_slice(&inode_table.to_le_bytes());
        SuperBlock::parse(&bytes).unwrap()
    }

    fn dir_inode_payload(inode_number: u32, parent_inode: u32) -> Vec<u8> {
        let mut payload = vec![0u8; 16 + 16];
        payload[0..2].copy_from_slice(&1u16.to_le_bytes()); // DIR
        payload[12..16].copy_from_slice(&inode_number.to_le_bytes());
        // tail: start_block, nlink, file_size(u16), offset(u16), parent_inode
        payload[16..20].copy_from_slice(&0u32.to_le_bytes());
        payload[20..24].copy_from_slice(&2u32.to_le_bytes());
        payload[28..32].copy_from_slice(&parent_inode.to_le_bytes());
        payload
    }

    #[test]
    fn resolves_root_directory_inode() {
        let inode_table_pos = 0x1000u64;
        let payload = dir_inode_payload(1, 2 /* inodes=1, root parent = inodes+1 */);
        let image_tail = raw_metadata_block(&payload);
        let mut image = vec![0u8; inode_table_pos as usize];
        image.extend_from_slice(&image_tail);

        let sb = minimal_superblock(1, inode_table_pos, 0);
        let io = IoBackend::new(std::io::Cursor::new(image));
        let decompressor = DefaultDecompressor;
        let mount = Mount::new(&io, &sb, &decompressor);

        let inode = mount.get_inode(mount.root_inode_id()).unwrap();
        assert_eq!(inode.kind, NodeKind::Directory);
        assert_eq!(inode.header.inode_number, 1);
        match inode.variant {
            InodeVariant::Directory { parent_inode, .. } => assert_eq!(parent_inode, 2),
            _ => panic!("expected directory variant"),
        }
    }

    #[test]
    fn reg_inode_defaults_nlink_and_xattr() {
        let inode_table_pos = 0u64;
        let mut payload = vec![0u8; 16 + 16];
        payload[0..2].copy_from_slice(&2u16.to_le_bytes()); // REG
        payload[12..16].copy_from_slice(&1u32.to_le_bytes());
        let image = raw_metadata_block(&payload);

        let sb = minimal_superblock(5, inode_table_pos, 0);
        let io = IoBackend::new(std::io::Cursor::new(image));
        let decompressor = DefaultDecompressor;
        let mount = Mount::new(&io, &sb, &decompressor);

        let inode = mount.get_inode(0).unwrap();
        assert_eq!(inode.nlink, 1);
        assert_eq!(inode.xattr, XATTR_INVALID);
        assert_eq!(inode.kind, NodeKind::Regular);
    }

    #[test]
    fn rejects_out_of_range_parent_inode() {
        let payload = dir_inode_payload(1, 3 /* inodes=1, max allowed parent = 2 */);
        let image = raw_metadata_block(&payload);

        let sb = minimal_superblock(1, 0, 0);
        let io = IoBackend::new(std::io::Cursor::new(image));
        let decompressor = DefaultDecompressor;
        let mount = Mount::new(&io, &sb, &decompressor);

        let err = mount.get_inode(0).unwrap_err();
        assert!(matches!(err, SquashfsError::ParentInodeOutOfRange { got: 3, max: 2 }));
    }

    #[test]
    fn rejects_inode_number_out_of_range() {
        let payload = dir_inode_payload(99, 1);
        let image = raw_metadata_block(&payload);

        let sb = minimal_superblock(1, 0, 0);
        let io = IoBackend::new(std::io::Cursor::new(image));
        let decompressor = DefaultDecompressor;
        let mount = Mount::new(&io, &sb, &decompressor);

        let err = mount.get_inode(0).unwrap_err();
        assert!(matches!(err, SquashfsError::InodeNumberOutOfRange { got: 99, max: 1 }));
    }

    #[test]
    fn unknown_type_code_rejected_before_variant_decode() {
        let mut payload = vec![0u8; 16];
        payload[0..2].copy_from_slice(&0u16.to_le_bytes()); // invalid type 0
        let image = raw_metadata_block(&payload);

        let sb = minimal_superblock(1, 0, 0);
        let io = IoBackend::new(std::io::Cursor::new(image));
        let decompressor = DefaultDecompressor;
        let mount = Mount::new(&io, &sb, &decompressor);

        let err = mount.get_inode(0).unwrap_err();
        assert!(matches!(err, SquashfsError::UnknownInodeType(0)));
    }
}
