//! A read-only decoder for the [SquashFS](https://en.wikipedia.org/wiki/SquashFS)
//! on-disk image format.
//!
//! Given a block-addressable backing store holding a SquashFS image, this
//! crate decodes the superblock, walks the metadata extraction pipeline,
//! and resolves inode identifiers into fully populated in-memory inode
//! descriptors: directories, regular files, symlinks, device nodes,
//! FIFOs, and sockets.
//!
//! This is the decode core only. Directory-entry iteration, multi-block
//! file data reassembly, fragment resolution, mount/unmount lifecycle,
//! and writing/modifying images are all out of scope — a VFS adapter (a
//! FUSE layer, a kernel module, a CLI extractor) builds on top of
//! [`Mount::get_inode`] to provide those.
//!
//! ### Example
//! ```no_run
//! # use std::fs::File;
//! # use std::io::BufReader;
//! use squashfs_core::{compressor::DefaultDecompressor, io::IoBackend, squashfs::SuperBlock, Mount};
//!
//! # fn main() -> Result<(), squashfs_core::SquashfsError> {
//! let mut file = BufReader::new(File::open("image.squashfs").unwrap());
//! let mut header = [0u8; squashfs_core::squashfs::SUPERBLOCK_SIZE];
//! std::io::Read::read_exact(&mut file, &mut header).unwrap();
//! let superblock = SuperBlock::parse(&header)?;
//!
//! let io = IoBackend::new(file);
//! let decompressor = DefaultDecompressor;
//! let mount = Mount::new(&io, &superblock, &decompressor);
//!
//! let root = mount.get_inode(mount.root_inode_id())?;
//! println!("{:?}", root.kind);
//! # Ok(())
//! # }
//! ```

pub mod compressor;
pub mod data;
pub mod error;
pub mod inode;
pub mod io;
pub mod metadata;
pub mod resolver;
pub mod squashfs;

pub use crate::compressor::Compressor;
pub use crate::error::SquashfsError;
pub use crate::inode::{inode_type, Inode, InodeVariant, NodeKind};
pub use crate::io::BackingIO;
pub use crate::metadata::BlockRun;
pub use crate::resolver::Mount;
pub use crate::squashfs::SuperBlock;
