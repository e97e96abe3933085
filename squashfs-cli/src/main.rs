//! Inspect a SquashFS image: parse its superblock, resolve the root
//! inode, and print what was found.
//!
//! This is a demonstration of the `squashfs-core` API, not a
//! reimplementation of `unsquashfs` — it does not extract files, walk
//! directories, or write anything.

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use squashfs_core::compressor::DefaultDecompressor;
use squashfs_core::io::IoBackend;
use squashfs_core::squashfs::{SuperBlock, SUPERBLOCK_SIZE};
use squashfs_core::Mount;
use tracing::{error, info};

/// Shifts every seek by a fixed base, so a SquashFS image embedded at some
/// offset inside a larger file reads with the same addresses the superblock
/// itself describes (all on-disk offsets in the format are relative to the
/// start of the image, not the start of the file).
struct OffsetReader<R> {
    inner: R,
    base: u64,
}

impl<R: Seek> Seek for OffsetReader<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let shifted = match pos {
            SeekFrom::Start(n) => SeekFrom::Start(n + self.base),
            other => other,
        };
        let at = self.inner.seek(shifted)?;
        Ok(at.saturating_sub(self.base))
    }
}

impl<R: Read> Read for OffsetReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

/// Print the superblock summary and root inode of a SquashFS image.
#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to the SquashFS image.
    image: PathBuf,

    /// Byte offset of the superblock within the image, for images
    /// embedded inside another file.
    #[arg(long, default_value_t = 0)]
    offset: u64,
}

fn run(args: Args) -> Result<(), squashfs_core::SquashfsError> {
    let mut file = OffsetReader { inner: BufReader::new(File::open(&args.image)?), base: args.offset };
    file.seek(SeekFrom::Start(0))?;

    let mut header = [0u8; SUPERBLOCK_SIZE];
    file.read_exact(&mut header)?;
    let superblock = SuperBlock::parse(&header)?;
    info!(
        inodes = superblock.inode_count,
        block_size = superblock.block_size,
        compressor = ?superblock.compressor,
        "parsed superblock"
    );

    let io = IoBackend::new(file);
    let decompressor = DefaultDecompressor;
    let mount = Mount::new(&io, &superblock, &decompressor);

    let root_id = mount.root_inode_id();
    let root = mount.get_inode(root_id)?;
    println!("root inode: #{}", root.header.inode_number);
    println!("  kind: {:?}", root.kind);
    println!("  mode: {:#o}", root.header.mode);
    println!("  nlink: {}", root.nlink);
    println!("  size: {}", root.size);

    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "failed to inspect image");
            ExitCode::FAILURE
        }
    }
}
