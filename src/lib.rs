//! FAT12/16/32 disk image explorer.
//!
//! The library mounts a FAT volume out of a plain `.img` file and exposes it
//! as an immutable in-memory directory tree:
//!
//! - [`device`] opens the backing image and does positioned byte I/O,
//! - [`hal`] turns that into sector-addressed I/O with a fixed sector size,
//! - [`bpb`] decodes the boot sector and derives the volume geometry,
//! - [`fat`] loads the first FAT and walks cluster chains,
//! - [`tree`] materializes the directory tree and resolves paths in it,
//! - [`volume`] ties the layers together behind a mount/unmount facade,
//! - [`render`] and [`shell`] are the interactive front end on top.

pub mod bpb;
pub mod device;
pub mod entry;
pub mod fat;
pub mod hal;
pub mod render;
pub mod shell;
pub mod tree;
pub mod volume;

use thiserror::Error;

pub const ATTR_READ_ONLY: u8 = 0x01;
pub const ATTR_HIDDEN: u8 = 0x02;
pub const ATTR_SYSTEM: u8 = 0x04;
pub const ATTR_VOLUME_ID: u8 = 0x08;
pub const ATTR_DIRECTORY: u8 = 0x10;
pub const ATTR_ARCHIVE: u8 = 0x20;
pub const ATTR_LONG_NAME: u8 = ATTR_READ_ONLY | ATTR_HIDDEN | ATTR_SYSTEM | ATTR_VOLUME_ID;

/// Size of one on-disk directory entry.
pub const DIRENT_SIZE: usize = 32;

/// First byte of a directory entry that was deleted.
pub const DIR_ENTRY_DELETED: u8 = 0xE5;
/// First byte of a directory entry that was never used.
pub const DIR_ENTRY_UNUSED: u8 = 0x00;

pub const SPACE: u8 = 0x20;
pub const DOT: u8 = 0x2E;

/// A materialized 8.3 name is at most 8 + 1 + 3 characters.
pub const SHORT_NAME_LEN_CAP: usize = 12;
/// Path components longer than this are truncated during resolution.
pub const PATH_COMPONENT_CAP: usize = 255;

/// Volumes with fewer data clusters than this are FAT12.
pub const MAX_CLUSTER_FAT12: u32 = 4085;
/// Volumes with fewer data clusters than this (and at least
/// [`MAX_CLUSTER_FAT12`]) are FAT16; everything above is FAT32.
pub const MAX_CLUSTER_FAT16: u32 = 65525;

pub const FREE_CLUSTER: u32 = 0;

/// Exact end-of-chain marks as formatters write them.
pub const FAT12_EOC: u32 = 0xFFF;
pub const FAT16_EOC: u32 = 0xFFFF;
pub const FAT32_EOC: u32 = 0x0FFF_FFFF;

/// Smallest value that terminates a chain; real volumes mark end-of-chain
/// with anything at or above these.
pub const FAT12_EOC_MIN: u32 = 0xFF8;
pub const FAT16_EOC_MIN: u32 = 0xFFF8;
pub const FAT32_EOC_MIN: u32 = 0x0FFF_FFF8;

/// A FAT32 entry is a 28-bit value; the high 4 bits are reserved.
pub const FAT32_ENTRY_MASK: u32 = 0x0FFF_FFFF;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("File is not an image file (.img): {0}")]
    NotAnImage(String),
    #[error("Unsupported sector size: {0}")]
    UnsupportedSectorSize(u32),
    #[error("Bad image size: {0} bytes is not a positive multiple of the sector size")]
    BadImageSize(u64),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Short read at sector {0}")]
    ShortRead(u32),
    #[error("Short write at sector {0}")]
    ShortWrite(u32),
    #[error("Invalid boot sector: {0}")]
    InvalidBootSector(&'static str),
    #[error("Memory allocation failed")]
    Allocation,
    #[error("Directory not found: {0}")]
    DirectoryNotFound(String),
    #[error("File not found: {0}")]
    FileNotFound(String),
    #[error("Not a directory: {0}")]
    NotADirectory(String),
    #[error("Not a regular file: {0}")]
    NotARegularFile(String),
    #[error("Volume is mounted read-only")]
    ReadOnlyVolume,
    #[error("Writing is not implemented")]
    WriteUnsupported,
}

/// Mount mode for the backing image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountMode {
    ReadOnly,
    ReadWrite,
}

pub(crate) fn read_le_u16(input: &[u8]) -> u16 {
    let (int_bytes, _) = input.split_at(core::mem::size_of::<u16>());
    u16::from_le_bytes(int_bytes.try_into().unwrap())
}

pub(crate) fn read_le_u32(input: &[u8]) -> u32 {
    let (int_bytes, _) = input.split_at(core::mem::size_of::<u32>());
    u32::from_le_bytes(int_bytes.try_into().unwrap())
}
