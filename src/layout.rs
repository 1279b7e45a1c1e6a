//! On-disk layout constants.
//!
//! A small set of `const`s that the allocator, the block index, and the
//! directory engine all agree on: block size, pointer-table shape,
//! name and symlink length limits, inode-record size.
//!
//! These are genuinely compile-time: byte-for-byte compatibility with a
//! reference image is required, so none of this is a runtime knob.

use core::mem;

use crate::inode::RawInode;

/// Size of one block, in bytes.
pub const BLKSIZE: usize = 1024;

/// Number of direct block pointers stored in an inode.
pub const ND: usize = 10;

/// Number of block-number slots per indirect block.
pub const NI: usize = BLKSIZE / mem::size_of::<u32>();

/// Largest file size expressible, in whole blocks: direct + single
/// indirect + doubly indirect (`NI` indirect blocks of `NI` pointers
/// each).
pub const MAX_FILE_BLOCKS: usize = ND + NI + NI * NI;

/// Header occupying the front of every fixed-size inode record
/// (`ftype`, `nlink`, `mode`, `size`). See [`crate::inode::RawInode`].
pub const INODE_HEADER_SIZE: usize = 12;

/// Bytes available after the header for either the direct/indirect/
/// indirect2 block-pointer table (regular files and directories) or an
/// inline symlink target (symlinks). Sized so the whole record rounds to
/// a tidy power of two.
pub const INODE_PAYLOAD_SIZE: usize = 52;

/// Total on-disk size of one inode record.
pub const INODE_RECORD_SIZE: usize = INODE_HEADER_SIZE + INODE_PAYLOAD_SIZE;

/// Number of bytes of the payload actually used by the block-pointer
/// table: `ND` direct pointers plus `indirect` plus `indirect2`.
pub const INODE_BLOCK_TABLE_SIZE: usize = (ND + 2) * mem::size_of::<u32>();

/// Longest symlink target (plain or encoded conditional form) an inode
/// can store inline. Equal to the whole payload, since symlinks keep no
/// data blocks (invariant I5).
pub const MAXSYMLINKLEN: usize = INODE_PAYLOAD_SIZE;

/// Longest directory-entry name, NUL terminator excluded.
pub const MAXNAMELEN: usize = 27;

/// On-disk size of one directory entry: a `u32` inode number plus a
/// NUL-terminated name buffer.
pub const DIRENTRY_SIZE: usize = mem::size_of::<u32>() + MAXNAMELEN + 1;

/// Inodes packed per inode-table block.
pub const INODES_PER_BLOCK: usize = BLKSIZE / INODE_RECORD_SIZE;

// A directory's size is always a whole number of blocks, so a block
// boundary must also be an entry boundary.
static_assertions::const_assert!(BLKSIZE % DIRENTRY_SIZE == 0);
static_assertions::const_assert!(INODES_PER_BLOCK > 0);
static_assertions::const_assert_eq!(mem::size_of::<RawInode>(), INODE_RECORD_SIZE);

/// Root inode number. Inode 0 is reserved and never allocated.
pub const ROOT_INO: u32 = 1;

/// Magic number stamped in the superblock of a freshly formatted image.
pub const OSPFS_MAGIC: u32 = 0x4F53_5046; // "OSPF" in ASCII, big-endian reading
