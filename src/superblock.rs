//! Superblock: image geometry, read-only after construction.
//!
//! Grounded on rv6's `fs::Superblock` (`kernel-rs/src/fs/mod.rs`), which
//! stores `magic`/`size`/`ninodes`/`inodestart` and exposes `iblock`/
//! `bblock` helpers to translate an inode or bitmap-bit number into a
//! block number. OSPFS has no log region, so the layout collapses to
//! boot/superblock/bitmap/inode-table/data, matching spec.md §6.

use core::mem;

use zerocopy::{AsBytes, FromBytes};

use crate::layout::{BLKSIZE, INODES_PER_BLOCK, OSPFS_MAGIC};

/// Block 0 is the unused boot block; block 1 is the superblock; data
/// proper never starts before block 2 even with zero bitmap blocks.
const FIRST_BITMAP_BLOCK: u32 = 2;

/// On-disk superblock record. Occupies block 1 in its entirety (padded
/// with zero bytes); the rest of the block is reserved.
#[repr(C)]
#[derive(Copy, Clone, Debug, AsBytes, FromBytes)]
pub struct Superblock {
    pub(crate) magic: u32,
    pub(crate) total_blocks: u32,
    pub(crate) total_inodes: u32,
    pub(crate) first_inode_block: u32,
}

static_assertions::const_assert!(mem::size_of::<Superblock>() <= BLKSIZE);

impl Superblock {
    /// Compute a fresh superblock for an image of `total_blocks` blocks
    /// with `total_inodes` inodes. Does not write anything; the caller
    /// (`Mount::format`) still has to zero the bitmap and inode table.
    pub(crate) fn format(total_blocks: u32, total_inodes: u32) -> Self {
        let inode_blocks = Self::inode_blocks_for(total_inodes);
        let first_inode_block = FIRST_BITMAP_BLOCK + Self::bitmap_blocks_for(total_blocks);
        assert!(
            (first_inode_block + inode_blocks) < total_blocks,
            "image too small to hold its own metadata"
        );
        Superblock {
            magic: OSPFS_MAGIC,
            total_blocks,
            total_inodes,
            first_inode_block,
        }
    }

    /// Number of blocks the free bitmap needs to cover `total_blocks`
    /// blocks, one bit per block.
    fn bitmap_blocks_for(total_blocks: u32) -> u32 {
        let bits_per_block = (BLKSIZE * 8) as u32;
        (total_blocks + bits_per_block - 1) / bits_per_block
    }

    /// Number of blocks the inode table needs to hold `total_inodes`
    /// fixed-size inode records.
    fn inode_blocks_for(total_inodes: u32) -> u32 {
        let per_block = INODES_PER_BLOCK as u32;
        (total_inodes + per_block - 1) / per_block
    }

    pub fn total_blocks(&self) -> u32 {
        self.total_blocks
    }

    pub fn total_inodes(&self) -> u32 {
        self.total_inodes
    }

    pub fn first_inode_block(&self) -> u32 {
        self.first_inode_block
    }

    pub(crate) fn first_bitmap_block(&self) -> u32 {
        FIRST_BITMAP_BLOCK
    }

    pub(crate) fn inode_blocks(&self) -> u32 {
        Self::inode_blocks_for(self.total_inodes)
    }

    pub(crate) fn first_data_block(&self) -> u32 {
        self.first_inode_block + self.inode_blocks()
    }

    /// Block holding inode number `inum`'s record.
    pub(crate) fn iblock(&self, inum: u32) -> u32 {
        self.first_inode_block + inum / INODES_PER_BLOCK as u32
    }

    /// Offset of inode `inum`'s record within its block.
    pub(crate) fn ioffset(&self, inum: u32) -> usize {
        (inum as usize % INODES_PER_BLOCK) * crate::layout::INODE_RECORD_SIZE
    }

    /// Block holding the bitmap bit for data block `b`.
    pub(crate) fn bblock(&self, b: u32) -> u32 {
        FIRST_BITMAP_BLOCK + b / (BLKSIZE as u32 * 8)
    }

    pub(crate) fn is_valid_magic(&self) -> bool {
        self.magic == OSPFS_MAGIC
    }
}
