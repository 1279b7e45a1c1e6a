//! Typed views over the raw byte region (component B).
//!
//! The image is already fully resident in memory, so `Image` is just a
//! `Vec<u8>` with typed accessors over it — no cache, no I/O, no
//! locking. This is the one layer that knows about byte offsets; every
//! other module works in blocks and inode numbers.

use zerocopy::{AsBytes, FromBytes};

use crate::inode::{Inode, RawInode};
use crate::layout::{BLKSIZE, INODE_RECORD_SIZE, NI};
use crate::superblock::Superblock;
use crate::Error;

/// One block's worth of bytes.
pub type BlockBuf = [u8; BLKSIZE];

/// The mounted image: superblock plus the backing byte region.
pub struct Image {
    superblock: Superblock,
    bytes: Vec<u8>,
}

impl Image {
    /// Format a brand new, all-zero image of `total_blocks` blocks with
    /// room for `total_inodes` inodes, and write its root directory.
    pub(crate) fn format(total_blocks: u32, total_inodes: u32) -> Self {
        let superblock = Superblock::format(total_blocks, total_inodes);
        let bytes = vec![0u8; total_blocks as usize * BLKSIZE];
        let mut img = Image { superblock, bytes };
        img.write_superblock();
        // Bits for boot/superblock/bitmap/inode-table blocks stay 0
        // (allocated) since the image started zeroed; only data blocks
        // are marked free (invariant: bitmap bits for non-data blocks
        // are never touched by the allocator.
        for b in img.first_data_block()..img.total_blocks() {
            img.set_bitmap_bit(b, true);
        }
        img
    }

    /// Load an already-formatted image from raw bytes.
    pub(crate) fn load(bytes: Vec<u8>) -> Result<Self, Error> {
        if bytes.len() < 2 * BLKSIZE || bytes.len() % BLKSIZE != 0 {
            return Err(Error::Io("image size is not a whole number of blocks"));
        }
        let sb_bytes = &bytes[BLKSIZE..2 * BLKSIZE];
        let superblock = Superblock::read_from_prefix(sb_bytes)
            .ok_or(Error::Io("superblock record truncated"))?;
        if !superblock.is_valid_magic() {
            return Err(Error::Io("bad superblock magic"));
        }
        if superblock.total_blocks() as usize * BLKSIZE != bytes.len() {
            return Err(Error::Io("superblock block count disagrees with image size"));
        }
        Ok(Image { superblock, bytes })
    }

    pub(crate) fn superblock(&self) -> &Superblock {
        &self.superblock
    }

    fn write_superblock(&mut self) {
        let block = self.block_mut(1);
        block[..core::mem::size_of::<Superblock>()].copy_from_slice(self.superblock.as_bytes());
    }

    pub(crate) fn total_blocks(&self) -> u32 {
        self.superblock.total_blocks()
    }

    pub(crate) fn total_inodes(&self) -> u32 {
        self.superblock.total_inodes()
    }

    pub(crate) fn first_data_block(&self) -> u32 {
        self.superblock.first_data_block()
    }

    /// Whether `b` names a block the allocator is allowed to hand out or
    /// take back: checked against the block total, not the inode count.
    pub(crate) fn is_data_block(&self, b: u32) -> bool {
        b >= self.first_data_block() && b < self.total_blocks()
    }

    pub(crate) fn block(&self, no: u32) -> &BlockBuf {
        let start = no as usize * BLKSIZE;
        (&self.bytes[start..start + BLKSIZE]).try_into().expect("block-sized slice")
    }

    pub(crate) fn block_mut(&mut self, no: u32) -> &mut BlockBuf {
        let start = no as usize * BLKSIZE;
        (&mut self.bytes[start..start + BLKSIZE])
            .try_into()
            .expect("block-sized slice")
    }

    pub(crate) fn zero_block(&mut self, no: u32) {
        self.block_mut(no).fill(0);
    }

    /// Reinterpret a block as `NI` little-endian `u32` block-number
    /// slots.
    pub(crate) fn indirect_table(&self, no: u32) -> [u32; NI] {
        let mut out = [0u32; NI];
        for (i, word) in self.block(no).chunks_exact(4).enumerate() {
            out[i] = u32::from_le_bytes(word.try_into().unwrap());
        }
        out
    }

    pub(crate) fn indirect_slot(&self, block_no: u32, slot: usize) -> u32 {
        let word = &self.block(block_no)[slot * 4..slot * 4 + 4];
        u32::from_le_bytes(word.try_into().unwrap())
    }

    pub(crate) fn set_indirect_slot(&mut self, block_no: u32, slot: usize, value: u32) {
        let block = self.block_mut(block_no);
        block[slot * 4..slot * 4 + 4].copy_from_slice(&value.to_le_bytes());
    }

    /// Read and decode inode `inum`'s fixed-size record.
    pub(crate) fn read_inode(&self, inum: u32) -> Inode {
        let block_no = self.superblock.iblock(inum);
        let off = self.superblock.ioffset(inum);
        let block = self.block(block_no);
        let raw = RawInode::read_from(&block[off..off + INODE_RECORD_SIZE])
            .expect("inode record is exactly INODE_RECORD_SIZE bytes");
        Inode::decode(inum, raw)
    }

    /// Encode and write back inode `inode.inum`'s record. Must be called
    /// after every change to a field that lives on disk (rv6's
    /// `InodeGuard::update` convention, `fs/ufs/inode.rs`).
    pub(crate) fn write_inode(&mut self, inode: &Inode) {
        let block_no = self.superblock.iblock(inode.inum);
        let off = self.superblock.ioffset(inode.inum);
        let raw = inode.encode();
        let block = self.block_mut(block_no);
        block[off..off + INODE_RECORD_SIZE].copy_from_slice(raw.as_bytes());
    }

    pub(crate) fn bitmap_bit(&self, b: u32) -> bool {
        let block_no = self.superblock.bblock(b);
        let bi = b as usize % (BLKSIZE * 8);
        let byte = self.block(block_no)[bi / 8];
        byte & (1 << (bi % 8)) != 0
    }

    pub(crate) fn set_bitmap_bit(&mut self, b: u32, free: bool) {
        let block_no = self.superblock.bblock(b);
        let bi = b as usize % (BLKSIZE * 8);
        let mask = 1u8 << (bi % 8);
        let block = self.block_mut(block_no);
        if free {
            block[bi / 8] |= mask;
        } else {
            block[bi / 8] &= !mask;
        }
    }

    /// Borrow the whole image as bytes, e.g. to persist it elsewhere.
    /// The host adapter (out of scope here) is the only intended
    /// consumer.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}
