//! Inode records and the block index (components I and part of the data
//! model in spec.md §3/§4.I).
//!
//! The on-disk record (`RawInode`) follows rv6's `Dinode`
//! (`fs/ufs/inode.rs`): a `#[repr(C)]` struct cast directly onto bytes
//! inside an inode-table block via `zerocopy`. Unlike rv6 (a single
//! `addr_indirect`, no symlinks), OSPFS needs a second indirection level
//! and a distinct symlink shape, so the payload past the header is
//! interpreted two ways depending on `ftype` — the "switch-on-ftype...
//! tagged union" design note from spec.md §9.

use zerocopy::{AsBytes, FromBytes};

use crate::image::Image;
use crate::layout::{
    INODE_BLOCK_TABLE_SIZE, INODE_PAYLOAD_SIZE, MAXSYMLINKLEN, ND, NI,
};

/// File type, read from the low byte of an inode record.
///
/// `None` marks a free inode (`nlink == 0` and no other state is
/// meaningful); `find_free_inode` looks for exactly this.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum FType {
    None = 0,
    Regular = 1,
    Directory = 2,
    Symlink = 3,
}

impl FType {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => FType::Regular,
            2 => FType::Directory,
            3 => FType::Symlink,
            _ => FType::None,
        }
    }
}

/// Fixed-size on-disk inode record. `payload` is either the
/// direct/indirect/indirect2 block-pointer table (regular files and
/// directories) or an inline symlink target (symlinks), per `ftype`.
#[repr(C)]
#[derive(Copy, Clone, AsBytes, FromBytes)]
pub struct RawInode {
    ftype: u8,
    _reserved0: u8,
    nlink: u16,
    mode: u16,
    _reserved1: u16,
    size: u32,
    payload: [u8; INODE_PAYLOAD_SIZE],
}

/// The block-pointer table carried by a regular file or directory
/// inode: `ND` direct pointers, one indirect block, one doubly-indirect
/// block. A pointer of 0 means "not present" (spec.md §3).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BlockTable {
    pub direct: [u32; ND],
    pub indirect: u32,
    pub indirect2: u32,
}

impl BlockTable {
    const EMPTY: BlockTable = BlockTable {
        direct: [0; ND],
        indirect: 0,
        indirect2: 0,
    };

    fn decode(payload: &[u8; INODE_PAYLOAD_SIZE]) -> Self {
        let mut direct = [0u32; ND];
        for (i, slot) in direct.iter_mut().enumerate() {
            *slot = u32::from_le_bytes(payload[i * 4..i * 4 + 4].try_into().unwrap());
        }
        let indirect = u32::from_le_bytes(payload[ND * 4..ND * 4 + 4].try_into().unwrap());
        let indirect2 =
            u32::from_le_bytes(payload[ND * 4 + 4..ND * 4 + 8].try_into().unwrap());
        BlockTable {
            direct,
            indirect,
            indirect2,
        }
    }

    fn encode(&self, payload: &mut [u8; INODE_PAYLOAD_SIZE]) {
        payload.fill(0);
        for (i, slot) in self.direct.iter().enumerate() {
            payload[i * 4..i * 4 + 4].copy_from_slice(&slot.to_le_bytes());
        }
        payload[ND * 4..ND * 4 + 4].copy_from_slice(&self.indirect.to_le_bytes());
        payload[ND * 4 + 4..ND * 4 + 8].copy_from_slice(&self.indirect2.to_le_bytes());
        debug_assert!(INODE_BLOCK_TABLE_SIZE <= payload.len());
    }
}

/// The two inode shapes distinguished by `ftype` (spec.md §3).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Body {
    /// Regular file or directory: a block-pointer table.
    Blocks(BlockTable),
    /// Symlink: an inline, NUL-delimited encoded target. Never backed by
    /// data blocks (invariant I5).
    Symlink { target: [u8; MAXSYMLINKLEN] },
}

/// Decoded in-memory view of one inode record. Cheap to copy; callers
/// read it via [`Image::read_inode`], mutate the copy, and write it back
/// via [`Image::write_inode`]. There is no in-memory cache or reference
/// counting here (spec.md §9: "re-architect as a `Filesystem` value
/// parameter"; there is exactly one owner at a time, the caller's stack
/// frame).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Inode {
    pub inum: u32,
    pub ftype: FType,
    pub nlink: u16,
    pub mode: u16,
    pub size: u32,
    pub body: Body,
}

impl Inode {
    /// A blank, unallocated inode record (`ftype == None`, `nlink ==
    /// 0`).
    pub(crate) fn free(inum: u32) -> Self {
        Inode {
            inum,
            ftype: FType::None,
            nlink: 0,
            mode: 0,
            size: 0,
            body: Body::Blocks(BlockTable::EMPTY),
        }
    }

    pub(crate) fn decode(inum: u32, raw: RawInode) -> Self {
        let ftype = FType::from_u8(raw.ftype);
        let body = if ftype == FType::Symlink {
            Body::Symlink {
                target: raw.payload,
            }
        } else {
            Body::Blocks(BlockTable::decode(&raw.payload))
        };
        Inode {
            inum,
            ftype,
            nlink: raw.nlink,
            mode: raw.mode,
            size: raw.size,
            body,
        }
    }

    pub(crate) fn encode(&self) -> RawInode {
        let mut payload = [0u8; INODE_PAYLOAD_SIZE];
        match &self.body {
            Body::Blocks(table) => table.encode(&mut payload),
            Body::Symlink { target } => payload.copy_from_slice(target),
        }
        RawInode {
            ftype: self.ftype as u8,
            _reserved0: 0,
            nlink: self.nlink,
            mode: self.mode,
            _reserved1: 0,
            size: self.size,
            payload,
        }
    }

    /// Block-pointer table, for callers that already know this is a
    /// regular file or directory. Panics otherwise — callers that don't
    /// know should match on `body` directly.
    pub(crate) fn table(&self) -> &BlockTable {
        match &self.body {
            Body::Blocks(t) => t,
            Body::Symlink { .. } => panic!("symlink inode has no block table"),
        }
    }

    pub(crate) fn table_mut(&mut self) -> &mut BlockTable {
        match &mut self.body {
            Body::Blocks(t) => t,
            Body::Symlink { .. } => panic!("symlink inode has no block table"),
        }
    }

    pub fn is_symlink(&self) -> bool {
        self.ftype == FType::Symlink
    }

    pub fn is_dir(&self) -> bool {
        self.ftype == FType::Directory
    }

    pub fn is_regular(&self) -> bool {
        self.ftype == FType::Regular
    }

    pub fn is_free(&self) -> bool {
        self.nlink == 0
    }
}

/// Number of whole blocks needed to hold `size` bytes.
pub(crate) fn blocks_for_size(size: u32) -> usize {
    (size as usize + crate::layout::BLKSIZE - 1) / crate::layout::BLKSIZE
}

/// Pure, read-only block index: `(inode, byte_offset) -> block_no`
/// (spec.md §4.I). Returns the sentinel `0` when `byte_offset >=
/// inode.size`, or when `inode` is a symlink (symlinks keep no data
/// blocks, invariant I5). Never allocates.
pub(crate) fn block_of(img: &Image, inode: &Inode, byte_offset: u32) -> u32 {
    if byte_offset >= inode.size || inode.is_symlink() {
        return 0;
    }
    let table = inode.table();
    let b = byte_offset as usize / crate::layout::BLKSIZE;
    if b < ND {
        return table.direct[b];
    }
    let b = b - ND;
    if b < NI {
        if table.indirect == 0 {
            return 0;
        }
        return img.indirect_slot(table.indirect, b);
    }
    let b = b - NI;
    let i1_idx = b / NI;
    let d_idx = b % NI;
    if table.indirect2 == 0 {
        return 0;
    }
    let indirect_block = img.indirect_slot(table.indirect2, i1_idx);
    if indirect_block == 0 {
        return 0;
    }
    img.indirect_slot(indirect_block, d_idx)
}

/// Split a 0-based file block index into the `(i2_idx, i1_idx, d_idx)`
/// triple from spec.md §3, or `None` when `b` only needs a direct slot.
pub(crate) enum BlockLocation {
    Direct(usize),
    Indirect { slot: usize },
    Indirect2 { i1_idx: usize, d_idx: usize },
}

pub(crate) fn locate_block(b: usize) -> BlockLocation {
    if b < ND {
        return BlockLocation::Direct(b);
    }
    let b = b - ND;
    if b < NI {
        return BlockLocation::Indirect { slot: b };
    }
    let b = b - NI;
    BlockLocation::Indirect2 {
        i1_idx: b / NI,
        d_idx: b % NI,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::Image;

    #[test]
    fn block_of_symlink_is_always_sentinel() {
        let img = Image::format(64, 16);
        let mut inode = Inode::free(2);
        inode.ftype = FType::Symlink;
        inode.size = 100;
        inode.body = Body::Symlink {
            target: [0u8; MAXSYMLINKLEN],
        };
        assert_eq!(block_of(&img, &inode, 0), 0);
    }

    #[test]
    fn block_of_past_size_is_sentinel() {
        let img = Image::format(64, 16);
        let mut inode = Inode::free(2);
        inode.ftype = FType::Regular;
        inode.size = 10;
        inode.table_mut().direct[0] = img.first_data_block();
        assert_eq!(block_of(&img, &inode, 10), 0);
        assert_eq!(block_of(&img, &inode, 9), img.first_data_block());
    }

    #[test]
    fn locate_block_boundaries() {
        assert!(matches!(locate_block(ND - 1), BlockLocation::Direct(d) if d == ND - 1));
        assert!(matches!(locate_block(ND), BlockLocation::Indirect { slot: 0 }));
        assert!(matches!(locate_block(ND + NI - 1), BlockLocation::Indirect { slot } if slot == NI - 1));
        assert!(matches!(
            locate_block(ND + NI),
            BlockLocation::Indirect2 { i1_idx: 0, d_idx: 0 }
        ));
        assert!(matches!(
            locate_block(ND + NI + NI),
            BlockLocation::Indirect2 { i1_idx: 1, d_idx: 0 }
        ));
    }
}
