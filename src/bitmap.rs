//! Bitmap allocator (component A, spec.md §4.A).
//!
//! Grounded on rv6's `Tx::balloc`/`Tx::bfree` (`fs/ufs/mod.rs`): scan the
//! bitmap from the first data block, lowest free bit wins, never zero
//! the block on allocation (callers needing a zeroed block do so
//! themselves — see [`crate::size`]). OSPFS drops rv6's `log.write`
//! journaling call (spec.md §1 non-goal: "No journaling or crash
//! consistency") but keeps the scan order, since spec.md §4.A makes the
//! tie-break externally observable.

use log::trace;

use crate::image::Image;

/// Find the lowest-numbered free data block, mark it allocated, and
/// return its number. Returns `0` (the "no block" sentinel used
/// throughout this crate) when the image has no free blocks.
pub(crate) fn allocate(img: &mut Image) -> u32 {
    for b in img.first_data_block()..img.total_blocks() {
        if img.bitmap_bit(b) {
            img.set_bitmap_bit(b, false);
            trace!("bitmap: allocated block {b}");
            return b;
        }
    }
    trace!("bitmap: out of blocks");
    0
}

/// Return block `b` to the free pool. A no-op, not a panic, when `b`
/// falls outside the data-block range — spec.md §4.A calls this out as
/// a defensive check callers rely on to avoid ever corrupting a
/// metadata region; see also the `free_block` bound-check typo in
/// spec.md §9, corrected per `SPEC_FULL.md` §10.2.
pub(crate) fn free(img: &mut Image, b: u32) {
    if !img.is_data_block(b) {
        debug_assert!(false, "bitmap: refusing to free non-data block {b}");
        return;
    }
    debug_assert!(!img.bitmap_bit(b), "bitmap: freeing an already-free block {b}");
    img.set_bitmap_bit(b, true);
    trace!("bitmap: freed block {b}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::Image;

    #[test]
    fn allocate_picks_lowest_numbered_free_block() {
        let mut img = Image::format(64, 16);
        let first = img.first_data_block();
        assert_eq!(allocate(&mut img), first);
        assert_eq!(allocate(&mut img), first + 1);
    }

    #[test]
    fn allocate_then_free_restores_bitmap_bit() {
        let mut img = Image::format(64, 16);
        let b = allocate(&mut img);
        assert!(!img.bitmap_bit(b));
        free(&mut img, b);
        assert!(img.bitmap_bit(b));
    }

    #[test]
    fn allocate_returns_zero_when_exhausted() {
        let mut img = Image::format(16, 16);
        let mut got = Vec::new();
        loop {
            let b = allocate(&mut img);
            if b == 0 {
                break;
            }
            got.push(b);
        }
        assert_eq!(allocate(&mut img), 0);
        for b in got {
            free(&mut img, b);
        }
    }
}
