//! Byte-level file I/O (component F): `read` and `write` over the block
//! index, with append and implicit extension.
//!
//! Both walk the file one block-aligned chunk at a time; `write` calls
//! into the size engine first when the extent reaches past the current
//! end of file, then proceeds exactly like `read` but copying in the
//! other direction.

use crate::error::{Error, Result};
use crate::image::Image;
use crate::inode::{block_of, Inode};
use crate::layout::BLKSIZE;
use crate::size;

/// Copy up to `buf.len()` bytes starting at `pos` into `buf`. Returns
/// the number of bytes actually copied, which is 0 when `pos >=
/// inode.size` and otherwise `min(buf.len(), inode.size - pos)`.
pub(crate) fn read(img: &Image, inode: &Inode, buf: &mut [u8], pos: u32) -> Result<usize> {
    if pos >= inode.size {
        return Ok(0);
    }
    let count = buf.len().min((inode.size - pos) as usize);
    let mut done = 0usize;
    let mut p = pos;
    while done < count {
        let block_no = block_of(img, inode, p);
        if block_no == 0 {
            return Err(Error::Io("block index returned no block during read"));
        }
        let within = p as usize % BLKSIZE;
        let n = (BLKSIZE - within).min(count - done);
        buf[done..done + n].copy_from_slice(&img.block(block_no)[within..within + n]);
        done += n;
        p += n as u32;
    }
    Ok(done)
}

/// Copy `buf` into the file starting at `pos` (or at end-of-file when
/// `append`), extending it first if the write reaches past the current
/// size. Returns the number of bytes written, which is always
/// `buf.len()` on success.
pub(crate) fn write(img: &mut Image, inode: &mut Inode, buf: &[u8], pos: u32, append: bool) -> Result<usize> {
    let pos = if append { inode.size } else { pos };
    let end = pos
        .checked_add(buf.len() as u32)
        .ok_or(Error::Io("pos + count overflowed"))?;
    if end > inode.size {
        size::change_size(img, inode, end)?;
    }

    let mut done = 0usize;
    let mut p = pos;
    while done < buf.len() {
        let block_no = block_of(img, inode, p);
        if block_no == 0 {
            return Err(Error::Io("block index returned no block during write"));
        }
        let within = p as usize % BLKSIZE;
        let n = (BLKSIZE - within).min(buf.len() - done);
        img.block_mut(block_no)[within..within + n].copy_from_slice(&buf[done..done + n]);
        done += n;
        p += n as u32;
    }
    Ok(done)
}
