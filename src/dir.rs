//! Directory engine (component D): entry lookup, blank-slot discovery,
//! and cursor-based iteration.
//!
//! A directory's content is nothing but a packed array of fixed-size
//! entries; there is no separate free-list or hash index; `find_entry`
//! is an honest linear scan. Growth borrows the size engine directly —
//! a directory is a regular block-indexed inode whose bytes just happen
//! to be interpreted as entries instead of file content.

use zerocopy::{AsBytes, FromBytes};

use crate::error::{Error, Result};
use crate::image::Image;
use crate::inode::{block_of, FType, Inode};
use crate::layout::{BLKSIZE, DIRENTRY_SIZE, MAXNAMELEN};
use crate::size;

#[repr(C)]
#[derive(Copy, Clone, AsBytes, FromBytes)]
struct RawDirEntry {
    ino: u32,
    name: [u8; MAXNAMELEN + 1],
}

static_assertions::const_assert_eq!(core::mem::size_of::<RawDirEntry>(), DIRENTRY_SIZE);

fn encode_name(name: &str) -> Result<[u8; MAXNAMELEN + 1]> {
    if name.len() > MAXNAMELEN {
        return Err(Error::NameTooLong);
    }
    let mut buf = [0u8; MAXNAMELEN + 1];
    buf[..name.len()].copy_from_slice(name.as_bytes());
    Ok(buf)
}

fn decode_name(buf: &[u8; MAXNAMELEN + 1]) -> &str {
    let len = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    core::str::from_utf8(&buf[..len]).unwrap_or_default()
}

fn entry_count(dir: &Inode) -> usize {
    dir.size as usize / DIRENTRY_SIZE
}

/// Read entry `index`'s raw fields. `index` must be within
/// `entry_count(dir)`; directory blocks are never partially filled
/// because `DIRENTRY_SIZE` divides `BLKSIZE` evenly, so no entry spans a
/// block boundary.
fn read_entry(img: &Image, dir: &Inode, index: usize) -> Result<(u32, [u8; MAXNAMELEN + 1])> {
    let byte_off = (index * DIRENTRY_SIZE) as u32;
    let block_no = block_of(img, dir, byte_off);
    if block_no == 0 {
        return Err(Error::Io("directory entry index resolved to no block"));
    }
    let within = byte_off as usize % BLKSIZE;
    let raw = RawDirEntry::read_from(&img.block(block_no)[within..within + DIRENTRY_SIZE])
        .expect("entry-sized slice");
    Ok((raw.ino, raw.name))
}

fn write_entry(img: &mut Image, dir: &Inode, index: usize, ino: u32, name: &[u8; MAXNAMELEN + 1]) {
    let byte_off = (index * DIRENTRY_SIZE) as u32;
    let block_no = block_of(img, dir, byte_off);
    let within = byte_off as usize % BLKSIZE;
    let raw = RawDirEntry { ino, name: *name };
    img.block_mut(block_no)[within..within + DIRENTRY_SIZE].copy_from_slice(raw.as_bytes());
}

/// Linear scan for a non-empty entry named `name`. Returns its slot
/// index and inode number.
pub(crate) fn find_entry(img: &Image, dir: &Inode, name: &str) -> Result<Option<(usize, u32)>> {
    for i in 0..entry_count(dir) {
        let (ino, namebuf) = read_entry(img, dir, i)?;
        if ino != 0 && decode_name(&namebuf) == name {
            return Ok(Some((i, ino)));
        }
    }
    Ok(None)
}

/// Claim a blank slot in `dir` and fill it with `(ino, name)`. Reuses
/// the first `ino == 0` slot found; if there is none, grows the
/// directory by one whole block (freshly zeroed by the size engine, so
/// every slot in it starts blank) and uses its first slot.
pub(crate) fn create_blank_entry(img: &mut Image, dir: &mut Inode, name: &str, ino: u32) -> Result<usize> {
    let name_buf = encode_name(name)?;
    let n = entry_count(dir);
    for i in 0..n {
        let (e_ino, _) = read_entry(img, dir, i)?;
        if e_ino == 0 {
            write_entry(img, dir, i, ino, &name_buf);
            return Ok(i);
        }
    }
    size::change_size(img, dir, dir.size + BLKSIZE as u32)?;
    write_entry(img, dir, n, ino, &name_buf);
    Ok(n)
}

/// Clear slot `index` (sets `ino = 0`; the slot is reused later, never
/// compacted).
pub(crate) fn clear_entry(img: &mut Image, dir: &Inode, index: usize) {
    write_entry(img, dir, index, 0, &[0u8; MAXNAMELEN + 1]);
}

/// One entry surfaced by [`iterate`], already resolved to its kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirentView {
    pub name: String,
    pub cursor: u32,
    pub ino: u32,
    pub kind: FType,
}

fn classify(img: &Image, ino: u32) -> Result<FType> {
    match img.read_inode(ino).ftype {
        FType::None => Err(Error::Io("directory entry references a free inode")),
        kind => Ok(kind),
    }
}

/// Walk `dir` from `cursor` to its end, synthesizing `.` at cursor 0 and
/// `..` at cursor 1 from the entries actually stored under those names,
/// then yielding every remaining slot by raw array position (`cursor -
/// 2`), duplicates and all if `.`/`..` also occupy the low slots of
/// that array — callers that built this image that way get back
/// exactly what they wrote. Empty slots and entries pointing at a free
/// inode are skipped by advancing the cursor without emitting. There is
/// no host-side buffer here, so this always runs to the end of the
/// directory in one call; `done` is always `true` on return.
pub(crate) fn iterate(img: &Image, dir: &Inode, cursor: u32) -> Result<(Vec<DirentView>, u32, bool)> {
    let mut out = Vec::new();
    let mut cur = cursor;

    if cur == 0 {
        if let Some((_, ino)) = find_entry(img, dir, ".")? {
            out.push(DirentView {
                name: ".".to_string(),
                cursor: 0,
                ino,
                kind: classify(img, ino)?,
            });
        }
        cur = 1;
    }
    if cur == 1 {
        if let Some((_, ino)) = find_entry(img, dir, "..")? {
            out.push(DirentView {
                name: "..".to_string(),
                cursor: 1,
                ino,
                kind: classify(img, ino)?,
            });
        }
        cur = 2;
    }

    loop {
        let index = (cur - 2) as usize;
        if index * DIRENTRY_SIZE >= dir.size as usize {
            return Ok((out, cur, true));
        }
        let (ino, namebuf) = read_entry(img, dir, index)?;
        if ino != 0 {
            if let Ok(kind) = classify(img, ino) {
                out.push(DirentView {
                    name: decode_name(&namebuf).to_string(),
                    cursor: cur,
                    ino,
                    kind,
                });
            }
        }
        cur += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::Image;
    use crate::inode::Inode;

    fn blank_dir_inode(inum: u32) -> Inode {
        let mut inode = Inode::free(inum);
        inode.ftype = FType::Directory;
        inode.nlink = 1;
        inode
    }

    #[test]
    fn create_then_find_roundtrips() {
        let mut img = Image::format(64, 16);
        let mut dir = blank_dir_inode(1);
        let idx = create_blank_entry(&mut img, &mut dir, "a", 5).unwrap();
        assert_eq!(idx, 0);
        assert_eq!(find_entry(&img, &dir, "a").unwrap(), Some((0, 5)));
        assert_eq!(find_entry(&img, &dir, "b").unwrap(), None);
    }

    #[test]
    fn clear_then_reuse_slot() {
        let mut img = Image::format(64, 16);
        let mut dir = blank_dir_inode(1);
        let idx = create_blank_entry(&mut img, &mut dir, "a", 5).unwrap();
        clear_entry(&mut img, &dir, idx);
        assert_eq!(find_entry(&img, &dir, "a").unwrap(), None);
        let idx2 = create_blank_entry(&mut img, &mut dir, "b", 6).unwrap();
        assert_eq!(idx2, idx);
    }

    #[test]
    fn name_too_long_is_rejected() {
        let mut img = Image::format(64, 16);
        let mut dir = blank_dir_inode(1);
        let long = "x".repeat(MAXNAMELEN + 1);
        assert_eq!(
            create_blank_entry(&mut img, &mut dir, &long, 5),
            Err(Error::NameTooLong)
        );
    }

    #[test]
    fn grows_directory_when_block_is_full() {
        let mut img = Image::format(8192, 64);
        let mut dir = blank_dir_inode(1);
        let entries_per_block = BLKSIZE / DIRENTRY_SIZE;
        for i in 0..entries_per_block {
            create_blank_entry(&mut img, &mut dir, &format!("f{i}"), (i + 2) as u32).unwrap();
        }
        assert_eq!(dir.size as usize, BLKSIZE);
        create_blank_entry(&mut img, &mut dir, "overflow", 999).unwrap();
        assert_eq!(dir.size as usize, 2 * BLKSIZE);
    }
}
