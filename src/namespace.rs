//! Namespace operations (component N): `create`, `link`, `unlink`,
//! `symlink`, plus the inode lifecycle helper `find_free_inode`.
//!
//! Every operation here takes the parent directory inode by value
//! (well, by `&mut`) and the new name; all of them reject a name longer
//! than `MAXNAMELEN` and a name that already names a live entry before
//! touching anything persistent.

use crate::dir;
use crate::error::{Error, Result};
use crate::image::Image;
use crate::inode::{Body, FType, Inode};
use crate::layout::MAXNAMELEN;
use crate::size;
use crate::symlink;

/// Lowest-numbered inode with `nlink == 0`, starting just past the
/// root. Returns `None` when the inode table is full.
pub(crate) fn find_free_inode(img: &Image) -> Option<u32> {
    for inum in 2..img.total_inodes() {
        if img.read_inode(inum).is_free() {
            return Some(inum);
        }
    }
    None
}

fn check_name(dir: &Inode, img: &Image, name: &str) -> Result<()> {
    if name.len() > MAXNAMELEN {
        return Err(Error::NameTooLong);
    }
    if dir::find_entry(img, dir, name)?.is_some() {
        return Err(Error::Exist);
    }
    Ok(())
}

/// Create a new regular file named `name` in `dir` with the given
/// `mode`, and link it in. Returns the new inode number.
pub(crate) fn create(img: &mut Image, dir: &mut Inode, name: &str, mode: u16) -> Result<u32> {
    check_name(dir, img, name)?;
    let inum = find_free_inode(img).ok_or(Error::NoSpace)?;
    let mut inode = Inode::free(inum);
    inode.ftype = FType::Regular;
    inode.nlink = 1;
    inode.mode = mode;
    img.write_inode(&inode);
    dir::create_blank_entry(img, dir, name, inum)?;
    Ok(inum)
}

/// Add another name for `src` (which must be a regular file) into
/// `dir`.
pub(crate) fn link(img: &mut Image, src: &mut Inode, dir: &mut Inode, name: &str) -> Result<()> {
    if !src.is_regular() {
        return Err(Error::Perm);
    }
    check_name(dir, img, name)?;
    let new_nlink = src
        .nlink
        .checked_add(1)
        .ok_or(Error::Io("nlink overflow"))?;
    dir::create_blank_entry(img, dir, name, src.inum)?;
    src.nlink = new_nlink;
    img.write_inode(src);
    Ok(())
}

/// Remove `name` from `dir`. Decrements the referenced inode's
/// `nlink`; once it reaches 0, a non-symlink is truncated to size 0
/// (releasing its blocks). With `symmetric_dir_nlink` set, also
/// decrements `dir.nlink` when the removed entry was itself a
/// directory — conventional Unix parent-link accounting. Without it
/// (the default), `dir.nlink` is left untouched, matching the
/// historical behavior `symlink` itself still honors below.
pub(crate) fn unlink(img: &mut Image, dir: &mut Inode, name: &str, symmetric_dir_nlink: bool) -> Result<()> {
    let (index, ino) = dir::find_entry(img, dir, name)?.ok_or(Error::NotFound)?;
    dir::clear_entry(img, dir, index);

    let mut target = img.read_inode(ino);
    target.nlink = target.nlink.saturating_sub(1);
    let was_dir = target.is_dir();
    if target.nlink == 0 && !target.is_symlink() {
        size::change_size(img, &mut target, 0)?;
    }
    img.write_inode(&target);

    if symmetric_dir_nlink && was_dir {
        dir.nlink = dir.nlink.saturating_sub(1);
        img.write_inode(dir);
    }
    Ok(())
}

/// Create a symlink named `name` in `dir` resolving to `target` (plain
/// or conditional form, see [`crate::symlink`]). With
/// `symmetric_dir_nlink` unset (the default), mirrors the historical
/// behavior of also bumping `dir.nlink` — an asymmetry `create` and
/// `link` do not share.
pub(crate) fn symlink(
    img: &mut Image,
    dir: &mut Inode,
    name: &str,
    target: &str,
    symmetric_dir_nlink: bool,
) -> Result<u32> {
    check_name(dir, img, name)?;
    let (buf, size) = symlink::encode(target)?;
    let inum = find_free_inode(img).ok_or(Error::NoSpace)?;
    let mut inode = Inode::free(inum);
    inode.ftype = FType::Symlink;
    inode.nlink = 1;
    inode.size = size;
    inode.body = Body::Symlink { target: buf };
    img.write_inode(&inode);
    dir::create_blank_entry(img, dir, name, inum)?;

    if !symmetric_dir_nlink {
        dir.nlink = dir.nlink.saturating_add(1);
        img.write_inode(dir);
    }
    Ok(inum)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::Image;

    fn root_dir() -> Inode {
        let mut inode = Inode::free(1);
        inode.ftype = FType::Directory;
        inode.nlink = 1;
        inode
    }

    #[test]
    fn scenario_hard_link_then_unlink() {
        let mut img = Image::format(8192, 64);
        let mut root = root_dir();
        let a = create(&mut img, &mut root, "a", 0o644).unwrap();
        let mut a_inode = img.read_inode(a);
        link(&mut img, &mut a_inode, &mut root, "b").unwrap();
        unlink(&mut img, &mut root, "a", false).unwrap();
        assert_eq!(dir::find_entry(&img, &root, "a").unwrap(), None);
        assert_eq!(dir::find_entry(&img, &root, "b").unwrap(), Some((0, a)));
        assert_eq!(img.read_inode(a).nlink, 1);
    }

    #[test]
    fn symlink_bumps_parent_nlink_by_default() {
        let mut img = Image::format(8192, 64);
        let mut root = root_dir();
        let before = root.nlink;
        symlink(&mut img, &mut root, "s", "/target", false).unwrap();
        assert_eq!(root.nlink, before + 1);
    }

    #[test]
    fn symlink_leaves_parent_nlink_alone_when_symmetric() {
        let mut img = Image::format(8192, 64);
        let mut root = root_dir();
        let before = root.nlink;
        symlink(&mut img, &mut root, "s", "/target", true).unwrap();
        assert_eq!(root.nlink, before);
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let mut img = Image::format(8192, 64);
        let mut root = root_dir();
        create(&mut img, &mut root, "a", 0o644).unwrap();
        assert_eq!(create(&mut img, &mut root, "a", 0o644), Err(Error::Exist));
    }

    #[test]
    fn link_to_non_regular_is_rejected() {
        let mut img = Image::format(8192, 64);
        let mut root = root_dir();
        let s = symlink(&mut img, &mut root, "s", "/t", false).unwrap();
        let mut s_inode = img.read_inode(s);
        assert_eq!(
            link(&mut img, &mut s_inode, &mut root, "link-to-s"),
            Err(Error::Perm)
        );
    }
}
