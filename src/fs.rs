//! The public `Mount` API: the single entry point a host adapter (out
//! of scope for this crate) drives.
//!
//! `Mount` owns one [`Image`](crate::image::Image) and threads it
//! through every call; there is no global state and no interior
//! mutability. Callers serialize their own calls — `Mount` assumes
//! single-threaded, cooperative use, exactly like the rest of this
//! crate.

use crate::dir::{self, DirentView};
use crate::error::{Error, Result};
use crate::file;
use crate::image::Image;
use crate::inode::{Body, FType, Inode};
use crate::layout::ROOT_INO;
use crate::namespace;
use crate::size;
use crate::symlink;

/// Mount-time policy choices — the only configuration surface beyond
/// the compile-time layout constants.
#[derive(Clone, Copy, Debug, Default)]
pub struct MountOptions {
    /// When `true`, directory `nlink` is maintained the conventional
    /// way (only directory creation/removal touch a parent's count).
    /// When `false` (the default), the historical asymmetry is kept:
    /// `symlink` bumps the parent's `nlink`, `create`/`link` don't, and
    /// `unlink` never decrements it.
    pub symmetric_dir_nlink: bool,
}

/// Snapshot of an inode's externally visible metadata.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Stat {
    pub size: u32,
    pub ftype: FType,
    pub nlink: u16,
    pub mode: u16,
}

/// A mounted OSPFS image.
pub struct Mount {
    img: Image,
    options: MountOptions,
}

impl Mount {
    /// Format a brand-new image of `total_blocks` blocks with room for
    /// `total_inodes` inodes, and write its root directory (inode
    /// [`ROOT_INO`]) with `.` and `..` both pointing at itself.
    pub fn format(total_blocks: u32, total_inodes: u32, options: MountOptions) -> Result<Self> {
        let mut img = Image::format(total_blocks, total_inodes);
        let mut root = Inode::free(ROOT_INO);
        root.ftype = FType::Directory;
        // One link for `.`, one for the self-referential `..` — the
        // usual accounting for a filesystem root, which has no parent
        // of its own.
        root.nlink = 2;
        img.write_inode(&root);
        dir::create_blank_entry(&mut img, &mut root, ".", ROOT_INO)?;
        dir::create_blank_entry(&mut img, &mut root, "..", ROOT_INO)?;
        img.write_inode(&root);
        Ok(Mount { img, options })
    }

    /// Load an already-formatted image.
    pub fn mount(bytes: Vec<u8>, options: MountOptions) -> Result<Self> {
        let img = Image::load(bytes)?;
        Ok(Mount { img, options })
    }

    pub fn lookup(&self, dir_ino: u32, name: &str) -> Result<u32> {
        let dir = self.img.read_inode(dir_ino);
        dir::find_entry(&self.img, &dir, name)?
            .map(|(_, ino)| ino)
            .ok_or(Error::NotFound)
    }

    pub fn readdir(&self, dir_ino: u32, cursor: u32) -> Result<(Vec<DirentView>, u32, bool)> {
        let dir = self.img.read_inode(dir_ino);
        dir::iterate(&self.img, &dir, cursor)
    }

    pub fn create(&mut self, dir_ino: u32, name: &str, mode: u16) -> Result<u32> {
        let mut dir = self.img.read_inode(dir_ino);
        namespace::create(&mut self.img, &mut dir, name, mode)
    }

    pub fn link(&mut self, dir_ino: u32, name: &str, src_ino: u32) -> Result<()> {
        let mut dir = self.img.read_inode(dir_ino);
        let mut src = self.img.read_inode(src_ino);
        namespace::link(&mut self.img, &mut src, &mut dir, name)
    }

    pub fn unlink(&mut self, dir_ino: u32, name: &str) -> Result<()> {
        let mut dir = self.img.read_inode(dir_ino);
        namespace::unlink(&mut self.img, &mut dir, name, self.options.symmetric_dir_nlink)
    }

    pub fn symlink(&mut self, dir_ino: u32, name: &str, target: &str) -> Result<u32> {
        let mut dir = self.img.read_inode(dir_ino);
        namespace::symlink(&mut self.img, &mut dir, name, target, self.options.symmetric_dir_nlink)
    }

    pub fn follow_symlink(&self, ino: u32, caller_uid: u32) -> Result<String> {
        let inode = self.img.read_inode(ino);
        match &inode.body {
            Body::Symlink { target } => symlink::resolve(target, caller_uid),
            _ => Err(Error::Io("follow_symlink called on a non-symlink inode")),
        }
    }

    pub fn read(&self, ino: u32, pos: u32, buf: &mut [u8]) -> Result<usize> {
        let inode = self.img.read_inode(ino);
        file::read(&self.img, &inode, buf, pos)
    }

    pub fn write(&mut self, ino: u32, pos: u32, buf: &[u8], append: bool) -> Result<usize> {
        let mut inode = self.img.read_inode(ino);
        file::write(&mut self.img, &mut inode, buf, pos, append)
    }

    /// Grow or shrink a regular file's content to exactly `new_size`.
    /// Rejects directories (`Perm`) — resizing a directory through this
    /// generic entry point is not a supported operation.
    pub fn truncate(&mut self, ino: u32, new_size: u32) -> Result<()> {
        let mut inode = self.img.read_inode(ino);
        if inode.is_dir() {
            return Err(Error::Perm);
        }
        size::change_size(&mut self.img, &mut inode, new_size)
    }

    pub fn stat(&self, ino: u32) -> Result<Stat> {
        let inode = self.img.read_inode(ino);
        Ok(Stat {
            size: inode.size,
            ftype: inode.ftype,
            nlink: inode.nlink,
            mode: inode.mode,
        })
    }

    /// Borrow the whole image, e.g. to persist it elsewhere. The host
    /// adapter is the only intended consumer.
    pub fn as_bytes(&self) -> &[u8] {
        self.img.as_bytes()
    }
}
