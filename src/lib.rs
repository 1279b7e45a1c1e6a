//! OSPFS — a block-structured, in-memory Unix-style filesystem core.
//!
//! The image lives entirely in a `Vec<u8>` treated as a pretend disk:
//! a superblock, a free-block bitmap, a fixed-size inode table, and a
//! data region indexed through a direct/indirect/doubly-indirect block
//! tree. On top of that sit directories (a packed entry array),
//! symlinks (including a conditional form keyed on the caller's uid),
//! and the namespace operations (`create`, `link`, `unlink`,
//! `symlink`) that tie them together.
//!
//! [`Mount`] is the single entry point: format a fresh image or load an
//! existing one, then call its methods. There is no global state, no
//! locking, and no concurrency — callers serialize their own calls.
//! Bridging this to an actual host (a VFS, FUSE, a test harness) is
//! deliberately out of scope; this crate only promises the behaviors
//! above.

mod bitmap;
mod dir;
mod error;
mod file;
mod fs;
mod image;
mod inode;
mod layout;
mod namespace;
mod size;
mod superblock;
mod symlink;

pub use dir::DirentView;
pub use error::{Error, Result};
pub use fs::{Mount, MountOptions, Stat};
pub use inode::FType;
pub use layout::{
    BLKSIZE, DIRENTRY_SIZE, MAXNAMELEN, MAXSYMLINKLEN, MAX_FILE_BLOCKS, ND, NI, ROOT_INO,
};
pub use symlink::ROOT_UID;
