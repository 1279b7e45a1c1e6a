//! Error kinds.
//!
//! A closed set of error kinds a host adapter maps onto its own
//! errno-like space, built as a single `thiserror` enum the way a
//! standalone filesystem library typically does when it can't get away
//! with a bare `Result<(), ()>`.

use thiserror::Error;

/// Everything that can go wrong inside the OSPFS core.
///
/// The host adapter (out of scope for this crate) is responsible for
/// translating a variant into whatever errno space it needs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The free-block bitmap or the inode table is exhausted.
    #[error("no space left on device")]
    NoSpace,

    /// A name or symlink target exceeded its length limit.
    #[error("name too long")]
    NameTooLong,

    /// A directory entry with that name already exists.
    #[error("file exists")]
    Exist,

    /// `lookup`/`unlink`/`dirlookup` found no matching entry.
    #[error("no such file or directory")]
    NotFound,

    /// An on-disk invariant was violated: a block-index sentinel where a
    /// block was expected, a missing indirect/doubly-indirect block, or
    /// an arithmetic overflow while computing an extent.
    #[error("I/O error: filesystem invariant violated ({0})")]
    Io(&'static str),

    /// The host adapter's user-buffer transfer failed (never raised by
    /// the core itself; reserved for host adapters translating their own
    /// copy-in/copy-out failures through this type).
    #[error("bad address")]
    Fault,

    /// The host adapter failed to materialize a handle for a newly
    /// created inode (never raised by the core itself; same rationale
    /// as `Fault`).
    #[error("out of memory")]
    NoMem,

    /// An operation the data model disallows for the operand's type:
    /// resizing a directory through the generic truncate entry point,
    /// or hard-linking anything other than a regular file.
    #[error("operation not permitted")]
    Perm,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;
