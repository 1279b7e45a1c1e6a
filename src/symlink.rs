//! Symlink codec (component L): encodes a caller-supplied target string
//! into an inode's inline payload, and resolves it back given the
//! calling user's identifier.
//!
//! Two forms share one inline buffer, distinguished by its first byte:
//!
//! - plain: `target '\0'`
//! - conditional: `'?' root_path '\0' ':' other_path '\0'`, built from
//!   user syntax `<prefix>?<root_path>:<other_path>` with `<prefix>`
//!   discarded. Root (`uid == 0`) resolves to `root_path`; anyone else
//!   resolves to `other_path`.
//!
//! A conditional target is detected by a `?` occurring before the
//! first `:` in the caller's string.

use crate::error::{Error, Result};
use crate::layout::{MAXNAMELEN, MAXSYMLINKLEN};

/// uid conventionally treated as root by [`resolve`].
pub const ROOT_UID: u32 = 0;

fn conditional_parts(target: &str) -> Option<(&str, &str)> {
    let qpos = target.find('?')?;
    let cpos = target.find(':')?;
    if qpos < cpos {
        Some((&target[qpos + 1..cpos], &target[cpos + 1..]))
    } else {
        None
    }
}

/// Encode `target` into an inline symlink payload. Returns the buffer
/// and the byte count to store as the inode's `size`.
pub(crate) fn encode(target: &str) -> Result<([u8; MAXSYMLINKLEN], u32)> {
    if let Some((root, other)) = conditional_parts(target) {
        let encoded_len = root.len() + other.len() + 4; // '?', inner NUL, ':', trailing NUL
        if encoded_len > MAXNAMELEN {
            return Err(Error::NameTooLong);
        }
        let mut buf = [0u8; MAXSYMLINKLEN];
        let mut pos = 0;
        buf[pos] = b'?';
        pos += 1;
        buf[pos..pos + root.len()].copy_from_slice(root.as_bytes());
        pos += root.len();
        buf[pos] = 0;
        pos += 1;
        buf[pos] = b':';
        pos += 1;
        buf[pos..pos + other.len()].copy_from_slice(other.as_bytes());
        pos += other.len();
        buf[pos] = 0;
        Ok((buf, encoded_len as u32))
    } else {
        if target.len() > MAXSYMLINKLEN {
            return Err(Error::NameTooLong);
        }
        let mut buf = [0u8; MAXSYMLINKLEN];
        buf[..target.len()].copy_from_slice(target.as_bytes());
        // A target exactly MAXSYMLINKLEN bytes long leaves no room for a
        // terminator; resolve() falls back to the buffer's end when no
        // NUL turns up.
        Ok((buf, target.len() as u32 + 1))
    }
}

/// Resolve an encoded target for the calling user `uid`.
pub(crate) fn resolve(target: &[u8; MAXSYMLINKLEN], uid: u32) -> Result<String> {
    if target[0] != b'?' {
        let end = target.iter().position(|&b| b == 0).unwrap_or(target.len());
        return Ok(String::from_utf8_lossy(&target[..end]).into_owned());
    }

    if uid == ROOT_UID {
        let end = target[1..]
            .iter()
            .position(|&b| b == 0)
            .map(|p| p + 1)
            .unwrap_or(target.len());
        return Ok(String::from_utf8_lossy(&target[1..end]).into_owned());
    }

    let inner_nul = target[1..]
        .iter()
        .position(|&b| b == 0)
        .ok_or(Error::Io("conditional symlink missing inner terminator"))?;
    let colon_pos = 1 + inner_nul + 1;
    if colon_pos >= target.len() || target[colon_pos] != b':' {
        return Err(Error::Io("conditional symlink missing ':' separator"));
    }
    let start = colon_pos + 1;
    let end = target[start..]
        .iter()
        .position(|&b| b == 0)
        .map(|p| p + start)
        .unwrap_or(target.len());
    Ok(String::from_utf8_lossy(&target[start..end]).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_roundtrip() {
        let (buf, size) = encode("/usr/bin/env").unwrap();
        assert_eq!(size as usize, "/usr/bin/env".len() + 1);
        assert_eq!(resolve(&buf, 0).unwrap(), "/usr/bin/env");
        assert_eq!(resolve(&buf, 1000).unwrap(), "/usr/bin/env");
    }

    #[test]
    fn conditional_resolves_per_uid() {
        let (buf, _) = encode("root?/r:/o").unwrap();
        assert_eq!(resolve(&buf, 0).unwrap(), "/r");
        assert_eq!(resolve(&buf, 1000).unwrap(), "/o");
    }

    #[test]
    fn conditional_too_long_is_rejected() {
        let root = "r".repeat(20);
        let other = "o".repeat(20);
        let target = format!("x?{root}:{other}");
        assert_eq!(encode(&target), Err(Error::NameTooLong));
    }

    #[test]
    fn plain_too_long_is_rejected() {
        let target = "x".repeat(MAXSYMLINKLEN + 1);
        assert_eq!(encode(&target), Err(Error::NameTooLong));
    }

    #[test]
    fn question_mark_without_colon_is_plain() {
        let (buf, _) = encode("what?").unwrap();
        assert_eq!(resolve(&buf, 0).unwrap(), "what?");
    }
}
