//! Whiteout handling for kernel OverlayFS.
//!
//! OverlayFS records the deletion of a lower entry by placing a "whiteout"
//! in the upper layer under the same name: a character device node whose
//! device number is 0/0. This module keeps the detection and creation of
//! those markers in one place.

use std::ffi::OsStr;
use std::fs::Metadata;
use std::io;
use std::os::unix::fs::{FileTypeExt, MetadataExt};
use std::path::Path;

use nix::sys::stat::{makedev, mknod, Mode, SFlag};

/// Device number of a whiteout node, as in `linux/fs.h`.
pub const WHITEOUT_DEV: u64 = 0;

pub struct Whiteout;

impl Whiteout {
    /// Check whether already-fetched `lstat` metadata describes a whiteout.
    pub fn is_whiteout_metadata(metadata: &Metadata) -> bool {
        metadata.file_type().is_char_device() && metadata.rdev() == WHITEOUT_DEV
    }

    /// Check whether the entry at `path` is a whiteout; a missing path is not.
    #[cfg(test)]
    fn is_whiteout(path: &Path) -> io::Result<bool> {
        match std::fs::symlink_metadata(path) {
            Ok(metadata) => Ok(Self::is_whiteout_metadata(&metadata)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Create a whiteout for `name` inside `parent_dir`.
    ///
    /// Creating device nodes needs `CAP_MKNOD`, so this normally fails with
    /// `EPERM` for unprivileged users.
    pub fn create(parent_dir: &Path, name: &OsStr) -> io::Result<()> {
        let path = parent_dir.join(name);
        mknod(
            &path,
            SFlag::S_IFCHR,
            Mode::from_bits_truncate(0o000),
            makedev(0, 0),
        )
        .map_err(io::Error::from)
    }
}
