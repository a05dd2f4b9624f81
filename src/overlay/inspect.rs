//! Entry inspection: turn one on-disk entry into an [`EntrySnapshot`].

use std::fs::{self, Metadata};
use std::io;
use std::os::unix::fs::MetadataExt;
use std::path::Path;

use crate::error::{OverlayError, Result};
use crate::overlay::types::{EntryKind, EntrySnapshot, FileId};
use crate::overlay::whiteout::Whiteout;
use crate::overlay::xattrs::{OverlayXattrs, REDIRECT_KEY};

/// Permission bits compared between layers (rwx for all classes plus
/// setuid, setgid and sticky).
pub const PERMISSION_MASK: u32 = 0o7777;

pub fn kind_of(metadata: &Metadata) -> EntryKind {
    let file_type = metadata.file_type();
    if file_type.is_dir() {
        EntryKind::Directory
    } else if file_type.is_file() {
        EntryKind::RegularFile
    } else if file_type.is_symlink() {
        EntryKind::Symlink
    } else if Whiteout::is_whiteout_metadata(metadata) {
        EntryKind::Whiteout
    } else {
        // devices, fifos and sockets
        EntryKind::OtherSpecial
    }
}

/// Inspect the entry at `path` without following symlinks.
///
/// A missing entry, or one whose ancestor is not a directory, is reported as
/// [`EntryKind::Absent`]. Overlay attributes are only read where they can
/// matter: opacity and redirects on directories, metacopy on regular files.
pub fn inspect_path(path: &Path, xattrs: &OverlayXattrs) -> Result<EntrySnapshot> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(e) if is_missing(&e) => return Ok(EntrySnapshot::absent()),
        Err(e) => return Err(OverlayError::io(path, e)),
    };

    let kind = kind_of(&metadata);
    let mut snapshot = EntrySnapshot {
        kind,
        mode_bits: metadata.mode() & PERMISSION_MASK,
        owner_uid: metadata.uid(),
        owner_gid: metadata.gid(),
        size_bytes: metadata.size(),
        link_target: None,
        is_opaque: false,
        is_metacopy: false,
        file_id: Some(FileId {
            dev: metadata.dev(),
            ino: metadata.ino(),
        }),
        nlink: metadata.nlink(),
    };

    match kind {
        EntryKind::Directory => {
            if xattrs
                .redirect(path)
                .map_err(|e| OverlayError::io(path, e))?
                .is_some()
            {
                return Err(OverlayError::UnsupportedFeature {
                    path: path.to_path_buf(),
                    feature: format!(
                        "renamed directory ({} attribute, redirect_dir)",
                        xattrs.namespace().attribute(REDIRECT_KEY)
                    ),
                });
            }
            snapshot.is_opaque = xattrs
                .is_opaque(path)
                .map_err(|e| OverlayError::io(path, e))?;
        }
        EntryKind::RegularFile => {
            snapshot.is_metacopy = xattrs
                .is_metacopy(path)
                .map_err(|e| OverlayError::io(path, e))?;
        }
        EntryKind::Symlink => {
            let target = fs::read_link(path).map_err(|e| OverlayError::io(path, e))?;
            snapshot.link_target = Some(target);
        }
        _ => {}
    }

    tracing::trace!("Inspected {}: {:?}", path.display(), snapshot.kind);
    Ok(snapshot)
}

fn is_missing(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::NotFound || e.raw_os_error() == Some(libc::ENOTDIR)
}
