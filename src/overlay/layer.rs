use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{OverlayError, Result};
use crate::overlay::fingerprint::fingerprint_file;
use crate::overlay::inspect::{inspect_path, kind_of};
use crate::overlay::types::{EntryKind, EntrySnapshot, Fingerprint, RelativePath};
use crate::overlay::xattrs::OverlayXattrs;

/// Read-only view of one tree root (the lowerdir or the upperdir).
///
/// The walker only talks to the trees through this trait, so it can run
/// against an in-memory tree in tests.
pub trait Layer: Sync {
    fn root(&self) -> &Path;

    /// Snapshot the entry at `path`; a missing entry is `Absent`, not an error.
    fn inspect(&self, path: &RelativePath) -> Result<EntrySnapshot>;

    /// Names of the children of the directory at `path`, in any order.
    fn read_dir(&self, path: &RelativePath) -> Result<Vec<OsString>>;

    /// Full-content fingerprint of the regular file at `path`.
    fn fingerprint(&self, path: &RelativePath) -> Result<Fingerprint>;

    /// Every entry below `path`, pre-order, sorted by name within each directory.
    fn descendants(&self, path: &RelativePath) -> Result<Vec<(RelativePath, EntryKind)>>;
}

/// A layer backed by a real directory.
#[derive(Debug, Clone)]
pub struct DiskLayer {
    root: PathBuf,
    xattrs: OverlayXattrs,
}

impl DiskLayer {
    pub fn new(root: impl Into<PathBuf>, xattrs: OverlayXattrs) -> Self {
        DiskLayer {
            root: root.into(),
            xattrs,
        }
    }
}

impl Layer for DiskLayer {
    fn root(&self) -> &Path {
        &self.root
    }

    fn inspect(&self, path: &RelativePath) -> Result<EntrySnapshot> {
        inspect_path(&path.under(&self.root), &self.xattrs)
    }

    fn read_dir(&self, path: &RelativePath) -> Result<Vec<OsString>> {
        let dir = path.under(&self.root);
        let entries = fs::read_dir(&dir).map_err(|e| OverlayError::io(&dir, e))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| OverlayError::io(&dir, e))?;
            names.push(entry.file_name());
        }
        Ok(names)
    }

    fn fingerprint(&self, path: &RelativePath) -> Result<Fingerprint> {
        fingerprint_file(&path.under(&self.root))
    }

    fn descendants(&self, path: &RelativePath) -> Result<Vec<(RelativePath, EntryKind)>> {
        let base = path.under(&self.root);
        let mut found = Vec::new();

        for entry in WalkDir::new(&base)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| {
                let failed_path = e.path().map(Path::to_path_buf).unwrap_or_else(|| base.clone());
                OverlayError::io(failed_path, e.into())
            })?;
            let metadata = entry
                .metadata()
                .map_err(|e| OverlayError::io(entry.path(), e.into()))?;
            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            found.push((RelativePath::new(relative), kind_of(&metadata)));
        }

        Ok(found)
    }
}
