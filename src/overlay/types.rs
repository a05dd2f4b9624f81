use serde::Serialize;
use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};

/// A path relative to both layer roots.
///
/// The empty path is the root itself and displays as `/`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct RelativePath(PathBuf);

impl RelativePath {
    pub fn root() -> Self {
        RelativePath(PathBuf::new())
    }

    pub fn new(path: impl Into<PathBuf>) -> Self {
        RelativePath(path.into())
    }

    pub fn join(&self, name: &OsStr) -> Self {
        RelativePath(self.0.join(name))
    }

    pub fn is_root(&self) -> bool {
        self.0.as_os_str().is_empty()
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Absolute location of this path below `root`.
    pub fn under(&self, root: &Path) -> PathBuf {
        if self.is_root() {
            root.to_path_buf()
        } else {
            root.join(&self.0)
        }
    }

    /// True if `self` lies strictly below `ancestor`.
    pub fn is_descendant_of(&self, ancestor: &RelativePath) -> bool {
        self != ancestor && self.0.starts_with(&ancestor.0)
    }
}

impl fmt::Display for RelativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            write!(f, "/")
        } else {
            write!(f, "{}", self.0.display())
        }
    }
}

impl Serialize for RelativePath {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Absent,
    RegularFile,
    Directory,
    Symlink,
    OtherSpecial,
    Whiteout,
}

impl EntryKind {
    pub fn exists(self) -> bool {
        self != EntryKind::Absent
    }
}

/// Device and inode number; identifies hardlinked entries within one layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileId {
    pub dev: u64,
    pub ino: u64,
}

/// One filesystem entry at a given root, captured once per visit.
///
/// The content fingerprint is not part of the snapshot: it is only computed
/// on demand through [`crate::overlay::layer::Layer::fingerprint`], after
/// the cheap fields here failed to prove a difference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntrySnapshot {
    pub kind: EntryKind,
    pub mode_bits: u32,
    pub owner_uid: u32,
    pub owner_gid: u32,
    pub size_bytes: u64,
    pub link_target: Option<PathBuf>,
    pub is_opaque: bool,
    pub is_metacopy: bool,
    pub file_id: Option<FileId>,
    pub nlink: u64,
}

impl EntrySnapshot {
    pub fn absent() -> Self {
        EntrySnapshot {
            kind: EntryKind::Absent,
            mode_bits: 0,
            owner_uid: 0,
            owner_gid: 0,
            size_bytes: 0,
            link_target: None,
            is_opaque: false,
            is_metacopy: false,
            file_id: None,
            nlink: 0,
        }
    }

    pub fn exists(&self) -> bool {
        self.kind.exists()
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    /// Mode and ownership, the metadata compared for every kind.
    pub fn same_permissions(&self, other: &EntrySnapshot) -> bool {
        self.mode_bits == other.mode_bits
            && self.owner_uid == other.owner_uid
            && self.owner_gid == other.owner_gid
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeVerdict {
    Unchanged,
    Added,
    Deleted,
    Modified,
    OpaqueReplaced,
}

impl ChangeVerdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeVerdict::Unchanged => "unchanged",
            ChangeVerdict::Added => "added",
            ChangeVerdict::Deleted => "deleted",
            ChangeVerdict::Modified => "modified",
            ChangeVerdict::OpaqueReplaced => "opaque_replaced",
        }
    }
}

/// Full-content digest of a regular file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(pub [u8; 32]);

/// What the walker yields for every visited path.
#[derive(Debug, Clone)]
pub struct Visit {
    pub path: RelativePath,
    pub verdict: ChangeVerdict,
    pub lower: EntrySnapshot,
    pub upper: EntrySnapshot,
}
