//! In-memory layer for exercising the walker and planners without touching
//! a real filesystem. Whiteouts and opaque directories, which need root to
//! create on disk, are plain builder calls here.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{OverlayError, Result};
use crate::overlay::fingerprint::fingerprint_bytes;
use crate::overlay::layer::Layer;
use crate::overlay::types::{EntryKind, EntrySnapshot, FileId, Fingerprint, RelativePath};

#[derive(Debug, Clone)]
struct MemoryEntry {
    snapshot: EntrySnapshot,
    content: Vec<u8>,
}

#[derive(Debug)]
pub struct MemoryLayer {
    root: PathBuf,
    entries: BTreeMap<RelativePath, MemoryEntry>,
    next_ino: u64,
    fingerprint_calls: AtomicUsize,
    failing: Option<RelativePath>,
}

impl MemoryLayer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let mut layer = MemoryLayer {
            root: root.into(),
            entries: BTreeMap::new(),
            next_ino: 1,
            fingerprint_calls: AtomicUsize::new(0),
            failing: None,
        };
        layer.insert("", EntryKind::Directory, 0o755, Vec::new());
        layer
    }

    pub fn dir(mut self, path: &str) -> Self {
        self.insert(path, EntryKind::Directory, 0o755, Vec::new());
        self
    }

    pub fn opaque_dir(mut self, path: &str) -> Self {
        self.insert(path, EntryKind::Directory, 0o755, Vec::new())
            .snapshot
            .is_opaque = true;
        self
    }

    pub fn file(mut self, path: &str, content: &str) -> Self {
        self.insert(path, EntryKind::RegularFile, 0o644, content.as_bytes().to_vec());
        self
    }

    pub fn file_with_mode(mut self, path: &str, content: &str, mode: u32) -> Self {
        self.insert(path, EntryKind::RegularFile, mode, content.as_bytes().to_vec());
        self
    }

    /// A metadata-only copy-up: reports the given size but holds no data.
    pub fn metacopy_file(mut self, path: &str, size: u64, mode: u32) -> Self {
        let entry = self.insert(path, EntryKind::RegularFile, mode, Vec::new());
        entry.snapshot.is_metacopy = true;
        entry.snapshot.size_bytes = size;
        self
    }

    pub fn symlink(mut self, path: &str, target: &str) -> Self {
        self.insert(path, EntryKind::Symlink, 0o777, Vec::new())
            .snapshot
            .link_target = Some(PathBuf::from(target));
        self
    }

    pub fn whiteout(mut self, path: &str) -> Self {
        self.insert(path, EntryKind::Whiteout, 0, Vec::new());
        self
    }

    pub fn special(mut self, path: &str) -> Self {
        self.insert(path, EntryKind::OtherSpecial, 0o644, Vec::new());
        self
    }

    /// Add `link` as a second name for the existing entry `existing`.
    pub fn hardlink(mut self, existing: &str, link: &str) -> Self {
        let existing = RelativePath::new(existing);
        let Some(mut entry) = self.entries.get(&existing).cloned() else {
            return self;
        };
        entry.snapshot.nlink += 1;
        let nlink = entry.snapshot.nlink;
        let file_id = entry.snapshot.file_id;
        for other in self.entries.values_mut() {
            if other.snapshot.file_id == file_id {
                other.snapshot.nlink = nlink;
            }
        }
        self.entries.insert(RelativePath::new(link), entry);
        self
    }

    pub fn owner(mut self, path: &str, uid: u32, gid: u32) -> Self {
        if let Some(entry) = self.entries.get_mut(&RelativePath::new(path)) {
            entry.snapshot.owner_uid = uid;
            entry.snapshot.owner_gid = gid;
        }
        self
    }

    pub fn mode(mut self, path: &str, mode: u32) -> Self {
        if let Some(entry) = self.entries.get_mut(&RelativePath::new(path)) {
            entry.snapshot.mode_bits = mode;
        }
        self
    }

    /// Make every inspection of `path` fail with an I/O error.
    pub fn failing_at(mut self, path: &str) -> Self {
        self.failing = Some(RelativePath::new(path));
        self
    }

    pub fn fingerprint_calls(&self) -> usize {
        self.fingerprint_calls.load(Ordering::SeqCst)
    }

    fn insert(&mut self, path: &str, kind: EntryKind, mode: u32, content: Vec<u8>) -> &mut MemoryEntry {
        let ino = self.next_ino;
        self.next_ino += 1;
        let snapshot = EntrySnapshot {
            kind,
            mode_bits: mode,
            owner_uid: 1000,
            owner_gid: 1000,
            size_bytes: content.len() as u64,
            link_target: None,
            is_opaque: false,
            is_metacopy: false,
            file_id: Some(FileId { dev: 1, ino }),
            nlink: 1,
        };
        let key = RelativePath::new(path);
        self.entries.insert(key.clone(), MemoryEntry { snapshot, content });
        self.entries
            .get_mut(&key)
            .unwrap_or_else(|| unreachable!("entry was just inserted"))
    }

    fn parent_is_dir(&self, path: &RelativePath) -> bool {
        match path.as_path().parent() {
            None => true,
            Some(parent) => self
                .entries
                .get(&RelativePath::new(parent))
                .is_some_and(|entry| entry.snapshot.is_dir()),
        }
    }
}

impl Layer for MemoryLayer {
    fn root(&self) -> &Path {
        &self.root
    }

    fn inspect(&self, path: &RelativePath) -> Result<EntrySnapshot> {
        if self.failing.as_ref() == Some(path) {
            return Err(OverlayError::io(
                path.under(&self.root),
                std::io::Error::from_raw_os_error(libc::EACCES),
            ));
        }
        if !self.parent_is_dir(path) {
            return Ok(EntrySnapshot::absent());
        }
        Ok(self
            .entries
            .get(path)
            .map(|entry| entry.snapshot.clone())
            .unwrap_or_else(EntrySnapshot::absent))
    }

    fn read_dir(&self, path: &RelativePath) -> Result<Vec<OsString>> {
        // Iterate in reverse so callers cannot rely on sorted input
        Ok(self
            .entries
            .keys()
            .rev()
            .filter(|child| child.as_path().parent() == Some(path.as_path()) && !child.is_root())
            .filter_map(|child| child.as_path().file_name().map(|n| n.to_os_string()))
            .collect())
    }

    fn fingerprint(&self, path: &RelativePath) -> Result<Fingerprint> {
        self.fingerprint_calls.fetch_add(1, Ordering::SeqCst);
        self.entries
            .get(path)
            .map(|entry| fingerprint_bytes(&entry.content))
            .ok_or_else(|| {
                OverlayError::io(
                    path.under(&self.root),
                    std::io::Error::from(std::io::ErrorKind::NotFound),
                )
            })
    }

    fn descendants(&self, path: &RelativePath) -> Result<Vec<(RelativePath, EntryKind)>> {
        Ok(self
            .entries
            .iter()
            .filter(|(candidate, _)| candidate.is_descendant_of(path))
            .map(|(candidate, entry)| (candidate.clone(), entry.snapshot.kind))
            .collect())
    }
}
