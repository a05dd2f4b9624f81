//! Lazy pre-order traversal of the lower/upper union.
//!
//! The walker keeps an explicit stack of directory frames instead of
//! recursing, so arbitrarily deep trees cannot exhaust the call stack and
//! callers can stop pulling at any point. Children are visited in byte-wise
//! name order so repeated runs over the same trees yield identical sequences.

use std::collections::{BTreeSet, VecDeque};
use std::ffi::OsString;
use std::thread;

use fxhash::FxHashMap;

use crate::error::Result;
use crate::overlay::classify::classify;
use crate::overlay::layer::Layer;
use crate::overlay::types::{
    ChangeVerdict, EntryKind, EntrySnapshot, FileId, Fingerprint, RelativePath, Visit,
};

/// Files at least this large are fingerprinted on both sides concurrently.
pub const DEFAULT_PARALLEL_HASH_THRESHOLD: u64 = 64 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkOptions {
    /// Also descend into lower directories the upper never touched.
    pub include_untouched_lower: bool,
    pub parallel_hash_threshold: u64,
}

impl Default for WalkOptions {
    fn default() -> Self {
        WalkOptions {
            include_untouched_lower: false,
            parallel_hash_threshold: DEFAULT_PARALLEL_HASH_THRESHOLD,
        }
    }
}

/// Whether lower entries below a directory are still visible in the merged view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LowerScope {
    Live,
    /// Below an opaque, deleted or retyped directory: lower is hidden.
    Suppressed,
}

#[derive(Debug)]
struct Frame {
    dir: RelativePath,
    names: VecDeque<OsString>,
    scope: LowerScope,
}

pub struct Walker<'a, L: Layer + ?Sized> {
    lower: &'a L,
    upper: &'a L,
    options: WalkOptions,
    stack: Vec<Frame>,
    started: bool,
    failed: bool,
    lower_fingerprints: FxHashMap<FileId, Fingerprint>,
    upper_fingerprints: FxHashMap<FileId, Fingerprint>,
}

/// Walk the union of `lower` and `upper`, starting with the root.
pub fn walk<'a, L: Layer + ?Sized>(lower: &'a L, upper: &'a L, options: WalkOptions) -> Walker<'a, L> {
    Walker::new(lower, upper, options)
}

impl<'a, L: Layer + ?Sized> Walker<'a, L> {
    pub fn new(lower: &'a L, upper: &'a L, options: WalkOptions) -> Self {
        Walker {
            lower,
            upper,
            options,
            stack: Vec::new(),
            started: false,
            failed: false,
            lower_fingerprints: FxHashMap::default(),
            upper_fingerprints: FxHashMap::default(),
        }
    }

    fn next_visit(&mut self) -> Option<Result<Visit>> {
        if !self.started {
            self.started = true;
            return Some(self.visit(RelativePath::root(), LowerScope::Live));
        }

        loop {
            let frame = self.stack.last_mut()?;
            let Some(name) = frame.names.pop_front() else {
                self.stack.pop();
                continue;
            };
            let path = frame.dir.join(&name);
            let scope = frame.scope;
            return Some(self.visit(path, scope));
        }
    }

    fn visit(&mut self, path: RelativePath, scope: LowerScope) -> Result<Visit> {
        let upper = self.upper.inspect(&path)?;
        let lower = match scope {
            LowerScope::Live => self.lower.inspect(&path)?,
            LowerScope::Suppressed => EntrySnapshot::absent(),
        };

        let verdict = classify(&lower, &upper, || self.contents_match(&path, &lower, &upper))?;
        tracing::debug!("{}: {}", path, verdict.as_str());

        self.push_children(&path, scope, &lower, &upper, verdict)?;

        Ok(Visit {
            path,
            verdict,
            lower,
            upper,
        })
    }

    fn push_children(
        &mut self,
        path: &RelativePath,
        scope: LowerScope,
        lower: &EntrySnapshot,
        upper: &EntrySnapshot,
        verdict: ChangeVerdict,
    ) -> Result<()> {
        let upper_passes_through = match upper.kind {
            EntryKind::Absent => true,
            EntryKind::Directory => verdict != ChangeVerdict::OpaqueReplaced,
            _ => false,
        };
        let child_scope = if scope == LowerScope::Live && lower.is_dir() && upper_passes_through {
            LowerScope::Live
        } else {
            LowerScope::Suppressed
        };

        let mut names = BTreeSet::new();
        if upper.is_dir() {
            names.extend(self.upper.read_dir(path)?);
        }
        let descend_lower = child_scope == LowerScope::Live
            && (upper.is_dir() || self.options.include_untouched_lower);
        if descend_lower {
            names.extend(self.lower.read_dir(path)?);
        }

        if !names.is_empty() {
            self.stack.push(Frame {
                dir: path.clone(),
                names: names.into_iter().collect(),
                scope: child_scope,
            });
        }
        Ok(())
    }

    fn contents_match(
        &mut self,
        path: &RelativePath,
        lower: &EntrySnapshot,
        upper: &EntrySnapshot,
    ) -> Result<bool> {
        let cached_lower = lower.file_id.and_then(|id| self.lower_fingerprints.get(&id).copied());
        let cached_upper = upper.file_id.and_then(|id| self.upper_fingerprints.get(&id).copied());

        let (lower_print, upper_print) = match (cached_lower, cached_upper) {
            (Some(l), Some(u)) => (l, u),
            (Some(l), None) => (l, self.upper.fingerprint(path)?),
            (None, Some(u)) => (self.lower.fingerprint(path)?, u),
            (None, None) if upper.size_bytes >= self.options.parallel_hash_threshold => {
                let (lower_layer, upper_layer) = (self.lower, self.upper);
                let (l, u) = thread::scope(|s| {
                    let lower_job = s.spawn(|| lower_layer.fingerprint(path));
                    let u = upper_layer.fingerprint(path);
                    let l = lower_job.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic));
                    (l, u)
                });
                (l?, u?)
            }
            (None, None) => (self.lower.fingerprint(path)?, self.upper.fingerprint(path)?),
        };

        if let Some(id) = lower.file_id {
            self.lower_fingerprints.insert(id, lower_print);
        }
        if let Some(id) = upper.file_id {
            self.upper_fingerprints.insert(id, upper_print);
        }

        Ok(lower_print == upper_print)
    }
}

impl<L: Layer + ?Sized> Iterator for Walker<'_, L> {
    type Item = Result<Visit>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let item = self.next_visit()?;
        if item.is_err() {
            self.failed = true;
            self.stack.clear();
        }
        Some(item)
    }
}
