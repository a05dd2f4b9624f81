//! Reclaim space taken by copy-up artifacts in the upper layer.

use std::path::PathBuf;

use crate::error::Result;
use crate::overlay::{walk, ChangeVerdict, EntryKind, Layer, RelativePath, Visit, WalkOptions};
use crate::plan::types::Operation;

/// Turns unchanged upper regular files into removals.
///
/// Only `Unchanged` visits whose upper side is a regular file are touched.
/// With `prune_empty_dirs`, every unchanged upper directory below the root is
/// also offered a best-effort `rmdir`, emitted after everything beneath it.
pub struct VacuumPlanner {
    upper_root: PathBuf,
    prune_empty_dirs: bool,
    operations: Vec<Operation>,
    pending_dirs: Vec<RelativePath>,
}

impl VacuumPlanner {
    pub fn new(upper_root: impl Into<PathBuf>, prune_empty_dirs: bool) -> Self {
        VacuumPlanner {
            upper_root: upper_root.into(),
            prune_empty_dirs,
            operations: Vec::new(),
            pending_dirs: Vec::new(),
        }
    }

    pub fn push(&mut self, visit: Visit) {
        self.flush_dirs_outside(&visit.path);

        if visit.verdict != ChangeVerdict::Unchanged {
            return;
        }
        match visit.upper.kind {
            EntryKind::RegularFile => self.operations.push(Operation::RemovePath {
                path: visit.path.under(&self.upper_root),
            }),
            EntryKind::Directory if self.prune_empty_dirs && !visit.path.is_root() => {
                self.pending_dirs.push(visit.path);
            }
            _ => {}
        }
    }

    pub fn finish(mut self) -> Vec<Operation> {
        while let Some(dir) = self.pending_dirs.pop() {
            self.prune(dir);
        }
        self.operations
    }

    /// Emit prunes for pending directories the walk has left.
    fn flush_dirs_outside(&mut self, path: &RelativePath) {
        while let Some(dir) = self.pending_dirs.last() {
            if path.is_descendant_of(dir) {
                break;
            }
            if let Some(dir) = self.pending_dirs.pop() {
                self.prune(dir);
            }
        }
    }

    fn prune(&mut self, dir: RelativePath) {
        self.operations.push(Operation::PruneEmptyDirectory {
            path: dir.under(&self.upper_root),
        });
    }
}

pub fn plan_vacuum<L: Layer + ?Sized>(
    lower: &L,
    upper: &L,
    options: WalkOptions,
    prune_empty_dirs: bool,
) -> Result<Vec<Operation>> {
    let mut planner = VacuumPlanner::new(upper.root(), prune_empty_dirs);
    for visit in walk(lower, upper, options) {
        planner.push(visit?);
    }
    let operations = planner.finish();
    tracing::info!("Vacuum planned {} operation(s)", operations.len());
    Ok(operations)
}
