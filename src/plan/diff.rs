//! Human-readable listing of what the upper layer changes.

use serde::Serialize;
use std::fmt;

use crate::error::Result;
use crate::overlay::{walk, ChangeVerdict, EntryKind, Layer, RelativePath, Visit, WalkOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffChange {
    Added,
    Deleted,
    Modified,
}

impl DiffChange {
    pub fn as_prefix(&self) -> &'static str {
        match self {
            DiffChange::Added => "+",
            DiffChange::Deleted => "-",
            DiffChange::Modified => "*",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffLine {
    pub change: DiffChange,
    pub path: RelativePath,
    pub directory: bool,
}

impl DiffLine {
    fn new(change: DiffChange, path: RelativePath, kind: EntryKind) -> Self {
        DiffLine {
            change,
            path,
            directory: kind == EntryKind::Directory,
        }
    }
}

impl fmt::Display for DiffLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slash = if self.directory && !self.path.is_root() { "/" } else { "" };
        write!(f, "{} {}{}", self.change.as_prefix(), self.path, slash)
    }
}

/// Lists added, deleted and modified paths in walk order.
///
/// Without `verbose`, a directory that exists on one side only is reported
/// as a single line; with it, every entry below it is listed as well.
pub struct DiffPlanner<'a, L: Layer + ?Sized> {
    lower: &'a L,
    verbose: bool,
    lines: Vec<DiffLine>,
    /// Root of the one-sided upper subtree currently being elided.
    eliding: Option<RelativePath>,
}

impl<'a, L: Layer + ?Sized> DiffPlanner<'a, L> {
    pub fn new(lower: &'a L, verbose: bool) -> Self {
        DiffPlanner {
            lower,
            verbose,
            lines: Vec::new(),
            eliding: None,
        }
    }

    pub fn push(&mut self, visit: Visit) -> Result<()> {
        if let Some(root) = &self.eliding {
            if visit.path.is_descendant_of(root) {
                return Ok(());
            }
            self.eliding = None;
        }

        match visit.verdict {
            ChangeVerdict::Unchanged => {}
            ChangeVerdict::Added => {
                if visit.upper.is_dir() {
                    self.elide_below(&visit.path);
                }
                self.lines
                    .push(DiffLine::new(DiffChange::Added, visit.path, visit.upper.kind));
            }
            ChangeVerdict::Deleted => {
                self.push_deleted(visit.path, visit.lower.kind)?;
            }
            ChangeVerdict::Modified if visit.lower.kind != visit.upper.kind => {
                // A type change reads as the old entry going away and a new one appearing
                self.push_deleted(visit.path.clone(), visit.lower.kind)?;
                if visit.upper.is_dir() {
                    self.elide_below(&visit.path);
                }
                self.lines
                    .push(DiffLine::new(DiffChange::Added, visit.path, visit.upper.kind));
            }
            ChangeVerdict::OpaqueReplaced => {
                // Everything lower had here is gone; the upper children follow as additions
                self.push_deleted(visit.path.clone(), visit.lower.kind)?;
                self.lines
                    .push(DiffLine::new(DiffChange::Added, visit.path, visit.upper.kind));
            }
            ChangeVerdict::Modified => {
                self.lines
                    .push(DiffLine::new(DiffChange::Modified, visit.path, visit.upper.kind));
            }
        }
        Ok(())
    }

    pub fn finish(self) -> Vec<DiffLine> {
        self.lines
    }

    fn elide_below(&mut self, path: &RelativePath) {
        if !self.verbose {
            self.eliding = Some(path.clone());
        }
    }

    fn push_deleted(&mut self, path: RelativePath, kind: EntryKind) -> Result<()> {
        let expand = self.verbose && kind == EntryKind::Directory;
        let below = if expand {
            self.lower.descendants(&path)?
        } else {
            Vec::new()
        };
        self.lines.push(DiffLine::new(DiffChange::Deleted, path, kind));
        for (child, child_kind) in below {
            self.lines
                .push(DiffLine::new(DiffChange::Deleted, child, child_kind));
        }
        Ok(())
    }
}

/// Walk both layers and collect the diff listing.
pub fn plan_diff<L: Layer + ?Sized>(
    lower: &L,
    upper: &L,
    options: WalkOptions,
    verbose: bool,
) -> Result<Vec<DiffLine>> {
    let mut planner = DiffPlanner::new(lower, verbose);
    for visit in walk(lower, upper, options) {
        planner.push(visit?)?;
    }
    let lines = planner.finish();
    tracing::info!("Diff found {} changed path(s)", lines.len());
    Ok(lines)
}
