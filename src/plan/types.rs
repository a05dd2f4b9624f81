use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// One deferred filesystem mutation. Planners only ever produce these; the
/// script emitter turns them into shell commands.
///
/// All paths are absolute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    /// Delete one non-directory entry.
    RemovePath { path: PathBuf },
    /// Delete a directory and everything below it.
    RemoveTree { path: PathBuf },
    /// Remove a directory if it is empty, ignoring failure.
    PruneEmptyDirectory { path: PathBuf },
    /// Copy a non-directory entry with its mode, ownership and timestamps.
    CopyEntry { from: PathBuf, to: PathBuf },
    /// Create a directory with the owner and mode of `reference`.
    MakeDirectory { path: PathBuf, reference: PathBuf },
    /// Apply owner and mode of `from` to `to`.
    CopyMetadata { from: PathBuf, to: PathBuf },
    /// Create `link` as another name for the already-copied `target`.
    HardLink { target: PathBuf, link: PathBuf },
    /// Delete everything inside a directory but keep the directory.
    ClearDirectory { path: PathBuf },
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::RemovePath { .. } => "remove",
            Operation::RemoveTree { .. } => "remove-tree",
            Operation::PruneEmptyDirectory { .. } => "prune",
            Operation::CopyEntry { .. } => "copy",
            Operation::MakeDirectory { .. } => "mkdir",
            Operation::CopyMetadata { .. } => "copy-metadata",
            Operation::HardLink { .. } => "link",
            Operation::ClearDirectory { .. } => "clear",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::RemovePath { path }
            | Operation::RemoveTree { path }
            | Operation::PruneEmptyDirectory { path }
            | Operation::ClearDirectory { path } => {
                write!(f, "{} {}", self.as_str(), path.display())
            }
            Operation::MakeDirectory { path, reference } => {
                write!(f, "{} {} (like {})", self.as_str(), path.display(), reference.display())
            }
            Operation::CopyEntry { from, to } | Operation::CopyMetadata { from, to } => {
                write!(f, "{} {} -> {}", self.as_str(), from.display(), to.display())
            }
            Operation::HardLink { target, link } => {
                write!(f, "{} {} -> {}", self.as_str(), link.display(), target.display())
            }
        }
    }
}

/// Per-kind tally of a plan, logged and shown before a script is written.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct PlanSummary {
    pub removals: usize,
    pub copies: usize,
    pub directories: usize,
    pub metadata_updates: usize,
    pub links: usize,
}

impl PlanSummary {
    pub fn of(operations: &[Operation]) -> Self {
        let mut summary = PlanSummary::default();
        for op in operations {
            match op {
                Operation::RemovePath { .. }
                | Operation::RemoveTree { .. }
                | Operation::PruneEmptyDirectory { .. }
                | Operation::ClearDirectory { .. } => summary.removals += 1,
                Operation::CopyEntry { .. } => summary.copies += 1,
                Operation::MakeDirectory { .. } => summary.directories += 1,
                Operation::CopyMetadata { .. } => summary.metadata_updates += 1,
                Operation::HardLink { .. } => summary.links += 1,
            }
        }
        summary
    }
}

impl fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} removal(s), {} copie(s), {} new director(ies), {} metadata update(s), {} hard link(s)",
            self.removals, self.copies, self.directories, self.metadata_updates, self.links
        )
    }
}
