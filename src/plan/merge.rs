//! Flatten the overlay: fold every upper change into lower, then empty upper.

use fxhash::FxHashMap;
use std::path::PathBuf;

use crate::error::{OverlayError, Result};
use crate::overlay::{walk, ChangeVerdict, EntryKind, EntrySnapshot, FileId, Layer, Visit, WalkOptions};
use crate::plan::types::Operation;

/// Translates verdicts into the operations that make lower equal to the
/// merged view.
///
/// The walk is pre-order, so a directory is always created before anything
/// inside it and the resulting list can be executed top to bottom.
pub struct MergePlanner {
    lower_root: PathBuf,
    upper_root: PathBuf,
    operations: Vec<Operation>,
    /// Upper inode -> lower path it was first copied to.
    copied: FxHashMap<FileId, PathBuf>,
}

impl MergePlanner {
    pub fn new(lower_root: impl Into<PathBuf>, upper_root: impl Into<PathBuf>) -> Self {
        MergePlanner {
            lower_root: lower_root.into(),
            upper_root: upper_root.into(),
            operations: Vec::new(),
            copied: FxHashMap::default(),
        }
    }

    pub fn push(&mut self, visit: Visit) -> Result<()> {
        let lower_path = visit.path.under(&self.lower_root);
        let upper_path = visit.path.under(&self.upper_root);

        match visit.verdict {
            ChangeVerdict::Unchanged => {}
            ChangeVerdict::Added => self.bring_in(&visit.upper, upper_path, lower_path)?,
            ChangeVerdict::Modified => {
                let metadata_only = (visit.lower.is_dir() && visit.upper.is_dir())
                    || (visit.upper.is_metacopy && visit.lower.kind == EntryKind::RegularFile);
                if metadata_only {
                    self.operations.push(Operation::CopyMetadata {
                        from: upper_path,
                        to: lower_path,
                    });
                } else {
                    self.remove_lower(&visit.lower, lower_path.clone());
                    self.bring_in(&visit.upper, upper_path, lower_path)?;
                }
            }
            ChangeVerdict::Deleted => self.remove_lower(&visit.lower, lower_path),
            ChangeVerdict::OpaqueReplaced => {
                self.operations.push(Operation::ClearDirectory {
                    path: lower_path.clone(),
                });
                self.operations.push(Operation::CopyMetadata {
                    from: upper_path,
                    to: lower_path,
                });
            }
        }
        Ok(())
    }

    pub fn finish(mut self) -> Vec<Operation> {
        self.operations.push(Operation::ClearDirectory {
            path: self.upper_root.clone(),
        });
        self.operations
    }

    fn remove_lower(&mut self, lower: &EntrySnapshot, path: PathBuf) {
        let op = if lower.is_dir() {
            Operation::RemoveTree { path }
        } else {
            Operation::RemovePath { path }
        };
        self.operations.push(op);
    }

    fn bring_in(&mut self, upper: &EntrySnapshot, from: PathBuf, to: PathBuf) -> Result<()> {
        if upper.is_dir() {
            self.operations.push(Operation::MakeDirectory {
                path: to,
                reference: from,
            });
            return Ok(());
        }

        // The data of a metacopy file lives in a lower file that is not there
        if upper.is_metacopy {
            return Err(OverlayError::UnsupportedFeature {
                path: from,
                feature: "metacopy file without lower data".to_string(),
            });
        }

        let linked = upper.nlink > 1 && upper.kind == EntryKind::RegularFile;
        if let Some(id) = upper.file_id.filter(|_| linked) {
            if let Some(target) = self.copied.get(&id) {
                self.operations.push(Operation::HardLink {
                    target: target.clone(),
                    link: to,
                });
                return Ok(());
            }
            self.copied.insert(id, to.clone());
        }

        self.operations.push(Operation::CopyEntry { from, to });
        Ok(())
    }
}

pub fn plan_merge<L: Layer + ?Sized>(lower: &L, upper: &L, options: WalkOptions) -> Result<Vec<Operation>> {
    let mut planner = MergePlanner::new(lower.root(), upper.root());
    for visit in walk(lower, upper, options) {
        planner.push(visit?)?;
    }
    let operations = planner.finish();
    tracing::info!("Merge planned {} operation(s)", operations.len());
    Ok(operations)
}
