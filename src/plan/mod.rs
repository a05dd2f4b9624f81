//! Planners that consume the walk: diff renders it, vacuum and merge turn it
//! into an ordered list of deferred operations.

pub mod diff;
pub mod merge;
pub mod types;
pub mod vacuum;

pub use diff::{plan_diff, DiffChange, DiffLine, DiffPlanner};
pub use merge::{plan_merge, MergePlanner};
pub use types::{Operation, PlanSummary};
pub use vacuum::{plan_vacuum, VacuumPlanner};
