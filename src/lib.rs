pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod overlay;
pub mod plan;
pub mod preflight;
pub mod script;

pub use config::load_config;
pub use config::Config;

pub use error::{OverlayError, Result};

pub use overlay::{walk, ChangeVerdict, DiskLayer, Layer, RelativePath, Visit, WalkOptions};
pub use plan::{plan_diff, plan_merge, plan_vacuum, Operation};
