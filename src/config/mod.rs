pub mod paths;
pub mod persistence;
pub mod schema;

pub use paths::*;
pub use persistence::*;
pub use schema::*;

fn default_script_dir() -> String {
    ".".to_string()
}

fn default_script_prefix() -> String {
    "overlay-tools-".to_string()
}

fn default_parallel_hash_threshold() -> u64 {
    crate::overlay::walker::DEFAULT_PARALLEL_HASH_THRESHOLD
}
