use std::path::{Path, PathBuf};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, OverlayError>;

#[derive(Error, Debug)]
pub enum OverlayError {
    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported OverlayFS feature at {}: {feature}", path.display())]
    UnsupportedFeature { path: PathBuf, feature: String },

    #[error("Invalid directory: {0}")]
    InvalidDirectory(String),

    #[error("OverlayFS is still mounted: {0}")]
    Mounted(String),

    #[error("Aborted: {0}")]
    Aborted(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(String),
}

impl OverlayError {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        OverlayError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<serde_json::Error> for OverlayError {
    fn from(err: serde_json::Error) -> Self {
        OverlayError::Json(err.to_string())
    }
}
