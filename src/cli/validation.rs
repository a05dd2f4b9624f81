use crate::error::{OverlayError, Result};
use std::path::{Path, PathBuf};

/// Canonical lower and upper roots, checked to be two unrelated directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerPair {
    pub lower: PathBuf,
    pub upper: PathBuf,
}

fn resolve_dir(path: &Path, role: &str) -> Result<PathBuf> {
    let resolved = path.canonicalize().map_err(|e| {
        OverlayError::InvalidDirectory(format!(
            "{} directory {} cannot be opened: {}",
            role,
            path.display(),
            e
        ))
    })?;
    if !resolved.is_dir() {
        return Err(OverlayError::InvalidDirectory(format!(
            "{} directory {} is not a directory",
            role,
            path.display()
        )));
    }
    Ok(resolved)
}

pub fn validate_layers(lower: &Path, upper: &Path) -> Result<LayerPair> {
    let lower = resolve_dir(lower, "Lower")?;
    let upper = resolve_dir(upper, "Upper")?;

    if lower == upper {
        return Err(OverlayError::InvalidDirectory(format!(
            "lower and upper are the same directory ({})",
            lower.display()
        )));
    }
    if lower.starts_with(&upper) || upper.starts_with(&lower) {
        return Err(OverlayError::InvalidDirectory(format!(
            "{} and {} must not contain each other",
            lower.display(),
            upper.display()
        )));
    }

    Ok(LayerPair { lower, upper })
}
