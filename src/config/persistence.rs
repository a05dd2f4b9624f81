use crate::error::{OverlayError, Result};
use std::path::Path;

use crate::config::paths::*;
use crate::config::schema::*;

/// Load the config file, falling back to defaults when it does not exist.
pub fn load_config() -> Result<Config> {
    let config_path = get_config_path()?;
    let config = load_config_from(&config_path)?;
    validate_config(&config)?;
    Ok(config)
}

pub fn load_config_from(config_path: &Path) -> Result<Config> {
    if !config_path.exists() {
        tracing::debug!("No config at {}, using defaults", config_path.display());
        return Ok(Config::default());
    }

    let toml_content = std::fs::read_to_string(config_path)
        .map_err(|e| OverlayError::Config(format!("Failed to read config file: {}", e)))?;

    toml::from_str(&toml_content)
        .map_err(|e| OverlayError::Config(format!("Failed to parse config: {}", e)))
}

pub fn save_config(config: &Config, config_path: &Path) -> Result<()> {
    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            OverlayError::Config(format!("Failed to create config directory: {}", e))
        })?;
    }
    let toml_str = toml::to_string_pretty(config)
        .map_err(|e| OverlayError::Config(format!("Failed to serialize config: {}", e)))?;
    std::fs::write(config_path, toml_str)
        .map_err(|e| OverlayError::Config(format!("Failed to write config file: {}", e)))?;
    Ok(())
}
