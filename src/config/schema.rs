use crate::error::{OverlayError, Result};
use crate::overlay::{WalkOptions, XattrNamespace};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ScriptConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
}

impl ScriptConfig {
    pub fn get_dir(&self) -> String {
        self.dir.clone().unwrap_or_else(super::default_script_dir)
    }

    pub fn get_prefix(&self) -> String {
        self.prefix
            .clone()
            .unwrap_or_else(super::default_script_prefix)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WalkConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_untouched_lower: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallel_hash_threshold: Option<u64>,
}

impl WalkConfig {
    pub fn get_include_untouched_lower(&self) -> bool {
        self.include_untouched_lower.unwrap_or(false)
    }

    pub fn get_parallel_hash_threshold(&self) -> u64 {
        self.parallel_hash_threshold
            .unwrap_or_else(super::default_parallel_hash_threshold)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VacuumConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prune_empty_dirs: Option<bool>,
}

impl VacuumConfig {
    pub fn get_prune_empty_dirs(&self) -> bool {
        self.prune_empty_dirs.unwrap_or(true)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SafetyConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_mounted: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_xattr: Option<bool>,
}

impl SafetyConfig {
    pub fn get_check_mounted(&self) -> bool {
        self.check_mounted.unwrap_or(true)
    }

    pub fn get_check_xattr(&self) -> bool {
        self.check_xattr.unwrap_or(true)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OverlayConfig {
    #[serde(default)]
    pub xattr_namespace: XattrNamespace,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub script: ScriptConfig,
    #[serde(default)]
    pub walk: WalkConfig,
    #[serde(default)]
    pub vacuum: VacuumConfig,
    #[serde(default)]
    pub safety: SafetyConfig,
    #[serde(default)]
    pub overlay: OverlayConfig,
}

impl Config {
    pub fn walk_options(&self) -> WalkOptions {
        WalkOptions {
            include_untouched_lower: self.walk.get_include_untouched_lower(),
            parallel_hash_threshold: self.walk.get_parallel_hash_threshold(),
        }
    }

    /// Every setting with its defaults filled in, for `config init` and
    /// `config show`.
    pub fn resolved(&self) -> Config {
        Config {
            script: ScriptConfig {
                dir: Some(self.script.get_dir()),
                prefix: Some(self.script.get_prefix()),
            },
            walk: WalkConfig {
                include_untouched_lower: Some(self.walk.get_include_untouched_lower()),
                parallel_hash_threshold: Some(self.walk.get_parallel_hash_threshold()),
            },
            vacuum: VacuumConfig {
                prune_empty_dirs: Some(self.vacuum.get_prune_empty_dirs()),
            },
            safety: SafetyConfig {
                check_mounted: Some(self.safety.get_check_mounted()),
                check_xattr: Some(self.safety.get_check_xattr()),
            },
            overlay: self.overlay.clone(),
        }
    }
}

pub fn validate_config(config: &Config) -> Result<()> {
    if config.walk.get_parallel_hash_threshold() == 0 {
        return Err(OverlayError::Config(
            "walk.parallel_hash_threshold must be greater than 0".to_string(),
        ));
    }

    let prefix = config.script.get_prefix();
    if prefix.contains('/') {
        return Err(OverlayError::Config(format!(
            "Invalid script.prefix '{}': must not contain '/'",
            prefix
        )));
    }

    if config.walk.get_include_untouched_lower() {
        tracing::debug!("walk.include_untouched_lower is set; untouched lower subtrees will be visited");
    }

    Ok(())
}
