use crate::cli::ConfigAction;
use crate::config::{get_config_path, load_config, save_config, Config};
use crate::error::{OverlayError, Result};

pub fn handle_config_command(action: Option<ConfigAction>) -> Result<()> {
    match action {
        Some(ConfigAction::Path) => {
            let config_path = get_config_path()?;
            println!("Config location: {}", config_path.display());
        }
        None | Some(ConfigAction::Show) => {
            let config_path = get_config_path()?;
            let config = load_config()?;
            let source = if config_path.exists() {
                config_path.display().to_string()
            } else {
                format!("{} (not found, using defaults)", config_path.display())
            };
            println!("Config file: {}", source);
            println!();
            println!("Current configuration:");
            println!("  Script:");
            println!("    dir: {}", config.script.get_dir());
            println!("    prefix: {}", config.script.get_prefix());
            println!("  Walk:");
            println!(
                "    include_untouched_lower: {}",
                config.walk.get_include_untouched_lower()
            );
            println!(
                "    parallel_hash_threshold: {}",
                config.walk.get_parallel_hash_threshold()
            );
            println!("  Vacuum:");
            println!("    prune_empty_dirs: {}", config.vacuum.get_prune_empty_dirs());
            println!("  Safety:");
            println!("    check_mounted: {}", config.safety.get_check_mounted());
            println!("    check_xattr: {}", config.safety.get_check_xattr());
            println!("  Overlay:");
            println!("    xattr_namespace: {}", config.overlay.xattr_namespace);
        }
        Some(ConfigAction::Init { force }) => {
            let config_path = get_config_path()?;
            if config_path.exists() && !force {
                return Err(OverlayError::Config(format!(
                    "{} already exists (use --force to overwrite)",
                    config_path.display()
                )));
            }
            save_config(&Config::default().resolved(), &config_path)?;
            println!("Created default config at {}", config_path.display());
        }
    }
    Ok(())
}
