pub mod config;
pub mod diff;
pub mod doctor;
pub mod merge;
pub mod vacuum;

pub use config::handle_config_command;
pub use diff::run_diff;
pub use doctor::run_doctor;
pub use merge::run_merge;
pub use vacuum::run_vacuum;

use std::path::{Path, PathBuf};

use crate::cli::{validate_layers, LayerArgs, LayerPair};
use crate::config::{expand_tilde, Config};
use crate::error::Result;
use crate::overlay::{DiskLayer, OverlayXattrs};
use crate::plan::{Operation, PlanSummary};
use crate::preflight;
use crate::script::{write_script, ScriptAction};

/// Validate the layer arguments and run the safety checks the config asks for.
pub(crate) fn prepare_layers(args: &LayerArgs, config: &Config) -> Result<(LayerPair, DiskLayer, DiskLayer)> {
    let pair = validate_layers(&args.lower, &args.upper)?;
    let namespace = config.overlay.xattr_namespace;

    if config.safety.get_check_xattr() {
        preflight::check_xattr_access(&pair.upper, namespace)?;
    } else {
        tracing::warn!("Skipping xattr access check; opaque directories may be missed");
    }
    if config.safety.get_check_mounted() {
        preflight::check_not_mounted(&pair.lower, &pair.upper, args.yes)?;
    } else {
        tracing::warn!("Skipping mount check");
    }

    let xattrs = OverlayXattrs::new(namespace);
    let lower = DiskLayer::new(&pair.lower, xattrs);
    let upper = DiskLayer::new(&pair.upper, xattrs);
    Ok((pair, lower, upper))
}

fn script_dir(cli_dir: Option<&Path>, config: &Config) -> PathBuf {
    match cli_dir {
        Some(dir) => dir.to_path_buf(),
        None => expand_tilde(&config.script.get_dir()),
    }
}

/// Write `operations` as a script and tell the user how to use it.
pub(crate) fn emit_script(
    action: ScriptAction,
    pair: &LayerPair,
    operations: &[Operation],
    cli_dir: Option<&Path>,
    config: &Config,
) -> Result<PathBuf> {
    let dir = script_dir(cli_dir, config);
    let path = write_script(
        &dir,
        &config.script.get_prefix(),
        action,
        &pair.lower,
        &pair.upper,
        operations,
    )?;

    println!("Planned {}.", PlanSummary::of(operations));
    println!(
        "The script {} is created. Run it to do the actual work, and only while the overlay is not mounted.",
        path.display()
    );
    Ok(path)
}
