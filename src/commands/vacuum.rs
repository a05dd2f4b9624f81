use std::path::Path;

use crate::cli::LayerArgs;
use crate::commands::{emit_script, prepare_layers};
use crate::config::load_config;
use crate::error::Result;
use crate::plan::plan_vacuum;
use crate::script::ScriptAction;

pub fn run_vacuum(layers: &LayerArgs, script_dir: Option<&Path>) -> Result<()> {
    let config = load_config()?;
    let (pair, lower, upper) = prepare_layers(layers, &config)?;

    let operations = plan_vacuum(
        &lower,
        &upper,
        config.walk_options(),
        config.vacuum.get_prune_empty_dirs(),
    )?;

    if operations.is_empty() {
        println!("Nothing to vacuum: no unmodified copy-ups in {}.", pair.upper.display());
        return Ok(());
    }

    emit_script(ScriptAction::Vacuum, &pair, &operations, script_dir, &config)?;
    Ok(())
}
