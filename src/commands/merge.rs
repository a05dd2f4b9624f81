use std::path::Path;

use crate::cli::LayerArgs;
use crate::commands::{emit_script, prepare_layers};
use crate::config::load_config;
use crate::error::Result;
use crate::plan::plan_merge;
use crate::script::ScriptAction;

pub fn run_merge(layers: &LayerArgs, script_dir: Option<&Path>) -> Result<()> {
    let config = load_config()?;
    let (pair, lower, upper) = prepare_layers(layers, &config)?;

    let operations = plan_merge(&lower, &upper, config.walk_options())?;

    emit_script(ScriptAction::Merge, &pair, &operations, script_dir, &config)?;
    Ok(())
}
