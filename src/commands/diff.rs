use crate::cli::LayerArgs;
use crate::commands::prepare_layers;
use crate::config::load_config;
use crate::error::Result;
use crate::plan::plan_diff;

pub fn run_diff(layers: &LayerArgs, verbose: bool, json: bool) -> Result<()> {
    let config = load_config()?;
    let (pair, lower, upper) = prepare_layers(layers, &config)?;

    let lines = plan_diff(&lower, &upper, config.walk_options(), verbose)?;

    if json {
        let output = serde_json::json!({
            "lowerdir": pair.lower.display().to_string(),
            "upperdir": pair.upper.display().to_string(),
            "changes": lines,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    for line in &lines {
        println!("{}", line);
    }
    Ok(())
}
