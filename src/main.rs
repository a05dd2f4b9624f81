use clap::Parser;

use overlay_tools::cli::{Args, Commands};
use overlay_tools::{commands, error};

fn main() {
    match run() {
        Ok(()) => {}
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn run() -> error::Result<()> {
    // Logs go to stderr so diff output on stdout stays machine-readable
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("OVERLAY_TOOLS_LOG").unwrap_or_else(|_| "warn".to_string()))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match args.command {
        Commands::Diff {
            layers,
            verbose,
            json,
        } => commands::run_diff(&layers, verbose, json),
        Commands::Vacuum { layers, script_dir } => {
            commands::run_vacuum(&layers, script_dir.as_deref())
        }
        Commands::Merge { layers, script_dir } => {
            commands::run_merge(&layers, script_dir.as_deref())
        }
        Commands::Doctor { lower, upper } => commands::run_doctor(&lower, &upper),
        Commands::Config { action } => commands::handle_config_command(action),
    }
}
