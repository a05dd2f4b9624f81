use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "overlay-tools", version)]
#[command(
    about = "Inspect, vacuum and merge the lowerdir/upperdir pair of an unmounted OverlayFS"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct LayerArgs {
    #[arg(short, long = "lowerdir", value_name = "LOWERDIR", help = "The lowerdir of the overlay")]
    pub lower: PathBuf,

    #[arg(short, long = "upperdir", value_name = "UPPERDIR", help = "The upperdir of the overlay")]
    pub upper: PathBuf,

    #[arg(short = 'y', long, help = "Continue without asking if the overlay looks mounted")]
    pub yes: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(about = "List the paths the upper layer actually changes")]
    Diff {
        #[command(flatten)]
        layers: LayerArgs,

        #[arg(
            short,
            long,
            help = "List every entry of directories that exist on one side only"
        )]
        verbose: bool,

        #[arg(long, help = "JSON output")]
        json: bool,
    },
    #[command(about = "Write a script removing copied-up files that were never modified")]
    Vacuum {
        #[command(flatten)]
        layers: LayerArgs,

        #[arg(long, value_name = "DIR", help = "Directory to write the script to")]
        script_dir: Option<PathBuf>,
    },
    #[command(about = "Write a script merging upper into lower and clearing upper")]
    Merge {
        #[command(flatten)]
        layers: LayerArgs,

        #[arg(long, value_name = "DIR", help = "Directory to write the script to")]
        script_dir: Option<PathBuf>,
    },
    #[command(about = "Check that a layer pair can be processed")]
    Doctor {
        #[arg(short, long = "lowerdir", value_name = "LOWERDIR")]
        lower: PathBuf,

        #[arg(short, long = "upperdir", value_name = "UPPERDIR")]
        upper: PathBuf,
    },
    #[command(about = "Manage configuration")]
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    #[command(about = "Show current configuration values")]
    Show,
    #[command(about = "Show config file path")]
    Path,
    #[command(about = "Write a config file with every default spelled out")]
    Init {
        #[arg(long, help = "Overwrite an existing config file")]
        force: bool,
    },
}
