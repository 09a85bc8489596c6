use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// BAIN wizard installer - inspect wizard archives and build install trees
#[derive(Parser)]
#[command(name = "bain-wizard")]
#[command(about = "Inspect BAIN wizard archives and turn wizard decisions into install trees")]
#[command(version)]
pub struct Cli {
    /// Installer settings file (JSON). Defaults are used when omitted.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the wizard base, sub-packages, plugins and images of an extracted archive
    Inspect {
        /// Directory holding the extracted archive
        archive: PathBuf,
    },
    /// Evaluate a version requirement gate against an installation
    Check {
        /// Required game version
        #[arg(long)]
        game: Option<String>,
        /// Required script extender version
        #[arg(long)]
        script_extender: Option<String>,
        /// Required graphics extender version
        #[arg(long)]
        graphics_extender: Option<String>,
        /// Required Wrye Bash version
        #[arg(long)]
        wrye_bash: Option<String>,
        /// Installed game version (overrides the settings file)
        #[arg(long)]
        installed_game: Option<String>,
        /// Installed script extender version (overrides the settings file)
        #[arg(long)]
        installed_script_extender: Option<String>,
    },
    /// Build the install tree of a completed wizard run
    Apply {
        /// Directory holding the extracted archive
        archive: PathBuf,
        /// Completed run (JSON) with the script's state and the final adjustments
        #[arg(short, long)]
        decisions: PathBuf,
        /// Directory to create with the install tree (must not exist)
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Validate a settings file
    Validate {
        /// Path to the settings file to validate
        #[arg(value_name = "CONFIG")]
        file: PathBuf,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        <Self as clap::Parser>::parse()
    }
}
