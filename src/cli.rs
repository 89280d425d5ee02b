// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines the deployment step subcommands and their arguments.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "deckhand")]
#[command(about = "Run deployment steps with package journaling and retention")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print the final result
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Print JSON lines instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to deckhand.yml in the current directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract a package and run its deployment conventions
    DeployPackage {
        /// Package archive (.tar, .zip or .nupkg)
        #[arg(long)]
        package: PathBuf,

        /// JSON file of deployment variables
        #[arg(long)]
        variables: Option<PathBuf>,
    },

    /// Run a single script, optionally from inside a package
    RunScript {
        /// Script to run; relative paths are looked up inside the package first
        #[arg(long)]
        script: PathBuf,

        /// Package archive to extract before running the script
        #[arg(long)]
        package: Option<PathBuf>,

        /// JSON file of deployment variables
        #[arg(long)]
        variables: Option<PathBuf>,
    },

    /// Purge releases of a policy set that fall outside the retention window
    ApplyRetention {
        /// Retention policy set to clean up
        #[arg(long)]
        policy_set: String,

        /// Keep releases installed within this many days
        #[arg(long, conflicts_with = "releases")]
        days: Option<u32>,

        /// Keep this many successful releases besides the current one
        #[arg(long)]
        releases: Option<u32>,

        /// JSON file of deployment variables
        #[arg(long)]
        variables: Option<PathBuf>,
    },
}
