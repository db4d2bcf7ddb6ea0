//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands;
use depends_on::output::OutputConfig;

/// Depends-On - Test changes together with the unmerged changes they depend on
#[derive(Parser, Debug)]
#[command(name = "depends-on")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, global = true, value_name = "LEVEL", default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve, check out and patch in every Depends-On dependency
    Run(commands::run::RunArgs),

    /// Resolve Depends-On dependencies and fail if any is unmerged
    Check(commands::check::CheckArgs),

    /// Patch the project manifests from existing checkouts
    Patch(commands::patch::PatchArgs),

    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),
}

/// Initialise `env_logger`, writing to stderr without timestamps.
fn init_logging(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    // a second initialisation (tests) is harmless
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .format_target(false)
        .try_init();
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        init_logging(&self.log_level);
        let output = OutputConfig::from_env_and_flag(&self.color);

        match self.command {
            Commands::Run(args) => commands::run::execute(args, &output),
            Commands::Check(args) => commands::check::execute(args, &output),
            Commands::Patch(args) => commands::patch::execute(args, &output),
            Commands::Completions(args) => commands::completions::execute(args),
        }
    }
}
