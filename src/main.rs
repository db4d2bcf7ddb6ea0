//! # Depends-On CLI
//!
//! This is the binary entry point for the `depends-on` command-line tool.
//!
//! Its primary responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Initialising logging and output preferences.
//! - Executing the appropriate command and turning errors into a non-zero
//!   exit status.
//!
//! The pipeline itself lives in the `depends_on` library crate; the binary is
//! a thin wrapper around it.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}
