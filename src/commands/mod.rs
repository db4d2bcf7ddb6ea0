//! # CLI Command Implementations
//!
//! Each subcommand of the `depends-on` tool lives in its own file with:
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - An `execute` function that takes the parsed `Args` and performs the
//!   command's logic by calling into the `depends_on` library.
//!
//! The pieces shared by several commands (description source flags and the
//! wiring of runner, HTTP client and resolver) are defined here.

pub mod check;
pub mod completions;
pub mod patch;
pub mod run;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use depends_on::config::Config;
use depends_on::exec::SystemRunner;
use depends_on::http::ReqwestClient;
use depends_on::pipeline::DescriptionSource;
use depends_on::resolver::Resolver;

/// Where to read the description of the change under test.
///
/// Without any of these flags the `description` field of `depends-on.json`
/// in the project directory is used.
#[derive(Args, Debug, Default)]
#[group(multiple = false)]
pub struct SourceArgs {
    /// URL of the change under test; its description is fetched from the API
    #[arg(long, value_name = "URL", env = "DEPENDS_ON_CHANGE_URL")]
    pub change_url: Option<String>,

    /// Read the description from a file
    #[arg(long, value_name = "FILE")]
    pub description_file: Option<PathBuf>,

    /// Use this text as the description
    #[arg(long, value_name = "TEXT")]
    pub description: Option<String>,
}

impl SourceArgs {
    pub fn source(&self, project_dir: &Path) -> DescriptionSource {
        if let Some(url) = &self.change_url {
            DescriptionSource::ChangeUrl(url.clone())
        } else if let Some(file) = &self.description_file {
            DescriptionSource::File(file.clone())
        } else if let Some(text) = &self.description {
            DescriptionSource::Text(text.clone())
        } else {
            DescriptionSource::Sidecar(project_dir.to_path_buf())
        }
    }
}

/// Runner, resolver and configuration built from the process environment.
pub struct Services {
    pub config: Config,
    pub runner: SystemRunner,
    pub resolver: Resolver,
}

impl Services {
    pub fn from_env() -> Result<Self> {
        let config = Config::from_env();
        let runner = SystemRunner::new(config.redactor());
        let http = ReqwestClient::new().context("Failed to create the HTTP client")?;
        let resolver = Resolver::new(Box::new(http), config.clone());
        Ok(Self {
            config,
            runner,
            resolver,
        })
    }
}

/// The directory the command was started from, or `explicit` when given.
pub fn project_dir(explicit: Option<PathBuf>) -> Result<PathBuf> {
    match explicit {
        Some(dir) => Ok(dir),
        None => std::env::current_dir().context("Cannot determine the current directory"),
    }
}
