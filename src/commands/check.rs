//! # Check Command Implementation
//!
//! Resolves every `Depends-On:` reference of the change under test without
//! checking anything out. The command fails while at least one dependency is
//! still unmerged, which makes it usable as a merge gate.
//!
//! This command is a safe, read-only operation that does not modify any files.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use super::{project_dir, Services, SourceArgs};
use depends_on::defaults::default_workspace;
use depends_on::output::OutputConfig;
use depends_on::pipeline::{Description, Pipeline, RunOptions};

/// Resolve Depends-On dependencies and fail if any is unmerged
#[derive(Args, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Project directory holding depends-on.json [default: current directory]
    #[arg(long, value_name = "DIR")]
    pub project_dir: Option<PathBuf>,
}

/// Execute the `check` command.
pub fn execute(args: CheckArgs, output: &OutputConfig) -> Result<()> {
    let project_dir = project_dir(args.project_dir)?;
    let services = Services::from_env()?;

    let description = Description::load(&args.source.source(&project_dir), &services.resolver)?;
    let options = RunOptions {
        workspace: default_workspace(&project_dir),
        project_dir,
        container_mode: false,
        check_only: true,
    };
    let summary = Pipeline::new(&services.resolver, &services.runner, &services.config)
        .execute(&description, &options)?;

    if summary.resolved.is_empty() {
        println!("{}", output.success("No Depends-On dependency"));
        return Ok(());
    }
    for change in &summary.resolved {
        let state = if change.reference.merged {
            "merged"
        } else {
            "unmerged"
        };
        println!("{} ({}): {}", change.url, change.kind, state);
    }
    if summary.unmerged > 0 {
        println!(
            "{}",
            output.warning(&format!("{} dependencies are not merged", summary.unmerged))
        );
        anyhow::bail!("{} unmerged dependencies", summary.unmerged);
    }
    println!("{}", output.success("All dependencies are merged"));
    Ok(())
}
