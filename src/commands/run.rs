//! # Run Command Implementation
//!
//! The full pipeline: read the description of the change under test, resolve
//! every `Depends-On:` reference, check each dependency out next to the
//! project and patch the project's manifests so they use the checkouts.
//!
//! ## Example
//!
//! ```bash
//! # In CI, from the project checkout, with the PR body in a file
//! depends-on run --description-file "$RUNNER_TEMP/pr-body.md"
//!
//! # Container builds cannot see the workspace: point at forks instead
//! depends-on run --change-url "$PR_URL" --container-mode
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use super::{project_dir, Services, SourceArgs};
use depends_on::defaults::default_workspace;
use depends_on::output::OutputConfig;
use depends_on::pipeline::{Description, PatchReport, Pipeline, RunOptions, RunSummary};

/// Resolve, check out and patch in every Depends-On dependency
#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Directory receiving the dependency checkouts [default: parent of the
    /// project directory]
    #[arg(long, value_name = "DIR", env = "DEPENDS_ON_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    /// Project directory; Main-Dir is resolved against it [default: current
    /// directory]
    #[arg(long, value_name = "DIR")]
    pub project_dir: Option<PathBuf>,

    /// Point manifests at the fork and branch of each change instead of the
    /// local checkout
    #[arg(long)]
    pub container_mode: bool,
}

/// Execute the `run` command.
pub fn execute(args: RunArgs, output: &OutputConfig) -> Result<()> {
    let project_dir = project_dir(args.project_dir)?;
    let workspace = args
        .workspace
        .unwrap_or_else(|| default_workspace(&project_dir));
    let services = Services::from_env()?;

    let description = Description::load(&args.source.source(&project_dir), &services.resolver)?;
    let options = RunOptions {
        project_dir,
        workspace,
        container_mode: args.container_mode,
        check_only: false,
    };
    let summary = Pipeline::new(&services.resolver, &services.runner, &services.config)
        .execute(&description, &options)?;

    report(&summary, output)
}

/// Print the summary lines of a pipeline run.
pub(crate) fn report(summary: &RunSummary, output: &OutputConfig) -> Result<()> {
    if summary.resolved.is_empty() {
        println!("{}", output.success("No Depends-On dependency"));
        return Ok(());
    }
    println!(
        "{}",
        output.success(&format!(
            "{} dependencies resolved, {} unmerged",
            summary.resolved.len(),
            summary.unmerged
        ))
    );
    match &summary.patch {
        Some(patch) => report_patch(patch, output),
        None => Ok(()),
    }
}

/// Print the patch outcome and turn patch failures into an error.
pub(crate) fn report_patch(patch: &PatchReport, output: &OutputConfig) -> Result<()> {
    if patch.changed.is_empty() {
        println!("{}", output.warning("No manifest needed a change"));
    } else {
        println!(
            "{}",
            output.success(&format!("Patched: {}", patch.changed.join(", ")))
        );
    }
    for (ecosystem, error) in &patch.failures {
        println!("{}", output.failure(&format!("{}: {}", ecosystem, error)));
    }
    if !patch.is_success() {
        let failed: Vec<&str> = patch.failures.iter().map(|(name, _)| *name).collect();
        anyhow::bail!("Manifest patching failed for: {}", failed.join(", "));
    }
    Ok(())
}
