//! # Patch Command Implementation
//!
//! Runs only the manifest patchers, from checkouts that already exist and
//! carry a `depends-on.json` sidecar. Useful when the checkouts were
//! produced by an earlier `run` in another job, or by hand.
//!
//! ## Example
//!
//! ```bash
//! depends-on patch ../widget ../gadget
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use super::{project_dir, run};
use depends_on::config::Config;
use depends_on::exec::SystemRunner;
use depends_on::manifest::{all_patchers, PatchContext};
use depends_on::output::OutputConfig;
use depends_on::pipeline::{load_checkouts, patch_all};

/// Patch the project manifests from existing checkouts
#[derive(Args, Debug)]
pub struct PatchArgs {
    /// Checkout directories, each holding a depends-on.json file
    #[arg(value_name = "CHECKOUT", required = true)]
    pub checkouts: Vec<PathBuf>,

    /// Project directory whose manifests are patched [default: current
    /// directory]
    #[arg(long, value_name = "DIR")]
    pub project_dir: Option<PathBuf>,

    /// Point manifests at the fork and branch of each change instead of the
    /// local checkout
    #[arg(long)]
    pub container_mode: bool,
}

/// Execute the `patch` command.
pub fn execute(args: PatchArgs, output: &OutputConfig) -> Result<()> {
    let project_dir = project_dir(args.project_dir)?;
    let deps = load_checkouts(&args.checkouts).context("Failed to load checkouts")?;
    let runner = SystemRunner::new(Config::from_env().redactor());
    let ctx = PatchContext {
        runner: &runner,
        container_mode: args.container_mode,
    };

    if deps.values().all(|r| r.merged) {
        println!("{}", output.success("All checkouts are merged, nothing to patch"));
        return Ok(());
    }
    let report = patch_all(&all_patchers(), &project_dir, &deps, &ctx)?;
    run::report_patch(&report, output)
}
