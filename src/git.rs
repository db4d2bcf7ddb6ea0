//! # Workspace Materialization
//!
//! Turns a resolved change into a local checkout next to the project under
//! test: clone the target repository, bring in the change, merge the target
//! branch on top of it and record the result in the `depends-on.json`
//! sidecar.
//!
//! This uses the system `git` command, which automatically handles:
//! - SSH keys from ~/.ssh/
//! - Git credential helpers
//! - Any authentication configured in ~/.gitconfig
//!
//! GitLab credentials from the environment are additionally injected into the
//! clone and fetch URLs of GitLab hosts. They never reach the sidecar.

use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use crate::config::Config;
use crate::defaults::{FORK_REMOTE, GIT_USER_EMAIL, GIT_USER_NAME};
use crate::error::{Error, Result};
use crate::exec::{run_vcs, CommandRunner};
use crate::resolver::{ChangeKind, Resolved};

/// Local branch name for a Gerrit change ref.
///
/// `refs/changes/45/123445/3` becomes `change-123445-3`. Refs that do not
/// follow the Gerrit layout are flattened with `-`.
pub fn gerrit_local_branch(change_ref: &str) -> String {
    let parts: Vec<&str> = change_ref.split('/').collect();
    match parts.as_slice() {
        ["refs", "changes", _, change, patchset] => format!("change-{}-{}", change, patchset),
        _ => change_ref
            .trim_start_matches("refs/")
            .replace('/', "-"),
    }
}

/// Checks out resolved changes with `git`.
pub struct Materializer<'a> {
    runner: &'a dyn CommandRunner,
    config: &'a Config,
}

impl<'a> Materializer<'a> {
    pub fn new(runner: &'a dyn CommandRunner, config: &'a Config) -> Self {
        Self { runner, config }
    }

    /// Clone, fetch, check out and merge one change, then write its sidecar.
    ///
    /// Returns the sidecar path.
    pub fn materialize(&self, resolved: &Resolved) -> Result<PathBuf> {
        let reference = &resolved.reference;
        let top_dir = &reference.top_dir;
        let workspace = top_dir.parent().ok_or_else(|| Error::Sidecar {
            path: top_dir.display().to_string(),
            message: "checkout directory has no parent".to_string(),
        })?;
        let repo = top_dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| resolved.repo_name.clone());
        fs::create_dir_all(workspace)?;

        info!(
            "Extracting {} {} into {}",
            resolved.kind,
            resolved.url,
            top_dir.display()
        );

        let main_url = self.config.authenticated_clone_url(&reference.main_url);
        let fork_url = self.config.authenticated_clone_url(&reference.fork_url);

        self.git(workspace, &["clone", "--filter=tree:0", &main_url, &repo])?;

        match resolved.kind {
            ChangeKind::Gerrit => {
                let branch = gerrit_local_branch(&reference.branch);
                self.git(top_dir, &["fetch", &fork_url, &reference.branch])?;
                self.git(top_dir, &["checkout", "-b", &branch, "FETCH_HEAD"])?;
            }
            ChangeKind::GitHub | ChangeKind::GitLab => {
                let tracking = format!("{}/{}", FORK_REMOTE, reference.branch);
                self.git(top_dir, &["remote", "add", FORK_REMOTE, &fork_url])?;
                self.git(top_dir, &["fetch", FORK_REMOTE, &reference.branch])?;
                self.git(
                    top_dir,
                    &["checkout", "-b", &reference.branch, "--track", &tracking],
                )?;
            }
        }

        self.git(top_dir, &["config", "user.name", GIT_USER_NAME])?;
        self.git(top_dir, &["config", "user.email", GIT_USER_EMAIL])?;
        self.git(top_dir, &["config", "commit.gpgsign", "false"])?;

        let upstream = format!("origin/{}", reference.main_branch);
        self.git(top_dir, &["merge", &upstream, "--no-edit"])?;

        let sidecar = reference.save()?;
        info!("Wrote {}", sidecar.display());
        Ok(sidecar)
    }

    fn git(&self, cwd: &Path, args: &[&str]) -> Result<()> {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        run_vcs(self.runner, "git", &args, cwd)?;
        Ok(())
    }
}
