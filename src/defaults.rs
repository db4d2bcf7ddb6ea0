//! Default values for depends-on.
//!
//! This module provides centralized constants used across the resolver, the
//! materializer and the commands, ensuring consistency and avoiding
//! duplication.

use std::path::{Path, PathBuf};

/// Name of the sidecar file written at the root of every checkout.
pub const SIDECAR_FILE: &str = "depends-on.json";

/// Git identity used for the merge commit in materialized checkouts.
pub const GIT_USER_NAME: &str = "Depends-On";
pub const GIT_USER_EMAIL: &str = "depends-on@localhost";

/// Remote name under which the fork is fetched.
pub const FORK_REMOTE: &str = "pr";

/// Public GitHub REST endpoint.
pub const GITHUB_API_URL: &str = "https://api.github.com";

/// Prefix Gerrit puts in front of every JSON response.
pub const GERRIT_MAGIC_PREFIX: &str = ")]}'\n";

/// Environment variables holding credentials and endpoints.
pub const GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";
pub const GITHUB_API_URL_ENV: &str = "GITHUB_API_URL";
pub const GITLAB_TOKEN_ENV: &str = "GITLAB_TOKEN";
pub const GITLAB_USER_ENV: &str = "GITLAB_USER";

/// Returns the default workspace where dependencies are cloned: the parent
/// of `project_dir`, so checkouts end up next to the project being tested.
///
/// A relative path with a single component maps to `..` under it. Falls back
/// to `project_dir` itself when it has no parent (`/`).
pub fn default_workspace(project_dir: &Path) -> PathBuf {
    match project_dir.parent() {
        Some(parent) if parent.as_os_str().is_empty() => project_dir.join(".."),
        Some(parent) => parent.to_path_buf(),
        None => project_dir.to_path_buf(),
    }
}
