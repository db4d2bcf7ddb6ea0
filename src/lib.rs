//! # Depends-On Library
//!
//! This library implements cross-repository dependency testing for changes
//! under review. The description of a pull request, merge request or Gerrit
//! change can declare `Depends-On: <url>` lines pointing at other unmerged
//! changes. The `depends-on` command-line tool resolves those references,
//! checks each one out next to the project under test, merged with its target
//! branch, and rewrites the project's package manifests so the build uses the
//! checkouts instead of the published packages.
//!
//! ## Quick Example
//!
//! ```
//! use depends_on::description::{depends_on_urls, main_dir};
//!
//! let text = "Fix the parser\n\nDepends-On: https://github.com/acme/lib/pull/12\nMain-Dir: app\n";
//!
//! assert_eq!(depends_on_urls(text), vec!["https://github.com/acme/lib/pull/12"]);
//! assert_eq!(main_dir(text).as_deref(), Some("app"));
//! ```
//!
//! ## Core Concepts
//!
//! - **Description (`description`)**: extraction of `Depends-On:` and
//!   `Main-Dir:` lines, ignoring HTML comments.
//! - **Resolution (`resolver`)**: classifies a change URL as GitHub, GitLab or
//!   Gerrit and queries the hosting system's API for the fork, branch, target
//!   branch and merge state.
//! - **References (`reference`)**: the `depends-on.json` sidecar describing
//!   each checkout.
//! - **Materialization (`git`)**: clones the target repository, fetches the
//!   change and merges the target branch into it.
//! - **Manifest patching (`manifest`)**: one patcher per ecosystem (Go,
//!   Node.js, Python, Rust, Ansible) rewrites dependency declarations.
//! - **Pipeline (`pipeline`)**: runs the stages in order and reports the
//!   outcome.
//!
//! External commands go through the `exec::CommandRunner` trait and HTTP
//! through `http::HttpClient`, so every stage can be tested without network or
//! toolchains.

pub mod config;
pub mod defaults;
pub mod description;
pub mod error;
pub mod exec;
pub mod filesystem;
pub mod git;
pub mod http;
pub mod manifest;
pub mod output;
pub mod pipeline;
pub mod redact;
pub mod reference;
pub mod resolver;

#[cfg(test)]
mod resolver_proptest;
