//! # Change Resolution
//!
//! Turns a `Depends-On` URL into a `DependencyReference` by asking the
//! hosting system's REST API about the change.
//!
//! ## Classification
//!
//! The hosting system is guessed from the URL alone, in this order:
//!
//! 1. the URL path contains `/c/` -> Gerrit change
//! 2. the host contains `gitlab` -> GitLab merge request
//! 3. anything else -> GitHub pull request
//!
//! Self-hosted Gerrit or GitLab instances whose URLs carry neither marker are
//! misclassified as GitHub and then rejected or fail at the API call.
//!
//! ## Query parameters
//!
//! A URL may carry `?key=value&...` parameters. They are split literally on
//! `&` and `=` without percent-decoding. `subdir` selects a subdirectory of
//! the checkout as the package location.

mod gerrit;
mod github;
mod gitlab;

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use log::debug;
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::http::HttpClient;
use crate::reference::DependencyReference;

/// Code-review system hosting a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    GitHub,
    GitLab,
    Gerrit,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChangeKind::GitHub => "GitHub pull request",
            ChangeKind::GitLab => "GitLab merge request",
            ChangeKind::Gerrit => "Gerrit change",
        };
        f.write_str(name)
    }
}

/// Host and path of a URL. Strings `Url` cannot parse are split by hand,
/// without validating anything.
fn host_and_path(url: &str) -> (String, String) {
    if let Ok(parsed) = Url::parse(url) {
        if let Some(host) = parsed.host_str() {
            return (host.to_string(), parsed.path().to_string());
        }
    }
    let rest = match url.find("://") {
        Some(idx) => &url[idx + 3..],
        None => return (String::new(), url.to_string()),
    };
    match rest.find('/') {
        Some(idx) => (rest[..idx].to_string(), rest[idx..].to_string()),
        None => (rest.to_string(), String::new()),
    }
}

/// Guess the hosting system of a change URL.
pub fn classify(url: &str) -> ChangeKind {
    let (host, path) = host_and_path(url);
    if path.contains("/c/") {
        ChangeKind::Gerrit
    } else if host.to_ascii_lowercase().contains("gitlab") {
        ChangeKind::GitLab
    } else {
        ChangeKind::GitHub
    }
}

/// Split `text` at the first `?` and parse the trailing `key=value&...`.
pub(crate) fn split_query<'a>(
    url: &str,
    text: &'a str,
) -> Result<(&'a str, BTreeMap<String, String>)> {
    let Some((head, query)) = text.split_once('?') else {
        return Ok((text, BTreeMap::new()));
    };
    let mut params = BTreeMap::new();
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').ok_or_else(|| Error::InvalidUrl {
            url: url.to_string(),
            message: format!("query parameter '{}' is not key=value", pair),
        })?;
        params.insert(key.to_string(), value.to_string());
    }
    Ok((head, params))
}

/// A change resolved against its hosting system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// The `Depends-On` URL this was resolved from.
    pub url: String,
    pub kind: ChangeKind,
    /// Directory name of the checkout inside the workspace.
    pub repo_name: String,
    pub reference: DependencyReference,
}

impl Resolved {
    /// Whether this change lives on a different hosting system than the
    /// change being tested. Unknown current systems count as same-system.
    pub fn is_cross_system(&self, current: Option<ChangeKind>) -> bool {
        current.is_some_and(|kind| kind != self.kind)
    }
}

/// Resolves `Depends-On` URLs through the hosting systems' REST APIs.
pub struct Resolver {
    http: Box<dyn HttpClient>,
    config: Config,
}

impl Resolver {
    pub fn new(http: Box<dyn HttpClient>, config: Config) -> Self {
        Self { http, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Resolve `url`, placing the checkout under `workspace`.
    pub fn resolve(&self, url: &str, workspace: &Path) -> Result<Resolved> {
        let kind = classify(url);
        debug!("{} classified as {}", url, kind);
        let resolved = match kind {
            ChangeKind::Gerrit => gerrit::resolve(self, url, workspace)?,
            ChangeKind::GitLab => gitlab::resolve(self, url, workspace)?,
            ChangeKind::GitHub => github::resolve(self, url, workspace)?,
        };
        debug!("resolved {}: {:?}", url, resolved.reference);
        Ok(resolved)
    }

    /// GET `url` and decode its JSON body, after removing `strip_prefix`.
    fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        headers: &[(&str, String)],
        strip_prefix: Option<&str>,
    ) -> Result<T> {
        let response = self.http.get(url, headers)?;
        if !response.is_success() {
            return Err(Error::RemoteApi {
                url: url.to_string(),
                message: format!(
                    "HTTP status {}: {}",
                    response.status,
                    response.body.chars().take(200).collect::<String>()
                ),
            });
        }
        let body = match strip_prefix {
            Some(prefix) => response.body.strip_prefix(prefix).unwrap_or(&response.body),
            None => response.body.as_str(),
        };
        serde_json::from_str(body).map_err(|e| Error::RemoteApi {
            url: url.to_string(),
            message: format!("unexpected response: {}", e),
        })
    }
}

/// Absolute checkout location for `repo_name` inside `workspace`.
fn checkout_dir(workspace: &Path, repo_name: &str) -> Result<PathBuf> {
    Ok(std::path::absolute(workspace.join(repo_name))?)
}
