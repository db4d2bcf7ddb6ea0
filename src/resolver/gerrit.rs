//! Gerrit changes.
//!
//! URL shape: `<gerrit-root>/c/<project>/+/<change>`, for instance
//! `https://gerrit.wikimedia.org/r/c/mediawiki/core/+/123456`. Everything
//! before `/c/` is the REST root; the last path segment is the change.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use super::{checkout_dir, split_query, ChangeKind, Resolved, Resolver};
use crate::defaults::GERRIT_MAGIC_PREFIX;
use crate::error::{Error, Result};
use crate::reference::DependencyReference;

const ANONYMOUS_HTTP: &str = "anonymous http";

#[derive(Debug, Deserialize)]
struct ChangeInfo {
    project: String,
    branch: String,
    status: String,
    current_revision: String,
    #[serde(default)]
    revisions: HashMap<String, RevisionInfo>,
}

#[derive(Debug, Deserialize)]
struct RevisionInfo {
    #[serde(default)]
    fetch: HashMap<String, FetchInfo>,
    #[serde(default)]
    commit: Option<CommitInfo>,
}

#[derive(Debug, Deserialize)]
struct FetchInfo {
    url: String,
    #[serde(rename = "ref")]
    ref_name: String,
}

#[derive(Debug, Deserialize)]
struct CommitInfo {
    #[serde(default)]
    message: Option<String>,
}

/// Parsed change URL.
#[derive(Debug, PartialEq, Eq)]
pub(super) struct ChangeUrl {
    pub base: String,
    pub change: String,
    pub subdir: Option<String>,
}

pub(super) fn parse_url(url: &str) -> Result<ChangeUrl> {
    let invalid = |message: &str| Error::InvalidUrl {
        url: url.to_string(),
        message: message.to_string(),
    };
    let parts: Vec<&str> = url.split("/c/").collect();
    if parts.len() != 2 {
        return Err(invalid("expected exactly one /c/ in a Gerrit change URL"));
    }
    let (path, params) = split_query(url, parts[1])?;
    let change = path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .last()
        .ok_or_else(|| invalid("missing change number"))?;
    if parts[0].is_empty() {
        return Err(invalid("missing Gerrit root URL"));
    }
    Ok(ChangeUrl {
        base: parts[0].to_string(),
        change: change.to_string(),
        subdir: params.get("subdir").cloned(),
    })
}

pub(super) fn resolve(resolver: &Resolver, url: &str, workspace: &Path) -> Result<Resolved> {
    let change_url = parse_url(url)?;
    let api_url = format!(
        "{}/changes/{}?o=CURRENT_REVISION&o=CURRENT_COMMIT",
        change_url.base, change_url.change
    );
    let info: ChangeInfo = resolver.get_json(
        &api_url,
        &[("Accept", "application/json".to_string())],
        Some(GERRIT_MAGIC_PREFIX),
    )?;

    let missing = |what: &str| Error::RemoteApi {
        url: api_url.clone(),
        message: format!("change has no {}", what),
    };
    let revision = info
        .revisions
        .get(&info.current_revision)
        .ok_or_else(|| missing("current revision"))?;
    let fetch = revision
        .fetch
        .get(ANONYMOUS_HTTP)
        .ok_or_else(|| missing("anonymous http fetch information"))?;

    let repo_name = info
        .project
        .rsplit('/')
        .next()
        .unwrap_or(&info.project)
        .to_string();
    let reference = DependencyReference {
        description: revision.commit.as_ref().and_then(|c| c.message.clone()),
        fork_url: fetch.url.clone(),
        branch: fetch.ref_name.clone(),
        main_url: fetch.url.clone(),
        main_branch: info.branch.clone(),
        merged: info.status == "MERGED",
        ..Default::default()
    }
    .with_location(checkout_dir(workspace, &repo_name)?, change_url.subdir);

    Ok(Resolved {
        url: url.to_string(),
        kind: ChangeKind::Gerrit,
        repo_name,
        reference,
    })
}
