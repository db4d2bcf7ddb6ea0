//! GitLab merge requests.
//!
//! URL shape: `https://<host>/<project-path>/-/merge_requests/<iid>[?k=v]`.
//! The project path may contain subgroups. Three API calls are needed: the
//! target project (for its id and clone URL), the merge request, and the
//! source project, which differs from the target for forks.

use std::path::Path;

use serde::Deserialize;
use url::Url;

use super::{checkout_dir, split_query, ChangeKind, Resolved, Resolver};
use crate::error::{Error, Result};
use crate::reference::DependencyReference;

const MR_SEPARATOR: &str = "/-/merge_requests/";

#[derive(Debug, Deserialize)]
struct Project {
    id: u64,
    http_url_to_repo: String,
}

#[derive(Debug, Deserialize)]
struct MergeRequest {
    source_branch: String,
    target_branch: String,
    source_project_id: u64,
    #[serde(default)]
    description: Option<String>,
    state: String,
}

/// Parsed merge request URL.
#[derive(Debug, PartialEq, Eq)]
pub(super) struct MergeRequestUrl {
    /// Scheme, host and port, e.g. `https://gitlab.com`.
    pub origin: String,
    pub project_path: String,
    pub iid: String,
    pub subdir: Option<String>,
}

impl MergeRequestUrl {
    fn repo_name(&self) -> &str {
        self.project_path
            .rsplit('/')
            .next()
            .unwrap_or(&self.project_path)
    }
}

pub(super) fn parse_url(url: &str) -> Result<MergeRequestUrl> {
    let invalid = |message: &str| Error::InvalidUrl {
        url: url.to_string(),
        message: message.to_string(),
    };
    let parts: Vec<&str> = url.split(MR_SEPARATOR).collect();
    if parts.len() != 2 {
        return Err(invalid(
            "expected https://<host>/<project>/-/merge_requests/<iid>",
        ));
    }
    let project_url =
        Url::parse(parts[0]).map_err(|e| invalid(&format!("malformed project URL: {}", e)))?;
    if project_url.host_str().is_none() {
        return Err(invalid("missing host"));
    }
    let project_path = project_url.path().trim_matches('/').to_string();
    if project_path.is_empty() {
        return Err(invalid("missing project path"));
    }

    let (iid, params) = split_query(url, parts[1])?;
    let iid = iid.trim_end_matches('/');
    if iid.is_empty() || !iid.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid("merge request number is not numeric"));
    }

    Ok(MergeRequestUrl {
        origin: project_url.origin().ascii_serialization(),
        project_path,
        iid: iid.to_string(),
        subdir: params.get("subdir").cloned(),
    })
}

pub(super) fn resolve(resolver: &Resolver, url: &str, workspace: &Path) -> Result<Resolved> {
    let mr_url = parse_url(url)?;
    let api = format!("{}/api/v4", mr_url.origin);

    let mut headers = Vec::new();
    if let Some(token) = &resolver.config().gitlab_token {
        headers.push(("Authorization", format!("Bearer {}", token)));
    }

    let target: Project = resolver.get_json(
        &format!(
            "{}/projects/{}",
            api,
            urlencoding::encode(&mr_url.project_path)
        ),
        &headers,
        None,
    )?;
    let mr: MergeRequest = resolver.get_json(
        &format!("{}/projects/{}/merge_requests/{}", api, target.id, mr_url.iid),
        &headers,
        None,
    )?;
    let source: Project = if mr.source_project_id == target.id {
        Project {
            id: target.id,
            http_url_to_repo: target.http_url_to_repo.clone(),
        }
    } else {
        resolver.get_json(
            &format!("{}/projects/{}", api, mr.source_project_id),
            &headers,
            None,
        )?
    };

    let repo_name = mr_url.repo_name().to_string();
    let reference = DependencyReference {
        description: mr.description,
        fork_url: source.http_url_to_repo,
        branch: mr.source_branch,
        main_url: target.http_url_to_repo,
        main_branch: mr.target_branch,
        merged: mr.state == "merged",
        ..Default::default()
    }
    .with_location(checkout_dir(workspace, &repo_name)?, mr_url.subdir);

    Ok(Resolved {
        url: url.to_string(),
        kind: ChangeKind::GitLab,
        repo_name,
        reference,
    })
}
