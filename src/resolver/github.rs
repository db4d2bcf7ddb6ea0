//! GitHub pull requests.
//!
//! URL shape: `https://github.com/<org>/<repo>/pull/<number>[?k=v&...]`.

use std::path::Path;

use log::info;
use serde::Deserialize;

use super::{checkout_dir, split_query, ChangeKind, Resolved, Resolver};
use crate::error::{Error, Result};
use crate::reference::DependencyReference;

#[derive(Debug, Deserialize)]
struct PullRequest {
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    merged: bool,
    head: Side,
    base: Side,
}

#[derive(Debug, Deserialize)]
struct Side {
    #[serde(rename = "ref")]
    ref_name: String,
    repo: Option<Repo>,
}

#[derive(Debug, Deserialize)]
struct Repo {
    clone_url: String,
}

/// Parsed pull request URL.
#[derive(Debug, PartialEq, Eq)]
pub(super) struct PullUrl {
    pub org: String,
    pub repo: String,
    pub number: String,
    pub subdir: Option<String>,
}

pub(super) fn parse_url(url: &str) -> Result<PullUrl> {
    let invalid = |message: &str| Error::InvalidUrl {
        url: url.to_string(),
        message: message.to_string(),
    };
    let parts: Vec<&str> = url.split('/').collect();
    if parts.len() != 7 {
        return Err(invalid(
            "expected https://github.com/<org>/<repo>/pull/<number>",
        ));
    }
    if parts[5] != "pull" {
        return Err(invalid("not a pull request URL"));
    }
    let (number, params) = split_query(url, parts[6])?;
    if number.is_empty() || !number.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid("pull request number is not numeric"));
    }
    if parts[3].is_empty() || parts[4].is_empty() {
        return Err(invalid("missing organization or repository"));
    }
    Ok(PullUrl {
        org: parts[3].to_string(),
        repo: parts[4].to_string(),
        number: number.to_string(),
        subdir: params.get("subdir").cloned(),
    })
}

pub(super) fn resolve(resolver: &Resolver, url: &str, workspace: &Path) -> Result<Resolved> {
    let pull = parse_url(url)?;
    let api_url = format!(
        "{}/repos/{}/{}/pulls/{}",
        resolver.config().github_api_url,
        pull.org,
        pull.repo,
        pull.number
    );

    let mut headers = vec![("Accept", "application/vnd.github.v3+json".to_string())];
    if let Some(token) = &resolver.config().github_token {
        info!("Using GitHub token");
        headers.push(("Authorization", format!("Bearer {}", token)));
    }
    let pr: PullRequest = resolver.get_json(&api_url, &headers, None)?;

    let clone_url = |side: &Side, which: &str| {
        side.repo
            .as_ref()
            .map(|r| r.clone_url.clone())
            .ok_or_else(|| Error::RemoteApi {
                url: api_url.clone(),
                message: format!("{} repository is gone", which),
            })
    };
    let reference = DependencyReference {
        description: pr.body.clone(),
        fork_url: clone_url(&pr.head, "head")?,
        branch: pr.head.ref_name.clone(),
        main_url: clone_url(&pr.base, "base")?,
        main_branch: pr.base.ref_name.clone(),
        merged: pr.merged,
        ..Default::default()
    }
    .with_location(checkout_dir(workspace, &pull.repo)?, pull.subdir);

    Ok(Resolved {
        url: url.to_string(),
        kind: ChangeKind::GitHub,
        repo_name: pull.repo,
        reference,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::http::testing::StubClient;
    use std::path::PathBuf;
    use std::rc::Rc;

    const PR_42: &str = r#"{
        "number": 42,
        "body": "Make the widget spin.",
        "merged": false,
        "head": {"ref": "spin", "repo": {"clone_url": "https://github.com/fork/widget.git"}},
        "base": {"ref": "main", "repo": {"clone_url": "https://github.com/acme/widget.git"}}
    }"#;

    fn resolver(client: StubClient, token: Option<&str>) -> Resolver {
        let config = Config {
            github_token: token.map(str::to_string),
            github_api_url: "https://api.github.com".to_string(),
            ..Default::default()
        };
        Resolver::new(Box::new(client), config)
    }

    #[test]
    fn test_parse_url_with_query() {
        let pull = parse_url("https://github.com/acme/widget/pull/42?subdir=lib&x=y").unwrap();
        assert_eq!(
            pull,
            PullUrl {
                org: "acme".to_string(),
                repo: "widget".to_string(),
                number: "42".to_string(),
                subdir: Some("lib".to_string()),
            }
        );
    }

    #[test]
    fn test_parse_url_wrong_segment_count() {
        for url in [
            "https://github.com/acme/widget/pull",
            "https://github.com/acme/widget/pull/42/files",
            "https://github.com/acme/widget/pull/42/",
        ] {
            let err = parse_url(url).unwrap_err();
            assert!(matches!(err, Error::InvalidUrl { .. }), "{url}");
        }
    }

    #[test]
    fn test_parse_url_not_a_pull() {
        let err = parse_url("https://github.com/acme/widget/issues/42").unwrap_err();
        assert!(err.to_string().contains("not a pull request"));
    }

    #[test]
    fn test_parse_url_non_numeric() {
        assert!(parse_url("https://github.com/acme/widget/pull/abc").is_err());
    }

    #[test]
    fn test_resolve_with_subdir() {
        let client = StubClient::new().route(
            "https://api.github.com/repos/acme/widget/pulls/42",
            200,
            PR_42,
        );
        let resolved = resolver(client, None)
            .resolve(
                "https://github.com/acme/widget/pull/42?subdir=lib",
                Path::new("/ws"),
            )
            .unwrap();

        assert_eq!(resolved.kind, ChangeKind::GitHub);
        assert_eq!(resolved.repo_name, "widget");
        let reference = resolved.reference;
        assert_eq!(reference.subdir.as_deref(), Some("lib"));
        assert_eq!(reference.top_dir, PathBuf::from("/ws/widget"));
        assert_eq!(reference.path, PathBuf::from("/ws/widget/lib"));
        assert_eq!(reference.fork_url, "https://github.com/fork/widget.git");
        assert_eq!(reference.branch, "spin");
        assert_eq!(reference.main_url, "https://github.com/acme/widget.git");
        assert_eq!(reference.main_branch, "main");
        assert_eq!(reference.description.as_deref(), Some("Make the widget spin."));
        assert!(!reference.merged);
    }

    #[test]
    fn test_resolve_sends_bearer_token() {
        let api = "https://api.github.com/repos/acme/widget/pulls/42";
        let client = Rc::new(StubClient::new().route(api, 200, PR_42));
        let config = Config {
            github_token: Some("ghp_secret".to_string()),
            github_api_url: "https://api.github.com".to_string(),
            ..Default::default()
        };
        Resolver::new(Box::new(client.clone()), config)
            .resolve("https://github.com/acme/widget/pull/42", Path::new("/ws"))
            .unwrap();
        assert_eq!(
            client.header_for(api, "Authorization").as_deref(),
            Some("Bearer ghp_secret")
        );
        assert_eq!(
            client.header_for(api, "Accept").as_deref(),
            Some("application/vnd.github.v3+json")
        );
    }

    #[test]
    fn test_resolve_without_token_has_no_authorization() {
        let api = "https://api.github.com/repos/acme/widget/pulls/42";
        let client = Rc::new(StubClient::new().route(api, 200, PR_42));
        let config = Config::from_lookup(|_| None);
        Resolver::new(Box::new(client.clone()), config)
            .resolve("https://github.com/acme/widget/pull/42", Path::new("/ws"))
            .unwrap();
        assert_eq!(client.requests.borrow().len(), 1);
        assert_eq!(client.header_for(api, "Authorization"), None);
    }

    #[test]
    fn test_resolve_not_found_is_remote_error() {
        let err = resolver(StubClient::new(), None)
            .resolve("https://github.com/acme/widget/pull/1", Path::new("/ws"))
            .unwrap_err();
        match err {
            Error::RemoteApi { url, message } => {
                assert!(url.ends_with("/repos/acme/widget/pulls/1"));
                assert!(message.contains("404"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_resolve_deleted_fork() {
        let body = r#"{"body": null, "merged": false,
            "head": {"ref": "x", "repo": null},
            "base": {"ref": "main", "repo": {"clone_url": "https://github.com/acme/widget.git"}}}"#;
        let client = StubClient::new().route(
            "https://api.github.com/repos/acme/widget/pulls/3",
            200,
            body,
        );
        let err = resolver(client, None)
            .resolve("https://github.com/acme/widget/pull/3", Path::new("/ws"))
            .unwrap_err();
        assert!(err.to_string().contains("head repository is gone"));
    }
}
