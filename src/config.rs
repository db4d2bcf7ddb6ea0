//! # Runtime Configuration
//!
//! Credentials and API endpoints are read once from the environment at
//! startup. The lookup function is injectable so tests never depend on the
//! process environment.
//!
//! | Variable         | Purpose                                              |
//! |------------------|------------------------------------------------------|
//! | `GITHUB_TOKEN`   | Bearer token for the GitHub REST API                 |
//! | `GITHUB_API_URL` | GitHub API root (GitHub Enterprise), default public  |
//! | `GITLAB_TOKEN`   | Bearer token for the GitLab API and clone URLs       |
//! | `GITLAB_USER`    | User name paired with `GITLAB_TOKEN` in clone URLs   |

use url::Url;

use crate::defaults::{
    GITHUB_API_URL, GITHUB_API_URL_ENV, GITHUB_TOKEN_ENV, GITLAB_TOKEN_ENV, GITLAB_USER_ENV,
};
use crate::redact::Redactor;

/// Settings shared by the resolver and the materializer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub github_token: Option<String>,
    pub github_api_url: String,
    pub gitlab_token: Option<String>,
    pub gitlab_user: Option<String>,
}

impl Config {
    /// Build the configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            github_token: get(GITHUB_TOKEN_ENV),
            github_api_url: get(GITHUB_API_URL_ENV)
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| GITHUB_API_URL.to_string()),
            gitlab_token: get(GITLAB_TOKEN_ENV),
            gitlab_user: get(GITLAB_USER_ENV),
        }
    }

    /// Build the redaction context covering every secret in this config.
    pub fn redactor(&self) -> Redactor {
        Redactor::new(
            [self.github_token.as_deref(), self.gitlab_token.as_deref()]
                .into_iter()
                .flatten(),
        )
    }

    /// Return `url` with GitLab credentials injected into the authority,
    /// as `user:token@host` or `token@host`.
    ///
    /// Only URLs whose host contains `gitlab` are touched, and only when a
    /// GitLab token is configured. Anything that does not parse is returned
    /// unchanged.
    pub fn authenticated_clone_url(&self, url: &str) -> String {
        let Some(token) = self.gitlab_token.as_deref() else {
            return url.to_string();
        };
        let Ok(mut parsed) = Url::parse(url) else {
            return url.to_string();
        };
        if !parsed.host_str().is_some_and(|h| h.contains("gitlab")) {
            return url.to_string();
        }
        let applied = match self.gitlab_user.as_deref() {
            Some(user) => parsed
                .set_username(user)
                .and_then(|_| parsed.set_password(Some(token))),
            None => parsed.set_username(token),
        };
        match applied {
            Ok(()) => parsed.to_string(),
            Err(()) => url.to_string(),
        }
    }
}
