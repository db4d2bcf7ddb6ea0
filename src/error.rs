//! # Error Handling
//!
//! This module defines the centralized error type for `depends-on`. It uses
//! the `thiserror` library to describe every failure mode of the pipeline
//! with enough context for an operator reading CI logs.
//!
//! ## Key Components
//!
//! - **`Error`**: The enum of all failures. The first variants map one to one
//!   onto the pipeline stages (URL parsing, remote API, version control,
//!   manifest parsing); the rest wrap library errors with `#[from]`.
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`.
//!
//! Only `ManifestParse` is recoverable at the pipeline level: the failing
//! ecosystem is reported and the other patchers still run. Every other
//! variant aborts the run.

use thiserror::Error;

/// Main error type for depends-on operations
#[derive(Error, Debug)]
pub enum Error {
    /// A `Depends-On` URL does not match any of the recognized shapes.
    #[error("Invalid Depends-On URL {url}: {message}")]
    InvalidUrl { url: String, message: String },

    /// A GitHub, GitLab or Gerrit API call failed or returned an
    /// unexpected payload.
    #[error("Remote API error for {url}: {message}")]
    RemoteApi { url: String, message: String },

    /// A version-control command exited non-zero or could not be started.
    ///
    /// The command line is redacted before it is stored here.
    #[error("Git command failed ({}): {command}{}", describe_status(status), describe_stderr(stderr))]
    VcsCommand {
        command: String,
        status: Option<i32>,
        stderr: String,
    },

    /// A package-manager command (`go`, `cargo`) failed.
    #[error("Command failed: {command} - {message}")]
    ToolCommand { command: String, message: String },

    /// A manifest exists but cannot be parsed.
    #[error("Cannot parse manifest {path}: {message}")]
    ManifestParse { path: String, message: String },

    /// A `go.mod` file declares no direct requirement at all.
    #[error("No Go modules found in {path}")]
    NoModulesFound { path: String },

    /// The `depends-on.json` sidecar is missing or malformed.
    #[error("Sidecar error for {path}: {message}")]
    Sidecar { path: String, message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON error, wrapped from `serde_json::Error`.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A YAML error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A TOML error, wrapped from `toml::de::Error`.
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A regular expression error, wrapped from `regex::Error`.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// A glob pattern error, wrapped from `glob::PatternError`.
    #[error("Glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),

    /// A URL parsing error, wrapped from `url::ParseError`.
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// A transport-level HTTP error, wrapped from `reqwest::Error`.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

fn describe_status(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("exit code {}", code),
        None => "no exit code".to_string(),
    }
}

fn describe_stderr(stderr: &str) -> String {
    if stderr.trim().is_empty() {
        String::new()
    } else {
        format!(" - {}", stderr.trim_end())
    }
}

impl Error {
    /// True for errors that only disqualify a single manifest patcher.
    pub fn is_manifest_local(&self) -> bool {
        matches!(self, Error::ManifestParse { .. })
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
