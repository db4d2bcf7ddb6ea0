//! # Dependency References
//!
//! A `DependencyReference` is the record of one resolved external change:
//! where its fork and base live, which branches are involved, where it was
//! checked out and whether it is already merged. It is created by the
//! resolver, written to the `depends-on.json` sidecar by the materializer and
//! read back, unchanged, by every manifest patcher.
//!
//! The sidecar keeps the historical key names (`topdir` in particular) so
//! files written by older tooling remain readable.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::defaults::SIDECAR_FILE;
use crate::error::{Error, Result};
use crate::filesystem::{read_optional, write_atomic};

/// One resolved external change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyReference {
    /// Free text of the change (PR/MR body or commit message).
    #[serde(default)]
    pub description: Option<String>,
    /// Clone URL of the source (fork) repository.
    #[serde(default)]
    pub fork_url: String,
    /// Source branch, or the change ref for Gerrit.
    #[serde(default)]
    pub branch: String,
    /// Clone URL of the target repository.
    #[serde(default)]
    pub main_url: String,
    /// Target branch the change will land on.
    #[serde(default)]
    pub main_branch: String,
    /// Absolute path of the checkout.
    #[serde(rename = "topdir", alias = "top_dir", default)]
    pub top_dir: PathBuf,
    /// `top_dir`, or `top_dir/subdir` when a subdirectory was requested.
    #[serde(default)]
    pub path: PathBuf,
    #[serde(default)]
    pub merged: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subdir: Option<String>,
}

impl DependencyReference {
    /// Set `top_dir` and derive `path` from it and `subdir`.
    pub fn with_location(mut self, top_dir: PathBuf, subdir: Option<String>) -> Self {
        self.path = match subdir.as_deref() {
            Some(sub) if !sub.is_empty() => top_dir.join(sub),
            _ => top_dir.clone(),
        };
        self.top_dir = top_dir;
        self.subdir = subdir.filter(|s| !s.is_empty());
        self
    }

    /// Path of the sidecar for a checkout rooted at `top_dir`.
    pub fn sidecar_path(top_dir: &Path) -> PathBuf {
        top_dir.join(SIDECAR_FILE)
    }

    /// Serialize to the sidecar format (2-space indented JSON).
    pub fn to_json(&self) -> Result<String> {
        let mut text = serde_json::to_string_pretty(self)?;
        text.push('\n');
        Ok(text)
    }

    /// Write the sidecar at the root of the checkout.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::sidecar_path(&self.top_dir);
        write_atomic(&path, &self.to_json()?)?;
        Ok(path)
    }

    /// Load the sidecar from a checkout directory.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = Self::sidecar_path(dir);
        let content = read_optional(&path)?.ok_or_else(|| Error::Sidecar {
            path: path.display().to_string(),
            message: "file not found".to_string(),
        })?;
        serde_json::from_str(&content).map_err(|e| Error::Sidecar {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Load only the description of a sidecar; other fields may be absent.
    pub fn load_description(dir: &Path) -> Result<Option<String>> {
        Ok(Self::load(dir)?.description)
    }
}

/// Mapping from a dependency key to its reference.
///
/// Keys are the declared URLs at resolution time and package identities
/// once a patcher has re-keyed the map.
pub type DependencyMap = BTreeMap<String, DependencyReference>;

/// Keep only the references that still need substitution.
pub fn unmerged(deps: &DependencyMap) -> DependencyMap {
    deps.iter()
        .filter(|(_, reference)| !reference.merged)
        .map(|(key, reference)| (key.clone(), reference.clone()))
        .collect()
}
