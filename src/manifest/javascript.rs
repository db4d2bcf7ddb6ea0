//! Node packages (`package.json`).
//!
//! Both `dependencies` and `devDependencies` are rewritten. A checkout that
//! is itself a workspace root (`workspaces.packages`, or a bare `workspaces`
//! array) also provides every package found under its workspace globs.
//!
//! The document is edited as a `serde_json::Value` with preserved key order
//! and written back with 2-space indentation.

use std::path::Path;

use log::{debug, info, warn};
use serde_json::Value;

use super::{PatchContext, Patcher};
use crate::error::{Error, Result};
use crate::filesystem::{read_optional, write_atomic};
use crate::reference::{unmerged, DependencyMap, DependencyReference};

const PACKAGE_JSON: &str = "package.json";
const SECTIONS: [&str; 2] = ["dependencies", "devDependencies"];

fn load(path: &Path) -> Result<Option<Value>> {
    let Some(content) = read_optional(path)? else {
        return Ok(None);
    };
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| Error::ManifestParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
}

/// Workspace globs declared by a package document.
fn workspace_globs(package: &Value) -> Vec<String> {
    let list = match package.get("workspaces") {
        Some(Value::Array(list)) => list,
        Some(Value::Object(map)) => match map.get("packages") {
            Some(Value::Array(list)) => list,
            _ => return Vec::new(),
        },
        _ => return Vec::new(),
    };
    list.iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect()
}

/// Value that replaces a dependency's version range.
fn substitution(reference: &DependencyReference, container_mode: bool) -> String {
    if container_mode {
        format!("git+{}#{}", reference.fork_url, reference.branch)
    } else {
        format!("file:{}", reference.path.display())
    }
}

pub struct NodePatcher;

impl NodePatcher {
    /// Every package provided by the unmerged checkouts, workspace members
    /// included, keyed by package name.
    pub fn local_packages(&self, deps: &DependencyMap) -> Result<DependencyMap> {
        let mut packages = DependencyMap::new();
        for reference in unmerged(deps).into_values() {
            let Some(package) = load(&reference.path.join(PACKAGE_JSON))? else {
                continue;
            };
            let Some(name) = package.get("name").and_then(Value::as_str) else {
                continue;
            };
            packages.insert(name.to_string(), reference.clone());

            let globs = workspace_globs(&package);
            if !globs.is_empty() {
                debug!("{} declares workspaces {:?}", name, globs);
            }
            for pattern in globs {
                let full = reference.path.join(&pattern);
                for entry in glob::glob(&full.to_string_lossy())? {
                    let member_dir = match entry {
                        Ok(dir) => dir,
                        Err(e) => {
                            warn!("Skipping unreadable workspace entry: {}", e);
                            continue;
                        }
                    };
                    if !member_dir.is_dir() {
                        continue;
                    }
                    let Some(member) = load(&member_dir.join(PACKAGE_JSON))? else {
                        continue;
                    };
                    let Some(member_name) = member.get("name").and_then(Value::as_str) else {
                        continue;
                    };
                    let subdir = member_dir
                        .strip_prefix(&reference.path)
                        .map(|p| p.to_string_lossy().into_owned())
                        .ok();
                    debug!("found workspace package {} in {}", member_name, member_dir.display());
                    packages.insert(
                        member_name.to_string(),
                        DependencyReference {
                            path: member_dir.clone(),
                            subdir,
                            ..reference.clone()
                        },
                    );
                }
            }
        }
        Ok(packages)
    }
}

impl Patcher for NodePatcher {
    fn ecosystem(&self) -> &'static str {
        "node"
    }

    fn package_name(&self, checkout: &Path, _ctx: &PatchContext<'_>) -> Result<Option<String>> {
        Ok(load(&checkout.join(PACKAGE_JSON))?
            .and_then(|package| package.get("name").and_then(Value::as_str).map(str::to_string)))
    }

    fn patch(
        &self,
        project_dir: &Path,
        deps: &DependencyMap,
        ctx: &PatchContext<'_>,
    ) -> Result<bool> {
        let path = project_dir.join(PACKAGE_JSON);
        let Some(content) = read_optional(&path)? else {
            return Ok(false);
        };
        let mut package: Value = serde_json::from_str(&content).map_err(|e| Error::ManifestParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        info!("Processing {}", path.display());

        let packages = self.local_packages(deps)?;
        debug!("local packages: {:?}", packages.keys().collect::<Vec<_>>());

        let mut count = 0;
        for section in SECTIONS {
            let Some(Value::Object(entries)) = package.get_mut(section) else {
                continue;
            };
            for (name, value) in entries.iter_mut() {
                let Some(reference) = packages.get(name) else {
                    continue;
                };
                let target = Value::String(substitution(reference, ctx.container_mode));
                if *value != target {
                    info!("Replacing {} with {} in {}", name, target, section);
                    *value = target;
                    count += 1;
                }
            }
        }
        if count == 0 {
            return Ok(false);
        }

        let mut updated = serde_json::to_string_pretty(&package)?;
        if content.ends_with('\n') {
            updated.push('\n');
        }
        write_atomic(&path, &updated)?;
        Ok(true)
    }
}
