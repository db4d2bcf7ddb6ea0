//! Ansible collections (`requirements.yml`).
//!
//! A checkout is a collection when its `galaxy.yml` names a `namespace` and
//! a `name`. The first matching entry of the project's `collections` list,
//! written either as a bare string or as a mapping with a `name` key, is
//! replaced by a local `dir` source or, in container mode, a `git` source.

use std::path::Path;

use log::info;
use serde_yaml::{Mapping, Value};

use super::{index_by_package, PatchContext, Patcher};
use crate::error::{Error, Result};
use crate::filesystem::{read_optional, write_atomic};
use crate::reference::{DependencyMap, DependencyReference};

const REQUIREMENTS_YML: &str = "requirements.yml";
const GALAXY_YML: &str = "galaxy.yml";

fn parse_yaml(path: &Path, content: &str) -> Result<Value> {
    serde_yaml::from_str(content).map_err(|e| Error::ManifestParse {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// `namespace.name` of the collection in `repo_dir`, from its `galaxy.yml`.
pub fn get_collection_name(repo_dir: &Path) -> Result<Option<String>> {
    let path = repo_dir.join(GALAXY_YML);
    let Some(content) = read_optional(&path)? else {
        return Ok(None);
    };
    let galaxy = parse_yaml(&path, &content)?;
    let field = |key: &str| galaxy.get(key).and_then(Value::as_str);
    Ok(match (field("namespace"), field("name")) {
        (Some(namespace), Some(name)) => Some(format!("{}.{}", namespace, name)),
        _ => None,
    })
}

fn entry(pairs: [(&str, &str); 3]) -> Value {
    let mut map = Mapping::new();
    for (key, value) in pairs {
        map.insert(Value::from(key), Value::from(value));
    }
    Value::Mapping(map)
}

/// Substitute the first `collections` entry named `collection_name`.
///
/// Returns the number of substituted entries (0 or 1). A missing name, a
/// document without `collections` or an entry that is already substituted
/// is a no-op.
pub fn substitute_collection(
    collection_name: Option<&str>,
    reference: &DependencyReference,
    requirements: &mut Value,
    container_mode: bool,
) -> usize {
    let Some(collection_name) = collection_name else {
        return 0;
    };
    let Some(collections) = requirements
        .get_mut("collections")
        .and_then(Value::as_sequence_mut)
    else {
        return 0;
    };
    let position = collections.iter().position(|item| {
        item.as_str() == Some(collection_name)
            || item.get("name").and_then(Value::as_str) == Some(collection_name)
    });
    let Some(idx) = position else {
        return 0;
    };

    let path = reference.path.display().to_string();
    let replacement = if container_mode {
        entry([
            ("name", reference.fork_url.as_str()),
            ("version", reference.branch.as_str()),
            ("type", "git"),
        ])
    } else {
        entry([("name", collection_name), ("source", path.as_str()), ("type", "dir")])
    };
    if collections[idx] == replacement {
        return 0;
    }
    collections[idx] = replacement;
    info!(
        "Substituted {} in {}",
        serde_yaml::to_string(&collections[idx])
            .unwrap_or_default()
            .trim_end()
            .replace('\n', ", "),
        REQUIREMENTS_YML
    );
    1
}

pub struct AnsiblePatcher;

impl Patcher for AnsiblePatcher {
    fn ecosystem(&self) -> &'static str {
        "ansible"
    }

    fn package_name(&self, checkout: &Path, _ctx: &PatchContext<'_>) -> Result<Option<String>> {
        get_collection_name(checkout)
    }

    fn patch(
        &self,
        project_dir: &Path,
        deps: &DependencyMap,
        ctx: &PatchContext<'_>,
    ) -> Result<bool> {
        let path = project_dir.join(REQUIREMENTS_YML);
        let Some(content) = read_optional(&path)? else {
            return Ok(false);
        };
        info!("Processing {}", path.display());
        let mut requirements = parse_yaml(&path, &content)?;

        let collections = index_by_package(self, deps, ctx)?;
        let mut count = 0;
        for (name, reference) in &collections {
            count += substitute_collection(Some(name), reference, &mut requirements, ctx.container_mode);
        }
        if count == 0 {
            return Ok(false);
        }
        write_atomic(&path, &serde_yaml::to_string(&requirements)?)?;
        Ok(true)
    }
}
