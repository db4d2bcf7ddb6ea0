//! # Manifest Patchers
//!
//! Each supported ecosystem has a `Patcher` that rewrites the project's own
//! manifest so that dependencies also under test point at their local
//! checkouts (or, in container mode, at the fork and branch of the change).
//!
//! ## Shared algorithm
//!
//! 1. Read the declared package identity of every checkout through
//!    `Patcher::package_name` and build an identity -> reference map.
//! 2. Read the project's manifest and find its declared dependencies.
//! 3. Rewrite every declared dependency that appears in the map.
//!
//! A missing manifest means "not this ecosystem" and yields `Ok(false)`.
//! A manifest that exists but cannot be parsed yields
//! `Error::ManifestParse`. Files are only rewritten when something changed,
//! and always through `filesystem::write_atomic`.
//!
//! ## Patchers
//!
//! | Module       | Manifest                                  | Identity source            |
//! |--------------|-------------------------------------------|----------------------------|
//! | `golang`     | `go.mod`                                  | `module` line of `go.mod`  |
//! | `javascript` | `package.json`                            | `name` of `package.json`   |
//! | `python`     | `pyproject.toml`, then `requirements.txt` | `setup.py`, `pyproject.toml` |
//! | `rust`       | `Cargo.toml`                              | `cargo metadata`           |
//! | `ansible`    | `requirements.yml`                        | `galaxy.yml`               |

pub mod ansible;
pub mod golang;
pub mod javascript;
pub mod python;
pub mod rust;

use std::path::Path;

use log::debug;

use crate::error::Result;
use crate::exec::CommandRunner;
use crate::reference::{unmerged, DependencyMap};

/// Shared inputs of a patch run.
pub struct PatchContext<'a> {
    /// Runs `go` and `cargo` when a patcher needs them.
    pub runner: &'a dyn CommandRunner,
    /// Point manifests at the fork URL and branch instead of a local path.
    pub container_mode: bool,
}

/// An ecosystem-specific manifest rewriter.
pub trait Patcher {
    /// Short ecosystem name used in logs and reports.
    fn ecosystem(&self) -> &'static str;

    /// The package identity declared by the checkout at `checkout`, if it is
    /// a package of this ecosystem.
    fn package_name(&self, checkout: &Path, ctx: &PatchContext<'_>) -> Result<Option<String>>;

    /// Rewrite the manifest found in `project_dir`.
    ///
    /// Returns `true` when at least one dependency was substituted.
    fn patch(
        &self,
        project_dir: &Path,
        deps: &DependencyMap,
        ctx: &PatchContext<'_>,
    ) -> Result<bool>;
}

/// Every supported patcher, in the order they run.
pub fn all_patchers() -> Vec<Box<dyn Patcher>> {
    vec![
        Box::new(golang::GoPatcher),
        Box::new(javascript::NodePatcher),
        Box::new(python::PythonPatcher),
        Box::new(rust::RustPatcher),
        Box::new(ansible::AnsiblePatcher),
    ]
}

/// Re-key the unmerged references of `deps` by the package identity each
/// checkout declares to `patcher`. Checkouts without an identity are left
/// out; when two checkouts declare the same identity the last one wins.
pub fn index_by_package(
    patcher: &dyn Patcher,
    deps: &DependencyMap,
    ctx: &PatchContext<'_>,
) -> Result<DependencyMap> {
    let mut packages = DependencyMap::new();
    for (key, reference) in unmerged(deps) {
        match patcher.package_name(&reference.path, ctx)? {
            Some(name) => {
                debug!(
                    "{}: {} provides {} at {}",
                    patcher.ecosystem(),
                    key,
                    name,
                    reference.path.display()
                );
                packages.insert(name, reference);
            }
            None => debug!("{}: {} is not a package", patcher.ecosystem(), key),
        }
    }
    Ok(packages)
}

#[cfg(test)]
pub(crate) mod testing {
    use std::fs;
    use std::path::Path;

    use crate::reference::DependencyReference;

    /// A reference whose checkout lives at `dir`.
    pub fn checkout_reference(dir: &Path, fork_url: &str, branch: &str) -> DependencyReference {
        DependencyReference {
            fork_url: fork_url.to_string(),
            branch: branch.to_string(),
            main_url: fork_url.replace("/fork/", "/acme/"),
            main_branch: "main".to_string(),
            ..Default::default()
        }
        .with_location(dir.to_path_buf(), None)
    }

    /// Write `content` to `dir/name`, creating `dir`.
    pub fn write(dir: &Path, name: &str, content: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join(name), content).unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::exec::testing::RecordingRunner;
    use crate::reference::DependencyReference;
    use tempfile::TempDir;

    #[test]
    fn test_all_patchers_cover_every_ecosystem() {
        let names: Vec<&str> = all_patchers().iter().map(|p| p.ecosystem()).collect();
        assert_eq!(names, vec!["go", "node", "python", "rust", "ansible"]);
    }

    #[test]
    fn test_index_by_package_drops_merged_and_unnamed() {
        let temp = TempDir::new().unwrap();
        let widget = temp.path().join("widget");
        let gadget = temp.path().join("gadget");
        let plain = temp.path().join("plain");
        write(&widget, "package.json", r#"{"name": "@acme/widget"}"#);
        write(&gadget, "package.json", r#"{"name": "gadget"}"#);
        fs_create(&plain);

        let mut deps = DependencyMap::new();
        deps.insert(
            "https://github.com/acme/widget/pull/1".to_string(),
            checkout_reference(&widget, "https://github.com/fork/widget.git", "w"),
        );
        deps.insert(
            "https://github.com/acme/gadget/pull/2".to_string(),
            DependencyReference {
                merged: true,
                ..checkout_reference(&gadget, "https://github.com/fork/gadget.git", "g")
            },
        );
        deps.insert(
            "https://github.com/acme/plain/pull/3".to_string(),
            checkout_reference(&plain, "https://github.com/fork/plain.git", "p"),
        );

        let runner = RecordingRunner::new();
        let ctx = PatchContext {
            runner: &runner,
            container_mode: false,
        };
        let indexed = index_by_package(&javascript::NodePatcher, &deps, &ctx).unwrap();
        assert_eq!(indexed.keys().collect::<Vec<_>>(), vec!["@acme/widget"]);
        assert_eq!(indexed["@acme/widget"].branch, "w");
    }

    fn fs_create(dir: &Path) {
        std::fs::create_dir_all(dir).unwrap();
    }
}
