//! Rust crates (`Cargo.toml`).
//!
//! Local crates are wired in through `[patch.crates-io]`, which applies to
//! the whole dependency graph, so every resolved crate gets an entry whether
//! the project depends on it directly or not. Crate names are read with
//! `cargo metadata` rather than by parsing the checkout's manifest, which
//! keeps workspace inheritance and renamed packages cargo's business.

use std::collections::BTreeSet;
use std::path::Path;

use log::{info, warn};
use serde::Deserialize;

use super::{index_by_package, PatchContext, Patcher};
use crate::error::{Error, Result};
use crate::exec::run_tool;
use crate::filesystem::{read_optional, write_atomic};
use crate::reference::{DependencyMap, DependencyReference};

const CARGO_TOML: &str = "Cargo.toml";
const PATCH_HEADER: &str = "[patch.crates-io]";

#[derive(Debug, Deserialize)]
struct Metadata {
    packages: Vec<MetadataPackage>,
}

#[derive(Debug, Deserialize)]
struct MetadataPackage {
    name: String,
    manifest_path: String,
}

/// Crates that already appear under `[patch.crates-io]`.
fn patched_crates(manifest: &toml::Value) -> BTreeSet<String> {
    manifest
        .get("patch")
        .and_then(|patch| patch.get("crates-io"))
        .and_then(toml::Value::as_table)
        .map(|table| table.keys().cloned().collect())
        .unwrap_or_default()
}

fn patch_line(name: &str, reference: &DependencyReference, container_mode: bool) -> String {
    if container_mode {
        format!(
            "{} = {{ git = \"{}\", branch = \"{}\" }}",
            name, reference.fork_url, reference.branch
        )
    } else {
        format!("{} = {{ path = \"{}\" }}", name, reference.path.display())
    }
}

/// Whether `line` opens the `[patch.crates-io]` table, in any quoting and
/// with an optional trailing comment.
fn is_patch_header(line: &str) -> bool {
    let line = line.split('#').next().unwrap_or_default().trim();
    let Some(inner) = line
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .filter(|inner| !inner.starts_with('['))
    else {
        return false;
    };
    let keys: Vec<&str> = inner
        .split('.')
        .map(|key| key.trim().trim_matches(|c| c == '"' || c == '\''))
        .collect();
    keys == ["patch", "crates-io"]
}

/// Insert `entries` at the end of the `[patch.crates-io]` table, creating
/// the table at the end of the file when there is none.
pub fn insert_patch_entries(content: &str, entries: &[String]) -> String {
    let lines: Vec<&str> = content.split_inclusive('\n').collect();
    let header = lines.iter().position(|line| is_patch_header(line));

    let Some(header) = header else {
        let mut output = content.to_string();
        if !output.is_empty() && !output.ends_with('\n') {
            output.push('\n');
        }
        output.push('\n');
        output.push_str(PATCH_HEADER);
        output.push('\n');
        for entry in entries {
            output.push_str(entry);
            output.push('\n');
        }
        return output;
    };

    // last non-blank line before the next table header
    let table_end = lines[header + 1..]
        .iter()
        .position(|line| line.trim_start().starts_with('['))
        .map_or(lines.len(), |offset| header + 1 + offset);
    let insert_at = (header + 1..table_end)
        .rev()
        .find(|&idx| !lines[idx].trim().is_empty())
        .map_or(header + 1, |idx| idx + 1);

    let mut output = String::with_capacity(content.len());
    for (idx, line) in lines.iter().enumerate() {
        if idx == insert_at {
            for entry in entries {
                output.push_str(entry);
                output.push('\n');
            }
        }
        output.push_str(line);
        if idx + 1 == insert_at && !line.ends_with('\n') {
            output.push('\n');
        }
    }
    if insert_at == lines.len() {
        if !output.ends_with('\n') {
            output.push('\n');
        }
        for entry in entries {
            output.push_str(entry);
            output.push('\n');
        }
    }
    output
}

pub struct RustPatcher;

impl Patcher for RustPatcher {
    fn ecosystem(&self) -> &'static str {
        "rust"
    }

    fn package_name(&self, checkout: &Path, ctx: &PatchContext<'_>) -> Result<Option<String>> {
        if !checkout.join(CARGO_TOML).exists() {
            return Ok(None);
        }
        let args: Vec<String> = ["metadata", "--no-deps", "--format-version", "1"]
            .iter()
            .map(|a| a.to_string())
            .collect();
        let output = run_tool(ctx.runner, "cargo", &args, checkout)?;
        let metadata: Metadata =
            serde_json::from_str(&output.stdout).map_err(|e| Error::ManifestParse {
                path: checkout.join(CARGO_TOML).display().to_string(),
                message: format!("unexpected cargo metadata output: {}", e),
            })?;

        let root_manifest = checkout.join(CARGO_TOML);
        let root = metadata
            .packages
            .iter()
            .find(|package| Path::new(&package.manifest_path) == root_manifest);
        match (root, metadata.packages.as_slice()) {
            (Some(package), _) => Ok(Some(package.name.clone())),
            (None, [only]) => Ok(Some(only.name.clone())),
            (None, _) => {
                warn!(
                    "{} is a workspace without a root package, not patching it",
                    checkout.display()
                );
                Ok(None)
            }
        }
    }

    fn patch(
        &self,
        project_dir: &Path,
        deps: &DependencyMap,
        ctx: &PatchContext<'_>,
    ) -> Result<bool> {
        let cargo_path = project_dir.join(CARGO_TOML);
        let Some(content) = read_optional(&cargo_path)? else {
            return Ok(false);
        };
        info!("Processing {}", cargo_path.display());
        let manifest: toml::Value = toml::from_str(&content).map_err(|e| Error::ManifestParse {
            path: cargo_path.display().to_string(),
            message: e.to_string(),
        })?;
        let already_patched = patched_crates(&manifest);

        let crates = index_by_package(self, deps, ctx)?;
        let mut entries = Vec::new();
        for (name, reference) in &crates {
            if already_patched.contains(name) {
                warn!("{} is already patched in {}, skipping", name, cargo_path.display());
                continue;
            }
            let line = patch_line(name, reference, ctx.container_mode);
            info!("Patching '{}' crate in '{}': {}", name, cargo_path.display(), line);
            entries.push(line);
        }
        if entries.is_empty() {
            return Ok(false);
        }

        write_atomic(&cargo_path, &insert_patch_entries(&content, &entries))?;
        Ok(true)
    }
}
