//! Go modules (`go.mod`).
//!
//! Only direct requirements are considered: `// indirect` entries are
//! managed by the toolchain and are never replaced. Modules that already
//! carry a `replace` directive are left alone.
//!
//! When the `go` toolchain is available the rewrite is delegated to
//! `go mod edit -replace` followed by `go mod tidy`, which also refreshes
//! `go.sum`. Without it, `replace` lines are appended to `go.mod` directly.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::OnceLock;

use log::{info, warn};
use regex::Regex;

use super::{index_by_package, PatchContext, Patcher};
use crate::error::{Error, Result};
use crate::exec::run_tool;
use crate::filesystem::{read_optional, write_atomic};
use crate::reference::{DependencyMap, DependencyReference};

const GO_MOD: &str = "go.mod";

fn module_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^module\s+(\S+)").expect("valid regex"))
}

fn require_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^require\s+(\S+)\s+(\S+)(.*)$").expect("valid regex"))
}

fn block_entry_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\S+)\s+(\S+)(.*)$").expect("valid regex"))
}

fn is_indirect(rest: &str) -> bool {
    rest.trim_start()
        .strip_prefix("//")
        .is_some_and(|comment| comment.trim_start().starts_with("indirect"))
}

/// Module path declared by a `go.mod` file.
pub fn module_name(content: &str) -> Option<String> {
    content
        .lines()
        .find_map(|line| module_re().captures(line.trim()))
        .map(|caps| caps[1].trim_matches('"').to_string())
}

/// Direct requirements of a `go.mod` file, in declaration order.
pub fn direct_requirements(content: &str) -> Vec<String> {
    let mut modules = Vec::new();
    let mut in_block = false;
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with("//") {
            continue;
        }
        if in_block {
            if line == ")" {
                in_block = false;
            } else if let Some(caps) = block_entry_re().captures(line) {
                if !is_indirect(&caps[3]) {
                    modules.push(caps[1].to_string());
                }
            }
            continue;
        }
        if line.starts_with("require (") || line == "require(" {
            in_block = true;
            continue;
        }
        if let Some(caps) = require_line_re().captures(line) {
            if !is_indirect(&caps[3]) {
                modules.push(caps[1].to_string());
            }
        }
    }
    modules
}

/// Modules that already have a `replace` directive.
pub fn replaced_modules(content: &str) -> BTreeSet<String> {
    let mut replaced = BTreeSet::new();
    let mut in_block = false;
    for line in content.lines() {
        let line = line.trim();
        if in_block {
            if line == ")" {
                in_block = false;
            } else if let Some(module) = line.split_whitespace().next() {
                if line.contains("=>") && !module.starts_with("//") {
                    replaced.insert(module.to_string());
                }
            }
            continue;
        }
        if line.starts_with("replace (") || line == "replace(" {
            in_block = true;
        } else if let Some(rest) = line.strip_prefix("replace ") {
            if let Some(module) = rest.split_whitespace().next() {
                replaced.insert(module.to_string());
            }
        }
    }
    replaced
}

/// Replacement target of `reference` as `(path, version)`.
///
/// Plain mode points at the checkout; container mode at the fork, written
/// as a module path (no scheme, no `.git`) at the change branch.
fn replacement(reference: &DependencyReference, container_mode: bool) -> (String, Option<String>) {
    if container_mode {
        let fork = reference
            .fork_url
            .strip_prefix("https://")
            .unwrap_or(&reference.fork_url);
        let fork = fork.strip_suffix(".git").unwrap_or(fork);
        (fork.to_string(), Some(reference.branch.clone()))
    } else {
        (reference.path.display().to_string(), None)
    }
}

pub struct GoPatcher;

impl GoPatcher {
    fn has_toolchain(&self, project_dir: &Path, ctx: &PatchContext<'_>) -> bool {
        match ctx.runner.run("go", &["version".to_string()], project_dir) {
            Ok(output) => output.success(),
            Err(_) => false,
        }
    }
}

impl Patcher for GoPatcher {
    fn ecosystem(&self) -> &'static str {
        "go"
    }

    fn package_name(&self, checkout: &Path, _ctx: &PatchContext<'_>) -> Result<Option<String>> {
        Ok(read_optional(&checkout.join(GO_MOD))?.and_then(|content| module_name(&content)))
    }

    fn patch(
        &self,
        project_dir: &Path,
        deps: &DependencyMap,
        ctx: &PatchContext<'_>,
    ) -> Result<bool> {
        let go_mod = project_dir.join(GO_MOD);
        let Some(content) = read_optional(&go_mod)? else {
            return Ok(false);
        };
        info!("Processing {}", go_mod.display());

        let requirements = direct_requirements(&content);
        if requirements.is_empty() {
            return Err(Error::NoModulesFound {
                path: go_mod.display().to_string(),
            });
        }
        let already_replaced = replaced_modules(&content);
        let packages = index_by_package(self, deps, ctx)?;

        let mut replacements = Vec::new();
        for module in &requirements {
            let Some(reference) = packages.get(module) else {
                continue;
            };
            if already_replaced.contains(module) {
                warn!("{} already has a replace directive, skipping", module);
                continue;
            }
            let (target, version) = replacement(reference, ctx.container_mode);
            info!(
                "Adding replace directive in go.mod for {} => {}{}",
                module,
                target,
                version.as_deref().map(|v| format!(" {}", v)).unwrap_or_default()
            );
            replacements.push((module.clone(), target, version));
        }
        if replacements.is_empty() {
            return Ok(false);
        }

        if self.has_toolchain(project_dir, ctx) {
            for (module, target, version) in &replacements {
                let spec = match version {
                    Some(v) => format!("{}={}@{}", module, target, v),
                    None => format!("{}={}", module, target),
                };
                run_tool(
                    ctx.runner,
                    "go",
                    &["mod".to_string(), "edit".to_string(), "-replace".to_string(), spec],
                    project_dir,
                )?;
            }
            run_tool(
                ctx.runner,
                "go",
                &["mod".to_string(), "tidy".to_string()],
                project_dir,
            )?;
        } else {
            warn!("go toolchain not found, writing replace directives directly");
            let mut updated = content;
            if !updated.is_empty() && !updated.ends_with('\n') {
                updated.push('\n');
            }
            updated.push('\n');
            for (module, target, version) in &replacements {
                match version {
                    Some(v) => updated.push_str(&format!("replace {} => {} {}\n", module, target, v)),
                    None => updated.push_str(&format!("replace {} => {}\n", module, target)),
                }
            }
            write_atomic(&go_mod, &updated)?;
        }
        Ok(true)
    }
}
