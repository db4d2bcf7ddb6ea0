//! Python projects (`pyproject.toml`, `requirements.txt`).
//!
//! `pyproject.toml` is authoritative when both files exist: the
//! requirements file is only considered when the pyproject rewrite changed
//! nothing. Both files are edited line by line so comments and layout
//! survive.
//!
//! Package names are compared after PEP 503 normalization, so `Foo_Bar`,
//! `foo-bar` and `foo.bar` all designate the same distribution.

use std::path::Path;
use std::sync::OnceLock;

use log::{debug, info};
use regex::Regex;

use super::{index_by_package, PatchContext, Patcher};
use crate::error::{Error, Result};
use crate::filesystem::{read_optional, write_atomic};
use crate::reference::{DependencyMap, DependencyReference};

const PYPROJECT: &str = "pyproject.toml";
const REQUIREMENTS: &str = "requirements.txt";
const SETUP_PY: &str = "setup.py";

fn setup_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"^\s*name\s*=\s*['"](.*?)['"]\s*,"#).expect("valid regex"))
}

fn pyproject_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"^\s*name\s*=\s*['"](.*?)['"]"#).expect("valid regex"))
}

fn table_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*\[+\s*([^\]]+?)\s*\]+").expect("valid regex"))
}

fn key_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^\s*["']?([A-Za-z0-9][A-Za-z0-9._-]*)["']?\s*="#).expect("valid regex")
    })
}

fn requirement_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*([A-Za-z0-9][A-Za-z0-9._-]*)").expect("valid regex"))
}

fn separator_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[-_.]+").expect("valid regex"))
}

/// PEP 503 normalized form of a distribution name.
pub fn normalize(name: &str) -> String {
    separator_re().replace_all(name, "-").to_lowercase()
}

/// Name passed to `setup(name="...",)` in a `setup.py`.
pub fn setup_py_name(content: &str) -> Option<String> {
    content
        .lines()
        .find_map(|line| setup_name_re().captures(line))
        .map(|caps| caps[1].to_string())
}

/// Project name of a `pyproject.toml`, from its `[project]` or
/// `[tool.poetry]` table.
pub fn pyproject_name(content: &str) -> Option<String> {
    let mut table = String::new();
    for line in content.lines() {
        if let Some(caps) = table_re().captures(line) {
            table = caps[1].to_string();
            continue;
        }
        if table != "project" && table != "tool.poetry" {
            continue;
        }
        if let Some(caps) = pyproject_name_re().captures(line) {
            return Some(caps[1].to_string());
        }
    }
    None
}

/// Split `content` into lines, keeping each line ending attached.
fn split_lines(content: &str) -> Vec<&str> {
    content.split_inclusive('\n').collect()
}

/// Line ending of `line`, so replacements keep CRLF files intact.
fn ending(line: &str) -> &'static str {
    if line.ends_with("\r\n") {
        "\r\n"
    } else if line.ends_with('\n') {
        "\n"
    } else {
        ""
    }
}

fn pyproject_entry(name: &str, reference: &DependencyReference, container_mode: bool) -> String {
    if container_mode {
        let mut entry = format!(
            "{} = {{ git = \"{}\", branch = \"{}\"",
            name, reference.fork_url, reference.branch
        );
        if let Some(subdir) = &reference.subdir {
            entry.push_str(&format!(", subdirectory = \"{}\"", subdir));
        }
        entry.push_str(" }");
        entry
    } else {
        format!("{} = {{ path = \"{}\" }}", name, reference.path.display())
    }
}

fn requirement_entry(name: &str, reference: &DependencyReference, container_mode: bool) -> String {
    if container_mode {
        let mut entry = format!("{} @ git+{}@{}", name, reference.fork_url, reference.branch);
        if let Some(subdir) = &reference.subdir {
            entry.push_str(&format!("#egg=subdir&subdirectory={}", subdir));
        }
        entry
    } else {
        format!("-e {}", reference.path.display())
    }
}

/// Rewrite dependency keys inside `*dependencies` tables of a pyproject.
///
/// Returns the new content and the number of substituted entries.
pub fn rewrite_pyproject(
    content: &str,
    packages: &DependencyMap,
    container_mode: bool,
) -> (String, usize) {
    let mut table = String::new();
    let mut count = 0;
    let mut output = String::with_capacity(content.len());
    for line in split_lines(content) {
        if let Some(caps) = table_re().captures(line) {
            table = caps[1].to_string();
            output.push_str(line);
            continue;
        }
        let in_dependencies = table.ends_with("dependencies");
        let replacement = key_re()
            .captures(line)
            .filter(|_| in_dependencies)
            .and_then(|caps| {
                let name = caps[1].to_string();
                packages
                    .get(&normalize(&name))
                    .map(|reference| pyproject_entry(&name, reference, container_mode))
            });
        match replacement {
            Some(entry) if entry != line.trim_end() => {
                info!("Replacing {} in {}", entry, PYPROJECT);
                output.push_str(&entry);
                output.push_str(ending(line));
                count += 1;
            }
            _ => output.push_str(line),
        }
    }
    (output, count)
}

/// Rewrite requirement lines of a `requirements.txt` by their leading name.
pub fn rewrite_requirements(
    content: &str,
    packages: &DependencyMap,
    container_mode: bool,
) -> (String, usize) {
    let mut count = 0;
    let mut output = String::with_capacity(content.len());
    for line in split_lines(content) {
        let replacement = requirement_re().captures(line).and_then(|caps| {
            let name = caps[1].to_string();
            packages
                .get(&normalize(&name))
                .map(|reference| requirement_entry(&name, reference, container_mode))
        });
        match replacement {
            Some(entry) if entry != line.trim_end() => {
                info!("Replacing {} in {}", entry, REQUIREMENTS);
                output.push_str(&entry);
                output.push_str(ending(line));
                count += 1;
            }
            _ => output.push_str(line),
        }
    }
    (output, count)
}

pub struct PythonPatcher;

impl PythonPatcher {
    fn rewrite_file<F>(&self, path: &Path, packages: &DependencyMap, rewrite: F) -> Result<bool>
    where
        F: Fn(&str, &DependencyMap) -> (String, usize),
    {
        let Some(content) = read_optional(path)? else {
            return Ok(false);
        };
        info!("Processing {}", path.display());
        let (updated, count) = rewrite(&content, packages);
        if count == 0 {
            return Ok(false);
        }
        write_atomic(path, &updated)?;
        Ok(true)
    }
}

impl Patcher for PythonPatcher {
    fn ecosystem(&self) -> &'static str {
        "python"
    }

    fn package_name(&self, checkout: &Path, _ctx: &PatchContext<'_>) -> Result<Option<String>> {
        if let Some(name) = read_optional(&checkout.join(SETUP_PY))?
            .as_deref()
            .and_then(setup_py_name)
        {
            return Ok(Some(normalize(&name)));
        }
        Ok(read_optional(&checkout.join(PYPROJECT))?
            .as_deref()
            .and_then(pyproject_name)
            .map(|name| normalize(&name)))
    }

    fn patch(
        &self,
        project_dir: &Path,
        deps: &DependencyMap,
        ctx: &PatchContext<'_>,
    ) -> Result<bool> {
        let pyproject = project_dir.join(PYPROJECT);
        let requirements = project_dir.join(REQUIREMENTS);
        if !pyproject.exists() && !requirements.exists() {
            return Ok(false);
        }
        if let Some(content) = read_optional(&pyproject)? {
            toml::from_str::<toml::Value>(&content).map_err(|e| Error::ManifestParse {
                path: pyproject.display().to_string(),
                message: e.to_string(),
            })?;
        }

        let packages = index_by_package(self, deps, ctx)?;
        debug!("python packages: {:?}", packages.keys().collect::<Vec<_>>());
        let container_mode = ctx.container_mode;

        let changed = self.rewrite_file(&pyproject, &packages, |content, packages| {
            rewrite_pyproject(content, packages, container_mode)
        })?;
        if changed {
            return Ok(true);
        }
        self.rewrite_file(&requirements, &packages, |content, packages| {
            rewrite_requirements(content, packages, container_mode)
        })
    }
}
