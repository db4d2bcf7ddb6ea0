//! # Pipeline
//!
//! Coordinates the stages of a run:
//!
//! 1. **Description**: obtain the text of the change under test and extract
//!    its `Depends-On:` URLs and `Main-Dir:` override.
//! 2. **Resolution**: resolve every URL through its hosting system's API.
//! 3. **Materialization**: check out every dependency next to the project
//!    (skipped in check mode).
//! 4. **Patching**: when at least one dependency is still unmerged, run every
//!    manifest patcher on the project directory with the unmerged references.
//!
//! Any error aborts the run, except `Error::ManifestParse`, which only
//! disqualifies the ecosystem that raised it. Nothing is rolled back.

use std::fs;
use std::path::{Path, PathBuf};

use log::{error, info, warn};

use crate::config::Config;
use crate::description::{depends_on_urls, main_dir};
use crate::error::{Error, Result};
use crate::exec::CommandRunner;
use crate::git::Materializer;
use crate::manifest::{all_patchers, PatchContext, Patcher};
use crate::reference::{unmerged, DependencyMap, DependencyReference};
use crate::resolver::{classify, ChangeKind, Resolved, Resolver};

/// Where the description of the change under test comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptionSource {
    /// Resolve this change URL and use its description.
    ChangeUrl(String),
    /// Read the description from a file.
    File(PathBuf),
    /// Use this text directly.
    Text(String),
    /// Read the `description` field of the sidecar in this directory.
    Sidecar(PathBuf),
}

/// Description of the change under test.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Description {
    pub text: Option<String>,
    /// Hosting system of the change, when known.
    pub kind: Option<ChangeKind>,
}

impl Description {
    /// Load the description from `source`. Change URLs are resolved with
    /// `resolver`; the resulting checkout location is not used.
    pub fn load(source: &DescriptionSource, resolver: &Resolver) -> Result<Self> {
        match source {
            DescriptionSource::ChangeUrl(url) => {
                let resolved = resolver.resolve(url, Path::new("."))?;
                Ok(Self {
                    text: resolved.reference.description,
                    kind: Some(classify(url)),
                })
            }
            DescriptionSource::File(path) => Ok(Self {
                text: Some(fs::read_to_string(path)?),
                kind: None,
            }),
            DescriptionSource::Text(text) => Ok(Self {
                text: Some(text.clone()),
                kind: None,
            }),
            DescriptionSource::Sidecar(dir) => Ok(Self {
                text: DependencyReference::load_description(dir)?,
                kind: None,
            }),
        }
    }
}

/// Settings of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Invocation directory; `Main-Dir:` is resolved against it.
    pub project_dir: PathBuf,
    /// Directory receiving the dependency checkouts.
    pub workspace: PathBuf,
    pub container_mode: bool,
    /// Resolve only: no checkout, no patching.
    pub check_only: bool,
}

/// Outcome of the patch stage.
#[derive(Debug, Default)]
pub struct PatchReport {
    /// Ecosystems whose manifest was rewritten.
    pub changed: Vec<&'static str>,
    /// Ecosystems with a manifest that could not be parsed.
    pub failures: Vec<(&'static str, Error)>,
}

impl PatchReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Outcome of a pipeline run.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub resolved: Vec<Resolved>,
    pub unmerged: usize,
    /// Directory the patchers ran in.
    pub project_dir: Option<PathBuf>,
    /// `None` when the patch stage did not run.
    pub patch: Option<PatchReport>,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.patch.as_ref().is_none_or(PatchReport::is_success)
    }
}

/// Key resolved changes by their `Depends-On` URL.
pub fn dependency_map(resolved: &[Resolved]) -> DependencyMap {
    resolved
        .iter()
        .map(|r| (r.url.clone(), r.reference.clone()))
        .collect()
}

/// Load the sidecars of existing checkouts, keyed by checkout directory.
pub fn load_checkouts(dirs: &[PathBuf]) -> Result<DependencyMap> {
    let mut deps = DependencyMap::new();
    for dir in dirs {
        let reference = DependencyReference::load(dir)?;
        deps.insert(dir.display().to_string(), reference);
    }
    Ok(deps)
}

/// Run `patchers` on `project_dir`.
///
/// Merged references are dropped first. A parse failure is recorded and the
/// next patcher runs; any other error is returned immediately.
pub fn patch_all(
    patchers: &[Box<dyn Patcher>],
    project_dir: &Path,
    deps: &DependencyMap,
    ctx: &PatchContext<'_>,
) -> Result<PatchReport> {
    let deps = unmerged(deps);
    let mut report = PatchReport::default();
    for patcher in patchers {
        match patcher.patch(project_dir, &deps, ctx) {
            Ok(true) => {
                info!("{}: manifest updated", patcher.ecosystem());
                report.changed.push(patcher.ecosystem());
            }
            Ok(false) => {}
            Err(e) if e.is_manifest_local() => {
                error!("{}: {}", patcher.ecosystem(), e);
                report.failures.push((patcher.ecosystem(), e));
            }
            Err(e) => return Err(e),
        }
    }
    Ok(report)
}

/// Runs the resolve, materialize and patch stages.
pub struct Pipeline<'a> {
    resolver: &'a Resolver,
    runner: &'a dyn CommandRunner,
    config: &'a Config,
}

impl<'a> Pipeline<'a> {
    pub fn new(resolver: &'a Resolver, runner: &'a dyn CommandRunner, config: &'a Config) -> Self {
        Self {
            resolver,
            runner,
            config,
        }
    }

    /// Resolve every URL, in order, stopping at the first failure.
    pub fn resolve_all(
        &self,
        urls: &[String],
        workspace: &Path,
        current: Option<ChangeKind>,
    ) -> Result<Vec<Resolved>> {
        let mut resolved = Vec::with_capacity(urls.len());
        for url in urls {
            info!("Resolving {}", url);
            let change = self.resolver.resolve(url, workspace)?;
            if change.is_cross_system(current) {
                info!("{} is a cross-system dependency ({})", url, change.kind);
            }
            if change.reference.merged {
                info!("{} is already merged", url);
            }
            resolved.push(change);
        }
        Ok(resolved)
    }

    /// Check out every resolved change.
    pub fn materialize_all(&self, resolved: &[Resolved]) -> Result<()> {
        let materializer = Materializer::new(self.runner, self.config);
        for change in resolved {
            materializer.materialize(change)?;
        }
        Ok(())
    }

    /// Run every patcher on `project_dir`.
    pub fn patch_all(
        &self,
        project_dir: &Path,
        deps: &DependencyMap,
        container_mode: bool,
    ) -> Result<PatchReport> {
        let ctx = PatchContext {
            runner: self.runner,
            container_mode,
        };
        patch_all(&all_patchers(), project_dir, deps, &ctx)
    }

    /// Run the whole pipeline for `description`.
    pub fn execute(&self, description: &Description, options: &RunOptions) -> Result<RunSummary> {
        let Some(text) = description.text.as_deref() else {
            info!("No description found.");
            return Ok(RunSummary::default());
        };
        let urls = depends_on_urls(text);
        if urls.is_empty() {
            info!("No Depends-On found.");
            return Ok(RunSummary::default());
        }
        info!("Depends-On: {}", urls.join(", "));

        let resolved = self.resolve_all(&urls, &options.workspace, description.kind)?;
        let unmerged_count = resolved.iter().filter(|r| !r.reference.merged).count();
        let mut summary = RunSummary {
            unmerged: unmerged_count,
            ..Default::default()
        };

        if options.check_only {
            summary.resolved = resolved;
            return Ok(summary);
        }
        self.materialize_all(&resolved)?;

        if unmerged_count == 0 {
            info!("All dependencies are merged, nothing to patch");
            summary.resolved = resolved;
            return Ok(summary);
        }

        let project_dir = match main_dir(text) {
            Some(dir) => {
                info!("Main-Dir: {}", dir);
                options.project_dir.join(dir)
            }
            None => options.project_dir.clone(),
        };
        if !project_dir.is_dir() {
            warn!("{} is not a directory", project_dir.display());
        }
        let report = self.patch_all(
            &project_dir,
            &dependency_map(&resolved),
            options.container_mode,
        )?;
        summary.resolved = resolved;
        summary.project_dir = Some(project_dir);
        summary.patch = Some(report);
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::testing::RecordingRunner;
    use crate::http::testing::StubClient;
    use crate::manifest::testing::write;
    use tempfile::TempDir;

    const WIDGET_PR: &str = r#"{
        "body": "Spin faster",
        "merged": false,
        "head": {"ref": "spin", "repo": {"clone_url": "https://github.com/fork/widget.git"}},
        "base": {"ref": "main", "repo": {"clone_url": "https://github.com/acme/widget.git"}}
    }"#;

    const GADGET_PR: &str = r#"{
        "body": null,
        "merged": true,
        "head": {"ref": "g", "repo": {"clone_url": "https://github.com/fork/gadget.git"}},
        "base": {"ref": "main", "repo": {"clone_url": "https://github.com/acme/gadget.git"}}
    }"#;

    fn resolver() -> Resolver {
        let client = StubClient::new()
            .route("https://api.github.com/repos/acme/widget/pulls/1", 200, WIDGET_PR)
            .route("https://api.github.com/repos/acme/gadget/pulls/2", 200, GADGET_PR);
        Resolver::new(Box::new(client), Config::from_lookup(|_| None))
    }

    /// Clones produce a directory holding a Node package named after the repo.
    fn cloning_runner() -> RecordingRunner {
        RecordingRunner::new().respond_with(|line, cwd| {
            if line.starts_with("git clone") {
                let repo = line.rsplit(' ').next().unwrap_or_default();
                write(
                    &cwd.join(repo),
                    "package.json",
                    &format!("{{\"name\": \"{}\"}}", repo),
                );
            }
            None
        })
    }

    fn options(temp: &TempDir, check_only: bool) -> RunOptions {
        RunOptions {
            project_dir: temp.path().join("app"),
            workspace: temp.path().to_path_buf(),
            container_mode: false,
            check_only,
        }
    }

    fn description(text: &str) -> Description {
        Description {
            text: Some(text.to_string()),
            kind: None,
        }
    }

    #[test]
    fn test_execute_without_description() {
        let temp = TempDir::new().unwrap();
        let runner = RecordingRunner::new();
        let config = Config::default();
        let resolver = resolver();
        let summary = Pipeline::new(&resolver, &runner, &config)
            .execute(&Description::default(), &options(&temp, false))
            .unwrap();
        assert!(summary.resolved.is_empty());
        assert!(summary.patch.is_none());
        assert!(summary.is_success());
    }

    #[test]
    fn test_execute_commented_depends_on_does_nothing() {
        let temp = TempDir::new().unwrap();
        let runner = RecordingRunner::new();
        let config = Config::default();
        let resolver = resolver();
        let text = "Fix\n<!-- Depends-On: https://github.com/acme/widget/pull/1 -->\n";
        let summary = Pipeline::new(&resolver, &runner, &config)
            .execute(&description(text), &options(&temp, false))
            .unwrap();
        assert!(summary.resolved.is_empty());
        assert!(runner.lines().is_empty());
    }

    #[test]
    fn test_execute_check_only_counts_unmerged() {
        let temp = TempDir::new().unwrap();
        let runner = RecordingRunner::new();
        let config = Config::default();
        let resolver = resolver();
        let text = "Depends-On: https://github.com/acme/widget/pull/1\nDepends-On: https://github.com/acme/gadget/pull/2\n";
        let summary = Pipeline::new(&resolver, &runner, &config)
            .execute(&description(text), &options(&temp, true))
            .unwrap();
        assert_eq!(summary.resolved.len(), 2);
        assert_eq!(summary.unmerged, 1);
        assert!(summary.patch.is_none());
        assert!(runner.lines().is_empty());
    }

    #[test]
    fn test_execute_full_run_patches_main_dir() {
        let temp = TempDir::new().unwrap();
        let project = temp.path().join("app/web");
        write(
            &project,
            "package.json",
            "{\n  \"dependencies\": {\n    \"widget\": \"^1.0.0\",\n    \"gadget\": \"^1.0.0\"\n  }\n}\n",
        );
        let runner = cloning_runner();
        let config = Config::default();
        let resolver = resolver();
        let text = "Depends-On: https://github.com/acme/widget/pull/1\nDepends-On: https://github.com/acme/gadget/pull/2\nMain-Dir: web\n";

        let summary = Pipeline::new(&resolver, &runner, &config)
            .execute(&description(text), &options(&temp, false))
            .unwrap();

        assert_eq!(summary.project_dir.as_deref(), Some(project.as_path()));
        let report = summary.patch.as_ref().unwrap();
        assert_eq!(report.changed, vec!["node"]);
        assert!(summary.is_success());

        // both are checked out, only the unmerged one is substituted
        assert!(temp.path().join("widget/depends-on.json").exists());
        assert!(temp.path().join("gadget/depends-on.json").exists());
        let manifest = fs::read_to_string(project.join("package.json")).unwrap();
        assert!(manifest.contains(&format!(
            "\"widget\": \"file:{}\"",
            temp.path().join("widget").display()
        )));
        assert!(manifest.contains("\"gadget\": \"^1.0.0\""));
    }

    #[test]
    fn test_execute_all_merged_skips_patching() {
        let temp = TempDir::new().unwrap();
        let runner = cloning_runner();
        let config = Config::default();
        let resolver = resolver();
        let summary = Pipeline::new(&resolver, &runner, &config)
            .execute(
                &description("Depends-On: https://github.com/acme/gadget/pull/2\n"),
                &options(&temp, false),
            )
            .unwrap();
        assert_eq!(summary.unmerged, 0);
        assert!(summary.patch.is_none());
        assert!(runner.lines().iter().any(|l| l.starts_with("git clone")));
    }

    #[test]
    fn test_execute_invalid_url_aborts_before_any_command() {
        let temp = TempDir::new().unwrap();
        let runner = RecordingRunner::new();
        let config = Config::default();
        let resolver = resolver();
        let err = Pipeline::new(&resolver, &runner, &config)
            .execute(
                &description("Depends-On: https://github.com/acme/widget/issues/1\n"),
                &options(&temp, false),
            )
            .unwrap_err();
        assert!(matches!(err, Error::InvalidUrl { .. }));
        assert!(runner.lines().is_empty());
    }

    #[test]
    fn test_patch_all_continues_after_parse_failure() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "package.json", "{ broken");
        write(temp.path(), "requirements.yml", "collections:\n  - vexxhost.kubernetes\n");
        let checkout = temp.path().join("kubernetes");
        write(&checkout, "galaxy.yml", "namespace: vexxhost\nname: kubernetes\n");
        let mut deps = DependencyMap::new();
        deps.insert(
            "u".to_string(),
            DependencyReference::default().with_location(checkout, None),
        );
        let runner = RecordingRunner::new();
        let ctx = PatchContext {
            runner: &runner,
            container_mode: false,
        };

        let report = patch_all(&all_patchers(), temp.path(), &deps, &ctx).unwrap();
        assert_eq!(report.changed, vec!["ansible"]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, "node");
        assert!(!report.is_success());
    }

    #[test]
    fn test_patch_all_aborts_on_no_modules() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "go.mod", "module example.com/app\n");
        let runner = RecordingRunner::new();
        let ctx = PatchContext {
            runner: &runner,
            container_mode: false,
        };
        let err = patch_all(&all_patchers(), temp.path(), &DependencyMap::new(), &ctx).unwrap_err();
        assert!(matches!(err, Error::NoModulesFound { .. }));
    }

    #[test]
    fn test_description_sources() {
        let temp = TempDir::new().unwrap();
        let resolver = resolver();
        let file = temp.path().join("desc.txt");
        fs::write(&file, "Depends-On: x\n").unwrap();
        assert_eq!(
            Description::load(&DescriptionSource::File(file), &resolver)
                .unwrap()
                .text
                .as_deref(),
            Some("Depends-On: x\n")
        );

        let reference = DependencyReference {
            description: Some("from sidecar".to_string()),
            ..Default::default()
        }
        .with_location(temp.path().to_path_buf(), None);
        reference.save().unwrap();
        assert_eq!(
            Description::load(&DescriptionSource::Sidecar(temp.path().to_path_buf()), &resolver)
                .unwrap()
                .text
                .as_deref(),
            Some("from sidecar")
        );

        let from_change = Description::load(
            &DescriptionSource::ChangeUrl("https://github.com/acme/widget/pull/1".to_string()),
            &resolver,
        )
        .unwrap();
        assert_eq!(from_change.text.as_deref(), Some("Spin faster"));
        assert_eq!(from_change.kind, Some(ChangeKind::GitHub));
    }

    #[test]
    fn test_load_checkouts_keys_by_directory() {
        let temp = TempDir::new().unwrap();
        let reference = DependencyReference {
            branch: "spin".to_string(),
            ..Default::default()
        }
        .with_location(temp.path().join("widget"), None);
        fs::create_dir_all(&reference.top_dir).unwrap();
        reference.save().unwrap();

        let deps = load_checkouts(&[temp.path().join("widget")]).unwrap();
        assert_eq!(deps.len(), 1);
        assert_eq!(deps.values().next().unwrap().branch, "spin");
        assert!(load_checkouts(&[temp.path().join("missing")]).is_err());
    }
}
