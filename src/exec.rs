//! # External Command Execution
//!
//! Every process depends-on starts (`git`, `go`, `cargo`) goes through the
//! `CommandRunner` trait. The trait keeps the resolver, the materializer and
//! the patchers testable without spawning real processes: in the binary the
//! `SystemRunner` wraps `std::process::Command`, in tests a recording double
//! answers with canned output.

use std::path::Path;
use std::process::Command;

use log::{debug, info};

use crate::error::{Error, Result};
use crate::redact::Redactor;

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when the process was killed by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Trait for running external commands - allows mocking in tests
pub trait CommandRunner {
    /// Run `program` with `args` inside `cwd` and capture its output.
    ///
    /// A non-zero exit is *not* an error at this level; it is reported in
    /// the returned `CommandOutput`. An error means the process could not be
    /// started at all.
    fn run(&self, program: &str, args: &[String], cwd: &Path) -> Result<CommandOutput>;

    /// Redaction context applied to command lines before they are logged or
    /// stored in an error.
    fn redactor(&self) -> &Redactor;
}

/// Render a command line for logs and error messages.
pub fn command_line(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Run a version-control command and turn any failure into
/// `Error::VcsCommand`.
pub fn run_vcs(
    runner: &dyn CommandRunner,
    program: &str,
    args: &[String],
    cwd: &Path,
) -> Result<CommandOutput> {
    let line = runner.redactor().redact(&command_line(program, args)).into_owned();
    let output = runner.run(program, args, cwd).map_err(|e| Error::VcsCommand {
        command: line.clone(),
        status: None,
        stderr: runner.redactor().redact(&e.to_string()).into_owned(),
    })?;
    if !output.success() {
        return Err(Error::VcsCommand {
            command: line,
            status: output.status,
            stderr: runner.redactor().redact(&output.stderr).into_owned(),
        });
    }
    Ok(output)
}

/// Run a package-manager command and turn any failure into
/// `Error::ToolCommand`.
pub fn run_tool(
    runner: &dyn CommandRunner,
    program: &str,
    args: &[String],
    cwd: &Path,
) -> Result<CommandOutput> {
    let line = runner.redactor().redact(&command_line(program, args)).into_owned();
    let output = runner.run(program, args, cwd)?;
    if !output.success() {
        return Err(Error::ToolCommand {
            command: line,
            message: match output.status {
                Some(code) => format!("exit code {}: {}", code, output.stderr.trim_end()),
                None => format!("terminated by signal: {}", output.stderr.trim_end()),
            },
        });
    }
    Ok(output)
}

/// The default implementation of `CommandRunner`, which spawns real
/// processes with `std::process::Command`.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    redactor: Redactor,
}

impl SystemRunner {
    pub fn new(redactor: Redactor) -> Self {
        Self { redactor }
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[String], cwd: &Path) -> Result<CommandOutput> {
        let line = command_line(program, args);
        info!("+ {}", self.redactor.redact(&line));
        debug!("  in {}", cwd.display());

        let output = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .output()
            .map_err(|e| Error::ToolCommand {
                command: self.redactor.redact(&line).into_owned(),
                message: e.to_string(),
            })?;

        let result = CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        if !result.stderr.is_empty() {
            debug!("{}", self.redactor.redact(result.stderr.trim_end()));
        }
        Ok(result)
    }

    fn redactor(&self) -> &Redactor {
        &self.redactor
    }
}
