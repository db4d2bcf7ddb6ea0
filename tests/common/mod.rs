//! Shared test utilities for the E2E tests.
//!
//! ## Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new();
//!     let widget = fixture.checkout("widget", false);
//!     // ... test code
//! }
//! ```

use assert_fs::prelude::*;
use assert_fs::TempDir;
use std::path::PathBuf;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    pub use super::TestFixture;
}

/// A temporary workspace holding a `project` directory and sibling
/// checkouts.
pub struct TestFixture {
    pub temp: TempDir,
}

impl TestFixture {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp dir");
        temp.child("project")
            .create_dir_all()
            .expect("Failed to create project dir");
        Self { temp }
    }

    /// The project directory.
    pub fn project(&self) -> PathBuf {
        self.temp.path().join("project")
    }

    /// Write `content` to `name` inside the project directory.
    pub fn project_file(&self, name: &str, content: &str) -> &Self {
        self.temp
            .child("project")
            .child(name)
            .write_str(content)
            .expect("Failed to write project file");
        self
    }

    /// Read `name` from the project directory.
    pub fn read_project_file(&self, name: &str) -> String {
        std::fs::read_to_string(self.project().join(name)).expect("Failed to read project file")
    }

    /// Create a checkout directory with a `depends-on.json` sidecar.
    pub fn checkout(&self, name: &str, merged: bool) -> PathBuf {
        let dir = self.temp.path().join(name);
        let sidecar = serde_json::json!({
            "description": null,
            "fork_url": format!("https://github.com/fork/{}", name),
            "branch": "feature",
            "main_url": format!("https://github.com/acme/{}", name),
            "main_branch": "main",
            "topdir": dir,
            "path": dir,
            "merged": merged,
        });
        self.temp
            .child(name)
            .child("depends-on.json")
            .write_str(&serde_json::to_string_pretty(&sidecar).expect("valid json"))
            .expect("Failed to write sidecar");
        dir
    }

    /// Write `content` to `file` inside the checkout `name`.
    pub fn checkout_file(&self, name: &str, file: &str, content: &str) -> &Self {
        self.temp
            .child(name)
            .child(file)
            .write_str(content)
            .expect("Failed to write checkout file");
        self
    }
}
