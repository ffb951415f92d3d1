//! Shared test utilities for E2E tests.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new().with_config(configs::FILES);
//!     fixture.command().arg("validate").assert().success();
//! }
//! ```

use assert_fs::prelude::*;
use std::path::{Path, PathBuf};

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::configs;
    pub use super::TestFixture;
}

/// Environment variables read by the CLI, cleared so the host cannot leak in.
pub const CLI_ENV: &[&str] = &[
    "AUTODELIVERY_CONFIG",
    "GITHUB_TOKEN",
    "GITHUB_ACTOR",
    "GITHUB_WORKSPACE",
    "GITHUB_REPOSITORY",
    "GITHUB_API_URL",
    "GITHUB_SERVER_URL",
    "RUST_LOG",
];

/// Common configuration YAML snippets for testing.
#[allow(dead_code)]
pub mod configs {
    /// Both sections, using the shorthand shapes.
    pub const MIXED: &str = r#"
secrets:
  DEPLOY_TOKEN:
    orgX: repoA
files:
  ci:
    orgX:
      repoA: [dev, main]
      repoB:
  LICENSE:
    - orgY: repoC
"#;

    /// Files section only.
    pub const FILES: &str = r#"
files:
  ci:
    orgX: repoA
"#;

    /// A branches descriptor with an unsupported scalar.
    pub const BAD_BRANCHES: &str = r#"
files:
  ci:
    orgX:
      repoA: 42
"#;

    /// Invalid YAML for error testing.
    pub const INVALID_YAML: &str = "files: [unclosed";

    /// A list at the document root.
    pub const ROOT_LIST: &str = "- files\n";
}

/// A temporary directory with an optional `auto-delivery.yml`.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

impl TestFixture {
    /// Create a new test fixture with an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Add an `auto-delivery.yml` configuration file with the given content.
    pub fn with_config(self, content: &str) -> Self {
        self.with_file("auto-delivery.yml", content)
    }

    /// Add a file with the given path and content.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    /// Get the path to the temporary directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Get the path to the config file.
    #[allow(dead_code)]
    pub fn config_path(&self) -> PathBuf {
        self.temp_dir.path().join("auto-delivery.yml")
    }

    /// Create a child path in the temp directory.
    #[allow(dead_code)]
    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }

    /// Create a command running in this fixture's directory, with the CLI's
    /// environment variables cleared and colors disabled.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("autodelivery");
        cmd.current_dir(self.path());
        for name in CLI_ENV {
            cmd.env_remove(name);
        }
        cmd.env("NO_COLOR", "1");
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_with_config() {
        let fixture = TestFixture::new().with_config("files: {}");
        assert!(fixture.config_path().exists());
    }

    #[test]
    fn test_configs_are_valid_yaml() {
        for config in [
            configs::MIXED,
            configs::FILES,
            configs::BAD_BRANCHES,
            configs::ROOT_LIST,
        ] {
            serde_yaml::from_str::<serde_yaml::Value>(config).expect("Config should be valid YAML");
        }
    }

    #[test]
    fn test_invalid_yaml_is_actually_invalid() {
        let result = serde_yaml::from_str::<serde_yaml::Value>(configs::INVALID_YAML);
        assert!(result.is_err(), "INVALID_YAML should not parse");
    }
}
