//! # Destination Repository Operations
//!
//! The files consumer never calls `git` directly. It goes through the
//! [`GitOperations`] trait, which separates the delivery logic from the
//! concrete implementation of version-control actions.
//!
//! In the main application [`DefaultGitOperations`] is used, which wraps the
//! system `git` command (see [`crate::git`]). In tests it is replaced with a
//! mock implementation that records calls and simulates clones in a
//! temporary directory, so that the delivery flow can be exercised without a
//! network or a remote.

use std::path::Path;

use crate::error::Result;
use crate::git::RemoteUrl;

/// Version-control actions needed to deliver files to one repository.
pub trait GitOperations: Send + Sync {
    /// Clones `url` into `target_dir`, replacing existing content.
    fn clone(&self, url: &RemoteUrl, target_dir: &Path) -> Result<()>;

    /// Abbreviated commit hash of `HEAD`.
    fn head_short_sha(&self, repo_dir: &Path) -> Result<String>;

    /// Whether the remote already has `branch`.
    fn remote_branch_exists(&self, repo_dir: &Path, branch: &str) -> Result<bool>;

    /// Checks out the existing `base` branch, then creates and switches to
    /// `branch` from it.
    fn start_branch(&self, repo_dir: &Path, base: &str, branch: &str) -> Result<()>;

    /// Stages everything and reports whether anything changed.
    fn stage_changes(&self, repo_dir: &Path) -> Result<bool>;

    /// Commits the staged changes with the given identity.
    fn commit(&self, repo_dir: &Path, name: &str, email: &str, message: &str) -> Result<()>;

    /// Pushes `branch` to the remote it was cloned from.
    fn push(&self, repo_dir: &Path, branch: &str, url: &RemoteUrl) -> Result<()>;
}

/// The default implementation of `GitOperations`, which uses the system's
/// `git` command to perform real Git operations.
pub struct DefaultGitOperations;

impl GitOperations for DefaultGitOperations {
    fn clone(&self, url: &RemoteUrl, target_dir: &Path) -> Result<()> {
        crate::git::clone(url, target_dir)
    }

    fn head_short_sha(&self, repo_dir: &Path) -> Result<String> {
        crate::git::head_short_sha(repo_dir)
    }

    fn remote_branch_exists(&self, repo_dir: &Path, branch: &str) -> Result<bool> {
        crate::git::remote_branch_exists(repo_dir, branch)
    }

    fn start_branch(&self, repo_dir: &Path, base: &str, branch: &str) -> Result<()> {
        crate::git::checkout(repo_dir, base)?;
        crate::git::create_branch(repo_dir, branch)
    }

    fn stage_changes(&self, repo_dir: &Path) -> Result<bool> {
        crate::git::stage_all(repo_dir)?;
        crate::git::has_changes(repo_dir)
    }

    fn commit(&self, repo_dir: &Path, name: &str, email: &str, message: &str) -> Result<()> {
        crate::git::configure_identity(repo_dir, name, email)?;
        crate::git::commit(repo_dir, message)
    }

    fn push(&self, repo_dir: &Path, branch: &str, url: &RemoteUrl) -> Result<()> {
        crate::git::push(repo_dir, branch, url)
    }
}
