//! Workspace layout for a delivery run.
//!
//! ```text
//! {root}/{origin owner}/{origin repository}   source checkout
//! {root}/{owner}/{repository}                 destination clones
//! ```

use std::fs;
use std::path::{Component, Path, PathBuf};

use log::debug;
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// A directory that holds every checkout of a run.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Opens `root`, which must be an existing, empty directory.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();
        let workspace_error = |message: &str| Error::Workspace {
            path: root.display().to_string(),
            message: message.to_string(),
        };

        if !root.is_dir() {
            return Err(workspace_error("does not exist or is not a directory"));
        }
        if fs::read_dir(root)?.next().is_some() {
            return Err(workspace_error("is not empty"));
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the source repository `origin` (`owner/repository`) is checked out.
    pub fn source_dir(&self, origin: &str) -> PathBuf {
        self.root.join(origin)
    }

    /// Where `owner/repository` is cloned. Both must be plain directory names.
    pub fn destination_dir(&self, owner: &str, repository: &str) -> Result<PathBuf> {
        for segment in [owner, repository] {
            if !is_plain_name(segment) {
                return Err(Error::Workspace {
                    path: format!("{}/{}", owner, repository),
                    message: format!("'{}' is not a plain directory name", segment),
                });
            }
        }
        Ok(self.root.join(owner).join(repository))
    }

    /// Removes a checkout below the workspace. Missing paths are ignored.
    ///
    /// `path` must lie strictly below the root without any `.` or `..` steps.
    pub fn remove(&self, path: &Path) -> Result<()> {
        let below_root = path
            .strip_prefix(&self.root)
            .map(|rest| {
                rest.components().next().is_some()
                    && rest.components().all(|c| matches!(c, Component::Normal(_)))
            })
            .unwrap_or(false);
        if !below_root {
            return Err(Error::Workspace {
                path: path.display().to_string(),
                message: format!("is not below {}", self.root.display()),
            });
        }
        if path.exists() {
            debug!("Removing {}", path.display());
            fs::remove_dir_all(path)?;
        }
        Ok(())
    }

    /// Removes everything inside the workspace, keeping the directory.
    pub fn clean(&self) -> Result<()> {
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.is_dir() {
                fs::remove_dir_all(&path)?;
            } else {
                fs::remove_file(&path)?;
            }
        }
        debug!("Workspace {} cleaned", self.root.display());
        Ok(())
    }
}

/// A single path component: no separator, not `.` or `..`, not absolute.
pub fn is_plain_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    !name.contains(['/', '\\'])
        && matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        )
}

/// Resolves `name` below `dir`. `name` must be relative and may not step
/// outside `dir`.
pub fn path_below(dir: &Path, name: &str) -> Result<PathBuf> {
    let relative = Path::new(name);
    let contained = relative.components().next().is_some()
        && relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    if !contained {
        return Err(Error::Workspace {
            path: name.to_string(),
            message: format!("does not name a path inside {}", dir.display()),
        });
    }
    Ok(dir.join(relative))
}

/// Copies `from` over `to` and returns the number of files copied.
///
/// A directory is copied recursively, its contents landing directly in `to`;
/// a single file is copied into `to` under its own name. `.git` directories
/// are never copied.
pub fn copy_tree(from: &Path, to: &Path) -> Result<usize> {
    if !from.exists() {
        return Err(Error::Workspace {
            path: from.display().to_string(),
            message: "delivery source does not exist in the source repository".to_string(),
        });
    }

    if from.is_file() {
        let file_name = from.file_name().ok_or_else(|| Error::Workspace {
            path: from.display().to_string(),
            message: "has no file name".to_string(),
        })?;
        fs::create_dir_all(to)?;
        fs::copy(from, to.join(file_name))?;
        return Ok(1);
    }

    let mut copied = 0;
    for entry in WalkDir::new(from)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || e.file_name() != ".git")
    {
        let entry = entry.map_err(|e| Error::Workspace {
            path: from.display().to_string(),
            message: e.to_string(),
        })?;
        let relative = entry
            .path()
            .strip_prefix(from)
            .map_err(|_| Error::Workspace {
                path: entry.path().display().to_string(),
                message: format!("is not below {}", from.display()),
            })?;
        let target = to.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }
    debug!(
        "Copied {} files from {} to {}",
        copied,
        from.display(),
        to.display()
    );
    Ok(copied)
}
