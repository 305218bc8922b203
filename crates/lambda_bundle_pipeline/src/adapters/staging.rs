use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::BundleError;

/// Exclusive owner of the staging directory for one package run.
///
/// The directory is emptied on acquisition and removed when the guard is
/// dropped, on success and on every error path alike. [`StagingDir::keep`]
/// disarms the removal.
#[derive(Debug)]
pub struct StagingDir {
    path: PathBuf,
    remove_on_drop: bool,
}

impl StagingDir {
    pub fn acquire(path: impl Into<PathBuf>) -> Result<Self, BundleError> {
        let path = path.into();
        remove_if_present(&path)
            .map_err(BundleError::io("remove stale staging directory", &path))?;
        fs::create_dir_all(&path).map_err(BundleError::io("create staging directory", &path))?;
        tracing::debug!("staging directory ready at {}", path.display());

        Ok(Self {
            path,
            remove_on_drop: true,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes the directory now, reporting failure instead of only logging it.
    pub fn remove(mut self) -> Result<(), BundleError> {
        self.remove_on_drop = false;
        remove_if_present(&self.path)
            .map_err(BundleError::io("remove staging directory", &self.path))
    }

    /// Leaves the directory in place and returns its path.
    pub fn keep(mut self) -> PathBuf {
        self.remove_on_drop = false;
        std::mem::take(&mut self.path)
    }
}

impl Drop for StagingDir {
    fn drop(&mut self) {
        if !self.remove_on_drop {
            return;
        }
        if let Err(error) = remove_if_present(&self.path) {
            tracing::warn!(
                "failed to remove staging directory {}: {error}",
                self.path.display()
            );
        } else {
            tracing::debug!("removed staging directory {}", self.path.display());
        }
    }
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::symlink_metadata(path) {
        Ok(metadata) if metadata.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(error) => Err(error),
    }
}
