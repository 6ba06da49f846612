//! Filesystem access for the live folder.

use std::fs;
use std::io::ErrorKind;

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use tracing::debug;

use crate::error::SyncError;
use crate::paths::has_suffix_ignore_case;

/// Thin wrapper over the handful of filesystem operations reconciliation needs,
/// scoped to the live folder root. Paths outside the root are refused.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: Utf8PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn exists(&self, path: &Utf8Path) -> bool {
        self.contains(path) && path.exists()
    }

    /// Removes a file; a missing file is already consistent.
    pub fn remove(&self, path: &Utf8Path) -> Result<(), SyncError> {
        self.check(path)?;
        match fs::remove_file(path) {
            Ok(()) => {
                debug!(%path, "removed job chain file");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(SyncError::io(path, err)),
        }
    }

    /// Writes `contents`, creating parent directories and replacing any existing file.
    pub fn write(&self, path: &Utf8Path, contents: &[u8]) -> Result<(), SyncError> {
        self.check(path)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| SyncError::io(parent, err))?;
        }
        fs::write(path, contents).map_err(|err| SyncError::io(path, err))?;
        debug!(%path, bytes = contents.len(), "wrote job chain file");
        Ok(())
    }

    pub fn read(&self, path: &Utf8Path) -> Result<Vec<u8>, SyncError> {
        self.check(path)?;
        fs::read(path).map_err(|err| SyncError::io(path, err))
    }

    /// Moves `from` to `to`, replacing any file already at `to`.
    pub fn rename(&self, from: &Utf8Path, to: &Utf8Path) -> Result<(), SyncError> {
        self.check(from)?;
        self.check(to)?;
        fs::rename(from, to).map_err(|err| SyncError::io(from, err))?;
        debug!(%from, %to, "renamed job chain file");
        Ok(())
    }

    /// Names of the regular files directly under `dir` ending with `suffix`
    /// (ASCII case-insensitive), sorted. Non UTF-8 names are ignored.
    pub fn list_files(&self, dir: &Utf8Path, suffix: &str) -> Result<Vec<String>, SyncError> {
        self.check(dir)?;
        let entries = fs::read_dir(dir).map_err(|err| SyncError::io(dir, err))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| SyncError::io(dir, err))?;
            let Ok(name) = entry.file_name().into_string() else {
                debug!(dir = %dir, "skipping non utf-8 file name");
                continue;
            };
            if !has_suffix_ignore_case(&name, suffix) {
                continue;
            }
            let path = dir.join(&name);
            let metadata = fs::metadata(&path).map_err(|err| SyncError::io(&path, err))?;
            if metadata.is_file() {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    fn contains(&self, path: &Utf8Path) -> bool {
        path.starts_with(&self.root)
            && !path
                .components()
                .any(|component| matches!(component, Utf8Component::ParentDir))
    }

    fn check(&self, path: &Utf8Path) -> Result<(), SyncError> {
        if self.contains(path) {
            Ok(())
        } else {
            Err(SyncError::invalid(format!(
                "{path} is outside the live folder {}",
                self.root
            )))
        }
    }
}
