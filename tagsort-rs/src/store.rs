//! File store abstraction over the vault's files.
//!
//! All paths are relative to the vault root.

use crate::error::{ConflictType, Result, TagsortError};
use crate::types::OperationKind;
use glob::glob;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Access to the files of a vault.
pub trait FileStore {
    /// Read a file. Fails with `NotFound` if it does not exist.
    fn read(&self, path: &Path) -> Result<String>;

    /// Write a file, creating parent folders as needed.
    fn write(&self, path: &Path, content: &str) -> Result<()>;

    /// Move a file. Fails with `FileConflict` if `to` already exists.
    fn rename(&self, from: &Path, to: &Path) -> Result<()>;

    fn exists(&self, path: &Path) -> bool;

    /// Every file in the vault, sorted.
    fn list_files(&self) -> Result<Vec<PathBuf>>;

    /// Delete a file.
    fn remove(&self, path: &Path) -> Result<()>;
}

/// Whether a path names a Markdown note.
pub fn is_markdown(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("md"))
}

/// A vault stored in a directory on disk.
#[derive(Debug, Clone)]
pub struct FsStore {
    /// Root path of the vault.
    pub root: PathBuf,
}

impl FsStore {
    /// Open a vault directory.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();

        if !root.is_dir() {
            return Err(TagsortError::NotFound(root));
        }

        Ok(Self { root })
    }

    /// Get the full path to a vault file.
    pub fn full_path(&self, relative_path: &Path) -> PathBuf {
        self.root.join(relative_path)
    }

    fn ensure_parent(&self, full_path: &Path) -> Result<()> {
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl FileStore for FsStore {
    fn read(&self, path: &Path) -> Result<String> {
        std::fs::read_to_string(self.full_path(path)).map_err(|e| match e.kind() {
            ErrorKind::NotFound => TagsortError::NotFound(path.to_path_buf()),
            _ => TagsortError::Io(e),
        })
    }

    fn write(&self, path: &Path, content: &str) -> Result<()> {
        let full_path = self.full_path(path);
        self.ensure_parent(&full_path)?;
        std::fs::write(full_path, content)?;
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let from_full = self.full_path(from);
        let to_full = self.full_path(to);

        if !from_full.is_file() {
            return Err(TagsortError::NotFound(from.to_path_buf()));
        }

        if to_full.exists() {
            let conflict = if to_full.is_dir() {
                ConflictType::IsDirectory
            } else {
                ConflictType::AlreadyExists
            };
            return Err(TagsortError::FileConflict {
                kind: OperationKind::Move,
                conflict,
                source_path: from.to_path_buf(),
                target: to.to_path_buf(),
            });
        }

        // Ensure target directory exists
        self.ensure_parent(&to_full)?;

        std::fs::rename(&from_full, &to_full).map_err(|e| match e.kind() {
            ErrorKind::PermissionDenied => TagsortError::FileConflict {
                kind: OperationKind::Move,
                conflict: ConflictType::ReadOnly,
                source_path: from.to_path_buf(),
                target: to.to_path_buf(),
            },
            _ => TagsortError::FileOperation {
                kind: OperationKind::Move,
                path: from.to_path_buf(),
                message: e.to_string(),
            },
        })
    }

    fn exists(&self, path: &Path) -> bool {
        self.full_path(path).exists()
    }

    fn list_files(&self) -> Result<Vec<PathBuf>> {
        let root = glob::Pattern::escape(&self.root.to_string_lossy());
        let pattern = format!("{}/**/*", root);

        let mut files = Vec::new();

        for entry in glob(&pattern)? {
            match entry {
                Ok(path) => {
                    if !path.is_file() {
                        continue;
                    }
                    if let Ok(relative) = path.strip_prefix(&self.root) {
                        // Skip hidden files and directories
                        if !relative
                            .components()
                            .any(|c| c.as_os_str().to_string_lossy().starts_with('.'))
                        {
                            files.push(relative.to_path_buf());
                        }
                    }
                }
                Err(e) => {
                    log::warn!("skipping unreadable entry while listing vault: {}", e);
                }
            }
        }

        files.sort();

        Ok(files)
    }

    fn remove(&self, path: &Path) -> Result<()> {
        std::fs::remove_file(self.full_path(path)).map_err(|e| match e.kind() {
            ErrorKind::NotFound => TagsortError::NotFound(path.to_path_buf()),
            _ => TagsortError::Io(e),
        })
    }
}

/// A vault held in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    files: Mutex<BTreeMap<PathBuf, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from (path, content) pairs.
    pub fn with_files<P, C>(files: impl IntoIterator<Item = (P, C)>) -> Self
    where
        P: Into<PathBuf>,
        C: Into<String>,
    {
        let files = files
            .into_iter()
            .map(|(p, c)| (p.into(), c.into()))
            .collect();
        Self {
            files: Mutex::new(files),
        }
    }

    /// Current content of a file, if present.
    pub fn get(&self, path: impl AsRef<Path>) -> Option<String> {
        self.files().get(path.as_ref()).cloned()
    }

    fn files(&self) -> std::sync::MutexGuard<'_, BTreeMap<PathBuf, String>> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_dir(files: &BTreeMap<PathBuf, String>, path: &Path) -> bool {
        files
            .keys()
            .any(|p| p != path && p.starts_with(path))
    }
}

impl FileStore for MemoryStore {
    fn read(&self, path: &Path) -> Result<String> {
        self.get(path)
            .ok_or_else(|| TagsortError::NotFound(path.to_path_buf()))
    }

    fn write(&self, path: &Path, content: &str) -> Result<()> {
        self.files().insert(path.to_path_buf(), content.to_string());
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let mut files = self.files();

        if !files.contains_key(from) {
            return Err(TagsortError::NotFound(from.to_path_buf()));
        }

        let conflict = if files.contains_key(to) {
            Some(ConflictType::AlreadyExists)
        } else if Self::is_dir(&files, to) {
            Some(ConflictType::IsDirectory)
        } else {
            None
        };
        if let Some(conflict) = conflict {
            return Err(TagsortError::FileConflict {
                kind: OperationKind::Move,
                conflict,
                source_path: from.to_path_buf(),
                target: to.to_path_buf(),
            });
        }

        if let Some(content) = files.remove(from) {
            files.insert(to.to_path_buf(), content);
        }
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        let files = self.files();
        files.contains_key(path) || Self::is_dir(&files, path)
    }

    fn list_files(&self) -> Result<Vec<PathBuf>> {
        Ok(self.files().keys().cloned().collect())
    }

    fn remove(&self, path: &Path) -> Result<()> {
        self.files()
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| TagsortError::NotFound(path.to_path_buf()))
    }
}
