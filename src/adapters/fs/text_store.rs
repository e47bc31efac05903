//! UTF-8 text asset store on the local filesystem.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::debug;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::strip_comments;

/// Extensions treated as rule/flavor documents.
const DOCUMENT_EXTENSIONS: &[&str] = &["md", "txt"];

/// Reads and writes text assets. Stateless; cheap to clone.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextStore;

impl TextStore {
    pub const fn new() -> Self {
        Self
    }

    /// Read a file with comment lines removed. `None` when the file does not exist.
    pub async fn read(&self, path: &Path) -> DomainResult<Option<String>> {
        Ok(self.read_raw(path).await?.map(|raw| strip_comments(&raw)))
    }

    /// Read a file verbatim. `None` when the file does not exist.
    pub async fn read_raw(&self, path: &Path) -> DomainResult<Option<String>> {
        match fs::read_to_string(path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(DomainError::io(path, e)),
        }
    }

    /// Write a file, creating parent directories.
    pub async fn write(&self, path: &Path, content: &str) -> DomainResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| DomainError::io(parent, e))?;
        }
        fs::write(path, content)
            .await
            .map_err(|e| DomainError::io(path, e))?;
        debug!(path = %path.display(), bytes = content.len(), "wrote asset");
        Ok(())
    }

    pub async fn exists(&self, path: &Path) -> bool {
        fs::try_exists(path).await.unwrap_or(false)
    }

    /// Document files (`.md`, `.txt`) directly inside `dir`, sorted by path.
    ///
    /// `None` when the directory does not exist.
    pub async fn list_documents(&self, dir: &Path) -> DomainResult<Option<Vec<PathBuf>>> {
        let mut entries = match fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(DomainError::io(dir, e)),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| DomainError::io(dir, e))?
        {
            let path = entry.path();
            let is_document = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| DOCUMENT_EXTENSIONS.contains(&ext));
            if is_document && entry.file_type().await.is_ok_and(|t| t.is_file()) {
                files.push(path);
            }
        }
        files.sort();
        Ok(Some(files))
    }

    /// Like [`Self::list_documents`] but a missing directory is empty.
    pub async fn list_or_empty(&self, dir: &Path) -> DomainResult<Vec<PathBuf>> {
        Ok(self.list_documents(dir).await?.unwrap_or_default())
    }

    /// Remove `dir` and everything under it, then recreate it empty.
    pub async fn reset_dir(&self, dir: &Path) -> DomainResult<()> {
        match fs::remove_dir_all(dir).await {
            Ok(()) => debug!(dir = %dir.display(), "cleared output directory"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(DomainError::io(dir, e)),
        }
        fs::create_dir_all(dir)
            .await
            .map_err(|e| DomainError::io(dir, e))
    }
}
