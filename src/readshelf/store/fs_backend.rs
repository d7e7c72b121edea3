use super::backend::StorageBackend;
use crate::error::{Result, ShelfError};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Filesystem backend rooted at a single data directory.
///
/// ```text
/// <root>/
/// ├── reading-shelf-folders.json
/// ├── reading-shelf-books.json
/// ├── reading-shelf-categories.json
/// ├── reading-shelf-layout.json
/// └── blobs/
///     └── {book-id}.pdf
/// ```
#[derive(Debug, Clone)]
pub struct FsBackend {
    root: PathBuf,
}

impl FsBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", key))
    }

    fn blobs_dir(&self) -> PathBuf {
        self.root.join("blobs")
    }

    fn blob_path(&self, id: &Uuid) -> PathBuf {
        self.blobs_dir().join(format!("{}.pdf", id))
    }

    fn ensure_dir(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path).map_err(ShelfError::Io)?;
        }
        Ok(())
    }

    fn atomic_write(&self, dir: &Path, target: &Path, bytes: &[u8]) -> Result<()> {
        self.ensure_dir(dir)?;
        let tmp = dir.join(format!(".write-{}.tmp", Uuid::new_v4()));
        fs::write(&tmp, bytes).map_err(ShelfError::Io)?;
        fs::rename(&tmp, target).map_err(ShelfError::Io)?;
        Ok(())
    }
}

impl StorageBackend for FsBackend {
    fn read_key(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path).map_err(ShelfError::Io)?;
        Ok(Some(content))
    }

    fn write_key(&self, key: &str, value: &str) -> Result<()> {
        let target = self.key_path(key);
        self.atomic_write(&self.root, &target, value.as_bytes())
    }

    fn read_blob(&self, id: &Uuid) -> Result<Option<Vec<u8>>> {
        let path = self.blob_path(id);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read(path).map_err(ShelfError::Io)?))
    }

    fn write_blob(&self, id: &Uuid, bytes: &[u8]) -> Result<()> {
        let target = self.blob_path(id);
        self.atomic_write(&self.blobs_dir(), &target, bytes)
    }

    fn delete_blob(&self, id: &Uuid) -> Result<()> {
        let path = self.blob_path(id);
        if path.exists() {
            fs::remove_file(path).map_err(ShelfError::Io)?;
        }
        Ok(())
    }

    fn blob_url(&self, id: &Uuid) -> Result<Option<String>> {
        let path = self.blob_path(id);
        if !path.exists() {
            return Ok(None);
        }
        let absolute = fs::canonicalize(&path).map_err(ShelfError::Io)?;
        Ok(Some(format!("file://{}", absolute.display())))
    }
}
