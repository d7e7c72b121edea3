//! # Storage Layer
//!
//! This module defines the persistence adapter for readshelf. The
//! [`LibraryStore`] trait gives the orchestrator one set of operations for
//! folders, books and categories regardless of where they live.
//!
//! ## Two Backends
//!
//! - **Local mode** ([`local::LocalStore`]): collections are JSON arrays in an
//!   embedded key-value store and PDF bytes are blobs next to them. Raw I/O goes
//!   through [`backend::StorageBackend`], implemented by
//!   [`fs_backend::FsBackend`] (production) and [`mem_backend::MemBackend`]
//!   (tests).
//! - **Cloud mode** ([`remote::RemoteStore`]): rows live in a hosted relational
//!   backend and PDFs in its object storage. `position` and `category_id` are
//!   real columns there, so the orchestrator mirrors ordering changes to them.
//!
//! [`memory::InMemoryStore`] implements the trait directly with a selectable
//! mode and failure injection, for testing orchestration without any I/O.
//!
//! ## Deletion Split
//!
//! Deleting a row and removing its file are separate operations
//! (`delete_book` / `remove_file`). The grace-period model needs that split:
//! local mode drops rows immediately but keeps blobs until the undo window
//! closes, and `restore_*` puts a snapshot row back on undo.
//!
//! ## Error Policy
//!
//! Adapters return `Result`. They never decide what the user sees; the
//! orchestrator turns failures into notifications.

use crate::error::{Result, ShelfError};
use crate::model::{
    Book, BookPatch, CategoryPatch, Folder, FolderCategory, FolderPatch, Placement,
};
use crate::upload::UploadFile;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod backend;
pub mod fs_backend;
pub mod local;
pub mod mem_backend;
pub mod memory;
pub mod remote;

/// Which kind of backend is answering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendMode {
    Local,
    Cloud,
}

impl std::fmt::Display for BackendMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendMode::Local => write!(f, "local"),
            BackendMode::Cloud => write!(f, "cloud"),
        }
    }
}

/// Abstract interface for library persistence.
pub trait LibraryStore {
    fn mode(&self) -> BackendMode;

    // --- Folders ---

    fn list_folders(&self) -> Result<Vec<Folder>>;

    /// Create a folder at the given placement.
    fn create_folder(
        &mut self,
        name: &str,
        description: Option<&str>,
        placement: Placement,
    ) -> Result<Folder>;

    fn update_folder(&mut self, id: &Uuid, patch: &FolderPatch) -> Result<()>;

    /// Delete the folder row only. Contained books are deleted separately.
    fn delete_folder(&mut self, id: &Uuid) -> Result<()>;

    /// Put a previously deleted folder row back, unchanged. `index` is where
    /// the row sat before it was deleted; ordered collections reinsert there.
    fn restore_folder(&mut self, folder: &Folder, index: usize) -> Result<()>;

    fn update_folder_placement(&mut self, id: &Uuid, placement: Placement) -> Result<()>;

    /// Mirror many placements. Each update is independent: a failure does not
    /// stop the rest, and the first error is reported once all were attempted.
    fn update_folder_placements(&mut self, placements: &[(Uuid, Placement)]) -> Result<()> {
        let mut failed = 0;
        let mut first_error = None;
        for (id, placement) in placements {
            if let Err(e) = self.update_folder_placement(id, *placement) {
                failed += 1;
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            None => Ok(()),
            Some(e) => Err(ShelfError::Store(format!(
                "{} of {} position updates failed: {}",
                failed,
                placements.len(),
                e
            ))),
        }
    }

    // --- Books ---

    fn list_books(&self) -> Result<Vec<Book>>;

    /// Store the file and create its row.
    fn create_book(&mut self, folder_id: &Uuid, file: &UploadFile, title: &str) -> Result<Book>;

    fn update_book(&mut self, id: &Uuid, patch: &BookPatch) -> Result<()>;

    /// Delete the book row only. The stored file is removed with `remove_file`.
    fn delete_book(&mut self, id: &Uuid) -> Result<()>;

    /// Put a previously deleted book row back at `index`, like `restore_folder`.
    fn restore_book(&mut self, book: &Book, index: usize) -> Result<()>;

    /// Remove a stored file. Removing a missing file is not an error.
    fn remove_file(&mut self, file_path: &str) -> Result<()>;

    /// A fetchable URL for a stored file, or None if it cannot be resolved.
    fn resolve_file_url(&self, file_path: &str) -> Result<Option<String>>;

    // --- Categories ---

    fn list_categories(&self) -> Result<Vec<FolderCategory>>;

    fn create_category(&mut self, name: &str, position: i64) -> Result<FolderCategory>;

    fn update_category(&mut self, id: &Uuid, patch: &CategoryPatch) -> Result<()>;

    fn delete_category(&mut self, id: &Uuid) -> Result<()>;
}
