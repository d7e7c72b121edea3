//! Renames and reading progress.
//!
//! Every function here applies its change in memory first, then persists it.
//! See [`Shelf::record_sync`] for what happens when persisting fails.

use crate::commands::Shelf;
use crate::error::{EntityKind, Result, ShelfError};
use crate::model::{Book, BookPatch, CategoryPatch, FolderPatch};
use crate::store::backend::StorageBackend;
use crate::store::LibraryStore;
use uuid::Uuid;

pub fn folder<S: LibraryStore, B: StorageBackend>(
    shelf: &mut Shelf<S, B>,
    id: &Uuid,
    patch: FolderPatch,
) -> Result<()> {
    shelf.folder_ref(id)?;
    let mut patch = patch;
    if let Some(name) = &patch.name {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(ShelfError::Api("Folder name cannot be empty".to_string()));
        }
        patch.name = Some(trimmed.to_string());
    }
    if let Some(Some(description)) = &patch.description {
        let trimmed = description.trim();
        patch.description = Some((!trimmed.is_empty()).then(|| trimmed.to_string()));
    }
    if patch.is_empty() {
        return Ok(());
    }

    let now = shelf.now();
    if let Some(folder) = shelf.folders.iter_mut().find(|f| f.id == *id) {
        patch.apply_to(folder, now);
    }
    let result = shelf.store.update_folder(id, &patch);
    shelf.record_sync(EntityKind::Folder, *id, result);
    Ok(())
}

pub fn rename_book<S: LibraryStore, B: StorageBackend>(
    shelf: &mut Shelf<S, B>,
    id: &Uuid,
    title: &str,
) -> Result<()> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ShelfError::Api("Title cannot be empty".to_string()));
    }
    apply_book_patch(shelf, id, BookPatch::title(title))
}

pub fn rename_category<S: LibraryStore, B: StorageBackend>(
    shelf: &mut Shelf<S, B>,
    id: &Uuid,
    name: &str,
) -> Result<()> {
    shelf.category_ref(id)?;
    let name = name.trim();
    if name.is_empty() {
        return Err(ShelfError::Api("Category name cannot be empty".to_string()));
    }
    let patch = CategoryPatch {
        name: Some(name.to_string()),
        ..Default::default()
    };

    let now = shelf.now();
    if let Some(category) = shelf.categories.iter_mut().find(|c| c.id == *id) {
        patch.apply_to(category, now);
    }
    let result = shelf.store.update_category(id, &patch);
    shelf.record_sync(EntityKind::Category, *id, result);
    Ok(())
}

/// Mark a book read (jumping to its last page) or unread.
pub fn set_book_read<S: LibraryStore, B: StorageBackend>(
    shelf: &mut Shelf<S, B>,
    id: &Uuid,
    is_read: bool,
) -> Result<()> {
    let patch = shelf.book_ref(id)?.read_patch(is_read, shelf.now());
    apply_book_patch(shelf, id, patch)
}

/// Record the viewer's page position. Reaching the last page marks the book
/// read and paging back below it unmarks it.
pub fn progress<S: LibraryStore, B: StorageBackend>(
    shelf: &mut Shelf<S, B>,
    id: &Uuid,
    current_page: u32,
    total_pages: u32,
) -> Result<()> {
    let patch = shelf
        .book_ref(id)?
        .progress_patch(current_page, total_pages, shelf.now());
    apply_book_patch(shelf, id, patch)
}

pub(crate) fn apply_book_patch<S: LibraryStore, B: StorageBackend>(
    shelf: &mut Shelf<S, B>,
    id: &Uuid,
    patch: BookPatch,
) -> Result<()> {
    let now = shelf.now();
    let book: &mut Book = shelf
        .books
        .iter_mut()
        .find(|b| b.id == *id)
        .ok_or(ShelfError::not_found(EntityKind::Book, *id))?;
    patch.apply_to(book, now);
    let result = shelf.store.update_book(id, &patch);
    shelf.record_sync(EntityKind::Book, *id, result);
    Ok(())
}
