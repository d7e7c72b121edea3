use crate::commands::{Message, Shelf};
use crate::error::Result;
use crate::model::{Book, LibraryStats};
use crate::ordering::{self, Sections};
use crate::store::backend::StorageBackend;
use crate::store::LibraryStore;
use tracing::warn;
use uuid::Uuid;

pub fn sections<S: LibraryStore, B: StorageBackend>(shelf: &Shelf<S, B>) -> Sections {
    shelf.sections()
}

/// Books of a folder in display order.
pub fn books<S: LibraryStore, B: StorageBackend>(
    shelf: &Shelf<S, B>,
    folder_id: &Uuid,
) -> Result<Vec<Book>> {
    shelf.folder_ref(folder_id)?;
    Ok(ordering::derive_book_order(
        &shelf.books,
        folder_id,
        &shelf.layout,
    ))
}

pub fn stats<S: LibraryStore, B: StorageBackend>(shelf: &Shelf<S, B>) -> LibraryStats {
    LibraryStats::collect(&shelf.books, &shelf.folders, &shelf.categories)
}

/// A URL the viewer can open. `None` (with a warning) if the file cannot be
/// resolved.
pub fn book_url<S: LibraryStore, B: StorageBackend>(
    shelf: &mut Shelf<S, B>,
    id: &Uuid,
) -> Result<Option<String>> {
    let book = shelf.book_ref(id)?;
    let title = book.title.clone();
    match shelf.store.resolve_file_url(&book.file_path) {
        Ok(Some(url)) => Ok(Some(url)),
        Ok(None) => {
            shelf.notify(Message::warning(format!("File for {} is missing", title)));
            Ok(None)
        }
        Err(e) => {
            warn!(%id, error = %e, "could not resolve file url");
            shelf.notify(Message::error(format!("Could not open {}: {}", title, e)));
            Ok(None)
        }
    }
}
