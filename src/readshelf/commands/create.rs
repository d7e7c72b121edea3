use crate::commands::{Message, Shelf};
use crate::error::{Result, ShelfError};
use crate::model::{Book, Folder, FolderCategory, Placement};
use crate::ordering::{self, Container, MoveKind};
use crate::store::backend::StorageBackend;
use crate::store::LibraryStore;
use crate::upload::{default_title, UploadFile};
use tracing::{info, warn};
use uuid::Uuid;

fn required_name(kind: &str, name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ShelfError::Api(format!("{} name cannot be empty", kind)));
    }
    Ok(name.to_string())
}

/// Create a folder at the top of its container (uncategorized, or the given
/// category). Returns `None` if the backend rejected it.
pub fn folder<S: LibraryStore, B: StorageBackend>(
    shelf: &mut Shelf<S, B>,
    name: &str,
    description: Option<&str>,
    category_id: Option<Uuid>,
) -> Result<Option<Folder>> {
    let name = required_name("Folder", name)?;
    if let Some(id) = category_id {
        shelf.category_ref(&id)?;
    }
    let description = description.map(str::trim).filter(|d| !d.is_empty());
    let placement = Placement {
        category_id,
        position: 0,
    };

    let created = match shelf.store.create_folder(&name, description, placement) {
        Ok(folder) => folder,
        Err(e) => {
            warn!(error = %e, "folder not created");
            shelf.notify(Message::error(format!("Could not create folder: {}", e)));
            return Ok(None);
        }
    };

    let current = shelf.sections().container_order();
    let assignments = ordering::compute_move(
        MoveKind::Folder,
        created.id,
        Container::for_category(category_id),
        0,
        &current,
    );
    shelf.folders.insert(0, created.clone());
    shelf.apply_folder_assignments(&assignments);

    info!(id = %created.id, "folder created");
    shelf.notify(Message::success(format!("Created folder {}", created.name)));
    Ok(Some(created))
}

/// Create a category at the top of the category list.
pub fn category<S: LibraryStore, B: StorageBackend>(
    shelf: &mut Shelf<S, B>,
    name: &str,
) -> Result<Option<FolderCategory>> {
    let name = required_name("Category", name)?;

    let created = match shelf.store.create_category(&name, 0) {
        Ok(category) => category,
        Err(e) => {
            warn!(error = %e, "category not created");
            shelf.notify(Message::error(format!("Could not create category: {}", e)));
            return Ok(None);
        }
    };

    let current = shelf.sections().container_order();
    let assignments = ordering::compute_move(
        MoveKind::Category,
        created.id,
        Container::Categories,
        0,
        &current,
    );
    shelf.categories.insert(0, created.clone());
    let order = ordering::assigned_lists(&assignments)
        .remove(&Container::Categories)
        .unwrap_or_default();
    shelf.apply_category_order(order);

    info!(id = %created.id, "category created");
    shelf.notify(Message::success(format!("Created category {}", created.name)));
    Ok(Some(created))
}

/// Upload one PDF into a folder. A blank title falls back to one derived from
/// the file name.
pub fn book<S: LibraryStore, B: StorageBackend>(
    shelf: &mut Shelf<S, B>,
    folder_id: &Uuid,
    file: &UploadFile,
    title: &str,
) -> Result<Option<Book>> {
    shelf.folder_ref(folder_id)?;
    if !file.is_pdf() {
        return Err(ShelfError::Api(format!("{} is not a PDF", file.file_name)));
    }
    let title = match title.trim() {
        "" => default_title(&file.file_name),
        t => t.to_string(),
    };

    let created = match shelf.store.create_book(folder_id, file, &title) {
        Ok(book) => book,
        Err(e) => {
            warn!(error = %e, file = %file.file_name, "upload failed");
            shelf.notify(Message::error(format!(
                "Could not upload {}: {}",
                file.file_name, e
            )));
            return Ok(None);
        }
    };

    shelf.books.insert(0, created.clone());
    // Without an explicit order the book simply joins the state-based fallback.
    if let Some(order) = shelf.layout.book_order.get_mut(folder_id) {
        order.insert(0, created.id);
        shelf.save_layout();
    }

    info!(id = %created.id, folder = %folder_id, "book uploaded");
    shelf.notify(Message::success(format!("Added {}", created.title)));
    Ok(Some(created))
}

/// Upload several files. Non-PDFs are skipped with a warning; each accepted
/// file gets its default title.
pub fn books<S: LibraryStore, B: StorageBackend>(
    shelf: &mut Shelf<S, B>,
    folder_id: &Uuid,
    files: &[UploadFile],
) -> Result<Vec<Book>> {
    shelf.folder_ref(folder_id)?;
    let mut uploaded = Vec::new();
    for file in files {
        if !file.is_pdf() {
            shelf.notify(Message::warning(format!(
                "Skipped {}: only PDF files are accepted",
                file.file_name
            )));
            continue;
        }
        if let Some(book) = book(shelf, folder_id, file, "")? {
            uploaded.push(book);
        }
    }
    if files.len() > 1 {
        shelf.notify(Message::info(format!(
            "Uploaded {} of {} files",
            uploaded.len(),
            files.len()
        )));
    }
    Ok(uploaded)
}
