//! Grace-period deletes, undo, and category removal.
//!
//! Book and folder deletes disappear from the shelf immediately and stay
//! recoverable until their window closes. What "immediately" means for the
//! backend depends on the mode:
//!
//! | mode  | at request           | at finalization                 |
//! |-------|----------------------|---------------------------------|
//! | local | rows removed         | blobs removed                   |
//! | cloud | nothing (memory only)| storage objects, then rows      |
//!
//! A folder is deleted together with its books: they share one snapshot and
//! are restored or finalized in a single step.
//!
//! Category deletes are immediate. By default the category's folders move to
//! the end of uncategorized; [`CategoryDeleteMode::Cascade`] deletes each
//! folder through the folder grace period instead.

use crate::commands::{Message, Shelf};
use crate::error::{EntityKind, Result};
use crate::ordering::{Assignment, Container, PositionAssignments};
use crate::store::backend::StorageBackend;
use crate::store::{BackendMode, LibraryStore};
use crate::undo::{BookSnapshot, DeletionClass, FolderSnapshot, PendingDeletion};
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryDeleteMode {
    #[default]
    MoveToUncategorized,
    Cascade,
}

pub fn book<S: LibraryStore, B: StorageBackend>(shelf: &mut Shelf<S, B>, id: &Uuid) -> Result<()> {
    let folder_id = shelf.book_ref(id)?.folder_id;
    if let Some(prior) = shelf.book_deletions.finalize() {
        finalize_book(shelf, prior);
    }

    if shelf.mode() == BackendMode::Local {
        if let Err(e) = shelf.store.delete_book(id) {
            warn!(%id, error = %e, "book not deleted");
            shelf.notify(Message::error(format!("Could not delete book: {}", e)));
            return Ok(());
        }
    }

    let Some(index) = shelf.books.iter().position(|b| b.id == *id) else {
        return Ok(());
    };
    let folder_index = folder_index_of(shelf, &folder_id, id);
    let book = shelf.books.remove(index);
    let title = book.title.clone();
    let now = shelf.now();
    let snapshot = BookSnapshot {
        book,
        index,
        folder_index,
    };
    if shelf.book_deletions.arm(*id, snapshot, now).is_err() {
        warn!(%id, "book grace period busy");
    }

    debug!(%id, "book pending deletion");
    shelf.notify(Message::success(format!("Deleted {}", title)).undoable(DeletionClass::Book));
    Ok(())
}

pub fn folder<S: LibraryStore, B: StorageBackend>(
    shelf: &mut Shelf<S, B>,
    id: &Uuid,
) -> Result<()> {
    shelf.folder_ref(id)?;
    if let Some(prior) = shelf.folder_deletions.finalize() {
        finalize_folder(shelf, prior);
    }
    // A pending book from this folder could not be restored without it.
    if shelf
        .book_deletions
        .pending()
        .is_some_and(|p| p.snapshot.book.folder_id == *id)
    {
        if let Some(prior) = shelf.book_deletions.finalize() {
            finalize_book(shelf, prior);
        }
    }

    let shown = shelf.book_ids_in(id);
    let books: Vec<BookSnapshot> = shelf
        .books
        .iter()
        .enumerate()
        .filter(|(_, b)| b.folder_id == *id)
        .map(|(index, b)| BookSnapshot {
            book: b.clone(),
            index,
            folder_index: shown.iter().position(|s| *s == b.id).unwrap_or(0),
        })
        .collect();

    if shelf.mode() == BackendMode::Local {
        if let Err(e) = delete_local_rows(shelf, id, &books) {
            warn!(%id, error = %e, "folder not deleted");
            shelf.notify(Message::error(format!("Could not delete folder: {}", e)));
            return Ok(());
        }
    }

    let Some(index) = shelf.folders.iter().position(|f| f.id == *id) else {
        return Ok(());
    };
    let folder = shelf.folders.remove(index);
    shelf.books.retain(|b| b.folder_id != *id);

    let name = folder.name.clone();
    let count = books.len();
    let now = shelf.now();
    let snapshot = FolderSnapshot {
        folder,
        index,
        books,
    };
    if shelf.folder_deletions.arm(*id, snapshot, now).is_err() {
        warn!(%id, "folder grace period busy");
    }

    debug!(%id, books = count, "folder pending deletion");
    shelf.notify(
        Message::success(format!("Deleted folder {} ({} books)", name, count))
            .undoable(DeletionClass::Folder),
    );
    Ok(())
}

/// Remove book rows, then the folder row. On failure the rows already removed
/// are put back so the folder is never half deleted.
fn delete_local_rows<S: LibraryStore, B: StorageBackend>(
    shelf: &mut Shelf<S, B>,
    id: &Uuid,
    books: &[BookSnapshot],
) -> Result<()> {
    let mut removed: Vec<&BookSnapshot> = Vec::new();
    let mut outcome = Ok(());
    for snapshot in books {
        match shelf.store.delete_book(&snapshot.book.id) {
            Ok(()) => removed.push(snapshot),
            Err(e) => {
                outcome = Err(e);
                break;
            }
        }
    }
    if outcome.is_ok() {
        outcome = shelf.store.delete_folder(id);
    }
    if outcome.is_err() {
        for s in removed {
            if let Err(e) = shelf.store.restore_book(&s.book, s.index) {
                warn!(id = %s.book.id, error = %e, "could not put book row back");
            }
        }
    }
    outcome
}

fn folder_index_of<S: LibraryStore, B: StorageBackend>(
    shelf: &Shelf<S, B>,
    folder_id: &Uuid,
    id: &Uuid,
) -> usize {
    shelf
        .book_ids_in(folder_id)
        .iter()
        .position(|b| b == id)
        .unwrap_or(0)
}

/// Revert the pending deletion of a class. Returns false if there was none.
pub fn undo<S: LibraryStore, B: StorageBackend>(
    shelf: &mut Shelf<S, B>,
    class: DeletionClass,
) -> bool {
    let now = shelf.now();
    match class {
        DeletionClass::Book => {
            let Some(pending) = shelf.book_deletions.undo(now) else {
                return false;
            };
            let snapshot = pending.snapshot;
            if shelf.mode() == BackendMode::Local {
                let result = shelf.store.restore_book(&snapshot.book, snapshot.index);
                if result.is_err() {
                    shelf.record_sync(EntityKind::Book, snapshot.book.id, result);
                }
            }
            shelf.notify(Message::info(format!("Restored {}", snapshot.book.title)));
            reinsert_book(shelf, snapshot);
            shelf.book_deletions.settle();
        }
        DeletionClass::Folder => {
            let Some(pending) = shelf.folder_deletions.undo(now) else {
                return false;
            };
            let snapshot = pending.snapshot;
            if shelf.mode() == BackendMode::Local {
                restore_local_rows(shelf, &snapshot);
            }
            shelf.notify(Message::info(format!("Restored folder {}", snapshot.folder.name)));
            reinsert_folder(shelf, snapshot);
            shelf.folder_deletions.settle();
        }
    }
    info!(%class, "deletion undone");
    true
}

fn restore_local_rows<S: LibraryStore, B: StorageBackend>(
    shelf: &mut Shelf<S, B>,
    snapshot: &FolderSnapshot,
) {
    let result = shelf.store.restore_folder(&snapshot.folder, snapshot.index);
    if result.is_err() {
        shelf.record_sync(EntityKind::Folder, snapshot.folder.id, result);
    }
    for s in &snapshot.books {
        let result = shelf.store.restore_book(&s.book, s.index);
        if result.is_err() {
            shelf.record_sync(EntityKind::Book, s.book.id, result);
        }
    }
}

fn reinsert_book<S: LibraryStore, B: StorageBackend>(shelf: &mut Shelf<S, B>, snapshot: BookSnapshot) {
    if shelf.books.iter().any(|b| b.id == snapshot.book.id) {
        return;
    }
    // A manual order written while the book was hidden does not list it.
    let mut relisted = false;
    if let Some(order) = shelf.layout.book_order.get_mut(&snapshot.book.folder_id) {
        if !order.contains(&snapshot.book.id) {
            order.insert(snapshot.folder_index.min(order.len()), snapshot.book.id);
            relisted = true;
        }
    }
    if relisted {
        shelf.save_layout();
    }
    let index = snapshot.index.min(shelf.books.len());
    shelf.books.insert(index, snapshot.book);
}

/// Folder and books go back in one step.
fn reinsert_folder<S: LibraryStore, B: StorageBackend>(
    shelf: &mut Shelf<S, B>,
    snapshot: FolderSnapshot,
) {
    if !shelf.folders.iter().any(|f| f.id == snapshot.folder.id) {
        let index = snapshot.index.min(shelf.folders.len());
        shelf.folders.insert(index, snapshot.folder);
    }
    // Snapshots were taken in collection order, so ascending inserts rebuild it.
    for book in snapshot.books {
        reinsert_book(shelf, book);
    }
}

/// Run the backend side of a book deletion. On failure the book comes back.
fn finalize_book<S: LibraryStore, B: StorageBackend>(
    shelf: &mut Shelf<S, B>,
    pending: PendingDeletion<BookSnapshot>,
) {
    let book = &pending.snapshot.book;
    let mut result = shelf.store.remove_file(&book.file_path);
    if result.is_ok() && shelf.mode() == BackendMode::Cloud {
        result = shelf.store.delete_book(&book.id);
    }

    match result {
        Ok(()) => {
            shelf.layout.forget_book(&book.id);
            shelf.unsynced.remove(&book.id);
            shelf.save_layout();
            debug!(id = %book.id, "book deletion finalized");
        }
        Err(e) => {
            warn!(id = %book.id, error = %e, "book deletion failed, restoring");
            if shelf.mode() == BackendMode::Local {
                if let Err(e) = shelf.store.restore_book(book, pending.snapshot.index) {
                    warn!(id = %book.id, error = %e, "could not put book row back");
                }
            }
            shelf.notify(Message::error(format!(
                "Could not delete {}: {}",
                book.title, e
            )));
            reinsert_book(shelf, pending.snapshot);
        }
    }
    shelf.book_deletions.settle();
}

/// Run the backend side of a folder deletion. Books are finalized one at a
/// time; on failure the ones already gone stay gone and the folder comes back
/// with the rest.
fn finalize_folder<S: LibraryStore, B: StorageBackend>(
    shelf: &mut Shelf<S, B>,
    pending: PendingDeletion<FolderSnapshot>,
) {
    let cloud = shelf.mode() == BackendMode::Cloud;
    let mut gone: Vec<Uuid> = Vec::new();
    let mut result = Ok(());
    for s in &pending.snapshot.books {
        result = shelf.store.remove_file(&s.book.file_path);
        if result.is_err() {
            break;
        }
        // Without its file the book is unreadable, so it counts as deleted
        // even if the row delete below fails.
        gone.push(s.book.id);
        if cloud {
            result = shelf.store.delete_book(&s.book.id);
            if result.is_err() {
                break;
            }
        }
    }
    if result.is_ok() && cloud {
        result = shelf.store.delete_folder(&pending.snapshot.folder.id);
    }

    for id in &gone {
        shelf.layout.forget_book(id);
        shelf.unsynced.remove(id);
    }
    match result {
        Ok(()) => {
            let id = pending.snapshot.folder.id;
            shelf.layout.forget_folder(&id);
            shelf.unsynced.remove(&id);
            shelf.save_layout();
            debug!(%id, "folder deletion finalized");
        }
        Err(e) => {
            let snapshot = without_books(pending.snapshot, &gone);
            warn!(
                id = %snapshot.folder.id,
                removed = gone.len(),
                error = %e,
                "folder deletion failed, restoring"
            );
            if !gone.is_empty() {
                shelf.save_layout();
            }
            if !cloud {
                restore_local_rows(shelf, &snapshot);
            }
            shelf.notify(Message::error(format!(
                "Could not delete folder {}: {}",
                snapshot.folder.name, e
            )));
            reinsert_folder(shelf, snapshot);
        }
    }
    shelf.folder_deletions.settle();
}

/// Drop finalized books from a folder snapshot. Collection indexes of the
/// remaining books shift down past each dropped one.
fn without_books(mut snapshot: FolderSnapshot, gone: &[Uuid]) -> FolderSnapshot {
    let dropped: Vec<usize> = snapshot
        .books
        .iter()
        .filter(|s| gone.contains(&s.book.id))
        .map(|s| s.index)
        .collect();
    snapshot.books.retain(|s| !gone.contains(&s.book.id));
    for s in &mut snapshot.books {
        s.index -= dropped.iter().filter(|i| **i < s.index).count();
    }
    snapshot
}

/// Finalize every deletion whose window has closed.
pub fn expire<S: LibraryStore, B: StorageBackend>(shelf: &mut Shelf<S, B>) {
    let now = shelf.now();
    if let Some(pending) = shelf.book_deletions.finalize_expired(now) {
        finalize_book(shelf, pending);
    }
    if let Some(pending) = shelf.folder_deletions.finalize_expired(now) {
        finalize_folder(shelf, pending);
    }
}

/// Finalize every pending deletion now, forfeiting the undo windows.
pub fn flush<S: LibraryStore, B: StorageBackend>(shelf: &mut Shelf<S, B>) {
    if let Some(pending) = shelf.book_deletions.finalize() {
        finalize_book(shelf, pending);
    }
    if let Some(pending) = shelf.folder_deletions.finalize() {
        finalize_folder(shelf, pending);
    }
}

pub fn category<S: LibraryStore, B: StorageBackend>(
    shelf: &mut Shelf<S, B>,
    id: &Uuid,
    mode: CategoryDeleteMode,
) -> Result<()> {
    let name = shelf.category_ref(id)?.name.clone();
    let sections = shelf.sections();
    let contained: Vec<Uuid> = sections
        .categories
        .iter()
        .find(|s| s.category.id == *id)
        .map(|s| s.folders.iter().map(|f| f.id).collect())
        .unwrap_or_default();

    if mode == CategoryDeleteMode::Cascade {
        for folder_id in &contained {
            folder(shelf, folder_id)?;
        }
    }

    if let Err(e) = shelf.store.delete_category(id) {
        warn!(%id, error = %e, "category not deleted");
        shelf.notify(Message::error(format!("Could not delete category: {}", e)));
        return Ok(());
    }
    shelf.categories.retain(|c| c.id != *id);
    shelf.layout.category_order.retain(|c| c != id);

    if mode == CategoryDeleteMode::MoveToUncategorized && !contained.is_empty() {
        let mut assignments = PositionAssignments::new();
        let order = sections.uncategorized.iter().map(|f| f.id).chain(contained);
        for (position, folder_id) in order.enumerate() {
            assignments.insert(
                folder_id,
                Assignment {
                    container: Container::Uncategorized,
                    position: position as i64,
                },
            );
        }
        shelf.apply_folder_assignments(&assignments);
    } else {
        shelf.save_layout();
    }

    info!(%id, ?mode, "category deleted");
    shelf.notify(Message::success(format!("Deleted category {}", name)));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures::{
        book as add_book, cloud_fixture, fixture, folder as add_folder, Fixture,
    };
    use crate::commands::{create, moves, MessageLevel};
    use crate::model::Book;
    use crate::store::memory::FailOp;
    use std::collections::HashSet;

    fn library_with_books(f: &mut Fixture, n: usize) -> (Uuid, Vec<Book>) {
        let dir = add_folder(&mut f.shelf, "Shelf");
        let books = (0..n)
            .map(|i| add_book(&mut f.shelf, dir.id, &format!("book-{}.pdf", i)))
            .collect();
        (dir.id, books)
    }

    #[test]
    fn undo_restores_book_and_blob_exactly() {
        let mut f = fixture();
        let (_, books) = library_with_books(&mut f, 3);
        let target = books[1].clone();
        let before = f.shelf.books.clone();
        let rows = f.shelf.store.list_books().unwrap();
        let blob = f.shelf.store.file(&target.file_path).cloned();

        book(&mut f.shelf, &target.id).unwrap();
        assert!(f.shelf.book_ref(&target.id).is_err());
        assert!(f.shelf.store.book_row(&target.id).is_none());
        assert_eq!(f.shelf.store.file(&target.file_path).cloned(), blob);

        f.clock.advance_ms(4000);
        assert!(undo(&mut f.shelf, DeletionClass::Book));
        assert_eq!(f.shelf.books, before);
        assert_eq!(f.shelf.store.list_books().unwrap(), rows);
        assert_eq!(f.shelf.store.file(&target.file_path).cloned(), blob);

        // The next session loads the same order.
        f.shelf.reload();
        assert_eq!(f.shelf.books, before);
    }

    #[test]
    fn folder_undo_keeps_row_order() {
        let mut f = fixture();
        let (dir, _) = library_with_books(&mut f, 2);
        add_folder(&mut f.shelf, "Other");
        let folders = f.shelf.store.list_folders().unwrap();
        let rows = f.shelf.store.list_books().unwrap();

        folder(&mut f.shelf, &dir).unwrap();
        assert!(undo(&mut f.shelf, DeletionClass::Folder));
        assert_eq!(f.shelf.store.list_folders().unwrap(), folders);
        assert_eq!(f.shelf.store.list_books().unwrap(), rows);
    }

    #[test]
    fn undo_after_reorder_returns_book_to_its_slot() {
        let mut f = fixture();
        let (dir, _) = library_with_books(&mut f, 3);
        let shown = f.shelf.book_ids_in(&dir);

        book(&mut f.shelf, &shown[1]).unwrap();
        // Reordering writes a manual order that cannot list the hidden book.
        assert!(moves::book(&mut f.shelf, &shown[2], &dir, 0).unwrap());
        assert_eq!(f.shelf.book_ids_in(&dir), vec![shown[2], shown[0]]);

        assert!(undo(&mut f.shelf, DeletionClass::Book));
        assert_eq!(f.shelf.book_ids_in(&dir), vec![shown[2], shown[1], shown[0]]);
        assert_eq!(
            f.shelf.layout.book_order[&dir],
            vec![shown[2], shown[1], shown[0]]
        );
    }

    #[test]
    fn expired_book_is_gone_with_its_blob() {
        let mut f = fixture();
        let (_, books) = library_with_books(&mut f, 1);
        let target = books[0].clone();

        book(&mut f.shelf, &target.id).unwrap();
        f.clock.advance_ms(4999);
        expire(&mut f.shelf);
        assert!(f.shelf.store.file(&target.file_path).is_some());

        f.clock.advance_ms(1);
        expire(&mut f.shelf);
        assert!(f.shelf.store.file(&target.file_path).is_none());
        assert!(f.shelf.book_ref(&target.id).is_err());
        assert!(f.shelf.book_deletions.is_idle());
        assert!(!undo(&mut f.shelf, DeletionClass::Book));
    }

    #[test]
    fn second_delete_finalizes_the_first() {
        let mut f = fixture();
        let (_, books) = library_with_books(&mut f, 2);
        let (a, b) = (books[0].clone(), books[1].clone());

        book(&mut f.shelf, &a.id).unwrap();
        f.clock.advance_ms(1000);
        book(&mut f.shelf, &b.id).unwrap();

        assert!(f.shelf.store.file(&a.file_path).is_none());
        assert_eq!(f.shelf.pending_deletion(DeletionClass::Book), Some(b.id));

        // B gets a fresh window measured from its own request.
        f.clock.advance_ms(4500);
        assert!(undo(&mut f.shelf, DeletionClass::Book));
        assert!(f.shelf.book_ref(&b.id).is_ok());
        assert!(f.shelf.book_ref(&a.id).is_err());
    }

    #[test]
    fn undo_twice_restores_once() {
        let mut f = fixture();
        let (_, books) = library_with_books(&mut f, 1);
        book(&mut f.shelf, &books[0].id).unwrap();
        assert!(undo(&mut f.shelf, DeletionClass::Book));
        assert!(!undo(&mut f.shelf, DeletionClass::Book));
        assert_eq!(f.shelf.books.len(), 1);
    }

    #[test]
    fn folder_cascade_is_atomic() {
        let mut f = fixture();
        let (dir, books) = library_with_books(&mut f, 3);
        let before = f.shelf.books.clone();

        folder(&mut f.shelf, &dir).unwrap();
        assert!(f.shelf.folder_ref(&dir).is_err());
        assert!(f.shelf.books.is_empty());
        assert!(f.shelf.store.folder_row(&dir).is_none());
        assert_eq!(f.shelf.store.file_count(), 3);

        f.clock.advance_ms(2500);
        expire(&mut f.shelf);
        assert!(f.shelf.books.is_empty());

        assert!(undo(&mut f.shelf, DeletionClass::Folder));
        assert!(f.shelf.folder_ref(&dir).is_ok());
        assert_eq!(f.shelf.books, before);
        for b in &books {
            assert!(f.shelf.store.book_row(&b.id).is_some());
        }
    }

    #[test]
    fn folder_finalization_removes_all_blobs() {
        let mut f = fixture();
        let (dir, _) = library_with_books(&mut f, 3);
        folder(&mut f.shelf, &dir).unwrap();
        flush(&mut f.shelf);
        assert_eq!(f.shelf.store.file_count(), 0);
        assert!(f.shelf.folder_deletions.is_idle());
        assert!(!f.shelf.layout.folder_positions.contains_key(&dir));
    }

    #[test]
    fn cloud_rows_survive_until_finalized() {
        let mut f = cloud_fixture();
        let (dir, books) = library_with_books(&mut f, 2);

        folder(&mut f.shelf, &dir).unwrap();
        assert!(f.shelf.store.folder_row(&dir).is_some());
        assert!(f.shelf.folder_ref(&dir).is_err());

        // A refresh must not resurrect the pending folder.
        f.shelf.reload();
        assert!(f.shelf.folder_ref(&dir).is_err());
        assert!(f.shelf.books.is_empty());

        f.clock.advance_ms(5000);
        expire(&mut f.shelf);
        assert!(f.shelf.store.folder_row(&dir).is_none());
        for b in &books {
            assert!(f.shelf.store.book_row(&b.id).is_none());
            assert!(f.shelf.store.file(&b.file_path).is_none());
        }
    }

    #[test]
    fn failed_finalization_brings_the_book_back() {
        let mut f = cloud_fixture();
        let (_, books) = library_with_books(&mut f, 1);
        f.shelf.take_messages();
        book(&mut f.shelf, &books[0].id).unwrap();
        f.shelf.store.fail(FailOp::RemoveFile);

        flush(&mut f.shelf);
        assert!(f.shelf.book_ref(&books[0].id).is_ok());
        let messages = f.shelf.take_messages();
        assert_eq!(messages.last().unwrap().level, MessageLevel::Error);
    }

    /// Memory, rows and files must describe the same folder after a flush.
    fn assert_consistent(f: &Fixture, dir: &Uuid) {
        let shown: HashSet<Uuid> = f
            .shelf
            .books
            .iter()
            .filter(|b| b.folder_id == *dir)
            .map(|b| b.id)
            .collect();
        let stored: HashSet<Uuid> = f
            .shelf
            .store
            .list_books()
            .unwrap()
            .iter()
            .filter(|b| b.folder_id == *dir)
            .map(|b| b.id)
            .collect();
        assert_eq!(shown, stored);
        for b in f.shelf.books.iter().filter(|b| b.folder_id == *dir) {
            assert!(f.shelf.store.file(&b.file_path).is_some(), "{} lost its file", b.title);
        }
    }

    #[test]
    fn partial_cloud_folder_finalization_keeps_only_surviving_books() {
        let mut f = cloud_fixture();
        let (dir, _) = library_with_books(&mut f, 3);
        f.shelf.take_messages();

        folder(&mut f.shelf, &dir).unwrap();
        f.shelf.store.fail_after(FailOp::RemoveFile, 1);
        flush(&mut f.shelf);

        assert!(f.shelf.folder_ref(&dir).is_ok());
        assert_eq!(f.shelf.books.len(), 2);
        assert_eq!(f.shelf.store.file_count(), 2);
        assert_consistent(&f, &dir);
        assert_eq!(f.shelf.take_messages().last().unwrap().level, MessageLevel::Error);

        f.shelf.store.heal();
        f.shelf.reload();
        assert_eq!(f.shelf.books.len(), 2);
        assert_consistent(&f, &dir);
    }

    #[test]
    fn partial_local_folder_finalization_keeps_only_surviving_books() {
        let mut f = fixture();
        let (dir, _) = library_with_books(&mut f, 3);
        add_folder(&mut f.shelf, "Other");
        let rows = f.shelf.store.list_books().unwrap();

        folder(&mut f.shelf, &dir).unwrap();
        f.shelf.store.fail_after(FailOp::RemoveFile, 1);
        flush(&mut f.shelf);
        f.shelf.store.heal();

        assert!(f.shelf.store.folder_row(&dir).is_some());
        assert_eq!(f.shelf.books.len(), 2);
        assert_consistent(&f, &dir);
        // Survivors keep their relative row order.
        let survivors: Vec<Uuid> = rows
            .iter()
            .filter(|b| f.shelf.store.book_row(&b.id).is_some())
            .map(|b| b.id)
            .collect();
        let stored: Vec<Uuid> = f.shelf.store.list_books().unwrap().iter().map(|b| b.id).collect();
        assert_eq!(stored, survivors);
        assert_eq!(f.shelf.books.iter().map(|b| b.id).collect::<Vec<_>>(), survivors);
    }

    #[test]
    fn delete_message_offers_undo() {
        let mut f = fixture();
        let (_, books) = library_with_books(&mut f, 1);
        f.shelf.take_messages();
        book(&mut f.shelf, &books[0].id).unwrap();
        let messages = f.shelf.take_messages();
        assert_eq!(messages[0].undo, Some(DeletionClass::Book));
    }

    #[test]
    fn undo_keeps_folder_position() {
        let mut f = fixture();
        let a = add_folder(&mut f.shelf, "A");
        let b = add_folder(&mut f.shelf, "B");
        let c = add_folder(&mut f.shelf, "C");
        moves::folder(&mut f.shelf, &a.id, None, 1).unwrap();
        let order = f.shelf.sections().flattened_ids();
        assert_eq!(order, vec![c.id, a.id, b.id]);

        folder(&mut f.shelf, &a.id).unwrap();
        assert_eq!(f.shelf.sections().flattened_ids(), vec![c.id, b.id]);
        undo(&mut f.shelf, DeletionClass::Folder);
        assert_eq!(f.shelf.sections().flattened_ids(), order);
    }

    #[test]
    fn category_delete_moves_folders_to_uncategorized_end() {
        let mut f = cloud_fixture();
        let work = create::category(&mut f.shelf, "Work").unwrap().unwrap();
        let loose = add_folder(&mut f.shelf, "Loose");
        let x = create::folder(&mut f.shelf, "X", None, Some(work.id)).unwrap().unwrap();
        let y = create::folder(&mut f.shelf, "Y", None, Some(work.id)).unwrap().unwrap();

        category(&mut f.shelf, &work.id, CategoryDeleteMode::MoveToUncategorized).unwrap();
        assert!(f.shelf.categories.is_empty());
        assert!(f.shelf.layout.category_order.is_empty());
        assert_eq!(
            f.shelf.sections().flattened_ids(),
            vec![loose.id, y.id, x.id]
        );
        assert_eq!(f.shelf.store.folder_row(&x.id).unwrap().category_id, None);
        assert_eq!(f.shelf.store.folder_row(&x.id).unwrap().position, Some(2));
    }

    #[test]
    fn category_cascade_deletes_folders() {
        let mut f = fixture();
        let work = create::category(&mut f.shelf, "Work").unwrap().unwrap();
        let x = create::folder(&mut f.shelf, "X", None, Some(work.id)).unwrap().unwrap();
        let y = create::folder(&mut f.shelf, "Y", None, Some(work.id)).unwrap().unwrap();
        add_book(&mut f.shelf, x.id, "x.pdf");

        category(&mut f.shelf, &work.id, CategoryDeleteMode::Cascade).unwrap();
        assert!(f.shelf.folders.is_empty());
        assert!(f.shelf.books.is_empty());
        // Y was finalized when X was deleted; X keeps its blob until its
        // own window closes.
        assert_eq!(f.shelf.pending_deletion(DeletionClass::Folder), Some(x.id));
        assert_eq!(f.shelf.store.file_count(), 1);
        assert!(f.shelf.store.folder_row(&y.id).is_none());

        // The restored folder falls back to uncategorized.
        undo(&mut f.shelf, DeletionClass::Folder);
        assert_eq!(f.shelf.sections().uncategorized[0].id, x.id);
    }

    #[test]
    fn failed_category_delete_keeps_it() {
        let mut f = fixture();
        let work = create::category(&mut f.shelf, "Work").unwrap().unwrap();
        f.shelf.store.fail(FailOp::Delete);
        category(&mut f.shelf, &work.id, CategoryDeleteMode::MoveToUncategorized).unwrap();
        assert_eq!(f.shelf.categories.len(), 1);
    }
}
