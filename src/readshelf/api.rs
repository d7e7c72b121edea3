//! # API Facade
//!
//! [`Library`] is the single entry point for every readshelf operation,
//! whatever the UI. It owns the session state and dispatches to the command
//! layer.
//!
//! ## Role and Responsibilities
//!
//! The facade:
//! - **Drives time**: every mutating call first runs [`Library::tick`], so
//!   deletions whose grace window closed are finalized before anything else
//!   happens
//! - **Dispatches** to the matching function in [`crate::commands`]
//! - **Resolves selectors**: the CLI names entities by id prefix or name
//!
//! It holds no business logic of its own.
//!
//! ## Generic Over Storage
//!
//! `Library<S: LibraryStore, B: StorageBackend>`:
//! - Production: `Library<LocalStore<FsBackend>, FsBackend>` or
//!   `Library<RemoteStore, FsBackend>` (the layout overlay is always local)
//! - Testing: `Library<InMemoryStore, MemBackend>` with a [`ManualClock`]
//!
//! [`ManualClock`]: crate::clock::ManualClock

use crate::clock::{Clock, SystemClock};
use crate::commands::delete::CategoryDeleteMode;
use crate::commands::{create, delete, list, moves, update, Message, Shelf};
use crate::error::{EntityKind, Result, ShelfError};
use crate::layout::{FolderLayout, LayoutStore};
use crate::model::{Book, Folder, FolderCategory, FolderPatch, LibraryStats};
use crate::ordering::Sections;
use crate::store::backend::StorageBackend;
use crate::store::{BackendMode, LibraryStore};
use crate::undo::{DeletionClass, DEFAULT_GRACE_MS};
use crate::upload::UploadFile;
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub struct Library<S: LibraryStore, B: StorageBackend> {
    shelf: Shelf<S, B>,
}

impl<S: LibraryStore, B: StorageBackend> Library<S, B> {
    pub fn open(store: S, layout_store: LayoutStore<B>) -> Self {
        Self::open_with(store, layout_store, Box::new(SystemClock), DEFAULT_GRACE_MS)
    }

    pub fn open_with(
        store: S,
        layout_store: LayoutStore<B>,
        clock: Box<dyn Clock>,
        grace_period_ms: u64,
    ) -> Self {
        Self {
            shelf: Shelf::load(store, layout_store, clock, grace_period_ms),
        }
    }

    pub fn mode(&self) -> BackendMode {
        self.shelf.mode()
    }

    pub fn store(&self) -> &S {
        self.shelf.store()
    }

    pub fn store_mut(&mut self) -> &mut S {
        self.shelf.store_mut()
    }

    pub fn layout(&self) -> &FolderLayout {
        self.shelf.layout()
    }

    /// Finalize deletions whose grace window has closed.
    pub fn tick(&mut self) {
        delete::expire(&mut self.shelf);
    }

    /// When the earliest open grace window closes. A long-running host should
    /// call [`Library::tick`] at that time; `None` means nothing is pending.
    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        self.shelf.next_deadline()
    }

    /// Finalize all pending deletions now. Call before the session ends.
    pub fn flush(&mut self) {
        delete::flush(&mut self.shelf);
    }

    pub fn take_messages(&mut self) -> Vec<Message> {
        self.shelf.take_messages()
    }

    pub fn refresh(&mut self) -> bool {
        self.tick();
        self.shelf.reload()
    }

    pub fn reconcile_layout(&mut self) -> bool {
        self.shelf.reconcile_layout()
    }

    // --- Create ---

    pub fn create_folder(
        &mut self,
        name: &str,
        description: Option<&str>,
        category_id: Option<Uuid>,
    ) -> Result<Option<Folder>> {
        self.tick();
        create::folder(&mut self.shelf, name, description, category_id)
    }

    pub fn create_category(&mut self, name: &str) -> Result<Option<FolderCategory>> {
        self.tick();
        create::category(&mut self.shelf, name)
    }

    pub fn upload_book(
        &mut self,
        folder_id: &Uuid,
        file: &UploadFile,
        title: &str,
    ) -> Result<Option<Book>> {
        self.tick();
        create::book(&mut self.shelf, folder_id, file, title)
    }

    pub fn upload_books(&mut self, folder_id: &Uuid, files: &[UploadFile]) -> Result<Vec<Book>> {
        self.tick();
        create::books(&mut self.shelf, folder_id, files)
    }

    // --- Update ---

    pub fn update_folder(&mut self, id: &Uuid, patch: FolderPatch) -> Result<()> {
        self.tick();
        update::folder(&mut self.shelf, id, patch)
    }

    pub fn rename_book(&mut self, id: &Uuid, title: &str) -> Result<()> {
        self.tick();
        update::rename_book(&mut self.shelf, id, title)
    }

    pub fn rename_category(&mut self, id: &Uuid, name: &str) -> Result<()> {
        self.tick();
        update::rename_category(&mut self.shelf, id, name)
    }

    pub fn set_book_read(&mut self, id: &Uuid, is_read: bool) -> Result<()> {
        self.tick();
        update::set_book_read(&mut self.shelf, id, is_read)
    }

    pub fn update_progress(&mut self, id: &Uuid, current_page: u32, total_pages: u32) -> Result<()> {
        self.tick();
        update::progress(&mut self.shelf, id, current_page, total_pages)
    }

    pub fn is_unsynced(&self, id: &Uuid) -> bool {
        self.shelf.is_unsynced(id)
    }

    // --- Move ---

    pub fn move_folder(
        &mut self,
        id: &Uuid,
        category_id: Option<Uuid>,
        index: usize,
    ) -> Result<bool> {
        self.tick();
        moves::folder(&mut self.shelf, id, category_id, index)
    }

    pub fn move_category(&mut self, id: &Uuid, index: usize) -> Result<bool> {
        self.tick();
        moves::category(&mut self.shelf, id, index)
    }

    pub fn move_book(&mut self, id: &Uuid, folder_id: &Uuid, index: usize) -> Result<bool> {
        self.tick();
        moves::book(&mut self.shelf, id, folder_id, index)
    }

    // --- Delete ---

    pub fn delete_book(&mut self, id: &Uuid) -> Result<()> {
        self.tick();
        delete::book(&mut self.shelf, id)
    }

    pub fn delete_folder(&mut self, id: &Uuid) -> Result<()> {
        self.tick();
        delete::folder(&mut self.shelf, id)
    }

    pub fn delete_category(&mut self, id: &Uuid, mode: CategoryDeleteMode) -> Result<()> {
        self.tick();
        delete::category(&mut self.shelf, id, mode)
    }

    pub fn undo_delete(&mut self, class: DeletionClass) -> bool {
        self.tick();
        delete::undo(&mut self.shelf, class)
    }

    pub fn pending_deletion(&self, class: DeletionClass) -> Option<Uuid> {
        self.shelf.pending_deletion(class)
    }

    // --- Read ---

    pub fn sections(&self) -> Sections {
        list::sections(&self.shelf)
    }

    pub fn books_in_folder(&self, folder_id: &Uuid) -> Result<Vec<Book>> {
        list::books(&self.shelf, folder_id)
    }

    pub fn book(&self, id: &Uuid) -> Result<&Book> {
        self.shelf.book_ref(id)
    }

    pub fn folder(&self, id: &Uuid) -> Result<&Folder> {
        self.shelf.folder_ref(id)
    }

    pub fn category(&self, id: &Uuid) -> Result<&FolderCategory> {
        self.shelf.category_ref(id)
    }

    pub fn books(&self) -> &[Book] {
        &self.shelf.books
    }

    pub fn folders(&self) -> &[Folder] {
        &self.shelf.folders
    }

    pub fn categories(&self) -> &[FolderCategory] {
        &self.shelf.categories
    }

    pub fn stats(&self) -> LibraryStats {
        list::stats(&self.shelf)
    }

    pub fn resolve_book_url(&mut self, id: &Uuid) -> Result<Option<String>> {
        list::book_url(&mut self.shelf, id)
    }

    // --- Selectors ---

    pub fn find_book(&self, selector: &str) -> Result<Uuid> {
        resolve(
            EntityKind::Book,
            selector,
            self.shelf.books.iter().map(|b| (b.id, b.title.as_str())),
        )
    }

    pub fn find_folder(&self, selector: &str) -> Result<Uuid> {
        resolve(
            EntityKind::Folder,
            selector,
            self.shelf.folders.iter().map(|f| (f.id, f.name.as_str())),
        )
    }

    pub fn find_category(&self, selector: &str) -> Result<Uuid> {
        resolve(
            EntityKind::Category,
            selector,
            self.shelf.categories.iter().map(|c| (c.id, c.name.as_str())),
        )
    }
}

/// Match a selector against entities: a case-insensitive exact name wins,
/// otherwise it must be a unique id prefix.
fn resolve<'a>(
    kind: EntityKind,
    selector: &str,
    entities: impl Iterator<Item = (Uuid, &'a str)> + Clone,
) -> Result<Uuid> {
    let selector = selector.trim();
    if selector.is_empty() {
        return Err(ShelfError::Api(format!("Empty {} selector", kind)));
    }

    let folded = selector.to_lowercase();
    let by_name: Vec<Uuid> = entities
        .clone()
        .filter(|(_, name)| name.to_lowercase() == folded)
        .map(|(id, _)| id)
        .collect();
    if let [id] = by_name.as_slice() {
        return Ok(*id);
    }

    let by_id: Vec<Uuid> = entities
        .filter(|(id, _)| id.to_string().starts_with(&folded))
        .map(|(id, _)| id)
        .collect();
    match by_id.as_slice() {
        [id] => Ok(*id),
        [] if by_name.is_empty() => Err(ShelfError::Api(format!("No {} matches '{}'", kind, selector))),
        _ => Err(ShelfError::Api(format!(
            "'{}' matches more than one {}",
            selector, kind
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::mem_backend::MemBackend;
    use crate::store::memory::InMemoryStore;
    use chrono::Duration;
    use std::rc::Rc;

    struct Harness {
        lib: Library<InMemoryStore, Rc<MemBackend>>,
        clock: ManualClock,
    }

    fn harness() -> Harness {
        let clock = ManualClock::default();
        let lib = Library::open_with(
            InMemoryStore::new(),
            LayoutStore::new(Rc::new(MemBackend::new())),
            Box::new(clock.clone()),
            DEFAULT_GRACE_MS,
        );
        Harness { lib, clock }
    }

    fn pdf(name: &str) -> UploadFile {
        UploadFile::new(name, b"%PDF".to_vec())
    }

    #[test]
    fn mutations_finalize_expired_deletions_first() {
        let mut h = harness();
        let dir = h.lib.create_folder("A", None, None).unwrap().unwrap();
        let b = h.lib.upload_book(&dir.id, &pdf("a.pdf"), "").unwrap().unwrap();
        h.lib.delete_book(&b.id).unwrap();
        assert_eq!(h.lib.pending_deletion(DeletionClass::Book), Some(b.id));

        h.clock.advance_ms(6000);
        h.lib.create_category("Later").unwrap();
        assert_eq!(h.lib.pending_deletion(DeletionClass::Book), None);
        assert!(h.lib.store().file(&b.file_path).is_none());
        assert!(!h.lib.undo_delete(DeletionClass::Book));
    }

    #[test]
    fn flush_finalizes_everything() {
        let mut h = harness();
        let dir = h.lib.create_folder("A", None, None).unwrap().unwrap();
        h.lib.upload_book(&dir.id, &pdf("a.pdf"), "").unwrap();
        h.lib.delete_folder(&dir.id).unwrap();
        h.lib.flush();
        assert_eq!(h.lib.store().file_count(), 0);
        assert_eq!(h.lib.pending_deletion(DeletionClass::Folder), None);
    }

    #[test]
    fn undo_within_window() {
        let mut h = harness();
        let dir = h.lib.create_folder("A", None, None).unwrap().unwrap();
        h.lib.delete_folder(&dir.id).unwrap();
        h.clock.advance_ms(4999);
        assert!(h.lib.undo_delete(DeletionClass::Folder));
        assert!(h.lib.folder(&dir.id).is_ok());
    }

    #[test]
    fn selectors_match_name_or_id_prefix() {
        let mut h = harness();
        let a = h.lib.create_folder("Papers", None, None).unwrap().unwrap();
        let b = h.lib.create_folder("Novels", None, None).unwrap().unwrap();

        assert_eq!(h.lib.find_folder("papers").unwrap(), a.id);
        assert_eq!(h.lib.find_folder(&b.id.to_string()).unwrap(), b.id);
        assert_eq!(h.lib.find_folder(&b.id.to_string()[..8]).unwrap(), b.id);
        assert!(h.lib.find_folder("Essays").is_err());
        assert!(h.lib.find_folder("  ").is_err());
    }

    #[test]
    fn selectors_fold_non_ascii_case() {
        let mut h = harness();
        let a = h.lib.create_folder("Ñandú", None, None).unwrap().unwrap();
        let b = h.lib.create_category("Économie").unwrap().unwrap();
        assert_eq!(h.lib.find_folder("ñANDÚ").unwrap(), a.id);
        assert_eq!(h.lib.find_category("économie").unwrap(), b.id);
    }

    #[test]
    fn next_deadline_tracks_the_earliest_window() {
        let mut h = harness();
        assert_eq!(h.lib.next_deadline(), None);

        let dir = h.lib.create_folder("A", None, None).unwrap().unwrap();
        let b = h.lib.upload_book(&dir.id, &pdf("a.pdf"), "").unwrap().unwrap();
        let other = h.lib.create_folder("B", None, None).unwrap().unwrap();

        let start = h.clock.now();
        h.lib.delete_book(&b.id).unwrap();
        h.clock.advance_ms(1000);
        h.lib.delete_folder(&other.id).unwrap();
        let first = start + Duration::milliseconds(DEFAULT_GRACE_MS as i64);
        assert_eq!(h.lib.next_deadline(), Some(first));

        // Ticking at the deadline closes the book window and leaves the folder's.
        h.clock.advance_ms(DEFAULT_GRACE_MS as i64 - 1000);
        h.lib.tick();
        assert_eq!(h.lib.pending_deletion(DeletionClass::Book), None);
        assert_eq!(
            h.lib.next_deadline(),
            Some(first + Duration::milliseconds(1000))
        );

        assert!(h.lib.undo_delete(DeletionClass::Folder));
        assert_eq!(h.lib.next_deadline(), None);
    }

    #[test]
    fn ambiguous_name_is_rejected() {
        let mut h = harness();
        h.lib.create_category("Work").unwrap();
        h.lib.create_category("work").unwrap();
        assert!(matches!(
            h.lib.find_category("WORK"),
            Err(ShelfError::Api(msg)) if msg.contains("more than one")
        ));
    }

    #[test]
    fn stats_and_sections() {
        let mut h = harness();
        let c = h.lib.create_category("Work").unwrap().unwrap();
        let dir = h.lib.create_folder("A", None, Some(c.id)).unwrap().unwrap();
        h.lib.upload_books(&dir.id, &[pdf("a.pdf"), pdf("b.pdf")]).unwrap();

        let stats = h.lib.stats();
        assert_eq!(stats.total_books, 2);
        assert_eq!(stats.total_categories, 1);
        let sections = h.lib.sections();
        assert_eq!(sections.categories[0].folders[0].id, dir.id);
        assert_eq!(h.lib.books_in_folder(&dir.id).unwrap().len(), 2);
    }
}
