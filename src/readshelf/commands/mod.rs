//! # Command Layer
//!
//! The mutation orchestrator. Every user intent (create, rename, move, delete,
//! undo) is a function here operating on a [`Shelf`], the in-memory session
//! state: the three collections, the layout overlay, the persistence adapter
//! and the two grace-period machines.
//!
//! ## Consistency Models
//!
//! Each kind of operation has its own contract with the backend:
//!
//! - **Create** is request-then-apply. Nothing is shown until the adapter hands
//!   back the persisted row; a failure leaves the shelf untouched.
//! - **Update** applies in memory first and persists second. A failed write is
//!   not rolled back: the entity is marked unsynced (see [`Shelf::is_unsynced`])
//!   until a later write for it succeeds.
//! - **Move** writes the layout overlay first, then mirrors changed folder and
//!   category positions to the backend in cloud mode. Mirror failures are
//!   reported, never rolled back; the overlay stays authoritative.
//! - **Delete** goes through the grace-period machines in [`crate::undo`].
//!
//! ## Notifications
//!
//! Commands never print. Validation problems (unknown id, empty name) come back
//! as `Err`; backend failures become [`Message`]s queued on the shelf, which the
//! UI drains with [`Shelf::take_messages`].
//!
//! ## Command Modules
//!
//! - [`create`]: folders, categories, uploads
//! - [`update`]: renames and reading progress
//! - [`moves`]: drag-and-drop reordering
//! - [`delete`]: grace-period deletes, undo, category removal
//! - [`list`]: derived read views

use crate::clock::Clock;
use crate::error::{EntityKind, Result, ShelfError};
use crate::layout::{FolderLayout, LayoutStore};
use crate::model::{Book, Folder, FolderCategory};
use crate::ordering::{self, Container, ContainerOrder, PositionAssignments, Sections};
use crate::store::backend::StorageBackend;
use crate::store::{BackendMode, LibraryStore};
use crate::undo::{BookSnapshot, DeletionClass, FolderSnapshot, GracePeriod};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::{debug, warn};
use uuid::Uuid;

pub mod create;
pub mod delete;
pub mod list;
pub mod moves;
pub mod update;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A user-facing notification. `undo` is set while the message's deletion can
/// still be reverted.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub level: MessageLevel,
    pub content: String,
    pub undo: Option<DeletionClass>,
}

impl Message {
    fn with_level(level: MessageLevel, content: impl Into<String>) -> Self {
        Self {
            level,
            content: content.into(),
            undo: None,
        }
    }

    pub fn info(content: impl Into<String>) -> Self {
        Self::with_level(MessageLevel::Info, content)
    }

    pub fn success(content: impl Into<String>) -> Self {
        Self::with_level(MessageLevel::Success, content)
    }

    pub fn warning(content: impl Into<String>) -> Self {
        Self::with_level(MessageLevel::Warning, content)
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self::with_level(MessageLevel::Error, content)
    }

    pub fn undoable(mut self, class: DeletionClass) -> Self {
        self.undo = Some(class);
        self
    }
}

/// Session state shared by all commands.
pub struct Shelf<S: LibraryStore, B: StorageBackend> {
    pub(crate) store: S,
    pub(crate) layout_store: LayoutStore<B>,
    pub(crate) layout: FolderLayout,
    pub(crate) folders: Vec<Folder>,
    pub(crate) books: Vec<Book>,
    pub(crate) categories: Vec<FolderCategory>,
    pub(crate) book_deletions: GracePeriod<BookSnapshot>,
    pub(crate) folder_deletions: GracePeriod<FolderSnapshot>,
    pub(crate) unsynced: HashSet<Uuid>,
    pub(crate) messages: Vec<Message>,
    pub(crate) clock: Box<dyn Clock>,
}

impl<S: LibraryStore, B: StorageBackend> Shelf<S, B> {
    /// Load collections and the overlay.
    ///
    /// A failed collection load is reported and leaves that collection empty.
    /// The overlay is only pruned when every collection loaded, so a backend
    /// outage never erases the user's ordering.
    pub fn load(
        store: S,
        layout_store: LayoutStore<B>,
        clock: Box<dyn Clock>,
        grace_period_ms: u64,
    ) -> Self {
        let layout = layout_store.load();
        let mut shelf = Self {
            store,
            layout_store,
            layout,
            folders: Vec::new(),
            books: Vec::new(),
            categories: Vec::new(),
            book_deletions: GracePeriod::new(grace_period_ms),
            folder_deletions: GracePeriod::new(grace_period_ms),
            unsynced: HashSet::new(),
            messages: Vec::new(),
            clock,
        };
        if shelf.reload() {
            shelf.reconcile_layout();
        }
        shelf
    }

    /// Re-read every collection from the adapter. Entities inside an open
    /// grace window stay hidden. Returns false if any load failed.
    pub fn reload(&mut self) -> bool {
        let hidden = self.pending_ids();
        let mut complete = true;

        match self.store.list_folders() {
            Ok(folders) => self.folders = folders,
            Err(e) => {
                complete = false;
                self.report_load_error(EntityKind::Folder, e);
            }
        }
        match self.store.list_books() {
            Ok(books) => self.books = books,
            Err(e) => {
                complete = false;
                self.report_load_error(EntityKind::Book, e);
            }
        }
        match self.store.list_categories() {
            Ok(categories) => self.categories = categories,
            Err(e) => {
                complete = false;
                self.report_load_error(EntityKind::Category, e);
            }
        }

        self.folders.retain(|f| !hidden.contains(&f.id));
        self.books.retain(|b| !hidden.contains(&b.id));
        debug!(
            folders = self.folders.len(),
            books = self.books.len(),
            categories = self.categories.len(),
            "collections loaded"
        );
        complete
    }

    fn report_load_error(&mut self, kind: EntityKind, e: ShelfError) {
        warn!(%kind, error = %e, "failed to load collection");
        self.notify(Message::error(format!("Could not load {} list: {}", kind, e)));
    }

    /// Drop overlay entries for entities that no longer exist. Entities in a
    /// grace window count as existing so that undo restores their position.
    pub fn reconcile_layout(&mut self) -> bool {
        let mut folders = self.folders.clone();
        let mut books = self.books.clone();
        if let Some(p) = self.folder_deletions.pending() {
            folders.push(p.snapshot.folder.clone());
            books.extend(p.snapshot.books.iter().map(|s| s.book.clone()));
        }
        if let Some(p) = self.book_deletions.pending() {
            books.push(p.snapshot.book.clone());
        }

        let changed = self.layout.prune(&folders, &books, &self.categories);
        if changed {
            debug!("pruned dangling layout entries");
            self.save_layout();
        }
        changed
    }

    pub fn mode(&self) -> BackendMode {
        self.store.mode()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn layout(&self) -> &FolderLayout {
        &self.layout
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn notify(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn take_messages(&mut self) -> Vec<Message> {
        std::mem::take(&mut self.messages)
    }

    pub fn is_unsynced(&self, id: &Uuid) -> bool {
        self.unsynced.contains(id)
    }

    pub fn pending_deletion(&self, class: DeletionClass) -> Option<Uuid> {
        match class {
            DeletionClass::Book => self.book_deletions.pending_id(),
            DeletionClass::Folder => self.folder_deletions.pending_id(),
        }
    }

    /// The earlier deadline of the two grace windows, if any is open.
    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        [
            self.book_deletions.deadline(),
            self.folder_deletions.deadline(),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    fn pending_ids(&self) -> HashSet<Uuid> {
        let mut ids = HashSet::new();
        if let Some(p) = self.book_deletions.pending() {
            ids.insert(p.id);
        }
        if let Some(p) = self.folder_deletions.pending() {
            ids.insert(p.id);
            ids.extend(p.snapshot.books.iter().map(|s| s.book.id));
        }
        ids
    }

    pub(crate) fn folder_ref(&self, id: &Uuid) -> Result<&Folder> {
        self.folders
            .iter()
            .find(|f| f.id == *id)
            .ok_or(ShelfError::not_found(EntityKind::Folder, *id))
    }

    pub(crate) fn book_ref(&self, id: &Uuid) -> Result<&Book> {
        self.books
            .iter()
            .find(|b| b.id == *id)
            .ok_or(ShelfError::not_found(EntityKind::Book, *id))
    }

    pub(crate) fn category_ref(&self, id: &Uuid) -> Result<&FolderCategory> {
        self.categories
            .iter()
            .find(|c| c.id == *id)
            .ok_or(ShelfError::not_found(EntityKind::Category, *id))
    }

    pub(crate) fn sections(&self) -> Sections {
        ordering::derive_sections(&self.folders, &self.categories, &self.layout)
    }

    pub(crate) fn book_ids_in(&self, folder_id: &Uuid) -> Vec<Uuid> {
        ordering::derive_book_order(&self.books, folder_id, &self.layout)
            .iter()
            .map(|b| b.id)
            .collect()
    }

    /// Persist the overlay. A failed save is reported; the in-memory overlay
    /// keeps the change.
    pub(crate) fn save_layout(&mut self) {
        if let Err(e) = self.layout_store.save(&self.layout) {
            warn!(error = %e, "failed to save layout");
            self.notify(Message::error(format!("Could not save layout: {}", e)));
        }
    }

    /// Record the outcome of a write for an entity already changed in memory.
    pub(crate) fn record_sync(&mut self, kind: EntityKind, id: Uuid, result: Result<()>) {
        match result {
            Ok(()) => {
                self.unsynced.remove(&id);
            }
            Err(e) => {
                warn!(%kind, %id, error = %e, "update not persisted");
                self.unsynced.insert(id);
                self.notify(Message::error(format!("Could not save {}: {}", kind, e)));
            }
        }
    }

    /// Write folder placements into the overlay, then mirror the ones that
    /// differ from the backend columns in cloud mode.
    pub(crate) fn apply_folder_assignments(&mut self, assignments: &PositionAssignments) {
        for (id, a) in assignments {
            if matches!(a.container, Container::Uncategorized | Container::Category(_)) {
                self.layout.folder_positions.insert(*id, a.placement());
            }
        }
        self.save_layout();

        if self.mode() != BackendMode::Cloud {
            return;
        }
        let mut changed = Vec::new();
        for folder in self.folders.iter_mut() {
            let Some(a) = assignments.get(&folder.id) else {
                continue;
            };
            let placement = a.placement();
            if folder.position != Some(placement.position) || folder.category_id != placement.category_id
            {
                folder.position = Some(placement.position);
                folder.category_id = placement.category_id;
                changed.push((folder.id, placement));
            }
        }
        if changed.is_empty() {
            return;
        }
        debug!(count = changed.len(), "mirroring folder positions");
        if let Err(e) = self.store.update_folder_placements(&changed) {
            warn!(error = %e, "folder positions not mirrored");
            self.notify(Message::warning(format!("Could not sync folder order: {}", e)));
        }
    }

    /// Write the category order into the overlay, then mirror changed
    /// category positions in cloud mode.
    pub(crate) fn apply_category_order(&mut self, order: Vec<Uuid>) {
        self.layout.category_order = order.clone();
        self.save_layout();

        if self.mode() != BackendMode::Cloud {
            return;
        }
        let mut failed = None;
        for (position, id) in order.iter().enumerate() {
            let position = position as i64;
            let Some(category) = self.categories.iter_mut().find(|c| c.id == *id) else {
                continue;
            };
            if category.position == position {
                continue;
            }
            category.position = position;
            let patch = crate::model::CategoryPatch {
                position: Some(position),
                ..Default::default()
            };
            if let Err(e) = self.store.update_category(id, &patch) {
                failed.get_or_insert(e);
            }
        }
        if let Some(e) = failed {
            warn!(error = %e, "category positions not mirrored");
            self.notify(Message::warning(format!("Could not sync category order: {}", e)));
        }
    }

    /// Id lists of the source and target book containers for a move.
    pub(crate) fn book_container_order(&self, folders: &[Uuid]) -> ContainerOrder {
        folders
            .iter()
            .map(|id| (Container::Folder(*id), self.book_ids_in(id)))
            .collect()
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::store::memory::{FailOp, InMemoryStore};
    use std::rc::Rc;

    fn reopen(f: &Fixture, store: InMemoryStore) -> TestShelf {
        Shelf::load(
            store,
            LayoutStore::new(Rc::clone(&f.backend)),
            Box::new(f.clock.clone()),
            5000,
        )
    }

    #[test]
    fn load_prunes_entries_for_missing_entities() {
        let mut f = fixture();
        let a = folder(&mut f.shelf, "A");
        assert!(f.shelf.layout.folder_positions.contains_key(&a.id));

        let shelf = reopen(&f, InMemoryStore::new());
        assert!(shelf.layout.folder_positions.is_empty());
    }

    #[test]
    fn load_failure_keeps_layout() {
        let mut f = fixture();
        let a = folder(&mut f.shelf, "A");

        let mut broken = InMemoryStore::new();
        broken.fail(FailOp::List);
        let mut shelf = reopen(&f, broken);
        assert!(shelf.folders.is_empty());
        assert!(shelf.layout.folder_positions.contains_key(&a.id));
        let messages = shelf.take_messages();
        assert_eq!(messages.len(), 3);
        assert!(messages.iter().all(|m| m.level == MessageLevel::Error));
    }

    #[test]
    fn record_sync_marks_and_clears() {
        let mut f = fixture();
        let id = Uuid::new_v4();
        f.shelf.record_sync(
            EntityKind::Book,
            id,
            Err(ShelfError::Store("down".to_string())),
        );
        assert!(f.shelf.is_unsynced(&id));
        assert_eq!(f.shelf.take_messages()[0].level, MessageLevel::Error);

        f.shelf.record_sync(EntityKind::Book, id, Ok(()));
        assert!(!f.shelf.is_unsynced(&id));
        assert!(f.shelf.take_messages().is_empty());
    }

    #[test]
    fn undoable_messages_carry_their_class() {
        let plain = Message::success("Deleted a");
        assert_eq!(plain.level, MessageLevel::Success);
        assert_eq!(plain.undo, None);

        let undoable = plain.clone().undoable(DeletionClass::Folder);
        assert_eq!(undoable.undo, Some(DeletionClass::Folder));
        assert_ne!(undoable, plain);
    }

    #[test]
    fn layout_save_failure_is_reported() {
        let mut f = fixture();
        f.backend.set_simulate_write_error(true);
        f.shelf.save_layout();
        let messages = f.shelf.take_messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].level, MessageLevel::Error);
    }
}
