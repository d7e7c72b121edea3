//! # Layout Overlay
//!
//! The overlay is the client-owned ordering structure. It shadows the
//! backend's `position`/`category_id` folder fields, holds the category order,
//! and holds book order, which has no backend column at all.
//!
//! Entries are advisory. Anything that references a folder, book or category
//! that no longer exists is ignored at read time and dropped by [`FolderLayout::prune`].
//!
//! The overlay persists as a single JSON blob under [`LAYOUT_KEY`], read in full
//! on load and overwritten in full on every save.

use crate::error::{Result, ShelfError};
use crate::model::{Book, Folder, FolderCategory, Placement};
use crate::store::backend::StorageBackend;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::warn;
use uuid::Uuid;

pub const LAYOUT_KEY: &str = "reading-shelf-layout";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderLayout {
    #[serde(default)]
    pub folder_positions: HashMap<Uuid, Placement>,
    #[serde(default)]
    pub category_order: Vec<Uuid>,
    #[serde(default)]
    pub book_order: HashMap<Uuid, Vec<Uuid>>,
}

impl FolderLayout {
    pub fn is_empty(&self) -> bool {
        self.folder_positions.is_empty()
            && self.category_order.is_empty()
            && self.book_order.is_empty()
    }

    /// Drop entries that reference entities which no longer exist.
    /// Returns true if anything was removed.
    pub fn prune(
        &mut self,
        folders: &[Folder],
        books: &[Book],
        categories: &[FolderCategory],
    ) -> bool {
        let folder_ids: HashSet<Uuid> = folders.iter().map(|f| f.id).collect();
        let book_ids: HashSet<Uuid> = books.iter().map(|b| b.id).collect();
        let category_ids: HashSet<Uuid> = categories.iter().map(|c| c.id).collect();
        let before = self.clone();

        self.folder_positions
            .retain(|id, _| folder_ids.contains(id));
        for placement in self.folder_positions.values_mut() {
            if matches!(placement.category_id, Some(c) if !category_ids.contains(&c)) {
                placement.category_id = None;
            }
        }
        self.category_order.retain(|id| category_ids.contains(id));
        self.book_order.retain(|id, _| folder_ids.contains(id));
        for order in self.book_order.values_mut() {
            order.retain(|id| book_ids.contains(id));
        }
        self.book_order.retain(|_, order| !order.is_empty());

        *self != before
    }

    pub fn forget_folder(&mut self, id: &Uuid) {
        self.folder_positions.remove(id);
        self.book_order.remove(id);
    }

    pub fn forget_book(&mut self, id: &Uuid) {
        for order in self.book_order.values_mut() {
            order.retain(|b| b != id);
        }
    }
}

/// Durable, namespaced storage for the overlay. Pure accessors, no ordering logic.
pub struct LayoutStore<B: StorageBackend> {
    backend: B,
}

impl<B: StorageBackend> LayoutStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Missing, unreadable or corrupt data all load as an empty layout.
    pub fn load(&self) -> FolderLayout {
        let raw = match self.backend.read_key(LAYOUT_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return FolderLayout::default(),
            Err(e) => {
                warn!(error = %e, "layout unreadable, starting empty");
                return FolderLayout::default();
            }
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(error = %e, "layout corrupt, starting empty");
            FolderLayout::default()
        })
    }

    /// Full overwrite. Callers always pass the complete desired state.
    pub fn save(&self, layout: &FolderLayout) -> Result<()> {
        let raw = serde_json::to_string(layout).map_err(ShelfError::Serialization)?;
        self.backend.write_key(LAYOUT_KEY, &raw)
    }
}
