//! Drag-and-drop reordering.
//!
//! Each move returns `Ok(true)` if anything changed. Dropping an item where it
//! already is, or onto a container that no longer exists, is a no-op.

use crate::commands::update::apply_book_patch;
use crate::commands::Shelf;
use crate::error::Result;
use crate::model::BookPatch;
use crate::ordering::{self, Container, MoveKind};
use crate::store::backend::StorageBackend;
use crate::store::LibraryStore;
use tracing::debug;
use uuid::Uuid;

/// Move a folder to `index` within uncategorized (`None`) or a category.
pub fn folder<S: LibraryStore, B: StorageBackend>(
    shelf: &mut Shelf<S, B>,
    id: &Uuid,
    category_id: Option<Uuid>,
    index: usize,
) -> Result<bool> {
    shelf.folder_ref(id)?;
    let current = shelf.sections().container_order();
    let assignments = ordering::compute_move(
        MoveKind::Folder,
        *id,
        Container::for_category(category_id),
        index,
        &current,
    );
    if assignments.is_empty() {
        return Ok(false);
    }
    debug!(%id, ?category_id, index, "moving folder");
    shelf.apply_folder_assignments(&assignments);
    Ok(true)
}

pub fn category<S: LibraryStore, B: StorageBackend>(
    shelf: &mut Shelf<S, B>,
    id: &Uuid,
    index: usize,
) -> Result<bool> {
    shelf.category_ref(id)?;
    let current = shelf.sections().container_order();
    let assignments =
        ordering::compute_move(MoveKind::Category, *id, Container::Categories, index, &current);
    let Some(order) = ordering::assigned_lists(&assignments).remove(&Container::Categories) else {
        return Ok(false);
    };
    debug!(%id, index, "moving category");
    shelf.apply_category_order(order);
    Ok(true)
}

/// Move a book to `index` of a folder, which may be its own. Moving to another
/// folder also reassigns the book's `folder_id`.
pub fn book<S: LibraryStore, B: StorageBackend>(
    shelf: &mut Shelf<S, B>,
    id: &Uuid,
    folder_id: &Uuid,
    index: usize,
) -> Result<bool> {
    let source = shelf.book_ref(id)?.folder_id;
    if shelf.folder_ref(folder_id).is_err() {
        return Ok(false);
    }

    let current = shelf.book_container_order(&[source, *folder_id]);
    let assignments = ordering::compute_move(
        MoveKind::Book,
        *id,
        Container::Folder(*folder_id),
        index,
        &current,
    );
    if assignments.is_empty() {
        return Ok(false);
    }

    debug!(%id, from = %source, to = %folder_id, index, "moving book");
    let mut lists = ordering::assigned_lists(&assignments);
    for folder in [source, *folder_id] {
        match lists.remove(&Container::Folder(folder)) {
            Some(order) => shelf.layout.book_order.insert(folder, order),
            // The source folder is now empty.
            None => shelf.layout.book_order.remove(&folder),
        };
    }
    shelf.save_layout();

    if source != *folder_id {
        apply_book_patch(shelf, id, BookPatch::folder(*folder_id))?;
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures::{
        book as add_book, cloud_fixture, fixture, folder as add_folder,
    };
    use crate::commands::{create, MessageLevel};
    use crate::store::memory::FailOp;

    #[test]
    fn reorder_folders_within_uncategorized() {
        let mut f = fixture();
        let a = add_folder(&mut f.shelf, "A");
        let b = add_folder(&mut f.shelf, "B");
        let c = add_folder(&mut f.shelf, "C");
        assert_eq!(f.shelf.sections().flattened_ids(), vec![c.id, b.id, a.id]);

        assert!(folder(&mut f.shelf, &c.id, None, 2).unwrap());
        assert_eq!(f.shelf.sections().flattened_ids(), vec![b.id, a.id, c.id]);
    }

    #[test]
    fn dropping_in_place_changes_nothing() {
        let mut f = cloud_fixture();
        let a = add_folder(&mut f.shelf, "A");
        add_folder(&mut f.shelf, "B");
        let before = f.shelf.layout.clone();
        let writes = f.shelf.store.placement_writes;

        assert!(!folder(&mut f.shelf, &a.id, None, 1).unwrap());
        assert_eq!(f.shelf.layout, before);
        assert_eq!(f.shelf.store.placement_writes, writes);
    }

    #[test]
    fn move_to_missing_category_is_noop() {
        let mut f = fixture();
        let a = add_folder(&mut f.shelf, "A");
        assert!(!folder(&mut f.shelf, &a.id, Some(Uuid::new_v4()), 0).unwrap());
    }

    #[test]
    fn move_folder_into_category() {
        let mut f = fixture();
        let work = create::category(&mut f.shelf, "Work").unwrap().unwrap();
        let a = add_folder(&mut f.shelf, "A");
        let b = add_folder(&mut f.shelf, "B");

        assert!(folder(&mut f.shelf, &a.id, Some(work.id), 0).unwrap());
        let sections = f.shelf.sections();
        assert_eq!(sections.uncategorized.len(), 1);
        assert_eq!(sections.uncategorized[0].id, b.id);
        assert_eq!(sections.categories[0].folders[0].id, a.id);
        // Local mode never touches backend columns.
        assert_eq!(f.shelf.store.folder_row(&a.id).unwrap().category_id, None);
    }

    #[test]
    fn cloud_move_mirrors_only_changed_folders() {
        let mut f = cloud_fixture();
        let work = create::category(&mut f.shelf, "Work").unwrap().unwrap();
        let a = add_folder(&mut f.shelf, "A");
        let b = add_folder(&mut f.shelf, "B");
        let c = add_folder(&mut f.shelf, "C");
        let writes = f.shelf.store.placement_writes;

        // [C, B, A] -> [C, A] and Work: [B]
        assert!(folder(&mut f.shelf, &b.id, Some(work.id), 0).unwrap());
        assert_eq!(f.shelf.store.placement_writes - writes, 2);
        let row = f.shelf.store.folder_row(&b.id).unwrap();
        assert_eq!(row.category_id, Some(work.id));
        assert_eq!(row.position, Some(0));
        assert_eq!(f.shelf.store.folder_row(&a.id).unwrap().position, Some(1));
        assert_eq!(f.shelf.store.folder_row(&c.id).unwrap().position, Some(0));
    }

    #[test]
    fn failed_mirror_keeps_overlay() {
        let mut f = cloud_fixture();
        let a = add_folder(&mut f.shelf, "A");
        let b = add_folder(&mut f.shelf, "B");
        f.shelf.take_messages();
        f.shelf.store.fail(FailOp::Placement);

        assert!(folder(&mut f.shelf, &b.id, None, 1).unwrap());
        assert_eq!(f.shelf.sections().flattened_ids(), vec![a.id, b.id]);
        assert_eq!(f.shelf.take_messages()[0].level, MessageLevel::Warning);
    }

    #[test]
    fn reorder_categories() {
        let mut f = cloud_fixture();
        let x = create::category(&mut f.shelf, "X").unwrap().unwrap();
        let y = create::category(&mut f.shelf, "Y").unwrap().unwrap();
        assert_eq!(f.shelf.layout.category_order, vec![y.id, x.id]);

        assert!(category(&mut f.shelf, &y.id, 1).unwrap());
        assert_eq!(f.shelf.layout.category_order, vec![x.id, y.id]);
        assert_eq!(f.shelf.store.category_row(&y.id).unwrap().position, 1);
        assert!(!category(&mut f.shelf, &y.id, 1).unwrap());
    }

    #[test]
    fn reorder_books_materializes_order() {
        let mut f = fixture();
        let dir = add_folder(&mut f.shelf, "A");
        let one = add_book(&mut f.shelf, dir.id, "one.pdf");
        let two = add_book(&mut f.shelf, dir.id, "two.pdf");
        assert!(!f.shelf.layout.book_order.contains_key(&dir.id));

        let before = f.shelf.book_ids_in(&dir.id);
        let last = before[before.len() - 1];
        assert!(book(&mut f.shelf, &last, &dir.id, 0).unwrap());
        let after = f.shelf.layout.book_order[&dir.id].clone();
        assert_eq!(after[0], last);
        assert_eq!(after.len(), 2);
        assert!(after.contains(&one.id) && after.contains(&two.id));
    }

    #[test]
    fn move_book_across_folders() {
        let mut f = fixture();
        let from = add_folder(&mut f.shelf, "From");
        let to = add_folder(&mut f.shelf, "To");
        let b = add_book(&mut f.shelf, from.id, "x.pdf");
        let other = add_book(&mut f.shelf, to.id, "y.pdf");

        assert!(book(&mut f.shelf, &b.id, &to.id, 5).unwrap());
        assert_eq!(f.shelf.layout.book_order[&to.id], vec![other.id, b.id]);
        assert_eq!(f.shelf.store.book_row(&b.id).unwrap().folder_id, to.id);
        assert!(f.shelf.book_ids_in(&from.id).is_empty());
    }

    #[test]
    fn move_book_to_missing_folder_is_noop() {
        let mut f = fixture();
        let dir = add_folder(&mut f.shelf, "A");
        let b = add_book(&mut f.shelf, dir.id, "x.pdf");
        assert!(!book(&mut f.shelf, &b.id, &Uuid::new_v4(), 0).unwrap());
        assert_eq!(f.shelf.book_ref(&b.id).unwrap().folder_id, dir.id);
    }
}
