//! # Ordering Engine
//!
//! Pure functions that turn collections plus the layout overlay into a
//! display order, and turn a drag-and-drop move into new positions.
//!
//! Nothing here does I/O or can fail. The orchestrator calls these on every
//! render and after every position-affecting mutation.
//!
//! ## Effective Placement
//!
//! A folder's container and position resolve in this order:
//! 1. The overlay entry (`folderPositions[id]`), if any.
//! 2. The folder's own `category_id` / `position` fields.
//! 3. Uncategorized at [`UNPLACED`], so unknown folders sort last.
//!
//! A placement naming a category that does not exist resolves to
//! uncategorized. A folder is never dropped from the output.
//!
//! ## Moves
//!
//! [`compute_move`] works on plain id lists per [`Container`]: remove the item
//! from its source list, insert it into the target list, and hand back fresh
//! dense positions for every id in both lists. Callers write the whole result
//! into the overlay instead of patching individual positions, so repeated
//! moves never accumulate index drift.

use crate::layout::FolderLayout;
use crate::model::{Book, Folder, FolderCategory, Placement};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Position given to folders with no known position.
pub const UNPLACED: i64 = i64::MAX;

/// A logical list that orders its members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Container {
    /// Folders without a category.
    Uncategorized,
    /// Folders in one category.
    Category(Uuid),
    /// Books in one folder.
    Folder(Uuid),
    /// The single global list of categories.
    Categories,
}

impl Container {
    /// The container a folder placement refers to.
    pub fn for_category(category_id: Option<Uuid>) -> Self {
        match category_id {
            Some(id) => Container::Category(id),
            None => Container::Uncategorized,
        }
    }

    /// The category id this container stands for, when it holds folders.
    pub fn category_id(&self) -> Option<Uuid> {
        match self {
            Container::Category(id) => Some(*id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveKind {
    Folder,
    Category,
    Book,
}

/// New position of one entity after a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assignment {
    pub container: Container,
    pub position: i64,
}

impl Assignment {
    pub fn placement(&self) -> Placement {
        Placement {
            category_id: self.container.category_id(),
            position: self.position,
        }
    }
}

pub type PositionAssignments = HashMap<Uuid, Assignment>;

/// Current ordered id list of every container involved in a move.
pub type ContainerOrder = HashMap<Container, Vec<Uuid>>;

#[derive(Debug, Clone, PartialEq)]
pub struct CategorySection {
    pub category: FolderCategory,
    pub folders: Vec<Folder>,
}

/// Read order of the whole shelf.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sections {
    pub uncategorized: Vec<Folder>,
    pub categories: Vec<CategorySection>,
}

impl Sections {
    /// All folder ids, uncategorized first, then each category in order.
    pub fn flattened_ids(&self) -> Vec<Uuid> {
        self.uncategorized
            .iter()
            .chain(self.categories.iter().flat_map(|s| s.folders.iter()))
            .map(|f| f.id)
            .collect()
    }

    /// The id lists of every folder container plus the category list.
    pub fn container_order(&self) -> ContainerOrder {
        let mut order = ContainerOrder::new();
        order.insert(
            Container::Uncategorized,
            self.uncategorized.iter().map(|f| f.id).collect(),
        );
        for section in &self.categories {
            order.insert(
                Container::Category(section.category.id),
                section.folders.iter().map(|f| f.id).collect(),
            );
        }
        order.insert(
            Container::Categories,
            self.categories.iter().map(|s| s.category.id).collect(),
        );
        order
    }

    /// Container and index of a folder in this read order.
    pub fn locate_folder(&self, id: &Uuid) -> Option<(Container, usize)> {
        if let Some(i) = self.uncategorized.iter().position(|f| f.id == *id) {
            return Some((Container::Uncategorized, i));
        }
        self.categories.iter().find_map(|s| {
            s.folders
                .iter()
                .position(|f| f.id == *id)
                .map(|i| (Container::Category(s.category.id), i))
        })
    }
}

/// Placement of a folder before category validation: overlay, then own fields,
/// then the unplaced fallback.
pub fn effective_placement(folder: &Folder, layout: &FolderLayout) -> Placement {
    layout
        .folder_positions
        .get(&folder.id)
        .copied()
        .unwrap_or(Placement {
            category_id: folder.category_id,
            position: folder.position.unwrap_or(UNPLACED),
        })
}

/// Group folders into uncategorized and per-category sections, each sorted by
/// effective position, with categories in overlay order.
pub fn derive_sections(
    folders: &[Folder],
    categories: &[FolderCategory],
    layout: &FolderLayout,
) -> Sections {
    let known: HashSet<Uuid> = categories.iter().map(|c| c.id).collect();

    let mut uncategorized: Vec<(i64, &Folder)> = Vec::new();
    let mut grouped: HashMap<Uuid, Vec<(i64, &Folder)>> = HashMap::new();
    for folder in folders {
        let placement = effective_placement(folder, layout);
        match placement.category_id.filter(|id| known.contains(id)) {
            Some(category_id) => grouped
                .entry(category_id)
                .or_default()
                .push((placement.position, folder)),
            None => uncategorized.push((placement.position, folder)),
        }
    }

    Sections {
        uncategorized: sorted_folders(uncategorized),
        categories: ordered_categories(categories, layout)
            .into_iter()
            .map(|category| CategorySection {
                folders: sorted_folders(grouped.remove(&category.id).unwrap_or_default()),
                category: category.clone(),
            })
            .collect(),
    }
}

fn sorted_folders(mut entries: Vec<(i64, &Folder)>) -> Vec<Folder> {
    // sort_by_key is stable: equal positions keep input order.
    entries.sort_by_key(|(position, _)| *position);
    entries.into_iter().map(|(_, f)| f.clone()).collect()
}

/// Categories listed in `category_order` first, in that order; the rest after
/// them by their own position.
pub fn ordered_categories<'a>(
    categories: &'a [FolderCategory],
    layout: &FolderLayout,
) -> Vec<&'a FolderCategory> {
    let mut rank: HashMap<Uuid, usize> = HashMap::new();
    for (i, id) in layout.category_order.iter().enumerate() {
        rank.entry(*id).or_insert(i);
    }
    let mut ordered: Vec<&FolderCategory> = categories.iter().collect();
    ordered.sort_by_key(|c| match rank.get(&c.id) {
        Some(i) => (0, *i as i64),
        None => (1, c.position),
    });
    ordered
}

/// Books of one folder in display order.
///
/// With an overlay list: listed books first (unknown ids skipped), then any
/// unlisted book newest first. Without one: by reading state.
pub fn derive_book_order(books: &[Book], folder_id: &Uuid, layout: &FolderLayout) -> Vec<Book> {
    let in_folder: Vec<&Book> = books.iter().filter(|b| b.folder_id == *folder_id).collect();

    match layout.book_order.get(folder_id) {
        Some(order) if !order.is_empty() => {
            let by_id: HashMap<Uuid, &Book> = in_folder.iter().map(|b| (b.id, *b)).collect();
            let mut seen: HashSet<Uuid> = HashSet::new();
            let mut ordered: Vec<Book> = order
                .iter()
                .filter(|id| seen.insert(**id))
                .filter_map(|id| by_id.get(id).map(|b| (*b).clone()))
                .collect();

            let mut rest: Vec<&Book> = in_folder
                .into_iter()
                .filter(|b| !seen.contains(&b.id))
                .collect();
            rest.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            ordered.extend(rest.into_iter().cloned());
            ordered
        }
        _ => {
            let mut ordered: Vec<Book> = in_folder.into_iter().cloned().collect();
            ordered.sort_by_key(|b| b.state());
            ordered
        }
    }
}

/// Positions after moving `moving_id` to `target_index` of `target`.
///
/// - Category moves always happen in [`Container::Categories`]; `target` is ignored.
/// - `target_index` is clamped to the target list's length.
/// - An id found in no list is inserted (used for newly created entities).
/// - A target missing from `current` is an invalid move and yields nothing.
/// - Dropping an item back at its current index yields nothing.
///
/// Otherwise every id of the source and target lists gets its array index as
/// its new position.
pub fn compute_move(
    kind: MoveKind,
    moving_id: Uuid,
    target: Container,
    target_index: usize,
    current: &ContainerOrder,
) -> PositionAssignments {
    let target = match kind {
        MoveKind::Category => Container::Categories,
        _ => target,
    };
    let Some(target_list) = current.get(&target) else {
        return PositionAssignments::new();
    };

    let source = current
        .iter()
        .find_map(|(container, ids)| {
            ids.iter()
                .position(|id| *id == moving_id)
                .map(|i| (*container, i))
        });

    let mut assignments = PositionAssignments::new();
    match source {
        Some((container, from)) if container == target => {
            let mut list = target_list.clone();
            list.remove(from);
            let to = target_index.min(list.len());
            if to == from {
                return assignments;
            }
            list.insert(to, moving_id);
            assign(&mut assignments, target, &list);
        }
        Some((container, from)) => {
            let mut source_list = current[&container].clone();
            source_list.remove(from);
            let mut list = target_list.clone();
            list.insert(target_index.min(list.len()), moving_id);
            assign(&mut assignments, container, &source_list);
            assign(&mut assignments, target, &list);
        }
        None => {
            let mut list = target_list.clone();
            list.insert(target_index.min(list.len()), moving_id);
            assign(&mut assignments, target, &list);
        }
    }
    assignments
}

fn assign(assignments: &mut PositionAssignments, container: Container, ids: &[Uuid]) {
    for (i, id) in ids.iter().enumerate() {
        assignments.insert(
            *id,
            Assignment {
                container,
                position: i as i64,
            },
        );
    }
}

/// Regroup assignments into ordered id lists per container.
pub fn assigned_lists(assignments: &PositionAssignments) -> ContainerOrder {
    let mut grouped: HashMap<Container, Vec<(i64, Uuid)>> = HashMap::new();
    for (id, a) in assignments {
        grouped.entry(a.container).or_default().push((a.position, *id));
    }
    grouped
        .into_iter()
        .map(|(container, mut entries)| {
            entries.sort();
            (container, entries.into_iter().map(|(_, id)| id).collect())
        })
        .collect()
}
