//! # Domain Model
//!
//! Rows as both backends store them. Field names are snake_case on the wire so
//! the same types read the local JSON collections and the remote tables.
//!
//! `position` and `category_id` on [`Folder`] are backend-owned in cloud mode
//! but may be shadowed by the layout overlay (see [`crate::layout`]). Books
//! carry no position at all: their order lives only in the overlay.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// User id recorded on rows created in local mode.
pub const LOCAL_USER_ID: &str = "local";

/// Scheme prefix for file references that point into the local blob store.
pub const LOCAL_FILE_SCHEME: &str = "local://";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: Uuid,
    pub user_id: String,
    pub folder_id: Uuid,
    pub title: String,
    pub file_path: String,
    pub file_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_read: bool,
    #[serde(default)]
    pub read_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub current_page: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_pages: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Nullable remote columns read as their default, like missing ones.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Reading status derived from `is_read` and `current_page`. Never stored.
///
/// The declaration order is the fallback display precedence: continue reading
/// first, then unstarted, then finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BookState {
    InProgress,
    NotStarted,
    Read,
}

impl std::fmt::Display for BookState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BookState::InProgress => write!(f, "in progress"),
            BookState::NotStarted => write!(f, "not started"),
            BookState::Read => write!(f, "read"),
        }
    }
}

impl Book {
    pub fn new(
        user_id: impl Into<String>,
        folder_id: Uuid,
        title: impl Into<String>,
        file_path: impl Into<String>,
        file_name: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            folder_id,
            title: title.into(),
            file_path: file_path.into(),
            file_name: file_name.into(),
            is_read: false,
            read_at: None,
            current_page: 0,
            total_pages: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn state(&self) -> BookState {
        if self.is_read {
            BookState::Read
        } else if self.current_page > 1 {
            BookState::InProgress
        } else {
            BookState::NotStarted
        }
    }

    /// Rounded reading progress, 0 while the page count is unknown.
    pub fn progress_percent(&self) -> u32 {
        if self.total_pages == 0 {
            return 0;
        }
        let pct = (self.current_page as f64 / self.total_pages as f64) * 100.0;
        pct.round().min(100.0) as u32
    }

    /// Patch for the read/unread transition.
    ///
    /// Marking a book read jumps to its last page once the page count is known,
    /// so `is_read` always implies `current_page == total_pages`.
    pub fn read_patch(&self, is_read: bool, now: DateTime<Utc>) -> BookPatch {
        let mut patch = BookPatch {
            is_read: Some(is_read),
            read_at: Some(if is_read { Some(now) } else { None }),
            ..Default::default()
        };
        if is_read && self.total_pages > 0 {
            patch.current_page = Some(self.total_pages);
        }
        patch
    }

    /// Patch for a progress report from the viewer.
    ///
    /// Reaching the last page marks the book read. Reporting the last page of
    /// a read book keeps its original `read_at`; paging back below it makes
    /// the book unread again.
    pub fn progress_patch(
        &self,
        current_page: u32,
        total_pages: u32,
        now: DateTime<Utc>,
    ) -> BookPatch {
        let current_page = if total_pages > 0 {
            current_page.min(total_pages)
        } else {
            current_page
        };
        let reached_end = total_pages > 0 && current_page >= total_pages;
        let read_at = match (reached_end, self.is_read) {
            (false, _) => None,
            (true, true) => self.read_at.or(Some(now)),
            (true, false) => Some(now),
        };
        BookPatch {
            current_page: Some(current_page),
            total_pages: Some(total_pages),
            is_read: Some(reached_end),
            read_at: Some(read_at),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Folder {
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub position: Option<i64>,
    #[serde(default)]
    pub category_id: Option<Uuid>,
}

impl Folder {
    pub fn new(
        user_id: impl Into<String>,
        name: impl Into<String>,
        description: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            name: name.into(),
            description,
            created_at: now,
            updated_at: now,
            position: Some(0),
            category_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderCategory {
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub position: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FolderCategory {
    pub fn new(user_id: impl Into<String>, name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            name: name.into(),
            position: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Where a folder sits: its container (`None` = uncategorized) and its
/// position inside that container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    pub category_id: Option<Uuid>,
    pub position: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FolderPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
}

impl FolderPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none()
    }

    pub fn apply_to(&self, folder: &mut Folder, now: DateTime<Utc>) {
        if let Some(name) = &self.name {
            folder.name = name.clone();
        }
        if let Some(description) = &self.description {
            folder.description = description.clone();
        }
        folder.updated_at = now;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BookPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_read: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_at: Option<Option<DateTime<Utc>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<u32>,
}

impl BookPatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn folder(folder_id: Uuid) -> Self {
        Self {
            folder_id: Some(folder_id),
            ..Default::default()
        }
    }

    pub fn apply_to(&self, book: &mut Book, now: DateTime<Utc>) {
        if let Some(title) = &self.title {
            book.title = title.clone();
        }
        if let Some(folder_id) = self.folder_id {
            book.folder_id = folder_id;
        }
        if let Some(is_read) = self.is_read {
            book.is_read = is_read;
        }
        if let Some(read_at) = self.read_at {
            book.read_at = read_at;
        }
        if let Some(current_page) = self.current_page {
            book.current_page = current_page;
        }
        if let Some(total_pages) = self.total_pages {
            book.total_pages = total_pages;
        }
        book.updated_at = now;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoryPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
}

impl CategoryPatch {
    pub fn apply_to(&self, category: &mut FolderCategory, now: DateTime<Utc>) {
        if let Some(name) = &self.name {
            category.name = name.clone();
        }
        if let Some(position) = self.position {
            category.position = position;
        }
        category.updated_at = now;
    }
}

/// Counters shown on the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LibraryStats {
    pub total_books: usize,
    pub read_books: usize,
    pub unread_books: usize,
    pub in_progress_books: usize,
    pub total_folders: usize,
    pub total_categories: usize,
}

impl LibraryStats {
    pub fn collect(books: &[Book], folders: &[Folder], categories: &[FolderCategory]) -> Self {
        let read_books = books.iter().filter(|b| b.is_read).count();
        Self {
            total_books: books.len(),
            read_books,
            unread_books: books.len() - read_books,
            in_progress_books: books
                .iter()
                .filter(|b| b.state() == BookState::InProgress)
                .count(),
            total_folders: folders.len(),
            total_categories: categories.len(),
        }
    }

    pub fn read_percentage(&self) -> u32 {
        if self.total_books == 0 {
            return 0;
        }
        ((self.read_books as f64 / self.total_books as f64) * 100.0).round() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book() -> Book {
        Book::new(
            LOCAL_USER_ID,
            Uuid::new_v4(),
            "Dune",
            "local://x",
            "dune.pdf",
            Utc::now(),
        )
    }

    #[test]
    fn state_is_derived_from_flags_and_page() {
        let mut b = book();
        assert_eq!(b.state(), BookState::NotStarted);
        b.current_page = 1;
        assert_eq!(b.state(), BookState::NotStarted);
        b.current_page = 2;
        assert_eq!(b.state(), BookState::InProgress);
        b.is_read = true;
        assert_eq!(b.state(), BookState::Read);
    }

    #[test]
    fn state_precedence_puts_in_progress_first() {
        let mut states = vec![BookState::Read, BookState::NotStarted, BookState::InProgress];
        states.sort();
        assert_eq!(
            states,
            vec![BookState::InProgress, BookState::NotStarted, BookState::Read]
        );
    }

    #[test]
    fn read_patch_jumps_to_last_page() {
        let mut b = book();
        b.total_pages = 300;
        b.current_page = 12;
        let now = Utc::now();
        b.read_patch(true, now).apply_to(&mut b, now);
        assert!(b.is_read);
        assert_eq!(b.current_page, 300);
        assert_eq!(b.read_at, Some(now));

        b.read_patch(false, now).apply_to(&mut b, now);
        assert!(!b.is_read);
        assert_eq!(b.read_at, None);
    }

    #[test]
    fn progress_at_last_page_marks_read() {
        let mut b = book();
        let now = Utc::now();
        b.progress_patch(120, 120, now).apply_to(&mut b, now);
        assert!(b.is_read);
        assert_eq!(b.read_at, Some(now));
    }

    #[test]
    fn progress_without_page_count_never_marks_read() {
        let mut b = book();
        let now = Utc::now();
        b.progress_patch(0, 0, now).apply_to(&mut b, now);
        assert!(!b.is_read);
    }

    #[test]
    fn progress_clamps_to_total() {
        let mut b = book();
        let now = Utc::now();
        b.progress_patch(500, 200, now).apply_to(&mut b, now);
        assert_eq!(b.current_page, 200);
    }

    #[test]
    fn progress_keeps_original_read_at() {
        let mut b = book();
        let first = Utc::now();
        b.progress_patch(10, 10, first).apply_to(&mut b, first);
        let later = first + chrono::Duration::minutes(5);
        b.progress_patch(10, 10, later).apply_to(&mut b, later);
        assert!(b.is_read);
        assert_eq!(b.read_at, Some(first));
    }

    #[test]
    fn paging_back_unreads_the_book() {
        let mut b = book();
        let now = Utc::now();
        b.progress_patch(10, 10, now).apply_to(&mut b, now);
        b.progress_patch(3, 10, now).apply_to(&mut b, now);
        assert!(!b.is_read);
        assert_eq!(b.read_at, None);
        assert_eq!(b.state(), BookState::InProgress);
        assert!(!b.is_read || b.current_page == b.total_pages);
    }

    #[test]
    fn progress_percent_rounds() {
        let mut b = book();
        assert_eq!(b.progress_percent(), 0);
        b.total_pages = 3;
        b.current_page = 1;
        assert_eq!(b.progress_percent(), 33);
    }

    #[test]
    fn legacy_rows_default_progress_fields() {
        let json = r#"{
            "id": "6f1c1c1e-8d5c-4c55-9a51-111111111111",
            "user_id": "local",
            "folder_id": "6f1c1c1e-8d5c-4c55-9a51-222222222222",
            "title": "Old",
            "file_path": "local://6f1c1c1e-8d5c-4c55-9a51-111111111111",
            "file_name": "old.pdf",
            "is_read": false,
            "read_at": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        }"#;
        let b: Book = serde_json::from_str(json).unwrap();
        assert_eq!(b.current_page, 0);
        assert_eq!(b.total_pages, 0);
    }

    #[test]
    fn null_progress_columns_read_as_zero() {
        let json = r#"{
            "id": "6f1c1c1e-8d5c-4c55-9a51-111111111111",
            "user_id": "u1",
            "folder_id": "6f1c1c1e-8d5c-4c55-9a51-222222222222",
            "title": "Remote",
            "file_path": "u1/f/1.pdf",
            "file_name": "remote.pdf",
            "is_read": null,
            "read_at": null,
            "current_page": null,
            "total_pages": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        }"#;
        let b: Book = serde_json::from_str(json).unwrap();
        assert!(!b.is_read);
        assert_eq!(b.current_page, 0);
        assert_eq!(b.total_pages, 0);
    }

    #[test]
    fn book_patch_serializes_only_set_fields() {
        let patch = BookPatch {
            read_at: Some(None),
            ..Default::default()
        };
        assert_eq!(serde_json::to_string(&patch).unwrap(), r#"{"read_at":null}"#);
    }

    #[test]
    fn stats_count_states() {
        let mut a = book();
        a.is_read = true;
        let mut b = book();
        b.current_page = 4;
        let c = book();
        let stats = LibraryStats::collect(&[a, b, c], &[], &[]);
        assert_eq!(stats.total_books, 3);
        assert_eq!(stats.read_books, 1);
        assert_eq!(stats.unread_books, 2);
        assert_eq!(stats.in_progress_books, 1);
        assert_eq!(stats.read_percentage(), 33);
    }
}
