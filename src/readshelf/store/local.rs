use super::backend::StorageBackend;
use super::{BackendMode, LibraryStore};
use crate::error::{EntityKind, Result, ShelfError};
use crate::model::{
    Book, BookPatch, CategoryPatch, Folder, FolderCategory, FolderPatch, Placement,
    LOCAL_FILE_SCHEME, LOCAL_USER_ID,
};
use crate::upload::UploadFile;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

pub const FOLDERS_KEY: &str = "reading-shelf-folders";
pub const BOOKS_KEY: &str = "reading-shelf-books";
pub const CATEGORIES_KEY: &str = "reading-shelf-categories";

/// Local-mode persistence: every collection is one JSON array stored under a
/// fixed key, and PDF bytes are blobs keyed by book id.
///
/// New rows go to the front of their array, so the natural order of each
/// collection is newest first.
pub struct LocalStore<B: StorageBackend> {
    pub(crate) backend: B,
}

impl<B: StorageBackend> LocalStore<B> {
    pub fn with_backend(backend: B) -> Self {
        Self { backend }
    }

    /// Corrupt collections read as empty rather than failing the session.
    fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>> {
        let Some(raw) = self.backend.read_key(key)? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str(&raw) {
            Ok(items) => Ok(items),
            Err(e) => {
                warn!(key, error = %e, "discarding unreadable local collection");
                Ok(Vec::new())
            }
        }
    }

    fn save<T: Serialize>(&self, key: &str, items: &[T]) -> Result<()> {
        let raw = serde_json::to_string(items).map_err(ShelfError::Serialization)?;
        self.backend.write_key(key, &raw)
    }

    fn modify_folder(&self, id: &Uuid, f: impl FnOnce(&mut Folder)) -> Result<()> {
        let mut folders: Vec<Folder> = self.load(FOLDERS_KEY)?;
        let folder = folders
            .iter_mut()
            .find(|x| x.id == *id)
            .ok_or(ShelfError::not_found(EntityKind::Folder, *id))?;
        f(folder);
        self.save(FOLDERS_KEY, &folders)
    }

    fn blob_id(file_path: &str) -> Option<Uuid> {
        file_path
            .strip_prefix(LOCAL_FILE_SCHEME)
            .and_then(|id| Uuid::parse_str(id).ok())
    }
}

impl<B: StorageBackend> LibraryStore for LocalStore<B> {
    fn mode(&self) -> BackendMode {
        BackendMode::Local
    }

    fn list_folders(&self) -> Result<Vec<Folder>> {
        self.load(FOLDERS_KEY)
    }

    fn create_folder(
        &mut self,
        name: &str,
        description: Option<&str>,
        placement: Placement,
    ) -> Result<Folder> {
        let mut folder = Folder::new(
            LOCAL_USER_ID,
            name,
            description.map(str::to_string),
            Utc::now(),
        );
        folder.position = Some(placement.position);
        folder.category_id = placement.category_id;

        let mut folders: Vec<Folder> = self.load(FOLDERS_KEY)?;
        folders.insert(0, folder.clone());
        self.save(FOLDERS_KEY, &folders)?;
        debug!(id = %folder.id, "created local folder");
        Ok(folder)
    }

    fn update_folder(&mut self, id: &Uuid, patch: &FolderPatch) -> Result<()> {
        let now = Utc::now();
        self.modify_folder(id, |folder| patch.apply_to(folder, now))
    }

    fn delete_folder(&mut self, id: &Uuid) -> Result<()> {
        let mut folders: Vec<Folder> = self.load(FOLDERS_KEY)?;
        folders.retain(|f| f.id != *id);
        self.save(FOLDERS_KEY, &folders)
    }

    fn restore_folder(&mut self, folder: &Folder, index: usize) -> Result<()> {
        let mut folders: Vec<Folder> = self.load(FOLDERS_KEY)?;
        if folders.iter().any(|f| f.id == folder.id) {
            return Ok(());
        }
        let index = index.min(folders.len());
        folders.insert(index, folder.clone());
        self.save(FOLDERS_KEY, &folders)
    }

    fn update_folder_placement(&mut self, id: &Uuid, placement: Placement) -> Result<()> {
        self.modify_folder(id, |folder| {
            folder.position = Some(placement.position);
            folder.category_id = placement.category_id;
        })
    }

    fn list_books(&self) -> Result<Vec<Book>> {
        self.load(BOOKS_KEY)
    }

    fn create_book(&mut self, folder_id: &Uuid, file: &UploadFile, title: &str) -> Result<Book> {
        let mut book = Book::new(
            LOCAL_USER_ID,
            *folder_id,
            title,
            String::new(),
            file.stored_name(),
            Utc::now(),
        );
        book.file_path = format!("{}{}", LOCAL_FILE_SCHEME, book.id);

        // Blob first: a row must never point at bytes that were not written.
        self.backend.write_blob(&book.id, &file.bytes)?;

        let mut books: Vec<Book> = self.load(BOOKS_KEY)?;
        books.insert(0, book.clone());
        if let Err(e) = self.save(BOOKS_KEY, &books) {
            let _ = self.backend.delete_blob(&book.id);
            return Err(e);
        }
        debug!(id = %book.id, bytes = file.bytes.len(), "stored local book");
        Ok(book)
    }

    fn update_book(&mut self, id: &Uuid, patch: &BookPatch) -> Result<()> {
        let mut books: Vec<Book> = self.load(BOOKS_KEY)?;
        let book = books
            .iter_mut()
            .find(|b| b.id == *id)
            .ok_or(ShelfError::not_found(EntityKind::Book, *id))?;
        patch.apply_to(book, Utc::now());
        self.save(BOOKS_KEY, &books)
    }

    fn delete_book(&mut self, id: &Uuid) -> Result<()> {
        let mut books: Vec<Book> = self.load(BOOKS_KEY)?;
        books.retain(|b| b.id != *id);
        self.save(BOOKS_KEY, &books)
    }

    fn restore_book(&mut self, book: &Book, index: usize) -> Result<()> {
        let mut books: Vec<Book> = self.load(BOOKS_KEY)?;
        if books.iter().any(|b| b.id == book.id) {
            return Ok(());
        }
        let index = index.min(books.len());
        books.insert(index, book.clone());
        self.save(BOOKS_KEY, &books)
    }

    fn remove_file(&mut self, file_path: &str) -> Result<()> {
        match Self::blob_id(file_path) {
            Some(id) => self.backend.delete_blob(&id),
            None => {
                warn!(file_path, "not a local file reference, nothing to remove");
                Ok(())
            }
        }
    }

    fn resolve_file_url(&self, file_path: &str) -> Result<Option<String>> {
        match Self::blob_id(file_path) {
            Some(id) => self.backend.blob_url(&id),
            None => Ok(None),
        }
    }

    fn list_categories(&self) -> Result<Vec<FolderCategory>> {
        self.load(CATEGORIES_KEY)
    }

    fn create_category(&mut self, name: &str, position: i64) -> Result<FolderCategory> {
        let mut category = FolderCategory::new(LOCAL_USER_ID, name, Utc::now());
        category.position = position;
        let mut categories: Vec<FolderCategory> = self.load(CATEGORIES_KEY)?;
        categories.insert(0, category.clone());
        self.save(CATEGORIES_KEY, &categories)?;
        Ok(category)
    }

    fn update_category(&mut self, id: &Uuid, patch: &CategoryPatch) -> Result<()> {
        let mut categories: Vec<FolderCategory> = self.load(CATEGORIES_KEY)?;
        let category = categories
            .iter_mut()
            .find(|c| c.id == *id)
            .ok_or(ShelfError::not_found(EntityKind::Category, *id))?;
        patch.apply_to(category, Utc::now());
        self.save(CATEGORIES_KEY, &categories)
    }

    fn delete_category(&mut self, id: &Uuid) -> Result<()> {
        let mut categories: Vec<FolderCategory> = self.load(CATEGORIES_KEY)?;
        categories.retain(|c| c.id != *id);
        self.save(CATEGORIES_KEY, &categories)
    }
}
