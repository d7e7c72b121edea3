use super::{BackendMode, LibraryStore};
use crate::error::{EntityKind, Result, ShelfError};
use crate::model::{
    Book, BookPatch, CategoryPatch, Folder, FolderCategory, FolderPatch, Placement,
    LOCAL_USER_ID,
};
use crate::upload::UploadFile;
use chrono::Utc;
use std::cell::RefCell;
use std::collections::HashMap;
use uuid::Uuid;

/// Operations that can be made to fail in an [`InMemoryStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailOp {
    List,
    Create,
    Update,
    Delete,
    Restore,
    Placement,
    RemoveFile,
}

/// In-memory `LibraryStore` for testing orchestration.
///
/// It can pretend to be either backend: in cloud mode the orchestrator mirrors
/// placements to it, which the `placement_writes` counter makes observable.
/// Stored files are kept as byte vectors keyed by their file path.
pub struct InMemoryStore {
    mode: BackendMode,
    folders: Vec<Folder>,
    books: Vec<Book>,
    categories: Vec<FolderCategory>,
    files: HashMap<String, Vec<u8>>,
    failing: Vec<FailOp>,
    allowances: RefCell<HashMap<FailOp, usize>>,
    pub placement_writes: usize,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_mode(BackendMode::Local)
    }

    pub fn with_mode(mode: BackendMode) -> Self {
        Self {
            mode,
            folders: Vec::new(),
            books: Vec::new(),
            categories: Vec::new(),
            files: HashMap::new(),
            failing: Vec::new(),
            allowances: RefCell::new(HashMap::new()),
            placement_writes: 0,
        }
    }

    pub fn fail(&mut self, op: FailOp) {
        if !self.failing.contains(&op) {
            self.failing.push(op);
        }
    }

    /// Let `successes` more calls of `op` through, then fail every later one.
    pub fn fail_after(&mut self, op: FailOp, successes: usize) {
        self.allowances.get_mut().insert(op, successes);
    }

    pub fn heal(&mut self) {
        self.failing.clear();
        self.allowances.get_mut().clear();
    }

    pub fn file(&self, file_path: &str) -> Option<&Vec<u8>> {
        self.files.get(file_path)
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn folder_row(&self, id: &Uuid) -> Option<&Folder> {
        self.folders.iter().find(|f| f.id == *id)
    }

    pub fn book_row(&self, id: &Uuid) -> Option<&Book> {
        self.books.iter().find(|b| b.id == *id)
    }

    pub fn category_row(&self, id: &Uuid) -> Option<&FolderCategory> {
        self.categories.iter().find(|c| c.id == *id)
    }

    fn check(&self, op: FailOp) -> Result<()> {
        if self.failing.contains(&op) {
            return Err(ShelfError::Store(format!("Simulated {:?} failure", op)));
        }
        if let Some(left) = self.allowances.borrow_mut().get_mut(&op) {
            if *left == 0 {
                return Err(ShelfError::Store(format!("Simulated {:?} failure", op)));
            }
            *left -= 1;
        }
        Ok(())
    }
}

impl LibraryStore for InMemoryStore {
    fn mode(&self) -> BackendMode {
        self.mode
    }

    fn list_folders(&self) -> Result<Vec<Folder>> {
        self.check(FailOp::List)?;
        Ok(self.folders.clone())
    }

    fn create_folder(
        &mut self,
        name: &str,
        description: Option<&str>,
        placement: Placement,
    ) -> Result<Folder> {
        self.check(FailOp::Create)?;
        let mut folder = Folder::new(
            LOCAL_USER_ID,
            name,
            description.map(str::to_string),
            Utc::now(),
        );
        folder.position = Some(placement.position);
        folder.category_id = placement.category_id;
        self.folders.insert(0, folder.clone());
        Ok(folder)
    }

    fn update_folder(&mut self, id: &Uuid, patch: &FolderPatch) -> Result<()> {
        self.check(FailOp::Update)?;
        let folder = self
            .folders
            .iter_mut()
            .find(|f| f.id == *id)
            .ok_or(ShelfError::not_found(EntityKind::Folder, *id))?;
        patch.apply_to(folder, Utc::now());
        Ok(())
    }

    fn delete_folder(&mut self, id: &Uuid) -> Result<()> {
        self.check(FailOp::Delete)?;
        self.folders.retain(|f| f.id != *id);
        Ok(())
    }

    fn restore_folder(&mut self, folder: &Folder, index: usize) -> Result<()> {
        self.check(FailOp::Restore)?;
        if self.folder_row(&folder.id).is_none() {
            let index = index.min(self.folders.len());
            self.folders.insert(index, folder.clone());
        }
        Ok(())
    }

    fn update_folder_placement(&mut self, id: &Uuid, placement: Placement) -> Result<()> {
        self.check(FailOp::Placement)?;
        let folder = self
            .folders
            .iter_mut()
            .find(|f| f.id == *id)
            .ok_or(ShelfError::not_found(EntityKind::Folder, *id))?;
        folder.position = Some(placement.position);
        folder.category_id = placement.category_id;
        self.placement_writes += 1;
        Ok(())
    }

    fn list_books(&self) -> Result<Vec<Book>> {
        self.check(FailOp::List)?;
        Ok(self.books.clone())
    }

    fn create_book(&mut self, folder_id: &Uuid, file: &UploadFile, title: &str) -> Result<Book> {
        self.check(FailOp::Create)?;
        let mut book = Book::new(
            LOCAL_USER_ID,
            *folder_id,
            title,
            String::new(),
            file.stored_name(),
            Utc::now(),
        );
        book.file_path = format!("mem/{}/{}", folder_id, book.id);
        self.files.insert(book.file_path.clone(), file.bytes.clone());
        self.books.insert(0, book.clone());
        Ok(book)
    }

    fn update_book(&mut self, id: &Uuid, patch: &BookPatch) -> Result<()> {
        self.check(FailOp::Update)?;
        let book = self
            .books
            .iter_mut()
            .find(|b| b.id == *id)
            .ok_or(ShelfError::not_found(EntityKind::Book, *id))?;
        patch.apply_to(book, Utc::now());
        Ok(())
    }

    fn delete_book(&mut self, id: &Uuid) -> Result<()> {
        self.check(FailOp::Delete)?;
        self.books.retain(|b| b.id != *id);
        Ok(())
    }

    fn restore_book(&mut self, book: &Book, index: usize) -> Result<()> {
        self.check(FailOp::Restore)?;
        if self.book_row(&book.id).is_none() {
            let index = index.min(self.books.len());
            self.books.insert(index, book.clone());
        }
        Ok(())
    }

    fn remove_file(&mut self, file_path: &str) -> Result<()> {
        self.check(FailOp::RemoveFile)?;
        self.files.remove(file_path);
        Ok(())
    }

    fn resolve_file_url(&self, file_path: &str) -> Result<Option<String>> {
        Ok(self
            .files
            .contains_key(file_path)
            .then(|| format!("memory://{}", file_path)))
    }

    fn list_categories(&self) -> Result<Vec<FolderCategory>> {
        self.check(FailOp::List)?;
        Ok(self.categories.clone())
    }

    fn create_category(&mut self, name: &str, position: i64) -> Result<FolderCategory> {
        self.check(FailOp::Create)?;
        let mut category = FolderCategory::new(LOCAL_USER_ID, name, Utc::now());
        category.position = position;
        self.categories.insert(0, category.clone());
        Ok(category)
    }

    fn update_category(&mut self, id: &Uuid, patch: &CategoryPatch) -> Result<()> {
        self.check(FailOp::Update)?;
        let category = self
            .categories
            .iter_mut()
            .find(|c| c.id == *id)
            .ok_or(ShelfError::not_found(EntityKind::Category, *id))?;
        patch.apply_to(category, Utc::now());
        Ok(())
    }

    fn delete_category(&mut self, id: &Uuid) -> Result<()> {
        self.check(FailOp::Delete)?;
        self.categories.retain(|c| c.id != *id);
        Ok(())
    }
}
