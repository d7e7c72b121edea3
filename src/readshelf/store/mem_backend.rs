use super::backend::StorageBackend;
use crate::error::{Result, ShelfError};
use std::cell::RefCell;
use std::collections::HashMap;
use uuid::Uuid;

/// In-memory storage backend for testing.
///
/// Uses `RefCell` for interior mutability since the library is single-threaded.
/// This keeps every `StorageBackend` method on `&self`.
#[derive(Default)]
pub struct MemBackend {
    values: RefCell<HashMap<String, String>>,
    blobs: RefCell<HashMap<Uuid, Vec<u8>>>,
    simulate_write_error: RefCell<bool>,
}

impl MemBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable write error simulation for testing error handling.
    pub fn set_simulate_write_error(&self, simulate: bool) {
        *self.simulate_write_error.borrow_mut() = simulate;
    }

    /// Test helper to plant a raw value, e.g. corrupt JSON.
    pub fn put_raw(&self, key: &str, value: &str) {
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
    }

    pub fn blob_count(&self) -> usize {
        self.blobs.borrow().len()
    }

    fn check_write(&self) -> Result<()> {
        if *self.simulate_write_error.borrow() {
            return Err(ShelfError::Store("Simulated write error".to_string()));
        }
        Ok(())
    }
}

impl StorageBackend for MemBackend {
    fn read_key(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.borrow().get(key).cloned())
    }

    fn write_key(&self, key: &str, value: &str) -> Result<()> {
        self.check_write()?;
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn read_blob(&self, id: &Uuid) -> Result<Option<Vec<u8>>> {
        Ok(self.blobs.borrow().get(id).cloned())
    }

    fn write_blob(&self, id: &Uuid, bytes: &[u8]) -> Result<()> {
        self.check_write()?;
        self.blobs.borrow_mut().insert(*id, bytes.to_vec());
        Ok(())
    }

    fn delete_blob(&self, id: &Uuid) -> Result<()> {
        self.check_write()?;
        self.blobs.borrow_mut().remove(id);
        Ok(())
    }

    fn blob_url(&self, id: &Uuid) -> Result<Option<String>> {
        if self.blobs.borrow().contains_key(id) {
            Ok(Some(format!("memory://blob-{}", id)))
        } else {
            Ok(None)
        }
    }
}
