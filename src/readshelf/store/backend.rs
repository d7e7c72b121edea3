use crate::error::Result;
use std::rc::Rc;
use uuid::Uuid;

/// Abstract interface for raw local I/O.
///
/// This trait handles the "how" of local persistence (filesystem vs memory):
/// a flat namespace of string values plus a blob area for PDF bytes.
/// [`super::local::LocalStore`] and [`crate::layout::LayoutStore`] handle the
/// "what" on top of it.
pub trait StorageBackend {
    // --- Key-value Operations ---

    /// Read the value stored under `key`.
    /// Returns Ok(None) when nothing has been written yet.
    fn read_key(&self, key: &str) -> Result<Option<String>>;

    /// Overwrite the value stored under `key`.
    /// MUST be atomic so a crash never leaves a half-written value.
    fn write_key(&self, key: &str, value: &str) -> Result<()>;

    // --- Blob Operations ---

    fn read_blob(&self, id: &Uuid) -> Result<Option<Vec<u8>>>;

    fn write_blob(&self, id: &Uuid, bytes: &[u8]) -> Result<()>;

    /// Delete a blob. Deleting a missing blob is not an error.
    fn delete_blob(&self, id: &Uuid) -> Result<()>;

    /// A URL a viewer can open for the blob, or None if it does not exist.
    fn blob_url(&self, id: &Uuid) -> Result<Option<String>>;
}

impl<B: StorageBackend + ?Sized> StorageBackend for Rc<B> {
    fn read_key(&self, key: &str) -> Result<Option<String>> {
        (**self).read_key(key)
    }

    fn write_key(&self, key: &str, value: &str) -> Result<()> {
        (**self).write_key(key, value)
    }

    fn read_blob(&self, id: &Uuid) -> Result<Option<Vec<u8>>> {
        (**self).read_blob(id)
    }

    fn write_blob(&self, id: &Uuid, bytes: &[u8]) -> Result<()> {
        (**self).write_blob(id, bytes)
    }

    fn delete_blob(&self, id: &Uuid) -> Result<()> {
        (**self).delete_blob(id)
    }

    fn blob_url(&self, id: &Uuid) -> Result<Option<String>> {
        (**self).blob_url(id)
    }
}
