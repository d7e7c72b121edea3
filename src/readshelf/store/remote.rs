//! Cloud-mode persistence over the hosted backend's HTTP interface.
//!
//! Rows go through the REST endpoint (`/rest/v1/{table}`, filters as
//! `?id=eq.{id}`), files through object storage
//! (`/storage/v1/object/{bucket}/{path}`). Every request carries the project
//! api key and the user's access token; obtaining that token is the auth
//! layer's job, not this module's.

use super::{BackendMode, LibraryStore};
use crate::error::{Result, ShelfError};
use crate::model::{
    Book, BookPatch, CategoryPatch, Folder, FolderCategory, FolderPatch, Placement,
};
use crate::upload::UploadFile;
use chrono::Utc;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error};
use uuid::Uuid;

const FOLDERS: &str = "folders";
const BOOKS: &str = "books";
const CATEGORIES: &str = "folder_categories";

/// Connection settings for [`RemoteStore`].
#[derive(Debug, Clone)]
pub struct RemoteSettings {
    pub url: String,
    pub api_key: String,
    pub access_token: String,
    pub user_id: String,
    pub bucket: String,
    pub signed_url_ttl_secs: u64,
}

pub struct RemoteStore {
    client: Client,
    settings: RemoteSettings,
}

#[derive(Deserialize)]
struct SignedUrl {
    #[serde(rename = "signedURL")]
    signed_url: String,
}

impl RemoteStore {
    pub fn new(settings: RemoteSettings) -> Self {
        Self {
            client: Client::new(),
            settings,
        }
    }

    fn base(&self) -> &str {
        self.settings.url.trim_end_matches('/')
    }

    fn request(&self, method: Method, url: String) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.settings.api_key)
            .header(
                AUTHORIZATION,
                format!("Bearer {}", self.settings.access_token),
            )
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base(), table)
    }

    fn row_url(&self, table: &str, id: &Uuid) -> String {
        format!("{}?id=eq.{}", self.table_url(table), id)
    }

    fn object_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.base(),
            self.settings.bucket,
            path
        )
    }

    /// Turn non-2xx responses into `ShelfError::Remote` with the body as message.
    fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response
            .text()
            .unwrap_or_else(|_| status.canonical_reason().unwrap_or("").to_string());
        error!(status = status.as_u16(), %message, "remote request failed");
        Err(ShelfError::Remote {
            status: status.as_u16(),
            message,
        })
    }

    fn select<T: DeserializeOwned>(&self, table: &str) -> Result<Vec<T>> {
        let url = format!("{}?select=*&order=created_at.desc", self.table_url(table));
        let response = Self::check(self.request(Method::GET, url).send()?)?;
        Ok(response.json()?)
    }

    fn insert<T: DeserializeOwned>(&self, table: &str, body: serde_json::Value) -> Result<T> {
        let response = self
            .request(Method::POST, self.table_url(table))
            .header("Prefer", "return=representation")
            .json(&body)
            .send()?;
        let mut rows: Vec<T> = Self::check(response)?.json()?;
        if rows.is_empty() {
            return Err(ShelfError::Store(format!("insert into {} returned no row", table)));
        }
        Ok(rows.remove(0))
    }

    fn upsert<T: serde::Serialize>(&self, table: &str, row: &T) -> Result<()> {
        let response = self
            .request(Method::POST, self.table_url(table))
            .header("Prefer", "resolution=merge-duplicates")
            .json(row)
            .send()?;
        Self::check(response)?;
        Ok(())
    }

    fn patch<T: serde::Serialize>(&self, table: &str, id: &Uuid, body: &T) -> Result<()> {
        let response = self
            .request(Method::PATCH, self.row_url(table, id))
            .json(body)
            .send()?;
        Self::check(response)?;
        debug!(table, %id, "patched remote row");
        Ok(())
    }

    fn delete(&self, table: &str, id: &Uuid) -> Result<()> {
        let response = self.request(Method::DELETE, self.row_url(table, id)).send()?;
        Self::check(response)?;
        Ok(())
    }
}

impl LibraryStore for RemoteStore {
    fn mode(&self) -> BackendMode {
        BackendMode::Cloud
    }

    fn list_folders(&self) -> Result<Vec<Folder>> {
        self.select(FOLDERS)
    }

    fn create_folder(
        &mut self,
        name: &str,
        description: Option<&str>,
        placement: Placement,
    ) -> Result<Folder> {
        self.insert(
            FOLDERS,
            json!({
                "name": name,
                "description": description,
                "user_id": self.settings.user_id,
                "position": placement.position,
                "category_id": placement.category_id,
            }),
        )
    }

    fn update_folder(&mut self, id: &Uuid, patch: &FolderPatch) -> Result<()> {
        self.patch(FOLDERS, id, patch)
    }

    fn delete_folder(&mut self, id: &Uuid) -> Result<()> {
        self.delete(FOLDERS, id)
    }

    fn restore_folder(&mut self, folder: &Folder, _index: usize) -> Result<()> {
        self.upsert(FOLDERS, folder)
    }

    fn update_folder_placement(&mut self, id: &Uuid, placement: Placement) -> Result<()> {
        self.patch(
            FOLDERS,
            id,
            &json!({
                "position": placement.position,
                "category_id": placement.category_id,
            }),
        )
    }

    fn list_books(&self) -> Result<Vec<Book>> {
        self.select(BOOKS)
    }

    fn create_book(&mut self, folder_id: &Uuid, file: &UploadFile, title: &str) -> Result<Book> {
        let ext = file.extension().unwrap_or_else(|| "pdf".to_string());
        let path = format!(
            "{}/{}/{}.{}",
            self.settings.user_id,
            folder_id,
            Utc::now().timestamp_millis(),
            ext
        );

        let response = self
            .request(Method::POST, self.object_url(&path))
            .header(CONTENT_TYPE, "application/pdf")
            .body(file.bytes.clone())
            .send()?;
        Self::check(response)?;

        let inserted = self.insert(
            BOOKS,
            json!({
                "folder_id": folder_id,
                "user_id": self.settings.user_id,
                "title": title,
                "file_path": path,
                "file_name": file.stored_name(),
            }),
        );
        if inserted.is_err() {
            // The row is the only reference to the object; drop it.
            let _ = self.remove_file(&path);
        }
        inserted
    }

    fn update_book(&mut self, id: &Uuid, patch: &BookPatch) -> Result<()> {
        self.patch(BOOKS, id, patch)
    }

    fn delete_book(&mut self, id: &Uuid) -> Result<()> {
        self.delete(BOOKS, id)
    }

    fn restore_book(&mut self, book: &Book, _index: usize) -> Result<()> {
        self.upsert(BOOKS, book)
    }

    fn remove_file(&mut self, file_path: &str) -> Result<()> {
        let url = format!(
            "{}/storage/v1/object/{}",
            self.base(),
            self.settings.bucket
        );
        let response = self
            .request(Method::DELETE, url)
            .json(&json!({ "prefixes": [file_path] }))
            .send()?;
        Self::check(response)?;
        Ok(())
    }

    fn resolve_file_url(&self, file_path: &str) -> Result<Option<String>> {
        let url = format!(
            "{}/storage/v1/object/sign/{}/{}",
            self.base(),
            self.settings.bucket,
            file_path
        );
        let response = self
            .request(Method::POST, url)
            .json(&json!({ "expiresIn": self.settings.signed_url_ttl_secs }))
            .send()?;
        let signed: SignedUrl = Self::check(response)?.json()?;
        Ok(Some(format!("{}/storage/v1{}", self.base(), signed.signed_url)))
    }

    fn list_categories(&self) -> Result<Vec<FolderCategory>> {
        self.select(CATEGORIES)
    }

    fn create_category(&mut self, name: &str, position: i64) -> Result<FolderCategory> {
        self.insert(
            CATEGORIES,
            json!({
                "name": name,
                "user_id": self.settings.user_id,
                "position": position,
            }),
        )
    }

    fn update_category(&mut self, id: &Uuid, patch: &CategoryPatch) -> Result<()> {
        self.patch(CATEGORIES, id, patch)
    }

    fn delete_category(&mut self, id: &Uuid) -> Result<()> {
        self.delete(CATEGORIES, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(url: &str) -> RemoteStore {
        RemoteStore::new(RemoteSettings {
            url: url.to_string(),
            api_key: "anon".to_string(),
            access_token: "token".to_string(),
            user_id: "u1".to_string(),
            bucket: "pdfs".to_string(),
            signed_url_ttl_secs: 3600,
        })
    }

    #[test]
    fn builds_row_urls() {
        let store = store("https://example.test/");
        let id = Uuid::nil();
        assert_eq!(
            store.row_url(BOOKS, &id),
            format!("https://example.test/rest/v1/books?id=eq.{}", id)
        );
    }

    #[test]
    fn builds_object_urls() {
        let store = store("https://example.test");
        assert_eq!(
            store.object_url("u1/f/1.pdf"),
            "https://example.test/storage/v1/object/pdfs/u1/f/1.pdf"
        );
    }

    #[test]
    fn reports_cloud_mode() {
        assert_eq!(store("https://example.test").mode(), BackendMode::Cloud);
    }
}
