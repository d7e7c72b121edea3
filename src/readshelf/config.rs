//! # Configuration
//!
//! Settings are loaded with [`confique`], layered in priority order:
//! 1. **Environment variables**: `READSHELF_MODE`, `READSHELF_DATA_DIR`,
//!    `READSHELF_REMOTE_URL`, ...
//! 2. **Config file**: `readshelf.toml` in the OS config directory (via the
//!    `directories` crate), or the file passed with `--config`.
//! 3. **Compiled defaults**: `#[config(default = ...)]`.
//!
//! ## Available Settings
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | `mode` | `local` | `local` or `cloud` |
//! | `data_dir` | OS data dir | Where local collections, blobs and the layout live |
//! | `grace_period_ms` | `5000` | Undo window for deletes |
//! | `signed_url_ttl_secs` | `3600` | Lifetime of signed file URLs in cloud mode |
//! | `remote.url` | | Hosted backend base URL |
//! | `remote.api_key` | | Project api key |
//! | `remote.access_token` | | Session token of the signed-in user |
//! | `remote.user_id` | | Id of the signed-in user |
//! | `remote.bucket` | `pdfs` | Storage bucket for PDFs |
//!
//! Cloud mode without complete remote settings falls back to local mode.

use crate::error::{Result, ShelfError};
use crate::store::remote::RemoteSettings;
use crate::store::BackendMode;
use confique::Config;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const CONFIG_FILENAME: &str = "readshelf.toml";

#[derive(Config, Debug, Clone)]
pub struct ShelfConfig {
    /// Which backend holds the library.
    #[config(env = "READSHELF_MODE", default = "local")]
    pub mode: BackendMode,

    /// Directory for local data. Defaults to the OS data directory.
    #[config(env = "READSHELF_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// How long a delete can be undone, in milliseconds.
    #[config(env = "READSHELF_GRACE_PERIOD_MS", default = 5000)]
    pub grace_period_ms: u64,

    /// Lifetime of signed file URLs in cloud mode.
    #[config(env = "READSHELF_SIGNED_URL_TTL_SECS", default = 3600)]
    pub signed_url_ttl_secs: u64,

    #[config(nested)]
    pub remote: RemoteConfig,
}

#[derive(Config, Debug, Clone)]
pub struct RemoteConfig {
    #[config(env = "READSHELF_REMOTE_URL")]
    pub url: Option<String>,

    #[config(env = "READSHELF_REMOTE_API_KEY")]
    pub api_key: Option<String>,

    #[config(env = "READSHELF_REMOTE_ACCESS_TOKEN")]
    pub access_token: Option<String>,

    #[config(env = "READSHELF_REMOTE_USER_ID")]
    pub user_id: Option<String>,

    #[config(env = "READSHELF_REMOTE_BUCKET", default = "pdfs")]
    pub bucket: String,
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "readshelf")
}

impl ShelfConfig {
    /// Load from the environment, then `file` (or the default config file).
    /// A missing file is not an error.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder = Self::builder().env();
        match file {
            Some(path) => builder = builder.file(path),
            None => {
                if let Some(dirs) = project_dirs() {
                    builder = builder.file(dirs.config_dir().join(CONFIG_FILENAME));
                }
            }
        }
        builder
            .load()
            .map_err(|e| ShelfError::Config(e.to_string()))
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        project_dirs()
            .map(|dirs| dirs.data_dir().to_path_buf())
            .ok_or_else(|| ShelfError::Config("No data directory available".to_string()))
    }

    /// Remote connection settings, if every required value is present.
    pub fn remote_settings(&self) -> Option<RemoteSettings> {
        let remote = &self.remote;
        Some(RemoteSettings {
            url: remote.url.clone()?,
            api_key: remote.api_key.clone()?,
            access_token: remote.access_token.clone()?,
            user_id: remote.user_id.clone()?,
            bucket: remote.bucket.clone(),
            signed_url_ttl_secs: self.signed_url_ttl_secs,
        })
    }

    /// The mode that will actually be used.
    pub fn effective_mode(&self) -> BackendMode {
        match self.mode {
            BackendMode::Cloud if self.remote_settings().is_none() => {
                warn!("cloud mode without complete remote settings, using local mode");
                BackendMode::Local
            }
            mode => mode,
        }
    }
}
