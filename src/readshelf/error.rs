use thiserror::Error;
use uuid::Uuid;

/// Entity classes the library stores, used in error and log messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Book,
    Folder,
    Category,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Book => write!(f, "book"),
            EntityKind::Folder => write!(f, "folder"),
            EntityKind::Category => write!(f, "category"),
        }
    }
}

#[derive(Error, Debug)]
pub enum ShelfError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: Uuid },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Remote error ({status}): {message}")]
    Remote { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Api Error: {0}")]
    Api(String),
}

impl ShelfError {
    pub fn not_found(kind: EntityKind, id: Uuid) -> Self {
        ShelfError::NotFound { kind, id }
    }
}

pub type Result<T> = std::result::Result<T, ShelfError>;
