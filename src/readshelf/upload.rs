//! Upload input handling: which files are accepted and what they are called.
//!
//! Files are accepted by extension only; the bytes are never sniffed.

use crate::error::{Result, ShelfError};
use std::fs;
use std::path::Path;

/// A file handed to the library for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ShelfError::Api(format!("Invalid file name: {}", path.display())))?
            .to_string();
        let bytes = fs::read(path).map_err(ShelfError::Io)?;
        Ok(Self { file_name, bytes })
    }

    pub fn is_pdf(&self) -> bool {
        is_pdf_file_name(&self.file_name)
    }

    /// Extension of the file name without the dot, lower-cased.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
    }

    /// Name recorded on the book row.
    pub fn stored_name(&self) -> String {
        self.file_name.to_lowercase()
    }
}

pub fn is_pdf_file_name(file_name: &str) -> bool {
    file_name.to_lowercase().ends_with(".pdf")
}

/// Title derived from a file name: extension stripped, underscores become
/// spaces and every hyphen (with the whitespace around it) becomes ` - `.
pub fn default_title(file_name: &str) -> String {
    let stem = strip_pdf_extension(file_name).replace('_', " ");
    let parts: Vec<&str> = stem.split('-').collect();
    let last = parts.len() - 1;
    let normalized: Vec<&str> = parts
        .iter()
        .enumerate()
        .map(|(i, part)| match i {
            0 if last == 0 => *part,
            0 => part.trim_end(),
            i if i == last => part.trim_start(),
            _ => part.trim(),
        })
        .collect();
    normalized.join(" - ").trim().to_string()
}

fn strip_pdf_extension(file_name: &str) -> &str {
    let len = file_name.len();
    if len >= 4 && file_name.is_char_boundary(len - 4) {
        let (stem, ext) = file_name.split_at(len - 4);
        if ext.eq_ignore_ascii_case(".pdf") {
            return stem;
        }
    }
    file_name
}
