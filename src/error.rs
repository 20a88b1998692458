use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for backup generation operations
pub type Result<T> = std::result::Result<T, MbzError>;

/// Unified error type for all backup operations
#[derive(Debug, Error)]
pub enum MbzError {
    // Builder errors
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unknown section id: {0}")]
    UnknownSection(u64),

    #[error("Cannot read referenced file {}: {source}", path.display())]
    UnreadableFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    // Packaging errors
    #[error("Structural error: {0}")]
    Structural(String),

    // Reader errors
    #[error("Invalid backup archive: {0}")]
    InvalidArchive(String),

    #[error("Document not found in archive: {0}")]
    DocumentNotFound(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Temporary file error: {0}")]
    Persist(#[from] tempfile::PersistError),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    // Serialization errors
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(String),
}

impl MbzError {
    /// True for errors caused by a dangling section id or an unreadable input file
    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            MbzError::UnknownSection(_) | MbzError::UnreadableFile { .. }
        )
    }

    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        MbzError::Validation(msg.into())
    }
}

impl From<toml::de::Error> for MbzError {
    fn from(err: toml::de::Error) -> Self {
        MbzError::Toml(err.to_string())
    }
}

impl From<walkdir::Error> for MbzError {
    fn from(err: walkdir::Error) -> Self {
        MbzError::Io(err.into())
    }
}
