//! Content-addressable file store
//!
//! Payloads are keyed by the SHA-1 of their bytes. Every reference to a payload
//! gets its own metadata entry (owner, context, mime type), but identical bytes
//! are stored exactly once no matter how many activities point at them.

use crate::ids::{IdAllocator, IdClass};
use sha1::{Digest, Sha1};
use std::collections::BTreeMap;

/// Mime type used for unknown and container-like extensions
pub const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

/// Hex-encoded SHA-1 of `data`, the storage key of a blob
pub fn content_hash(data: &[u8]) -> String {
    hex::encode(Sha1::digest(data))
}

/// Resolve a mime type from the filename extension
pub fn mime_type_for(filename: &str) -> &'static str {
    let extension = match filename.rsplit_once('.') {
        Some((_, ext)) => ext.to_ascii_lowercase(),
        None => return FALLBACK_MIME_TYPE,
    };

    match extension.as_str() {
        // Documents
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "odt" => "application/vnd.oasis.opendocument.text",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "md" => "text/markdown",
        "tex" => "application/x-tex",
        // Web
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" => "application/javascript",
        "json" => "application/json",
        "xml" => "application/xml",
        // Images
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        // Audio / video
        "mp3" => "audio/mp3",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        // Plain archives. Packaged formats that happen to be zip containers
        // (h5p, mbz, ...) deliberately fall through to the opaque type.
        "zip" => "application/zip",
        _ => FALLBACK_MIME_TYPE,
    }
}

/// Component/area/item/context under which a file is registered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOwner {
    pub component: String,
    pub area: String,
    pub item_id: u64,
    pub context_id: u64,
}

impl FileOwner {
    pub fn new(component: impl Into<String>, area: impl Into<String>, context_id: u64) -> Self {
        Self {
            component: component.into(),
            area: area.into(),
            item_id: 0,
            context_id,
        }
    }
}

/// Metadata entry for one reference to a stored blob
#[derive(Debug, Clone)]
pub struct StoredFile {
    /// Metadata id (distinct from the content hash)
    pub id: u64,
    pub content_hash: String,
    pub owner: FileOwner,
    pub filepath: String,
    pub filename: String,
    pub size: u64,
    pub mime_type: &'static str,
}

/// Deduplicating blob store with per-reference metadata
#[derive(Debug, Default)]
pub struct FileStore {
    blobs: BTreeMap<String, Vec<u8>>,
    files: Vec<StoredFile>,
}

impl FileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `data` under `owner` and return the new metadata id.
    ///
    /// The blob itself is only stored the first time its hash is seen.
    pub fn add_file(
        &mut self,
        ids: &mut IdAllocator,
        data: Vec<u8>,
        filename: &str,
        owner: FileOwner,
    ) -> u64 {
        let content_hash = content_hash(&data);
        let size = data.len() as u64;

        if !self.blobs.contains_key(&content_hash) {
            self.blobs.insert(content_hash.clone(), data);
        } else {
            tracing::debug!(hash = %content_hash, filename, "reusing stored blob");
        }

        let id = ids.allocate(IdClass::File);
        self.files.push(StoredFile {
            id,
            content_hash,
            owner,
            filepath: "/".to_string(),
            filename: filename.to_string(),
            size,
            mime_type: mime_type_for(filename),
        });
        id
    }

    /// Metadata entries in registration order
    pub fn files(&self) -> &[StoredFile] {
        &self.files
    }

    pub fn get(&self, id: u64) -> Option<&StoredFile> {
        self.files.iter().find(|f| f.id == id)
    }

    pub fn blob(&self, content_hash: &str) -> Option<&[u8]> {
        self.blobs.get(content_hash).map(Vec::as_slice)
    }

    /// Distinct blobs, ordered by content hash
    pub fn blobs(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.blobs.iter().map(|(h, d)| (h.as_str(), d.as_slice()))
    }

    pub fn blob_count(&self) -> usize {
        self.blobs.len()
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}
