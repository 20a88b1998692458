use crate::archive::layout;
use crate::builder::CourseBuilder;
use crate::document::render_all;
use crate::error::{MbzError, Result};
use flate2::write::GzEncoder;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, TempDir};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Mode of every file entry in the tar stream
const ENTRY_MODE: u32 = 0o644;

/// Counts reported after a successful write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackageSummary {
    pub documents: usize,
    pub blobs: usize,
    pub entries: usize,
}

/// Stages a builder's documents and blobs in a scratch tree and packs them
/// into a gzip-compressed tar archive
pub struct BackupWriter<'a> {
    builder: &'a CourseBuilder,
}

impl<'a> BackupWriter<'a> {
    pub fn new(builder: &'a CourseBuilder) -> Self {
        Self { builder }
    }

    /// Write the archive to `output_path`.
    ///
    /// The archive is assembled in a temporary file next to `output_path` and
    /// moved into place only once complete, so a failed write never leaves a
    /// partial archive behind. The scratch tree is removed on every path.
    pub fn write(&self, output_path: &Path) -> Result<PackageSummary> {
        if self.builder.sections().is_empty() {
            return Err(MbzError::Structural(
                "a backup needs at least one section".into(),
            ));
        }

        info!(
            path = %output_path.display(),
            sections = self.builder.sections().len(),
            activities = self.builder.activities().len(),
            "generating backup"
        );

        let scratch = TempDir::new()?;
        let (documents, blobs) = self.stage(scratch.path())?;
        let entries = self.pack(scratch.path(), output_path)?;

        let summary = PackageSummary {
            documents,
            blobs,
            entries,
        };
        info!(
            path = %output_path.display(),
            documents,
            blobs,
            entries,
            "backup written"
        );
        Ok(summary)
    }

    /// Materialize every document and blob under `root`
    fn stage(&self, root: &Path) -> Result<(usize, usize)> {
        let documents = render_all(self.builder);
        for doc in &documents {
            write_staged(root, &doc.path, &doc.to_bytes()?)?;
        }

        let store = self.builder.files();
        for (hash, data) in store.blobs() {
            write_staged(root, &layout::blob_path(hash), data)?;
        }

        debug!(
            documents = documents.len(),
            blobs = store.blob_count(),
            "staged backup tree"
        );
        Ok((documents.len(), store.blob_count()))
    }

    /// Tar and compress the staged tree into a temporary file beside the
    /// destination, then persist it over `output_path`
    fn pack(&self, root: &Path, output_path: &Path) -> Result<usize> {
        let files = staged_files(root)?;

        let dir = output_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut temp = NamedTempFile::new_in(dir)?;

        {
            let encoder = GzEncoder::new(temp.as_file_mut(), self.builder.config().compression());
            let mut tar = tar::Builder::new(encoder);
            let mtime = self.builder.timestamp().max(0) as u64;

            for (relative, absolute) in &files {
                let data = fs::read(absolute)?;
                let mut header = tar::Header::new_gnu();
                header.set_entry_type(tar::EntryType::Regular);
                header.set_size(data.len() as u64);
                header.set_mode(ENTRY_MODE);
                header.set_mtime(mtime);
                tar.append_data(&mut header, relative, data.as_slice())?;
            }

            let mut encoder = tar.into_inner()?;
            encoder.flush()?;
            encoder.finish()?;
        }

        temp.as_file().sync_all()?;
        temp.persist(output_path)?;
        Ok(files.len())
    }
}

fn write_staged(root: &Path, relative: &str, data: &[u8]) -> Result<()> {
    let target = root.join(relative);
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(target, data)?;
    Ok(())
}

/// Every staged file as (`/`-separated relative path, absolute path), sorted
/// by relative path
fn staged_files(root: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).min_depth(1) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| MbzError::Structural(format!("staged path escaped scratch root: {}", e)))?
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        files.push((relative, entry.into_path()));
    }
    files.sort();
    Ok(files)
}
