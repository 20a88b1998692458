use crate::archive::layout::{self, MANIFEST_FILE};
use crate::document::XmlElement;
use crate::error::{MbzError, Result};
use flate2::read::GzDecoder;
use serde::Serialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Normalize path to forward slashes
fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
}

/// Section of a reopened backup with its activities in manifest order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutlineSection {
    pub id: u64,
    pub title: String,
    pub directory: String,
    pub activities: Vec<OutlineActivity>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutlineActivity {
    pub id: u64,
    pub modname: String,
    pub title: String,
    pub directory: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutlineFile {
    pub content_hash: String,
    pub size: u64,
    pub path: String,
}

/// The section/activity graph and blob listing recovered from a manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourseOutline {
    pub fullname: String,
    pub shortname: String,
    pub sections: Vec<OutlineSection>,
    pub files: Vec<OutlineFile>,
}

impl CourseOutline {
    /// Activity ids of every section, in order
    pub fn activity_graph(&self) -> Vec<(u64, Vec<u64>)> {
        self.sections
            .iter()
            .map(|s| (s.id, s.activities.iter().map(|a| a.id).collect()))
            .collect()
    }

    pub fn activity_count(&self) -> usize {
        self.sections.iter().map(|s| s.activities.len()).sum()
    }
}

/// Reader over a generated backup, held fully in memory
pub struct BackupReader {
    entries: HashMap<String, Vec<u8>>,
    entry_list: Vec<String>,
}

impl BackupReader {
    /// Open and unpack a `.mbz` archive
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Unpack a gzip-compressed tar stream
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut archive = tar::Archive::new(GzDecoder::new(reader));
        let mut entries = HashMap::new();
        let mut entry_list = Vec::new();

        let invalid = |e: std::io::Error| MbzError::InvalidArchive(e.to_string());
        for entry in archive.entries().map_err(invalid)? {
            let mut entry = entry.map_err(invalid)?;
            if !entry.header().entry_type().is_file() {
                continue;
            }
            let path = normalize_path(&entry.path().map_err(invalid)?.to_string_lossy());
            let mut data = Vec::new();
            entry.read_to_end(&mut data).map_err(invalid)?;

            entry_list.push(path.clone());
            entries.insert(path, data);
        }

        if entry_list.is_empty() {
            return Err(MbzError::InvalidArchive("archive has no entries".into()));
        }
        Ok(Self {
            entries,
            entry_list,
        })
    }

    /// Get number of entries in archive
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// List all file paths in archive order
    pub fn list_files(&self) -> &[String] {
        &self.entry_list
    }

    /// Check if a file exists in the archive
    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(&normalize_path(path))
    }

    /// Raw bytes of one entry
    pub fn read_file(&self, path: &str) -> Result<&[u8]> {
        self.entries
            .get(&normalize_path(path))
            .map(Vec::as_slice)
            .ok_or_else(|| MbzError::DocumentNotFound(path.to_string()))
    }

    /// Parse one XML document
    pub fn document(&self, path: &str) -> Result<XmlElement> {
        XmlElement::parse(self.read_file(path)?)
    }

    pub fn manifest(&self) -> Result<XmlElement> {
        self.document(MANIFEST_FILE)
    }

    /// Walk the manifest contents into a [`CourseOutline`]
    pub fn outline(&self) -> Result<CourseOutline> {
        let manifest = self.manifest()?;
        let info = manifest
            .find("information")
            .ok_or_else(|| missing(MANIFEST_FILE, "information"))?;
        let contents = info
            .find("contents")
            .ok_or_else(|| missing(MANIFEST_FILE, "contents"))?;

        let mut sections = Vec::new();
        if let Some(list) = contents.find("sections") {
            for s in list.find_all("section") {
                sections.push(OutlineSection {
                    id: number(s, "sectionid")?,
                    title: s.child_text("title").unwrap_or_default(),
                    directory: s.child_text("directory").unwrap_or_default(),
                    activities: Vec::new(),
                });
            }
        }

        if let Some(list) = contents.find("activities") {
            for a in list.find_all("activity") {
                let section_id = number(a, "sectionid")?;
                let section = sections
                    .iter_mut()
                    .find(|s| s.id == section_id)
                    .ok_or_else(|| {
                        MbzError::InvalidArchive(format!(
                            "activity listed under unknown section {}",
                            section_id
                        ))
                    })?;
                section.activities.push(OutlineActivity {
                    id: number(a, "moduleid")?,
                    modname: a.child_text("modulename").unwrap_or_default(),
                    title: a.child_text("title").unwrap_or_default(),
                    directory: a.child_text("directory").unwrap_or_default(),
                });
            }
        }

        let mut files = Vec::new();
        if let Some(list) = contents.find("files") {
            for f in list.find_all("file") {
                let content_hash = f.child_text("contenthash").unwrap_or_default();
                files.push(OutlineFile {
                    size: number(f, "filesize")?,
                    path: f
                        .child_text("path")
                        .unwrap_or_else(|| layout::blob_path(&content_hash)),
                    content_hash,
                });
            }
        }

        Ok(CourseOutline {
            fullname: info.child_text("original_course_fullname").unwrap_or_default(),
            shortname: info
                .child_text("original_course_shortname")
                .unwrap_or_default(),
            sections,
            files,
        })
    }

    /// Activity ids recorded in a section's own document
    pub fn section_sequence(&self, section_id: u64) -> Result<Vec<u64>> {
        let path = layout::join(&layout::section_dir(section_id), "section.xml");
        let section = self.document(&path)?;
        let sequence = section.child_text("sequence").unwrap_or_default();

        sequence
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(|s| {
                s.trim().parse().map_err(|_| {
                    MbzError::InvalidArchive(format!("bad sequence entry '{}' in {}", s, path))
                })
            })
            .collect()
    }
}

fn missing(document: &str, element: &str) -> MbzError {
    MbzError::InvalidArchive(format!("{} has no <{}>", document, element))
}

/// Numeric text of a required child element
pub(crate) fn number(element: &XmlElement, child: &str) -> Result<u64> {
    let text = element
        .child_text(child)
        .ok_or_else(|| missing(&element.name, child))?;
    text.trim().parse().map_err(|_| {
        MbzError::InvalidArchive(format!(
            "<{}> of <{}> is not a number: '{}'",
            child, element.name, text
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::BackupWriter;
    use crate::document::tests::sample_builder;

    #[test]
    fn test_outline_matches_builder() {
        let builder = sample_builder();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("sample.mbz");
        BackupWriter::new(&builder).write(&out).unwrap();

        let reader = BackupReader::open(&out).unwrap();
        let outline = reader.outline().unwrap();

        assert_eq!(outline.fullname, "Sample & Co");
        assert_eq!(outline.activity_graph(), vec![(1, vec![1]), (2, vec![2])]);
        assert_eq!(outline.sections[1].activities[0].modname, "quiz");
        assert_eq!(outline.sections[1].activities[0].directory, "activities/quiz_2");
        assert_eq!(reader.section_sequence(2).unwrap(), vec![2]);
    }

    #[test]
    fn test_entries_are_sorted_and_normalized() {
        let builder = sample_builder();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("sample.mbz");
        BackupWriter::new(&builder).write(&out).unwrap();

        let reader = BackupReader::open(&out).unwrap();
        let mut sorted = reader.list_files().to_vec();
        sorted.sort();
        assert_eq!(reader.list_files(), sorted.as_slice());
        assert!(reader.contains("course/course.xml"));
        assert!(reader.contains("course\\course.xml"));
        assert!(reader.list_files().iter().all(|p| !p.contains('\\')));
    }

    #[test]
    fn test_missing_document() {
        let builder = sample_builder();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("sample.mbz");
        BackupWriter::new(&builder).write(&out).unwrap();

        let reader = BackupReader::open(&out).unwrap();
        let err = reader.read_file("nope.xml").unwrap_err();
        assert!(matches!(err, MbzError::DocumentNotFound(_)));
    }

    #[test]
    fn test_garbage_is_invalid_archive() {
        let err = BackupReader::from_reader(&b"definitely not gzip"[..]).err().unwrap();
        assert!(matches!(err, MbzError::InvalidArchive(_)));
    }
}
