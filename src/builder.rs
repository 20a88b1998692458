//! Entity builder: the public API for assembling a course backup
//!
//! ```no_run
//! use mbz_rs::{CourseBuilder, CourseInfo, Question};
//!
//! let mut builder = CourseBuilder::new(CourseInfo::new("Intro to Rust", "RUST101"));
//! let week1 = builder.add_section("Week 1", "", true)?;
//! builder.add_file_resource(week1, "Syllabus", "syllabus.pdf", "", true)?;
//! builder.add_quiz(
//!     week1,
//!     "Check-in",
//!     "",
//!     vec![Question::multichoice(
//!         "Which keyword declares an immutable binding?",
//!         vec!["let".into(), "mut".into()],
//!         vec![0],
//!     )],
//!     true,
//! )?;
//! builder.generate_archive("rust101.mbz")?;
//! # Ok::<(), mbz_rs::MbzError>(())
//! ```

use crate::archive::BackupWriter;
use crate::config::BuildConfig;
use crate::error::{MbzError, Result};
use crate::filestore::{FileOwner, FileStore};
use crate::ids::{IdAllocator, IdClass};
use crate::model::{module_context_id, Activity, ActivityKind, CourseInfo, QuizSlot, Section};
use crate::question::{self, LocalSequence, Question};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Pre-built interactive activity package handed over by an external generator
#[derive(Debug, Clone)]
pub enum PayloadSource {
    /// Read the package from disk
    File(PathBuf),
    /// Package bytes already in memory
    Bytes { filename: String, data: Vec<u8> },
}

impl PayloadSource {
    fn load(self) -> Result<(String, Vec<u8>)> {
        match self {
            PayloadSource::File(path) => {
                let data = read_referenced(&path)?;
                Ok((file_name_of(&path), data))
            }
            PayloadSource::Bytes { filename, data } => Ok((filename, data)),
        }
    }
}

impl From<PathBuf> for PayloadSource {
    fn from(path: PathBuf) -> Self {
        PayloadSource::File(path)
    }
}

impl From<&Path> for PayloadSource {
    fn from(path: &Path) -> Self {
        PayloadSource::File(path.to_path_buf())
    }
}

impl From<&str> for PayloadSource {
    fn from(path: &str) -> Self {
        PayloadSource::File(PathBuf::from(path))
    }
}

fn read_referenced(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|source| MbzError::UnreadableFile {
        path: path.to_path_buf(),
        source,
    })
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string())
}

fn require_name(what: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(MbzError::validation(format!("{} name is empty", what)));
    }
    Ok(())
}

/// Accumulates sections, activities, files and questions for one build
#[derive(Debug)]
pub struct CourseBuilder {
    course: CourseInfo,
    config: BuildConfig,
    timestamp: i64,
    ids: IdAllocator,
    files: FileStore,
    sections: Vec<Section>,
    activities: Vec<Activity>,
}

impl CourseBuilder {
    /// Create a builder with default configuration
    pub fn new(course: CourseInfo) -> Self {
        Self::with_config(course, BuildConfig::default())
    }

    /// Create a builder; the build timestamp is fixed here for the whole session
    pub fn with_config(course: CourseInfo, config: BuildConfig) -> Self {
        let timestamp = config.resolve_timestamp();
        Self {
            course,
            config,
            timestamp,
            ids: IdAllocator::new(),
            files: FileStore::new(),
            sections: Vec::new(),
            activities: Vec::new(),
        }
    }

    /// Add a section at the end of the course
    pub fn add_section(&mut self, name: &str, summary: &str, visible: bool) -> Result<u64> {
        require_name("section", name)?;

        let id = self.ids.allocate(IdClass::Section);
        self.sections.push(Section {
            id,
            number: self.sections.len() as u64,
            name: name.to_string(),
            summary: summary.to_string(),
            visible,
            sequence: Vec::new(),
        });

        debug!(section_id = id, name, "added section");
        Ok(id)
    }

    /// Add a downloadable file read from `file_path`
    pub fn add_file_resource(
        &mut self,
        section_id: u64,
        name: &str,
        file_path: impl AsRef<Path>,
        description: &str,
        visible: bool,
    ) -> Result<u64> {
        self.section_index(section_id)?;
        require_name("resource", name)?;

        let path = file_path.as_ref();
        let data = read_referenced(path)?;
        let filename = file_name_of(path);

        let id = self.ids.allocate(IdClass::Activity);
        let file_id = self.files.add_file(
            &mut self.ids,
            data,
            &filename,
            FileOwner::new("mod_resource", "content", module_context_id(id)),
        );

        self.push_activity(Activity {
            id,
            section_id,
            name: name.to_string(),
            intro: description.to_string(),
            visible,
            kind: ActivityKind::Resource { file_id },
        })
    }

    /// Add an HTML page
    pub fn add_page(
        &mut self,
        section_id: u64,
        name: &str,
        html_content: &str,
        visible: bool,
    ) -> Result<u64> {
        self.section_index(section_id)?;
        require_name("page", name)?;

        let id = self.ids.allocate(IdClass::Activity);
        self.push_activity(Activity {
            id,
            section_id,
            name: name.to_string(),
            intro: String::new(),
            visible,
            kind: ActivityKind::Page {
                content: html_content.to_string(),
            },
        })
    }

    /// Add a quiz. Every question becomes a parent/child pair of bank entries.
    ///
    /// A quiz without questions is rejected with [`MbzError::Validation`].
    pub fn add_quiz(
        &mut self,
        section_id: u64,
        name: &str,
        intro: &str,
        questions: Vec<Question>,
        visible: bool,
    ) -> Result<u64> {
        self.section_index(section_id)?;
        require_name("quiz", name)?;

        if questions.is_empty() {
            return Err(MbzError::validation(format!(
                "quiz '{}' has no questions",
                name
            )));
        }
        for (i, q) in questions.iter().enumerate() {
            q.validate().map_err(|e| match e {
                MbzError::Validation(msg) => {
                    MbzError::Validation(format!("quiz '{}' question {}: {}", name, i + 1, msg))
                }
                other => other,
            })?;
        }

        let id = self.ids.allocate(IdClass::Activity);
        let mut sequence = LocalSequence::new(id);
        let slots = questions
            .iter()
            .enumerate()
            .map(|(i, q)| {
                let lowered = question::lower(q, i + 1, &mut sequence, &mut self.ids);
                QuizSlot {
                    slot: i as u64 + 1,
                    cloze: lowered.cloze,
                    parent: lowered.parent,
                    child: lowered.child,
                }
            })
            .collect();

        self.push_activity(Activity {
            id,
            section_id,
            name: name.to_string(),
            intro: intro.to_string(),
            visible,
            kind: ActivityKind::Quiz { questions: slots },
        })
    }

    /// Add an interactive activity from a pre-built package
    pub fn add_h5p(
        &mut self,
        section_id: u64,
        name: &str,
        intro: &str,
        payload_source: impl Into<PayloadSource>,
        visible: bool,
    ) -> Result<u64> {
        self.section_index(section_id)?;
        require_name("interactive activity", name)?;

        let (filename, data) = payload_source.into().load()?;

        let id = self.ids.allocate(IdClass::Activity);
        let file_id = self.files.add_file(
            &mut self.ids,
            data,
            &filename,
            FileOwner::new("mod_h5pactivity", "package", module_context_id(id)),
        );

        self.push_activity(Activity {
            id,
            section_id,
            name: name.to_string(),
            intro: intro.to_string(),
            visible,
            kind: ActivityKind::H5p { file_id },
        })
    }

    /// Serialize every entity and package the result at `output_path`
    pub fn generate_archive(&self, output_path: impl AsRef<Path>) -> Result<()> {
        BackupWriter::new(self).write(output_path.as_ref())?;
        Ok(())
    }

    pub fn course(&self) -> &CourseInfo {
        &self.course
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Build wall-clock second, shared by every document
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section(&self, id: u64) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == id)
    }

    /// Activities in creation order
    pub fn activities(&self) -> &[Activity] {
        &self.activities
    }

    pub fn activity(&self, id: u64) -> Option<&Activity> {
        self.activities.iter().find(|a| a.id == id)
    }

    pub fn files(&self) -> &FileStore {
        &self.files
    }

    fn section_index(&self, section_id: u64) -> Result<usize> {
        self.sections
            .iter()
            .position(|s| s.id == section_id)
            .ok_or(MbzError::UnknownSection(section_id))
    }

    fn push_activity(&mut self, activity: Activity) -> Result<u64> {
        let index = self.section_index(activity.section_id)?;
        let id = activity.id;

        debug!(
            activity_id = id,
            section_id = activity.section_id,
            modname = activity.modname(),
            "added activity"
        );

        self.sections[index].sequence.push(id);
        self.activities.push(activity);
        Ok(id)
    }
}
