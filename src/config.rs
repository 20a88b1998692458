//! Build configuration and the declarative course description
//!
//! A course description is a TOML document:
//!
//! ```toml
//! [course]
//! fullname = "Intro to Rust"
//! shortname = "RUST101"
//!
//! [build]
//! timestamp = 1700000000
//!
//! [[sections]]
//! name = "Week 1"
//!
//! [[sections.activities]]
//! type = "file"
//! name = "Syllabus"
//! path = "syllabus.pdf"
//!
//! [[sections.activities]]
//! type = "quiz"
//! name = "Check-in"
//!
//! [[sections.activities.questions]]
//! type = "multichoice"
//! prompt = "Which keyword declares a binding?"
//! options = ["let", "fn"]
//! correct = [0]
//! ```

use crate::builder::{CourseBuilder, PayloadSource};
use crate::error::Result;
use crate::model::CourseInfo;
use crate::question::Question;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Moodle 4.1 LTS, the release the generated documents follow
pub const DEFAULT_MOODLE_VERSION: u64 = 2022112800;
pub const DEFAULT_MOODLE_RELEASE: &str = "4.1 (Build: 20221128)";

/// Knobs that affect generated output but not course content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Fixed build time (Unix seconds); the current time when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,

    /// gzip level, 0-9
    pub compression_level: u32,

    /// Site URL recorded as the backup origin
    pub wwwroot: String,

    /// Opaque identifier of the originating site
    pub site_identifier: String,

    pub moodle_version: u64,

    pub moodle_release: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            timestamp: None,
            compression_level: 6,
            wwwroot: "http://localhost".to_string(),
            site_identifier: "mbz-rs".to_string(),
            moodle_version: DEFAULT_MOODLE_VERSION,
            moodle_release: DEFAULT_MOODLE_RELEASE.to_string(),
        }
    }
}

impl BuildConfig {
    /// The configured timestamp, or the current wall-clock second
    pub fn resolve_timestamp(&self) -> i64 {
        self.timestamp.unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs() as i64)
                .unwrap_or(0)
        })
    }

    /// Short release string, e.g. "4.1"
    pub fn backup_release(&self) -> &str {
        self.moodle_release
            .split_whitespace()
            .next()
            .unwrap_or(&self.moodle_release)
    }

    pub fn compression(&self) -> flate2::Compression {
        flate2::Compression::new(self.compression_level.min(9))
    }
}

fn default_true() -> bool {
    true
}

/// One section of a course description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionSpec {
    pub name: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub activities: Vec<ActivitySpec>,
}

/// One activity of a course description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ActivitySpec {
    File {
        name: String,
        path: PathBuf,
        #[serde(default)]
        description: String,
        #[serde(default = "default_true")]
        visible: bool,
    },
    Page {
        name: String,
        content: String,
        #[serde(default = "default_true")]
        visible: bool,
    },
    Quiz {
        name: String,
        #[serde(default)]
        intro: String,
        #[serde(default)]
        questions: Vec<Question>,
        #[serde(default = "default_true")]
        visible: bool,
    },
    H5p {
        name: String,
        #[serde(default)]
        intro: String,
        package: PathBuf,
        #[serde(default = "default_true")]
        visible: bool,
    },
}

/// Declarative description of a whole course
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseDescription {
    pub course: CourseInfo,
    #[serde(default)]
    pub build: BuildConfig,
    #[serde(default)]
    pub sections: Vec<SectionSpec>,
}

impl CourseDescription {
    /// Parse from TOML
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load from a file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Replay the description through a fresh builder.
    ///
    /// Relative file and package paths resolve against `base_dir`.
    pub fn into_builder(self, base_dir: &Path) -> Result<CourseBuilder> {
        let mut builder = CourseBuilder::with_config(self.course, self.build);

        for section in self.sections {
            let section_id = builder.add_section(&section.name, &section.summary, section.visible)?;

            for activity in section.activities {
                match activity {
                    ActivitySpec::File {
                        name,
                        path,
                        description,
                        visible,
                    } => {
                        builder.add_file_resource(
                            section_id,
                            &name,
                            base_dir.join(path),
                            &description,
                            visible,
                        )?;
                    }
                    ActivitySpec::Page {
                        name,
                        content,
                        visible,
                    } => {
                        builder.add_page(section_id, &name, &content, visible)?;
                    }
                    ActivitySpec::Quiz {
                        name,
                        intro,
                        questions,
                        visible,
                    } => {
                        builder.add_quiz(section_id, &name, &intro, questions, visible)?;
                    }
                    ActivitySpec::H5p {
                        name,
                        intro,
                        package,
                        visible,
                    } => {
                        builder.add_h5p(
                            section_id,
                            &name,
                            &intro,
                            PayloadSource::File(base_dir.join(package)),
                            visible,
                        )?;
                    }
                }
            }
        }

        Ok(builder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MbzError;

    const DESCRIPTION: &str = r#"
        [course]
        fullname = "Intro to Rust"
        shortname = "RUST101"

        [build]
        timestamp = 1700000000
        compression_level = 9

        [[sections]]
        name = "Week 1"
        summary = "<p>Start here</p>"

        [[sections.activities]]
        type = "page"
        name = "Welcome"
        content = "<p>Hello</p>"

        [[sections.activities]]
        type = "quiz"
        name = "Check-in"

        [[sections.activities.questions]]
        type = "numerical"
        prompt = "6 x 7?"
        answer = 42

        [[sections.activities.questions]]
        type = "shortanswer"
        prompt = "Spell colour"
        answers = ["colour", "color"]

        [[sections]]
        name = "Week 2"
        visible = false
    "#;

    #[test]
    fn test_defaults() {
        let config = BuildConfig::default();
        assert_eq!(config.compression_level, 6);
        assert_eq!(config.backup_release(), "4.1");
        assert!(config.timestamp.is_none());
    }

    #[test]
    fn test_fixed_timestamp() {
        let config = BuildConfig {
            timestamp: Some(42),
            ..BuildConfig::default()
        };
        assert_eq!(config.resolve_timestamp(), 42);
    }

    #[test]
    fn test_parse_description() {
        let desc = CourseDescription::from_toml_str(DESCRIPTION).unwrap();
        assert_eq!(desc.course.shortname, "RUST101");
        assert_eq!(desc.build.timestamp, Some(1_700_000_000));
        assert_eq!(desc.build.compression_level, 9);
        assert_eq!(desc.build.wwwroot, "http://localhost");
        assert_eq!(desc.sections.len(), 2);
        assert!(!desc.sections[1].visible);
        assert_eq!(desc.sections[0].activities.len(), 2);
        match &desc.sections[0].activities[1] {
            ActivitySpec::Quiz { questions, .. } => assert_eq!(questions.len(), 2),
            other => panic!("expected quiz, got {:?}", other),
        }
    }

    #[test]
    fn test_into_builder_replays_in_order() {
        let desc = CourseDescription::from_toml_str(DESCRIPTION).unwrap();
        let builder = desc.into_builder(Path::new(".")).unwrap();

        assert_eq!(builder.timestamp(), 1_700_000_000);
        assert_eq!(builder.sections().len(), 2);
        assert_eq!(builder.sections()[0].sequence, vec![1, 2]);
        assert!(builder.sections()[1].sequence.is_empty());
        assert_eq!(builder.activity(2).unwrap().quiz_slots().len(), 2);
    }

    #[test]
    fn test_missing_file_surfaces_reference_error() {
        let desc = CourseDescription::from_toml_str(
            r#"
            [course]
            fullname = "C"
            shortname = "C"

            [[sections]]
            name = "S"

            [[sections.activities]]
            type = "file"
            name = "Gone"
            path = "nope.pdf"
            "#,
        )
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let err = desc.into_builder(dir.path()).unwrap_err();
        assert!(err.is_reference());
    }

    #[test]
    fn test_bad_toml() {
        let err = CourseDescription::from_toml_str("[course]\nfullname = 3").unwrap_err();
        assert!(matches!(err, MbzError::Toml(_)));
    }
}
