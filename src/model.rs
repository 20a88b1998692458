//! In-memory course model accumulated by the builder

use crate::question::BankEntry;
use serde::{Deserialize, Serialize};

/// Context id of the site
pub const SYSTEM_CONTEXT_ID: u64 = 1;

/// Context id of the course being exported
pub const COURSE_CONTEXT_ID: u64 = 2;

/// Id of the course being exported
pub const COURSE_ID: u64 = 2;

/// Activity context ids are `activity_id + MODULE_CONTEXT_OFFSET`
pub const MODULE_CONTEXT_OFFSET: u64 = 100;

/// Context id owning the files of activity `activity_id`
pub fn module_context_id(activity_id: u64) -> u64 {
    activity_id + MODULE_CONTEXT_OFFSET
}

/// Top-level course metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseInfo {
    pub fullname: String,
    pub shortname: String,
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default)]
    pub summary: String,
}

fn default_format() -> String {
    "topics".to_string()
}

fn default_visible() -> bool {
    true
}

impl CourseInfo {
    pub fn new(fullname: impl Into<String>, shortname: impl Into<String>) -> Self {
        Self {
            fullname: fullname.into(),
            shortname: shortname.into(),
            format: default_format(),
            visible: true,
            summary: String::new(),
        }
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }
}

/// Sequential container of activities
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub id: u64,
    /// Zero-based display position
    pub number: u64,
    pub name: String,
    pub summary: String,
    pub visible: bool,
    /// Activity ids in the order they were added
    pub sequence: Vec<u64>,
}

/// Activity variants and their payload
#[derive(Debug, Clone, PartialEq)]
pub enum ActivityKind {
    Resource { file_id: u64 },
    Page { content: String },
    Quiz { questions: Vec<QuizSlot> },
    H5p { file_id: u64 },
}

/// One question placed in a quiz
#[derive(Debug, Clone, PartialEq)]
pub struct QuizSlot {
    /// 1-based slot number
    pub slot: u64,
    pub cloze: String,
    pub parent: BankEntry,
    pub child: BankEntry,
}

/// A course module
#[derive(Debug, Clone, PartialEq)]
pub struct Activity {
    pub id: u64,
    pub section_id: u64,
    pub name: String,
    pub intro: String,
    pub visible: bool,
    pub kind: ActivityKind,
}

impl Activity {
    /// Module plugin name, also the activity directory prefix
    pub fn modname(&self) -> &'static str {
        match self.kind {
            ActivityKind::Resource { .. } => "resource",
            ActivityKind::Page { .. } => "page",
            ActivityKind::Quiz { .. } => "quiz",
            ActivityKind::H5p { .. } => "h5pactivity",
        }
    }

    pub fn context_id(&self) -> u64 {
        module_context_id(self.id)
    }

    /// File metadata ids owned by this activity
    pub fn file_ids(&self) -> Vec<u64> {
        match self.kind {
            ActivityKind::Resource { file_id } | ActivityKind::H5p { file_id } => vec![file_id],
            ActivityKind::Page { .. } | ActivityKind::Quiz { .. } => Vec::new(),
        }
    }

    /// Question category holding this activity's bank entries, if any
    pub fn question_category_id(&self) -> Option<u64> {
        match self.kind {
            ActivityKind::Quiz { .. } => Some(self.id),
            _ => None,
        }
    }

    pub fn quiz_slots(&self) -> &[QuizSlot] {
        match &self.kind {
            ActivityKind::Quiz { questions } => questions,
            _ => &[],
        }
    }
}
