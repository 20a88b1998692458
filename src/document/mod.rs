//! Document serializer
//!
//! Each entity renders to its own [`Document`]: a typed XML tree plus the
//! relative path it occupies in the backup tree. Renderers only read the
//! builder's state, so documents can be produced in any order.

mod activity;
mod course;
mod files;
mod manifest;
mod question_bank;
mod section;
pub mod xml;

pub use activity::{render_activity, render_activity_documents};
pub use course::{render_course_documents, render_root_placeholders};
pub use files::render_files;
pub use manifest::{render_manifest, render_settings};
pub use question_bank::render_question_bank;
pub use section::render_section_documents;
pub use xml::{XmlElement, XmlNode, NULL_MARKER};

use crate::builder::CourseBuilder;
use crate::error::Result;

/// One rendered document and its place in the backup tree
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// `/`-separated path relative to the backup root
    pub path: String,
    pub root: XmlElement,
}

impl Document {
    pub fn new(path: impl Into<String>, root: XmlElement) -> Self {
        Self {
            path: path.into(),
            root,
        }
    }

    /// Serialized bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.root.to_bytes()
    }
}

/// Render every document of the backup: root documents first, then the
/// course, each section and each activity
pub fn render_all(builder: &CourseBuilder) -> Vec<Document> {
    let mut docs = vec![
        render_manifest(builder),
        render_files(builder),
        render_question_bank(builder),
    ];
    docs.extend(render_root_placeholders());
    docs.extend(render_course_documents(builder));

    for section in builder.sections() {
        docs.extend(render_section_documents(builder, section));
    }
    for activity in builder.activities() {
        docs.extend(render_activity_documents(builder, activity));
    }

    docs
}

/// Timestamp shorthand shared by renderers
pub(crate) fn now(builder: &CourseBuilder) -> i64 {
    builder.timestamp()
}

/// `<inforef/>`-style document with no children
pub(crate) fn empty(path: impl Into<String>, root: &str) -> Document {
    Document::new(path, XmlElement::new(root))
}
