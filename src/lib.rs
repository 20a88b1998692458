//! mbz-rs: course backup generator
//!
//! Builds importable course backups (`.mbz`) from sections, file resources,
//! pages, quizzes and H5P packages:
//! - Dense id allocation per entity class
//! - Content-addressed (SHA-1) file store with blob deduplication
//! - Quiz questions lowered into cloze bank entries
//! - Typed XML documents packed into a deterministic tar.gz
//!
//! # Example
//!
//! ```no_run
//! use mbz_rs::{BackupReader, CourseBuilder, CourseInfo};
//!
//! // Build a backup
//! let mut builder = CourseBuilder::new(CourseInfo::new("Intro to Rust", "RUST101"));
//! let week1 = builder.add_section("Week 1", "", true)?;
//! builder.add_page(week1, "Welcome", "<p>Hello!</p>", true)?;
//! builder.generate_archive("rust101.mbz")?;
//!
//! // Read it back
//! let reader = BackupReader::open("rust101.mbz")?;
//! let outline = reader.outline()?;
//! assert_eq!(outline.sections.len(), 1);
//! # Ok::<(), mbz_rs::MbzError>(())
//! ```

// Core modules
pub mod archive;
pub mod builder;
pub mod config;
pub mod document;
pub mod error;
pub mod filestore;
pub mod ids;
pub mod model;
pub mod question;

// Re-export commonly used types
pub use archive::{
    verify, BackupReader, BackupWriter, CourseOutline, PackageSummary, VerificationReport,
};
pub use builder::{CourseBuilder, PayloadSource};
pub use config::{BuildConfig, CourseDescription};
pub use error::{MbzError, Result};
pub use filestore::{content_hash, FileStore, StoredFile};
pub use ids::{IdAllocator, IdClass};
pub use model::{Activity, ActivityKind, CourseInfo, Section};
pub use question::{encode_cloze, Question, QuestionKind, QuestionType};
