//! Backup packaging and reading
//!
//! [`BackupWriter`] turns a builder into a gzip-compressed tar archive;
//! [`BackupReader`] and [`verify`] reopen one for inspection.

pub mod layout;
mod reader;
mod verify;
mod writer;

pub use reader::{BackupReader, CourseOutline, OutlineActivity, OutlineFile, OutlineSection};
pub use verify::{verify, verify_reader, VerificationReport};
pub use writer::{BackupWriter, PackageSummary};
