//! Structural verification of a generated backup
//!
//! Reopens an archive the way an importer would and reports every broken
//! reference it finds instead of stopping at the first one.

use crate::archive::layout::{self, COURSE_DIR, FILES_FILE, QUESTIONS_FILE};
use crate::archive::reader::{number, BackupReader, CourseOutline};
use crate::document::XmlElement;
use crate::error::Result;
use serde::Serialize;
use std::collections::HashSet;
use std::io::Cursor;
use std::path::Path;

/// Manifest file every H5P package must expose
const H5P_MANIFEST: &str = "h5p.json";

/// Outcome of [`verify`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerificationReport {
    pub entries: usize,
    pub problems: Vec<String>,
}

impl VerificationReport {
    pub fn is_ok(&self) -> bool {
        self.problems.is_empty()
    }

    fn problem(&mut self, message: impl Into<String>) {
        self.problems.push(message.into());
    }
}

/// Verify the archive at `path`.
///
/// An archive that cannot be decompressed or un-tarred yields a report with
/// a single problem; only failures to open the file itself are errors.
pub fn verify<P: AsRef<Path>>(path: P) -> Result<VerificationReport> {
    let file = std::fs::File::open(path)?;
    match BackupReader::from_reader(std::io::BufReader::new(file)) {
        Ok(reader) => Ok(verify_reader(&reader)),
        Err(e) => Ok(VerificationReport {
            entries: 0,
            problems: vec![format!("archive cannot be unpacked: {}", e)],
        }),
    }
}

/// Run every check against an already opened archive
pub fn verify_reader(reader: &BackupReader) -> VerificationReport {
    let mut report = VerificationReport {
        entries: reader.entry_count(),
        problems: Vec::new(),
    };

    for doc in layout::ROOT_DOCUMENTS {
        require(reader, &mut report, doc);
    }
    for doc in layout::COURSE_DOCUMENTS {
        require(reader, &mut report, &layout::join(COURSE_DIR, doc));
    }

    let outline = match reader.outline() {
        Ok(outline) => outline,
        Err(e) => {
            report.problem(format!("manifest unreadable: {}", e));
            return report;
        }
    };

    check_directories(reader, &outline, &mut report);
    check_blobs(reader, &outline, &mut report);
    check_question_references(reader, &outline, &mut report);

    report
}

fn require(reader: &BackupReader, report: &mut VerificationReport, path: &str) {
    if !reader.contains(path) {
        report.problem(format!("missing document {}", path));
    }
}

fn parse(reader: &BackupReader, report: &mut VerificationReport, path: &str) -> Option<XmlElement> {
    match reader.document(path) {
        Ok(doc) => Some(doc),
        Err(e) => {
            report.problem(format!("{}: {}", path, e));
            None
        }
    }
}

/// Every declared section and activity directory holds its documents, and
/// each section's own sequence agrees with the manifest
fn check_directories(reader: &BackupReader, outline: &CourseOutline, report: &mut VerificationReport) {
    for section in &outline.sections {
        for doc in layout::SECTION_DOCUMENTS {
            require(reader, report, &layout::join(&section.directory, doc));
        }

        let declared: Vec<u64> = section.activities.iter().map(|a| a.id).collect();
        match reader.section_sequence(section.id) {
            Ok(sequence) if sequence == declared => {}
            Ok(sequence) => report.problem(format!(
                "{} sequence {:?} disagrees with manifest {:?}",
                section.directory, sequence, declared
            )),
            Err(e) => report.problem(format!("{}: {}", section.directory, e)),
        }

        for activity in &section.activities {
            for doc in layout::activity_documents(&activity.modname) {
                require(reader, report, &layout::join(&activity.directory, &doc));
            }
        }
    }
}

/// Every file entry points at a stored blob; H5P packages must be zips
/// exposing their own manifest
fn check_blobs(reader: &BackupReader, outline: &CourseOutline, report: &mut VerificationReport) {
    for file in &outline.files {
        require(reader, report, &file.path);
    }

    let Some(files) = parse(reader, report, FILES_FILE) else {
        return;
    };
    for file in files.find_all("file") {
        let hash = file.child_text("contenthash").unwrap_or_default();
        let blob_path = layout::blob_path(&hash);
        let Ok(data) = reader.read_file(&blob_path) else {
            report.problem(format!(
                "file {} references missing blob {}",
                file.attribute("id").unwrap_or("?"),
                blob_path
            ));
            continue;
        };

        if file.child_text("component").as_deref() == Some("mod_h5pactivity") {
            if let Err(e) = check_h5p_package(data) {
                report.problem(format!("H5P package {}: {}", blob_path, e));
            }
        }
    }
}

fn check_h5p_package(data: &[u8]) -> std::result::Result<(), String> {
    let mut zip = zip::ZipArchive::new(Cursor::new(data)).map_err(|e| e.to_string())?;
    zip.by_name(H5P_MANIFEST)
        .map(|_| ())
        .map_err(|_| format!("no {} inside package", H5P_MANIFEST))
}

/// Every quiz slot resolves to a bank entry in `questions.xml`
fn check_question_references(
    reader: &BackupReader,
    outline: &CourseOutline,
    report: &mut VerificationReport,
) {
    let quizzes: Vec<_> = outline
        .sections
        .iter()
        .flat_map(|s| s.activities.iter())
        .filter(|a| a.modname == "quiz")
        .collect();
    if quizzes.is_empty() {
        return;
    }

    let Some(questions) = parse(reader, report, QUESTIONS_FILE) else {
        return;
    };
    let known: HashSet<String> = questions
        .descendants("question_bank_entry")
        .into_iter()
        .filter_map(|e| e.attribute("id").map(str::to_string))
        .collect();

    for quiz in quizzes {
        let path = layout::join(&quiz.directory, "quiz.xml");
        let Some(doc) = parse(reader, report, &path) else {
            continue;
        };
        for reference in doc.descendants("question_reference") {
            match number(reference, "questionbankentryid") {
                Ok(id) if known.contains(&id.to_string()) => {}
                Ok(id) => report.problem(format!(
                    "{} references unknown bank entry {}",
                    path, id
                )),
                Err(e) => report.problem(format!("{}: {}", path, e)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::BackupWriter;
    use crate::builder::PayloadSource;
    use crate::document::tests::sample_builder;
    use std::io::Write;

    fn h5p_package(with_manifest: bool) -> Vec<u8> {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default();
        if with_manifest {
            zip.start_file("h5p.json", options).unwrap();
            zip.write_all(br#"{"title":"Demo","mainLibrary":"H5P.Blanks"}"#)
                .unwrap();
        }
        zip.start_file("content/content.json", options).unwrap();
        zip.write_all(b"{}").unwrap();
        zip.finish().unwrap().into_inner()
    }

    fn write_sample(package: Vec<u8>) -> (tempfile::TempDir, std::path::PathBuf) {
        let mut builder = sample_builder();
        let s1 = builder.sections()[0].id;
        builder
            .add_h5p(
                s1,
                "Interactive",
                "",
                PayloadSource::Bytes {
                    filename: "demo.h5p".into(),
                    data: package,
                },
                true,
            )
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("sample.mbz");
        BackupWriter::new(&builder).write(&out).unwrap();
        (dir, out)
    }

    #[test]
    fn test_generated_archive_verifies() {
        let (_dir, out) = write_sample(h5p_package(true));
        let report = verify(&out).unwrap();
        assert!(report.is_ok(), "{:?}", report.problems);
        assert!(report.entries > 0);
    }

    #[test]
    fn test_h5p_without_manifest_is_reported() {
        let (_dir, out) = write_sample(h5p_package(false));
        let report = verify(&out).unwrap();
        assert_eq!(report.problems.len(), 1);
        assert!(report.problems[0].contains("h5p.json"));
    }

    #[test]
    fn test_unreadable_archive_is_a_problem_not_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"not a backup").unwrap();

        let report = verify(file.path()).unwrap();
        assert!(!report.is_ok());
        assert!(report.problems[0].starts_with("archive cannot be unpacked"));
    }
}
