//! Verification against damaged archives

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use mbz_rs::{verify, BuildConfig, CourseBuilder, CourseInfo, Question};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn build_sample(dir: &Path) -> PathBuf {
    let pdf = dir.join("handout.pdf");
    std::fs::write(&pdf, b"handout bytes").unwrap();

    let mut builder = CourseBuilder::with_config(
        CourseInfo::new("Damaged", "DMG"),
        BuildConfig {
            timestamp: Some(1_700_000_000),
            ..BuildConfig::default()
        },
    );
    let s1 = builder.add_section("Week", "", true).unwrap();
    builder.add_file_resource(s1, "Handout", &pdf, "", true).unwrap();
    builder
        .add_quiz(
            s1,
            "Quiz",
            "",
            vec![Question::shortanswer("Say hi", vec!["hi".into()])],
            true,
        )
        .unwrap();

    let output = dir.join("sample.mbz");
    builder.generate_archive(&output).unwrap();
    output
}

/// Rewrite an archive, letting `edit` drop or replace entries
fn rewrite<F>(source: &Path, target: &Path, mut edit: F)
where
    F: FnMut(&str, Vec<u8>) -> Option<Vec<u8>>,
{
    let bytes = std::fs::read(source).unwrap();
    let mut archive = tar::Archive::new(GzDecoder::new(bytes.as_slice()));

    let file = std::fs::File::create(target).unwrap();
    let mut out = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    for entry in archive.entries().unwrap() {
        let mut entry = entry.unwrap();
        let path = entry.path().unwrap().to_string_lossy().into_owned();
        let mut data = Vec::new();
        entry.read_to_end(&mut data).unwrap();

        if let Some(data) = edit(&path, data) {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            out.append_data(&mut header, &path, data.as_slice()).unwrap();
        }
    }
    out.into_inner().unwrap().finish().unwrap();
}

#[test]
fn test_missing_blob_is_reported() {
    let dir = TempDir::new().unwrap();
    let source = build_sample(dir.path());
    let damaged = dir.path().join("no-blob.mbz");
    rewrite(&source, &damaged, |path, data| {
        (!path.starts_with("files/")).then_some(data)
    });

    let report = verify(&damaged).unwrap();
    assert!(!report.is_ok());
    assert!(report
        .problems
        .iter()
        .any(|p| p.contains("references missing blob")));

    println!("✓ Missing blob detected: {:?}", report.problems);
}

#[test]
fn test_dangling_question_reference_is_reported() {
    let dir = TempDir::new().unwrap();
    let source = build_sample(dir.path());
    let damaged = dir.path().join("dangling.mbz");
    rewrite(&source, &damaged, |path, data| {
        if path == "questions.xml" {
            Some(
                b"<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<question_categories></question_categories>\n"
                    .to_vec(),
            )
        } else {
            Some(data)
        }
    });

    let report = verify(&damaged).unwrap();
    assert!(report
        .problems
        .iter()
        .any(|p| p.contains("unknown bank entry 2001")));

    println!("✓ Dangling quiz reference detected");
}

#[test]
fn test_missing_activity_document_is_reported() {
    let dir = TempDir::new().unwrap();
    let source = build_sample(dir.path());
    let damaged = dir.path().join("no-module.mbz");
    rewrite(&source, &damaged, |path, data| {
        (path != "activities/resource_1/module.xml").then_some(data)
    });

    let report = verify(&damaged).unwrap();
    assert_eq!(
        report.problems,
        vec!["missing document activities/resource_1/module.xml".to_string()]
    );

    println!("✓ Missing activity document detected");
}

#[test]
fn test_truncated_archive_is_reported() {
    let dir = TempDir::new().unwrap();
    let source = build_sample(dir.path());
    let bytes = std::fs::read(&source).unwrap();
    let truncated = dir.path().join("truncated.mbz");
    std::fs::write(&truncated, &bytes[..bytes.len() / 2]).unwrap();

    let report = verify(&truncated).unwrap();
    assert!(!report.is_ok());

    println!("✓ Truncated archive rejected: {}", report.problems[0]);
}

#[test]
fn test_oversized_entry_header_is_reported() {
    let dir = TempDir::new().unwrap();
    let crafted = dir.path().join("oversized.mbz");

    let mut header = tar::Header::new_gnu();
    header.set_path("moodle_backup.xml").unwrap();
    header.set_entry_type(tar::EntryType::Regular);
    header.set_mode(0o644);
    header.set_size(u64::MAX / 2);
    header.set_cksum();

    let mut gz = GzEncoder::new(Vec::new(), Compression::default());
    gz.write_all(header.as_bytes()).unwrap();
    gz.write_all(&[b'x'; 512]).unwrap();
    std::fs::write(&crafted, gz.finish().unwrap()).unwrap();

    let report = verify(&crafted).unwrap();
    assert!(!report.is_ok());

    println!("✓ Oversized entry header reported: {:?}", report.problems);
}
