//! Reproducibility tests: identical inputs with a fixed timestamp yield
//! identical archives

use mbz_rs::{BackupReader, BuildConfig, CourseBuilder, CourseInfo, CourseDescription, Question};
use std::path::Path;
use tempfile::TempDir;

fn build(dir: &Path, name: &str, pdf: &Path) -> Vec<u8> {
    let mut builder = CourseBuilder::with_config(
        CourseInfo::new("Same Course", "SAME"),
        BuildConfig {
            timestamp: Some(1_650_000_000),
            ..BuildConfig::default()
        },
    );
    let s1 = builder.add_section("Week 1", "", true).unwrap();
    builder.add_file_resource(s1, "Notes", pdf, "", true).unwrap();
    builder
        .add_quiz(
            s1,
            "Quiz",
            "<p>Try it</p>",
            vec![
                Question::multichoice(
                    "Pick one {tricky} #option",
                    vec!["a~b".into(), "c/d".into(), "e".into()],
                    vec![0, 2],
                ),
                Question::numerical("Half of five?", 2.5, 0.1),
            ],
            true,
        )
        .unwrap();

    let output = dir.join(name);
    builder.generate_archive(&output).unwrap();
    std::fs::read(output).unwrap()
}

#[test]
fn test_same_inputs_same_bytes() {
    let dir = TempDir::new().unwrap();
    let pdf = dir.path().join("notes.pdf");
    std::fs::write(&pdf, b"%PDF-1.4 tiny").unwrap();

    let first = build(dir.path(), "first.mbz", &pdf);
    let second = build(dir.path(), "second.mbz", &pdf);
    assert_eq!(first, second);

    println!("✓ Two builds produced {} identical bytes", first.len());
}

#[test]
fn test_entries_carry_build_timestamp() {
    let dir = TempDir::new().unwrap();
    let pdf = dir.path().join("notes.pdf");
    std::fs::write(&pdf, b"%PDF-1.4 tiny").unwrap();
    let bytes = build(dir.path(), "stamped.mbz", &pdf);

    let decoder = flate2::read::GzDecoder::new(bytes.as_slice());
    let mut archive = tar::Archive::new(decoder);
    let mut paths = Vec::new();
    for entry in archive.entries().unwrap() {
        let entry = entry.unwrap();
        assert_eq!(entry.header().mtime().unwrap(), 1_650_000_000);
        assert_eq!(entry.header().mode().unwrap(), 0o644);
        paths.push(entry.path().unwrap().to_string_lossy().into_owned());
    }

    let mut sorted = paths.clone();
    sorted.sort();
    assert_eq!(paths, sorted);
    assert!(paths.iter().all(|p| !p.contains('\\')));

    println!("✓ {} tar entries sorted and stamped", paths.len());
}

#[test]
fn test_description_builds_match_api_builds() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("notes.pdf"), b"%PDF-1.4 tiny").unwrap();

    let description = CourseDescription::from_toml_str(
        r#"
        [course]
        fullname = "Same Course"
        shortname = "SAME"

        [build]
        timestamp = 1650000000

        [[sections]]
        name = "Week 1"

        [[sections.activities]]
        type = "file"
        name = "Notes"
        path = "notes.pdf"

        [[sections.activities]]
        type = "quiz"
        name = "Quiz"
        intro = "<p>Try it</p>"

        [[sections.activities.questions]]
        type = "multichoice"
        prompt = "Pick one {tricky} #option"
        options = ["a~b", "c/d", "e"]
        correct = [0, 2]

        [[sections.activities.questions]]
        type = "numerical"
        prompt = "Half of five?"
        answer = 2.5
        tolerance = 0.1
        "#,
    )
    .unwrap();

    let output = dir.path().join("described.mbz");
    description
        .into_builder(dir.path())
        .unwrap()
        .generate_archive(&output)
        .unwrap();

    let api = build(dir.path(), "api.mbz", &dir.path().join("notes.pdf"));
    assert_eq!(std::fs::read(&output).unwrap(), api);

    let outline = BackupReader::open(&output).unwrap().outline().unwrap();
    assert_eq!(outline.activity_count(), 2);

    println!("✓ TOML description reproduces the API build");
}
