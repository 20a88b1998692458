//! Failed writes leave neither a partial archive nor a scratch tree behind
//!
//! Runs as its own test binary because it redirects the process-wide
//! temporary directory.

use mbz_rs::{BuildConfig, CourseBuilder, CourseInfo};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn builder() -> CourseBuilder {
    let mut builder = CourseBuilder::with_config(
        CourseInfo::new("Recovery", "REC"),
        BuildConfig {
            timestamp: Some(1_700_000_000),
            ..BuildConfig::default()
        },
    );
    let s1 = builder.add_section("Week", "", true).unwrap();
    builder.add_page(s1, "Page", "<p>body</p>", true).unwrap();
    builder
}

fn entries(dir: &Path) -> usize {
    fs::read_dir(dir).unwrap().count()
}

#[test]
fn test_scratch_removed_on_success_and_failure() {
    let root = TempDir::new().unwrap();
    let scratch_root = root.path().join("scratch");
    let out_dir = root.path().join("out");
    fs::create_dir(&scratch_root).unwrap();
    fs::create_dir(&out_dir).unwrap();
    std::env::set_var("TMPDIR", &scratch_root);

    let builder = builder();

    // success: archive written, scratch gone
    let output = out_dir.join("ok.mbz");
    builder.generate_archive(&output).unwrap();
    assert!(output.exists());
    assert_eq!(entries(&scratch_root), 0);
    assert_eq!(entries(&out_dir), 1);

    // failure after staging: destination directory does not exist
    let missing = root.path().join("missing").join("fail.mbz");
    assert!(builder.generate_archive(&missing).is_err());
    assert!(!missing.exists());
    assert_eq!(entries(&scratch_root), 0);

    // the earlier archive is untouched
    assert_eq!(entries(&out_dir), 1);

    println!("✓ Scratch tree cleaned up on every path");
}
