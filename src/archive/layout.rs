//! Path conventions of the backup tree
//!
//! The importer finds documents and blobs by these exact relative paths, so
//! they are always built with `/` separators and lowercase names.

/// Root manifest document
pub const MANIFEST_FILE: &str = "moodle_backup.xml";

/// Root file metadata document
pub const FILES_FILE: &str = "files.xml";

/// Root question bank document
pub const QUESTIONS_FILE: &str = "questions.xml";

/// Course-level directory
pub const COURSE_DIR: &str = "course";

/// Blob tree root
pub const FILES_DIR: &str = "files";

/// Documents every backup carries at the root
pub const ROOT_DOCUMENTS: &[&str] = &[
    MANIFEST_FILE,
    FILES_FILE,
    QUESTIONS_FILE,
    "groups.xml",
    "outcomes.xml",
    "roles.xml",
    "scales.xml",
    "completion.xml",
    "gradebook.xml",
    "grade_history.xml",
    "badges.xml",
];

/// Documents inside `course/`
pub const COURSE_DOCUMENTS: &[&str] = &[
    "course.xml",
    "inforef.xml",
    "roles.xml",
    "enrolments.xml",
    "filters.xml",
    "comments.xml",
    "calendar.xml",
    "completiondefaults.xml",
    "competencies.xml",
];

/// Documents inside each `sections/section_<id>/`
pub const SECTION_DOCUMENTS: &[&str] = &["section.xml", "inforef.xml"];

/// Placeholder documents inside each activity directory, next to
/// `module.xml`, `<modname>.xml` and `inforef.xml`
pub const ACTIVITY_AUX_DOCUMENTS: &[&str] = &[
    "grades.xml",
    "grade_history.xml",
    "roles.xml",
    "filters.xml",
    "comments.xml",
    "completion.xml",
    "calendar.xml",
    "competencies.xml",
];

/// `sections/section_<id>`
pub fn section_dir(section_id: u64) -> String {
    format!("sections/section_{}", section_id)
}

/// `activities/<modname>_<id>`
pub fn activity_dir(modname: &str, activity_id: u64) -> String {
    format!("activities/{}_{}", modname, activity_id)
}

/// `files/<first two hex digits>/<hash>`
pub fn blob_path(content_hash: &str) -> String {
    let prefix = content_hash.get(..2).unwrap_or(content_hash);
    format!("{}/{}/{}", FILES_DIR, prefix, content_hash)
}

/// Join a directory and a file name with `/`
pub fn join(dir: &str, file: &str) -> String {
    if dir.is_empty() {
        file.to_string()
    } else {
        format!("{}/{}", dir, file)
    }
}

/// Every document an activity directory must hold
pub fn activity_documents(modname: &str) -> Vec<String> {
    let mut docs = vec![
        "module.xml".to_string(),
        format!("{}.xml", modname),
        "inforef.xml".to_string(),
    ];
    docs.extend(ACTIVITY_AUX_DOCUMENTS.iter().map(|d| d.to_string()));
    docs
}
