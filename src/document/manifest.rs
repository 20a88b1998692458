use super::xml::{flag, XmlElement};
use super::{now, Document};
use crate::archive::layout::{self, COURSE_DIR, MANIFEST_FILE};
use crate::builder::CourseBuilder;
use crate::filestore::content_hash;
use crate::model::{Activity, COURSE_CONTEXT_ID, COURSE_ID, SYSTEM_CONTEXT_ID};
use std::fmt::Display;

/// Backup format revision this generator writes
const BACKUP_VERSION: u64 = 2022112800;

/// Root settings exported as disabled: this generator never carries user state
const DISABLED_ROOT_SETTINGS: &[&str] = &[
    "users",
    "anonymize",
    "role_assignments",
    "blocks",
    "filters",
    "comments",
    "badges",
    "calendarevents",
    "userscompletion",
    "logs",
    "grade_histories",
    "groups",
    "competencies",
    "customfield",
    "contentbankcontent",
    "legacyfiles",
];

/// Root settings exported as enabled
const ENABLED_ROOT_SETTINGS: &[&str] = &["activities", "files", "questionbank"];

/// `moodle_backup.xml`: backup information, contents listing and settings
pub fn render_manifest(builder: &CourseBuilder) -> Document {
    let course = builder.course();
    let config = builder.config();
    let ts = now(builder);

    let information = XmlElement::new("information")
        .leaf("name", archive_name(builder))
        .leaf("moodle_version", config.moodle_version)
        .leaf("moodle_release", &config.moodle_release)
        .leaf("backup_version", BACKUP_VERSION)
        .leaf("backup_release", config.backup_release())
        .leaf("backup_date", ts)
        .leaf("mnet_remoteusers", 0)
        .leaf("include_files", 1)
        .leaf("include_file_references_to_external_content", 0)
        .leaf("original_wwwroot", &config.wwwroot)
        .leaf(
            "original_site_identifier_hash",
            content_hash(config.site_identifier.as_bytes()),
        )
        .leaf("original_course_id", COURSE_ID)
        .leaf("original_course_format", &course.format)
        .leaf("original_course_fullname", &course.fullname)
        .leaf("original_course_shortname", &course.shortname)
        .leaf("original_course_startdate", ts)
        .leaf("original_course_enddate", 0)
        .leaf("original_course_contextid", COURSE_CONTEXT_ID)
        .leaf("original_system_contextid", SYSTEM_CONTEXT_ID)
        .child(
            XmlElement::new("details").child(
                XmlElement::new("detail")
                    .attr("backup_id", backup_id(builder))
                    .leaf("type", "course")
                    .leaf("format", "moodle2")
                    .leaf("interactive", 1)
                    .leaf("mode", 10)
                    .leaf("execution", 1)
                    .leaf("executiontime", 0),
            ),
        )
        .child(render_contents(builder))
        .child(render_settings(builder));

    Document::new(
        MANIFEST_FILE,
        XmlElement::new("moodle_backup").child(information),
    )
}

/// Activities in section order, because the importer restores them in
/// listing order
fn ordered_activities(builder: &CourseBuilder) -> impl Iterator<Item = &Activity> {
    builder
        .sections()
        .iter()
        .flat_map(|s| s.sequence.iter())
        .filter_map(|id| builder.activity(*id))
}

fn render_contents(builder: &CourseBuilder) -> XmlElement {
    let activities = ordered_activities(builder).map(|a| {
        XmlElement::new("activity")
            .leaf("moduleid", a.id)
            .leaf("sectionid", a.section_id)
            .leaf("modulename", a.modname())
            .leaf("title", &a.name)
            .leaf("directory", layout::activity_dir(a.modname(), a.id))
            .leaf("insubsection", "")
    });

    let sections = builder.sections().iter().map(|s| {
        XmlElement::new("section")
            .leaf("sectionid", s.id)
            .leaf("title", &s.name)
            .leaf("directory", layout::section_dir(s.id))
            .leaf("parentcmid", "")
            .leaf("modname", "")
    });

    let files = builder.files().blobs().map(|(hash, data)| {
        XmlElement::new("file")
            .leaf("contenthash", hash)
            .leaf("filesize", data.len())
            .leaf("path", layout::blob_path(hash))
    });

    XmlElement::new("contents")
        .child(XmlElement::new("activities").with_children(activities))
        .child(XmlElement::new("sections").with_children(sections))
        .child(
            XmlElement::new("course")
                .leaf("courseid", COURSE_ID)
                .leaf("title", &builder.course().shortname)
                .leaf("directory", COURSE_DIR),
        )
        .child(XmlElement::new("files").with_children(files))
}

fn setting(level: &str, scope: Option<(&str, &str)>, name: &str, value: impl Display) -> XmlElement {
    let mut el = XmlElement::new("setting").leaf("level", level);
    if let Some((tag, owner)) = scope {
        el = el.leaf(tag, owner);
    }
    el.leaf("name", name).leaf("value", value)
}

/// The settings tree embedded in the manifest
pub fn render_settings(builder: &CourseBuilder) -> XmlElement {
    let mut settings = XmlElement::new("settings");
    settings.push(setting("root", None, "filename", archive_name(builder)));

    for name in ENABLED_ROOT_SETTINGS {
        settings.push(setting("root", None, name, flag(true)));
    }
    for name in DISABLED_ROOT_SETTINGS {
        settings.push(setting("root", None, name, flag(false)));
    }

    for section in builder.sections() {
        let key = format!("section_{}", section.id);
        let scope = Some(("section", key.as_str()));
        settings.push(setting("section", scope, &format!("{}_included", key), flag(true)));
        settings.push(setting("section", scope, &format!("{}_userinfo", key), flag(false)));
    }

    for activity in ordered_activities(builder) {
        let key = format!("{}_{}", activity.modname(), activity.id);
        let scope = Some(("activity", key.as_str()));
        settings.push(setting("activity", scope, &format!("{}_included", key), flag(true)));
        settings.push(setting("activity", scope, &format!("{}_userinfo", key), flag(false)));
    }

    settings
}

fn archive_name(builder: &CourseBuilder) -> String {
    format!(
        "backup-moodle2-course-{}-{}.mbz",
        COURSE_ID,
        builder.timestamp()
    )
}

/// Stable 32-hex-digit id derived from course and build timestamp
fn backup_id(builder: &CourseBuilder) -> String {
    let seed = format!("{}:{}", builder.course().shortname, builder.timestamp());
    content_hash(seed.as_bytes())[..32].to_string()
}
