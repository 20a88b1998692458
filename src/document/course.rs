use super::xml::{flag, XmlElement};
use super::{empty, now, Document};
use crate::archive::layout::{self, COURSE_DIR};
use crate::builder::CourseBuilder;
use crate::model::{COURSE_CONTEXT_ID, COURSE_ID};

/// `course/course.xml` plus the course-level placeholder documents
pub fn render_course_documents(builder: &CourseBuilder) -> Vec<Document> {
    let course = builder.course();
    let ts = now(builder);

    let root = XmlElement::new("course")
        .attr("id", COURSE_ID)
        .attr("contextid", COURSE_CONTEXT_ID)
        .leaf("shortname", &course.shortname)
        .leaf("fullname", &course.fullname)
        .leaf("idnumber", "")
        .leaf("summary", &course.summary)
        .leaf("summaryformat", 1)
        .leaf("format", &course.format)
        .leaf("showgrades", 1)
        .leaf("newsitems", 0)
        .leaf("startdate", ts)
        .leaf("enddate", 0)
        .leaf("marker", 0)
        .leaf("maxbytes", 0)
        .leaf("legacyfiles", 0)
        .leaf("showreports", 0)
        .leaf("visible", flag(course.visible))
        .leaf("groupmode", 0)
        .leaf("groupmodeforce", 0)
        .leaf("defaultgroupingid", 0)
        .leaf("lang", "")
        .leaf("theme", "")
        .leaf("timecreated", ts)
        .leaf("timemodified", ts)
        .leaf("requested", 0)
        .leaf("showactivitydates", 1)
        .leaf("showcompletionconditions", 1)
        .leaf("enablecompletion", 0)
        .leaf("completionnotify", 0)
        .child(
            XmlElement::new("category")
                .attr("id", 1)
                .leaf("name", "Miscellaneous")
                .null_leaf("description"),
        )
        .child(XmlElement::new("tags"))
        .child(XmlElement::new("customfields"))
        .child(
            XmlElement::new("courseformatoptions").child(
                XmlElement::new("courseformatoption")
                    .leaf("format", &course.format)
                    .leaf("sectionid", 0)
                    .leaf("name", "hiddensections")
                    .leaf("value", 0),
            ),
        );

    let path = |file: &str| layout::join(COURSE_DIR, file);
    vec![
        Document::new(path("course.xml"), root),
        empty(path("inforef.xml"), "inforef"),
        Document::new(
            path("roles.xml"),
            XmlElement::new("roles")
                .child(XmlElement::new("role_overrides"))
                .child(XmlElement::new("role_assignments")),
        ),
        Document::new(
            path("enrolments.xml"),
            XmlElement::new("enrolments").child(XmlElement::new("enrols")),
        ),
        filters(path("filters.xml")),
        empty(path("comments.xml"), "comments"),
        empty(path("calendar.xml"), "events"),
        empty(path("completiondefaults.xml"), "course_completion_defaults"),
        Document::new(
            path("competencies.xml"),
            XmlElement::new("course_competencies")
                .child(XmlElement::new("competencies"))
                .child(XmlElement::new("user_competencies")),
        ),
    ]
}

/// Root documents for data categories this generator never exports
pub fn render_root_placeholders() -> Vec<Document> {
    vec![
        Document::new(
            "groups.xml",
            XmlElement::new("groups").child(XmlElement::new("groupings")),
        ),
        empty("outcomes.xml", "outcomes_definition"),
        empty("roles.xml", "roles_definition"),
        empty("scales.xml", "scales_definition"),
        empty("completion.xml", "course_completion"),
        Document::new(
            "gradebook.xml",
            XmlElement::new("gradebook")
                .child(XmlElement::new("attributes"))
                .child(XmlElement::new("grade_categories"))
                .child(XmlElement::new("grade_items"))
                .child(XmlElement::new("grade_letters"))
                .child(XmlElement::new("grade_settings")),
        ),
        Document::new(
            "grade_history.xml",
            XmlElement::new("grade_history").child(XmlElement::new("grade_grades")),
        ),
        empty("badges.xml", "badges"),
    ]
}

pub(super) fn filters(path: String) -> Document {
    Document::new(
        path,
        XmlElement::new("filters")
            .child(XmlElement::new("filter_actives"))
            .child(XmlElement::new("filter_configs")),
    )
}
