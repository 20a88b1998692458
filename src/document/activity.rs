use super::course::filters;
use super::xml::{flag, XmlElement};
use super::{empty, now, Document};
use crate::archive::layout;
use crate::builder::CourseBuilder;
use crate::model::{Activity, ActivityKind, QuizSlot};

/// Grade scale every generated quiz is marked out of
const QUIZ_GRADE: f64 = 10.0;

/// `<modname>.xml`: the activity wrapper holding the module payload
pub fn render_activity(builder: &CourseBuilder, activity: &Activity) -> XmlElement {
    let ts = now(builder);
    let body = XmlElement::new(activity.modname())
        .attr("id", activity.id)
        .leaf("name", &activity.name)
        .leaf("intro", &activity.intro)
        .leaf("introformat", 1);

    let body = match &activity.kind {
        ActivityKind::Resource { .. } => body
            .leaf("tobemigrated", 0)
            .leaf("legacyfiles", 0)
            .null_leaf("legacyfileslast")
            .leaf("display", 0)
            .null_leaf("displayoptions")
            .leaf("filterfiles", 0)
            .leaf("revision", 1)
            .leaf("timemodified", ts),
        ActivityKind::Page { content } => body
            .leaf("content", content)
            .leaf("contentformat", 1)
            .leaf("legacyfiles", 0)
            .null_leaf("legacyfileslast")
            .leaf("display", 5)
            .leaf("displayoptions", "a:2:{s:10:\"printintro\";s:1:\"0\";s:17:\"printlastmodified\";s:1:\"1\";}")
            .leaf("revision", 1)
            .leaf("timemodified", ts),
        ActivityKind::Quiz { questions } => quiz_body(body, activity, questions, ts),
        ActivityKind::H5p { .. } => body
            .leaf("timecreated", ts)
            .leaf("timemodified", ts)
            .leaf("grade", 100)
            .leaf("displayoptions", 0)
            .leaf("enabletracking", 1)
            .leaf("grademethod", 1)
            .leaf("reviewmode", 1)
            .child(XmlElement::new("attempts")),
    };

    XmlElement::new("activity")
        .attr("id", activity.id)
        .attr("moduleid", activity.id)
        .attr("modulename", activity.modname())
        .attr("contextid", activity.context_id())
        .child(body)
}

fn quiz_body(body: XmlElement, activity: &Activity, slots: &[QuizSlot], ts: i64) -> XmlElement {
    let sumgrades = slots.len() as f64;
    let instances = slots.iter().map(|slot| {
        XmlElement::new("question_instance")
            .attr("id", slot.parent.key.flat_id())
            .leaf("quizid", activity.id)
            .leaf("slot", slot.slot)
            .leaf("page", slot.slot)
            .leaf("requireprevious", 0)
            .leaf("maxmark", format!("{:.7}", 1.0))
            .child(
                XmlElement::new("question_reference")
                    .attr("id", slot.parent.key.flat_id())
                    .leaf("usingcontextid", activity.context_id())
                    .leaf("component", "mod_quiz")
                    .leaf("questionarea", "slot")
                    .leaf("questionbankentryid", slot.parent.key.flat_id())
                    .null_leaf("version"),
            )
    });

    body.leaf("timeopen", 0)
        .leaf("timeclose", 0)
        .leaf("timelimit", 0)
        .leaf("overduehandling", "autosubmit")
        .leaf("graceperiod", 0)
        .leaf("preferredbehaviour", "deferredfeedback")
        .leaf("canredoquestions", 0)
        .leaf("attempts_number", 0)
        .leaf("attemptonlast", 0)
        .leaf("grademethod", 1)
        .leaf("decimalpoints", 2)
        .leaf("questiondecimalpoints", -1)
        .leaf("reviewattempt", 69888)
        .leaf("reviewcorrectness", 4352)
        .leaf("reviewmarks", 4352)
        .leaf("reviewspecificfeedback", 4352)
        .leaf("reviewgeneralfeedback", 4352)
        .leaf("reviewrightanswer", 4352)
        .leaf("reviewoverallfeedback", 4352)
        .leaf("questionsperpage", 1)
        .leaf("navmethod", "free")
        .leaf("shuffleanswers", 1)
        .leaf("sumgrades", format!("{:.5}", sumgrades))
        .leaf("grade", format!("{:.5}", QUIZ_GRADE))
        .leaf("timecreated", ts)
        .leaf("timemodified", ts)
        .leaf("password", "")
        .leaf("subnet", "")
        .leaf("browsersecurity", "-")
        .leaf("delay1", 0)
        .leaf("delay2", 0)
        .leaf("showuserpicture", 0)
        .leaf("showblocks", 0)
        .leaf("completionattemptsexhausted", 0)
        .leaf("completionminattempts", 0)
        .leaf("allowofflineattempts", 0)
        .child(XmlElement::new("subplugin_quizaccess_seb_quiz"))
        .child(XmlElement::new("quiz_slot_tags"))
        .child(XmlElement::new("question_instances").with_children(instances))
        .child(
            XmlElement::new("sections").child(
                XmlElement::new("section")
                    .attr("id", activity.id)
                    .leaf("firstslot", 1)
                    .leaf("heading", "")
                    .leaf("shufflequestions", 0),
            ),
        )
        .child(
            XmlElement::new("feedbacks").child(
                XmlElement::new("feedback")
                    .attr("id", activity.id)
                    .leaf("feedbacktext", "")
                    .leaf("feedbacktextformat", 1)
                    .leaf("mingrade", format!("{:.5}", 0.0))
                    .leaf("maxgrade", format!("{:.5}", QUIZ_GRADE + 1.0)),
            ),
        )
        .child(XmlElement::new("overrides"))
        .child(XmlElement::new("grades"))
        .child(XmlElement::new("attempts"))
}

fn render_module(builder: &CourseBuilder, activity: &Activity) -> XmlElement {
    let section_number = builder
        .section(activity.section_id)
        .map(|s| s.number)
        .unwrap_or_default();

    XmlElement::new("module")
        .attr("id", activity.id)
        .attr("version", builder.config().moodle_version)
        .leaf("modulename", activity.modname())
        .leaf("sectionid", activity.section_id)
        .leaf("sectionnumber", section_number)
        .leaf("idnumber", "")
        .leaf("added", now(builder))
        .leaf("score", 0)
        .leaf("indent", 0)
        .leaf("visible", flag(activity.visible))
        .leaf("visibleoncoursepage", 1)
        .leaf("visibleold", flag(activity.visible))
        .leaf("groupmode", 0)
        .leaf("groupingid", 0)
        .leaf("completion", 0)
        .null_leaf("completiongradeitemnumber")
        .leaf("completionview", 0)
        .leaf("completionexpected", 0)
        .null_leaf("availability")
        .leaf("showdescription", 0)
        .leaf("downloadcontent", 1)
        .child(XmlElement::new("tags"))
}

fn render_inforef(activity: &Activity) -> XmlElement {
    let mut root = XmlElement::new("inforef");

    let files = activity.file_ids();
    if !files.is_empty() {
        root.push(XmlElement::new("fileref").with_children(
            files.into_iter().map(|id| XmlElement::new("file").leaf("id", id)),
        ));
    }
    if let Some(category) = activity.question_category_id() {
        root.push(
            XmlElement::new("question_categoryref")
                .child(XmlElement::new("question_category").leaf("id", category)),
        );
    }
    root
}

fn render_grades(activity: &Activity) -> XmlElement {
    let root = XmlElement::new("activity_gradebook");
    let grademax = match activity.kind {
        ActivityKind::Quiz { .. } => Some(QUIZ_GRADE),
        ActivityKind::H5p { .. } => Some(100.0),
        ActivityKind::Resource { .. } | ActivityKind::Page { .. } => None,
    };
    let items = grademax.map(|max| {
        XmlElement::new("grade_item")
            .attr("id", activity.id)
            .null_leaf("categoryid")
            .leaf("itemname", &activity.name)
            .leaf("itemtype", "mod")
            .leaf("itemmodule", activity.modname())
            .leaf("iteminstance", activity.id)
            .leaf("itemnumber", 0)
            .leaf("gradetype", 1)
            .leaf("grademax", format!("{:.5}", max))
            .leaf("grademin", format!("{:.5}", 0.0))
            .child(XmlElement::new("grade_grades"))
    });

    root.child(XmlElement::new("grade_items").with_children(items))
        .child(XmlElement::new("grade_letters"))
}

/// Every document of one activity directory
pub fn render_activity_documents(builder: &CourseBuilder, activity: &Activity) -> Vec<Document> {
    let dir = layout::activity_dir(activity.modname(), activity.id);
    let path = |file: &str| layout::join(&dir, file);

    vec![
        Document::new(path("module.xml"), render_module(builder, activity)),
        Document::new(
            path(&format!("{}.xml", activity.modname())),
            render_activity(builder, activity),
        ),
        Document::new(path("inforef.xml"), render_inforef(activity)),
        Document::new(path("grades.xml"), render_grades(activity)),
        Document::new(
            path("grade_history.xml"),
            XmlElement::new("grade_history").child(XmlElement::new("grade_grades")),
        ),
        Document::new(
            path("roles.xml"),
            XmlElement::new("roles")
                .child(XmlElement::new("role_overrides"))
                .child(XmlElement::new("role_assignments")),
        ),
        filters(path("filters.xml")),
        empty(path("comments.xml"), "comments"),
        empty(path("completion.xml"), "completions"),
        empty(path("calendar.xml"), "events"),
        Document::new(
            path("competencies.xml"),
            XmlElement::new("course_module_competencies").child(XmlElement::new("competencies")),
        ),
    ]
}
