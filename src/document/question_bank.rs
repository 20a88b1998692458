use super::xml::XmlElement;
use super::{now, Document};
use crate::archive::layout::QUESTIONS_FILE;
use crate::builder::CourseBuilder;
use crate::model::Activity;
use crate::question::{BankAnswer, BankEntry, EntryBody, QuestionType};

/// Context level of course modules
const CONTEXT_LEVEL_MODULE: u64 = 70;

/// `questions.xml`: one category per quiz holding its bank entries
pub fn render_question_bank(builder: &CourseBuilder) -> Document {
    let ts = now(builder);
    let categories = builder
        .activities()
        .iter()
        .filter_map(|a| a.question_category_id().map(|id| render_category(a, id, ts)));

    Document::new(
        QUESTIONS_FILE,
        XmlElement::new("question_categories").with_children(categories),
    )
}

fn render_category(quiz: &Activity, category_id: u64, ts: i64) -> XmlElement {
    let entries = quiz
        .quiz_slots()
        .iter()
        .flat_map(|slot| [&slot.parent, &slot.child])
        .map(|entry| render_entry(entry, category_id, ts));

    XmlElement::new("question_category")
        .attr("id", category_id)
        .leaf("name", format!("Default for {}", quiz.name))
        .leaf("contextid", quiz.context_id())
        .leaf("contextlevel", CONTEXT_LEVEL_MODULE)
        .leaf("contextinstanceid", quiz.id)
        .leaf("info", "")
        .leaf("infoformat", 0)
        .leaf("stamp", format!("mbz-rs+category+{}", category_id))
        .leaf("parent", 0)
        .leaf("sortorder", 999)
        .null_leaf("idnumber")
        .child(XmlElement::new("question_bank_entries").with_children(entries))
}

fn render_entry(entry: &BankEntry, category_id: u64, ts: i64) -> XmlElement {
    let id = entry.key.flat_id();
    let parent_question = entry.parent().map(|p| p.question_id).unwrap_or(0);

    let question = XmlElement::new("question")
        .attr("id", entry.question_id)
        .leaf("parent", parent_question)
        .leaf("name", &entry.name)
        .leaf("questiontext", &entry.question_text)
        .leaf("questiontextformat", 1)
        .leaf("generalfeedback", &entry.general_feedback)
        .leaf("generalfeedbackformat", 1)
        .leaf("defaultmark", format!("{:.7}", 1.0))
        .leaf("penalty", format!("{:.7}", 0.3333333))
        .leaf("qtype", entry.qtype())
        .leaf("length", 1)
        .leaf("stamp", format!("mbz-rs+question+{}", entry.question_id))
        .leaf("timecreated", ts)
        .leaf("timemodified", ts)
        .null_leaf("createdby")
        .null_leaf("modifiedby")
        .child(plugin_data(entry))
        .child(XmlElement::new("question_hints"))
        .child(XmlElement::new("tags"));

    XmlElement::new("question_bank_entry")
        .attr("id", id)
        .leaf("questioncategoryid", category_id)
        .null_leaf("idnumber")
        .null_leaf("ownerid")
        .child(
            XmlElement::new("question_version").child(
                XmlElement::new("question_versions")
                    .attr("id", id)
                    .leaf("version", 1)
                    .leaf("status", "ready")
                    .child(XmlElement::new("questions").child(question)),
            ),
        )
}

fn plugin_data(entry: &BankEntry) -> XmlElement {
    match &entry.body {
        EntryBody::MultiAnswer { subquestion } => {
            XmlElement::new("plugin_qtype_multianswer_question").child(
                XmlElement::new("multianswer")
                    .attr("id", entry.question_id)
                    .leaf("question", entry.question_id)
                    .leaf("sequence", subquestion.question_id),
            )
        }
        EntryBody::Concrete { qtype, answers, .. } => {
            let plugin = XmlElement::new(format!("plugin_qtype_{}_question", qtype.qtype()))
                .child(render_answers(answers));
            match qtype {
                QuestionType::Multichoice => plugin.child(
                    XmlElement::new("multichoice")
                        .attr("id", entry.question_id)
                        .leaf("layout", 0)
                        .leaf("single", u8::from(correct_count(answers) == 1))
                        .leaf("shuffleanswers", 1)
                        .leaf("correctfeedback", "")
                        .leaf("correctfeedbackformat", 1)
                        .leaf("partiallycorrectfeedback", "")
                        .leaf("partiallycorrectfeedbackformat", 1)
                        .leaf("incorrectfeedback", "")
                        .leaf("incorrectfeedbackformat", 1)
                        .leaf("answernumbering", "abc")
                        .leaf("shownumcorrect", 0)
                        .leaf("showstandardinstruction", 0),
                ),
                QuestionType::Numerical => plugin
                    .child(XmlElement::new("numerical_units"))
                    .child(XmlElement::new("numerical_options"))
                    .child(XmlElement::new("numerical_records").with_children(
                        answers.iter().map(|a| {
                            XmlElement::new("numerical_record")
                                .attr("id", a.id)
                                .leaf("answer", a.id)
                                .leaf("tolerance", a.tolerance.unwrap_or_default())
                        }),
                    )),
                QuestionType::Shortanswer => plugin.child(
                    XmlElement::new("shortanswer")
                        .attr("id", entry.question_id)
                        .leaf("usecase", 0),
                ),
            }
        }
    }
}

fn render_answers(answers: &[BankAnswer]) -> XmlElement {
    XmlElement::new("answers").with_children(answers.iter().map(|a| {
        XmlElement::new("answer")
            .attr("id", a.id)
            .leaf("answertext", &a.text)
            .leaf("answerformat", 0)
            .leaf("fraction", format!("{:.7}", a.fraction))
            .leaf("feedback", &a.feedback)
            .leaf("feedbackformat", 1)
    }))
}

fn correct_count(answers: &[BankAnswer]) -> usize {
    answers.iter().filter(|a| a.fraction > 0.0).count()
}
