use super::xml::{flag, XmlElement};
use super::{empty, now, Document};
use crate::archive::layout;
use crate::builder::CourseBuilder;
use crate::model::Section;

/// `section.xml` and `inforef.xml` for one section
pub fn render_section_documents(builder: &CourseBuilder, section: &Section) -> Vec<Document> {
    let dir = layout::section_dir(section.id);

    let sequence = section
        .sequence
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(",");

    let root = XmlElement::new("section")
        .attr("id", section.id)
        .leaf("number", section.number)
        .leaf("name", &section.name)
        .leaf("summary", &section.summary)
        .leaf("summaryformat", 1)
        .leaf("sequence", sequence)
        .leaf("visible", flag(section.visible))
        .null_leaf("availabilityjson")
        .leaf("timemodified", now(builder));

    vec![
        Document::new(layout::join(&dir, "section.xml"), root),
        empty(layout::join(&dir, "inforef.xml"), "inforef"),
    ]
}
