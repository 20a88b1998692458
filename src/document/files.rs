use super::xml::XmlElement;
use super::{now, Document};
use crate::archive::layout::FILES_FILE;
use crate::builder::CourseBuilder;
use crate::filestore::StoredFile;

/// `files.xml`: one `<file>` per metadata entry, blobs referenced by hash
pub fn render_files(builder: &CourseBuilder) -> Document {
    let ts = now(builder);
    let files = builder.files().files().iter().map(|f| render_file(f, ts));

    Document::new(FILES_FILE, XmlElement::new("files").with_children(files))
}

fn render_file(file: &StoredFile, ts: i64) -> XmlElement {
    XmlElement::new("file")
        .attr("id", file.id)
        .leaf("contenthash", &file.content_hash)
        .leaf("contextid", file.owner.context_id)
        .leaf("component", &file.owner.component)
        .leaf("filearea", &file.owner.area)
        .leaf("itemid", file.owner.item_id)
        .leaf("filepath", &file.filepath)
        .leaf("filename", &file.filename)
        .null_leaf("userid")
        .leaf("filesize", file.size)
        .leaf("mimetype", file.mime_type)
        .leaf("status", 0)
        .leaf("timecreated", ts)
        .leaf("timemodified", ts)
        .leaf("source", &file.filename)
        .null_leaf("author")
        .null_leaf("license")
        .leaf("sortorder", 1)
        .null_leaf("repositorytype")
        .null_leaf("repositoryid")
        .null_leaf("reference")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::PayloadSource;
    use crate::document::tests::sample_builder;

    #[test]
    fn test_file_entries_share_hash() {
        let mut b = sample_builder();
        let s1 = b.sections()[0].id;
        for name in ["a.h5p", "b.h5p"] {
            b.add_h5p(
                s1,
                name,
                "",
                PayloadSource::Bytes {
                    filename: name.to_string(),
                    data: b"same".to_vec(),
                },
                true,
            )
            .unwrap();
        }

        let doc = render_files(&b);
        let files: Vec<_> = doc.root.find_all("file").collect();
        assert_eq!(files.len(), 2);
        assert_ne!(files[0].attribute("id"), files[1].attribute("id"));
        assert_eq!(
            files[0].child_text("contenthash"),
            files[1].child_text("contenthash")
        );

        let first = files[0];
        assert_eq!(first.child_text("component").unwrap(), "mod_h5pactivity");
        assert_eq!(first.child_text("filearea").unwrap(), "package");
        assert_eq!(first.child_text("contextid").unwrap(), "103");
        assert_eq!(first.child_text("filepath").unwrap(), "/");
        assert_eq!(first.child_text("filesize").unwrap(), "4");
        assert_eq!(
            first.child_text("mimetype").unwrap(),
            "application/octet-stream"
        );
    }

    #[test]
    fn test_no_files() {
        let b = sample_builder();
        assert_eq!(render_files(&b).root.elements().count(), 0);
    }
}
