//! Typed XML tree with a single writer and reader
//!
//! Every backup document is built as an [`XmlElement`] tree and written by
//! [`XmlElement::to_bytes`]. Escaping happens only there, never in renderers.

use crate::error::{MbzError, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::fmt::Display;
use std::io::Write;

/// Marker the importer reads as SQL NULL
pub const NULL_MARKER: &str = "$@NULL@$";

/// Boolean as the 0/1 flag used throughout backup documents
pub fn flag(value: bool) -> u8 {
    u8::from(value)
}

/// Node of a document tree
#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

/// Element with ordered attributes and children
#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Append an attribute
    pub fn attr(mut self, key: impl Into<String>, value: impl Display) -> Self {
        self.attributes.push((key.into(), value.to_string()));
        self
    }

    /// Append a child element
    pub fn child(mut self, element: XmlElement) -> Self {
        self.push(element);
        self
    }

    /// Append several child elements
    pub fn with_children(mut self, elements: impl IntoIterator<Item = XmlElement>) -> Self {
        self.children
            .extend(elements.into_iter().map(XmlNode::Element));
        self
    }

    /// Append `<name>value</name>`
    pub fn leaf(self, name: impl Into<String>, value: impl Display) -> Self {
        self.child(XmlElement::new(name).with_text(value))
    }

    /// Append `<name>$@NULL@$</name>`
    pub fn null_leaf(self, name: impl Into<String>) -> Self {
        self.leaf(name, NULL_MARKER)
    }

    /// Append a text node
    pub fn with_text(mut self, value: impl Display) -> Self {
        self.children.push(XmlNode::Text(value.to_string()));
        self
    }

    pub fn push(&mut self, element: XmlElement) {
        self.children.push(XmlNode::Element(element));
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Concatenated direct text content
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|c| match c {
                XmlNode::Text(t) => Some(t.as_str()),
                XmlNode::Element(_) => None,
            })
            .collect()
    }

    /// Direct child elements
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|c| match c {
            XmlNode::Element(e) => Some(e),
            XmlNode::Text(_) => None,
        })
    }

    /// Direct child elements named `name`
    pub fn find_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.elements().filter(move |e| e.name == name)
    }

    /// First direct child named `name`
    pub fn find(&self, name: &str) -> Option<&XmlElement> {
        self.elements().find(|e| e.name == name)
    }

    /// Follow a `/`-separated path of child names
    pub fn find_path(&self, path: &str) -> Option<&XmlElement> {
        path.split('/')
            .filter(|p| !p.is_empty())
            .try_fold(self, |el, name| el.find(name))
    }

    /// Text of the first direct child named `name`
    pub fn child_text(&self, name: &str) -> Option<String> {
        self.find(name).map(XmlElement::text)
    }

    /// Every element named `name` below this one, in document order
    pub fn descendants(&self, name: &str) -> Vec<&XmlElement> {
        let mut found = Vec::new();
        self.collect_descendants(name, &mut found);
        found
    }

    fn collect_descendants<'a>(&'a self, name: &str, found: &mut Vec<&'a XmlElement>) {
        for child in self.elements() {
            if child.name == name {
                found.push(child);
            }
            child.collect_descendants(name, found);
        }
    }

    /// Serialize as a standalone UTF-8 document
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 4);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        write_element(&mut writer, self)?;

        let mut out = writer.into_inner();
        out.push(b'\n');
        Ok(out)
    }

    /// Parse a document produced by [`to_bytes`](Self::to_bytes) or any
    /// well-formed XML with a single root
    pub fn parse(bytes: &[u8]) -> Result<XmlElement> {
        let mut reader = Reader::from_reader(bytes);
        let mut buf = Vec::new();
        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => stack.push(element_from(&e)),
                Event::Empty(e) => {
                    let element = element_from(&e);
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let mut element = stack
                        .pop()
                        .ok_or_else(|| MbzError::InvalidArchive("unbalanced end tag".into()))?;
                    drop_layout_whitespace(&mut element);
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Text(t) => {
                    if let Some(top) = stack.last_mut() {
                        push_text(top, &String::from_utf8_lossy(t.as_ref()));
                    }
                }
                Event::CData(c) => {
                    if let Some(top) = stack.last_mut() {
                        push_text(top, &String::from_utf8_lossy(c.as_ref()));
                    }
                }
                Event::GeneralRef(r) => {
                    if let Some(top) = stack.last_mut() {
                        let entity = String::from_utf8_lossy(r.as_ref()).into_owned();
                        let resolved = resolve_entity(&entity).ok_or_else(|| {
                            MbzError::InvalidArchive(format!("unknown entity &{};", entity))
                        })?;
                        push_text(top, &resolved);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if !stack.is_empty() {
            return Err(MbzError::InvalidArchive(format!(
                "unclosed element <{}>",
                stack[stack.len() - 1].name
            )));
        }
        root.ok_or_else(|| MbzError::InvalidArchive("document has no root element".into()))
    }
}

fn write_element<W: Write>(writer: &mut Writer<W>, element: &XmlElement) -> Result<()> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }
    if element.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }
    writer.write_event(Event::Start(start))?;

    for child in &element.children {
        match child {
            XmlNode::Element(e) => write_element(writer, e)?,
            XmlNode::Text(t) => writer.write_event(Event::Text(BytesText::new(t)))?,
        }
    }

    writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))?;
    Ok(())
}

fn element_from(start: &BytesStart<'_>) -> XmlElement {
    let mut element = XmlElement::new(String::from_utf8_lossy(start.name().as_ref()));
    for attr in start.attributes().flatten() {
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let raw = String::from_utf8_lossy(&attr.value).into_owned();
        let value = quick_xml::escape::unescape(&raw)
            .map(|v| v.into_owned())
            .unwrap_or(raw);
        element.attributes.push((key, value));
    }
    element
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.push(element),
        None if root.is_none() => *root = Some(element),
        None => {
            return Err(MbzError::InvalidArchive(
                "document has more than one root element".into(),
            ))
        }
    }
    Ok(())
}

fn push_text(element: &mut XmlElement, text: &str) {
    if let Some(XmlNode::Text(existing)) = element.children.last_mut() {
        existing.push_str(text);
    } else {
        element.children.push(XmlNode::Text(text.to_string()));
    }
}

/// Indentation between child elements is layout, not content
fn drop_layout_whitespace(element: &mut XmlElement) {
    let has_elements = element.elements().next().is_some();
    element.children.retain(|c| match c {
        XmlNode::Text(t) => {
            let blank = t.trim().is_empty();
            !(blank && (has_elements || t.contains('\n')))
        }
        XmlNode::Element(_) => true,
    });
}

fn resolve_entity(entity: &str) -> Option<String> {
    if let Some(code) = entity.strip_prefix('#') {
        let value = match code.strip_prefix('x').or_else(|| code.strip_prefix('X')) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => code.parse().ok()?,
        };
        return char::from_u32(value).map(String::from);
    }

    let resolved = match entity {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        _ => return None,
    };
    Some(resolved.to_string())
}
