use std::io::Read;

use anyhow::anyhow;
use xml::reader::{ParserConfig, XmlEvent};

pub type ElementId = usize;

#[derive(Debug)]
struct Element {
    name: String,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
    text: String,
}

/// A parsed descriptor (POM) document: an element tree stored in document order, so that
///  element ids increase in the order their start tags appear.
///
/// Only what dependency resolution needs is kept: element names (namespace prefix stripped),
///  the tree structure and text content. Attributes and comments are dropped.
#[derive(Debug)]
pub struct PomDocument {
    elements: Vec<Element>,
}
impl PomDocument {
    pub fn parse(source: impl Read) -> anyhow::Result<PomDocument> {
        let reader = ParserConfig::new()
            .trim_whitespace(true)
            .cdata_to_characters(true)
            .ignore_comments(true)
            .create_reader(source);

        let mut elements: Vec<Element> = Vec::new();
        let mut open: Vec<ElementId> = Vec::new();

        for event in reader {
            match event? {
                XmlEvent::StartElement { name, .. } => {
                    let id = elements.len();
                    let parent = open.last().copied();
                    if let Some(parent) = parent {
                        elements[parent].children.push(id);
                    }
                    elements.push(Element {
                        name: name.local_name,
                        parent,
                        children: vec![],
                        text: String::new(),
                    });
                    open.push(id);
                }
                XmlEvent::EndElement { .. } => {
                    open.pop();
                }
                XmlEvent::Characters(text) => {
                    if let Some(&current) = open.last() {
                        elements[current].text.push_str(&text);
                    }
                }
                _ => {}
            }
        }

        if elements.is_empty() {
            return Err(anyhow!("document has no root element"));
        }
        Ok(PomDocument { elements })
    }

    /// the document element
    pub fn root(&self) -> ElementId {
        0
    }

    pub fn name(&self, id: ElementId) -> &str {
        &self.elements[id].name
    }

    pub fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.elements[id].parent
    }

    pub fn children(&self, id: ElementId) -> impl Iterator<Item = ElementId> + '_ {
        self.elements[id].children.iter().copied()
    }

    /// all proper ancestors, innermost first
    pub fn ancestors(&self, id: ElementId) -> impl Iterator<Item = ElementId> + '_ {
        std::iter::successors(self.parent(id), move |&current| self.parent(current))
    }

    /// all elements whose name matches ignoring ASCII case, in document order
    pub fn elements_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = ElementId> + 'a {
        (0..self.elements.len())
            .filter(move |&id| self.elements[id].name.eq_ignore_ascii_case(name))
    }

    /// the first direct child whose name matches ignoring ASCII case
    pub fn child(&self, id: ElementId, name: &str) -> Option<ElementId> {
        self.children(id)
            .find(|&child| self.name(child).eq_ignore_ascii_case(name))
    }

    /// trimmed text of the first matching direct child; empty text counts as absent
    pub fn child_text(&self, id: ElementId, name: &str) -> Option<String> {
        self.child(id, name)
            .map(|child| self.text_content(child))
            .filter(|text| !text.is_empty())
    }

    /// the trimmed concatenated text of an element and its descendants
    pub fn text_content(&self, id: ElementId) -> String {
        let mut result = String::new();
        self.collect_text(id, &mut result);
        result.trim().to_string()
    }

    fn collect_text(&self, id: ElementId, into: &mut String) {
        into.push_str(&self.elements[id].text);
        for child in self.children(id) {
            self.collect_text(child, into);
        }
    }

    /// The value of a property, i.e. of an element named exactly `name` (case sensitive) that is
    ///  a direct child of a `<properties>` element anywhere in the document.
    pub fn property(&self, name: &str) -> Option<String> {
        (0..self.elements.len())
            .filter(|&id| self.elements[id].name == name)
            .find(|&id| self.parent(id)
                .map(|p| self.name(p).eq_ignore_ascii_case("properties"))
                .unwrap_or(false))
            .map(|id| self.text_content(id))
    }
}
