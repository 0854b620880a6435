//! Structured configuration documents and their text rendering.
//!
//! Documents are built in memory in full before anything is written, and
//! rendering is deterministic: attributes and children keep insertion order.

use serde::Serialize;

/// An XML element with ordered attributes and children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Element {
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<(String, String)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            text: None,
            children: Vec::new(),
        }
    }

    /// Builder: add an attribute.
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    /// Builder: set text content.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Builder: append a child.
    pub fn child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// Builder: append several children.
    pub fn children(mut self, children: impl IntoIterator<Item = Element>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Depth-first search for the first descendant (or self) named `name`.
    pub fn find(&self, name: &str) -> Option<&Element> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(name))
    }

    /// All descendants (and self) named `name`, in document order.
    pub fn find_all<'a>(&'a self, name: &str) -> Vec<&'a Element> {
        let mut found = Vec::new();
        self.collect(name, &mut found);
        found
    }

    fn collect<'a>(&'a self, name: &str, out: &mut Vec<&'a Element>) {
        if self.name == name {
            out.push(self);
        }
        for child in &self.children {
            child.collect(name, out);
        }
    }

    /// Text of the first `property` element whose `name` attribute matches.
    pub fn property(&self, name: &str) -> Option<&str> {
        self.find_all("property")
            .into_iter()
            .find(|p| p.get_attr("name") == Some(name))
            .map(|p| p.text.as_deref().unwrap_or(""))
    }

    fn write_to(&self, out: &mut String, depth: usize) {
        let indent = "    ".repeat(depth);
        out.push_str(&indent);
        out.push('<');
        out.push_str(&self.name);
        for (k, v) in &self.attributes {
            out.push(' ');
            out.push_str(k);
            out.push_str("=\"");
            out.push_str(&xml_escape(v));
            out.push('"');
        }

        match (&self.text, self.children.is_empty()) {
            (None, true) => out.push_str("/>\n"),
            (Some(text), true) => {
                out.push('>');
                out.push_str(&xml_escape(text));
                out.push_str("</");
                out.push_str(&self.name);
                out.push_str(">\n");
            }
            (text, false) => {
                out.push_str(">\n");
                if let Some(text) = text {
                    out.push_str(&"    ".repeat(depth + 1));
                    out.push_str(&xml_escape(text));
                    out.push('\n');
                }
                for child in &self.children {
                    child.write_to(out, depth + 1);
                }
                out.push_str(&indent);
                out.push_str("</");
                out.push_str(&self.name);
                out.push_str(">\n");
            }
        }
    }
}

/// A resolved configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Artifact {
    /// XML document with a single root element.
    Xml { root: Element },
    /// Java-style `key = value` properties.
    Properties { entries: Vec<(String, String)> },
}

impl Artifact {
    pub fn xml(root: Element) -> Self {
        Artifact::Xml { root }
    }

    pub fn properties(entries: impl IntoIterator<Item = (String, String)>) -> Self {
        Artifact::Properties {
            entries: entries.into_iter().collect(),
        }
    }

    /// Root element for XML documents.
    pub fn root(&self) -> Option<&Element> {
        match self {
            Artifact::Xml { root } => Some(root),
            Artifact::Properties { .. } => None,
        }
    }

    /// Property value, for either document kind.
    pub fn property(&self, name: &str) -> Option<&str> {
        match self {
            Artifact::Xml { root } => root.property(name),
            Artifact::Properties { entries } => entries
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str()),
        }
    }

    /// Render to the exact bytes written on disk.
    pub fn render(&self) -> String {
        match self {
            Artifact::Xml { root } => {
                let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
                root.write_to(&mut out, 0);
                out
            }
            Artifact::Properties { entries } => entries
                .iter()
                .map(|(k, v)| format!("{} = {}\n", k, v))
                .collect(),
        }
    }
}

/// Escape text for use in XML content and double-quoted attributes.
pub fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}
