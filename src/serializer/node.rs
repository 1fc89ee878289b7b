//! Markup node model.

/// Attribute that removes a node and its subtree from the output
pub const SKIP_ATTR: &str = "editor-skip";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    /// In source order
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }

    pub fn child(mut self, node: impl Into<Node>) -> Self {
        self.children.push(node.into());
        self
    }

    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Marked with `editor-skip`. The bare attribute counts as true.
    pub fn is_skipped(&self) -> bool {
        self.get_attr(SKIP_ATTR)
            .is_some_and(|value| !value.eq_ignore_ascii_case("false"))
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Self::Element(element)
    }
}

impl Node {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(content.into())
    }

    pub fn comment(content: impl Into<String>) -> Self {
        Self::Comment(content.into())
    }
}

/// A whole document: doctype name plus top-level nodes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub doctype: String,
    pub nodes: Vec<Node>,
}

impl Document {
    pub fn new(root: Element) -> Self {
        Self {
            doctype: "html".to_string(),
            nodes: vec![Node::Element(root)],
        }
    }
}
