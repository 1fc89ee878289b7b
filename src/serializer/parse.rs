//! Lenient markup parser producing the node model.
//!
//! HTML-tolerant: void tags need no close tag, valueless attributes are
//! accepted, stray end tags are ignored and unclosed elements are closed by
//! their ancestor's end tag. Text and attribute values are kept as written
//! (entities are not decoded), so re-rendering reproduces them. The one
//! exception is the `\"` attribute escape the renderer writes, which is read
//! back as a plain `"`.

use std::borrow::Cow;

use quick_xml::Reader;
use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesStart, Event};
use thiserror::Error;

use super::node::{Document, Element, Node};

/// Content is taken verbatim up to the matching close tag. Without one the
/// element is empty (`<style>` as the renderer writes it).
const RAW_TEXT_TAGS: &[&str] = &["script", "style"];

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Stand-in for the renderer's `\"` while quick-xml splits attributes
const QUOTE_ENTITY: &str = "&quot;";

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("markup error at byte {position}: {source}")]
    Syntax {
        position: u64,
        #[source]
        source: quick_xml::Error,
    },

    #[error("bad attribute: {0}")]
    Attribute(#[from] AttrError),
}

struct TreeBuilder {
    stack: Vec<Element>,
    roots: Vec<Node>,
    text: String,
}

impl TreeBuilder {
    fn attach(&mut self, node: Node) {
        match self.stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => self.roots.push(node),
        }
    }

    fn flush_text(&mut self) {
        if !self.text.is_empty() {
            let text = std::mem::take(&mut self.text);
            self.attach(Node::Text(text));
        }
    }

    /// Close the innermost open element named `tag` and everything inside it.
    fn close(&mut self, tag: &str) {
        let Some(depth) = self.stack.iter().rposition(|el| el.tag == tag) else {
            return; // stray end tag
        };
        while self.stack.len() > depth {
            if let Some(element) = self.stack.pop() {
                self.attach(Node::Element(element));
            }
        }
    }

    fn finish(mut self) -> Vec<Node> {
        self.flush_text();
        while let Some(element) = self.stack.pop() {
            self.attach(Node::Element(element));
        }
        self.roots
    }
}

fn make_reader(input: &str) -> Reader<&[u8]> {
    let mut reader = Reader::from_str(input);
    let config = reader.config_mut();
    config.trim_text(false);
    config.check_end_names = false;
    config.allow_unmatched_ends = true;
    config.expand_empty_elements = false;
    reader
}

/// Parse a markup document.
pub fn parse_document(input: &str) -> Result<Document, ParseError> {
    let unescaped = unescape_attr_quotes(input);
    let input: &str = &unescaped;

    // Byte offset of the current reader's input within `input`
    let mut base = 0usize;
    let mut reader = make_reader(input);
    let mut doctype = None;
    let mut builder = TreeBuilder {
        stack: Vec::new(),
        roots: Vec::new(),
        text: String::new(),
    };

    loop {
        let event = reader.read_event().map_err(|source| ParseError::Syntax {
            position: base as u64 + reader.error_position(),
            source,
        })?;

        match event {
            Event::Text(text) => builder.text.push_str(&lossy(&text)),
            Event::GeneralRef(entity) => {
                builder.text.push('&');
                builder.text.push_str(&lossy(&entity));
                builder.text.push(';');
            }
            Event::CData(data) => {
                builder.text.push_str("<![CDATA[");
                builder.text.push_str(&lossy(&data));
                builder.text.push_str("]]>");
            }
            Event::Eof => break,
            other => {
                builder.flush_text();
                match other {
                    Event::DocType(text) => {
                        doctype.get_or_insert_with(|| lossy(&text).trim().to_string());
                    }
                    Event::Comment(text) => builder.attach(Node::Comment(lossy(&text).into_owned())),
                    Event::Empty(start) => builder.attach(Node::Element(element(&start)?)),
                    Event::Start(start) => {
                        let mut element = element(&start)?;
                        if VOID_TAGS.contains(&element.tag.as_str()) {
                            builder.attach(Node::Element(element));
                        } else if RAW_TEXT_TAGS.contains(&element.tag.as_str()) {
                            let position = base + reader.buffer_position() as usize;
                            if let Some((body, resume)) = raw_text(input, position, &element.tag) {
                                if !body.is_empty() {
                                    element.children.push(Node::Text(body.to_string()));
                                }
                                // Continue after the close tag
                                base = resume;
                                reader = make_reader(&input[resume..]);
                            }
                            builder.attach(Node::Element(element));
                        } else {
                            builder.stack.push(element);
                        }
                    }
                    Event::End(end) => {
                        let tag = lossy(end.name().as_ref()).to_ascii_lowercase();
                        builder.close(&tag);
                    }
                    // <?xml ?> declarations and processing instructions
                    _ => {}
                }
            }
        }
    }

    Ok(Document {
        doctype: doctype.unwrap_or_else(|| "html".to_string()),
        nodes: builder.finish(),
    })
}

/// Body of the raw-text element `tag` whose start tag ends at `position`,
/// and the offset just past its close tag. `None` when the element has no
/// close tag of its own.
fn raw_text<'a>(input: &'a str, position: usize, tag: &str) -> Option<(&'a str, usize)> {
    let rest = input.get(position..)?;
    let lower = rest.to_ascii_lowercase();

    let close = lower.find(&format!("</{}", tag))?;
    if lower[..close].contains(&format!("<{}", tag)) {
        return None;
    }

    let end = lower[close..].find('>').map_or(rest.len(), |gt| close + gt + 1);
    Some((&rest[..close], position + end))
}

/// Rewrite `\"` inside double-quoted attribute values to `&quot;`, so the
/// attribute reader sees balanced quotes. Comments and raw-text bodies are
/// copied untouched.
fn unescape_attr_quotes(input: &str) -> Cow<'_, str> {
    if !input.contains("\\\"") {
        return Cow::Borrowed(input);
    }

    let bytes = input.as_bytes();
    let mut out = String::with_capacity(input.len());
    let mut copied = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'<' {
            i += 1;
            continue;
        }
        if input[i..].starts_with("<!--") {
            i = input[i..].find("-->").map_or(bytes.len(), |end| i + end + 3);
            continue;
        }
        if !bytes.get(i + 1).is_some_and(u8::is_ascii_alphabetic) {
            i += 1;
            continue;
        }

        let name_end = input[i + 1..]
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-'))
            .map_or(bytes.len(), |n| i + 1 + n);
        let tag = input[i + 1..name_end].to_ascii_lowercase();

        let mut quote = None;
        let mut j = name_end;
        while j < bytes.len() {
            match (quote, bytes[j]) {
                (Some(b'"'), b'\\') if bytes.get(j + 1) == Some(&b'"') => {
                    out.push_str(&input[copied..j]);
                    out.push_str(QUOTE_ENTITY);
                    j += 2;
                    copied = j;
                    continue;
                }
                (Some(q), c) if c == q => quote = None,
                (None, b'"' | b'\'') => quote = Some(bytes[j]),
                (None, b'>') => {
                    j += 1;
                    break;
                }
                _ => {}
            }
            j += 1;
        }

        i = j;
        if RAW_TEXT_TAGS.contains(&tag.as_str())
            && let Some((_, resume)) = raw_text(input, j, &tag)
        {
            i = resume;
        }
    }

    out.push_str(&input[copied..]);
    Cow::Owned(out)
}

fn element(start: &BytesStart) -> Result<Element, ParseError> {
    let mut element = Element::new(lossy(start.name().as_ref()).to_ascii_lowercase());
    for attr in start.html_attributes() {
        let attr = attr?;
        element.attrs.push((
            lossy(attr.key.as_ref()).into_owned(),
            lossy(&attr.value).replace(QUOTE_ENTITY, "\""),
        ));
    }
    Ok(element)
}

fn lossy(bytes: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serializer::serialize_document;

    fn root(document: &Document) -> &Element {
        document
            .nodes
            .iter()
            .find_map(|node| match node {
                Node::Element(el) => Some(el),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn test_parse_basic_structure() {
        let doc = parse_document(
            "<!DOCTYPE html><html lang=\"en\"><body><p class=a>Hi</p></body></html>",
        )
        .unwrap();
        assert_eq!(doc.doctype, "html");

        let html = root(&doc);
        assert_eq!(html.tag, "html");
        assert_eq!(html.get_attr("lang"), Some("en"));

        let Node::Element(body) = &html.children[0] else {
            panic!("expected body");
        };
        let Node::Element(p) = &body.children[0] else {
            panic!("expected p");
        };
        assert_eq!(p.get_attr("class"), Some("a"));
        assert_eq!(p.children, vec![Node::text("Hi")]);
    }

    #[test]
    fn test_void_tags_need_no_close() {
        let doc = parse_document("<head><meta charset=\"utf-8\"><title>T</title></head>").unwrap();
        let head = root(&doc);
        assert_eq!(head.children.len(), 2);
        let Node::Element(meta) = &head.children[0] else {
            panic!("expected meta");
        };
        assert!(meta.children.is_empty());
    }

    #[test]
    fn test_attribute_order_preserved() {
        let doc = parse_document("<input type=\"text\" name=\"q\" disabled>").unwrap();
        let input = root(&doc);
        let names: Vec<&str> = input.attrs.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, vec!["type", "name", "disabled"]);
    }

    #[test]
    fn test_unclosed_and_stray_tags() {
        let doc = parse_document("<ul><li>one<li>two</ul></span>").unwrap();
        let ul = root(&doc);
        assert_eq!(ul.tag, "ul");
        assert_eq!(doc.nodes.len(), 1);
    }

    #[test]
    fn test_script_content_is_raw() {
        let doc = parse_document("<script>if (a<b && c > d) { go(\"<p>\"); }</script>").unwrap();
        let script = root(&doc);
        assert_eq!(
            script.children,
            vec![Node::text("if (a<b && c > d) { go(\"<p>\"); }")]
        );
    }

    #[test]
    fn test_style_body_consumed() {
        let doc = parse_document("<head><style>p > a { color: red; }</style><title>T</title></head>")
            .unwrap();
        let head = root(&doc);
        assert_eq!(head.children.len(), 2);
        let Node::Element(style) = &head.children[0] else {
            panic!("expected style");
        };
        assert_eq!(style.children, vec![Node::text("p > a { color: red; }")]);
    }

    #[test]
    fn test_style_without_close_is_empty() {
        let doc = parse_document("<head><style><title>T</title></head>").unwrap();
        let head = root(&doc);
        let tags: Vec<&str> = head
            .children
            .iter()
            .filter_map(|node| match node {
                Node::Element(el) => Some(el.tag.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(tags, vec!["style", "title"]);
    }

    #[test]
    fn test_escaped_quote_in_attribute() {
        let doc = parse_document(r#"<a href="x\"y" title="&quot;">q</a>"#).unwrap();
        let a = root(&doc);
        assert_eq!(a.get_attr("href"), Some("x\"y"));
        assert_eq!(a.get_attr("title"), Some("\""));
        assert_eq!(a.children, vec![Node::text("q")]);
    }

    #[test]
    fn test_escape_rewrite_skips_script_body() {
        let doc = parse_document(r#"<script>s = "\"";</script><b id="a\"b">x</b>"#).unwrap();
        let Node::Element(script) = &doc.nodes[0] else {
            panic!("expected script");
        };
        assert_eq!(script.children, vec![Node::text(r#"s = "\"";"#)]);
        let Node::Element(b) = &doc.nodes[1] else {
            panic!("expected b");
        };
        assert_eq!(b.get_attr("id"), Some("a\"b"));
    }

    #[test]
    fn test_entities_kept_verbatim() {
        let doc = parse_document("<p>Fish &amp; chips</p>").unwrap();
        let p = root(&doc);
        let text: String = p
            .children
            .iter()
            .map(|node| match node {
                Node::Text(t) => t.as_str(),
                _ => "",
            })
            .collect();
        assert_eq!(text, "Fish &amp; chips");
    }

    #[test]
    fn test_serialization_is_idempotent() {
        let source = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Demo</title>
  <link rel="stylesheet" href="style.css">
  <style>body { margin: 0; }</style>
</head>
<body>
  <!-- main -->
  <div id="app"><p>Hello <b>world</b></p></div>
  <ul><li>One</li><li></li></ul>
  <a href='x"y'>q</a>
  <section class="a-rather-long-class-name-for-testing" data-role="content-region"><h1>Title</h1></section>
  <script src="editor.js"></script>
</body>
</html>
"#;
        let first = serialize_document(&parse_document(source).unwrap());
        let second = serialize_document(&parse_document(&first).unwrap());
        assert_eq!(first, second);
        assert!(first.starts_with("<!DOCTYPE html>\n"));
        assert!(first.contains("\n  <style>\n"));
        assert!(first.contains(r#"<a href="x\"y">q</a>"#));
    }
}
