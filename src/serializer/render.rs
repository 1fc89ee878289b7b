//! Canonical text rendering with line compression.
//!
//! Rendering is a single post-order pass. Each element turns its children's
//! lines plus its own open/close tags into lines, collapsing them onto one
//! line when the result stays under [`LINE_BUDGET`]:
//!
//! - no child lines: `<open></close>` on one line
//! - one compressible child line: `<open>child</close>` on one line, which
//!   is then no longer compressible, so collapsing never cascades upward
//! - anything else: open tag, child lines, close tag

use super::node::{Document, Element, Node};

/// Maximum width (exclusive) of a collapsed line
pub const LINE_BUDGET: usize = 80;

/// Rendered as the open tag alone: no children, no close tag (so `style`
/// rules are never written back)
const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "style", "track", "wbr",
];

/// Always rendered as open/close pair, even when empty
const EXPAND_TAGS: &[&str] = &["div", "script", "title"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub indent: usize,
    pub text: String,
    pub compressible: bool,
}

impl Line {
    fn new(indent: usize, text: String) -> Self {
        Self {
            indent,
            text,
            compressible: true,
        }
    }
}

/// Render a document to its canonical text.
pub fn serialize_document(document: &Document) -> String {
    let mut lines = vec![Line::new(0, format!("<!DOCTYPE {}>", document.doctype))];
    render_nodes(&document.nodes, 0, &mut lines);
    join_lines(&lines)
}

/// One space per indent level, every line newline-terminated.
pub fn join_lines(lines: &[Line]) -> String {
    let mut out = String::new();
    for line in lines {
        out.extend(std::iter::repeat_n(' ', line.indent));
        out.push_str(&line.text);
        out.push('\n');
    }
    out
}

pub fn render_nodes(nodes: &[Node], indent: usize, out: &mut Vec<Line>) {
    for node in nodes {
        render_node(node, indent, out);
    }
}

fn render_node(node: &Node, indent: usize, out: &mut Vec<Line>) {
    match node {
        Node::Text(text) => {
            let text = text.trim();
            if !text.is_empty() {
                out.push(Line::new(indent, text.to_string()));
            }
        }
        Node::Comment(content) => out.push(Line::new(indent, format!("<!--{}-->", content))),
        Node::Element(element) => render_element(element, indent, out),
    }
}

fn render_element(element: &Element, indent: usize, out: &mut Vec<Line>) {
    if element.is_skipped() {
        return;
    }

    let tag = element.tag.to_ascii_lowercase();
    let attrs = render_attrs(element);

    if VOID_TAGS.contains(&tag.as_str()) {
        out.push(Line::new(indent, format!("<{}{}>", tag, attrs)));
        return;
    }

    let mut children = Vec::new();
    render_nodes(&element.children, indent + 1, &mut children);

    if children.is_empty() && !EXPAND_TAGS.contains(&tag.as_str()) {
        out.push(Line::new(indent, format!("<{}{}/>", tag, attrs)));
        return;
    }

    let open = format!("<{}{}>", tag, attrs);
    let close = format!("</{}>", tag);
    compress(open, close, children, indent, out);
}

/// `name="value"` pairs in source order, each preceded by a space.
fn render_attrs(element: &Element) -> String {
    element
        .attrs
        .iter()
        .map(|(name, value)| format!(" {}=\"{}\"", name, value.replace('"', "\\\"")))
        .collect()
}

pub fn compress(
    open: String,
    close: String,
    children: Vec<Line>,
    indent: usize,
    out: &mut Vec<Line>,
) {
    let width = |s: &str| s.chars().count();

    match children.as_slice() {
        [] if width(&open) + width(&close) < LINE_BUDGET => {
            out.push(Line::new(indent, open + &close));
            return;
        }
        [only]
            if only.compressible
                && width(&open) + width(&only.text) + width(&close) < LINE_BUDGET =>
        {
            out.push(Line {
                indent: only.indent,
                text: format!("{}{}{}", open, only.text, close),
                compressible: false,
            });
            return;
        }
        _ => {}
    }

    out.push(Line::new(indent, open));
    out.extend(children);
    out.push(Line::new(indent, close));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(element: Element) -> Vec<Line> {
        let mut out = Vec::new();
        render_element(&element, 0, &mut out);
        out
    }

    fn texts(lines: &[Line]) -> Vec<(usize, &str)> {
        lines.iter().map(|l| (l.indent, l.text.as_str())).collect()
    }

    #[test]
    fn test_compress_empty_children_fits() {
        let mut out = Vec::new();
        compress("<section>".into(), "</section>".into(), vec![], 2, &mut out);
        assert_eq!(texts(&out), vec![(2, "<section></section>")]);
        assert!(out[0].compressible);
    }

    #[test]
    fn test_compress_empty_children_too_wide() {
        let open = format!("<div class=\"{}\">", "x".repeat(80));
        let mut out = Vec::new();
        compress(open.clone(), "</div>".into(), vec![], 0, &mut out);
        assert_eq!(texts(&out), vec![(0, open.as_str()), (0, "</div>")]);
    }

    #[test]
    fn test_compress_single_child_keeps_child_indent() {
        let mut out = Vec::new();
        let child = Line::new(3, "Hello".into());
        compress("<b>".into(), "</b>".into(), vec![child], 2, &mut out);
        assert_eq!(
            out,
            vec![Line {
                indent: 3,
                text: "<b>Hello</b>".into(),
                compressible: false,
            }]
        );
    }

    #[test]
    fn test_collapsed_line_does_not_collapse_again() {
        let lines = render(
            Element::new("p").child(Element::new("b").child(Node::text("x"))),
        );
        assert_eq!(texts(&lines), vec![(0, "<p>"), (2, "<b>x</b>"), (0, "</p>")]);
    }

    #[test]
    fn test_short_empty_element_is_one_line() {
        let lines = render(Element::new("ARTICLE"));
        assert_eq!(texts(&lines), vec![(0, "<article/>")]);

        let lines = render(Element::new("div"));
        assert_eq!(texts(&lines), vec![(0, "<div></div>")]);
    }

    #[test]
    fn test_void_tags_ignore_children() {
        let lines = render(
            Element::new("meta")
                .attr("charset", "utf-8")
                .child(Node::text("ignored")),
        );
        assert_eq!(texts(&lines), vec![(0, "<meta charset=\"utf-8\">")]);
    }

    #[test]
    fn test_style_renders_as_single_tag() {
        let lines = render(
            Element::new("style")
                .attr("media", "print")
                .child(Node::text("body { margin: 0; }")),
        );
        assert_eq!(texts(&lines), vec![(0, "<style media=\"print\">")]);

        let document = Document::new(
            Element::new("head").child(Element::new("style").child(Node::text("p {}"))),
        );
        assert_eq!(
            serialize_document(&document),
            "<!DOCTYPE html>\n <head><style></head>\n"
        );
    }

    #[test]
    fn test_attribute_quotes_escaped() {
        let lines = render(Element::new("img").attr("alt", "say \"hi\""));
        assert_eq!(lines[0].text, r#"<img alt="say \"hi\"">"#);
    }

    #[test]
    fn test_skipped_subtree_is_dropped() {
        let lines = render(
            Element::new("ul")
                .child(Element::new("li").child(Node::text("keep")))
                .child(
                    Element::new("li")
                        .attr("editor-skip", "true")
                        .child(Node::text("toolbar")),
                ),
        );
        assert_eq!(texts(&lines), vec![(0, "<ul>"), (2, "<li>keep</li>"), (0, "</ul>")]);
    }

    #[test]
    fn test_whitespace_text_produces_no_line() {
        let lines = render(Element::new("span").child(Node::text("  \n  ")));
        assert_eq!(texts(&lines), vec![(0, "<span/>")]);
    }

    #[test]
    fn test_comment_rendering() {
        let lines = render(Element::new("div").child(Node::comment(" note ")));
        assert_eq!(texts(&lines), vec![(1, "<div><!-- note --></div>")]);
    }

    #[test]
    fn test_deep_nesting_over_budget_breaks_every_level() {
        let document = Document::new(
            Element::new("section")
                .attr("class", "outer-wrapper-with-a-long-name")
                .child(
                    Element::new("div")
                        .attr("class", "inner-wrapper-with-a-long-name")
                        .child(Element::new("p").attr("class", "paragraph-with-a-long-class-name")),
                ),
        );

        let expected = "\
<!DOCTYPE html>
<section class=\"outer-wrapper-with-a-long-name\">
 <div class=\"inner-wrapper-with-a-long-name\">
  <p class=\"paragraph-with-a-long-class-name\"/>
 </div>
</section>
";
        assert_eq!(serialize_document(&document), expected);
    }

    #[test]
    fn test_document_lines_are_newline_terminated() {
        let document = Document::new(Element::new("html"));
        assert_eq!(serialize_document(&document), "<!DOCTYPE html>\n<html/>\n");
    }
}
