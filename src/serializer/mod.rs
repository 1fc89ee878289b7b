//! Tree Serializer
//!
//! Turns a markup tree into its canonical text: doctype line first, one
//! space of indentation per level, short elements collapsed onto one line.
//!
//! ```text
//! markup --parse--> Document --render--> Vec<Line> --join--> text
//! ```

mod node;
mod parse;
mod render;

pub use node::{Document, Element, Node, SKIP_ATTR};
pub use parse::{ParseError, parse_document};
pub use render::{LINE_BUDGET, Line, serialize_document};

/// Parse `input` and render it canonically.
pub fn format_markup(input: &str) -> Result<String, ParseError> {
    Ok(serialize_document(&parse_document(input)?))
}
