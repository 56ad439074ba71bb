use crate::ast::{Mark, NodeKind};
use crate::schema;
use crate::tokenizer::{escape_attr, escape_text};
use crate::tree::{NodeId, Tree};
use std::fmt::Write;

/// Serializer writes a tree back to the markup it was parsed from.
///
/// Output is canonical: attributes holding their schema default are
/// omitted, schema attributes come first in declaration order followed by
/// unknown attributes in their original order, and no whitespace is added
/// between tags. Parsing the output yields an equal tree.
pub struct Serializer {
    output: String,
}

impl Default for Serializer {
    fn default() -> Self {
        Self::new()
    }
}

impl Serializer {
    pub fn new() -> Self {
        Self {
            output: String::new(),
        }
    }

    pub fn serialize(mut self, tree: &Tree) -> String {
        for child in tree.children(tree.root()) {
            self.write_node(tree, *child);
        }
        self.output
    }

    /// Serialize a single subtree
    pub fn serialize_node(mut self, tree: &Tree, id: NodeId) -> String {
        self.write_node(tree, id);
        self.output
    }

    fn write_node(&mut self, tree: &Tree, id: NodeId) {
        let Some(node) = tree.get(id) else {
            return;
        };
        let kind = node.kind();

        if kind == NodeKind::Text {
            self.output.push_str(&escape_text(node.text()));
            return;
        }

        let tag = tag_name(kind, node.attr("level").as_int());
        self.output.push('<');
        self.output.push_str(&tag);
        match kind {
            NodeKind::TaskList => self.output.push_str(r#" data-type="taskList""#),
            NodeKind::TaskItem => self.output.push_str(r#" data-type="taskItem""#),
            _ => {}
        }
        self.write_attributes(tree, id);
        self.output.push('>');

        if kind.is_leaf() {
            return;
        }

        if kind.is_textblock() {
            self.write_inline(tree, id);
        } else {
            for child in node.children() {
                self.write_node(tree, *child);
            }
        }

        let _ = write!(self.output, "</{}>", tag);
    }

    fn write_attributes(&mut self, tree: &Tree, id: NodeId) {
        let Some(node) = tree.get(id) else {
            return;
        };
        for spec in schema::attributes(node.kind()) {
            let Some(key) = spec.key else {
                continue;
            };
            let value = node.attr(spec.name);
            if *value == spec.default_value() {
                continue;
            }
            let _ = write!(self.output, r#" {}="{}""#, key, escape_attr(&value.to_string()));
        }
        for (key, value) in node.unknown_attrs() {
            let _ = write!(self.output, r#" {}="{}""#, key, escape_attr(value));
        }
    }

    /// Inline children, nesting mark elements by rank so that runs sharing
    /// a leading mark share its element
    fn write_inline(&mut self, tree: &Tree, block: NodeId) {
        let mut open: Vec<Mark> = Vec::new();

        for child in tree.children(block) {
            let Some(node) = tree.get(*child) else {
                continue;
            };
            let marks = node.marks();
            let keep = open
                .iter()
                .zip(marks.iter())
                .take_while(|(a, b)| a == b)
                .count();

            while open.len() > keep {
                if let Some(mark) = open.pop() {
                    self.close_mark(&mark);
                }
            }
            for mark in &marks[keep..] {
                self.open_mark(mark);
                open.push(mark.clone());
            }

            self.write_node(tree, *child);
        }

        while let Some(mark) = open.pop() {
            self.close_mark(&mark);
        }
    }

    fn open_mark(&mut self, mark: &Mark) {
        match mark {
            Mark::Link { href, attrs } => {
                let _ = write!(self.output, r#"<a href="{}""#, escape_attr(href));
                self.write_extra_attrs(attrs);
                self.output.push('>');
            }
            Mark::TextStyle {
                font_size,
                color,
                declarations,
                attrs,
            } => {
                let mut style = Vec::new();
                if let Some(size) = font_size {
                    style.push(format!("font-size: {}", size));
                }
                if let Some(color) = color {
                    style.push(format!("color: {}", color));
                }
                for (property, value) in declarations {
                    style.push(format!("{}: {}", property, value));
                }
                self.output.push_str("<span");
                if !style.is_empty() {
                    let _ = write!(self.output, r#" style="{}""#, escape_attr(&style.join("; ")));
                }
                self.write_extra_attrs(attrs);
                self.output.push('>');
            }
            _ => {
                let _ = write!(self.output, "<{}>", mark_tag(mark));
            }
        }
    }

    fn write_extra_attrs(&mut self, attrs: &[(String, String)]) {
        for (key, value) in attrs {
            let _ = write!(self.output, r#" {}="{}""#, key, escape_attr(value));
        }
    }

    fn close_mark(&mut self, mark: &Mark) {
        let _ = write!(self.output, "</{}>", mark_tag(mark));
    }
}

fn tag_name(kind: NodeKind, level: Option<i64>) -> String {
    let tag = match kind {
        NodeKind::Heading => return format!("h{}", level.unwrap_or(1).clamp(1, 6)),
        NodeKind::Doc => "body",
        NodeKind::Paragraph => "p",
        NodeKind::Blockquote => "blockquote",
        NodeKind::BulletList | NodeKind::TaskList => "ul",
        NodeKind::OrderedList => "ol",
        NodeKind::ListItem | NodeKind::TaskItem => "li",
        NodeKind::Table => "table",
        NodeKind::TableRow => "tr",
        NodeKind::TableCell => "td",
        NodeKind::TableHeader => "th",
        NodeKind::Image => "img",
        NodeKind::HardBreak => "br",
        NodeKind::HorizontalRule => "hr",
        NodeKind::Text => "",
    };
    tag.to_string()
}

fn mark_tag(mark: &Mark) -> &'static str {
    match mark {
        Mark::Link { .. } => "a",
        Mark::TextStyle { .. } => "span",
        Mark::Bold => "strong",
        Mark::Italic => "em",
        Mark::Underline => "u",
        Mark::Strike => "s",
        Mark::Code => "code",
    }
}

/// Serialize a whole document
pub fn serialize(tree: &Tree) -> String {
    Serializer::new().serialize(tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    fn normalize(source: &str) -> String {
        serialize(&parse(source).unwrap())
    }

    #[test]
    fn test_defaults_are_omitted() {
        assert_eq!(
            normalize(r#"<img src="a.png" data-rotation="0" data-border="none">"#),
            r#"<img src="a.png">"#
        );
    }

    #[test]
    fn test_schema_attributes_precede_unknown_ones() {
        assert_eq!(
            normalize(r#"<img class="hero" data-rotation="90" src="a.png" width="100">"#),
            r#"<img src="a.png" width="100" data-rotation="90" class="hero">"#
        );
    }

    #[test]
    fn test_marks_nest_by_rank() {
        assert_eq!(
            normalize("<p><em><strong>x</strong></em><strong>y</strong></p>"),
            "<p><strong><em>x</em>y</strong></p>"
        );
        assert_eq!(
            normalize(r#"<p><strong><span style="color: red">c</span></strong></p>"#),
            r#"<p><span style="color: red"><strong>c</strong></span></p>"#
        );
    }

    #[test]
    fn test_task_list_markup() {
        let source = r#"<ul data-type="taskList"><li data-type="taskItem" data-checked="true"><p>a</p></li></ul>"#;
        assert_eq!(normalize(source), source);
    }

    #[test]
    fn test_text_is_escaped() {
        assert_eq!(normalize("<p>a &lt; b &amp; c</p>"), "<p>a &lt; b &amp; c</p>");
    }

    #[test]
    fn test_heading_and_inline_leaves() {
        let source = r#"<h2 data-align="center">A<br>B<img src="i.png"></h2><hr>"#;
        assert_eq!(normalize(source), source);
    }
}
