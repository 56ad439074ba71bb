use crate::ast::{add_mark, Fragment, Mark, NodeKind};
use crate::error::{ParseError, ParseResult};
use crate::schema;
use crate::tokenizer::{tokenize, Markup};
use crate::tree::Tree;
use std::ops::Range;

/// How a tag name participates in the document
#[derive(Debug, Clone, Copy, PartialEq)]
enum Element {
    Block,
    Inline,
    /// Wrapper whose children belong to the enclosing node (`tbody`)
    Transparent,
    Unknown,
}

fn classify(name: &str) -> Element {
    match name {
        "p" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "blockquote" | "ul" | "ol" | "li"
        | "table" | "tr" | "td" | "th" | "img" | "hr" => Element::Block,
        "br" | "strong" | "b" | "em" | "i" | "u" | "s" | "strike" | "del" | "code" | "span"
        | "a" => Element::Inline,
        "tbody" | "thead" | "tfoot" => Element::Transparent,
        _ => Element::Unknown,
    }
}

fn is_void(name: &str) -> bool {
    matches!(name, "img" | "br" | "hr")
}

/// Parser for the serialized document format
pub struct Parser {
    tokens: Vec<(Markup, Range<usize>)>,
    pos: usize,
    source_len: usize,
}

impl Parser {
    pub fn new(source: &str) -> ParseResult<Self> {
        Ok(Self {
            tokens: tokenize(source)?,
            pos: 0,
            source_len: source.len(),
        })
    }

    /// Parse the whole input into a detached `doc` fragment
    pub fn parse_document(&mut self) -> ParseResult<Fragment> {
        let mut doc = Fragment::new(NodeKind::Doc);
        doc.children = self.parse_blocks(NodeKind::Doc, None)?;
        Ok(doc)
    }

    fn parse_blocks(&mut self, container: NodeKind, end: Option<&str>) -> ParseResult<Vec<Fragment>> {
        let mut blocks = Vec::new();
        // Inline content found directly in a block container is wrapped in
        // an implicit paragraph
        let mut loose: Vec<Fragment> = Vec::new();

        loop {
            let Some((markup, span)) = self.peek().cloned() else {
                if end.is_some() {
                    return Err(ParseError::unexpected_eof(self.source_len));
                }
                break;
            };
            self.advance();

            match markup {
                Markup::EndTag { name } if Some(name.as_str()) == end => break,
                Markup::EndTag { name } if is_void(&name) => {}
                Markup::EndTag { name } => {
                    return Err(ParseError::unexpected_token(
                        span.start,
                        Self::format_expected_end(end),
                        format!("</{}>", name),
                    ))
                }
                Markup::Text(text) => {
                    if loose.is_empty() && text.trim().is_empty() {
                        continue;
                    }
                    loose.push(Fragment::text(text));
                }
                Markup::StartTag {
                    name,
                    attrs,
                    self_closing,
                } => match classify(&name) {
                    Element::Transparent => {
                        flush_loose(&mut loose, &mut blocks);
                        if !self_closing {
                            let inner = self.parse_blocks(container, Some(name.as_str()))?;
                            blocks.extend(inner);
                        }
                    }
                    Element::Inline => {
                        self.parse_inline_element(&name, &attrs, self_closing, &[], &mut loose, span.start)?;
                    }
                    Element::Block => {
                        flush_loose(&mut loose, &mut blocks);
                        blocks.push(self.parse_block(container, &name, &attrs, self_closing)?);
                    }
                    Element::Unknown => return Err(ParseError::unknown_element(span.start, name)),
                },
            }
        }

        flush_loose(&mut loose, &mut blocks);
        Ok(blocks)
    }

    fn parse_block(
        &mut self,
        container: NodeKind,
        name: &str,
        attrs: &[(String, String)],
        self_closing: bool,
    ) -> ParseResult<Fragment> {
        let kind = block_kind(name, attrs, container);
        let mut fragment = decode_element(kind, name, attrs);

        if let Some(level) = name.strip_prefix('h').and_then(|n| n.parse::<i64>().ok()) {
            fragment.attrs.insert("level".to_string(), level.into());
        }

        if kind.is_leaf() || self_closing {
            return Ok(fragment);
        }

        if kind.is_textblock() {
            let mut inline = Vec::new();
            self.parse_inline(&[], name, &mut inline)?;
            fragment.children = inline;
        } else {
            fragment.children = self.parse_blocks(kind, Some(name))?;
        }
        Ok(fragment)
    }

    fn parse_inline(&mut self, marks: &[Mark], end: &str, out: &mut Vec<Fragment>) -> ParseResult<()> {
        loop {
            let Some((markup, span)) = self.peek().cloned() else {
                return Err(ParseError::unexpected_eof(self.source_len));
            };
            self.advance();

            match markup {
                Markup::EndTag { name } if name == end => return Ok(()),
                Markup::EndTag { name } if is_void(&name) => {}
                Markup::EndTag { name } => {
                    return Err(ParseError::unexpected_token(
                        span.start,
                        format!("</{}>", end),
                        format!("</{}>", name),
                    ))
                }
                Markup::Text(text) => {
                    if !text.is_empty() {
                        out.push(Fragment::marked_text(text, marks.to_vec()));
                    }
                }
                Markup::StartTag {
                    name,
                    attrs,
                    self_closing,
                } => {
                    self.parse_inline_element(&name, &attrs, self_closing, marks, out, span.start)?;
                }
            }
        }
    }

    fn parse_inline_element(
        &mut self,
        name: &str,
        attrs: &[(String, String)],
        self_closing: bool,
        marks: &[Mark],
        out: &mut Vec<Fragment>,
        pos: usize,
    ) -> ParseResult<()> {
        match name {
            "br" => out.push(decode_element(NodeKind::HardBreak, name, attrs)),
            "img" => out.push(decode_element(NodeKind::Image, name, attrs)),
            _ => {
                let mark = match mark_for(name, attrs) {
                    Some(mark) => mark,
                    None => return Err(ParseError::unknown_element(pos, name)),
                };
                if self_closing {
                    return Ok(());
                }
                let mut inner = marks.to_vec();
                if let Some(mark) = &mark {
                    add_mark(&mut inner, mark);
                }
                self.parse_inline(&inner, name, out)?;
            }
        }
        Ok(())
    }

    fn peek(&self) -> Option<&(Markup, Range<usize>)> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn format_expected_end(end: Option<&str>) -> String {
        match end {
            Some(name) => format!("</{}>", name),
            None => "end of input".to_string(),
        }
    }
}

fn flush_loose(loose: &mut Vec<Fragment>, blocks: &mut Vec<Fragment>) {
    if loose.is_empty() {
        return;
    }
    let content = std::mem::take(loose);
    let blank = content
        .iter()
        .all(|f| f.kind == NodeKind::Text && f.text.trim().is_empty());
    if !blank {
        blocks.push(Fragment::new(NodeKind::Paragraph).with_children(content));
    }
}

fn block_kind(name: &str, attrs: &[(String, String)], container: NodeKind) -> NodeKind {
    let data_type = attrs
        .iter()
        .find(|(key, _)| key == "data-type")
        .map(|(_, value)| value.as_str());
    match name {
        "p" => NodeKind::Paragraph,
        "blockquote" => NodeKind::Blockquote,
        "ul" if data_type == Some("taskList") => NodeKind::TaskList,
        "ul" => NodeKind::BulletList,
        "ol" => NodeKind::OrderedList,
        "li" if container == NodeKind::TaskList || data_type == Some("taskItem") => {
            NodeKind::TaskItem
        }
        "li" => NodeKind::ListItem,
        "table" => NodeKind::Table,
        "tr" => NodeKind::TableRow,
        "td" => NodeKind::TableCell,
        "th" => NodeKind::TableHeader,
        "img" => NodeKind::Image,
        "hr" => NodeKind::HorizontalRule,
        _ => NodeKind::Heading,
    }
}

/// Build a node from its tag attributes. Schema attributes are decoded,
/// malformed values fall back to the default, anything else is kept
/// verbatim.
fn decode_element(kind: NodeKind, name: &str, attrs: &[(String, String)]) -> Fragment {
    let mut fragment = Fragment::new(kind);
    for (key, value) in attrs {
        if key == "data-type" && matches!(name, "ul" | "li") {
            continue;
        }
        match schema::spec_by_key(kind, key) {
            Some(spec) => match spec.decode(value) {
                Some(decoded) => {
                    fragment.attrs.insert(spec.name.to_string(), decoded);
                }
                None => {
                    tracing::debug!(
                        element = name,
                        attribute = key.as_str(),
                        value = value.as_str(),
                        "malformed attribute, using default"
                    );
                }
            },
            None => fragment.unknown.push((key.clone(), value.clone())),
        }
    }
    fragment
}

/// `None` when `name` is not a mark element; `Some(None)` for a mark
/// element that carries nothing (a bare `span`)
fn mark_for(name: &str, attrs: &[(String, String)]) -> Option<Option<Mark>> {
    let mark = match name {
        "strong" | "b" => Mark::Bold,
        "em" | "i" => Mark::Italic,
        "u" => Mark::Underline,
        "s" | "strike" | "del" => Mark::Strike,
        "code" => Mark::Code,
        "a" => {
            let mut href = String::new();
            let mut rest = Vec::new();
            for (key, value) in attrs {
                if key == "href" {
                    href = value.clone();
                } else {
                    rest.push((key.clone(), value.clone()));
                }
            }
            Mark::Link { href, attrs: rest }
        }
        "span" => {
            let mut style = "";
            let mut rest = Vec::new();
            for (key, value) in attrs {
                if key == "style" {
                    style = value.as_str();
                } else {
                    rest.push((key.clone(), value.clone()));
                }
            }
            return Some(parse_text_style(style, rest));
        }
        _ => return None,
    };
    Some(Some(mark))
}

/// Font size and color are lifted out of `style`; every other declaration
/// and attribute rides along on the mark.
fn parse_text_style(style: &str, attrs: Vec<(String, String)>) -> Option<Mark> {
    let mut font_size = None;
    let mut color = None;
    let mut declarations = Vec::new();
    for declaration in style.split(';') {
        let Some((property, value)) = declaration.split_once(':') else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        match property.trim().to_ascii_lowercase().as_str() {
            "font-size" => font_size = Some(value.to_string()),
            "color" => color = Some(value.to_string()),
            other => declarations.push((other.to_string(), value.to_string())),
        }
    }
    if font_size.is_none() && color.is_none() && declarations.is_empty() && attrs.is_empty() {
        None
    } else {
        Some(Mark::TextStyle {
            font_size,
            color,
            declarations,
            attrs,
        })
    }
}

/// Parse a serialized document into a tree
pub fn parse(source: &str) -> ParseResult<Tree> {
    let fragment = Parser::new(source)?.parse_document()?;
    Ok(Tree::from_fragment(&fragment)?)
}
