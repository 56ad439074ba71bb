use crate::schema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Closed set of node kinds a document can contain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    Doc,
    Paragraph,
    Heading,
    Blockquote,
    BulletList,
    OrderedList,
    ListItem,
    TaskList,
    TaskItem,
    Table,
    TableRow,
    TableCell,
    TableHeader,
    Image,
    Text,
    HardBreak,
    HorizontalRule,
}

impl NodeKind {
    pub const ALL: [NodeKind; 17] = [
        NodeKind::Doc,
        NodeKind::Paragraph,
        NodeKind::Heading,
        NodeKind::Blockquote,
        NodeKind::BulletList,
        NodeKind::OrderedList,
        NodeKind::ListItem,
        NodeKind::TaskList,
        NodeKind::TaskItem,
        NodeKind::Table,
        NodeKind::TableRow,
        NodeKind::TableCell,
        NodeKind::TableHeader,
        NodeKind::Image,
        NodeKind::Text,
        NodeKind::HardBreak,
        NodeKind::HorizontalRule,
    ];

    pub fn name(self) -> &'static str {
        match self {
            NodeKind::Doc => "doc",
            NodeKind::Paragraph => "paragraph",
            NodeKind::Heading => "heading",
            NodeKind::Blockquote => "blockquote",
            NodeKind::BulletList => "bulletList",
            NodeKind::OrderedList => "orderedList",
            NodeKind::ListItem => "listItem",
            NodeKind::TaskList => "taskList",
            NodeKind::TaskItem => "taskItem",
            NodeKind::Table => "table",
            NodeKind::TableRow => "tableRow",
            NodeKind::TableCell => "tableCell",
            NodeKind::TableHeader => "tableHeader",
            NodeKind::Image => "image",
            NodeKind::Text => "text",
            NodeKind::HardBreak => "hardBreak",
            NodeKind::HorizontalRule => "horizontalRule",
        }
    }

    pub fn is_leaf(self) -> bool {
        matches!(
            self,
            NodeKind::Image | NodeKind::Text | NodeKind::HardBreak | NodeKind::HorizontalRule
        )
    }

    /// Blocks whose children are inline content
    pub fn is_textblock(self) -> bool {
        matches!(self, NodeKind::Paragraph | NodeKind::Heading)
    }

    pub fn is_inline(self) -> bool {
        matches!(self, NodeKind::Text | NodeKind::HardBreak | NodeKind::Image)
    }

    pub fn is_block(self) -> bool {
        matches!(
            self,
            NodeKind::Paragraph
                | NodeKind::Heading
                | NodeKind::Blockquote
                | NodeKind::BulletList
                | NodeKind::OrderedList
                | NodeKind::TaskList
                | NodeKind::Table
                | NodeKind::Image
                | NodeKind::HorizontalRule
        )
    }

    pub fn is_list(self) -> bool {
        matches!(
            self,
            NodeKind::BulletList | NodeKind::OrderedList | NodeKind::TaskList
        )
    }

    pub fn is_list_item(self) -> bool {
        matches!(self, NodeKind::ListItem | NodeKind::TaskItem)
    }

    pub fn is_cell(self) -> bool {
        matches!(self, NodeKind::TableCell | NodeKind::TableHeader)
    }

    /// Content rule: may a node of this kind hold a child of `child` kind?
    pub fn accepts_child(self, child: NodeKind) -> bool {
        match self {
            NodeKind::Doc
            | NodeKind::Blockquote
            | NodeKind::ListItem
            | NodeKind::TaskItem
            | NodeKind::TableCell
            | NodeKind::TableHeader => child.is_block(),
            NodeKind::Paragraph | NodeKind::Heading => child.is_inline(),
            NodeKind::BulletList | NodeKind::OrderedList => child == NodeKind::ListItem,
            NodeKind::TaskList => child == NodeKind::TaskItem,
            NodeKind::Table => child == NodeKind::TableRow,
            NodeKind::TableRow => child.is_cell(),
            NodeKind::Image | NodeKind::Text | NodeKind::HardBreak | NodeKind::HorizontalRule => {
                false
            }
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Inline formatting carried by text nodes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Mark {
    Link {
        href: String,
        /// Other attributes of the `a` element, in source order
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        attrs: Vec<(String, String)>,
    },
    #[serde(rename_all = "camelCase")]
    TextStyle {
        #[serde(default)]
        font_size: Option<String>,
        #[serde(default)]
        color: Option<String>,
        /// Style declarations other than font size and color
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        declarations: Vec<(String, String)>,
        /// Attributes of the `span` element other than `style`
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        attrs: Vec<(String, String)>,
    },
    Bold,
    Italic,
    Underline,
    Strike,
    Code,
}

impl Mark {
    /// Nesting order when serialized (outermost first)
    pub fn rank(&self) -> u8 {
        match self {
            Mark::Link { .. } => 0,
            Mark::TextStyle { .. } => 1,
            Mark::Bold => 2,
            Mark::Italic => 3,
            Mark::Underline => 4,
            Mark::Strike => 5,
            Mark::Code => 6,
        }
    }

    pub fn same_type(&self, other: &Mark) -> bool {
        self.rank() == other.rank()
    }

    pub fn font_size(size: impl Into<String>) -> Self {
        Mark::TextStyle {
            font_size: Some(size.into()),
            color: None,
            declarations: Vec::new(),
            attrs: Vec::new(),
        }
    }

    pub fn color(color: impl Into<String>) -> Self {
        Mark::TextStyle {
            font_size: None,
            color: Some(color.into()),
            declarations: Vec::new(),
            attrs: Vec::new(),
        }
    }
}

/// Add `mark` to a canonical mark set. Text styles merge field by field;
/// extra declarations and attributes merge by name.
pub fn add_mark(marks: &mut Vec<Mark>, mark: &Mark) {
    match (marks.iter().position(|m| m.same_type(mark)), mark) {
        (
            Some(i),
            Mark::TextStyle {
                font_size: new_size,
                color: new_color,
                declarations: new_declarations,
                attrs: new_attrs,
            },
        ) => {
            if let Mark::TextStyle {
                font_size,
                color,
                declarations,
                attrs,
            } = &mut marks[i]
            {
                if new_size.is_some() {
                    *font_size = new_size.clone();
                }
                if new_color.is_some() {
                    *color = new_color.clone();
                }
                merge_pairs(declarations, new_declarations);
                merge_pairs(attrs, new_attrs);
            }
        }
        (Some(i), _) => marks[i] = mark.clone(),
        (None, _) => marks.push(mark.clone()),
    }
    marks.sort_by_key(Mark::rank);
}

fn merge_pairs(pairs: &mut Vec<(String, String)>, incoming: &[(String, String)]) {
    for (key, value) in incoming {
        match pairs.iter_mut().find(|(existing, _)| existing == key) {
            Some(pair) => pair.1 = value.clone(),
            None => pairs.push((key.clone(), value.clone())),
        }
    }
}

/// Remove `mark` from a canonical mark set. A text style only clears the
/// fields it names, and the span stays while it still carries anything; a
/// text style naming no field clears the whole mark.
pub fn remove_mark(marks: &mut Vec<Mark>, mark: &Mark) {
    let Some(i) = marks.iter().position(|m| m.same_type(mark)) else {
        return;
    };
    let clear_fields = match mark {
        Mark::TextStyle { font_size, color, .. } if font_size.is_some() || color.is_some() => {
            Some((font_size.is_some(), color.is_some()))
        }
        _ => None,
    };
    if let (
        Some((clear_size, clear_color)),
        Mark::TextStyle {
            font_size,
            color,
            declarations,
            attrs,
        },
    ) = (clear_fields, &mut marks[i])
    {
        if clear_size {
            *font_size = None;
        }
        if clear_color {
            *color = None;
        }
        if font_size.is_some() || color.is_some() || !declarations.is_empty() || !attrs.is_empty() {
            return;
        }
    }
    marks.remove(i);
}

/// Typed attribute value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
    Widths(Vec<u32>),
}

impl AttrValue {
    pub fn str(value: impl Into<String>) -> Self {
        AttrValue::Str(value.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, AttrValue::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttrValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_widths(&self) -> Option<&[u32]> {
        match self {
            AttrValue::Widths(w) => Some(w),
            _ => None,
        }
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Int(value)
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Str(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Str(value)
    }
}

impl<T: Into<AttrValue>> From<Option<T>> for AttrValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(AttrValue::Null)
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Null => f.write_str("null"),
            AttrValue::Bool(b) => write!(f, "{}", b),
            AttrValue::Int(n) => write!(f, "{}", n),
            AttrValue::Str(s) => f.write_str(s),
            AttrValue::Widths(widths) => {
                for (i, w) in widths.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", w)?;
                }
                Ok(())
            }
        }
    }
}

/// Detached, owned subtree. Used to build content before inserting it into
/// a [`Tree`](crate::Tree) and to compare documents structurally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    pub kind: NodeKind,
    pub attrs: BTreeMap<String, AttrValue>,
    /// Attributes not known to the schema, in encounter order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unknown: Vec<(String, String)>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub marks: Vec<Mark>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Fragment>,
}

impl Fragment {
    /// A node of `kind` with every schema attribute at its default
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            attrs: schema::defaults(kind),
            unknown: Vec::new(),
            text: String::new(),
            marks: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        let mut fragment = Self::new(NodeKind::Text);
        fragment.text = text.into();
        fragment
    }

    pub fn marked_text(text: impl Into<String>, marks: Vec<Mark>) -> Self {
        let mut fragment = Self::text(text);
        for mark in &marks {
            add_mark(&mut fragment.marks, mark);
        }
        fragment
    }

    /// A paragraph holding `text` (empty text gives an empty paragraph)
    pub fn paragraph(text: impl Into<String>) -> Self {
        let text = text.into();
        let paragraph = Self::new(NodeKind::Paragraph);
        if text.is_empty() {
            paragraph
        } else {
            paragraph.with_child(Self::text(text))
        }
    }

    pub fn with_attr(mut self, name: &str, value: impl Into<AttrValue>) -> Self {
        self.attrs.insert(name.to_string(), value.into());
        self
    }

    pub fn with_child(mut self, child: Fragment) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = Fragment>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn attr(&self, name: &str) -> &AttrValue {
        self.attrs.get(name).unwrap_or(&AttrValue::Null)
    }

    /// Concatenated text of this subtree
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        if self.kind == NodeKind::Text {
            out.push_str(&self.text);
        }
        for child in &self.children {
            child.collect_text(out);
        }
    }
}
