//! # Attribute Schema
//!
//! Static per-kind attribute declarations: default value, type, whether
//! the attribute is derived by a synchronization pass, and the key used in
//! the serialized format.

use crate::ast::{AttrValue, NodeKind};
use std::collections::BTreeMap;

/// Lower clamp bound for media width/height
pub const MIN_MEDIA_SIZE: i64 = 40;

/// Upper clamp bound for media width/height
pub const MAX_MEDIA_SIZE: i64 = 2400;

pub const RIGHT_ANGLES: &[i64] = &[0, 90, 180, 270];

pub const IMAGE_BORDERS: &[&str] = &["none", "thin", "medium", "thick"];

pub const TABLE_BORDER_STYLES: &[&str] = &["none", "solid", "dashed", "dotted", "double"];

pub const BULLET_STYLES: &[&str] = &["disc", "circle", "square"];

pub const ORDERED_STYLES: &[&str] = &[
    "decimal",
    "lower-alpha",
    "upper-alpha",
    "lower-roman",
    "upper-roman",
];

pub const ALIGNMENTS: &[&str] = &["left", "center", "right", "justify"];

/// Who owns an attribute's value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Derivation {
    /// Set by user commands
    Authoritative,
    /// Recomputed by a synchronization pass, never set by user commands
    Derived,
    /// Derived from the node's own text marks when they carry a value,
    /// inherited from the preceding sibling otherwise
    Conditional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrType {
    Bool,
    Int { min: i64, max: i64 },
    OneOf(&'static [i64]),
    Str,
    Enum(&'static [&'static str]),
    Widths,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrDefault {
    Null,
    Bool(bool),
    Int(i64),
    Str(&'static str),
}

impl AttrDefault {
    pub fn to_value(self) -> AttrValue {
        match self {
            AttrDefault::Null => AttrValue::Null,
            AttrDefault::Bool(b) => AttrValue::Bool(b),
            AttrDefault::Int(n) => AttrValue::Int(n),
            AttrDefault::Str(s) => AttrValue::Str(s.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttrSpec {
    pub name: &'static str,
    /// Serialized attribute name; `None` when the value is carried by the
    /// tag itself (heading level)
    pub key: Option<&'static str>,
    pub default: AttrDefault,
    pub ty: AttrType,
    pub derivation: Derivation,
}

impl AttrSpec {
    const fn new(name: &'static str, key: &'static str, default: AttrDefault, ty: AttrType) -> Self {
        Self {
            name,
            key: Some(key),
            default,
            ty,
            derivation: Derivation::Authoritative,
        }
    }

    const fn derived(mut self, derivation: Derivation) -> Self {
        self.derivation = derivation;
        self
    }

    pub fn is_derived(&self) -> bool {
        self.derivation != Derivation::Authoritative
    }

    pub fn default_value(&self) -> AttrValue {
        self.default.to_value()
    }

    /// Normalize a value for this attribute. Integers are clamped into range;
    /// `None` means the value has the wrong type or is not an allowed choice.
    pub fn coerce(&self, value: AttrValue) -> Option<AttrValue> {
        match (self.ty, value) {
            (_, AttrValue::Null) if self.default == AttrDefault::Null => Some(AttrValue::Null),
            (AttrType::Bool, AttrValue::Bool(b)) => Some(AttrValue::Bool(b)),
            (AttrType::Int { min, max }, AttrValue::Int(n)) => Some(AttrValue::Int(n.clamp(min, max))),
            (AttrType::OneOf(allowed), AttrValue::Int(n)) if allowed.contains(&n) => {
                Some(AttrValue::Int(n))
            }
            (AttrType::Str, AttrValue::Str(s)) => Some(AttrValue::Str(s)),
            (AttrType::Enum(allowed), AttrValue::Str(s)) if allowed.contains(&s.as_str()) => {
                Some(AttrValue::Str(s))
            }
            (AttrType::Widths, AttrValue::Widths(w)) => Some(AttrValue::Widths(w)),
            _ => None,
        }
    }

    /// Decode a serialized value. Malformed input yields `None`; callers
    /// substitute the default. Free text is taken exactly as written.
    pub fn decode(&self, raw: &str) -> Option<AttrValue> {
        let value = match self.ty {
            AttrType::Str => AttrValue::Str(raw.to_string()),
            _ => self.decode_scalar(raw.trim())?,
        };
        self.coerce(value)
    }

    fn decode_scalar(&self, raw: &str) -> Option<AttrValue> {
        let value = match self.ty {
            AttrType::Bool => match raw {
                "true" | "" => AttrValue::Bool(true),
                "false" => AttrValue::Bool(false),
                _ => return None,
            },
            AttrType::Int { .. } | AttrType::OneOf(_) => {
                let digits = raw.strip_suffix("px").unwrap_or(raw);
                match digits.parse::<f64>() {
                    Ok(n) if n.is_finite() => AttrValue::Int(n.round() as i64),
                    _ => return None,
                }
            }
            AttrType::Str | AttrType::Enum(_) => AttrValue::Str(raw.to_string()),
            AttrType::Widths => {
                let widths: Result<Vec<u32>, _> = raw.split(',').map(|w| w.trim().parse::<u32>()).collect();
                AttrValue::Widths(widths.ok()?)
            }
        };
        Some(value)
    }
}

use AttrDefault as D;
use AttrType as T;

const INT_ANY: AttrType = T::Int {
    min: i64::MIN,
    max: i64::MAX,
};

const MEDIA_SIZE: AttrType = T::Int {
    min: MIN_MEDIA_SIZE,
    max: MAX_MEDIA_SIZE,
};

const PARAGRAPH: &[AttrSpec] = &[AttrSpec::new("textAlign", "data-align", D::Null, T::Enum(ALIGNMENTS))];

const HEADING: &[AttrSpec] = &[
    AttrSpec {
        name: "level",
        key: None,
        default: D::Int(1),
        ty: T::Int { min: 1, max: 6 },
        derivation: Derivation::Authoritative,
    },
    AttrSpec::new("textAlign", "data-align", D::Null, T::Enum(ALIGNMENTS)),
];

const BULLET_LIST: &[AttrSpec] = &[AttrSpec::new(
    "listStyle",
    "data-list-style",
    D::Str("disc"),
    T::Enum(BULLET_STYLES),
)];

const ORDERED_LIST: &[AttrSpec] = &[
    AttrSpec::new("start", "start", D::Int(1), INT_ANY),
    AttrSpec::new(
        "listStyle",
        "data-list-style",
        D::Str("decimal"),
        T::Enum(ORDERED_STYLES),
    ),
];

const LIST_ITEM: &[AttrSpec] = &[
    AttrSpec::new("fontSize", "data-font-size", D::Null, T::Str),
    AttrSpec::new("textColor", "data-text-color", D::Null, T::Str),
    AttrSpec::new("markerBold", "data-marker-bold", D::Bool(false), T::Bool).derived(Derivation::Derived),
];

const TASK_ITEM: &[AttrSpec] = &[
    AttrSpec::new("checked", "data-checked", D::Bool(false), T::Bool),
    AttrSpec::new("fontSize", "data-font-size", D::Null, T::Str).derived(Derivation::Conditional),
    AttrSpec::new("textColor", "data-text-color", D::Null, T::Str),
];

const TABLE: &[AttrSpec] = &[
    AttrSpec::new("borderWidth", "data-border-width", D::Str("1px"), T::Str),
    AttrSpec::new(
        "borderStyle",
        "data-border-style",
        D::Str("solid"),
        T::Enum(TABLE_BORDER_STYLES),
    ),
    AttrSpec::new("borderColor", "data-border-color", D::Str("#000000"), T::Str),
    AttrSpec::new("borderRadius", "data-border-radius", D::Str("0px"), T::Str),
    AttrSpec::new("tableHeight", "data-table-height", D::Null, T::Int { min: 1, max: i64::MAX }),
];

const TABLE_CELL: &[AttrSpec] = &[
    AttrSpec::new("colspan", "colspan", D::Int(1), T::Int { min: 1, max: 1000 }),
    AttrSpec::new("rowspan", "rowspan", D::Int(1), T::Int { min: 1, max: 65534 }),
    AttrSpec::new("colwidth", "data-colwidth", D::Null, T::Widths),
    AttrSpec::new("background", "data-background", D::Null, T::Str),
    AttrSpec::new("cellBorder", "data-cell-border", D::Null, T::Str).derived(Derivation::Derived),
];

const IMAGE: &[AttrSpec] = &[
    AttrSpec::new("src", "src", D::Null, T::Str),
    AttrSpec::new("width", "width", D::Null, MEDIA_SIZE),
    AttrSpec::new("height", "height", D::Null, MEDIA_SIZE),
    AttrSpec::new("rotation", "data-rotation", D::Int(0), T::OneOf(RIGHT_ANGLES)),
    AttrSpec::new("flipH", "data-flip-h", D::Bool(false), T::Bool),
    AttrSpec::new("flipV", "data-flip-v", D::Bool(false), T::Bool),
    AttrSpec::new("border", "data-border", D::Str("none"), T::Enum(IMAGE_BORDERS)),
    AttrSpec::new("borderColor", "data-border-color", D::Null, T::Str),
    AttrSpec::new("textAlign", "data-align", D::Null, T::Enum(ALIGNMENTS)),
    AttrSpec::new("description", "data-description", D::Null, T::Str),
    AttrSpec::new("fileId", "data-file-id", D::Null, T::Str),
];

/// Attribute declarations for `kind`, in serialization order
pub fn attributes(kind: NodeKind) -> &'static [AttrSpec] {
    match kind {
        NodeKind::Paragraph => PARAGRAPH,
        NodeKind::Heading => HEADING,
        NodeKind::BulletList => BULLET_LIST,
        NodeKind::OrderedList => ORDERED_LIST,
        NodeKind::ListItem => LIST_ITEM,
        NodeKind::TaskItem => TASK_ITEM,
        NodeKind::Table => TABLE,
        NodeKind::TableCell | NodeKind::TableHeader => TABLE_CELL,
        NodeKind::Image => IMAGE,
        NodeKind::Doc
        | NodeKind::Blockquote
        | NodeKind::TaskList
        | NodeKind::TableRow
        | NodeKind::Text
        | NodeKind::HardBreak
        | NodeKind::HorizontalRule => &[],
    }
}

pub fn spec(kind: NodeKind, name: &str) -> Option<&'static AttrSpec> {
    attributes(kind).iter().find(|spec| spec.name == name)
}

pub fn spec_by_key(kind: NodeKind, key: &str) -> Option<&'static AttrSpec> {
    attributes(kind).iter().find(|spec| spec.key == Some(key))
}

pub fn defaults(kind: NodeKind) -> BTreeMap<String, AttrValue> {
    attributes(kind)
        .iter()
        .map(|spec| (spec.name.to_string(), spec.default_value()))
        .collect()
}
