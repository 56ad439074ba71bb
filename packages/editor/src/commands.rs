//! # Commands
//!
//! User-level editing commands and their translation into transactions.
//!
//! [`plan`] turns a document-editing command plus the current selection into
//! a [`Plan`]: the transaction to commit and where the selection goes once
//! it has been committed. Commands that need more than the tree (pointer
//! geometry, raster work, history) are dispatched by the session.

use crate::config::EditorConfig;
use crate::manipulation::{Handle, Point};
use crate::mutations::{Mutation, MutationResult};
use crate::selection::Selection;
use crate::table_geometry;
use crate::transaction::Transaction;
use crate::EditorError;
use lectern_parser::schema::{self, BULLET_STYLES, ORDERED_STYLES};
use lectern_parser::{AttrValue, Fragment, Mark, NodeId, NodeKind, Tree};
use lectern_raster::{MirrorAxis, RotateDirection};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum Command {
    InsertImage {
        #[serde(default)]
        attrs: BTreeMap<String, AttrValue>,
    },
    InsertTable {
        rows: usize,
        cols: usize,
    },
    ToggleBulletList {
        #[serde(default)]
        style: Option<String>,
    },
    ToggleOrderedList {
        #[serde(default)]
        style: Option<String>,
    },
    ToggleTaskList,
    SetCellBackground {
        #[serde(default)]
        color: Option<String>,
    },
    SetTableBorder {
        width: String,
        style: String,
        color: String,
    },
    RotateImage {
        direction: RotateDirection,
    },
    MirrorImage {
        axis: MirrorAxis,
    },
    ResizeNode {
        handle: Handle,
        delta: Point,
    },
    ResizeColumn {
        column: usize,
        width: u32,
    },
    InsertParagraph {
        #[serde(default)]
        text: String,
    },
    InsertText {
        text: String,
    },
    ToggleMark {
        mark: Mark,
    },
    SetFontSize {
        #[serde(default)]
        size: Option<String>,
    },
    SetTextColor {
        #[serde(default)]
        color: Option<String>,
    },
    SetChecked {
        checked: bool,
    },
    SetAttribute {
        name: String,
        value: AttrValue,
    },
    DeleteSelection,
    /// Select by child-index path. A textblock with offsets becomes a text
    /// selection, a cell a cell selection, anything else a node selection.
    Select {
        path: Vec<usize>,
        #[serde(default)]
        from: Option<usize>,
        #[serde(default)]
        to: Option<usize>,
    },
    Undo,
    Redo,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::InsertImage { .. } => "insertImage",
            Command::InsertTable { .. } => "insertTable",
            Command::ToggleBulletList { .. } => "toggleBulletList",
            Command::ToggleOrderedList { .. } => "toggleOrderedList",
            Command::ToggleTaskList => "toggleTaskList",
            Command::SetCellBackground { .. } => "setCellBackground",
            Command::SetTableBorder { .. } => "setTableBorder",
            Command::RotateImage { .. } => "rotateImage",
            Command::MirrorImage { .. } => "mirrorImage",
            Command::ResizeNode { .. } => "resizeNode",
            Command::ResizeColumn { .. } => "resizeColumn",
            Command::InsertParagraph { .. } => "insertParagraph",
            Command::InsertText { .. } => "insertText",
            Command::ToggleMark { .. } => "toggleMark",
            Command::SetFontSize { .. } => "setFontSize",
            Command::SetTextColor { .. } => "setTextColor",
            Command::SetChecked { .. } => "setChecked",
            Command::SetAttribute { .. } => "setAttribute",
            Command::DeleteSelection => "deleteSelection",
            Command::Select { .. } => "select",
            Command::Undo => "undo",
            Command::Redo => "redo",
        }
    }

    /// Commands that run raster work and must go through the async path
    pub fn is_raster(&self) -> bool {
        matches!(self, Command::RotateImage { .. } | Command::MirrorImage { .. })
    }
}

/// Where the selection goes after a plan commits
#[derive(Debug, Clone, PartialEq)]
pub enum After {
    /// Keep the current selection when it is still valid
    Keep,
    Clear,
    /// Text range in an existing block
    Text { block: NodeId, from: usize, to: usize },
    /// Text range inside the `index`-th inserted subtree, at `path` below it
    Inserted {
        index: usize,
        path: Vec<usize>,
        from: usize,
        to: usize,
    },
    /// The `index`-th inserted subtree itself
    InsertedNode { index: usize },
}

impl After {
    pub fn resolve(&self, tree: &Tree, result: &MutationResult, previous: Selection) -> Selection {
        let selection = match self {
            After::Keep => previous,
            After::Clear => Selection::None,
            After::Text { block, from, to } => Selection::Text {
                block: *block,
                from: *from,
                to: *to,
            },
            After::Inserted {
                index,
                path,
                from,
                to,
            } => match result
                .inserted
                .get(*index)
                .and_then(|root| descend(tree, *root, path))
            {
                Some(block) => Selection::Text {
                    block,
                    from: *from,
                    to: *to,
                },
                None => Selection::None,
            },
            After::InsertedNode { index } => match result.inserted.get(*index) {
                Some(node) => Selection::Node { node: *node },
                None => Selection::None,
            },
        };
        if selection.is_valid(tree) {
            selection
        } else {
            Selection::None
        }
    }
}

fn descend(tree: &Tree, from: NodeId, path: &[usize]) -> Option<NodeId> {
    let mut current = from;
    for index in path {
        current = *tree.children(current).get(*index)?;
    }
    Some(current)
}

/// Transaction for a command plus the selection to restore afterwards
#[derive(Debug, Clone)]
pub struct Plan {
    pub transaction: Transaction,
    pub after: After,
}

impl Plan {
    fn new(transaction: Transaction, after: After) -> Self {
        Self { transaction, after }
    }
}

/// Build the plan for a document-editing command
pub fn plan(
    command: &Command,
    tree: &Tree,
    selection: &Selection,
    config: &EditorConfig,
) -> Result<Plan, EditorError> {
    let described = |transaction: Transaction| transaction.describe(command.name());

    let plan = match command {
        Command::InsertParagraph { text } => {
            let (parent, index) = insertion_point(tree, selection, NodeKind::Paragraph);
            let offset = text.chars().count();
            Plan::new(
                Transaction::user().with(Mutation::InsertNode {
                    parent,
                    index,
                    fragment: Fragment::paragraph(text.clone()),
                }),
                After::Inserted {
                    index: 0,
                    path: Vec::new(),
                    from: offset,
                    to: offset,
                },
            )
        }

        Command::InsertText { text } => {
            let (block, from, to) = selection.range().ok_or(EditorError::Selection("a text range"))?;
            let mut transaction = Transaction::user();
            if from != to {
                transaction.push(Mutation::DeleteText { block, from, to });
            }
            transaction.push(Mutation::InsertText {
                block,
                offset: from,
                text: text.clone(),
            });
            let caret = from + text.chars().count();
            Plan::new(
                transaction,
                After::Text {
                    block,
                    from: caret,
                    to: caret,
                },
            )
        }

        Command::InsertImage { attrs } => {
            let fragment = image_fragment(attrs)?;
            let (parent, index) = insertion_point(tree, selection, NodeKind::Image);
            Plan::new(
                Transaction::user().with(Mutation::InsertNode {
                    parent,
                    index,
                    fragment,
                }),
                After::InsertedNode { index: 0 },
            )
        }

        Command::InsertTable { rows, cols } => {
            let fragment = table_fragment(*rows, *cols, config);
            let (parent, index) = insertion_point(tree, selection, NodeKind::Table);
            Plan::new(
                Transaction::user().with(Mutation::InsertNode {
                    parent,
                    index,
                    fragment,
                }),
                After::Inserted {
                    index: 0,
                    path: vec![0, 0, 0],
                    from: 0,
                    to: 0,
                },
            )
        }

        Command::ToggleBulletList { style } => {
            let style = list_style(style.as_deref(), BULLET_STYLES)?;
            toggle_list(tree, selection, NodeKind::BulletList, style)?
        }

        Command::ToggleOrderedList { style } => {
            let style = list_style(style.as_deref(), ORDERED_STYLES)?;
            toggle_list(tree, selection, NodeKind::OrderedList, style)?
        }

        Command::ToggleTaskList => toggle_list(tree, selection, NodeKind::TaskList, None)?,

        Command::SetCellBackground { color } => {
            let cell = selection
                .cell(tree)
                .ok_or(EditorError::Selection("a table cell"))?;
            let color = color.as_deref().map(str::trim).filter(|c| !c.is_empty());
            Plan::new(
                Transaction::user().with(Mutation::set_attribute(cell, "background", color)),
                After::Keep,
            )
        }

        Command::SetTableBorder {
            width,
            style,
            color,
        } => {
            let table = selection.table(tree).ok_or(EditorError::Selection("a table"))?;
            Plan::new(
                table_geometry::set_border(tree, table, width, style, color)?,
                After::Keep,
            )
        }

        Command::ResizeColumn { column, width } => {
            let table = selection.table(tree).ok_or(EditorError::Selection("a table"))?;
            Plan::new(
                table_geometry::resize_column(tree, table, *column, *width, config)?,
                After::Keep,
            )
        }

        Command::ToggleMark { mark } => {
            let (block, from, to) = format_range(tree, selection)?;
            let mutation = if tree.range_has_mark(block, from, to, mark) {
                Mutation::RemoveMark {
                    block,
                    from,
                    to,
                    mark: mark.clone(),
                }
            } else {
                Mutation::AddMark {
                    block,
                    from,
                    to,
                    mark: mark.clone(),
                }
            };
            Plan::new(Transaction::user().with(mutation), After::Keep)
        }

        Command::SetFontSize { size } => {
            let size = non_empty(size.as_deref());
            let mut transaction = text_style(tree, selection, |v| Mark::font_size(v), size)?;
            let block = transaction_block(&transaction);
            // Task items derive their size from the text; list items store it
            let item = block
                .and_then(|b| tree.find_ancestor(b, NodeKind::is_list_item))
                .filter(|item| tree.kind(*item) == Some(NodeKind::ListItem));
            if let Some(item) = item {
                transaction.push(Mutation::set_attribute(item, "fontSize", size));
            }
            Plan::new(transaction, After::Keep)
        }

        Command::SetTextColor { color } => {
            let color = non_empty(color.as_deref());
            let mut transaction = text_style(tree, selection, |v| Mark::color(v), color)?;
            let block = transaction_block(&transaction);
            if let Some(item) = block.and_then(|b| tree.find_ancestor(b, NodeKind::is_list_item)) {
                transaction.push(Mutation::set_attribute(item, "textColor", color));
            }
            Plan::new(transaction, After::Keep)
        }

        Command::SetChecked { checked } => {
            let item = selection
                .anchor()
                .and_then(|anchor| tree.find_ancestor(anchor, |k| k == NodeKind::TaskItem))
                .ok_or(EditorError::Selection("a task item"))?;
            Plan::new(
                Transaction::user().with(Mutation::set_attribute(item, "checked", *checked)),
                After::Keep,
            )
        }

        Command::SetAttribute { name, value } => {
            let node = selection.anchor().ok_or(EditorError::Selection("a node"))?;
            Plan::new(
                Transaction::user().with(Mutation::set_attribute(node, name, value.clone())),
                After::Keep,
            )
        }

        Command::DeleteSelection => delete_selection(tree, selection)?,

        Command::RotateImage { .. }
        | Command::MirrorImage { .. }
        | Command::ResizeNode { .. }
        | Command::Select { .. }
        | Command::Undo
        | Command::Redo => {
            return Err(EditorError::invalid_argument(format!(
                "{} is not a document edit",
                command.name()
            )))
        }
    };

    Ok(Plan {
        transaction: described(plan.transaction),
        after: plan.after,
    })
}

/// Where a new block of `kind` goes: right after the nearest block around
/// the selection whose parent accepts `kind`, or at the end of the document
pub fn insertion_point(tree: &Tree, selection: &Selection, kind: NodeKind) -> (NodeId, usize) {
    let root = tree.root();
    let mut current = selection.anchor().filter(|id| tree.contains(*id));
    while let Some(node) = current {
        if node == root {
            break;
        }
        if let (Some(parent), Some(index)) = (tree.parent(node), tree.index_in_parent(node)) {
            let block = tree.kind(node).is_some_and(NodeKind::is_block);
            if block && tree.kind(parent).is_some_and(|p| p.accepts_child(kind)) {
                return (parent, index + 1);
            }
        }
        current = tree.parent(node);
    }
    (root, tree.children(root).len())
}

fn image_fragment(attrs: &BTreeMap<String, AttrValue>) -> Result<Fragment, EditorError> {
    let mut fragment = Fragment::new(NodeKind::Image);
    for (name, value) in attrs {
        let spec = schema::spec(NodeKind::Image, name)
            .ok_or_else(|| EditorError::invalid_argument(format!("unknown image attribute {:?}", name)))?;
        let value = spec.coerce(value.clone()).ok_or_else(|| {
            EditorError::invalid_argument(format!("invalid value {} for {:?}", value, name))
        })?;
        fragment.attrs.insert(name.clone(), value);
    }
    match fragment.attr("src").as_str() {
        Some(src) if !src.trim().is_empty() => Ok(fragment),
        _ => Err(EditorError::invalid_argument("insertImage requires a src")),
    }
}

/// A `rows` x `cols` table, clamped to the configured limits, with equal
/// default column widths and an empty paragraph per cell
pub fn table_fragment(rows: usize, cols: usize, config: &EditorConfig) -> Fragment {
    let rows = rows.clamp(1, config.max_table_rows.max(1));
    let cols = cols.clamp(1, config.max_table_cols.max(1));
    let cell = Fragment::new(NodeKind::TableCell)
        .with_attr("colwidth", AttrValue::Widths(vec![config.default_column_width]))
        .with_child(Fragment::paragraph(""));
    let row = Fragment::new(NodeKind::TableRow).with_children(std::iter::repeat(cell).take(cols));
    Fragment::new(NodeKind::Table).with_children(std::iter::repeat(row).take(rows))
}

fn list_style(requested: Option<&str>, allowed: &'static [&'static str]) -> Result<Option<&'static str>, EditorError> {
    match requested {
        None => Ok(allowed.first().copied()),
        Some(style) => allowed
            .iter()
            .find(|candidate| **candidate == style)
            .map(|found| Some(*found))
            .ok_or_else(|| EditorError::invalid_argument(format!("unknown list style {:?}", style))),
    }
}

fn item_kind(list: NodeKind) -> NodeKind {
    if list == NodeKind::TaskList {
        NodeKind::TaskItem
    } else {
        NodeKind::ListItem
    }
}

/// Path of `node` below `ancestor`
fn relative_path(tree: &Tree, ancestor: NodeId, node: NodeId) -> Option<Vec<usize>> {
    let base = tree.path(ancestor)?;
    let full = tree.path(node)?;
    full.strip_prefix(base.as_slice()).map(<[usize]>::to_vec)
}

fn toggle_list(
    tree: &Tree,
    selection: &Selection,
    kind: NodeKind,
    style: Option<&str>,
) -> Result<Plan, EditorError> {
    let block = selection
        .textblock(tree)
        .ok_or(EditorError::Selection("a textblock"))?;
    let (from, to) = match selection.range() {
        Some((_, from, to)) => (from, to),
        None => (0, 0),
    };

    // A cell boundary stops the search: lists around a table are not the
    // list a cell paragraph belongs to
    let container = tree.find_ancestor(block, |k| k.is_list_item() || k.is_cell());
    let item = container.filter(|id| tree.kind(*id).is_some_and(NodeKind::is_list_item));
    let list = item.and_then(|item| tree.parent(item));

    let (Some(item), Some(list)) = (item, list) else {
        return wrap_in_list(tree, block, kind, style, from, to);
    };
    let list_kind = tree.kind(list).ok_or(EditorError::InvalidTarget(list))?;

    if list_kind != kind {
        return convert_list(tree, list, block, kind, style, from, to);
    }

    if let Some(style) = style {
        if tree.attr(list, "listStyle").as_str() != Some(style) {
            return Ok(Plan::new(
                Transaction::user().with(Mutation::set_attribute(list, "listStyle", style)),
                After::Keep,
            ));
        }
    }
    lift_item(tree, list, item, block, from, to)
}

fn list_fragment(kind: NodeKind, style: Option<&str>) -> Fragment {
    let list = Fragment::new(kind);
    match style {
        Some(style) => list.with_attr("listStyle", style),
        None => list,
    }
}

fn wrap_in_list(
    tree: &Tree,
    block: NodeId,
    kind: NodeKind,
    style: Option<&str>,
    from: usize,
    to: usize,
) -> Result<Plan, EditorError> {
    let content = tree.to_fragment(block).ok_or(EditorError::InvalidTarget(block))?;
    let fragment = list_fragment(kind, style).with_child(Fragment::new(item_kind(kind)).with_child(content));
    Ok(Plan::new(
        Transaction::user().with(Mutation::ReplaceNode {
            node: block,
            fragment,
        }),
        After::Inserted {
            index: 0,
            path: vec![0, 0],
            from,
            to,
        },
    ))
}

fn convert_item(tree: &Tree, item: NodeId, kind: NodeKind) -> Option<Fragment> {
    let source = tree.to_fragment(item)?;
    if source.kind == kind {
        return Some(source);
    }
    let mut converted = Fragment::new(kind).with_attr("textColor", source.attr("textColor").clone());
    if kind == NodeKind::ListItem {
        converted = converted.with_attr("fontSize", source.attr("fontSize").clone());
    }
    converted.unknown = source.unknown;
    Some(converted.with_children(source.children))
}

fn convert_list(
    tree: &Tree,
    list: NodeId,
    block: NodeId,
    kind: NodeKind,
    style: Option<&str>,
    from: usize,
    to: usize,
) -> Result<Plan, EditorError> {
    let items = tree
        .children(list)
        .iter()
        .map(|item| convert_item(tree, *item, item_kind(kind)))
        .collect::<Option<Vec<_>>>()
        .ok_or(EditorError::InvalidTarget(list))?;
    let path = relative_path(tree, list, block).ok_or(EditorError::InvalidTarget(block))?;

    Ok(Plan::new(
        Transaction::user().with(Mutation::ReplaceNode {
            node: list,
            fragment: list_fragment(kind, style).with_children(items),
        }),
        After::Inserted {
            index: 0,
            path,
            from,
            to,
        },
    ))
}

/// Move an item's content out of its list, splitting the list around it
fn lift_item(
    tree: &Tree,
    list: NodeId,
    item: NodeId,
    block: NodeId,
    from: usize,
    to: usize,
) -> Result<Plan, EditorError> {
    let parent = tree.parent(list).ok_or(EditorError::InvalidTarget(list))?;
    let list_index = tree.index_in_parent(list).ok_or(EditorError::InvalidTarget(list))?;
    let item_index = tree.index_in_parent(item).ok_or(EditorError::InvalidTarget(item))?;
    let mut shell = tree.to_fragment(list).ok_or(EditorError::InvalidTarget(list))?;
    let mut items = std::mem::take(&mut shell.children);
    let after_items = items.split_off(item_index + 1);
    let lifted = items.pop().ok_or(EditorError::InvalidTarget(item))?;
    let before_items = items;

    let mut fragments = Vec::new();
    if !before_items.is_empty() {
        let mut before = shell.clone();
        before.children = before_items;
        fragments.push(before);
    }
    let first_lifted = fragments.len();
    let lifted_count = lifted.children.len();
    fragments.extend(lifted.children);
    if !after_items.is_empty() {
        let mut after = shell;
        after.children = after_items;
        fragments.push(after);
    }

    let mut transaction = Transaction::user().with(Mutation::RemoveNode { node: list });
    for (offset, fragment) in fragments.into_iter().enumerate() {
        transaction.push(Mutation::InsertNode {
            parent,
            index: list_index + offset,
            fragment,
        });
    }

    // The block sits under one of the item's direct children
    let path = relative_path(tree, item, block).ok_or(EditorError::InvalidTarget(block))?;
    let after = match path.split_first() {
        Some((child, rest)) if *child < lifted_count => After::Inserted {
            index: first_lifted + child,
            path: rest.to_vec(),
            from,
            to,
        },
        _ => After::Clear,
    };
    Ok(Plan::new(transaction, after))
}

/// Range a formatting command applies to; a caret formats its whole block
fn format_range(tree: &Tree, selection: &Selection) -> Result<(NodeId, usize, usize), EditorError> {
    match selection.range() {
        Some((block, from, to)) if from != to => Ok((block, from, to)),
        Some((block, _, _)) => Ok((block, 0, tree.inline_len(block))),
        None => {
            let block = selection
                .textblock(tree)
                .ok_or(EditorError::Selection("text"))?;
            Ok((block, 0, tree.inline_len(block)))
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Add (or with `None` clear) one text-style field over the format range
fn text_style(
    tree: &Tree,
    selection: &Selection,
    mark: fn(String) -> Mark,
    value: Option<&str>,
) -> Result<Transaction, EditorError> {
    let (block, from, to) = format_range(tree, selection)?;
    let mutation = match value {
        Some(value) => Mutation::AddMark {
            block,
            from,
            to,
            mark: mark(value.to_string()),
        },
        // naming the field clears only that field
        None => Mutation::RemoveMark {
            block,
            from,
            to,
            mark: mark(String::new()),
        },
    };
    Ok(Transaction::user().with(mutation))
}

fn transaction_block(transaction: &Transaction) -> Option<NodeId> {
    transaction.mutations.first().map(Mutation::target)
}

fn delete_selection(tree: &Tree, selection: &Selection) -> Result<Plan, EditorError> {
    match *selection {
        Selection::None => Err(EditorError::Selection("anything to delete")),
        Selection::Text { block, .. } => {
            let (_, from, to) = selection.range().ok_or(EditorError::Selection("text"))?;
            let (from, to) = if from == to {
                (from.saturating_sub(1), to)
            } else {
                (from, to)
            };
            let mut transaction = Transaction::user();
            if from < to {
                transaction.push(Mutation::DeleteText { block, from, to });
            }
            Ok(Plan::new(
                transaction,
                After::Text {
                    block,
                    from,
                    to: from,
                },
            ))
        }
        Selection::Node { node } => Ok(Plan::new(
            Transaction::user().with(Mutation::RemoveNode { node }),
            After::Clear,
        )),
        Selection::Cell { cell } => {
            let mut cleared = tree.to_fragment(cell).ok_or(EditorError::InvalidTarget(cell))?;
            cleared.children = vec![Fragment::paragraph("")];
            Ok(Plan::new(
                Transaction::user().with(Mutation::ReplaceNode {
                    node: cell,
                    fragment: cleared,
                }),
                After::Inserted {
                    index: 0,
                    path: vec![0],
                    from: 0,
                    to: 0,
                },
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Document;
    use lectern_parser::parse;
    use std::path::PathBuf;

    fn run(source: &str, selection: impl Fn(&Tree) -> Selection, command: Command) -> (Document, Selection) {
        let mut document = Document::from_source(PathBuf::from("t.html"), source).unwrap();
        let selection = selection(document.tree());
        let plan = plan(&command, document.tree(), &selection, &EditorConfig::default()).unwrap();
        let result = document.apply(plan.transaction).unwrap();
        let next = plan.after.resolve(document.tree(), &result, selection);
        (document, next)
    }

    fn first_block(tree: &Tree) -> Selection {
        Selection::caret(tree.children(tree.root())[0], 0)
    }

    #[test]
    fn test_command_json_shape() {
        let command: Command =
            serde_json::from_str(r#"{ "command": "resizeNode", "handle": "se", "delta": { "x": 10, "y": 5 } }"#)
                .unwrap();
        assert_eq!(
            command,
            Command::ResizeNode {
                handle: Handle::Se,
                delta: Point::new(10.0, 5.0)
            }
        );
        let toggle: Command = serde_json::from_str(r#"{ "command": "toggleTaskList" }"#).unwrap();
        assert_eq!(toggle, Command::ToggleTaskList);
    }

    #[test]
    fn test_insert_table_clamps_and_selects_first_cell() {
        let (document, selection) = run(
            "<p>a</p>",
            first_block,
            Command::InsertTable { rows: 0, cols: 500 },
        );
        let tree = document.tree();
        let table = tree.children(tree.root())[1];
        assert_eq!(tree.children(table).len(), 1);
        assert_eq!(tree.children(tree.children(table)[0]).len(), 20);

        let cell = tree.children(tree.children(table)[0])[0];
        assert_eq!(tree.attr(cell, "colwidth"), &AttrValue::Widths(vec![100]));
        assert_eq!(selection, Selection::caret(tree.children(cell)[0], 0));
    }

    #[test]
    fn test_toggle_bullet_list_wraps_and_lifts() {
        let (mut document, selection) = run("<p>item</p>", first_block, Command::ToggleBulletList { style: None });
        assert_eq!(
            document.source(),
            r#"<ul><li><p>item</p></li></ul>"#
        );

        let config = EditorConfig::default();
        let plan = plan(
            &Command::ToggleBulletList { style: None },
            document.tree(),
            &selection,
            &config,
        )
        .unwrap();
        let result = document.apply(plan.transaction).unwrap();
        assert_eq!(document.source(), "<p>item</p>");
        let lifted = plan.after.resolve(document.tree(), &result, selection);
        assert_eq!(lifted, first_block(document.tree()));
    }

    #[test]
    fn test_toggle_with_new_style_restyles() {
        let (document, _) = run(
            "<ul><li><p>a</p></li></ul>",
            |tree| {
                let list = tree.children(tree.root())[0];
                let item = tree.children(list)[0];
                Selection::caret(tree.children(item)[0], 0)
            },
            Command::ToggleBulletList {
                style: Some("square".into()),
            },
        );
        assert_eq!(
            document.source(),
            r#"<ul data-list-style="square"><li><p>a</p></li></ul>"#
        );
    }

    #[test]
    fn test_lift_splits_list() {
        let (document, _) = run(
            "<ul><li><p>a</p></li><li><p>b</p></li><li><p>c</p></li></ul>",
            |tree| {
                let list = tree.children(tree.root())[0];
                let item = tree.children(list)[1];
                Selection::caret(tree.children(item)[0], 0)
            },
            Command::ToggleBulletList { style: None },
        );
        assert_eq!(
            document.source(),
            "<ul><li><p>a</p></li></ul><p>b</p><ul><li><p>c</p></li></ul>"
        );
    }

    #[test]
    fn test_toggle_task_list_converts_bullets() {
        let (document, selection) = run(
            "<ul><li><p>a</p></li><li><p>b</p></li></ul>",
            |tree| {
                let list = tree.children(tree.root())[0];
                let item = tree.children(list)[1];
                Selection::caret(tree.children(item)[0], 1)
            },
            Command::ToggleTaskList,
        );
        assert_eq!(
            document.source(),
            r#"<ul data-type="taskList"><li data-type="taskItem"><p>a</p></li><li data-type="taskItem"><p>b</p></li></ul>"#
        );
        let tree = document.tree();
        let item = tree.children(tree.children(tree.root())[0])[1];
        assert_eq!(selection, Selection::caret(tree.children(item)[0], 1));
    }

    #[test]
    fn test_set_cell_background_requires_cell() {
        let tree = parse("<p>a</p>").unwrap();
        let result = plan(
            &Command::SetCellBackground {
                color: Some("#eee".into()),
            },
            &tree,
            &first_block(&tree),
            &EditorConfig::default(),
        );
        assert!(matches!(result, Err(EditorError::Selection(_))));
    }

    #[test]
    fn test_toggle_mark_removes_when_present() {
        let (document, _) = run(
            "<p><strong>bold</strong></p>",
            |tree| {
                let block = tree.children(tree.root())[0];
                Selection::Text { block, from: 0, to: 4 }
            },
            Command::ToggleMark { mark: Mark::Bold },
        );
        assert_eq!(document.source(), "<p>bold</p>");
    }

    #[test]
    fn test_set_font_size_on_list_item() {
        let (document, _) = run(
            "<ul><li><p>a</p></li></ul>",
            |tree| {
                let item = tree.children(tree.children(tree.root())[0])[0];
                Selection::caret(tree.children(item)[0], 0)
            },
            Command::SetFontSize {
                size: Some("18px".into()),
            },
        );
        assert_eq!(
            document.source(),
            r#"<ul><li data-font-size="18px"><p><span style="font-size: 18px">a</span></p></li></ul>"#
        );
    }

    #[test]
    fn test_insert_image_requires_src() {
        let tree = parse("<p>a</p>").unwrap();
        let result = plan(
            &Command::InsertImage {
                attrs: BTreeMap::new(),
            },
            &tree,
            &Selection::None,
            &EditorConfig::default(),
        );
        assert!(matches!(result, Err(EditorError::InvalidArgument(_))));
    }

    #[test]
    fn test_delete_text_range() {
        let (document, selection) = run(
            "<p>hello</p>",
            |tree| {
                let block = tree.children(tree.root())[0];
                Selection::Text { block, from: 1, to: 4 }
            },
            Command::DeleteSelection,
        );
        assert_eq!(document.source(), "<p>ho</p>");
        let block = document.tree().children(document.tree().root())[0];
        assert_eq!(selection, Selection::caret(block, 1));
    }

    #[test]
    fn test_insertion_point_skips_inline_parents() {
        let tree = parse(r#"<p>a<img src="x.png">b</p>"#).unwrap();
        let paragraph = tree.children(tree.root())[0];
        let image = tree.children(paragraph)[1];
        assert_eq!(
            insertion_point(&tree, &Selection::Node { node: image }, NodeKind::Paragraph),
            (tree.root(), 1)
        );
    }
}
