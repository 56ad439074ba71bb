//! Editor selection.
//!
//! Offsets inside a textblock are inline offsets: characters of text runs,
//! one for each inline leaf (hard break, inline image).

use lectern_parser::{NodeId, NodeKind, Tree};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Selection {
    #[default]
    None,
    /// Range inside one textblock; `from == to` is a caret
    Text { block: NodeId, from: usize, to: usize },
    /// A whole node, e.g. a clicked image or table
    Node { node: NodeId },
    /// A table cell
    Cell { cell: NodeId },
}

impl Selection {
    pub fn caret(block: NodeId, offset: usize) -> Self {
        Selection::Text {
            block,
            from: offset,
            to: offset,
        }
    }

    /// Whether the selection still points into `tree`
    pub fn is_valid(&self, tree: &Tree) -> bool {
        match *self {
            Selection::None => true,
            Selection::Text { block, from, to } => {
                tree.kind(block).is_some_and(NodeKind::is_textblock)
                    && from.max(to) <= tree.inline_len(block)
            }
            Selection::Node { node } => tree.contains(node),
            Selection::Cell { cell } => tree.kind(cell).is_some_and(NodeKind::is_cell),
        }
    }

    /// The node the selection starts from
    pub fn anchor(&self) -> Option<NodeId> {
        match *self {
            Selection::None => None,
            Selection::Text { block, .. } => Some(block),
            Selection::Node { node } => Some(node),
            Selection::Cell { cell } => Some(cell),
        }
    }

    /// Ordered range, if this is a text selection
    pub fn range(&self) -> Option<(NodeId, usize, usize)> {
        match *self {
            Selection::Text { block, from, to } => Some((block, from.min(to), from.max(to))),
            _ => None,
        }
    }

    /// Textblock the selection sits in; a selected cell resolves to its
    /// first paragraph
    pub fn textblock(&self, tree: &Tree) -> Option<NodeId> {
        match *self {
            Selection::Text { block, .. } => Some(block),
            Selection::Cell { cell } => tree
                .descendants(cell)
                .into_iter()
                .find(|id| tree.kind(*id).is_some_and(NodeKind::is_textblock)),
            _ => None,
        }
    }

    /// The selected image
    pub fn image(&self, tree: &Tree) -> Option<NodeId> {
        match *self {
            Selection::Node { node } if tree.kind(node) == Some(NodeKind::Image) => Some(node),
            _ => None,
        }
    }

    /// Nearest table containing (or being) the selection
    pub fn table(&self, tree: &Tree) -> Option<NodeId> {
        let anchor = self.anchor()?;
        tree.find_ancestor(anchor, |kind| kind == NodeKind::Table)
    }

    /// Nearest cell containing the selection
    pub fn cell(&self, tree: &Tree) -> Option<NodeId> {
        let anchor = self.anchor()?;
        tree.find_ancestor(anchor, NodeKind::is_cell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lectern_parser::parse;

    #[test]
    fn test_cell_and_table_lookup() {
        let tree = parse("<table><tr><td><p>a</p></td></tr></table>").unwrap();
        let table = tree.children(tree.root())[0];
        let cell = tree.children(tree.children(table)[0])[0];
        let paragraph = tree.children(cell)[0];

        let selection = Selection::caret(paragraph, 1);
        assert_eq!(selection.cell(&tree), Some(cell));
        assert_eq!(selection.table(&tree), Some(table));
        assert_eq!(Selection::Cell { cell }.textblock(&tree), Some(paragraph));
    }

    #[test]
    fn test_stale_selection_is_invalid() {
        let mut tree = parse("<p>abc</p><p>d</p>").unwrap();
        let first = tree.children(tree.root())[0];
        let selection = Selection::Text {
            block: first,
            from: 0,
            to: 3,
        };
        assert!(selection.is_valid(&tree));
        assert!(!Selection::Text { block: first, from: 0, to: 9 }.is_valid(&tree));

        tree.remove(first).unwrap();
        assert!(!selection.is_valid(&tree));
    }

    #[test]
    fn test_range_is_ordered() {
        let tree = parse("<p>abc</p>").unwrap();
        let block = tree.children(tree.root())[0];
        let selection = Selection::Text { block, from: 3, to: 1 };
        assert_eq!(selection.range(), Some((block, 1, 3)));
    }
}
