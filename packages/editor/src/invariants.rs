//! Document-wide consistency checks.
//!
//! A settled document satisfies every check here; `lectern check` and the
//! property tests use [`check`] to find documents that do not.

use crate::post_effects::{cell_border, marker_bold, task_font_sizes};
use lectern_parser::{parse, serialize, AttrValue, NodeId, NodeKind, Tree};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Violation {
    #[error("serialized document no longer parses: {0}")]
    Unparseable(String),

    #[error("document changes across a serialize/parse round trip")]
    RoundTrip,

    #[error("list item {node}: markerBold is {stored}, its text says {expected}")]
    MarkerBold {
        node: NodeId,
        stored: AttrValue,
        expected: bool,
    },

    #[error("task item {node}: fontSize is {stored}, expected {expected}")]
    TaskFontSize {
        node: NodeId,
        stored: AttrValue,
        expected: AttrValue,
    },

    #[error("image {node}: rotation {rotation} is not a right angle")]
    Rotation { node: NodeId, rotation: AttrValue },

    #[error("cell {node}: {widths} column widths for a colspan of {colspan}")]
    ColumnWidths {
        node: NodeId,
        widths: usize,
        colspan: i64,
    },

    #[error("cell {node}: cellBorder is {stored}, its table declares {expected}")]
    CellBorder {
        node: NodeId,
        stored: AttrValue,
        expected: String,
    },
}

/// Every violation in `tree`, in document order per check
pub fn check(tree: &Tree) -> Vec<Violation> {
    let mut violations = Vec::new();
    check_round_trip(tree, &mut violations);
    check_list_items(tree, &mut violations);
    check_task_lists(tree, &mut violations);
    check_images(tree, &mut violations);
    check_tables(tree, &mut violations);
    violations
}

fn check_round_trip(tree: &Tree, violations: &mut Vec<Violation>) {
    match parse(&serialize(tree)) {
        Ok(reparsed) if reparsed.structurally_eq(tree) => {}
        Ok(_) => violations.push(Violation::RoundTrip),
        Err(err) => violations.push(Violation::Unparseable(err.to_string())),
    }
}

fn check_list_items(tree: &Tree, violations: &mut Vec<Violation>) {
    for item in tree.nodes_of_kind(NodeKind::ListItem) {
        let expected = marker_bold(tree, item);
        let stored = tree.attr(item, "markerBold");
        if stored.as_bool() != Some(expected) {
            violations.push(Violation::MarkerBold {
                node: item,
                stored: stored.clone(),
                expected,
            });
        }
    }
}

fn check_task_lists(tree: &Tree, violations: &mut Vec<Violation>) {
    for list in tree.nodes_of_kind(NodeKind::TaskList) {
        for (item, expected) in task_font_sizes(tree, list) {
            let stored = tree.attr(item, "fontSize");
            if *stored != expected {
                violations.push(Violation::TaskFontSize {
                    node: item,
                    stored: stored.clone(),
                    expected,
                });
            }
        }
    }
}

fn check_images(tree: &Tree, violations: &mut Vec<Violation>) {
    for image in tree.nodes_of_kind(NodeKind::Image) {
        let rotation = tree.attr(image, "rotation");
        if !matches!(rotation.as_int(), Some(0 | 90 | 180 | 270)) {
            violations.push(Violation::Rotation {
                node: image,
                rotation: rotation.clone(),
            });
        }
    }
}

fn check_tables(tree: &Tree, violations: &mut Vec<Violation>) {
    for table in tree.nodes_of_kind(NodeKind::Table) {
        let expected = cell_border(tree, table);
        for row in tree.children(table) {
            for cell in tree.children(*row) {
                let colspan = tree.attr(*cell, "colspan").as_int().unwrap_or(1);
                if let Some(widths) = tree.attr(*cell, "colwidth").as_widths() {
                    if widths.len() as i64 != colspan {
                        violations.push(Violation::ColumnWidths {
                            node: *cell,
                            widths: widths.len(),
                            colspan,
                        });
                    }
                }
                let stored = tree.attr(*cell, "cellBorder");
                if stored.as_str() != Some(expected.as_str()) {
                    violations.push(Violation::CellBorder {
                        node: *cell,
                        stored: stored.clone(),
                        expected: expected.clone(),
                    });
                }
            }
        }
    }
}
