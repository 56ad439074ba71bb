//! # Synchronization Passes
//!
//! Mutations can break invariants that span several nodes. After the
//! mutations of a transaction are applied to the draft tree, every
//! registered [`PostEffect`] inspects the draft and returns the follow-up
//! mutations that restore its invariant. The follow-ups join the same
//! transaction, so no reader ever observes the tree between an edit and
//! its synchronization.
//!
//! Post-effects are:
//! - **Deterministic**: the same tree always yields the same follow-ups
//! - **Idempotent**: on a settled tree they return nothing
//! - **Infallible**: a value that cannot be computed is left as it is
//!
//! Registered passes, in order:
//! - [`MarkerBoldSync`]: `listItem.markerBold` follows the boldness of the
//!   item's text
//! - [`TaskFontSizeSync`]: `taskItem.fontSize` comes from the item's own
//!   text, else from the preceding task item
//! - [`CellBorderSync`]: every cell's `cellBorder` mirrors its table's
//!   border attributes

use crate::config::SyncScope;
use crate::mutations::{Mutation, Touched};
use lectern_parser::{AttrValue, Mark, NodeId, NodeKind, Tree};
use std::collections::BTreeSet;

/// Upper bound on settle rounds; one round settles every registered pass
const MAX_ROUNDS: usize = 4;

/// Nodes a synchronization pass should look at
#[derive(Debug, Clone, PartialEq)]
pub enum Scope {
    Document,
    Nodes(BTreeSet<NodeId>),
}

impl Scope {
    /// Build the scope for a transaction from what its mutations touched
    pub fn from_touched(tree: &Tree, touched: &[Touched]) -> Self {
        let mut nodes = BTreeSet::new();
        for touch in touched {
            let (id, deep) = match *touch {
                Touched::Node(id) => (id, false),
                Touched::Subtree(id) => (id, true),
            };
            if !tree.contains(id) {
                continue;
            }
            nodes.insert(id);
            nodes.extend(tree.ancestors(id));
            if deep {
                nodes.extend(tree.descendants(id));
            }
        }
        Scope::Nodes(nodes)
    }

    pub fn for_setting(setting: SyncScope, tree: &Tree, touched: &[Touched]) -> Self {
        match setting {
            SyncScope::Document => Scope::Document,
            SyncScope::Changed => Scope::from_touched(tree, touched),
        }
    }

    pub fn includes(&self, id: NodeId) -> bool {
        match self {
            Scope::Document => true,
            Scope::Nodes(nodes) => nodes.contains(&id),
        }
    }
}

/// Synchronization pass run after every transaction
pub trait PostEffect: std::fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    /// Follow-up mutations that bring the scoped part of `tree` in line
    fn analyze(&self, tree: &Tree, scope: &Scope) -> Vec<Mutation>;
}

/// `markerBold` is true iff the item has at least one non-whitespace text
/// run and every such run is bold
#[derive(Debug)]
pub struct MarkerBoldSync;

impl PostEffect for MarkerBoldSync {
    fn name(&self) -> &'static str {
        "markerBold"
    }

    fn analyze(&self, tree: &Tree, scope: &Scope) -> Vec<Mutation> {
        tree.nodes_of_kind(NodeKind::ListItem)
            .into_iter()
            .filter(|item| scope.includes(*item))
            .filter_map(|item| {
                let expected = marker_bold(tree, item);
                let stored = tree.attr(item, "markerBold").as_bool();
                (stored != Some(expected))
                    .then(|| Mutation::set_attribute(item, "markerBold", expected))
            })
            .collect()
    }
}

/// Boldness a list item's marker should have
pub fn marker_bold(tree: &Tree, item: NodeId) -> bool {
    let mut runs = tree
        .descendants(item)
        .into_iter()
        .filter_map(|id| tree.get(id))
        .filter(|node| node.kind() == NodeKind::Text && !node.text().trim().is_empty())
        .peekable();
    if runs.peek().is_none() {
        return false;
    }
    runs.all(|node| node.has_mark(&Mark::Bold))
}

/// Task item font sizes, inherited down each task list
#[derive(Debug)]
pub struct TaskFontSizeSync;

impl PostEffect for TaskFontSizeSync {
    fn name(&self) -> &'static str {
        "taskFontSize"
    }

    fn analyze(&self, tree: &Tree, scope: &Scope) -> Vec<Mutation> {
        let mut mutations = Vec::new();
        for list in tree.nodes_of_kind(NodeKind::TaskList) {
            if !scope.includes(list) {
                continue;
            }
            for (item, expected) in task_font_sizes(tree, list) {
                if *tree.attr(item, "fontSize") != expected {
                    mutations.push(Mutation::set_attribute(item, "fontSize", expected));
                }
            }
        }
        mutations
    }
}

/// Resolved `fontSize` for every item of a task list, in order. Computed
/// sequentially so each item sees its predecessor's resolved value.
pub fn task_font_sizes(tree: &Tree, list: NodeId) -> Vec<(NodeId, AttrValue)> {
    let mut inherited = AttrValue::Null;
    let mut out = Vec::new();
    for item in tree.children(list) {
        if tree.kind(*item) != Some(NodeKind::TaskItem) {
            continue;
        }
        let resolved = match font_size_from_text(tree, *item) {
            Some(size) => AttrValue::Str(size),
            None => inherited.clone(),
        };
        inherited = resolved.clone();
        out.push((*item, resolved));
    }
    out
}

/// Last explicit font size among the item's own text runs. Nested lists
/// belong to their own items and are skipped.
pub fn font_size_from_text(tree: &Tree, item: NodeId) -> Option<String> {
    let mut found = None;
    let mut stack: Vec<NodeId> = tree.children(item).iter().rev().copied().collect();
    while let Some(id) = stack.pop() {
        let Some(node) = tree.get(id) else {
            continue;
        };
        if node.kind().is_list() {
            continue;
        }
        if let Some(size) = node.font_size_mark() {
            found = Some(size.to_string());
        }
        stack.extend(node.children().iter().rev().copied());
    }
    found
}

/// Cells render the border their table declares
#[derive(Debug)]
pub struct CellBorderSync;

impl PostEffect for CellBorderSync {
    fn name(&self) -> &'static str {
        "cellBorder"
    }

    fn analyze(&self, tree: &Tree, scope: &Scope) -> Vec<Mutation> {
        let mut mutations = Vec::new();
        for table in tree.nodes_of_kind(NodeKind::Table) {
            if !scope.includes(table) {
                continue;
            }
            let expected = AttrValue::Str(cell_border(tree, table));
            for row in tree.children(table) {
                for cell in tree.children(*row) {
                    if *tree.attr(*cell, "cellBorder") != expected {
                        mutations.push(Mutation::set_attribute(*cell, "cellBorder", expected.clone()));
                    }
                }
            }
        }
        mutations
    }
}

/// CSS border shorthand for a table's cells
pub fn cell_border(tree: &Tree, table: NodeId) -> String {
    format!(
        "{} {} {}",
        tree.attr(table, "borderWidth"),
        tree.attr(table, "borderStyle"),
        tree.attr(table, "borderColor")
    )
}

/// Post-effect engine that applies all registered effects
#[derive(Debug)]
pub struct PostEffectEngine {
    effects: Vec<Box<dyn PostEffect>>,
}

impl PostEffectEngine {
    /// Create engine with default effects
    pub fn new() -> Self {
        Self {
            effects: vec![
                Box::new(MarkerBoldSync),
                Box::new(TaskFontSizeSync),
                Box::new(CellBorderSync),
            ],
        }
    }

    /// Engine with no effects registered
    pub fn empty() -> Self {
        Self {
            effects: Vec::new(),
        }
    }

    pub fn register(&mut self, effect: Box<dyn PostEffect>) {
        self.effects.push(effect);
    }

    /// Analyze a tree and collect every follow-up without applying
    pub fn analyze(&self, tree: &Tree, scope: &Scope) -> Vec<Mutation> {
        let mut follow_ups = Vec::new();
        for effect in &self.effects {
            follow_ups.append(&mut effect.analyze(tree, scope));
        }
        follow_ups
    }

    /// Run every effect against `tree` until it is settled, returning the
    /// follow-ups that were applied
    pub fn settle(&self, tree: &mut Tree, scope: &Scope) -> Vec<Mutation> {
        let mut applied = Vec::new();

        for _ in 0..MAX_ROUNDS {
            let mut changed = false;
            for effect in &self.effects {
                for mutation in effect.analyze(tree, scope) {
                    match mutation.apply(tree) {
                        Ok(_) => {
                            tracing::debug!(effect = effect.name(), target = %mutation.target(), "sync step");
                            applied.push(mutation);
                            changed = true;
                        }
                        Err(err) => {
                            tracing::warn!(effect = effect.name(), %err, "sync step skipped");
                        }
                    }
                }
            }
            if !changed {
                break;
            }
        }

        applied
    }
}

impl Default for PostEffectEngine {
    fn default() -> Self {
        Self::new()
    }
}
