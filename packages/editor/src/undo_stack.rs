//! # Undo/Redo Stack
//!
//! Tracks committed transactions and restores earlier trees.
//!
//! ## Design
//!
//! - Each batch keeps the settled tree from before and after its commit
//! - Undo swaps the `before` snapshot back in; redo swaps `after` in
//! - New commits clear the redo stack
//! - Snapshots are already settled, so no synchronization pass runs
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut stack = UndoStack::new();
//! let before = doc.tree().clone();
//! let result = doc.apply(transaction)?;
//! stack.record(before, doc.tree().clone(), result.applied, None);
//!
//! stack.undo(&mut doc);
//! stack.redo(&mut doc);
//! ```

use crate::{Document, Mutation};
use lectern_parser::Tree;

/// One committed transaction as undo sees it
#[derive(Debug, Clone)]
pub struct MutationBatch {
    /// Tree before the commit
    pub before: Tree,

    /// Tree right after the commit, follow-ups included
    pub after: Tree,

    /// Mutations the commit applied, in order
    pub mutations: Vec<Mutation>,

    pub description: Option<String>,
}

/// Undo/redo stack for document editing
#[derive(Debug)]
pub struct UndoStack {
    /// Most recent last
    undo_stack: Vec<MutationBatch>,

    /// Most recently undone last
    redo_stack: Vec<MutationBatch>,

    /// Maximum number of undo levels (0 = unlimited)
    max_levels: usize,
}

impl UndoStack {
    /// Create a new undo stack with default max levels (100)
    pub fn new() -> Self {
        Self::with_max_levels(100)
    }

    pub fn with_max_levels(max_levels: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_levels,
        }
    }

    /// Record a commit
    pub fn record(
        &mut self,
        before: Tree,
        after: Tree,
        mutations: Vec<Mutation>,
        description: Option<String>,
    ) {
        self.push_batch(MutationBatch {
            before,
            after,
            mutations,
            description,
        });
    }

    fn push_batch(&mut self, batch: MutationBatch) {
        self.undo_stack.push(batch);

        if self.max_levels > 0 && self.undo_stack.len() > self.max_levels {
            self.undo_stack.remove(0);
        }

        // A new action invalidates the undone future
        self.redo_stack.clear();
    }

    /// Undo the most recent batch. Returns whether anything was undone.
    pub fn undo(&mut self, doc: &mut Document) -> bool {
        let Some(batch) = self.undo_stack.pop() else {
            return false;
        };
        doc.restore(batch.before.clone());
        self.redo_stack.push(batch);
        true
    }

    /// Redo the most recently undone batch
    pub fn redo(&mut self, doc: &mut Document) -> bool {
        let Some(batch) = self.redo_stack.pop() else {
            return false;
        };
        doc.restore(batch.after.clone());
        self.undo_stack.push(batch);
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_levels(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_levels(&self) -> usize {
        self.redo_stack.len()
    }

    /// Clear all undo/redo history
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    /// Get description of the next undo operation
    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack
            .last()
            .and_then(|batch| batch.description.as_deref())
    }

    /// Get description of the next redo operation
    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack
            .last()
            .and_then(|batch| batch.description.as_deref())
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::Transaction;
    use lectern_parser::Fragment;
    use std::path::PathBuf;

    fn commit(stack: &mut UndoStack, doc: &mut Document, text: &str) {
        let before = doc.tree().clone();
        let root = doc.tree().root();
        let index = doc.tree().children(root).len();
        let result = doc
            .apply(
                Transaction::user()
                    .with(Mutation::InsertNode {
                        parent: root,
                        index,
                        fragment: Fragment::paragraph(text),
                    })
                    .describe(format!("add {}", text)),
            )
            .unwrap();
        stack.record(before, doc.tree().clone(), result.applied, Some(format!("add {}", text)));
    }

    fn document() -> Document {
        Document::from_source(PathBuf::from("test.html"), "<p>start</p>").unwrap()
    }

    #[test]
    fn test_undo_stack_creation() {
        let stack = UndoStack::new();
        assert_eq!(stack.undo_levels(), 0);
        assert_eq!(stack.redo_levels(), 0);
        assert!(!stack.can_undo());
        assert!(!stack.can_redo());
    }

    #[test]
    fn test_undo_and_redo_restore_snapshots() {
        let mut doc = document();
        let mut stack = UndoStack::new();

        commit(&mut stack, &mut doc, "one");
        assert_eq!(doc.source(), "<p>start</p><p>one</p>");
        assert_eq!(stack.undo_description(), Some("add one"));

        assert!(stack.undo(&mut doc));
        assert_eq!(doc.source(), "<p>start</p>");
        assert_eq!(stack.redo_levels(), 1);

        assert!(stack.redo(&mut doc));
        assert_eq!(doc.source(), "<p>start</p><p>one</p>");
        assert_eq!(stack.undo_levels(), 1);
    }

    #[test]
    fn test_empty_stacks_do_nothing() {
        let mut doc = document();
        let mut stack = UndoStack::new();
        assert!(!stack.undo(&mut doc));
        assert!(!stack.redo(&mut doc));
        assert_eq!(doc.version, 0);
    }

    #[test]
    fn test_new_commit_clears_redo() {
        let mut doc = document();
        let mut stack = UndoStack::new();

        commit(&mut stack, &mut doc, "one");
        stack.undo(&mut doc);
        assert_eq!(stack.redo_levels(), 1);

        commit(&mut stack, &mut doc, "two");
        assert_eq!(stack.redo_levels(), 0);
    }

    #[test]
    fn test_max_levels_enforced() {
        let mut doc = document();
        let mut stack = UndoStack::with_max_levels(2);

        for text in ["a", "b", "c"] {
            commit(&mut stack, &mut doc, text);
        }

        assert_eq!(stack.undo_levels(), 2);
        assert_eq!(stack.undo_description(), Some("add c"));
    }
}
