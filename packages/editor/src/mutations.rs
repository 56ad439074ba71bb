//! # Document Mutations
//!
//! The primitive edits a transaction is made of.
//!
//! ## Design Principles
//!
//! 1. **Validated**: every mutation checks its targets and the content
//!    rules before touching the tree
//! 2. **Id-addressed**: targets are arena [`NodeId`]s, so a mutation built
//!    against an older tree fails cleanly instead of hitting the wrong node
//! 3. **Minimal**: commands compose these; nothing here knows about lists,
//!    tables or images
//!
//! ## Derived attributes
//!
//! Attributes the schema marks as derived belong to the synchronization
//! passes. A `SetAttribute` on one of them is rejected unless the
//! transaction originates from a sync pass.

use crate::transaction::Origin;
use lectern_parser::{schema, AttrValue, Fragment, Mark, NodeId, NodeKind, Tree, TreeError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Mutation {
    /// Insert a detached subtree as the `index`-th child of `parent`
    InsertNode {
        parent: NodeId,
        index: usize,
        fragment: Fragment,
    },

    /// Remove a node and all of its descendants
    RemoveNode { node: NodeId },

    /// Swap a subtree for another one at the same position
    ReplaceNode { node: NodeId, fragment: Fragment },

    SetAttribute {
        node: NodeId,
        name: String,
        value: AttrValue,
    },

    AddMark {
        block: NodeId,
        from: usize,
        to: usize,
        mark: Mark,
    },

    RemoveMark {
        block: NodeId,
        from: usize,
        to: usize,
        mark: Mark,
    },

    InsertText {
        block: NodeId,
        offset: usize,
        text: String,
    },

    DeleteText {
        block: NodeId,
        from: usize,
        to: usize,
    },

    SetKind { node: NodeId, kind: NodeKind },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MutationError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("'{name}' on <{kind}> is derived and cannot be set directly")]
    DerivedAttribute { kind: NodeKind, name: String },

    #[error(transparent)]
    Tree(#[from] TreeError),
}

/// Part of the tree a mutation touched, for scoped synchronization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Touched {
    /// The node and its ancestors
    Node(NodeId),
    /// The node, its ancestors and every descendant
    Subtree(NodeId),
}

impl Mutation {
    /// Apply to a tree with validation. Returns the id of the node an
    /// insert or replace created.
    pub fn apply(&self, tree: &mut Tree) -> Result<Option<NodeId>, MutationError> {
        match self {
            Mutation::InsertNode {
                parent,
                index,
                fragment,
            } => Ok(Some(tree.insert_fragment(*parent, *index, fragment)?)),

            Mutation::RemoveNode { node } => {
                tree.remove(*node)?;
                Ok(None)
            }

            Mutation::ReplaceNode { node, fragment } => Ok(Some(tree.replace(*node, fragment)?)),

            Mutation::SetAttribute { node, name, value } => {
                tree.set_attr(*node, name, value.clone())?;
                Ok(None)
            }

            Mutation::AddMark {
                block,
                from,
                to,
                mark,
            } => {
                tree.set_mark(*block, *from, *to, mark, true)?;
                Ok(None)
            }

            Mutation::RemoveMark {
                block,
                from,
                to,
                mark,
            } => {
                tree.set_mark(*block, *from, *to, mark, false)?;
                Ok(None)
            }

            Mutation::InsertText {
                block,
                offset,
                text,
            } => {
                tree.insert_text(*block, *offset, text)?;
                Ok(None)
            }

            Mutation::DeleteText { block, from, to } => {
                tree.delete_text(*block, *from, *to)?;
                Ok(None)
            }

            Mutation::SetKind { node, kind } => {
                tree.set_kind(*node, *kind)?;
                Ok(None)
            }
        }
    }

    /// Validate without applying
    pub fn validate(&self, tree: &Tree, origin: Origin) -> Result<(), MutationError> {
        let target = self.target();
        let node = tree.get(target).ok_or(MutationError::NodeNotFound(target))?;

        if let Mutation::SetAttribute { name, .. } = self {
            let derived = schema::spec(node.kind(), name).is_some_and(|spec| spec.is_derived());
            if derived && origin != Origin::Sync {
                return Err(MutationError::DerivedAttribute {
                    kind: node.kind(),
                    name: name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Node the mutation is addressed to
    pub fn target(&self) -> NodeId {
        match self {
            Mutation::InsertNode { parent, .. } => *parent,
            Mutation::RemoveNode { node }
            | Mutation::ReplaceNode { node, .. }
            | Mutation::SetAttribute { node, .. }
            | Mutation::SetKind { node, .. } => *node,
            Mutation::AddMark { block, .. }
            | Mutation::RemoveMark { block, .. }
            | Mutation::InsertText { block, .. }
            | Mutation::DeleteText { block, .. } => *block,
        }
    }

    /// What this mutation touches, computed before it is applied.
    /// Inserted subtrees are reported by the caller once their ids exist.
    pub fn touched(&self, tree: &Tree) -> Option<Touched> {
        match self {
            Mutation::InsertNode { .. } | Mutation::ReplaceNode { .. } => None,
            Mutation::RemoveNode { node } => tree.parent(*node).map(Touched::Node),
            Mutation::SetAttribute { node, .. } | Mutation::SetKind { node, .. } => {
                Some(Touched::Subtree(*node))
            }
            Mutation::AddMark { block, .. }
            | Mutation::RemoveMark { block, .. }
            | Mutation::InsertText { block, .. }
            | Mutation::DeleteText { block, .. } => Some(Touched::Node(*block)),
        }
    }

    pub fn set_attribute(node: NodeId, name: &str, value: impl Into<AttrValue>) -> Self {
        Mutation::SetAttribute {
            node,
            name: name.to_string(),
            value: value.into(),
        }
    }
}

/// Result of applying a transaction
#[derive(Debug, Clone)]
pub struct MutationResult {
    /// New version number
    pub version: u64,

    /// Every mutation applied, synchronization follow-ups last
    pub applied: Vec<Mutation>,

    /// How many of `applied` came from synchronization passes
    pub synced: usize,

    /// Roots of inserted subtrees, in mutation order
    pub inserted: Vec<NodeId>,
}
