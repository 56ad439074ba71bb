//! # Document Tree
//!
//! Arena of typed nodes addressed by generational indices.
//!
//! Every node lives in a slot of a flat vector; parents and children refer
//! to each other by [`NodeId`]. Removing a node frees its slot and bumps the
//! slot generation, so an id captured before a deletion never resolves to a
//! node created afterwards. Code holding an id across an asynchronous
//! boundary re-validates it with [`Tree::get`] instead of trusting it.
//!
//! Inline content is kept canonical: text nodes are never empty and two
//! adjacent text nodes never carry the same marks.

use crate::ast::{add_mark, remove_mark, AttrValue, Fragment, Mark, NodeKind};
use crate::error::TreeError;
use crate::schema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

static NULL: AttrValue = AttrValue::Null;

/// Stable handle to a node in a [`Tree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    pub fn index(self) -> u32 {
        self.index
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// A live node
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    kind: NodeKind,
    attrs: BTreeMap<String, AttrValue>,
    unknown: Vec<(String, String)>,
    text: String,
    marks: Vec<Mark>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    fn empty(kind: NodeKind, parent: Option<NodeId>) -> Self {
        Self {
            kind,
            attrs: schema::defaults(kind),
            unknown: Vec::new(),
            text: String::new(),
            marks: Vec::new(),
            parent,
            children: Vec::new(),
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn attr(&self, name: &str) -> &AttrValue {
        self.attrs.get(name).unwrap_or(&NULL)
    }

    pub fn attrs(&self) -> &BTreeMap<String, AttrValue> {
        &self.attrs
    }

    pub fn unknown_attrs(&self) -> &[(String, String)] {
        &self.unknown
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn marks(&self) -> &[Mark] {
        &self.marks
    }

    pub fn has_mark(&self, mark: &Mark) -> bool {
        self.marks.contains(mark)
    }

    /// Explicit font size carried by this text node's text style mark
    pub fn font_size_mark(&self) -> Option<&str> {
        self.marks.iter().find_map(|mark| match mark {
            Mark::TextStyle {
                font_size: Some(size),
                ..
            } => Some(size.as_str()),
            _ => None,
        })
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Width of this node in inline offsets (text counts characters, inline
    /// leaves count one)
    pub fn inline_len(&self) -> usize {
        if self.kind == NodeKind::Text {
            self.text.chars().count()
        } else {
            1
        }
    }
}

#[derive(Debug, Clone)]
enum Slot {
    Occupied { generation: u32, node: Node },
    Vacant { generation: u32 },
}

/// Mutable document tree
#[derive(Debug, Clone)]
pub struct Tree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: NodeId,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Tree {
    /// Attribute-for-attribute comparison; arena layout is ignored
    fn eq(&self, other: &Self) -> bool {
        self.to_fragment(self.root) == other.to_fragment(other.root)
    }
}

impl Tree {
    /// Empty document
    pub fn new() -> Self {
        let mut tree = Self {
            slots: Vec::new(),
            free: Vec::new(),
            root: NodeId {
                index: 0,
                generation: 0,
            },
        };
        tree.root = tree.alloc(Node::empty(NodeKind::Doc, None));
        tree
    }

    /// Build a tree from a detached `doc` fragment
    pub fn from_fragment(fragment: &Fragment) -> Result<Self, TreeError> {
        if fragment.kind != NodeKind::Doc {
            return Err(TreeError::InvalidChild {
                parent: NodeKind::Doc,
                child: fragment.kind,
            });
        }
        let mut tree = Self::new();
        let root = tree.root;
        if let Some(node) = tree.get_mut(root) {
            node.unknown = fragment.unknown.clone();
        }
        for (i, child) in fragment.children.iter().enumerate() {
            tree.insert_fragment(root, i, child)?;
        }
        Ok(tree)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Attribute-for-attribute equality with another tree
    pub fn structurally_eq(&self, other: &Tree) -> bool {
        self == other
    }

    /// Number of live nodes, root included
    pub fn len(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| matches!(slot, Slot::Occupied { .. }))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.children(self.root).is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        match self.slots.get(id.index as usize)? {
            Slot::Occupied { generation, node } if *generation == id.generation => Some(node),
            _ => None,
        }
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        match self.slots.get_mut(id.index as usize)? {
            Slot::Occupied { generation, node } if *generation == id.generation => Some(node),
            _ => None,
        }
    }

    pub fn node(&self, id: NodeId) -> Result<&Node, TreeError> {
        self.get(id).ok_or(TreeError::NodeNotFound(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, TreeError> {
        self.get_mut(id).ok_or(TreeError::NodeNotFound(id))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.get(id).map(Node::kind)
    }

    pub fn attr(&self, id: NodeId, name: &str) -> &AttrValue {
        self.get(id).map(|node| node.attr(name)).unwrap_or(&NULL)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|node| node.children.as_slice()).unwrap_or(&[])
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|child| *child == id)
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        let index = self.index_in_parent(id)?;
        let parent = self.parent(id)?;
        index.checked_sub(1).map(|i| self.children(parent)[i])
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let index = self.index_in_parent(id)?;
        let parent = self.parent(id)?;
        self.children(parent).get(index + 1).copied()
    }

    /// Ancestors, nearest first, excluding `id` itself
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.parent(id);
        while let Some(ancestor) = current {
            out.push(ancestor);
            current = self.parent(ancestor);
        }
        out
    }

    /// Nearest node, starting at `id` itself, whose kind matches
    pub fn find_ancestor(&self, id: NodeId, pred: impl Fn(NodeKind) -> bool) -> Option<NodeId> {
        let mut current = Some(id);
        while let Some(candidate) = current {
            if pred(self.kind(candidate)?) {
                return Some(candidate);
            }
            current = self.parent(candidate);
        }
        None
    }

    /// Descendants in document order, excluding `id` itself
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// Every node of `kind` in document order
    pub fn nodes_of_kind(&self, kind: NodeKind) -> Vec<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .filter(|id| self.kind(*id) == Some(kind))
            .collect()
    }

    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        if let Some(node) = self.get(id) {
            out.push_str(&node.text);
        }
        for descendant in self.descendants(id) {
            if let Some(node) = self.get(descendant) {
                out.push_str(&node.text);
            }
        }
        out
    }

    /// Length of a textblock's inline content in offsets
    pub fn inline_len(&self, block: NodeId) -> usize {
        self.children(block)
            .iter()
            .filter_map(|child| self.get(*child))
            .map(Node::inline_len)
            .sum()
    }

    /// Child-index path from the root
    pub fn path(&self, id: NodeId) -> Option<Vec<usize>> {
        self.get(id)?;
        let mut path = Vec::new();
        let mut current = id;
        while current != self.root {
            path.push(self.index_in_parent(current)?);
            current = self.parent(current)?;
        }
        path.reverse();
        Some(path)
    }

    pub fn node_at_path(&self, path: &[usize]) -> Option<NodeId> {
        let mut current = self.root;
        for index in path {
            current = *self.children(current).get(*index)?;
        }
        Some(current)
    }

    /// Detached copy of the subtree rooted at `id`
    pub fn to_fragment(&self, id: NodeId) -> Option<Fragment> {
        let node = self.get(id)?;
        Some(Fragment {
            kind: node.kind,
            attrs: node.attrs.clone(),
            unknown: node.unknown.clone(),
            text: node.text.clone(),
            marks: node.marks.clone(),
            children: node
                .children
                .iter()
                .filter_map(|child| self.to_fragment(*child))
                .collect(),
        })
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Insert a detached subtree as the `index`-th child of `parent`
    pub fn insert_fragment(
        &mut self,
        parent: NodeId,
        index: usize,
        fragment: &Fragment,
    ) -> Result<NodeId, TreeError> {
        let parent_node = self.node(parent)?;
        if index > parent_node.children.len() {
            return Err(TreeError::OutOfRange {
                node: parent,
                index,
            });
        }
        validate_fragment(parent_node.kind, fragment)?;

        let id = self.build(parent, fragment);
        self.node_mut(parent)?.children.insert(index, id);

        if self.node(parent)?.kind.is_textblock() {
            self.normalize_inline(parent);
            if !self.contains(id) {
                // merged into the preceding text run
                return Ok(self.children(parent)[index - 1]);
            }
        }
        Ok(id)
    }

    /// Remove a subtree, returning a detached copy of it
    pub fn remove(&mut self, id: NodeId) -> Result<Fragment, TreeError> {
        if id == self.root {
            return Err(TreeError::RootRemoval);
        }
        let fragment = self.to_fragment(id).ok_or(TreeError::NodeNotFound(id))?;
        let parent = self.parent(id).ok_or(TreeError::NodeNotFound(id))?;

        self.node_mut(parent)?.children.retain(|child| *child != id);
        self.free_subtree(id);

        if self.node(parent)?.kind.is_textblock() {
            self.normalize_inline(parent);
        }
        Ok(fragment)
    }

    /// Replace a subtree in place, returning the new subtree's id
    pub fn replace(&mut self, id: NodeId, fragment: &Fragment) -> Result<NodeId, TreeError> {
        if id == self.root {
            return Err(TreeError::RootRemoval);
        }
        let parent = self.parent(id).ok_or(TreeError::NodeNotFound(id))?;
        let index = self.index_in_parent(id).ok_or(TreeError::NodeNotFound(id))?;
        validate_fragment(self.node(parent)?.kind, fragment)?;
        self.remove(id)?;
        let index = index.min(self.children(parent).len());
        self.insert_fragment(parent, index, fragment)
    }

    /// Set a schema attribute, returning the previous value
    pub fn set_attr(
        &mut self,
        id: NodeId,
        name: &str,
        value: AttrValue,
    ) -> Result<AttrValue, TreeError> {
        let node = self.node_mut(id)?;
        let spec = schema::spec(node.kind, name).ok_or_else(|| TreeError::UnknownAttribute {
            kind: node.kind,
            name: name.to_string(),
        })?;
        let display = value.to_string();
        let value = spec
            .coerce(value)
            .ok_or_else(|| TreeError::InvalidAttributeValue {
                name: name.to_string(),
                value: display,
            })?;
        Ok(node
            .attrs
            .insert(name.to_string(), value)
            .unwrap_or(AttrValue::Null))
    }

    /// Change a node's kind in place. Attributes shared with the new kind's
    /// schema are carried over.
    pub fn set_kind(&mut self, id: NodeId, kind: NodeKind) -> Result<NodeKind, TreeError> {
        if id == self.root {
            return Err(TreeError::RootRemoval);
        }
        let parent = self.parent(id).ok_or(TreeError::NodeNotFound(id))?;
        let parent_kind = self.node(parent)?.kind;
        if !parent_kind.accepts_child(kind) {
            return Err(TreeError::InvalidChild {
                parent: parent_kind,
                child: kind,
            });
        }
        for child in self.children(id) {
            let child_kind = self.node(*child)?.kind;
            if !kind.accepts_child(child_kind) {
                return Err(TreeError::InvalidChild {
                    parent: kind,
                    child: child_kind,
                });
            }
        }

        let node = self.node_mut(id)?;
        let previous = node.kind;
        let mut attrs = schema::defaults(kind);
        for (name, slot) in attrs.iter_mut() {
            let carried = node
                .attrs
                .get(name)
                .and_then(|value| schema::spec(kind, name)?.coerce(value.clone()));
            if let Some(value) = carried {
                *slot = value;
            }
        }
        node.kind = kind;
        node.attrs = attrs;
        Ok(previous)
    }

    /// Add (or remove) `mark` on the inline range `from..to` of a textblock,
    /// splitting text runs at the range boundaries
    pub fn set_mark(
        &mut self,
        block: NodeId,
        from: usize,
        to: usize,
        mark: &Mark,
        add: bool,
    ) -> Result<(), TreeError> {
        self.expect_textblock(block)?;
        let (from, to) = (from.min(to), from.max(to));
        if to > self.inline_len(block) {
            return Err(TreeError::OutOfRange {
                node: block,
                index: to,
            });
        }
        if from == to {
            return Ok(());
        }

        let children = self.children(block).to_vec();
        let mut rebuilt = Vec::with_capacity(children.len() + 2);
        let mut offset = 0;
        for child in children {
            let node = self.node(child)?;
            let start = offset;
            let end = start + node.inline_len();
            offset = end;

            if node.kind != NodeKind::Text || end <= from || start >= to {
                rebuilt.push(child);
                continue;
            }

            let marks = node.marks.clone();
            let (head, middle, tail) = split_chars(&node.text, from.saturating_sub(start), to.min(end) - start);

            if !head.is_empty() {
                rebuilt.push(self.alloc_text(block, head, marks.clone()));
            }
            let node = self.node_mut(child)?;
            node.text = middle;
            if add {
                add_mark(&mut node.marks, mark);
            } else {
                remove_mark(&mut node.marks, mark);
            }
            rebuilt.push(child);
            if !tail.is_empty() {
                rebuilt.push(self.alloc_text(block, tail, marks));
            }
        }

        self.node_mut(block)?.children = rebuilt;
        self.normalize_inline(block);
        Ok(())
    }

    /// Insert `text` at an inline offset of a textblock. The new characters
    /// take the marks of the run they extend.
    pub fn insert_text(&mut self, block: NodeId, offset: usize, text: &str) -> Result<(), TreeError> {
        self.expect_textblock(block)?;
        if offset > self.inline_len(block) {
            return Err(TreeError::OutOfRange {
                node: block,
                index: offset,
            });
        }
        if text.is_empty() {
            return Ok(());
        }

        let children = self.children(block).to_vec();
        let mut start = 0;
        let mut insert_at = children.len();
        for (i, child) in children.iter().enumerate() {
            let node = self.node(*child)?;
            let end = start + node.inline_len();
            if node.kind == NodeKind::Text && offset >= start && offset <= end {
                let byte = char_to_byte(&node.text, offset - start);
                self.node_mut(*child)?.text.insert_str(byte, text);
                return Ok(());
            }
            if offset <= start {
                insert_at = i;
                break;
            }
            start = end;
        }

        let id = self.alloc_text(block, text.to_string(), Vec::new());
        self.node_mut(block)?.children.insert(insert_at, id);
        self.normalize_inline(block);
        Ok(())
    }

    /// Delete the inline range `from..to` of a textblock
    pub fn delete_text(&mut self, block: NodeId, from: usize, to: usize) -> Result<(), TreeError> {
        self.expect_textblock(block)?;
        let (from, to) = (from.min(to), from.max(to));
        if to > self.inline_len(block) {
            return Err(TreeError::OutOfRange {
                node: block,
                index: to,
            });
        }
        if from == to {
            return Ok(());
        }

        let children = self.children(block).to_vec();
        let mut kept = Vec::with_capacity(children.len());
        let mut doomed = Vec::new();
        let mut offset = 0;
        for child in children {
            let node = self.node(child)?;
            let start = offset;
            let end = start + node.inline_len();
            offset = end;

            if end <= from || start >= to {
                kept.push(child);
                continue;
            }
            if node.kind != NodeKind::Text {
                doomed.push(child);
                continue;
            }

            let (head, _, tail) = split_chars(&node.text, from.saturating_sub(start), to.min(end) - start);
            if head.is_empty() && tail.is_empty() {
                doomed.push(child);
            } else {
                self.node_mut(child)?.text = head + &tail;
                kept.push(child);
            }
        }

        self.node_mut(block)?.children = kept;
        for victim in doomed {
            self.free_subtree(victim);
        }
        self.normalize_inline(block);
        Ok(())
    }

    /// Whether every text run overlapping `from..to` carries `mark`. An
    /// empty range asks about the run the offset sits in.
    pub fn range_has_mark(&self, block: NodeId, from: usize, to: usize, mark: &Mark) -> bool {
        let (from, to) = (from.min(to), from.max(to));
        let mut offset = 0;
        let mut seen = false;
        for child in self.children(block) {
            let Some(node) = self.get(*child) else {
                continue;
            };
            let start = offset;
            let end = start + node.inline_len();
            offset = end;

            let overlaps = if from == to {
                start < from && from <= end
            } else {
                start < to && end > from
            };
            if !overlaps || node.kind != NodeKind::Text {
                continue;
            }
            if !node.marks.iter().any(|m| m.same_type(mark)) {
                return false;
            }
            seen = true;
        }
        seen
    }

    /// Merge adjacent text runs that carry identical marks
    pub fn normalize_inline(&mut self, block: NodeId) {
        let mut i = 0;
        loop {
            let children = self.children(block);
            if i + 1 >= children.len() {
                break;
            }
            let (left, right) = (children[i], children[i + 1]);
            let mergeable = match (self.get(left), self.get(right)) {
                (Some(a), Some(b)) => {
                    a.kind == NodeKind::Text && b.kind == NodeKind::Text && a.marks == b.marks
                }
                _ => false,
            };
            if !mergeable {
                i += 1;
                continue;
            }
            let tail = self.get(right).map(|n| n.text.clone()).unwrap_or_default();
            if let Some(node) = self.get_mut(left) {
                node.text.push_str(&tail);
            }
            if let Some(node) = self.get_mut(block) {
                node.children.remove(i + 1);
            }
            self.free_subtree(right);
        }
    }

    fn expect_textblock(&self, block: NodeId) -> Result<(), TreeError> {
        if self.node(block)?.kind.is_textblock() {
            Ok(())
        } else {
            Err(TreeError::NotTextblock(block))
        }
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        if let Some(index) = self.free.pop() {
            let generation = match self.slots[index as usize] {
                Slot::Vacant { generation } | Slot::Occupied { generation, .. } => generation,
            };
            self.slots[index as usize] = Slot::Occupied { generation, node };
            NodeId { index, generation }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot::Occupied {
                generation: 0,
                node,
            });
            NodeId {
                index,
                generation: 0,
            }
        }
    }

    fn alloc_text(&mut self, parent: NodeId, text: String, marks: Vec<Mark>) -> NodeId {
        let mut node = Node::empty(NodeKind::Text, Some(parent));
        node.text = text;
        node.marks = marks;
        self.alloc(node)
    }

    /// Allocate a validated fragment under `parent` (not yet linked into
    /// the parent's child list)
    fn build(&mut self, parent: NodeId, fragment: &Fragment) -> NodeId {
        let mut node = Node::empty(fragment.kind, Some(parent));
        for (name, value) in &fragment.attrs {
            if let Some(value) = schema::spec(fragment.kind, name).and_then(|spec| spec.coerce(value.clone())) {
                node.attrs.insert(name.clone(), value);
            }
        }
        node.unknown = fragment.unknown.clone();
        node.text = fragment.text.clone();
        for mark in &fragment.marks {
            add_mark(&mut node.marks, mark);
        }
        let id = self.alloc(node);

        let children: Vec<NodeId> = fragment
            .children
            .iter()
            .map(|child| self.build(id, child))
            .collect();
        if let Some(node) = self.get_mut(id) {
            node.children = children;
        }
        if fragment.kind.is_textblock() {
            self.normalize_inline(id);
        }
        id
    }

    fn free_subtree(&mut self, id: NodeId) {
        let mut doomed = self.descendants(id);
        doomed.push(id);
        for victim in doomed {
            let slot = &mut self.slots[victim.index as usize];
            if let Slot::Occupied { generation, .. } = *slot {
                if generation == victim.generation {
                    *slot = Slot::Vacant {
                        generation: generation.wrapping_add(1),
                    };
                    self.free.push(victim.index);
                }
            }
        }
    }
}

fn validate_fragment(parent: NodeKind, fragment: &Fragment) -> Result<(), TreeError> {
    if !parent.accepts_child(fragment.kind) {
        return Err(TreeError::InvalidChild {
            parent,
            child: fragment.kind,
        });
    }
    if fragment.kind == NodeKind::Text && fragment.text.is_empty() {
        return Err(TreeError::EmptyText);
    }
    for (name, value) in &fragment.attrs {
        let spec = schema::spec(fragment.kind, name).ok_or_else(|| TreeError::UnknownAttribute {
            kind: fragment.kind,
            name: name.clone(),
        })?;
        if spec.coerce(value.clone()).is_none() {
            return Err(TreeError::InvalidAttributeValue {
                name: name.clone(),
                value: value.to_string(),
            });
        }
    }
    for child in &fragment.children {
        validate_fragment(fragment.kind, child)?;
    }
    Ok(())
}

fn char_to_byte(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map(|(byte, _)| byte)
        .unwrap_or(text.len())
}

fn split_chars(text: &str, from: usize, to: usize) -> (String, String, String) {
    let a = char_to_byte(text, from);
    let b = char_to_byte(text, to);
    (
        text[..a].to_string(),
        text[a..b].to_string(),
        text[b..].to_string(),
    )
}
