//! # Document Handle
//!
//! A Document owns one tree and is the only place it changes.
//!
//! Documents can be:
//! - **Memory-backed**: built from source text, for tests and scripting
//! - **File-backed**: loaded from disk and saved back
//!
//! ## Applying a transaction
//!
//! ```text
//! clone tree ─► validate + apply mutations ─► settle sync passes ─► swap
//!     │                  │ error                                     │
//!     │                  ▼                                           ▼
//!     └──────────── draft dropped, tree untouched             version + 1
//! ```
//!
//! The live tree is replaced only after every mutation and every follow-up
//! succeeded, so a rejected transaction leaves no trace.

use crate::config::SyncScope;
use crate::mutations::{MutationResult, Touched};
use crate::post_effects::{PostEffectEngine, Scope};
use crate::transaction::Transaction;
use crate::EditorError;
use lectern_parser::{parse, serialize, Tree};
use std::path::PathBuf;

/// Editable document
#[derive(Debug)]
pub struct Document {
    /// Path of the source file; informational for memory-backed documents
    pub path: PathBuf,

    /// Current version number (increments on each committed transaction)
    pub version: u64,

    storage: DocumentStorage,
    effects: PostEffectEngine,
    sync_scope: SyncScope,
}

/// Storage backend for document
#[derive(Debug)]
pub enum DocumentStorage {
    /// In-memory only (for testing, temp docs)
    Memory { tree: Tree },

    /// File-backed (single-user editing)
    File { tree: Tree, dirty: bool },
}

impl Document {
    /// Create document from source text (memory-backed)
    pub fn from_source(path: PathBuf, source: &str) -> Result<Self, EditorError> {
        let tree = parse(source)?;
        Ok(Self::with_storage(path, DocumentStorage::Memory { tree }))
    }

    /// Load document from file (file-backed)
    pub fn load(path: PathBuf) -> Result<Self, EditorError> {
        let source = std::fs::read_to_string(&path)?;
        let tree = parse(&source)?;
        tracing::debug!(path = %path.display(), nodes = tree.len(), "loaded document");
        Ok(Self::with_storage(
            path,
            DocumentStorage::File { tree, dirty: false },
        ))
    }

    /// Wrap an existing tree (memory-backed)
    pub fn from_tree(path: PathBuf, tree: Tree) -> Self {
        Self::with_storage(path, DocumentStorage::Memory { tree })
    }

    fn with_storage(path: PathBuf, storage: DocumentStorage) -> Self {
        let mut document = Self {
            path,
            version: 0,
            storage,
            effects: PostEffectEngine::new(),
            sync_scope: SyncScope::default(),
        };
        // Loaded content may predate the derived attributes; settle it so
        // the first reader already sees a consistent tree.
        let effects = &document.effects;
        match &mut document.storage {
            DocumentStorage::Memory { tree } | DocumentStorage::File { tree, .. } => {
                effects.settle(tree, &Scope::Document);
            }
        }
        document
    }

    pub fn with_sync_scope(mut self, scope: SyncScope) -> Self {
        self.sync_scope = scope;
        self
    }

    pub fn with_effects(mut self, effects: PostEffectEngine) -> Self {
        self.effects = effects;
        self
    }

    pub fn sync_scope(&self) -> SyncScope {
        self.sync_scope
    }

    pub fn tree(&self) -> &Tree {
        match &self.storage {
            DocumentStorage::Memory { tree } | DocumentStorage::File { tree, .. } => tree,
        }
    }

    /// Serialized form of the current tree
    pub fn source(&self) -> String {
        serialize(self.tree())
    }

    /// Apply a transaction atomically.
    ///
    /// Every mutation is validated against the draft as it stands after the
    /// previous ones. The first failure rejects the whole transaction and
    /// the document keeps its tree and version.
    pub fn apply(&mut self, transaction: Transaction) -> Result<MutationResult, EditorError> {
        let mut draft = self.tree().clone();
        let mut touched = Vec::new();
        let mut inserted = Vec::new();

        for mutation in &transaction.mutations {
            mutation.validate(&draft, transaction.origin)?;
            let touch = mutation.touched(&draft);
            let created = mutation.apply(&mut draft)?;
            touched.extend(touch);
            if let Some(id) = created {
                touched.push(Touched::Subtree(id));
                inserted.push(id);
            }
        }

        let scope = Scope::for_setting(self.sync_scope, &draft, &touched);
        let follow_ups = self.effects.settle(&mut draft, &scope);

        let synced = follow_ups.len();
        let mut applied = transaction.mutations;
        applied.extend(follow_ups);

        self.replace_tree(draft);
        self.version += 1;

        tracing::info!(
            version = self.version,
            origin = ?transaction.origin,
            mutations = applied.len() - synced,
            synced,
            description = transaction.description.as_deref().unwrap_or(""),
            "committed transaction"
        );

        Ok(MutationResult {
            version: self.version,
            applied,
            synced,
            inserted,
        })
    }

    /// Swap in a previously committed tree (undo/redo). Snapshots are
    /// already settled, so no pass runs.
    pub fn restore(&mut self, tree: Tree) -> u64 {
        self.replace_tree(tree);
        self.version += 1;
        tracing::debug!(version = self.version, "restored snapshot");
        self.version
    }

    fn replace_tree(&mut self, next: Tree) {
        match &mut self.storage {
            DocumentStorage::Memory { tree } => *tree = next,
            DocumentStorage::File { tree, dirty } => {
                *tree = next;
                *dirty = true;
            }
        }
    }

    /// Check if document has unsaved changes
    pub fn is_dirty(&self) -> bool {
        match &self.storage {
            DocumentStorage::File { dirty, .. } => *dirty,
            DocumentStorage::Memory { .. } => false,
        }
    }

    /// Save document to disk (if file-backed)
    pub fn save(&mut self) -> Result<(), EditorError> {
        let source = self.source();
        match &mut self.storage {
            DocumentStorage::File { dirty, .. } => {
                std::fs::write(&self.path, source)?;
                *dirty = false;
                tracing::info!(path = %self.path.display(), "saved document");
                Ok(())
            }
            DocumentStorage::Memory { .. } => Err(EditorError::NotFileBacked),
        }
    }
}
