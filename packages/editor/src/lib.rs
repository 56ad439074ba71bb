//! # Lectern Editor
//!
//! Core editing engine for Lectern documents.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ parser: markup ↔ Tree                       │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: Document + transactions             │
//! │  - Apply transactions all-or-nothing        │
//! │  - Settle derived attributes (post-effects) │
//! │  - Undo/redo snapshots                      │
//! │  - Commands, selection, drag resizing       │
//! │  - Table geometry                           │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ raster: decode → rotate/mirror → re-encode  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Tree is source of truth**: rendering and markup are derived views
//! 2. **One way in**: every change is a [`Transaction`] applied by
//!    [`Document::apply`]
//! 3. **Settled on commit**: derived attributes are recomputed inside the
//!    same transaction that invalidated them
//! 4. **Stale work is dropped**: raster completions re-check their target
//!
//! ## Usage
//!
//! ```rust,ignore
//! use lectern_editor::{Command, Document, EditSession};
//!
//! let doc = Document::load("notes.html".into())?;
//! let mut session = EditSession::new("local", doc);
//!
//! session.apply_command(&Command::Select { path: vec![0], from: Some(0), to: Some(5) })?;
//! session.apply_command(&Command::ToggleBulletList { style: None })?;
//!
//! let outcome = session.execute(Command::RotateImage { direction: RotateDirection::Right }).await;
//! ```

pub mod commands;
pub mod config;
mod document;
mod errors;
pub mod invariants;
pub mod layout;
pub mod manipulation;
mod mutations;
pub mod post_effects;
mod raster_jobs;
mod selection;
mod session;
pub mod table_geometry;
mod transaction;
mod undo_stack;

pub use commands::{plan, After, Command, Plan};
pub use config::{EditorConfig, SyncScope};
pub use document::{Document, DocumentStorage};
pub use errors::EditorError;
pub use invariants::{check, Violation};
pub use layout::{Layout, ModelLayout};
pub use manipulation::{DragState, Handle, Point, ResizeController, Size};
pub use mutations::{Mutation, MutationError, MutationResult, Touched};
pub use post_effects::{PostEffect, PostEffectEngine, Scope};
pub use raster_jobs::{RasterCompletion, RasterJob, RasterOutcome};
pub use selection::Selection;
pub use session::{CommandOutcome, EditSession, EditorEvent, EditorHandle, EditorRequest};
pub use transaction::{Origin, Transaction};
pub use undo_stack::{MutationBatch, UndoStack};

// Re-export common types for convenience
pub use lectern_parser::{AttrValue, Mark, NodeId, NodeKind, Tree};
pub use lectern_raster::{MirrorAxis, RasterOp, RotateDirection};
