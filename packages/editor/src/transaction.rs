use crate::mutations::Mutation;
use serde::{Deserialize, Serialize};

/// Who produced a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Origin {
    /// A user command
    User,
    /// Synchronization passes
    Sync,
    /// Pointer-driven resize
    Manipulation,
    /// Completion of a raster rotate or mirror
    Raster,
    /// Undo or redo
    History,
}

/// Atomic batch of mutations: either all of them commit or none do
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub mutations: Vec<Mutation>,
    pub origin: Origin,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Transaction {
    pub fn new(origin: Origin) -> Self {
        Self {
            mutations: Vec::new(),
            origin,
            description: None,
        }
    }

    pub fn user() -> Self {
        Self::new(Origin::User)
    }

    pub fn with(mut self, mutation: Mutation) -> Self {
        self.mutations.push(mutation);
        self
    }

    pub fn push(&mut self, mutation: Mutation) {
        self.mutations.push(mutation);
    }

    pub fn extend(&mut self, mutations: impl IntoIterator<Item = Mutation>) {
        self.mutations.extend(mutations);
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.mutations.len()
    }
}
