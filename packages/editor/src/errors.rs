//! Error types for the editor

use lectern_parser::NodeId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Parse error: {0}")]
    Parse(#[from] lectern_parser::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Mutation error: {0}")]
    Mutation(#[from] crate::mutations::MutationError),

    #[error("Raster error: {0}")]
    Raster(#[from] lectern_raster::RasterError),

    #[error("Invalid config: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Selection does not contain {0}")]
    Selection(&'static str),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Node {0} cannot be manipulated")]
    InvalidTarget(NodeId),

    #[error("A drag is already in progress")]
    DragInProgress,

    #[error("Command requires async execution")]
    RequiresAsync,

    #[error("Editor session is closed")]
    SessionClosed,

    #[error("Document is not file-backed")]
    NotFileBacked,
}

impl EditorError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        EditorError::InvalidArgument(message.into())
    }
}
