use crate::ast::NodeKind;
use crate::tree::NodeId;
use thiserror::Error;

pub type ParseResult<T> = Result<T, ParseError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unexpected token at {pos}: expected {expected}, found {found}")]
    UnexpectedToken {
        pos: usize,
        expected: String,
        found: String,
    },

    #[error("Unexpected end of input at {pos}")]
    UnexpectedEof { pos: usize },

    #[error("Invalid syntax at {pos}: {message}")]
    InvalidSyntax { pos: usize, message: String },

    #[error("Unknown element <{name}> at {pos}")]
    UnknownElement { pos: usize, name: String },

    #[error("Lexer error at {pos}")]
    LexerError { pos: usize },

    #[error("Invalid document structure: {0}")]
    Structure(#[from] TreeError),
}

impl ParseError {
    pub fn unexpected_token(pos: usize, expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::UnexpectedToken {
            pos,
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn unexpected_eof(pos: usize) -> Self {
        Self::UnexpectedEof { pos }
    }

    pub fn invalid_syntax(pos: usize, message: impl Into<String>) -> Self {
        Self::InvalidSyntax {
            pos,
            message: message.into(),
        }
    }

    pub fn unknown_element(pos: usize, name: impl Into<String>) -> Self {
        Self::UnknownElement {
            pos,
            name: name.into(),
        }
    }

    pub fn lexer_error(pos: usize) -> Self {
        Self::LexerError { pos }
    }
}

/// Structural violations raised by the tree arena.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TreeError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("<{parent}> cannot contain <{child}>")]
    InvalidChild { parent: NodeKind, child: NodeKind },

    #[error("Node {0} is not a text node")]
    NotText(NodeId),

    #[error("Node {0} is not a textblock")]
    NotTextblock(NodeId),

    #[error("Text nodes cannot be empty")]
    EmptyText,

    #[error("The document root cannot be removed or replaced")]
    RootRemoval,

    #[error("Index {index} out of range for node {node}")]
    OutOfRange { node: NodeId, index: usize },

    #[error("<{kind}> has no attribute '{name}'")]
    UnknownAttribute { kind: NodeKind, name: String },

    #[error("Invalid value for attribute '{name}': {value}")]
    InvalidAttributeValue { name: String, value: String },
}
