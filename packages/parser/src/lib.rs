//! Document model and serialized format.
//!
//! ```text
//! markup ──tokenize──► Markup stream ──Parser──► Fragment ──► Tree
//!   ▲                                                          │
//!   └────────────────────────── serialize ◄────────────────────┘
//! ```
//!
//! [`Tree`] is the mutable arena the editor works on; [`Fragment`] is its
//! detached, owned form used for building content and comparing documents.

pub mod ast;
pub mod error;
pub mod parser;
pub mod schema;
pub mod serializer;
pub mod tokenizer;
pub mod tree;

pub use ast::{add_mark, remove_mark, AttrValue, Fragment, Mark, NodeKind};
pub use error::{ParseError, ParseResult, TreeError};
pub use parser::{parse, Parser};
pub use serializer::{serialize, Serializer};
pub use tokenizer::{tokenize, Markup};
pub use tree::{Node, NodeId, Tree};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_basic() {
        let source = "<p>Hello <strong>world</strong></p>";
        let tree = parse(source).unwrap();
        assert_eq!(serialize(&tree), source);
    }
}
