//! Path plumbing for json-joy state trees.
//!
//! Nodes in a state tree are addressed by `/`-joined segment lists (RFC 6901
//! style pointers). References additionally use *relative* templates such as
//! `../../books` that are resolved against the position of the referencing
//! node.
//!
//! # Example
//!
//! ```
//! use json_joy_tree_path::{format_pointer, parse_pointer, RelativePath};
//!
//! let path = parse_pointer("/shelf/books/0");
//! assert_eq!(path, vec!["shelf", "books", "0"]);
//! assert_eq!(format_pointer(&path), "/shelf/books/0");
//!
//! let rel = RelativePath::parse("../../books").unwrap();
//! let anchor = rel.apply(&["shelf".to_string(), "selected".to_string()]).unwrap();
//! assert_eq!(anchor, vec!["books"]);
//! ```

use thiserror::Error;

pub mod pointer;
pub mod relative;

pub use pointer::{
    escape_component, format_pointer, is_ancestor, is_valid_index, parse_pointer,
    unescape_component,
};
pub use relative::RelativePath;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("path '{0}' walks above the root")]
    AboveRoot(String),
}
