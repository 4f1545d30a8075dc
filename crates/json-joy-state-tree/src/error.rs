//! Error kinds raised by schema construction, validation and tree mutation.

use json_joy_tree_path::PathError;
use thiserror::Error;

use crate::tree::NodeId;
use crate::validation::ValidationError;

/// Raised while building a schema. Never recoverable at runtime.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("identifier can only be declared over a string or number type, got `{found}`")]
    InvalidIdentifierBase { found: String },
    #[error("model `{model}` declares more than one identifier: `{first}` and `{second}`")]
    MultipleIdentifiers {
        model: String,
        first: String,
        second: String,
    },
    #[error("identifier property `{property}` of model `{model}` cannot be optional")]
    OptionalIdentifier { model: String, property: String },
    #[error("`{found}` is not a model type and cannot be composed")]
    NotAModel { found: String },
    #[error("invalid reference template: {0}")]
    Template(#[from] PathError),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReferenceError {
    #[error("Failed to resolve reference '{reference}' to type '{target}' (from node: {from})")]
    Unresolvable {
        reference: String,
        target: String,
        from: String,
    },
    #[error("The value must already be part of the same tree to be referenced from '{from}' (target: '{target}')")]
    NotInSameTree { from: String, target: String },
    #[error("Cannot reference node at '{path}': type `{type_name}` has no identifier attribute")]
    NoIdentifier { path: String, type_name: String },
    #[error("node at '{path}' is not assignable to reference target `{target}`")]
    TypeMismatch { path: String, target: String },
    #[error("node at '{path}' is not a reference")]
    NotAReference { path: String },
    #[error("reference at '{path}' is empty")]
    Empty { path: String },
    #[error("no node at '{path}'")]
    Unreachable { path: String },
}

#[derive(Debug, Error)]
pub enum TreeError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("{0}")]
    Validation(ValidationError),
    #[error("{0}")]
    UnionAmbiguity(ValidationError),
    #[error(transparent)]
    Reference(#[from] ReferenceError),
    #[error("Tried to change identifier from '{old}' to '{new}'. Changing identifiers is not allowed.")]
    IdentifierImmutable {
        attribute: String,
        old: String,
        new: String,
    },
    #[error("duplicate identifier '{identifier}' in collection at '{path}'")]
    DuplicateIdentifier { path: String, identifier: String },
    #[error("node {0} is not alive")]
    DeadNode(NodeId),
    #[error("no child '{key}' at '{path}'")]
    NoSuchChild { path: String, key: String },
    #[error("node at '{path}' is not {expected}")]
    WrongContainer { path: String, expected: &'static str },
    #[error("index {index} out of bounds for array of length {len} at '{path}'")]
    InvalidIndex {
        path: String,
        index: usize,
        len: usize,
    },
    #[error("cannot attach node at '{0}': it is already part of a tree")]
    AlreadyAttached(String),
    #[error("{0}")]
    InvalidOperation(String),
    #[error("change rejected by interceptor: {0}")]
    Intercepted(String),
    #[error("invalid patch: {0}")]
    Patch(String),
    #[error(transparent)]
    Path(#[from] PathError),
}

impl From<ValidationError> for TreeError {
    fn from(err: ValidationError) -> Self {
        if err.is_ambiguous() {
            TreeError::UnionAmbiguity(err)
        } else {
            TreeError::Validation(err)
        }
    }
}

impl TreeError {
    /// The aggregated validation error, for both plain and ambiguity failures.
    pub fn validation(&self) -> Option<&ValidationError> {
        match self {
            TreeError::Validation(e) | TreeError::UnionAmbiguity(e) => Some(e),
            _ => None,
        }
    }
}
