//! Type descriptor classes.
//!
//! Each struct is one variant payload of [`TypeNode`](super::TypeNode).

use indexmap::IndexMap;
use json_joy_tree_path::RelativePath;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, OnceLock};

use super::Type;

// -------------------------------------------------------------------------
// Primitives

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimKind {
    String,
    Number,
    Integer,
    Boolean,
    Null,
}

impl PrimKind {
    pub fn name(self) -> &'static str {
        match self {
            PrimKind::String => "string",
            PrimKind::Number => "number",
            PrimKind::Integer => "integer",
            PrimKind::Boolean => "boolean",
            PrimKind::Null => "null",
        }
    }

    pub fn accepts(self, value: &Value) -> bool {
        match self {
            PrimKind::String => value.is_string(),
            PrimKind::Number => value.is_number(),
            PrimKind::Integer => value.as_f64().is_some_and(|n| n.fract() == 0.0),
            PrimKind::Boolean => value.is_boolean(),
            PrimKind::Null => value.is_null(),
        }
    }

    pub(crate) fn mismatch_message(self) -> &'static str {
        match self {
            PrimKind::String => "Value is not a string",
            PrimKind::Number => "Value is not a number",
            PrimKind::Integer => "Value is not an integer",
            PrimKind::Boolean => "Value is not a boolean",
            PrimKind::Null => "Value is not null",
        }
    }
}

#[derive(Debug, Clone)]
pub struct PrimType {
    pub kind: PrimKind,
}

/// Identifier over a string or number primitive.
#[derive(Debug, Clone)]
pub struct IdentifierType {
    pub base: PrimKind,
}

impl IdentifierType {
    pub fn name(&self) -> &'static str {
        match self.base {
            PrimKind::String => "identifier",
            _ => "identifierNumber",
        }
    }
}

#[derive(Debug, Clone)]
pub struct LiteralType {
    pub value: Value,
}

/// Any JSON value, stored opaquely.
#[derive(Debug, Clone, Default)]
pub struct FrozenType;

// -------------------------------------------------------------------------
// Composites

#[derive(Debug, Clone)]
pub struct ModelType {
    pub name: String,
    pub props: IndexMap<String, Type>,
}

impl ModelType {
    pub fn prop(&self, key: &str) -> Option<&Type> {
        self.props.get(key)
    }

    /// Name of the first property typed as an identifier. Deferred and refined
    /// properties count, so this resolves late property types.
    pub fn identifier(&self) -> Option<&str> {
        self.props
            .iter()
            .find(|(_, ty)| ty.is_identifier())
            .map(|(key, _)| key.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct ArrType {
    pub item: Type,
}

#[derive(Debug, Clone)]
pub struct MapType {
    pub value: Type,
}

/// Picks a member of a union by index from a raw snapshot.
pub type Dispatcher = Arc<dyn Fn(&Value) -> usize + Send + Sync>;

#[derive(Clone)]
pub struct OrType {
    pub types: Vec<Type>,
    pub dispatcher: Option<Dispatcher>,
}

impl fmt::Debug for OrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrType")
            .field("types", &self.types)
            .field("dispatcher", &self.dispatcher.is_some())
            .finish()
    }
}

// -------------------------------------------------------------------------
// References

#[derive(Debug, Clone)]
pub struct RefType {
    pub target: Type,
    /// Path mode: anchor template the stored path is resolved from.
    pub path: Option<RelativePath>,
    /// Identifier mode: template of the collection searched for the identifier.
    pub collection: Option<RelativePath>,
}

impl RefType {
    /// Identifier mode applies when no path template is configured and the
    /// target declares an identifier attribute.
    pub fn uses_identifier(&self) -> bool {
        self.path.is_none() && self.target.identifier_attribute().is_some()
    }
}

// -------------------------------------------------------------------------
// Wrappers

pub type Supplier = Arc<dyn Fn() -> Type + Send + Sync>;

thread_local! {
    /// Late types currently being named on this thread.
    static NAMING: RefCell<HashSet<usize>> = RefCell::new(HashSet::new());
}

/// Deferred type: the supplier runs once, on first access.
pub struct LateType {
    supplier: Supplier,
    resolved: OnceLock<Type>,
}

impl LateType {
    pub fn new(supplier: Supplier) -> Self {
        Self {
            supplier,
            resolved: OnceLock::new(),
        }
    }

    pub fn target(&self) -> &Type {
        self.resolved.get_or_init(|| (self.supplier)())
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.get().is_some()
    }

    pub fn name(&self) -> String {
        // a cycle that never passes through a model would name itself forever
        let key = self as *const Self as usize;
        if !NAMING.with(|naming| naming.borrow_mut().insert(key)) {
            return "late".to_string();
        }
        let name = self.target().name();
        NAMING.with(|naming| naming.borrow_mut().remove(&key));
        name
    }
}

impl fmt::Debug for LateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LateType")
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct OptionalType {
    pub inner: Type,
    pub default: Value,
}

pub type Predicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

#[derive(Clone)]
pub struct RefinementType {
    pub inner: Type,
    pub name: String,
    pub predicate: Predicate,
    pub message: Option<String>,
}

impl fmt::Debug for RefinementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefinementType")
            .field("inner", &self.inner)
            .field("name", &self.name)
            .finish()
    }
}
