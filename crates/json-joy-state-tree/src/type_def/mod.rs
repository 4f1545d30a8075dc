//! Type descriptors.
//!
//! - `TypeNode` enum: the closed sum of descriptor classes
//! - `Type`: a cheap, shareable handle to a `TypeNode`
//! - `TypeBuilder` / `ModelBuilder`: factories for constructing descriptors
//!
//! Descriptors are immutable once built. The only exception is [`LateType`],
//! which memoizes its target on first use; that is what allows cyclic schemas.

pub mod builder;
pub mod classes;

pub use builder::{ModelBuilder, RefOptions, TypeBuilder};
pub use classes::*;

use serde_json::Value;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use crate::validation::{validate_value, ContextEntry, ValidationResult};

#[derive(Debug)]
pub enum TypeNode {
    Prim(PrimType),
    Identifier(IdentifierType),
    Literal(LiteralType),
    Frozen(FrozenType),
    Model(ModelType),
    Arr(ArrType),
    Map(MapType),
    Or(OrType),
    Ref(RefType),
    Late(LateType),
    Optional(OptionalType),
    Refinement(RefinementType),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Primitive,
    Model,
    Array,
    Map,
    Union,
    Reference,
    Late,
    Optional,
    Refinement,
}

/// Shared handle to a descriptor.
#[derive(Clone)]
pub struct Type(Arc<TypeNode>);

impl Deref for Type {
    type Target = TypeNode;

    fn deref(&self) -> &TypeNode {
        &self.0
    }
}

impl Type {
    pub(crate) fn new(node: TypeNode) -> Self {
        Self(Arc::new(node))
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &Type) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn kind(&self) -> TypeKind {
        match &**self {
            TypeNode::Prim(_)
            | TypeNode::Identifier(_)
            | TypeNode::Literal(_)
            | TypeNode::Frozen(_) => TypeKind::Primitive,
            TypeNode::Model(_) => TypeKind::Model,
            TypeNode::Arr(_) => TypeKind::Array,
            TypeNode::Map(_) => TypeKind::Map,
            TypeNode::Or(_) => TypeKind::Union,
            TypeNode::Ref(_) => TypeKind::Reference,
            TypeNode::Late(_) => TypeKind::Late,
            TypeNode::Optional(_) => TypeKind::Optional,
            TypeNode::Refinement(_) => TypeKind::Refinement,
        }
    }

    /// Short name: the model name for models, the description otherwise.
    pub fn name(&self) -> String {
        match &**self {
            TypeNode::Model(m) => m.name.clone(),
            TypeNode::Late(l) => l.name(),
            TypeNode::Refinement(r) => r.name.clone(),
            _ => self.describe(),
        }
    }

    /// Structural signature used in error messages.
    pub fn describe(&self) -> String {
        match &**self {
            TypeNode::Prim(p) => p.kind.name().to_string(),
            TypeNode::Identifier(i) => i.name().to_string(),
            TypeNode::Literal(l) => serde_json::to_string(&l.value).unwrap_or_default(),
            TypeNode::Frozen(_) => "frozen".to_string(),
            TypeNode::Model(m) => {
                let props: Vec<String> = m
                    .props
                    .iter()
                    .map(|(key, ty)| format!("{key}: {}", ty.describe()))
                    .collect();
                format!("{{ {} }}", props.join("; "))
            }
            TypeNode::Arr(a) => format!("{}[]", a.item.describe()),
            TypeNode::Map(m) => format!("Map<string, {}>", m.value.describe()),
            TypeNode::Or(o) => o
                .types
                .iter()
                .map(Type::describe)
                .collect::<Vec<_>>()
                .join(" | "),
            TypeNode::Ref(r) => format!("reference({})", r.target.name()),
            TypeNode::Late(l) => l.name(),
            TypeNode::Optional(o) => format!("{}?", o.inner.describe()),
            TypeNode::Refinement(r) => r.name.clone(),
        }
    }

    /// Name of the identifier property, forwarded through wrappers.
    pub fn identifier_attribute(&self) -> Option<&str> {
        match &**self {
            TypeNode::Model(m) => m.identifier(),
            TypeNode::Late(l) => l.target().identifier_attribute(),
            TypeNode::Optional(o) => o.inner.identifier_attribute(),
            TypeNode::Refinement(r) => r.inner.identifier_attribute(),
            _ => None,
        }
    }

    pub fn is_identifier(&self) -> bool {
        match &**self {
            TypeNode::Identifier(_) => true,
            TypeNode::Late(l) => l.target().is_identifier(),
            TypeNode::Refinement(r) => r.inner.is_identifier(),
            _ => false,
        }
    }

    pub fn is_optional(&self) -> bool {
        match &**self {
            TypeNode::Optional(_) => true,
            TypeNode::Late(l) => l.target().is_optional(),
            _ => false,
        }
    }

    /// Follows deferred indirections to the first non-late descriptor.
    pub fn resolve(&self) -> &Type {
        let mut cur = self;
        while let TypeNode::Late(l) = &**cur {
            cur = l.target();
        }
        cur
    }

    /// Strips deferred, optional and refinement wrappers.
    pub fn unwrap_wrappers(&self) -> &Type {
        let mut cur = self;
        loop {
            cur = match &**cur {
                TypeNode::Late(l) => l.target(),
                TypeNode::Optional(o) => &o.inner,
                TypeNode::Refinement(r) => &r.inner,
                _ => return cur,
            };
        }
    }

    /// Default snapshot used when an optional property is missing.
    pub fn default_value(&self) -> Option<Value> {
        match &**self {
            TypeNode::Optional(o) => Some(o.default.clone()),
            TypeNode::Late(l) => l.target().default_value(),
            _ => None,
        }
    }

    pub fn as_model(&self) -> Option<&ModelType> {
        match &**self.resolve() {
            TypeNode::Model(m) => Some(m),
            _ => None,
        }
    }

    /// Reference descriptor behind wrappers, if this is a reference.
    pub fn as_reference(&self) -> Option<&RefType> {
        match &**self.unwrap_wrappers() {
            TypeNode::Ref(r) => Some(r),
            _ => None,
        }
    }

    /// Reference descriptors reachable through wrappers and unions, in
    /// declaration order.
    pub fn reference_members(&self) -> Vec<&Type> {
        let ty = self.unwrap_wrappers();
        match &**ty {
            TypeNode::Ref(_) => vec![ty],
            TypeNode::Or(o) => o.types.iter().flat_map(Type::reference_members).collect(),
            _ => Vec::new(),
        }
    }

    /// Declared type of the child at `key` for composite descriptors.
    pub fn child_type(&self, key: &str) -> Option<Type> {
        match &**self.unwrap_wrappers() {
            TypeNode::Model(m) => m.prop(key).cloned(),
            TypeNode::Arr(a) => Some(a.item.clone()),
            TypeNode::Map(m) => Some(m.value.clone()),
            _ => None,
        }
    }

    pub fn validate(&self, value: &Value) -> ValidationResult {
        let ctx = [ContextEntry {
            path: None,
            ty: self.clone(),
        }];
        let failures = validate_value(self, Some(value), &ctx);
        if failures.is_empty() {
            Ok(())
        } else {
            Err(failures)
        }
    }

    pub fn is(&self, value: &Value) -> bool {
        self.validate(value).is_ok()
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Type({})", self.name())
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}
