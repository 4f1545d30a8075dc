//! Factories for constructing descriptors.

use indexmap::IndexMap;
use json_joy_tree_path::RelativePath;
use serde_json::Value;
use std::sync::Arc;

use super::classes::*;
use super::{Type, TypeNode};
use crate::error::SchemaError;

/// Addressing options for [`TypeBuilder::reference_with`].
#[derive(Debug, Clone, Default)]
pub struct RefOptions {
    /// Path-mode anchor template, e.g. `"../../books"`.
    pub path: Option<String>,
    /// Identifier-mode collection template, e.g. `"/books"`.
    pub collection: Option<String>,
}

/// Factory for constructing descriptors.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeBuilder;

impl TypeBuilder {
    pub fn new() -> Self {
        Self
    }

    // ── Primitives ────────────────────────────────────────────────────────

    fn prim(&self, kind: PrimKind) -> Type {
        Type::new(TypeNode::Prim(PrimType { kind }))
    }

    pub fn str(&self) -> Type {
        self.prim(PrimKind::String)
    }

    pub fn num(&self) -> Type {
        self.prim(PrimKind::Number)
    }

    pub fn int(&self) -> Type {
        self.prim(PrimKind::Integer)
    }

    pub fn bool(&self) -> Type {
        self.prim(PrimKind::Boolean)
    }

    pub fn null(&self) -> Type {
        self.prim(PrimKind::Null)
    }

    pub fn literal(&self, value: Value) -> Type {
        Type::new(TypeNode::Literal(LiteralType { value }))
    }

    pub fn frozen(&self) -> Type {
        Type::new(TypeNode::Frozen(FrozenType))
    }

    /// String identifier.
    pub fn identifier(&self) -> Type {
        Type::new(TypeNode::Identifier(IdentifierType {
            base: PrimKind::String,
        }))
    }

    /// Numeric identifier.
    pub fn identifier_number(&self) -> Type {
        Type::new(TypeNode::Identifier(IdentifierType {
            base: PrimKind::Number,
        }))
    }

    /// Identifier over an explicit base descriptor, which must be a string or
    /// number primitive.
    pub fn identifier_of(&self, base: &Type) -> Result<Type, SchemaError> {
        match &**base.resolve() {
            TypeNode::Prim(PrimType {
                kind: PrimKind::String,
            }) => Ok(self.identifier()),
            TypeNode::Prim(PrimType {
                kind: PrimKind::Number | PrimKind::Integer,
            }) => Ok(self.identifier_number()),
            _ => Err(SchemaError::InvalidIdentifierBase {
                found: base.describe(),
            }),
        }
    }

    /// Union of string literals.
    pub fn enumeration(&self, values: &[&str]) -> Type {
        self.or(values
            .iter()
            .map(|v| self.literal(Value::String(v.to_string())))
            .collect())
    }

    // ── Composites ────────────────────────────────────────────────────────

    pub fn model(&self, name: impl Into<String>) -> ModelBuilder {
        ModelBuilder {
            name: name.into(),
            props: Vec::new(),
        }
    }

    /// Merges the properties of several models into a new one; later models
    /// override earlier ones.
    pub fn compose(&self, name: impl Into<String>, models: &[Type]) -> Result<Type, SchemaError> {
        let mut builder = self.model(name);
        for ty in models {
            let model = ty.as_model().ok_or_else(|| SchemaError::NotAModel {
                found: ty.describe(),
            })?;
            for (key, prop) in &model.props {
                builder = builder.prop(key.clone(), prop.clone());
            }
        }
        builder.build()
    }

    pub fn arr(&self, item: Type) -> Type {
        Type::new(TypeNode::Arr(ArrType { item }))
    }

    pub fn map(&self, value: Type) -> Type {
        Type::new(TypeNode::Map(MapType { value }))
    }

    /// Union resolved by structural elimination.
    pub fn or(&self, types: Vec<Type>) -> Type {
        Type::new(TypeNode::Or(OrType {
            types,
            dispatcher: None,
        }))
    }

    /// Union resolved by a dispatcher returning the index of the member to use.
    pub fn or_dispatch<F>(&self, types: Vec<Type>, dispatcher: F) -> Type
    where
        F: Fn(&Value) -> usize + Send + Sync + 'static,
    {
        Type::new(TypeNode::Or(OrType {
            types,
            dispatcher: Some(Arc::new(dispatcher)),
        }))
    }

    // ── References ────────────────────────────────────────────────────────

    pub fn reference(&self, target: Type) -> Type {
        Type::new(TypeNode::Ref(RefType {
            target,
            path: None,
            collection: None,
        }))
    }

    pub fn reference_with(&self, target: Type, opts: RefOptions) -> Result<Type, SchemaError> {
        let path = opts.path.as_deref().map(RelativePath::parse).transpose()?;
        let collection = opts
            .collection
            .as_deref()
            .map(RelativePath::parse)
            .transpose()?;
        Ok(Type::new(TypeNode::Ref(RefType {
            target,
            path,
            collection,
        })))
    }

    // ── Wrappers ──────────────────────────────────────────────────────────

    /// Deferred descriptor; `supplier` runs on first use.
    pub fn late<F>(&self, supplier: F) -> Type
    where
        F: Fn() -> Type + Send + Sync + 'static,
    {
        Type::new(TypeNode::Late(LateType::new(Arc::new(supplier))))
    }

    pub fn optional(&self, inner: Type, default: Value) -> Type {
        Type::new(TypeNode::Optional(OptionalType { inner, default }))
    }

    /// `inner` or `null`, defaulting to `null`.
    pub fn maybe(&self, inner: Type) -> Type {
        let nullable = self.or(vec![inner, self.null()]);
        self.optional(nullable, Value::Null)
    }

    pub fn refinement<F>(&self, inner: Type, name: impl Into<String>, predicate: F) -> Type
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Type::new(TypeNode::Refinement(RefinementType {
            inner,
            name: name.into(),
            predicate: Arc::new(predicate),
            message: None,
        }))
    }

    pub fn refinement_with_message<F>(
        &self,
        inner: Type,
        name: impl Into<String>,
        predicate: F,
        message: impl Into<String>,
    ) -> Type
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Type::new(TypeNode::Refinement(RefinementType {
            inner,
            name: name.into(),
            predicate: Arc::new(predicate),
            message: Some(message.into()),
        }))
    }
}

/// Accumulates model properties; identifier rules are checked in [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct ModelBuilder {
    name: String,
    props: Vec<(String, Type)>,
}

impl ModelBuilder {
    pub fn prop(mut self, key: impl Into<String>, ty: Type) -> Self {
        let key = key.into();
        self.props.retain(|(k, _)| *k != key);
        self.props.push((key, ty));
        self
    }

    pub fn build(self) -> Result<Type, SchemaError> {
        let mut identifier: Option<String> = None;
        let mut props = IndexMap::with_capacity(self.props.len());
        for (key, ty) in self.props {
            // Late props are not resolved here so forward declarations keep working.
            match &*ty {
                TypeNode::Optional(o) if declares_identifier(&o.inner) => {
                    return Err(SchemaError::OptionalIdentifier {
                        model: self.name,
                        property: key,
                    });
                }
                _ if declares_identifier(&ty) => {
                    if let Some(first) = &identifier {
                        return Err(SchemaError::MultipleIdentifiers {
                            model: self.name,
                            first: first.clone(),
                            second: key,
                        });
                    }
                    identifier = Some(key.clone());
                }
                _ => {}
            }
            props.insert(key, ty);
        }
        Ok(Type::new(TypeNode::Model(ModelType {
            name: self.name,
            props,
        })))
    }
}

/// Identifier check that looks through refinements but leaves late types alone.
fn declares_identifier(ty: &Type) -> bool {
    match &**ty {
        TypeNode::Identifier(_) => true,
        TypeNode::Refinement(r) => declares_identifier(&r.inner),
        _ => false,
    }
}
