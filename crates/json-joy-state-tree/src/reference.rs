//! Reference resolution.
//!
//! A reference slot stores either the identifier of its target or a relative
//! path to it. Nothing is cached: every read looks the target up again from
//! the current position of the reference, so moving the target is picked up
//! (identifier mode) or breaks the reference (path mode) immediately.

use json_joy_tree_path::{format_pointer, RelativePath};
use serde_json::Value;
use tracing::trace;

use crate::error::{ReferenceError, TreeError};
use crate::tree::{identifier_key, NodeId, Payload, Store};
use crate::type_def::{RefType, Type, TypeNode};

fn common_prefix(a: &[String], b: &[String]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

impl Store {
    /// Value stored in the reference slot `segment` of `container` when it is
    /// assigned the live node `target`.
    pub(crate) fn reference_value(
        &self,
        container: NodeId,
        segment: &str,
        reference: &RefType,
        target: NodeId,
    ) -> Result<Value, TreeError> {
        let mut from = self.path_segments(container);
        from.push(segment.to_string());
        if self.root_of(container) != self.root_of(target) {
            return Err(ReferenceError::NotInSameTree {
                from: format_pointer(&from),
                target: self.path(target),
            }
            .into());
        }
        if !self.type_matches(&reference.target, target) {
            return Err(ReferenceError::TypeMismatch {
                path: self.path(target),
                target: reference.target.name(),
            }
            .into());
        }
        if reference.uses_identifier() {
            let data = self.data(target)?;
            return data.identifier.clone().ok_or_else(|| {
                ReferenceError::NoIdentifier {
                    path: self.path(target),
                    type_name: data.ty.name(),
                }
                .into()
            });
        }
        let base = match &reference.path {
            Some(anchor) => anchor.apply(&from)?,
            None => from,
        };
        let rel = RelativePath::between(&base, &self.path_segments(target));
        Ok(Value::String(rel.to_string()))
    }

    /// Reference descriptors that may govern `node`: its own concrete type
    /// first, then the reference members of the slot it sits in.
    fn reference_types(&self, node: NodeId) -> Result<Vec<RefType>, TreeError> {
        let data = self.data(node)?;
        let mut members: Vec<Type> = data.ty.reference_members().into_iter().cloned().collect();
        if let Some(parent) = data.parent {
            let slot = self.child_type(parent, &data.segment)?;
            for member in slot.reference_members() {
                if !members.iter().any(|m| m.ptr_eq(member)) {
                    members.push(member.clone());
                }
            }
        }
        let refs: Vec<RefType> = members
            .iter()
            .filter_map(|m| m.as_reference().cloned())
            .collect();
        if refs.is_empty() {
            return Err(ReferenceError::NotAReference {
                path: self.path(node),
            }
            .into());
        }
        Ok(refs)
    }

    /// Dereferences the reference stored at `key` of `node`.
    pub fn resolve(&self, node: NodeId, key: &str) -> Result<NodeId, TreeError> {
        let child = self.child_node(node, key)?;
        self.resolve_reference(child)
    }

    /// Like [`resolve`](Self::resolve), but yields `None` instead of failing.
    pub fn try_resolve(&self, node: NodeId, key: &str) -> Option<NodeId> {
        self.resolve(node, key).ok()
    }

    /// Dereferences the reference node itself.
    pub fn resolve_reference(&self, node: NodeId) -> Result<NodeId, TreeError> {
        let mut first_err = None;
        for reference in self.reference_types(node)? {
            match self.resolve_with(node, &reference) {
                Ok(found) => return Ok(found),
                Err(err) => {
                    first_err.get_or_insert(err);
                }
            }
        }
        Err(first_err.unwrap_or_else(|| {
            ReferenceError::NotAReference {
                path: self.path(node),
            }
            .into()
        }))
    }

    fn resolve_with(&self, node: NodeId, reference: &RefType) -> Result<NodeId, TreeError> {
        let stored = match &self.data(node)?.payload {
            Payload::Scalar(Value::Null) => {
                return Err(ReferenceError::Empty {
                    path: self.path(node),
                }
                .into())
            }
            Payload::Scalar(v) => v.clone(),
            _ => {
                return Err(ReferenceError::NotAReference {
                    path: self.path(node),
                }
                .into())
            }
        };
        let unresolvable = || -> TreeError {
            ReferenceError::Unresolvable {
                reference: identifier_key(&stored).unwrap_or_else(|| stored.to_string()),
                target: reference.target.name(),
                from: self.path(node),
            }
            .into()
        };

        let here = self.path_segments(node);
        let root = self.root_of(node);
        let found = if reference.uses_identifier() {
            let holder = match &reference.collection {
                Some(template) => template
                    .apply(&here)
                    .ok()
                    .and_then(|segments| self.descend(root, &segments)),
                None => Some(root),
            };
            let key = identifier_key(&stored).ok_or_else(unresolvable)?;
            holder.and_then(|holder| {
                let mut best: Option<(usize, NodeId)> = None;
                for candidate in self.indexed(holder, &key) {
                    if !self.type_matches(&reference.target, *candidate) {
                        continue;
                    }
                    let shared = common_prefix(&here, &self.path_segments(*candidate));
                    if best.map_or(true, |(s, _)| shared > s) {
                        best = Some((shared, *candidate));
                    }
                }
                best.map(|(_, id)| id)
            })
        } else {
            let path = stored.as_str().ok_or_else(unresolvable)?;
            let rel = RelativePath::parse(path).map_err(|_| unresolvable())?;
            let base = match &reference.path {
                Some(anchor) => anchor.apply(&here).map_err(|_| unresolvable())?,
                None => here.clone(),
            };
            let segments = rel.apply(&base).map_err(|_| unresolvable())?;
            match self.descend(root, &segments) {
                Some(target) if !self.type_matches(&reference.target, target) => {
                    return Err(ReferenceError::TypeMismatch {
                        path: self.path(target),
                        target: reference.target.name(),
                    }
                    .into())
                }
                other => other,
            }
        };

        trace!(node = %node, stored = %stored, found = ?found, "resolve reference");
        found.ok_or_else(unresolvable)
    }

    /// Node reached by walking the relative or absolute `path` from `node`.
    pub fn resolve_path(&self, node: NodeId, path: &str) -> Result<NodeId, TreeError> {
        self.data(node)?;
        let rel = RelativePath::parse(path)?;
        let segments = rel.apply(&self.path_segments(node))?;
        self.descend(self.root_of(node), &segments)
            .ok_or_else(|| {
                ReferenceError::Unreachable {
                    path: format_pointer(&segments),
                }
                .into()
            })
    }

    /// `true` when the live `node` is assignable to `ty`.
    pub(crate) fn type_matches(&self, ty: &Type, node: NodeId) -> bool {
        let Some(data) = self.nodes.get(&node) else {
            return false;
        };
        let ty = ty.unwrap_wrappers();
        if let TypeNode::Or(union) = &**ty {
            return union.types.iter().any(|member| self.type_matches(member, node));
        }
        if ty.ptr_eq(&data.ty) {
            return true;
        }
        match (&**ty, &*data.ty) {
            (TypeNode::Model(a), TypeNode::Model(b)) => a.name == b.name,
            _ => self.snapshot(node).is_ok_and(|snapshot| ty.is(&snapshot)),
        }
    }
}
