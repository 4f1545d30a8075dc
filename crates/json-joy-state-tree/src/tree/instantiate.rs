//! Instantiation and destruction of node subtrees.

use indexmap::IndexMap;
use serde_json::Value;
use std::collections::HashSet;
use tracing::trace;

use super::{NodeData, NodeId, Payload, Store};
use crate::type_def::{Type, TypeNode};
use crate::validation::dispatch_union;

impl Store {
    /// The descriptor a node instantiated from `value` in a slot of type `ty`
    /// will carry: wrappers removed, unions dispatched.
    pub(crate) fn concrete_type(ty: &Type, value: &Value) -> Type {
        match &**ty {
            TypeNode::Late(l) => Self::concrete_type(l.target(), value),
            TypeNode::Optional(o) => Self::concrete_type(&o.inner, value),
            TypeNode::Refinement(r) => Self::concrete_type(&r.inner, value),
            TypeNode::Or(o) => match dispatch_union(o, value) {
                Some(member) => Self::concrete_type(member, value),
                None => ty.clone(),
            },
            _ => ty.clone(),
        }
    }

    /// Builds the subtree for an already validated snapshot. Identifiers are
    /// not registered; the caller does that once the subtree is in place.
    pub(crate) fn instantiate(
        &mut self,
        ty: &Type,
        value: &Value,
        parent: Option<NodeId>,
        segment: String,
    ) -> NodeId {
        let concrete = Self::concrete_type(ty, value);
        let id = self.alloc(NodeData::new(concrete.clone(), parent, segment));
        let mut identifier = None;
        let payload = match &*concrete {
            TypeNode::Model(m) => {
                let obj = value.as_object();
                let mut children = IndexMap::with_capacity(m.props.len());
                for (key, prop) in &m.props {
                    let child_value = obj
                        .and_then(|o| o.get(key).cloned())
                        .or_else(|| prop.default_value())
                        .unwrap_or(Value::Null);
                    let child = self.instantiate(prop, &child_value, Some(id), key.clone());
                    children.insert(key.clone(), child);
                }
                identifier = m
                    .identifier()
                    .and_then(|attr| obj.and_then(|o| o.get(attr)).cloned());
                Payload::Model(children)
            }
            TypeNode::Arr(a) => {
                let items = value.as_array().map(Vec::as_slice).unwrap_or_default();
                let mut children = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    children.push(self.instantiate(&a.item, item, Some(id), i.to_string()));
                }
                Payload::Array(children)
            }
            TypeNode::Map(m) => {
                let mut children = IndexMap::new();
                if let Some(obj) = value.as_object() {
                    for (key, entry) in obj {
                        let child = self.instantiate(&m.value, entry, Some(id), key.clone());
                        children.insert(key.clone(), child);
                    }
                }
                Payload::Map(children)
            }
            _ => Payload::Scalar(value.clone()),
        };
        if let Some(data) = self.nodes.get_mut(&id) {
            data.payload = payload;
            data.identifier = identifier;
        }
        id
    }

    /// Preorder list of `node` and its descendants.
    pub(crate) fn subtree(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            let Some(data) = self.nodes.get(&id) else { continue };
            out.push(id);
            let mut children = data.payload.child_ids();
            children.reverse();
            stack.extend(children);
        }
        out
    }

    /// Removes `node` and its descendants from the arena, together with any
    /// listeners bound to them. Identifier entries must already be gone.
    pub(crate) fn destroy_subtree(&mut self, node: NodeId) {
        let doomed: HashSet<NodeId> = self.subtree(node).into_iter().collect();
        for id in &doomed {
            self.nodes.remove(id);
        }
        self.listeners.retain(|_, l| !doomed.contains(&l.node));
        self.interceptors.retain(|_, i| !doomed.contains(&i.node));
        trace!(node = %node, count = doomed.len(), "destroyed subtree");
    }
}
