//! Snapshot reconciliation.
//!
//! Applying a snapshot keeps every node that can absorb its new value: models
//! and collections of the same type (and the same identifier, when they have
//! one) are updated in place, and arrays only splice the window between their
//! longest common prefix and suffix.

use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::debug;

use super::mutate::{is_composite_type, validate_against};
use super::{identifier_key, NodeId, Payload, Planned, Prepared, RawPatch, Store};
use crate::error::TreeError;
use crate::type_def::{Type, TypeNode};

fn same_type(a: &Type, b: &Type) -> bool {
    if a.ptr_eq(b) {
        return true;
    }
    match (&**a, &**b) {
        (TypeNode::Model(x), TypeNode::Model(y)) => x.name == y.name,
        _ => false,
    }
}

impl Store {
    /// Replaces the value of `node` with `snapshot`, reusing as many existing
    /// nodes as possible. The identifier of a model cannot change.
    pub fn apply_snapshot(&mut self, node: NodeId, snapshot: Value) -> Result<(), TreeError> {
        let data = self.data(node)?;
        let ty = data.ty.clone();
        validate_against(&ty, &snapshot)?;
        if let Some(attr) = ty.identifier_attribute() {
            let old = data.identifier.as_ref().and_then(identifier_key);
            let new = snapshot.get(attr).and_then(identifier_key);
            if old != new {
                return Err(TreeError::IdentifierImmutable {
                    attribute: attr.to_string(),
                    old: old.unwrap_or_default(),
                    new: new.unwrap_or_default(),
                });
            }
        }
        debug!(node = %node, ty = %ty.name(), "apply snapshot");
        self.apply_snapshot_inner(node, snapshot)
    }

    /// Applies an already validated snapshot.
    pub(crate) fn apply_snapshot_inner(&mut self, node: NodeId, value: Value) -> Result<(), TreeError> {
        let data = self.data(node)?;
        match &data.payload {
            Payload::Scalar(previous) => {
                if *previous == value {
                    return Ok(());
                }
                let previous = previous.clone();
                let parent = data.parent;
                let segment = data.segment.clone();
                self.data_mut(node)?.payload = Payload::Scalar(value.clone());
                match parent {
                    Some(parent) => self.emit(parent, vec![RawPatch::replace(Some(segment), value, previous)]),
                    None => self.emit(node, vec![RawPatch::replace(None, value, previous)]),
                }
                Ok(())
            }
            Payload::Model(_) => {
                let props: Vec<(String, Type)> = data
                    .ty
                    .as_model()
                    .map(|m| m.props.iter().map(|(k, t)| (k.clone(), t.clone())).collect())
                    .unwrap_or_default();
                for (key, prop) in props {
                    let child = value
                        .get(&key)
                        .cloned()
                        .or_else(|| prop.default_value())
                        .unwrap_or(Value::Null);
                    self.replace_child(node, &key, &prop, Prepared::Fresh(child))?;
                }
                Ok(())
            }
            Payload::Array(_) => match value {
                Value::Array(items) => self.reconcile_array(node, items),
                _ => Ok(()),
            },
            Payload::Map(_) => match value {
                Value::Object(entries) => self.reconcile_map(node, entries),
                _ => Ok(()),
            },
        }
    }

    /// `true` when `node` can take `value` (valid for `slot`) without being replaced.
    fn reconcilable(&self, node: NodeId, slot: &Type, value: &Value) -> bool {
        let Some(data) = self.nodes.get(&node) else {
            return false;
        };
        let concrete = Self::concrete_type(slot, value);
        if !data.is_composite() {
            return !is_composite_type(&concrete);
        }
        if !same_type(&data.ty, &concrete) {
            return false;
        }
        match concrete.identifier_attribute() {
            Some(attr) => {
                let old = data.identifier.as_ref().and_then(identifier_key);
                old.is_some() && old == value.get(attr).and_then(identifier_key)
            }
            None => true,
        }
    }

    /// Updates the composite `node` in place when it can absorb `value`.
    pub(crate) fn try_reconcile(&mut self, node: NodeId, slot: &Type, value: &Value) -> Result<bool, TreeError> {
        if !self.data(node)?.is_composite() || !self.reconcilable(node, slot, value) {
            return Ok(false);
        }
        self.apply_snapshot_inner(node, value.clone())?;
        Ok(true)
    }

    fn reconcile_array(&mut self, array: NodeId, items: Vec<Value>) -> Result<(), TreeError> {
        let item_ty = self.child_type(array, "0")?;
        let old = match &self.data(array)?.payload {
            Payload::Array(children) => children.clone(),
            _ => Vec::new(),
        };
        let (n, m) = (old.len(), items.len());

        let mut prefix = 0;
        while prefix < n && prefix < m && self.reconcilable(old[prefix], &item_ty, &items[prefix]) {
            prefix += 1;
        }
        let mut suffix = 0;
        while suffix < n - prefix
            && suffix < m - prefix
            && self.reconcilable(old[n - 1 - suffix], &item_ty, &items[m - 1 - suffix])
        {
            suffix += 1;
        }

        for (i, item) in items.iter().enumerate().take(prefix) {
            self.replace_child(array, &i.to_string(), &item_ty, Prepared::Fresh(item.clone()))?;
        }

        let window: Vec<NodeId> = old[prefix..n - suffix].to_vec();
        let incoming = &items[prefix..m - suffix];
        if !window.is_empty() || !incoming.is_empty() {
            let mut used = HashSet::new();
            let mut plans = Vec::with_capacity(incoming.len());
            for value in incoming {
                let reuse = window.iter().copied().find(|candidate| {
                    !used.contains(candidate)
                        && self.nodes.get(candidate).is_some_and(|d| d.identifier.is_some())
                        && self.reconcilable(*candidate, &item_ty, value)
                });
                plans.push(match reuse {
                    Some(node) => {
                        used.insert(node);
                        Planned::Update(node, value.clone())
                    }
                    None => Planned::Create(value.clone()),
                });
            }
            self.commit_splice(array, prefix, window.len(), plans)?;
        }

        for (i, item) in items.iter().enumerate().skip(m - suffix) {
            self.replace_child(array, &i.to_string(), &item_ty, Prepared::Fresh(item.clone()))?;
        }
        Ok(())
    }

    fn reconcile_map(&mut self, map: NodeId, entries: Map<String, Value>) -> Result<(), TreeError> {
        let slot = self.child_type(map, "")?;
        let existing: Vec<String> = self.children(map)?.into_iter().map(|(k, _)| k).collect();
        for key in existing {
            if !entries.contains_key(&key) {
                self.remove_entry(map, &key)?;
            }
        }
        for (key, value) in &entries {
            if self.data(map)?.payload.child(key).is_some() {
                self.replace_child(map, key, &slot, Prepared::Fresh(value.clone()))?;
            } else {
                self.add_entry(map, key, Prepared::Fresh(value.clone()))?;
            }
        }
        if let Payload::Map(children) = &mut self.data_mut(map)?.payload {
            let ordered: IndexMap<String, NodeId> = entries
                .keys()
                .filter_map(|k| children.get(k).map(|id| (k.clone(), *id)))
                .collect();
            *children = ordered;
        }
        Ok(())
    }
}
