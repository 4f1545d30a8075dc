//! Typed mutations on live containers.
//!
//! Every public mutation follows the same two phases: interceptors see the
//! pending [`Change`] and may rewrite or reject it, then the inputs are
//! validated and planned. Only once everything is known to succeed is the
//! arena touched and the resulting patches emitted.

use serde_json::Value;
use std::collections::HashSet;
use tracing::debug;

use super::{
    identifier_key, Change, ChangeKind, Input, MovePolicy, NodeId, Payload, Planned, Prepared,
    RawPatch, Store,
};
use crate::error::TreeError;
use crate::type_def::{Type, TypeNode};
use crate::validation::ValidationError;

/// Descriptors that instantiate as containers rather than scalars.
pub(crate) fn is_composite_type(ty: &Type) -> bool {
    matches!(&**ty, TypeNode::Model(_) | TypeNode::Arr(_) | TypeNode::Map(_))
}

fn identifier_text(value: &Value) -> String {
    identifier_key(value).unwrap_or_else(|| value.to_string())
}

impl Store {
    // ── Preparation ───────────────────────────────────────────────────────

    /// Validates `input` for the slot `segment` of `container`, whose declared
    /// type is `slot`. Live nodes offered to a reference slot are turned into
    /// the stored reference value.
    pub(crate) fn prepare(
        &self,
        container: NodeId,
        segment: &str,
        slot: &Type,
        input: Input,
    ) -> Result<Prepared, TreeError> {
        match input {
            Input::Snapshot(value) => {
                validate_against(slot, &value)?;
                Ok(Prepared::Fresh(value))
            }
            Input::Node(node) => {
                self.data(node)?;
                let members = slot.reference_members();
                if let Some(&first) = members.first() {
                    // the member whose target accepts the node, else the first for its error
                    let member = members
                        .iter()
                        .copied()
                        .find(|m| {
                            m.as_reference()
                                .is_some_and(|r| self.type_matches(&r.target, node))
                        })
                        .unwrap_or(first);
                    if let Some(reference) = member.as_reference() {
                        let value = self.reference_value(container, segment, reference, node)?;
                        let check = if members.len() == 1 { slot } else { member };
                        validate_against(check, &value)?;
                        return Ok(Prepared::Fresh(value));
                    }
                }
                if self.is_ancestor_or_self(node, container) {
                    return Err(TreeError::InvalidOperation(format!(
                        "cannot attach the node at '{}' inside itself",
                        self.path(node)
                    )));
                }
                let snapshot = self.snapshot(node)?;
                validate_against(slot, &snapshot)?;
                Ok(Prepared::Existing(node))
            }
        }
    }

    /// Checks that an attached node may be taken out of its current parent.
    pub(crate) fn check_movable(&self, node: NodeId) -> Result<(), TreeError> {
        let data = self.data(node)?;
        let Some(parent) = data.parent else {
            return Ok(());
        };
        if self.options.move_policy == MovePolicy::Reject {
            return Err(TreeError::AlreadyAttached(self.path(node)));
        }
        match self.data(parent)?.payload {
            Payload::Array(_) | Payload::Map(_) => Ok(()),
            _ => Err(TreeError::InvalidOperation(format!(
                "cannot move the node at '{}': model properties cannot be detached",
                self.path(node)
            ))),
        }
    }

    /// Re-numbers the path segments of array elements from `from` onwards.
    fn reindex(&mut self, array: NodeId, from: usize) {
        let children = match self.nodes.get(&array).map(|d| &d.payload) {
            Some(Payload::Array(children)) => children.clone(),
            _ => return,
        };
        for (i, child) in children.iter().enumerate().skip(from) {
            if let Some(data) = self.nodes.get_mut(child) {
                data.segment = i.to_string();
            }
        }
    }

    /// Takes `node` out of its array or map parent, leaving it as the root of
    /// its own tree. Emits a `remove` patch on the old parent.
    pub(crate) fn detach_node(&mut self, node: NodeId) -> Result<(), TreeError> {
        let data = self.data(node)?;
        let Some(parent) = data.parent else {
            return Ok(());
        };
        let segment = data.segment.clone();
        if !self.data(parent)?.is_collection() {
            return Err(TreeError::InvalidOperation(format!(
                "cannot detach the node at '{}': model properties cannot be detached",
                self.path(node)
            )));
        }
        let old = self.snapshot(node)?;
        self.unregister_subtree(node);
        let mut reindex_from = None;
        match &mut self.data_mut(parent)?.payload {
            Payload::Array(children) => {
                if let Some(index) = children.iter().position(|c| *c == node) {
                    children.remove(index);
                    reindex_from = Some(index);
                }
            }
            Payload::Map(children) => {
                children.shift_remove(&segment);
            }
            _ => {}
        }
        if let Some(index) = reindex_from {
            self.reindex(parent, index);
        }
        let data = self.data_mut(node)?;
        data.parent = None;
        data.segment = String::new();
        self.register_subtree(node);
        debug!(node = %node, from = %parent, "detached");
        self.emit(parent, vec![RawPatch::remove(segment, old)]);
        Ok(())
    }

    /// Makes the unattached `node` a child of `parent` under `segment`. The
    /// caller puts it into the parent's payload and registers identifiers.
    fn adopt(&mut self, node: NodeId, parent: NodeId, segment: String) -> Result<(), TreeError> {
        self.unregister_subtree(node);
        let data = self.data_mut(node)?;
        data.parent = Some(parent);
        data.segment = segment;
        Ok(())
    }

    /// Unregisters and removes a subtree that is no longer referenced by its parent.
    fn discard(&mut self, node: NodeId) {
        self.unregister_subtree(node);
        self.destroy_subtree(node);
    }

    // ── Single slot replacement ───────────────────────────────────────────

    /// Puts `prepared` into the existing slot `key` of `container`.
    pub(crate) fn replace_child(
        &mut self,
        container: NodeId,
        key: &str,
        slot: &Type,
        prepared: Prepared,
    ) -> Result<(), TreeError> {
        let old = self.child_node(container, key)?;
        match prepared {
            Prepared::Fresh(value) => {
                if self.try_reconcile(old, slot, &value)? {
                    return Ok(());
                }
                let concrete = Self::concrete_type(slot, &value);
                let old_data = self.data(old)?;
                if !old_data.is_composite() && !is_composite_type(&concrete) {
                    // scalars keep their node and only swap the value
                    let previous = match &old_data.payload {
                        Payload::Scalar(v) => v.clone(),
                        _ => Value::Null,
                    };
                    if previous == value {
                        return Ok(());
                    }
                    let data = self.data_mut(old)?;
                    data.ty = concrete;
                    data.payload = Payload::Scalar(value.clone());
                    self.emit(
                        container,
                        vec![RawPatch::replace(Some(key.to_string()), value, previous)],
                    );
                    return Ok(());
                }
                let previous = self.snapshot(old)?;
                let fresh = self.instantiate(slot, &value, Some(container), key.to_string());
                self.swap_child(container, key, old, fresh)?;
                self.emit(
                    container,
                    vec![RawPatch::replace(Some(key.to_string()), value, previous)],
                );
                Ok(())
            }
            Prepared::Existing(node) => {
                if node == old {
                    return Ok(());
                }
                self.check_movable(node)?;
                self.detach_node(node)?;
                let previous = self.snapshot(old)?;
                self.adopt(node, container, key.to_string())?;
                self.swap_child(container, key, old, node)?;
                let value = self.snapshot(node)?;
                self.emit(
                    container,
                    vec![RawPatch::replace(Some(key.to_string()), value, previous)],
                );
                Ok(())
            }
        }
    }

    /// Replaces `old` with the already parented `new` in the payload of `container`.
    fn swap_child(
        &mut self,
        container: NodeId,
        key: &str,
        old: NodeId,
        new: NodeId,
    ) -> Result<(), TreeError> {
        self.unregister_subtree(old);
        match &mut self.data_mut(container)?.payload {
            Payload::Model(children) | Payload::Map(children) => {
                if let Some(slot) = children.get_mut(key) {
                    *slot = new;
                }
            }
            Payload::Array(children) => {
                if let Some(slot) = children.iter_mut().find(|c| **c == old) {
                    *slot = new;
                }
            }
            Payload::Scalar(_) => {}
        }
        self.destroy_subtree(old);
        self.register_subtree(new);
        Ok(())
    }

    // ── Generic entry point ───────────────────────────────────────────────

    /// Assigns `input` to `key` of a model, array or map node.
    pub fn set(&mut self, node: NodeId, key: &str, input: impl Into<Input>) -> Result<(), TreeError> {
        let input = input.into();
        match self.data(node)?.payload {
            Payload::Model(_) => self.set_prop(node, key, input),
            Payload::Array(_) => {
                let index = key.parse::<usize>().map_err(|_| TreeError::NoSuchChild {
                    path: self.path(node),
                    key: key.to_string(),
                })?;
                self.set_index(node, index, input)
            }
            Payload::Map(_) => self.map_put(node, key, input).map(|_| ()),
            Payload::Scalar(_) => Err(TreeError::WrongContainer {
                path: self.path(node),
                expected: "a model, array or map",
            }),
        }
    }

    // ── Models ────────────────────────────────────────────────────────────

    /// Assigns a model property. Identifier properties only accept their current value.
    pub fn set_prop(&mut self, model: NodeId, prop: &str, input: impl Into<Input>) -> Result<(), TreeError> {
        let data = self.data(model)?;
        if !matches!(data.payload, Payload::Model(_)) {
            return Err(TreeError::WrongContainer {
                path: self.path(model),
                expected: "a model",
            });
        }
        let mut change = Change {
            object: model,
            path: self.path(model),
            kind: ChangeKind::Update {
                key: prop.to_string(),
                value: input.into(),
            },
        };
        self.run_interceptors(&mut change)?;
        let ChangeKind::Update { key, value } = change.kind else {
            return Err(TreeError::InvalidOperation(
                "interceptor changed the kind of a property update".to_string(),
            ));
        };

        let data = self.data(model)?;
        let model_ty = data.ty.clone();
        let slot = self.child_type(model, &key)?;
        let prepared = self.prepare(model, &key, &slot, value)?;

        if model_ty.identifier_attribute() == Some(key.as_str()) {
            let old = data.identifier.clone().unwrap_or(Value::Null);
            let new = match &prepared {
                Prepared::Fresh(v) => v.clone(),
                Prepared::Existing(n) => self.snapshot(*n)?,
            };
            if identifier_key(&old) == identifier_key(&new) {
                return Ok(());
            }
            return Err(TreeError::IdentifierImmutable {
                attribute: key,
                old: identifier_text(&old),
                new: identifier_text(&new),
            });
        }

        debug!(node = %model, prop = %key, "set property");
        self.replace_child(model, &key, &slot, prepared)
    }

    // ── Arrays ────────────────────────────────────────────────────────────

    fn array_len(&self, array: NodeId) -> Result<usize, TreeError> {
        match &self.data(array)?.payload {
            Payload::Array(children) => Ok(children.len()),
            _ => Err(TreeError::WrongContainer {
                path: self.path(array),
                expected: "an array",
            }),
        }
    }

    /// Removes `delete_count` elements at `start` and inserts `items` in their
    /// place. Out of range arguments are clamped. Returns the snapshots of the
    /// removed elements.
    pub fn splice(
        &mut self,
        array: NodeId,
        start: usize,
        delete_count: usize,
        items: Vec<Input>,
    ) -> Result<Vec<Value>, TreeError> {
        let len = self.array_len(array)?;
        let start = start.min(len);
        let mut change = Change {
            object: array,
            path: self.path(array),
            kind: ChangeKind::Splice {
                index: start,
                removed: delete_count.min(len - start),
                added: items,
            },
        };
        self.run_interceptors(&mut change)?;
        let ChangeKind::Splice {
            index,
            removed,
            added,
        } = change.kind
        else {
            return Err(TreeError::InvalidOperation(
                "interceptor changed the kind of a splice".to_string(),
            ));
        };
        let start = index.min(len);
        let removed = removed.min(len - start);

        let item_ty = self.child_type(array, "0")?;
        let children = match &self.data(array)?.payload {
            Payload::Array(children) => children.clone(),
            _ => Vec::new(),
        };
        let window: HashSet<NodeId> = children[start..start + removed].iter().copied().collect();

        let mut plans = Vec::with_capacity(added.len());
        let mut seen = HashSet::new();
        for (offset, input) in added.into_iter().enumerate() {
            let segment = (start + offset).to_string();
            match self.prepare(array, &segment, &item_ty, input)? {
                Prepared::Fresh(value) => plans.push(Planned::Create(value)),
                Prepared::Existing(node) => {
                    if !seen.insert(node) {
                        return Err(TreeError::InvalidOperation(format!(
                            "node {node} is inserted more than once"
                        )));
                    }
                    if window.contains(&node) {
                        plans.push(Planned::Reuse(node));
                    } else {
                        self.check_movable(node)?;
                        plans.push(Planned::Move(node));
                    }
                }
            }
        }
        self.check_unique_identifiers(array, &children, start, removed, &item_ty, &plans)?;

        debug!(node = %array, start, removed, added = plans.len(), "splice");
        self.commit_splice(array, start, removed, plans)
    }

    /// Rejects a splice that would leave two elements with the same identifier.
    fn check_unique_identifiers(
        &self,
        array: NodeId,
        children: &[NodeId],
        start: usize,
        removed: usize,
        item_ty: &Type,
        plans: &[Planned],
    ) -> Result<(), TreeError> {
        let moved: HashSet<NodeId> = plans.iter().filter_map(Planned::existing).collect();
        let mut keys: HashSet<String> = HashSet::new();
        let mut check = |key: Option<String>| -> Result<(), TreeError> {
            if let Some(key) = key {
                if !keys.insert(key.clone()) {
                    return Err(TreeError::DuplicateIdentifier {
                        path: self.path(array),
                        identifier: key,
                    });
                }
            }
            Ok(())
        };
        for (i, child) in children.iter().enumerate() {
            if (start..start + removed).contains(&i) || moved.contains(child) {
                continue;
            }
            check(self.identifier(*child)?.as_ref().and_then(identifier_key))?;
        }
        for plan in plans {
            let key = match plan {
                Planned::Create(value) | Planned::Update(_, value) => {
                    let concrete = Self::concrete_type(item_ty, value);
                    concrete
                        .identifier_attribute()
                        .and_then(|attr| value.get(attr))
                        .and_then(identifier_key)
                }
                Planned::Reuse(node) | Planned::Move(node) => {
                    self.identifier(*node)?.as_ref().and_then(identifier_key)
                }
            };
            check(key)?;
        }
        Ok(())
    }

    /// Applies a planned splice and emits its patches: removals from the
    /// highest index down, then additions from the lowest index up.
    pub(crate) fn commit_splice(
        &mut self,
        array: NodeId,
        mut start: usize,
        removed: usize,
        plans: Vec<Planned>,
    ) -> Result<Vec<Value>, TreeError> {
        for plan in &plans {
            if let Planned::Move(node) = plan {
                let data = self.data(*node)?;
                if data.parent == Some(array) {
                    if let Ok(index) = data.segment.parse::<usize>() {
                        if index < start {
                            start -= 1;
                        }
                    }
                }
                self.detach_node(*node)?;
            }
        }

        let children = match &self.data(array)?.payload {
            Payload::Array(children) => children.clone(),
            _ => Vec::new(),
        };
        let outgoing: Vec<NodeId> = children[start..start + removed].to_vec();
        let kept: HashSet<NodeId> = plans.iter().filter_map(Planned::existing).collect();
        let mut removed_snapshots = Vec::with_capacity(outgoing.len());
        for node in &outgoing {
            removed_snapshots.push(self.snapshot(*node)?);
            self.unregister_subtree(*node);
        }

        let item_ty = self.child_type(array, "0")?;
        let mut incoming = Vec::with_capacity(plans.len());
        let mut updates = Vec::new();
        for (offset, plan) in plans.into_iter().enumerate() {
            let segment = (start + offset).to_string();
            let node = match plan {
                Planned::Create(value) => self.instantiate(&item_ty, &value, Some(array), segment),
                Planned::Reuse(node) => node,
                Planned::Update(node, value) => {
                    updates.push((node, value));
                    node
                }
                Planned::Move(node) => {
                    self.adopt(node, array, segment)?;
                    node
                }
            };
            incoming.push(node);
        }

        if let Payload::Array(children) = &mut self.data_mut(array)?.payload {
            children.splice(start..start + removed, incoming.iter().copied());
        }
        for node in &outgoing {
            if !kept.contains(node) {
                self.destroy_subtree(*node);
            }
        }
        self.reindex(array, start);
        for node in &incoming {
            if let Some(data) = self.nodes.get_mut(node) {
                data.parent = Some(array);
            }
        }

        let muted = std::mem::replace(&mut self.muted, true);
        let updated = updates
            .into_iter()
            .try_for_each(|(node, value)| self.apply_snapshot_inner(node, value));
        self.muted = muted;
        updated?;

        for node in &incoming {
            self.register_subtree(*node);
        }

        let mut patches = Vec::with_capacity(removed + incoming.len());
        for (offset, old) in removed_snapshots.iter().enumerate().rev() {
            patches.push(RawPatch::remove((start + offset).to_string(), old.clone()));
        }
        for (offset, node) in incoming.iter().enumerate() {
            patches.push(RawPatch::add((start + offset).to_string(), self.snapshot(*node)?));
        }
        self.emit(array, patches);
        Ok(removed_snapshots)
    }

    /// Appends `input` and returns the node now at the end of the array.
    pub fn push(&mut self, array: NodeId, input: impl Into<Input>) -> Result<NodeId, TreeError> {
        let len = self.array_len(array)?;
        self.insert(array, len, input)
    }

    pub fn insert(&mut self, array: NodeId, index: usize, input: impl Into<Input>) -> Result<NodeId, TreeError> {
        let len = self.array_len(array)?;
        if index > len {
            return Err(TreeError::InvalidIndex {
                path: self.path(array),
                index,
                len,
            });
        }
        self.splice(array, index, 0, vec![input.into()])?;
        self.child_node(array, &index.to_string())
    }

    /// Removes the element at `index`, returning its snapshot.
    pub fn remove_at(&mut self, array: NodeId, index: usize) -> Result<Value, TreeError> {
        let len = self.array_len(array)?;
        if index >= len {
            return Err(TreeError::InvalidIndex {
                path: self.path(array),
                index,
                len,
            });
        }
        self.splice(array, index, 1, Vec::new())?
            .pop()
            .ok_or_else(|| TreeError::InvalidOperation("interceptor cancelled the removal".to_string()))
    }

    /// Replaces the element at `index`, emitting a single `replace` patch.
    pub fn set_index(&mut self, array: NodeId, index: usize, input: impl Into<Input>) -> Result<(), TreeError> {
        let len = self.array_len(array)?;
        if index >= len {
            return Err(TreeError::InvalidIndex {
                path: self.path(array),
                index,
                len,
            });
        }
        let mut change = Change {
            object: array,
            path: self.path(array),
            kind: ChangeKind::Update {
                key: index.to_string(),
                value: input.into(),
            },
        };
        self.run_interceptors(&mut change)?;
        let ChangeKind::Update { key, value } = change.kind else {
            return Err(TreeError::InvalidOperation(
                "interceptor changed the kind of an element update".to_string(),
            ));
        };
        let item_ty = self.child_type(array, &key)?;
        let prepared = self.prepare(array, &key, &item_ty, value)?;
        if let Prepared::Existing(node) = &prepared {
            let data = self.data(*node)?;
            if data.parent == Some(array) && data.segment != key {
                return Err(TreeError::InvalidOperation(format!(
                    "node {node} is already an element of this array; use splice to reorder"
                )));
            }
        }

        let children = match &self.data(array)?.payload {
            Payload::Array(children) => children.clone(),
            _ => Vec::new(),
        };
        let slot: usize = key.parse().unwrap_or(index);
        let plans = [match &prepared {
            Prepared::Fresh(value) => Planned::Create(value.clone()),
            Prepared::Existing(node) => Planned::Move(*node),
        }];
        self.check_unique_identifiers(array, &children, slot, 1, &item_ty, &plans)?;

        debug!(node = %array, index = slot, "set element");
        self.replace_child(array, &key, &item_ty, prepared)
    }

    /// Removes every element, returning their snapshots.
    pub fn clear(&mut self, array: NodeId) -> Result<Vec<Value>, TreeError> {
        let len = self.array_len(array)?;
        self.splice(array, 0, len, Vec::new())
    }

    // ── Maps ──────────────────────────────────────────────────────────────

    fn ensure_map(&self, map: NodeId) -> Result<(), TreeError> {
        match self.data(map)?.payload {
            Payload::Map(_) => Ok(()),
            _ => Err(TreeError::WrongContainer {
                path: self.path(map),
                expected: "a map",
            }),
        }
    }

    /// Inserts or replaces the entry `key`, returning the entry node.
    pub fn map_put(&mut self, map: NodeId, key: &str, input: impl Into<Input>) -> Result<NodeId, TreeError> {
        self.ensure_map(map)?;
        let mut change = Change {
            object: map,
            path: self.path(map),
            kind: ChangeKind::Update {
                key: key.to_string(),
                value: input.into(),
            },
        };
        self.run_interceptors(&mut change)?;
        let ChangeKind::Update { key, value } = change.kind else {
            return Err(TreeError::InvalidOperation(
                "interceptor changed the kind of a map update".to_string(),
            ));
        };

        let map_ty = self.data(map)?.ty.clone();
        let slot = self.child_type(map, &key)?;
        let prepared = self.prepare(map, &key, &slot, value)?;
        // the entry key has to agree with the identifier of the value
        let entry = match &prepared {
            Prepared::Fresh(v) => v.clone(),
            Prepared::Existing(n) => self.snapshot(*n)?,
        };
        let single = Value::Object([(key.clone(), entry)].into_iter().collect());
        validate_against(&map_ty, &single)?;

        debug!(node = %map, key = %key, "map put");
        if self.data(map)?.payload.child(&key).is_some() {
            self.replace_child(map, &key, &slot, prepared)?;
        } else {
            self.add_entry(map, &key, prepared)?;
        }
        self.child_node(map, &key)
    }

    /// Inserts `input` under its own identifier.
    pub fn map_put_identified(&mut self, map: NodeId, input: impl Into<Input>) -> Result<NodeId, TreeError> {
        self.ensure_map(map)?;
        let input = input.into();
        let slot = self.child_type(map, "")?;
        let Some(attr) = slot.identifier_attribute().map(str::to_string) else {
            return Err(TreeError::InvalidOperation(format!(
                "values of the map at '{}' have no identifier",
                self.path(map)
            )));
        };
        let key = match &input {
            Input::Snapshot(value) => value.get(&attr).and_then(identifier_key),
            Input::Node(node) => self.identifier(*node)?.as_ref().and_then(identifier_key),
        };
        match key {
            Some(key) => self.map_put(map, &key, input),
            None => {
                let value = match &input {
                    Input::Snapshot(v) => v.clone(),
                    Input::Node(n) => self.snapshot(*n)?,
                };
                validate_against(&slot, &value)?;
                Err(TreeError::InvalidOperation(format!(
                    "value has no identifier under '{attr}'"
                )))
            }
        }
    }

    /// Adds a new entry without consulting interceptors.
    pub(crate) fn add_entry(&mut self, map: NodeId, key: &str, prepared: Prepared) -> Result<NodeId, TreeError> {
        let node = match prepared {
            Prepared::Fresh(value) => {
                let slot = self.child_type(map, key)?;
                self.instantiate(&slot, &value, Some(map), key.to_string())
            }
            Prepared::Existing(node) => {
                self.check_movable(node)?;
                self.detach_node(node)?;
                self.adopt(node, map, key.to_string())?;
                node
            }
        };
        if let Payload::Map(children) = &mut self.data_mut(map)?.payload {
            children.insert(key.to_string(), node);
        }
        self.register_subtree(node);
        let value = self.snapshot(node)?;
        self.emit(map, vec![RawPatch::add(key, value)]);
        Ok(node)
    }

    /// Removes an entry without consulting interceptors.
    pub(crate) fn remove_entry(&mut self, map: NodeId, key: &str) -> Result<Option<Value>, TreeError> {
        let Some(node) = self.data(map)?.payload.child(key) else {
            return Ok(None);
        };
        let old = self.snapshot(node)?;
        self.unregister_subtree(node);
        if let Payload::Map(children) = &mut self.data_mut(map)?.payload {
            children.shift_remove(key);
        }
        self.destroy_subtree(node);
        self.emit(map, vec![RawPatch::remove(key, old.clone())]);
        Ok(Some(old))
    }

    /// Deletes the entry `key`, returning its snapshot if it existed.
    pub fn map_delete(&mut self, map: NodeId, key: &str) -> Result<Option<Value>, TreeError> {
        self.ensure_map(map)?;
        let mut change = Change {
            object: map,
            path: self.path(map),
            kind: ChangeKind::Delete {
                key: key.to_string(),
            },
        };
        self.run_interceptors(&mut change)?;
        let ChangeKind::Delete { key } = change.kind else {
            return Err(TreeError::InvalidOperation(
                "interceptor changed the kind of a map delete".to_string(),
            ));
        };
        debug!(node = %map, key = %key, "map delete");
        self.remove_entry(map, &key)
    }

    pub fn map_clear(&mut self, map: NodeId) -> Result<(), TreeError> {
        self.ensure_map(map)?;
        let keys: Vec<String> = self.children(map)?.into_iter().map(|(k, _)| k).collect();
        for key in keys {
            self.map_delete(map, &key)?;
        }
        Ok(())
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────

    /// Takes `node` out of its parent collection; it keeps its identity and
    /// becomes the root of a new tree.
    pub fn detach(&mut self, node: NodeId) -> Result<(), TreeError> {
        if self.data(node)?.parent.is_none() {
            return Ok(());
        }
        self.detach_node(node)
    }

    /// Removes `node` from its parent (if any) and kills the whole subtree.
    pub fn destroy(&mut self, node: NodeId) -> Result<(), TreeError> {
        let data = self.data(node)?;
        let Some(parent) = data.parent else {
            debug!(node = %node, "destroy tree");
            self.discard(node);
            return Ok(());
        };
        let segment = data.segment.clone();
        match self.data(parent)?.payload {
            Payload::Array(_) => {
                let index = segment.parse::<usize>().map_err(|_| {
                    TreeError::InvalidOperation(format!("bad array segment '{segment}'"))
                })?;
                self.remove_at(parent, index).map(|_| ())
            }
            Payload::Map(_) => self.map_delete(parent, &segment).map(|_| ()),
            _ => Err(TreeError::InvalidOperation(format!(
                "cannot destroy the node at '{}': model properties cannot be removed",
                self.path(node)
            ))),
        }
    }
}

pub(crate) fn validate_against(ty: &Type, value: &Value) -> Result<(), TreeError> {
    ty.validate(value)
        .map_err(|failures| ValidationError::new(Some(value), ty, failures).into())
}
