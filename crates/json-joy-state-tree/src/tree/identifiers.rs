//! Identifier index.
//!
//! Every identified node is indexed on two holders: the nearest enclosing
//! collection (array or map) and the root of its tree. Entries are added and
//! removed per subtree as nodes attach and detach, so the cost of an update is
//! bounded by the size of the moved subtree.

use serde_json::Value;

use super::{NodeId, Store};
use crate::type_def::Type;

/// Index key of an identifier value. Only strings and numbers qualify.
pub(crate) fn identifier_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl Store {
    fn index_holders(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(2);
        let mut root = node;
        let mut cur = self.nodes.get(&node).and_then(|d| d.parent);
        while let Some(id) = cur {
            let Some(data) = self.nodes.get(&id) else { break };
            if out.is_empty() && data.is_collection() {
                out.push(id);
            }
            root = id;
            cur = data.parent;
        }
        if !out.contains(&root) {
            out.push(root);
        }
        out
    }

    fn identified_in(&self, node: NodeId) -> Vec<(NodeId, String)> {
        self.subtree(node)
            .into_iter()
            .filter_map(|id| {
                let key = self.nodes.get(&id)?.identifier.as_ref().and_then(identifier_key)?;
                Some((id, key))
            })
            .collect()
    }

    pub(crate) fn register_subtree(&mut self, node: NodeId) {
        for (id, key) in self.identified_in(node) {
            for holder in self.index_holders(id) {
                if let Some(data) = self.nodes.get_mut(&holder) {
                    let entries = data.ids.entry(key.clone()).or_default();
                    if !entries.contains(&id) {
                        entries.push(id);
                    }
                }
            }
        }
    }

    pub(crate) fn unregister_subtree(&mut self, node: NodeId) {
        for (id, key) in self.identified_in(node) {
            for holder in self.index_holders(id) {
                let Some(data) = self.nodes.get_mut(&holder) else { continue };
                if let Some(entries) = data.ids.get_mut(&key) {
                    entries.retain(|e| *e != id);
                    if entries.is_empty() {
                        data.ids.remove(&key);
                    }
                }
            }
        }
    }

    pub(crate) fn indexed(&self, holder: NodeId, key: &str) -> &[NodeId] {
        self.nodes
            .get(&holder)
            .and_then(|d| d.ids.get(key))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Looks `identifier` up in the index of `within` (a root or a
    /// collection), returning the first node assignable to `ty`.
    pub fn resolve_identifier(&self, within: NodeId, ty: &Type, identifier: &Value) -> Option<NodeId> {
        let key = identifier_key(identifier)?;
        self.indexed(within, &key)
            .iter()
            .copied()
            .find(|candidate| self.type_matches(ty, *candidate))
    }
}
