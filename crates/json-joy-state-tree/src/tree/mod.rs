//! Tree store: live nodes and their administration.
//!
//! Nodes live in an arena owned by [`Store`] and are addressed by [`NodeId`].
//! Each node records its parent and path segment, so the single-parent
//! invariant is structural: attaching a node somewhere else has to take it out
//! of its current position first.
//!
//! Several independent trees may live in the same store. A node without a
//! parent is the root of its own tree.

mod identifiers;
mod instantiate;
mod listeners;
mod mutate;
mod node;
mod reconcile;

pub use listeners::{Change, ChangeKind, ListenerId, PatchEvent};
pub use node::{Input, NodeId};

pub(crate) use identifiers::identifier_key;
pub(crate) use listeners::RawPatch;
pub(crate) use node::{NodeData, Payload, Planned, Prepared};

use json_joy_tree_path::format_pointer;
use serde_json::{Map, Value};
use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

use crate::error::TreeError;
use crate::type_def::Type;
use crate::validation::ValidationError;
use listeners::{InterceptorEntry, PatchListener};

/// Opaque environment shared by every node of a tree.
pub type Env = Arc<dyn Any + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MovePolicy {
    /// Attaching an attached node detaches it from its old position first.
    #[default]
    Move,
    /// Attaching an attached node fails with [`TreeError::AlreadyAttached`].
    Reject,
}

#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub move_policy: MovePolicy,
    /// Compute inverse patches for listeners.
    pub reverse_patches: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            move_policy: MovePolicy::Move,
            reverse_patches: true,
        }
    }
}

pub struct Store {
    pub(crate) nodes: HashMap<NodeId, NodeData>,
    next_node_id: u64,
    pub(crate) options: StoreOptions,
    pub(crate) listeners: BTreeMap<ListenerId, PatchListener>,
    pub(crate) interceptors: BTreeMap<ListenerId, InterceptorEntry>,
    next_listener_id: u64,
    pub(crate) meta: Option<Value>,
    /// Suppresses patch fan-out while reused nodes are updated in place.
    pub(crate) muted: bool,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        Self::with_options(StoreOptions::default())
    }

    pub fn with_options(options: StoreOptions) -> Self {
        Self {
            nodes: HashMap::new(),
            next_node_id: 1,
            options,
            listeners: BTreeMap::new(),
            interceptors: BTreeMap::new(),
            next_listener_id: 1,
            meta: None,
            muted: false,
        }
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    pub(crate) fn alloc(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.next_node_id);
        self.next_node_id += 1;
        self.nodes.insert(id, data);
        id
    }

    pub(crate) fn next_listener(&mut self) -> ListenerId {
        let id = ListenerId(self.next_listener_id);
        self.next_listener_id = self.next_listener_id.saturating_add(1);
        id
    }

    pub(crate) fn data(&self, node: NodeId) -> Result<&NodeData, TreeError> {
        self.nodes.get(&node).ok_or(TreeError::DeadNode(node))
    }

    pub(crate) fn data_mut(&mut self, node: NodeId) -> Result<&mut NodeData, TreeError> {
        self.nodes.get_mut(&node).ok_or(TreeError::DeadNode(node))
    }

    // ── Creation ──────────────────────────────────────────────────────────

    /// Validates `snapshot` against `ty` and instantiates it as a new root.
    pub fn create(&mut self, ty: &Type, snapshot: Value) -> Result<NodeId, TreeError> {
        self.create_root(ty, snapshot, None)
    }

    /// Like [`create`](Self::create), attaching an environment to the new root.
    pub fn create_with_env(
        &mut self,
        ty: &Type,
        snapshot: Value,
        env: Env,
    ) -> Result<NodeId, TreeError> {
        self.create_root(ty, snapshot, Some(env))
    }

    fn create_root(
        &mut self,
        ty: &Type,
        snapshot: Value,
        env: Option<Env>,
    ) -> Result<NodeId, TreeError> {
        ty.validate(&snapshot)
            .map_err(|failures| ValidationError::new(Some(&snapshot), ty, failures))?;
        let id = self.instantiate(ty, &snapshot, None, String::new());
        self.data_mut(id)?.env = env;
        self.register_subtree(id);
        debug!(node = %id, ty = %ty.name(), "created tree");
        Ok(id)
    }

    /// Fresh instantiation of `node`'s snapshot as a new, unattached root.
    pub fn clone_node(&mut self, node: NodeId) -> Result<NodeId, TreeError> {
        let ty = self.data(node)?.ty.clone();
        let snapshot = self.snapshot(node)?;
        self.create(&ty, snapshot)
    }

    // ── Snapshots ─────────────────────────────────────────────────────────

    pub fn snapshot(&self, node: NodeId) -> Result<Value, TreeError> {
        let data = self.data(node)?;
        Ok(match &data.payload {
            Payload::Scalar(v) => v.clone(),
            Payload::Model(children) | Payload::Map(children) => {
                let mut out = Map::new();
                for (key, child) in children {
                    out.insert(key.clone(), self.snapshot(*child)?);
                }
                Value::Object(out)
            }
            Payload::Array(children) => Value::Array(
                children
                    .iter()
                    .map(|child| self.snapshot(*child))
                    .collect::<Result<_, _>>()?,
            ),
        })
    }

    /// Snapshot of the child at `key`.
    pub fn get(&self, node: NodeId, key: &str) -> Result<Value, TreeError> {
        self.snapshot(self.child_node(node, key)?)
    }

    // ── Introspection ─────────────────────────────────────────────────────

    pub fn is_alive(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    pub fn type_of(&self, node: NodeId) -> Result<Type, TreeError> {
        Ok(self.data(node)?.ty.clone())
    }

    pub fn child_node(&self, node: NodeId, key: &str) -> Result<NodeId, TreeError> {
        self.data(node)?
            .payload
            .child(key)
            .ok_or_else(|| TreeError::NoSuchChild {
                path: self.path(node),
                key: key.to_string(),
            })
    }

    /// Declared type of the child slot at `key`.
    pub fn child_type(&self, node: NodeId, key: &str) -> Result<Type, TreeError> {
        self.data(node)?
            .ty
            .child_type(key)
            .ok_or_else(|| TreeError::NoSuchChild {
                path: self.path(node),
                key: key.to_string(),
            })
    }

    pub fn children(&self, node: NodeId) -> Result<Vec<(String, NodeId)>, TreeError> {
        let data = self.data(node)?;
        Ok(match &data.payload {
            Payload::Scalar(_) => Vec::new(),
            Payload::Model(children) | Payload::Map(children) => children
                .iter()
                .map(|(key, child)| (key.clone(), *child))
                .collect(),
            Payload::Array(children) => children
                .iter()
                .enumerate()
                .map(|(i, child)| (i.to_string(), *child))
                .collect(),
        })
    }

    pub fn parent(&self, node: NodeId) -> Result<Option<NodeId>, TreeError> {
        Ok(self.data(node)?.parent)
    }

    pub fn is_root(&self, node: NodeId) -> Result<bool, TreeError> {
        Ok(self.data(node)?.parent.is_none())
    }

    pub fn root(&self, node: NodeId) -> Result<NodeId, TreeError> {
        self.data(node)?;
        Ok(self.root_of(node))
    }

    pub(crate) fn root_of(&self, node: NodeId) -> NodeId {
        let mut cur = node;
        while let Some(parent) = self.nodes.get(&cur).and_then(|d| d.parent) {
            cur = parent;
        }
        cur
    }

    /// Segments from the root of the node's tree.
    pub fn path_segments(&self, node: NodeId) -> Vec<String> {
        let mut out = Vec::new();
        let mut cur = node;
        while let Some(data) = self.nodes.get(&cur) {
            let Some(parent) = data.parent else { break };
            out.push(data.segment.clone());
            cur = parent;
        }
        out.reverse();
        out
    }

    /// Pointer from the root of the node's tree; `""` for the root itself.
    pub fn path(&self, node: NodeId) -> String {
        format_pointer(&self.path_segments(node))
    }

    /// Identifier value of a model node, if it declares one.
    pub fn identifier(&self, node: NodeId) -> Result<Option<Value>, TreeError> {
        Ok(self.data(node)?.identifier.clone())
    }

    /// Environment attached to the root of the node's tree.
    pub fn env<T: Any + Send + Sync>(&self, node: NodeId) -> Option<Arc<T>> {
        let root = self.nodes.get(&self.root_of(node))?;
        root.env.clone()?.downcast::<T>().ok()
    }

    pub(crate) fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cur = Some(node);
        while let Some(id) = cur {
            if id == ancestor {
                return true;
            }
            cur = self.nodes.get(&id).and_then(|d| d.parent);
        }
        false
    }

    /// Walks `segments` down from `from`.
    pub(crate) fn descend<S: AsRef<str>>(&self, from: NodeId, segments: &[S]) -> Option<NodeId> {
        let mut cur = from;
        for segment in segments {
            cur = self.nodes.get(&cur)?.payload.child(segment.as_ref())?;
        }
        Some(cur)
    }

    /// Number of live nodes across all trees.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}
