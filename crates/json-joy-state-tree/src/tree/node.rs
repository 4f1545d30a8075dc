use indexmap::IndexMap;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

use super::Env;
use crate::type_def::Type;

/// Handle to a live node in a [`Store`](super::Store). Ids are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Value offered to a mutation: a plain snapshot, or a live node to attach.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Snapshot(Value),
    Node(NodeId),
}

impl From<Value> for Input {
    fn from(value: Value) -> Self {
        Input::Snapshot(value)
    }
}

impl From<NodeId> for Input {
    fn from(node: NodeId) -> Self {
        Input::Node(node)
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Payload {
    Scalar(Value),
    Model(IndexMap<String, NodeId>),
    Array(Vec<NodeId>),
    Map(IndexMap<String, NodeId>),
}

impl Payload {
    pub(crate) fn child(&self, key: &str) -> Option<NodeId> {
        match self {
            Payload::Scalar(_) => None,
            Payload::Model(children) | Payload::Map(children) => children.get(key).copied(),
            Payload::Array(children) => key.parse::<usize>().ok().and_then(|i| children.get(i).copied()),
        }
    }

    pub(crate) fn child_ids(&self) -> Vec<NodeId> {
        match self {
            Payload::Scalar(_) => Vec::new(),
            Payload::Model(children) | Payload::Map(children) => children.values().copied().collect(),
            Payload::Array(children) => children.clone(),
        }
    }
}

/// Administration record of one live node.
pub(crate) struct NodeData {
    /// Concrete type: deferred, optional and refinement wrappers removed, union dispatched.
    pub ty: Type,
    pub parent: Option<NodeId>,
    pub segment: String,
    pub payload: Payload,
    /// Identifier value, for models that declare one.
    pub identifier: Option<Value>,
    /// Identified descendants, kept on roots and collections.
    pub ids: HashMap<String, Vec<NodeId>>,
    pub env: Option<Env>,
}

impl NodeData {
    pub(crate) fn new(ty: Type, parent: Option<NodeId>, segment: String) -> Self {
        Self {
            ty,
            parent,
            segment,
            payload: Payload::Scalar(Value::Null),
            identifier: None,
            ids: HashMap::new(),
            env: None,
        }
    }

    pub(crate) fn is_collection(&self) -> bool {
        matches!(self.payload, Payload::Array(_) | Payload::Map(_))
    }

    pub(crate) fn is_composite(&self) -> bool {
        !matches!(self.payload, Payload::Scalar(_))
    }
}

/// An input after validation, ready to be committed.
#[derive(Debug, Clone)]
pub(crate) enum Prepared {
    Fresh(Value),
    Existing(NodeId),
}

/// What an inserted array slot will hold once a splice commits.
#[derive(Debug, Clone)]
pub(crate) enum Planned {
    Create(Value),
    /// A node removed by the same splice, put back unchanged.
    Reuse(NodeId),
    /// A node removed by the same splice, put back after applying a snapshot.
    Update(NodeId, Value),
    /// A node taken from another parent.
    Move(NodeId),
}

impl Planned {
    pub(crate) fn existing(&self) -> Option<NodeId> {
        match self {
            Planned::Reuse(id) | Planned::Update(id, _) | Planned::Move(id) => Some(*id),
            Planned::Create(_) => None,
        }
    }
}
