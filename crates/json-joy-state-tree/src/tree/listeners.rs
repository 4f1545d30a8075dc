//! Two-phase mutation hooks.
//!
//! Interceptors run before a change is validated and committed; they may
//! rewrite the incoming values or reject the change. Patch listeners run after
//! the change is committed and only ever see applied mutations.

use json_joy_tree_path::format_pointer;
use serde_json::Value;
use std::collections::HashMap;
use tracing::trace;

use super::{Input, NodeId, Store};
use crate::error::TreeError;
use crate::patch::{Patch, PatchOp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub(crate) u64);

/// A committed patch together with the patch that undoes it.
#[derive(Debug, Clone, PartialEq)]
pub struct PatchEvent {
    pub patch: Patch,
    pub reverse: Option<Patch>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChangeKind {
    /// Model property, map entry or array slot replacement.
    Update { key: String, value: Input },
    Splice {
        index: usize,
        removed: usize,
        added: Vec<Input>,
    },
    /// Map entry removal.
    Delete { key: String },
}

/// A pending change on one container node, as seen by interceptors.
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    pub object: NodeId,
    pub path: String,
    pub kind: ChangeKind,
}

pub(crate) struct PatchListener {
    pub node: NodeId,
    callback: Box<dyn FnMut(PatchEvent) + Send + Sync>,
}

type InterceptFn = dyn FnMut(&mut Change) -> Result<(), String> + Send + Sync;

pub(crate) struct InterceptorEntry {
    pub node: NodeId,
    callback: Box<InterceptFn>,
}

/// A patch relative to the container it happened in.
#[derive(Debug, Clone)]
pub(crate) struct RawPatch {
    pub op: PatchOp,
    /// `None` addresses the container itself.
    pub segment: Option<String>,
    pub value: Option<Value>,
    pub old: Option<Value>,
}

impl RawPatch {
    pub(crate) fn add(segment: impl Into<String>, value: Value) -> Self {
        Self {
            op: PatchOp::Add,
            segment: Some(segment.into()),
            value: Some(value),
            old: None,
        }
    }

    pub(crate) fn remove(segment: impl Into<String>, old: Value) -> Self {
        Self {
            op: PatchOp::Remove,
            segment: Some(segment.into()),
            value: None,
            old: Some(old),
        }
    }

    pub(crate) fn replace(segment: Option<String>, value: Value, old: Value) -> Self {
        Self {
            op: PatchOp::Replace,
            segment,
            value: Some(value),
            old: Some(old),
        }
    }
}

impl Store {
    /// Subscribes to patches emitted anywhere in `node`'s subtree. Paths are
    /// relative to `node`.
    pub fn on_patch<F>(&mut self, node: NodeId, listener: F) -> Result<ListenerId, TreeError>
    where
        F: FnMut(PatchEvent) + Send + Sync + 'static,
    {
        self.data(node)?;
        let id = self.next_listener();
        self.listeners.insert(
            id,
            PatchListener {
                node,
                callback: Box::new(listener),
            },
        );
        Ok(id)
    }

    pub fn off_patch(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(&id).is_some()
    }

    /// Registers a pre-commit hook for changes on the container `node`.
    pub fn intercept<F>(&mut self, node: NodeId, interceptor: F) -> Result<ListenerId, TreeError>
    where
        F: FnMut(&mut Change) -> Result<(), String> + Send + Sync + 'static,
    {
        self.data(node)?;
        let id = self.next_listener();
        self.interceptors.insert(
            id,
            InterceptorEntry {
                node,
                callback: Box::new(interceptor),
            },
        );
        Ok(id)
    }

    pub fn off_intercept(&mut self, id: ListenerId) -> bool {
        self.interceptors.remove(&id).is_some()
    }

    /// Runs `f` with `meta` attached to every patch it emits.
    pub fn with_patch_meta<R, F>(&mut self, meta: Value, f: F) -> Result<R, TreeError>
    where
        F: FnOnce(&mut Self) -> Result<R, TreeError>,
    {
        let prev = self.meta.replace(meta);
        let out = f(self);
        self.meta = prev;
        out
    }

    pub(crate) fn run_interceptors(&mut self, change: &mut Change) -> Result<(), TreeError> {
        for entry in self.interceptors.values_mut() {
            if entry.node == change.object {
                (entry.callback)(change).map_err(TreeError::Intercepted)?;
            }
        }
        Ok(())
    }

    /// Fans committed patches of `container` out to every listener on it or
    /// one of its ancestors, in order.
    pub(crate) fn emit(&mut self, container: NodeId, patches: Vec<RawPatch>) {
        if self.muted || patches.is_empty() || self.listeners.is_empty() {
            return;
        }
        // listener node -> segments from it down to the container
        let mut prefixes: HashMap<NodeId, Vec<String>> = HashMap::new();
        let mut suffix: Vec<String> = Vec::new();
        let mut cur = Some(container);
        while let Some(id) = cur {
            let Some(data) = self.nodes.get(&id) else { break };
            prefixes.insert(id, suffix.clone());
            suffix.insert(0, data.segment.clone());
            cur = data.parent;
        }

        let targets: Vec<(ListenerId, Vec<String>)> = self
            .listeners
            .iter()
            .filter_map(|(id, l)| prefixes.get(&l.node).map(|p| (*id, p.clone())))
            .collect();
        if targets.is_empty() {
            return;
        }

        let meta = self.meta.clone();
        let with_reverse = self.options.reverse_patches;
        for raw in patches {
            for (listener_id, prefix) in &targets {
                let mut segments = prefix.clone();
                if let Some(segment) = &raw.segment {
                    segments.push(segment.clone());
                }
                let path = format_pointer(&segments);
                let event = PatchEvent {
                    patch: Patch {
                        op: raw.op,
                        path: path.clone(),
                        value: raw.value.clone(),
                        meta: meta.clone(),
                    },
                    reverse: with_reverse.then(|| reverse_of(&raw, path, meta.clone())),
                };
                trace!(listener = listener_id.0, op = ?raw.op, path = %event.patch.path, "patch");
                if let Some(listener) = self.listeners.get_mut(listener_id) {
                    (listener.callback)(event);
                }
            }
        }
    }
}

fn reverse_of(raw: &RawPatch, path: String, meta: Option<Value>) -> Patch {
    match raw.op {
        PatchOp::Add => Patch {
            op: PatchOp::Remove,
            path,
            value: None,
            meta,
        },
        PatchOp::Remove => Patch {
            op: PatchOp::Add,
            path,
            value: raw.old.clone(),
            meta,
        },
        PatchOp::Replace => Patch {
            op: PatchOp::Replace,
            path,
            value: raw.old.clone(),
            meta,
        },
    }
}
