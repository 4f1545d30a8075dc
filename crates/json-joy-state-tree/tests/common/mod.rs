#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use json_joy_state_tree::{NodeId, Patch, PatchEvent, Store, Type, TypeBuilder};
use serde_json::Value;

/// `Todo { id: identifier, title: string, done: boolean = false }`
pub fn todo_type() -> Type {
    let t = TypeBuilder::new();
    t.model("Todo")
        .prop("id", t.identifier())
        .prop("title", t.str())
        .prop("done", t.optional(t.bool(), Value::Bool(false)))
        .build()
        .unwrap()
}

/// `Store { todos: Todo[], selected: reference(Todo)? }`
pub fn todo_store_type() -> Type {
    let t = TypeBuilder::new();
    let todo = todo_type();
    t.model("TodoStore")
        .prop("todos", t.arr(todo.clone()))
        .prop("selected", t.maybe(t.reference(todo)))
        .build()
        .unwrap()
}

pub type Events = Arc<Mutex<Vec<PatchEvent>>>;

/// Subscribes to patches under `node` and collects them.
pub fn record(store: &mut Store, node: NodeId) -> Events {
    let events: Events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    store
        .on_patch(node, move |event| sink.lock().unwrap().push(event))
        .unwrap();
    events
}

pub fn patches(events: &Events) -> Vec<Patch> {
    events.lock().unwrap().iter().map(|e| e.patch.clone()).collect()
}

pub fn ops(events: &Events) -> Vec<(String, String)> {
    events
        .lock()
        .unwrap()
        .iter()
        .map(|e| (e.patch.op.as_str().to_string(), e.patch.path.clone()))
        .collect()
}

pub fn op(kind: &str, path: &str) -> (String, String) {
    (kind.to_string(), path.to_string())
}
