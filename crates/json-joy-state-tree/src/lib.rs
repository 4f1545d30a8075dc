//! `json-joy-state-tree`: typed, observable state trees over JSON snapshots.
//!
//! A schema is built from composable descriptors ([`TypeBuilder`]): primitives,
//! models, arrays, maps, unions, references and late (recursive) types.
//! Descriptors validate snapshots; a [`Store`] instantiates valid snapshots as
//! live node trees, keeps parent and identifier bookkeeping, resolves
//! references on every read and reports each mutation as JSON patches.
//!
//! ```
//! use json_joy_state_tree::{Store, TypeBuilder};
//! use serde_json::json;
//!
//! let t = TypeBuilder::new();
//! let todo = t
//!     .model("Todo")
//!     .prop("id", t.identifier())
//!     .prop("title", t.str())
//!     .build()
//!     .unwrap();
//! let list = t.model("List").prop("todos", t.arr(todo)).build().unwrap();
//!
//! let mut store = Store::new();
//! let root = store.create(&list, json!({"todos": [{"id": "a", "title": "Milk"}]})).unwrap();
//! let todos = store.child_node(root, "todos").unwrap();
//! store.push(todos, json!({"id": "b", "title": "Eggs"})).unwrap();
//! assert_eq!(store.snapshot(root).unwrap()["todos"][1]["title"], "Eggs");
//! ```

pub mod error;
pub mod patch;
pub mod reference;
pub mod tree;
pub mod type_def;
pub mod validation;

pub use error::{ReferenceError, SchemaError, TreeError};
pub use patch::{Patch, PatchOp};
pub use tree::{
    Change, ChangeKind, Env, Input, ListenerId, MovePolicy, NodeId, PatchEvent, Store,
    StoreOptions,
};
pub use type_def::{ModelBuilder, RefOptions, Type, TypeBuilder, TypeKind, TypeNode};
pub use validation::{ValidationError, ValidationFailure, ValidationResult};
