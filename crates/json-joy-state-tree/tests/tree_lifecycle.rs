mod common;

use std::sync::Arc;

use common::{op, ops, record, todo_store_type, todo_type};
use json_joy_state_tree::{MovePolicy, Store, StoreOptions, TreeError, Type, TypeBuilder};
use serde_json::{json, Value};

fn board_type() -> Type {
    let t = TypeBuilder::new();
    let todo = todo_type();
    t.model("Board")
        .prop("open", t.arr(todo.clone()))
        .prop("closed", t.arr(todo.clone()))
        .prop("pinned", todo)
        .build()
        .unwrap()
}

fn board_snapshot() -> Value {
    json!({
        "open": [
            {"id": "a", "title": "A", "done": false},
            {"id": "b", "title": "B", "done": false}
        ],
        "closed": [],
        "pinned": {"id": "p", "title": "P", "done": false}
    })
}

#[test]
fn snapshot_round_trip_and_introspection() {
    let mut store = Store::new();
    let snapshot = json!({
        "todos": [{"id": "a", "title": "Milk", "done": true}],
        "selected": null
    });
    let root = store.create(&todo_store_type(), snapshot.clone()).unwrap();
    assert_eq!(store.snapshot(root).unwrap(), snapshot);

    let todos = store.child_node(root, "todos").unwrap();
    let first = store.child_node(todos, "0").unwrap();
    assert_eq!(store.path(first), "/todos/0");
    assert_eq!(store.path(root), "");
    assert_eq!(store.parent(first).unwrap(), Some(todos));
    assert_eq!(store.parent(root).unwrap(), None);
    assert_eq!(store.root(first).unwrap(), root);
    assert!(store.is_root(root).unwrap());
    assert!(!store.is_root(first).unwrap());
    assert_eq!(store.get(first, "title").unwrap(), json!("Milk"));
    assert_eq!(store.identifier(first).unwrap(), Some(json!("a")));
    assert_eq!(store.type_of(first).unwrap().name(), "Todo");
    assert_eq!(store.children(todos).unwrap(), vec![("0".to_string(), first)]);
    assert_eq!(
        store.child_type(root, "todos").unwrap().describe(),
        "{ id: identifier; title: string; done: boolean? }[]"
    );
}

#[test]
fn resolve_path_walks_relative_and_absolute_paths() {
    let mut store = Store::new();
    let root = store
        .create(&todo_store_type(), json!({"todos": [{"id": "a", "title": "A"}]}))
        .unwrap();
    let todos = store.child_node(root, "todos").unwrap();
    let first = store.child_node(todos, "0").unwrap();
    let title = store.child_node(first, "title").unwrap();

    assert_eq!(store.resolve_path(first, "../..").unwrap(), root);
    assert_eq!(store.resolve_path(first, "title").unwrap(), title);
    assert_eq!(store.resolve_path(title, "/todos/0").unwrap(), first);
    assert!(store.resolve_path(root, "/todos/5").is_err());
    assert!(matches!(
        store.resolve_path(first, "../../.."),
        Err(TreeError::Path(_))
    ));
}

#[test]
fn pushing_an_attached_node_moves_it() {
    let mut store = Store::new();
    let root = store.create(&board_type(), board_snapshot()).unwrap();
    let open = store.child_node(root, "open").unwrap();
    let closed = store.child_node(root, "closed").unwrap();
    let a = store.child_node(open, "0").unwrap();
    let b = store.child_node(open, "1").unwrap();
    let events = record(&mut store, root);

    let moved = store.push(closed, a).unwrap();
    assert_eq!(moved, a);
    assert_eq!(store.path(a), "/closed/0");
    assert_eq!(store.parent(a).unwrap(), Some(closed));
    assert_eq!(store.path(b), "/open/0");
    assert_eq!(
        ops(&events),
        vec![op("remove", "/open/0"), op("add", "/closed/0")]
    );
    assert_eq!(
        store.get(root, "open").unwrap(),
        json!([{"id": "b", "title": "B", "done": false}])
    );
}

#[test]
fn reject_policy_refuses_attached_nodes() {
    let mut store = Store::with_options(StoreOptions {
        move_policy: MovePolicy::Reject,
        ..StoreOptions::default()
    });
    let root = store.create(&board_type(), board_snapshot()).unwrap();
    let open = store.child_node(root, "open").unwrap();
    let closed = store.child_node(root, "closed").unwrap();
    let a = store.child_node(open, "0").unwrap();

    let err = store.push(closed, a).unwrap_err();
    assert!(matches!(err, TreeError::AlreadyAttached(ref path) if path == "/open/0"));
    assert_eq!(store.path(a), "/open/0");

    // an explicit copy is always allowed
    let copy = store.clone_node(a).unwrap();
    assert_ne!(copy, a);
    assert!(store.is_root(copy).unwrap());
    store.push(closed, copy).unwrap();
    assert_eq!(store.get(closed, "0").unwrap()["id"], "a");
}

#[test]
fn model_properties_cannot_be_moved_or_detached() {
    let mut store = Store::new();
    let root = store.create(&board_type(), board_snapshot()).unwrap();
    let open = store.child_node(root, "open").unwrap();
    let pinned = store.child_node(root, "pinned").unwrap();

    assert!(matches!(
        store.push(open, pinned),
        Err(TreeError::InvalidOperation(_))
    ));
    assert!(matches!(
        store.detach(pinned),
        Err(TreeError::InvalidOperation(_))
    ));
    assert_eq!(store.path(pinned), "/pinned");
}

#[test]
fn detach_keeps_identity_and_allows_reattachment() {
    let mut store = Store::new();
    let root = store.create(&board_type(), board_snapshot()).unwrap();
    let open = store.child_node(root, "open").unwrap();
    let a = store.child_node(open, "0").unwrap();

    store.detach(a).unwrap();
    assert!(store.is_alive(a));
    assert!(store.is_root(a).unwrap());
    assert_eq!(store.path(a), "");
    assert_eq!(store.get(a, "title").unwrap(), json!("A"));
    assert_eq!(store.children(open).unwrap().len(), 1);

    store.insert(open, 1, a).unwrap();
    assert_eq!(store.path(a), "/open/1");
    assert_eq!(store.root(a).unwrap(), root);
}

#[test]
fn removal_and_destroy_kill_nodes() {
    let mut store = Store::new();
    let root = store.create(&board_type(), board_snapshot()).unwrap();
    let open = store.child_node(root, "open").unwrap();
    let a = store.child_node(open, "0").unwrap();
    let b = store.child_node(open, "1").unwrap();
    let b_title = store.child_node(b, "title").unwrap();

    let removed = store.remove_at(open, 1).unwrap();
    assert_eq!(removed["id"], "b");
    assert!(!store.is_alive(b));
    assert!(!store.is_alive(b_title));
    assert!(matches!(store.snapshot(b), Err(TreeError::DeadNode(id)) if id == b));

    store.destroy(a).unwrap();
    assert!(!store.is_alive(a));
    assert_eq!(store.get(root, "open").unwrap(), json!([]));

    store.destroy(root).unwrap();
    assert_eq!(store.node_count(), 0);
}

#[test]
fn duplicate_identifiers_are_rejected_per_collection() {
    let mut store = Store::new();
    let root = store.create(&board_type(), board_snapshot()).unwrap();
    let open = store.child_node(root, "open").unwrap();
    let closed = store.child_node(root, "closed").unwrap();

    let err = store
        .push(open, json!({"id": "a", "title": "again"}))
        .unwrap_err();
    assert!(matches!(
        err,
        TreeError::DuplicateIdentifier { ref identifier, ref path } if identifier == "a" && path == "/open"
    ));
    let err = store
        .set_index(open, 1, json!({"id": "a", "title": "X"}))
        .unwrap_err();
    assert!(matches!(err, TreeError::DuplicateIdentifier { .. }));
    assert_eq!(store.children(open).unwrap().len(), 2);

    store
        .push(closed, json!({"id": "a", "title": "elsewhere"}))
        .unwrap();
}

#[test]
fn assignments_validate_and_reconcile() {
    let mut store = Store::new();
    let root = store.create(&board_type(), board_snapshot()).unwrap();
    let open = store.child_node(root, "open").unwrap();
    let a = store.child_node(open, "0").unwrap();

    store.set(a, "title", json!("Apples")).unwrap();
    assert_eq!(store.get(a, "title").unwrap(), json!("Apples"));
    assert!(matches!(
        store.set(a, "title", json!(1)),
        Err(TreeError::Validation(_))
    ));
    assert_eq!(store.get(a, "title").unwrap(), json!("Apples"));
    assert!(matches!(
        store.set(a, "nope", json!(1)),
        Err(TreeError::NoSuchChild { .. })
    ));

    // same identifier: the element absorbs the snapshot
    store
        .set_index(open, 0, json!({"id": "a", "title": "Again", "done": true}))
        .unwrap();
    assert_eq!(store.child_node(open, "0").unwrap(), a);
    assert_eq!(store.get(a, "done").unwrap(), json!(true));

    // another identifier: the element is replaced
    store
        .set_index(open, 0, json!({"id": "z", "title": "Z"}))
        .unwrap();
    let z = store.child_node(open, "0").unwrap();
    assert_ne!(z, a);
    assert!(!store.is_alive(a));
    assert_eq!(store.identifier(z).unwrap(), Some(json!("z")));
}

#[test]
fn bounds_and_container_checks() {
    let mut store = Store::new();
    let root = store.create(&board_type(), board_snapshot()).unwrap();
    let open = store.child_node(root, "open").unwrap();
    let pinned = store.child_node(root, "pinned").unwrap();
    let title = store.child_node(pinned, "title").unwrap();

    assert_eq!(store.splice(open, 10, 5, Vec::new()).unwrap(), Vec::<Value>::new());
    assert!(matches!(
        store.insert(open, 9, json!({"id": "q", "title": "Q"})),
        Err(TreeError::InvalidIndex { index: 9, len: 2, .. })
    ));
    assert!(matches!(
        store.remove_at(open, 2),
        Err(TreeError::InvalidIndex { .. })
    ));
    assert!(matches!(
        store.set(title, "x", json!(1)),
        Err(TreeError::WrongContainer { .. })
    ));
    assert!(matches!(
        store.push(pinned, json!(1)),
        Err(TreeError::WrongContainer { .. })
    ));
    assert!(matches!(
        store.map_put(open, "k", json!(1)),
        Err(TreeError::WrongContainer { .. })
    ));
}

#[test]
fn scalar_elements_update_in_place() {
    let t = TypeBuilder::new();
    let numbers = t.model("Numbers").prop("items", t.arr(t.num())).build().unwrap();
    let mut store = Store::new();
    let root = store.create(&numbers, json!({"items": [1, 2, 3]})).unwrap();
    let items = store.child_node(root, "items").unwrap();
    let second = store.child_node(items, "1").unwrap();

    store.set_index(items, 1, json!(20)).unwrap();
    assert_eq!(store.child_node(items, "1").unwrap(), second);
    assert_eq!(store.snapshot(items).unwrap(), json!([1, 20, 3]));
    assert_eq!(store.clear(items).unwrap(), vec![json!(1), json!(20), json!(3)]);
    assert_eq!(store.snapshot(items).unwrap(), json!([]));
}

#[derive(Debug)]
struct Api {
    base: String,
}

#[test]
fn environment_is_shared_by_the_whole_tree() {
    let mut store = Store::new();
    let root = store
        .create_with_env(
            &todo_store_type(),
            json!({"todos": [{"id": "a", "title": "A"}]}),
            Arc::new(Api {
                base: "https://example.test".to_string(),
            }),
        )
        .unwrap();
    let todos = store.child_node(root, "todos").unwrap();
    let first = store.child_node(todos, "0").unwrap();

    assert_eq!(store.env::<Api>(first).unwrap().base, "https://example.test");
    assert!(store.env::<String>(first).is_none());

    let other = store
        .create(&todo_type(), json!({"id": "x", "title": "X"}))
        .unwrap();
    assert!(store.env::<Api>(other).is_none());
}

#[test]
fn map_entries_are_keyed_by_identifier() {
    let t = TypeBuilder::new();
    let user = t
        .model("User")
        .prop("id", t.identifier())
        .prop("name", t.str())
        .build()
        .unwrap();
    let directory = t
        .model("Directory")
        .prop("users", t.map(user.clone()))
        .build()
        .unwrap();

    let mut store = Store::new();
    let root = store.create(&directory, json!({"users": {}})).unwrap();
    let users = store.child_node(root, "users").unwrap();
    let events = record(&mut store, root);

    let ann = store
        .map_put_identified(users, json!({"id": "u1", "name": "Ann"}))
        .unwrap();
    assert_eq!(store.path(ann), "/users/u1");
    assert!(matches!(
        store.map_put(users, "x", json!({"id": "u2", "name": "Bob"})),
        Err(TreeError::Validation(_))
    ));

    let same = store
        .map_put(users, "u1", json!({"id": "u1", "name": "Anna"}))
        .unwrap();
    assert_eq!(same, ann);
    assert_eq!(store.resolve_identifier(users, &user, &json!("u1")), Some(ann));

    assert_eq!(
        store.map_delete(users, "u1").unwrap(),
        Some(json!({"id": "u1", "name": "Anna"}))
    );
    assert_eq!(store.map_delete(users, "u1").unwrap(), None);
    assert_eq!(
        ops(&events),
        vec![
            op("add", "/users/u1"),
            op("replace", "/users/u1/name"),
            op("remove", "/users/u1"),
        ]
    );

    store
        .map_put_identified(users, json!({"id": "u3", "name": "C"}))
        .unwrap();
    store
        .map_put_identified(users, json!({"id": "u4", "name": "D"}))
        .unwrap();
    assert_eq!(store.children(users).unwrap().len(), 2);
    store.map_clear(users).unwrap();
    assert_eq!(store.snapshot(users).unwrap(), json!({}));
}
