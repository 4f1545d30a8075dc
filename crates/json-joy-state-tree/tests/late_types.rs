use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

use json_joy_state_tree::{Store, TreeError, Type, TypeBuilder, TypeKind, TypeNode};
use serde_json::json;

/// `TreeNode { id, children: TreeNode[] = [], partner: reference(TreeNode)? }`
fn tree_node() -> Type {
    static TREE_NODE: OnceLock<Type> = OnceLock::new();
    TREE_NODE
        .get_or_init(|| {
            let t = TypeBuilder::new();
            let me = t.late(tree_node);
            t.model("TreeNode")
                .prop("id", t.identifier())
                .prop("children", t.optional(t.arr(me.clone()), json!([])))
                .prop("partner", t.maybe(t.reference(me)))
                .build()
                .unwrap()
        })
        .clone()
}

#[test]
fn recursive_types_describe_themselves_by_name() {
    assert_eq!(
        tree_node().describe(),
        "{ id: identifier; children: TreeNode[]?; partner: reference(TreeNode) | null? }"
    );
}

#[test]
fn recursive_snapshots_validate_at_depth() {
    let ty = tree_node();
    assert!(ty.is(&json!({"id": "r", "children": [{"id": "a", "children": [{"id": "b"}]}]})));

    let failures = ty
        .validate(&json!({"id": "r", "children": [{"id": "a", "children": [{"id": 5}]}]}))
        .unwrap_err();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].path(), "/children/0/children/0/id");
}

#[test]
fn recursive_trees_resolve_references_both_ways() {
    let mut store = Store::new();
    let root = store
        .create(
            &tree_node(),
            json!({
                "id": "root",
                "partner": "c2",
                "children": [
                    {"id": "c1", "children": [{"id": "g1"}]},
                    {"id": "c2", "partner": "g1"}
                ]
            }),
        )
        .unwrap();

    let c2 = store.resolve(root, "partner").unwrap();
    assert_eq!(store.path(c2), "/children/1");
    let g1 = store.resolve(c2, "partner").unwrap();
    assert_eq!(store.path(g1), "/children/0/children/0");
    assert_eq!(store.type_of(g1).unwrap().name(), "TreeNode");
    assert_eq!(
        store.snapshot(g1).unwrap(),
        json!({"id": "g1", "children": [], "partner": null})
    );

    // moving the target keeps the reference intact
    let c2_children = store.child_node(c2, "children").unwrap();
    store.push(c2_children, g1).unwrap();
    assert_eq!(store.path(g1), "/children/1/children/0");
    assert_eq!(store.resolve(c2, "partner").unwrap(), g1);

    let c1 = store.resolve_path(root, "/children/0").unwrap();
    store.set(c1, "partner", root).unwrap();
    assert_eq!(store.get(c1, "partner").unwrap(), json!("root"));
    assert_eq!(store.resolve(c1, "partner").unwrap(), root);
}

#[test]
fn nodes_cannot_be_attached_inside_themselves() {
    let mut store = Store::new();
    let root = store
        .create(
            &tree_node(),
            json!({"id": "root", "children": [{"id": "a", "children": []}]}),
        )
        .unwrap();
    let a = store.resolve_path(root, "/children/0").unwrap();
    let a_children = store.child_node(a, "children").unwrap();

    assert!(matches!(
        store.push(a_children, a),
        Err(TreeError::InvalidOperation(_))
    ));
    assert!(matches!(
        store.push(a_children, root),
        Err(TreeError::InvalidOperation(_))
    ));
    assert_eq!(store.path(a), "/children/0");
}

static CALLS: AtomicUsize = AtomicUsize::new(0);

#[test]
fn late_targets_are_resolved_once_on_demand() {
    let t = TypeBuilder::new();
    let late = t.late(|| {
        CALLS.fetch_add(1, Ordering::SeqCst);
        TypeBuilder::new().str()
    });
    assert_eq!(late.kind(), TypeKind::Late);
    let TypeNode::Late(inner) = &*late else {
        panic!("expected a late descriptor");
    };
    assert!(!inner.is_resolved());
    assert_eq!(CALLS.load(Ordering::SeqCst), 0);

    assert!(late.is(&json!("x")));
    assert!(!late.is(&json!(1)));
    assert_eq!(late.name(), "string");
    assert!(inner.is_resolved());
    assert_eq!(CALLS.load(Ordering::SeqCst), 1);
}

#[test]
fn naming_from_many_threads_never_sees_a_cycle() {
    let t = TypeBuilder::new();
    let todo = t.model("Todo").prop("title", t.str()).build().unwrap();
    let deferred = t.late(move || todo.clone());
    std::thread::scope(|scope| {
        for _ in 0..8 {
            let deferred = deferred.clone();
            scope.spawn(move || {
                for _ in 0..500 {
                    assert_eq!(deferred.name(), "Todo");
                }
            });
        }
    });
}
