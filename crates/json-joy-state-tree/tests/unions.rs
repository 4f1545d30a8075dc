use json_joy_state_tree::validation::FailureKind;
use json_joy_state_tree::{Store, TreeError, Type, TypeBuilder};
use serde_json::json;

fn shapes() -> (Type, Type) {
    let t = TypeBuilder::new();
    let square = t
        .model("Square")
        .prop("width", t.num())
        .prop("height", t.num())
        .build()
        .unwrap();
    let boxed = t.model("Box").prop("width", t.num()).build().unwrap();
    (square, boxed)
}

#[test]
fn ambiguous_union_fails_without_sub_errors() {
    let t = TypeBuilder::new();
    let (square, boxed) = shapes();
    let shape = t.or(vec![square, boxed]);

    let err = Store::new()
        .create(&shape, json!({"width": 2, "height": 2}))
        .unwrap_err();
    assert!(matches!(err, TreeError::UnionAmbiguity(_)));
    let validation = err.validation().unwrap();
    assert_eq!(validation.failures.len(), 1);
    assert_eq!(validation.failures[0].kind, FailureKind::Ambiguous);
    assert_eq!(
        err.to_string(),
        concat!(
            "Error while converting `{\"width\":2,\"height\":2}` to `{ width: number; height: number } | { width: number }`:\n",
            "at path \"\" value `{\"width\":2,\"height\":2}` is not assignable to type: ",
            "`{ width: number; height: number } | { width: number }` ",
            "(Multiple types are applicable and no dispatch method is defined for the union)"
        )
    );
}

#[test]
fn no_applicable_member_lists_every_member_failure() {
    let t = TypeBuilder::new();
    let (square, boxed) = shapes();
    let shape = t.or(vec![square, boxed]);

    let failures = shape.validate(&json!({"height": 2})).unwrap_err();
    assert_eq!(failures.len(), 3);
    assert_eq!(failures[0].kind, FailureKind::NoApplicableType);
    assert_eq!(
        failures[0].message.as_deref(),
        Some("No type is applicable and no dispatch method is defined for the union")
    );
    // member failures keep their own sub-paths, in declaration order
    assert_eq!(failures[1].path(), "/width");
    assert_eq!(failures[2].path(), "/width");
    assert_eq!(failures[1].context[1].ty.name(), "Square");
    assert_eq!(failures[2].context[1].ty.name(), "Box");

    let err = Store::new().create(&shape, json!({"height": 2})).unwrap_err();
    assert!(matches!(err, TreeError::Validation(_)));
}

#[test]
fn single_applicable_member_is_selected() {
    let t = TypeBuilder::new();
    let (square, boxed) = shapes();
    let shape = t.or(vec![square, boxed]);
    let wide = t.model("Holder").prop("shape", shape).build().unwrap();

    let mut store = Store::new();
    let err = store
        .create(&wide, json!({"shape": {"width": "wide"}}))
        .unwrap_err();
    assert!(matches!(err, TreeError::Validation(_)));

    let t = TypeBuilder::new();
    let scalar = t.or(vec![t.int(), t.str()]);
    let root = store.create(&scalar, json!("x")).unwrap();
    assert_eq!(store.type_of(root).unwrap().describe(), "string");
}

#[test]
fn overlapping_scalar_members_are_ambiguous() {
    let t = TypeBuilder::new();
    let number = t.or(vec![t.int(), t.num()]);
    assert!(number.is(&json!(1.5)));
    let failures = number.validate(&json!(1)).unwrap_err();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].kind, FailureKind::Ambiguous);
}

#[test]
fn dispatcher_picks_the_member() {
    let t = TypeBuilder::new();
    let (square, boxed) = shapes();
    let shape = t.or_dispatch(vec![square, boxed], |value| {
        if value.get("height").is_some() {
            0
        } else {
            1
        }
    });

    let mut store = Store::new();
    let sq = store.create(&shape, json!({"width": 2, "height": 2})).unwrap();
    assert_eq!(store.type_of(sq).unwrap().name(), "Square");
    let bx = store.create(&shape, json!({"width": 2})).unwrap();
    assert_eq!(store.type_of(bx).unwrap().name(), "Box");
}

#[test]
fn dispatched_member_failures_are_surfaced_verbatim() {
    let t = TypeBuilder::new();
    let (square, boxed) = shapes();
    let shape = t.or_dispatch(vec![square, boxed], |_| 1);

    let failures = shape.validate(&json!({"width": "x"})).unwrap_err();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].kind, FailureKind::Invalid);
    assert_eq!(failures[0].path(), "/width");
    assert_eq!(failures[0].message.as_deref(), Some("Value is not a number"));
}

#[test]
fn dispatcher_out_of_range_is_a_failure() {
    let t = TypeBuilder::new();
    let (square, boxed) = shapes();
    let shape = t.or_dispatch(vec![square, boxed], |_| 5);
    let failures = shape.validate(&json!({"width": 1})).unwrap_err();
    assert_eq!(
        failures[0].message.as_deref(),
        Some("Dispatcher returned member 5, but the union has 2 members")
    );
}

#[test]
fn union_members_reconcile_or_replace() {
    let t = TypeBuilder::new();
    let (square, boxed) = shapes();
    let shape = t.or_dispatch(vec![square, boxed], |value| {
        if value.get("height").is_some() {
            0
        } else {
            1
        }
    });
    let canvas = t.model("Canvas").prop("shape", shape).build().unwrap();

    let mut store = Store::new();
    let root = store
        .create(&canvas, json!({"shape": {"width": 1}}))
        .unwrap();
    let before = store.child_node(root, "shape").unwrap();

    store.set(root, "shape", json!({"width": 3})).unwrap();
    assert_eq!(store.child_node(root, "shape").unwrap(), before);

    store
        .set(root, "shape", json!({"width": 3, "height": 4}))
        .unwrap();
    let after = store.child_node(root, "shape").unwrap();
    assert_ne!(after, before);
    assert!(!store.is_alive(before));
    assert_eq!(store.type_of(after).unwrap().name(), "Square");
}
