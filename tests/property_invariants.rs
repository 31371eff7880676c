mod common;

use std::collections::BTreeSet;

use proptest::prelude::*;
use serde_json::{Value, json};

use common::Child;
use denorm::{
    diff::{Trackable, compare},
    persist::{DocumentStore, Filter, MemoryStore},
    types::{DocId, Naming},
};

#[derive(Debug, Clone)]
enum Edit {
    Name(u8),
    Parent(Option<u8>),
    Foo(u8),
    SubId(Option<u8>),
    Prop(u8),
}

fn edit_strategy() -> impl Strategy<Value = Edit> {
    prop_oneof![
        (0u8..4).prop_map(Edit::Name),
        proptest::option::of(0u8..4).prop_map(Edit::Parent),
        (0u8..4).prop_map(Edit::Foo),
        proptest::option::of(0u8..4).prop_map(Edit::SubId),
        (0u8..4).prop_map(Edit::Prop),
    ]
}

fn apply(child: &mut Child, edit: &Edit) {
    match edit {
        Edit::Name(n) => child.name = format!("name{n}"),
        Edit::Parent(p) => child.parent_id = p.map(|p| DocId::from(format!("p{p}").as_str())),
        Edit::Foo(n) => child.sub_child.foo = format!("foo{n}"),
        Edit::SubId(s) => child.sub_child.id = s.map(|s| DocId::from(format!("s{s}").as_str())),
        Edit::Prop(n) => child.child_prop = format!("prop{n}"),
    }
}

/// Changed paths computed field by field, in declaration order.
fn expected_changes(before: &Child, after: &Child) -> Vec<String> {
    let mut out = Vec::new();
    if before.parent_id != after.parent_id {
        out.push("parent_id".to_string());
    }
    if before.name != after.name {
        out.push("name".to_string());
    }
    if before.sub_child.id != after.sub_child.id {
        out.push("sub_child.id".to_string());
    }
    if before.sub_child.foo != after.sub_child.foo {
        out.push("sub_child.foo".to_string());
    }
    if before.child_prop != after.child_prop {
        out.push("child_prop".to_string());
    }
    out
}

fn prefixes(path: &str) -> Vec<String> {
    let segments: Vec<&str> = path.split('.').collect();
    (1..=segments.len()).map(|n| segments[..n].join(".")).collect()
}

#[derive(Debug, Clone)]
enum ArrayOp {
    Upsert { id: u8, value: u8 },
    Remove { id: u8 },
}

fn array_op_strategy() -> impl Strategy<Value = ArrayOp> {
    prop_oneof![
        (0u8..6, any::<u8>()).prop_map(|(id, value)| ArrayOp::Upsert { id, value }),
        (0u8..6).prop_map(|id| ArrayOp::Remove { id }),
    ]
}

proptest! {
    #[test]
    fn tracked_changes_match_field_by_field_model(
        seed in prop::collection::vec(edit_strategy(), 0..6),
        edits in prop::collection::vec(edit_strategy(), 0..12),
    ) {
        let mut child = Child::tracked();
        for edit in &seed {
            apply(&mut child, edit);
        }
        for path in ["name", "parent_id", "sub_child.foo", "anything"] {
            prop_assert!(child.modified(path).expect("attached"));
        }

        child.reset_tracking().expect("attached");
        let before = child.clone();
        for path in ["name", "parent_id", "sub_child", "sub_child.id", "child_prop"] {
            prop_assert!(!child.modified(path).expect("attached"));
        }

        for edit in &edits {
            apply(&mut child, edit);
        }
        let expected = expected_changes(&before, &child);
        let session = child.diff_session(Naming::Declared).expect("attached");
        prop_assert!(!session.is_new());
        prop_assert_eq!(session.changed(), expected.as_slice());

        let changed: BTreeSet<String> = expected.iter().flat_map(|p| prefixes(p)).collect();
        for path in ["name", "parent_id", "sub_child", "sub_child.id", "sub_child.foo", "child_prop"] {
            prop_assert_eq!(session.modified(path), changed.contains(path), "{}", path);
        }

        prop_assert_eq!(
            compare(&before, &child, Naming::External).expect("same type"),
            compare(&child, &before, Naming::External).expect("same type")
        );
    }

    #[test]
    fn array_upserts_keep_one_entry_per_id_in_first_seen_order(
        ops in prop::collection::vec(array_op_strategy(), 1..60),
    ) {
        let store = MemoryStore::new();
        let target = DocId::from("t");
        store.upsert("targets", &target, &json!({"_id": "t", "items": []})).expect("seed");

        let mut model: Vec<(u8, u8)> = Vec::new();
        for op in &ops {
            match *op {
                ArrayOp::Upsert { id, value } => {
                    let element_id = DocId::from(format!("e{id}").as_str());
                    store
                        .upsert_array_element_by_id("targets", &Filter::by_id(&target), "items", &element_id, &json!({"v": value}))
                        .expect("upsert");
                    match model.iter_mut().find(|(existing, _)| *existing == id) {
                        Some(slot) => slot.1 = value,
                        None => model.push((id, value)),
                    }
                }
                ArrayOp::Remove { id } => {
                    let element_id = DocId::from(format!("e{id}").as_str());
                    store
                        .remove_array_element_by_id("targets", &Filter::by_id(&target), "items", &element_id)
                        .expect("remove");
                    model.retain(|(existing, _)| *existing != id);
                }
            }
        }

        let doc = store.find_by_id("targets", &target).expect("find").expect("exists");
        let expected: Vec<Value> = model
            .iter()
            .map(|(id, value)| json!({"_id": format!("e{id}"), "v": value}))
            .collect();
        prop_assert_eq!(doc["items"].clone(), Value::Array(expected));
    }
}
