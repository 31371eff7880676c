use denorm::{
    persist::{DocumentStore, Filter, IndexSpec, PersistError, SqliteStore},
    types::DocId,
};
use serde_json::{Map, json};
use tempfile::tempdir;

#[test]
fn documents_survive_reopen_in_insertion_order() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("docs.db");

    {
        let store = SqliteStore::open(&path).expect("open");
        for (id, n) in [("b", 1), ("a", 2), ("c", 3)] {
            store
                .upsert("things", &DocId::from(id), &json!({"_id": id, "n": n}))
                .expect("upsert");
        }
        store
            .upsert("things", &DocId::from("b"), &json!({"_id": "b", "n": 10}))
            .expect("replace");
        store
            .upsert("others", &DocId::from("x"), &json!({"_id": "x"}))
            .expect("other collection");
        store.flush().expect("flush");
    }

    let store = SqliteStore::open(&path).expect("reopen");
    let docs = store.find("things", &Filter::all()).expect("find");
    let ns: Vec<_> = docs.iter().map(|d| d["n"].clone()).collect();
    assert_eq!(ns, vec![json!(10), json!(2), json!(3)]);
    assert_eq!(store.count("others", &Filter::all()).expect("count"), 1);
    assert_eq!(
        store.find_by_id("things", &DocId::from("a")).expect("find"),
        Some(json!({"_id": "a", "n": 2}))
    );
    assert_eq!(store.find_by_id("things", &DocId::from("zz")).expect("find"), None);
}

#[test]
fn partial_updates_touch_only_matching_documents() {
    let store = SqliteStore::open_in_memory().expect("open");
    store
        .upsert("parents", &DocId::from("p1"), &json!({"_id": "p1", "kind": "a", "children": []}))
        .expect("p1");
    store
        .upsert("parents", &DocId::from("p2"), &json!({"_id": "p2", "kind": "b"}))
        .expect("p2");

    let mut set = Map::new();
    set.insert("child.name".to_string(), json!("c"));
    let matched = store
        .update_where("parents", &Filter::eq("kind", "a"), &set)
        .expect("update");
    assert_eq!(matched, 1);

    let matched = store
        .upsert_array_element_by_id(
            "parents",
            &Filter::all(),
            "children",
            &DocId::from("c1"),
            &json!({"name": "c"}),
        )
        .expect("upsert element");
    assert_eq!(matched, 2);

    let p1 = store
        .find_by_id("parents", &DocId::from("p1"))
        .expect("find")
        .expect("p1");
    assert_eq!(
        p1,
        json!({"_id": "p1", "kind": "a", "child": {"name": "c"}, "children": [{"_id": "c1", "name": "c"}]})
    );
    let p2 = store
        .find_by_id("parents", &DocId::from("p2"))
        .expect("find")
        .expect("p2");
    assert_eq!(p2["children"], json!([{"_id": "c1", "name": "c"}]));

    let matched = store
        .remove_array_element_by_id("parents", &Filter::eq("children._id", "c1"), "children", &DocId::from("c1"))
        .expect("remove element");
    assert_eq!(matched, 2);
    assert_eq!(
        store
            .count("parents", &Filter::eq("children._id", "c1"))
            .expect("count"),
        0
    );

    let none = store
        .update_where("parents", &Filter::eq("kind", "zzz"), &set)
        .expect("no-op update");
    assert_eq!(none, 0);
}

#[test]
fn removal_by_id_and_filter() {
    let store = SqliteStore::open_in_memory().expect("open");
    for id in ["a", "b", "c"] {
        store
            .upsert("things", &DocId::from(id), &json!({"_id": id, "odd": id != "b"}))
            .expect("upsert");
    }
    assert!(store.remove("things", &DocId::from("a")).expect("remove"));
    assert!(!store.remove("things", &DocId::from("a")).expect("remove again"));
    assert_eq!(store.remove_where("things", &Filter::eq("odd", true)).expect("remove where"), 1);
    let left = store.find("things", &Filter::all()).expect("find");
    assert_eq!(left, vec![json!({"_id": "b", "odd": false})]);
}

#[test]
fn unique_index_survives_reopen_and_blocks_updates() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("idx.db");
    let email = IndexSpec::new(["email"], true);

    {
        let store = SqliteStore::open(&path).expect("open");
        store.ensure_index("users", &email).expect("ensure");
        store.ensure_index("users", &email).expect("idempotent");
        store
            .upsert("users", &DocId::from("a"), &json!({"_id": "a", "email": "x@y"}))
            .expect("a");
        // Same key in another collection is not indexed.
        store
            .upsert("others", &DocId::from("a"), &json!({"_id": "a", "email": "x@y"}))
            .expect("other collection");
    }

    let store = SqliteStore::open(&path).expect("reopen");
    let err = store
        .upsert("users", &DocId::from("b"), &json!({"_id": "b", "email": "x@y"}))
        .expect_err("duplicate");
    assert!(matches!(err, PersistError::DuplicateKey { ref collection, .. } if collection == "users"));

    store
        .upsert("users", &DocId::from("b"), &json!({"_id": "b"}))
        .expect("missing key is not indexed");
    store
        .upsert("users", &DocId::from("c"), &json!({"_id": "c"}))
        .expect("neither is this one");

    let mut set = Map::new();
    set.insert("email".to_string(), json!("x@y"));
    assert!(matches!(
        store.update_where("users", &Filter::eq("_id", "b"), &set),
        Err(PersistError::DuplicateKey { .. })
    ));
    assert_eq!(
        store.find_by_id("users", &DocId::from("b")).expect("find"),
        Some(json!({"_id": "b"}))
    );

    store
        .upsert("dupes", &DocId::from("1"), &json!({"_id": "1", "email": "z"}))
        .expect("1");
    store
        .upsert("dupes", &DocId::from("2"), &json!({"_id": "2", "email": "z"}))
        .expect("2");
    assert!(matches!(
        store.ensure_index("dupes", &email),
        Err(PersistError::DuplicateKey { .. })
    ));
}
