mod common;

use common::{count, id, insert, shop_registry};
use lazarus_core::{
    db::{Db, DeleteOptions, Filter, Registry},
    error::ErrorClass,
    record::Document,
    value::Value,
};
use lazarus_schema::node::{FieldKind, TypeDef};

fn account_registry() -> Registry {
    Registry::builder()
        .register(
            TypeDef::new("Account")
                .field("email", FieldKind::Text)
                .field("org", FieldKind::Text)
                .field("handle", FieldKind::Text)
                .unique(["email"])
                .unique(["org", "handle"]),
        )
        .build()
        .unwrap()
}

#[tokio::test]
async fn insert_collision_names_the_path_and_holder() {
    let db = Db::in_memory(shop_registry());
    let first = insert(&db, "User", Document::new().with("email", "a@x")).await;

    let err = db
        .collection("User")
        .unwrap()
        .insert(Document::new().with("email", "a@x"))
        .await
        .unwrap_err();

    assert_eq!(err.class, ErrorClass::Conflict);
    let violation = err.uniqueness_violation().unwrap();
    assert_eq!(violation.paths, vec!["email".to_string()]);
    assert_eq!(violation.record, Some(id(&first)));
    assert_eq!(count(&db, "User").await, (1, 0, 1));
}

#[tokio::test]
async fn missing_and_null_values_never_collide() {
    let db = Db::in_memory(shop_registry());
    let users = db.collection("User").unwrap();

    users.insert(Document::new()).await.unwrap();
    users.insert(Document::new()).await.unwrap();
    users
        .insert(Document::new().with("email", Value::Null))
        .await
        .unwrap();

    assert_eq!(count(&db, "User").await, (3, 0, 3));
}

#[tokio::test]
async fn tombstoned_values_can_be_reused() {
    let db = Db::in_memory(shop_registry());
    let old = insert(&db, "User", Document::new().with("email", "a@x")).await;
    let users = db.collection("User").unwrap();

    users.delete(&old, DeleteOptions::default()).await.unwrap();
    users
        .insert(Document::new().with("email", "a@x"))
        .await
        .expect("the holder is tombstoned");

    assert_eq!(count(&db, "User").await, (1, 1, 2));
}

#[tokio::test]
async fn composite_constraints_need_every_component() {
    let db = Db::in_memory(account_registry());
    let accounts = db.collection("Account").unwrap();

    accounts
        .insert(Document::new().with("org", "acme").with("handle", "root"))
        .await
        .unwrap();
    accounts
        .insert(Document::new().with("org", "acme").with("handle", "ops"))
        .await
        .unwrap();
    accounts
        .insert(Document::new().with("org", "umbrella").with("handle", "root"))
        .await
        .unwrap();

    let err = accounts
        .insert(Document::new().with("org", "acme").with("handle", "root"))
        .await
        .unwrap_err();
    assert_eq!(
        err.uniqueness_violation().unwrap().paths,
        vec!["org+handle".to_string()]
    );
}

#[tokio::test]
async fn batch_reports_every_colliding_constraint() {
    let db = Db::in_memory(account_registry());
    let accounts = db.collection("Account").unwrap();
    let doc = || {
        Document::new()
            .with("email", "a@x")
            .with("org", "acme")
            .with("handle", "root")
    };

    let err = accounts.insert_many(vec![doc(), doc()]).await.unwrap_err();

    let violation = err.uniqueness_violation().unwrap();
    assert_eq!(
        violation.paths,
        vec!["email".to_string(), "org+handle".to_string()]
    );
    assert_eq!(count(&db, "Account").await, (0, 0, 0));
}

#[tokio::test]
async fn batch_is_checked_against_live_records() {
    let db = Db::in_memory(account_registry());
    insert(&db, "Account", Document::new().with("email", "a@x")).await;

    let err = db
        .collection("Account")
        .unwrap()
        .insert_many(vec![
            Document::new().with("email", "b@x"),
            Document::new().with("email", "a@x"),
        ])
        .await
        .unwrap_err();

    assert!(err.uniqueness_violation().is_some());
    assert_eq!(count(&db, "Account").await, (1, 0, 1));
}

#[tokio::test]
async fn update_excludes_the_record_itself() {
    let db = Db::in_memory(shop_registry());
    let me = insert(&db, "User", Document::new().with("email", "a@x")).await;
    insert(&db, "User", Document::new().with("email", "b@x")).await;
    let users = db.collection("User").unwrap();

    let updated = users
        .update(id(&me), Document::new().with("email", "a@x").with("name", "Al"))
        .await
        .expect("keeping its own value is fine");
    assert_eq!(updated.fields().get("name"), Some(&Value::from("Al")));

    let err = users
        .update(id(&me), Document::new().with("email", "b@x"))
        .await
        .unwrap_err();
    assert_eq!(err.uniqueness_violation().unwrap().paths, vec!["email".to_string()]);

    let stored = users.get(id(&me)).await.unwrap().unwrap();
    assert_eq!(stored.fields().get("email"), Some(&Value::from("a@x")));
}

#[tokio::test]
async fn update_of_a_tombstoned_record_is_not_found() {
    let db = Db::in_memory(shop_registry());
    let me = insert(&db, "User", Document::new().with("email", "a@x")).await;
    let users = db.collection("User").unwrap();
    users.delete(&me, DeleteOptions::default()).await.unwrap();

    let err = users
        .update(id(&me), Document::new().with("name", "x"))
        .await
        .unwrap_err();

    assert!(err.is_not_found());
}

#[tokio::test]
async fn reserved_keys_are_rejected() {
    let db = Db::in_memory(shop_registry());
    let users = db.collection("User").unwrap();

    for key in ["_id", "deleted", "deletedAt"] {
        let err = users
            .insert(Document::new().with(key, true))
            .await
            .unwrap_err();
        assert_eq!(err.class, ErrorClass::Unsupported, "{key}");
    }

    let me = insert(&db, "User", Document::new().with("email", "a@x")).await;
    let err = users
        .update(id(&me), Document::new().with("deleted", true))
        .await
        .unwrap_err();
    assert_eq!(err.class, ErrorClass::Unsupported);
    assert!(!users.get(id(&me)).await.unwrap().unwrap().is_deleted());
}

#[tokio::test]
async fn raw_restore_skips_the_gate() {
    let db = Db::in_memory(shop_registry());
    let old = insert(&db, "User", Document::new().with("email", "a@x")).await;
    let users = db.collection("User").unwrap();
    users.delete(&old, DeleteOptions::default()).await.unwrap();
    insert(&db, "User", Document::new().with("email", "a@x")).await;

    let restored = users
        .restore_many(Filter::eq("email", "a@x"))
        .await
        .unwrap();

    assert_eq!(restored, 1);
    assert_eq!(count(&db, "User").await, (2, 0, 2));
}
