#![allow(dead_code)]

use async_trait::async_trait;
use lazarus_core::{
    db::{
        Db, DocumentStore, Filter, MemoryStore, Patch, Projection, Registry,
    },
    error::StoreError,
    record::{Document, Record},
    types::RecordId,
    value::Value,
};
use lazarus_schema::node::{DeletePolicyDef, FieldDef, FieldKind, ForeignPathDef, TypeDef};
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

/// `User` cascades into the shops it owns; `email` is unique.
pub fn shop_registry() -> Registry {
    Registry::builder()
        .register(
            TypeDef::new("User")
                .field("name", FieldKind::Text)
                .field("email", FieldKind::Text)
                .unique(["email"])
                .on_delete(
                    DeletePolicyDef::new().clean_foreign("Shop", ForeignPathDef::path("owner")),
                ),
        )
        .register(
            TypeDef::new("Shop")
                .field("title", FieldKind::Text)
                .field("slug", FieldKind::Text)
                .field("owner", FieldKind::reference("User"))
                .unique(["slug"]),
        )
        .build()
        .expect("shop registry should build")
}

/// `A -> B -> C` local cascades; `C` refuses deletion while any `D` points at it.
pub fn chain_registry() -> Registry {
    Registry::builder()
        .register(
            TypeDef::new("A")
                .field("b", FieldKind::reference("B"))
                .on_delete(DeletePolicyDef::new().clean_local("b")),
        )
        .register(
            TypeDef::new("B")
                .field("c", FieldKind::reference("C"))
                .on_delete(DeletePolicyDef::new().clean_local("c")),
        )
        .register(
            TypeDef::new("C")
                .field("name", FieldKind::Text)
                .on_delete(DeletePolicyDef::new().error_on_referenced()),
        )
        .register(TypeDef::new("D").field("c", FieldKind::reference("C")))
        .build()
        .expect("chain registry should build")
}

/// Comments attach to a post or a shop through an enum discriminator.
pub fn attachment_registry() -> Registry {
    Registry::builder()
        .register(TypeDef::new("Post").field("title", FieldKind::Text))
        .register(TypeDef::new("Shop").field("title", FieldKind::Text))
        .register(
            TypeDef::new("Pin")
                .field(
                    "subject",
                    FieldKind::Object(vec![
                        FieldDef::new("kind", FieldKind::Enum(vec!["Post".into(), "Shop".into()])),
                        FieldDef::new("id", FieldKind::dynamic_reference("kind")),
                    ]),
                )
                .on_delete(DeletePolicyDef::new().clean_local("subject.id")),
        )
        .build()
        .expect("attachment registry should build")
}

pub async fn insert(db: &Db, type_name: &str, fields: Document) -> Record {
    db.collection(type_name)
        .expect("type should be registered")
        .insert(fields)
        .await
        .expect("insert should succeed")
}

pub async fn count(db: &Db, type_name: &str) -> (u64, u64, u64) {
    let coll = db.collection(type_name).expect("type should be registered");

    (
        coll.count(Filter::True).await.expect("count should succeed"),
        coll.count_deleted(Filter::True)
            .await
            .expect("count should succeed"),
        coll.count_with_deleted(Filter::True)
            .await
            .expect("count should succeed"),
    )
}

pub async fn reload(db: &Db, record: &Record) -> Record {
    db.collection(record.type_name())
        .expect("type should be registered")
        .get_with_deleted(id(record))
        .await
        .expect("get should succeed")
        .expect("record should still exist")
}

pub fn id(record: &Record) -> RecordId {
    record.id().expect("stored record has an id")
}

pub fn id_value(record: &Record) -> Value {
    Value::from(id(record))
}

///
/// FailingStore
///
/// Memory store whose `update_one` fails once a set number of updates
/// have succeeded.
///

pub struct FailingStore {
    pub inner: MemoryStore,
    allowed: AtomicUsize,
}

impl FailingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryStore::new(),
            allowed: AtomicUsize::new(usize::MAX),
        })
    }

    pub fn fail_after(&self, updates: usize) {
        self.allowed.store(updates, Ordering::SeqCst);
    }

    pub fn heal(&self) {
        self.allowed.store(usize::MAX, Ordering::SeqCst);
    }
}

#[async_trait]
impl DocumentStore for FailingStore {
    async fn find(
        &self,
        type_name: &str,
        filter: &Filter,
        projection: Option<&Projection>,
    ) -> Result<Vec<Record>, StoreError> {
        self.inner.find(type_name, filter, projection).await
    }

    async fn count(&self, type_name: &str, filter: &Filter) -> Result<u64, StoreError> {
        self.inner.count(type_name, filter).await
    }

    async fn update_one(
        &self,
        type_name: &str,
        filter: &Filter,
        patch: &Patch,
    ) -> Result<u64, StoreError> {
        let left = self.allowed.load(Ordering::SeqCst);
        if left == 0 {
            // one failure, then writes flow again so rollback can run
            self.heal();
            return Err(StoreError::Backend {
                message: "injected failure".to_string(),
            });
        }
        if left != usize::MAX {
            self.allowed.store(left - 1, Ordering::SeqCst);
        }

        self.inner.update_one(type_name, filter, patch).await
    }

    async fn update_many(
        &self,
        type_name: &str,
        filter: &Filter,
        patch: &Patch,
    ) -> Result<u64, StoreError> {
        self.inner.update_many(type_name, filter, patch).await
    }

    async fn insert_one(&self, record: Record) -> Result<RecordId, StoreError> {
        self.inner.insert_one(record).await
    }

    async fn insert_many(&self, records: Vec<Record>) -> Result<Vec<RecordId>, StoreError> {
        self.inner.insert_many(records).await
    }

    async fn delete_one(&self, type_name: &str, filter: &Filter) -> Result<u64, StoreError> {
        self.inner.delete_one(type_name, filter).await
    }

    async fn delete_many(&self, type_name: &str, filter: &Filter) -> Result<u64, StoreError> {
        self.inner.delete_many(type_name, filter).await
    }
}

///
/// CapturingSink
///

#[derive(Default)]
pub struct CapturingSink {
    pub events: parking_lot::Mutex<Vec<lazarus_core::obs::MetricsEvent>>,
}

impl lazarus_core::obs::MetricsSink for CapturingSink {
    fn record(&self, event: lazarus_core::obs::MetricsEvent) {
        self.events.lock().push(event);
    }
}
