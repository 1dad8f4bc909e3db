//! Uniqueness validation.
//!
//! Constraints are scoped to live records: a tombstoned record never blocks a
//! write, and a restore is checked like a fresh insert.

use crate::{
    db::{filter::Filter, registry::RegisteredType, store::DocumentStore, visibility::Visibility},
    error::InternalError,
    obs::{MetricsEvent, MetricsSink},
    record::{Document, Record},
    types::RecordId,
    value::Value,
};
use lazarus_schema::node::UniqueDef;
use thiserror::Error as ThisError;

///
/// UniquenessViolation
///
/// Every colliding constraint found for one write, by path
/// (composite constraints render as `a+b`).
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("uniqueness violation on '{type_name}': {}", .paths.join(", "))]
pub struct UniquenessViolation {
    pub type_name: String,
    pub paths: Vec<String>,

    /// A live record holding one of the colliding values, when known.
    pub record: Option<RecordId>,
}

///
/// UniqueValidator
///

pub(crate) struct UniqueValidator<'a> {
    store: &'a dyn DocumentStore,
    registered: &'a RegisteredType,
    sink: &'a dyn MetricsSink,
}

// One colliding constraint.
struct Collision {
    path: String,
    record: Option<RecordId>,
}

impl<'a> UniqueValidator<'a> {
    pub(crate) fn new(
        store: &'a dyn DocumentStore,
        registered: &'a RegisteredType,
        sink: &'a dyn MetricsSink,
    ) -> Self {
        Self {
            store,
            registered,
            sink,
        }
    }

    /// Gate a new record.
    pub(crate) async fn check_insert(&self, fields: &Document) -> Result<(), InternalError> {
        let found = self
            .collisions(fields, self.registered.unique().iter(), None)
            .await?;

        self.finish(found)
    }

    /// Gate an update of `id`; only constraints touched by `changed` run.
    pub(crate) async fn check_update(
        &self,
        id: RecordId,
        merged: &Document,
        changed: &[String],
    ) -> Result<(), InternalError> {
        let touched = self
            .registered
            .unique()
            .iter()
            .filter(|u| changed.iter().any(|path| u.touches(path)));
        let found = self.collisions(merged, touched, Some(id)).await?;

        self.finish(found)
    }

    /// Gate a batch insert: each document against live records and against
    /// the documents before it in the batch.
    pub(crate) async fn check_batch(&self, batch: &[Document]) -> Result<(), InternalError> {
        let mut found = Vec::new();

        for (i, fields) in batch.iter().enumerate() {
            found.extend(
                self.collisions(fields, self.registered.unique().iter(), None)
                    .await?,
            );
            found.extend(sibling_collisions(
                self.registered.unique(),
                fields,
                batch[..i].iter(),
            ));
        }

        self.finish(found)
    }

    /// Gate a restore. The record's own id is not excluded: it is tombstoned,
    /// so anything live that matches is another record.
    pub(crate) async fn check_restore(&self, record: &Record) -> Result<(), InternalError> {
        let found = self
            .collisions(record.fields(), self.registered.unique().iter(), None)
            .await?;

        self.finish(found)
    }

    /// Gate several records of this type re-entering the live set together.
    pub(crate) async fn check_restore_set(&self, records: &[&Record]) -> Result<(), InternalError> {
        let mut found = Vec::new();

        for (i, record) in records.iter().enumerate() {
            found.extend(
                self.collisions(record.fields(), self.registered.unique().iter(), None)
                    .await?,
            );
            found.extend(sibling_collisions(
                self.registered.unique(),
                record.fields(),
                records[..i].iter().map(|r| r.fields()),
            ));
        }

        self.finish(found)
    }

    async fn collisions(
        &self,
        fields: &Document,
        constraints: impl Iterator<Item = &UniqueDef>,
        exclude: Option<RecordId>,
    ) -> Result<Vec<Collision>, InternalError> {
        let type_name = self.registered.name();
        let mut found = Vec::new();

        for unique in constraints {
            let Some(key) = unique_key(fields, unique) else {
                continue;
            };

            let filter = Visibility::Active.apply(narrowing_filter(unique, &key));
            let rows = self.store.find(type_name, &filter, None).await?;
            self.sink.record(MetricsEvent::RowsScanned {
                type_name: type_name.to_string(),
                rows_scanned: rows.len() as u64,
            });

            let hit = rows.iter().find(|row| {
                row.id() != exclude && unique_key(row.fields(), unique).as_ref() == Some(&key)
            });
            if let Some(row) = hit {
                found.push(Collision {
                    path: unique.to_string(),
                    record: row.id(),
                });
            }
        }

        Ok(found)
    }

    fn finish(&self, found: Vec<Collision>) -> Result<(), InternalError> {
        if found.is_empty() {
            return Ok(());
        }

        let type_name = self.registered.name().to_string();
        self.sink.record(MetricsEvent::UniqueViolation {
            type_name: type_name.clone(),
        });

        let record = found.iter().find_map(|c| c.record);
        let mut paths: Vec<String> = Vec::new();
        for collision in found {
            if !paths.contains(&collision.path) {
                paths.push(collision.path);
            }
        }
        tracing::debug!(%type_name, ?paths, "uniqueness violation");

        Err(UniquenessViolation {
            type_name,
            paths,
            record,
        }
        .into())
    }
}

/// Candidate key of one constraint, or `None` when every component is null
/// or missing (such records never collide).
fn unique_key(fields: &Document, unique: &UniqueDef) -> Option<Vec<Value>> {
    let key: Vec<Value> = unique
        .fields
        .iter()
        .map(|path| {
            let mut values = fields.resolve(path);
            match values.len() {
                0 => Value::Null,
                1 => values.remove(0).clone(),
                _ => Value::List(values.into_iter().cloned().collect()),
            }
        })
        .collect();

    if key.iter().all(Value::is_null) {
        None
    } else {
        Some(key)
    }
}

// Store-side narrowing; exact comparison happens on the returned rows.
fn narrowing_filter(unique: &UniqueDef, key: &[Value]) -> Filter {
    let parts = unique
        .fields
        .iter()
        .zip(key)
        .map(|(path, value)| {
            if path.contains('.') && matches!(value, Value::List(_)) {
                Filter::exists(path.as_str())
            } else {
                Filter::eq(path.as_str(), value.clone())
            }
        })
        .collect();

    Filter::And(parts)
}

fn sibling_collisions<'d>(
    constraints: &[UniqueDef],
    fields: &Document,
    earlier: impl Iterator<Item = &'d Document> + Clone,
) -> Vec<Collision> {
    constraints
        .iter()
        .filter_map(|unique| {
            let key = unique_key(fields, unique)?;
            earlier
                .clone()
                .any(|other| unique_key(other, unique).as_ref() == Some(&key))
                .then(|| Collision {
                    path: unique.to_string(),
                    record: None,
                })
        })
        .collect()
}
