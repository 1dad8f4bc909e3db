use crate::{
    db::{
        cascade::Cascade,
        registry::{ReferenceGuard, ReferenceEdge},
        visibility::Visibility,
    },
    error::InternalError,
    obs::MetricsEvent,
    record::RecordRef,
    types::RecordId,
};
use std::{collections::BTreeSet, fmt};
use thiserror::Error as ThisError;

///
/// Blocker
///
/// Live records of one type that still reference a guarded record.
/// `count` is exact; `ids` may be truncated.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Blocker {
    pub target: RecordRef,
    pub source_type: String,
    pub fields: Vec<String>,
    pub count: u64,
    pub ids: Vec<RecordId>,
}

///
/// ReferenceViolation
///
/// Delete refused because guarded records in the cascade are still
/// referenced. Lists every blocker found across the whole plan.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub struct ReferenceViolation {
    pub root: RecordRef,
    pub blockers: Vec<Blocker>,
}

impl ReferenceViolation {
    /// Total blocking records across all blockers.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.blockers.iter().map(|b| b.count).sum()
    }

    /// Fold another violation's blockers into this one.
    pub(crate) fn merge(&mut self, other: Self) {
        for blocker in other.blockers {
            let existing = self
                .blockers
                .iter_mut()
                .find(|b| b.target == blocker.target && b.source_type == blocker.source_type);
            match existing {
                Some(b) if b.fields == blocker.fields => {}
                Some(b) => {
                    for field in blocker.fields {
                        if !b.fields.contains(&field) {
                            b.fields.push(field);
                        }
                    }
                }
                None => self.blockers.push(blocker),
            }
        }
    }
}

impl fmt::Display for ReferenceViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "delete of {} blocked by live references:", self.root)?;
        for (i, b) in self.blockers.iter().enumerate() {
            let sep = if i == 0 { " " } else { "; " };
            write!(
                f,
                "{sep}{} {} record(s) via [{}] reference {}",
                b.count,
                b.source_type,
                b.fields.join(", "),
                b.target
            )?;
        }

        Ok(())
    }
}

impl Cascade<'_> {
    /// Existence guard for one planned node. `excluded` holds records the
    /// same cascade branch is already deleting; they never block.
    pub(crate) async fn check_guard(
        &self,
        root: &RecordRef,
        target: &RecordRef,
        guard: &ReferenceGuard,
        excluded: &BTreeSet<RecordRef>,
    ) -> Result<Option<ReferenceViolation>, InternalError> {
        if !guard.is_active() {
            return Ok(None);
        }

        let edges: Vec<&ReferenceEdge> = self
            .registry
            .edges_into(&target.type_name)?
            .iter()
            .filter(|edge| guard.blocks(&edge.source_type))
            .collect();

        let mut blockers: Vec<Blocker> = Vec::new();
        for edge in edges {
            let filter = Visibility::Active.apply(edge.filter(target.id));
            let rows = self.store.find(&edge.source_type, &filter, None).await?;
            self.sink.record(MetricsEvent::RowsScanned {
                type_name: edge.source_type.clone(),
                rows_scanned: rows.len() as u64,
            });

            let ids: Vec<RecordId> = rows
                .iter()
                .filter_map(|row| row.target())
                .filter(|r| r != target && !excluded.contains(r))
                .map(|r| r.id)
                .collect();
            if ids.is_empty() {
                continue;
            }

            match blockers
                .iter_mut()
                .find(|b| b.source_type == edge.source_type)
            {
                Some(b) => {
                    if !b.fields.contains(&edge.field_path) {
                        b.fields.push(edge.field_path.clone());
                    }
                    for id in ids {
                        if !b.ids.contains(&id) {
                            b.ids.push(id);
                            b.count += 1;
                        }
                    }
                }
                None => blockers.push(Blocker {
                    target: target.clone(),
                    source_type: edge.source_type.clone(),
                    fields: vec![edge.field_path.clone()],
                    count: ids.len() as u64,
                    ids,
                }),
            }
        }

        if blockers.is_empty() {
            return Ok(None);
        }

        for b in &mut blockers {
            b.ids.truncate(self.config.max_blocker_ids);
        }
        self.sink.record(MetricsEvent::ReferenceBlocked {
            type_name: target.type_name.clone(),
            blockers: blockers.iter().map(|b| b.count).sum(),
        });
        tracing::debug!(%target, blockers = blockers.len(), "existence guard tripped");

        Ok(Some(ReferenceViolation {
            root: root.clone(),
            blockers,
        }))
    }
}
