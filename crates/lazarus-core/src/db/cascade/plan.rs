use crate::{
    db::{
        cascade::{Cascade, guard::ReferenceViolation},
        filter::Filter,
        registry::{ForeignRule, LocalRule, LocalTarget},
        visibility::Visibility,
    },
    error::InternalError,
    obs::MetricsEvent,
    record::{ID_PATH, Record, RecordRef},
    types::RecordId,
    value::Value,
};
use futures::{
    FutureExt, StreamExt,
    future::BoxFuture,
    stream,
};
use std::collections::BTreeSet;

///
/// PlanReason
///
/// Why a node entered the plan.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PlanReason {
    Root,
    /// Referenced by the parent through one of the parent's own fields.
    Local { field: String },
    /// References the parent; selected by the parent's foreign rule.
    Foreign { paths: Vec<String> },
}

///
/// PlanNode
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PlanNode {
    pub target: RecordRef,
    pub reason: PlanReason,
    pub children: Vec<Self>,
}

impl PlanNode {
    fn post_order<'a>(&'a self, out: &mut Vec<&'a RecordRef>) {
        for child in &self.children {
            child.post_order(out);
        }
        out.push(&self.target);
    }
}

///
/// DeletePlan
///
/// Immutable tree of pending tombstones rooted at the record the caller
/// deleted. Built without writes; only a complete plan exists.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DeletePlan {
    pub root: PlanNode,
}

impl DeletePlan {
    /// Distinct targets, dependents before their referents, root last.
    #[must_use]
    pub fn commit_order(&self) -> Vec<&RecordRef> {
        let mut all = Vec::new();
        self.root.post_order(&mut all);

        let mut seen = BTreeSet::new();
        all.retain(|target| seen.insert(*target));
        all
    }

    /// Number of distinct records the plan tombstones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commit_order().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn contains(&self, target: &RecordRef) -> bool {
        self.commit_order().contains(&target)
    }
}

// Why planning stopped.
pub(crate) enum PlanFailure {
    Blocked(ReferenceViolation),
    Fatal(InternalError),
}

impl From<InternalError> for PlanFailure {
    fn from(err: InternalError) -> Self {
        Self::Fatal(err)
    }
}

impl From<PlanFailure> for InternalError {
    fn from(failure: PlanFailure) -> Self {
        match failure {
            PlanFailure::Blocked(violation) => violation.into(),
            PlanFailure::Fatal(err) => err,
        }
    }
}

// One child discovered while expanding a node.
struct Pending {
    record: Record,
    target: RecordRef,
    reason: PlanReason,
}

impl Cascade<'_> {
    /// Build the full delete plan for a live root record.
    pub(crate) async fn plan_delete(&self, root: Record) -> Result<DeletePlan, InternalError> {
        let target = root
            .target()
            .ok_or_else(|| InternalError::executor_invariant("plan root has no identifier"))?;

        let node = self
            .plan_node(
                target.clone(),
                root,
                PlanReason::Root,
                BTreeSet::new(),
                &target,
                0,
            )
            .await?;
        let plan = DeletePlan { root: node };

        self.sink.record(MetricsEvent::CascadePlanned {
            type_name: target.type_name.clone(),
            nodes: plan.len() as u64,
        });
        if self.config.debug {
            tracing::debug!(root = %target, nodes = plan.len(), "delete plan built");
        }

        Ok(plan)
    }

    fn plan_node<'b>(
        &'b self,
        target: RecordRef,
        record: Record,
        reason: PlanReason,
        ancestors: BTreeSet<RecordRef>,
        root: &'b RecordRef,
        depth: usize,
    ) -> BoxFuture<'b, Result<PlanNode, PlanFailure>> {
        async move {
            if depth > self.config.max_cascade_depth {
                return Err(PlanFailure::Fatal(InternalError::executor_invariant(format!(
                    "cascade from {root} exceeded max depth {} at {target}",
                    self.config.max_cascade_depth
                ))));
            }

            let registered = self
                .registry
                .try_get(&target.type_name)
                .map_err(InternalError::from)?;
            let policy = registered.policy();

            // existence guard first; a blocked node is not expanded
            let mut branch = ancestors;
            branch.insert(target.clone());
            if let Some(violation) = self
                .check_guard(root, &target, &policy.guard, &branch)
                .await?
            {
                return Err(PlanFailure::Blocked(violation));
            }

            let mut pending = Vec::new();
            for rule in &policy.local {
                pending.extend(self.expand_local(&record, rule).await?);
            }
            for rule in &policy.foreign {
                pending.extend(self.expand_foreign(target.id, rule).await?);
            }

            let mut seen = BTreeSet::new();
            pending.retain(|p| !branch.contains(&p.target) && seen.insert(p.target.clone()));

            if self.config.debug && !pending.is_empty() {
                tracing::debug!(%target, depth, children = pending.len(), "expanding cascade node");
            }

            let results: Vec<Result<PlanNode, PlanFailure>> = stream::iter(pending)
                .map(|p| {
                    self.plan_node(p.target, p.record, p.reason, branch.clone(), root, depth + 1)
                })
                .buffered(self.config.effective_concurrency())
                .collect()
                .await;

            let children = merge_children(results)?;

            Ok(PlanNode {
                target,
                reason,
                children,
            })
        }
        .boxed()
    }

    async fn expand_local(
        &self,
        record: &Record,
        rule: &LocalRule,
    ) -> Result<Vec<Pending>, InternalError> {
        let ids: Vec<RecordId> = record
            .fields()
            .resolve(&rule.path)
            .into_iter()
            .flat_map(Value::record_ids)
            .collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let candidates: Vec<&str> = match &rule.target {
            LocalTarget::Static(name) => vec![name.as_str()],
            LocalTarget::Dynamic {
                discriminator,
                candidates,
            } => {
                let named: Vec<&str> = record
                    .fields()
                    .resolve(discriminator)
                    .into_iter()
                    .filter_map(Value::as_text)
                    .filter(|name| candidates.iter().any(|c| c.as_str() == *name))
                    .collect();
                if named.is_empty() {
                    candidates.iter().map(String::as_str).collect()
                } else {
                    named
                }
            }
        };

        let filter = Visibility::Active.apply(Filter::in_(ID_PATH, ids));
        let mut out = Vec::new();
        for type_name in candidates {
            for row in self.store.find(type_name, &filter, None).await? {
                if let Some(target) = row.target() {
                    out.push(Pending {
                        record: row,
                        target,
                        reason: PlanReason::Local {
                            field: rule.path.clone(),
                        },
                    });
                }
            }
        }

        Ok(out)
    }

    async fn expand_foreign(
        &self,
        id: RecordId,
        rule: &ForeignRule,
    ) -> Result<Vec<Pending>, InternalError> {
        let filter = Visibility::Active.apply(rule.predicate.to_filter(id));
        let rows = self.store.find(&rule.target_type, &filter, None).await?;
        self.sink.record(MetricsEvent::RowsScanned {
            type_name: rule.target_type.clone(),
            rows_scanned: rows.len() as u64,
        });

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let target = row.target()?;
                Some(Pending {
                    record: row,
                    target,
                    reason: PlanReason::Foreign {
                        paths: rule.predicate.paths().to_vec(),
                    },
                })
            })
            .collect())
    }
}

// Any fatal error wins; otherwise every branch's blockers are reported.
fn merge_children(results: Vec<Result<PlanNode, PlanFailure>>) -> Result<Vec<PlanNode>, PlanFailure> {
    let mut children = Vec::with_capacity(results.len());
    let mut blocked: Option<ReferenceViolation> = None;

    for result in results {
        match result {
            Ok(node) => children.push(node),
            Err(PlanFailure::Fatal(err)) => return Err(PlanFailure::Fatal(err)),
            Err(PlanFailure::Blocked(violation)) => match &mut blocked {
                Some(existing) => existing.merge(violation),
                None => blocked = Some(violation),
            },
        }
    }

    match blocked {
        Some(violation) => Err(PlanFailure::Blocked(violation)),
        None => Ok(children),
    }
}
