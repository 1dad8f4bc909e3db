use crate::{db::filter::Filter, record::DELETED_PATH};

///
/// Visibility
///
/// Which lifecycle states a query sees.
///
/// Active  → live records only; injected unless the caller's filter already
///           constrains `deleted`
/// Deleted → tombstoned records only
/// All     → both
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Visibility {
    #[default]
    Active,
    Deleted,
    All,
}

impl Visibility {
    /// Rewrite a caller filter to respect this visibility.
    #[must_use]
    pub fn apply(self, filter: Filter) -> Filter {
        match self {
            Self::Active if filter.mentions(DELETED_PATH) => filter,
            Self::Active => conjoin(filter, Filter::eq(DELETED_PATH, false)),
            Self::Deleted => conjoin(filter, Filter::eq(DELETED_PATH, true)),
            Self::All => conjoin(filter, Filter::in_(DELETED_PATH, [true, false])),
        }
    }
}

fn conjoin(filter: Filter, flag: Filter) -> Filter {
    match filter {
        Filter::True => flag,
        Filter::And(mut filters) => {
            filters.push(flag);
            Filter::And(filters)
        }
        other => other & flag,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        record::{Document, Record, Tombstone},
        types::{RecordId, Timestamp},
    };
    use proptest::prelude::*;

    fn record(n: i64, deleted: bool) -> Record {
        let mut record =
            Record::new("Item", Document::new().with("n", n)).with_id(RecordId::generate());
        if deleted {
            record.tombstone = Tombstone::Deleted {
                at: Timestamp::from_millis(1),
            };
        }
        record
    }

    #[test]
    fn active_injects_flag_unless_caller_mentions_it() {
        assert_eq!(
            Visibility::Active.apply(Filter::True),
            Filter::eq(DELETED_PATH, false)
        );

        let explicit = Filter::eq(DELETED_PATH, true);
        assert_eq!(Visibility::Active.apply(explicit.clone()), explicit);
    }

    #[test]
    fn deleted_overrides_and_all_spans_both() {
        let live = record(1, false);
        let gone = record(1, true);

        assert!(!Visibility::Deleted.apply(Filter::True).matches(&live));
        assert!(Visibility::Deleted.apply(Filter::True).matches(&gone));
        assert!(Visibility::All.apply(Filter::True).matches(&live));
        assert!(Visibility::All.apply(Filter::True).matches(&gone));
    }

    proptest! {
        #[test]
        fn with_deleted_is_the_sum_of_active_and_deleted(
            rows in prop::collection::vec((0i64..4, any::<bool>()), 0..32),
            probe in 0i64..4,
        ) {
            let records: Vec<Record> = rows.iter().map(|&(n, d)| record(n, d)).collect();
            let base = Filter::eq("n", probe);
            let count = |v: Visibility| {
                let filter = v.apply(base.clone());
                records.iter().filter(|r| filter.matches(r)).count()
            };

            let active = count(Visibility::Active);
            prop_assert_eq!(count(Visibility::All), active + count(Visibility::Deleted));

            let filter = Visibility::Active.apply(base.clone());
            prop_assert!(records.iter().filter(|r| filter.matches(r)).all(|r| !r.is_deleted()));
        }
    }
}
