use std::time::Instant;

use indexmap::IndexMap;
use indexmap::map::Entry;
use rowdraw_common::error::Result;
use rowdraw_storage::Record;
use tracing::{debug, warn};

use crate::candidates::{CandidateGenerator, enumerate_domain};
use crate::estimate::KeyDomain;
use crate::options::{CancelHandle, SampleOptions};
use crate::outcome::{SampleStats, SampleStatus};
use crate::resolve::RowResolver;

pub(crate) struct Collected {
    pub records: Vec<Record>,
    pub status: SampleStatus,
    pub stats: SampleStats,
    /// Draws stopped making progress while the domain still holds unseen rows.
    pub stalled: bool,
}

/// Unique rows gathered so far, keyed by identity.
pub(crate) struct Accumulator<'a> {
    options: &'a SampleOptions,
    cancel: &'a CancelHandle,
    have: IndexMap<i64, Record>,
    stats: SampleStats,
}

impl<'a> Accumulator<'a> {
    pub fn new(options: &'a SampleOptions, cancel: &'a CancelHandle) -> Self {
        Self {
            options,
            cancel,
            have: IndexMap::new(),
            stats: SampleStats::default(),
        }
    }

    fn target(&self) -> usize {
        self.options.limit
    }

    /// Resolves one batch and merges it. Returns the number of new unique rows.
    fn absorb(&mut self, resolver: &dyn RowResolver, candidates: &[i64]) -> Result<usize> {
        let resolved = resolver.resolve(candidates, &mut self.stats.retries)?;
        let mut distinct = candidates.to_vec();
        distinct.sort_unstable();
        distinct.dedup();

        let hits = resolved.len();
        let mut added = 0;
        for row in resolved {
            if let Entry::Vacant(slot) = self.have.entry(row.identity) {
                slot.insert(row.record);
                added += 1;
            }
        }

        self.stats.iterations += 1;
        self.stats.candidates += candidates.len() as u64;
        self.stats.hits += hits as u64;
        self.stats.misses += distinct.len().saturating_sub(hits) as u64;
        self.stats.duplicates += ((candidates.len() - distinct.len()) + (hits - added)) as u64;

        debug!(
            iteration = self.stats.iterations,
            batch = candidates.len(),
            hits,
            misses = distinct.len().saturating_sub(hits),
            added,
            have = self.have.len(),
            target = self.target(),
            "batch resolved"
        );
        Ok(added)
    }

    fn enumerate(&mut self, resolver: &dyn RowResolver, domain: KeyDomain) -> Result<()> {
        debug!(span = domain.span(), "enumerating whole key domain");
        for chunk in enumerate_domain(domain, self.options.max_batch_size) {
            self.cancel.check()?;
            self.absorb(resolver, &chunk)?;
        }
        self.stats.enumerated = true;
        Ok(())
    }

    /// Draws batches from `domain` until the target is met or no more progress is possible.
    pub fn run(
        mut self,
        resolver: &dyn RowResolver,
        domain: KeyDomain,
        generator: &mut CandidateGenerator,
    ) -> Result<Collected> {
        let started = Instant::now();
        let span = domain.span();
        let mut stalled = 0u32;
        let mut drawn_batches = 0u32;
        let mut unresolved_stall = false;

        let status = loop {
            if self.have.len() >= self.target() {
                break SampleStatus::Complete;
            }
            self.cancel.check()?;

            let deficit = self.target() - self.have.len();
            let batch = domain.batch_size(deficit, self.options.gaps, self.options.max_batch_size);
            let stuck = stalled >= self.options.stall_limit;

            if span <= batch as u64 || (stuck && span <= self.options.enumeration_limit) {
                self.enumerate(resolver, domain)?;
                break if self.have.len() >= self.target() {
                    SampleStatus::Complete
                } else {
                    SampleStatus::DomainExhausted
                };
            }
            if stuck {
                // Only a count at or below what was collected proves there is nothing left.
                if (self.have.len() as u64) < domain.estimated_count {
                    warn!(
                        stalled,
                        span,
                        have = self.have.len(),
                        estimated = domain.estimated_count,
                        "no new rows over a sparse domain too large to enumerate"
                    );
                    unresolved_stall = true;
                    break SampleStatus::BudgetExhausted;
                }
                debug!(
                    have = self.have.len(),
                    estimated = domain.estimated_count,
                    "stalled with every counted row collected"
                );
                break SampleStatus::DomainExhausted;
            }
            if drawn_batches >= self.options.max_iterations
                || self
                    .options
                    .time_budget
                    .is_some_and(|budget| started.elapsed() >= budget)
            {
                warn!(
                    iterations = drawn_batches,
                    have = self.have.len(),
                    "sampling budget exhausted"
                );
                break SampleStatus::BudgetExhausted;
            }

            let candidates = generator.generate(&domain, batch);
            drawn_batches += 1;
            if self.absorb(resolver, &candidates)? == 0 {
                stalled += 1;
            } else {
                stalled = 0;
            }
        };

        let records = self.reduce(generator);
        self.stats.elapsed = started.elapsed();
        Ok(Collected {
            records,
            status,
            stats: self.stats,
            stalled: unresolved_stall,
        })
    }

    /// Exactly `target` rows chosen uniformly from `have` (all of them if fewer), in
    /// random order.
    fn reduce(&mut self, generator: &mut CandidateGenerator) -> Vec<Record> {
        let have = std::mem::take(&mut self.have);
        if have.len() > self.target() {
            let mut slots: Vec<Option<Record>> = have.into_values().map(Some).collect();
            generator
                .choose_indices(slots.len(), self.target())
                .into_iter()
                .filter_map(|i| slots[i].take())
                .collect()
        } else {
            let mut records: Vec<Record> = have.into_values().collect();
            generator.shuffle(&mut records);
            records
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use rowdraw_common::error::Error;
    use rowdraw_common::types::Value;
    use rustc_hash::FxHashSet;

    use super::*;
    use crate::resolve::Resolved;

    /// Rows live at the given keys; every lookup is counted.
    struct FakeResolver {
        keys: FxHashSet<i64>,
        lookups: RefCell<usize>,
    }

    impl FakeResolver {
        fn new(keys: impl IntoIterator<Item = i64>) -> Self {
            Self {
                keys: keys.into_iter().collect(),
                lookups: RefCell::new(0),
            }
        }
    }

    impl RowResolver for FakeResolver {
        fn resolve(&self, candidates: &[i64], _retries: &mut u64) -> Result<Vec<Resolved>> {
            *self.lookups.borrow_mut() += 1;
            let distinct: FxHashSet<i64> = candidates.iter().copied().collect();
            Ok(distinct
                .into_iter()
                .filter(|k| self.keys.contains(k))
                .map(|k| Resolved {
                    identity: k,
                    record: Record::from_values(vec![Value::Int64(k)]),
                })
                .collect())
        }
    }

    fn ids(records: &[Record]) -> FxHashSet<i64> {
        records.iter().filter_map(|r| r[0].as_i64()).collect()
    }

    #[test]
    fn test_collects_exact_target() {
        let resolver = FakeResolver::new([1, 5, 10, 12]);
        let options = SampleOptions::new(3).with_seed(9);
        let cancel = CancelHandle::new();
        let mut generator = CandidateGenerator::new(options.seed);
        let domain = KeyDomain::new(1, 12, 4).unwrap();
        let collected = Accumulator::new(&options, &cancel)
            .run(&resolver, domain, &mut generator)
            .unwrap();
        assert_eq!(collected.status, SampleStatus::Complete);
        assert_eq!(collected.records.len(), 3);
        let found = ids(&collected.records);
        assert_eq!(found.len(), 3);
        assert!(found.is_subset(&[1, 5, 10, 12].into_iter().collect()));
    }

    #[test]
    fn test_small_domain_is_enumerated_and_exhausted() {
        let resolver = FakeResolver::new([1, 2, 3, 4]);
        let options = SampleOptions::new(10);
        let cancel = CancelHandle::new();
        let mut generator = CandidateGenerator::new(Some(1));
        let collected = Accumulator::new(&options, &cancel)
            .run(&resolver, KeyDomain::new(1, 4, 4).unwrap(), &mut generator)
            .unwrap();
        assert_eq!(collected.status, SampleStatus::DomainExhausted);
        assert_eq!(collected.records.len(), 4);
        assert!(collected.stats.enumerated);
    }

    #[test]
    fn test_stall_triggers_enumeration() {
        // Stale estimate claims 1000 rows, only two exist.
        let resolver = FakeResolver::new([17, 900]);
        let options = SampleOptions::new(5).with_max_batch_size(50).with_seed(4);
        let cancel = CancelHandle::new();
        let mut generator = CandidateGenerator::new(options.seed);
        let collected = Accumulator::new(&options, &cancel)
            .run(&resolver, KeyDomain::new(1, 1000, 1000).unwrap(), &mut generator)
            .unwrap();
        assert_eq!(collected.status, SampleStatus::DomainExhausted);
        assert_eq!(ids(&collected.records), [17, 900].into_iter().collect());
        assert!(collected.stats.enumerated);
    }

    #[test]
    fn test_stall_with_every_counted_row_is_exhaustion() {
        let resolver = FakeResolver::new(std::iter::empty());
        let options = SampleOptions::new(5)
            .with_enumeration_limit(10)
            .with_max_batch_size(20)
            .with_seed(2);
        let cancel = CancelHandle::new();
        let mut generator = CandidateGenerator::new(options.seed);
        let collected = Accumulator::new(&options, &cancel)
            .run(&resolver, KeyDomain::new(1, 1_000_000, 0).unwrap(), &mut generator)
            .unwrap();
        assert_eq!(collected.status, SampleStatus::DomainExhausted);
        assert!(!collected.stalled);
        assert!(!collected.stats.enumerated);
        assert_eq!(*resolver.lookups.borrow(), 3);
    }

    #[test]
    fn test_stall_over_sparse_domain_is_not_exhaustion() {
        // Two rows far apart: 20-candidate batches over a million keys almost never hit.
        let resolver = FakeResolver::new([1, 1_000_000]);
        let options = SampleOptions::new(2)
            .with_enumeration_limit(10)
            .with_max_batch_size(20)
            .with_seed(2);
        let cancel = CancelHandle::new();
        let mut generator = CandidateGenerator::new(options.seed);
        let collected = Accumulator::new(&options, &cancel)
            .run(&resolver, KeyDomain::new(1, 1_000_000, 2).unwrap(), &mut generator)
            .unwrap();
        assert_eq!(collected.status, SampleStatus::BudgetExhausted);
        assert!(collected.stalled);
        assert!(collected.records.len() < 2);
        assert!(!collected.stats.enumerated);
    }

    #[test]
    fn test_iteration_budget() {
        let resolver = FakeResolver::new([1]);
        let options = SampleOptions::new(5)
            .with_max_iterations(2)
            .with_stall_limit(100)
            .with_max_batch_size(10);
        let cancel = CancelHandle::new();
        let mut generator = CandidateGenerator::new(Some(2));
        let collected = Accumulator::new(&options, &cancel)
            .run(&resolver, KeyDomain::new(1, 1_000_000, 1_000_000).unwrap(), &mut generator)
            .unwrap();
        assert_eq!(collected.status, SampleStatus::BudgetExhausted);
        assert_eq!(collected.stats.iterations, 2);
    }

    #[test]
    fn test_cancelled_before_first_batch() {
        let resolver = FakeResolver::new([1, 2, 3]);
        let options = SampleOptions::new(2);
        let cancel = CancelHandle::new();
        cancel.cancel();
        let mut generator = CandidateGenerator::new(None);
        let result = Accumulator::new(&options, &cancel).run(
            &resolver,
            KeyDomain::new(1, 3, 3).unwrap(),
            &mut generator,
        );
        assert!(matches!(result, Err(Error::Cancelled)));
        assert_eq!(*resolver.lookups.borrow(), 0);
    }

    #[test]
    fn test_over_collection_reduced_to_target() {
        let resolver = FakeResolver::new(1..=100);
        let options = SampleOptions::new(7).with_gaps(20.0);
        let cancel = CancelHandle::new();
        let mut generator = CandidateGenerator::new(Some(8));
        let collected = Accumulator::new(&options, &cancel)
            .run(&resolver, KeyDomain::new(1, 100, 100).unwrap(), &mut generator)
            .unwrap();
        assert_eq!(collected.status, SampleStatus::Complete);
        assert_eq!(collected.records.len(), 7);
        assert_eq!(ids(&collected.records).len(), 7);
        assert!(collected.stats.hits > 7);
    }

    #[test]
    fn test_stats_account_for_every_candidate() {
        let resolver = FakeResolver::new((1..=1000).filter(|k| k % 2 == 0));
        let options = SampleOptions::new(50).with_seed(5);
        let cancel = CancelHandle::new();
        let mut generator = CandidateGenerator::new(options.seed);
        let collected = Accumulator::new(&options, &cancel)
            .run(&resolver, KeyDomain::new(1, 1000, 500).unwrap(), &mut generator)
            .unwrap();
        let s = &collected.stats;
        assert!(s.hits + s.misses <= s.candidates);
        assert!(s.hits >= 50);
        assert!(s.misses > 0);
        assert!(s.iterations >= 1);
    }
}
