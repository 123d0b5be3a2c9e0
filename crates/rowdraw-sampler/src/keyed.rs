use rowdraw_common::error::Result;
use tracing::{debug, instrument, warn};

use crate::accumulator::{Accumulator, Collected};
use crate::candidates::CandidateGenerator;
use crate::estimate::estimate;
use crate::introspect::RelationHandle;
use crate::keyless::sample_keyless;
use crate::options::{CancelHandle, SampleOptions};
use crate::outcome::{SampleStats, SampleStatus};
use crate::resolve::KeyedResolver;
use crate::sql::Ident;
use crate::store::RelationStore;

/// Samples by drawing random values of an integer key column.
///
/// When draws stall over a domain too sparse to enumerate while the row count says
/// rows are still missing, the relation is sampled by position instead. Rows already
/// found are discarded so the result stays uniform.
#[instrument(skip_all, fields(key = %key))]
pub(crate) fn sample_keyed(
    store: &dyn RelationStore,
    handle: &RelationHandle,
    key: &Ident,
    options: &SampleOptions,
    cancel: &CancelHandle,
    generator: &mut CandidateGenerator,
) -> Result<Collected> {
    let mut retries = 0;
    let domain = estimate(
        store,
        handle,
        key,
        options.count_source,
        &options.retry,
        &mut retries,
    )?;
    let Some(domain) = domain else {
        debug!("key column has no values");
        return Ok(Collected {
            records: Vec::new(),
            status: SampleStatus::DomainExhausted,
            stats: SampleStats {
                retries,
                ..SampleStats::default()
            },
            stalled: false,
        });
    };

    let resolver = KeyedResolver::new(
        store,
        handle.relation().clone(),
        handle.idents(),
        key.clone(),
        &options.retry,
    )?;
    let mut collected = Accumulator::new(options, cancel).run(&resolver, domain, generator)?;
    collected.stats.retries += retries;
    if !collected.stalled {
        return Ok(collected);
    }

    warn!(
        have = collected.records.len(),
        estimated = domain.estimated_count,
        "key draws stalled, sampling by position"
    );
    let mut fallback = sample_keyless(store, handle, options, cancel, generator)?;
    fallback.stats.merge(&collected.stats);
    fallback.stats.positional_fallback = true;
    Ok(fallback)
}
