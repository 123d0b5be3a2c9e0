use rowdraw_common::error::Result;
use tracing::{debug, instrument};

use crate::accumulator::{Accumulator, Collected};
use crate::candidates::CandidateGenerator;
use crate::estimate::KeyDomain;
use crate::introspect::RelationHandle;
use crate::options::{CancelHandle, SampleOptions};
use crate::outcome::{SampleStats, SampleStatus};
use crate::query::MaterializeQuery;
use crate::resolve::PositionalResolver;
use crate::store::RelationStore;

/// Samples a relation with no usable integer key by numbering a materialised working
/// view and drawing positions. The view is built once, so positions are stable for
/// the whole call.
#[instrument(skip_all)]
pub(crate) fn sample_keyless(
    store: &dyn RelationStore,
    handle: &RelationHandle,
    options: &SampleOptions,
    cancel: &CancelHandle,
    generator: &mut CandidateGenerator,
) -> Result<Collected> {
    let mut retries = 0;
    let query = MaterializeQuery {
        relation: handle.relation().clone(),
        columns: handle.idents(),
    };
    debug!(sql = query.statement().sql(), "materialising working view");
    let working = options
        .retry
        .run("materialize", &mut retries, || store.materialize(&query))?;

    let Some(domain) = KeyDomain::positional(working.row_count() as u64) else {
        debug!("relation is empty");
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

    let resolver = PositionalResolver::new(&working, handle.idents())?;
    let mut collected = Accumulator::new(options, cancel).run(&resolver, domain, generator)?;
    collected.stats.retries += retries;
    Ok(collected)
}
