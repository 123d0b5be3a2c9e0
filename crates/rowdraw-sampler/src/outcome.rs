use std::fmt;
use std::time::Duration;

use rowdraw_common::error::Result;
use rowdraw_common::result::QueryResult;
use rowdraw_storage::Table;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleStatus {
    /// Exactly the requested number of rows.
    Complete,
    /// Fewer rows than requested because the relation has no more.
    DomainExhausted,
    /// Fewer rows than requested because the iteration or time budget ran out first.
    BudgetExhausted,
}

impl SampleStatus {
    pub fn is_complete(&self) -> bool {
        matches!(self, SampleStatus::Complete)
    }
}

impl fmt::Display for SampleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleStatus::Complete => write!(f, "complete"),
            SampleStatus::DomainExhausted => write!(f, "domain exhausted"),
            SampleStatus::BudgetExhausted => write!(f, "budget exhausted"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleStats {
    pub iterations: u32,
    pub candidates: u64,
    pub hits: u64,
    pub misses: u64,
    pub duplicates: u64,
    pub retries: u64,
    pub enumerated: bool,
    /// Key draws stalled over a sparse domain and the rows were drawn by position instead.
    pub positional_fallback: bool,
    pub elapsed: Duration,
}

impl SampleStats {
    /// Adds the counters of an earlier phase of the same call.
    pub(crate) fn merge(&mut self, earlier: &SampleStats) {
        self.iterations += earlier.iterations;
        self.candidates += earlier.candidates;
        self.hits += earlier.hits;
        self.misses += earlier.misses;
        self.duplicates += earlier.duplicates;
        self.retries += earlier.retries;
    }
}

#[derive(Debug, Clone)]
pub struct SampleOutcome {
    pub table: Table,
    pub status: SampleStatus,
    pub stats: SampleStats,
}

impl SampleOutcome {
    pub fn row_count(&self) -> usize {
        self.table.row_count()
    }

    pub fn is_complete(&self) -> bool {
        self.status.is_complete()
    }

    pub fn to_query_result(&self) -> Result<QueryResult> {
        self.table.to_query_result()
    }
}
