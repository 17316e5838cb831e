//! Concatenation of several files' labeled rows into one dataset.

use std::sync::Arc;

use dash_core::error::{DashError, Result};
use dash_core::models::{AggregatedDataset, ObjectKey};
use tracing::{debug, warn};

use crate::cache::DatasetCache;

// ── AggregationOutcome ────────────────────────────────────────────────────────

/// A key that could not be resolved, with the reason.
#[derive(Debug)]
pub struct KeyFailure {
    pub key: ObjectKey,
    pub error: DashError,
}

/// Rows of every key that resolved, plus the keys that did not.
#[derive(Debug, Default)]
pub struct AggregationOutcome {
    pub dataset: AggregatedDataset,
    pub failures: Vec<KeyFailure>,
}

impl AggregationOutcome {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

// ── Aggregator ────────────────────────────────────────────────────────────────

/// Resolves keys through a shared [`DatasetCache`] and concatenates them.
#[derive(Debug, Clone)]
pub struct Aggregator {
    cache: Arc<DatasetCache>,
}

impl Aggregator {
    pub fn new(cache: Arc<DatasetCache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &Arc<DatasetCache> {
        &self.cache
    }

    /// Concatenate the rows of `keys` in the order given.
    ///
    /// Per-file row order is kept and repeated keys contribute their rows
    /// again. A key that fails is recorded in
    /// [`AggregationOutcome::failures`] and the remaining keys still load.
    pub async fn aggregate(&self, keys: &[ObjectKey]) -> AggregationOutcome {
        let mut outcome = AggregationOutcome::default();

        for key in keys {
            match self.cache.get(key).await {
                Ok(table) => outcome.dataset.append(&table),
                Err(error) => {
                    warn!(%key, error = %error, "skipping key in aggregation");
                    outcome.failures.push(KeyFailure {
                        key: key.clone(),
                        error,
                    });
                }
            }
        }

        debug!(
            keys = keys.len(),
            rows = outcome.dataset.len(),
            failed = outcome.failures.len(),
            "aggregation finished"
        );
        outcome
    }

    /// Like [`Aggregator::aggregate`] but stops at the first failing key.
    pub async fn aggregate_strict(&self, keys: &[ObjectKey]) -> Result<AggregatedDataset> {
        let mut dataset = AggregatedDataset::new();
        for key in keys {
            let table = self.cache.get(key).await?;
            dataset.append(&table);
        }
        Ok(dataset)
    }
}
