//! Request-handling context for the dashboard.
//!
//! One [`Dashboard`] is built at startup and shared by every request. It owns
//! the process-wide [`DatasetCache`] and exposes one method per user
//! interaction: refreshing the listing, narrowing it to a window, plotting a
//! selection, viewing a raw file and requesting a capture.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use dash_core::capture::CaptureRequest;
use dash_core::error::{DashError, Result};
use dash_core::key_codec::KeyCodec;
use dash_core::models::{AggregatedDataset, KeyOption, ObjectKey};
use dash_core::range_filter;
use dash_core::time_utils::TimezoneHandler;
use dash_data::aggregator::{Aggregator, KeyFailure};
use dash_data::cache::DatasetCache;
use dash_data::histogram::Histogram;
use dash_data::store::{ObjectFetcher, ObjectLister};
use tracing::{info, warn};

use crate::publisher::{QueuePublisher, Topic};

/// Days the default window reaches back from today.
pub const DEFAULT_WINDOW_DAYS: i64 = 7;

// ── Window ────────────────────────────────────────────────────────────────────

/// Inclusive `[start, end]` date range picked by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

impl Window {
    /// Parse both bounds with the handler's zone attached.
    pub fn parse(start: &str, end: &str, tz: &TimezoneHandler) -> Result<Self> {
        Ok(Self {
            start: tz.parse_in_zone(start)?,
            end: tz.parse_in_zone(end)?,
        })
    }

    /// Midnight a week ago through midnight today.
    pub fn default_for(today: NaiveDate, tz: &TimezoneHandler) -> Result<Self> {
        let start = today - chrono::Duration::days(DEFAULT_WINDOW_DAYS);
        Ok(Self {
            start: midnight(start, tz)?,
            end: midnight(today, tz)?,
        })
    }

    /// Use whichever bounds were given, defaulting the rest.
    pub fn resolve(
        start: Option<&str>,
        end: Option<&str>,
        today: NaiveDate,
        tz: &TimezoneHandler,
    ) -> Result<Self> {
        let default = Self::default_for(today, tz)?;
        Ok(Self {
            start: match start {
                Some(s) => tz.parse_in_zone(s)?,
                None => default.start,
            },
            end: match end {
                Some(s) => tz.parse_in_zone(s)?,
                None => default.end,
            },
        })
    }
}

fn midnight(day: NaiveDate, tz: &TimezoneHandler) -> Result<DateTime<Tz>> {
    let naive = day
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| DashError::TimestampParse(day.to_string()))?;
    tz.localize(naive)
}

// ── PlotView ──────────────────────────────────────────────────────────────────

/// Everything a plot request produces.
#[derive(Debug)]
pub struct PlotView {
    pub dataset: AggregatedDataset,
    pub histogram: Histogram,
    pub failures: Vec<KeyFailure>,
}

// ── Dashboard ─────────────────────────────────────────────────────────────────

pub struct Dashboard {
    lister: Arc<dyn ObjectLister>,
    fetcher: Arc<dyn ObjectFetcher>,
    aggregator: Aggregator,
    publisher: Arc<dyn QueuePublisher>,
    capture_topic: Topic,
}

impl Dashboard {
    /// Wire a dashboard with a fresh never-evicting cache.
    pub fn new(
        lister: Arc<dyn ObjectLister>,
        fetcher: Arc<dyn ObjectFetcher>,
        publisher: Arc<dyn QueuePublisher>,
        codec: KeyCodec,
        capture_topic: Topic,
    ) -> Self {
        let cache = Arc::new(DatasetCache::new(Arc::clone(&fetcher), codec));
        Self::with_cache(lister, fetcher, publisher, cache, capture_topic)
    }

    /// Wire a dashboard around an existing cache.
    pub fn with_cache(
        lister: Arc<dyn ObjectLister>,
        fetcher: Arc<dyn ObjectFetcher>,
        publisher: Arc<dyn QueuePublisher>,
        cache: Arc<DatasetCache>,
        capture_topic: Topic,
    ) -> Self {
        Self {
            lister,
            fetcher,
            aggregator: Aggregator::new(cache),
            publisher,
            capture_topic,
        }
    }

    pub fn codec(&self) -> &KeyCodec {
        self.aggregator.cache().codec()
    }

    pub fn cache(&self) -> &Arc<DatasetCache> {
        self.aggregator.cache()
    }

    /// Every key under the configured `<folder>/output` prefix.
    pub async fn refresh(&self) -> Result<Vec<ObjectKey>> {
        let keys = self.lister.list(self.codec().prefix()).await?;
        info!(count = keys.len(), prefix = self.codec().prefix(), "listing refreshed");
        Ok(keys)
    }

    /// Selectable files among `keys` for `window`.
    pub fn options(&self, keys: &[ObjectKey], window: &Window) -> Vec<KeyOption> {
        range_filter::options(self.codec(), keys, &window.start, &window.end)
    }

    /// Refresh and narrow to `window` in one step.
    pub async fn browse(&self, window: &Window) -> Result<Vec<KeyOption>> {
        let keys = self.refresh().await?;
        Ok(self.options(&keys, window))
    }

    /// Aggregate `keys` and bin the result.
    ///
    /// Keys that fail to load are reported in [`PlotView::failures`]; the
    /// rest are still plotted.
    pub async fn plot(
        &self,
        keys: &[ObjectKey],
        x_column: &str,
        y_column: &str,
        bins: usize,
    ) -> Result<PlotView> {
        let outcome = self.aggregator.aggregate(keys).await;
        for failure in &outcome.failures {
            warn!(key = %failure.key, error = %failure.error, "file left out of plot");
        }
        let histogram = Histogram::build(&outcome.dataset, x_column, y_column, bins)?;
        Ok(PlotView {
            dataset: outcome.dataset,
            histogram,
            failures: outcome.failures,
        })
    }

    /// Raw text content of one file.
    pub async fn content(&self, key: &ObjectKey) -> Result<String> {
        let bytes = self
            .fetcher
            .fetch(key)
            .await
            .map_err(|e| DashError::unavailable(key.as_str(), e))?;
        String::from_utf8(bytes).map_err(|e| DashError::unavailable(key.as_str(), e))
    }

    /// Publish a capture request and wait for the acknowledgement.
    pub async fn request_capture(&self, request: &CaptureRequest) -> Result<String> {
        request.validate()?;
        let id = self
            .publisher
            .publish(&self.capture_topic, request.payload())
            .await?;
        info!(%id, request = %request.encode(), topic = %self.capture_topic, "capture requested");
        Ok(id)
    }
}
