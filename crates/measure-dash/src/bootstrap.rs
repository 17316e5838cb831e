use std::path::Path;
use std::sync::Arc;

use dash_core::settings::Settings;
use dash_data::cache::{DatasetCache, MaxEntries};
use dash_data::store::LocalObjectStore;
use dash_runtime::dashboard::Dashboard;
use dash_runtime::publisher::{SpoolPublisher, Topic};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// ── Directory bootstrap ────────────────────────────────────────────────────────

/// Ensure the store root and the capture spool directory exist.
pub fn ensure_directories(store_root: &Path, spool_dir: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(store_root)?;
    std::fs::create_dir_all(spool_dir)?;
    Ok(())
}

// ── Logging bootstrap ──────────────────────────────────────────────────────────

/// Initialise the global `tracing` subscriber.
///
/// `log_level` is mapped to a [`tracing_subscriber::EnvFilter`] directive.
/// Falls back to `"info"` if the level string is not recognised. Output goes
/// to stderr so command output on stdout stays clean.
pub fn setup_logging(log_level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(normalise_level(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(subscriber)
        .try_init()?;

    Ok(())
}

/// Map Python-style level names to tracing level names.
fn normalise_level(log_level: &str) -> String {
    let upper = log_level.to_uppercase();
    match upper.as_str() {
        "DEBUG" => "debug".to_string(),
        "INFO" => "info".to_string(),
        "WARNING" => "warn".to_string(),
        "ERROR" | "CRITICAL" => "error".to_string(),
        _ => log_level.to_lowercase(),
    }
}

// ── Dashboard wiring ───────────────────────────────────────────────────────────

/// Build the process-wide dashboard from validated settings.
pub fn build_dashboard(settings: &Settings) -> anyhow::Result<Dashboard> {
    let store = Arc::new(LocalObjectStore::new(&settings.store_root(), &settings.bucket));
    let publisher = Arc::new(SpoolPublisher::new(settings.spool_dir()));
    let codec = settings.key_codec()?;
    let topic = Topic::new(settings.project.clone(), settings.pub_topic.clone());

    tracing::debug!(
        bucket = %store.bucket_dir().display(),
        topic = %topic,
        "dashboard wired"
    );

    Ok(match settings.cache_max_entries {
        Some(limit) => {
            let cache = Arc::new(DatasetCache::with_policy(
                store.clone(),
                codec,
                Box::new(MaxEntries(limit)),
            ));
            Dashboard::with_cache(store.clone(), store, publisher, cache, topic)
        }
        None => Dashboard::new(store.clone(), store, publisher, codec, topic),
    })
}

// ── Tests ──────────────────────────────────────────────────────────────────────
