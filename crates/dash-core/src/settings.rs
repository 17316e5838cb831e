use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::error::{DashError, Result};
use crate::key_codec::KeyCodec;
use crate::time_utils::{TimezoneHandler, DEFAULT_TIMEZONE};

/// Folder measurement files are uploaded into when `FOLDER_NAME` is unset.
pub const DEFAULT_FOLDER_NAME: &str = "test-data";

/// Column plotted along the histogram's x axis.
pub const DEFAULT_X_COLUMN: &str = "Frequency";

/// Column summed per histogram bin.
pub const DEFAULT_Y_COLUMN: &str = "Voltage";

pub const DEFAULT_BINS: usize = 20;

// ── Settings (CLI + environment) ──────────────────────────────────────────────

/// Browse and plot time-stamped measurement files
#[derive(Parser, Debug, Clone)]
#[command(
    name = "measure-dash",
    about = "Browse, plot and request time-stamped measurement files",
    version
)]
pub struct Settings {
    /// Bucket holding the measurement files
    #[arg(long, env = "CLOUD_STORAGE_BUCKET")]
    pub bucket: String,

    /// Project the capture topic belongs to
    #[arg(long, env = "GOOGLE_CLOUD_PROJECT")]
    pub project: String,

    /// Topic capture requests are published to
    #[arg(long, env = "PUB_TOPIC")]
    pub pub_topic: String,

    /// Folder inside the bucket that holds `output*` files
    #[arg(long, env = "FOLDER_NAME", default_value = DEFAULT_FOLDER_NAME)]
    pub folder_name: String,

    /// Directory buckets are mounted under (defaults to ~/.measure-dash/store)
    #[arg(long, env = "STORE_ROOT")]
    pub store_root: Option<PathBuf>,

    /// Directory the capture queue spools into (defaults to ~/.measure-dash/spool)
    #[arg(long, env = "SPOOL_DIR")]
    pub spool_dir: Option<PathBuf>,

    /// Keep at most this many parsed files in memory (unbounded when unset)
    #[arg(long, env = "CACHE_MAX_ENTRIES", value_parser = clap::value_parser!(usize))]
    pub cache_max_entries: Option<usize>,

    /// Timezone attached to timestamps decoded from keys
    #[arg(long, default_value = DEFAULT_TIMEZONE)]
    pub timezone: String,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// One user interaction with the dashboard.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List files whose interval touches a date window
    List {
        /// Window start (defaults to seven days ago)
        #[arg(long)]
        start: Option<String>,
        /// Window end (defaults to today)
        #[arg(long)]
        end: Option<String>,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Aggregate files and print their histogram
    Plot {
        /// Object key to include; repeat for several files
        #[arg(long = "key", required = true)]
        keys: Vec<String>,
        /// Column binned along x
        #[arg(long, default_value = DEFAULT_X_COLUMN)]
        x: String,
        /// Column summed per bin
        #[arg(long, default_value = DEFAULT_Y_COLUMN)]
        y: String,
        /// Number of bins
        #[arg(long, default_value_t = DEFAULT_BINS)]
        bins: usize,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Print the raw content of one file
    Show {
        #[arg(long)]
        key: String,
    },

    /// Ask the acquisition process to capture a new file
    Capture {
        /// Day to capture (YYYY-MM-DD), yesterday back through a week ago
        #[arg(long)]
        day: NaiveDate,
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..24))]
        hour: u8,
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..60))]
        minute1: u8,
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..60))]
        second1: u8,
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..60))]
        minute2: u8,
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..60))]
        second2: u8,
    },
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments and environment, apply `--debug`, and validate.
    pub fn load() -> Result<Self> {
        Self::parse().resolved().validated()
    }

    /// Same as [`Settings::load`] but with an explicit argument list.
    pub fn load_from_args<I, T>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::try_parse_from(args)
            .map_err(|e| DashError::Config(e.to_string()))?
            .resolved()
            .validated()
    }

    /// Reject empty required fields, odd folder names and unknown timezones.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("bucket", &self.bucket),
            ("project", &self.project),
            ("pub_topic", &self.pub_topic),
            ("folder_name", &self.folder_name),
        ] {
            if value.trim().is_empty() {
                return Err(DashError::Config(format!("{} must not be empty", name)));
            }
        }

        if self.bucket.contains('/') || self.bucket.contains("..") {
            return Err(DashError::Config(format!(
                "bucket \"{}\" must be a plain name",
                self.bucket
            )));
        }
        if self.folder_name.starts_with('/') || self.folder_name.ends_with('/') {
            return Err(DashError::Config(format!(
                "folder_name \"{}\" must not start or end with '/'",
                self.folder_name
            )));
        }
        if !TimezoneHandler::validate_timezone(&self.timezone) {
            return Err(DashError::Config(format!(
                "unknown timezone \"{}\"",
                self.timezone
            )));
        }
        Ok(())
    }

    /// Root directory buckets are resolved against.
    pub fn store_root(&self) -> PathBuf {
        self.store_root
            .clone()
            .unwrap_or_else(|| app_dir().join("store"))
    }

    /// Directory capture requests spool into.
    pub fn spool_dir(&self) -> PathBuf {
        self.spool_dir
            .clone()
            .unwrap_or_else(|| app_dir().join("spool"))
    }

    pub fn timezone_handler(&self) -> Result<TimezoneHandler> {
        TimezoneHandler::new(&self.timezone)
    }

    /// Codec for keys under the configured folder.
    pub fn key_codec(&self) -> Result<KeyCodec> {
        KeyCodec::new(&self.folder_name, self.timezone_handler()?)
    }

    fn resolved(mut self) -> Self {
        // --debug overrides log level.
        if self.debug {
            self.log_level = "DEBUG".to_string();
        }
        self
    }

    fn validated(self) -> Result<Self> {
        self.validate()?;
        Ok(self)
    }
}

/// `~/.measure-dash`, or `./.measure-dash` without a home directory.
pub fn app_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".measure-dash")
}

// ── Tests ──────────────────────────────────────────────────────────────────────
