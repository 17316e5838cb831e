//! Core types for the measurement dashboard.
//!
//! Decodes measurement-file keys into the time intervals they cover, filters
//! listings by date window, and holds the shared error, settings and row
//! types used by the data and runtime layers.

pub mod capture;
pub mod error;
pub mod key_codec;
pub mod models;
pub mod range_filter;
pub mod settings;
pub mod time_utils;

pub use error::{DashError, Result};
