//! Data layer for the measurement dashboard.
//!
//! Talks to the object store, parses CSV measurement files, memoizes their
//! labeled content, concatenates selections and bins them for plotting.

pub mod aggregator;
pub mod cache;
pub mod histogram;
pub mod reader;
pub mod store;

pub use dash_core as core;
