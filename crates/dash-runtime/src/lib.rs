//! Runtime layer for the measurement dashboard.
//!
//! Wires the object store, dataset cache and capture queue into a single
//! request-handling context shared by every user interaction.

pub mod dashboard;
pub mod publisher;

pub use dash_core as core;
pub use dash_data as data;
