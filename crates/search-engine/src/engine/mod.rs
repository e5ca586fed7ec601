//! Search execution.
//!
//! [`SearchOrchestrator`] runs one request end to end: count, window,
//! hydrate, then hands the primary window to [`GraphExpander`] for
//! `_include` and `_revinclude` expansion.

mod expander;
mod hydration;
mod orchestrator;

pub use expander::{DedupIndex, GraphExpander};
pub use orchestrator::SearchOrchestrator;
