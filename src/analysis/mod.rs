//! Analysis modules.
//!
//! Aggregation of raw scores over the catalog hierarchy, the statistical
//! primitives, and the per-scope significance evaluation built on both.

pub mod aggregator;
pub mod significance;
pub mod stats;

pub use aggregator::*;
pub use significance::*;
