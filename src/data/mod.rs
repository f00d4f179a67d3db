//! Aggregation of probe observations.
//!
//! ```text
//! Observation (node, status code)
//!        │
//!        ▼
//! Aggregator::record()
//!        │
//!        ├──▶ NodeRecord   (per node, row = first-seen position)
//!        │
//!        └──▶ StatusTotals (per status code, column = first-seen position)
//! ```

pub mod aggregator;

pub use aggregator::{Aggregator, NodeRecord, OrderedIndex, StatusTotals, Update};
