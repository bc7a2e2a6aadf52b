//! Lot pipeline.
//!
//! - Partition: ordered rows to lots
//! - Aggregate: per-lot subtotals and row tags
//! - Grouper: consecutive lots to buyer groups
//! - Pipeline: parsing, cleaning, core and report assembly in one call

pub mod aggregate;
pub mod annotate;
pub mod grouper;
pub mod partition;
pub mod pipeline;

pub use aggregate::aggregate;
pub use annotate::RowAnnotator;
pub use grouper::group_by_party;
pub use partition::{lot_key, partition_lots, RawLot};
pub use pipeline::*;
