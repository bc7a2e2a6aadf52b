//! # Marges - margin report per arrival lot
//!
//! Marges reads the purchase/sale export of the accounting system, splits it
//! into lots (rows sharing a lot identifier prefix), computes weight and
//! result subtotals per lot, groups consecutive lots by buyer/seller and
//! assembles the margin report.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌─────────────┐   ┌─────────────┐   ┌─────────────┐
//! │  CSV export │──▶│   Parser    │──▶│  Normalize  │──▶│ Lots/Groups │──▶│   Report    │
//! │ (ISO/UTF8)  │   │ (auto-enc)  │   │ (dedup/sort)│   │ (subtotals) │   │  (tagged)   │
//! └─────────────┘   └─────────────┘   └─────────────┘   └─────────────┘   └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use marges::{run_file, Settings};
//!
//! let output = run_file("export.csv".as_ref(), &Settings::from_env()?)?;
//! for group in &output.groups {
//!     println!("{}: {:.2}", group.party, group.group_total());
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error types per stage
//! - [`config`] - Explicit report settings
//! - [`models`] - Transaction rows, lots and buyer groups
//! - [`parser`] - CSV parsing with auto-detection
//! - [`normalize`] - Deduplication, filtering and ordering of rows
//! - [`transform`] - Lot partitioning, subtotals, grouping and pipeline
//! - [`report`] - Report assembly and output
//! - [`api`] - HTTP API server

// Core modules
pub mod config;
pub mod error;
pub mod models;

// Input
pub mod normalize;
pub mod parser;

// Lots
pub mod transform;

// Output
pub mod report;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{ColumnMap, Settings};

pub use error::{
    ConfigError, CsvError, LotError, NormalizeError, PipelineError, ReportError, ServerError,
};

pub use models::{AnnotatedRow, BuyerGroup, Lot, RowTag, TransactionKind, TransactionRow};

pub use parser::{parse_bytes_auto, parse_csv_file_auto, ParseResult};

pub use normalize::normalize_records;

pub use transform::{
    aggregate, group_by_party, partition_lots, process_rows, run_bytes, run_file, CsvInfo,
    PipelineOutput, RawLot, RowAnnotator, RunStats,
};

pub use report::{LineKind, OutputFormat, Report, ReportLine};

// Server
pub mod server {
    pub use crate::api::server::{router, start_server};
}
