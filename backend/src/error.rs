//! Error types for the margin report pipeline.
//!
//! One error type per stage:
//!
//! - [`CsvError`] - CSV reading and decoding errors
//! - [`ConfigError`] - Invalid settings from the environment
//! - [`NormalizeError`] - Row cleaning errors
//! - [`LotError`] - Lot partitioning, subtotal and grouping errors
//! - [`ReportError`] - Report assembly errors
//! - [`PipelineError`] - Top-level orchestration errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// CSV Parsing Errors
// =============================================================================

/// Errors during CSV parsing.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// Invalid CSV format.
    #[error("Line {line}: {message}")]
    ParseError { line: u64, message: String },

    /// Empty file.
    #[error("CSV file is empty")]
    EmptyFile,

    /// No headers found.
    #[error("No headers found in CSV")]
    NoHeaders,
}

impl From<csv::Error> for CsvError {
    fn from(err: csv::Error) -> Self {
        let line = err.position().map(|p| p.line()).unwrap_or(0);
        CsvError::ParseError {
            line,
            message: err.to_string(),
        }
    }
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors while reading settings from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable is set but cannot be used.
    #[error("Invalid value for {name}: '{value}'")]
    InvalidValue { name: String, value: String },
}

// =============================================================================
// Normalization Errors
// =============================================================================

/// Errors while turning parsed records into transaction rows.
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// A column the report needs is absent from the export.
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// Nothing left once duplicates and excluded rows are dropped.
    #[error("No transaction rows left after cleaning")]
    NoRows,
}

// =============================================================================
// Lot Errors
// =============================================================================

/// Errors raised by the lot partitioner, the subtotal aggregator and the
/// buyer grouper. None of them is recoverable: no partial result is kept.
#[derive(Debug, Error, PartialEq)]
pub enum LotError {
    /// No purchase or sale row (or no lot) to work on.
    #[error("No eligible records: input contains no purchase or sale row")]
    EmptyInput,

    /// A weight or result cell is not a decimal number.
    #[error("Lot '{lot}': field '{field}' is not numeric (value '{value}')")]
    NumericConversion {
        lot: String,
        field: &'static str,
        value: String,
    },

    /// A row has a blank lot identifier, so it cannot be keyed.
    #[error("Line {line} ({party}, {date}): lot identifier is empty")]
    MalformedLotIdentifier { line: u64, party: String, date: String },
}

// =============================================================================
// Report Errors
// =============================================================================

/// Errors while assembling the report.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The report date cannot be read from the first row.
    #[error("Invalid report date '{0}', expected YYYYMMDD")]
    InvalidDate(String),

    /// Failed to write the report.
    #[error("Failed to write report: {0}")]
    Write(String),
}

impl From<csv::Error> for ReportError {
    fn from(err: csv::Error) -> Self {
        ReportError::Write(err.to_string())
    }
}

impl From<serde_json::Error> for ReportError {
    fn from(err: serde_json::Error) -> Self {
        ReportError::Write(err.to_string())
    }
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline orchestration errors.
///
/// This is the main error type returned by [`crate::transform::pipeline::run_file`].
/// It wraps all lower-level errors.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// CSV parsing error.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// Normalization error.
    #[error("Normalize error: {0}")]
    Normalize(#[from] NormalizeError),

    /// Partitioning, subtotal or grouping error.
    #[error("Lot error: {0}")]
    Lot(#[from] LotError),

    /// Report assembly error.
    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Failed to bind or serve.
    #[error("Server IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for CSV operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for normalization.
pub type NormalizeResult<T> = Result<T, NormalizeError>;

/// Result type for lot operations.
pub type LotResult<T> = Result<T, LotError>;

/// Result type for report assembly.
pub type ReportResult<T> = Result<T, ReportError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
