//! High-level pipeline API: export file to margin report.
//!
//! ```text
//! parse → normalize → partition → aggregate → group → assemble
//! ```
//!
//! [`process_rows`] is the pure core (partition, subtotals, grouping). The
//! `run_*` functions wrap it with CSV parsing, row cleaning, report assembly
//! and progress logging.
//!
//! # Example
//!
//! ```rust,ignore
//! use marges::{run_file, Settings};
//! use std::path::Path;
//!
//! let output = run_file(Path::new("export.csv"), &Settings::default())?;
//! println!("{} buyer groups", output.groups.len());
//! ```

use serde::Serialize;
use std::path::Path;

use super::aggregate::aggregate;
use super::annotate::RowAnnotator;
use super::grouper::group_by_party;
use super::partition::partition_lots;
use crate::api::logs::{log_info, log_success, log_warning};
use crate::config::Settings;
use crate::error::{LotResult, PipelineResult};
use crate::models::{BuyerGroup, TransactionRow};
use crate::normalize::normalize_records;
use crate::parser::{parse_bytes_auto, parse_csv_file_auto, ParseResult};
use crate::report::Report;

/// CSV file information
#[derive(Debug, Clone, Serialize)]
pub struct CsvInfo {
    pub encoding: String,
    pub delimiter: char,
    pub headers: Vec<String>,
    pub row_count: usize,
}

/// Counts gathered along one run.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStats {
    /// Rows kept by the cleaning step.
    pub rows_kept: usize,
    /// Purchase and sale rows placed in a lot.
    pub eligible_rows: usize,
    pub lot_count: usize,
    pub group_count: usize,
    pub negative_lots: usize,
}

/// Result of a complete run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutput {
    pub groups: Vec<BuyerGroup>,
    pub report: Report,
    pub csv_info: CsvInfo,
    pub stats: RunStats,
}

/// Partition ordered rows into lots, compute subtotals and group lots by
/// counterparty.
///
/// All or nothing: the first error aborts the run and nothing is returned.
pub fn process_rows(rows: Vec<TransactionRow>, settings: &Settings) -> LotResult<Vec<BuyerGroup>> {
    let annotator = RowAnnotator::from_settings(settings);

    let lots = partition_lots(rows, settings.lot_prefix_len)?
        .into_iter()
        .map(|raw| aggregate(raw, &annotator))
        .collect::<LotResult<Vec<_>>>()?;

    group_by_party(lots)
}

/// Build the report for an export file.
pub fn run_file(path: &Path, settings: &Settings) -> PipelineResult<PipelineOutput> {
    log_info(format!("📖 Reading {}", path.display()));
    let parse_result = parse_csv_file_auto(path)?;
    run_parsed(parse_result, settings)
}

/// Build the report for export bytes (uploads).
pub fn run_bytes(bytes: &[u8], settings: &Settings) -> PipelineResult<PipelineOutput> {
    log_info(format!("📖 Reading upload ({} bytes)", bytes.len()));
    let parse_result = parse_bytes_auto(bytes)?;
    run_parsed(parse_result, settings)
}

fn run_parsed(parse_result: ParseResult, settings: &Settings) -> PipelineResult<PipelineOutput> {
    log_success(format!("Detected encoding: {}", parse_result.encoding));
    log_success(format!("Detected separator: '{}'", format_delimiter(parse_result.delimiter)));
    log_success(format!("Read {} rows", parse_result.records.len()));

    let csv_info = CsvInfo {
        encoding: parse_result.encoding.clone(),
        delimiter: parse_result.delimiter,
        headers: parse_result.headers.clone(),
        row_count: parse_result.records.len(),
    };

    log_info("🧹 Cleaning rows...");
    let rows = normalize_records(&parse_result, settings)?;
    let dropped = csv_info.row_count - rows.len();
    if dropped > 0 {
        log_warning(format!("{} duplicate or excluded rows dropped", dropped));
    }
    log_success(format!("{} rows kept", rows.len()));
    let rows_kept = rows.len();

    log_info(format!("📦 Splitting lots (prefix of {} characters)...", settings.lot_prefix_len));
    let groups = process_rows(rows, settings)?;

    let stats = RunStats {
        rows_kept,
        eligible_rows: groups.iter().map(|g| g.row_count()).sum(),
        lot_count: groups.iter().map(|g| g.lots.len()).sum(),
        group_count: groups.len(),
        negative_lots: groups
            .iter()
            .flat_map(|g| &g.lots)
            .filter(|l| l.is_negative())
            .count(),
    };
    log_success(format!("{} lots in {} buyer groups", stats.lot_count, stats.group_count));
    if stats.negative_lots > 0 {
        log_warning(format!("{} lots with a negative result", stats.negative_lots));
    }

    log_info("🧾 Assembling report...");
    let report = Report::build(&groups, settings)?;
    log_success(format!("{} ({} lines)", report.title, report.lines.len()));

    Ok(PipelineOutput {
        groups,
        report,
        csv_info,
        stats,
    })
}

/// Format delimiter for display
fn format_delimiter(d: char) -> &'static str {
    match d {
        ';' => ";",
        ',' => ",",
        '\t' => "TAB",
        '|' => "|",
        _ => "?",
    }
}
