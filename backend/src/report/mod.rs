//! Report assembly: buyer groups to an ordered list of report lines.
//!
//! The layout mirrors the margin workbook the buyers are used to:
//!
//! ```text
//! ARRIVAGES DU 12/03/24
//! TYPE | Raison C/F | Date | Lot | ... | Résultat      <- header (per group)
//! ACHAT | Dupont | ...                                 <- lot rows, tagged
//! Sous-total |  |  |  |  | 30.00 |  |  | 3.00          <- per lot
//! Total |  |  |  |  |  |  |  | 3.00                    <- per group
//!                                                      <- blank separator
//! ```
//!
//! Styling is left to whoever renders the lines: every line carries its
//! [`LineKind`] and [`RowTag`]s instead of colors.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::Settings;
use crate::error::{ReportError, ReportResult};
use crate::models::{BuyerGroup, Lot, RowTag, TransactionKind, TransactionRow};

/// Label of the per-lot subtotal line.
pub const SUBTOTAL_LABEL: &str = "Sous-total";

/// Label of the per-group total line.
pub const TOTAL_LABEL: &str = "Total";

/// What a report line represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineKind {
    Title,
    Header,
    Detail,
    Subtotal,
    Total,
    Blank,
}

/// One line of the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportLine {
    pub kind: LineKind,
    pub cells: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tags: Vec<RowTag>,
}

impl ReportLine {
    fn new(kind: LineKind, cells: Vec<String>, tags: Vec<RowTag>) -> Self {
        Self { kind, cells, tags }
    }
}

/// File format for [`Report::save`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Json,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

/// An assembled margin report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// `ARRIVAGES DU dd/mm/yy`
    pub title: String,
    /// Arrival date, read from the first row of the first lot.
    pub date: NaiveDate,
    /// `MARGES PAR ARRIVAGES yyyymmdd`
    pub file_stem: String,
    pub lines: Vec<ReportLine>,
}

impl Report {
    /// Assemble the report lines for `groups`.
    pub fn build(groups: &[BuyerGroup], settings: &Settings) -> ReportResult<Self> {
        let first_date = groups
            .first()
            .and_then(|g| g.lots.first())
            .and_then(|l| l.rows.first())
            .map(|r| r.row.date.as_str())
            .unwrap_or("");
        let date = parse_report_date(first_date)?;

        let title = format!("ARRIVAGES DU {}", date.format("%d/%m/%y"));
        let file_stem = format!("MARGES PAR ARRIVAGES {}", date.format("%Y%m%d"));

        let headers: Vec<String> = settings
            .columns
            .report_headers()
            .iter()
            .map(|h| h.to_string())
            .collect();

        let mut lines = vec![ReportLine::new(LineKind::Title, vec![title.clone()], vec![])];

        for group in groups {
            lines.push(ReportLine::new(LineKind::Header, headers.clone(), vec![RowTag::Header]));

            for lot in &group.lots {
                for annotated in &lot.rows {
                    lines.push(ReportLine::new(
                        LineKind::Detail,
                        annotated.row.cells().iter().map(|c| c.to_string()).collect(),
                        annotated.tags.clone(),
                    ));
                }
                lines.push(subtotal_line(lot));
            }

            lines.push(total_line(group.group_total()));
            lines.push(ReportLine::new(LineKind::Blank, vec![], vec![]));
        }

        Ok(Self {
            title,
            date,
            file_stem,
            lines,
        })
    }

    /// Transaction rows of the report, annotations stripped, in report order.
    pub fn detail_rows(&self) -> Vec<TransactionRow> {
        self.lines
            .iter()
            .filter(|l| l.kind == LineKind::Detail)
            .filter_map(|l| row_from_cells(&l.cells))
            .collect()
    }

    /// Write the lines as `;`-separated CSV. Tags go in a trailing column.
    pub fn write_csv<W: Write>(&self, writer: W) -> ReportResult<()> {
        let mut out = csv::WriterBuilder::new()
            .delimiter(b';')
            .flexible(true)
            .from_writer(writer);

        for line in &self.lines {
            let mut record = line.cells.clone();
            if !line.tags.is_empty() {
                let tags: Vec<&str> = line.tags.iter().map(|t| t.as_str()).collect();
                record.push(tags.join(","));
            }
            out.write_record(&record)?;
        }

        out.flush().map_err(|e| ReportError::Write(e.to_string()))?;
        Ok(())
    }

    pub fn to_json_pretty(&self) -> ReportResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Save into `dir` as `<file_stem>.<ext>`. The directory must exist.
    pub fn save(&self, dir: &Path, format: OutputFormat) -> ReportResult<PathBuf> {
        if !dir.is_dir() {
            return Err(ReportError::Write(format!(
                "output directory does not exist: {}",
                dir.display()
            )));
        }

        let path = dir.join(format!("{}.{}", self.file_stem, format.extension()));
        match format {
            OutputFormat::Csv => {
                let file = fs::File::create(&path).map_err(|e| ReportError::Write(e.to_string()))?;
                self.write_csv(file)?;
            }
            OutputFormat::Json => {
                fs::write(&path, self.to_json_pretty()?).map_err(|e| ReportError::Write(e.to_string()))?;
            }
        }

        Ok(path)
    }
}

/// Parse a YYYYMMDD cell. Spreadsheet exports sometimes render it as a
/// float (`20240312.0`).
pub fn parse_report_date(raw: &str) -> ReportResult<NaiveDate> {
    let trimmed = raw.trim();
    let digits = trimmed.strip_suffix(".0").unwrap_or(trimmed);

    NaiveDate::parse_from_str(digits, "%Y%m%d").map_err(|_| ReportError::InvalidDate(raw.to_string()))
}

fn format_amount(value: f64) -> String {
    format!("{:.2}", value)
}

fn subtotal_line(lot: &Lot) -> ReportLine {
    let tags = if lot.is_negative() {
        vec![RowTag::Negative]
    } else {
        vec![]
    };

    ReportLine::new(
        LineKind::Subtotal,
        vec![
            SUBTOTAL_LABEL.to_string(),
            String::new(),
            String::new(),
            String::new(),
            String::new(),
            format_amount(lot.weight_total),
            String::new(),
            String::new(),
            format_amount(lot.result_total),
        ],
        tags,
    )
}

fn total_line(total: f64) -> ReportLine {
    let mut cells = vec![String::new(); 9];
    cells[0] = TOTAL_LABEL.to_string();
    cells[8] = format_amount(total);
    ReportLine::new(LineKind::Total, cells, vec![])
}

fn row_from_cells(cells: &[String]) -> Option<TransactionRow> {
    match cells {
        [kind, party, date, lot_id, description, weight, unit, unit_price, result, ..] => Some(TransactionRow {
            kind: TransactionKind::from_label(kind),
            party: party.clone(),
            date: date.clone(),
            lot_id: lot_id.clone(),
            description: description.clone(),
            weight: weight.clone(),
            unit: unit.clone(),
            unit_price: unit_price.clone(),
            result: result.clone(),
            source_line: 0,
        }),
        _ => None,
    }
}
