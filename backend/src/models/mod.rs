//! Domain models for the margin report pipeline.
//!
//! This module contains the core data structures used throughout the pipeline:
//!
//! - [`TransactionRow`] - One purchase/sale line of the export
//! - [`TransactionKind`] - Purchase (ACHAT), sale (VENTE) or anything else
//! - [`RowTag`] / [`AnnotatedRow`] - Presentation hints attached to rows
//! - [`Lot`] - Contiguous rows sharing a lot prefix, with subtotals
//! - [`BuyerGroup`] - Contiguous lots sharing a counterparty

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::LotError;

// =============================================================================
// Transaction Kind
// =============================================================================

/// Type of a transaction line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TransactionKind {
    /// Purchase (ACHAT)
    Purchase,
    /// Sale (VENTE)
    Sale,
    /// Any other label, kept verbatim
    Other(String),
}

impl TransactionKind {
    /// Parse the export label. Matching ignores case and surrounding spaces.
    pub fn from_label(label: &str) -> Self {
        let trimmed = label.trim();
        match trimmed.to_uppercase().as_str() {
            "ACHAT" => Self::Purchase,
            "VENTE" => Self::Sale,
            _ => Self::Other(trimmed.to_string()),
        }
    }

    /// Label as written in the export.
    pub fn label(&self) -> &str {
        match self {
            Self::Purchase => "ACHAT",
            Self::Sale => "VENTE",
            Self::Other(label) => label,
        }
    }

    /// Only purchases and sales belong to lots.
    pub fn is_eligible(&self) -> bool {
        matches!(self, Self::Purchase | Self::Sale)
    }
}

impl From<String> for TransactionKind {
    fn from(label: String) -> Self {
        Self::from_label(&label)
    }
}

impl From<TransactionKind> for String {
    fn from(kind: TransactionKind) -> Self {
        kind.label().to_string()
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// Transaction Row
// =============================================================================

/// One transaction of the export, after cleaning.
///
/// Text cells are kept verbatim so the report shows exactly what the export
/// contained. Numeric fields are only interpreted by the subtotal step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRow {
    pub kind: TransactionKind,
    /// Buyer or seller name.
    pub party: String,
    /// Date as YYYYMMDD.
    pub date: String,
    pub lot_id: String,
    pub description: String,
    pub weight: String,
    pub unit: String,
    pub unit_price: String,
    /// Signed monetary result of the transaction.
    pub result: String,
    /// Line of the export this row was read from, 0 when unknown.
    #[serde(skip)]
    pub source_line: u64,
}

impl TransactionRow {
    /// Weight as a decimal number.
    pub fn weight_value(&self) -> Result<f64, LotError> {
        self.numeric("weight", &self.weight)
    }

    /// Result as a decimal number.
    pub fn result_value(&self) -> Result<f64, LotError> {
        self.numeric("result", &self.result)
    }

    fn numeric(&self, field: &'static str, raw: &str) -> Result<f64, LotError> {
        parse_decimal(raw).ok_or_else(|| LotError::NumericConversion {
            lot: self.lot_id.clone(),
            field,
            value: raw.to_string(),
        })
    }

    /// Cells in report column order.
    pub fn cells(&self) -> [&str; 9] {
        [
            self.kind.label(),
            &self.party,
            &self.date,
            &self.lot_id,
            &self.description,
            &self.weight,
            &self.unit,
            &self.unit_price,
            &self.result,
        ]
    }
}

/// Parse a decimal cell.
///
/// Accepts a decimal comma (`12,5`) and space or no-break-space thousands
/// separators (`1 204,10`). Blank cells are not numbers.
pub fn parse_decimal(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '\u{a0}' | '\u{202f}'))
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    if cleaned.is_empty() {
        return None;
    }

    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Round to 2 decimal places, half away from zero.
pub fn round2(value: f64) -> f64 {
    let rounded = (value * 100.0).round() / 100.0;
    // Keeps -0.00 from leaking into output and comparisons
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

// =============================================================================
// Annotations
// =============================================================================

/// Presentation hint attached to a report row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowTag {
    /// Column header record.
    Header,
    /// Row belongs to a lot whose result total is below zero.
    Negative,
    /// Counterparty is the disposal marker.
    RecycleBin,
    /// Sale line, tinted as a whole row.
    Sale,
}

impl RowTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Header => "header",
            Self::Negative => "negative",
            Self::RecycleBin => "recyclebin",
            Self::Sale => "sale",
        }
    }
}

/// A transaction row plus its tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedRow {
    #[serde(flatten)]
    pub row: TransactionRow,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tags: Vec<RowTag>,
}

impl AnnotatedRow {
    pub fn has_tag(&self, tag: RowTag) -> bool {
        self.tags.contains(&tag)
    }
}

// =============================================================================
// Lot
// =============================================================================

/// A maximal run of purchase/sale rows sharing the same lot prefix.
///
/// Totals are rounded to 2 decimals when the lot is sealed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lot {
    /// Truncated lot identifier shared by every row.
    pub key: String,
    pub rows: Vec<AnnotatedRow>,
    pub weight_total: f64,
    pub result_total: f64,
}

impl Lot {
    pub fn is_negative(&self) -> bool {
        self.result_total < 0.0
    }

    /// Counterparty of the first row.
    pub fn party(&self) -> &str {
        self.rows.first().map(|r| r.row.party.as_str()).unwrap_or("")
    }
}

// =============================================================================
// Buyer Group
// =============================================================================

/// Consecutive lots of the same counterparty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyerGroup {
    pub party: String,
    pub lots: Vec<Lot>,
}

impl BuyerGroup {
    /// Sum of lot result totals, rounded to 2 decimals.
    pub fn group_total(&self) -> f64 {
        round2(self.lots.iter().map(|l| l.result_total).sum())
    }

    /// Sum of lot weight totals, rounded to 2 decimals.
    pub fn weight_total(&self) -> f64 {
        round2(self.lots.iter().map(|l| l.weight_total).sum())
    }

    pub fn row_count(&self) -> usize {
        self.lots.iter().map(|l| l.rows.len()).sum()
    }
}

// =============================================================================
// Tests
// =============================================================================
