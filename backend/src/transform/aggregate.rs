//! Per-lot subtotals.

use crate::error::LotResult;
use crate::models::{round2, Lot};

use super::annotate::RowAnnotator;
use super::partition::RawLot;

/// Seal a raw lot: sum weights and results (rounded to 2 decimals) and tag
/// its rows.
///
/// The first non-numeric weight or result aborts the lot with
/// [`crate::error::LotError::NumericConversion`]; blank cells are not zero.
pub fn aggregate(raw: RawLot, annotator: &RowAnnotator) -> LotResult<Lot> {
    let mut weight_sum = 0.0;
    let mut result_sum = 0.0;

    for row in &raw.rows {
        weight_sum += row.weight_value()?;
        result_sum += row.result_value()?;
    }

    let weight_total = round2(weight_sum);
    let result_total = round2(result_sum);
    let negative = result_total < 0.0;

    let rows = raw
        .rows
        .into_iter()
        .map(|row| annotator.annotate(row, negative))
        .collect();

    Ok(Lot {
        key: raw.key,
        rows,
        weight_total,
        result_total,
    })
}
