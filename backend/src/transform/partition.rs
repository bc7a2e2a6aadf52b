//! Split ordered transaction rows into lots.
//!
//! A lot is a maximal run of consecutive purchase/sale rows whose lot
//! identifiers share the same prefix. Rows of any other kind are skipped:
//! they belong to no lot and do not close the current one.
//!
//! Eligible rows are moved once into a single arena vector while each lot
//! is recorded as an index range into it; the arena is split into
//! [`RawLot`]s after the scan.

use std::ops::Range;

use crate::error::{LotError, LotResult};
use crate::models::TransactionRow;

/// Rows of one lot, before subtotals.
#[derive(Debug, Clone, PartialEq)]
pub struct RawLot {
    /// Lot identifier prefix shared by every row.
    pub key: String,
    pub rows: Vec<TransactionRow>,
}

/// Key of a lot identifier: its first `prefix_len` characters, or the whole
/// identifier when it is shorter. Blank identifiers have no key.
pub fn lot_key(lot_id: &str, prefix_len: usize) -> Option<&str> {
    if lot_id.trim().is_empty() {
        return None;
    }

    match lot_id.char_indices().nth(prefix_len) {
        Some((end, _)) => Some(&lot_id[..end]),
        None => Some(lot_id),
    }
}

/// Partition rows into lots, preserving row order.
///
/// Fails with [`LotError::EmptyInput`] when no row is a purchase or a sale,
/// and with [`LotError::MalformedLotIdentifier`] when an eligible row has a
/// blank lot identifier. The error carries the row's export line, or its
/// 1-based position in `rows` when the row was not read from an export.
pub fn partition_lots(rows: Vec<TransactionRow>, prefix_len: usize) -> LotResult<Vec<RawLot>> {
    let mut arena: Vec<TransactionRow> = Vec::with_capacity(rows.len());
    let mut spans: Vec<(String, Range<usize>)> = Vec::new();
    let mut current: Option<(String, usize)> = None;

    for (index, row) in rows.into_iter().enumerate() {
        if !row.kind.is_eligible() {
            continue;
        }

        let key = match lot_key(&row.lot_id, prefix_len) {
            Some(key) => key.to_string(),
            None => {
                let line = match row.source_line {
                    0 => index as u64 + 1,
                    line => line,
                };
                return Err(LotError::MalformedLotIdentifier {
                    line,
                    party: row.party,
                    date: row.date,
                });
            }
        };

        let same_lot = matches!(&current, Some((k, _)) if *k == key);
        if !same_lot {
            if let Some((sealed, start)) = current.take() {
                spans.push((sealed, start..arena.len()));
            }
            current = Some((key, arena.len()));
        }

        arena.push(row);
    }

    let (last, start) = current.ok_or(LotError::EmptyInput)?;
    spans.push((last, start..arena.len()));

    let mut rows = arena.into_iter();
    Ok(spans
        .into_iter()
        .map(|(key, span)| RawLot {
            key,
            rows: rows.by_ref().take(span.len()).collect(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tests::row;

    #[test]
    fn test_lot_key_truncation() {
        assert_eq!(lot_key("L0000000000123", 11), Some("L0000000000"));
        assert_eq!(lot_key("L00000000001", 11), Some("L0000000000"));
        assert_eq!(lot_key("L42", 11), Some("L42"));
        assert_eq!(lot_key("L0000000000", 11), Some("L0000000000"));
        assert_eq!(lot_key("", 11), None);
        assert_eq!(lot_key("   ", 11), None);
    }

    #[test]
    fn test_lot_key_counts_characters() {
        assert_eq!(lot_key("ÉÉÉÉÉÉÉÉÉÉÉÉ", 11), Some("ÉÉÉÉÉÉÉÉÉÉÉ"));
    }

    #[test]
    fn test_boundaries_on_prefix_change() {
        let rows = vec![
            row("ACHAT", "X", "L0000000000A", "10", "5"),
            row("VENTE", "X", "L0000000000B", "20", "-2"),
            row("ACHAT", "Y", "L0000000001A", "5", "3"),
        ];

        let lots = partition_lots(rows, 11).unwrap();
        assert_eq!(lots.len(), 2);
        assert_eq!(lots[0].key, "L0000000000");
        assert_eq!(lots[0].rows.len(), 2);
        assert_eq!(lots[1].key, "L0000000001");
        assert_eq!(lots[1].rows[0].party, "Y");
    }

    #[test]
    fn test_ineligible_rows_skipped_without_closing_lot() {
        let rows = vec![
            row("ACHAT", "X", "L1", "1", "1"),
            row("AVOIR", "X", "L9", "1", "1"),
            row("VENTE", "X", "L1", "2", "2"),
        ];

        let lots = partition_lots(rows, 11).unwrap();
        assert_eq!(lots.len(), 1);
        assert_eq!(lots[0].rows.len(), 2);
        assert!(lots[0].rows.iter().all(|r| r.kind.is_eligible()));
    }

    #[test]
    fn test_first_row_ineligible() {
        let rows = vec![
            row("TYPE", "Raison C/F", "Lot", "Poids", "Résultat"),
            row("ACHAT", "X", "L1", "1", "1"),
        ];

        let lots = partition_lots(rows, 11).unwrap();
        assert_eq!(lots.len(), 1);
        assert_eq!(lots[0].key, "L1");
    }

    #[test]
    fn test_same_key_not_adjacent_makes_two_lots() {
        let rows = vec![
            row("ACHAT", "X", "L1", "1", "1"),
            row("ACHAT", "X", "L2", "1", "1"),
            row("ACHAT", "X", "L1", "1", "1"),
        ];

        let keys: Vec<String> = partition_lots(rows, 11).unwrap().into_iter().map(|l| l.key).collect();
        assert_eq!(keys, vec!["L1", "L2", "L1"]);
    }

    #[test]
    fn test_order_and_membership_preserved() {
        let rows: Vec<_> = (0..7)
            .map(|i| row(if i % 2 == 0 { "ACHAT" } else { "VENTE" }, "X", &format!("L{}", i / 3), &i.to_string(), "0"))
            .collect();

        let lots = partition_lots(rows.clone(), 11).unwrap();
        let flattened: Vec<TransactionRow> = lots.into_iter().flat_map(|l| l.rows).collect();
        assert_eq!(flattened, rows);
    }

    #[test]
    fn test_single_row() {
        let lots = partition_lots(vec![row("VENTE", "X", "L1", "1", "1")], 11).unwrap();
        assert_eq!(lots.len(), 1);
        assert_eq!(lots[0].rows.len(), 1);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(partition_lots(vec![], 11), Err(LotError::EmptyInput));
        assert_eq!(
            partition_lots(vec![row("AVOIR", "X", "L1", "1", "1")], 11),
            Err(LotError::EmptyInput)
        );
    }

    #[test]
    fn test_blank_lot_identifier() {
        let rows = vec![
            row("ACHAT", "X", "L1", "1", "1"),
            row("VENTE", "X", "", "1", "1"),
        ];
        assert_eq!(
            partition_lots(rows, 11),
            Err(LotError::MalformedLotIdentifier {
                line: 2,
                party: "X".to_string(),
                date: "20240312".to_string(),
            })
        );
    }

    #[test]
    fn test_blank_lot_identifier_reports_export_line() {
        let mut blank = row("VENTE", "Martin", " ", "1", "1");
        blank.source_line = 7;
        let rows = vec![row("ACHAT", "X", "L1", "1", "1"), blank];

        let err = partition_lots(rows, 11).unwrap_err();
        assert!(matches!(err, LotError::MalformedLotIdentifier { line: 7, ref party, .. } if party == "Martin"));
    }
}
