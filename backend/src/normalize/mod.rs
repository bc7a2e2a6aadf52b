//! Row cleaning: parsed CSV records to ordered transaction rows.
//!
//! Steps, in order:
//!
//! 1. drop exact duplicate records (first occurrence wins)
//! 2. drop records whose counterparty code is excluded (e.g. `-REGUL`)
//! 3. keep only the report columns, as typed [`TransactionRow`]s tagged with
//!    their export line
//! 4. stable sort by (lot identifier, transaction type)
//!
//! The resulting order is the only order the lot partitioner ever sees.

use serde_json::Value;
use std::collections::HashSet;

use crate::config::{ColumnMap, Settings};
use crate::error::{NormalizeError, NormalizeResult};
use crate::models::{TransactionKind, TransactionRow};
use crate::parser::ParseResult;

/// Clean parsed records into the row sequence the lot partitioner consumes.
pub fn normalize_records(parsed: &ParseResult, settings: &Settings) -> NormalizeResult<Vec<TransactionRow>> {
    check_columns(&parsed.headers, &settings.columns)?;

    let mut seen = HashSet::new();
    let mut rows: Vec<TransactionRow> = parsed
        .records
        .iter()
        .enumerate()
        // serde_json maps are key-ordered, so the text form identifies a record
        .filter(|(_, record)| seen.insert(record.to_string()))
        .filter(|(_, record)| !is_excluded(record, settings))
        .map(|(i, record)| {
            let line = parsed.lines.get(i).copied().unwrap_or(0);
            to_row(record, line, &settings.columns)
        })
        .collect();

    rows.sort_by(|a, b| {
        a.lot_id
            .cmp(&b.lot_id)
            .then_with(|| a.kind.label().cmp(b.kind.label()))
    });

    if rows.is_empty() {
        return Err(NormalizeError::NoRows);
    }

    Ok(rows)
}

fn check_columns(headers: &[String], columns: &ColumnMap) -> NormalizeResult<()> {
    let required = [
        &columns.kind,
        &columns.party,
        &columns.date,
        &columns.lot_id,
        &columns.weight,
        &columns.result,
    ];

    for name in required {
        if !headers.iter().any(|h| h == name) {
            return Err(NormalizeError::MissingColumn(name.clone()));
        }
    }

    Ok(())
}

fn is_excluded(record: &Value, settings: &Settings) -> bool {
    let code = cell(record, &settings.columns.party_code);
    settings.excluded_party_codes.iter().any(|c| c == code)
}

fn cell<'a>(record: &'a Value, column: &str) -> &'a str {
    record.get(column).and_then(|v| v.as_str()).unwrap_or("")
}

fn to_row(record: &Value, source_line: u64, columns: &ColumnMap) -> TransactionRow {
    TransactionRow {
        kind: TransactionKind::from_label(cell(record, &columns.kind)),
        party: cell(record, &columns.party).to_string(),
        date: cell(record, &columns.date).to_string(),
        lot_id: cell(record, &columns.lot_id).to_string(),
        description: cell(record, &columns.description).to_string(),
        weight: cell(record, &columns.weight).to_string(),
        unit: cell(record, &columns.unit).to_string(),
        unit_price: cell(record, &columns.unit_price).to_string(),
        result: cell(record, &columns.result).to_string(),
        source_line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_string_with_metadata;

    const HEADER: &str = "TYPE;Code C/F;Raison C/F;Date;Lot;Commande;Désignation;Poids;UN;PU;Résultat";

    fn normalize(body: &str) -> NormalizeResult<Vec<TransactionRow>> {
        let content = format!("{}\n{}", HEADER, body);
        let parsed = parse_string_with_metadata(&content, ';', "utf-8".into()).unwrap();
        normalize_records(&parsed, &Settings::default())
    }

    #[test]
    fn test_sorted_by_lot_then_type() {
        let rows = normalize(
            "VENTE;C2;Martin;20240312;L00000000002;;Poires;5;KG;2;3\n\
             VENTE;C1;Dupont;20240312;L00000000001;;Pommes;10;KG;1;5\n\
             ACHAT;F1;Dupont;20240312;L00000000001;;Pommes;10;KG;1;-2",
        )
        .unwrap();

        let order: Vec<(&str, &str)> = rows.iter().map(|r| (r.lot_id.as_str(), r.kind.label())).collect();
        assert_eq!(
            order,
            vec![
                ("L00000000001", "ACHAT"),
                ("L00000000001", "VENTE"),
                ("L00000000002", "VENTE"),
            ]
        );
    }

    #[test]
    fn test_duplicates_dropped() {
        let rows = normalize(
            "ACHAT;F1;Dupont;20240312;L1;;Pommes;10;KG;1;5\n\
             ACHAT;F1;Dupont;20240312;L1;;Pommes;10;KG;1;5\n\
             ACHAT;F1;Dupont;20240312;L1;;Pommes;11;KG;1;5",
        )
        .unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_excluded_codes_dropped() {
        let rows = normalize(
            "ACHAT;-REGUL;Regul;20240312;L1;;Ajustement;0;KG;0;0\n\
             ACHAT;F1;Dupont;20240312;L1;;Pommes;10;KG;1;5",
        )
        .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].party, "Dupont");
    }

    #[test]
    fn test_passthrough_fields_preserved() {
        let rows = normalize("ACHAT;F1;Dupont;20240312;L1;CMD9;Pommes Golden;10,5;KG;1,20;-3,10").unwrap();
        let row = &rows[0];
        assert_eq!(row.description, "Pommes Golden");
        assert_eq!(row.weight, "10,5");
        assert_eq!(row.unit_price, "1,20");
        assert_eq!(row.result, "-3,10");
        assert_eq!(row.date, "20240312");
    }

    #[test]
    fn test_rows_keep_export_line() {
        let rows = normalize(
            "ACHAT;F1;Dupont;20240312;L2;;Pommes;10;KG;1;5\n\
             ACHAT;F1;Dupont;20240312;L2;;Pommes;10;KG;1;5\n\
             \n\
             ACHAT;F2;Durand;20240312;L1;;Poires;4;KG;1;2",
        )
        .unwrap();

        // Sorted by lot, so the Durand row (line 5) comes first
        let lines: Vec<u64> = rows.iter().map(|r| r.source_line).collect();
        assert_eq!(lines, vec![5, 2]);
    }

    #[test]
    fn test_missing_column() {
        let parsed = parse_string_with_metadata("TYPE;Lot\nACHAT;L1", ';', "utf-8".into()).unwrap();
        let err = normalize_records(&parsed, &Settings::default()).unwrap_err();
        assert!(matches!(err, NormalizeError::MissingColumn(ref c) if c == "Raison C/F"));
    }

    #[test]
    fn test_nothing_left() {
        let err = normalize("ACHAT;-REGUL;Regul;20240312;L1;;Ajustement;0;KG;0;0").unwrap_err();
        assert!(matches!(err, NormalizeError::NoRows));
    }
}
