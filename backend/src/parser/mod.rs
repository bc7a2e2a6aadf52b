//! Generic CSV to JSON parser with encoding and delimiter auto-detection.
//!
//! Converts CSV rows into JSON objects keyed by header. Nothing here knows
//! about lots or transactions; see [`crate::normalize`] for that.

use csv::{ReaderBuilder, Trim};
use serde_json::{Map, Value};
use std::path::Path;

use crate::error::{CsvError, CsvResult};

/// Result of parsing with metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Parsed records as JSON objects
    pub records: Vec<Value>,
    /// Detected or used encoding
    pub encoding: String,
    /// Detected or used delimiter
    pub delimiter: char,
    /// Column headers
    pub headers: Vec<String>,
    /// Source line of each record (1-based, header on line 1)
    pub lines: Vec<u64>,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    // Accounting exports often start with a BOM
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);

    match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => String::from_utf8_lossy(bytes).into_owned(),
        "iso-8859-1" | "latin-1" | "latin1" => {
            encoding_rs::ISO_8859_15.decode(bytes).0.into_owned()
        }
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Detect the delimiter by counting occurrences in the first line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [';', ',', '\t', '|'];
    let mut best_sep = ';';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Parse CSV text into JSON objects with an explicit delimiter.
///
/// # Example
/// ```ignore
/// use marges::parser::csv_to_json;
///
/// let rows = csv_to_json("TYPE;Lot\nACHAT;L0001", ';').unwrap();
/// assert_eq!(rows[0]["Lot"], "L0001");
/// ```
pub fn csv_to_json(csv: &str, delimiter: char) -> CsvResult<Vec<Value>> {
    parse_string_with_metadata(csv, delimiter, "utf-8".to_string()).map(|r| r.records)
}

/// Parse a CSV file with auto-detection of encoding and delimiter.
pub fn parse_csv_file_auto<P: AsRef<Path>>(path: P) -> CsvResult<ParseResult> {
    let bytes = std::fs::read(path.as_ref())?;
    parse_bytes_auto(&bytes)
}

/// Parse CSV bytes with auto-detection of encoding and delimiter.
pub fn parse_bytes_auto(bytes: &[u8]) -> CsvResult<ParseResult> {
    // Valid UTF-8 wins; chardet is only trusted for legacy exports
    let encoding = if std::str::from_utf8(bytes).is_ok() {
        "utf-8".to_string()
    } else {
        detect_encoding(bytes)
    };
    let content = decode_content(bytes, &encoding);
    let delimiter = detect_delimiter(&content);

    parse_string_with_metadata(&content, delimiter, encoding)
}

/// Parse CSV text with an explicit delimiter and return metadata.
pub fn parse_string_with_metadata(
    content: &str,
    delimiter: char,
    encoding: String,
) -> CsvResult<ParseResult> {
    if content.trim().is_empty() {
        return Err(CsvError::EmptyFile);
    }

    let delimiter_byte = u8::try_from(delimiter)
        .ok()
        .filter(u8::is_ascii)
        .ok_or_else(|| CsvError::ParseError {
            line: 0,
            message: format!("Unsupported delimiter '{}'", delimiter),
        })?;

    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter_byte)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.to_string())
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(CsvError::NoHeaders);
    }

    let mut records = Vec::new();
    let mut lines = Vec::new();

    for result in reader.records() {
        let record = result?;

        if record.iter().all(|cell| cell.is_empty()) {
            continue;
        }

        let mut obj = Map::new();
        for (i, header) in headers.iter().enumerate() {
            let value = record.get(i).unwrap_or("");
            obj.insert(header.clone(), Value::String(value.to_string()));
        }

        records.push(Value::Object(obj));
        lines.push(record.position().map(|p| p.line()).unwrap_or(0));
    }

    Ok(ParseResult {
        records,
        encoding,
        delimiter,
        headers,
        lines,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_csv() {
        let csv = "TYPE;Lot\nACHAT;L0001\nVENTE;L0002";
        let rows = csv_to_json(csv, ';').unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["TYPE"], "ACHAT");
        assert_eq!(rows[0]["Lot"], "L0001");
        assert_eq!(rows[1]["TYPE"], "VENTE");
    }

    #[test]
    fn test_quoted_values() {
        let csv = "Désignation;Poids\n\"Pommes; Golden\";\"12,5\"";
        let rows = csv_to_json(csv, ';').unwrap();

        assert_eq!(rows[0]["Désignation"], "Pommes; Golden");
        assert_eq!(rows[0]["Poids"], "12,5");
    }

    #[test]
    fn test_empty_lines_skipped() {
        let csv = "a;b\n1;2\n\n;\n3;4\n";
        let rows = csv_to_json(csv, ';').unwrap();

        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_record_lines_skip_blank_lines() {
        let result = parse_string_with_metadata("a;b\n1;2\n\n3;4\n", ';', "utf-8".into()).unwrap();
        assert_eq!(result.lines, vec![2, 4]);
    }

    #[test]
    fn test_missing_values() {
        let csv = "a;b;c\n1;;3\n4";
        let rows = csv_to_json(csv, ';').unwrap();

        assert_eq!(rows[0]["b"], "");
        assert_eq!(rows[1]["a"], "4");
        assert_eq!(rows[1]["c"], "");
    }

    #[test]
    fn test_empty_csv_error() {
        let result = csv_to_json("", ';');
        assert!(matches!(result, Err(CsvError::EmptyFile)));
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), ';');
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), ',');
        assert_eq!(detect_delimiter("a\tb\tc\n1\t2\t3"), '\t');
        assert_eq!(detect_delimiter("a|b|c\n1|2|3"), '|');
    }

    #[test]
    fn test_auto_parse() {
        let csv = "TYPE;Raison C/F\nACHAT;Dupont\nVENTE;Martin";
        let result = parse_bytes_auto(csv.as_bytes()).unwrap();

        assert_eq!(result.delimiter, ';');
        assert_eq!(result.records.len(), 2);
        assert_eq!(result.headers, vec!["TYPE", "Raison C/F"]);
    }

    #[test]
    fn test_bom_stripped() {
        let bytes = b"\xEF\xBB\xBFTYPE;Lot\nACHAT;L1";
        let result = parse_bytes_auto(bytes).unwrap();
        assert_eq!(result.headers[0], "TYPE");
    }

    #[test]
    fn test_latin1_decoding() {
        // "Société" in ISO-8859-1
        let bytes: &[u8] = &[0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9];
        let decoded = decode_content(bytes, "iso-8859-1");
        assert_eq!(decoded, "Société");
    }

    #[test]
    fn test_parse_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.csv");
        std::fs::write(&path, "TYPE,Lot\nACHAT,L1\n").unwrap();

        let result = parse_csv_file_auto(&path).unwrap();
        assert_eq!(result.delimiter, ',');
        assert_eq!(result.records[0]["Lot"], "L1");
    }
}
