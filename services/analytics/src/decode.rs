//! Decode uploaded bytes (workbook, CSV or JSON) into raw records.
//!
//! Decoding is all-or-nothing: any error aborts the load before the
//! current snapshot is touched.

use crate::record::{CellValue, RawRecord};
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("failed to open workbook: {0}")]
    Workbook(#[from] calamine::Error),
    #[error("workbook has no sheets")]
    NoSheets,
    #[error("failed to read CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("JSON document must be an array of records")]
    NotAnArray,
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Workbook,
    Csv,
    Json,
}

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0];
const UTF8_BOM: &str = "\u{feff}";

impl InputFormat {
    /// Detect by file extension, falling back to the content signature
    pub fn detect(path_hint: Option<&Path>, bytes: &[u8]) -> Self {
        let by_extension = path_hint
            .and_then(|p| p.extension())
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .and_then(|ext| match ext.as_str() {
                "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Some(InputFormat::Workbook),
                "csv" | "txt" => Some(InputFormat::Csv),
                "json" => Some(InputFormat::Json),
                _ => None,
            });
        if let Some(format) = by_extension {
            return format;
        }

        if bytes.starts_with(ZIP_MAGIC) || bytes.starts_with(OLE_MAGIC) {
            return InputFormat::Workbook;
        }
        let text_start = bytes.strip_prefix(UTF8_BOM.as_bytes()).unwrap_or(bytes);
        match text_start.iter().find(|b| !b.is_ascii_whitespace()) {
            Some(b'[') => InputFormat::Json,
            _ => InputFormat::Csv,
        }
    }
}

/// Decode `bytes` into rows, detecting the format from `path_hint` and content
pub fn decode_bytes(path_hint: Option<&Path>, bytes: &[u8]) -> Result<Vec<RawRecord>, DecodeError> {
    let format = InputFormat::detect(path_hint, bytes);
    debug!(?format, size = bytes.len(), "decoding input");
    match format {
        InputFormat::Workbook => decode_workbook(bytes),
        InputFormat::Csv => decode_csv(bytes),
        InputFormat::Json => decode_json(bytes),
    }
}

/// Read the first sheet of a workbook. Row 1 is the header row.
pub fn decode_workbook(bytes: &[u8]) -> Result<Vec<RawRecord>, DecodeError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;

    let sheet_names = workbook.sheet_names().to_vec();
    let sheet_name = sheet_names.first().ok_or(DecodeError::NoSheets)?;
    let range = workbook.worksheet_range(sheet_name)?;

    let (row_count, col_count) = range.get_size();
    debug!(sheet = %sheet_name, row_count, col_count, "reading first sheet");

    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return Ok(Vec::new());
    };
    let headers: Vec<String> = header_row
        .iter()
        .map(|cell| match cell {
            Data::String(s) => s.trim().to_string(),
            Data::Empty => String::new(),
            other => other.to_string(),
        })
        .collect();
    let headers = dedupe_headers(headers);

    let records = rows
        .map(|row| {
            headers
                .iter()
                .zip(row)
                .filter(|(header, _)| !header.is_empty())
                .filter_map(|(header, cell)| workbook_cell(cell).map(|v| (header.clone(), v)))
                .collect::<RawRecord>()
        })
        .filter(|record| !record.is_empty())
        .collect();
    Ok(records)
}

fn workbook_cell(cell: &Data) -> Option<CellValue> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) if s.is_empty() => None,
        Data::String(s) => Some(CellValue::Text(s.clone())),
        Data::Float(f) => Some(CellValue::Number(*f)),
        Data::Int(i) => Some(CellValue::Number(*i as f64)),
        Data::Bool(b) => Some(CellValue::Bool(*b)),
        // Serial day; the normalizer converts it to a calendar date
        Data::DateTime(dt) => Some(CellValue::Number(dt.as_f64())),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Some(CellValue::Text(s.clone())),
    }
}

/// Suffix repeated header names with `_1`, `_2`, ... so no column is lost.
/// Empty headers stay empty and their columns are dropped.
fn dedupe_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    headers
        .into_iter()
        .map(|header| {
            if header.is_empty() {
                return header;
            }
            let n = seen.entry(header.clone()).or_insert(0);
            let name = if *n == 0 {
                header.clone()
            } else {
                format!("{}_{}", header, n)
            };
            *n += 1;
            name
        })
        .collect()
}

/// Decode CSV text. Non-UTF-8 input is read as Windows-1251.
pub fn decode_csv(bytes: &[u8]) -> Result<Vec<RawRecord>, DecodeError> {
    let text = decode_text(bytes);
    let content = text.strip_prefix(UTF8_BOM).unwrap_or(&text);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(detect_delimiter(content))
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers = dedupe_headers(reader.headers()?.iter().map(str::to_string).collect());

    let mut records = Vec::new();
    for result in reader.records() {
        let row = result?;
        let record: RawRecord = headers
            .iter()
            .zip(row.iter())
            .filter(|(header, cell)| !header.is_empty() && !cell.is_empty())
            .map(|(header, cell)| (header.clone(), cell))
            .collect();
        if !record.is_empty() {
            records.push(record);
        }
    }
    Ok(records)
}

fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, had_errors) = encoding_rs::WINDOWS_1251.decode(bytes);
            debug!(had_errors, "input is not UTF-8, decoded as windows-1251");
            decoded.into_owned()
        }
    }
}

fn detect_delimiter(content: &str) -> u8 {
    let header_line = content.lines().next().unwrap_or("");
    let semicolons = header_line.matches(';').count();
    let commas = header_line.matches(',').count();
    if semicolons > commas {
        b';'
    } else {
        b','
    }
}

/// Decode a JSON array of flat objects
pub fn decode_json(bytes: &[u8]) -> Result<Vec<RawRecord>, DecodeError> {
    let bytes = bytes.strip_prefix(UTF8_BOM.as_bytes()).unwrap_or(bytes);
    let value: serde_json::Value = serde_json::from_slice(bytes)?;
    let serde_json::Value::Array(items) = value else {
        return Err(DecodeError::NotAnArray);
    };

    let records = items
        .into_iter()
        .filter_map(|item| match item {
            serde_json::Value::Object(map) => {
                Some(map.into_iter().map(|(k, v)| (k, CellValue::from(v))).collect())
            }
            _ => None,
        })
        .collect();
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_by_extension() {
        assert_eq!(InputFormat::detect(Some(Path::new("sales.XLSX")), b""), InputFormat::Workbook);
        assert_eq!(InputFormat::detect(Some(Path::new("sales.csv")), b"["), InputFormat::Csv);
        assert_eq!(InputFormat::detect(Some(Path::new("data.json")), b"a,b"), InputFormat::Json);
    }

    #[test]
    fn test_detect_by_content() {
        assert_eq!(InputFormat::detect(None, b"PK\x03\x04rest"), InputFormat::Workbook);
        assert_eq!(InputFormat::detect(None, &[0xD0, 0xCF, 0x11, 0xE0, 0x00]), InputFormat::Workbook);
        assert_eq!(InputFormat::detect(None, b"\xEF\xBB\xBF  \n[{}]"), InputFormat::Json);
        assert_eq!(InputFormat::detect(Some(Path::new("upload.bin")), b"Product,Revenue"), InputFormat::Csv);
    }

    #[test]
    fn test_csv_rows_omit_empty_cells() {
        let csv = "Product,Revenue,Agent\nTea,100,\nCoffee,,Ali\n,,\n";
        let rows = decode_csv(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("Product"), Some(&CellValue::from("Tea")));
        assert_eq!(rows[0].get("Revenue"), Some(&CellValue::from("100")));
        assert_eq!(rows[0].get("Agent"), None);
        assert_eq!(rows[1].get("Revenue"), None);
    }

    #[test]
    fn test_csv_semicolon_and_bom() {
        let csv = "\u{feff}Товар;Выручка\nЧай;1,5\n";
        let rows = decode_csv(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("Товар"), Some(&CellValue::from("Чай")));
        assert_eq!(rows[0].get("Выручка"), Some(&CellValue::from("1,5")));
    }

    #[test]
    fn test_csv_windows_1251() {
        let (encoded, _, _) = encoding_rs::WINDOWS_1251.encode("Товар,Агент\nЧай,Али\n");
        let rows = decode_csv(&encoded).unwrap();
        assert_eq!(rows[0].get("Товар"), Some(&CellValue::from("Чай")));
        assert_eq!(rows[0].get("Агент"), Some(&CellValue::from("Али")));
    }

    #[test]
    fn test_duplicate_headers_are_suffixed() {
        let rows = decode_csv(b"Product,Product,Revenue\nTea,Green tea,5\n").unwrap();
        assert_eq!(rows[0].get("Product"), Some(&CellValue::from("Tea")));
        assert_eq!(rows[0].get("Product_1"), Some(&CellValue::from("Green tea")));
    }

    #[test]
    fn test_json_array() {
        let json = br#"[{"Product": "Tea", "Revenue": 10, "Tags": ["a"]}, 5, {"Product": null}]"#;
        let rows = decode_json(json).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("Revenue"), Some(&CellValue::Number(10.0)));
        assert_eq!(rows[0].get("Tags"), Some(&CellValue::from(r#"["a"]"#)));
        assert_eq!(rows[1].get("Product"), Some(&CellValue::Null));
    }

    #[test]
    fn test_json_not_an_array() {
        let err = decode_json(br#"{"Product": "Tea"}"#).unwrap_err();
        assert!(matches!(err, DecodeError::NotAnArray));
    }

    #[test]
    fn test_json_malformed() {
        assert!(matches!(decode_json(b"[{"), Err(DecodeError::Json(_))));
    }

    #[test]
    fn test_garbage_workbook_fails() {
        let result = decode_bytes(Some(Path::new("broken.xlsx")), b"PK\x03\x04not really a zip");
        assert!(matches!(result, Err(DecodeError::Workbook(_))));
    }

    #[test]
    fn test_workbook_first_sheet() {
        use crate::state::Snapshot;
        use rust_xlsxwriter::{Format, Workbook};

        let mut workbook = Workbook::new();
        let date = Format::new().set_num_format("yyyy-mm-dd");
        let sheet = workbook.add_worksheet();
        for (col, header) in ["Товар", "Выручка", "Дата расхода", "Товар"].into_iter().enumerate() {
            sheet.write_string(0, col as u16, header).unwrap();
        }
        sheet.write_string(1, 0, "Чай").unwrap();
        sheet.write_number(1, 1, 120.5).unwrap();
        sheet.write_number_with_format(1, 2, 45356.0, &date).unwrap();
        sheet.write_string(1, 3, "Зелёный чай").unwrap();
        // Row 3 left empty
        sheet.write_string(3, 0, "Кофе").unwrap();
        sheet.write_number(3, 1, 80.0).unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let rows = decode_bytes(Some(Path::new("sales.xlsx")), &bytes).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("Товар"), Some(&CellValue::from("Чай")));
        assert_eq!(rows[0].get("Товар_1"), Some(&CellValue::from("Зелёный чай")));
        assert_eq!(rows[0].get("Выручка"), Some(&CellValue::Number(120.5)));
        assert_eq!(rows[0].get("Дата расхода"), Some(&CellValue::Number(45356.0)));
        assert_eq!(rows[1].get("Товар"), Some(&CellValue::from("Кофе")));
        assert_eq!(rows[1].get("Дата расхода"), None);

        let snapshot = Snapshot::build("sales.xlsx", rows);
        assert_eq!(snapshot.stats.total_revenue, 200.5);
        assert_eq!(snapshot.revenue_by_date.len(), 1);
        assert_eq!(snapshot.revenue_by_date[0].date, "2024-03-05");
        assert_eq!(snapshot.revenue_by_date[0].revenue, 120.5);
    }

    #[test]
    fn test_workbook_cell_mapping() {
        assert_eq!(workbook_cell(&Data::Empty), None);
        assert_eq!(workbook_cell(&Data::String(String::new())), None);
        assert_eq!(workbook_cell(&Data::Int(3)), Some(CellValue::Number(3.0)));
        assert_eq!(workbook_cell(&Data::Float(2.5)), Some(CellValue::Number(2.5)));
        assert_eq!(workbook_cell(&Data::Bool(true)), Some(CellValue::Bool(true)));
        assert_eq!(
            workbook_cell(&Data::DateTimeIso("2024-03-05T00:00:00".into())),
            Some(CellValue::from("2024-03-05T00:00:00"))
        );
    }
}
