//! Record normalizer: maps a raw row with either column spelling onto a
//! fixed-shape `NormalizedSale`.
//!
//! Numeric coercion is intentionally lossy: a missing or malformed numeric
//! cell reads as zero and never raises. Downstream stages assume clean
//! numerics.

use crate::record::{CellValue, RawRecord};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};

/// Label used when neither spelling of a text column is present
pub const UNKNOWN: &str = "Noma'lum";

/// Canonical fields and their two accepted column names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Category,
    Product,
    Agent,
    Client,
    Revenue,
    Profit,
    Cost,
    Quantity,
    Margin,
    SaleDate,
}

impl Field {
    /// `[primary, alternate]` column names, tried in that order
    pub const fn columns(self) -> [&'static str; 2] {
        match self {
            Field::Category => ["Категория товара", "Category"],
            Field::Product => ["Товар", "Product"],
            Field::Agent => ["Агент", "Agent"],
            Field::Client => ["Клиент расхода", "Client"],
            Field::Revenue => ["Выручка", "Revenue"],
            Field::Profit => ["Прибыль", "Profit"],
            Field::Cost => ["Себестоимость", "Cost"],
            Field::Quantity => ["Количество", "Quantity"],
            Field::Margin => ["Маржа (%)", "Margin"],
            Field::SaleDate => ["Дата расхода", "Sale Date"],
        }
    }

    pub const fn primary(self) -> &'static str {
        self.columns()[0]
    }

    pub const fn alternate(self) -> &'static str {
        self.columns()[1]
    }
}

/// One row after normalization
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedSale {
    pub category: String,
    pub product: String,
    pub agent: String,
    pub client: String,
    pub revenue: f64,
    pub profit: f64,
    pub cost: f64,
    pub quantity: i64,
    pub margin: f64,
    pub sale_date: Option<NaiveDate>,
}

impl NormalizedSale {
    pub fn from_raw(row: &RawRecord) -> Self {
        Self {
            category: text_field(row, Field::Category),
            product: text_field(row, Field::Product),
            agent: text_field(row, Field::Agent),
            client: text_field(row, Field::Client),
            revenue: number_field(row, Field::Revenue),
            profit: number_field(row, Field::Profit),
            cost: number_field(row, Field::Cost),
            quantity: integer_field(row, Field::Quantity),
            margin: number_field(row, Field::Margin),
            sale_date: date_field(row, Field::SaleDate),
        }
    }
}

fn lookup(row: &RawRecord, field: Field) -> Option<&CellValue> {
    row.first_present(&field.columns())
}

pub fn text_field(row: &RawRecord, field: Field) -> String {
    lookup(row, field)
        .map(CellValue::to_label)
        .unwrap_or_else(|| UNKNOWN.to_string())
}

pub fn number_field(row: &RawRecord, field: Field) -> f64 {
    lookup(row, field).map(parse_number_or_zero).unwrap_or(0.0)
}

pub fn integer_field(row: &RawRecord, field: Field) -> i64 {
    lookup(row, field).map(parse_integer_or_zero).unwrap_or(0)
}

pub fn date_field(row: &RawRecord, field: Field) -> Option<NaiveDate> {
    lookup(row, field).and_then(parse_sale_date)
}

/// Parse a numeric cell, returning 0 on failure
pub fn parse_number_or_zero(value: &CellValue) -> f64 {
    let parsed = match value {
        CellValue::Number(n) => *n,
        CellValue::Text(s) => leading_number(s).unwrap_or(0.0),
        CellValue::Bool(_) | CellValue::Null => 0.0,
    };
    if parsed.is_finite() {
        parsed
    } else {
        0.0
    }
}

/// Parse an integer cell, truncating toward zero, returning 0 on failure.
/// Values outside the `i64` range clamp to its bounds.
pub fn parse_integer_or_zero(value: &CellValue) -> i64 {
    match value {
        // `as` saturates and maps NaN to 0
        CellValue::Number(n) if n.is_finite() => n.trunc() as i64,
        CellValue::Text(s) => leading_integer(s).unwrap_or(0),
        CellValue::Number(_) | CellValue::Bool(_) | CellValue::Null => 0,
    }
}

/// Longest leading decimal literal of `s`, e.g. `"12.5 kg"` -> 12.5
fn leading_number(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if digits > 0 {
            end = frac_end;
        }
    }
    if digits == 0 {
        return None;
    }
    // Exponent only counts when followed by at least one digit
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && (bytes[exp_end] == b'+' || bytes[exp_end] == b'-') {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }
    s[..end].parse().ok()
}

fn leading_integer(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end == digits_start {
        return None;
    }
    match s[..end].parse() {
        Ok(n) => Some(n),
        // Only overflow is left once the digits are known good
        Err(_) if s.starts_with('-') => Some(i64::MIN),
        Err(_) => Some(i64::MAX),
    }
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d.%m.%Y", "%m/%d/%Y"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
];

/// Largest serial day Excel can represent (9999-12-31)
const EXCEL_MAX_SERIAL: f64 = 2_958_465.0;

/// Calendar day (UTC) of a sale-date cell.
///
/// Offset-bearing timestamps are converted to UTC before truncation; naive
/// values are taken as UTC. Numeric cells are Excel serial days.
pub fn parse_sale_date(value: &CellValue) -> Option<NaiveDate> {
    match value {
        CellValue::Text(s) => parse_date_text(s.trim()),
        CellValue::Number(n) => excel_serial_to_date(*n),
        CellValue::Bool(_) | CellValue::Null => None,
    }
}

fn parse_date_text(s: &str) -> Option<NaiveDate> {
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc().date());
    }
    if let Some(d) = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    {
        return Some(d.date());
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// Excel 1900 date system, counted from 1899-12-30. Exact from serial 61
/// (1900-03-01) on; earlier serials land one day early because Excel keeps
/// the fictitious 1900-02-29.
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 || serial > EXCEL_MAX_SERIAL {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial.floor() as i64))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[(&str, CellValue)]) -> RawRecord {
        cells.iter().cloned().collect()
    }

    #[test]
    fn test_primary_names() {
        let r = row(&[
            ("Категория товара", "Drinks".into()),
            ("Товар", "Tea".into()),
            ("Агент", "Ali".into()),
            ("Клиент расхода", "Shop 1".into()),
            ("Выручка", 100.0.into()),
            ("Прибыль", 20.0.into()),
            ("Себестоимость", 80.0.into()),
            ("Количество", 4.0.into()),
            ("Маржа (%)", 0.2.into()),
            ("Дата расхода", "2024-03-05".into()),
        ]);
        let sale = NormalizedSale::from_raw(&r);
        assert_eq!(sale.category, "Drinks");
        assert_eq!(sale.product, "Tea");
        assert_eq!(sale.agent, "Ali");
        assert_eq!(sale.client, "Shop 1");
        assert_eq!(sale.revenue, 100.0);
        assert_eq!(sale.profit, 20.0);
        assert_eq!(sale.cost, 80.0);
        assert_eq!(sale.quantity, 4);
        assert_eq!(sale.margin, 0.2);
        assert_eq!(sale.sale_date, NaiveDate::from_ymd_opt(2024, 3, 5));
    }

    #[test]
    fn test_alternate_names_match_primary() {
        let primary = row(&[("Товар", "Tea".into()), ("Выручка", "50".into())]);
        let alternate = row(&[("Product", "Tea".into()), ("Revenue", "50".into())]);
        assert_eq!(NormalizedSale::from_raw(&primary), NormalizedSale::from_raw(&alternate));
    }

    #[test]
    fn test_missing_fields_fall_back() {
        let sale = NormalizedSale::from_raw(&RawRecord::new());
        assert_eq!(sale.product, UNKNOWN);
        assert_eq!(sale.category, UNKNOWN);
        assert_eq!(sale.agent, UNKNOWN);
        assert_eq!(sale.client, UNKNOWN);
        assert_eq!(sale.revenue, 0.0);
        assert_eq!(sale.quantity, 0);
        assert_eq!(sale.sale_date, None);
    }

    #[test]
    fn test_empty_primary_uses_alternate() {
        let r = row(&[("Агент", "".into()), ("Agent", "Vali".into())]);
        assert_eq!(text_field(&r, Field::Agent), "Vali");
    }

    #[test]
    fn test_malformed_numbers_read_as_zero() {
        assert_eq!(parse_number_or_zero(&"abc".into()), 0.0);
        assert_eq!(parse_number_or_zero(&"".into()), 0.0);
        assert_eq!(parse_number_or_zero(&CellValue::Bool(true)), 0.0);
        assert_eq!(parse_number_or_zero(&CellValue::Number(f64::INFINITY)), 0.0);
        assert_eq!(parse_integer_or_zero(&"n/a".into()), 0);
    }

    #[test]
    fn test_leading_numeric_prefix() {
        assert_eq!(parse_number_or_zero(&"  12.5 kg".into()), 12.5);
        assert_eq!(parse_number_or_zero(&"-3".into()), -3.0);
        assert_eq!(parse_number_or_zero(&".5".into()), 0.5);
        assert_eq!(parse_number_or_zero(&"1e3".into()), 1000.0);
        assert_eq!(parse_number_or_zero(&"2e".into()), 2.0);
        assert_eq!(parse_number_or_zero(&"1,234".into()), 1.0);
    }

    #[test]
    fn test_quantity_truncates() {
        assert_eq!(parse_integer_or_zero(&"12.7".into()), 12);
        assert_eq!(parse_integer_or_zero(&CellValue::Number(12.7)), 12);
        assert_eq!(parse_integer_or_zero(&CellValue::Number(-2.5)), -2);
        assert_eq!(parse_integer_or_zero(&"7 pcs".into()), 7);
    }

    #[test]
    fn test_oversized_quantity_clamps() {
        assert_eq!(parse_integer_or_zero(&CellValue::Number(1e19)), i64::MAX);
        assert_eq!(parse_integer_or_zero(&CellValue::Number(-1e19)), i64::MIN);
        assert_eq!(parse_integer_or_zero(&"10000000000000000000".into()), i64::MAX);
        assert_eq!(parse_integer_or_zero(&"-10000000000000000000 pcs".into()), i64::MIN);
        assert_eq!(parse_integer_or_zero(&CellValue::Number(f64::INFINITY)), 0);
    }

    #[test]
    fn test_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 5);
        for text in [
            "2024-03-05",
            "2024/03/05",
            "05.03.2024",
            "03/05/2024",
            "2024-03-05 14:30:00",
            "2024-03-05T14:30",
            "2024-03-05T10:00:00Z",
        ] {
            assert_eq!(parse_sale_date(&text.into()), expected, "{}", text);
        }
    }

    #[test]
    fn test_offset_timestamps_bucket_in_utc() {
        // 01:30 at +05:00 is still the previous day in UTC
        assert_eq!(
            parse_sale_date(&"2024-03-06T01:30:00+05:00".into()),
            NaiveDate::from_ymd_opt(2024, 3, 5)
        );
    }

    #[test]
    fn test_unparseable_dates_are_dateless() {
        assert_eq!(parse_sale_date(&"".into()), None);
        assert_eq!(parse_sale_date(&"yesterday".into()), None);
        assert_eq!(parse_sale_date(&CellValue::Null), None);
    }

    #[test]
    fn test_excel_serial_dates() {
        assert_eq!(excel_serial_to_date(45356.0), NaiveDate::from_ymd_opt(2024, 3, 5));
        assert_eq!(excel_serial_to_date(45356.75), NaiveDate::from_ymd_opt(2024, 3, 5));
        assert_eq!(excel_serial_to_date(1.0), NaiveDate::from_ymd_opt(1899, 12, 31));
        assert_eq!(excel_serial_to_date(0.0), None);
        assert_eq!(excel_serial_to_date(-5.0), None);
    }
}
