//! Raw input rows as they arrive from a workbook, CSV export or JSON document.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single cell of an input row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Bool(bool),
    Null,
}

impl CellValue {
    /// Blank cells are skipped when picking between the two column spellings:
    /// null, empty text, numeric zero/NaN and `false`.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Null => true,
            CellValue::Text(s) => s.is_empty(),
            CellValue::Number(n) => *n == 0.0 || n.is_nan(),
            CellValue::Bool(b) => !b,
        }
    }

    /// Render the cell as a label. Whole numbers print without a fraction
    /// so that a numeric product code `1001` keys as `"1001"`.
    pub fn to_label(&self) -> String {
        match self {
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => format_number_label(*n),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Null => String::new(),
        }
    }
}

fn format_number_label(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<serde_json::Value> for CellValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => CellValue::Null,
            serde_json::Value::Bool(b) => CellValue::Bool(b),
            serde_json::Value::Number(n) => n.as_f64().map(CellValue::Number).unwrap_or(CellValue::Null),
            serde_json::Value::String(s) => CellValue::Text(s),
            other => CellValue::Text(other.to_string()),
        }
    }
}

/// One input row: column name -> cell. Field presence is not guaranteed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord(BTreeMap<String, CellValue>);

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.0.get(column)
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<CellValue>) {
        self.0.insert(column.into(), value.into());
    }

    /// First non-blank value among `columns`, in order.
    pub fn first_present(&self, columns: &[&str]) -> Option<&CellValue> {
        columns
            .iter()
            .filter_map(|c| self.0.get(*c))
            .find(|v| !v.is_blank())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for RawRecord
where
    K: Into<String>,
    V: Into<CellValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        RawRecord(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_values() {
        assert!(CellValue::Null.is_blank());
        assert!(CellValue::from("").is_blank());
        assert!(CellValue::from(0.0).is_blank());
        assert!(CellValue::Number(f64::NAN).is_blank());
        assert!(CellValue::Bool(false).is_blank());
        assert!(!CellValue::from(" ").is_blank());
        assert!(!CellValue::from(-1.0).is_blank());
    }

    #[test]
    fn test_first_present_skips_blank_primary() {
        let row: RawRecord = [("Товар", CellValue::from("")), ("Product", CellValue::from("Tea"))]
            .into_iter()
            .collect();
        assert_eq!(row.first_present(&["Товар", "Product"]), Some(&CellValue::from("Tea")));
        assert_eq!(row.first_present(&["Агент", "Agent"]), None);
    }

    #[test]
    fn test_numeric_labels() {
        assert_eq!(CellValue::from(1001.0).to_label(), "1001");
        assert_eq!(CellValue::from(12.5).to_label(), "12.5");
    }

    #[test]
    fn test_json_row_deserializes() {
        let row: RawRecord =
            serde_json::from_str(r#"{"Product": "Tea", "Revenue": 120.5, "Active": true, "Note": null}"#)
                .unwrap();
        assert_eq!(row.get("Product"), Some(&CellValue::from("Tea")));
        assert_eq!(row.get("Revenue"), Some(&CellValue::Number(120.5)));
        assert_eq!(row.get("Active"), Some(&CellValue::Bool(true)));
        assert_eq!(row.get("Note"), Some(&CellValue::Null));
    }
}
