//! JSON rendering for statistics tables

use serde::{Deserialize, Serialize};

/// A single table cell
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonValue {
    Integer(u64),
    Real(f64),
}

/// A statistics table as JSON: column order plus one object per row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonTable {
    /// Report shape that produced the table (e.g. "per-block")
    pub shape: String,
    pub columns: Vec<String>,
    pub rows: Vec<serde_json::Map<String, serde_json::Value>>,
}

impl JsonTable {
    pub fn new(shape: &str, columns: &[&str]) -> Self {
        Self {
            shape: shape.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row; values pair up with `columns` in order
    pub fn add_row(&mut self, values: &[JsonValue]) {
        debug_assert_eq!(values.len(), self.columns.len());
        let row = self
            .columns
            .iter()
            .zip(values)
            .map(|(column, value)| {
                let json = match *value {
                    JsonValue::Integer(i) => serde_json::Value::from(i),
                    JsonValue::Real(r) => serde_json::Value::from(r),
                };
                (column.clone(), json)
            })
            .collect();
        self.rows.push(row);
    }

    /// Pretty-printed JSON document
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
