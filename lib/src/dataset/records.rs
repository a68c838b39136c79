//! Conversion between datasets and JSON documents.
//!
//! Documents are the unit of exchange with the document store. Key order is
//! preserved, so the first document fixes the column order; keys that only
//! appear later are appended.

use super::{is_missing_token, Column, ColumnValues, Dataset, DatasetError};
use serde_json::{Map, Number, Value};

/// One record as stored in a collection.
pub type Document = Map<String, Value>;

impl Dataset {
    /// Build a dataset from store documents, inferring column kinds.
    ///
    /// Absent keys and JSON `null` are missing cells.
    pub fn from_records(records: &[Document]) -> Result<Self, DatasetError> {
        let mut names: Vec<String> = Vec::new();
        for record in records {
            for key in record.keys() {
                if !names.iter().any(|n| n == key) {
                    names.push(key.clone());
                }
            }
        }

        let columns = names
            .into_iter()
            .map(|name| {
                let raw = records
                    .iter()
                    .map(|record| record.get(&name).and_then(cell_text))
                    .collect();
                Column::infer(name, raw)
            })
            .collect();
        Dataset::new(columns)
    }

    /// One document per row. Missing cells become `null`.
    pub fn to_records(&self) -> Vec<Document> {
        (0..self.n_rows())
            .map(|row| {
                self.columns()
                    .iter()
                    .map(|column| (column.name().to_string(), cell_value(column, row)))
                    .collect()
            })
            .collect()
    }
}

fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(if *b { "True" } else { "False" }.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if is_missing_token(s) => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn cell_value(column: &Column, row: usize) -> Value {
    match column.values() {
        ColumnValues::Numeric(v) => {
            let x = v[row];
            if x.is_nan() {
                Value::Null
            } else if column.kind() == super::ColumnKind::Integer {
                Value::from(x as i64)
            } else {
                Number::from_f64(x).map_or(Value::Null, Value::Number)
            }
        }
        ColumnValues::Boolean(v) => v[row].map_or(Value::Null, Value::Bool),
        ColumnValues::Categorical(v) => v[row].clone().map_or(Value::Null, Value::String),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::ColumnKind;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_from_records_keeps_key_order() {
        let records = vec![
            doc(json!({"_id": "a1", "SSLfinal_State": 1, "Result": -1})),
            doc(json!({"_id": "a2", "SSLfinal_State": null, "Result": 1, "extra": 0.5})),
        ];
        let ds = Dataset::from_records(&records).unwrap();

        assert_eq!(
            ds.column_names(),
            vec!["_id", "SSLfinal_State", "Result", "extra"]
        );
        assert_eq!(ds.column("SSLfinal_State").unwrap().kind(), ColumnKind::Integer);
        assert!(ds.column("SSLfinal_State").unwrap().is_missing(1));
        assert!(ds.column("extra").unwrap().is_missing(0));
    }

    #[test]
    fn test_to_records_uses_null_for_missing() {
        let ds = Dataset::new(vec![
            Column::integer("port", vec![Some(80), None]),
            Column::categorical("proto", [Some("tcp"), None]),
        ])
        .unwrap();

        let records = ds.to_records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["port"], json!(80));
        assert_eq!(records[1]["port"], Value::Null);
        assert_eq!(records[1]["proto"], Value::Null);
    }
}
