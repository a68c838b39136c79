//! Declarative column schema.
//!
//! ```yaml
//! columns:
//!   - having_IP_Address: int64
//!   - name: URL_Length
//!     type: int64
//!   - Result
//! ```
//!
//! Each entry is a single-key mapping `{<name>: <type>}`, an explicit
//! `{name, type}` mapping, or a bare column name. Only the number of entries
//! is enforced during validation; names and declared types are informational.

use crate::config::{read_document, ConfigError};
use serde_yaml::Value;
use std::path::Path;

/// One declared column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    pub declared_type: Option<String>,
}

/// Ordered list of declared columns.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<ColumnSpec>,
}

impl Schema {
    pub fn new(columns: Vec<ColumnSpec>) -> Self {
        Self { columns }
    }

    /// Read a schema file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = read_document(path)?;
        Self::parse(&text, &path.display().to_string())
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        Self::parse(text, "<memory>")
    }

    fn parse(text: &str, origin: &str) -> Result<Self, ConfigError> {
        let doc: Value = serde_yaml::from_str(text).map_err(|source| ConfigError::Malformed {
            origin: origin.to_string(),
            source,
        })?;
        let malformed = |reason: String| ConfigError::MalformedSchema {
            origin: origin.to_string(),
            reason,
        };

        let entries = doc
            .get("columns")
            .and_then(Value::as_sequence)
            .ok_or_else(|| malformed("expected a `columns` list".into()))?;

        let columns = entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| {
                parse_entry(entry).ok_or_else(|| malformed(format!("unreadable entry #{idx}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

fn parse_entry(entry: &Value) -> Option<ColumnSpec> {
    match entry {
        Value::String(name) => Some(ColumnSpec {
            name: name.clone(),
            declared_type: None,
        }),
        Value::Mapping(map) => {
            if let Some(name) = map.get("name").and_then(Value::as_str) {
                return Some(ColumnSpec {
                    name: name.to_string(),
                    declared_type: map.get("type").and_then(scalar_text),
                });
            }
            if map.len() != 1 {
                return None;
            }
            let (key, value) = map.iter().next()?;
            Some(ColumnSpec {
                name: scalar_text(key)?,
                declared_type: scalar_text(value),
            })
        }
        _ => None,
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all_entry_shapes() {
        let schema = Schema::from_yaml_str(
            "columns:\n  - having_IP_Address: int64\n  - name: URL_Length\n    type: float64\n  - Result\n",
        )
        .unwrap();

        assert_eq!(schema.len(), 3);
        assert_eq!(schema.names(), vec!["having_IP_Address", "URL_Length", "Result"]);
        assert_eq!(schema.columns()[0].declared_type.as_deref(), Some("int64"));
        assert_eq!(schema.columns()[1].declared_type.as_deref(), Some("float64"));
        assert_eq!(schema.columns()[2].declared_type, None);
    }

    #[test]
    fn test_missing_columns_key() {
        let result = Schema::from_yaml_str("numerical_columns: []\n");
        assert!(matches!(result, Err(ConfigError::MalformedSchema { .. })));
    }

    #[test]
    fn test_unparsable_yaml() {
        let result = Schema::from_yaml_str("columns: [\n");
        assert!(matches!(result, Err(ConfigError::Malformed { .. })));
    }

    #[test]
    fn test_bad_entry() {
        let result = Schema::from_yaml_str("columns:\n  - [1, 2]\n");
        assert!(matches!(result, Err(ConfigError::MalformedSchema { .. })));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            Schema::load("/no/such/schema.yaml"),
            Err(ConfigError::NotFound(_))
        ));
    }
}
