//! Typed columns.
//!
//! Every column carries a [`ColumnKind`] that is inferred exactly once, when
//! the raw cells are first read. Downstream stages dispatch on the kind
//! instead of re-inspecting values.

use serde::{Deserialize, Serialize};

/// Cell tokens treated as missing when reading raw text.
pub const MISSING_TOKENS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "null", "NULL", "None"];

/// Returns `true` if a raw cell denotes a missing value.
pub fn is_missing_token(raw: &str) -> bool {
    MISSING_TOKENS.contains(&raw.trim())
}

/// Declared type of a column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnKind {
    /// Whole numbers.
    Integer,
    /// Floating point numbers.
    Float,
    /// `True` / `False` flags.
    Boolean,
    /// Free-form strings.
    Categorical,
}

impl ColumnKind {
    /// Integer and float columns are the numeric model inputs.
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnKind::Integer | ColumnKind::Float)
    }

    pub fn name(self) -> &'static str {
        match self {
            ColumnKind::Integer => "integer",
            ColumnKind::Float => "float",
            ColumnKind::Boolean => "boolean",
            ColumnKind::Categorical => "categorical",
        }
    }
}

impl std::fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Column storage. Numeric columns use `NaN` as the missing marker.
#[derive(Clone, Debug, PartialEq)]
pub enum ColumnValues {
    Numeric(Vec<f64>),
    Boolean(Vec<Option<bool>>),
    Categorical(Vec<Option<String>>),
}

/// A named, homogeneously typed column.
#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    name: String,
    kind: ColumnKind,
    values: ColumnValues,
}

impl Column {
    /// Float column; `NaN` marks missing cells.
    pub fn float(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            kind: ColumnKind::Float,
            values: ColumnValues::Numeric(values),
        }
    }

    /// Integer column.
    pub fn integer(name: impl Into<String>, values: Vec<Option<i64>>) -> Self {
        let values = values
            .into_iter()
            .map(|v| v.map_or(f64::NAN, |v| v as f64))
            .collect();
        Self {
            name: name.into(),
            kind: ColumnKind::Integer,
            values: ColumnValues::Numeric(values),
        }
    }

    pub fn boolean(name: impl Into<String>, values: Vec<Option<bool>>) -> Self {
        Self {
            name: name.into(),
            kind: ColumnKind::Boolean,
            values: ColumnValues::Boolean(values),
        }
    }

    pub fn categorical<S: Into<String>>(
        name: impl Into<String>,
        values: impl IntoIterator<Item = Option<S>>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: ColumnKind::Categorical,
            values: ColumnValues::Categorical(
                values.into_iter().map(|v| v.map(Into::into)).collect(),
            ),
        }
    }

    /// Build a column from raw text cells, inferring its kind.
    ///
    /// Integer wins over float, float over boolean, and anything else is
    /// categorical. A column with no present values is a float column of `NaN`s.
    pub fn infer(name: impl Into<String>, raw: Vec<Option<String>>) -> Self {
        let name = name.into();
        let present: Vec<&str> = raw.iter().flatten().map(|s| s.trim()).collect();

        if present.iter().all(|s| s.parse::<i64>().is_ok()) {
            let values = raw
                .iter()
                .map(|c| c.as_deref().and_then(|s| s.trim().parse::<i64>().ok()))
                .collect::<Vec<_>>();
            if present.is_empty() {
                return Self::float(name, vec![f64::NAN; raw.len()]);
            }
            return Self::integer(name, values);
        }

        if present.iter().all(|s| s.parse::<f64>().is_ok()) {
            let values = raw
                .iter()
                .map(|c| {
                    c.as_deref()
                        .and_then(|s| s.trim().parse::<f64>().ok())
                        .unwrap_or(f64::NAN)
                })
                .collect();
            return Self::float(name, values);
        }

        if present.iter().all(|s| parse_bool(s).is_some()) {
            let values = raw
                .iter()
                .map(|c| c.as_deref().and_then(parse_bool))
                .collect();
            return Self::boolean(name, values);
        }

        Self::categorical(name, raw)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ColumnKind {
        self.kind
    }

    pub fn values(&self) -> &ColumnValues {
        &self.values
    }

    pub fn len(&self) -> usize {
        match &self.values {
            ColumnValues::Numeric(v) => v.len(),
            ColumnValues::Boolean(v) => v.len(),
            ColumnValues::Categorical(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_missing(&self, row: usize) -> bool {
        match &self.values {
            ColumnValues::Numeric(v) => v[row].is_nan(),
            ColumnValues::Boolean(v) => v[row].is_none(),
            ColumnValues::Categorical(v) => v[row].is_none(),
        }
    }

    pub fn missing_count(&self) -> usize {
        (0..self.len()).filter(|&row| self.is_missing(row)).count()
    }

    /// Numeric cells, including `NaN`s. `None` for non-numeric columns.
    pub fn as_f64(&self) -> Option<&[f64]> {
        match &self.values {
            ColumnValues::Numeric(v) => Some(v),
            _ => None,
        }
    }

    /// Text rendering of one cell, `None` when missing.
    ///
    /// Floats always carry a fractional part so a written column reads back
    /// with the same kind.
    pub fn render(&self, row: usize) -> Option<String> {
        match &self.values {
            ColumnValues::Numeric(v) => {
                let x = v[row];
                if x.is_nan() {
                    None
                } else if self.kind == ColumnKind::Integer && x.fract() == 0.0 {
                    Some(format!("{}", x as i64))
                } else if x.is_finite() && x.fract() == 0.0 && x.abs() < 1e15 {
                    Some(format!("{x:.1}"))
                } else {
                    Some(format!("{x}"))
                }
            }
            ColumnValues::Boolean(v) => v[row].map(|b| if b { "True" } else { "False" }.into()),
            ColumnValues::Categorical(v) => v[row].clone(),
        }
    }

    /// Rows picked by index, in the given order.
    pub fn select(&self, rows: &[usize]) -> Column {
        let values = match &self.values {
            ColumnValues::Numeric(v) => ColumnValues::Numeric(rows.iter().map(|&r| v[r]).collect()),
            ColumnValues::Boolean(v) => ColumnValues::Boolean(rows.iter().map(|&r| v[r]).collect()),
            ColumnValues::Categorical(v) => {
                ColumnValues::Categorical(rows.iter().map(|&r| v[r].clone()).collect())
            }
        };
        Column {
            name: self.name.clone(),
            kind: self.kind,
            values,
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim() {
        "True" | "true" | "TRUE" => Some(true),
        "False" | "false" | "FALSE" => Some(false),
        _ => None,
    }
}
