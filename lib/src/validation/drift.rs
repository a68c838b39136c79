//! Train/test drift detection.

use super::error::ValidationError;
use super::ks::ks_column;
use crate::config::check_open_unit;
use crate::dataset::Dataset;
use crate::error::PipelineError;
use rayon::prelude::*;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Test outcome for one column.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColumnDrift {
    pub p_value: f64,
    /// `true` when the p-value fell below the threshold.
    pub drift_status: bool,
}

/// Per-column drift results, in base column order.
///
/// Serializes as `{<column>: {p_value, drift_status}}`.
#[derive(Clone, Debug, PartialEq)]
pub struct DriftReport {
    threshold: f64,
    columns: Vec<(String, ColumnDrift)>,
}

impl DriftReport {
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn columns(&self) -> &[(String, ColumnDrift)] {
        &self.columns
    }

    pub fn get(&self, column: &str) -> Option<&ColumnDrift> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, drift)| drift)
    }

    /// `true` iff no column drifted.
    pub fn status(&self) -> bool {
        self.columns.iter().all(|(_, d)| !d.drift_status)
    }

    pub fn drifted_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|(_, d)| d.drift_status)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Persist as YAML, replacing any previous report.
    pub fn write_yaml<P: AsRef<Path>>(&self, path: P) -> Result<(), PipelineError> {
        let path = path.as_ref();
        let text = serde_yaml::to_string(self).map_err(|source| PipelineError::Report {
            path: path.to_path_buf(),
            source,
        })?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| PipelineError::io(parent, source))?;
        }
        fs::write(path, text).map_err(|source| PipelineError::io(path, source))
    }
}

impl Serialize for DriftReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, drift) in &self.columns {
            map.serialize_entry(name, drift)?;
        }
        map.end()
    }
}

/// Compare every column of `base` with the same column of `current`.
///
/// Columns only present in `current` are ignored. Tests run in parallel; the
/// report keeps base column order.
pub fn detect_drift(
    base: &Dataset,
    current: &Dataset,
    threshold: f64,
) -> Result<DriftReport, PipelineError> {
    check_open_unit("validation.drift_threshold", threshold)?;

    let pairs = base
        .columns()
        .iter()
        .map(|column| {
            current
                .column(column.name())
                .map(|other| (column, other))
                .ok_or_else(|| ValidationError::MissingColumn {
                    dataset: "current".into(),
                    column: column.name().to_string(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let columns = pairs
        .par_iter()
        .map(|(base_col, current_col)| -> Result<_, PipelineError> {
            let result = ks_column(base_col, current_col)?;
            let drift = ColumnDrift {
                p_value: result.p_value,
                drift_status: result.p_value < threshold,
            };
            debug!(
                column = base_col.name(),
                statistic = result.statistic,
                p_value = result.p_value,
                drifted = drift.drift_status,
                "ks test"
            );
            Ok((base_col.name().to_string(), drift))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let report = DriftReport { threshold, columns };
    info!(
        columns = report.columns.len(),
        drifted = report.drifted_columns().len(),
        threshold,
        "drift detection finished"
    );
    Ok(report)
}

/// Write `report` to `path` as YAML.
pub fn write_drift_report<P: AsRef<Path>>(
    report: &DriftReport,
    path: P,
) -> Result<(), PipelineError> {
    report.write_yaml(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;
    use crate::dataset::Column;
    use serde_yaml::Value;

    fn dataset(columns: Vec<Column>) -> Dataset {
        Dataset::new(columns).unwrap()
    }

    #[test]
    fn test_identical_datasets_do_not_drift() {
        let ds = dataset(vec![
            Column::float("a", vec![0.1, 0.5, 0.9, 1.3]),
            Column::integer("b", vec![Some(1), Some(2), None, Some(4)]),
        ]);
        let report = detect_drift(&ds, &ds, 0.05).unwrap();

        assert!(report.status());
        for (_, drift) in report.columns() {
            assert!((drift.p_value - 1.0).abs() < 1e-12);
            assert!(!drift.drift_status);
        }
    }

    #[test]
    fn test_report_keeps_base_order_and_ignores_extra_columns() {
        let base = dataset(vec![
            Column::float("z", vec![1.0, 2.0]),
            Column::float("a", vec![1.0, 2.0]),
        ]);
        let current = dataset(vec![
            Column::float("a", vec![1.0, 2.0]),
            Column::float("extra", vec![5.0, 6.0]),
            Column::float("z", vec![1.0, 2.0]),
        ]);
        let report = detect_drift(&base, &current, 0.05).unwrap();
        let names: Vec<&str> = report.columns().iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["z", "a"]);
    }

    #[test]
    fn test_shifted_column_drifts() {
        let base: Vec<f64> = (0..60).map(f64::from).collect();
        let shifted: Vec<f64> = (0..60).map(|x| f64::from(x) + 45.0).collect();
        let report = detect_drift(
            &dataset(vec![Column::float("x", base.clone()), Column::float("y", base.clone())]),
            &dataset(vec![Column::float("x", shifted), Column::float("y", base)]),
            0.05,
        )
        .unwrap();

        assert!(!report.status());
        assert_eq!(report.drifted_columns(), vec!["x"]);
        assert!(report.get("x").unwrap().p_value < 0.05);
    }

    #[test]
    fn test_missing_base_column_is_fatal() {
        let base = dataset(vec![Column::float("a", vec![1.0])]);
        let current = dataset(vec![Column::float("b", vec![1.0])]);
        let result = detect_drift(&base, &current, 0.05);
        assert!(matches!(
            result,
            Err(PipelineError::Validation(ValidationError::MissingColumn { .. }))
        ));
    }

    #[test]
    fn test_threshold_must_be_probability() {
        let ds = dataset(vec![Column::float("a", vec![1.0])]);
        for threshold in [0.0, 1.0, -0.5, 2.0] {
            assert!(matches!(
                detect_drift(&ds, &ds, threshold),
                Err(PipelineError::Config(ConfigError::InvalidValue { .. }))
            ));
        }
    }

    #[test]
    fn test_write_report_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drift").join("report.yaml");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "stale: true\n").unwrap();

        let ds = dataset(vec![
            Column::float("b", vec![1.0, 2.0]),
            Column::float("a", vec![1.0, 2.0]),
        ]);
        let report = detect_drift(&ds, &ds, 0.05).unwrap();
        write_drift_report(&report, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(!text.contains("stale"));
        assert!(text.find("b:").unwrap() < text.find("a:").unwrap());

        let doc: Value = serde_yaml::from_str(&text).unwrap();
        assert_eq!(doc["a"]["drift_status"], Value::Bool(false));
        assert_eq!(doc["a"]["p_value"].as_f64(), Some(1.0));
    }
}
