//! Classification metrics and the evaluation report.
//!
//! [`ClassificationReport`] mirrors the usual per-class precision / recall /
//! F1 / support table plus accuracy and macro and weighted averages.
//! Precision and recall are 0 when their denominator is 0.

use crate::error::PipelineError;
use chrono::Utc;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fs;
use std::path::Path;
use tracing::info;

/// One row of the report.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    #[serde(rename = "f1-score")]
    pub f1_score: f64,
    pub support: usize,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

fn f1(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    }
}

/// Fraction of predictions equal to the truth.
pub fn accuracy(y_true: &[usize], y_pred: &[usize]) -> f64 {
    let correct = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
    ratio(correct, y_true.len())
}

/// Per-class metrics for the classes seen in `y_true` or `y_pred`.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassificationReport {
    classes: Vec<(String, ClassMetrics)>,
    accuracy: f64,
    macro_avg: ClassMetrics,
    weighted_avg: ClassMetrics,
}

impl ClassificationReport {
    /// Build the report. `class_names[i]` names class index `i`; indices
    /// without a name are reported by number.
    pub fn from_predictions(y_true: &[usize], y_pred: &[usize], class_names: &[String]) -> Self {
        let n_classes = y_true
            .iter()
            .chain(y_pred)
            .copied()
            .max()
            .map_or(0, |m| m + 1);
        let mut tp = vec![0usize; n_classes];
        let mut predicted = vec![0usize; n_classes];
        let mut support = vec![0usize; n_classes];
        for (&t, &p) in y_true.iter().zip(y_pred) {
            support[t] += 1;
            predicted[p] += 1;
            if t == p {
                tp[t] += 1;
            }
        }

        let classes: Vec<(String, ClassMetrics)> = (0..n_classes)
            .filter(|&c| support[c] > 0 || predicted[c] > 0)
            .map(|c| {
                let precision = ratio(tp[c], predicted[c]);
                let recall = ratio(tp[c], support[c]);
                let name = class_names
                    .get(c)
                    .cloned()
                    .unwrap_or_else(|| c.to_string());
                (
                    name,
                    ClassMetrics {
                        precision,
                        recall,
                        f1_score: f1(precision, recall),
                        support: support[c],
                    },
                )
            })
            .collect();

        let total: usize = classes.iter().map(|(_, m)| m.support).sum();
        let k = classes.len().max(1) as f64;
        let mut macro_avg = ClassMetrics {
            support: total,
            ..ClassMetrics::default()
        };
        let mut weighted_avg = macro_avg;
        for (_, m) in &classes {
            macro_avg.precision += m.precision / k;
            macro_avg.recall += m.recall / k;
            macro_avg.f1_score += m.f1_score / k;
            let w = ratio(m.support, total);
            weighted_avg.precision += m.precision * w;
            weighted_avg.recall += m.recall * w;
            weighted_avg.f1_score += m.f1_score * w;
        }

        Self {
            classes,
            accuracy: accuracy(y_true, y_pred),
            macro_avg,
            weighted_avg,
        }
    }

    pub fn classes(&self) -> &[(String, ClassMetrics)] {
        &self.classes
    }

    pub fn class(&self, name: &str) -> Option<&ClassMetrics> {
        self.classes.iter().find(|(n, _)| n == name).map(|(_, m)| m)
    }

    pub fn accuracy(&self) -> f64 {
        self.accuracy
    }

    pub fn macro_avg(&self) -> &ClassMetrics {
        &self.macro_avg
    }

    pub fn weighted_avg(&self) -> &ClassMetrics {
        &self.weighted_avg
    }

    pub fn f1_weighted(&self) -> f64 {
        self.weighted_avg.f1_score
    }
}

impl Serialize for ClassificationReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.classes.len() + 4))?;
        for (name, metrics) in &self.classes {
            map.serialize_entry(name, metrics)?;
        }
        map.serialize_entry("accuracy", &self.accuracy)?;
        map.serialize_entry("macro avg", &self.macro_avg)?;
        map.serialize_entry("weighted avg", &self.weighted_avg)?;
        map.serialize_entry("f1_weighted", &self.f1_weighted())?;
        map.end()
    }
}

/// Train and test reports of the selected model.
#[derive(Clone, Debug, Serialize)]
pub struct EvaluationReport {
    pub timestamp: String,
    pub train_report: ClassificationReport,
    pub test_report: ClassificationReport,
}

impl EvaluationReport {
    /// Stamp the two reports with the current time.
    pub fn new(train_report: ClassificationReport, test_report: ClassificationReport) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            train_report,
            test_report,
        }
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
        fs::write(path, text).map_err(|source| PipelineError::io(path, source))?;
        info!(path = %path.display(), "classification report saved");
        Ok(())
    }
}
