//! Two-sample Kolmogorov-Smirnov test.
//!
//! The statistic is computed on an integer lattice: with `n` base and `m`
//! current observations, `D = max |i*m - j*n| / (n*m)` over all distinct
//! observed values, where `i` and `j` count the observations `<= x` on each
//! side. Working in integers keeps ties exact.
//!
//! The two-sided p-value `P(D' >= D)` is exact for small samples
//! (`n * m <= EXACT_LIMIT`) and falls back to the asymptotic Kolmogorov
//! distribution otherwise.

use super::error::StatisticalError;
use crate::dataset::{Column, ColumnValues};
use std::collections::BTreeSet;

/// Largest `n * m` for which the exact permutation distribution is used.
pub const EXACT_LIMIT: usize = 10_000;

/// Outcome of a two-sample test.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KsResult {
    pub statistic: f64,
    pub p_value: f64,
}

/// Run the test on two raw samples. `NaN`s are dropped first.
///
/// Returns `None` when either sample is empty after dropping.
pub fn ks_2samp(base: &[f64], current: &[f64]) -> Option<KsResult> {
    let a = sorted_present(base);
    let b = sorted_present(current);
    if a.is_empty() || b.is_empty() {
        return None;
    }

    let (n, m) = (a.len(), b.len());
    let d_num = lattice_statistic(&a, &b);
    let statistic = d_num as f64 / (n as f64 * m as f64);

    let p_value = if d_num == 0 {
        1.0
    } else if n.saturating_mul(m) <= EXACT_LIMIT {
        exact_p_value(n, m, d_num)
    } else {
        let en = ((n * m) as f64 / (n + m) as f64).sqrt();
        kolmogorov_survival(statistic * en)
    };

    Some(KsResult { statistic, p_value })
}

/// Test one column of the base dataset against the same column of the
/// current dataset.
///
/// Numeric columns compare their values and booleans compare as 0/1.
/// Categorical columns compare the ranks of their values within the sorted
/// union of both columns' categories.
pub fn ks_column(base: &Column, current: &Column) -> Result<KsResult, StatisticalError> {
    let (a, b) = comparable_samples(base, current)?;
    ks_2samp(&a, &b).ok_or_else(|| StatisticalError::EmptySample {
        column: base.name().to_string(),
        side: if a.iter().all(|x| x.is_nan()) {
            "base"
        } else {
            "current"
        },
    })
}

fn comparable_samples(
    base: &Column,
    current: &Column,
) -> Result<(Vec<f64>, Vec<f64>), StatisticalError> {
    match (base.values(), current.values()) {
        (ColumnValues::Categorical(a), ColumnValues::Categorical(b)) => {
            let categories: BTreeSet<&str> = a.iter().chain(b).flatten().map(String::as_str).collect();
            let categories: Vec<&str> = categories.into_iter().collect();
            let rank = |cell: &Option<String>| {
                cell.as_deref()
                    .and_then(|v| categories.binary_search(&v).ok())
                    .map_or(f64::NAN, |r| r as f64)
            };
            Ok((a.iter().map(rank).collect(), b.iter().map(rank).collect()))
        }
        (ColumnValues::Categorical(_), _) | (_, ColumnValues::Categorical(_)) => {
            Err(StatisticalError::IncompatibleKinds {
                column: base.name().to_string(),
                base: base.kind(),
                current: current.kind(),
            })
        }
        (a, b) => Ok((numeric_view(a), numeric_view(b))),
    }
}

fn numeric_view(values: &ColumnValues) -> Vec<f64> {
    match values {
        ColumnValues::Numeric(v) => v.clone(),
        ColumnValues::Boolean(v) => v
            .iter()
            .map(|b| b.map_or(f64::NAN, |b| if b { 1.0 } else { 0.0 }))
            .collect(),
        ColumnValues::Categorical(_) => Vec::new(),
    }
}

fn sorted_present(sample: &[f64]) -> Vec<f64> {
    let mut v: Vec<f64> = sample.iter().copied().filter(|x| !x.is_nan()).collect();
    v.sort_by(f64::total_cmp);
    v
}

/// `max |i*m - j*n|` over the distinct values of both sorted samples.
fn lattice_statistic(a: &[f64], b: &[f64]) -> u64 {
    let (n, m) = (a.len() as i64, b.len() as i64);
    let (mut i, mut j) = (0usize, 0usize);
    let mut d = 0u64;

    while i < a.len() && j < b.len() {
        let x = if a[i] <= b[j] { a[i] } else { b[j] };
        while i < a.len() && a[i] <= x {
            i += 1;
        }
        while j < b.len() && b[j] <= x {
            j += 1;
        }
        d = d.max((i as i64 * m - j as i64 * n).unsigned_abs());
    }
    // Once one side is exhausted the gap only shrinks.
    d
}

/// Exact two-sided p-value.
///
/// Under the null every interleaving of the two samples is equally likely.
/// Walking the interleaving as a lattice path from `(0, 0)` to `(n, m)`, the
/// p-value is the probability that the path touches `|i*m - j*n| >= d_num`.
/// The walk is tracked as a probability, so no binomial coefficients are
/// formed.
fn exact_p_value(n: usize, m: usize, d_num: u64) -> f64 {
    let inside = |i: usize, j: usize| ((i * m) as i64 - (j * n) as i64).unsigned_abs() < d_num;
    let total = n + m;

    // prob[j] holds P(path reaches (i, j) without leaving the band).
    let mut prob = vec![0.0f64; m + 1];
    for i in 0..=n {
        for j in 0..=m {
            if i == 0 && j == 0 {
                prob[0] = 1.0;
                continue;
            }
            let from_a = if i > 0 {
                prob[j] * (n - i + 1) as f64 / (total - i + 1 - j) as f64
            } else {
                0.0
            };
            let from_b = if j > 0 {
                prob[j - 1] * (m - j + 1) as f64 / (total - i - j + 1) as f64
            } else {
                0.0
            };
            prob[j] = if inside(i, j) { from_a + from_b } else { 0.0 };
        }
    }

    (1.0 - prob[m]).clamp(0.0, 1.0)
}

/// Survival function of the Kolmogorov distribution,
/// `Q(λ) = 2 Σ (-1)^(k-1) exp(-2 k² λ²)`.
pub fn kolmogorov_survival(lambda: f64) -> f64 {
    // The series converges slowly below this point and Q is 1 to double precision.
    if lambda < 0.2 {
        return 1.0;
    }
    let mut sum = 0.0;
    for k in 1..=100 {
        let sign = if k % 2 == 1 { 1.0 } else { -1.0 };
        let term = sign * (-2.0 * f64::from(k).powi(2) * lambda.powi(2)).exp();
        sum += term;
        if term.abs() < 1e-12 {
            break;
        }
    }
    (2.0 * sum).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_identical_samples() {
        let a = [1.0, 2.0, 3.0, 4.0, 5.0];
        let r = ks_2samp(&a, &a).unwrap();
        assert_eq!(r.statistic, 0.0);
        assert_eq!(r.p_value, 1.0);
    }

    #[test]
    fn test_fully_separated_small_samples() {
        // Only 2 of the C(6, 3) = 20 interleavings reach D = 1.
        let r = ks_2samp(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]).unwrap();
        assert_relative_eq!(r.statistic, 1.0);
        assert_relative_eq!(r.p_value, 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_ties_are_counted_together() {
        let r = ks_2samp(&[1.0, 1.0, 2.0], &[1.0, 2.0, 2.0]).unwrap();
        assert_relative_eq!(r.statistic, 1.0 / 3.0, epsilon = 1e-12);
        assert!(r.p_value > 0.5);
    }

    #[test]
    fn test_nan_is_dropped() {
        let r = ks_2samp(&[1.0, f64::NAN, 2.0], &[1.0, 2.0]).unwrap();
        assert_eq!(r.statistic, 0.0);
        assert!(ks_2samp(&[f64::NAN], &[1.0]).is_none());
        assert!(ks_2samp(&[1.0], &[]).is_none());
    }

    #[test]
    fn test_exact_p_value_is_symmetric() {
        let a = [0.1, 0.4, 0.5, 0.9, 1.3];
        let b = [0.2, 0.3, 1.1, 1.2, 1.4, 1.5, 2.0];
        let ab = ks_2samp(&a, &b).unwrap();
        let ba = ks_2samp(&b, &a).unwrap();
        assert_relative_eq!(ab.statistic, ba.statistic);
        assert_relative_eq!(ab.p_value, ba.p_value, epsilon = 1e-12);
    }

    #[test]
    fn test_asymptotic_regime() {
        let a: Vec<f64> = (0..200).map(f64::from).collect();
        let same: Vec<f64> = (0..200).map(|x| f64::from(x) + 0.5).collect();
        let shifted: Vec<f64> = (0..200).map(|x| f64::from(x) + 100.0).collect();

        assert!(ks_2samp(&a, &same).unwrap().p_value > 0.99);
        let far = ks_2samp(&a, &shifted).unwrap();
        assert_relative_eq!(far.statistic, 0.5);
        assert!(far.p_value < 1e-10);
    }

    #[test]
    fn test_kolmogorov_survival_reference_points() {
        assert_eq!(kolmogorov_survival(0.0), 1.0);
        // Q(1.358) is the classic 5% critical value.
        assert_relative_eq!(kolmogorov_survival(1.358), 0.05, epsilon = 1e-3);
        assert!(kolmogorov_survival(3.0) < 1e-6);
    }

    #[test]
    fn test_categorical_columns_use_shared_ranks() {
        let base = Column::categorical("proto", [Some("tcp"), Some("udp"), None]);
        let current = Column::categorical("proto", [Some("udp"), Some("tcp"), Some("icmp")]);
        let r = ks_column(&base, &current).unwrap();
        assert!(r.statistic > 0.0);
        assert!(r.p_value <= 1.0);
    }

    #[test]
    fn test_boolean_against_integer() {
        let base = Column::boolean("flag", vec![Some(true), Some(false)]);
        let current = Column::integer("flag", vec![Some(1), Some(0)]);
        let r = ks_column(&base, &current).unwrap();
        assert_eq!(r.statistic, 0.0);
    }

    #[test]
    fn test_incompatible_kinds() {
        let base = Column::categorical("proto", [Some("tcp")]);
        let current = Column::float("proto", vec![1.0]);
        assert!(matches!(
            ks_column(&base, &current),
            Err(StatisticalError::IncompatibleKinds { .. })
        ));
    }

    #[test]
    fn test_empty_sample_names_side() {
        let base = Column::float("x", vec![1.0, 2.0]);
        let current = Column::float("x", vec![f64::NAN]);
        assert_eq!(
            ks_column(&base, &current),
            Err(StatisticalError::EmptySample {
                column: "x".into(),
                side: "current"
            })
        );
    }
}
