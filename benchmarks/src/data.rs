use netsentry::dataset::{Column, Dataset};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Generator for tables shaped like the phishing/intrusion data: ternary
/// integer features, one continuous feature, a categorical protocol and a
/// `Result` label in {-1, 1}.
#[derive(Clone, Debug)]
pub struct SyntheticTraffic {
    pub n_rows: usize,
    pub n_features: usize,
    /// Added to the continuous feature; non-zero values produce drift.
    pub shift: f64,
    /// Fraction of missing cells in the continuous feature.
    pub missing_rate: f64,
    pub seed: u64,
}

impl SyntheticTraffic {
    pub fn new(n_rows: usize, n_features: usize) -> Self {
        Self {
            n_rows,
            n_features,
            shift: 0.0,
            missing_rate: 0.05,
            seed: 42,
        }
    }

    pub fn shift(mut self, shift: f64) -> Self {
        self.shift = shift;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn generate(&self) -> Dataset {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut ternary: Vec<Vec<Option<i64>>> = vec![Vec::with_capacity(self.n_rows); self.n_features];
        let mut duration = Vec::with_capacity(self.n_rows);
        let mut protocol = Vec::with_capacity(self.n_rows);
        let mut label = Vec::with_capacity(self.n_rows);

        for _ in 0..self.n_rows {
            let mut score = 0i64;
            for column in ternary.iter_mut() {
                let v = rng.gen_range(-1..=1);
                score += v;
                column.push(Some(v));
            }
            let d: f64 = rng.gen_range(0.0..100.0) + self.shift;
            duration.push(if rng.gen_bool(self.missing_rate) { f64::NAN } else { d });
            protocol.push(Some(if rng.gen_bool(0.7) { "tcp" } else { "udp" }));
            label.push(Some(if score >= 0 { 1 } else { -1 }));
        }

        let mut columns: Vec<Column> = ternary
            .into_iter()
            .enumerate()
            .map(|(i, values)| Column::integer(format!("f{i}"), values))
            .collect();
        columns.push(Column::float("duration", duration));
        columns.push(Column::categorical("protocol", protocol));
        columns.push(Column::integer("Result", label));
        // names are unique and lengths equal by construction
        Dataset::new(columns).unwrap_or_default()
    }
}
