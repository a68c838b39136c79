//! Quick timing table for the drift and transformation stages on synthetic
//! data. Use `cargo bench -p benchmarks` for criterion measurements.

use benchmarks::{benchmark_with_warmup, BenchmarkStats, SyntheticTraffic};
use netsentry::preprocessing::build_pipeline;
use netsentry::validation::detect_drift;

fn row(name: &str, rows: usize, stats: &BenchmarkStats) {
    println!(
        "{name:<12} {rows:>8} {:>10.3} {:>10.3} {:>10.3} {:>10.3}",
        stats.mean_ms, stats.std_dev_ms, stats.median_ms, stats.p95_ms
    );
}

fn main() {
    println!(
        "{:<12} {:>8} {:>10} {:>10} {:>10} {:>10}",
        "stage", "rows", "mean ms", "std ms", "median ms", "p95 ms"
    );

    for rows in [1_000, 10_000, 50_000] {
        let base = SyntheticTraffic::new(rows, 30).generate();
        let current = SyntheticTraffic::new(rows / 4, 30).seed(7).shift(5.0).generate();

        let (_, stats) = benchmark_with_warmup(1, 5, || detect_drift(&base, &current, 0.05));
        row("drift", rows, &stats);

        let features = base.without_column("Result");
        let (_, stats) = benchmark_with_warmup(1, 5, || {
            build_pipeline(&features).and_then(|p| p.transform(&features))
        });
        row("transform", rows, &stats);
    }
}
