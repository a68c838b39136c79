//! Compare two CSV files column by column and print the drift table.
//!
//! ```bash
//! cargo run --example drift_check -- train.csv test.csv [threshold]
//! ```

use netsentry::dataset::Dataset;
use netsentry::validation::detect_drift;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let (base, current) = match (args.first(), args.get(1)) {
        (Some(base), Some(current)) => (base, current),
        _ => {
            eprintln!("usage: drift_check <base.csv> <current.csv> [threshold]");
            return ExitCode::FAILURE;
        }
    };
    let threshold = args.get(2).and_then(|t| t.parse().ok()).unwrap_or(0.05);

    let result = Dataset::read_csv(base)
        .and_then(|b| Dataset::read_csv(current).map(|c| (b, c)))
        .map_err(netsentry::PipelineError::from)
        .and_then(|(b, c)| detect_drift(&b, &c, threshold));

    match result {
        Ok(report) => {
            println!("{:<32} {:>10} {:>7}", "column", "p-value", "drift");
            for (name, drift) in report.columns() {
                println!("{name:<32} {:>10.4} {:>7}", drift.p_value, drift.drift_status);
            }
            println!("overall: {}", if report.status() { "no drift" } else { "drift detected" });
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
