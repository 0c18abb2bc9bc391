//! Forward pass timing.

use std::time::{Duration, Instant};

use anyhow::{ensure, Result};
use burn::prelude::*;
use dilated_vgg_backbone::BasenetConfig;
use serde::Serialize;

/// Timings of repeated forward passes.
#[derive(Debug, Clone)]
pub struct BenchReport {
    pub iterations: usize,
    pub total: Duration,
    pub per_iteration: Vec<Duration>,
}

impl BenchReport {
    /// Forward passes per second.
    pub fn throughput(&self) -> f64 {
        let secs = self.total.as_secs_f64();
        if secs > 0.0 {
            self.iterations as f64 / secs
        } else {
            0.0
        }
    }

    /// Mean time of one forward pass.
    pub fn mean(&self) -> Duration {
        match u32::try_from(self.iterations) {
            Ok(n) if n > 0 => self.total / n,
            _ => Duration::ZERO,
        }
    }

    /// Timings in seconds, for `--json` output.
    pub fn summary(&self) -> BenchSummary {
        BenchSummary {
            iterations: self.iterations,
            total_secs: self.total.as_secs_f64(),
            mean_secs: self.mean().as_secs_f64(),
            throughput: self.throughput(),
            per_iteration_secs: self
                .per_iteration
                .iter()
                .map(Duration::as_secs_f64)
                .collect(),
        }
    }
}

/// Serializable view of a [`BenchReport`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchSummary {
    pub iterations: usize,
    pub total_secs: f64,
    pub mean_secs: f64,
    /// Forward passes per second.
    pub throughput: f64,
    pub per_iteration_secs: Vec<f64>,
}

/// Times `iterations` forward passes of a freshly initialized backbone on zero input.
///
/// # Errors
///
/// Returns an error if `iterations` is zero, or the model cannot be built or run.
pub fn run_bench<B: Backend>(
    config: &BasenetConfig,
    input: [usize; 4],
    iterations: usize,
    device: &B::Device,
) -> Result<BenchReport> {
    ensure!(iterations > 0, "iterations must be at least 1");

    let model = config.init::<B>(device)?;
    tracing::info!(?input, iterations, "starting benchmark");

    let start = Instant::now();
    let mut per_iteration = Vec::with_capacity(iterations);
    for _ in 0..iterations {
        let start_ = Instant::now();
        let x = Tensor::<B, 4>::zeros(input, device);
        let (y, _) = model.forward(x)?;
        // Reading the result back waits for asynchronous backends.
        let _ = y.into_data();
        per_iteration.push(start_.elapsed());
    }

    Ok(BenchReport {
        iterations,
        total: start.elapsed(),
        per_iteration,
    })
}

#[cfg(test)]
mod tests {
    use burn::backend::NdArray;

    use super::*;

    #[test]
    fn run_bench_records_each_iteration() {
        let config = BasenetConfig::vgg16().with_fatness(1);
        let report = run_bench::<NdArray>(&config, [1, 3, 16, 16], 3, &Default::default()).unwrap();

        assert_eq!(report.iterations, 3);
        assert_eq!(report.per_iteration.len(), 3);
        assert!(report.total >= report.per_iteration.iter().sum::<Duration>());
    }

    #[test]
    fn run_bench_rejects_zero_iterations() {
        let config = BasenetConfig::vgg16().with_fatness(1);
        assert!(run_bench::<NdArray>(&config, [1, 3, 16, 16], 0, &Default::default()).is_err());
    }

    #[test]
    fn throughput_and_mean_handle_empty_reports() {
        let report = BenchReport {
            iterations: 0,
            total: Duration::ZERO,
            per_iteration: Vec::new(),
        };
        assert_eq!(report.throughput(), 0.0);
        assert_eq!(report.mean(), Duration::ZERO);

        let report = BenchReport {
            iterations: 4,
            total: Duration::from_secs(2),
            per_iteration: vec![Duration::from_millis(500); 4],
        };
        assert_eq!(report.throughput(), 2.0);
        assert_eq!(report.mean(), Duration::from_millis(500));
    }

    #[test]
    fn summary_reports_seconds() {
        let report = BenchReport {
            iterations: 2,
            total: Duration::from_millis(500),
            per_iteration: vec![Duration::from_millis(200), Duration::from_millis(250)],
        };

        let json = serde_json::to_value(report.summary()).unwrap();
        assert_eq!(json["iterations"], 2);
        assert_eq!(json["total_secs"], 0.5);
        assert_eq!(json["mean_secs"], 0.25);
        assert_eq!(json["throughput"], 4.0);
        assert_eq!(json["per_iteration_secs"], serde_json::json!([0.2, 0.25]));
    }
}
