use crate::core::runner::{InProcessRunner, ProcessRunner};
use crate::domain::model::{BenchResult, FixtureKind, OutputMode, Schedule, VerifyOutcome};
use crate::domain::ports::Runner;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;
use std::sync::Arc;

/// A reference program and the candidate that must reproduce its output.
pub struct RunnerPair {
    pub name: String,
    pub reference: Box<dyn Runner>,
    pub candidate: Box<dyn Runner>,
}

impl RunnerPair {
    pub fn new(
        name: impl Into<String>,
        reference: impl Runner + 'static,
        candidate: impl Runner + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            reference: Box::new(reference),
            candidate: Box::new(candidate),
        }
    }

    /// 內建 kernel：循序版本當 reference，平行版本當 candidate
    pub fn built_in(kind: FixtureKind, pool: Option<Arc<rayon::ThreadPool>>) -> Self {
        let mut candidate = InProcessRunner::new(kind, Schedule::ParallelFor);
        if let Some(pool) = pool {
            candidate = candidate.with_pool(pool);
        }
        Self::new(
            kind.name(),
            InProcessRunner::new(kind, Schedule::Sequential),
            candidate,
        )
    }

    pub fn external(name: impl Into<String>, reference: &str, candidate: &str) -> Self {
        Self::new(
            name,
            ProcessRunner::new(reference),
            ProcessRunner::new(candidate),
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct VerifySummary {
    pub outcomes: Vec<VerifyOutcome>,
}

impl VerifySummary {
    pub fn all_passed(&self) -> bool {
        self.outcomes.iter().all(|o| o.passed)
    }

    pub fn failed(&self) -> impl Iterator<Item = &VerifyOutcome> {
        self.outcomes.iter().filter(|o| !o.passed)
    }

    pub fn final_line(&self) -> &'static str {
        if self.all_passed() {
            "Passed all tests"
        } else {
            "Failed one or more tests"
        }
    }
}

pub struct Harness {
    monitor: SystemMonitor,
}

impl Harness {
    pub fn new() -> Self {
        Self::new_with_monitoring(false)
    }

    pub fn new_with_monitoring(monitor_enabled: bool) -> Self {
        Self {
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    /// Run every pair once in print mode and compare stdout byte for byte.
    pub async fn verify(&self, pairs: &[RunnerPair], size: usize) -> VerifySummary {
        tracing::info!("🔍 Verifying {} pair(s) at size {}", pairs.len(), size);
        self.monitor.log_stats("Verify start");

        let mut summary = VerifySummary::default();

        for pair in pairs {
            let reference = capture(pair.reference.as_ref(), size).await;
            let candidate = capture(pair.candidate.as_ref(), size).await;
            let passed = matches!((&reference, &candidate), (Ok(r), Ok(c)) if r == c);

            let reference_output = reference.unwrap_or_else(|e| format!("<error: {}>", e));
            let candidate_output = candidate.unwrap_or_else(|e| format!("<error: {}>", e));

            if passed {
                tracing::info!("✅ {} passed", pair.name);
                println!(
                    "Passed test:\n{}\n{}\n",
                    pair.reference.name(),
                    pair.candidate.name()
                );
                println!("{}", reference_output);
            } else {
                tracing::warn!("❌ {} failed", pair.name);
                println!(
                    "Failed test:\n{}:\n{}\n\n{}:\n{}\n\n",
                    pair.reference.name(),
                    reference_output,
                    pair.candidate.name(),
                    candidate_output
                );
            }

            summary.outcomes.push(VerifyOutcome {
                fixture: pair.name.clone(),
                passed,
                reference_output,
                candidate_output,
            });
        }

        self.monitor.log_stats("Verify done");
        println!("\n\n{}", summary.final_line());
        summary
    }

    /// Average the reported loop time of reference and candidate per size.
    pub async fn bench(
        &self,
        pairs: &[RunnerPair],
        sizes: &[usize],
        repetitions: usize,
    ) -> Result<Vec<BenchResult>> {
        tracing::info!(
            "⏱️ Benchmarking {} pair(s) over sizes {:?}, {} repetition(s)",
            pairs.len(),
            sizes,
            repetitions
        );
        self.monitor.log_stats("Bench start");

        let mut results = Vec::with_capacity(pairs.len() * sizes.len());

        for pair in pairs {
            for &size in sizes {
                let mut reference_total: u128 = 0;
                let mut candidate_total: u128 = 0;

                // 交替執行，避免系統負載只偏向其中一方
                for _ in 0..repetitions {
                    reference_total += u128::from(time_once(pair.reference.as_ref(), size).await?);
                    candidate_total += u128::from(time_once(pair.candidate.as_ref(), size).await?);
                }

                let runs = repetitions.max(1) as f64;
                let result = BenchResult {
                    fixture: pair.name.clone(),
                    size,
                    reference_avg_us: reference_total as f64 / runs,
                    candidate_avg_us: candidate_total as f64 / runs,
                };
                tracing::debug!("{:?}", result);
                results.push(result);
            }
            self.monitor.log_stats(&format!("Bench {}", pair.name));
        }

        self.monitor.log_final_stats();
        Ok(results)
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

async fn capture(runner: &dyn Runner, size: usize) -> Result<String> {
    let output = runner.run(size, OutputMode::Print).await?;
    Ok(output.text().into_owned())
}

async fn time_once(runner: &dyn Runner, size: usize) -> Result<u64> {
    runner.run(size, OutputMode::Time).await?.timing_micros()
}
