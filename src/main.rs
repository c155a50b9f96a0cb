use clap::Parser;
use parloop::config::Command;
use parloop::core::report::{BenchReport, ReportWriter};
use parloop::core::schedule::{build_pool, cpu_summary};
use parloop::domain::ports::HarnessSettings;
use parloop::utils::error::ErrorSeverity;
use parloop::utils::{logger, validation::Validate};
use parloop::{CliConfig, FixtureKind, Harness, HarnessConfig, LocalStorage, ParloopError, RunnerPair};
use std::process::ExitCode;
use std::sync::Arc;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.log_json {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("🚀 Starting parloop harness");

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(
                "❌ parloop failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            // 根據錯誤嚴重程度決定退出碼
            match e.severity() {
                ErrorSeverity::Low => ExitCode::SUCCESS,
                ErrorSeverity::Medium => ExitCode::from(2),
                ErrorSeverity::High => ExitCode::from(1),
                ErrorSeverity::Critical => ExitCode::from(3),
            }
        }
    }
}

async fn run(cli: CliConfig) -> Result<ExitCode, ParloopError> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("📁 Loading configuration from: {}", path);
            HarnessConfig::from_file(path)?
        }
        None => HarnessConfig::default(),
    };

    config.apply_cli(&cli);
    config.validate()?;
    tracing::info!("🏷️ Harness: {}", config.harness.name);
    tracing::debug!("Harness config: {:?}", config);

    if config.monitoring_enabled() {
        tracing::info!("🔍 System monitoring enabled");
    }

    match &cli.command {
        Command::List => {
            list_fixtures();
            Ok(ExitCode::SUCCESS)
        }
        Command::Verify(_) => {
            let (pairs, _) = build_pairs(&config)?;
            let harness = Harness::new_with_monitoring(config.monitoring_enabled());
            let summary = harness.verify(&pairs, config.verify_size()).await;

            if summary.all_passed() {
                Ok(ExitCode::SUCCESS)
            } else {
                for outcome in summary.failed() {
                    tracing::error!("❌ {} does not match its reference", outcome.fixture);
                }
                Ok(ExitCode::from(1))
            }
        }
        Command::Bench(_) => {
            let (pairs, threads) = build_pairs(&config)?;
            let harness = Harness::new_with_monitoring(config.monitoring_enabled());
            let results = harness
                .bench(&pairs, config.bench_sizes(), config.repetitions())
                .await?;

            let report = BenchReport::new(
                config.harness.name.as_str(),
                threads,
                config.repetitions(),
                results,
            );
            println!("📊 Average loop time per size (microseconds):");
            for line in report.summary_lines() {
                println!("{}", line);
            }

            let storage = LocalStorage::new(config.output_path());
            let writer = ReportWriter::new(storage.clone());
            for file in writer.write(&report, config.output_formats()).await? {
                println!("📁 Report saved to: {}", storage.full_path(&file).display());
            }

            Ok(ExitCode::SUCCESS)
        }
    }
}

/// External program pairs, listed or found in `[programs_dir]`, take
/// precedence over built-in kernels.
fn build_pairs(config: &HarnessConfig) -> Result<(Vec<RunnerPair>, usize), ParloopError> {
    let program_pairs = config.program_pairs()?;
    if !program_pairs.is_empty() {
        let pairs = program_pairs
            .iter()
            .map(|(name, reference, candidate)| RunnerPair::external(name, reference, candidate))
            .collect();
        return Ok((pairs, config.threads()));
    }

    let pool = if config.threads() > 0 {
        Some(Arc::new(build_pool(config.threads())?))
    } else {
        None
    };
    let threads = pool
        .as_ref()
        .map(|p| p.current_num_threads())
        .unwrap_or_else(rayon::current_num_threads);

    tracing::info!("🧵 {} with {} worker thread(s)", cpu_summary(), threads);

    let pairs = config
        .selected_fixtures()?
        .into_iter()
        .map(|kind| RunnerPair::built_in(kind, pool.clone()))
        .collect();
    Ok((pairs, threads))
}

fn list_fixtures() {
    println!("📋 Built-in fixtures:");
    for kind in FixtureKind::ALL {
        println!("  {:<16} {}", kind.name(), kind.description());
    }
}
