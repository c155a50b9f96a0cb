use crate::core::fixture::{write_output, FixtureProgram};
use crate::domain::model::{FixtureKind, OutputMode, RunOutput, Schedule};
use crate::domain::ports::Runner;
use crate::utils::error::{ParloopError, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::process::Command;

/// Runs a built-in kernel inside this process on the blocking pool.
pub struct InProcessRunner {
    name: String,
    kind: FixtureKind,
    schedule: Schedule,
    pool: Option<Arc<rayon::ThreadPool>>,
}

impl InProcessRunner {
    pub fn new(kind: FixtureKind, schedule: Schedule) -> Self {
        Self {
            name: format!("{} [{}]", kind, schedule),
            kind,
            schedule,
            pool: None,
        }
    }

    /// Run the kernel inside a dedicated pool instead of the global one.
    pub fn with_pool(mut self, pool: Arc<rayon::ThreadPool>) -> Self {
        self.pool = Some(pool);
        self
    }
}

#[async_trait]
impl Runner for InProcessRunner {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, size: usize, mode: OutputMode) -> Result<RunOutput> {
        let kind = self.kind;
        let schedule = self.schedule;
        let pool = self.pool.clone();

        let stdout = tokio::task::spawn_blocking(move || -> Result<Vec<u8>> {
            let program = FixtureProgram::new(kind);
            let run = match pool {
                Some(pool) => pool.install(|| program.execute(size, schedule))?,
                None => program.execute(size, schedule)?,
            };
            let mut buffer = Vec::new();
            write_output(&run, mode, &mut buffer)?;
            Ok(buffer)
        })
        .await??;

        Ok(RunOutput::new(self.name.clone(), stdout))
    }
}

/// Runs an external executable as `<program> <size> <mode>`.
pub struct ProcessRunner {
    name: String,
    program: PathBuf,
}

impl ProcessRunner {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        let program = program.into();
        Self {
            name: program.display().to_string(),
            program,
        }
    }
}

#[async_trait]
impl Runner for ProcessRunner {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, size: usize, mode: OutputMode) -> Result<RunOutput> {
        tracing::debug!("Launching {} {} {}", self.name, size, mode.as_arg());

        let output = Command::new(&self.program)
            .arg(size.to_string())
            .arg(mode.as_arg())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ParloopError::ProcessError {
                program: self.name.clone(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(ParloopError::ProcessFailed {
                program: self.name.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(RunOutput::new(self.name.clone(), output.stdout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_process_print() {
        let runner = InProcessRunner::new(FixtureKind::FunctionIf, Schedule::Sequential);
        let output = runner.run(4, OutputMode::Print).await.unwrap();
        assert_eq!(output.text(), "0: 0\n1: 0\n2: 4\n3: 0\n");
    }

    #[tokio::test]
    async fn test_in_process_time_with_pool() {
        let pool = Arc::new(crate::core::schedule::build_pool(2).unwrap());
        let runner =
            InProcessRunner::new(FixtureKind::ParallelRegion, Schedule::ParallelFor).with_pool(pool);
        let output = runner.run(10_000, OutputMode::Time).await.unwrap();
        assert!(output.timing_micros().is_ok());
    }

    #[tokio::test]
    async fn test_missing_program_is_process_error() {
        let runner = ProcessRunner::new("/definitely/not/a/fixture");
        let err = runner.run(10, OutputMode::Print).await.unwrap_err();
        assert!(matches!(err, ParloopError::ProcessError { .. }));
    }
}
