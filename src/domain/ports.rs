use crate::domain::model::{FixtureKind, OutputMode, RunOutput, Schedule, Workspace};
use crate::utils::error::Result;
use async_trait::async_trait;

/// One fixture loop. `populate` is untimed setup, `execute` is the timed loop.
pub trait Kernel: Send + Sync {
    fn kind(&self) -> FixtureKind;
    fn populate(&self, size: usize) -> Result<Workspace>;
    fn execute(&self, workspace: &mut Workspace, schedule: Schedule);
}

/// Anything that can be invoked as `<program> <size> [print|time]`.
#[async_trait]
pub trait Runner: Send + Sync {
    fn name(&self) -> &str;
    async fn run(&self, size: usize, mode: OutputMode) -> Result<RunOutput>;
}

pub trait Storage: Send + Sync {
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait HarnessSettings: Send + Sync {
    fn threads(&self) -> usize;
    fn verify_size(&self) -> usize;
    fn bench_sizes(&self) -> &[usize];
    fn repetitions(&self) -> usize;
    fn output_path(&self) -> &str;
    fn output_formats(&self) -> &[String];
    fn monitoring_enabled(&self) -> bool;
}
