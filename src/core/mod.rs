pub mod fixture;
pub mod harness;
pub mod kernels;
pub mod report;
pub mod runner;
pub mod schedule;

pub use crate::domain::model::{FixtureKind, OutputMode, RunOutput, Schedule, Workspace};
pub use crate::domain::ports::{HarnessSettings, Kernel, Runner, Storage};
pub use crate::utils::error::Result;
