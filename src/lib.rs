pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use self::config::CliConfig;

pub use self::config::{cli::LocalStorage, toml_config::HarnessConfig};
pub use self::core::fixture::{fixture_main, FixtureArgs, FixtureProgram};
pub use self::core::harness::{Harness, RunnerPair, VerifySummary};
pub use domain::model::{FixtureKind, OutputMode, Schedule};
pub use utils::error::{ParloopError, Result};
