use crate::utils::error::{ParloopError, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// 內建 fixture 的固定集合
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FixtureKind {
    AddArrays,
    ParallelFor,
    ParallelRegion,
    PlusFunction,
    Factorial,
    FunctionIf,
}

impl FixtureKind {
    pub const ALL: [FixtureKind; 6] = [
        FixtureKind::AddArrays,
        FixtureKind::ParallelFor,
        FixtureKind::ParallelRegion,
        FixtureKind::PlusFunction,
        FixtureKind::Factorial,
        FixtureKind::FunctionIf,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FixtureKind::AddArrays => "add-arrays",
            FixtureKind::ParallelFor => "parallel-for",
            FixtureKind::ParallelRegion => "parallel-region",
            FixtureKind::PlusFunction => "plus-function",
            FixtureKind::Factorial => "factorial",
            FixtureKind::FunctionIf => "function-if",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            FixtureKind::AddArrays => "a[i] = b[i] + c[i]",
            FixtureKind::ParallelFor => "c[i] = a[i] + b[i] over a parallel-for",
            FixtureKind::ParallelRegion => "c[i] = a[i] + b[i] with explicit per-thread partitions",
            FixtureKind::PlusFunction => "c[i] = add(a[i], b[i])",
            FixtureKind::Factorial => "a[i] = i!",
            FixtureKind::FunctionIf => "a[i] = is_even(i) ? b[i] + c[i] : b[i] + d[i]",
        }
    }
}

impl fmt::Display for FixtureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FixtureKind {
    type Err = ParloopError;

    fn from_str(s: &str) -> Result<Self> {
        FixtureKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| ParloopError::UnknownFixture {
                name: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    Print,
    Time,
}

impl OutputMode {
    /// 只有 `print` 會切換到列印模式，其餘（包含缺省）都當作計時
    pub fn from_arg(arg: Option<&str>) -> Self {
        match arg {
            Some("print") => OutputMode::Print,
            _ => OutputMode::Time,
        }
    }

    pub fn as_arg(&self) -> &'static str {
        match self {
            OutputMode::Print => "print",
            OutputMode::Time => "time",
        }
    }
}

/// How a loop's iterations are spread over the worker pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    Sequential,
    ParallelFor,
    /// Contiguous blocks, one per thread; the last block takes the remainder.
    Partitioned { threads: usize },
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Schedule::Sequential => f.write_str("sequential"),
            Schedule::ParallelFor => f.write_str("parallel-for"),
            Schedule::Partitioned { threads } => write!(f, "partitioned({})", threads),
        }
    }
}

/// Scratch buffers for one fixture run. Every buffer holds `size` elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    pub inputs: Vec<Vec<i64>>,
    pub output: Vec<i64>,
}

impl Workspace {
    /// 配置失敗時回傳 `AllocationError`，不會中止程序
    pub fn new(size: usize) -> Result<Self> {
        Ok(Self {
            inputs: Vec::new(),
            output: Self::buffer(size, |_| 0)?,
        })
    }

    /// Add an input buffer holding `f(i)` for every index.
    pub fn with_input(mut self, f: impl Fn(i64) -> i64) -> Result<Self> {
        let values = Self::buffer(self.output.len(), f)?;
        self.inputs.push(values);
        Ok(self)
    }

    fn buffer(size: usize, f: impl Fn(i64) -> i64) -> Result<Vec<i64>> {
        let mut values = Vec::new();
        values
            .try_reserve_exact(size)
            .map_err(|source| ParloopError::AllocationError {
                elements: size,
                source,
            })?;
        values.extend((0..size as i64).map(f));
        Ok(values)
    }
}

/// Captured standard output of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutput {
    pub program: String,
    pub stdout: Vec<u8>,
}

impl RunOutput {
    pub fn new(program: impl Into<String>, stdout: Vec<u8>) -> Self {
        Self {
            program: program.into(),
            stdout,
        }
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stdout)
    }

    /// 解析 time 模式輸出的微秒數
    pub fn timing_micros(&self) -> Result<u64> {
        let text = self.text();
        text.trim()
            .parse::<u64>()
            .map_err(|_| ParloopError::OutputParseError {
                program: self.program.clone(),
                output: text.into_owned(),
            })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyOutcome {
    pub fixture: String,
    pub passed: bool,
    pub reference_output: String,
    pub candidate_output: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchResult {
    pub fixture: String,
    pub size: usize,
    pub reference_avg_us: f64,
    pub candidate_avg_us: f64,
}

impl BenchResult {
    /// reference / candidate；candidate 為 0 時回傳 None
    pub fn speedup(&self) -> Option<f64> {
        if self.candidate_avg_us > 0.0 {
            Some(self.reference_avg_us / self.candidate_avg_us)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_names_round_trip() {
        for kind in FixtureKind::ALL {
            assert_eq!(kind.name().parse::<FixtureKind>().unwrap(), kind);
        }
        assert!("matrix-multiply".parse::<FixtureKind>().is_err());
    }

    #[test]
    fn test_output_mode_defaults_to_time() {
        assert_eq!(OutputMode::from_arg(Some("print")), OutputMode::Print);
        assert_eq!(OutputMode::from_arg(Some("time")), OutputMode::Time);
        assert_eq!(OutputMode::from_arg(Some("verbose")), OutputMode::Time);
        assert_eq!(OutputMode::from_arg(None), OutputMode::Time);
    }

    #[test]
    fn test_timing_micros() {
        let output = RunOutput::new("factorial", b"1234\n".to_vec());
        assert_eq!(output.timing_micros().unwrap(), 1234);

        let garbage = RunOutput::new("factorial", b"0: 1\n1: 1\n".to_vec());
        assert!(matches!(
            garbage.timing_micros(),
            Err(ParloopError::OutputParseError { .. })
        ));
    }

    #[test]
    fn test_workspace_buffers() {
        let workspace = Workspace::new(4)
            .unwrap()
            .with_input(|i| i * 10)
            .unwrap();
        assert_eq!(workspace.output, vec![0; 4]);
        assert_eq!(workspace.inputs, vec![vec![0, 10, 20, 30]]);
    }

    #[test]
    fn test_workspace_too_large_is_error() {
        assert!(matches!(
            Workspace::new(usize::MAX),
            Err(ParloopError::AllocationError { elements, .. }) if elements == usize::MAX
        ));
    }

    #[test]
    fn test_speedup() {
        let result = BenchResult {
            fixture: "factorial".to_string(),
            size: 100,
            reference_avg_us: 30.0,
            candidate_avg_us: 10.0,
        };
        assert_eq!(result.speedup(), Some(3.0));

        let instant = BenchResult {
            candidate_avg_us: 0.0,
            ..result
        };
        assert_eq!(instant.speedup(), None);
    }
}
