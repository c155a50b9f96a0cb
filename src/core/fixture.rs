use crate::core::kernels::{default_schedule, kernel_for};
use crate::domain::model::{FixtureKind, OutputMode, Schedule, Workspace};
use crate::domain::ports::Kernel;
use crate::utils::error::{ParloopError, Result};
use crate::utils::logger;
use std::io::{BufWriter, Write};
use std::process::ExitCode;
use std::time::{Duration, Instant};

/// Parsed `<program> <size> [print|time]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureArgs {
    pub program: String,
    pub size: usize,
    pub mode: OutputMode,
}

impl FixtureArgs {
    pub fn from_args<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        let program = args
            .first()
            .cloned()
            .unwrap_or_else(|| "fixture".to_string());

        if args.len() < 2 || args.len() > 3 {
            return Err(ParloopError::InvalidArguments { program });
        }

        Ok(Self {
            program,
            size: parse_size(&args[1]),
            mode: OutputMode::from_arg(args.get(2).map(String::as_str)),
        })
    }
}

/// `atoi`-style parsing: leading digits only and anything unparsable is 0.
/// The digits saturate at `i64` like `strtol`, then narrow to `i32` like the
/// `int` that receives it, so an overflowing size wraps. Negative sizes clamp
/// to 0.
pub fn parse_size(arg: &str) -> usize {
    let trimmed = arg.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let magnitude = digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0i128, |acc, digit| {
            (acc * 10 + i128::from(digit - b'0')).min(1 << 63)
        });
    let signed = if negative { -magnitude } else { magnitude };
    let value = signed.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64;

    usize::try_from(value as i32).unwrap_or(0)
}

#[derive(Debug, Clone)]
pub struct FixtureRun {
    pub workspace: Workspace,
    pub elapsed: Duration,
}

pub struct FixtureProgram {
    kernel: Box<dyn Kernel>,
}

impl FixtureProgram {
    pub fn new(kind: FixtureKind) -> Self {
        Self {
            kernel: kernel_for(kind),
        }
    }

    pub fn kind(&self) -> FixtureKind {
        self.kernel.kind()
    }

    /// Populate the buffers, then time only the loop itself.
    pub fn execute(&self, size: usize, schedule: Schedule) -> Result<FixtureRun> {
        let mut workspace = self.kernel.populate(size)?;

        let start = Instant::now();
        self.kernel.execute(&mut workspace, schedule);
        let elapsed = start.elapsed();

        tracing::debug!(
            "{} size={} schedule={} took {:?}",
            self.kind(),
            size,
            schedule,
            elapsed
        );

        Ok(FixtureRun { workspace, elapsed })
    }

    pub fn run<W: Write>(
        &self,
        args: &FixtureArgs,
        schedule: Schedule,
        out: &mut W,
    ) -> Result<FixtureRun> {
        let run = self.execute(args.size, schedule)?;
        write_output(&run, args.mode, out)?;
        Ok(run)
    }
}

pub fn write_output<W: Write>(run: &FixtureRun, mode: OutputMode, out: &mut W) -> Result<()> {
    match mode {
        OutputMode::Print => {
            for (i, value) in run.workspace.output.iter().enumerate() {
                writeln!(out, "{}: {}", i, value)?;
            }
        }
        OutputMode::Time => {
            writeln!(out, "{}", run.elapsed.as_micros())?;
        }
    }
    out.flush()?;
    Ok(())
}

/// Process entry point shared by every fixture binary.
pub fn fixture_main(kind: FixtureKind) -> ExitCode {
    logger::init_fixture_logger();

    // 非 UTF-8 參數以替換字元保留，atoi 只看前導數字
    let raw_args = std::env::args_os().map(|arg| arg.to_string_lossy().into_owned());
    let args = match FixtureArgs::from_args(raw_args) {
        Ok(args) => args,
        Err(e) => {
            println!("{}", e);
            return ExitCode::from(1);
        }
    };

    let program = FixtureProgram::new(kind);
    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    match program.run(&args, default_schedule(kind), &mut out) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{} failed: {}", args.program, e);
            ExitCode::from(1)
        }
    }
}
