pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
use crate::config::toml_config::{HarnessConfig, MonitoringConfig, ProgramPair, ProgramsDirSection};
#[cfg(feature = "cli")]
use clap::{Args, Parser, Subcommand};

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "parloop")]
#[command(about = "Differential runner and benchmark harness for parallel loop fixtures")]
pub struct CliConfig {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log process CPU and memory between phases
    #[arg(long, global = true)]
    pub monitor: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Worker threads for in-process kernels (0 = Rayon default)
    #[arg(long, global = true)]
    pub threads: Option<usize>,

    #[command(subcommand)]
    pub command: Command,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// List the built-in fixtures
    List,
    /// Compare print-mode output of reference and candidate
    Verify(VerifyArgs),
    /// Average time-mode output of reference and candidate over several sizes
    Bench(BenchArgs),
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Default, Args)]
pub struct TargetArgs {
    /// Built-in fixture to include (repeatable)
    #[arg(long = "fixture")]
    pub fixtures: Vec<String>,

    /// External reference executable
    #[arg(long, requires = "candidate")]
    pub reference: Option<String>,

    /// External candidate executable
    #[arg(long, requires = "reference")]
    pub candidate: Option<String>,

    /// Directory of reference executables, paired with --candidate-dir by file name
    #[arg(long, requires = "candidate_dir", conflicts_with = "reference")]
    pub reference_dir: Option<String>,

    /// Directory of candidate executables
    #[arg(long, requires = "reference_dir", conflicts_with = "candidate")]
    pub candidate_dir: Option<String>,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Default, Args)]
pub struct VerifyArgs {
    /// Array size passed to both programs
    #[arg(long)]
    pub size: Option<usize>,

    #[command(flatten)]
    pub targets: TargetArgs,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Default, Args)]
pub struct BenchArgs {
    /// Array sizes, comma separated
    #[arg(long, value_delimiter = ',')]
    pub sizes: Vec<usize>,

    /// Runs per program and size
    #[arg(long)]
    pub repetitions: Option<usize>,

    /// Report directory
    #[arg(long)]
    pub output: Option<String>,

    /// Report formats, comma separated (csv, json)
    #[arg(long = "format", value_delimiter = ',')]
    pub formats: Vec<String>,

    #[command(flatten)]
    pub targets: TargetArgs,
}

#[cfg(feature = "cli")]
impl HarnessConfig {
    /// 命令列參數覆蓋設定檔
    pub fn apply_cli(&mut self, cli: &CliConfig) {
        if let Some(threads) = cli.threads {
            self.harness.threads = threads;
        }
        if cli.monitor {
            self.monitoring = Some(MonitoringConfig { enabled: true });
        }

        match &cli.command {
            Command::List => {}
            Command::Verify(args) => {
                if let Some(size) = args.size {
                    self.verify.size = size;
                }
                self.apply_targets(&args.targets);
            }
            Command::Bench(args) => {
                if !args.sizes.is_empty() {
                    self.bench.sizes = args.sizes.clone();
                }
                if let Some(repetitions) = args.repetitions {
                    self.bench.repetitions = repetitions;
                }
                if let Some(output) = &args.output {
                    self.report.output_path = output.clone();
                }
                if !args.formats.is_empty() {
                    self.report.output_formats = args.formats.clone();
                }
                self.apply_targets(&args.targets);
            }
        }
    }

    fn apply_targets(&mut self, targets: &TargetArgs) {
        if !targets.fixtures.is_empty() {
            self.fixtures = targets.fixtures.clone();
        }
        // 指定外部程式時只比較這一組
        if targets.reference.is_some() || targets.candidate.is_some() {
            self.programs = vec![ProgramPair {
                name: "external".to_string(),
                reference: targets.reference.clone(),
                candidate: targets.candidate.clone(),
            }];
            self.programs_dir = None;
        }
        if targets.reference_dir.is_some() || targets.candidate_dir.is_some() {
            self.programs.clear();
            self.programs_dir = Some(ProgramsDirSection {
                reference_dir: targets.reference_dir.clone(),
                candidate_dir: targets.candidate_dir.clone(),
            });
        }
    }
}
