use crate::domain::model::FixtureKind;
use crate::domain::ports::HarnessSettings;
use crate::utils::error::{ParloopError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

pub const DEFAULT_VERIFY_SIZE: usize = 10;
pub const DEFAULT_BENCH_SIZES: [usize; 5] = [10, 100, 1_000, 10_000, 100_000];
pub const DEFAULT_REPETITIONS: usize = 100;
pub const SUPPORTED_FORMATS: [&str; 2] = ["csv", "json"];
const MAX_THREADS: usize = 4096;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// 空白代表全部內建 fixture
    #[serde(default)]
    pub fixtures: Vec<String>,
    #[serde(default)]
    pub harness: HarnessSection,
    #[serde(default)]
    pub verify: VerifySection,
    #[serde(default)]
    pub bench: BenchSection,
    #[serde(default)]
    pub programs: Vec<ProgramPair>,
    pub programs_dir: Option<ProgramsDirSection>,
    #[serde(default)]
    pub report: ReportSection,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessSection {
    pub name: String,
    /// 0 代表使用 Rayon 預設執行緒數
    pub threads: usize,
}

impl Default for HarnessSection {
    fn default() -> Self {
        Self {
            name: "parloop".to_string(),
            threads: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifySection {
    pub size: usize,
}

impl Default for VerifySection {
    fn default() -> Self {
        Self {
            size: DEFAULT_VERIFY_SIZE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchSection {
    pub sizes: Vec<usize>,
    pub repetitions: usize,
}

impl Default for BenchSection {
    fn default() -> Self {
        Self {
            sizes: DEFAULT_BENCH_SIZES.to_vec(),
            repetitions: DEFAULT_REPETITIONS,
        }
    }
}

/// External executables compared against each other.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramPair {
    pub name: String,
    pub reference: Option<String>,
    pub candidate: Option<String>,
}

/// Two directories whose executables are paired by file name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgramsDirSection {
    pub reference_dir: Option<String>,
    pub candidate_dir: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSection {
    pub output_path: String,
    pub output_formats: Vec<String>,
}

impl Default for ReportSection {
    fn default() -> Self {
        Self {
            output_path: "./bench-output".to_string(),
            output_formats: vec!["csv".to_string()],
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

impl HarnessConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ParloopError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ParloopError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${FIXTURE_BIN})，未定義的保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ParloopError::ConfigValidationError {
            field: "env_substitution".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 解析 fixture 名稱
    pub fn selected_fixtures(&self) -> Result<Vec<FixtureKind>> {
        if self.fixtures.is_empty() {
            return Ok(FixtureKind::ALL.to_vec());
        }
        self.fixtures.iter().map(|name| name.parse()).collect()
    }

    /// Reference/candidate paths of every configured pair, followed by the
    /// pairs found in `[programs_dir]`.
    pub fn program_pairs(&self) -> Result<Vec<(String, String, String)>> {
        let mut pairs = self.listed_pairs()?;
        pairs.extend(self.directory_pairs()?);
        Ok(pairs)
    }

    fn listed_pairs(&self) -> Result<Vec<(String, String, String)>> {
        self.programs
            .iter()
            .map(|pair| {
                let reference = validation::validate_required_field(
                    &format!("programs.{}.reference", pair.name),
                    &pair.reference,
                )?;
                let candidate = validation::validate_required_field(
                    &format!("programs.{}.candidate", pair.name),
                    &pair.candidate,
                )?;
                Ok((pair.name.clone(), reference.clone(), candidate.clone()))
            })
            .collect()
    }

    fn program_dirs(&self) -> Result<Option<(&str, &str)>> {
        let Some(dirs) = &self.programs_dir else {
            return Ok(None);
        };
        let reference =
            validation::validate_required_field("programs_dir.reference_dir", &dirs.reference_dir)?;
        let candidate =
            validation::validate_required_field("programs_dir.candidate_dir", &dirs.candidate_dir)?;
        Ok(Some((reference.as_str(), candidate.as_str())))
    }

    /// 依檔名配對兩個目錄中的執行檔，沒有對應檔案的只記錄警告
    pub fn directory_pairs(&self) -> Result<Vec<(String, String, String)>> {
        let Some((reference_dir, candidate_dir)) = self.program_dirs()? else {
            return Ok(Vec::new());
        };

        let references = list_files("programs_dir.reference_dir", reference_dir)?;
        let candidates = list_files("programs_dir.candidate_dir", candidate_dir)?;

        for name in references.difference(&candidates) {
            tracing::warn!("⚠️ {} has no candidate in {}", name, candidate_dir);
        }
        for name in candidates.difference(&references) {
            tracing::warn!("⚠️ {} has no reference in {}", name, reference_dir);
        }

        let pairs: Vec<_> = references
            .intersection(&candidates)
            .map(|name| {
                (
                    name.clone(),
                    Path::new(reference_dir).join(name).display().to_string(),
                    Path::new(candidate_dir).join(name).display().to_string(),
                )
            })
            .collect();
        tracing::debug!("Paired {} program(s) by file name", pairs.len());
        Ok(pairs)
    }
}

/// Names of the regular files directly inside `dir`, sorted.
fn list_files(field: &str, dir: &str) -> Result<BTreeSet<String>> {
    let invalid = |e: std::io::Error| ParloopError::InvalidConfigValueError {
        field: field.to_string(),
        value: dir.to_string(),
        reason: e.to_string(),
    };

    let mut names = BTreeSet::new();
    for entry in std::fs::read_dir(dir).map_err(invalid)? {
        let entry = entry.map_err(invalid)?;
        if entry.path().is_file() {
            names.insert(entry.file_name().to_string_lossy().into_owned());
        }
    }
    Ok(names)
}

impl HarnessSettings for HarnessConfig {
    fn threads(&self) -> usize {
        self.harness.threads
    }

    fn verify_size(&self) -> usize {
        self.verify.size
    }

    fn bench_sizes(&self) -> &[usize] {
        &self.bench.sizes
    }

    fn repetitions(&self) -> usize {
        self.bench.repetitions
    }

    fn output_path(&self) -> &str {
        &self.report.output_path
    }

    fn output_formats(&self) -> &[String] {
        &self.report.output_formats
    }

    fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }
}

impl Validate for HarnessConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_non_empty_string("harness.name", &self.harness.name)?;
        validation::validate_range("harness.threads", self.harness.threads, 0, MAX_THREADS)?;
        validation::validate_non_empty_list("bench.sizes", &self.bench.sizes)?;
        validation::validate_positive_number("bench.repetitions", self.bench.repetitions, 1)?;
        validation::validate_path("report.output_path", &self.report.output_path)?;
        validation::validate_formats(
            "report.output_formats",
            &self.report.output_formats,
            &SUPPORTED_FORMATS,
        )?;

        self.selected_fixtures()?;

        for pair in &self.programs {
            validation::validate_non_empty_string("programs.name", &pair.name)?;
        }
        self.listed_pairs()?;

        if let Some((reference_dir, candidate_dir)) = self.program_dirs()? {
            for (field, dir) in [
                ("programs_dir.reference_dir", reference_dir),
                ("programs_dir.candidate_dir", candidate_dir),
            ] {
                validation::validate_path(field, dir)?;
                if !Path::new(dir).is_dir() {
                    return Err(ParloopError::InvalidConfigValueError {
                        field: field.to_string(),
                        value: dir.to_string(),
                        reason: "Not a directory".to_string(),
                    });
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_without_file_content() {
        let config = HarnessConfig::from_toml_str("").unwrap();

        assert_eq!(config.verify_size(), 10);
        assert_eq!(config.bench_sizes(), &DEFAULT_BENCH_SIZES);
        assert_eq!(config.repetitions(), 100);
        assert_eq!(config.threads(), 0);
        assert!(!config.monitoring_enabled());
        assert_eq!(config.selected_fixtures().unwrap().len(), 6);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
fixtures = ["factorial", "function-if"]

[harness]
name = "nightly"
threads = 4

[verify]
size = 32

[bench]
sizes = [10, 1000]
repetitions = 7

[[programs]]
name = "factorial-c"
reference = "./bin/Inputs/Factorial"
candidate = "./bin/Outputs/Factorial"

[report]
output_path = "./reports"
output_formats = ["csv", "json"]

[monitoring]
enabled = true
"#;

        let config = HarnessConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.harness.name, "nightly");
        assert_eq!(config.threads(), 4);
        assert_eq!(config.verify_size(), 32);
        assert_eq!(config.bench_sizes(), &[10, 1000]);
        assert_eq!(config.repetitions(), 7);
        assert!(config.monitoring_enabled());
        assert_eq!(
            config.selected_fixtures().unwrap(),
            vec![FixtureKind::Factorial, FixtureKind::FunctionIf]
        );

        let pairs = config.program_pairs().unwrap();
        assert_eq!(pairs[0].0, "factorial-c");
        assert_eq!(pairs[0].2, "./bin/Outputs/Factorial");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("PARLOOP_TEST_BIN_DIR", "/opt/fixtures");

        let toml_content = r#"
[[programs]]
name = "add"
reference = "${PARLOOP_TEST_BIN_DIR}/add-ref"
candidate = "${PARLOOP_TEST_UNDEFINED_VAR}/add"
"#;

        let config = HarnessConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(
            config.programs[0].reference.as_deref(),
            Some("/opt/fixtures/add-ref")
        );
        assert_eq!(
            config.programs[0].candidate.as_deref(),
            Some("${PARLOOP_TEST_UNDEFINED_VAR}/add")
        );

        std::env::remove_var("PARLOOP_TEST_BIN_DIR");
    }

    #[test]
    fn test_config_validation() {
        let bad_format = HarnessConfig::from_toml_str(
            r#"
[report]
output_formats = ["pdf"]
"#,
        )
        .unwrap();
        assert!(bad_format.validate().is_err());

        let zero_reps = HarnessConfig::from_toml_str(
            r#"
[bench]
repetitions = 0
"#,
        )
        .unwrap();
        assert!(zero_reps.validate().is_err());

        let unknown_fixture = HarnessConfig::from_toml_str(r#"fixtures = ["nbody"]"#).unwrap();
        assert!(matches!(
            unknown_fixture.validate(),
            Err(ParloopError::UnknownFixture { .. })
        ));

        let missing_candidate = HarnessConfig::from_toml_str(
            r#"
[[programs]]
name = "half"
reference = "./ref"
"#,
        )
        .unwrap();
        assert!(matches!(
            missing_candidate.validate(),
            Err(ParloopError::MissingConfigError { .. })
        ));
    }

    #[test]
    fn test_invalid_toml() {
        let err = HarnessConfig::from_toml_str("[bench\nsizes = 1").unwrap_err();
        assert!(matches!(err, ParloopError::ConfigValidationError { .. }));
    }

    #[test]
    fn test_monitoring_table_without_keys() {
        let config = HarnessConfig::from_toml_str("[monitoring]\n").unwrap();
        assert!(config.monitoring.is_some());
        assert!(!config.monitoring_enabled());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_programs_dir_pairs_by_file_name() {
        let reference = tempfile::TempDir::new().unwrap();
        let candidate = tempfile::TempDir::new().unwrap();
        for name in ["Factorial", "ParallelFor", "OnlyReference"] {
            std::fs::write(reference.path().join(name), b"").unwrap();
        }
        for name in ["Factorial", "ParallelFor", "OnlyCandidate"] {
            std::fs::write(candidate.path().join(name), b"").unwrap();
        }
        std::fs::create_dir(reference.path().join("nested")).unwrap();

        let toml_content = format!(
            "[programs_dir]\nreference_dir = {:?}\ncandidate_dir = {:?}\n",
            reference.path().display().to_string(),
            candidate.path().display().to_string()
        );
        let config = HarnessConfig::from_toml_str(&toml_content).unwrap();
        assert!(config.validate().is_ok());

        let pairs = config.program_pairs().unwrap();
        let names: Vec<&str> = pairs.iter().map(|(name, _, _)| name.as_str()).collect();
        assert_eq!(names, vec!["Factorial", "ParallelFor"]);
        assert_eq!(
            pairs[0].1,
            reference.path().join("Factorial").display().to_string()
        );
        assert_eq!(
            pairs[0].2,
            candidate.path().join("Factorial").display().to_string()
        );
    }

    #[test]
    fn test_programs_dir_validation() {
        let half = HarnessConfig::from_toml_str("[programs_dir]\nreference_dir = \"./in\"\n").unwrap();
        assert!(matches!(
            half.validate(),
            Err(ParloopError::MissingConfigError { ref field }) if field == "programs_dir.candidate_dir"
        ));

        let missing = HarnessConfig::from_toml_str(
            r#"
[programs_dir]
reference_dir = "/definitely/not/here/in"
candidate_dir = "/definitely/not/here/out"
"#,
        )
        .unwrap();
        assert!(matches!(
            missing.validate(),
            Err(ParloopError::InvalidConfigValueError { .. })
        ));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[harness]\nname = \"file-test\"\n")
            .unwrap();

        let config = HarnessConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.harness.name, "file-test");
    }
}
