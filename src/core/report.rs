use crate::domain::model::BenchResult;
use crate::domain::ports::Storage;
use crate::utils::error::{ParloopError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const CSV_HEADER: [&str; 5] = [
    "fixture",
    "size",
    "reference_avg_us",
    "candidate_avg_us",
    "speedup",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchReport {
    pub name: String,
    pub generated_at: DateTime<Utc>,
    pub threads: usize,
    pub repetitions: usize,
    pub results: Vec<BenchResult>,
}

#[derive(Serialize)]
struct CsvRow<'a> {
    fixture: &'a str,
    size: usize,
    reference_avg_us: f64,
    candidate_avg_us: f64,
    speedup: Option<f64>,
}

impl BenchReport {
    pub fn new(
        name: impl Into<String>,
        threads: usize,
        repetitions: usize,
        results: Vec<BenchResult>,
    ) -> Self {
        Self {
            name: name.into(),
            generated_at: Utc::now(),
            threads,
            repetitions,
            results,
        }
    }

    pub fn to_csv(&self) -> Result<String> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        writer.write_record(CSV_HEADER)?;

        for result in &self.results {
            writer.serialize(CsvRow {
                fixture: &result.fixture,
                size: result.size,
                reference_avg_us: result.reference_avg_us,
                candidate_avg_us: result.candidate_avg_us,
                speedup: result.speedup(),
            })?;
        }

        let data = writer
            .into_inner()
            .map_err(|e| ParloopError::IoError(e.into_error()))?;
        Ok(String::from_utf8_lossy(&data).into_owned())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// `<name>_bench_<UTC 時間到毫秒>`；名稱中路徑不安全的字元換成 `_`
    pub fn file_stem(&self) -> String {
        let name: String = self
            .name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        format!(
            "{}_bench_{}",
            name,
            self.generated_at.format("%Y%m%d_%H%M%S_%3f")
        )
    }

    /// 終端機摘要，每個 fixture 一段
    pub fn summary_lines(&self) -> Vec<String> {
        self.results
            .iter()
            .map(|r| {
                let speedup = r
                    .speedup()
                    .map(|s| format!("{:.2}x", s))
                    .unwrap_or_else(|| "n/a".to_string());
                format!(
                    "  {:<24} size={:<8} reference={:>12.1}us candidate={:>12.1}us speedup={}",
                    r.fixture, r.size, r.reference_avg_us, r.candidate_avg_us, speedup
                )
            })
            .collect()
    }
}

pub struct ReportWriter<S: Storage> {
    storage: S,
}

impl<S: Storage> ReportWriter<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// 依格式寫出報告，回傳寫入的檔名
    pub async fn write(&self, report: &BenchReport, formats: &[String]) -> Result<Vec<String>> {
        let stem = report.file_stem();
        let mut written = Vec::new();

        for format in formats {
            let (file_name, content) = match format.as_str() {
                "csv" => (format!("{}.csv", stem), report.to_csv()?),
                "json" => (format!("{}.json", stem), report.to_json()?),
                other => {
                    return Err(ParloopError::InvalidConfigValueError {
                        field: "report.output_formats".to_string(),
                        value: other.to_string(),
                        reason: "Unsupported format. Valid formats: csv, json".to_string(),
                    })
                }
            };

            self.storage.write_file(&file_name, content.as_bytes()).await?;
            tracing::info!("📝 Report written: {}", file_name);
            written.push(file_name);
        }

        Ok(written)
    }
}
