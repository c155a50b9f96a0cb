use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParloopError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Thread pool error: {0}")]
    ThreadPoolError(#[from] rayon::ThreadPoolBuildError),

    #[error("Task join error: {0}")]
    TaskJoinError(#[from] tokio::task::JoinError),

    #[error("{program}: invalid arguments")]
    InvalidArguments { program: String },

    #[error("Unknown fixture: {name}")]
    UnknownFixture { name: String },

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Failed to launch '{program}': {message}")]
    ProcessError { program: String, message: String },

    #[error("'{program}' exited with {status}: {stderr}")]
    ProcessFailed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("Unexpected output from '{program}': {output:?}")]
    OutputParseError { program: String, output: String },

    #[error("Cannot allocate {elements} elements: {source}")]
    AllocationError {
        elements: usize,
        #[source]
        source: std::collections::TryReserveError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Io,
    Configuration,
    Arguments,
    Execution,
    Output,
    Runtime,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ParloopError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ParloopError::IoError(_) => ErrorCategory::Io,
            ParloopError::CsvError(_) | ParloopError::SerializationError(_) => {
                ErrorCategory::Output
            }
            ParloopError::ThreadPoolError(_) | ParloopError::TaskJoinError(_) => {
                ErrorCategory::Runtime
            }
            ParloopError::InvalidArguments { .. } | ParloopError::UnknownFixture { .. } => {
                ErrorCategory::Arguments
            }
            ParloopError::ConfigValidationError { .. }
            | ParloopError::InvalidConfigValueError { .. }
            | ParloopError::MissingConfigError { .. } => ErrorCategory::Configuration,
            ParloopError::ProcessError { .. } | ParloopError::ProcessFailed { .. } => {
                ErrorCategory::Execution
            }
            ParloopError::OutputParseError { .. } => ErrorCategory::Output,
            ParloopError::AllocationError { .. } => ErrorCategory::Memory,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            // 子程序失敗或輸出異常，重跑可能成功
            ErrorCategory::Execution | ErrorCategory::Output => ErrorSeverity::Medium,
            ErrorCategory::Arguments | ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Io | ErrorCategory::Runtime | ErrorCategory::Memory => {
                ErrorSeverity::Critical
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            ParloopError::InvalidArguments { program } => {
                format!("{}: invalid arguments", program)
            }
            ParloopError::UnknownFixture { name } => {
                format!("No built-in fixture is called '{}'", name)
            }
            ParloopError::ProcessFailed { program, status, .. } => {
                format!("Program '{}' did not finish cleanly ({})", program, status)
            }
            ParloopError::OutputParseError { program, .. } => {
                format!("Program '{}' did not print a timing value", program)
            }
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Arguments => {
                "Usage: <program> <size> [print|time]; run `parloop list` for fixture names"
            }
            ErrorCategory::Configuration => {
                "Check the TOML configuration file and command line overrides"
            }
            ErrorCategory::Execution => {
                "Make sure both programs exist, are executable and accept <size> [print|time]"
            }
            ErrorCategory::Output => {
                "Run the program by hand in time mode; it must print one integer"
            }
            ErrorCategory::Io => "Check file permissions and available disk space",
            ErrorCategory::Runtime => "Lower --threads or unset RAYON_NUM_THREADS",
            ErrorCategory::Memory => "Use a smaller size",
        }
    }
}

pub type Result<T> = std::result::Result<T, ParloopError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_arguments_message() {
        let err = ParloopError::InvalidArguments {
            program: "./factorial".to_string(),
        };
        assert_eq!(err.to_string(), "./factorial: invalid arguments");
        assert_eq!(err.category(), ErrorCategory::Arguments);
        assert_eq!(err.severity(), ErrorSeverity::High);
    }

    #[test]
    fn test_severity_ordering() {
        let process = ParloopError::ProcessFailed {
            program: "a.out".to_string(),
            status: "exit status: 1".to_string(),
            stderr: String::new(),
        };
        let io = ParloopError::IoError(std::io::Error::other("disk"));
        assert!(process.severity() < io.severity());
    }

    #[test]
    fn test_allocation_error_is_critical() {
        let source = Vec::<i64>::new().try_reserve_exact(usize::MAX).unwrap_err();
        let err = ParloopError::AllocationError {
            elements: usize::MAX,
            source,
        };
        assert_eq!(err.category(), ErrorCategory::Memory);
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert!(err.to_string().starts_with("Cannot allocate"));
    }
}
