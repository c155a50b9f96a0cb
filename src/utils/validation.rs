use crate::utils::error::{ParloopError, Result};
use std::collections::HashSet;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(ParloopError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(ParloopError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(ParloopError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_non_empty_list<T>(field_name: &str, values: &[T]) -> Result<()> {
    if values.is_empty() {
        return Err(ParloopError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: "[]".to_string(),
            reason: "List cannot be empty".to_string(),
        });
    }
    Ok(())
}

pub fn validate_formats(field_name: &str, formats: &[String], allowed: &[&str]) -> Result<()> {
    let allowed_set: HashSet<&str> = allowed.iter().copied().collect();

    for format in formats {
        if !allowed_set.contains(format.as_str()) {
            return Err(ParloopError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: format.clone(),
                reason: format!("Unsupported format. Valid formats: {}", allowed.join(", ")),
            });
        }
    }

    Ok(())
}

pub fn validate_required_field<'a, T>(field_name: &str, value: &'a Option<T>) -> Result<&'a T> {
    value.as_ref().ok_or_else(|| ParloopError::MissingConfigError {
        field: field_name.to_string(),
    })
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ParloopError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(ParloopError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_path() {
        assert!(validate_path("report.output_path", "./bench-output").is_ok());
        assert!(validate_path("report.output_path", "").is_err());
        assert!(validate_path("report.output_path", "bad\0path").is_err());
    }

    #[test]
    fn test_validate_positive_number() {
        assert!(validate_positive_number("bench.repetitions", 100, 1).is_ok());
        assert!(validate_positive_number("bench.repetitions", 0, 1).is_err());
    }

    #[test]
    fn test_validate_formats() {
        let formats = vec!["csv".to_string(), "json".to_string()];
        assert!(validate_formats("report.output_formats", &formats, &["csv", "json"]).is_ok());

        let invalid = vec!["pdf".to_string()];
        assert!(validate_formats("report.output_formats", &invalid, &["csv", "json"]).is_err());
    }

    #[test]
    fn test_validate_range_and_required() {
        assert!(validate_range("harness.threads", 4usize, 0, 1024).is_ok());
        assert!(validate_range("harness.threads", 4096usize, 0, 1024).is_err());

        let missing: Option<String> = None;
        assert!(matches!(
            validate_required_field("programs.reference", &missing),
            Err(ParloopError::MissingConfigError { .. })
        ));
        assert!(validate_non_empty_string("programs.name", "   ").is_err());
    }
}
