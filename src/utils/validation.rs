use crate::utils::error::{EtlError, Result};
use std::collections::HashSet;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.trim().is_empty() {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: i64, min_value: i64) -> Result<()> {
    if value < min_value {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_file_extensions(
    field_name: &str,
    files: &[String],
    allowed_extensions: &[&str],
) -> Result<()> {
    let allowed_set: HashSet<&str> = allowed_extensions.iter().copied().collect();

    for file in files {
        match std::path::Path::new(file)
            .extension()
            .and_then(|ext| ext.to_str())
        {
            Some(extension) if allowed_set.contains(extension.to_ascii_lowercase().as_str()) => {}
            Some(extension) => {
                return Err(EtlError::InvalidConfigValueError {
                    field: field_name.to_string(),
                    value: file.clone(),
                    reason: format!(
                        "Unsupported file extension: {}. Allowed extensions: {}",
                        extension,
                        allowed_extensions.join(", ")
                    ),
                });
            }
            None => {
                return Err(EtlError::InvalidConfigValueError {
                    field: field_name.to_string(),
                    value: file.clone(),
                    reason: "File has no extension or invalid filename".to_string(),
                });
            }
        }
    }

    Ok(())
}

pub fn validate_distinct_columns(field_name: &str, key_column: usize, value_column: usize) -> Result<()> {
    if key_column == value_column {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: key_column.to_string(),
            reason: "Key column and value column must differ".to_string(),
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
        return Err(EtlError::InvalidConfigValueError {
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
        assert!(validate_path("stock_template.path", "stocks_pattern.xlsx").is_ok());
        assert!(validate_path("stock_template.path", "").is_err());
        assert!(validate_path("stock_template.path", "  ").is_err());
        assert!(validate_path("stock_template.path", "bad\0path").is_err());
    }

    #[test]
    fn test_validate_positive_number() {
        assert!(validate_positive_number("pricing.low_multiplier", 3, 1).is_ok());
        assert!(validate_positive_number("pricing.low_multiplier", 0, 1).is_err());
    }

    #[test]
    fn test_validate_file_extensions() {
        let files = vec!["stocks.xlsx".to_string(), "price.CSV".to_string()];
        assert!(validate_file_extensions("outputs", &files, &["xlsx", "csv"]).is_ok());

        let invalid_files = vec!["stocks.txt".to_string()];
        assert!(validate_file_extensions("outputs", &invalid_files, &["xlsx", "csv"]).is_err());

        let no_extension = vec!["stocks".to_string()];
        assert!(validate_file_extensions("outputs", &no_extension, &["xlsx"]).is_err());
    }

    #[test]
    fn test_validate_distinct_columns() {
        assert!(validate_distinct_columns("stock_template", 6, 1).is_ok());
        assert!(validate_distinct_columns("stock_template", 3, 3).is_err());
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range("threshold", 300, 0, i64::MAX).is_ok());
        assert!(validate_range("threshold", -1, 0, i64::MAX).is_err());
    }
}
