use url::Url;

use crate::error::{ConfigError, LyricSyncError, Result};

/// Centralized configuration validation utilities
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate an absolute http(s) URL
    pub fn validate_url(url: &str, field_name: &str) -> Result<()> {
        let parsed = Url::parse(url).map_err(|e| invalid(field_name, format!("'{}': {}", url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(invalid(field_name, format!("'{}': only http and https are supported", url)));
        }
        Ok(())
    }

    /// Validate numeric range
    pub fn validate_range<T>(value: T, min: T, max: T, field_name: &str) -> Result<()>
    where
        T: PartialOrd + std::fmt::Display + Copy,
    {
        if value < min || value > max {
            return Err(invalid(
                field_name,
                format!("{} (must be between {} and {})", value, min, max),
            ));
        }
        Ok(())
    }

    /// Validate a finite offset within ±limit seconds
    pub fn validate_offset(value: f64, limit: f64, field_name: &str) -> Result<()> {
        if !value.is_finite() {
            return Err(invalid(field_name, format!("{} (must be a finite number)", value)));
        }
        Self::validate_range(value, -limit, limit, field_name)
    }
}

fn invalid(field_name: &str, value: String) -> LyricSyncError {
    ConfigError::InvalidValue {
        field: field_name.to_string(),
        value,
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(ConfigValidator::validate_url("https://lrclib.net/api/get", "lrclib_url").is_ok());
        assert!(ConfigValidator::validate_url("http://localhost:3000/api/get", "lrclib_url").is_ok());
        assert!(ConfigValidator::validate_url("not-a-url", "lrclib_url").is_err());
        assert!(ConfigValidator::validate_url("ftp://lrclib.net", "lrclib_url").is_err());
    }

    #[test]
    fn test_validate_range() {
        assert!(ConfigValidator::validate_range(5u64, 1u64, 10u64, "test").is_ok());
        assert!(ConfigValidator::validate_range(15u64, 1u64, 10u64, "test").is_err());
        assert!(ConfigValidator::validate_range(0u64, 1u64, 10u64, "test").is_err());
    }

    #[test]
    fn test_validate_offset() {
        assert!(ConfigValidator::validate_offset(-2.5, 600.0, "sync_offset").is_ok());
        assert!(ConfigValidator::validate_offset(601.0, 600.0, "sync_offset").is_err());
        assert!(ConfigValidator::validate_offset(f64::INFINITY, 600.0, "sync_offset").is_err());
    }
}
