use std::env;
use std::path::PathBuf;

use crate::error::{ConfigError, Result};

/// Environment variable configuration constants
pub struct EnvVars;

impl EnvVars {
    pub const MPRIS_SERVICE: &'static str = "LYRICSYNC_MPRIS_SERVICE";
    pub const LRCLIB_URL: &'static str = "LYRICSYNC_LRCLIB_URL";
    pub const SYNC_OFFSET: &'static str = "LYRICSYNC_SYNC_OFFSET";
    pub const HTTP_TIMEOUT: &'static str = "LYRICSYNC_HTTP_TIMEOUT";
    pub const POLL_INTERVAL_MS: &'static str = "LYRICSYNC_POLL_INTERVAL_MS";
    pub const CACHE_DIR: &'static str = "LYRICSYNC_CACHE_DIR";
    pub const NO_CACHE: &'static str = "LYRICSYNC_NO_CACHE";

    pub const ALL: [&'static str; 7] = [
        Self::MPRIS_SERVICE,
        Self::LRCLIB_URL,
        Self::SYNC_OFFSET,
        Self::HTTP_TIMEOUT,
        Self::POLL_INTERVAL_MS,
        Self::CACHE_DIR,
        Self::NO_CACHE,
    ];
}

fn invalid(var_name: &str, message: String) -> crate::error::LyricSyncError {
    ConfigError::InvalidValue {
        field: var_name.to_string(),
        value: message,
    }
    .into()
}

/// Environment variable parsing utilities with validation
pub struct EnvParser;

impl EnvParser {
    /// Trimmed value of the variable; unset and blank are both `None`.
    pub fn parse_string(var_name: &str) -> Result<Option<String>> {
        match env::var(var_name) {
            Ok(value) => {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(trimmed.to_string()))
                }
            }
            Err(env::VarError::NotPresent) => Ok(None),
            Err(env::VarError::NotUnicode(_)) => {
                Err(invalid(var_name, "contains invalid UTF-8".to_string()))
            }
        }
    }

    pub fn parse_path(var_name: &str) -> Result<Option<PathBuf>> {
        Ok(Self::parse_string(var_name)?.map(PathBuf::from))
    }

    /// Parse environment variable as boolean with validation
    pub fn parse_bool(var_name: &str) -> Result<Option<bool>> {
        if let Some(value_str) = Self::parse_string(var_name)? {
            match value_str.to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(Some(true)),
                "false" | "0" | "no" | "off" => Ok(Some(false)),
                _ => Err(invalid(
                    var_name,
                    format!("'{}' (use true/false, 1/0, yes/no, on/off)", value_str),
                )),
            }
        } else {
            Ok(None)
        }
    }

    /// Parse environment variable as u64 with range validation
    pub fn parse_u64(var_name: &str, min: u64, max: u64) -> Result<Option<u64>> {
        if let Some(value_str) = Self::parse_string(var_name)? {
            let value = value_str.parse::<u64>().map_err(|_| {
                invalid(var_name, format!("'{}' (must be a positive integer)", value_str))
            })?;

            if value < min || value > max {
                return Err(invalid(
                    var_name,
                    format!("{} (must be between {} and {})", value, min, max),
                ));
            }

            Ok(Some(value))
        } else {
            Ok(None)
        }
    }

    /// Parse environment variable as a finite f64 within [min, max]
    pub fn parse_f64(var_name: &str, min: f64, max: f64) -> Result<Option<f64>> {
        if let Some(value_str) = Self::parse_string(var_name)? {
            let value = value_str
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| invalid(var_name, format!("'{}' (must be a number)", value_str)))?;

            if value < min || value > max {
                return Err(invalid(
                    var_name,
                    format!("{} (must be between {} and {})", value, min, max),
                ));
            }

            Ok(Some(value))
        } else {
            Ok(None)
        }
    }

    /// All LYRICSYNC variables currently set, for `config show`
    pub fn get_all_vars() -> Vec<(String, String)> {
        EnvVars::ALL
            .iter()
            .filter_map(|name| env::var(name).ok().map(|value| (name.to_string(), value)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_parse_bool() {
        env::set_var("TEST_LYRICSYNC_BOOL_TRUE", "yes");
        env::set_var("TEST_LYRICSYNC_BOOL_FALSE", "0");
        env::set_var("TEST_LYRICSYNC_BOOL_INVALID", "maybe");

        assert_eq!(EnvParser::parse_bool("TEST_LYRICSYNC_BOOL_TRUE").unwrap(), Some(true));
        assert_eq!(EnvParser::parse_bool("TEST_LYRICSYNC_BOOL_FALSE").unwrap(), Some(false));
        assert!(EnvParser::parse_bool("TEST_LYRICSYNC_BOOL_INVALID").is_err());
        assert_eq!(EnvParser::parse_bool("TEST_LYRICSYNC_BOOL_NOT_SET").unwrap(), None);

        env::remove_var("TEST_LYRICSYNC_BOOL_TRUE");
        env::remove_var("TEST_LYRICSYNC_BOOL_FALSE");
        env::remove_var("TEST_LYRICSYNC_BOOL_INVALID");
    }

    #[test]
    fn test_parse_u64() {
        env::set_var("TEST_LYRICSYNC_U64_VALID", "42");
        env::set_var("TEST_LYRICSYNC_U64_OUT_OF_RANGE", "150");
        env::set_var("TEST_LYRICSYNC_U64_INVALID", "not_a_number");

        assert_eq!(EnvParser::parse_u64("TEST_LYRICSYNC_U64_VALID", 1, 100).unwrap(), Some(42));
        assert!(EnvParser::parse_u64("TEST_LYRICSYNC_U64_OUT_OF_RANGE", 1, 100).is_err());
        assert!(EnvParser::parse_u64("TEST_LYRICSYNC_U64_INVALID", 1, 100).is_err());
        assert_eq!(EnvParser::parse_u64("TEST_LYRICSYNC_U64_NOT_SET", 1, 100).unwrap(), None);

        env::remove_var("TEST_LYRICSYNC_U64_VALID");
        env::remove_var("TEST_LYRICSYNC_U64_OUT_OF_RANGE");
        env::remove_var("TEST_LYRICSYNC_U64_INVALID");
    }

    #[test]
    fn test_parse_f64_and_blank_values() {
        env::set_var("TEST_LYRICSYNC_F64_VALID", " -1.5 ");
        env::set_var("TEST_LYRICSYNC_F64_NAN", "NaN");
        env::set_var("TEST_LYRICSYNC_F64_BLANK", "   ");

        assert_eq!(EnvParser::parse_f64("TEST_LYRICSYNC_F64_VALID", -10.0, 10.0).unwrap(), Some(-1.5));
        assert!(EnvParser::parse_f64("TEST_LYRICSYNC_F64_VALID", 0.0, 10.0).is_err());
        assert!(EnvParser::parse_f64("TEST_LYRICSYNC_F64_NAN", -10.0, 10.0).is_err());
        assert_eq!(EnvParser::parse_f64("TEST_LYRICSYNC_F64_BLANK", -10.0, 10.0).unwrap(), None);

        env::remove_var("TEST_LYRICSYNC_F64_VALID");
        env::remove_var("TEST_LYRICSYNC_F64_NAN");
        env::remove_var("TEST_LYRICSYNC_F64_BLANK");
    }
}
