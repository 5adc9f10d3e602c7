use std::str::FromStr;

use crate::error::ConfigError;

/// Read an env var, treating empty values as unset.
pub(crate) fn optional_env(key: &str) -> Result<Option<String>, ConfigError> {
    match std::env::var(key) {
        Ok(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                Ok(None)
            } else {
                Ok(Some(trimmed.to_string()))
            }
        }
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(std::env::VarError::NotUnicode(_)) => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "value is not valid UTF-8".to_string(),
        }),
    }
}

pub(crate) fn required_env(key: &str) -> Result<String, ConfigError> {
    optional_env(key)?.ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Parse an optional env var, describing the expected shape on failure.
pub(crate) fn parse_env<T>(key: &str, expected: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    optional_env(key)?
        .map(|s| s.parse::<T>())
        .transpose()
        .map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("must be {expected}: {e}"),
        })
}

pub(crate) fn parse_bool_env(key: &str) -> Result<Option<bool>, ConfigError> {
    match optional_env(key)? {
        None => Ok(None),
        Some(value) => match normalize_variant(&value).as_str() {
            "true" | "1" | "yes" | "on" => Ok(Some(true)),
            "false" | "0" | "no" | "off" => Ok(Some(false)),
            _ => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("must be 'true' or 'false', got '{value}'"),
            }),
        },
    }
}

/// Optional env var that must be an absolute URL.
pub(crate) fn url_env(key: &str) -> Result<Option<String>, ConfigError> {
    match optional_env(key)? {
        None => Ok(None),
        Some(value) => {
            url::Url::parse(&value).map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("must be a valid URL: {e}"),
            })?;
            Ok(Some(value))
        }
    }
}

pub(crate) fn normalize_variant(value: &str) -> String {
    value.trim().to_ascii_lowercase().replace(['-', ' '], "_")
}
