//! Error types for configuration loading.

use thiserror::Error;

/// Configuration could not be loaded or is invalid.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading the file failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// The file extension names no known format
    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),

    /// A value is out of range
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue {
        /// Field name
        field: String,
        /// Error message
        message: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(field: &str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::invalid("tunables.histogram_bins", "must be positive");
        assert_eq!(
            err.to_string(),
            "Invalid value for 'tunables.histogram_bins': must be positive"
        );

        let err = ConfigError::UnsupportedFormat("ini".to_string());
        assert_eq!(err.to_string(), "Unsupported config format: ini");
    }
}
