//! Configuration validation
//!
//! Validates configuration and reports issues.

use super::types::Config;

/// Result of configuration validation
#[derive(Debug, Clone)]
pub struct ConfigValidationResult {
    /// Whether the config is valid
    pub valid: bool,
    /// Validation errors (critical)
    pub errors: Vec<ValidationIssue>,
    /// Validation warnings (non-critical)
    pub warnings: Vec<ValidationIssue>,
}

impl ConfigValidationResult {
    /// Create a valid result
    pub fn valid() -> Self {
        ConfigValidationResult {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Add an error
    pub fn with_error(mut self, issue: ValidationIssue) -> Self {
        self.valid = false;
        self.errors.push(issue);
        self
    }

    /// Add a warning
    pub fn with_warning(mut self, issue: ValidationIssue) -> Self {
        self.warnings.push(issue);
        self
    }
}

/// A validation issue
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Path to the config field
    pub path: String,
    /// Issue message
    pub message: String,
    /// Suggested fix
    pub suggestion: Option<String>,
}

impl ValidationIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationIssue {
            path: path.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)?;
        if let Some(suggestion) = &self.suggestion {
            write!(f, " ({})", suggestion)?;
        }
        Ok(())
    }
}

/// Validate the configuration
pub fn validate_config(config: &Config) -> ConfigValidationResult {
    let mut result = ConfigValidationResult::valid();

    result = validate_relay_config(config, result);
    result = validate_server_config(config, result);

    result
}

fn validate_relay_config(config: &Config, mut result: ConfigValidationResult) -> ConfigValidationResult {
    if config.relay.rate_quota == 0 {
        result = result.with_error(
            ValidationIssue::new("relay.rate_quota", "Rate quota must admit at least one request")
                .with_suggestion("Set RELAY_RATE_QUOTA to a positive number"),
        );
    }

    if config.relay.rate_window.is_zero() {
        result = result.with_error(
            ValidationIssue::new("relay.rate_window", "Rate window must be longer than zero")
                .with_suggestion("Use a humantime value such as \"60s\""),
        );
    }

    if config.relay.input_queue_capacity == 0 {
        result = result.with_error(ValidationIssue::new(
            "relay.input_queue_capacity",
            "Input queue capacity must be positive",
        ));
    }

    if config.relay.shutdown_grace.is_zero() {
        result = result.with_warning(ValidationIssue::new(
            "relay.shutdown_grace",
            "Zero grace period: the sibling pump is aborted immediately on disconnect",
        ));
    }

    result
}

fn validate_server_config(config: &Config, mut result: ConfigValidationResult) -> ConfigValidationResult {
    if config.server.allowed_origins.is_empty() {
        result = result.with_warning(
            ValidationIssue::new(
                "server.allowed_origins",
                "No CORS origins configured. Browser clients on other origins will be rejected.",
            )
            .with_suggestion("Set RELAY_ALLOWED_ORIGINS to a comma-separated list"),
        );
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_default_config_is_valid() {
        let result = validate_config(&Config::default());
        assert!(result.valid);
        assert!(result.errors.is_empty());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_zero_quota_and_window_are_errors() {
        let mut config = Config::default();
        config.relay.rate_quota = 0;
        config.relay.rate_window = Duration::ZERO;

        let result = validate_config(&config);
        assert!(!result.valid);
        let paths: Vec<_> = result.errors.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["relay.rate_quota", "relay.rate_window"]);
    }

    #[test]
    fn test_empty_origins_is_warning() {
        let mut config = Config::default();
        config.server.allowed_origins.clear();
        config.relay.shutdown_grace = Duration::ZERO;

        let result = validate_config(&config);
        assert!(result.valid);
        assert_eq!(result.warnings.len(), 2);
    }
}
