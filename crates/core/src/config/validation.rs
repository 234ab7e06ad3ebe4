//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::{AppConfig, Output};
use std::collections::HashSet;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

const MAX_FETCH_BYTES: usize = 100 * 1024 * 1024;

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `fetch_limit` or `process_limit` is 0
    /// - `max_bytes` is 0 or exceeds 100MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` or `xslt_command` is empty
    /// - an output has an unusable name, an empty source, or a duplicate name
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fetch_limit == 0 {
            return Err(ConfigError::Invalid { field: "fetch_limit".into(), reason: "must be at least 1".into() });
        }
        if self.process_limit == 0 {
            return Err(ConfigError::Invalid { field: "process_limit".into(), reason: "must be at least 1".into() });
        }

        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must be greater than 0".into() });
        }
        if self.max_bytes > MAX_FETCH_BYTES {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must not exceed 100MB".into() });
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }
        if self.xslt_command.trim().is_empty() {
            return Err(ConfigError::Invalid { field: "xslt_command".into(), reason: "must not be empty".into() });
        }

        let mut names = HashSet::new();
        for (index, output) in self.outputs.iter().enumerate() {
            validate_output(index, output)?;
            if !names.insert(output.name.as_str()) {
                return Err(ConfigError::Invalid {
                    field: format!("outputs[{index}].name"),
                    reason: format!("duplicate output name {:?}", output.name),
                });
            }
        }

        if self.outputs.is_empty() {
            tracing::warn!("No outputs configured; nothing will be fetched");
        }

        Ok(())
    }
}

/// Output names become file names in the output directory, so they must stay
/// inside it.
fn validate_output(index: usize, output: &Output) -> Result<(), ConfigError> {
    let name = output.name.as_str();
    let invalid = |reason: &str| ConfigError::Invalid { field: format!("outputs[{index}].name"), reason: reason.into() };

    if name.is_empty() {
        return Err(invalid("must not be empty"));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(invalid("must not contain path separators"));
    }
    if name == "." || name == ".." {
        return Err(invalid("must name a file"));
    }

    if output.source.trim().is_empty() {
        return Err(ConfigError::Invalid {
            field: format!("outputs[{index}].source"),
            reason: "must not be empty".into(),
        });
    }

    Ok(())
}
