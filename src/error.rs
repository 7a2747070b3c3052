//! Error types for one-shot remote calls
//!
//! Every failure a session can produce collapses into [`CallError`], which
//! carries a coarse [`ErrorKind`] for the reporter and exit-code mapping.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Main error type for session and envelope operations
#[derive(Debug, Error)]
pub enum CallError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] crate::config::ConfigError),

    #[error("Connection error: {message}")]
    Connection { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Remote error: {message}")]
    Remote { message: String },
}

/// Coarse classification of a [`CallError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    Connection,
    Validation,
    Remote,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Configuration => "configuration error",
            ErrorKind::Connection => "connection error",
            ErrorKind::Validation => "validation error",
            ErrorKind::Remote => "remote error",
        };
        f.write_str(name)
    }
}

impl CallError {
    /// Kind used by the reporter
    pub fn kind(&self) -> ErrorKind {
        match self {
            CallError::Configuration(_) => ErrorKind::Configuration,
            CallError::Connection { .. } => ErrorKind::Connection,
            CallError::Validation { .. } => ErrorKind::Validation,
            CallError::Remote { .. } => ErrorKind::Remote,
        }
    }

    /// Message without the kind prefix, sanitized for display
    pub fn reportable_message(&self) -> String {
        let raw = match self {
            CallError::Configuration(e) => e.to_string(),
            CallError::Connection { message }
            | CallError::Validation { message }
            | CallError::Remote { message } => message.clone(),
        };
        sanitize_error_message(&raw)
    }

    /// Create connection error
    pub fn connection<S: Into<String>>(message: S) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create remote error
    pub fn remote<S: Into<String>>(message: S) -> Self {
        Self::Remote {
            message: message.into(),
        }
    }
}

static SECRET_PAIR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(password|token|key|secret)[=:]\s*\S+").expect("static regex is valid")
});

static BEARER_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)bearer\s+\S+").expect("static regex is valid"));

static SENSITIVE_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/[a-zA-Z0-9._/-]+/(secrets?|\.ssh|\.aws|\.config)/[a-zA-Z0-9._/-]+")
        .expect("static regex is valid")
});

const MAX_MESSAGE_LEN: usize = 500;
const TRUNCATE_SUFFIX: &str = "...[truncated]";

/// Redact credentials and sensitive paths, then cap the length
pub fn sanitize_error_message(message: &str) -> String {
    let mut sanitized = SECRET_PAIR.replace_all(message, "${1}=***").to_string();
    sanitized = BEARER_VALUE
        .replace_all(&sanitized, "Bearer ***")
        .to_string();
    sanitized = SENSITIVE_PATH
        .replace_all(&sanitized, "/***REDACTED***/")
        .to_string();

    if sanitized.len() > MAX_MESSAGE_LEN {
        let mut cut = MAX_MESSAGE_LEN - TRUNCATE_SUFFIX.len();
        while !sanitized.is_char_boundary(cut) {
            cut -= 1;
        }
        sanitized = format!("{}{}", &sanitized[..cut], TRUNCATE_SUFFIX);
    }

    sanitized
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            CallError::Configuration(ConfigError::EnvVarNotFound("X".into())).kind(),
            ErrorKind::Configuration
        );
        assert_eq!(CallError::connection("x").kind(), ErrorKind::Connection);
        assert_eq!(CallError::validation("x").kind(), ErrorKind::Validation);
        assert_eq!(CallError::remote("x").kind(), ErrorKind::Remote);
    }

    #[test]
    fn test_display_includes_prefix() {
        assert_eq!(
            CallError::remote("model not found").to_string(),
            "Remote error: model not found"
        );
        assert_eq!(
            CallError::validation("empty destination").to_string(),
            "Validation error: empty destination"
        );
    }

    #[test]
    fn test_reportable_message_has_no_prefix() {
        let error = CallError::connection("broker unreachable");
        assert_eq!(error.reportable_message(), "broker unreachable");
    }

    #[test]
    fn test_error_kind_display() {
        assert_eq!(ErrorKind::Remote.to_string(), "remote error");
        assert_eq!(ErrorKind::Configuration.to_string(), "configuration error");
    }

    #[test]
    fn test_sanitize_multiple_secrets() {
        let message = "Auth failed: password=pass1 api_key=key123 secret=hidden token=tok456";
        let sanitized = sanitize_error_message(message);

        assert!(!sanitized.contains("pass1"));
        assert!(!sanitized.contains("key123"));
        assert!(!sanitized.contains("hidden"));
        assert!(!sanitized.contains("tok456"));
        assert!(sanitized.contains("password=***"));
    }

    #[test]
    fn test_sanitize_bearer_token() {
        let sanitized = sanitize_error_message("sent Authorization: Bearer abc.def.ghi");
        assert!(!sanitized.contains("abc.def.ghi"));
        assert!(sanitized.contains("Bearer ***"));
    }

    #[test]
    fn test_sanitize_aws_config_paths() {
        let sanitized = sanitize_error_message("Failed to read /home/user/.aws/credentials");
        assert!(sanitized.contains("/***REDACTED***/"));
        assert!(!sanitized.contains(".aws/credentials"));
    }

    #[test]
    fn test_long_message_truncation() {
        let sanitized = sanitize_error_message(&"x".repeat(600));
        assert!(sanitized.len() <= 500);
        assert!(sanitized.ends_with("...[truncated]"));
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        let sanitized = sanitize_error_message(&"é".repeat(400));
        assert!(sanitized.len() <= 500);
        assert!(sanitized.ends_with("...[truncated]"));
    }

    #[test]
    fn test_sanitize_exactly_500_chars() {
        let sanitized = sanitize_error_message(&"x".repeat(500));
        assert_eq!(sanitized.len(), 500);
        assert!(!sanitized.contains("truncated"));
    }
}
