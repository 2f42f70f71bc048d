//! Error types and handling for Hestia
//!
//! This module defines the error types used throughout the application,
//! providing consistent error handling and reporting.

use thiserror::Error;

/// Result type alias for Hestia operations
pub type Result<T> = std::result::Result<T, HestiaError>;

/// Main error type for Hestia
#[derive(Debug, Error)]
pub enum HestiaError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Telemetry acquisition errors (database unreachable, stale or
    /// malformed readings)
    #[error("Telemetry error: {message}")]
    Telemetry { message: String },

    /// MQTT command channel errors
    #[error("MQTT error: {message}")]
    Mqtt { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// File I/O errors
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Validation errors
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    /// Generic errors with context
    #[error("Error: {message}")]
    Generic { message: String },
}

impl HestiaError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        HestiaError::Config {
            message: message.into(),
        }
    }

    /// Create a new telemetry error
    pub fn telemetry<S: Into<String>>(message: S) -> Self {
        HestiaError::Telemetry {
            message: message.into(),
        }
    }

    /// Create a new MQTT error
    pub fn mqtt<S: Into<String>>(message: S) -> Self {
        HestiaError::Mqtt {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(field: S, message: S) -> Self {
        HestiaError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        HestiaError::Io {
            message: message.into(),
        }
    }

    /// Create a new generic error
    pub fn generic<S: Into<String>>(message: S) -> Self {
        HestiaError::Generic {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for HestiaError {
    fn from(err: std::io::Error) -> Self {
        HestiaError::io(err.to_string())
    }
}

impl From<serde_yaml::Error> for HestiaError {
    fn from(err: serde_yaml::Error) -> Self {
        HestiaError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for HestiaError {
    fn from(err: serde_json::Error) -> Self {
        HestiaError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<sqlx::Error> for HestiaError {
    fn from(err: sqlx::Error) -> Self {
        HestiaError::telemetry(err.to_string())
    }
}

impl From<rumqttc::ClientError> for HestiaError {
    fn from(err: rumqttc::ClientError) -> Self {
        HestiaError::mqtt(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = HestiaError::config("test config error");
        assert!(matches!(err, HestiaError::Config { .. }));

        let err = HestiaError::telemetry("test telemetry error");
        assert!(matches!(err, HestiaError::Telemetry { .. }));

        let err = HestiaError::validation("field", "test validation error");
        assert!(matches!(err, HestiaError::Validation { .. }));
    }

    #[test]
    fn test_error_display() {
        let err = HestiaError::config("test error");
        let error_string = format!("{}", err);
        assert_eq!(error_string, "Configuration error: test error");

        let err = HestiaError::validation("test_field", "invalid value");
        let error_string = format!("{}", err);
        assert_eq!(error_string, "Validation error: test_field - invalid value");
    }
}
