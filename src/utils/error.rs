use thiserror::Error;

use crate::domain::model::ValidationError;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidConfigValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfig { field: String },

    #[error("Unknown transform kind '{kind}' for column '{column}'")]
    UnknownTransform { column: String, kind: String },

    #[error("Schema validation failed: {}", summarize(.errors))]
    SchemaValidation { errors: Vec<ValidationError> },

    #[error("Data quality check failed: {message}")]
    QualityCheck { message: String },

    #[error("Data processing error: {message}")]
    Processing { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Database error: {message}")]
    Database { message: String },

    #[error("Catalog error: {message}")]
    Catalog { message: String },
}

/// Operational error taxonomy: configuration errors are fatal and not worth
/// retrying, transient errors are the orchestrator's retry domain, and
/// data-quality errors halt the run with a full report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Transient,
    DataQuality,
}

impl EtlError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::Config { .. }
            | EtlError::InvalidConfigValue { .. }
            | EtlError::MissingConfig { .. }
            | EtlError::UnknownTransform { .. } => ErrorCategory::Configuration,
            EtlError::SchemaValidation { .. }
            | EtlError::QualityCheck { .. }
            | EtlError::Csv(_)
            | EtlError::Serialization(_)
            | EtlError::Processing { .. } => ErrorCategory::DataQuality,
            EtlError::Http(_)
            | EtlError::Io(_)
            | EtlError::Storage { .. }
            | EtlError::Database { .. }
            | EtlError::Catalog { .. } => ErrorCategory::Transient,
        }
    }
}

fn summarize(errors: &[ValidationError]) -> String {
    let listed: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
    format!("{} error(s): [{}]", errors.len(), listed.join("; "))
}

pub type Result<T> = std::result::Result<T, EtlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_validation_message_lists_every_row() {
        let err = EtlError::SchemaValidation {
            errors: vec![
                ValidationError {
                    row: 0,
                    message: "required field 'ssn' is null".to_string(),
                },
                ValidationError {
                    row: 3,
                    message: "field 'age' is not a number".to_string(),
                },
            ],
        };

        let msg = err.to_string();
        assert!(msg.contains("2 error(s)"));
        assert!(msg.contains("row 0"));
        assert!(msg.contains("row 3"));
    }

    #[test]
    fn categories_follow_the_taxonomy() {
        let config = EtlError::UnknownTransform {
            column: "ssn".to_string(),
            kind: "rot13".to_string(),
        };
        assert_eq!(config.category(), ErrorCategory::Configuration);

        let quality = EtlError::QualityCheck {
            message: "found 1 duplicate".to_string(),
        };
        assert_eq!(quality.category(), ErrorCategory::DataQuality);

        let transient = EtlError::Database {
            message: "connection refused".to_string(),
        };
        assert_eq!(transient.category(), ErrorCategory::Transient);
    }
}
