//! Error types for document loading, encoding, validation and configuration.
//!
//! Content generation itself never fails: unresolvable schema branches become
//! absent values. Only the surfaces around it return these errors.

use std::path::PathBuf;
use thiserror::Error;

/// Errors while loading an OpenAPI document or looking up an operation.
#[derive(Debug, Error)]
pub enum DocumentError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid YAML: {source}")]
    InvalidYaml {
        #[source]
        source: serde_yaml::Error,
    },

    #[error("unsupported document version \"{version}\": expected openapi 3.x")]
    UnsupportedVersion { version: String },

    #[error("reference not found: {reference}")]
    RefNotFound { reference: String },

    #[error("circular reference detected: {reference}")]
    CircularRef { reference: String },

    // Lookup errors (exit code 2). Callers map these to 404 and 405.
    #[error("operation not found: {resource}")]
    OperationNotFound { resource: String },

    #[error("method {method} not allowed for {resource}")]
    MethodNotAllowed { method: String, resource: String },
}

impl DocumentError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            DocumentError::FileNotFound { .. } | DocumentError::ReadError { .. } => 3,
            _ => 2,
        }
    }

    /// Whether the error means the resource exists but not for this method.
    pub fn is_method_not_allowed(&self) -> bool {
        matches!(self, DocumentError::MethodNotAllowed { .. })
    }
}

/// Errors while encoding generated content into bytes.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("cannot encode JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cannot encode XML: {0}")]
    Xml(#[from] quick_xml::se::SeError),

    #[error("cannot encode YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("unexpected content for {content_type}: expected an object")]
    UnexpectedFormType { content_type: String },
}

/// Errors during validation of generated content.
#[derive(Debug, Error)]
pub enum ValidateError {
    #[error("invalid schema: {message}")]
    InvalidSchema { message: String },

    #[error("validation failed with {} error(s)", errors.len())]
    Invalid { errors: Vec<SchemaError> },
}

/// Single validation error with path context.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SchemaError {
    /// JSON Pointer (RFC 6901) to the invalid field.
    pub path: String,
    /// Human-readable error message.
    pub message: String,
}

impl std::fmt::Display for SchemaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

impl ValidateError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ValidateError::InvalidSchema { .. } => 2,
            ValidateError::Invalid { .. } => 1,
        }
    }
}

/// Errors while loading service configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {source}")]
    InvalidYaml {
        #[source]
        source: serde_yaml::Error,
    },
}

impl ConfigError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ConfigError::ReadError { .. } => 3,
            ConfigError::InvalidYaml { .. } => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_error_exit_codes() {
        let err = DocumentError::FileNotFound {
            path: PathBuf::from("petstore.yaml"),
        };
        assert_eq!(err.exit_code(), 3);

        let err = DocumentError::OperationNotFound {
            resource: "/pets".into(),
        };
        assert_eq!(err.exit_code(), 2);

        let err = DocumentError::UnsupportedVersion {
            version: "2.0".into(),
        };
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn method_not_allowed_is_distinct() {
        let not_found = DocumentError::OperationNotFound {
            resource: "/pets".into(),
        };
        let not_allowed = DocumentError::MethodNotAllowed {
            method: "DELETE".into(),
            resource: "/pets".into(),
        };
        assert!(!not_found.is_method_not_allowed());
        assert!(not_allowed.is_method_not_allowed());
        assert_eq!(not_allowed.to_string(), "method DELETE not allowed for /pets");
    }

    #[test]
    fn validate_error_exit_codes() {
        let err = ValidateError::Invalid {
            errors: vec![SchemaError {
                path: "/id".into(),
                message: "missing required field".into(),
            }],
        };
        assert_eq!(err.exit_code(), 1);
        assert_eq!(err.to_string(), "validation failed with 1 error(s)");
    }

    #[test]
    fn schema_error_display() {
        let err = SchemaError {
            path: "/user/email".into(),
            message: "expected string, got number".into(),
        };
        assert_eq!(err.to_string(), "/user/email: expected string, got number");
    }
}
