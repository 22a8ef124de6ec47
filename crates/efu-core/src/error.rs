//! Error types for object and package operations

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while building or serializing update packages
#[derive(Error, Debug)]
pub enum EfuError {
    /// Mode name is not registered
    #[error("Unknown mode: {0}")]
    UnknownMode(String),

    /// Mode registered twice
    #[error("Mode already registered: {0}")]
    DuplicateMode(String),

    /// Option not declared by the mode, failing its rule, or missing a dependency
    #[error("Invalid option '{key}': {reason}")]
    InvalidOption {
        /// The offending option key
        key: String,
        /// Why the option was rejected
        reason: String,
    },

    /// Lookup of a key the object's mode does not declare
    #[error("Unknown option: {0}")]
    UnknownOption(String),

    /// Package description document missing, unreadable or malformed
    #[error("Invalid package file {path}: {reason}")]
    InvalidPackageFile {
        /// Path of the document
        path: PathBuf,
        /// What went wrong
        reason: String,
    },

    /// Package identity fields rejected
    #[error("Invalid package: {0}")]
    InvalidPackage(String),

    /// No object with this id in the package
    #[error("Object not found: {0}")]
    ObjectNotFound(usize),

    /// File error while reading or writing an artifact or document
    #[error("I/O error on {path}: {source}")]
    Io {
        /// The file involved
        path: PathBuf,
        /// Source error
        source: std::io::Error,
    },

    /// Generated metadata does not satisfy its own schema
    #[error("Metadata violates schema {schema}: {message}")]
    SchemaViolation {
        /// Schema identifier, e.g. `raw-object.json`
        schema: String,
        /// Validator message
        message: String,
    },

    /// JSON encoding failure
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl EfuError {
    /// Create an invalid option error
    pub fn invalid_option(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid package file error
    pub fn invalid_package_file(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidPackageFile {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Wrap an I/O error with the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the error was caused by caller input rather than a broken invariant
    ///
    /// Schema violations, duplicate registrations and encoding failures mean the
    /// encoding logic itself is inconsistent; no change of input fixes them.
    pub fn is_user_error(&self) -> bool {
        match self {
            Self::UnknownMode(_) => true,
            Self::DuplicateMode(_) => false,
            Self::InvalidOption { .. } => true,
            Self::UnknownOption(_) => true,
            Self::InvalidPackageFile { .. } => true,
            Self::InvalidPackage(_) => true,
            Self::ObjectNotFound(_) => true,
            Self::Io { .. } => true,
            Self::SchemaViolation { .. } => false,
            Self::Serialization(_) => false,
        }
    }
}

impl From<serde_json::Error> for EfuError {
    fn from(e: serde_json::Error) -> Self {
        EfuError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_errors_are_separated_from_invariants() {
        assert!(EfuError::UnknownMode("zip".to_string()).is_user_error());
        assert!(EfuError::invalid_option("skip", "negative").is_user_error());
        assert!(EfuError::ObjectNotFound(3).is_user_error());
        assert!(!EfuError::DuplicateMode("raw".to_string()).is_user_error());
        assert!(
            !EfuError::SchemaViolation {
                schema: "raw-object.json".to_string(),
                message: "oops".to_string(),
            }
            .is_user_error()
        );
    }

    #[test]
    fn test_display_carries_context() {
        let err = EfuError::invalid_package_file("pkg.json", "not JSON");
        assert_eq!(err.to_string(), "Invalid package file pkg.json: not JSON");

        let err = EfuError::invalid_option("install-condition-seek", "must be >= 0");
        assert_eq!(
            err.to_string(),
            "Invalid option 'install-condition-seek': must be >= 0"
        );
    }
}
