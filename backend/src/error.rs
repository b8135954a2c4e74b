//! Error types for the member registry.
//!
//! Each concern gets its own enum and the higher-level ones wrap the lower
//! ones through `From`, so `?` works across boundaries:
//!
//! - [`FileError`] - an uploaded file was rejected before parsing
//! - [`StoreError`] - the remote member store failed
//! - [`ImportError`] - bulk import session errors
//! - [`RegisterError`] - single-member registration errors
//! - [`ConfigError`] - invalid environment configuration
//! - [`ServerError`] - HTTP front end errors
//!
//! Row-level validation problems are not errors: they travel as data on
//! [`crate::import::ParsedRow`].

use thiserror::Error;

use crate::validation::FormErrors;

// =============================================================================
// File Rejection
// =============================================================================

/// Reasons an input file is refused before any parsing happens.
#[derive(Debug, Error)]
pub enum FileError {
    /// File name does not end in `.csv`.
    #[error("Please select a valid .csv file (got '{file_name}')")]
    NotCsv { file_name: String },

    /// File is larger than the configured limit.
    #[error("File is too large: {size} bytes (limit {limit} bytes)")]
    TooLarge { size: usize, limit: usize },

    /// Failed to read the file.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Remote Store Errors
// =============================================================================

/// Errors from the external member store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No store endpoint configured.
    #[error("Member store is not configured (set MEMBERREG_STORE_URL)")]
    NotConfigured,

    /// The request could not be sent or the response could not be read.
    #[error("Store request failed: {0}")]
    Request(String),

    /// The store answered with a non-success status.
    #[error("Store returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The store answered with a body we cannot understand.
    #[error("Invalid store response: {0}")]
    InvalidResponse(String),

    /// A membership number is already taken.
    #[error("Membership number already registered: {0}")]
    DuplicateMembershipNumber(String),

    /// The store is temporarily unavailable.
    #[error("Member store unavailable: {0}")]
    Unavailable(String),
}

// =============================================================================
// Import Errors
// =============================================================================

/// Errors raised by a bulk import session.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The file was rejected.
    #[error(transparent)]
    File(#[from] FileError),

    /// A batch submission is already in flight.
    #[error("An import is already in progress")]
    Busy,

    /// There are no valid rows to submit.
    #[error("No valid rows to import")]
    NothingToImport,

    /// The batch submission failed; parsed rows are kept for a retry.
    #[error("Import failed: {0}")]
    Store(#[from] StoreError),
}

// =============================================================================
// Registration Errors
// =============================================================================

/// Errors raised when registering a single member.
#[derive(Debug, Error)]
pub enum RegisterError {
    /// One or more form fields are invalid.
    #[error("Form has {} invalid field(s)", .0.len())]
    Invalid(FormErrors),

    /// A registration is already in flight.
    #[error("A registration is already in progress")]
    Busy,

    /// The store refused or failed the registration.
    #[error("Registration failed: {0}")]
    Store(#[from] StoreError),
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Invalid configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable holds a value we cannot use.
    #[error("Invalid value '{value}' for {key}: expected {expected}")]
    InvalidValue {
        key: String,
        value: String,
        expected: &'static str,
    },
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Binding or serving failed.
    #[error("Server IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Shared state could not be used.
    #[error("Internal error: {0}")]
    Internal(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for store calls.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for import operations.
pub type ImportResult<T> = Result<T, ImportError>;

/// Result type for registration.
pub type RegisterResult<T> = Result<T, RegisterError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Field;

    #[test]
    fn test_error_conversion_chain() {
        // FileError -> ImportError
        let file_err = FileError::NotCsv { file_name: "members.xlsx".into() };
        let import_err: ImportError = file_err.into();
        assert!(import_err.to_string().contains("members.xlsx"));

        // StoreError -> ImportError
        let store_err = StoreError::Unavailable("maintenance".into());
        let import_err: ImportError = store_err.into();
        assert!(import_err.to_string().contains("maintenance"));
        assert!(import_err.to_string().starts_with("Import failed"));
    }

    #[test]
    fn test_register_error_counts_fields() {
        let mut errors = FormErrors::new();
        errors.insert(Field::Name, "Full name is required.".into());
        errors.insert(Field::Area, "Area is required.".into());
        let err = RegisterError::Invalid(errors);
        assert_eq!(err.to_string(), "Form has 2 invalid field(s)");
    }

    #[test]
    fn test_status_error_format() {
        let err = StoreError::Status { status: 503, body: "down".into() };
        let msg = err.to_string();
        assert!(msg.contains("503"));
        assert!(msg.contains("down"));
    }
}
