//! # Error Types
//!
//! Structured error types for slab_core. These errors are designed to be
//! informative for both humans and automated consumers, providing enough
//! context to understand and fix issues programmatically.
//!
//! Measurement arithmetic itself never fails; the engine functions in
//! [`crate::measure`] are total. Errors arise at the edges: session
//! finalization, ledger lookups, and file handling.
//!
//! ## Example
//!
//! ```rust
//! use slab_core::errors::{DispatchError, DispatchResult};
//!
//! fn validate_lot(lot_number: &str) -> DispatchResult<()> {
//!     if lot_number.trim().is_empty() {
//!         return Err(DispatchError::MissingField {
//!             field: "lot_number".to_string(),
//!         });
//!     }
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for slab_core operations
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Structured error type for dispatch operations.
///
/// Each variant provides specific context about what went wrong,
/// enabling programmatic handling by callers and UIs.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum DispatchError {
    /// An input value is invalid (out of range, wrong type, etc.)
    #[error("Invalid input for '{field}': {value} - {reason}")]
    InvalidInput {
        field: String,
        value: String,
        reason: String,
    },

    /// A required field is missing
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    /// A slab number collides with one already recorded in the dispatch
    #[error("Duplicate slab number {slab_number} in dispatch")]
    DuplicateSlabNumber { slab_number: i32 },

    /// More corner deductions than a slab supports
    #[error("Slab {slab_number} already has the maximum of {limit} corner deductions")]
    TooManyDeductions { slab_number: i32, limit: usize },

    /// Record not found in the ledger
    #[error("Record not found: {id}")]
    RecordNotFound { id: String },

    /// File I/O error
    #[error("File error: {operation} on '{path}' - {reason}")]
    FileError {
        operation: String,
        path: String,
        reason: String,
    },

    /// File is locked by another user/process
    #[error("File locked: '{path}' is locked by {locked_by} since {locked_at}")]
    FileLocked {
        path: String,
        locked_by: String,
        locked_at: String,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {reason}")]
    SerializationError { reason: String },

    /// Schema version mismatch
    #[error("Version mismatch: file version {file_version}, expected {expected_version}")]
    VersionMismatch {
        file_version: String,
        expected_version: String,
    },

    /// PDF rendering error
    #[error("PDF rendering failed: {reason}")]
    PdfError { reason: String },

    /// Generic internal error (should be rare)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DispatchError {
    /// Create an InvalidInput error
    pub fn invalid_input(field: impl Into<String>, value: impl Into<String>, reason: impl Into<String>) -> Self {
        DispatchError::InvalidInput {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a MissingField error
    pub fn missing_field(field: impl Into<String>) -> Self {
        DispatchError::MissingField {
            field: field.into(),
        }
    }

    /// Create a DuplicateSlabNumber error
    pub fn duplicate_slab_number(slab_number: i32) -> Self {
        DispatchError::DuplicateSlabNumber { slab_number }
    }

    /// Create a RecordNotFound error
    pub fn record_not_found(id: impl Into<String>) -> Self {
        DispatchError::RecordNotFound { id: id.into() }
    }

    /// Create a FileError
    pub fn file_error(operation: impl Into<String>, path: impl Into<String>, reason: impl Into<String>) -> Self {
        DispatchError::FileError {
            operation: operation.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a FileLocked error
    pub fn file_locked(path: impl Into<String>, locked_by: impl Into<String>, locked_at: impl Into<String>) -> Self {
        DispatchError::FileLocked {
            path: path.into(),
            locked_by: locked_by.into(),
            locked_at: locked_at.into(),
        }
    }

    /// Create a PdfError
    pub fn pdf_error(reason: impl Into<String>) -> Self {
        DispatchError::PdfError {
            reason: reason.into(),
        }
    }

    /// Check if this is a recoverable error (e.g., can retry)
    pub fn is_recoverable(&self) -> bool {
        matches!(self, DispatchError::FileLocked { .. })
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            DispatchError::InvalidInput { .. } => "INVALID_INPUT",
            DispatchError::MissingField { .. } => "MISSING_FIELD",
            DispatchError::DuplicateSlabNumber { .. } => "DUPLICATE_SLAB_NUMBER",
            DispatchError::TooManyDeductions { .. } => "TOO_MANY_DEDUCTIONS",
            DispatchError::RecordNotFound { .. } => "RECORD_NOT_FOUND",
            DispatchError::FileError { .. } => "FILE_ERROR",
            DispatchError::FileLocked { .. } => "FILE_LOCKED",
            DispatchError::SerializationError { .. } => "SERIALIZATION_ERROR",
            DispatchError::VersionMismatch { .. } => "VERSION_MISMATCH",
            DispatchError::PdfError { .. } => "PDF_ERROR",
            DispatchError::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serialization() {
        let error = DispatchError::invalid_input("slab_number", "0", "Slab number must be positive");
        let json = serde_json::to_string(&error).unwrap();
        let roundtrip: DispatchError = serde_json::from_str(&json).unwrap();
        assert_eq!(error, roundtrip);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(DispatchError::missing_field("party_name").error_code(), "MISSING_FIELD");
        assert_eq!(DispatchError::duplicate_slab_number(7).error_code(), "DUPLICATE_SLAB_NUMBER");
    }

    #[test]
    fn test_only_lock_errors_are_recoverable() {
        assert!(DispatchError::file_locked("dispatch.slt", "ops@mill-01", "2026-02-13T09:00:00Z").is_recoverable());
        assert!(!DispatchError::duplicate_slab_number(7).is_recoverable());
    }
}
