// Error types for the typebeat pattern engine
//
// This module defines custom error types for persistence operations,
// providing structured error handling with error codes suitable for
// host-application diagnostics.

mod persistence;

pub use persistence::{log_persistence_error, PersistenceError, PersistenceErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling in the
/// host application.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
