// Persistence error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Persistence error code constants
///
/// These constants provide a single source of truth for error codes
/// reported to the host application when snapshot save/load fails.
///
/// Error code range: 3001-3004
pub struct PersistenceErrorCodes {}

impl PersistenceErrorCodes {
    /// Snapshot file could not be read
    pub const READ_FAILED: i32 = 3001;

    /// Snapshot payload could not be parsed
    pub const PARSE_FAILED: i32 = 3002;

    /// Snapshot file could not be written
    pub const WRITE_FAILED: i32 = 3003;

    /// Snapshot version is not supported
    pub const UNSUPPORTED_VERSION: i32 = 3004;
}

/// Log a persistence error with structured context
///
/// Persistence failures are never fatal to the engine (it falls back to an
/// empty state), so they are logged here and surfaced as a Result only to
/// callers that want to react.
pub fn log_persistence_error(err: &PersistenceError, context: &str) {
    error!(
        "Persistence error in {}: code={}, component=EngineSnapshot, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Persistence-related errors
///
/// These errors cover engine snapshot serialization, deserialization,
/// and file I/O.
///
/// Error code range: 3001-3004
#[derive(Debug, Clone, PartialEq)]
pub enum PersistenceError {
    /// Snapshot file could not be read
    ReadFailed { reason: String },

    /// Snapshot payload could not be parsed
    ParseFailed { reason: String },

    /// Snapshot file could not be written
    WriteFailed { reason: String },

    /// Snapshot version is not supported by this build
    UnsupportedVersion { found: u32, supported: u32 },
}

impl ErrorCode for PersistenceError {
    fn code(&self) -> i32 {
        match self {
            PersistenceError::ReadFailed { .. } => PersistenceErrorCodes::READ_FAILED,
            PersistenceError::ParseFailed { .. } => PersistenceErrorCodes::PARSE_FAILED,
            PersistenceError::WriteFailed { .. } => PersistenceErrorCodes::WRITE_FAILED,
            PersistenceError::UnsupportedVersion { .. } => {
                PersistenceErrorCodes::UNSUPPORTED_VERSION
            }
        }
    }

    fn message(&self) -> String {
        match self {
            PersistenceError::ReadFailed { reason } => {
                format!("Snapshot read failed: {}", reason)
            }
            PersistenceError::ParseFailed { reason } => {
                format!("Snapshot parse failed: {}", reason)
            }
            PersistenceError::WriteFailed { reason } => {
                format!("Snapshot write failed: {}", reason)
            }
            PersistenceError::UnsupportedVersion { found, supported } => {
                format!(
                    "Unsupported snapshot version {} (supported: {})",
                    found, supported
                )
            }
        }
    }
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PersistenceError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for PersistenceError {}
