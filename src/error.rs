//! Centralized error types for invoice-archiver.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// A single rejected configuration field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Config key, e.g. `"search_days"`.
    pub field: &'static str,
    /// Human-readable reason, including the offending value.
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Wrapper so a list of field errors renders one per line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldErrors(pub Vec<FieldError>);

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "  - {e}")?;
        }
        Ok(())
    }
}

/// All errors produced by the invoice-archiver library.
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The specified file does not exist.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// The config file is not valid TOML or has wrongly typed fields.
    #[error("Cannot parse config '{path}': {reason}")]
    ConfigParse { path: PathBuf, reason: String },

    /// The configuration parsed but failed validation.
    #[error("Invalid configuration:\n{0}")]
    InvalidConfig(FieldErrors),

    /// A label path is not syntactically valid.
    #[error("Invalid label '{label}': {reason}")]
    InvalidLabel { label: String, reason: String },

    /// No preset exists under the requested name.
    #[error("Unknown preset '{0}'")]
    UnknownPreset(String),

    /// The processed-label ledger is corrupt.
    #[error("Corrupt ledger '{path}': {reason}")]
    InvalidLedger { path: PathBuf, reason: String },

    /// A MIME decoding error.
    #[error("MIME decoding error: {0}")]
    MimeError(String),

    /// Writing to the storage location failed.
    #[error("Storage error: {0}")]
    StorageError(String),
}

/// Convenience alias for `Result<T, ArchiveError>`.
pub type Result<T> = std::result::Result<T, ArchiveError>;

impl ArchiveError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Allow `?` on `std::io::Error` when no path context is available
/// (rare; prefer `ArchiveError::io`).
impl From<std::io::Error> for ArchiveError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<unknown>"),
            source,
        }
    }
}
