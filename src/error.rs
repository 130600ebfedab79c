//! Error taxonomy for the batch pipeline.
//!
//! Per-item failures (`SynthesisError`, `RenameError`) are collected into a
//! `BatchResult`; `BatchError` aborts a whole run before or while it executes.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Caller input that can never reach the engine. Never retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("text is empty")]
    EmptyInput,
    #[error("no voice selected")]
    MissingVoice,
    #[error("invalid rate '{0}', expected a signed percentage such as '+0%' or '-10%'")]
    InvalidRateFormat(String),
    #[error("invalid volume '{0}', expected a signed percentage such as '+0%' or '-10%'")]
    InvalidVolumeFormat(String),
}

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("engine reported success but no output file was found at {}", .0.display())]
    MissingOutput(PathBuf),
    #[error("cannot inspect output file {}: {source}", .path.display())]
    StatError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("output file {} is only {size} bytes (minimum {minimum}), synthesis probably failed", .path.display())]
    UndersizedOutput {
        path: PathBuf,
        size: u64,
        minimum: u64,
    },
}

/// Failure of a single synthesis item.
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("engine reported failure: {message}")]
    Engine { message: String, raw_output: String },
    #[error("engine process failed: {0}")]
    Process(#[source] io::Error),
    #[error(transparent)]
    Verify(#[from] VerifyError),
    #[error("cannot create output directory {}: {source}", .path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl SynthesisError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            SynthesisError::Validation(_) | SynthesisError::OutputDir { .. }
        )
    }

    /// Raw engine output, when the engine produced any.
    pub fn raw_output(&self) -> Option<&str> {
        match self {
            SynthesisError::Engine { raw_output, .. } => Some(raw_output),
            _ => None,
        }
    }
}

/// Fatal to an entire batch run.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("speech engine '{program}' was not found on PATH: {reason}")]
    EngineNotFound { program: String, reason: String },
    #[error("cannot create output directory {}: {source}", .path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("batch worker thread panicked")]
    WorkerPanicked,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("voice catalog unavailable from '{program}': {reason}")]
    CatalogUnavailable { program: String, reason: String },
    #[error("voice listing output is malformed")]
    MalformedListing,
    #[error("cannot load voice label table {}: {reason}", .path.display())]
    Labels { path: PathBuf, reason: String },
}

#[derive(Debug, Error)]
pub enum RenameError {
    #[error("source file does not exist: {}", .0.display())]
    SourceMissing(PathBuf),
    #[error("rename failed {} -> {}: {source}", .from.display(), .to.display())]
    RenameFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum TableError {
    #[error("cannot read table {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("table {} contains no data rows", .0.display())]
    Empty(PathBuf),
}
