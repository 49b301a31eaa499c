// Custom error types for better error handling and debugging
//
// Using thiserror for ergonomic error definitions with:
// - Context preservation
// - Type-safe error matching
// - Automatic Display/Error trait implementations
// - Source error chaining

use thiserror::Error;

/// Configuration errors (startup-time, never per-call)
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("OCR endpoint not configured (set OCR_ENDPOINT environment variable)")]
    MissingEndpoint,

    #[error("OCR API key not configured (set OCR_API_KEY environment variable)")]
    MissingApiKey,

    #[error("Invalid poll policy: {0}")]
    InvalidPollPolicy(String),
}

/// Image preprocessing errors
#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("Image decoding failed: {0}")]
    Decode(#[from] image::ImageError),

    #[error("PNG encoding failed: {0}")]
    Encode(#[source] image::ImageError),

    #[error("Base64 payload decoding failed: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Image file could not be read: {0}")]
    Io(#[from] std::io::Error),

    #[error("Blocking image task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// OCR client errors
///
/// A submit rejection is terminal for the invocation; it is never retried
/// automatically. The caller decides whether to start a new operation.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("OCR backend rejected credentials (status {status}): {message}")]
    Auth { status: u16, message: String },

    #[error("OCR submit rejected (status {status}): {message}")]
    Submit { status: u16, message: String },

    #[error("Accepted response carried no Operation-Location header")]
    MissingOperationLocation,

    #[error("HTTP transport failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Operation did not reach a terminal status within {attempts} poll attempts")]
    PollTimeout { attempts: u32 },

    #[error("OCR backend reported failed analysis")]
    Backend,

    #[error("Recognition cancelled by caller")]
    Cancelled,
}

// Convenience type aliases for Results
pub type ConfigResult<T> = Result<T, ConfigError>;
pub type PreprocessResult<T> = Result<T, PreprocessError>;
pub type OcrResult<T> = Result<T, OcrError>;
