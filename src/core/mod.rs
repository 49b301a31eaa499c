// Core module - shared configuration, errors, and types

pub mod config;
pub mod errors;
pub mod types;

pub use config::{Config, OcrConfig, PollPolicy};
pub use errors::{ConfigError, OcrError, PreprocessError};
pub use types::{FailureKind, MicrometerReading, ParseStrategy, ProcessedImage, TextLine};
