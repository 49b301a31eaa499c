// Library exports for the micrometer reading workflow

// Core modules
pub mod core;
pub mod ocr;
pub mod parser;
pub mod pipeline;
pub mod preprocess;

// Re-export commonly used types and functions
pub use crate::core::{
    config::{Config, OcrConfig, PollPolicy},
    errors::{ConfigError, OcrError, PreprocessError},
    types::{FailureKind, MicrometerReading, ParseStrategy, ProcessedImage, TextLine},
};

pub use ocr::OcrClient;
pub use pipeline::ReadingPipeline;
