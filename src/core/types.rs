// Shared types for the micrometer reading workflow

use image::RgbImage;
use serde::Serialize;

/// One recognized text line, in backend-assigned reading order
/// (top-to-bottom, left-to-right). Immutable once captured.
pub type TextLine = String;

/// Output of the preprocessing stage
///
/// Owned exclusively by the pipeline invocation that created it and encoded
/// to PNG exactly once before transmission.
#[derive(Debug, Clone)]
pub struct ProcessedImage {
    pub image: RgbImage,
    /// Dimensions of the raw input, for diagnostics
    pub source_width: u32,
    pub source_height: u32,
    pub rotated: bool,
}

impl ProcessedImage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Which parsing strategy produced the value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseStrategy {
    /// Well-formed decimal found directly in the joined text
    DirectDecimal,
    /// Digits reassembled from one-character-per-line vertical output
    VerticalDigits,
    /// Maximal digit/separator run with a fractional part
    LooseRun,
    /// Direct decimal after confusable-glyph substitution
    ConfusableCorrection,
}

/// Why no value could be obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Input image bytes could not be decoded
    Decode,
    /// Backend rejected the submission
    Submit,
    /// Backend rejected the credentials
    Auth,
    /// Poll attempt budget exhausted without a terminal status
    PollTimeout,
    /// Backend reported failed analysis
    Backend,
    /// Caller cancelled the invocation
    Cancelled,
    /// Every parsing strategy was exhausted
    ParseAbsence,
}

/// Final output of one reading attempt
///
/// Invariant: exactly one of `value` and `failure` is set. `raw_text` holds
/// the joined OCR lines for auditability (empty when the failure happened
/// before recognition).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MicrometerReading {
    pub value: Option<f64>,
    pub raw_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<ParseStrategy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
}

impl MicrometerReading {
    pub fn present(value: f64, raw_text: String, strategy: ParseStrategy) -> Self {
        Self {
            value: Some(value),
            raw_text,
            strategy: Some(strategy),
            failure: None,
        }
    }

    pub fn absent(failure: FailureKind, raw_text: String) -> Self {
        Self {
            value: None,
            raw_text,
            strategy: None,
            failure: Some(failure),
        }
    }

    pub fn is_present(&self) -> bool {
        self.value.is_some()
    }
}
