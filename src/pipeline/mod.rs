// Reading pipeline - preprocess, recognize, parse
//
// One invocation is a single logical sequence of steps; the poll loop inside
// the OCR client is the only suspension point. No retries happen here: a
// retry means re-preprocessing and re-submitting, and that decision belongs
// to the caller.

use base64::{engine::general_purpose, Engine};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::core::config::Config;
use crate::core::errors::{OcrError, PreprocessError, PreprocessResult};
use crate::core::types::{FailureKind, MicrometerReading};
use crate::ocr::OcrClient;
use crate::{parser, preprocess};

/// Public entry point: turns one micrometer photo into one reading
pub struct ReadingPipeline {
    ocr: OcrClient,
}

impl ReadingPipeline {
    pub fn new(config: Arc<Config>) -> Result<Self, OcrError> {
        Ok(Self {
            ocr: OcrClient::new(config.ocr.clone())?,
        })
    }

    /// Read a micrometer value from raw image bytes
    pub async fn read_image(&self, bytes: Vec<u8>) -> MicrometerReading {
        self.read_image_with_cancel(bytes, &CancellationToken::new())
            .await
    }

    /// Read a micrometer value, aborting the poll loop when the caller
    /// cancels the token
    #[instrument(skip(self, bytes, cancel), fields(input_bytes = bytes.len()))]
    pub async fn read_image_with_cancel(
        &self,
        bytes: Vec<u8>,
        cancel: &CancellationToken,
    ) -> MicrometerReading {
        // Decode, preprocess, and encode in one blocking task; all three are
        // CPU-bound and the processed buffer never outlives this invocation.
        let png_bytes = match preprocess_and_encode(bytes).await {
            Ok((png_bytes, rotated)) => {
                debug!(png_bytes = png_bytes.len(), rotated, "preprocessing done");
                png_bytes
            }
            Err(err) => {
                warn!(error = %err, "preprocessing failed");
                return MicrometerReading::absent(FailureKind::Decode, String::new());
            }
        };

        let lines = match self.ocr.recognize(png_bytes, cancel).await {
            Ok(lines) => lines,
            Err(err) => {
                warn!(error = %err, "recognition failed");
                return MicrometerReading::absent(failure_kind(&err), String::new());
            }
        };

        let raw_text = lines.join(" ");

        match parser::parse(&lines) {
            Some(parsed) => {
                info!(value = parsed.value, strategy = ?parsed.strategy, "reading obtained");
                MicrometerReading::present(parsed.value, raw_text, parsed.strategy)
            }
            None => {
                info!(raw = %raw_text, "no value could be parsed");
                MicrometerReading::absent(FailureKind::ParseAbsence, raw_text)
            }
        }
    }

    /// Read a micrometer value from an image file on disk
    pub async fn read_path(&self, path: impl AsRef<Path>) -> MicrometerReading {
        match tokio::fs::read(path.as_ref()).await {
            Ok(bytes) => self.read_image(bytes).await,
            Err(err) => {
                warn!(path = %path.as_ref().display(), error = %err, "image file unreadable");
                MicrometerReading::absent(FailureKind::Decode, String::new())
            }
        }
    }

    /// Read a micrometer value from a base64 payload, optionally prefixed
    /// with a data-URL scheme segment ("data:image/png;base64,...")
    pub async fn read_base64(&self, payload: &str) -> MicrometerReading {
        let encoded = payload
            .split_once(',')
            .map(|(_, rest)| rest)
            .unwrap_or(payload);

        match general_purpose::STANDARD.decode(encoded.trim()) {
            Ok(bytes) => self.read_image(bytes).await,
            Err(err) => {
                warn!(error = %err, "base64 payload rejected");
                MicrometerReading::absent(FailureKind::Decode, String::new())
            }
        }
    }
}

/// Decode, preprocess, and PNG-encode on the blocking pool
async fn preprocess_and_encode(bytes: Vec<u8>) -> PreprocessResult<(Vec<u8>, bool)> {
    tokio::task::spawn_blocking(move || {
        let decoded = preprocess::decode(&bytes)?;
        let processed = preprocess::preprocess(&decoded);
        let png_bytes = preprocess::encode_png(&processed.image)?;
        Ok::<_, PreprocessError>((png_bytes, processed.rotated))
    })
    .await?
}

fn failure_kind(err: &OcrError) -> FailureKind {
    match err {
        OcrError::Auth { .. } => FailureKind::Auth,
        OcrError::Submit { .. }
        | OcrError::MissingOperationLocation
        | OcrError::Transport(_) => FailureKind::Submit,
        OcrError::PollTimeout { .. } => FailureKind::PollTimeout,
        OcrError::Backend => FailureKind::Backend,
        OcrError::Cancelled => FailureKind::Cancelled,
    }
}
