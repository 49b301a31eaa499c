//! Read a digital micrometer display from a photo.
//! Run with: cargo run --release -- <image_path>

use anyhow::Result;
use micrometer_ocr::{Config, ReadingPipeline};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Arc::new(Config::new()?);

    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::new(format!(
        "micrometer_ocr={}",
        match config.log_level {
            tracing::Level::TRACE => "trace",
            tracing::Level::DEBUG => "debug",
            tracing::Level::INFO => "info",
            tracing::Level::WARN => "warn",
            tracing::Level::ERROR => "error",
        }
    ));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args: Vec<String> = std::env::args().collect();
    let image_path = match args.get(1) {
        Some(path) => path.clone(),
        None => {
            eprintln!("Usage: micrometer_ocr <image_path>");
            std::process::exit(2);
        }
    };

    if !Path::new(&image_path).exists() {
        eprintln!("Image not found: {}", image_path);
        std::process::exit(2);
    }

    info!("Reading micrometer from: {}", image_path);
    let pipeline = ReadingPipeline::new(config)?;
    let reading = pipeline.read_path(&image_path).await;

    match reading.value {
        Some(value) => {
            println!("Micrometer reading: {} mm", value);
            println!("Raw OCR text: {}", reading.raw_text);
            Ok(())
        }
        None => {
            eprintln!(
                "Could not obtain a value ({:?}); raw text: {:?}",
                reading.failure, reading.raw_text
            );
            std::process::exit(1);
        }
    }
}
