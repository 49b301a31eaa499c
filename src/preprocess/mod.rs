// Image preprocessing tuned for LCD/LED digit readability
//
// Pure, deterministic transforms. The only fallible steps are decoding the
// input bytes and encoding the result to PNG; everything in between is total.

use image::{imageops, imageops::FilterType, DynamicImage, ImageFormat, RgbImage};
use std::io::Cursor;
use tracing::debug;

use crate::core::errors::PreprocessResult;
use crate::core::types::ProcessedImage;

/// Aspect ratio above which a capture is treated as sideways
const ROTATE_ASPECT_RATIO: f32 = 1.5;

/// Contrast multiplier, chosen empirically to separate LCD segment darkness
/// from background glare
const CONTRAST_FACTOR: f32 = 2.5;

/// Brightness multiplier, applied after contrast expansion
const BRIGHTNESS_FACTOR: f32 = 1.3;

/// Minimum output width handed to the OCR backend
const MIN_OCR_WIDTH: u32 = 800;

/// Standard 3x3 sharpen kernel
const SHARPEN_KERNEL: [f32; 9] = [0.0, -1.0, 0.0, -1.0, 5.0, -1.0, 0.0, -1.0, 0.0];

/// Decode raw image bytes into a bitmap
pub fn decode(bytes: &[u8]) -> PreprocessResult<DynamicImage> {
    Ok(image::load_from_memory(bytes)?)
}

/// Preprocess a micrometer photo for OCR
///
/// Fixed stage order:
/// 1. Rotate 90 degrees if the capture is tall (sideways display)
/// 2. Convert to 3-channel RGB
/// 3. Contrast x2.5 about midpoint 128
/// 4. Brightness x1.3
/// 5. Sharpen twice (one pass leaves thin segment edges illegible at phone
///    camera resolution)
/// 6. Upscale to at least max(800, 2x input width), Lanczos
pub fn preprocess(input: &DynamicImage) -> ProcessedImage {
    let (source_width, source_height) = (input.width(), input.height());

    // Micrometer displays read wider than tall; a tall aspect ratio signals
    // a sideways capture. Single rotation, no re-evaluation.
    let rotated = source_height as f32 > source_width as f32 * ROTATE_ASPECT_RATIO;
    let oriented = if rotated {
        debug!(
            width = source_width,
            height = source_height,
            "rotating sideways capture for horizontal reading"
        );
        input.rotate90()
    } else {
        input.clone()
    };

    let mut rgb = oriented.to_rgb8();

    map_channels(&mut rgb, |v| (v - 128.0) * CONTRAST_FACTOR + 128.0);
    map_channels(&mut rgb, |v| v * BRIGHTNESS_FACTOR);

    let sharpened = imageops::filter3x3(&imageops::filter3x3(&rgb, &SHARPEN_KERNEL), &SHARPEN_KERNEL);

    let upscaled = upscale(&sharpened);

    debug!(
        width = upscaled.width(),
        height = upscaled.height(),
        rotated,
        "preprocessing complete"
    );

    ProcessedImage {
        image: upscaled,
        source_width,
        source_height,
        rotated,
    }
}

/// Encode the processed bitmap to PNG bytes (lossless, done exactly once
/// per reading attempt)
pub fn encode_png(image: &RgbImage) -> PreprocessResult<Vec<u8>> {
    let mut png_bytes = Vec::new();
    let mut cursor = Cursor::new(&mut png_bytes);
    DynamicImage::ImageRgb8(image.clone())
        .write_to(&mut cursor, ImageFormat::Png)
        .map_err(crate::core::errors::PreprocessError::Encode)?;
    Ok(png_bytes)
}

/// Apply a per-channel map with clamping to [0, 255]
fn map_channels<F: Fn(f32) -> f32>(image: &mut RgbImage, f: F) {
    for pixel in image.pixels_mut() {
        for channel in pixel.0.iter_mut() {
            *channel = f(*channel as f32).clamp(0.0, 255.0) as u8;
        }
    }
}

/// Resize so the width is at least max(800, 2x input), preserving aspect
/// ratio. OCR backends perform markedly worse on small glyphs.
fn upscale(image: &RgbImage) -> RgbImage {
    let width = image.width();
    let new_width = MIN_OCR_WIDTH.max(width * 2);
    let ratio = new_width as f64 / width as f64;
    let new_height = (image.height() as f64 * ratio).round() as u32;
    imageops::resize(image, new_width, new_height.max(1), FilterType::Lanczos3)
}
