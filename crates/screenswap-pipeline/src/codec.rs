// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image codec: decode uploaded bytes or files into the RGB raster model,
// encode composites, and build downscaled base64 preview payloads.

use std::io::Cursor;
use std::path::Path;

use base64::{Engine as _, engine::general_purpose};
use image::{ImageError, ImageFormat, RgbImage, imageops::FilterType};
use screenswap_core::config::PreviewConfig;
use screenswap_core::{Preview, Result, ScreenswapError};
use tracing::{debug, instrument};

/// Decode encoded image bytes (PNG, JPEG, …) into an 8-bit RGB raster.
///
/// Alpha, 16-bit and grayscale inputs are converted to 8-bit RGB.
#[instrument(skip(data), fields(data_len = data.len()))]
pub fn decode(data: &[u8]) -> Result<RgbImage> {
    let img = image::load_from_memory(data).map_err(|err| match err {
        ImageError::IoError(io) => ScreenswapError::Io(io),
        other => ScreenswapError::UnsupportedImageFormat(format!("failed to decode image: {other}")),
    })?;
    debug!(
        width = img.width(),
        height = img.height(),
        "Image decoded from bytes"
    );
    Ok(img.to_rgb8())
}

/// Read and decode an image file. Missing or unreadable files are I/O errors;
/// undecodable contents are format errors.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn open(path: impl AsRef<Path>) -> Result<RgbImage> {
    let data = std::fs::read(path.as_ref())?;
    decode(&data).map_err(|err| match err {
        ScreenswapError::UnsupportedImageFormat(detail) => {
            ScreenswapError::UnsupportedImageFormat(format!("{}: {detail}", path.as_ref().display()))
        }
        other => other,
    })
}

/// Encode as PNG bytes.
pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .map_err(|err| ScreenswapError::Encode(format!("PNG encoding failed: {err}")))?;
    Ok(buffer)
}

/// Encode as JPEG bytes with the given quality (1-100).
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
    image
        .write_with_encoder(encoder)
        .map_err(|err| ScreenswapError::Encode(format!("JPEG encoding failed: {err}")))?;
    Ok(buffer)
}

/// Write the image as a PNG file, creating parent directories as needed.
#[instrument(skip(image), fields(path = %path.as_ref().display()))]
pub fn save_png(image: &RgbImage, path: impl AsRef<Path>) -> Result<()> {
    let bytes = encode_png(image)?;
    if let Some(parent) = path.as_ref().parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path.as_ref(), bytes)?;
    debug!("PNG written");
    Ok(())
}

/// Downscale to at most `max_width` wide, returning the image and the scale used.
pub fn downscale_for_preview(image: &RgbImage, max_width: u32) -> (RgbImage, f64) {
    let (w, h) = image.dimensions();
    if w <= max_width || max_width == 0 {
        return (image.clone(), 1.0);
    }
    let scale = max_width as f64 / w as f64;
    let new_h = ((h as f64 * scale) as u32).max(1);
    let resized = image::imageops::resize(image, max_width, new_h, FilterType::Triangle);
    (resized, scale)
}

/// Build a base64 JPEG preview payload.
#[instrument(skip(image, config))]
pub fn preview(image: &RgbImage, config: &PreviewConfig) -> Result<Preview> {
    let (small, scale) = downscale_for_preview(image, config.max_width);
    let jpeg = encode_jpeg(&small, config.jpeg_quality)?;
    debug!(scale, jpeg_bytes = jpeg.len(), "Preview encoded");
    Ok(Preview {
        image: general_purpose::STANDARD.encode(jpeg),
        width: small.width(),
        height: small.height(),
        scale,
    })
}

/// Decode a base64 payload (as produced by [`preview`]) back into a raster.
pub fn decode_base64(payload: &str) -> Result<RgbImage> {
    let bytes = general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|err| ScreenswapError::UnsupportedImageFormat(format!("invalid base64 payload: {err}")))?;
    decode(&bytes)
}
