// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Color mask detection: HSV thresholding of "green" pixels followed by
// resolution-scaled morphological cleanup.

use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::distance_transform::Norm;
use imageproc::morphology::{close, open};
use palette::{FromColor, Hsv, Srgb};
use screenswap_core::config::DetectionConfig;
use screenswap_core::{HueRange, Result, ScreenswapError};
use tracing::{debug, info, instrument};

/// Foreground value in binary masks.
pub const MASK_ON: u8 = 255;

/// Hue (0–179 half-degree scale), saturation and value (0–255) of a pixel.
pub fn hsv_u8_scale(pixel: Rgb<u8>) -> (f32, f32, f32) {
    let Rgb([r, g, b]) = pixel;
    let hsv: Hsv = Hsv::from_color(Srgb::new(
        r as f32 / 255.0,
        g as f32 / 255.0,
        b as f32 / 255.0,
    ));
    let hue = (hsv.hue.into_positive_degrees() / 2.0).round() % 180.0;
    (hue, hsv.saturation * 255.0, hsv.value * 255.0)
}

/// Whether a pixel lies in the hue band and clears the saturation/value floors.
pub fn is_green(pixel: Rgb<u8>, hue_range: HueRange, min_saturation: u8, min_value: u8) -> bool {
    let (hue, saturation, value) = hsv_u8_scale(pixel);
    hue_range.contains(hue) && saturation >= min_saturation as f32 && value >= min_value as f32
}

/// Morphology kernel radius for an image: a fraction of the shorter side, at least 1 px.
pub fn kernel_radius(width: u32, height: u32, fraction: f64) -> u8 {
    let shorter = width.min(height) as f64;
    (shorter * fraction).round().clamp(1.0, u8::MAX as f64) as u8
}

/// Threshold `image` into a binary (0/255) mask of green pixels.
///
/// The raw threshold is closed (fills small holes such as reflections or
/// tracking markers) then opened (removes isolated specks). Both use a square
/// structuring element so straight screen edges and right-angle corners
/// survive unchanged.
///
/// Returns `DetectionFailed` if no pixel survives.
#[instrument(skip(image, config), fields(width = image.width(), height = image.height()))]
pub fn green_mask(image: &RgbImage, config: &DetectionConfig) -> Result<GrayImage> {
    config.hue_range.validate()?;

    let (width, height) = image.dimensions();
    let raw = GrayImage::from_fn(width, height, |x, y| {
        let on = is_green(
            *image.get_pixel(x, y),
            config.hue_range,
            config.min_saturation,
            config.min_value,
        );
        Luma([if on { MASK_ON } else { 0 }])
    });

    let raw_count = count_on(&raw);
    debug!(raw_count, "Hue threshold applied");
    if raw_count == 0 {
        return Err(ScreenswapError::DetectionFailed(format!(
            "no pixels in hue range {}..={}",
            config.hue_range.low, config.hue_range.high
        )));
    }

    let k = kernel_radius(width, height, config.morph_kernel_fraction);
    let cleaned = open(&close(&raw, Norm::LInf, k), Norm::LInf, k);

    let clean_count = count_on(&cleaned);
    info!(k, raw_count, clean_count, "Green mask computed");
    if clean_count == 0 {
        return Err(ScreenswapError::DetectionFailed(
            "green pixels were only isolated noise".into(),
        ));
    }

    Ok(cleaned)
}

fn count_on(mask: &GrayImage) -> usize {
    mask.pixels().filter(|p| p.0[0] > 0).count()
}
