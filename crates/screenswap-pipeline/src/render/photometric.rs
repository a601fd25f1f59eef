// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Photometric matching: make the warped replacement sit naturally in the
// scene, either automatically (luminance statistics) or by explicit
// adjustments.

use image::{GrayImage, RgbImage, Rgba, Rgba32FImage, RgbaImage};
use imageproc::distance_transform::Norm;
use imageproc::filter::gaussian_blur_f32;
use imageproc::morphology::dilate;
use palette::{FromColor, Hsv, Lab, Srgb};
use screenswap_core::config::AutoMatchConfig;
use screenswap_core::{CornerSet, ManualAdjustments, PhotometricMode};
use tracing::{debug, info, instrument, warn};

use super::composite::polygon_mask;

/// Adjust the covered pixels of `warped` according to `mode`.
///
/// `base` and `corners` are only consulted in auto mode, to sample the scene
/// around the screen.
pub fn match_photometry(
    warped: &RgbaImage,
    base: &RgbImage,
    corners: &CornerSet,
    mode: &PhotometricMode,
    config: &AutoMatchConfig,
) -> RgbaImage {
    match mode {
        PhotometricMode::Auto => auto_match(warped, base, corners, config),
        PhotometricMode::Manual(manual) => apply_manual(warped, manual),
    }
}

// -- Manual ---------------------------------------------------------------

/// Apply contrast, brightness, temperature, saturation and blur in that order.
///
/// Identity parameters return an exact copy.
#[instrument(skip(warped))]
pub fn apply_manual(warped: &RgbaImage, manual: &ManualAdjustments) -> RgbaImage {
    if manual.is_identity() {
        return warped.clone();
    }

    let contrast_gain = 1.0 + manual.contrast / 100.0;
    let saturation_gain = 1.0 + manual.saturation / 100.0;

    let mut out = warped.clone();
    for pixel in out.pixels_mut().filter(|p| p.0[3] > 0) {
        let [r, g, b, a] = pixel.0;
        let mut rgb = [r as f32, g as f32, b as f32];

        for v in &mut rgb {
            *v = (128.0 + (*v - 128.0) * contrast_gain).clamp(0.0, 255.0);
        }
        for v in &mut rgb {
            *v = (*v + manual.brightness).clamp(0.0, 255.0);
        }
        rgb[0] = (rgb[0] + manual.temperature).clamp(0.0, 255.0);
        rgb[2] = (rgb[2] - manual.temperature).clamp(0.0, 255.0);

        if manual.saturation != 0.0 {
            let mut hsv: Hsv = Hsv::from_color(Srgb::new(rgb[0] / 255.0, rgb[1] / 255.0, rgb[2] / 255.0));
            hsv.saturation = (hsv.saturation * saturation_gain).clamp(0.0, 1.0);
            let back: Srgb = Srgb::from_color(hsv);
            rgb = [back.red * 255.0, back.green * 255.0, back.blue * 255.0];
        }

        *pixel = Rgba([to_u8(rgb[0]), to_u8(rgb[1]), to_u8(rgb[2]), a]);
    }

    if manual.blur > 0.0 {
        out = soften(&out, manual.blur);
    }
    out
}

fn to_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// Gaussian sigma for a kernel of radius `r` (size `2r + 1`).
pub fn sigma_for_radius(radius: f32) -> f32 {
    0.3 * (radius - 1.0) + 0.8
}

/// Blur the covered region without pulling in the transparent surround.
///
/// Colour is premultiplied by coverage and blurred in `f32` together with the
/// coverage itself; dividing the two recovers the colour without rounding
/// bias.
fn soften(image: &RgbaImage, radius: f32) -> RgbaImage {
    let sigma = sigma_for_radius(radius).max(0.1);
    let premultiplied = Rgba32FImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b, a] = image.get_pixel(x, y).0;
        let coverage = a as f32 / 255.0;
        Rgba([r as f32 * coverage, g as f32 * coverage, b as f32 * coverage, coverage])
    });
    let blurred = gaussian_blur_f32(&premultiplied, sigma);

    let mut out = image.clone();
    for (pixel, soft) in out.pixels_mut().zip(blurred.pixels()) {
        let weight = soft.0[3];
        if pixel.0[3] == 0 || weight <= f32::EPSILON {
            continue;
        }
        for c in 0..3 {
            pixel.0[c] = to_u8(soft.0[c] / weight);
        }
    }
    debug!(radius, sigma, "Softening blur applied");
    out
}

// -- Auto -----------------------------------------------------------------

/// Band width in pixels for sampling the scene around the screen.
pub fn ring_width(width: u32, height: u32, config: &AutoMatchConfig) -> u32 {
    let scaled = (width.min(height) as f64 * config.ring_fraction).round() as u32;
    scaled.max(config.min_ring_px).max(1)
}

/// Base pixels in a band just outside the screen polygon.
pub fn surrounding_ring(corners: &CornerSet, width: u32, height: u32, config: &AutoMatchConfig) -> GrayImage {
    let inside = polygon_mask(corners, width, height);
    // Chebyshev dilations compose additively, so wide bands are built in
    // steps of at most u8::MAX.
    let mut remaining = ring_width(width, height, config);
    let mut ring = inside.clone();
    while remaining > 0 {
        let step = remaining.min(u8::MAX as u32);
        ring = dilate(&ring, Norm::LInf, step as u8);
        remaining -= step;
    }
    for (r, i) in ring.pixels_mut().zip(inside.pixels()) {
        if i.0[0] > 0 {
            r.0[0] = 0;
        }
    }
    ring
}

#[derive(Debug, Default)]
struct Stats {
    count: usize,
    sum: f64,
    sum_sq: f64,
}

impl Stats {
    fn push(&mut self, v: f64) {
        self.count += 1;
        self.sum += v;
        self.sum_sq += v * v;
    }

    fn mean(&self) -> f64 {
        self.sum / self.count.max(1) as f64
    }

    fn std(&self) -> f64 {
        let mean = self.mean();
        (self.sum_sq / self.count.max(1) as f64 - mean * mean).max(0.0).sqrt()
    }
}

fn lab_of(r: u8, g: u8, b: u8) -> Lab {
    Lab::from_color(Srgb::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0))
}

/// Match the Lab lightness of the covered pixels to the ring around the
/// screen. Chroma is left untouched.
///
/// With fewer than `config.min_ring_samples` ring pixels the image is
/// returned unchanged.
#[instrument(skip_all)]
pub fn auto_match(warped: &RgbaImage, base: &RgbImage, corners: &CornerSet, config: &AutoMatchConfig) -> RgbaImage {
    let (width, height) = base.dimensions();
    let ring = surrounding_ring(corners, width, height, config);

    let mut surround = Stats::default();
    for (x, y, m) in ring.enumerate_pixels() {
        if m.0[0] > 0 {
            let [r, g, b] = base.get_pixel(x, y).0;
            surround.push(lab_of(r, g, b).l as f64);
        }
    }
    if surround.count < config.min_ring_samples {
        warn!(
            samples = surround.count,
            required = config.min_ring_samples,
            "Too few surrounding pixels for auto match; leaving replacement unchanged"
        );
        return warped.clone();
    }

    let mut inner = Stats::default();
    for p in warped.pixels().filter(|p| p.0[3] > 0) {
        let [r, g, b, _] = p.0;
        inner.push(lab_of(r, g, b).l as f64);
    }
    if inner.count == 0 {
        return warped.clone();
    }

    let (mean_s, std_s) = (surround.mean(), surround.std());
    let (mean_w, std_w) = (inner.mean(), inner.std());
    let gain = if std_w < 1e-3 { 1.0 } else { std_s / std_w };
    info!(mean_s, std_s, mean_w, std_w, gain, "Auto luminance match");

    let mut out = warped.clone();
    for pixel in out.pixels_mut().filter(|p| p.0[3] > 0) {
        let [r, g, b, a] = pixel.0;
        let mut lab = lab_of(r, g, b);
        lab.l = (gain * (lab.l as f64 - mean_w) + mean_s).clamp(0.0, 100.0) as f32;
        let rgb: Srgb = Srgb::from_color(lab);
        *pixel = Rgba([
            to_u8(rgb.red * 255.0),
            to_u8(rgb.green * 255.0),
            to_u8(rgb.blue * 255.0),
            a,
        ]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use screenswap_core::Point;

    fn covered(w: u32, h: u32, color: [u8; 3]) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, _| {
            if x < w / 2 {
                Rgba([color[0], color[1], color[2], 255])
            } else {
                Rgba([0, 0, 0, 0])
            }
        })
    }

    fn square(lo: f64, hi: f64) -> CornerSet {
        CornerSet::new(
            Point::new(lo, lo),
            Point::new(hi, lo),
            Point::new(hi, hi),
            Point::new(lo, hi),
        )
    }

    #[test]
    fn identity_leaves_image_bit_identical() {
        let img = RgbaImage::from_fn(16, 16, |x, y| Rgba([(x * 16) as u8, (y * 16) as u8, 77, 255]));
        assert_eq!(apply_manual(&img, &ManualAdjustments::IDENTITY), img);
    }

    #[test]
    fn steps_apply_in_order_with_clamping() {
        let img = covered(4, 4, [200, 100, 60]);
        let manual = ManualAdjustments {
            contrast: 50.0,
            brightness: 10.0,
            temperature: 20.0,
            ..ManualAdjustments::IDENTITY
        };
        let out = apply_manual(&img, &manual);
        // contrast: 236, 86, 26; brightness: 246, 96, 36; temperature: 266→255, 96, 16.
        assert_eq!(*out.get_pixel(0, 0), Rgba([255, 96, 16, 255]));
    }

    #[test]
    fn uncovered_pixels_are_untouched() {
        let img = covered(4, 4, [10, 20, 30]);
        let manual = ManualAdjustments {
            brightness: 50.0,
            ..ManualAdjustments::IDENTITY
        };
        let out = apply_manual(&img, &manual);
        assert_eq!(*out.get_pixel(0, 0), Rgba([60, 70, 80, 255]));
        assert_eq!(*out.get_pixel(3, 3), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn full_negative_contrast_flattens_to_mid_gray() {
        let img = covered(4, 2, [250, 3, 128]);
        let manual = ManualAdjustments {
            contrast: -100.0,
            ..ManualAdjustments::IDENTITY
        };
        assert_eq!(*apply_manual(&img, &manual).get_pixel(0, 0), Rgba([128, 128, 128, 255]));
    }

    #[test]
    fn full_desaturation_gives_gray() {
        let img = covered(4, 2, [200, 50, 50]);
        let manual = ManualAdjustments {
            saturation: -100.0,
            ..ManualAdjustments::IDENTITY
        };
        let [r, g, b, _] = apply_manual(&img, &manual).get_pixel(0, 0).0;
        assert_eq!(r, g);
        assert_eq!(g, b);
    }

    #[test]
    fn blur_keeps_uniform_region_color() {
        let img = covered(20, 10, [180, 40, 90]);
        let manual = ManualAdjustments {
            blur: 3.0,
            ..ManualAdjustments::IDENTITY
        };
        let out = apply_manual(&img, &manual);
        // Even at the coverage edge the colour is not darkened by the surround.
        for x in [0, 5, 9] {
            assert_eq!(*out.get_pixel(x, 5), Rgba([180, 40, 90, 255]), "pixel ({x}, 5)");
        }
        assert_eq!(out.get_pixel(15, 5).0[3], 0);
    }

    #[test]
    fn auto_match_pulls_lightness_to_surround() {
        let base = RgbImage::from_pixel(200, 200, Rgb([200, 200, 200]));
        let corners = square(50.0, 150.0);
        let warped = RgbaImage::from_fn(200, 200, |x, y| {
            if (50..150).contains(&x) && (50..150).contains(&y) {
                Rgba([100, 100, 100, 255])
            } else {
                Rgba([0, 0, 0, 0])
            }
        });
        let out = auto_match(&warped, &base, &corners, &AutoMatchConfig::default());
        let [r, g, b, a] = out.get_pixel(100, 100).0;
        assert_eq!(a, 255);
        for v in [r, g, b] {
            assert!((v as i32 - 200).abs() <= 1, "channel {v}");
        }
        assert_eq!(out.get_pixel(10, 10).0[3], 0);
    }

    #[test]
    fn auto_match_without_surround_is_noop() {
        let base = RgbImage::from_pixel(60, 60, Rgb([200, 200, 200]));
        let corners = CornerSet::full_rect(60, 60);
        let warped = RgbaImage::from_pixel(60, 60, Rgba([90, 30, 30, 255]));
        let out = auto_match(&warped, &base, &corners, &AutoMatchConfig::default());
        assert_eq!(out, warped);
    }

    #[test]
    fn ring_width_scales_and_has_floor() {
        let config = AutoMatchConfig::default();
        assert_eq!(ring_width(1000, 800, &config), 24);
        assert_eq!(ring_width(50, 50, &config), 3);
        assert_eq!(ring_width(12_000, 10_000, &config), 300);
    }

    #[test]
    fn wide_ring_reaches_past_a_single_dilation() {
        let config = AutoMatchConfig {
            ring_fraction: 0.0,
            min_ring_px: 300,
            ..AutoMatchConfig::default()
        };
        let corners = square(400.0, 420.0);
        let ring = surrounding_ring(&corners, 800, 800, &config);
        assert_eq!(ring.get_pixel(410, 410).0[0], 0);
        assert_eq!(ring.get_pixel(410, 120).0[0], 255);
        assert_eq!(ring.get_pixel(410, 99).0[0], 0);
    }

    #[test]
    fn match_dispatches_on_mode() {
        let base = RgbImage::from_pixel(10, 10, Rgb([0, 0, 0]));
        let warped = covered(10, 10, [100, 100, 100]);
        let corners = square(0.0, 5.0);
        let mode = PhotometricMode::Manual(ManualAdjustments {
            brightness: -100.0,
            ..ManualAdjustments::IDENTITY
        });
        let out = match_photometry(&warped, &base, &corners, &mode, &AutoMatchConfig::default());
        assert_eq!(*out.get_pixel(0, 0), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn blur_of_fully_covered_image_keeps_uniform_color() {
        let img = RgbaImage::from_pixel(12, 12, Rgba([180, 40, 90, 255]));
        let manual = ManualAdjustments {
            blur: 5.0,
            ..ManualAdjustments::IDENTITY
        };
        assert_eq!(apply_manual(&img, &manual), img);
    }

    #[test]
    fn blur_averages_neighbouring_covered_colors() {
        let img = RgbaImage::from_fn(20, 4, |x, _| {
            if x < 10 {
                Rgba([200, 0, 0, 255])
            } else {
                Rgba([0, 0, 200, 255])
            }
        });
        let manual = ManualAdjustments {
            blur: 3.0,
            ..ManualAdjustments::IDENTITY
        };
        let out = apply_manual(&img, &manual);
        let [r, _, b, _] = out.get_pixel(9, 2).0;
        assert!(r < 200 && b > 0, "edge pixel not blended: {r} {b}");
        assert_eq!(*out.get_pixel(0, 2), Rgba([200, 0, 0, 255]));
    }

    #[test]
    fn auto_match_moves_lightness_but_keeps_chroma() {
        let base = RgbImage::from_pixel(200, 200, Rgb([90, 90, 90]));
        let corners = square(50.0, 150.0);
        let color = [200, 60, 40];
        let warped = RgbaImage::from_fn(200, 200, |x, y| {
            if (50..150).contains(&x) && (50..150).contains(&y) {
                Rgba([color[0], color[1], color[2], 255])
            } else {
                Rgba([0, 0, 0, 0])
            }
        });
        let before = lab_of(color[0], color[1], color[2]);
        let out = auto_match(&warped, &base, &corners, &AutoMatchConfig::default());
        let [r, g, b, a] = out.get_pixel(100, 100).0;
        assert_eq!(a, 255);
        let after = lab_of(r, g, b);
        let surround = lab_of(90, 90, 90);

        assert!((after.l - surround.l).abs() < 1.5, "L {} vs {}", after.l, surround.l);
        assert!((after.l - before.l).abs() > 5.0);
        assert!((after.a - before.a).abs() < 2.0, "a* {} vs {}", after.a, before.a);
        assert!((after.b - before.b).abs() < 2.0, "b* {} vs {}", after.b, before.b);
    }
}
