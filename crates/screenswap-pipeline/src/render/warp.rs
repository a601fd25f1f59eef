// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Perspective warp: resample a rectangular image into a quadrilateral on a
// canvas, and the reverse (rectify a quadrilateral back to a rectangle).

use image::{Rgb, RgbImage, Rgba, RgbaImage};
use screenswap_core::{CornerSet, Point, Result, ScreenswapError};
use tracing::{debug, instrument};

use super::homography::Homography;

/// Slack when deciding whether an inverse-mapped point lies on the source.
const EDGE_EPSILON: f64 = 1e-6;

/// Warp `source` so its rectangle lands on `corners`, on a transparent
/// `width × height` canvas.
///
/// Pixel centres are mapped through the inverse transform; those landing on
/// the source get a bilinear sample and alpha 255, all others stay fully
/// transparent.
#[instrument(skip(source, corners), fields(src_w = source.width(), src_h = source.height()))]
pub fn warp_into_quad(source: &RgbImage, corners: &CornerSet, width: u32, height: u32) -> Result<RgbaImage> {
    let (src_w, src_h) = source.dimensions();
    if src_w == 0 || src_h == 0 {
        return Err(ScreenswapError::invalid_parameter("replacement", "image has no pixels"));
    }

    let forward = Homography::rect_to_quad(src_w, src_h, corners)?;
    let inverse = forward.inverse()?;

    let mut canvas = RgbaImage::new(width, height);
    let Some((x0, y0, x1, y1)) = clipped_bounds(corners, width, height) else {
        debug!("Quad lies entirely off the canvas");
        return Ok(canvas);
    };

    let (max_u, max_v) = (src_w as f64 + EDGE_EPSILON, src_h as f64 + EDGE_EPSILON);
    let mut covered = 0usize;
    for y in y0..=y1 {
        for x in x0..=x1 {
            let Some(src) = inverse.apply(Point::new(x as f64 + 0.5, y as f64 + 0.5)) else {
                continue;
            };
            if src.x < -EDGE_EPSILON || src.y < -EDGE_EPSILON || src.x > max_u || src.y > max_v {
                continue;
            }
            let Rgb([r, g, b]) = sample_bilinear(source, src.x - 0.5, src.y - 0.5);
            canvas.put_pixel(x, y, Rgba([r, g, b, 255]));
            covered += 1;
        }
    }

    debug!(covered, "Warp complete");
    Ok(canvas)
}

/// Map the quadrilateral `corners` of `image` onto a `width × height` rectangle.
pub fn rectify(image: &RgbImage, corners: &CornerSet, width: u32, height: u32) -> Result<RgbImage> {
    if image.width() == 0 || image.height() == 0 {
        return Err(ScreenswapError::invalid_parameter("image", "image has no pixels"));
    }
    let forward = Homography::quad_to_rect(corners, width, height)?;
    let inverse = forward.inverse()?;
    let mut out = RgbImage::new(width, height);
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        if let Some(src) = inverse.apply(Point::new(x as f64 + 0.5, y as f64 + 0.5)) {
            *pixel = sample_bilinear(image, src.x - 0.5, src.y - 0.5);
        }
    }
    Ok(out)
}

/// Canvas pixel range covering the quad's bounding box, or `None` when the
/// quad misses the canvas.
fn clipped_bounds(corners: &CornerSet, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
    if width == 0 || height == 0 {
        return None;
    }
    let (min_x, min_y, max_x, max_y) = corners.bounds();
    if max_x < 0.0 || max_y < 0.0 || min_x >= width as f64 || min_y >= height as f64 {
        return None;
    }
    let clamp = |v: f64, limit: u32| v.clamp(0.0, (limit - 1) as f64) as u32;
    Some((
        clamp(min_x.floor(), width),
        clamp(min_y.floor(), height),
        clamp(max_x.ceil(), width),
        clamp(max_y.ceil(), height),
    ))
}

/// Bilinear sample at pixel-index coordinates, clamping neighbours to the edge.
pub fn sample_bilinear(image: &RgbImage, x: f64, y: f64) -> Rgb<u8> {
    let (w, h) = image.dimensions();
    let max_x = (w - 1) as f64;
    let max_y = (h - 1) as f64;
    let x = x.clamp(0.0, max_x);
    let y = y.clamp(0.0, max_y);

    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;
    let (ix0, iy0) = (x0 as u32, y0 as u32);
    let ix1 = (ix0 + 1).min(w - 1);
    let iy1 = (iy0 + 1).min(h - 1);

    let p00 = image.get_pixel(ix0, iy0).0;
    let p10 = image.get_pixel(ix1, iy0).0;
    let p01 = image.get_pixel(ix0, iy1).0;
    let p11 = image.get_pixel(ix1, iy1).0;

    let mut out = [0u8; 3];
    for c in 0..3 {
        let top = p00[c] as f64 * (1.0 - fx) + p10[c] as f64 * fx;
        let bottom = p01[c] as f64 * (1.0 - fx) + p11[c] as f64 * fx;
        out[c] = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
    }
    Rgb(out)
}
