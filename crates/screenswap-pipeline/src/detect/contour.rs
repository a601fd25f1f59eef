// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Contour extraction: pick the dominant region of a binary mask and reduce
// its boundary to a quadrilateral.

use image::GrayImage;
use imageproc::contours::{BorderType, find_contours};
use imageproc::geometry::{approximate_polygon_dp, arc_length, contour_area, min_area_rect};
use imageproc::point::Point as PixelPoint;
use screenswap_core::config::DetectionConfig;
use screenswap_core::{Point, Result, ScreenswapError};
use tracing::{debug, info, instrument, warn};

/// Four corners of the dominant region, in no particular order.
pub type Quad = [Point; 4];

/// Find the largest outer contour of `mask` and approximate it by four points.
///
/// The polygon tolerance grows through `config.approx_tolerances` (fractions
/// of the contour perimeter) until exactly four vertices remain. If none
/// does, the minimum-area rotated rectangle is used when
/// `config.min_area_rect_fallback` is set; otherwise detection fails.
#[instrument(skip(mask, config), fields(width = mask.width(), height = mask.height()))]
pub fn dominant_quad(mask: &GrayImage, config: &DetectionConfig) -> Result<Quad> {
    let contours = find_contours::<i32>(mask);
    let largest = contours
        .iter()
        .filter(|c| c.border_type == BorderType::Outer && c.points.len() >= 3)
        .map(|c| (contour_area(&c.points), c))
        .max_by(|a, b| a.0.total_cmp(&b.0));

    let Some((area, contour)) = largest else {
        return Err(ScreenswapError::DetectionFailed("mask contains no closed region".into()));
    };

    let image_area = mask.width() as f64 * mask.height() as f64;
    let min_area = config.min_area_fraction * image_area;
    debug!(
        contours = contours.len(),
        area,
        min_area,
        "Largest contour selected"
    );
    if area < min_area {
        return Err(ScreenswapError::DetectionFailed(format!(
            "largest green region covers {:.2}% of the image (minimum {:.2}%)",
            100.0 * area / image_area,
            100.0 * config.min_area_fraction
        )));
    }

    let perimeter = arc_length(&contour.points, true);
    for &fraction in &config.approx_tolerances {
        let epsilon = fraction * perimeter;
        // approximate_polygon_dp panics on a non-positive tolerance.
        if !(epsilon.is_finite() && epsilon > 0.0) {
            warn!(fraction, "Skipping unusable approximation tolerance");
            continue;
        }
        let approx = approximate_polygon_dp(&contour.points, epsilon, true);
        debug!(fraction, vertices = approx.len(), "Polygon approximation");
        if let [a, b, c, d] = approx[..] {
            info!(fraction, "Quadrilateral found by polygon approximation");
            return Ok([a, b, c, d].map(to_point));
        }
    }

    if !config.min_area_rect_fallback {
        return Err(ScreenswapError::DetectionFailed(
            "green region could not be reduced to four corners".into(),
        ));
    }

    warn!("No tolerance gave four vertices; using minimum-area rectangle");
    Ok(min_area_rect(&contour.points).map(to_point))
}

fn to_point(p: PixelPoint<i32>) -> Point {
    Point::new(p.x as f64, p.y as f64)
}
