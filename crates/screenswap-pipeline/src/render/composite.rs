// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Alpha compositing: feathered polygon mask and per-pixel blend of the warped
// replacement over the base image.

use image::{GrayImage, ImageBuffer, Luma, Rgb, RgbImage, RgbaImage};
use imageproc::drawing::draw_polygon_mut;
use imageproc::filter::separable_filter_equal;
use imageproc::point::Point as PixelPoint;
use screenswap_core::{CornerSet, Point, Result, ScreenswapError};
use tracing::{debug, instrument};

/// Mask values this close to 0 or 1 are treated as exactly 0 or 1.
pub const MASK_SNAP: f32 = 1e-4;

/// Feathered opacity mask, one value in `[0, 1]` per pixel, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatherMask {
    width: u32,
    height: u32,
    values: Vec<f32>,
}

impl FeatherMask {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.values[(y * self.width + x) as usize]
    }
}

/// The corner polygon filled with 255 on a zero canvas.
///
/// The polygon is clipped to a one-pixel margin around the canvas first, so
/// corners far outside it rasterise the same as their visible part.
pub fn polygon_mask(corners: &CornerSet, width: u32, height: u32) -> GrayImage {
    let mut mask = GrayImage::new(width, height);
    if width == 0 || height == 0 {
        return mask;
    }
    let clipped = clip_to_rect(
        corners.points(),
        (-1.0, -1.0),
        (width as f64 + 1.0, height as f64 + 1.0),
    );
    let mut poly: Vec<PixelPoint<i32>> = clipped
        .iter()
        .map(|p| PixelPoint::new(p.x.round() as i32, p.y.round() as i32))
        .collect();
    // draw_polygon_mut rejects an explicitly closed polygon.
    poly.dedup();
    while poly.len() > 1 && poly.first() == poly.last() {
        poly.pop();
    }
    if !poly.is_empty() {
        draw_polygon_mut(&mut mask, &poly, Luma([255]));
    }
    mask
}

/// Sutherland–Hodgman clip of a polygon against an axis-aligned rectangle.
pub fn clip_to_rect(polygon: &[Point], min: (f64, f64), max: (f64, f64)) -> Vec<Point> {
    let edges: [(fn(Point) -> f64, f64, bool); 4] = [
        (|p: Point| p.x, min.0, true),
        (|p: Point| p.x, max.0, false),
        (|p: Point| p.y, min.1, true),
        (|p: Point| p.y, max.1, false),
    ];

    let mut out = polygon.to_vec();
    for (coord, bound, keep_above) in edges {
        let inside = |p: Point| if keep_above { coord(p) >= bound } else { coord(p) <= bound };
        let input = std::mem::take(&mut out);
        let Some(&last) = input.last() else {
            break;
        };
        let mut prev = last;
        for &cur in &input {
            match (inside(prev), inside(cur)) {
                (true, true) => out.push(cur),
                (true, false) => out.push(crossing(prev, cur, coord, bound)),
                (false, true) => {
                    out.push(crossing(prev, cur, coord, bound));
                    out.push(cur);
                }
                (false, false) => {}
            }
            prev = cur;
        }
    }
    out
}

fn crossing(a: Point, b: Point, coord: fn(Point) -> f64, bound: f64) -> Point {
    let t = (bound - coord(a)) / (coord(b) - coord(a));
    Point::new(a.x + t * (b.x - a.x), a.y + t * (b.y - a.y))
}

/// Normalised 1-D Gaussian of size `2 * radius + 1`.
pub fn gaussian_kernel(radius: u32) -> Vec<f32> {
    let sigma = 0.3 * (radius as f32 - 1.0) + 0.8;
    let r = radius as i64;
    let mut kernel: Vec<f32> = (-r..=r)
        .map(|i| (-((i * i) as f32) / (2.0 * sigma * sigma)).exp())
        .collect();
    let sum: f32 = kernel.iter().sum();
    for k in &mut kernel {
        *k /= sum;
    }
    kernel
}

/// Fill the polygon and blur it with a separable Gaussian of the given radius.
///
/// Radius 0 gives a hard 0/1 edge.
#[instrument(skip(corners))]
pub fn feather_mask(corners: &CornerSet, width: u32, height: u32, radius: u32) -> FeatherMask {
    let filled = polygon_mask(corners, width, height);
    let hard: ImageBuffer<Luma<f32>, Vec<f32>> =
        ImageBuffer::from_fn(width, height, |x, y| Luma([if filled.get_pixel(x, y).0[0] > 0 { 1.0 } else { 0.0 }]));

    if radius == 0 || width == 0 || height == 0 {
        return FeatherMask {
            width,
            height,
            values: hard.into_raw(),
        };
    }

    let mut values = separable_filter_equal(&hard, &gaussian_kernel(radius)).into_raw();
    for v in &mut values {
        if *v >= 1.0 - MASK_SNAP {
            *v = 1.0;
        } else if *v <= MASK_SNAP {
            *v = 0.0;
        }
    }
    FeatherMask { width, height, values }
}

/// Blend `warped` over `base` through the feathered corner mask.
///
/// Each pixel uses `α = mask × coverage`, where coverage is the warped
/// alpha. `α = 0` keeps the base pixel and `α = 1` takes the warped pixel,
/// both exactly.
#[instrument(skip(base, warped, corners), fields(width = base.width(), height = base.height()))]
pub fn composite(base: &RgbImage, warped: &RgbaImage, corners: &CornerSet, feather_radius: u32) -> Result<RgbImage> {
    if base.dimensions() != warped.dimensions() {
        return Err(ScreenswapError::invalid_parameter(
            "warped",
            format!(
                "canvas is {}x{} but the base image is {}x{}",
                warped.width(),
                warped.height(),
                base.width(),
                base.height()
            ),
        ));
    }

    let (width, height) = base.dimensions();
    let mask = feather_mask(corners, width, height, feather_radius);
    let mut out = base.clone();
    let mut blended = 0usize;

    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let m = mask.get(x, y);
        if m <= 0.0 {
            continue;
        }
        let [wr, wg, wb, wa] = warped.get_pixel(x, y).0;
        let alpha = m * (wa as f32 / 255.0);
        if alpha <= 0.0 {
            continue;
        }
        if alpha >= 1.0 {
            *pixel = Rgb([wr, wg, wb]);
            continue;
        }
        let Rgb([br, bg, bb]) = *pixel;
        let mix = |b: u8, w: u8| (b as f32 * (1.0 - alpha) + w as f32 * alpha).round().clamp(0.0, 255.0) as u8;
        *pixel = Rgb([mix(br, wr), mix(bg, wg), mix(bb, wb)]);
        blended += 1;
    }

    debug!(feather_radius, blended, "Composite complete");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn square(lo: f64, hi: f64) -> CornerSet {
        CornerSet::new(
            Point::new(lo, lo),
            Point::new(hi, lo),
            Point::new(hi, hi),
            Point::new(lo, hi),
        )
    }

    #[test]
    fn kernel_is_normalised_and_symmetric() {
        let k = gaussian_kernel(2);
        assert_eq!(k.len(), 5);
        assert!((k.iter().sum::<f32>() - 1.0).abs() < 1e-6);
        assert_eq!(k[0], k[4]);
        assert!(k[2] > k[1]);
    }

    #[test]
    fn polygon_mask_fills_interior() {
        let mask = polygon_mask(&square(10.0, 30.0), 40, 40);
        assert_eq!(mask.get_pixel(20, 20).0[0], 255);
        assert_eq!(mask.get_pixel(5, 5).0[0], 0);
        assert_eq!(mask.get_pixel(35, 20).0[0], 0);
    }

    #[test]
    fn hard_edge_without_feather() {
        let mask = feather_mask(&square(10.0, 30.0), 40, 40, 0);
        assert!(mask.values.iter().all(|v| *v == 0.0 || *v == 1.0));
    }

    #[test]
    fn feather_softens_only_near_the_edge() {
        let mask = feather_mask(&square(20.0, 80.0), 100, 100, 2);
        assert_eq!(mask.get(50, 50), 1.0);
        assert_eq!(mask.get(5, 5), 0.0);
        let edge = mask.get(20, 50);
        assert!(edge > 0.0 && edge < 1.0, "edge value {edge}");
    }

    #[test]
    fn base_and_warped_are_reproduced_exactly() {
        let base = RgbImage::from_fn(100, 100, |x, y| Rgb([x as u8, y as u8, 200]));
        let warped = RgbaImage::from_fn(100, 100, |x, y| {
            if (20..=80).contains(&x) && (20..=80).contains(&y) {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 0, 0])
            }
        });
        let out = composite(&base, &warped, &square(20.0, 80.0), 2).unwrap();
        assert_eq!(*out.get_pixel(50, 50), Rgb([255, 0, 0]));
        assert_eq!(*out.get_pixel(5, 5), Rgb([5, 5, 200]));
        assert_eq!(*out.get_pixel(95, 50), Rgb([95, 50, 200]));

        let edge = *out.get_pixel(20, 50);
        assert_ne!(edge, Rgb([255, 0, 0]));
        assert_ne!(edge, *base.get_pixel(20, 50));
    }

    #[test]
    fn uncovered_pixels_inside_mask_keep_base() {
        let base = RgbImage::from_pixel(40, 40, Rgb([9, 9, 9]));
        let warped = RgbaImage::from_pixel(40, 40, Rgba([200, 200, 200, 0]));
        let out = composite(&base, &warped, &square(5.0, 35.0), 0).unwrap();
        assert_eq!(out, base);
    }

    #[test]
    fn mismatched_canvas_is_rejected() {
        let base = RgbImage::new(10, 10);
        let warped = RgbaImage::new(11, 10);
        assert!(composite(&base, &warped, &square(1.0, 9.0), 2).is_err());
    }

    #[test]
    fn feather_edge_matches_kernel_tail() {
        let radius = 3;
        let mask = feather_mask(&square(20.0, 80.0), 100, 100, radius);
        let kernel = gaussian_kernel(radius);
        // Row 50 is far from the top and bottom edges, so only the column
        // pass at the left edge contributes: covered offsets are 0..=r.
        let expected: f32 = kernel[radius as usize..].iter().sum();
        assert!((mask.get(20, 50) - expected).abs() < 1e-5);
        let outside: f32 = kernel[radius as usize + 1..].iter().sum();
        assert!((mask.get(19, 50) - outside).abs() < 1e-5);
    }

    #[test]
    fn far_outside_corners_fill_the_canvas() {
        let huge = CornerSet::new(
            Point::new(-3e9, -3e9),
            Point::new(3e9, -3e9),
            Point::new(3e9, 3e9),
            Point::new(-3e9, 3e9),
        );
        let mask = polygon_mask(&huge, 100, 100);
        assert!(mask.pixels().all(|p| p.0[0] == 255));

        let base = RgbImage::from_pixel(100, 100, Rgb([1, 2, 3]));
        let warped = RgbaImage::from_pixel(100, 100, Rgba([40, 50, 60, 255]));
        let out = composite(&base, &warped, &huge, 2).unwrap();
        assert_eq!(*out.get_pixel(0, 0), Rgb([40, 50, 60]));
        assert_eq!(*out.get_pixel(99, 99), Rgb([40, 50, 60]));
    }

    #[test]
    fn clipping_keeps_inner_polygon_and_cuts_overhang() {
        let inner = square(10.0, 30.0);
        assert_eq!(clip_to_rect(inner.points(), (0.0, 0.0), (40.0, 40.0)), inner.points().to_vec());

        let overhang = [
            Point::new(-10.0, 10.0),
            Point::new(20.0, 10.0),
            Point::new(20.0, 20.0),
            Point::new(-10.0, 20.0),
        ];
        let clipped = clip_to_rect(&overhang, (0.0, 0.0), (40.0, 40.0));
        assert_eq!(clipped.len(), 4);
        assert!(clipped.iter().all(|p| p.x >= 0.0));
        for (ex, ey) in [(0.0, 10.0), (20.0, 10.0), (20.0, 20.0), (0.0, 20.0)] {
            assert!(
                clipped.iter().any(|p| (p.x - ex).abs() < 1e-9 && (p.y - ey).abs() < 1e-9),
                "missing ({ex}, {ey}) in {clipped:?}"
            );
        }
    }
}
