// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Screenswap compositor.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, ScreenswapError};

/// A 2D point in image-pixel coordinates.
///
/// Serialised as a two-element `[x, y]` array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn sub(self, other: Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }

    fn length(self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }
}

impl From<[f64; 2]> for Point {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Point> for [f64; 2] {
    fn from(p: Point) -> Self {
        [p.x, p.y]
    }
}

/// Named position of a corner within a [`CornerSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomRight,
    BottomLeft,
}

impl Corner {
    /// All corners in canonical wire order.
    pub const ALL: [Corner; 4] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomRight,
        Corner::BottomLeft,
    ];

    /// Index of this corner in the canonical TL, TR, BR, BL order.
    pub const fn index(self) -> usize {
        match self {
            Self::TopLeft => 0,
            Self::TopRight => 1,
            Self::BottomRight => 2,
            Self::BottomLeft => 3,
        }
    }
}

/// Four labelled corners of the green-screen quadrilateral, ordered TL, TR, BR, BL.
///
/// The wire form is a JSON array of four `[x, y]` pairs. A deserialised or
/// hand-built set is not trusted: the render path calls [`CornerSet::validate`]
/// on every snapshot it consumes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CornerSet {
    points: [Point; 4],
}

impl CornerSet {
    /// Build a set from explicitly labelled corners.
    pub fn new(top_left: Point, top_right: Point, bottom_right: Point, bottom_left: Point) -> Self {
        Self {
            points: [top_left, top_right, bottom_right, bottom_left],
        }
    }

    /// Build a set from points already in TL, TR, BR, BL order.
    pub fn from_ordered(points: [Point; 4]) -> Self {
        Self { points }
    }

    /// The full-image rectangle `(0,0), (w,0), (w,h), (0,h)`.
    pub fn full_rect(width: u32, height: u32) -> Self {
        let (w, h) = (width as f64, height as f64);
        Self::new(
            Point::new(0.0, 0.0),
            Point::new(w, 0.0),
            Point::new(w, h),
            Point::new(0.0, h),
        )
    }

    pub fn get(&self, corner: Corner) -> Point {
        self.points[corner.index()]
    }

    pub fn top_left(&self) -> Point {
        self.get(Corner::TopLeft)
    }

    pub fn top_right(&self) -> Point {
        self.get(Corner::TopRight)
    }

    pub fn bottom_right(&self) -> Point {
        self.get(Corner::BottomRight)
    }

    pub fn bottom_left(&self) -> Point {
        self.get(Corner::BottomLeft)
    }

    /// Borrow the points in canonical order.
    pub fn points(&self) -> &[Point; 4] {
        &self.points
    }

    /// Return a copy with one corner moved (an operator dragging a handle).
    pub fn with_corner(mut self, corner: Corner, point: Point) -> Self {
        self.points[corner.index()] = point;
        self
    }

    /// Scale every coordinate, e.g. to map preview coordinates back to the
    /// full-resolution image (`factor = 1.0 / preview_scale`).
    pub fn scaled(self, factor: f64) -> Self {
        Self {
            points: self.points.map(|p| Point::new(p.x * factor, p.y * factor)),
        }
    }

    /// Axis-aligned bounding box as `(min_x, min_y, max_x, max_y)`.
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        self.points.iter().fold(
            (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
            |(x0, y0, x1, y1), p| (x0.min(p.x), y0.min(p.y), x1.max(p.x), y1.max(p.y)),
        )
    }

    /// Unsigned polygon area (shoelace formula).
    pub fn area(&self) -> f64 {
        let mut area = 0.0;
        for i in 0..4 {
            let j = (i + 1) % 4;
            area += self.points[i].x * self.points[j].y;
            area -= self.points[j].x * self.points[i].y;
        }
        area.abs() / 2.0
    }

    /// `true` when no two non-adjacent edges touch or cross.
    pub fn is_simple(&self) -> bool {
        let p = &self.points;
        !segments_intersect(p[0], p[1], p[2], p[3]) && !segments_intersect(p[1], p[2], p[3], p[0])
    }

    /// Check the invariants every corner set handed to the render path must hold.
    ///
    /// Rejects non-finite coordinates, duplicate points, three collinear
    /// consecutive corners, self-intersection, and an area below
    /// `min_area_fraction` of the `width × height` image.
    pub fn validate(&self, width: u32, height: u32, min_area_fraction: f64) -> Result<()> {
        if self.points.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
            return Err(ScreenswapError::InvalidGeometry(
                "corner coordinates must be finite numbers".into(),
            ));
        }

        for i in 0..4 {
            for j in (i + 1)..4 {
                if self.points[i].sub(self.points[j]).length() < 1e-6 {
                    return Err(ScreenswapError::InvalidGeometry(format!(
                        "{:?} and {:?} coincide at ({:.1}, {:.1})",
                        Corner::ALL[i],
                        Corner::ALL[j],
                        self.points[i].x,
                        self.points[i].y
                    )));
                }
            }
        }

        for i in 0..4 {
            let a = self.points[i];
            let b = self.points[(i + 1) % 4];
            let c = self.points[(i + 2) % 4];
            let e1 = b.sub(a);
            let e2 = c.sub(b);
            let cross = e1.x * e2.y - e1.y * e2.x;
            if cross.abs() <= 1e-6 * e1.length() * e2.length() {
                return Err(ScreenswapError::InvalidGeometry(format!(
                    "corners around {:?} are collinear",
                    Corner::ALL[(i + 1) % 4]
                )));
            }
        }

        if !self.is_simple() {
            return Err(ScreenswapError::InvalidGeometry(
                "corner polygon is self-intersecting".into(),
            ));
        }

        let area = self.area();
        let min_area = min_area_fraction * width as f64 * height as f64;
        if area < min_area {
            return Err(ScreenswapError::InvalidGeometry(format!(
                "quadrilateral area {area:.0} px² is below the minimum {min_area:.0} px²"
            )));
        }

        Ok(())
    }
}

impl fmt::Display for CornerSet {
    /// Text form `"x,y x,y x,y x,y"`, TL TR BR BL.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .points
            .iter()
            .map(|p| format!("{},{}", p.x, p.y))
            .collect();
        write!(f, "{}", parts.join(" "))
    }
}

impl FromStr for CornerSet {
    type Err = ScreenswapError;

    /// Parse either the JSON wire form or the text form `"x,y x,y x,y x,y"`.
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.starts_with('[') {
            return Ok(serde_json::from_str(trimmed)?);
        }

        let parts: Vec<&str> = trimmed.split_whitespace().collect();
        if parts.len() != 4 {
            return Err(ScreenswapError::invalid_parameter(
                "corners",
                format!("expected 4 space-separated x,y pairs, got {}", parts.len()),
            ));
        }

        let mut points = [Point::new(0.0, 0.0); 4];
        for (slot, part) in points.iter_mut().zip(parts) {
            let (x, y) = part.split_once(',').ok_or_else(|| {
                ScreenswapError::invalid_parameter("corners", format!("invalid point `{part}`"))
            })?;
            let parse = |v: &str| {
                v.trim().parse::<f64>().map_err(|_| {
                    ScreenswapError::invalid_parameter("corners", format!("invalid coordinate `{v}`"))
                })
            };
            *slot = Point::new(parse(x)?, parse(y)?);
        }
        Ok(Self::from_ordered(points))
    }
}

/// Orientation of the triplet `(a, b, c)`: sign of the cross product.
fn orientation(a: Point, b: Point, c: Point) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

fn on_segment(a: Point, b: Point, p: Point) -> bool {
    p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
}

/// Whether segment `p1-p2` touches or crosses segment `q1-q2`.
fn segments_intersect(p1: Point, p2: Point, q1: Point, q2: Point) -> bool {
    let d1 = orientation(q1, q2, p1);
    let d2 = orientation(q1, q2, p2);
    let d3 = orientation(p1, p2, q1);
    let d4 = orientation(p1, p2, q2);

    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }

    (d1 == 0.0 && on_segment(q1, q2, p1))
        || (d2 == 0.0 && on_segment(q1, q2, p2))
        || (d3 == 0.0 && on_segment(p1, p2, q1))
        || (d4 == 0.0 && on_segment(p1, p2, q2))
}

/// Accepted hue band on the 0–179 hue scale (half-degrees).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HueRange {
    pub low: u8,
    pub high: u8,
}

impl HueRange {
    /// Largest representable hue on the half-degree scale.
    pub const MAX_HUE: u8 = 179;

    pub fn new(low: u8, high: u8) -> Result<Self> {
        let range = Self { low, high };
        range.validate()?;
        Ok(range)
    }

    pub fn validate(&self) -> Result<()> {
        if self.high > Self::MAX_HUE {
            return Err(ScreenswapError::invalid_parameter(
                "hue_range",
                format!("high bound {} exceeds {}", self.high, Self::MAX_HUE),
            ));
        }
        if self.low >= self.high {
            return Err(ScreenswapError::invalid_parameter(
                "hue_range",
                format!("low bound {} must be below high bound {}", self.low, self.high),
            ));
        }
        Ok(())
    }

    /// Whether a hue (0–179 scale) falls inside the band, bounds inclusive.
    pub fn contains(&self, hue: f32) -> bool {
        hue >= self.low as f32 && hue <= self.high as f32
    }
}

impl Default for HueRange {
    fn default() -> Self {
        Self { low: 35, high: 85 }
    }
}

impl FromStr for HueRange {
    type Err = ScreenswapError;

    /// Parse `"low,high"`, e.g. `"35,85"`.
    fn from_str(s: &str) -> Result<Self> {
        let (low, high) = s.split_once(',').ok_or_else(|| {
            ScreenswapError::invalid_parameter("hue_range", "expected two comma-separated values")
        })?;
        let parse = |v: &str| {
            v.trim().parse::<u8>().map_err(|_| {
                ScreenswapError::invalid_parameter("hue_range", format!("invalid hue `{v}`"))
            })
        };
        Self::new(parse(low)?, parse(high)?)
    }
}

/// Manual photometric adjustments, applied in field order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManualAdjustments {
    /// Additive shift per channel, -100..=100.
    pub brightness: f32,
    /// Scale about mid-gray in percent, -100..=100.
    pub contrast: f32,
    /// Warm/cool shift (red up, blue down), -50..=50.
    pub temperature: f32,
    /// Saturation scale in percent, -100..=100.
    pub saturation: f32,
    /// Softening blur radius in pixels, 0..=20.
    pub blur: f32,
}

impl ManualAdjustments {
    pub const IDENTITY: Self = Self {
        brightness: 0.0,
        contrast: 0.0,
        temperature: 0.0,
        saturation: 0.0,
        blur: 0.0,
    };

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    pub fn validate(&self) -> Result<()> {
        check_range("brightness", self.brightness, -100.0, 100.0)?;
        check_range("contrast", self.contrast, -100.0, 100.0)?;
        check_range("temperature", self.temperature, -50.0, 50.0)?;
        check_range("saturation", self.saturation, -100.0, 100.0)?;
        check_range("blur", self.blur, 0.0, 20.0)
    }
}

impl Default for ManualAdjustments {
    fn default() -> Self {
        Self::IDENTITY
    }
}

fn check_range(name: &str, value: f32, min: f32, max: f32) -> Result<()> {
    if !value.is_finite() || value < min || value > max {
        return Err(ScreenswapError::invalid_parameter(
            name,
            format!("{value} is outside [{min}, {max}]"),
        ));
    }
    Ok(())
}

/// How the warped replacement is matched to the scene. The modes are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PhotometricMode {
    /// Match luminance statistics to a ring of surrounding base pixels.
    Auto,
    /// Apply explicit adjustments.
    Manual(ManualAdjustments),
}

impl Default for PhotometricMode {
    fn default() -> Self {
        Self::Manual(ManualAdjustments::IDENTITY)
    }
}

/// Per-render parameters supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdjustmentParameters {
    pub photometric: PhotometricMode,
    /// Feather kernel radius in pixels; 0 gives a hard edge.
    pub feather_radius: u32,
}

impl AdjustmentParameters {
    /// Default feather radius (a 5×5 kernel).
    pub const DEFAULT_FEATHER_RADIUS: u32 = 2;

    pub fn validate(&self) -> Result<()> {
        match &self.photometric {
            PhotometricMode::Auto => Ok(()),
            PhotometricMode::Manual(manual) => manual.validate(),
        }
    }
}

impl Default for AdjustmentParameters {
    fn default() -> Self {
        Self {
            photometric: PhotometricMode::default(),
            feather_radius: Self::DEFAULT_FEATHER_RADIUS,
        }
    }
}

/// Result of the detection path, as reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub corners: CornerSet,
    pub width: u32,
    pub height: u32,
}

/// Downscaled, base64-encoded JPEG used for interactive previews.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preview {
    /// Base64 (standard alphabet) JPEG bytes.
    pub image: String,
    pub width: u32,
    pub height: u32,
    /// Factor applied to the full-resolution image (≤ 1).
    pub scale: f64,
}

/// Lifecycle of a single render request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RenderStage {
    Idle,
    /// Corners were not supplied and are being detected.
    Detecting,
    Detected,
    /// Corners were supplied by the caller.
    Supplied,
    Rendering,
    Rendered,
    Failed,
}

impl RenderStage {
    /// Whether `next` is a legal successor of `self`.
    pub fn can_advance_to(self, next: RenderStage) -> bool {
        use RenderStage::*;
        matches!(
            (self, next),
            (Idle, Detecting)
                | (Idle, Supplied)
                | (Detecting, Detected)
                | (Detecting, Failed)
                | (Detected, Rendering)
                | (Supplied, Rendering)
                | (Rendering, Rendered)
                | (Rendering, Failed)
        )
    }
}
