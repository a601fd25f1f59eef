// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// End-to-end pipeline: the detect and render entry points callers use.
//
// The two paths share only the corner set: detection produces one, rendering
// consumes one (detected or supplied). Nothing is kept between calls.

use image::RgbImage;
use screenswap_core::{
    AdjustmentParameters, CornerSet, Detection, PipelineConfig, Preview, RenderStage, Result,
};
use tracing::{debug, info, instrument, warn};

use crate::codec;
use crate::detect::ScreenDetector;
use crate::render::render_composite;

/// Output of a render request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeResult {
    pub image: RgbImage,
    /// The corners actually used.
    pub corners: CornerSet,
    /// Whether the corners came from detection rather than the caller.
    pub detected: bool,
}

/// Tracks one request through its [`RenderStage`]s.
#[derive(Debug)]
struct StageTracker {
    stage: RenderStage,
}

impl StageTracker {
    fn new() -> Self {
        Self {
            stage: RenderStage::Idle,
        }
    }

    fn advance(&mut self, next: RenderStage) {
        if self.stage.can_advance_to(next) {
            debug!(from = ?self.stage, to = ?next, "Render stage");
        } else {
            warn!(from = ?self.stage, to = ?next, "Unexpected render stage transition");
        }
        self.stage = next;
    }

    fn finish<T>(&mut self, result: Result<T>) -> Result<T> {
        match &result {
            Ok(_) => self.advance(RenderStage::Rendered),
            Err(err) => {
                self.advance(RenderStage::Failed);
                warn!(error = %err, "Render failed");
            }
        }
        result
    }
}

/// Stateless compositor configured once and reused across requests.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn detector(&self) -> ScreenDetector {
        ScreenDetector::new(self.config.detection.clone())
    }

    // -- Detection ------------------------------------------------------------

    /// Locate the green screen in `base`.
    #[instrument(skip(self, base), fields(width = base.width(), height = base.height()))]
    pub fn detect(&self, base: &RgbImage) -> Result<Detection> {
        let corners = self.detector().detect(base)?;
        Ok(Detection {
            corners,
            width: base.width(),
            height: base.height(),
        })
    }

    /// Decode `data` and locate the green screen in it.
    pub fn detect_bytes(&self, data: &[u8]) -> Result<Detection> {
        self.detect(&codec::decode(data)?)
    }

    // -- Rendering ------------------------------------------------------------

    /// Composite `replacement` into `base`.
    ///
    /// When `corners` is `None` the screen is detected first. Supplied corners
    /// are validated against the base image before any pixel work.
    #[instrument(skip_all, fields(width = base.width(), height = base.height(), supplied = corners.is_some()))]
    pub fn render(
        &self,
        base: &RgbImage,
        corners: Option<CornerSet>,
        replacement: &RgbImage,
        params: &AdjustmentParameters,
    ) -> Result<CompositeResult> {
        params.validate()?;

        let mut tracker = StageTracker::new();
        let (corners, detected) = match corners {
            Some(corners) => {
                tracker.advance(RenderStage::Supplied);
                (corners, false)
            }
            None => {
                tracker.advance(RenderStage::Detecting);
                match self.detector().detect(base) {
                    Ok(corners) => {
                        tracker.advance(RenderStage::Detected);
                        (corners, true)
                    }
                    Err(err) => {
                        tracker.advance(RenderStage::Failed);
                        return Err(err);
                    }
                }
            }
        };

        tracker.advance(RenderStage::Rendering);
        let result = corners
            .validate(base.width(), base.height(), self.config.geometry.min_area_fraction)
            .and_then(|()| render_composite(base, replacement, &corners, params, &self.config.auto_match));
        let image = tracker.finish(result)?;

        info!(%corners, detected, "Composite rendered");
        Ok(CompositeResult {
            image,
            corners,
            detected,
        })
    }

    /// Byte-level render: decode both images, composite, and encode as PNG.
    pub fn render_bytes(
        &self,
        base: &[u8],
        corners: Option<CornerSet>,
        replacement: &[u8],
        params: &AdjustmentParameters,
    ) -> Result<Vec<u8>> {
        let base = codec::decode(base)?;
        let replacement = codec::decode(replacement)?;
        let result = self.render(&base, corners, &replacement, params)?;
        codec::encode_png(&result.image)
    }

    /// Downscaled base64 JPEG of `image` for interactive display.
    pub fn preview(&self, image: &RgbImage) -> Result<Preview> {
        codec::preview(image, &self.config.preview)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use screenswap_core::{ManualAdjustments, PhotometricMode, Point, ScreenswapError};

    fn base_with_screen() -> RgbImage {
        RgbImage::from_fn(240, 180, |x, y| {
            if (40..=200).contains(&x) && (30..=150).contains(&y) {
                Rgb([25, 210, 50])
            } else {
                Rgb([120, 110, 100])
            }
        })
    }

    fn blue(w: u32, h: u32) -> RgbImage {
        RgbImage::from_pixel(w, h, Rgb([10, 20, 230]))
    }

    #[test]
    fn render_detects_when_corners_missing() {
        let pipeline = Pipeline::default();
        let result = pipeline
            .render(&base_with_screen(), None, &blue(64, 48), &AdjustmentParameters::default())
            .unwrap();
        assert!(result.detected);
        assert_eq!(*result.image.get_pixel(120, 90), Rgb([10, 20, 230]));
        assert_eq!(*result.image.get_pixel(5, 5), Rgb([120, 110, 100]));
    }

    #[test]
    fn supplied_corners_skip_detection() {
        // No green at all: detection would fail, supplied corners must not need it.
        let base = RgbImage::from_pixel(100, 100, Rgb([50, 50, 50]));
        let corners = CornerSet::new(
            Point::new(20.0, 20.0),
            Point::new(80.0, 25.0),
            Point::new(75.0, 80.0),
            Point::new(25.0, 75.0),
        );
        let result = Pipeline::default()
            .render(&base, Some(corners), &blue(10, 10), &AdjustmentParameters::default())
            .unwrap();
        assert!(!result.detected);
        assert_eq!(result.corners, corners);
        assert_eq!(*result.image.get_pixel(50, 50), Rgb([10, 20, 230]));
    }

    #[test]
    fn invalid_supplied_corners_fail_before_rendering() {
        let base = RgbImage::from_pixel(100, 100, Rgb([50, 50, 50]));
        let bow_tie = CornerSet::new(
            Point::new(10.0, 10.0),
            Point::new(90.0, 90.0),
            Point::new(90.0, 10.0),
            Point::new(10.0, 90.0),
        );
        let err = Pipeline::default()
            .render(&base, Some(bow_tie), &blue(10, 10), &AdjustmentParameters::default())
            .unwrap_err();
        assert!(matches!(err, ScreenswapError::InvalidGeometry(_)));
    }

    #[test]
    fn corners_far_beyond_the_canvas_render_without_panicking() {
        let base = RgbImage::from_pixel(100, 100, Rgb([50, 50, 50]));
        let huge = CornerSet::new(
            Point::new(-3e9, -3e9),
            Point::new(3e9, -3e9),
            Point::new(3e9, 3e9),
            Point::new(-3e9, 3e9),
        );
        let result = Pipeline::default()
            .render(&base, Some(huge), &blue(10, 10), &AdjustmentParameters::default())
            .unwrap();
        assert_eq!(*result.image.get_pixel(50, 50), Rgb([10, 20, 230]));
        assert_eq!(*result.image.get_pixel(0, 0), Rgb([10, 20, 230]));
    }

    #[test]
    fn out_of_range_parameters_are_rejected() {
        let params = AdjustmentParameters {
            photometric: PhotometricMode::Manual(ManualAdjustments {
                contrast: 150.0,
                ..ManualAdjustments::IDENTITY
            }),
            ..AdjustmentParameters::default()
        };
        let err = Pipeline::default()
            .render(&base_with_screen(), None, &blue(8, 8), &params)
            .unwrap_err();
        assert!(matches!(err, ScreenswapError::InvalidParameter { .. }));
    }

    #[test]
    fn detect_reports_image_size() {
        let detection = Pipeline::default().detect(&base_with_screen()).unwrap();
        assert_eq!((detection.width, detection.height), (240, 180));
        let tl = detection.corners.top_left();
        assert!((tl.x - 40.0).abs() <= 3.0 && (tl.y - 30.0).abs() <= 3.0);
    }

    #[test]
    fn render_bytes_produces_png() {
        let base = codec::encode_png(&base_with_screen()).unwrap();
        let replacement = codec::encode_png(&blue(32, 32)).unwrap();
        let png = Pipeline::default()
            .render_bytes(&base, None, &replacement, &AdjustmentParameters::default())
            .unwrap();
        let decoded = codec::decode(&png).unwrap();
        assert_eq!(decoded.dimensions(), (240, 180));
    }

    #[test]
    fn garbage_bytes_are_unsupported() {
        let err = Pipeline::default().detect_bytes(b"nope").unwrap_err();
        assert!(matches!(err, ScreenswapError::UnsupportedImageFormat(_)));
    }
}
