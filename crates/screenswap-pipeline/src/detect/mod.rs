// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Green-screen detection: color mask, dominant contour, and corner labelling.

pub mod contour;
pub mod corners;
pub mod mask;

use image::RgbImage;
use screenswap_core::config::DetectionConfig;
use screenswap_core::{CornerSet, Result};
use tracing::{info, instrument};

pub use contour::dominant_quad;
pub use corners::{label_corners, order_corners};
pub use mask::green_mask;

/// Finds the green screen in a base image.
#[derive(Debug, Clone, Default)]
pub struct ScreenDetector {
    config: DetectionConfig,
}

impl ScreenDetector {
    pub fn new(config: DetectionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Detect the screen quad and return its labelled corners.
    ///
    /// Fails with `DetectionFailed` when no sufficiently large green region
    /// exists, and with `InvalidGeometry` when the recovered corners do not
    /// form a usable quad.
    #[instrument(skip(self, image), fields(width = image.width(), height = image.height()))]
    pub fn detect(&self, image: &RgbImage) -> Result<CornerSet> {
        let mask = green_mask(image, &self.config)?;
        let quad = dominant_quad(&mask, &self.config)?;
        let corners = order_corners(quad, image.width(), image.height(), self.config.min_area_fraction)?;
        info!(%corners, "Screen detected");
        Ok(corners)
    }
}
