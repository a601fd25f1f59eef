// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline configuration. Every section has defaults, so a JSON file only
// needs to name the values it overrides.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::HueRange;

/// Tunables for every pipeline stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub detection: DetectionConfig,
    pub geometry: GeometryConfig,
    pub auto_match: AutoMatchConfig,
    pub preview: PreviewConfig,
    pub batch: BatchConfig,
}

/// Green-screen detection parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Accepted hue band (0–179 scale).
    pub hue_range: HueRange,
    /// Minimum HSV saturation (0–255) for a pixel to count as green.
    pub min_saturation: u8,
    /// Minimum HSV value (0–255) for a pixel to count as green.
    pub min_value: u8,
    /// Morphology kernel radius as a fraction of the shorter image side.
    pub morph_kernel_fraction: f64,
    /// Smallest accepted region, as a fraction of the image area.
    pub min_area_fraction: f64,
    /// Douglas–Peucker tolerances to try, as fractions of the contour perimeter.
    pub approx_tolerances: Vec<f64>,
    /// Fall back to the minimum-area rotated rectangle when no tolerance
    /// yields exactly four vertices.
    pub min_area_rect_fallback: bool,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            hue_range: HueRange::default(),
            min_saturation: 50,
            min_value: 50,
            morph_kernel_fraction: 0.005,
            min_area_fraction: 0.01,
            approx_tolerances: vec![0.02, 0.03, 0.04, 0.05, 0.06, 0.08, 0.10],
            min_area_rect_fallback: true,
        }
    }
}

/// Corner-set validation applied to every render request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryConfig {
    /// Smallest accepted quadrilateral, as a fraction of the base image area.
    pub min_area_fraction: f64,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            min_area_fraction: 0.01,
        }
    }
}

/// Automatic luminance matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoMatchConfig {
    /// Width of the surrounding sample band, as a fraction of the shorter side.
    pub ring_fraction: f64,
    /// Lower bound on the band width in pixels.
    pub min_ring_px: u32,
    /// Below this many ring pixels the match is skipped.
    pub min_ring_samples: usize,
}

impl Default for AutoMatchConfig {
    fn default() -> Self {
        Self {
            ring_fraction: 0.03,
            min_ring_px: 3,
            min_ring_samples: 100,
        }
    }
}

/// Preview payload generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Images wider than this are downscaled for previews.
    pub max_width: u32,
    /// JPEG quality (1–100).
    pub jpeg_quality: u8,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            max_width: 1200,
            jpeg_quality: 85,
        }
    }
}

/// What a batch does when one item fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Report the failure and keep rendering the remaining items.
    #[default]
    ContinueOnError,
    /// Stop at the first failed item.
    FailFast,
}

/// Batch rendering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub failure_policy: FailurePolicy,
    /// Worker threads; 0 uses the rayon default (one per core).
    pub threads: usize,
}

impl PipelineConfig {
    /// Load configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save configuration to a JSON file.
    pub fn to_json_file(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }
}
