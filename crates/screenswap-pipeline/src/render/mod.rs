// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Render path: perspective warp, photometric matching, and feathered blend.

pub mod composite;
pub mod homography;
pub mod photometric;
pub mod warp;

use image::RgbImage;
use screenswap_core::config::AutoMatchConfig;
use screenswap_core::{AdjustmentParameters, CornerSet, Result};
use tracing::{debug, instrument};

pub use composite::{composite, feather_mask, polygon_mask};
pub use homography::Homography;
pub use photometric::{apply_manual, auto_match, match_photometry};
pub use warp::{rectify, warp_into_quad};

/// Composite `replacement` into the `corners` quad of `base`.
///
/// The corners are assumed validated; degenerate transforms still surface as
/// `InvalidGeometry` from the warp.
#[instrument(skip_all, fields(width = base.width(), height = base.height()))]
pub fn render_composite(
    base: &RgbImage,
    replacement: &RgbImage,
    corners: &CornerSet,
    params: &AdjustmentParameters,
    auto_config: &AutoMatchConfig,
) -> Result<RgbImage> {
    let (width, height) = base.dimensions();
    let warped = warp_into_quad(replacement, corners, width, height)?;
    debug!("Replacement warped");
    let matched = match_photometry(&warped, base, corners, &params.photometric, auto_config);
    debug!(mode = ?params.photometric, "Photometric match applied");
    composite(base, &matched, corners, params.feather_radius)
}
