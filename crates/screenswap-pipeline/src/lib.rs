// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// screenswap-pipeline: Image processing for the Screenswap compositor.
//
// Provides green-screen detection (color mask, contour, corner ordering), the
// render path (homography warp, photometric matching, feathered compositing),
// image codecs and previews, and parallel batch rendering.

pub mod batch;
pub mod codec;
pub mod detect;
pub mod pipeline;
pub mod render;

// Re-export the primary entry points so callers can use `screenswap_pipeline::Pipeline` etc.
pub use batch::{BatchItemReport, BatchRenderer, BatchReport};
pub use detect::ScreenDetector;
pub use pipeline::{CompositeResult, Pipeline};
pub use render::Homography;
