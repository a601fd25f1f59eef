// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Corner ordering: label four unordered points as TL, TR, BR, BL.

use screenswap_core::{CornerSet, Point, Result};
use tracing::debug;

/// Label four points by the sum/difference rule.
///
/// Top-left has the smallest `x + y`, bottom-right the largest; top-right has
/// the smallest `y - x`, bottom-left the largest. Ties are broken by the
/// other coordinate so the labelling never depends on input order.
///
/// On a strongly rotated quad two labels can land on the same point; the
/// result then fails [`CornerSet::validate`].
pub fn label_corners(points: [Point; 4]) -> CornerSet {
    let sum = |p: &Point| p.x + p.y;
    let diff = |p: &Point| p.y - p.x;

    let pick = |better: &dyn Fn(&Point, &Point) -> bool| {
        let mut best = points[0];
        for p in &points[1..] {
            if better(p, &best) {
                best = *p;
            }
        }
        best
    };

    let top_left = pick(&|a, b| (sum(a), a.x) < (sum(b), b.x));
    let bottom_right = pick(&|a, b| (sum(a), a.x) > (sum(b), b.x));
    let top_right = pick(&|a, b| (diff(a), a.y) < (diff(b), b.y));
    let bottom_left = pick(&|a, b| (diff(a), a.y) > (diff(b), b.y));

    CornerSet::new(top_left, top_right, bottom_right, bottom_left)
}

/// Label the points and check the result is a usable quad in a
/// `width × height` image.
pub fn order_corners(points: [Point; 4], width: u32, height: u32, min_area_fraction: f64) -> Result<CornerSet> {
    let corners = label_corners(points);
    debug!(%corners, "Corners labelled");
    corners.validate(width, height, min_area_fraction)?;
    Ok(corners)
}
