// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Planar homography from four point correspondences.

use nalgebra::{Matrix3, SMatrix, SVector, Vector3};
use screenswap_core::{CornerSet, Point, Result, ScreenswapError};

/// A 3×3 projective transform with `h[2][2] == 1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Homography {
    matrix: Matrix3<f64>,
}

impl Homography {
    /// Solve for the transform mapping each `src[i]` onto `dst[i]`.
    ///
    /// Fails with `InvalidGeometry` when the system is singular, the
    /// transform flips orientation, or any source corner maps to or behind
    /// the horizon.
    pub fn from_correspondences(src: &[Point; 4], dst: &[Point; 4]) -> Result<Self> {
        let mut a = SMatrix::<f64, 8, 8>::zeros();
        let mut b = SVector::<f64, 8>::zeros();
        for i in 0..4 {
            let (x, y) = (src[i].x, src[i].y);
            let (u, v) = (dst[i].x, dst[i].y);
            let r = 2 * i;
            a.row_mut(r).copy_from_slice(&[x, y, 1.0, 0.0, 0.0, 0.0, -u * x, -u * y]);
            a.row_mut(r + 1).copy_from_slice(&[0.0, 0.0, 0.0, x, y, 1.0, -v * x, -v * y]);
            b[r] = u;
            b[r + 1] = v;
        }

        let h = a
            .lu()
            .solve(&b)
            .ok_or_else(|| ScreenswapError::InvalidGeometry("homography system is singular".into()))?;

        let matrix = Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], 1.0);
        if matrix.iter().any(|v| !v.is_finite()) {
            return Err(ScreenswapError::InvalidGeometry(
                "homography has non-finite coefficients".into(),
            ));
        }
        if matrix.determinant() <= 0.0 {
            return Err(ScreenswapError::InvalidGeometry(
                "corners map with reversed orientation".into(),
            ));
        }

        let homography = Self { matrix };
        for p in src {
            if homography.w(*p) <= 0.0 {
                return Err(ScreenswapError::InvalidGeometry(
                    "corner maps to or behind the horizon".into(),
                ));
            }
        }
        Ok(homography)
    }

    /// The transform taking the full `width × height` rectangle onto `quad`.
    pub fn rect_to_quad(width: u32, height: u32, quad: &CornerSet) -> Result<Self> {
        Self::from_correspondences(CornerSet::full_rect(width, height).points(), quad.points())
    }

    /// The transform taking `quad` onto the full `width × height` rectangle.
    pub fn quad_to_rect(quad: &CornerSet, width: u32, height: u32) -> Result<Self> {
        Self::from_correspondences(quad.points(), CornerSet::full_rect(width, height).points())
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }

    pub fn inverse(&self) -> Result<Self> {
        let inv = self
            .matrix
            .try_inverse()
            .ok_or_else(|| ScreenswapError::InvalidGeometry("homography is not invertible".into()))?;
        let scale = inv[(2, 2)];
        if scale.abs() < f64::EPSILON {
            return Err(ScreenswapError::InvalidGeometry("inverse homography is degenerate".into()));
        }
        Ok(Self { matrix: inv / scale })
    }

    fn w(&self, p: Point) -> f64 {
        (self.matrix.row(2) * Vector3::new(p.x, p.y, 1.0))[0]
    }

    /// Map a point; `None` when it lands on or behind the horizon.
    pub fn apply(&self, p: Point) -> Option<Point> {
        let v = self.matrix * Vector3::new(p.x, p.y, 1.0);
        if v.z <= f64::EPSILON {
            return None;
        }
        Some(Point::new(v.x / v.z, v.y / v.z))
    }
}
