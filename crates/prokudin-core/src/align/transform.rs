use std::fmt;

use serde::{Deserialize, Serialize};

/// Smallest `a^2 + b^2` (squared scale) accepted as non-degenerate.
const MIN_SCALE_SQ: f64 = 1e-8;

/// 2-D similarity (partial affine) transform: uniform scale, rotation and
/// translation.
///
/// ```text
/// x' = a*x - b*y + tx
/// y' = b*x + a*y + ty
/// ```
///
/// with `a = s*cos(theta)` and `b = s*sin(theta)`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimilarityTransform {
    pub a: f64,
    pub b: f64,
    pub tx: f64,
    pub ty: f64,
}

impl Default for SimilarityTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl SimilarityTransform {
    pub fn identity() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            tx: 0.0,
            ty: 0.0,
        }
    }

    pub fn translation(tx: f64, ty: f64) -> Self {
        Self {
            tx,
            ty,
            ..Self::identity()
        }
    }

    pub fn from_params(scale: f64, angle_rad: f64, tx: f64, ty: f64) -> Self {
        Self {
            a: scale * angle_rad.cos(),
            b: scale * angle_rad.sin(),
            tx,
            ty,
        }
    }

    #[inline]
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x - self.b * y + self.tx,
            self.b * x + self.a * y + self.ty,
        )
    }

    pub fn scale(&self) -> f64 {
        self.a.hypot(self.b)
    }

    pub fn rotation_degrees(&self) -> f64 {
        self.b.atan2(self.a).to_degrees()
    }

    /// Non-finite coefficients or a collapsed (near-zero) scale.
    pub fn is_degenerate(&self) -> bool {
        let finite = [self.a, self.b, self.tx, self.ty]
            .iter()
            .all(|v| v.is_finite());
        !finite || self.a * self.a + self.b * self.b < MIN_SCALE_SQ
    }

    /// Inverse mapping, or `None` for a degenerate transform.
    pub fn inverse(&self) -> Option<Self> {
        if self.is_degenerate() {
            return None;
        }
        let det = self.a * self.a + self.b * self.b;
        let a = self.a / det;
        let b = -self.b / det;
        Some(Self {
            a,
            b,
            tx: -(a * self.tx - b * self.ty),
            ty: -(b * self.tx + a * self.ty),
        })
    }
}

impl fmt::Display for SimilarityTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "scale {:.4}, rotation {:.3}°, translation ({:.2}, {:.2})",
            self.scale(),
            self.rotation_degrees(),
            self.tx,
            self.ty
        )
    }
}

/// Least-squares similarity mapping `src` points onto `dst` points.
///
/// Closed-form (Umeyama-style) solution from the centered cross-covariance.
/// Needs at least two point pairs with spread; returns `None` otherwise.
pub fn estimate_similarity(src: &[(f64, f64)], dst: &[(f64, f64)]) -> Option<SimilarityTransform> {
    if src.len() < 2 || src.len() != dst.len() {
        return None;
    }

    let (scx, scy) = centroid(src);
    let (dcx, dcy) = centroid(dst);

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    let mut syx = 0.0;
    let mut syy = 0.0;
    let mut src_var = 0.0;

    for (&(sx, sy), &(dx, dy)) in src.iter().zip(dst) {
        let (rx, ry) = (sx - scx, sy - scy);
        let (tx, ty) = (dx - dcx, dy - dcy);
        sxx += rx * tx;
        sxy += rx * ty;
        syx += ry * tx;
        syy += ry * ty;
        src_var += rx * rx + ry * ry;
    }

    if src_var < 1e-10 {
        return None;
    }

    let a = (sxx + syy) / src_var;
    let b = (sxy - syx) / src_var;
    let t = SimilarityTransform {
        a,
        b,
        tx: dcx - (a * scx - b * scy),
        ty: dcy - (b * scx + a * scy),
    };
    (!t.is_degenerate()).then_some(t)
}

pub(crate) fn centroid(points: &[(f64, f64)]) -> (f64, f64) {
    if points.is_empty() {
        return (0.0, 0.0);
    }
    let (sx, sy) = points
        .iter()
        .fold((0.0, 0.0), |(ax, ay), &(x, y)| (ax + x, ay + y));
    let n = points.len() as f64;
    (sx / n, sy / n)
}
