//! Weighted blended order-independent transparency.
//!
//! Fragments are accumulated in any order into a premultiplied color sum, a
//! weight sum and a revealage product; [`resolve`] turns the three into the
//! final color. The weight function follows McGuire and Bavoil (2013),
//! equation 10, so nearer fragments dominate without sorting.

use glam::{Vec3, Vec4};

/// Weight of a fragment at view depth `depth` with coverage `alpha`.
#[must_use]
pub fn weight(depth: f32, alpha: f32) -> f32 {
    let z = depth.abs();
    let falloff = 10.0 / (1e-5 + (z / 5.0).powi(2) + (z / 200.0).powi(6));
    (alpha * falloff.clamp(1e-2, 3e3)).max(0.0)
}

/// Alpha of a strand fragment whose projected width is `width_px` pixels.
///
/// Strands thinner than a pixel cover only part of it; their opacity is
/// scaled by the covered fraction instead of being rasterized at full width.
#[must_use]
pub fn coverage_alpha(opacity: f32, width_px: f32, edge_coverage: f32) -> f32 {
    let fraction = width_px.clamp(0.0, 1.0);
    (opacity * fraction * edge_coverage.clamp(0.0, 1.0)).clamp(0.0, 1.0)
}

/// Per-pixel accumulation targets.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OitPixel {
    /// Sum of `color * alpha * weight` in xyz and `alpha * weight` in w.
    pub accum: Vec4,
    /// Product of `1 - alpha` over all fragments.
    pub revealage: f32,
}

impl Default for OitPixel {
    fn default() -> Self {
        Self {
            accum: Vec4::ZERO,
            revealage: 1.0,
        }
    }
}

impl OitPixel {
    pub fn add(&mut self, color: Vec3, alpha: f32, depth: f32) {
        if alpha <= 0.0 {
            return;
        }
        let w = weight(depth, alpha);
        self.accum += (color * alpha).extend(alpha) * w;
        self.revealage *= 1.0 - alpha;
    }
}

/// Composite the accumulated fragments over `background`.
#[must_use]
pub fn resolve(pixel: &OitPixel, background: Vec3) -> Vec3 {
    if pixel.revealage >= 1.0 {
        return background;
    }
    let average = pixel.accum.truncate() / pixel.accum.w.max(1e-5);
    average * (1.0 - pixel.revealage) + background * pixel.revealage
}
