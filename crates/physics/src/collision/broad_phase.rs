//! Broad-phase rejection with axis-aligned bounds

use glam::Vec3;

/// Axis-aligned bounding box in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Box that overlaps nothing.
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    #[must_use]
    pub fn around_sphere(center: Vec3, radius: f32) -> Self {
        let r = Vec3::splat(radius);
        Self {
            min: center - r,
            max: center + r,
        }
    }

    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Check if a sphere overlaps the box
    #[must_use]
    pub fn overlaps_sphere(&self, center: Vec3, radius: f32) -> bool {
        let r = Vec3::splat(radius);
        let lo = center - r;
        let hi = center + r;
        self.min.x <= hi.x && self.max.x >= lo.x &&
        self.min.y <= hi.y && self.max.y >= lo.y &&
        self.min.z <= hi.z && self.max.z >= lo.z
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_box_overlaps_nothing() {
        assert!(!Aabb::EMPTY.overlaps_sphere(Vec3::ZERO, 1000.0));
    }

    #[test]
    fn union_covers_both() {
        let a = Aabb::around_sphere(Vec3::ZERO, 1.0);
        let b = Aabb::around_sphere(Vec3::new(4.0, 0.0, 0.0), 1.0);
        let u = a.union(&b);
        assert!(u.overlaps_sphere(Vec3::new(2.0, 0.0, 0.0), 0.0));
        assert!(!u.overlaps_sphere(Vec3::new(2.0, 3.0, 0.0), 0.5));
    }
}
