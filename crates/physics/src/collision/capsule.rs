//! Particle-capsule contact

use glam::Vec3;

use super::Contact;

/// Closest point to `point` on the segment `a`-`b`.
#[must_use]
pub fn closest_point(a: Vec3, b: Vec3, point: Vec3) -> Vec3 {
    let axis = b - a;
    let length_squared = axis.length_squared();
    if length_squared <= f32::EPSILON {
        return a;
    }
    let t = ((point - a).dot(axis) / length_squared).clamp(0.0, 1.0);
    a + axis * t
}

/// Detect a particle of `point_radius` at `point` penetrating the capsule
/// swept by a sphere of `radius` along `a`-`b`.
#[must_use]
pub fn detect_point_capsule(
    a: Vec3,
    b: Vec3,
    radius: f32,
    point: Vec3,
    point_radius: f32,
) -> Option<Contact> {
    let closest = closest_point(a, b, point);
    let delta = point - closest;
    let min_distance = radius + point_radius;
    let distance_squared = delta.length_squared();

    if distance_squared >= min_distance * min_distance {
        return None;
    }

    let distance = distance_squared.sqrt();
    let normal = if distance > 1e-6 {
        delta / distance
    } else {
        // On the axis: any direction perpendicular to it will do
        (b - a)
            .try_normalize()
            .map_or(Vec3::Y, |axis| axis.any_orthonormal_vector())
    };

    Some(Contact {
        normal,
        depth: min_distance - distance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_contact_is_radial() {
        let c = detect_point_capsule(
            Vec3::ZERO,
            Vec3::new(0.0, 2.0, 0.0),
            0.5,
            Vec3::new(0.4, 1.0, 0.0),
            0.0,
        )
        .unwrap();
        assert!((c.normal - Vec3::X).length() < 1e-6);
        assert!((c.depth - 0.1).abs() < 1e-6);
    }

    #[test]
    fn cap_contact_points_along_axis() {
        let c = detect_point_capsule(
            Vec3::ZERO,
            Vec3::new(0.0, 2.0, 0.0),
            0.5,
            Vec3::new(0.0, 2.3, 0.0),
            0.0,
        )
        .unwrap();
        assert!((c.normal - Vec3::Y).length() < 1e-6);
        assert!((c.depth - 0.2).abs() < 1e-5);
    }

    #[test]
    fn axis_point_gets_unit_normal() {
        let c = detect_point_capsule(Vec3::ZERO, Vec3::Y, 0.5, Vec3::new(0.0, 0.5, 0.0), 0.0).unwrap();
        assert!((c.normal.length() - 1.0).abs() < 1e-5);
        assert!(c.normal.dot(Vec3::Y).abs() < 1e-5);
    }

    #[test]
    fn degenerate_capsule_acts_like_sphere() {
        assert_eq!(closest_point(Vec3::ONE, Vec3::ONE, Vec3::ZERO), Vec3::ONE);
    }
}
