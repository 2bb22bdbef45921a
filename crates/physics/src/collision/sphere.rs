//! Particle-sphere contact

use glam::Vec3;

use super::Contact;

/// Detect a particle of `point_radius` at `point` penetrating a sphere.
#[must_use]
pub fn detect_point_sphere(
    center: Vec3,
    radius: f32,
    point: Vec3,
    point_radius: f32,
) -> Option<Contact> {
    let delta = point - center;
    let min_distance = radius + point_radius;
    let distance_squared = delta.length_squared();

    if distance_squared >= min_distance * min_distance {
        return None;
    }

    let distance = distance_squared.sqrt();
    // Particle at the center: push out along +Y
    let normal = if distance > 1e-6 {
        delta / distance
    } else {
        Vec3::Y
    };

    Some(Contact {
        normal,
        depth: min_distance - distance,
    })
}
