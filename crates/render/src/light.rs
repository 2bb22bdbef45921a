use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// Directional light.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Light {
    /// Direction the light travels in, world space.
    pub direction: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    /// Whether a deep opacity map is rendered for this light.
    pub casts_shadows: bool,
}

impl Light {
    #[must_use]
    pub fn directional(direction: Vec3, color: Vec3, intensity: f32) -> Self {
        Self {
            direction: direction.normalize_or_zero(),
            color,
            intensity,
            casts_shadows: true,
        }
    }

    /// Key light from above and in front, plus a dim fill without shadows.
    #[must_use]
    pub fn studio() -> Vec<Self> {
        vec![
            Self::directional(Vec3::new(-0.4, -1.0, -0.6), Vec3::new(1.0, 0.96, 0.9), 1.2),
            Self {
                casts_shadows: false,
                ..Self::directional(Vec3::new(0.7, -0.2, 0.5), Vec3::new(0.6, 0.7, 1.0), 0.35)
            },
        ]
    }

    /// Orthographic light-space transform enclosing a sphere.
    ///
    /// Depth in the returned space runs from 0 at the side facing the light to
    /// 1 at the far side, over a range of `2 * radius`.
    #[must_use]
    pub fn view_projection(&self, center: Vec3, radius: f32) -> Mat4 {
        let radius = radius.max(1e-3);
        let direction = self.direction.try_normalize().unwrap_or(Vec3::NEG_Y);
        let up = if direction.dot(Vec3::Y).abs() > 0.99 {
            Vec3::Z
        } else {
            Vec3::Y
        };
        let eye = center - direction * radius;
        let view = Mat4::look_at_rh(eye, center, up);
        let projection = Mat4::orthographic_rh(-radius, radius, -radius, radius, 0.0, 2.0 * radius);
        projection * view
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn light_space_depth_grows_along_direction() {
        let light = Light::directional(Vec3::NEG_Y, Vec3::ONE, 1.0);
        let m = light.view_projection(Vec3::ZERO, 1.0);
        let top = m.project_point3(Vec3::new(0.0, 0.9, 0.0));
        let bottom = m.project_point3(Vec3::new(0.0, -0.9, 0.0));
        assert!(top.z < bottom.z);
        assert!((0.0..=1.0).contains(&top.z));
        assert!((0.0..=1.0).contains(&bottom.z));
    }
}
