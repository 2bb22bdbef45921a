//! Orbit camera
//!
//! The camera circles a target point. Yaw and pitch rotate the eye around the
//! target, the distance is changed by zooming.

use glam::{Mat4, Quat, Vec3};

const PITCH_LIMIT: f32 = 1.5;
const MIN_DISTANCE: f32 = 0.05;

/// Perspective camera orbiting a target point
#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    /// Point the camera looks at
    pub target: Vec3,
    /// Distance from the target to the eye
    pub distance: f32,
    /// Rotation around world Y, in radians
    pub yaw: f32,
    /// Elevation above the XZ plane, in radians
    pub pitch: f32,
    /// Up vector
    pub up: Vec3,
    /// Render target aspect ratio
    pub aspect: f32,
    /// Field of view in radians
    pub fovy: f32,
    /// Near clipping plane distance
    pub znear: f32,
    /// Far clipping plane distance
    pub zfar: f32,
}

impl Camera {
    /// Camera looking at `target` from the front, slightly above.
    #[must_use]
    pub fn new(target: Vec3, distance: f32, width: u32, height: u32) -> Self {
        Self {
            target,
            distance: distance.max(MIN_DISTANCE),
            yaw: 0.0,
            pitch: 0.15,
            up: Vec3::Y,
            aspect: aspect(width, height),
            fovy: 35.0f32.to_radians(),
            znear: 0.01,
            zfar: 20.0,
        }
    }

    /// Update aspect ratio when the target is resized
    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = aspect(width, height);
    }

    /// Rotate around the target. Pitch is clamped so the camera never flips.
    pub fn orbit(&mut self, yaw: f32, pitch: f32) {
        self.yaw += yaw;
        self.pitch = (self.pitch + pitch).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    /// Scale the orbit distance; `factor < 1` moves closer.
    pub fn zoom(&mut self, factor: f32) {
        if factor.is_finite() && factor > 0.0 {
            self.distance = (self.distance * factor).clamp(MIN_DISTANCE, self.zfar * 0.5);
        }
    }

    /// Eye position in world space
    #[must_use]
    pub fn eye(&self) -> Vec3 {
        let orientation = Quat::from_axis_angle(Vec3::Y, self.yaw) * Quat::from_axis_angle(Vec3::X, -self.pitch);
        self.target + orientation * Vec3::Z * self.distance
    }

    /// Unit vector from the eye toward the target
    #[must_use]
    pub fn forward(&self) -> Vec3 {
        (self.target - self.eye()).normalize_or_zero()
    }

    #[must_use]
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye(), self.target, self.up)
    }

    #[must_use]
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fovy, self.aspect, self.znear, self.zfar)
    }

    /// Computes a view projection matrix from the camera parameters
    #[must_use]
    pub fn build_view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Pixels per world unit at view depth `depth` for a target `height` pixels tall.
    #[must_use]
    pub fn pixels_per_unit(&self, depth: f32, height: u32) -> f32 {
        let half = (self.fovy * 0.5).tan() * depth.max(self.znear);
        height as f32 / (2.0 * half)
    }
}

fn aspect(width: u32, height: u32) -> f32 {
    width.max(1) as f32 / height.max(1) as f32
}
