use glam::Vec3;

/// Host input, applied between ticks.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputEvent {
    /// Rotate the camera around its target, in radians.
    Orbit { yaw: f32, pitch: f32 },
    /// Scale the camera distance; values below 1 move closer.
    Zoom(f32),
    /// Wind acceleration applied from the next step on.
    SetWind(Vec3),
    /// Put every strand back into its rest pose under the current body pose.
    ResetStrands,
    /// The render target changed size.
    Resize { width: u32, height: u32 },
}
