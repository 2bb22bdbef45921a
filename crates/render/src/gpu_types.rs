//! GPU-compatible type definitions for rendering
//!
//! Every type here is uploaded verbatim to the WGSL shaders in `shaders/`, so
//! all of them are `Pod` with explicit padding to 16-byte boundaries.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

/// Maximum number of lights a frame can carry.
pub const MAX_LIGHTS: usize = 2;

/// Layers of the deep opacity map.
pub const SHADOW_LAYERS: usize = 3;

/// One side of a strand ribbon at a particle.
///
/// Two vertices are emitted per particle; the vertex stage moves each one by
/// `side * width(t)` perpendicular to the tangent and the view direction.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct StrandVertex {
    pub position: [f32; 3],
    /// Strand parameter, 0 at the root and 1 at the tip
    pub t: f32,
    pub tangent: [f32; 3],
    /// -1 or +1
    pub side: f32,
    pub strand: u32,
    pub _pad: [u32; 3],
}

impl StrandVertex {
    #[must_use]
    pub fn position(&self) -> Vec3 {
        Vec3::from(self.position)
    }

    #[must_use]
    pub fn tangent(&self) -> Vec3 {
        Vec3::from(self.tangent)
    }
}

/// Camera matrices and ribbon parameters
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct ViewUniform {
    pub view_proj: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    /// Camera position in world coordinates, w unused
    pub eye: [f32; 4],
    /// Target width, height, root width, tip width
    pub viewport: [f32; 4],
}

/// One light and its deep opacity map layout
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct LightUniform {
    pub view_proj: [[f32; 4]; 4],
    /// Travel direction, w = 1 if the light casts shadows
    pub direction: [f32; 4],
    /// Linear color premultiplied by intensity, w unused
    pub color: [f32; 4],
    /// Layer thickness in light depth units, shadow density, map resolution, unused
    pub shadow: [f32; 4],
}

impl LightUniform {
    #[must_use]
    pub fn casts_shadows(&self) -> bool {
        self.direction[3] > 0.5
    }

    #[must_use]
    pub fn direction(&self) -> Vec3 {
        Vec3::new(self.direction[0], self.direction[1], self.direction[2])
    }

    #[must_use]
    pub fn view_proj(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.view_proj)
    }
}

/// Hair shading parameters
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct HairUniform {
    /// Linear RGB and opacity
    pub color: [f32; 4],
    pub background: [f32; 4],
    /// Ambient term, light count, unused, unused
    pub params: [f32; 4],
}

/// Everything a draw call reads, uploaded as a single uniform buffer.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct FrameUniforms {
    pub view: ViewUniform,
    pub hair: HairUniform,
    pub lights: [LightUniform; MAX_LIGHTS],
}

impl FrameUniforms {
    #[must_use]
    pub fn light_count(&self) -> usize {
        (self.hair.params[1] as usize).min(MAX_LIGHTS)
    }

    #[must_use]
    pub fn active_lights(&self) -> &[LightUniform] {
        &self.lights[..self.light_count()]
    }

    #[must_use]
    pub fn view_proj(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.view.view_proj)
    }

    #[must_use]
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.view.view)
    }

    #[must_use]
    pub fn eye(&self) -> Vec3 {
        Vec3::new(self.view.eye[0], self.view.eye[1], self.view.eye[2])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layouts_match_shader_expectations() {
        assert_eq!(std::mem::size_of::<StrandVertex>(), 48);
        assert_eq!(std::mem::size_of::<ViewUniform>(), 160);
        assert_eq!(std::mem::size_of::<LightUniform>(), 112);
        assert_eq!(std::mem::size_of::<HairUniform>(), 48);
        assert_eq!(
            std::mem::size_of::<FrameUniforms>(),
            160 + 48 + 112 * MAX_LIGHTS
        );
    }
}
