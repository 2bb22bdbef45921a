//! Frame assembly.
//!
//! [`StrandRenderer`] turns snapshots into geometry and drives a
//! [`GraphicsDevice`] through the passes of a frame: for every shadow casting
//! light a depth and an opacity pass, then accumulation and resolve.

use glam::Vec3;
use hair_physics::StateSnapshot;

use crate::camera::Camera;
use crate::config::RenderConfig;
use crate::device::{DrawCall, GraphicsDevice, Pass};
use crate::error::RenderError;
use crate::geometry::{self, StrandGeometryBuffer};
use crate::gpu_types::{FrameUniforms, HairUniform, LightUniform, ViewUniform, MAX_LIGHTS};
use crate::light::Light;

/// What one call to [`StrandRenderer::draw`] did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DrawStats {
    /// Frame number reported by the device.
    pub frame: u64,
    /// Simulation step the geometry came from.
    pub step: u64,
    pub strands: usize,
    pub segments: usize,
    pub culled_strands: usize,
    pub passes: u32,
    pub covered_pixels: u64,
}

pub struct StrandRenderer {
    config: RenderConfig,
    /// Eye of the last drawn frame. Strands are culled by distance to it.
    focus: Option<Vec3>,
}

impl StrandRenderer {
    #[must_use]
    pub fn new(config: RenderConfig) -> Self {
        Self { config, focus: None }
    }

    #[must_use]
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: RenderConfig) {
        self.config = config;
    }

    /// Point distant strands are measured from when the geometry overflows.
    #[must_use]
    pub fn focus(&self) -> Vec3 {
        self.focus.unwrap_or(Vec3::ZERO)
    }

    /// Expand a snapshot into ribbon geometry, culling if it does not fit.
    pub fn build_geometry(&self, snapshot: &StateSnapshot) -> StrandGeometryBuffer {
        let geometry = geometry::build(snapshot, self.config.max_segments, self.focus());
        if let Some(overflow) = geometry.report.overflow() {
            tracing::warn!(
                %overflow,
                culled = geometry.report.culled_strands.len(),
                step = geometry.step,
                "dropping distant strands"
            );
        }
        geometry
    }

    /// Uniforms shared by every pass of a frame.
    ///
    /// Lights beyond [`MAX_LIGHTS`] are ignored. Each light's orthographic
    /// transform encloses the geometry bounds.
    #[must_use]
    pub fn frame_uniforms(
        &self,
        geometry: &StrandGeometryBuffer,
        camera: &Camera,
        lights: &[Light],
        (width, height): (u32, u32),
    ) -> FrameUniforms {
        let config = &self.config;
        let (center, radius) = geometry.bounding_sphere();
        let radius = radius + config.root_width.max(config.tip_width);
        let layer_thickness = config.shadow_layer_depth / (2.0 * radius.max(1e-3));

        let mut light_uniforms = [LightUniform::default(); MAX_LIGHTS];
        for (slot, light) in light_uniforms.iter_mut().zip(lights) {
            let color = light.color * light.intensity;
            *slot = LightUniform {
                view_proj: light.view_projection(center, radius).to_cols_array_2d(),
                direction: light
                    .direction
                    .normalize_or_zero()
                    .extend(if light.casts_shadows { 1.0 } else { 0.0 })
                    .to_array(),
                color: color.extend(0.0).to_array(),
                shadow: [
                    layer_thickness,
                    config.shadow_density,
                    config.shadow_resolution as f32,
                    0.0,
                ],
            };
        }
        let light_count = lights.len().min(MAX_LIGHTS);

        let [r, g, b] = config.hair_color;
        FrameUniforms {
            view: ViewUniform {
                view_proj: camera.build_view_projection_matrix().to_cols_array_2d(),
                view: camera.view_matrix().to_cols_array_2d(),
                eye: camera.eye().extend(1.0).to_array(),
                viewport: [width as f32, height as f32, config.root_width, config.tip_width],
            },
            hair: HairUniform {
                color: [r, g, b, config.opacity],
                background: config.background,
                params: [config.ambient, light_count as f32, 0.0, 0.0],
            },
            lights: light_uniforms,
        }
    }

    /// Passes for a frame with `lights`, in submission order.
    #[must_use]
    pub fn passes(lights: &[Light]) -> Vec<Pass> {
        let mut passes: Vec<Pass> = lights
            .iter()
            .take(MAX_LIGHTS)
            .enumerate()
            .filter(|(_, light)| light.casts_shadows)
            .flat_map(|(light, _)| [Pass::ShadowDepth { light }, Pass::ShadowOpacity { light }])
            .collect();
        passes.push(Pass::Accumulate);
        passes.push(Pass::Resolve);
        passes
    }

    /// Draw one frame.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidViewport`] for a zero-sized device target
    /// and propagates device failures. Nothing is submitted for an invalid
    /// viewport.
    pub fn draw(
        &mut self,
        device: &mut dyn GraphicsDevice,
        geometry: &StrandGeometryBuffer,
        camera: &Camera,
        lights: &[Light],
    ) -> Result<DrawStats, RenderError> {
        let (width, height) = device.size();
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidViewport { width, height });
        }
        if lights.len() > MAX_LIGHTS {
            tracing::debug!(lights = lights.len(), max = MAX_LIGHTS, "extra lights ignored");
        }
        self.focus = Some(camera.eye());

        let index_count = u32::try_from(geometry.indices.len()).map_err(|_| RenderError::GeometryOverflow {
            requested: geometry.segment_count,
            capacity: u32::MAX as usize / 6,
        })?;
        let uniforms = self.frame_uniforms(geometry, camera, lights, (width, height));

        device.submit_geometry(geometry)?;
        let passes = Self::passes(lights);
        for &pass in &passes {
            device.submit_draw(&DrawCall {
                pass,
                uniforms: &uniforms,
                index_count,
            })?;
        }
        let frame = device.finish_frame()?;
        tracing::trace!(frame = frame.frame, step = geometry.step, covered = frame.covered_pixels, "frame drawn");

        Ok(DrawStats {
            frame: frame.frame,
            step: geometry.step,
            strands: geometry.strand_count,
            segments: geometry.segment_count,
            culled_strands: geometry.report.culled_strands.len(),
            passes: passes.len() as u32,
            covered_pixels: frame.covered_pixels,
        })
    }
}

impl Default for StrandRenderer {
    fn default() -> Self {
        Self::new(RenderConfig::default())
    }
}
