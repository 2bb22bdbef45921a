//! CPU reference backend.
//!
//! Executes the same passes as the GPU backend on the CPU: strand segments are
//! rasterized as screen-space capsules with analytic coverage, shaded with a
//! Kajiya-Kay diffuse term, shadowed through deep opacity maps and blended
//! with weighted blended OIT.

use std::path::Path;

use glam::{Mat4, Vec2, Vec3};

use super::{check_size, texel_count, write_png, DrawCall, FrameStats, GraphicsDevice, Pass};
use crate::error::RenderError;
use crate::geometry::{ribbon_offset, StrandGeometryBuffer};
use crate::gpu_types::{FrameUniforms, LightUniform, StrandVertex, MAX_LIGHTS};
use crate::oit::{coverage_alpha, resolve, OitPixel};
use crate::shadow::DeepOpacityMap;

const MAX_SHADOW_SAMPLES: usize = 64;

/// A segment of one strand, root side first.
#[derive(Clone, Copy)]
struct Segment {
    a: StrandVertex,
    b: StrandVertex,
}

/// Screen-space end of a segment.
#[derive(Clone, Copy)]
struct ScreenPoint {
    pixel: Vec2,
    depth: f32,
    width_px: f32,
}

pub struct SoftwareDevice {
    width: u32,
    height: u32,
    segments: Vec<Segment>,
    shadows: [Option<DeepOpacityMap>; MAX_LIGHTS],
    oit: Vec<OitPixel>,
    framebuffer: Vec<u8>,
    resolved: Option<Vec<u8>>,
    frame: u64,
    draws: u32,
}

impl SoftwareDevice {
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidViewport`] for a zero-sized target.
    pub fn new(width: u32, height: u32) -> Result<Self, RenderError> {
        check_size(width, height)?;
        let pixels = texel_count(width, height);
        Ok(Self {
            width,
            height,
            segments: Vec::new(),
            shadows: Default::default(),
            oit: vec![OitPixel::default(); pixels],
            framebuffer: vec![0; pixels * 4],
            resolved: None,
            frame: 0,
            draws: 0,
        })
    }

    /// RGBA8 pixels of the last finished frame, row-major from the top.
    #[must_use]
    pub fn framebuffer(&self) -> &[u8] {
        &self.framebuffer
    }

    /// Write the last finished frame to a PNG file.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Image`] if encoding or writing fails.
    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<(), RenderError> {
        write_png(path.as_ref(), self.width, self.height, &self.framebuffer)
    }

    fn shadow_pass(&mut self, light_index: usize, uniforms: &FrameUniforms, depth_only: bool) {
        let Some(light) = uniforms.active_lights().get(light_index).copied() else {
            tracing::warn!(light = light_index, "shadow pass for a light that is not in the frame");
            return;
        };
        if depth_only {
            self.shadows[light_index] = Some(DeepOpacityMap::new(
                light.shadow[2].max(1.0) as u32,
                light.view_proj(),
                light.shadow[0],
                light.shadow[1],
            ));
        }
        let Some(map) = self.shadows[light_index].as_mut() else {
            return;
        };

        let view_proj = light.view_proj();
        let texel = texel_size(&view_proj, map.resolution());
        let opacity = uniforms.hair.color[3];
        let (root_width, tip_width) = (uniforms.view.viewport[2], uniforms.view.viewport[3]);

        for segment in &self.segments {
            let (a, b) = (segment.a.position(), segment.b.position());
            let span = view_proj.project_point3(a).truncate().distance(view_proj.project_point3(b).truncate());
            let span_texels = span * 0.5 * map.resolution() as f32;
            let samples = (span_texels.ceil() as usize + 1).min(MAX_SHADOW_SAMPLES);
            // Each sample stands for an equal share of the texels the segment crosses.
            let share = span_texels.max(1.0) / (samples + 1) as f32;
            for k in 0..=samples {
                let s = k as f32 / samples as f32;
                let point = a.lerp(b, s);
                if depth_only {
                    map.record_depth(point);
                } else {
                    let t = segment.a.t + (segment.b.t - segment.a.t) * s;
                    let width = root_width + (tip_width - root_width) * t;
                    map.accumulate(point, opacity * (width / texel).min(1.0) * share);
                }
            }
        }
    }

    fn accumulate_pass(&mut self, uniforms: &FrameUniforms) {
        self.oit.fill(OitPixel::default());
        let view_proj = uniforms.view_proj();
        let eye = uniforms.eye();
        let color = Vec3::new(uniforms.hair.color[0], uniforms.hair.color[1], uniforms.hair.color[2]);
        let opacity = uniforms.hair.color[3];
        let ambient = uniforms.hair.params[0];
        let lights: Vec<LightUniform> = uniforms.active_lights().to_vec();
        let (root_width, tip_width) = (uniforms.view.viewport[2], uniforms.view.viewport[3]);
        let (w, h) = (self.width as f32, self.height as f32);

        let project = |vertex: &StrandVertex| -> Option<ScreenPoint> {
            let position = vertex.position();
            let half = 0.5 * (root_width + (tip_width - root_width) * vertex.t);
            let offset = ribbon_offset(position, vertex.tangent(), eye, half, 1.0);
            let left = to_screen(&view_proj, position - offset, w, h)?;
            let right = to_screen(&view_proj, position + offset, w, h)?;
            let center = to_screen(&view_proj, position, w, h)?;
            Some(ScreenPoint {
                pixel: center.0,
                depth: center.1,
                width_px: left.0.distance(right.0),
            })
        };

        for index in 0..self.segments.len() {
            let segment = self.segments[index];
            let (Some(a), Some(b)) = (project(&segment.a), project(&segment.b)) else {
                continue;
            };
            let reach = a.width_px.max(b.width_px) * 0.5 + 1.0;
            let min = a.pixel.min(b.pixel) - Vec2::splat(reach);
            let max = a.pixel.max(b.pixel) + Vec2::splat(reach);
            if max.x < 0.0 || max.y < 0.0 || min.x >= w || min.y >= h {
                continue;
            }
            let (x0, y0) = (min.x.max(0.0) as u32, min.y.max(0.0) as u32);
            let (x1, y1) = (
                (max.x.min(w - 1.0)) as u32,
                (max.y.min(h - 1.0)) as u32,
            );

            let axis = b.pixel - a.pixel;
            let length_squared = axis.length_squared();
            for y in y0..=y1 {
                for x in x0..=x1 {
                    let q = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                    let s = if length_squared > 1e-12 {
                        ((q - a.pixel).dot(axis) / length_squared).clamp(0.0, 1.0)
                    } else {
                        0.0
                    };
                    let distance = q.distance(a.pixel + axis * s);
                    let width_px = a.width_px + (b.width_px - a.width_px) * s;
                    let half = (width_px * 0.5).max(0.5);
                    let edge = (half + 0.5 - distance).clamp(0.0, 1.0);
                    if edge <= 0.0 {
                        continue;
                    }
                    let alpha = coverage_alpha(opacity, width_px, edge);
                    let depth = a.depth + (b.depth - a.depth) * s;
                    let world = segment.a.position().lerp(segment.b.position(), s);
                    let tangent = segment
                        .a
                        .tangent()
                        .lerp(segment.b.tangent(), s)
                        .try_normalize()
                        .unwrap_or(Vec3::NEG_Y);
                    let shaded = self.shade(color, ambient, &lights, world, tangent);
                    self.oit[y as usize * self.width as usize + x as usize].add(shaded, alpha, depth);
                }
            }
        }
    }

    fn shade(&self, color: Vec3, ambient: f32, lights: &[LightUniform], world: Vec3, tangent: Vec3) -> Vec3 {
        let mut light_sum = Vec3::splat(ambient);
        for (index, light) in lights.iter().enumerate() {
            let to_light = -light.direction();
            let cos = tangent.dot(to_light).clamp(-1.0, 1.0);
            let diffuse = (1.0 - cos * cos).max(0.0).sqrt();
            let transmittance = match (&self.shadows[index], light.casts_shadows()) {
                (Some(map), true) => map.transmittance(world),
                _ => 1.0,
            };
            light_sum += Vec3::new(light.color[0], light.color[1], light.color[2]) * diffuse * transmittance;
        }
        color * light_sum
    }

    fn resolve_pass(&mut self, uniforms: &FrameUniforms) {
        let background = Vec3::new(
            uniforms.hair.background[0],
            uniforms.hair.background[1],
            uniforms.hair.background[2],
        );
        let alpha = encode(uniforms.hair.background[3]);
        let mut pixels = vec![0; self.oit.len() * 4];
        for (pixel, out) in self.oit.iter().zip(pixels.chunks_exact_mut(4)) {
            let c = resolve(pixel, background);
            out[0] = encode(to_srgb(c.x));
            out[1] = encode(to_srgb(c.y));
            out[2] = encode(to_srgb(c.z));
            out[3] = if pixel.revealage < 1.0 { 255 } else { alpha };
        }
        self.resolved = Some(pixels);
    }
}

impl GraphicsDevice for SoftwareDevice {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        check_size(width, height)?;
        self.width = width;
        self.height = height;
        let pixels = texel_count(width, height);
        self.oit = vec![OitPixel::default(); pixels];
        self.framebuffer = vec![0; pixels * 4];
        self.resolved = None;
        tracing::debug!(width, height, "software target resized");
        Ok(())
    }

    fn submit_geometry(&mut self, geometry: &StrandGeometryBuffer) -> Result<(), RenderError> {
        self.segments.clear();
        for quad in geometry.indices.chunks_exact(6) {
            let (a, b) = (quad[0] as usize, quad[2] as usize);
            match (geometry.vertices.get(a), geometry.vertices.get(b)) {
                (Some(&a), Some(&b)) => self.segments.push(Segment { a, b }),
                _ => return Err(RenderError::Device(format!("index {} out of range", a.max(b)))),
            }
        }
        Ok(())
    }

    fn submit_draw(&mut self, draw: &DrawCall<'_>) -> Result<(), RenderError> {
        self.draws += 1;
        match draw.pass {
            Pass::ShadowDepth { light } | Pass::ShadowOpacity { light } if light >= MAX_LIGHTS => {
                return Err(RenderError::Device(format!("light {light} exceeds {MAX_LIGHTS}")));
            }
            Pass::ShadowDepth { light } => self.shadow_pass(light, draw.uniforms, true),
            Pass::ShadowOpacity { light } => self.shadow_pass(light, draw.uniforms, false),
            Pass::Accumulate => self.accumulate_pass(draw.uniforms),
            Pass::Resolve => self.resolve_pass(draw.uniforms),
        }
        Ok(())
    }

    fn finish_frame(&mut self) -> Result<FrameStats, RenderError> {
        self.frame += 1;
        if let Some(pixels) = self.resolved.take() {
            self.framebuffer = pixels;
        }
        let covered = self.oit.iter().filter(|p| p.revealage < 1.0).count() as u64;
        self.shadows = Default::default();
        let stats = FrameStats {
            frame: self.frame,
            draws: self.draws,
            covered_pixels: covered,
        };
        self.draws = 0;
        Ok(stats)
    }

    fn read_pixels(&mut self) -> Result<Option<Vec<u8>>, RenderError> {
        Ok(Some(self.framebuffer.clone()))
    }
}

/// Pixel position and view depth (clip w) of a world point.
fn to_screen(view_proj: &Mat4, point: Vec3, width: f32, height: f32) -> Option<(Vec2, f32)> {
    let clip = *view_proj * point.extend(1.0);
    if clip.w <= 1e-4 || !clip.is_finite() {
        return None;
    }
    let ndc = clip.truncate() / clip.w;
    Some((
        Vec2::new((ndc.x * 0.5 + 0.5) * width, (0.5 - ndc.y * 0.5) * height),
        clip.w,
    ))
}

/// World size of one shadow texel for an orthographic light transform.
fn texel_size(view_proj: &Mat4, resolution: u32) -> f32 {
    let scale = view_proj.row(0).truncate().length().max(1e-6);
    2.0 / (scale * resolution as f32)
}

fn to_srgb(linear: f32) -> f32 {
    linear.max(0.0).powf(1.0 / 2.2)
}

fn encode(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sized_target_is_rejected() {
        assert!(matches!(
            SoftwareDevice::new(0, 10),
            Err(RenderError::InvalidViewport { width: 0, height: 10 })
        ));
    }

    #[test]
    fn screen_mapping_puts_origin_top_left() {
        let (pixel, depth) = to_screen(&Mat4::IDENTITY, Vec3::new(-1.0, 1.0, 0.5), 100.0, 50.0).unwrap();
        assert_eq!(pixel, Vec2::ZERO);
        assert!((depth - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn srgb_encoding_brightens_midtones() {
        assert!(encode(to_srgb(0.2)) > encode(0.2));
        assert_eq!(encode(to_srgb(1.0)), 255);
    }
}
