//! Deep opacity maps.
//!
//! A light's view is split into [`SHADOW_LAYERS`] slabs starting at the
//! nearest strand seen by each texel. The first pass records that depth, the
//! second accumulates fibre opacity into the slab each fragment falls in. A
//! lookup sums the slabs in front of a point, interpolating inside the slab it
//! lies in, and converts the opacity into transmittance.

use glam::{Mat4, Vec3};

use crate::device::texel_count;
use crate::gpu_types::SHADOW_LAYERS;

#[derive(Clone, Debug)]
pub struct DeepOpacityMap {
    resolution: u32,
    view_proj: Mat4,
    layer_depth: f32,
    density: f32,
    front: Vec<f32>,
    layers: Vec<[f32; SHADOW_LAYERS]>,
}

impl DeepOpacityMap {
    /// An empty map. `layer_depth` is the slab thickness in light depth units.
    #[must_use]
    pub fn new(resolution: u32, view_proj: Mat4, layer_depth: f32, density: f32) -> Self {
        let resolution = resolution.max(1);
        let texels = texel_count(resolution, resolution);
        Self {
            resolution,
            view_proj,
            layer_depth: layer_depth.max(1e-6),
            density,
            front: vec![f32::INFINITY; texels],
            layers: vec![[0.0; SHADOW_LAYERS]; texels],
        }
    }

    #[must_use]
    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    /// Texel and light depth of a world-space point, or `None` outside the map.
    #[must_use]
    pub fn project(&self, point: Vec3) -> Option<(usize, f32)> {
        let ndc = self.view_proj.project_point3(point);
        if !ndc.is_finite() || ndc.x.abs() > 1.0 || ndc.y.abs() > 1.0 || !(0.0..=1.0).contains(&ndc.z) {
            return None;
        }
        let size = self.resolution as f32;
        let x = (((ndc.x * 0.5 + 0.5) * size) as u32).min(self.resolution - 1);
        let y = (((0.5 - ndc.y * 0.5) * size) as u32).min(self.resolution - 1);
        Some((y as usize * self.resolution as usize + x as usize, ndc.z))
    }

    /// Depth pass: keep the nearest depth per texel.
    pub fn record_depth(&mut self, point: Vec3) {
        if let Some((texel, depth)) = self.project(point) {
            let front = &mut self.front[texel];
            *front = front.min(depth);
        }
    }

    /// Opacity pass: add `opacity` to the slab `point` falls in.
    ///
    /// Points behind the last slab count toward the last one.
    pub fn accumulate(&mut self, point: Vec3, opacity: f32) {
        let Some((texel, depth)) = self.project(point) else {
            return;
        };
        let front = self.front[texel];
        if !front.is_finite() {
            return;
        }
        let layer = (((depth - front) / self.layer_depth).max(0.0) as usize).min(SHADOW_LAYERS - 1);
        self.layers[texel][layer] += opacity;
    }

    /// Opacity between the light and `point`.
    #[must_use]
    pub fn opacity(&self, point: Vec3) -> f32 {
        let Some((texel, depth)) = self.project(point) else {
            return 0.0;
        };
        let front = self.front[texel];
        if !front.is_finite() || depth <= front {
            return 0.0;
        }
        let position = (depth - front) / self.layer_depth;
        let mut total = 0.0;
        for (layer, &value) in self.layers[texel].iter().enumerate() {
            let start = layer as f32;
            if position <= start {
                break;
            }
            total += value * (position - start).min(1.0);
        }
        total
    }

    /// Fraction of light reaching `point`.
    #[must_use]
    pub fn transmittance(&self, point: Vec3) -> f32 {
        (-self.density * self.opacity(point)).exp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::light::Light;

    fn map() -> DeepOpacityMap {
        let light = Light::directional(Vec3::NEG_Y, Vec3::ONE, 1.0);
        // Depth range 2 world units, so 0.1 world units is 0.05 depth.
        DeepOpacityMap::new(16, light.view_projection(Vec3::ZERO, 1.0), 0.05, 1.0)
    }

    #[test]
    fn occluders_darken_points_behind_them() {
        let mut map = map();
        let occluder = Vec3::new(0.0, 0.5, 0.0);
        map.record_depth(occluder);
        map.accumulate(occluder, 0.8);

        let above = Vec3::new(0.0, 0.6, 0.0);
        let below = Vec3::new(0.0, 0.2, 0.0);
        assert!((map.transmittance(above) - 1.0).abs() < 1e-6);
        assert!(map.transmittance(below) < 0.5);
    }

    #[test]
    fn opacity_grows_through_the_layers() {
        let mut map = map();
        let front = Vec3::new(0.0, 0.5, 0.0);
        map.record_depth(front);
        map.accumulate(front, 0.2);
        map.accumulate(Vec3::new(0.0, 0.38, 0.0), 0.3);
        map.accumulate(Vec3::new(0.0, -0.5, 0.0), 0.4);

        let a = map.opacity(Vec3::new(0.0, 0.44, 0.0));
        let b = map.opacity(Vec3::new(0.0, 0.32, 0.0));
        let c = map.opacity(Vec3::new(0.0, -0.8, 0.0));
        assert!(a < b && b < c, "{a} {b} {c}");
        assert!((c - 0.9).abs() < 1e-5);
    }

    #[test]
    fn points_outside_the_map_are_lit() {
        let map = map();
        assert!((map.transmittance(Vec3::new(5.0, 0.0, 0.0)) - 1.0).abs() < 1e-6);
    }
}
