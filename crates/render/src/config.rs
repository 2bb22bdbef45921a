use serde::{Deserialize, Serialize};

/// Strand appearance and pipeline limits.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Ribbon width at the root, in world units.
    pub root_width: f32,
    /// Ribbon width at the tip, in world units.
    pub tip_width: f32,
    /// Segment capacity of the geometry buffer.
    pub max_segments: usize,
    /// Linear RGB of the hair fibre.
    pub hair_color: [f32; 3],
    /// Opacity of a fully covered pixel.
    pub opacity: f32,
    /// Linear RGBA the hair is composited over.
    pub background: [f32; 4],
    /// Constant light term added to every fragment.
    pub ambient: f32,
    /// Deep opacity map resolution per light.
    pub shadow_resolution: u32,
    /// Depth of each deep opacity layer, in world units.
    pub shadow_layer_depth: f32,
    /// Attenuation per unit of accumulated opacity.
    pub shadow_density: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            root_width: 0.0012,
            tip_width: 0.0004,
            max_segments: 1 << 18,
            hair_color: [0.32, 0.2, 0.11],
            opacity: 0.7,
            background: [0.06, 0.06, 0.08, 1.0],
            ambient: 0.25,
            shadow_resolution: 256,
            shadow_layer_depth: 0.02,
            shadow_density: 1.5,
        }
    }
}

impl RenderConfig {
    /// Ribbon width at strand parameter `t` in `[0, 1]`.
    #[must_use]
    pub fn width_at(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        self.root_width * (1.0 - t) + self.tip_width * t
    }
}
