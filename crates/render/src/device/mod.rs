//! Graphics device abstraction.
//!
//! The renderer only needs to hand over geometry, issue draws for the passes
//! below and close the frame. Backends decide how each pass is executed.

mod recording;
mod software;
#[cfg(feature = "gpu")]
mod wgpu_device;

pub use recording::{RecordedCommand, RecordingDevice};
pub use software::SoftwareDevice;
#[cfg(feature = "gpu")]
pub use wgpu_device::WgpuDevice;

use std::path::Path;

use crate::error::RenderError;
use crate::geometry::StrandGeometryBuffer;
use crate::gpu_types::FrameUniforms;

/// Passes of a strand frame, in submission order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Pass {
    /// Nearest strand depth per texel, seen from a light.
    ShadowDepth { light: usize },
    /// Opacity accumulated into the deep opacity layers of a light.
    ShadowOpacity { light: usize },
    /// Weighted blended accumulation of all strand fragments.
    Accumulate,
    /// Composite of the accumulation targets over the background.
    Resolve,
}

#[derive(Clone, Copy, Debug)]
pub struct DrawCall<'a> {
    pub pass: Pass,
    pub uniforms: &'a FrameUniforms,
    /// Number of indices to draw from the submitted geometry.
    pub index_count: u32,
}

/// Summary returned when a frame is closed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub frame: u64,
    pub draws: u32,
    /// Pixels that received at least one strand fragment.
    pub covered_pixels: u64,
}

pub trait GraphicsDevice {
    /// Current target size in pixels.
    fn size(&self) -> (u32, u32);

    /// Resize the render target.
    ///
    /// # Errors
    ///
    /// Fails for a zero-sized target or when the backend cannot reallocate.
    fn resize(&mut self, width: u32, height: u32) -> Result<(), RenderError>;

    /// Upload the geometry every following draw of the frame reads.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Device`] if the backend rejects the upload.
    fn submit_geometry(&mut self, geometry: &StrandGeometryBuffer) -> Result<(), RenderError>;

    /// Execute one pass.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Device`] if the pass cannot be recorded.
    fn submit_draw(&mut self, draw: &DrawCall<'_>) -> Result<(), RenderError>;

    /// Finish the frame and present or store the result.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Device`] if submission or readback fails.
    fn finish_frame(&mut self) -> Result<FrameStats, RenderError>;

    /// RGBA8 pixels of the last finished frame, if the backend keeps them.
    fn read_pixels(&mut self) -> Result<Option<Vec<u8>>, RenderError> {
        Ok(None)
    }
}

/// Write RGBA8 pixels, row-major from the top, to a PNG file.
///
/// # Errors
///
/// Returns [`RenderError::Image`] if encoding or writing fails.
pub fn write_png(path: &Path, width: u32, height: u32, pixels: &[u8]) -> Result<(), RenderError> {
    image::save_buffer(path, pixels, width, height, image::ColorType::Rgba8)?;
    tracing::info!(path = %path.display(), width, height, "frame written");
    Ok(())
}

pub(crate) fn check_size(width: u32, height: u32) -> Result<(), RenderError> {
    if width == 0 || height == 0 {
        return Err(RenderError::InvalidViewport { width, height });
    }
    Ok(())
}

/// Cells of a `width` by `height` grid, counted without `u32` overflow.
pub(crate) fn texel_count(width: u32, height: u32) -> usize {
    width as usize * height as usize
}
