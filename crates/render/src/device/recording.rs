use super::{check_size, DrawCall, FrameStats, GraphicsDevice, Pass};
use crate::error::RenderError;
use crate::geometry::StrandGeometryBuffer;

/// What a [`RecordingDevice`] saw, in order.
#[derive(Clone, Debug, PartialEq)]
pub enum RecordedCommand {
    Geometry { vertices: usize, indices: usize, step: u64 },
    Draw { pass: Pass, index_count: u32, light_count: usize },
    Finish { frame: u64 },
}

/// Device that records submissions without drawing anything.
#[derive(Clone, Debug)]
pub struct RecordingDevice {
    width: u32,
    height: u32,
    frame: u64,
    draws: u32,
    commands: Vec<RecordedCommand>,
    fail_draws: bool,
}

impl RecordingDevice {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            frame: 0,
            draws: 0,
            commands: Vec::new(),
            fail_draws: false,
        }
    }

    /// Make every following `submit_draw` fail, to exercise error paths.
    #[must_use]
    pub fn failing(mut self) -> Self {
        self.fail_draws = true;
        self
    }

    #[must_use]
    pub fn commands(&self) -> &[RecordedCommand] {
        &self.commands
    }

    /// Passes drawn so far, in order.
    #[must_use]
    pub fn passes(&self) -> Vec<Pass> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                RecordedCommand::Draw { pass, .. } => Some(*pass),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }
}

impl GraphicsDevice for RecordingDevice {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        check_size(width, height)?;
        self.width = width;
        self.height = height;
        Ok(())
    }

    fn submit_geometry(&mut self, geometry: &StrandGeometryBuffer) -> Result<(), RenderError> {
        self.commands.push(RecordedCommand::Geometry {
            vertices: geometry.vertices.len(),
            indices: geometry.indices.len(),
            step: geometry.step,
        });
        Ok(())
    }

    fn submit_draw(&mut self, draw: &DrawCall<'_>) -> Result<(), RenderError> {
        if self.fail_draws {
            return Err(RenderError::Device("recording device set to fail".into()));
        }
        self.draws += 1;
        self.commands.push(RecordedCommand::Draw {
            pass: draw.pass,
            index_count: draw.index_count,
            light_count: draw.uniforms.light_count(),
        });
        Ok(())
    }

    fn finish_frame(&mut self) -> Result<FrameStats, RenderError> {
        self.frame += 1;
        self.commands.push(RecordedCommand::Finish { frame: self.frame });
        let stats = FrameStats {
            frame: self.frame,
            draws: self.draws,
            covered_pixels: 0,
        };
        self.draws = 0;
        Ok(stats)
    }
}
