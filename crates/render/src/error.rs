use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    /// More segments than the geometry buffer holds. Recoverable: the renderer
    /// culls distant strands until the buffer fits.
    #[error("strand geometry needs {requested} segments but capacity is {capacity}")]
    GeometryOverflow { requested: usize, capacity: usize },
    #[error("graphics device error: {0}")]
    Device(String),
    #[error("invalid viewport {width}x{height}")]
    InvalidViewport { width: u32, height: u32 },
    #[error("failed to write image: {0}")]
    Image(#[from] image::ImageError),
}

impl RenderError {
    /// True for errors the frame can continue through.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::GeometryOverflow { .. })
    }
}
