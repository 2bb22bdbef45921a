//! Hair strand rendering.
//!
//! Snapshots published by the simulation are expanded into camera-facing
//! ribbons ([`geometry`]), lit with a Kajiya-Kay diffuse term under deep
//! opacity shadows ([`shadow`]) and blended without sorting ([`oit`]). The
//! passes run on any [`GraphicsDevice`]: the CPU [`SoftwareDevice`], the
//! [`RecordingDevice`] used in tests, or `WgpuDevice` with the `gpu` feature.

#![deny(clippy::all)]
#![allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]

pub mod camera;
pub mod config;
pub mod device;
pub mod error;
pub mod geometry;
pub mod gpu_types;
pub mod light;
pub mod oit;
pub mod renderer;
pub mod shadow;

pub use camera::Camera;
pub use config::RenderConfig;
#[cfg(feature = "gpu")]
pub use device::WgpuDevice;
pub use device::{
    write_png, DrawCall, FrameStats, GraphicsDevice, Pass, RecordedCommand, RecordingDevice, SoftwareDevice,
};
pub use error::RenderError;
pub use geometry::{GeometryReport, StrandGeometryBuffer};
pub use light::Light;
pub use renderer::{DrawStats, StrandRenderer};
