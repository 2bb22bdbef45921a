//! # Hair Runtime
//!
//! Drives a hair simulation frame by frame. [`FrameOrchestrator`] decouples
//! the fixed physics timestep from host frame times and hands committed
//! snapshots to the renderer; [`SimulationSession`] is the object a host
//! embeds, exposing `initialize`, `tick`, `handle_input`, `set_body_pose` and
//! `shutdown`.
//!
//! ```no_run
//! use hair_render::SoftwareDevice;
//! use hair_runtime::{DemoScene, SessionConfig, SimulationSession};
//!
//! # fn main() -> anyhow::Result<()> {
//! let scene = DemoScene::new(256, 10);
//! let device = SoftwareDevice::new(320, 240)?;
//! let mut session = SimulationSession::initialize(
//!     SessionConfig::default(),
//!     &scene.asset,
//!     scene.proxies.clone(),
//!     scene.rest_pose.clone(),
//!     device,
//! )?;
//! let report = session.tick(1.0 / 60.0);
//! assert_eq!(report.steps, 1);
//! session.shutdown();
//! # Ok(())
//! # }
//! ```

#![deny(clippy::all)]

pub mod config;
pub mod diagnostics;
pub mod input;
pub mod orchestrator;
pub mod scene;
pub mod session;

pub use config::{CameraConfig, ConfigError, SessionConfig};
pub use diagnostics::{FrameDiagnostics, FrameReport};
pub use input::InputEvent;
pub use orchestrator::{FrameOrchestrator, FrameOutcome, FramePhase, StopHandle, Timestep};
pub use scene::DemoScene;
pub use session::{SessionError, SimulationSession};
