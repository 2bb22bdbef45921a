//! Host-facing session.
//!
//! A [`SimulationSession`] owns everything one hair simulation needs: the
//! orchestrator with solver and state, the renderer, the camera and the
//! device frames are drawn on. The host calls [`SimulationSession::tick`]
//! once per frame and feeds pose and input in between.

use std::sync::Arc;

use hair_physics::{
    BodyPose, CollisionProxy, CollisionSet, PhysicsSolver, SimulationState, StateSnapshot, StrandTopology,
    TopologyAsset, TopologyLoadError,
};
use hair_render::{Camera, DrawStats, GraphicsDevice, Light, RenderError, StrandRenderer};
use thiserror::Error;

use crate::config::{ConfigError, SessionConfig};
use crate::diagnostics::{FrameDiagnostics, FrameReport};
use crate::input::InputEvent;
use crate::orchestrator::{FrameOrchestrator, FramePhase, StopHandle, Timestep};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("failed to load strand topology: {0}")]
    Topology(#[from] TopologyLoadError),
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

pub struct SimulationSession<D: GraphicsDevice> {
    orchestrator: FrameOrchestrator,
    renderer: StrandRenderer,
    device: D,
    camera: Camera,
    lights: Vec<Light>,
    frame: u64,
    totals: FrameDiagnostics,
}

impl<D: GraphicsDevice> SimulationSession<D> {
    /// Build the topology, place the strands in their rest pose and publish
    /// the first snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Config`] for an invalid config and
    /// [`SessionError::Topology`] if the asset cannot be simulated, including
    /// strands rooted on bones `rest_pose` does not have.
    pub fn initialize(
        config: SessionConfig,
        asset: &TopologyAsset,
        proxies: Vec<CollisionProxy>,
        rest_pose: BodyPose,
        device: D,
    ) -> Result<Self, SessionError> {
        config.validate()?;
        let mut topology = StrandTopology::from_asset(asset)?;
        topology.validate_bones(rest_pose.len())?;
        topology.set_length_scale(config.length_scale);
        let topology = Arc::new(topology);

        let state = SimulationState::from_rest_pose(&topology, &rest_pose);
        let solver = PhysicsSolver::new(Arc::clone(&topology), config.solver.clone());
        let mut orchestrator = FrameOrchestrator::new(
            solver,
            state,
            CollisionSet::new(proxies),
            rest_pose,
            Timestep::from(&config),
        );
        orchestrator.set_gravity(config.gravity);
        orchestrator.set_wind(config.wind);

        let (width, height) = device.size();
        let mut camera = Camera::new(config.camera.target, config.camera.distance, width, height);
        camera.orbit(config.camera.yaw, config.camera.pitch - camera.pitch);

        tracing::info!(
            strands = topology.strand_count(),
            particles = topology.particle_count(),
            parallel = orchestrator.solver().is_parallel(),
            width,
            height,
            "simulation session initialized"
        );

        Ok(Self {
            orchestrator,
            renderer: StrandRenderer::new(config.render),
            device,
            camera,
            lights: config.lights,
            frame: 0,
            totals: FrameDiagnostics::default(),
        })
    }

    /// Advance by `wall_dt` seconds of host time and draw the frame.
    ///
    /// Device failures are logged and counted; they never end the session.
    pub fn tick(&mut self, wall_dt: f64) -> FrameReport {
        if self.orchestrator.is_shut_down() {
            return FrameReport {
                frame: self.frame,
                transitions: vec![FramePhase::Shutdown],
                ..FrameReport::default()
            };
        }
        self.frame += 1;

        let mut render_diagnostics = FrameDiagnostics::default();
        let mut draw: Option<DrawStats> = None;
        let renderer = &mut self.renderer;
        let device = &mut self.device;
        let camera = &self.camera;
        let lights = &self.lights;
        let outcome = self.orchestrator.advance(wall_dt, |snapshot: &Arc<StateSnapshot>| {
            let geometry = renderer.build_geometry(snapshot);
            if geometry.report.overflow().is_some() {
                render_diagnostics.geometry_overflows += 1;
                render_diagnostics.culled_strands += geometry.report.culled_strands.len();
            }
            match renderer.draw(device, &geometry, camera, lights) {
                Ok(stats) => draw = Some(stats),
                Err(err) => {
                    tracing::error!(%err, step = snapshot.step(), "frame not drawn");
                    render_diagnostics.render_failures += 1;
                }
            }
        });

        let mut diagnostics = outcome.diagnostics;
        diagnostics += render_diagnostics;
        self.totals += diagnostics;
        if !diagnostics.is_clean() {
            tracing::debug!(frame = self.frame, ?diagnostics, "recoverable faults this frame");
        }

        FrameReport {
            frame: self.frame,
            steps: outcome.steps,
            transitions: outcome.transitions,
            discarded_time: outcome.discarded_time,
            stopped: outcome.stopped,
            diagnostics,
            draw,
        }
    }

    /// Apply host input. Takes effect from the next tick.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Render`] if the device rejects a resize.
    pub fn handle_input(&mut self, event: InputEvent) -> Result<(), SessionError> {
        match event {
            InputEvent::Orbit { yaw, pitch } => self.camera.orbit(yaw, pitch),
            InputEvent::Zoom(factor) => self.camera.zoom(factor),
            InputEvent::SetWind(wind) => self.orchestrator.set_wind(wind),
            InputEvent::ResetStrands => self.orchestrator.reset_strands(),
            InputEvent::Resize { width, height } => {
                self.device.resize(width, height)?;
                self.camera.resize(width, height);
            }
        }
        tracing::trace!(?event, "input applied");
        Ok(())
    }

    pub fn set_body_pose(&mut self, pose: BodyPose) {
        self.orchestrator.set_body_pose(pose);
    }

    /// Release simulation buffers. Later ticks report `Shutdown` and do nothing.
    pub fn shutdown(&mut self) {
        if self.orchestrator.is_shut_down() {
            return;
        }
        self.orchestrator.shutdown();
        tracing::info!(frames = self.frame, totals = ?self.totals, "simulation session shut down");
    }

    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.orchestrator.is_shut_down()
    }

    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        self.orchestrator.stop_handle()
    }

    /// Latest published snapshot, `None` after shutdown.
    #[must_use]
    pub fn latest_snapshot(&self) -> Option<Arc<StateSnapshot>> {
        self.orchestrator.exchange().latest()
    }

    #[must_use]
    pub fn orchestrator(&self) -> &FrameOrchestrator {
        &self.orchestrator
    }

    #[must_use]
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Fault counts over the whole session.
    #[must_use]
    pub fn totals(&self) -> FrameDiagnostics {
        self.totals
    }

    #[must_use]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    #[must_use]
    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }
}
