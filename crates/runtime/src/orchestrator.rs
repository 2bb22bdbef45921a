//! Fixed-timestep frame driver.
//!
//! Host frames arrive with arbitrary wall-clock deltas. The orchestrator
//! banks them in an accumulator and runs whole physics steps of the configured
//! `dt`, at most `max_steps_per_frame` per frame. Time still owed after that
//! is kept up to `max_time_debt` and the rest is dropped, so a slow frame can
//! never snowball into ever longer ones.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use glam::Vec3;
use hair_physics::{
    BodyPose, CollisionSet, PhysicsSolver, SimulationState, SnapshotExchange, StateSnapshot, StepInput,
};

use crate::config::SessionConfig;
use crate::diagnostics::FrameDiagnostics;

/// Slack when comparing banked time against `dt`. Hosts commonly pass
/// `1.0 / 60.0` in f64 while `dt` is stored as f32.
const TIME_EPSILON: f64 = 1e-9;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FramePhase {
    Idle,
    Stepping,
    Snapshotting,
    Rendering,
    /// Terminal; buffers have been released.
    Shutdown,
}

/// Cooperative stop flag, checked between physics steps.
#[derive(Clone, Debug, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Clear the flag so later frames step again.
    pub fn resume(&self) {
        self.0.store(false, Ordering::Release);
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Timestep {
    pub dt: f32,
    pub max_steps_per_frame: u32,
    pub max_time_debt: f64,
}

impl From<&SessionConfig> for Timestep {
    fn from(config: &SessionConfig) -> Self {
        Self {
            dt: config.dt,
            max_steps_per_frame: config.max_steps_per_frame.max(1),
            max_time_debt: config.max_time_debt.max(0.0),
        }
    }
}

/// Result of [`FrameOrchestrator::advance`].
#[derive(Clone, Debug, Default)]
pub struct FrameOutcome {
    pub steps: u32,
    pub transitions: Vec<FramePhase>,
    pub discarded_time: f64,
    pub stopped: bool,
    pub diagnostics: FrameDiagnostics,
    /// Snapshot handed to the render callback, if any.
    pub rendered: Option<Arc<StateSnapshot>>,
}

pub struct FrameOrchestrator {
    timestep: Timestep,
    solver: PhysicsSolver,
    state: Option<SimulationState>,
    collisions: CollisionSet,
    pose: BodyPose,
    pose_dirty: bool,
    input: StepInput,
    accumulator: f64,
    phase: FramePhase,
    exchange: Arc<SnapshotExchange>,
    stop: StopHandle,
}

impl FrameOrchestrator {
    /// Take ownership of the simulation and publish its initial snapshot.
    #[must_use]
    pub fn new(
        solver: PhysicsSolver,
        state: SimulationState,
        collisions: CollisionSet,
        pose: BodyPose,
        timestep: Timestep,
    ) -> Self {
        let exchange = Arc::new(SnapshotExchange::new());
        exchange.publish(state.snapshot(Arc::clone(solver.topology())));
        Self {
            input: StepInput::new(timestep.dt, Vec3::new(0.0, -9.8, 0.0), Vec3::ZERO),
            timestep,
            solver,
            state: Some(state),
            collisions,
            pose,
            pose_dirty: true,
            accumulator: 0.0,
            phase: FramePhase::Idle,
            exchange,
            stop: StopHandle::default(),
        }
    }

    #[must_use]
    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    /// Banked time not yet simulated, in seconds.
    #[must_use]
    pub fn accumulator(&self) -> f64 {
        self.accumulator
    }

    #[must_use]
    pub fn timestep(&self) -> Timestep {
        self.timestep
    }

    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Snapshot handoff readers can poll from other threads.
    #[must_use]
    pub fn exchange(&self) -> &Arc<SnapshotExchange> {
        &self.exchange
    }

    /// Live simulation state, `None` after shutdown.
    #[must_use]
    pub fn state(&self) -> Option<&SimulationState> {
        self.state.as_ref()
    }

    #[must_use]
    pub fn solver(&self) -> &PhysicsSolver {
        &self.solver
    }

    #[must_use]
    pub fn body_pose(&self) -> &BodyPose {
        &self.pose
    }

    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.phase == FramePhase::Shutdown
    }

    pub fn set_gravity(&mut self, gravity: Vec3) {
        self.input.gravity = gravity;
    }

    pub fn set_wind(&mut self, wind: Vec3) {
        self.input.wind = wind;
    }

    #[must_use]
    pub fn wind(&self) -> Vec3 {
        self.input.wind
    }

    /// New body pose; collision proxies are re-placed at the next frame.
    pub fn set_body_pose(&mut self, pose: BodyPose) {
        self.pose = pose;
        self.pose_dirty = true;
    }

    /// Put every strand back into its rest pose and publish the result.
    pub fn reset_strands(&mut self) {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        let topology = Arc::clone(self.solver.topology());
        state.reset_all(&topology, &self.pose);
        self.exchange.publish(state.snapshot(topology));
        tracing::info!(step = state.step_count(), "strands reset to rest pose");
    }

    /// Run one host frame.
    ///
    /// `render` receives the latest published snapshot once the physics
    /// steps of the frame are done. After shutdown nothing runs and an empty
    /// outcome is returned.
    pub fn advance<F>(&mut self, wall_dt: f64, render: F) -> FrameOutcome
    where
        F: FnOnce(&Arc<StateSnapshot>),
    {
        let mut outcome = FrameOutcome::default();
        let Some(state) = self.state.as_mut() else {
            return outcome;
        };

        if wall_dt.is_finite() && wall_dt > 0.0 {
            self.accumulator += wall_dt;
        } else if wall_dt != 0.0 {
            tracing::warn!(wall_dt, "ignoring unusable frame time");
        }

        if self.pose_dirty {
            outcome.diagnostics.missing_proxies += self.collisions.update(&self.pose).len();
            self.pose_dirty = false;
        }

        let quantum = f64::from(self.timestep.dt);
        self.input.dt = self.timestep.dt;
        while self.accumulator + TIME_EPSILON >= quantum && outcome.steps < self.timestep.max_steps_per_frame {
            if self.stop.is_stopped() {
                outcome.stopped = true;
                break;
            }
            self.phase = FramePhase::Stepping;
            outcome.transitions.push(FramePhase::Stepping);
            let report = self.solver.step(state, &self.input, &self.collisions);
            outcome.diagnostics.record_step(&report);
            self.accumulator = (self.accumulator - quantum).max(0.0);
            outcome.steps += 1;
        }
        if self.stop.is_stopped() {
            outcome.stopped = true;
        }

        if self.accumulator > self.timestep.max_time_debt && !outcome.stopped {
            outcome.discarded_time = self.accumulator - self.timestep.max_time_debt;
            self.accumulator = self.timestep.max_time_debt;
            tracing::debug!(
                discarded = outcome.discarded_time,
                steps = outcome.steps,
                "time debt over cap; dropping the excess"
            );
        }

        if outcome.steps > 0 {
            self.phase = FramePhase::Snapshotting;
            outcome.transitions.push(FramePhase::Snapshotting);
            self.exchange
                .publish(state.snapshot(Arc::clone(self.solver.topology())));
        }

        if let Some(snapshot) = self.exchange.latest() {
            self.phase = FramePhase::Rendering;
            outcome.transitions.push(FramePhase::Rendering);
            render(&snapshot);
            outcome.rendered = Some(snapshot);
        }

        self.phase = FramePhase::Idle;
        outcome.transitions.push(FramePhase::Idle);
        outcome
    }

    /// Release the simulation buffers. Later frames are no-ops.
    pub fn shutdown(&mut self) {
        if self.is_shut_down() {
            return;
        }
        self.state = None;
        self.exchange.clear();
        self.accumulator = 0.0;
        self.phase = FramePhase::Shutdown;
        tracing::info!("frame orchestrator shut down");
    }
}
