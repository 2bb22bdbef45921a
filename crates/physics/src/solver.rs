//! # Physics Solver
//!
//! Advances every strand by one fixed timestep with position-based dynamics:
//! predict, relax constraints, resolve collisions, derive velocities. Faults
//! are handled per strand and reported, never propagated as a failed step.

use std::sync::Arc;

use glam::Affine3A;
use rayon::prelude::*;

use crate::collision::CollisionSet;
use crate::config::{Parallelism, SolverConfig};
use crate::error::PhysicsError;
use crate::state::{SimulationState, StepBuffers};
use crate::steps::{solve_strand, StrandBuffers, StrandContext, StrandOutcome};
use crate::topology::StrandTopology;
use crate::types::StepInput;

/// Result of one call to [`PhysicsSolver::step`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepReport {
    /// Step counter after the step.
    pub step: u64,
    /// False if the step was abandoned and the committed state kept.
    pub committed: bool,
    /// Particles moved out of a collision proxy.
    pub contacts: usize,
    /// Strands reset to their rest pose.
    pub reset_strands: Vec<usize>,
    /// Every recoverable fault raised during the step.
    pub errors: Vec<PhysicsError>,
}

impl StepReport {
    fn abandoned(step: u64, error: PhysicsError) -> Self {
        Self {
            step,
            committed: false,
            errors: vec![error],
            ..Self::default()
        }
    }

    #[must_use]
    pub fn instability_count(&self) -> usize {
        self.errors
            .iter()
            .filter(|e| matches!(e, PhysicsError::NumericalInstability { .. }))
            .count()
    }

    #[must_use]
    pub fn missing_proxy_count(&self) -> usize {
        self.errors
            .iter()
            .filter(|e| matches!(e, PhysicsError::CollisionProxyMissing { .. }))
            .count()
    }
}

struct StrandJob<'a> {
    index: usize,
    buffers: StrandBuffers<'a>,
}

pub struct PhysicsSolver {
    topology: Arc<StrandTopology>,
    config: SolverConfig,
    pool: Option<rayon::ThreadPool>,
}

impl PhysicsSolver {
    /// Create a solver for `topology`.
    ///
    /// With [`Parallelism::Workers`] a fixed pool is built up front; if that
    /// fails the solver logs the failure and runs sequentially.
    #[must_use]
    pub fn new(topology: Arc<StrandTopology>, config: SolverConfig) -> Self {
        let pool = match config.parallelism {
            Parallelism::Sequential | Parallelism::Workers(0 | 1) => None,
            Parallelism::Workers(workers) => match rayon::ThreadPoolBuilder::new()
                .num_threads(workers)
                .thread_name(|i| format!("strand-worker-{i}"))
                .build()
            {
                Ok(pool) => {
                    tracing::info!(workers, "strand worker pool started");
                    Some(pool)
                }
                Err(e) => {
                    tracing::error!("failed to build strand worker pool, running sequentially: {e}");
                    None
                }
            },
        };
        Self {
            topology,
            config,
            pool,
        }
    }

    #[must_use]
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    #[must_use]
    pub fn topology(&self) -> &Arc<StrandTopology> {
        &self.topology
    }

    #[must_use]
    pub fn is_parallel(&self) -> bool {
        self.pool.is_some()
    }

    /// Advance `state` by one fixed step of `input.dt`.
    ///
    /// The committed buffer of `state` is only replaced once every strand has
    /// been solved. An unusable timestep or a state that does not match the
    /// topology abandons the step and leaves the committed state untouched.
    pub fn step(
        &self,
        state: &mut SimulationState,
        input: &StepInput,
        collisions: &CollisionSet,
    ) -> StepReport {
        if !input.dt.is_finite() || input.dt <= 0.0 {
            tracing::warn!(dt = input.dt, "abandoning step with invalid timestep");
            return StepReport::abandoned(state.step_count(), PhysicsError::InvalidTimestep(input.dt));
        }
        if state.len() != self.topology.particle_count() {
            tracing::error!(
                expected = self.topology.particle_count(),
                found = state.len(),
                "simulation state does not match topology"
            );
            return StepReport::abandoned(
                state.step_count(),
                PhysicsError::StateMismatch {
                    expected: self.topology.particle_count(),
                    found: state.len(),
                },
            );
        }

        let mut errors = Vec::new();
        let posed = if collisions.is_posed() {
            Some(collisions)
        } else {
            errors.extend(collisions.proxies().iter().enumerate().map(|(proxy, p)| {
                PhysicsError::CollisionProxyMissing {
                    proxy,
                    bone: p.bone(),
                }
            }));
            None
        };

        let topology = &*self.topology;
        let jobs = split_strands(topology, state.begin_step());
        let solve = |mut job: StrandJob<'_>| -> StrandOutcome {
            let strand = &topology.strands()[job.index];
            let root = strand.root();
            let root_frame = collisions.bone(strand.root_bone()).copied().unwrap_or_else(|| {
                Affine3A::from_translation(
                    job.buffers.prev_positions[0] - topology.rest_local()[root],
                )
            });
            let ctx = StrandContext {
                index: job.index,
                topology,
                strand,
                root_frame,
                config: &self.config,
                input,
                collisions: posed,
            };
            solve_strand(&ctx, &mut job.buffers)
        };

        let outcomes: Vec<StrandOutcome> = match &self.pool {
            Some(pool) => pool.install(|| jobs.into_par_iter().map(solve).collect()),
            None => jobs.into_iter().map(solve).collect(),
        };
        state.commit();

        let mut report = StepReport {
            step: state.step_count(),
            committed: true,
            ..StepReport::default()
        };
        for (index, outcome) in outcomes.into_iter().enumerate() {
            report.contacts += outcome.contacts;
            if let Some(fault) = outcome.fault {
                tracing::warn!("{fault}");
                report.reset_strands.push(index);
                errors.push(fault);
            }
        }
        report.errors = errors;

        tracing::trace!(
            step = report.step,
            contacts = report.contacts,
            resets = report.reset_strands.len(),
            "physics step committed"
        );
        report
    }
}

/// Cut the working buffers into one disjoint job per strand.
fn split_strands<'a>(topology: &StrandTopology, buffers: StepBuffers<'a>) -> Vec<StrandJob<'a>> {
    let StepBuffers {
        prev_positions,
        prev_velocities,
        mut positions,
        mut velocities,
    } = buffers;

    let mut jobs = Vec::with_capacity(topology.strand_count());
    for (index, strand) in topology.strands().iter().enumerate() {
        let len = strand.len();
        let (strand_positions, rest) = std::mem::take(&mut positions).split_at_mut(len);
        positions = rest;
        let (strand_velocities, rest) = std::mem::take(&mut velocities).split_at_mut(len);
        velocities = rest;
        jobs.push(StrandJob {
            index,
            buffers: StrandBuffers {
                prev_positions: &prev_positions[strand.particles()],
                prev_velocities: &prev_velocities[strand.particles()],
                positions: strand_positions,
                velocities: strand_velocities,
            },
        });
    }
    jobs
}
