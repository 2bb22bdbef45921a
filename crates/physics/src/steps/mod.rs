//! Per-strand solver passes.
//!
//! A strand shares no constraint with any other strand, so each pass works on
//! the strand's own slice of the particle arena and can run on any thread.

pub(crate) mod contact;
pub(crate) mod integration;
pub(crate) mod relax;

use glam::{Affine3A, Vec3};

use crate::collision::CollisionSet;
use crate::config::SolverConfig;
use crate::error::PhysicsError;
use crate::topology::{Strand, StrandTopology};
use crate::types::StepInput;

/// Read-only inputs for solving one strand.
pub(crate) struct StrandContext<'a> {
    pub index: usize,
    pub topology: &'a StrandTopology,
    pub strand: &'a Strand,
    pub root_frame: Affine3A,
    pub config: &'a SolverConfig,
    pub input: &'a StepInput,
    /// `None` when the collision set has never been posed.
    pub collisions: Option<&'a CollisionSet>,
}

impl StrandContext<'_> {
    pub fn inv_mass(&self) -> &[f32] {
        &self.topology.inv_mass()[self.strand.particles()]
    }

    pub fn rest_local(&self) -> &[Vec3] {
        &self.topology.rest_local()[self.strand.particles()]
    }
}

/// One strand's slices of the committed and working buffers.
pub(crate) struct StrandBuffers<'a> {
    pub prev_positions: &'a [Vec3],
    pub prev_velocities: &'a [Vec3],
    pub positions: &'a mut [Vec3],
    pub velocities: &'a mut [Vec3],
}

#[derive(Debug, Default)]
pub(crate) struct StrandOutcome {
    pub contacts: usize,
    pub fault: Option<PhysicsError>,
}

/// Integrate, relax, collide and derive velocities for one strand.
pub(crate) fn solve_strand(ctx: &StrandContext<'_>, buffers: &mut StrandBuffers<'_>) -> StrandOutcome {
    integration::predict(ctx, buffers);
    relax::relax(ctx, buffers.positions);
    let contacts = match ctx.collisions {
        Some(set) => contact::collide(ctx, set, buffers.positions),
        None => Vec::new(),
    };
    integration::derive_velocities(ctx, buffers, &contacts);

    let fault = diverged_particle(ctx, buffers).map(|local| {
        reset_to_rest(ctx, buffers);
        PhysicsError::NumericalInstability {
            strand: ctx.index,
            particle: ctx.strand.root() + local,
        }
    });

    StrandOutcome {
        contacts: contacts.len(),
        fault,
    }
}

/// First particle that is non-finite or beyond the divergence bound.
///
/// The bound grows with the strand's extent at the start of the step and with
/// how far the root moved during it, so a teleported body drags its strands
/// along without tripping it.
fn diverged_particle(ctx: &StrandContext<'_>, buffers: &StrandBuffers<'_>) -> Option<usize> {
    let positions = &*buffers.positions;
    let root = positions.first().copied().unwrap_or(Vec3::ZERO);
    let prev_root = buffers.prev_positions.first().copied().unwrap_or(root);
    let prev_extent = buffers
        .prev_positions
        .iter()
        .map(|p| p.distance(prev_root))
        .fold(0.0, f32::max);
    let bound = ctx.config.divergence_factor * ctx.strand.rest_length() * ctx.topology.length_scale()
        + prev_extent
        + root.distance(prev_root);
    positions
        .iter()
        .position(|p| !p.is_finite() || p.distance(root) > bound)
}

fn reset_to_rest(ctx: &StrandContext<'_>, buffers: &mut StrandBuffers<'_>) {
    for (slot, rest) in buffers.positions.iter_mut().zip(ctx.rest_local()) {
        *slot = ctx.root_frame.transform_point3(*rest);
    }
    buffers.velocities.fill(Vec3::ZERO);
}
