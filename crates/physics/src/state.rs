//! # Simulation State
//!
//! Double-buffered particle storage. The committed buffer holds the last
//! completed step and is what snapshots are taken from; the working buffer is
//! written by the solver during a step and swapped in on commit.

use std::sync::Arc;

use glam::{Affine3A, Vec3};

use crate::snapshot::StateSnapshot;
use crate::topology::StrandTopology;
use crate::types::BodyPose;

/// Positions and velocities of every particle, indexed like the topology arena.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParticleBuffer {
    pub positions: Vec<Vec3>,
    pub velocities: Vec<Vec3>,
}

impl ParticleBuffer {
    fn copy_from(&mut self, other: &Self) {
        self.positions.clone_from(&other.positions);
        self.velocities.clone_from(&other.velocities);
    }
}

/// Borrowed view of both buffers for the duration of one step.
pub(crate) struct StepBuffers<'a> {
    pub prev_positions: &'a [Vec3],
    pub prev_velocities: &'a [Vec3],
    pub positions: &'a mut [Vec3],
    pub velocities: &'a mut [Vec3],
}

pub struct SimulationState {
    committed: ParticleBuffer,
    working: ParticleBuffer,
    step: u64,
}

impl SimulationState {
    /// Place every strand in its rest pose under `pose`, at rest.
    ///
    /// Strands whose root bone is missing from `pose` use the identity frame.
    #[must_use]
    pub fn from_rest_pose(topology: &StrandTopology, pose: &BodyPose) -> Self {
        let mut committed = ParticleBuffer {
            positions: vec![Vec3::ZERO; topology.particle_count()],
            velocities: vec![Vec3::ZERO; topology.particle_count()],
        };
        for strand in topology.strands() {
            let frame = pose.bone(strand.root_bone()).copied().unwrap_or(Affine3A::IDENTITY);
            for (slot, p) in committed.positions[strand.particles()]
                .iter_mut()
                .zip(topology.rest_pose(strand, &frame))
            {
                *slot = p;
            }
        }
        Self {
            working: committed.clone(),
            committed,
            step: 0,
        }
    }

    /// Positions of the last committed step.
    #[must_use]
    pub fn positions(&self) -> &[Vec3] {
        &self.committed.positions
    }

    /// Velocities of the last committed step.
    #[must_use]
    pub fn velocities(&self) -> &[Vec3] {
        &self.committed.velocities
    }

    #[must_use]
    pub fn committed(&self) -> &ParticleBuffer {
        &self.committed
    }

    /// Number of committed steps.
    #[must_use]
    pub fn step_count(&self) -> u64 {
        self.step
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.committed.positions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.committed.positions.is_empty()
    }

    /// Copy the committed buffer into the working buffer and lend both out.
    pub(crate) fn begin_step(&mut self) -> StepBuffers<'_> {
        self.working.copy_from(&self.committed);
        StepBuffers {
            prev_positions: &self.committed.positions,
            prev_velocities: &self.committed.velocities,
            positions: &mut self.working.positions,
            velocities: &mut self.working.velocities,
        }
    }

    /// Make the working buffer the committed one.
    pub(crate) fn commit(&mut self) {
        std::mem::swap(&mut self.committed, &mut self.working);
        self.step += 1;
    }

    /// Immutable copy of the committed buffer for render consumers.
    #[must_use]
    pub fn snapshot(&self, topology: Arc<StrandTopology>) -> StateSnapshot {
        StateSnapshot::new(self.step, Arc::from(self.committed.positions.as_slice()), topology)
    }

    /// Put one strand back into its rest pose with zero velocity.
    pub fn reset_strand(&mut self, topology: &StrandTopology, strand_index: usize, pose: &BodyPose) {
        let Some(strand) = topology.strand(strand_index) else {
            return;
        };
        let frame = pose.bone(strand.root_bone()).copied().unwrap_or(Affine3A::IDENTITY);
        let range = strand.particles();
        for (slot, p) in self.committed.positions[range.clone()]
            .iter_mut()
            .zip(topology.rest_pose(strand, &frame))
        {
            *slot = p;
        }
        self.committed.velocities[range].fill(Vec3::ZERO);
    }

    /// Put every strand back into its rest pose.
    pub fn reset_all(&mut self, topology: &StrandTopology, pose: &BodyPose) {
        for index in 0..topology.strand_count() {
            self.reset_strand(topology, index, pose);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{StrandAsset, StrandMaterial, TopologyAsset};

    fn topology() -> StrandTopology {
        StrandTopology::from_asset(&TopologyAsset {
            strands: vec![StrandAsset {
                root_bone: 0,
                rest_positions: vec![[0.0, 0.0, 0.0], [0.0, -1.0, 0.0]],
                material: StrandMaterial::default(),
            }],
        })
        .unwrap()
    }

    #[test]
    fn rest_pose_follows_bone_transform() {
        let topo = topology();
        let pose = BodyPose::new(vec![Affine3A::from_translation(Vec3::new(1.0, 2.0, 3.0))]);
        let state = SimulationState::from_rest_pose(&topo, &pose);
        assert_eq!(state.positions()[0], Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(state.positions()[1], Vec3::new(1.0, 1.0, 3.0));
    }

    #[test]
    fn working_writes_are_invisible_until_commit() {
        let topo = topology();
        let mut state = SimulationState::from_rest_pose(&topo, &BodyPose::identity(1));
        {
            let buffers = state.begin_step();
            buffers.positions[1] = Vec3::splat(9.0);
            assert_eq!(buffers.prev_positions[1], Vec3::new(0.0, -1.0, 0.0));
        }
        assert_eq!(state.positions()[1], Vec3::new(0.0, -1.0, 0.0));
        state.commit();
        assert_eq!(state.positions()[1], Vec3::splat(9.0));
        assert_eq!(state.step_count(), 1);
    }

    #[test]
    fn reset_strand_restores_rest_pose() {
        let topo = topology();
        let pose = BodyPose::identity(1);
        let mut state = SimulationState::from_rest_pose(&topo, &pose);
        {
            let buffers = state.begin_step();
            buffers.positions[1] = Vec3::splat(f32::NAN);
            buffers.velocities[1] = Vec3::ONE;
        }
        state.commit();
        state.reset_strand(&topo, 0, &pose);
        assert_eq!(state.positions()[1], Vec3::new(0.0, -1.0, 0.0));
        assert_eq!(state.velocities()[1], Vec3::ZERO);
    }
}
