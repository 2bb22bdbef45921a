//! Render-visible copies of the simulation state.
//!
//! A [`StateSnapshot`] is immutable once built. The [`SnapshotExchange`] hands
//! the latest one from the simulation to any number of readers by swapping an
//! `Arc`; nothing is ever mutated in place, so a reader holding a snapshot
//! keeps seeing the same values while newer steps are published.

use std::sync::Arc;

use glam::Vec3;
use parking_lot::RwLock;

use crate::topology::{Strand, StrandTopology};

#[derive(Clone, Debug)]
pub struct StateSnapshot {
    step: u64,
    positions: Arc<[Vec3]>,
    topology: Arc<StrandTopology>,
}

impl StateSnapshot {
    #[must_use]
    pub fn new(step: u64, positions: Arc<[Vec3]>, topology: Arc<StrandTopology>) -> Self {
        Self {
            step,
            positions,
            topology,
        }
    }

    /// Step counter of the committed state this snapshot was taken from.
    #[must_use]
    pub fn step(&self) -> u64 {
        self.step
    }

    #[must_use]
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    #[must_use]
    pub fn topology(&self) -> &StrandTopology {
        &self.topology
    }

    /// Positions of one strand, root first.
    #[must_use]
    pub fn strand_positions(&self, strand: &Strand) -> &[Vec3] {
        &self.positions[strand.particles()]
    }
}

/// Single-writer, multi-reader handoff of the latest snapshot.
#[derive(Debug, Default)]
pub struct SnapshotExchange {
    latest: RwLock<Option<Arc<StateSnapshot>>>,
}

impl SnapshotExchange {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the published snapshot, returning the one it supersedes.
    pub fn publish(&self, snapshot: StateSnapshot) -> Option<Arc<StateSnapshot>> {
        let next = Arc::new(snapshot);
        let mut slot = self.latest.write();
        slot.replace(next)
    }

    /// The most recently published snapshot, if any.
    #[must_use]
    pub fn latest(&self) -> Option<Arc<StateSnapshot>> {
        self.latest.read().clone()
    }

    /// Drop the published snapshot. Readers that already hold it keep it alive.
    pub fn clear(&self) {
        self.latest.write().take();
    }
}
