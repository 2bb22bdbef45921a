use serde::{Deserialize, Serialize};

/// How strands are distributed across threads during relaxation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parallelism {
    /// Every strand is solved on the calling thread.
    #[default]
    Sequential,
    /// Strands are spread over a fixed pool of this many worker threads.
    Workers(usize),
}

/// Solver tuning knobs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Constraint relaxation sweeps per step; clamped to `1..=64`.
    pub iterations: u32,
    /// Collision projection passes per particle per step.
    pub collision_passes: u32,
    /// Collision radius of a particle.
    pub particle_radius: f32,
    /// Fraction of the normal velocity kept after a contact, in `[0, 1]`.
    pub restitution: f32,
    /// Fraction of the tangential velocity removed by a contact, in `[0, 1]`.
    pub friction: f32,
    /// Scale applied to the wind acceleration.
    pub wind_response: f32,
    /// A particle farther from its root than this many strand lengths, on top
    /// of the strand's extent before the step and the root's travel during
    /// it, is treated as diverged.
    pub divergence_factor: f32,
    pub parallelism: Parallelism,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            iterations: 6,
            collision_passes: 2,
            particle_radius: 0.002,
            restitution: 0.0,
            friction: 0.2,
            wind_response: 1.0,
            divergence_factor: 4.0,
            parallelism: Parallelism::Sequential,
        }
    }
}

impl SolverConfig {
    pub const MAX_ITERATIONS: u32 = 64;

    #[must_use]
    pub fn iterations(&self) -> u32 {
        self.iterations.clamp(1, Self::MAX_ITERATIONS)
    }

    #[must_use]
    pub fn restitution(&self) -> f32 {
        self.restitution.clamp(0.0, 1.0)
    }

    #[must_use]
    pub fn friction(&self) -> f32 {
        self.friction.clamp(0.0, 1.0)
    }
}
