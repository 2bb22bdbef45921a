use thiserror::Error;

/// Recoverable faults raised while stepping the simulation.
///
/// None of these abort a frame. The solver handles them locally and surfaces
/// them through [`crate::StepReport`] so the host can count and log them.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PhysicsError {
    /// A particle position became non-finite or left the configured bound.
    /// The strand has been reset to its rest pose.
    #[error("strand {strand} diverged at particle {particle}; reset to rest pose")]
    NumericalInstability { strand: usize, particle: usize },
    /// A collision proxy could not be placed because its bone is absent from the
    /// body pose. Affected particles are unconstrained by it for the step.
    #[error("collision proxy {proxy} references missing bone {bone}")]
    CollisionProxyMissing { proxy: usize, bone: usize },
    /// The fixed timestep handed to the solver is unusable; the step is abandoned.
    #[error("invalid timestep {0}; expected a finite value > 0")]
    InvalidTimestep(f32),
    /// The state handed to the solver was built for a different topology.
    #[error("simulation state holds {found} particles; topology expects {expected}")]
    StateMismatch { expected: usize, found: usize },
}

/// Structural problems found while building a [`crate::StrandTopology`].
///
/// These are fatal: no valid simulation state can be built from the asset.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TopologyLoadError {
    #[error("topology contains no strands")]
    Empty,
    #[error("strand {strand} has {count} particles; at least 2 are required")]
    TooFewParticles { strand: usize, count: usize },
    #[error("strand {strand} segment {segment} has rest length {length}; expected > 0")]
    NonPositiveRestLength {
        strand: usize,
        segment: usize,
        length: f32,
    },
    #[error("strand {strand} has invalid material coefficient `{name}` = {value}")]
    InvalidMaterial {
        strand: usize,
        name: &'static str,
        value: f32,
    },
    #[error("strand {strand} is rooted on bone {bone}, but the skeleton has {bone_count} bones")]
    UnknownBone {
        strand: usize,
        bone: usize,
        bone_count: usize,
    },
    #[error("topology has {0} particles, more than the u32 index space allows")]
    TooManyParticles(usize),
}
