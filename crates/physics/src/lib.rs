#![deny(clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::must_use_candidate
)]
//! # Hair Strand Physics
//!
//! Position-based dynamics for thousands of hair strands attached to an
//! animated body.
//!
//! This crate owns everything the simulation needs and nothing the renderer
//! does: the strand topology, the double-buffered particle state, body
//! collision proxies and the fixed-step solver. Renderers consume immutable
//! [`StateSnapshot`]s published through a [`SnapshotExchange`].
//!
//! ## Key Components
//!
//! -   **Topology:** [`StrandTopology`] is built once from a [`TopologyAsset`]
//!     and never changes. Every strand is a contiguous run of particles with
//!     its root pinned to a skeleton bone.
//! -   **State:** [`SimulationState`] keeps a committed buffer that readers see
//!     and a working buffer the solver writes into.
//! -   **Collisions:** [`CollisionSet`] places sphere and capsule proxies from
//!     the current [`BodyPose`].
//! -   **Solver:** [`PhysicsSolver::step`] advances the state by one fixed
//!     timestep, either on the calling thread or across a worker pool. Both
//!     modes produce identical results.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use hair_physics::{BodyPose, CollisionSet, PhysicsSolver, ScalpParams,
//!     SimulationState, SolverConfig, StepInput, StrandTopology, TopologyAsset};
//!
//! let topology = Arc::new(StrandTopology::from_asset(&TopologyAsset::scalp(&ScalpParams::default()))?);
//! let pose = BodyPose::identity(1);
//! let mut state = SimulationState::from_rest_pose(&topology, &pose);
//! let mut collisions = CollisionSet::new(Vec::new());
//! collisions.update(&pose);
//!
//! let solver = PhysicsSolver::new(topology.clone(), SolverConfig::default());
//! let report = solver.step(&mut state, &StepInput::default(), &collisions);
//! assert!(report.committed);
//! ```

pub mod collision;
pub mod config;
pub mod constraint;
pub mod error;
pub mod snapshot;
pub mod solver;
pub mod state;
mod steps;
pub mod topology;
pub mod types;

pub use collision::{CollisionProxy, CollisionSet, Contact};
pub use config::{Parallelism, SolverConfig};
pub use constraint::Constraint;
pub use error::{PhysicsError, TopologyLoadError};
pub use snapshot::{SnapshotExchange, StateSnapshot};
pub use solver::{PhysicsSolver, StepReport};
pub use state::{ParticleBuffer, SimulationState};
pub use topology::{ScalpParams, Strand, StrandAsset, StrandMaterial, StrandTopology, TopologyAsset};
pub use types::{BodyPose, StepInput};

pub use glam::{Affine3A, Quat, Vec3};
