//! Closed set of strand constraints.
//!
//! Every constraint references particles by their index in the topology's
//! particle arena. The set is fixed once the topology is built; only the `rest`
//! targets of distance and bend constraints can be rescaled.

use glam::Vec3;

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Constraint {
    /// Pins `particle` to `offset` expressed in the space of `bone`.
    Root { particle: u32, bone: u32, offset: Vec3 },
    /// Keeps particles `a` and `b` at distance `rest`.
    Distance { a: u32, b: u32, rest: f32 },
    /// Keeps `b` at distance `rest` from the centroid of `a`, `b`, `c`.
    ///
    /// A straight rest shape has `rest == 0`; curled strands carry their rest
    /// curvature in a positive `rest`.
    Bend { a: u32, b: u32, c: u32, rest: f32 },
}

impl Constraint {
    /// Particle indices touched by this constraint.
    #[must_use]
    pub fn particles(&self) -> ([u32; 3], usize) {
        match *self {
            Self::Root { particle, .. } => ([particle, 0, 0], 1),
            Self::Distance { a, b, .. } => ([a, b, 0], 2),
            Self::Bend { a, b, c, .. } => ([a, b, c], 3),
        }
    }

    /// Rest target, if this kind has one.
    #[must_use]
    pub fn rest(&self) -> Option<f32> {
        match *self {
            Self::Root { .. } => None,
            Self::Distance { rest, .. } | Self::Bend { rest, .. } => Some(rest),
        }
    }

    pub(crate) fn set_rest(&mut self, value: f32) {
        match self {
            Self::Root { .. } => {}
            Self::Distance { rest, .. } | Self::Bend { rest, .. } => *rest = value,
        }
    }

    /// Centroid distance used as the bend rest target for three rest positions.
    #[must_use]
    pub fn bend_rest(a: Vec3, b: Vec3, c: Vec3) -> f32 {
        let centroid = (a + b + c) / 3.0;
        b.distance(centroid)
    }
}
