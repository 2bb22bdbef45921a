use glam::{Affine3A, Vec3};
use serde::{Deserialize, Serialize};

/// Skeleton pose handed over by the animation collaborator.
///
/// Bone `i` maps bone-local coordinates to world space. The physics crate makes
/// no assumption about the animation system beyond this array.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BodyPose {
    bones: Vec<Affine3A>,
}

impl BodyPose {
    #[must_use]
    pub fn new(bones: Vec<Affine3A>) -> Self {
        Self { bones }
    }

    /// A pose with `bone_count` identity transforms.
    #[must_use]
    pub fn identity(bone_count: usize) -> Self {
        Self {
            bones: vec![Affine3A::IDENTITY; bone_count],
        }
    }

    #[must_use]
    pub fn bone(&self, index: usize) -> Option<&Affine3A> {
        self.bones.get(index)
    }

    pub fn set_bone(&mut self, index: usize, transform: Affine3A) {
        if let Some(bone) = self.bones.get_mut(index) {
            *bone = transform;
        }
    }

    #[must_use]
    pub fn bones(&self) -> &[Affine3A] {
        &self.bones
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bones.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }
}

/// External inputs for one fixed physics step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepInput {
    /// Fixed timestep in seconds.
    pub dt: f32,
    /// Gravity acceleration in world space.
    pub gravity: Vec3,
    /// Wind acceleration bias in world space.
    pub wind: Vec3,
}

impl StepInput {
    #[must_use]
    pub const fn new(dt: f32, gravity: Vec3, wind: Vec3) -> Self {
        Self { dt, gravity, wind }
    }
}

impl Default for StepInput {
    fn default() -> Self {
        Self {
            dt: 1.0 / 60.0,
            gravity: Vec3::new(0.0, -9.8, 0.0),
            wind: Vec3::ZERO,
        }
    }
}
