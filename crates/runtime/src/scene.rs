//! Demo scene: a head sphere on a neck capsule with a scalp of strands.

use glam::{Affine3A, Quat, Vec3};
use hair_physics::{BodyPose, CollisionProxy, ScalpParams, StrandMaterial, TopologyAsset};

pub const HEAD_BONE: usize = 0;
pub const NECK_BONE: usize = 1;

const HEAD_RADIUS: f32 = 0.1;

#[derive(Clone, Debug)]
pub struct DemoScene {
    pub asset: TopologyAsset,
    pub proxies: Vec<CollisionProxy>,
    pub rest_pose: BodyPose,
    head_position: Vec3,
}

impl DemoScene {
    /// Scene with `strand_count` strands of `particles_per_strand` particles.
    #[must_use]
    pub fn new(strand_count: usize, particles_per_strand: usize) -> Self {
        let head_position = Vec3::new(0.0, 1.6, 0.0);
        let asset = TopologyAsset::scalp(&ScalpParams {
            bone: HEAD_BONE,
            center: Vec3::ZERO,
            // Roots sit just outside the skull so the first free particle
            // starts clear of it.
            radius: HEAD_RADIUS + 0.004,
            strand_count,
            particles_per_strand,
            strand_length: 0.3,
            cap_angle: 105.0_f32.to_radians(),
            material: StrandMaterial {
                stretch_stiffness: 1.0,
                bend_stiffness: 0.35,
                damping: 0.02,
            },
        });
        let proxies = vec![
            CollisionProxy::Sphere {
                bone: HEAD_BONE,
                center: Vec3::ZERO,
                radius: HEAD_RADIUS,
            },
            CollisionProxy::Capsule {
                bone: NECK_BONE,
                a: Vec3::new(0.0, -0.06, -0.01),
                b: Vec3::new(0.0, -0.26, -0.01),
                radius: 0.05,
            },
        ];
        let mut rest_pose = BodyPose::identity(2);
        rest_pose.set_bone(HEAD_BONE, Affine3A::from_translation(head_position));
        rest_pose.set_bone(NECK_BONE, Affine3A::from_translation(head_position));

        Self {
            asset,
            proxies,
            rest_pose,
            head_position,
        }
    }

    /// Body pose at `time` seconds: the head turns and tilts, the neck stays.
    #[must_use]
    pub fn sway(&self, time: f32) -> BodyPose {
        let turn = Quat::from_rotation_y(0.5 * (1.3 * time).sin());
        let tilt = Quat::from_rotation_z(0.12 * (0.7 * time).sin());
        let mut pose = self.rest_pose.clone();
        pose.set_bone(
            HEAD_BONE,
            Affine3A::from_rotation_translation(turn * tilt, self.head_position),
        );
        pose
    }
}

impl Default for DemoScene {
    fn default() -> Self {
        Self::new(1024, 12)
    }
}

#[cfg(test)]
mod tests {
    use hair_physics::StrandTopology;

    use super::*;

    #[test]
    fn scene_builds_a_valid_topology() {
        let scene = DemoScene::new(32, 8);
        let topology = StrandTopology::from_asset(&scene.asset).unwrap();
        assert_eq!(topology.strand_count(), 32);
        assert!(topology.validate_bones(scene.rest_pose.len()).is_ok());
        assert!(scene.proxies.iter().all(|p| p.bone() < scene.rest_pose.len()));
    }

    #[test]
    fn sway_starts_at_rest() {
        let scene = DemoScene::new(4, 4);
        let pose = scene.sway(0.0);
        let head = pose.bone(HEAD_BONE).unwrap();
        assert!(head.translation.abs_diff_eq(scene.rest_pose.bone(HEAD_BONE).unwrap().translation, 1e-6));
        assert!(scene.sway(1.0).bone(HEAD_BONE) != scene.rest_pose.bone(HEAD_BONE));
    }
}
