//! # Collision Proxies
//!
//! The body is approximated by spheres and capsules bound to skeleton bones.
//! Once per frame [`CollisionSet::update`] moves the proxies to world space from
//! the current [`BodyPose`]; during a physics step the solver only reads the set
//! through [`CollisionSet::query`].

mod broad_phase;
mod capsule;
mod sphere;

pub use broad_phase::Aabb;
pub use capsule::detect_point_capsule;
pub use sphere::detect_point_sphere;

use glam::{Affine3A, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::PhysicsError;
use crate::types::BodyPose;

/// Contact of a particle against a proxy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// Unit normal pointing out of the proxy, toward the particle.
    pub normal: Vec3,
    /// Penetration depth; always > 0 for a reported contact.
    pub depth: f32,
}

/// Proxy shape in the local space of its bone.
///
/// Bone transforms are assumed rigid: radii are not scaled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum CollisionProxy {
    Sphere {
        bone: usize,
        center: Vec3,
        radius: f32,
    },
    Capsule {
        bone: usize,
        a: Vec3,
        b: Vec3,
        radius: f32,
    },
}

impl CollisionProxy {
    #[must_use]
    pub fn bone(&self) -> usize {
        match *self {
            Self::Sphere { bone, .. } | Self::Capsule { bone, .. } => bone,
        }
    }

    fn to_world(self, frame: &Affine3A) -> WorldShape {
        match self {
            Self::Sphere { center, radius, .. } => WorldShape::Sphere {
                center: frame.transform_point3(center),
                radius,
            },
            Self::Capsule { a, b, radius, .. } => WorldShape::Capsule {
                a: frame.transform_point3(a),
                b: frame.transform_point3(b),
                radius,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum WorldShape {
    Sphere { center: Vec3, radius: f32 },
    Capsule { a: Vec3, b: Vec3, radius: f32 },
}

impl WorldShape {
    fn bounds(&self) -> Aabb {
        match *self {
            Self::Sphere { center, radius } => Aabb::around_sphere(center, radius),
            Self::Capsule { a, b, radius } => {
                Aabb::around_sphere(a, radius).union(&Aabb::around_sphere(b, radius))
            }
        }
    }

    fn detect(&self, point: Vec3, point_radius: f32) -> Option<Contact> {
        match *self {
            Self::Sphere { center, radius } => detect_point_sphere(center, radius, point, point_radius),
            Self::Capsule { a, b, radius } => detect_point_capsule(a, b, radius, point, point_radius),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PlacedProxy {
    shape: WorldShape,
    bounds: Aabb,
    active: bool,
}

/// World-space collision proxies driven by the body pose.
#[derive(Debug, Clone, Default)]
pub struct CollisionSet {
    proxies: Vec<CollisionProxy>,
    placed: Vec<PlacedProxy>,
    bones: Vec<Affine3A>,
    posed: bool,
}

impl CollisionSet {
    #[must_use]
    pub fn new(proxies: Vec<CollisionProxy>) -> Self {
        Self {
            proxies,
            placed: Vec::new(),
            bones: Vec::new(),
            posed: false,
        }
    }

    #[must_use]
    pub fn proxies(&self) -> &[CollisionProxy] {
        &self.proxies
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    /// True once [`Self::update`] has run at least once.
    #[must_use]
    pub fn is_posed(&self) -> bool {
        self.posed
    }

    /// Current world transform of `bone`, as of the last update.
    #[must_use]
    pub fn bone(&self, bone: usize) -> Option<&Affine3A> {
        self.bones.get(bone)
    }

    /// Number of proxies placed by the last update.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.placed.iter().filter(|p| p.active).count()
    }

    /// Recompute world-space proxies from `pose`.
    ///
    /// Proxies bound to bones missing from the pose stay inactive until a later
    /// pose provides them; each one is reported as
    /// [`PhysicsError::CollisionProxyMissing`].
    pub fn update(&mut self, pose: &BodyPose) -> Vec<PhysicsError> {
        let mut missing = Vec::new();
        self.bones.clear();
        self.bones.extend_from_slice(pose.bones());
        self.placed.clear();

        for (index, proxy) in self.proxies.iter().enumerate() {
            let placed = if let Some(frame) = pose.bone(proxy.bone()) {
                let shape = proxy.to_world(frame);
                PlacedProxy {
                    bounds: shape.bounds(),
                    shape,
                    active: true,
                }
            } else {
                missing.push(PhysicsError::CollisionProxyMissing {
                    proxy: index,
                    bone: proxy.bone(),
                });
                PlacedProxy {
                    shape: proxy.to_world(&Affine3A::IDENTITY),
                    bounds: Aabb::EMPTY,
                    active: false,
                }
            };
            self.placed.push(placed);
        }

        if !missing.is_empty() {
            tracing::warn!(count = missing.len(), "collision proxies without a bone in the current pose");
        }
        self.posed = true;
        missing
    }

    /// Deepest contact of a sphere of `radius` at `position` against any active
    /// proxy, or `None` if nothing is penetrated.
    #[must_use]
    pub fn query(&self, position: Vec3, radius: f32) -> Option<Contact> {
        let mut deepest: Option<Contact> = None;
        for proxy in self.placed.iter().filter(|p| p.active) {
            if !proxy.bounds.overlaps_sphere(position, radius) {
                continue;
            }
            if let Some(contact) = proxy.shape.detect(position, radius) {
                if deepest.map_or(true, |d| contact.depth > d.depth) {
                    deepest = Some(contact);
                }
            }
        }
        deepest
    }

    /// Signed distance from `position` to the nearest active proxy surface.
    #[must_use]
    pub fn signed_distance(&self, position: Vec3) -> Option<f32> {
        self.placed
            .iter()
            .filter(|p| p.active)
            .map(|p| match p.shape {
                WorldShape::Sphere { center, radius } => position.distance(center) - radius,
                WorldShape::Capsule { a, b, radius } => {
                    capsule::closest_point(a, b, position).distance(position) - radius
                }
            })
            .reduce(f32::min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn head() -> CollisionSet {
        CollisionSet::new(vec![
            CollisionProxy::Sphere {
                bone: 1,
                center: Vec3::ZERO,
                radius: 1.0,
            },
            CollisionProxy::Capsule {
                bone: 0,
                a: Vec3::new(0.0, -3.0, 0.0),
                b: Vec3::new(0.0, -1.0, 0.0),
                radius: 0.5,
            },
        ])
    }

    #[test]
    fn query_before_update_finds_nothing() {
        let set = head();
        assert!(!set.is_posed());
        assert!(set.query(Vec3::ZERO, 0.1).is_none());
    }

    #[test]
    fn proxies_follow_their_bones() {
        let mut set = head();
        let pose = BodyPose::new(vec![
            Affine3A::IDENTITY,
            Affine3A::from_translation(Vec3::new(5.0, 0.0, 0.0)),
        ]);
        assert!(set.update(&pose).is_empty());

        assert!(set.query(Vec3::new(0.0, 0.5, 0.0), 0.0).is_none());
        let contact = set.query(Vec3::new(5.0, 0.9, 0.0), 0.0).unwrap();
        assert!((contact.normal - Vec3::Y).length() < 1e-5);
        assert!((contact.depth - 0.1).abs() < 1e-5);
    }

    #[test]
    fn missing_bone_deactivates_proxy() {
        let mut set = head();
        let errors = set.update(&BodyPose::identity(1));
        assert_eq!(
            errors,
            vec![PhysicsError::CollisionProxyMissing { proxy: 0, bone: 1 }]
        );
        assert_eq!(set.active_count(), 1);
        assert!(set.query(Vec3::new(0.0, 0.5, 0.0), 0.0).is_none());
        assert!(set.query(Vec3::new(0.0, -2.0, 0.2), 0.0).is_some());
    }

    #[test]
    fn query_reports_deepest_contact() {
        let mut set = CollisionSet::new(vec![
            CollisionProxy::Sphere {
                bone: 0,
                center: Vec3::ZERO,
                radius: 1.0,
            },
            CollisionProxy::Sphere {
                bone: 0,
                center: Vec3::new(1.5, 0.0, 0.0),
                radius: 1.0,
            },
        ]);
        set.update(&BodyPose::identity(1));
        let contact = set.query(Vec3::new(0.6, 0.0, 0.0), 0.0).unwrap();
        // 0.4 deep in the first sphere, 0.1 deep in the second.
        assert!((contact.depth - 0.4).abs() < 1e-5);
        assert!((contact.normal - Vec3::X).length() < 1e-5);
    }

    #[test]
    fn signed_distance_is_negative_inside() {
        let mut set = head();
        set.update(&BodyPose::identity(2));
        assert!(set.signed_distance(Vec3::ZERO).unwrap() < 0.0);
        assert!(set.signed_distance(Vec3::new(0.0, 3.0, 0.0)).unwrap() > 0.0);
    }
}
