//! # Strand Topology
//!
//! Static description of the hair: which particles form which strand, where
//! each strand is rooted, and the rest shape the constraints are derived from.
//! A [`StrandTopology`] is immutable after it has been built from a
//! [`TopologyAsset`], except for the global length scale.

use std::ops::Range;

use glam::{Affine3A, Vec3};
use serde::{Deserialize, Serialize};

use crate::constraint::Constraint;
use crate::error::TopologyLoadError;

/// Stiffness and damping coefficients of a strand, each in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrandMaterial {
    pub stretch_stiffness: f32,
    pub bend_stiffness: f32,
    /// Fraction of velocity removed per step.
    pub damping: f32,
}

impl Default for StrandMaterial {
    fn default() -> Self {
        Self {
            stretch_stiffness: 1.0,
            bend_stiffness: 0.5,
            damping: 0.05,
        }
    }
}

impl StrandMaterial {
    fn check(&self, strand: usize) -> Result<(), TopologyLoadError> {
        for (name, value) in [
            ("stretch_stiffness", self.stretch_stiffness),
            ("bend_stiffness", self.bend_stiffness),
            ("damping", self.damping),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(TopologyLoadError::InvalidMaterial {
                    strand,
                    name,
                    value,
                });
            }
        }
        Ok(())
    }
}

/// One strand as supplied by the asset collaborator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StrandAsset {
    /// Bone the root particle is attached to.
    pub root_bone: usize,
    /// Rest positions in the root bone's local space, root first.
    pub rest_positions: Vec<[f32; 3]>,
    #[serde(default)]
    pub material: StrandMaterial,
}

/// Asset-side description of the hair, decoded by the asset collaborator.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TopologyAsset {
    pub strands: Vec<StrandAsset>,
}

/// Parameters for [`TopologyAsset::scalp`].
#[derive(Clone, Copy, Debug)]
pub struct ScalpParams {
    pub bone: usize,
    /// Scalp sphere center in bone space.
    pub center: Vec3,
    pub radius: f32,
    pub strand_count: usize,
    pub particles_per_strand: usize,
    pub strand_length: f32,
    /// Half-angle of the covered cap, measured from +Y, in radians.
    pub cap_angle: f32,
    pub material: StrandMaterial,
}

impl Default for ScalpParams {
    fn default() -> Self {
        Self {
            bone: 0,
            center: Vec3::ZERO,
            radius: 0.1,
            strand_count: 256,
            particles_per_strand: 12,
            strand_length: 0.25,
            cap_angle: 100.0_f32.to_radians(),
            material: StrandMaterial::default(),
        }
    }
}

impl TopologyAsset {
    /// Distribute strands over a spherical cap with a golden-angle spiral.
    ///
    /// Strands leave the scalp along the surface normal and droop toward -Y
    /// along their length. The output is deterministic for given parameters.
    #[must_use]
    pub fn scalp(params: &ScalpParams) -> Self {
        const GOLDEN_ANGLE: f32 = 2.399_963_3;

        let count = params.strand_count;
        let particles = params.particles_per_strand.max(2);
        let segment = params.strand_length / (particles - 1) as f32;
        let min_cos = params.cap_angle.cos();

        let strands = (0..count)
            .map(|i| {
                let u = (i as f32 + 0.5) / count as f32;
                let cos_theta = 1.0 - (1.0 - min_cos) * u;
                let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
                let phi = i as f32 * GOLDEN_ANGLE;
                let normal = Vec3::new(sin_theta * phi.cos(), cos_theta, sin_theta * phi.sin());
                let outward = Vec3::new(normal.x, 0.0, normal.z)
                    .try_normalize()
                    .unwrap_or(Vec3::X);

                let mut point = params.center + normal * params.radius;
                let mut rest_positions = Vec::with_capacity(particles);
                rest_positions.push(point.to_array());
                for k in 1..particles {
                    let s = k as f32 / (particles - 1) as f32;
                    let dir = (normal * (1.0 - s) + Vec3::NEG_Y * s + outward * 0.3)
                        .try_normalize()
                        .unwrap_or(normal);
                    point += dir * segment;
                    rest_positions.push(point.to_array());
                }

                StrandAsset {
                    root_bone: params.bone,
                    rest_positions,
                    material: params.material,
                }
            })
            .collect();

        Self { strands }
    }
}

/// A strand in the particle arena.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Strand {
    first: u32,
    count: u32,
    root_bone: u32,
    constraints_start: u32,
    constraints_end: u32,
    length: f32,
    material: StrandMaterial,
}

impl Strand {
    /// Arena indices of this strand's particles, root first.
    #[must_use]
    pub fn particles(&self) -> Range<usize> {
        self.first as usize..(self.first + self.count) as usize
    }

    #[must_use]
    pub fn root(&self) -> usize {
        self.first as usize
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.count as usize
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[must_use]
    pub fn root_bone(&self) -> usize {
        self.root_bone as usize
    }

    /// Sum of rest segment lengths at unit scale.
    #[must_use]
    pub fn rest_length(&self) -> f32 {
        self.length
    }

    #[must_use]
    pub fn material(&self) -> &StrandMaterial {
        &self.material
    }

    pub(crate) fn constraint_range(&self) -> Range<usize> {
        self.constraints_start as usize..self.constraints_end as usize
    }
}

/// Immutable strand layout and constraint set.
#[derive(Clone, Debug)]
pub struct StrandTopology {
    strands: Vec<Strand>,
    rest_local: Vec<Vec3>,
    /// `rest_local` as authored, before length scaling.
    base_local: Vec<Vec3>,
    inv_mass: Vec<f32>,
    constraints: Vec<Constraint>,
    base_rest: Vec<f32>,
    length_scale: f32,
}

impl StrandTopology {
    /// Validate an asset and build the particle arena and constraint set.
    ///
    /// # Errors
    ///
    /// Returns a [`TopologyLoadError`] if the asset is structurally invalid.
    pub fn from_asset(asset: &TopologyAsset) -> Result<Self, TopologyLoadError> {
        if asset.strands.is_empty() {
            return Err(TopologyLoadError::Empty);
        }

        let total: usize = asset.strands.iter().map(|s| s.rest_positions.len()).sum();
        if u32::try_from(total).is_err() {
            return Err(TopologyLoadError::TooManyParticles(total));
        }

        let mut strands = Vec::with_capacity(asset.strands.len());
        let mut rest_local = Vec::with_capacity(total);
        let mut inv_mass = Vec::with_capacity(total);
        let mut constraints = Vec::new();

        for (strand_index, strand) in asset.strands.iter().enumerate() {
            let count = strand.rest_positions.len();
            if count < 2 {
                return Err(TopologyLoadError::TooFewParticles {
                    strand: strand_index,
                    count,
                });
            }
            strand.material.check(strand_index)?;

            let points: Vec<Vec3> = strand.rest_positions.iter().map(|p| Vec3::from(*p)).collect();
            let mut length = 0.0;
            for (segment, pair) in points.windows(2).enumerate() {
                let rest = pair[0].distance(pair[1]);
                if !rest.is_finite() || rest <= 0.0 {
                    return Err(TopologyLoadError::NonPositiveRestLength {
                        strand: strand_index,
                        segment,
                        length: rest,
                    });
                }
                length += rest;
            }

            // Indices fit in u32: checked against `total` above.
            let first = rest_local.len() as u32;
            let root_bone = u32::try_from(strand.root_bone).unwrap_or(u32::MAX);
            let constraints_start = constraints.len() as u32;

            constraints.push(Constraint::Root {
                particle: first,
                bone: root_bone,
                offset: points[0],
            });
            for (k, pair) in points.windows(2).enumerate() {
                let a = first + k as u32;
                constraints.push(Constraint::Distance {
                    a,
                    b: a + 1,
                    rest: pair[0].distance(pair[1]),
                });
            }
            for (k, triple) in points.windows(3).enumerate() {
                let a = first + k as u32;
                constraints.push(Constraint::Bend {
                    a,
                    b: a + 1,
                    c: a + 2,
                    rest: Constraint::bend_rest(triple[0], triple[1], triple[2]),
                });
            }

            inv_mass.push(0.0);
            inv_mass.extend(std::iter::repeat(1.0).take(count - 1));
            rest_local.extend_from_slice(&points);

            strands.push(Strand {
                first,
                count: count as u32,
                root_bone,
                constraints_start,
                constraints_end: constraints.len() as u32,
                length,
                material: strand.material,
            });
        }

        let base_rest = constraints.iter().map(|c| c.rest().unwrap_or(0.0)).collect();

        tracing::debug!(
            strands = strands.len(),
            particles = total,
            constraints = constraints.len(),
            "strand topology built"
        );

        Ok(Self {
            strands,
            base_local: rest_local.clone(),
            rest_local,
            inv_mass,
            constraints,
            base_rest,
            length_scale: 1.0,
        })
    }

    /// Check that every root bone exists in a skeleton of `bone_count` bones.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyLoadError::UnknownBone`] for the first offending strand.
    pub fn validate_bones(&self, bone_count: usize) -> Result<(), TopologyLoadError> {
        for (index, strand) in self.strands.iter().enumerate() {
            if strand.root_bone() >= bone_count {
                return Err(TopologyLoadError::UnknownBone {
                    strand: index,
                    bone: strand.root_bone(),
                    bone_count,
                });
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn strands(&self) -> &[Strand] {
        &self.strands
    }

    #[must_use]
    pub fn strand(&self, index: usize) -> Option<&Strand> {
        self.strands.get(index)
    }

    #[must_use]
    pub fn strand_count(&self) -> usize {
        self.strands.len()
    }

    #[must_use]
    pub fn particle_count(&self) -> usize {
        self.rest_local.len()
    }

    /// Total number of segments (particle pairs) over all strands.
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.rest_local.len() - self.strands.len()
    }

    #[must_use]
    pub fn rest_local(&self) -> &[Vec3] {
        &self.rest_local
    }

    #[must_use]
    pub fn inv_mass(&self) -> &[f32] {
        &self.inv_mass
    }

    #[must_use]
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Constraints of one strand in relaxation order.
    #[must_use]
    pub fn constraints_of(&self, strand: &Strand) -> &[Constraint] {
        &self.constraints[strand.constraint_range()]
    }

    #[must_use]
    pub fn length_scale(&self) -> f32 {
        self.length_scale
    }

    /// Rescale every distance and bend rest target relative to the asset.
    ///
    /// Rest positions are scaled about each strand's root as well, so strands
    /// placed or reset into their rest pose already satisfy the new lengths.
    /// Non-finite or non-positive scales are ignored.
    pub fn set_length_scale(&mut self, scale: f32) {
        if !scale.is_finite() || scale <= 0.0 {
            tracing::warn!(scale, "ignoring invalid strand length scale");
            return;
        }
        self.length_scale = scale;
        for (constraint, base) in self.constraints.iter_mut().zip(&self.base_rest) {
            constraint.set_rest(base * scale);
        }
        for strand in &self.strands {
            let range = strand.particles();
            let root = self.base_local[range.start];
            for (slot, base) in self.rest_local[range.clone()].iter_mut().zip(&self.base_local[range]) {
                *slot = root + (*base - root) * scale;
            }
        }
    }

    /// World-space rest positions of `strand` under the frame of its root bone.
    pub fn rest_pose<'a>(
        &'a self,
        strand: &Strand,
        root_frame: &'a Affine3A,
    ) -> impl Iterator<Item = Vec3> + 'a {
        self.rest_local[strand.particles()]
            .iter()
            .map(move |p| root_frame.transform_point3(*p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn straight_strand(count: usize) -> StrandAsset {
        StrandAsset {
            root_bone: 0,
            rest_positions: (0..count).map(|i| [0.0, -0.1 * i as f32, 0.0]).collect(),
            material: StrandMaterial::default(),
        }
    }

    #[test]
    fn builds_root_distance_and_bend_constraints() {
        let asset = TopologyAsset {
            strands: vec![straight_strand(4), straight_strand(3)],
        };
        let topo = StrandTopology::from_asset(&asset).unwrap();
        assert_eq!(topo.particle_count(), 7);
        assert_eq!(topo.segment_count(), 5);

        let first = topo.strands()[0];
        let cs = topo.constraints_of(&first);
        // 1 root + 3 distance + 2 bend
        assert_eq!(cs.len(), 6);
        assert!(matches!(cs[0], Constraint::Root { particle: 0, .. }));

        let second = topo.strands()[1];
        assert_eq!(second.particles(), 4..7);
        assert_eq!(topo.inv_mass()[4], 0.0);
        assert_eq!(topo.inv_mass()[5], 1.0);
    }

    #[test]
    fn rejects_empty_asset() {
        let err = StrandTopology::from_asset(&TopologyAsset::default()).unwrap_err();
        assert_eq!(err, TopologyLoadError::Empty);
    }

    #[test]
    fn rejects_coincident_particles() {
        let mut strand = straight_strand(3);
        strand.rest_positions[2] = strand.rest_positions[1];
        let err = StrandTopology::from_asset(&TopologyAsset {
            strands: vec![strand],
        })
        .unwrap_err();
        assert!(matches!(
            err,
            TopologyLoadError::NonPositiveRestLength { strand: 0, segment: 1, .. }
        ));
    }

    #[test]
    fn rejects_single_particle_strand() {
        let err = StrandTopology::from_asset(&TopologyAsset {
            strands: vec![straight_strand(1)],
        })
        .unwrap_err();
        assert!(matches!(err, TopologyLoadError::TooFewParticles { .. }));
    }

    #[test]
    fn rejects_out_of_range_material() {
        let mut strand = straight_strand(3);
        strand.material.damping = 1.5;
        let err = StrandTopology::from_asset(&TopologyAsset {
            strands: vec![strand],
        })
        .unwrap_err();
        assert!(matches!(
            err,
            TopologyLoadError::InvalidMaterial { name: "damping", .. }
        ));
    }

    #[test]
    fn unknown_root_bone_is_reported() {
        let mut strand = straight_strand(3);
        strand.root_bone = 3;
        let topo = StrandTopology::from_asset(&TopologyAsset {
            strands: vec![strand],
        })
        .unwrap();
        assert!(topo.validate_bones(4).is_ok());
        assert!(matches!(
            topo.validate_bones(2),
            Err(TopologyLoadError::UnknownBone { bone: 3, .. })
        ));
    }

    #[test]
    fn length_scale_rescales_rest_targets() {
        let topo_asset = TopologyAsset {
            strands: vec![straight_strand(3)],
        };
        let mut topo = StrandTopology::from_asset(&topo_asset).unwrap();
        topo.set_length_scale(2.0);
        let rest = topo.constraints()[1].rest().unwrap();
        assert!((rest - 0.2).abs() < 1e-6);
        topo.set_length_scale(-1.0);
        assert!((topo.length_scale() - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn length_scale_moves_rest_positions_about_the_root() {
        let mut strand = straight_strand(3);
        for p in &mut strand.rest_positions {
            p[0] += 1.0;
        }
        let mut topo = StrandTopology::from_asset(&TopologyAsset {
            strands: vec![strand],
        })
        .unwrap();
        topo.set_length_scale(1.5);
        let rest = topo.rest_local();
        assert_eq!(rest[0], Vec3::new(1.0, 0.0, 0.0));
        assert!(rest[2].abs_diff_eq(Vec3::new(1.0, -0.3, 0.0), 1e-6));
        for pair in rest.windows(2) {
            assert!((pair[0].distance(pair[1]) - 0.15).abs() < 1e-6);
        }

        // Scaling is relative to the asset, not compounded.
        topo.set_length_scale(1.0);
        assert!(topo.rest_local()[2].abs_diff_eq(Vec3::new(1.0, -0.2, 0.0), 1e-6));
    }

    #[test]
    fn scalp_generates_valid_topology() {
        let asset = TopologyAsset::scalp(&ScalpParams {
            strand_count: 32,
            particles_per_strand: 6,
            ..ScalpParams::default()
        });
        assert_eq!(asset.strands.len(), 32);
        let topo = StrandTopology::from_asset(&asset).unwrap();
        assert_eq!(topo.particle_count(), 32 * 6);
        for strand in topo.strands() {
            assert!((strand.rest_length() - 0.25).abs() < 1e-4);
        }
    }
}
