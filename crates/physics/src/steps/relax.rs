//! Gauss-Seidel constraint projection.
//!
//! All constraint kinds go through one loop and one `match`; the order within a
//! strand is the order the topology stored them in, and each sweep sees the
//! positions written by the previous one.

use glam::Vec3;

use super::StrandContext;
use crate::constraint::Constraint;

const MIN_LENGTH: f32 = 1e-7;

/// Stiffness per sweep such that `iterations` sweeps yield `stiffness` overall.
fn per_sweep(stiffness: f32, iterations: u32) -> f32 {
    1.0 - (1.0 - stiffness).powf(1.0 / iterations as f32)
}

pub(crate) fn relax(ctx: &StrandContext<'_>, positions: &mut [Vec3]) {
    let base = ctx.strand.root() as u32;
    let inv_mass = ctx.inv_mass();
    let constraints = ctx.topology.constraints_of(ctx.strand);
    let iterations = ctx.config.iterations();
    let material = ctx.strand.material();
    let stretch = per_sweep(material.stretch_stiffness, iterations);
    let bend = per_sweep(material.bend_stiffness, iterations);

    for _ in 0..iterations {
        for constraint in constraints {
            match *constraint {
                Constraint::Root { particle, offset, .. } => {
                    positions[(particle - base) as usize] = ctx.root_frame.transform_point3(offset);
                }
                Constraint::Distance { a, b, rest } => project_distance(
                    positions,
                    inv_mass,
                    (a - base) as usize,
                    (b - base) as usize,
                    rest,
                    stretch,
                ),
                Constraint::Bend { a, b, c, rest } => project_bend(
                    positions,
                    inv_mass,
                    [(a - base) as usize, (b - base) as usize, (c - base) as usize],
                    rest,
                    bend,
                ),
            }
        }
    }
}

pub(crate) fn project_distance(
    positions: &mut [Vec3],
    inv_mass: &[f32],
    a: usize,
    b: usize,
    rest: f32,
    stiffness: f32,
) {
    let (wa, wb) = (inv_mass[a], inv_mass[b]);
    let w = wa + wb;
    if w <= 0.0 {
        return;
    }
    let delta = positions[b] - positions[a];
    let length = delta.length();
    if length < MIN_LENGTH {
        return;
    }
    let correction = delta * ((length - rest) / (length * w) * stiffness);
    if wa > 0.0 {
        positions[a] += correction * wa;
    }
    if wb > 0.0 {
        positions[b] -= correction * wb;
    }
}

/// Triangle bending: drive `b` toward `rest` distance from the centroid of
/// the three particles.
pub(crate) fn project_bend(
    positions: &mut [Vec3],
    inv_mass: &[f32],
    [a, b, c]: [usize; 3],
    rest: f32,
    stiffness: f32,
) {
    let (wa, wb, wc) = (inv_mass[a], inv_mass[b], inv_mass[c]);
    let w = wa + 2.0 * wb + wc;
    if w <= 0.0 || stiffness <= 0.0 {
        return;
    }
    let centroid = (positions[a] + positions[b] + positions[c]) / 3.0;
    let offset = positions[b] - centroid;
    let distance = offset.length();
    if distance < MIN_LENGTH {
        return;
    }
    let delta = offset * ((1.0 - rest / distance) * stiffness);
    // Immovable particles are skipped outright: a zero weight does not cancel
    // a non-finite correction.
    if wa > 0.0 {
        positions[a] += delta * (2.0 * wa / w);
    }
    if wb > 0.0 {
        positions[b] -= delta * (4.0 * wb / w);
    }
    if wc > 0.0 {
        positions[c] += delta * (2.0 * wc / w);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_projection_restores_rest_length() {
        let mut p = vec![Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0)];
        project_distance(&mut p, &[1.0, 1.0], 0, 1, 1.0, 1.0);
        assert!((p[0].distance(p[1]) - 1.0).abs() < 1e-6);
        assert!((p[0].x - 0.5).abs() < 1e-6);
    }

    #[test]
    fn pinned_end_does_not_move() {
        let mut p = vec![Vec3::ZERO, Vec3::new(0.0, -2.0, 0.0)];
        project_distance(&mut p, &[0.0, 1.0], 0, 1, 1.0, 1.0);
        assert_eq!(p[0], Vec3::ZERO);
        assert!((p[1].y + 1.0).abs() < 1e-6);
    }

    #[test]
    fn non_finite_neighbour_leaves_pinned_particle_alone() {
        let mut p = vec![Vec3::ZERO, Vec3::new(f32::NAN, -1.0, 0.0), Vec3::new(0.0, -2.0, 0.0)];
        project_distance(&mut p, &[0.0, 1.0, 1.0], 0, 1, 1.0, 1.0);
        project_bend(&mut p, &[0.0, 1.0, 1.0], [0, 1, 2], 0.0, 1.0);
        assert_eq!(p[0], Vec3::ZERO);
        assert!(!p[1].is_finite());
    }

    #[test]
    fn bend_straightens_toward_zero_rest() {
        let mut p = vec![Vec3::ZERO, Vec3::new(1.0, 0.5, 0.0), Vec3::new(2.0, 0.0, 0.0)];
        project_bend(&mut p, &[1.0, 1.0, 1.0], [0, 1, 2], 0.0, 1.0);
        let centroid = (p[0] + p[1] + p[2]) / 3.0;
        assert!(p[1].distance(centroid) < 1e-5);
    }

    #[test]
    fn bend_preserves_centroid() {
        let mut p = vec![Vec3::ZERO, Vec3::new(1.0, 0.5, 0.0), Vec3::new(2.0, 0.0, 0.0)];
        let before = (p[0] + p[1] + p[2]) / 3.0;
        project_bend(&mut p, &[1.0, 1.0, 1.0], [0, 1, 2], 0.1, 0.5);
        let after = (p[0] + p[1] + p[2]) / 3.0;
        assert!(before.distance(after) < 1e-6);
    }

    #[test]
    fn per_sweep_stiffness_composes() {
        let k = per_sweep(0.75, 4);
        let overall = 1.0 - (1.0 - k).powi(4);
        assert!((overall - 0.75).abs() < 1e-5);
        assert!((per_sweep(1.0, 8) - 1.0).abs() < f32::EPSILON);
    }
}
