use glam::Vec3;

use super::{StrandBuffers, StrandContext};

/// Predict unconstrained positions with semi-implicit Euler.
///
/// Immovable particles (inverse mass 0) are placed on their attachment instead.
pub(crate) fn predict(ctx: &StrandContext<'_>, buffers: &mut StrandBuffers<'_>) {
    let dt = ctx.input.dt;
    let acceleration = ctx.input.gravity + ctx.input.wind * ctx.config.wind_response;
    let keep = 1.0 - ctx.strand.material().damping;
    let inv_mass = ctx.inv_mass();
    let rest = ctx.rest_local();

    for (i, position) in buffers.positions.iter_mut().enumerate() {
        if inv_mass[i] <= 0.0 {
            *position = ctx.root_frame.transform_point3(rest[i]);
            continue;
        }
        let velocity = buffers.prev_velocities[i] * keep + acceleration * dt;
        *position = buffers.prev_positions[i] + velocity * dt;
    }
}

/// Finite-difference velocities, then inelastic response for contacts.
///
/// `contacts` holds `(local particle, contact normal)` pairs, one per particle.
pub(crate) fn derive_velocities(
    ctx: &StrandContext<'_>,
    buffers: &mut StrandBuffers<'_>,
    contacts: &[(usize, Vec3)],
) {
    let inv_dt = 1.0 / ctx.input.dt;
    for ((velocity, position), prev) in buffers
        .velocities
        .iter_mut()
        .zip(buffers.positions.iter())
        .zip(buffers.prev_positions)
    {
        *velocity = (*position - *prev) * inv_dt;
    }

    let restitution = ctx.config.restitution();
    let keep_tangent = 1.0 - ctx.config.friction();
    for &(i, normal) in contacts {
        let v = buffers.velocities[i];
        let normal_part = normal * v.dot(normal);
        let tangent_part = v - normal_part;
        buffers.velocities[i] = tangent_part * keep_tangent + normal_part * restitution;
    }
}
