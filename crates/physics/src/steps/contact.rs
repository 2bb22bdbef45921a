use glam::Vec3;

use super::StrandContext;
use crate::collision::CollisionSet;

/// Push penetrating particles out of the collision proxies.
///
/// Returns `(local particle, last contact normal)` for every particle that was
/// moved. Immovable particles are never moved.
pub(crate) fn collide(
    ctx: &StrandContext<'_>,
    collisions: &CollisionSet,
    positions: &mut [Vec3],
) -> Vec<(usize, Vec3)> {
    let radius = ctx.config.particle_radius;
    let passes = ctx.config.collision_passes.max(1);
    let inv_mass = ctx.inv_mass();
    let mut contacts = Vec::new();

    for (i, position) in positions.iter_mut().enumerate() {
        if inv_mass[i] <= 0.0 {
            continue;
        }
        let mut normal = None;
        for _ in 0..passes {
            let Some(contact) = collisions.query(*position, radius) else {
                break;
            };
            *position += contact.normal * contact.depth;
            normal = Some(contact.normal);
        }
        if let Some(n) = normal {
            contacts.push((i, n));
        }
    }
    contacts
}
