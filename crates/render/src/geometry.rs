//! # Strand Geometry
//!
//! Turns a [`StateSnapshot`] into the vertex and index buffers the devices
//! draw. Each particle contributes two vertices; consecutive pairs form the
//! two triangles of a ribbon segment. The ribbon is widened toward the camera
//! in the vertex stage, see [`ribbon_offset`].

use glam::Vec3;
use hair_physics::StateSnapshot;

use crate::error::RenderError;
use crate::gpu_types::StrandVertex;

/// Outcome of fitting a snapshot into the geometry capacity.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GeometryReport {
    /// Segments the full snapshot would need.
    pub requested_segments: usize,
    /// Segments the buffer holds.
    pub capacity: usize,
    /// Strand indices dropped to fit, farthest first.
    pub culled_strands: Vec<usize>,
}

impl GeometryReport {
    /// The overflow, if strands had to be culled.
    #[must_use]
    pub fn overflow(&self) -> Option<RenderError> {
        (self.requested_segments > self.capacity).then(|| RenderError::GeometryOverflow {
            requested: self.requested_segments,
            capacity: self.capacity,
        })
    }
}

/// CPU-side geometry of one frame.
#[derive(Clone, Debug, Default)]
pub struct StrandGeometryBuffer {
    pub vertices: Vec<StrandVertex>,
    pub indices: Vec<u32>,
    /// Simulation step the geometry was built from.
    pub step: u64,
    pub strand_count: usize,
    pub segment_count: usize,
    /// Axis-aligned bounds of all drawn particles.
    pub bounds: (Vec3, Vec3),
    pub report: GeometryReport,
}

impl StrandGeometryBuffer {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Center and radius of a sphere enclosing the bounds.
    #[must_use]
    pub fn bounding_sphere(&self) -> (Vec3, f32) {
        let (min, max) = self.bounds;
        if self.vertices.is_empty() {
            return (Vec3::ZERO, 1.0);
        }
        let center = (min + max) * 0.5;
        (center, (max - min).length() * 0.5)
    }

    /// Iterate segments as pairs of vertices on the `side = -1` edge.
    pub fn segments(&self) -> impl Iterator<Item = (&StrandVertex, &StrandVertex)> + '_ {
        self.indices
            .chunks_exact(6)
            .map(move |quad| (&self.vertices[quad[0] as usize], &self.vertices[quad[2] as usize]))
    }
}

/// World-space offset of a ribbon vertex: perpendicular to the strand and to
/// the view direction, scaled by the half width.
#[must_use]
pub fn ribbon_offset(position: Vec3, tangent: Vec3, eye: Vec3, half_width: f32, side: f32) -> Vec3 {
    let to_eye = eye - position;
    let across = tangent.cross(to_eye).try_normalize().unwrap_or_else(|| tangent.any_orthonormal_vector());
    across * half_width * side
}

/// Build ribbon geometry for every strand in `snapshot`.
///
/// When the snapshot has more segments than `capacity`, strands whose roots are
/// farthest from `focus` are dropped until the rest fit.
#[must_use]
pub fn build(snapshot: &StateSnapshot, capacity: usize, focus: Vec3) -> StrandGeometryBuffer {
    let topology = snapshot.topology();
    let requested = topology.segment_count();

    let mut keep = vec![true; topology.strand_count()];
    let mut culled = Vec::new();
    if requested > capacity {
        let mut by_distance: Vec<(usize, f32)> = topology
            .strands()
            .iter()
            .enumerate()
            .map(|(i, s)| (i, snapshot.positions()[s.root()].distance_squared(focus)))
            .collect();
        by_distance.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        let mut segments = requested;
        for (index, _) in by_distance {
            if segments <= capacity {
                break;
            }
            keep[index] = false;
            segments -= topology.strands()[index].len() - 1;
            culled.push(index);
        }
    }

    let mut geometry = StrandGeometryBuffer {
        step: snapshot.step(),
        bounds: (Vec3::splat(f32::INFINITY), Vec3::splat(f32::NEG_INFINITY)),
        report: GeometryReport {
            requested_segments: requested,
            capacity,
            culled_strands: culled,
        },
        ..StrandGeometryBuffer::default()
    };

    for (index, strand) in topology.strands().iter().enumerate() {
        if !keep[index] {
            continue;
        }
        let positions = snapshot.strand_positions(strand);
        push_strand(&mut geometry, index as u32, positions);
    }

    if geometry.vertices.is_empty() {
        geometry.bounds = (Vec3::ZERO, Vec3::ZERO);
    }
    geometry
}

fn push_strand(geometry: &mut StrandGeometryBuffer, strand: u32, positions: &[Vec3]) {
    let count = positions.len();
    if count < 2 {
        return;
    }
    let base = geometry.vertices.len() as u32;
    let last = (count - 1) as f32;
    let mut previous_tangent = Vec3::NEG_Y;

    for (i, &position) in positions.iter().enumerate() {
        let ahead = positions[(i + 1).min(count - 1)];
        let behind = positions[i.saturating_sub(1)];
        let tangent = (ahead - behind).try_normalize().unwrap_or(previous_tangent);
        previous_tangent = tangent;

        for side in [-1.0, 1.0] {
            geometry.vertices.push(StrandVertex {
                position: position.to_array(),
                t: i as f32 / last,
                tangent: tangent.to_array(),
                side,
                strand,
                _pad: [0; 3],
            });
        }
        geometry.bounds.0 = geometry.bounds.0.min(position);
        geometry.bounds.1 = geometry.bounds.1.max(position);
    }

    for segment in 0..(count - 1) as u32 {
        let v = base + segment * 2;
        geometry
            .indices
            .extend_from_slice(&[v, v + 1, v + 2, v + 2, v + 1, v + 3]);
    }
    geometry.strand_count += 1;
    geometry.segment_count += count - 1;
}
