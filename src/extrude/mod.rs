//! Extrusion Builder: converts classified 2D contour sets into beveled 3D
//! solids built from front/back caps, side walls, and an optional bevel
//! profile between them.
//!
//! Geometry convention: the source plane is XY, extrusion runs along +Z.
//! The straight side wall spans `z in [0, depth]`; with a bevel enabled
//! the caps sit at `z = depth + thickness` and `z = -thickness`, inset by
//! `size`, so the bevel rounds both edges identically.

mod cap;
mod profile;

pub use profile::smoothstep;

use slotmap::new_key_type;

use crate::classify::ShapeGroup;
use crate::config::ExtrusionConfig;
use crate::error::{GeometryError, Result};
use crate::math::{polygon_2d, Aabb, Point2, Point3, Vector3, TOLERANCE};
use crate::svg::{Contour, Winding};

new_key_type! {
    /// Arena key for one shape group's geometry.
    pub struct GroupKey;
}

/// Smallest usable extrusion depth. Depth is clamped here so near-zero
/// input never produces zero-volume solids or NaN wall normals.
pub const MIN_DEPTH: f64 = 1e-3;

/// Triangle mesh for one extruded shape group.
///
/// Walls and bevel rings duplicate their ring vertices per quad so faces
/// stay flat-shaded; caps share vertices within the cap plane.
#[derive(Debug, Clone, Default)]
pub struct GroupMesh {
    /// Vertex positions.
    pub vertices: Vec<Point3>,
    /// Per-vertex unit normals.
    pub normals: Vec<Vector3>,
    /// Triangle indices (each triple defines a triangle).
    pub indices: Vec<[u32; 3]>,
}

impl GroupMesh {
    /// Bounding box of the mesh.
    #[must_use]
    pub fn aabb(&self) -> Aabb {
        Aabb::from_points(&self.vertices)
    }

    /// Translates every vertex by `offset`. Normals are unaffected.
    pub fn translate(&mut self, offset: &Vector3) {
        for v in &mut self.vertices {
            *v += *offset;
        }
    }

    /// Appends a quad with a single face normal computed from its corners.
    ///
    /// Corners must be given so that `(b - a) x (d - a)` points outward.
    #[allow(clippy::cast_possible_truncation)]
    fn push_quad(&mut self, a: Point3, b: Point3, c: Point3, d: Point3) {
        let normal = (b - a).cross(&(d - a));
        let len = normal.norm();
        if len < TOLERANCE {
            return;
        }
        let normal = normal / len;
        let base = self.vertices.len() as u32;
        self.vertices.extend([a, b, c, d]);
        self.normals.extend([normal; 4]);
        self.indices.push([base, base + 1, base + 2]);
        self.indices.push([base, base + 2, base + 3]);
    }

    /// Appends a planar cap from CCW 2D triangles at height `z`.
    ///
    /// `up` selects the +Z or -Z face; the triangle winding is flipped to
    /// match.
    #[allow(clippy::cast_possible_truncation)]
    fn push_cap(&mut self, triangles: &[[Point2; 3]], z: f64, up: bool) {
        let normal = if up { Vector3::z() } else { -Vector3::z() };
        for tri in triangles {
            let base = self.vertices.len() as u32;
            for p in tri {
                self.vertices.push(Point3::new(p.x, p.y, z));
                self.normals.push(normal);
            }
            if up {
                self.indices.push([base, base + 1, base + 2]);
            } else {
                self.indices.push([base, base + 2, base + 1]);
            }
        }
    }
}

/// Extrudes one shape group into a 3D solid.
pub struct ExtrudeGroup<'a> {
    group: &'a ShapeGroup,
    contours: &'a [Contour],
    config: &'a ExtrusionConfig,
    group_index: usize,
}

impl<'a> ExtrudeGroup<'a> {
    /// Creates a new `ExtrudeGroup` operation.
    #[must_use]
    pub fn new(
        group: &'a ShapeGroup,
        contours: &'a [Contour],
        config: &'a ExtrusionConfig,
        group_index: usize,
    ) -> Self {
        Self {
            group,
            contours,
            config,
            group_index,
        }
    }

    /// Executes the extrusion, returning the group's mesh.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::DegenerateBoundary`] when the outer
    /// boundary has fewer than 3 distinct points or zero signed area, and
    /// [`GeometryError::Triangulation`] when capping fails.
    pub fn execute(&self) -> Result<GroupMesh> {
        let outer = self.boundary_ring(self.group.outer, Winding::CounterClockwise);
        if outer.len() < 3 {
            return Err(GeometryError::DegenerateBoundary {
                group: self.group_index,
                reason: "fewer than 3 distinct points".into(),
            }
            .into());
        }
        if polygon_2d::signed_area(&outer).abs() < TOLERANCE {
            return Err(GeometryError::DegenerateBoundary {
                group: self.group_index,
                reason: "zero signed area".into(),
            }
            .into());
        }

        let mut rings = vec![outer];
        for &hole in &self.group.holes {
            let ring = self.boundary_ring(hole, Winding::Clockwise);
            if ring.len() < 3 || polygon_2d::signed_area(&ring).abs() < TOLERANCE {
                tracing::warn!(
                    group = self.group_index,
                    hole,
                    "skipping degenerate hole boundary"
                );
                continue;
            }
            rings.push(ring);
        }

        let depth = self.config.depth.max(MIN_DEPTH);
        let bevel = self.config.bevel.effective();

        let (cap_rings, z_front, z_back) = match &bevel {
            Some(b) => (
                rings
                    .iter()
                    .map(|ring| inset_ring(ring, b.size))
                    .collect::<Vec<_>>(),
                depth + b.thickness,
                -b.thickness,
            ),
            None => (rings.clone(), depth, 0.0),
        };

        let cap_triangles = cap::triangulate_rings(&cap_rings).map_err(|reason| {
            GeometryError::Triangulation {
                group: self.group_index,
                reason,
            }
        })?;

        let mut mesh = GroupMesh::default();
        mesh.push_cap(&cap_triangles, z_front, true);
        mesh.push_cap(&cap_triangles, z_back, false);

        for ring in &rings {
            push_wall(&mut mesh, ring, 0.0, depth);
        }

        if let Some(b) = &bevel {
            for (ring, cap_ring) in rings.iter().zip(&cap_rings) {
                push_bevel(&mut mesh, ring, cap_ring, depth, b.thickness, b.segments);
            }
        }

        Ok(mesh)
    }

    /// Deduplicated boundary points of a contour, normalized to `winding`.
    fn boundary_ring(&self, contour: usize, winding: Winding) -> Vec<Point2> {
        let mut points = polygon_2d::dedup_ring(&self.contours[contour].points);
        let area = polygon_2d::signed_area(&points);
        let is_ccw = area >= 0.0;
        if (winding == Winding::CounterClockwise) != is_ccw {
            points.reverse();
        }
        points
    }
}

/// Insets a ring into the material by `amount` along per-vertex miter
/// directions. Falls back to the original ring when the inset collapses
/// the boundary (amount larger than the feature size).
fn inset_ring(ring: &[Point2], amount: f64) -> Vec<Point2> {
    if amount.abs() < TOLERANCE {
        return ring.to_vec();
    }
    let dirs = profile::miter_directions(ring);
    let inset: Vec<Point2> = ring
        .iter()
        .zip(&dirs)
        .map(|(p, d)| p + d * amount)
        .collect();

    let original_area = polygon_2d::signed_area(ring);
    let inset_area = polygon_2d::signed_area(&inset);
    if inset_area.abs() < TOLERANCE || inset_area.signum() != original_area.signum() {
        return ring.to_vec();
    }
    inset
}

/// Appends straight wall quads for one boundary ring between two heights.
fn push_wall(mesh: &mut GroupMesh, ring: &[Point2], z_low: f64, z_high: f64) {
    let n = ring.len();
    for i in 0..n {
        let j = (i + 1) % n;
        let (p, q) = (ring[i], ring[j]);
        mesh.push_quad(
            Point3::new(p.x, p.y, z_low),
            Point3::new(q.x, q.y, z_low),
            Point3::new(q.x, q.y, z_high),
            Point3::new(p.x, p.y, z_high),
        );
    }
}

/// Appends front and back bevel quad rings for one boundary.
///
/// `segments` profile levels interpolate the inset toward the cap ring
/// and the elevation toward `thickness`, eased by [`smoothstep`].
#[allow(clippy::cast_precision_loss)]
fn push_bevel(
    mesh: &mut GroupMesh,
    ring: &[Point2],
    cap_ring: &[Point2],
    depth: f64,
    thickness: f64,
    segments: u32,
) {
    // The inset may have fallen back to the original ring; interpolating
    // between the actual rings keeps the profile consistent either way.
    if ring.len() != cap_ring.len() {
        return;
    }
    let n = ring.len();
    let levels = segments + 1;

    let ring_at = |u: f64| -> (Vec<Point2>, f64) {
        let s = smoothstep(u);
        let pts = ring
            .iter()
            .zip(cap_ring)
            .map(|(p, c)| Point2::from(p.coords + (c.coords - p.coords) * s))
            .collect();
        (pts, thickness * s)
    };

    for k in 0..levels {
        let (lower, dz0) = ring_at(f64::from(k) / f64::from(levels));
        let (upper, dz1) = ring_at(f64::from(k + 1) / f64::from(levels));
        for i in 0..n {
            let j = (i + 1) % n;
            // Front: outward + up
            mesh.push_quad(
                Point3::new(lower[i].x, lower[i].y, depth + dz0),
                Point3::new(lower[j].x, lower[j].y, depth + dz0),
                Point3::new(upper[j].x, upper[j].y, depth + dz1),
                Point3::new(upper[i].x, upper[i].y, depth + dz1),
            );
            // Back: outward + down
            mesh.push_quad(
                Point3::new(lower[j].x, lower[j].y, -dz0),
                Point3::new(lower[i].x, lower[i].y, -dz0),
                Point3::new(upper[i].x, upper[i].y, -dz1),
                Point3::new(upper[j].x, upper[j].y, -dz1),
            );
        }
    }
}
