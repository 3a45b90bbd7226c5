//! Cap triangulation: constrained Delaunay over the outer boundary minus
//! hole boundaries, with flood-fill interior classification.

use std::collections::{HashMap, HashSet, VecDeque};

use spade::handles::FixedFaceHandle;
use spade::{
    ConstrainedDelaunayTriangulation, InsertionError, Point2 as SpadePoint2, Triangulation,
};

use crate::math::Point2;

/// Triangulates the region bounded by `rings[0]` minus the interiors of
/// the remaining rings. Returns 2D triangles with counter-clockwise
/// winding.
///
/// # Errors
///
/// Returns a human-readable reason when a constraint loop is unusable or
/// a point cannot be inserted into the triangulation.
pub fn triangulate_rings(rings: &[Vec<Point2>]) -> Result<Vec<[Point2; 3]>, String> {
    let mut cdt = ConstrainedDelaunayTriangulation::<SpadePoint2<f64>>::new();
    for ring in rings {
        insert_constraint_loop(&mut cdt, ring)?;
    }

    let interior_faces = classify_interior_faces(&cdt);

    let mut triangles = Vec::new();
    for face_handle in cdt.inner_faces() {
        if !interior_faces.contains(&face_handle.fix().index()) {
            continue;
        }
        let verts = face_handle.vertices();
        let mut tri = [Point2::origin(); 3];
        for (i, vh) in verts.iter().enumerate() {
            let pos = vh.position();
            tri[i] = Point2::new(pos.x, pos.y);
        }
        // Normalize to CCW so callers can orient caps by flipping once.
        let doubled_area = (tri[1].x - tri[0].x) * (tri[2].y - tri[0].y)
            - (tri[2].x - tri[0].x) * (tri[1].y - tri[0].y);
        if doubled_area < 0.0 {
            tri.swap(1, 2);
        }
        triangles.push(tri);
    }

    Ok(triangles)
}

/// Inserts a closed polygon as constraint edges into the CDT.
fn insert_constraint_loop(
    cdt: &mut ConstrainedDelaunayTriangulation<SpadePoint2<f64>>,
    points: &[Point2],
) -> Result<(), String> {
    if points.len() < 3 {
        return Err("constraint loop needs at least 3 points".into());
    }

    let mut handles = Vec::with_capacity(points.len());
    for pt in points {
        let h = cdt
            .insert(SpadePoint2::new(pt.x, pt.y))
            .map_err(|e: InsertionError| format!("CDT insert: {e}"))?;
        handles.push(h);
    }

    for i in 0..handles.len() {
        let from = handles[i];
        let to = handles[(i + 1) % handles.len()];
        if from == to {
            continue;
        }
        // Crossing constraint edges would make add_constraint panic.
        if !cdt.can_add_constraint(from, to) {
            return Err("boundary is self-intersecting".into());
        }
        cdt.add_constraint(from, to);
    }

    Ok(())
}

/// Classifies which inner faces of the CDT are inside the region using
/// flood-fill. Starts from faces adjacent to the outer (infinite) face at
/// depth 0; each crossed constraint edge increments the depth. Odd depth
/// means interior.
fn classify_interior_faces(
    cdt: &ConstrainedDelaunayTriangulation<SpadePoint2<f64>>,
) -> HashSet<usize> {
    let mut interior = HashSet::new();
    let mut depth_map: HashMap<usize, u32> = HashMap::new();
    let mut queue: VecDeque<(FixedFaceHandle<spade::handles::InnerTag>, u32)> = VecDeque::new();

    let outer_fix = cdt.outer_face().fix();

    for edge in cdt.directed_edges() {
        if edge.face().fix() == outer_fix {
            let rev_face = edge.rev().face();
            if let Some(inner) = rev_face.as_inner() {
                let idx = inner.fix().index();
                if depth_map.contains_key(&idx) {
                    continue;
                }
                let depth = u32::from(cdt.is_constraint_edge(edge.as_undirected().fix()));
                depth_map.insert(idx, depth);
                if depth % 2 == 1 {
                    interior.insert(idx);
                }
                queue.push_back((inner.fix(), depth));
            }
        }
    }

    while let Some((face_fix, depth)) = queue.pop_front() {
        let face = cdt.face(face_fix);
        for edge in face.adjacent_edges() {
            let neighbor = edge.rev().face();
            if let Some(inner_neighbor) = neighbor.as_inner() {
                let n_idx = inner_neighbor.fix().index();
                if depth_map.contains_key(&n_idx) {
                    continue;
                }
                let new_depth = if cdt.is_constraint_edge(edge.as_undirected().fix()) {
                    depth + 1
                } else {
                    depth
                };
                depth_map.insert(n_idx, new_depth);
                if new_depth % 2 == 1 {
                    interior.insert(n_idx);
                }
                queue.push_back((inner_neighbor.fix(), new_depth));
            }
        }
    }

    interior
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn square(x0: f64, y0: f64, size: f64) -> Vec<Point2> {
        vec![
            Point2::new(x0, y0),
            Point2::new(x0 + size, y0),
            Point2::new(x0 + size, y0 + size),
            Point2::new(x0, y0 + size),
        ]
    }

    fn area_of(triangles: &[[Point2; 3]]) -> f64 {
        triangles
            .iter()
            .map(|t| {
                0.5 * ((t[1].x - t[0].x) * (t[2].y - t[0].y)
                    - (t[2].x - t[0].x) * (t[1].y - t[0].y))
            })
            .sum()
    }

    #[test]
    fn square_produces_two_triangles() {
        let tris = triangulate_rings(&[square(0.0, 0.0, 4.0)]).unwrap();
        assert_eq!(tris.len(), 2);
        assert!((area_of(&tris) - 16.0).abs() < 1e-9);
    }

    #[test]
    fn concave_l_shape_triangulates() {
        let l = vec![
            Point2::new(0.0, 0.0),
            Point2::new(4.0, 0.0),
            Point2::new(4.0, 2.0),
            Point2::new(2.0, 2.0),
            Point2::new(2.0, 4.0),
            Point2::new(0.0, 4.0),
        ];
        let tris = triangulate_rings(&[l]).unwrap();
        assert_eq!(tris.len(), 4);
        assert!((area_of(&tris) - 12.0).abs() < 1e-9);
    }

    #[test]
    fn hole_interior_is_excluded() {
        let tris =
            triangulate_rings(&[square(0.0, 0.0, 10.0), square(3.0, 3.0, 4.0)]).unwrap();
        assert!((area_of(&tris) - (100.0 - 16.0)).abs() < 1e-9);
        for t in &tris {
            let cx = (t[0].x + t[1].x + t[2].x) / 3.0;
            let cy = (t[0].y + t[1].y + t[2].y) / 3.0;
            let in_hole = cx > 3.0 && cx < 7.0 && cy > 3.0 && cy < 7.0;
            assert!(!in_hole, "triangle centroid ({cx}, {cy}) is inside the hole");
        }
    }

    #[test]
    fn all_triangles_wind_ccw() {
        let tris =
            triangulate_rings(&[square(0.0, 0.0, 10.0), square(2.0, 2.0, 2.0)]).unwrap();
        for t in &tris {
            let doubled = (t[1].x - t[0].x) * (t[2].y - t[0].y)
                - (t[2].x - t[0].x) * (t[1].y - t[0].y);
            assert!(doubled > 0.0);
        }
    }

    #[test]
    fn too_few_points_is_an_error() {
        assert!(triangulate_rings(&[vec![Point2::new(0.0, 0.0)]]).is_err());
    }

    #[test]
    fn self_intersecting_boundary_is_an_error() {
        // Asymmetric bowtie: nonzero signed area, but two edges cross.
        let bowtie = vec![
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 10.0),
            Point2::new(10.0, 0.0),
            Point2::new(0.0, 20.0),
        ];
        assert!(triangulate_rings(&[bowtie]).is_err());
    }

    #[test]
    fn crossing_hole_is_an_error() {
        // The hole's edges cross the outer boundary's edges.
        let tris = triangulate_rings(&[square(0.0, 0.0, 10.0), square(5.0, 5.0, 10.0)]);
        assert!(tris.is_err());
    }
}
