//! Group Layout: spreads extruded shape groups apart in the source plane.

use slotmap::SlotMap;

use crate::extrude::{GroupKey, GroupMesh};
use crate::math::{Aabb, Vector3, TOLERANCE};

/// Translates each group away from the combined center by `spread` times
/// its offset from that center. Movement stays in the source plane; the
/// extrusion axis is untouched. A factor of zero leaves every group at
/// its source position, and a single group never moves.
pub fn spread_groups(meshes: &mut SlotMap<GroupKey, GroupMesh>, order: &[GroupKey], spread: f64) {
    if spread.abs() < TOLERANCE || order.len() < 2 {
        return;
    }

    let mut combined = Aabb::empty();
    for &key in order {
        combined = combined.union(&meshes[key].aabb());
    }
    if combined.is_empty() {
        return;
    }
    let center = combined.center();

    for &key in order {
        let mesh = &mut meshes[key];
        let group_center = mesh.aabb().center();
        let offset = Vector3::new(
            (group_center.x - center.x) * spread,
            (group_center.y - center.y) * spread,
            0.0,
        );
        mesh.translate(&offset);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::math::Point3;

    fn cube_at(x: f64, y: f64) -> GroupMesh {
        let mut mesh = GroupMesh::default();
        for (dx, dy, dz) in [
            (0.0, 0.0, 0.0),
            (1.0, 0.0, 0.0),
            (1.0, 1.0, 0.0),
            (0.0, 1.0, 1.0),
        ] {
            mesh.vertices.push(Point3::new(x + dx, y + dy, dz));
            mesh.normals.push(Vector3::z());
        }
        mesh
    }

    fn arena_with(groups: Vec<GroupMesh>) -> (SlotMap<GroupKey, GroupMesh>, Vec<GroupKey>) {
        let mut meshes = SlotMap::with_key();
        let order = groups.into_iter().map(|g| meshes.insert(g)).collect();
        (meshes, order)
    }

    #[test]
    fn zero_spread_is_a_no_op() {
        let (mut meshes, order) = arena_with(vec![cube_at(0.0, 0.0), cube_at(5.0, 0.0)]);
        let before: Vec<_> = order.iter().map(|&k| meshes[k].aabb()).collect();
        spread_groups(&mut meshes, &order, 0.0);
        for (key, aabb) in order.iter().zip(&before) {
            assert_eq!(meshes[*key].aabb().min, aabb.min);
        }
    }

    #[test]
    fn single_group_never_moves() {
        let (mut meshes, order) = arena_with(vec![cube_at(3.0, 3.0)]);
        let before = meshes[order[0]].aabb();
        spread_groups(&mut meshes, &order, 4.0);
        assert_eq!(meshes[order[0]].aabb().min, before.min);
    }

    #[test]
    fn spread_pushes_groups_apart() {
        let (mut meshes, order) = arena_with(vec![cube_at(0.0, 0.0), cube_at(4.0, 0.0)]);
        let gap_before = meshes[order[1]].aabb().min.x - meshes[order[0]].aabb().max.x;
        spread_groups(&mut meshes, &order, 2.0);
        let gap_after = meshes[order[1]].aabb().min.x - meshes[order[0]].aabb().max.x;
        assert!(gap_after > gap_before);
    }

    #[test]
    fn spread_grows_the_combined_footprint() {
        let (mut meshes, order) = arena_with(vec![
            cube_at(0.0, 0.0),
            cube_at(4.0, 0.0),
            cube_at(0.0, 4.0),
        ]);
        let area = |m: &SlotMap<GroupKey, GroupMesh>| {
            let mut combined = Aabb::empty();
            for &k in &order {
                combined = combined.union(&m[k].aabb());
            }
            combined.footprint_area()
        };
        let before = area(&meshes);
        spread_groups(&mut meshes, &order, 1.5);
        assert!(area(&meshes) > before);
    }

    #[test]
    fn z_extent_is_preserved() {
        let (mut meshes, order) = arena_with(vec![cube_at(0.0, 0.0), cube_at(9.0, 9.0)]);
        let z_before: Vec<_> = order
            .iter()
            .map(|&k| (meshes[k].aabb().min.z, meshes[k].aabb().max.z))
            .collect();
        spread_groups(&mut meshes, &order, 3.0);
        for (&key, &(lo, hi)) in order.iter().zip(&z_before) {
            let aabb = meshes[key].aabb();
            assert!((aabb.min.z - lo).abs() < 1e-12);
            assert!((aabb.max.z - hi).abs() < 1e-12);
        }
    }
}
