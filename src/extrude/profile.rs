//! Bevel profile helpers: per-vertex miter offsets and the eased
//! interpolation curve between the side wall and the cap.

use crate::math::{Point2, Vector2, TOLERANCE};

/// Miter length clamp, in multiples of the offset amount. Keeps spike
/// artifacts bounded at very acute corners.
const MITER_LIMIT: f64 = 2.0;

/// Ease-in/out curve used across the bevel profile, so the transition
/// from cap to wall is not visibly faceted at low segment counts.
#[must_use]
pub fn smoothstep(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Computes unit-amount offset directions for every ring vertex.
///
/// The direction is the angle bisector pointing to the left of the travel
/// direction, scaled by the miter factor. With outers counter-clockwise
/// and holes clockwise, "left" is always into the material, so one rule
/// insets both boundary kinds.
#[must_use]
pub fn miter_directions(ring: &[Point2]) -> Vec<Vector2> {
    let n = ring.len();
    let mut dirs = Vec::with_capacity(n);
    for i in 0..n {
        let prev = ring[(i + n - 1) % n];
        let curr = ring[i];
        let next = ring[(i + 1) % n];

        let d0 = unit_or_zero(curr - prev);
        let d1 = unit_or_zero(next - curr);
        let n0 = left_normal(d0);
        let n1 = left_normal(d1);

        let bisector = n0 + n1;
        let dir = if bisector.norm() < TOLERANCE {
            // 180 degree turn; fall back to the outgoing edge normal.
            n1
        } else {
            let bn = bisector.normalize();
            // cos of the half-angle between the edge normals
            let denom = bn.dot(&n1).max(1.0 / MITER_LIMIT);
            bn / denom
        };
        dirs.push(dir);
    }
    dirs
}

fn unit_or_zero(v: Vector2) -> Vector2 {
    let len = v.norm();
    if len < TOLERANCE {
        Vector2::zeros()
    } else {
        v / len
    }
}

fn left_normal(d: Vector2) -> Vector2 {
    Vector2::new(-d.y, d.x)
}
