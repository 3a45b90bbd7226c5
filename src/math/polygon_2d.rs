use super::{Point2, COORD_TOLERANCE, TOLERANCE};

/// Computes the signed area of a closed polygon (shoelace formula).
///
/// Positive for counter-clockwise, negative for clockwise.
#[must_use]
pub fn signed_area(points: &[Point2]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        sum += points[i].x * points[j].y - points[j].x * points[i].y;
    }
    sum * 0.5
}

/// Returns the min/max corners of a point set.
///
/// Empty input yields an inverted box.
#[must_use]
pub fn bounds(points: &[Point2]) -> (Point2, Point2) {
    let mut min = Point2::new(f64::INFINITY, f64::INFINITY);
    let mut max = Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
    for p in points {
        min = Point2::new(min.x.min(p.x), min.y.min(p.y));
        max = Point2::new(max.x.max(p.x), max.y.max(p.y));
    }
    (min, max)
}

/// Computes the area-weighted centroid of a closed polygon.
///
/// Falls back to the vertex average when the polygon has near-zero area.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn centroid(points: &[Point2]) -> Point2 {
    let area = signed_area(points);
    if area.abs() < TOLERANCE {
        let mut cx = 0.0;
        let mut cy = 0.0;
        for p in points {
            cx += p.x;
            cy += p.y;
        }
        let n = points.len().max(1) as f64;
        return Point2::new(cx / n, cy / n);
    }
    let n = points.len();
    let mut cx = 0.0;
    let mut cy = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        let cross = points[i].x * points[j].y - points[j].x * points[i].y;
        cx += (points[i].x + points[j].x) * cross;
        cy += (points[i].y + points[j].y) * cross;
    }
    Point2::new(cx / (6.0 * area), cy / (6.0 * area))
}

/// Tests whether a point lies inside a closed polygon (ray crossing).
///
/// Points exactly on the boundary may report either side; callers use a
/// bounding-box pre-filter and representative interior vertices, so the
/// ambiguity does not matter here.
#[must_use]
pub fn point_in_polygon(p: &Point2, polygon: &[Point2]) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (pi, pj) = (&polygon[i], &polygon[j]);
        if (pi.y > p.y) != (pj.y > p.y) {
            let x_cross = pi.x + (p.y - pi.y) / (pj.y - pi.y) * (pj.x - pi.x);
            if p.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Removes consecutive near-duplicate vertices, including a trailing
/// duplicate of the first vertex.
#[must_use]
pub fn dedup_ring(points: &[Point2]) -> Vec<Point2> {
    let mut out: Vec<Point2> = Vec::with_capacity(points.len());
    for p in points {
        if let Some(last) = out.last() {
            if (p - last).norm() < COORD_TOLERANCE {
                continue;
            }
        }
        out.push(*p);
    }
    while out.len() > 1 {
        let first = out[0];
        let Some(last) = out.last() else { break };
        if (last - first).norm() < COORD_TOLERANCE {
            out.pop();
        } else {
            break;
        }
    }
    out
}
