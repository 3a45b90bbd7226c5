//! Topology Classifier: decides whether a document is a solid fill or a
//! boundary-with-holes shape, then groups contours by containment.
//!
//! The hollow decision is a documented heuristic over the raw markup, not
//! a fill-rule evaluation; it is kept bit-for-bit compatible with the
//! behavior downstream consumers already depend on. Geometric containment
//! is only used to decide which contour is a hole of which boundary once
//! "hollow" has been decided.

use crate::math::COORD_TOLERANCE;
use crate::svg::{Contour, VectorDocument};

/// Fill topology of one shape group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeTag {
    /// A single boundary, filled solid.
    Solid,
    /// An outer boundary with real cavities.
    Hollow,
}

/// One outer boundary plus the hole boundaries it claims, extruded as a
/// unit. Indices refer into the normalized contour list.
#[derive(Debug, Clone)]
pub struct ShapeGroup {
    /// Index of the outer boundary contour.
    pub outer: usize,
    /// Indices of hole contours claimed by the outer boundary.
    pub holes: Vec<usize>,
    /// Whether the group carries cavities.
    pub tag: ShapeTag,
}

/// Heuristic hollow detection over the raw markup.
///
/// A document is treated as hollow when it contains an explicit close
/// command AND at least one of {more than one path, a circle, an ellipse,
/// a rect}; or when its text mentions "smile" or "face" (a content
/// override for known icon sets).
#[must_use]
pub fn detect_hollow(doc: &VectorDocument) -> bool {
    let has_closed_path = doc.has_close_command();
    let has_multiple_paths = doc.path_count() > 1;

    let structural = has_closed_path
        && (has_multiple_paths || doc.has_circle() || doc.has_ellipse() || doc.has_rect());

    let lower = doc.text().to_lowercase();
    structural || lower.contains("smile") || lower.contains("face")
}

/// Partitions contours into shape groups.
///
/// When not hollow, every contour becomes its own single-boundary group.
/// When hollow, contours are grouped by spatial containment: a contour
/// nested inside an odd number of other contours is a hole of its
/// innermost container; even nesting depth starts a new outer boundary
/// (an island inside a hole is solid again).
#[must_use]
pub fn group_contours(contours: &[Contour], hollow: bool) -> Vec<ShapeGroup> {
    if !hollow {
        return (0..contours.len())
            .map(|i| ShapeGroup {
                outer: i,
                holes: Vec::new(),
                tag: ShapeTag::Solid,
            })
            .collect();
    }

    let n = contours.len();
    let mut containers: Vec<Vec<usize>> = vec![Vec::new(); n];
    for i in 0..n {
        let probe = contours[i].points[0];
        let (i_min, i_max) = contours[i].bounds();
        for j in 0..n {
            if i == j {
                continue;
            }
            let (j_min, j_max) = contours[j].bounds();
            let bbox_contains = j_min.x <= i_min.x + COORD_TOLERANCE
                && j_min.y <= i_min.y + COORD_TOLERANCE
                && j_max.x >= i_max.x - COORD_TOLERANCE
                && j_max.y >= i_max.y - COORD_TOLERANCE;
            if bbox_contains && contours[j].contains(&probe) {
                containers[i].push(j);
            }
        }
    }

    // Innermost-first: the container with the smallest area claims the hole.
    let immediate = |i: usize| -> Option<usize> {
        containers[i]
            .iter()
            .copied()
            .min_by(|&a, &b| {
                let area_a = contours[a].signed_area().abs();
                let area_b = contours[b].signed_area().abs();
                area_a.total_cmp(&area_b)
            })
    };

    let mut groups: Vec<ShapeGroup> = Vec::new();
    let mut group_of_outer: Vec<Option<usize>> = vec![None; n];

    for i in 0..n {
        if containers[i].len() % 2 == 0 {
            group_of_outer[i] = Some(groups.len());
            groups.push(ShapeGroup {
                outer: i,
                holes: Vec::new(),
                tag: ShapeTag::Solid,
            });
        }
    }
    for i in 0..n {
        if containers[i].len() % 2 == 1 {
            if let Some(owner) = immediate(i).and_then(|c| group_of_outer[c]) {
                groups[owner].holes.push(i);
                groups[owner].tag = ShapeTag::Hollow;
            }
        }
    }

    groups
}
