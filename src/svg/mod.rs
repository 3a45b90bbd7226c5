//! Path Normalizer: turns raw vector markup into closed 2D contours.
//!
//! Only the primitives the engine extrudes are recognized (`path`,
//! `circle`, `ellipse`, `rect`); gradients, filters, transforms and text
//! are out of scope. The scan is attribute-level, not a full XML parse.

mod document;
mod path_data;

pub use document::VectorDocument;
pub use path_data::{parse_path_data, SubPath};

use std::f64::consts::TAU;

use crate::error::{ParseError, Result};
use crate::math::{polygon_2d, Point2};

/// Fixed sampling resolutions used when flattening curved primitives.
///
/// Deliberately resolution-based rather than error-driven: output must be
/// deterministic for a given document, and the fidelity only needs to be
/// adequate for bevel generation, not database-exact.
#[derive(Debug, Clone, Copy)]
pub struct SamplingParams {
    /// Line segments per Bézier or arc segment.
    pub curve_segments: usize,
    /// Polygon segments for a full circle or ellipse.
    pub circle_segments: usize,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            curve_segments: 12,
            circle_segments: 32,
        }
    }
}

/// Winding direction of a closed contour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Winding {
    CounterClockwise,
    Clockwise,
}

/// One closed 2D polyline approximating a curve from the source document.
///
/// Contours are derived data: recomputed whenever the document or the
/// sampling resolution changes, never persisted.
#[derive(Debug, Clone)]
pub struct Contour {
    /// Ordered boundary points (no trailing duplicate of the first point).
    pub points: Vec<Point2>,
    /// Index of the source primitive within the document, in scan order.
    pub source: usize,
}

impl Contour {
    /// Signed area of the contour (positive for counter-clockwise).
    #[must_use]
    pub fn signed_area(&self) -> f64 {
        polygon_2d::signed_area(&self.points)
    }

    /// Winding direction, derived from the signed area.
    #[must_use]
    pub fn winding(&self) -> Winding {
        if self.signed_area() >= 0.0 {
            Winding::CounterClockwise
        } else {
            Winding::Clockwise
        }
    }

    /// Min/max corners of the contour.
    #[must_use]
    pub fn bounds(&self) -> (Point2, Point2) {
        polygon_2d::bounds(&self.points)
    }

    /// Area-weighted centroid.
    #[must_use]
    pub fn centroid(&self) -> Point2 {
        polygon_2d::centroid(&self.points)
    }

    /// Tests whether `p` lies inside the contour.
    #[must_use]
    pub fn contains(&self, p: &Point2) -> bool {
        polygon_2d::point_in_polygon(p, &self.points)
    }

    /// Reverses the point order in place if needed to match `winding`.
    pub fn set_winding(&mut self, winding: Winding) {
        if self.winding() != winding {
            self.points.reverse();
        }
    }
}

/// Normalizes a document into closed contours, one per closed sub-path or
/// sampled shape primitive, in document order.
///
/// Open sub-paths (strokes that never return to their start) are dropped;
/// they have no interior to extrude.
///
/// # Errors
///
/// Returns [`ParseError::EmptyDocument`] when no recognizable primitive is
/// present, [`ParseError::NoClosedContours`] when primitives exist but none
/// yields a usable closed contour, and the parser's errors for malformed
/// coordinate data.
pub fn normalize(doc: &VectorDocument, params: &SamplingParams) -> Result<Vec<Contour>> {
    let elements = scan_elements(doc.text());
    if elements.is_empty() {
        return Err(ParseError::EmptyDocument.into());
    }

    let mut contours = Vec::new();
    for (source, element) in elements.iter().enumerate() {
        match element.kind {
            ElementKind::Path => {
                let Some(d) = element.attr("d") else { continue };
                for sub in parse_path_data(d, params)? {
                    if !sub.closed {
                        continue;
                    }
                    push_contour(&mut contours, sub.points, source);
                }
            }
            ElementKind::Circle => {
                let cx = element.length_or("cx", 0.0)?;
                let cy = element.length_or("cy", 0.0)?;
                let r = element.length_or("r", 0.0)?;
                if r > 0.0 {
                    let ring = sample_ellipse(cx, cy, r, r, params.circle_segments);
                    push_contour(&mut contours, ring, source);
                }
            }
            ElementKind::Ellipse => {
                let cx = element.length_or("cx", 0.0)?;
                let cy = element.length_or("cy", 0.0)?;
                let rx = element.length_or("rx", 0.0)?;
                let ry = element.length_or("ry", 0.0)?;
                if rx > 0.0 && ry > 0.0 {
                    let ring = sample_ellipse(cx, cy, rx, ry, params.circle_segments);
                    push_contour(&mut contours, ring, source);
                }
            }
            ElementKind::Rect => {
                let x = element.length_or("x", 0.0)?;
                let y = element.length_or("y", 0.0)?;
                let w = element.length_or("width", 0.0)?;
                let h = element.length_or("height", 0.0)?;
                if w > 0.0 && h > 0.0 {
                    let ring = vec![
                        Point2::new(x, y),
                        Point2::new(x + w, y),
                        Point2::new(x + w, y + h),
                        Point2::new(x, y + h),
                    ];
                    push_contour(&mut contours, ring, source);
                }
            }
        }
    }

    if contours.is_empty() {
        return Err(ParseError::NoClosedContours.into());
    }
    tracing::debug!(contours = contours.len(), "normalized document");
    Ok(contours)
}

fn push_contour(contours: &mut Vec<Contour>, points: Vec<Point2>, source: usize) {
    let points = polygon_2d::dedup_ring(&points);
    if points.len() >= 3 {
        contours.push(Contour { points, source });
    }
}

#[allow(clippy::cast_precision_loss)]
fn sample_ellipse(cx: f64, cy: f64, rx: f64, ry: f64, segments: usize) -> Vec<Point2> {
    let n = segments.max(3);
    (0..n)
        .map(|i| {
            let theta = TAU * i as f64 / n as f64;
            Point2::new(cx + rx * theta.cos(), cy + ry * theta.sin())
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ElementKind {
    Path,
    Circle,
    Ellipse,
    Rect,
}

#[derive(Debug)]
struct RawElement {
    kind: ElementKind,
    attrs: Vec<(String, String)>,
}

impl RawElement {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Reads a numeric attribute, tolerating a `px` suffix, with a default
    /// for absent attributes.
    fn length_or(&self, name: &str, default: f64) -> Result<f64> {
        let Some(raw) = self.attr(name) else {
            return Ok(default);
        };
        let trimmed = raw.trim().trim_end_matches("px").trim();
        trimmed.parse::<f64>().map_err(|_| {
            ParseError::MalformedNumber {
                token: raw.to_string(),
                context: format!("attribute {name:?}"),
            }
            .into()
        })
    }
}

/// Scans the markup for recognized primitive elements in document order.
fn scan_elements(text: &str) -> Vec<RawElement> {
    let bytes = text.as_bytes();
    let mut elements = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let Some(open) = text[pos..].find('<') else { break };
        let start = pos + open + 1;
        let rest = &text[start..];

        let kind = if has_tag(rest, "path") {
            Some((ElementKind::Path, 4))
        } else if has_tag(rest, "circle") {
            Some((ElementKind::Circle, 6))
        } else if has_tag(rest, "ellipse") {
            Some((ElementKind::Ellipse, 7))
        } else if has_tag(rest, "rect") {
            Some((ElementKind::Rect, 4))
        } else {
            None
        };

        let Some((kind, name_len)) = kind else {
            pos = start;
            continue;
        };

        let body_start = start + name_len;
        let body_end = text[body_start..]
            .find('>')
            .map_or(text.len(), |i| body_start + i);
        elements.push(RawElement {
            kind,
            attrs: parse_attributes(&text[body_start..body_end]),
        });
        pos = body_end;
    }

    elements
}

/// `true` if `rest` starts with `name` followed by a non-name character.
fn has_tag(rest: &str, name: &str) -> bool {
    rest.starts_with(name)
        && !rest[name.len()..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '-')
}

/// Parses `name="value"` pairs from an element body. Unquoted or valueless
/// attributes are skipped; this scanner is lenient by design.
fn parse_attributes(body: &str) -> Vec<(String, String)> {
    let mut attrs = Vec::new();
    let bytes = body.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        while i < bytes.len() && !bytes[i].is_ascii_alphabetic() {
            i += 1;
        }
        let name_start = i;
        while i < bytes.len()
            && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'-' || bytes[i] == b':')
        {
            i += 1;
        }
        if name_start == i {
            break;
        }
        let name = &body[name_start..i];

        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() || bytes[i] != b'=' {
            continue;
        }
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() || (bytes[i] != b'"' && bytes[i] != b'\'') {
            continue;
        }
        let quote = bytes[i];
        i += 1;
        let value_start = i;
        while i < bytes.len() && bytes[i] != quote {
            i += 1;
        }
        attrs.push((name.to_string(), body[value_start..i].to_string()));
        i += 1;
    }

    attrs
}
