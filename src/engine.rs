//! Generation pipeline: document in, triangle mesh out.
//!
//! The pipeline is pure with respect to its inputs: the same document and
//! configuration always produce the same geometry, which is what makes
//! debounced regeneration safe to discard and repeat.

use slotmap::SlotMap;

use crate::classify::{detect_hollow, group_contours};
use crate::config::ExtrusionConfig;
use crate::error::Result;
use crate::extrude::{ExtrudeGroup, GroupKey, GroupMesh};
use crate::layout::spread_groups;
use crate::math::{Aabb, Point3, Vector3, TOLERANCE};
use crate::svg::{normalize, SamplingParams, VectorDocument};

/// Contiguous triangle range belonging to one shape group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupRange {
    /// First triangle of the range.
    pub start_triangle: usize,
    /// Number of triangles in the range.
    pub triangle_count: usize,
}

/// Finished geometry for one document.
#[derive(Debug, Clone)]
pub struct GeometryResult {
    /// Vertex positions.
    pub vertices: Vec<Point3>,
    /// Per-vertex unit normals.
    pub normals: Vec<Vector3>,
    /// Triangle indices into `vertices`.
    pub indices: Vec<[u32; 3]>,
    /// Triangle ranges, one per renderable group.
    pub groups: Vec<GroupRange>,
    /// Bounding box of the whole result.
    pub aabb: Aabb,
    /// The hollow decision the geometry was built with.
    pub hollow: bool,
}

impl GeometryResult {
    /// Total number of triangles.
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len()
    }
}

/// A geometry generator. The production implementation is
/// [`ExtrusionEngine`]; tests substitute slower or failing ones to
/// exercise the regeneration controller.
pub trait Engine: Send + Sync {
    /// Generates geometry for a document under a configuration.
    ///
    /// # Errors
    ///
    /// Returns parse errors for unusable documents and geometry errors
    /// for degenerate boundaries.
    fn generate(&self, doc: &VectorDocument, config: &ExtrusionConfig) -> Result<GeometryResult>;
}

/// The production pipeline: normalize, classify, extrude, lay out.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtrusionEngine {
    sampling: SamplingParams,
}

impl ExtrusionEngine {
    /// Creates an engine with explicit sampling resolutions.
    #[must_use]
    pub fn new(sampling: SamplingParams) -> Self {
        Self { sampling }
    }
}

impl Engine for ExtrusionEngine {
    fn generate(&self, doc: &VectorDocument, config: &ExtrusionConfig) -> Result<GeometryResult> {
        let span = tracing::info_span!("generate", file = doc.filename());
        let _guard = span.enter();

        let contours = normalize(doc, &self.sampling)?;
        let hollow = config.hollow.resolve(detect_hollow(doc));
        let groups = group_contours(&contours, hollow);
        tracing::debug!(
            contours = contours.len(),
            groups = groups.len(),
            hollow,
            "classified document"
        );

        let mut meshes: SlotMap<GroupKey, GroupMesh> = SlotMap::with_key();
        let mut order = Vec::with_capacity(groups.len());
        for (index, group) in groups.iter().enumerate() {
            let mesh = ExtrudeGroup::new(group, &contours, config, index).execute()?;
            order.push(meshes.insert(mesh));
        }

        spread_groups(&mut meshes, &order, config.spread);

        Ok(flatten(&meshes, &order, config.spread, hollow))
    }
}

/// Concatenates per-group meshes into one indexed buffer set.
///
/// With spreading active each group keeps its own triangle range so a
/// renderer can pick groups apart; without it the groups form one
/// combined range.
#[allow(clippy::cast_possible_truncation)]
fn flatten(
    meshes: &SlotMap<GroupKey, GroupMesh>,
    order: &[GroupKey],
    spread: f64,
    hollow: bool,
) -> GeometryResult {
    let mut vertices = Vec::new();
    let mut normals = Vec::new();
    let mut indices = Vec::new();
    let mut groups = Vec::with_capacity(order.len());

    for &key in order {
        let mesh = &meshes[key];
        let vertex_base = vertices.len() as u32;
        let start_triangle = indices.len();

        vertices.extend_from_slice(&mesh.vertices);
        normals.extend_from_slice(&mesh.normals);
        indices.extend(
            mesh.indices
                .iter()
                .map(|t| [t[0] + vertex_base, t[1] + vertex_base, t[2] + vertex_base]),
        );

        groups.push(GroupRange {
            start_triangle,
            triangle_count: indices.len() - start_triangle,
        });
    }

    if spread.abs() < TOLERANCE && !groups.is_empty() {
        groups = vec![GroupRange {
            start_triangle: 0,
            triangle_count: indices.len(),
        }];
    }

    let aabb = Aabb::from_points(&vertices);
    GeometryResult {
        vertices,
        normals,
        indices,
        groups,
        aabb,
        hollow,
    }
}
