//! Binary glTF (GLB) writer.
//!
//! Produces a self-contained `.glb`: one scene, one node, one mesh with
//! a primitive per shape group, and a single PBR material. Positions and
//! normals are written as 32-bit floats, indices as 32-bit integers, so
//! no attribute needs requantization on import.

use serde_json::json;

use crate::engine::GeometryResult;
use crate::error::{ExportError, Result};
use crate::render::MaterialParams;

const GLB_MAGIC: u32 = 0x4654_6C67; // "glTF"
const GLB_VERSION: u32 = 2;
const CHUNK_JSON: u32 = 0x4E4F_534A; // "JSON"
const CHUNK_BIN: u32 = 0x004E_4942; // "BIN\0"

const COMPONENT_F32: u32 = 5126;
const COMPONENT_U32: u32 = 5125;
const TARGET_ARRAY_BUFFER: u32 = 34962;
const TARGET_ELEMENT_ARRAY_BUFFER: u32 = 34963;

/// Serializes geometry and material into a GLB byte stream.
///
/// # Errors
///
/// Returns [`ExportError::EmptyGeometry`] when there is nothing to
/// export, and JSON serialization errors from the document build.
#[allow(clippy::cast_possible_truncation)]
pub fn export_glb(geometry: &GeometryResult, material: &MaterialParams) -> Result<Vec<u8>> {
    if geometry.vertices.is_empty() || geometry.indices.is_empty() {
        return Err(ExportError::EmptyGeometry.into());
    }

    let vertex_count = geometry.vertices.len();
    let mut bin = Vec::with_capacity(vertex_count * 24 + geometry.indices.len() * 12);

    let mut min = [f32::INFINITY; 3];
    let mut max = [f32::NEG_INFINITY; 3];
    for v in &geometry.vertices {
        for (axis, value) in [v.x, v.y, v.z].into_iter().enumerate() {
            let value = value as f32;
            min[axis] = min[axis].min(value);
            max[axis] = max[axis].max(value);
            bin.extend_from_slice(&value.to_le_bytes());
        }
    }
    let positions_len = bin.len();

    for n in &geometry.normals {
        for value in [n.x, n.y, n.z] {
            bin.extend_from_slice(&(value as f32).to_le_bytes());
        }
    }
    let normals_len = bin.len() - positions_len;

    for tri in &geometry.indices {
        for index in tri {
            bin.extend_from_slice(&index.to_le_bytes());
        }
    }
    let indices_len = bin.len() - positions_len - normals_len;

    let mut accessors = vec![
        json!({
            "bufferView": 0,
            "componentType": COMPONENT_F32,
            "count": vertex_count,
            "type": "VEC3",
            "min": min,
            "max": max,
        }),
        json!({
            "bufferView": 1,
            "componentType": COMPONENT_F32,
            "count": vertex_count,
            "type": "VEC3",
        }),
    ];
    let mut primitives = Vec::with_capacity(geometry.groups.len());
    for (slot, range) in geometry.groups.iter().enumerate() {
        accessors.push(json!({
            "bufferView": 2,
            "byteOffset": range.start_triangle * 12,
            "componentType": COMPONENT_U32,
            "count": range.triangle_count * 3,
            "type": "SCALAR",
        }));
        primitives.push(json!({
            "attributes": { "POSITION": 0, "NORMAL": 1 },
            "indices": 2 + slot,
            "material": 0,
        }));
    }

    let color = material.effective_color();
    let document = json!({
        "asset": { "version": "2.0", "generator": "relievo" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [{ "mesh": 0 }],
        "meshes": [{ "primitives": primitives }],
        "materials": [{
            "pbrMetallicRoughness": {
                "baseColorFactor": [color.r, color.g, color.b, 1.0],
                "metallicFactor": material.metalness,
                "roughnessFactor": material.roughness,
            },
        }],
        "buffers": [{ "byteLength": bin.len() }],
        "bufferViews": [
            {
                "buffer": 0,
                "byteOffset": 0,
                "byteLength": positions_len,
                "target": TARGET_ARRAY_BUFFER,
            },
            {
                "buffer": 0,
                "byteOffset": positions_len,
                "byteLength": normals_len,
                "target": TARGET_ARRAY_BUFFER,
            },
            {
                "buffer": 0,
                "byteOffset": positions_len + normals_len,
                "byteLength": indices_len,
                "target": TARGET_ELEMENT_ARRAY_BUFFER,
            },
        ],
        "accessors": accessors,
    });

    let mut json_chunk = serde_json::to_vec(&document).map_err(ExportError::Json)?;
    pad_to_4(&mut json_chunk, b' ');
    pad_to_4(&mut bin, 0);

    let total = 12 + 8 + json_chunk.len() + 8 + bin.len();
    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(&GLB_MAGIC.to_le_bytes());
    out.extend_from_slice(&GLB_VERSION.to_le_bytes());
    out.extend_from_slice(&(total as u32).to_le_bytes());
    out.extend_from_slice(&(json_chunk.len() as u32).to_le_bytes());
    out.extend_from_slice(&CHUNK_JSON.to_le_bytes());
    out.extend_from_slice(&json_chunk);
    out.extend_from_slice(&(bin.len() as u32).to_le_bytes());
    out.extend_from_slice(&CHUNK_BIN.to_le_bytes());
    out.extend_from_slice(&bin);
    Ok(out)
}

fn pad_to_4(bytes: &mut Vec<u8>, filler: u8) {
    while bytes.len() % 4 != 0 {
        bytes.push(filler);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::{BevelConfig, ExtrusionConfig};
    use crate::engine::{Engine, ExtrusionEngine};
    use crate::error::RelievoError;
    use crate::math::{Aabb, Point3};
    use crate::svg::VectorDocument;
    use serde_json::Value;

    fn generate(text: &str, spread: f64) -> GeometryResult {
        ExtrusionEngine::default()
            .generate(
                &VectorDocument::new(text, "test.svg"),
                &ExtrusionConfig {
                    bevel: BevelConfig::disabled(),
                    spread,
                    ..ExtrusionConfig::default()
                },
            )
            .unwrap()
    }

    fn u32_at(bytes: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap())
    }

    fn json_chunk(bytes: &[u8]) -> Value {
        let json_len = u32_at(bytes, 12) as usize;
        assert_eq!(u32_at(bytes, 16), CHUNK_JSON);
        serde_json::from_slice(&bytes[20..20 + json_len]).unwrap()
    }

    const SQUARE: &str = r#"<path d="M0 0 L10 0 L10 10 L0 10 Z"/>"#;

    #[test]
    fn header_and_chunk_layout() {
        let glb = export_glb(&generate(SQUARE, 0.0), &MaterialParams::default()).unwrap();

        assert_eq!(u32_at(&glb, 0), GLB_MAGIC);
        assert_eq!(u32_at(&glb, 4), GLB_VERSION);
        assert_eq!(u32_at(&glb, 8) as usize, glb.len());

        let json_len = u32_at(&glb, 12) as usize;
        assert_eq!(json_len % 4, 0);
        let bin_offset = 20 + json_len;
        let bin_len = u32_at(&glb, bin_offset) as usize;
        assert_eq!(bin_len % 4, 0);
        assert_eq!(u32_at(&glb, bin_offset + 4), CHUNK_BIN);
        assert_eq!(bin_offset + 8 + bin_len, glb.len());
    }

    #[test]
    fn document_structure_parses_back() {
        let geometry = generate(SQUARE, 0.0);
        let glb = export_glb(&geometry, &MaterialParams::default()).unwrap();
        let doc = json_chunk(&glb);

        assert_eq!(doc["asset"]["version"], "2.0");
        assert_eq!(doc["meshes"][0]["primitives"].as_array().unwrap().len(), 1);
        assert_eq!(
            doc["accessors"][0]["count"].as_u64().unwrap() as usize,
            geometry.vertices.len()
        );
        assert_eq!(
            doc["accessors"][2]["count"].as_u64().unwrap() as usize,
            geometry.indices.len() * 3
        );
    }

    #[test]
    fn position_bounds_match_the_geometry() {
        let geometry = generate(SQUARE, 0.0);
        let glb = export_glb(&geometry, &MaterialParams::default()).unwrap();
        let doc = json_chunk(&glb);

        let min = doc["accessors"][0]["min"].as_array().unwrap();
        let max = doc["accessors"][0]["max"].as_array().unwrap();
        assert!((min[0].as_f64().unwrap() - geometry.aabb.min.x).abs() < 1e-5);
        assert!((max[2].as_f64().unwrap() - geometry.aabb.max.z).abs() < 1e-5);
    }

    #[test]
    fn spread_groups_become_separate_primitives() {
        let geometry = generate(
            r#"<rect width="4" height="4"/><rect x="10" width="4" height="4"/>"#,
            2.0,
        );
        assert_eq!(geometry.groups.len(), 2);
        let glb = export_glb(&geometry, &MaterialParams::default()).unwrap();
        let doc = json_chunk(&glb);

        let primitives = doc["meshes"][0]["primitives"].as_array().unwrap();
        assert_eq!(primitives.len(), 2);
        assert_ne!(primitives[0]["indices"], primitives[1]["indices"]);
        // Second group's index accessor starts where the first ended.
        let offset = doc["accessors"][3]["byteOffset"].as_u64().unwrap() as usize;
        assert_eq!(offset, geometry.groups[1].start_triangle * 12);
    }

    #[test]
    fn custom_color_lands_in_the_material() {
        use crate::render::Color;
        let material = MaterialParams {
            use_custom_color: true,
            custom_color: Color::from_hex("#ff0000").unwrap(),
            ..MaterialParams::default()
        };
        let glb = export_glb(&generate(SQUARE, 0.0), &material).unwrap();
        let doc = json_chunk(&glb);
        let base = doc["materials"][0]["pbrMetallicRoughness"]["baseColorFactor"]
            .as_array()
            .unwrap();
        assert!((base[0].as_f64().unwrap() - 1.0).abs() < 1e-6);
        assert!(base[1].as_f64().unwrap().abs() < 1e-6);
    }

    #[test]
    fn empty_geometry_is_an_error() {
        let empty = GeometryResult {
            vertices: Vec::new(),
            normals: Vec::new(),
            indices: Vec::new(),
            groups: Vec::new(),
            aabb: Aabb::from_points(&[Point3::origin()]),
            hollow: false,
        };
        let err = export_glb(&empty, &MaterialParams::default()).unwrap_err();
        assert!(matches!(
            err,
            RelievoError::Export(ExportError::EmptyGeometry)
        ));
    }
}
