//! Wavefront OBJ subset: `v` positions and `f` faces.
//!
//! Faces with more than three corners are fan-triangulated. Texture/normal
//! references (`1/2/3`, `1//3`) are accepted and ignored, negative indices are
//! resolved relative to the vertices read so far. Every other statement
//! (`vn`, `vt`, `o`, `g`, `usemtl`, ...) is skipped.

use foundation::math::Vec3;
use terrain::TerrainMesh;

use crate::file::MeshFileError;

pub fn parse_obj(payload: &str) -> Result<TerrainMesh, MeshFileError> {
    let mut vertices: Vec<Vec3> = Vec::new();
    let mut triangles: Vec<[u32; 3]> = Vec::new();

    for (line_idx, raw) in payload.lines().enumerate() {
        let line_no = line_idx + 1;
        let line = raw.split('#').next().unwrap_or("").trim();
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("v") => {
                let mut coords = [0.0f64; 3];
                for c in &mut coords {
                    let token = parts
                        .next()
                        .ok_or_else(|| obj_error(line_no, "vertex needs three coordinates"))?;
                    *c = token
                        .parse()
                        .map_err(|_| obj_error(line_no, format!("bad coordinate '{token}'")))?;
                }
                vertices.push(Vec3::from_array(coords));
            }
            Some("f") => {
                let corners = parts
                    .map(|token| resolve_index(token, vertices.len(), line_no))
                    .collect::<Result<Vec<u32>, _>>()?;
                if corners.len() < 3 {
                    return Err(obj_error(line_no, "face needs at least three corners"));
                }
                for i in 1..corners.len() - 1 {
                    triangles.push([corners[0], corners[i], corners[i + 1]]);
                }
            }
            _ => {}
        }
    }

    TerrainMesh::new(vertices, triangles).map_err(MeshFileError::Mesh)
}

fn resolve_index(token: &str, vertex_count: usize, line: usize) -> Result<u32, MeshFileError> {
    let position = token.split('/').next().unwrap_or("");
    let raw: i64 = position
        .parse()
        .map_err(|_| obj_error(line, format!("bad face index '{token}'")))?;
    let resolved = match raw {
        0 => None,
        r if r > 0 => Some(r - 1),
        r => Some(vertex_count as i64 + r),
    };
    match resolved {
        Some(i) if i >= 0 && (i as usize) < vertex_count => Ok(i as u32),
        _ => Err(obj_error(
            line,
            format!("face index {raw} out of range ({vertex_count} vertices)"),
        )),
    }
}

fn obj_error(line: usize, message: impl Into<String>) -> MeshFileError {
    MeshFileError::Obj {
        line,
        message: message.into(),
    }
}
