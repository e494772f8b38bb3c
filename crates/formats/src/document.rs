use serde::{Deserialize, Serialize};

use foundation::math::Vec3;
use terrain::{HeightGrid, TerrainMesh};

use crate::file::MeshFileError;

pub const TERRAIN_DOCUMENT_VERSION: &str = "1.0";

/// JSON terrain document: either an explicit triangle mesh or a height grid.
///
/// ```json
/// { "version": "1.0", "kind": "mesh",
///   "vertices": [[0, 0, 0], [1, 0, 0], [0, 0, 1]], "triangles": [[0, 2, 1]] }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TerrainDocument {
    pub version: String,
    #[serde(flatten)]
    pub body: TerrainBody,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TerrainBody {
    Mesh {
        vertices: Vec<[f64; 3]>,
        triangles: Vec<[u32; 3]>,
    },
    Grid {
        cols: usize,
        rows: usize,
        min_x: f64,
        min_z: f64,
        cell_x: f64,
        cell_z: f64,
        /// Row-major samples; `null` marks a hole.
        heights: Vec<Option<f64>>,
    },
}

impl TerrainDocument {
    pub fn mesh(vertices: Vec<[f64; 3]>, triangles: Vec<[u32; 3]>) -> Self {
        Self {
            version: TERRAIN_DOCUMENT_VERSION.to_string(),
            body: TerrainBody::Mesh {
                vertices,
                triangles,
            },
        }
    }

    pub fn from_json_str(payload: &str) -> Result<Self, MeshFileError> {
        let doc: TerrainDocument = serde_json::from_str(payload).map_err(MeshFileError::Parse)?;
        if doc.version != TERRAIN_DOCUMENT_VERSION {
            return Err(MeshFileError::UnsupportedVersion { found: doc.version });
        }
        Ok(doc)
    }

    pub fn into_mesh(self) -> Result<TerrainMesh, MeshFileError> {
        match self.body {
            TerrainBody::Mesh {
                vertices,
                triangles,
            } => {
                let vertices = vertices.into_iter().map(Vec3::from_array).collect();
                TerrainMesh::new(vertices, triangles).map_err(MeshFileError::Mesh)
            }
            TerrainBody::Grid {
                cols,
                rows,
                min_x,
                min_z,
                cell_x,
                cell_z,
                heights,
            } => {
                let heights = heights.into_iter().map(|h| h.unwrap_or(f64::NAN)).collect();
                let grid = HeightGrid::new(cols, rows, min_x, min_z, cell_x, cell_z, heights)
                    .map_err(MeshFileError::Grid)?;
                grid.to_mesh().map_err(MeshFileError::Mesh)
            }
        }
    }
}
