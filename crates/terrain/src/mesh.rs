use std::fmt;

use foundation::bounds::{Aabb3, ModelBounds};
use foundation::math::Vec3;

use crate::spatial::{Bvh, Item as BvhItem};

/// Indexed triangle mesh for a loaded terrain model, in model space.
///
/// The bounding box and BVH are computed once at construction and never
/// change; reloading terrain means building a new mesh.
#[derive(Debug, Clone)]
pub struct TerrainMesh {
    vertices: Vec<Vec3>,
    triangles: Vec<[u32; 3]>,
    aabb: Aabb3,
    bvh: Bvh,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MeshError {
    /// No triangles (or no vertices) were supplied.
    Empty,
    IndexOutOfRange {
        triangle: usize,
        index: u32,
        vertex_count: usize,
    },
    NonFiniteVertex {
        index: usize,
    },
}

impl fmt::Display for MeshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeshError::Empty => write!(f, "terrain mesh has no triangles"),
            MeshError::IndexOutOfRange {
                triangle,
                index,
                vertex_count,
            } => write!(
                f,
                "triangle {triangle} references vertex {index} but mesh has {vertex_count} vertices"
            ),
            MeshError::NonFiniteVertex { index } => {
                write!(f, "vertex {index} has a non-finite coordinate")
            }
        }
    }
}

impl std::error::Error for MeshError {}

impl TerrainMesh {
    pub fn new(vertices: Vec<Vec3>, triangles: Vec<[u32; 3]>) -> Result<Self, MeshError> {
        if triangles.is_empty() || vertices.is_empty() {
            return Err(MeshError::Empty);
        }
        if let Some(index) = vertices.iter().position(|v| !v.is_finite()) {
            return Err(MeshError::NonFiniteVertex { index });
        }
        for (triangle, tri) in triangles.iter().enumerate() {
            for &index in tri {
                if index as usize >= vertices.len() {
                    return Err(MeshError::IndexOutOfRange {
                        triangle,
                        index,
                        vertex_count: vertices.len(),
                    });
                }
            }
        }

        // Bounds cover referenced and unreferenced vertices alike, matching a
        // box computed from the whole loaded object.
        let aabb = Aabb3::from_points(vertices.iter().copied()).ok_or(MeshError::Empty)?;

        let items = triangles
            .iter()
            .enumerate()
            .map(|(i, tri)| {
                let [a, b, c] = tri.map(|v| vertices[v as usize]);
                BvhItem {
                    triangle: i as u32,
                    bounds: Aabb3::new(a.as_array(), a.as_array()).expand(b).expand(c),
                }
            })
            .collect();
        let bvh = Bvh::build(items);

        Ok(Self {
            vertices,
            triangles,
            aabb,
            bvh,
        })
    }

    /// Two-triangle horizontal quad at height `y`.
    pub fn flat(min_x: f64, max_x: f64, min_z: f64, max_z: f64, y: f64) -> Result<Self, MeshError> {
        let vertices = vec![
            Vec3::new(min_x, y, min_z),
            Vec3::new(max_x, y, min_z),
            Vec3::new(max_x, y, max_z),
            Vec3::new(min_x, y, max_z),
        ];
        Self::new(vertices, vec![[0, 2, 1], [0, 3, 2]])
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    pub fn triangles(&self) -> &[[u32; 3]] {
        &self.triangles
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Corner positions of triangle `index`.
    pub fn triangle(&self, index: u32) -> Option<[Vec3; 3]> {
        let tri = self.triangles.get(index as usize)?;
        Some(tri.map(|v| self.vertices[v as usize]))
    }

    pub fn aabb(&self) -> &Aabb3 {
        &self.aabb
    }

    pub fn bounds(&self) -> ModelBounds {
        ModelBounds::from_aabb(&self.aabb)
    }

    pub(crate) fn bvh(&self) -> &Bvh {
        &self.bvh
    }
}

#[cfg(test)]
mod tests {
    use super::{MeshError, TerrainMesh};
    use foundation::bounds::ModelBounds;
    use foundation::math::Vec3;

    #[test]
    fn flat_quad_bounds() {
        let mesh = TerrainMesh::flat(-1000.0, 1000.0, -500.0, 500.0, 50.0).expect("mesh");
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(
            mesh.bounds(),
            ModelBounds::new(-1000.0, 1000.0, -500.0, 500.0, 50.0)
        );
        assert_eq!(mesh.triangle(1).expect("tri")[0], Vec3::new(-1000.0, 50.0, -500.0));
        assert!(mesh.triangle(2).is_none());
    }

    #[test]
    fn rejects_empty_geometry() {
        assert_eq!(TerrainMesh::new(Vec::new(), Vec::new()).unwrap_err(), MeshError::Empty);
        let verts = vec![Vec3::ZERO];
        assert_eq!(TerrainMesh::new(verts, Vec::new()).unwrap_err(), MeshError::Empty);
    }

    #[test]
    fn rejects_out_of_range_index() {
        let verts = vec![Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 1.0)];
        let err = TerrainMesh::new(verts, vec![[0, 1, 3]]).unwrap_err();
        assert_eq!(
            err,
            MeshError::IndexOutOfRange {
                triangle: 0,
                index: 3,
                vertex_count: 3
            }
        );
    }

    #[test]
    fn rejects_nan_vertex() {
        let verts = vec![
            Vec3::ZERO,
            Vec3::new(1.0, f64::NAN, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
        ];
        let err = TerrainMesh::new(verts, vec![[0, 1, 2]]).unwrap_err();
        assert_eq!(err, MeshError::NonFiniteVertex { index: 1 });
    }
}
