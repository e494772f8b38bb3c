use std::fmt;

use foundation::math::Vec3;

use crate::mesh::{MeshError, TerrainMesh};

/// Regular grid of terrain heights, row-major, rows advancing along +Z.
///
/// Vertex `(col, row)` sits at
/// `(min_x + col * cell_x, heights[row * cols + col], min_z + row * cell_z)`.
/// Non-finite heights mark holes: any cell touching one produces no triangles.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightGrid {
    cols: usize,
    rows: usize,
    min_x: f64,
    min_z: f64,
    cell_x: f64,
    cell_z: f64,
    heights: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GridError {
    TooSmall { cols: usize, rows: usize },
    /// More samples than `u32` vertex indices can address.
    TooLarge { cols: usize, rows: usize },
    LengthMismatch { expected: usize, found: usize },
    BadCellSize { cell_x: f64, cell_z: f64 },
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridError::TooSmall { cols, rows } => {
                write!(f, "height grid needs at least 2x2 samples, got {cols}x{rows}")
            }
            GridError::TooLarge { cols, rows } => {
                write!(f, "height grid of {cols}x{rows} samples is too large")
            }
            GridError::LengthMismatch { expected, found } => {
                write!(f, "height grid expects {expected} samples, found {found}")
            }
            GridError::BadCellSize { cell_x, cell_z } => {
                write!(f, "height grid cell size must be positive ({cell_x} x {cell_z})")
            }
        }
    }
}

impl std::error::Error for GridError {}

impl HeightGrid {
    pub fn new(
        cols: usize,
        rows: usize,
        min_x: f64,
        min_z: f64,
        cell_x: f64,
        cell_z: f64,
        heights: Vec<f64>,
    ) -> Result<Self, GridError> {
        if cols < 2 || rows < 2 {
            return Err(GridError::TooSmall { cols, rows });
        }
        let expected = cols
            .checked_mul(rows)
            .filter(|&n| u32::try_from(n).is_ok())
            .ok_or(GridError::TooLarge { cols, rows })?;
        if heights.len() != expected {
            return Err(GridError::LengthMismatch {
                expected,
                found: heights.len(),
            });
        }
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(cell_x) || !positive(cell_z) {
            return Err(GridError::BadCellSize { cell_x, cell_z });
        }
        Ok(Self {
            cols,
            rows,
            min_x,
            min_z,
            cell_x,
            cell_z,
            heights,
        })
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn height(&self, col: usize, row: usize) -> Option<f64> {
        if col >= self.cols || row >= self.rows {
            return None;
        }
        Some(self.heights[row * self.cols + col])
    }

    /// Triangulate the grid, two triangles per complete cell.
    pub fn to_mesh(&self) -> Result<TerrainMesh, MeshError> {
        let mut vertices = Vec::new();
        // Grid sample -> vertex index, `None` for holes.
        let mut index_of: Vec<Option<u32>> = Vec::with_capacity(self.heights.len());

        for row in 0..self.rows {
            for col in 0..self.cols {
                let h = self.heights[row * self.cols + col];
                if h.is_finite() {
                    index_of.push(Some(vertices.len() as u32));
                    vertices.push(Vec3::new(
                        self.min_x + col as f64 * self.cell_x,
                        h,
                        self.min_z + row as f64 * self.cell_z,
                    ));
                } else {
                    index_of.push(None);
                }
            }
        }

        let mut triangles = Vec::new();
        for row in 0..self.rows - 1 {
            for col in 0..self.cols - 1 {
                let at = |c: usize, r: usize| index_of[r * self.cols + c];
                let (Some(v00), Some(v10), Some(v11), Some(v01)) = (
                    at(col, row),
                    at(col + 1, row),
                    at(col + 1, row + 1),
                    at(col, row + 1),
                ) else {
                    continue;
                };
                triangles.push([v00, v11, v10]);
                triangles.push([v00, v01, v11]);
            }
        }

        TerrainMesh::new(vertices, triangles)
    }
}
