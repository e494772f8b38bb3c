use std::sync::Arc;

use foundation::bounds::ModelBounds;
use foundation::math::{PlanePoint, Vec3};
use tracing::debug;

use crate::mesh::TerrainMesh;
use crate::raycast::{Ray, RayHit, RaycastOptions, raycast_all};

/// Height above the mesh top where resolution rays start.
///
/// Has to dwarf any height variance of the mesh, so it is on the scale of the
/// model itself rather than an epsilon.
pub const DEFAULT_RAY_MARGIN: f64 = 50_000.0;

/// Outcome of snapping an `(x, z)` position onto the terrain surface.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Resolution {
    /// The nearest surface point straight below the query position.
    Hit(RayHit),
    /// Nothing below `(x, z)`: outside the footprint or over a hole.
    NoIntersection { x: f64, z: f64 },
}

impl Resolution {
    pub fn point(&self) -> Option<Vec3> {
        match self {
            Resolution::Hit(hit) => Some(hit.point),
            Resolution::NoIntersection { .. } => None,
        }
    }

    pub fn is_hit(&self) -> bool {
        matches!(self, Resolution::Hit(_))
    }

    /// The hit point, or `(x, y, z)` at the queried position on a miss.
    pub fn or_flat(&self, y: f64) -> Vec3 {
        match self {
            Resolution::Hit(hit) => hit.point,
            Resolution::NoIntersection { x, z } => Vec3::new(*x, y, *z),
        }
    }
}

/// Finds terrain surface height by casting vertical rays against a mesh.
#[derive(Debug, Clone)]
pub struct TerrainResolver {
    mesh: Arc<TerrainMesh>,
    bounds: ModelBounds,
    margin: f64,
}

impl TerrainResolver {
    pub fn new(mesh: Arc<TerrainMesh>) -> Self {
        let bounds = mesh.bounds();
        Self {
            mesh,
            bounds,
            margin: DEFAULT_RAY_MARGIN,
        }
    }

    /// Overrides the ray start margin. Non-finite or negative values keep the
    /// default.
    pub fn with_margin(mut self, margin: f64) -> Self {
        if margin.is_finite() && margin >= 0.0 {
            self.margin = margin;
        }
        self
    }

    pub fn mesh(&self) -> &Arc<TerrainMesh> {
        &self.mesh
    }

    pub fn bounds(&self) -> &ModelBounds {
        &self.bounds
    }

    pub fn margin(&self) -> f64 {
        self.margin
    }

    /// Ray used to resolve `(x, z)`.
    pub fn ray_at(&self, x: f64, z: f64) -> Ray {
        Ray::down(x, self.bounds.max_y + self.margin, z)
    }

    pub fn resolve(&self, x: f64, z: f64) -> Resolution {
        let hits = raycast_all(&self.mesh, self.ray_at(x, z), RaycastOptions::default());
        match hits.first() {
            Some(hit) => Resolution::Hit(*hit),
            None => {
                debug!(x, z, "terrain ray missed mesh");
                Resolution::NoIntersection { x, z }
            }
        }
    }

    pub fn resolve_plane(&self, p: PlanePoint) -> Resolution {
        self.resolve(p.x, p.z)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{DEFAULT_RAY_MARGIN, Resolution, TerrainResolver};
    use crate::heightgrid::HeightGrid;
    use crate::mesh::TerrainMesh;
    use foundation::bounds::ModelBounds;
    use foundation::math::{GeoPoint, GeoProjector, PlanePoint, ReferenceFrame, Vec3};

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    fn flat(y: f64) -> TerrainResolver {
        let mesh = TerrainMesh::flat(-1000.0, 1000.0, -1000.0, 1000.0, y).expect("mesh");
        TerrainResolver::new(Arc::new(mesh))
    }

    #[test]
    fn flat_mesh_resolves_to_its_height_everywhere() {
        let resolver = flat(50.0);
        for i in 0..=10 {
            for j in 0..=10 {
                let x = -999.0 + i as f64 * 199.8;
                let z = -999.0 + j as f64 * 199.8;
                let p = resolver.resolve(x, z).point().expect("hit");
                assert_close(p.y, 50.0, 1e-9);
                assert_close(p.x, x, 1e-9);
                assert_close(p.z, z, 1e-9);
            }
        }
    }

    #[test]
    fn uncovered_half_reports_no_intersection() {
        // Mesh covers only x in [-1000, 0].
        let mesh = TerrainMesh::flat(-1000.0, 0.0, -1000.0, 1000.0, 20.0).expect("mesh");
        let resolver = TerrainResolver::new(Arc::new(mesh));
        assert!(resolver.resolve(-500.0, 0.0).is_hit());
        assert_eq!(
            resolver.resolve(500.0, 0.0),
            Resolution::NoIntersection { x: 500.0, z: 0.0 }
        );
    }

    #[test]
    fn hole_in_grid_reports_no_intersection() {
        let mut heights = vec![10.0; 16];
        // Punch out the sample at col 3, row 3; it only touches the last cell.
        heights[15] = f64::NAN;
        let grid = HeightGrid::new(4, 4, 0.0, 0.0, 10.0, 10.0, heights).expect("grid");
        let resolver = TerrainResolver::new(Arc::new(grid.to_mesh().expect("mesh")));
        assert!(resolver.resolve(5.0, 5.0).is_hit());
        assert!(!resolver.resolve(27.0, 27.0).is_hit());
    }

    #[test]
    fn known_height_on_sloped_grid() {
        // Plane y = 2x + 3z sampled on a grid is reproduced exactly by the mesh.
        let cols = 6;
        let rows = 5;
        let heights: Vec<f64> = (0..rows)
            .flat_map(|r| (0..cols).map(move |c| 2.0 * (c as f64 * 4.0) + 3.0 * (r as f64 * 4.0)))
            .collect();
        let grid = HeightGrid::new(cols, rows, 0.0, 0.0, 4.0, 4.0, heights).expect("grid");
        let resolver = TerrainResolver::new(Arc::new(grid.to_mesh().expect("mesh")));

        let p = resolver.resolve(7.3, 9.1).point().expect("hit");
        assert_close(p.y, 2.0 * 7.3 + 3.0 * 9.1, 1e-6);
    }

    #[test]
    fn highest_surface_wins_under_overhang() {
        let low = TerrainMesh::flat(-10.0, 10.0, -10.0, 10.0, 0.0).expect("mesh");
        let ledge = TerrainMesh::flat(-2.0, 2.0, -2.0, 2.0, 8.0).expect("mesh");
        let mut vertices = low.vertices().to_vec();
        vertices.extend_from_slice(ledge.vertices());
        let mut triangles = low.triangles().to_vec();
        triangles.extend(ledge.triangles().iter().map(|t| t.map(|i| i + 4)));
        let resolver =
            TerrainResolver::new(Arc::new(TerrainMesh::new(vertices, triangles).expect("mesh")));

        assert_close(resolver.resolve(0.0, 0.0).or_flat(0.0).y, 8.0, 1e-9);
        assert_close(resolver.resolve(5.0, 5.0).or_flat(0.0).y, 0.0, 1e-9);
    }

    #[test]
    fn ray_starts_margin_above_top() {
        let resolver = flat(50.0);
        assert_eq!(resolver.margin(), DEFAULT_RAY_MARGIN);
        let ray = resolver.ray_at(1.0, 2.0);
        assert_eq!(ray.origin, Vec3::new(1.0, 50.0 + DEFAULT_RAY_MARGIN, 2.0));

        let custom = flat(50.0).with_margin(10.0);
        assert_eq!(custom.ray_at(0.0, 0.0).origin.y, 60.0);
        assert_eq!(flat(50.0).with_margin(f64::NAN).margin(), DEFAULT_RAY_MARGIN);
    }

    #[test]
    fn miss_falls_back_to_flat_point() {
        let resolver = flat(50.0);
        let miss = resolver.resolve_plane(PlanePoint::new(5000.0, 0.0));
        assert_eq!(miss.point(), None);
        assert_eq!(miss.or_flat(0.0), Vec3::new(5000.0, 0.0, 0.0));
    }

    #[test]
    fn end_to_end_projection_then_resolution() {
        let frame = ReferenceFrame::from_extent(-84.0185, -81.9210, 8.0576, 9.4489);
        let bounds = ModelBounds::new(-1000.0, 1000.0, -1000.0, 1000.0, 500.0);
        let plane = GeoProjector::new(frame, bounds)
            .expect("frame")
            .project(GeoPoint::new(8.753, -82.97))
            .expect("project");
        assert_close(plane.x, 0.0, 20.0);
        assert_close(plane.z, 0.0, 20.0);

        let p = flat(50.0).resolve_plane(plane).point().expect("hit");
        assert_close(p.x, plane.x, 1e-9);
        assert_close(p.y, 50.0, 1e-9);
        assert_close(p.z, plane.z, 1e-9);
    }
}
