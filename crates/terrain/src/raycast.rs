use foundation::math::Vec3;
use foundation::math::precision::stable_total_cmp_f64;

use crate::mesh::TerrainMesh;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub dir: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, dir: Vec3) -> Self {
        Self { origin, dir }
    }

    /// Straight-down ray starting at `(x, y, z)`.
    pub fn down(x: f64, y: f64, z: f64) -> Self {
        Self::new(Vec3::new(x, y, z), Vec3::DOWN)
    }

    pub fn at(&self, t: f64) -> Vec3 {
        self.origin + self.dir.scale(t)
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RayHit {
    pub triangle: u32,
    /// Distance from the ray origin along the normalized direction.
    pub distance: f64,
    pub point: Vec3,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RaycastOptions {
    pub max_distance: f64,
}

impl Default for RaycastOptions {
    fn default() -> Self {
        Self {
            max_distance: 1.0e30,
        }
    }
}

// Slack on barycentric bounds so rays through shared edges and vertices are
// not lost to rounding. Duplicate hits at an edge are harmless: they sort
// together and the lower triangle index wins.
const BARYCENTRIC_SLACK: f64 = 1e-9;

/// All triangle intersections along `ray`, nearest first.
///
/// Ordering contract:
/// - Ascending distance from the origin.
/// - Equal distances are ordered by ascending triangle index.
///
/// Triangles are double-sided. A zero-length direction yields no hits.
pub fn raycast_all(mesh: &TerrainMesh, ray: Ray, opts: RaycastOptions) -> Vec<RayHit> {
    let Some(dir) = ray.dir.normalized() else {
        return Vec::new();
    };
    let ray = Ray::new(ray.origin, dir);

    let candidates = mesh.bvh().query_ray(
        ray.origin.as_array(),
        dir.as_array(),
        0.0,
        opts.max_distance,
    );

    let mut hits: Vec<RayHit> = candidates
        .into_iter()
        .filter_map(|triangle| {
            let corners = mesh.triangle(triangle)?;
            let t = intersect_triangle(&ray, corners, opts.max_distance)?;
            Some(RayHit {
                triangle,
                distance: t,
                point: ray.at(t),
            })
        })
        .collect();

    sort_hits(&mut hits);
    hits
}

/// Nearest intersection along `ray`, if any.
pub fn raycast_nearest(mesh: &TerrainMesh, ray: Ray, opts: RaycastOptions) -> Option<RayHit> {
    raycast_all(mesh, ray, opts).into_iter().next()
}

fn sort_hits(hits: &mut [RayHit]) {
    hits.sort_by(|a, b| {
        stable_total_cmp_f64(a.distance, b.distance).then_with(|| a.triangle.cmp(&b.triangle))
    });
}

/// Möller–Trumbore ray/triangle test. `ray.dir` must be normalized.
///
/// Returns the hit distance in `[0, max_distance]`.
pub fn intersect_triangle(ray: &Ray, [a, b, c]: [Vec3; 3], max_distance: f64) -> Option<f64> {
    let e1 = b - a;
    let e2 = c - a;
    let p = ray.dir.cross(e2);
    let det = e1.dot(p);

    // Parallel to the triangle plane, or a degenerate triangle.
    if det.abs() <= 1e-12 * e1.length() * e2.length() {
        return None;
    }
    let inv = 1.0 / det;

    let s = ray.origin - a;
    let u = s.dot(p) * inv;
    if !(-BARYCENTRIC_SLACK..=1.0 + BARYCENTRIC_SLACK).contains(&u) {
        return None;
    }

    let q = s.cross(e1);
    let v = ray.dir.dot(q) * inv;
    if v < -BARYCENTRIC_SLACK || u + v > 1.0 + BARYCENTRIC_SLACK {
        return None;
    }

    let t = e2.dot(q) * inv;
    if !(0.0..=max_distance).contains(&t) {
        return None;
    }
    Some(t)
}

#[cfg(test)]
mod tests {
    use super::{Ray, RayHit, RaycastOptions, intersect_triangle, raycast_all, raycast_nearest, sort_hits};
    use crate::heightgrid::HeightGrid;
    use crate::mesh::TerrainMesh;
    use foundation::math::Vec3;

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    fn brute_force(mesh: &TerrainMesh, ray: Ray) -> Vec<RayHit> {
        let ray = Ray::new(ray.origin, ray.dir.normalized().expect("dir"));
        let mut hits: Vec<RayHit> = (0..mesh.triangle_count() as u32)
            .filter_map(|i| {
                let t = intersect_triangle(&ray, mesh.triangle(i)?, 1.0e30)?;
                Some(RayHit {
                    triangle: i,
                    distance: t,
                    point: ray.at(t),
                })
            })
            .collect();
        sort_hits(&mut hits);
        hits
    }

    #[test]
    fn downward_ray_hits_flat_quad() {
        let mesh = TerrainMesh::flat(-10.0, 10.0, -10.0, 10.0, 3.0).expect("mesh");
        let hit = raycast_nearest(&mesh, Ray::down(2.0, 100.0, -4.0), RaycastOptions::default())
            .expect("hit");
        assert_close(hit.point.y, 3.0, 1e-9);
        assert_close(hit.distance, 97.0, 1e-9);
        assert_eq!(hit.point.x, 2.0);
        assert_eq!(hit.point.z, -4.0);
    }

    #[test]
    fn triangles_are_double_sided() {
        let tri = [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
        ];
        let down = Ray::down(0.25, 5.0, 0.25);
        let up = Ray::new(Vec3::new(0.25, -5.0, 0.25), Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(intersect_triangle(&down, tri, 1e30), Some(5.0));
        assert_eq!(intersect_triangle(&up, tri, 1e30), Some(5.0));
    }

    #[test]
    fn hits_behind_origin_are_ignored() {
        let mesh = TerrainMesh::flat(-10.0, 10.0, -10.0, 10.0, 3.0).expect("mesh");
        assert!(raycast_all(&mesh, Ray::down(0.0, 1.0, 0.0), RaycastOptions::default()).is_empty());
    }

    #[test]
    fn shared_diagonal_is_not_a_gap() {
        // (0, 0) lies exactly on the quad's diagonal.
        let mesh = TerrainMesh::flat(-10.0, 10.0, -10.0, 10.0, 1.0).expect("mesh");
        let hits = raycast_all(&mesh, Ray::down(0.0, 50.0, 0.0), RaycastOptions::default());
        assert!(!hits.is_empty());
        assert_eq!(hits[0].triangle, 0);
    }

    #[test]
    fn stacked_surfaces_sort_nearest_first() {
        let low = TerrainMesh::flat(-1.0, 1.0, -1.0, 1.0, 0.0).expect("mesh");
        let high = TerrainMesh::flat(-1.0, 1.0, -1.0, 1.0, 5.0).expect("mesh");
        let mut vertices = low.vertices().to_vec();
        vertices.extend_from_slice(high.vertices());
        let mut triangles = low.triangles().to_vec();
        triangles.extend(high.triangles().iter().map(|t| t.map(|i| i + 4)));
        let mesh = TerrainMesh::new(vertices, triangles).expect("mesh");

        let hits = raycast_all(&mesh, Ray::down(0.3, 10.0, 0.4), RaycastOptions::default());
        assert_eq!(hits.len(), 2);
        assert_close(hits[0].point.y, 5.0, 1e-9);
        assert_close(hits[1].point.y, 0.0, 1e-9);
    }

    #[test]
    fn bvh_path_matches_brute_force_on_rough_grid() {
        let heights: Vec<f64> = (0..(17 * 13))
            .map(|i| ((i * 37 % 23) as f64) * 1.5 - 10.0)
            .collect();
        let grid = HeightGrid::new(17, 13, -80.0, -60.0, 10.0, 10.0, heights).expect("grid");
        let mesh = grid.to_mesh().expect("mesh");

        for i in 0..50 {
            let x = -85.0 + (i as f64) * 3.7;
            let z = -65.0 + ((i * 7) % 50) as f64 * 2.9;
            let ray = Ray::down(x, 1000.0, z);
            let fast = raycast_all(&mesh, ray, RaycastOptions::default());
            let slow = brute_force(&mesh, ray);
            assert_eq!(fast, slow, "mismatch at ({x}, {z})");
        }
    }

    #[test]
    fn zero_direction_yields_nothing() {
        let mesh = TerrainMesh::flat(-1.0, 1.0, -1.0, 1.0, 0.0).expect("mesh");
        let ray = Ray::new(Vec3::new(0.0, 1.0, 0.0), Vec3::ZERO);
        assert!(raycast_all(&mesh, ray, RaycastOptions::default()).is_empty());
    }
}
