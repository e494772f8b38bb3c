use crate::math::Vec3;

/// Axis-aligned bounding box
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb3 {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl Aabb3 {
    pub fn new(min: [f64; 3], max: [f64; 3]) -> Self {
        Aabb3 { min, max }
    }

    /// Bounds of a point set; `None` when the set is empty.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Vec3>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?.as_array();
        let mut b = Aabb3::new(first, first);
        for p in iter {
            b = b.expand(p);
        }
        Some(b)
    }

    pub fn expand(&self, p: Vec3) -> Self {
        let p = p.as_array();
        let mut out = *self;
        for axis in 0..3 {
            out.min[axis] = out.min[axis].min(p[axis]);
            out.max[axis] = out.max[axis].max(p[axis]);
        }
        out
    }

    pub fn union(&self, other: &Self) -> Self {
        let mut out = *self;
        for axis in 0..3 {
            out.min[axis] = out.min[axis].min(other.min[axis]);
            out.max[axis] = out.max[axis].max(other.max[axis]);
        }
        out
    }

    pub fn intersects(&self, other: &Self) -> bool {
        (0..3).all(|axis| self.min[axis] <= other.max[axis] && other.min[axis] <= self.max[axis])
    }

    pub fn centroid(&self, axis: usize) -> f64 {
        (self.min[axis] + self.max[axis]) * 0.5
    }
}

/// Horizontal footprint and top of a loaded terrain mesh, in model space.
///
/// Derived once from the mesh AABB when loading finishes.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ModelBounds {
    pub min_x: f64,
    pub max_x: f64,
    pub min_z: f64,
    pub max_z: f64,
    pub max_y: f64,
}

impl ModelBounds {
    pub fn new(min_x: f64, max_x: f64, min_z: f64, max_z: f64, max_y: f64) -> Self {
        Self {
            min_x,
            max_x,
            min_z,
            max_z,
            max_y,
        }
    }

    pub fn from_aabb(aabb: &Aabb3) -> Self {
        Self::new(aabb.min[0], aabb.max[0], aabb.min[2], aabb.max[2], aabb.max[1])
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn depth(&self) -> f64 {
        self.max_z - self.min_z
    }

    /// Whether `(x, z)` lies inside the footprint (edges included).
    pub fn contains_xz(&self, x: f64, z: f64) -> bool {
        x >= self.min_x && x <= self.max_x && z >= self.min_z && z <= self.max_z
    }
}
