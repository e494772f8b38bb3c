use foundation::bounds::Aabb3;
use foundation::math::precision::stable_total_cmp_f64;

/// A deterministic bounding volume hierarchy (BVH) over mesh triangles.
///
/// Ordering contract:
/// - `query_aabb` and `query_ray` return triangle indices in ascending order.
///
/// The BVH only prunes candidates. Callers still run the exact triangle test,
/// so results never depend on how the tree was split.
#[derive(Debug, Clone)]
pub struct Bvh {
    nodes: Vec<Node>,
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        bounds: Aabb3,
        items: Vec<Item>,
    },
    Internal {
        bounds: Aabb3,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Item {
    pub triangle: u32,
    pub bounds: Aabb3,
}

impl Bvh {
    pub fn build(items: Vec<Item>) -> Self {
        let mut nodes = Vec::new();
        let mut items = items;
        if !items.is_empty() {
            let _root = build_node(&mut nodes, &mut items);
        }
        Self { nodes }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root_bounds(&self) -> Option<Aabb3> {
        self.nodes.first().map(|n| match n {
            Node::Leaf { bounds, .. } | Node::Internal { bounds, .. } => *bounds,
        })
    }

    /// Triangles whose bounds intersect `query`, ascending.
    pub fn query_aabb(&self, query: &Aabb3) -> Vec<u32> {
        self.collect(|b| b.intersects(query))
    }

    /// Triangles whose bounds intersect a ray, ascending.
    ///
    /// `origin` and `dir` are in the same model coordinate system as the stored bounds.
    pub fn query_ray(&self, origin: [f64; 3], dir: [f64; 3], t_min: f64, t_max: f64) -> Vec<u32> {
        self.collect(|b| ray_intersects_aabb(origin, dir, b, t_min, t_max))
    }

    fn collect<F>(&self, hit: F) -> Vec<u32>
    where
        F: Fn(&Aabb3) -> bool,
    {
        if self.nodes.is_empty() {
            return Vec::new();
        }

        let mut hits: Vec<u32> = Vec::new();
        let mut stack: Vec<usize> = vec![0];

        while let Some(idx) = stack.pop() {
            match &self.nodes[idx] {
                Node::Leaf { bounds, items } => {
                    if !hit(bounds) {
                        continue;
                    }
                    for item in items {
                        if hit(&item.bounds) {
                            hits.push(item.triangle);
                        }
                    }
                }
                Node::Internal {
                    bounds,
                    left,
                    right,
                } => {
                    if !hit(bounds) {
                        continue;
                    }
                    stack.push(*right);
                    stack.push(*left);
                }
            }
        }

        hits.sort_unstable();
        hits.dedup();
        hits
    }
}

const LEAF_MAX: usize = 8;

fn build_node(nodes: &mut Vec<Node>, items: &mut [Item]) -> usize {
    let bounds = bounds_for_items(items);
    if items.len() <= LEAF_MAX {
        let idx = nodes.len();
        nodes.push(Node::Leaf {
            bounds,
            items: items.to_vec(),
        });
        return idx;
    }

    let axis = split_axis(&bounds);

    items.sort_by(|a, b| {
        stable_total_cmp_f64(a.bounds.centroid(axis), b.bounds.centroid(axis))
            .then_with(|| a.triangle.cmp(&b.triangle))
    });

    let mid = items.len() / 2;
    let (left_items, right_items) = items.split_at_mut(mid);

    let idx = nodes.len();
    // Placeholder; patched once both children exist.
    nodes.push(Node::Leaf {
        bounds,
        items: Vec::new(),
    });

    let left = build_node(nodes, left_items);
    let right = build_node(nodes, right_items);

    nodes[idx] = Node::Internal {
        bounds,
        left,
        right,
    };
    idx
}

fn split_axis(bounds: &Aabb3) -> usize {
    let ex = bounds.max[0] - bounds.min[0];
    let ey = bounds.max[1] - bounds.min[1];
    let ez = bounds.max[2] - bounds.min[2];

    // Deterministic tie-break: prefer X, then Y, then Z.
    if ex >= ey && ex >= ez {
        0
    } else if ey >= ez {
        1
    } else {
        2
    }
}

fn bounds_for_items(items: &[Item]) -> Aabb3 {
    let mut b = items[0].bounds;
    for item in &items[1..] {
        b = b.union(&item.bounds);
    }
    b
}

/// Slab test. Axes where the ray has no component only check containment.
pub(crate) fn ray_intersects_aabb(
    origin: [f64; 3],
    dir: [f64; 3],
    aabb: &Aabb3,
    mut t_min: f64,
    mut t_max: f64,
) -> bool {
    for axis in 0..3 {
        let o = origin[axis];
        let d = dir[axis];
        let min = aabb.min[axis];
        let max = aabb.max[axis];

        if d.abs() < 1e-12 {
            if o < min || o > max {
                return false;
            }
            continue;
        }

        let inv = 1.0 / d;
        let mut t1 = (min - o) * inv;
        let mut t2 = (max - o) * inv;
        if t1 > t2 {
            std::mem::swap(&mut t1, &mut t2);
        }

        t_min = t_min.max(t1);
        t_max = t_max.min(t2);
        if t_max < t_min {
            return false;
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::{Bvh, Item, ray_intersects_aabb};
    use foundation::bounds::Aabb3;

    fn item(triangle: u32, min: [f64; 3], max: [f64; 3]) -> Item {
        Item {
            triangle,
            bounds: Aabb3::new(min, max),
        }
    }

    #[test]
    fn query_returns_triangles_in_index_order() {
        let bvh = Bvh::build(vec![
            item(2, [10.0, 0.0, 0.0], [11.0, 1.0, 1.0]),
            item(1, [0.0, 0.0, 0.0], [1.0, 1.0, 1.0]),
            item(3, [0.5, 0.5, 0.5], [2.0, 2.0, 2.0]),
        ]);

        let hits = bvh.query_aabb(&Aabb3::new([0.25, 0.25, 0.25], [1.5, 1.5, 1.5]));
        assert_eq!(hits, vec![1, 3]);
    }

    #[test]
    fn build_is_input_order_independent_for_results() {
        // Enough items to force internal nodes.
        let a: Vec<Item> = (0..40)
            .map(|i| {
                let x = i as f64 * 2.0;
                item(i, [x, 0.0, 0.0], [x + 1.0, 1.0, 1.0])
            })
            .collect();
        let mut b = a.clone();
        b.reverse();

        let q = Aabb3::new([9.5, 0.0, 0.0], [20.5, 1.0, 1.0]);
        let ha = Bvh::build(a).query_aabb(&q);
        let hb = Bvh::build(b).query_aabb(&q);
        assert_eq!(ha, hb);
        assert_eq!(ha, vec![5, 6, 7, 8, 9, 10]);
    }

    #[test]
    fn vertical_ray_only_reaches_items_under_it() {
        let items: Vec<Item> = (0..32)
            .map(|i| {
                let x = i as f64;
                item(i, [x, 0.0, 0.0], [x + 1.0, 0.0, 1.0])
            })
            .collect();
        let bvh = Bvh::build(items);

        let hits = bvh.query_ray([4.5, 100.0, 0.5], [0.0, -1.0, 0.0], 0.0, f64::INFINITY);
        assert_eq!(hits, vec![4]);

        let miss = bvh.query_ray([40.0, 100.0, 0.5], [0.0, -1.0, 0.0], 0.0, f64::INFINITY);
        assert!(miss.is_empty());
    }

    #[test]
    fn flat_box_is_hit_by_downward_ray() {
        let flat = Aabb3::new([-1.0, 5.0, -1.0], [1.0, 5.0, 1.0]);
        assert!(ray_intersects_aabb([0.0, 10.0, 0.0], [0.0, -1.0, 0.0], &flat, 0.0, 1e30));
        assert!(!ray_intersects_aabb([0.0, 10.0, 0.0], [0.0, 1.0, 0.0], &flat, 0.0, 1e30));
    }

    #[test]
    fn empty_bvh_has_no_hits() {
        let bvh = Bvh::build(Vec::new());
        assert!(bvh.is_empty());
        assert!(bvh.root_bounds().is_none());
        assert!(bvh.query_ray([0.0; 3], [0.0, -1.0, 0.0], 0.0, 1.0).is_empty());
    }
}
