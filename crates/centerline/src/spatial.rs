//! Nearest-neighbour and range queries over a fixed point set.
//!
//! [`SpatialIndex`] wraps kiddo's immutable k-d tree. It is bulk-loaded and balanced
//! once, then only queried, so a single index can be shared by reference across
//! rayon workers. The immutable tree accepts any number of points sharing a
//! coordinate, which voxel-derived meshes and axis-aligned centerlines produce.

use nalgebra::Point3;

type Tree = kiddo::immutable::float::kdtree::ImmutableKdTree<f64, u64, 3, 32>;

/// A point found by a query, with the index it was inserted under.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Position of the stored point.
    pub point: Point3<f64>,
    /// Index of the point in the slice the index was built from.
    pub index: usize,
    /// Euclidean distance from the query point.
    pub distance: f64,
}

/// Read-only spatial index over a point set.
pub struct SpatialIndex {
    /// None for an empty point set.
    tree: Option<Tree>,
    points: Vec<Point3<f64>>,
}

impl SpatialIndex {
    /// Build an index over `points`; query results refer to positions in this slice.
    pub fn build(points: &[Point3<f64>]) -> Self {
        let coords: Vec<[f64; 3]> = points.iter().map(|p| [p.x, p.y, p.z]).collect();
        let tree = (!coords.is_empty()).then(|| Tree::new_from_slice(&coords));
        Self {
            tree,
            points: points.to_vec(),
        }
    }

    /// Build an index over the vertices of a mesh.
    pub fn from_mesh(mesh: &crate::Mesh) -> Self {
        let points: Vec<Point3<f64>> = mesh.vertices.iter().map(|v| v.position).collect();
        Self::build(&points)
    }

    /// Number of indexed points.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True if the index holds no points.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// All points within `radius` of `center`, nearest first.
    ///
    /// An empty result is a valid answer, not an error.
    pub fn range_query(&self, center: &Point3<f64>, radius: f64) -> Vec<Neighbor> {
        let Some(tree) = self.tree.as_ref().filter(|_| radius >= 0.0) else {
            return Vec::new();
        };
        tree.within::<kiddo::SquaredEuclidean>(&[center.x, center.y, center.z], radius * radius)
            .into_iter()
            .map(|hit| self.neighbor(hit.item, hit.distance))
            .collect()
    }

    /// Indices of all points within `radius` of `center`, in no particular order.
    pub fn range_indices(&self, center: &Point3<f64>, radius: f64) -> Vec<usize> {
        let Some(tree) = self.tree.as_ref().filter(|_| radius >= 0.0) else {
            return Vec::new();
        };
        tree.within_unsorted::<kiddo::SquaredEuclidean>(&[center.x, center.y, center.z], radius * radius)
            .into_iter()
            .map(|hit| hit.item as usize)
            .collect()
    }

    /// The stored point nearest to `query`, or None for an empty index.
    pub fn nearest(&self, query: &Point3<f64>) -> Option<Neighbor> {
        let hit = self
            .tree
            .as_ref()?
            .nearest_one::<kiddo::SquaredEuclidean>(&[query.x, query.y, query.z]);
        Some(self.neighbor(hit.item, hit.distance))
    }

    fn neighbor(&self, item: u64, squared_distance: f64) -> Neighbor {
        let index = item as usize;
        Neighbor {
            point: self.points[index],
            index,
            distance: squared_distance.sqrt(),
        }
    }
}

impl std::fmt::Debug for SpatialIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpatialIndex")
            .field("points", &self.points.len())
            .finish()
    }
}
