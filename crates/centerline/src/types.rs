//! Core mesh data types.
//!
//! Surfaces are polygonal: faces keep their original arity (quads, pentagons, the
//! large n-gon caps produced by a plane cut) instead of being triangulated, because
//! the cross-section resolver classifies faces by vertex count.

use hashbrown::HashMap;
use nalgebra::{Point3, Unit, Vector3};

use crate::error::{CenterlineError, CenterlineResult};

/// A mesh vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    /// 3D position.
    pub position: Point3<f64>,
}

impl Vertex {
    /// Create a new vertex.
    #[inline]
    pub fn new(position: Point3<f64>) -> Self {
        Self { position }
    }

    /// Create a vertex from raw coordinates.
    #[inline]
    pub fn from_coords(x: f64, y: f64, z: f64) -> Self {
        Self::new(Point3::new(x, y, z))
    }
}

/// A polygonal mesh with indexed vertices and faces.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    /// Vertex data.
    pub vertices: Vec<Vertex>,

    /// Faces as ordered vertex index loops.
    pub faces: Vec<Vec<u32>>,
}

impl Mesh {
    /// Create a new empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mesh with pre-allocated capacity.
    pub fn with_capacity(vertex_count: usize, face_count: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertex_count),
            faces: Vec::with_capacity(face_count),
        }
    }

    /// Number of vertices in the mesh.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of faces in the mesh.
    #[inline]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Check if mesh is empty (no vertices or faces).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.faces.is_empty()
    }

    /// Position of a vertex.
    #[inline]
    pub fn position(&self, index: u32) -> Point3<f64> {
        self.vertices[index as usize].position
    }

    /// Add a vertex and return its index.
    pub fn push_vertex(&mut self, position: Point3<f64>) -> u32 {
        self.vertices.push(Vertex::new(position));
        (self.vertices.len() - 1) as u32
    }

    /// Compute the axis-aligned bounding box.
    /// Returns (min_corner, max_corner) or None if mesh has no vertices.
    pub fn bounds(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let first = self.vertices.first()?.position;
        let mut min = first;
        let mut max = first;

        for vertex in &self.vertices[1..] {
            let p = &vertex.position;
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            min.z = min.z.min(p.z);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
            max.z = max.z.max(p.z);
        }

        Some((min, max))
    }

    /// Positions of a face's vertices, in winding order.
    pub fn polygon(&self, face_idx: usize) -> Polygon {
        self.polygon_of(&self.faces[face_idx])
    }

    /// Positions of an arbitrary index loop over this mesh's vertices.
    pub fn polygon_of(&self, indices: &[u32]) -> Polygon {
        Polygon::new(indices.iter().map(|&v| self.position(v)).collect())
    }

    /// Iterate over all faces as polygons.
    pub fn polygons(&self) -> impl Iterator<Item = Polygon> + '_ {
        (0..self.faces.len()).map(|i| self.polygon(i))
    }

    /// Fan-triangulate every face.
    pub fn triangles(&self) -> impl Iterator<Item = Triangle> + '_ {
        self.faces.iter().flat_map(move |face| {
            (1..face.len().saturating_sub(1)).map(move |k| Triangle {
                v0: self.position(face[0]),
                v1: self.position(face[k]),
                v2: self.position(face[k + 1]),
            })
        })
    }

    /// Total surface area.
    pub fn surface_area(&self) -> f64 {
        self.polygons().map(|p| p.area()).sum()
    }

    /// Mean of all vertex positions.
    pub fn vertex_mean(&self) -> Option<Point3<f64>> {
        if self.vertices.is_empty() {
            return None;
        }
        let sum: Vector3<f64> = self.vertices.iter().map(|v| v.position.coords).sum();
        Some(Point3::from(sum / self.vertices.len() as f64))
    }

    /// Largest distance from the vertex mean to any vertex.
    ///
    /// Returns 0.0 for a mesh without vertices.
    pub fn max_radius(&self) -> f64 {
        let Some(center) = self.vertex_mean() else {
            return 0.0;
        };
        self.vertices
            .iter()
            .map(|v| (v.position - center).norm())
            .fold(0.0, f64::max)
    }

    /// Number of faces each vertex belongs to.
    pub fn faces_per_vertex(&self) -> Vec<u32> {
        let mut table = vec![0u32; self.vertices.len()];
        for face in &self.faces {
            for &v in face {
                if let Some(count) = table.get_mut(v as usize) {
                    *count += 1;
                }
            }
        }
        table
    }

    /// Check that every face index refers to an existing vertex and every face has
    /// at least three vertices.
    pub fn validate_indices(&self) -> CenterlineResult<()> {
        let vertex_count = self.vertices.len();
        for (face_index, face) in self.faces.iter().enumerate() {
            if face.len() < 3 {
                return Err(CenterlineError::EmptyMesh {
                    details: format!("face {} has only {} vertices", face_index, face.len()),
                });
            }
            if let Some(&bad) = face.iter().find(|&&v| v as usize >= vertex_count) {
                return Err(CenterlineError::InvalidVertexIndex {
                    face_index,
                    vertex_index: bad,
                    vertex_count,
                });
            }
        }
        Ok(())
    }

    /// Copy of the mesh without the vertices whose `keep` flag is false.
    ///
    /// Faces touching a removed vertex are removed too; the remaining vertices are
    /// compacted in their original order.
    pub fn retain_vertices(&self, keep: &[bool]) -> Mesh {
        let mut remap = vec![u32::MAX; self.vertices.len()];
        let mut out = Mesh::with_capacity(keep.iter().filter(|&&k| k).count(), 0);

        for (i, vertex) in self.vertices.iter().enumerate() {
            if keep.get(i).copied().unwrap_or(false) {
                remap[i] = out.vertices.len() as u32;
                out.vertices.push(*vertex);
            }
        }

        for face in &self.faces {
            if face.iter().all(|&v| remap[v as usize] != u32::MAX) {
                out.faces.push(face.iter().map(|&v| remap[v as usize]).collect());
            }
        }

        out
    }

    /// New mesh holding only the given faces and the vertices they use.
    pub fn extract_faces(&self, face_indices: &[usize]) -> Mesh {
        let mut remap: HashMap<u32, u32> = HashMap::new();
        let mut out = Mesh::with_capacity(0, face_indices.len());

        for &fi in face_indices {
            let mut face = Vec::with_capacity(self.faces[fi].len());
            for &v in &self.faces[fi] {
                let next = out.vertices.len() as u32;
                let mapped = *remap.entry(v).or_insert(next);
                if mapped == next {
                    out.vertices.push(self.vertices[v as usize]);
                }
                face.push(mapped);
            }
            out.faces.push(face);
        }

        out
    }

    /// Append another mesh, offsetting its face indices.
    pub fn append(&mut self, other: &Mesh) {
        let offset = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        self.faces.extend(
            other
                .faces
                .iter()
                .map(|face| face.iter().map(|&v| v + offset).collect::<Vec<u32>>()),
        );
    }
}

/// Undirected edges of a face as sorted vertex index pairs.
pub fn edge_keys(face: &[u32]) -> impl Iterator<Item = (u32, u32)> + '_ {
    (0..face.len()).map(move |i| {
        let a = face[i];
        let b = face[(i + 1) % face.len()];
        if a < b { (a, b) } else { (b, a) }
    })
}

/// A polygon with concrete vertex positions.
#[derive(Debug, Clone)]
pub struct Polygon {
    pub points: Vec<Point3<f64>>,
}

impl Polygon {
    /// Create a polygon from points in winding order.
    pub fn new(points: Vec<Point3<f64>>) -> Self {
        Self { points }
    }

    /// Number of vertices.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True if the polygon has no vertices.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Area vector by Newell's method: normal direction, length twice the area.
    pub fn newell_vector(&self) -> Vector3<f64> {
        let n = self.points.len();
        let mut sum = Vector3::zeros();
        for i in 0..n {
            let a = self.points[i].coords;
            let b = self.points[(i + 1) % n].coords;
            sum += a.cross(&b);
        }
        sum
    }

    /// Area of a planar polygon (any winding, convex or not).
    pub fn area(&self) -> f64 {
        if self.points.len() < 3 {
            return 0.0;
        }
        0.5 * self.newell_vector().norm()
    }

    /// Unit normal following the winding, or None if degenerate.
    pub fn normal(&self) -> Option<Unit<Vector3<f64>>> {
        Unit::try_new(self.newell_vector(), 1e-15)
    }

    /// Mean of the polygon's vertices.
    pub fn centroid(&self) -> Point3<f64> {
        if self.points.is_empty() {
            return Point3::origin();
        }
        let sum: Vector3<f64> = self.points.iter().map(|p| p.coords).sum();
        Point3::from(sum / self.points.len() as f64)
    }
}

/// A triangle with concrete vertex positions.
#[derive(Debug, Clone, Copy)]
pub struct Triangle {
    pub v0: Point3<f64>,
    pub v1: Point3<f64>,
    pub v2: Point3<f64>,
}

impl Triangle {
    /// Create a new triangle from three points.
    #[inline]
    pub fn new(v0: Point3<f64>, v1: Point3<f64>, v2: Point3<f64>) -> Self {
        Self { v0, v1, v2 }
    }

    /// Compute the triangle area.
    #[inline]
    pub fn area(&self) -> f64 {
        (self.v1 - self.v0).cross(&(self.v2 - self.v0)).norm() * 0.5
    }
}
