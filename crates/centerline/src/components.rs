//! Loose parts of a mesh.
//!
//! Two faces belong to the same part when they share a vertex. A vesicle mesh is a
//! soup of small closed spheres; each part is one vesicle and its vertex mean is
//! the vesicle center.

use std::cmp::Reverse;

use nalgebra::{Point3, Vector3};
use tracing::{debug, info};

use crate::types::Mesh;

/// Result of connected component analysis.
#[derive(Debug, Clone)]
pub struct ComponentAnalysis {
    pub component_count: usize,
    /// Face indices of each component, largest first.
    pub components: Vec<Vec<u32>>,
    pub largest_component_size: usize,
    pub smallest_component_size: usize,
}

impl ComponentAnalysis {
    /// Single component.
    pub fn is_connected(&self) -> bool {
        self.component_count == 1
    }

    pub fn largest_component(&self) -> &[u32] {
        self.components.first().map(|v| v.as_slice()).unwrap_or(&[])
    }
}

impl std::fmt::Display for ComponentAnalysis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Connected components: {}", self.component_count)?;
        if self.component_count > 0 {
            writeln!(f, "  Largest: {} faces", self.largest_component_size)?;
            writeln!(f, "  Smallest: {} faces", self.smallest_component_size)?;
        }
        Ok(())
    }
}

/// Flood-fill the faces of `mesh` into vertex-connected components.
pub fn find_connected_components(mesh: &Mesh) -> ComponentAnalysis {
    let face_count = mesh.faces.len();
    if face_count == 0 {
        return ComponentAnalysis {
            component_count: 0,
            components: Vec::new(),
            largest_component_size: 0,
            smallest_component_size: 0,
        };
    }

    let mut vertex_faces: Vec<Vec<u32>> = vec![Vec::new(); mesh.vertices.len()];
    for (fi, face) in mesh.faces.iter().enumerate() {
        for &v in face {
            if let Some(list) = vertex_faces.get_mut(v as usize) {
                list.push(fi as u32);
            }
        }
    }

    let mut visited = vec![false; face_count];
    let mut components: Vec<Vec<u32>> = Vec::new();

    for start in 0..face_count {
        if visited[start] {
            continue;
        }

        let mut component = Vec::new();
        let mut stack = vec![start as u32];
        visited[start] = true;

        while let Some(fi) = stack.pop() {
            component.push(fi);
            for &v in &mesh.faces[fi as usize] {
                let Some(neighbors) = vertex_faces.get(v as usize) else {
                    continue;
                };
                for &nf in neighbors {
                    if !visited[nf as usize] {
                        visited[nf as usize] = true;
                        stack.push(nf);
                    }
                }
            }
        }

        component.sort_unstable();
        components.push(component);
    }

    components.sort_by_key(|c| Reverse(c.len()));

    let component_count = components.len();
    let largest_component_size = components.first().map(|c| c.len()).unwrap_or(0);
    let smallest_component_size = components.last().map(|c| c.len()).unwrap_or(0);

    info!(
        "Found {} connected component(s) in mesh with {} faces",
        component_count, face_count
    );
    if component_count > 1 {
        debug!(
            "Component sizes: {:?}",
            components.iter().map(|c| c.len()).collect::<Vec<_>>()
        );
    }

    ComponentAnalysis {
        component_count,
        components,
        largest_component_size,
        smallest_component_size,
    }
}

/// One independent mesh per component, largest first.
pub fn split_into_components(mesh: &Mesh) -> Vec<Mesh> {
    find_connected_components(mesh)
        .components
        .iter()
        .map(|faces| {
            let faces: Vec<usize> = faces.iter().map(|&f| f as usize).collect();
            mesh.extract_faces(&faces)
        })
        .collect()
}

/// Vertex mean of every component.
pub fn component_centers(mesh: &Mesh) -> Vec<Point3<f64>> {
    let analysis = find_connected_components(mesh);
    let mut seen = vec![false; mesh.vertices.len()];

    analysis
        .components
        .iter()
        .filter_map(|faces| {
            let mut sum = Vector3::zeros();
            let mut count = 0usize;
            for &f in faces {
                for &v in &mesh.faces[f as usize] {
                    if let Some(flag) = seen.get_mut(v as usize)
                        && !*flag
                    {
                        *flag = true;
                        sum += mesh.position(v).coords;
                        count += 1;
                    }
                }
            }
            (count > 0).then(|| Point3::from(sum / count as f64))
        })
        .collect()
}
