//! Static triangle meshes

use std::collections::HashMap;

use glam::Vec3;

use crate::aabb::Aabb;
use crate::error::{DynamicsError, Result};
use crate::tree::DynamicTree;

/// Edges whose neighbours rise above this plane distance are concave.
const CONCAVE_EDGE_TOLERANCE: f32 = 1e-5;

/// Indexed triangle mesh with a triangle tree and concave edge flags
#[derive(Debug, Clone)]
pub struct TriangleMesh {
    vertices: Vec<Vec3>,
    indices: Vec<[u32; 3]>,
    normals: Vec<Vec3>,
    /// Per triangle, per edge `i` (vertex `i` to `i + 1`)
    concave_edges: Vec<[bool; 3]>,
    tree: DynamicTree<u32>,
    aabb: Aabb,
}

impl TriangleMesh {
    /// Build a mesh, its triangle tree and the concave edge table
    ///
    /// Triangles are counter-clockwise when seen from the solid side's
    /// outside. Degenerate triangles are kept but never produce contacts.
    pub fn new(vertices: Vec<Vec3>, indices: Vec<[u32; 3]>) -> Result<Self> {
        if vertices.is_empty() || indices.is_empty() {
            log::warn!("Rejected triangle mesh without vertices or triangles");
            return Err(DynamicsError::InvalidShape(
                "triangle mesh needs at least one triangle".into(),
            ));
        }

        if let Some((tri, idx)) = indices
            .iter()
            .enumerate()
            .find(|(_, idx)| idx.iter().any(|&i| i as usize >= vertices.len()))
        {
            log::warn!("Rejected triangle mesh: triangle {} indexes past {} vertices", tri, vertices.len());
            return Err(DynamicsError::InvalidShape(format!(
                "triangle {} references vertex {:?} but the mesh has {} vertices",
                tri,
                idx,
                vertices.len()
            )));
        }

        let normals: Vec<Vec3> = indices
            .iter()
            .map(|idx| {
                let [a, b, c] = idx.map(|i| vertices[i as usize]);
                (b - a).cross(c - a).try_normalize().unwrap_or(Vec3::ZERO)
            })
            .collect();

        let mut tree = DynamicTree::new(0.0, 0.0);
        for (tri, idx) in indices.iter().enumerate() {
            let points = idx.map(|i| vertices[i as usize]);
            tree.create(&Aabb::from_points(&points), tri as u32);
        }

        let mut mesh = Self {
            aabb: Aabb::from_points(&vertices),
            concave_edges: vec![[false; 3]; indices.len()],
            vertices,
            indices,
            normals,
            tree,
        };
        mesh.classify_edges();

        log::debug!(
            "Built triangle mesh: {} triangles, {} concave edges, tree height {}",
            mesh.num_triangles(),
            mesh.concave_edges.iter().flatten().filter(|&&c| c).count(),
            mesh.tree.height()
        );

        Ok(mesh)
    }

    fn classify_edges(&mut self) {
        let mut edges: HashMap<(u32, u32), (usize, usize)> = HashMap::new();

        for tri in 0..self.indices.len() {
            for edge in 0..3 {
                let v0 = self.indices[tri][edge];
                let v1 = self.indices[tri][(edge + 1) % 3];
                let key = (v0.min(v1), v0.max(v1));

                let Some((other_tri, other_edge)) = edges.get(&key).copied() else {
                    edges.insert(key, (tri, edge));
                    continue;
                };

                // Vertex of the neighbour opposite the shared edge.
                let opposite = self.indices[other_tri][(other_edge + 2) % 3];
                let shared = self.vertices[v0 as usize];
                let rise = self.normals[tri].dot(self.vertices[opposite as usize] - shared);

                // Flat seams count as concave too.
                let concave = rise > -CONCAVE_EDGE_TOLERANCE;
                self.concave_edges[tri][edge] = concave;
                self.concave_edges[other_tri][other_edge] = concave;
            }
        }
    }

    /// Number of triangles
    pub fn num_triangles(&self) -> usize {
        self.indices.len()
    }

    /// Vertex positions
    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    /// Vertices of triangle `tri`
    pub fn triangle(&self, tri: usize) -> [Vec3; 3] {
        self.indices[tri].map(|i| self.vertices[i as usize])
    }

    /// Unit normal of triangle `tri`, zero when degenerate
    pub fn normal(&self, tri: usize) -> Vec3 {
        self.normals[tri]
    }

    /// Whether edge `edge` of triangle `tri` is interior to a flat or concave seam
    pub fn is_concave_edge(&self, tri: usize, edge: usize) -> bool {
        self.concave_edges[tri][edge]
    }

    /// Local bounds of the mesh
    pub fn aabb(&self) -> Aabb {
        self.aabb
    }

    /// Invoke `visit` with every triangle whose bounds intersect `aabb`
    pub fn visit_triangles<F: FnMut(usize)>(&self, aabb: &Aabb, mut visit: F) {
        self.tree.visit(aabb, |_, tri| visit(tri as usize));
    }
}
