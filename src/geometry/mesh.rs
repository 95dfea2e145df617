// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Neutral triangle mesh representation consumed and produced by the boolean engine

use super::BoundingBox;
use crate::iob::{BooleanEngine, BooleanOp, CsgError, Environment};
use nalgebra::{Matrix4, Point3, Vector2, Vector3};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Material tag carried by triangles that were never assigned one
pub const DEFAULT_MATERIAL: i32 = 0;

/// Vertex with position, normal and texture coordinate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub position: Point3<f64>,
    pub normal: Vector3<f64>,
    pub texcoord: Vector2<f32>,
}

impl Vertex {
    pub fn new(position: Point3<f64>, normal: Vector3<f64>) -> Self {
        Self {
            position,
            normal,
            texcoord: Vector2::zeros(),
        }
    }

    pub fn with_texcoord(position: Point3<f64>, normal: Vector3<f64>, texcoord: Vector2<f32>) -> Self {
        Self {
            position,
            normal,
            texcoord,
        }
    }

    /// Copy of this vertex, with the normal negated when `flip` is set
    pub fn flipped(&self, flip: bool) -> Self {
        Self {
            normal: if flip { -self.normal } else { self.normal },
            ..*self
        }
    }

    /// Linear blend towards `other` by fraction `t`
    pub fn interpolate(&self, other: &Vertex, t: f64) -> Self {
        let normal = self.normal.lerp(&other.normal, t);
        Self {
            position: self.position + (other.position - self.position) * t,
            normal: normal.try_normalize(1e-12).unwrap_or(self.normal),
            texcoord: self.texcoord.lerp(&other.texcoord, t as f32),
        }
    }

    /// Barycentric blend of three vertices, placed at `position`
    pub fn blend(corners: [&Vertex; 3], weights: [f64; 3], position: Point3<f64>) -> Self {
        let normal = corners[0].normal * weights[0]
            + corners[1].normal * weights[1]
            + corners[2].normal * weights[2];
        let texcoord = corners[0].texcoord * weights[0] as f32
            + corners[1].texcoord * weights[1] as f32
            + corners[2].texcoord * weights[2] as f32;
        Self {
            position,
            normal: normal.try_normalize(1e-12).unwrap_or(corners[0].normal),
            texcoord,
        }
    }

    pub fn transform(&mut self, matrix: &Matrix4<f64>) {
        self.position = matrix.transform_point(&self.position);
        // Normals go through the inverse transpose
        let normal_matrix = matrix
            .try_inverse()
            .map(|m| m.transpose())
            .unwrap_or(*matrix);
        let normal = normal_matrix.transform_vector(&self.normal);
        self.normal = normal.try_normalize(f64::EPSILON).unwrap_or(normal);
    }
}

/// Triangle defined by three vertex indices and a material tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Triangle {
    pub indices: [usize; 3],
    pub material: i32,
}

impl Triangle {
    pub fn new(indices: [usize; 3]) -> Self {
        Self {
            indices,
            material: DEFAULT_MATERIAL,
        }
    }

    pub fn with_material(indices: [usize; 3], material: i32) -> Self {
        Self { indices, material }
    }

    /// Geometric normal from the winding order, or `None` for a degenerate triangle
    pub fn face_normal(&self, mesh: &Mesh) -> Option<Vector3<f64>> {
        let v0 = mesh.vertices[self.indices[0]].position;
        let v1 = mesh.vertices[self.indices[1]].position;
        let v2 = mesh.vertices[self.indices[2]].position;
        (v1 - v0).cross(&(v2 - v0)).try_normalize(1e-12)
    }
}

/// Triangular mesh
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub triangles: Vec<Triangle>,
}

impl Mesh {
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            triangles: Vec::new(),
        }
    }

    pub fn empty() -> Self {
        Self::new()
    }

    pub fn with_capacity(vertex_count: usize, triangle_count: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertex_count),
            triangles: Vec::with_capacity(triangle_count),
        }
    }

    /// Build a mesh from flat vertex buffers and a triangle index list.
    ///
    /// `positions` and `normals` hold 3 components per vertex, `texcoords` 2 per
    /// vertex (or may be empty), and `indices` are consecutive triples.
    pub fn from_buffers(
        positions: &[f64],
        normals: &[f64],
        texcoords: &[f32],
        indices: &[u32],
        material: i32,
    ) -> Result<Self, CsgError> {
        if positions.len() % 3 != 0 {
            return Err(CsgError::malformed(format!(
                "position buffer length {} is not a multiple of 3",
                positions.len()
            )));
        }
        let vertex_count = positions.len() / 3;
        if normals.len() != positions.len() {
            return Err(CsgError::malformed(format!(
                "normal buffer holds {} values, expected {}",
                normals.len(),
                positions.len()
            )));
        }
        if !texcoords.is_empty() && texcoords.len() != vertex_count * 2 {
            return Err(CsgError::malformed(format!(
                "texcoord buffer holds {} values, expected {}",
                texcoords.len(),
                vertex_count * 2
            )));
        }
        if indices.len() % 3 != 0 {
            return Err(CsgError::malformed(format!(
                "index buffer length {} is not a multiple of 3 (mesh is not triangular)",
                indices.len()
            )));
        }

        let mut mesh = Mesh::with_capacity(vertex_count, indices.len() / 3);
        for i in 0..vertex_count {
            let position = Point3::new(positions[i * 3], positions[i * 3 + 1], positions[i * 3 + 2]);
            let normal = Vector3::new(normals[i * 3], normals[i * 3 + 1], normals[i * 3 + 2]);
            let texcoord = if texcoords.is_empty() {
                Vector2::zeros()
            } else {
                Vector2::new(texcoords[i * 2], texcoords[i * 2 + 1])
            };
            mesh.add_vertex(Vertex::with_texcoord(position, normal, texcoord));
        }

        for triple in indices.chunks_exact(3) {
            let tri = [triple[0] as usize, triple[1] as usize, triple[2] as usize];
            if let Some(bad) = tri.iter().find(|&&idx| idx >= vertex_count) {
                return Err(CsgError::malformed(format!(
                    "index {} out of range for {} vertices",
                    bad, vertex_count
                )));
            }
            mesh.add_triangle(Triangle::with_material(tri, material));
        }

        Ok(mesh)
    }

    /// Add a vertex and return its index
    pub fn add_vertex(&mut self, vertex: Vertex) -> usize {
        let index = self.vertices.len();
        self.vertices.push(vertex);
        index
    }

    /// Add a triangle
    pub fn add_triangle(&mut self, triangle: Triangle) {
        self.triangles.push(triangle);
    }

    /// Transform all vertices by a matrix
    pub fn transform(&mut self, matrix: &Matrix4<f64>) {
        for vertex in &mut self.vertices {
            vertex.transform(matrix);
        }
    }

    /// Assign one material tag to every triangle
    pub fn set_material(&mut self, material: i32) {
        for triangle in &mut self.triangles {
            triangle.material = material;
        }
    }

    /// Compute bounding box
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_points(self.vertices.iter().map(|v| &v.position))
    }

    /// Get vertex count
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get triangle count
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Check that every index refers to an existing vertex
    pub fn validate(&self) -> Result<(), CsgError> {
        for (i, triangle) in self.triangles.iter().enumerate() {
            if triangle.indices.iter().any(|&idx| idx >= self.vertices.len()) {
                return Err(CsgError::malformed(format!(
                    "triangle {} references a vertex outside 0..{}",
                    i,
                    self.vertices.len()
                )));
            }
        }
        Ok(())
    }

    /// Perform boolean operation with another mesh using the default environment
    pub fn boolean_operation(&self, other: &Mesh, op: BooleanOp) -> Result<Mesh, CsgError> {
        let engine = BooleanEngine::new(Environment::default());
        Ok(engine.apply(op, self, other)?.mesh)
    }

    /// Merge with another mesh (simple concatenation without CSG)
    pub fn merge(&mut self, other: &Mesh) {
        let offset = self.vertices.len();
        self.vertices.extend_from_slice(&other.vertices);

        for triangle in &other.triangles {
            self.triangles.push(Triangle::with_material(
                [
                    triangle.indices[0] + offset,
                    triangle.indices[1] + offset,
                    triangle.indices[2] + offset,
                ],
                triangle.material,
            ));
        }
    }

    /// Distinct material tags in ascending order
    pub fn materials(&self) -> Vec<i32> {
        let mut materials: Vec<i32> = self.triangles.iter().map(|t| t.material).collect();
        materials.sort_unstable();
        materials.dedup();
        materials
    }

    /// One mesh per material tag, each holding only the triangles with that tag
    /// and the vertices they reference
    pub fn split_by_material(&self) -> BTreeMap<i32, Mesh> {
        let mut result: BTreeMap<i32, Mesh> = BTreeMap::new();
        let mut remaps: BTreeMap<i32, Vec<Option<usize>>> = BTreeMap::new();

        for triangle in &self.triangles {
            let sub = result.entry(triangle.material).or_default();
            let remap = remaps
                .entry(triangle.material)
                .or_insert_with(|| vec![None; self.vertices.len()]);

            let mut indices = [0usize; 3];
            for (slot, &idx) in indices.iter_mut().zip(triangle.indices.iter()) {
                *slot = match remap[idx] {
                    Some(mapped) => mapped,
                    None => {
                        let mapped = sub.add_vertex(self.vertices[idx]);
                        remap[idx] = Some(mapped);
                        mapped
                    }
                };
            }
            sub.add_triangle(Triangle::with_material(indices, triangle.material));
        }

        result
    }

    /// Weld vertices that are within epsilon distance of each other and share
    /// normal and texture coordinate. Returns the number of vertices removed
    pub fn weld_vertices(&mut self, epsilon: f64) -> usize {
        if self.vertices.is_empty() {
            return 0;
        }

        let original_count = self.vertices.len();
        let mut new_vertices: Vec<Vertex> = Vec::new();
        let mut new_indices: Vec<usize> = vec![0; original_count];

        for i in 0..original_count {
            let candidate = self.vertices[i];
            let found = new_vertices.iter().position(|existing| {
                (candidate.position - existing.position).norm() < epsilon
                    && (candidate.normal - existing.normal).norm() < epsilon
                    && (candidate.texcoord - existing.texcoord).norm() < epsilon as f32
            });

            new_indices[i] = match found {
                Some(j) => j,
                None => {
                    new_vertices.push(candidate);
                    new_vertices.len() - 1
                }
            };
        }

        for triangle in &mut self.triangles {
            for idx in &mut triangle.indices {
                *idx = new_indices[*idx];
            }
        }

        self.vertices = new_vertices;
        original_count - self.vertices.len()
    }

    /// Remove orphaned vertices (vertices not referenced by any triangle)
    /// Returns the number of vertices removed
    pub fn remove_orphaned_vertices(&mut self) -> usize {
        if self.triangles.is_empty() {
            let removed = self.vertices.len();
            self.vertices.clear();
            return removed;
        }

        let mut used_vertices = vec![false; self.vertices.len()];
        for triangle in &self.triangles {
            for &idx in &triangle.indices {
                used_vertices[idx] = true;
            }
        }

        let mut new_indices = vec![0; self.vertices.len()];
        let mut new_vertices = Vec::new();
        for (old_idx, &used) in used_vertices.iter().enumerate() {
            if used {
                new_indices[old_idx] = new_vertices.len();
                new_vertices.push(self.vertices[old_idx]);
            }
        }

        for triangle in &mut self.triangles {
            for idx in &mut triangle.indices {
                *idx = new_indices[*idx];
            }
        }

        let removed = self.vertices.len() - new_vertices.len();
        self.vertices = new_vertices;
        removed
    }

    /// Recompute vertex normals from triangle geometry
    /// This calculates face normals and averages them at shared vertices
    pub fn recompute_normals(&mut self) {
        if self.vertices.is_empty() || self.triangles.is_empty() {
            return;
        }

        let mut normal_sums: Vec<Vector3<f64>> = vec![Vector3::zeros(); self.vertices.len()];

        for triangle in &self.triangles {
            let v0 = &self.vertices[triangle.indices[0]];
            let v1 = &self.vertices[triangle.indices[1]];
            let v2 = &self.vertices[triangle.indices[2]];

            // Unnormalized cross product weights each face by its area
            let face_normal = (v1.position - v0.position).cross(&(v2.position - v0.position));
            if face_normal.norm() > 1e-10 {
                for &idx in &triangle.indices {
                    normal_sums[idx] += face_normal;
                }
            }
        }

        for (vertex, sum) in self.vertices.iter_mut().zip(normal_sums) {
            vertex.normal = sum
                .try_normalize(1e-12)
                .unwrap_or_else(|| Vector3::new(0.0, 0.0, 1.0));
        }
    }
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new()
    }
}
