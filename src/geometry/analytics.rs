// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometry analytics used to verify boolean results

use super::{BoundingBox, Mesh};
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Geometry statistics and analytics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeometryStats {
    /// Absolute enclosed volume
    pub volume: f64,
    /// Signed volume; positive when triangles wind outward
    pub signed_volume: f64,
    /// Total surface area
    pub surface_area: f64,
    /// Bounding box [min_x, min_y, min_z, max_x, max_y, max_z]
    pub bbox: [f64; 6],
    pub vertex_count: usize,
    pub triangle_count: usize,
    /// Every index-based edge is shared by exactly two triangles
    pub is_watertight: bool,
}

impl GeometryStats {
    pub fn empty() -> Self {
        Self {
            volume: 0.0,
            signed_volume: 0.0,
            surface_area: 0.0,
            bbox: [0.0; 6],
            vertex_count: 0,
            triangle_count: 0,
            is_watertight: false,
        }
    }

    pub fn print(&self) {
        println!("Volume:        {:>14.6}", self.volume);
        println!("Signed volume: {:>14.6}", self.signed_volume);
        println!("Surface area:  {:>14.6}", self.surface_area);
        println!(
            "Bounds:        ({:.4}, {:.4}, {:.4}) .. ({:.4}, {:.4}, {:.4})",
            self.bbox[0], self.bbox[1], self.bbox[2], self.bbox[3], self.bbox[4], self.bbox[5]
        );
        println!("Vertices:      {:>14}", self.vertex_count);
        println!("Triangles:     {:>14}", self.triangle_count);
        println!(
            "Watertight:    {:>14}",
            if self.is_watertight { "yes" } else { "no" }
        );
    }
}

/// Analyze mesh geometry and compute statistics
pub fn analyze(mesh: &Mesh) -> GeometryStats {
    if mesh.vertices.is_empty() || mesh.triangles.is_empty() {
        return GeometryStats::empty();
    }

    let bbox = mesh.bounding_box();
    let signed_volume = signed_volume(mesh);

    GeometryStats {
        volume: signed_volume.abs(),
        signed_volume,
        surface_area: surface_area(mesh),
        bbox: bbox_array(&bbox),
        vertex_count: mesh.vertices.len(),
        triangle_count: mesh.triangles.len(),
        is_watertight: is_closed(mesh),
    }
}

fn bbox_array(bbox: &BoundingBox) -> [f64; 6] {
    [
        bbox.min.x, bbox.min.y, bbox.min.z, bbox.max.x, bbox.max.y, bbox.max.z,
    ]
}

/// Sum of signed tetrahedra against the origin (divergence theorem).
/// Exact for any closed, consistently wound triangle set, T-junctions included
pub fn signed_volume(mesh: &Mesh) -> f64 {
    mesh.triangles
        .iter()
        .map(|triangle| {
            let v0 = &mesh.vertices[triangle.indices[0]].position;
            let v1 = &mesh.vertices[triangle.indices[1]].position;
            let v2 = &mesh.vertices[triangle.indices[2]].position;
            v0.coords.dot(&v1.coords.cross(&v2.coords)) / 6.0
        })
        .sum()
}

pub fn surface_area(mesh: &Mesh) -> f64 {
    mesh.triangles
        .iter()
        .map(|triangle| {
            triangle_area(
                &mesh.vertices[triangle.indices[0]].position,
                &mesh.vertices[triangle.indices[1]].position,
                &mesh.vertices[triangle.indices[2]].position,
            )
        })
        .sum()
}

pub fn triangle_area(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> f64 {
    (b - a).cross(&(c - a)).norm() / 2.0
}

fn edge_counts(mesh: &Mesh) -> HashMap<(usize, usize), u32> {
    let mut counts = HashMap::new();
    for triangle in &mesh.triangles {
        for i in 0..3 {
            let a = triangle.indices[i];
            let b = triangle.indices[(i + 1) % 3];
            let edge = if a < b { (a, b) } else { (b, a) };
            *counts.entry(edge).or_insert(0) += 1;
        }
    }
    counts
}

/// Check if mesh is manifold (each edge shared by at most 2 triangles)
pub fn is_manifold(mesh: &Mesh) -> bool {
    edge_counts(mesh).values().all(|&count| count <= 2)
}

/// Check if mesh is closed (each edge shared by exactly 2 triangles)
pub fn is_closed(mesh: &Mesh) -> bool {
    !mesh.triangles.is_empty() && edge_counts(mesh).values().all(|&count| count == 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Primitive;
    use nalgebra::Vector3;

    #[test]
    fn test_analyze_cube() {
        let mesh = Primitive::cube(Vector3::new(10.0, 10.0, 10.0), true).to_mesh();
        let stats = analyze(&mesh);

        assert!((stats.volume - 1000.0).abs() < 1e-9);
        assert!(stats.signed_volume > 0.0);
        assert!((stats.surface_area - 600.0).abs() < 1e-9);
        assert_eq!(stats.triangle_count, 12);
        assert_eq!(stats.bbox, [-5.0, -5.0, -5.0, 5.0, 5.0, 5.0]);
        // Flat-shaded cube keeps separate vertices per side
        assert!(!stats.is_watertight);
    }

    #[test]
    fn test_welded_cube_is_watertight() {
        let mut mesh = Primitive::cube(Vector3::new(1.0, 1.0, 1.0), false).to_mesh();
        for v in &mut mesh.vertices {
            v.normal = Vector3::zeros();
            v.texcoord = nalgebra::Vector2::zeros();
        }
        mesh.weld_vertices(1e-9);
        assert_eq!(mesh.vertex_count(), 8);
        assert!(is_closed(&mesh));
    }

    #[test]
    fn test_empty_mesh() {
        let stats = analyze(&Mesh::new());
        assert_eq!(stats.volume, 0.0);
        assert_eq!(stats.triangle_count, 0);
    }
}
