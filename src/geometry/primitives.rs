// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Primitive solids used as boolean operands

use super::{Mesh, Triangle, Vertex};
use nalgebra::{Point3, Vector2, Vector3};
use std::f64::consts::PI;

/// Closed primitive solids with outward facing, counter-clockwise triangles
#[derive(Debug, Clone, Copy)]
pub enum Primitive {
    Cube { size: Vector3<f64>, center: bool },
    Sphere { r: f64, segments: u32 },
    Cylinder { h: f64, r: f64, segments: u32 },
    Cone { h: f64, r1: f64, r2: f64, segments: u32 },
}

impl Primitive {
    pub fn cube(size: Vector3<f64>, center: bool) -> Self {
        Self::Cube { size, center }
    }

    pub fn unit_cube() -> Self {
        Self::cube(Vector3::new(1.0, 1.0, 1.0), false)
    }

    pub fn sphere(r: f64, segments: u32) -> Self {
        Self::Sphere {
            r,
            segments: segments_or_default(segments),
        }
    }

    pub fn cylinder(h: f64, r: f64, segments: u32) -> Self {
        Self::Cylinder {
            h,
            r,
            segments: segments_or_default(segments),
        }
    }

    pub fn cone(h: f64, r1: f64, r2: f64, segments: u32) -> Self {
        Self::Cone {
            h,
            r1,
            r2,
            segments: segments_or_default(segments),
        }
    }

    pub fn to_mesh(&self) -> Mesh {
        match *self {
            Self::Cube { size, center } => generate_cube_mesh(size, center),
            Self::Sphere { r, segments } => generate_sphere_mesh(r, segments),
            Self::Cylinder { h, r, segments } => generate_cone_mesh(h, r, r, segments),
            Self::Cone { h, r1, r2, segments } => generate_cone_mesh(h, r1, r2, segments),
        }
    }
}

fn segments_or_default(segments: u32) -> u32 {
    if segments >= 3 {
        segments
    } else {
        32
    }
}

fn generate_cube_mesh(size: Vector3<f64>, center: bool) -> Mesh {
    let mut mesh = Mesh::with_capacity(24, 12);
    let min = if center { -size / 2.0 } else { Vector3::zeros() };
    let max = min + size;

    let corner = |i: usize| {
        Point3::new(
            if i & 1 == 0 { min.x } else { max.x },
            if i & 2 == 0 { min.y } else { max.y },
            if i & 4 == 0 { min.z } else { max.z },
        )
    };

    // Each side lists its corners counter-clockwise seen from outside
    let sides: [([usize; 4], Vector3<f64>); 6] = [
        ([4, 5, 7, 6], Vector3::new(0.0, 0.0, 1.0)),
        ([1, 0, 2, 3], Vector3::new(0.0, 0.0, -1.0)),
        ([5, 1, 3, 7], Vector3::new(1.0, 0.0, 0.0)),
        ([0, 4, 6, 2], Vector3::new(-1.0, 0.0, 0.0)),
        ([6, 7, 3, 2], Vector3::new(0.0, 1.0, 0.0)),
        ([0, 1, 5, 4], Vector3::new(0.0, -1.0, 0.0)),
    ];
    let uvs = [
        Vector2::new(0.0, 0.0),
        Vector2::new(1.0, 0.0),
        Vector2::new(1.0, 1.0),
        Vector2::new(0.0, 1.0),
    ];

    for (corners, normal) in sides {
        let base = mesh.vertex_count();
        for (k, &c) in corners.iter().enumerate() {
            mesh.add_vertex(Vertex::with_texcoord(corner(c), normal, uvs[k]));
        }
        mesh.add_triangle(Triangle::new([base, base + 1, base + 2]));
        mesh.add_triangle(Triangle::new([base, base + 2, base + 3]));
    }

    mesh
}

fn generate_sphere_mesh(radius: f64, segments: u32) -> Mesh {
    let stacks = (segments / 2).max(2) as usize;
    let slices = segments as usize;
    let mut mesh = Mesh::new();

    let north = mesh.add_vertex(Vertex::with_texcoord(
        Point3::new(0.0, 0.0, radius),
        Vector3::z(),
        Vector2::new(0.5, 1.0),
    ));

    // Interior rings, one vertex per slice
    for i in 1..stacks {
        let phi = PI * i as f64 / stacks as f64;
        for j in 0..slices {
            let theta = 2.0 * PI * j as f64 / slices as f64;
            let normal = Vector3::new(phi.sin() * theta.cos(), phi.sin() * theta.sin(), phi.cos());
            mesh.add_vertex(Vertex::with_texcoord(
                Point3::from(normal * radius),
                normal,
                Vector2::new(j as f32 / slices as f32, 1.0 - i as f32 / stacks as f32),
            ));
        }
    }

    let south = mesh.add_vertex(Vertex::with_texcoord(
        Point3::new(0.0, 0.0, -radius),
        -Vector3::z(),
        Vector2::new(0.5, 0.0),
    ));

    let ring = |i: usize, j: usize| 1 + (i - 1) * slices + (j % slices);

    for j in 0..slices {
        mesh.add_triangle(Triangle::new([north, ring(1, j), ring(1, j + 1)]));
    }
    for i in 1..stacks - 1 {
        for j in 0..slices {
            let a = ring(i, j);
            let b = ring(i + 1, j);
            let c = ring(i + 1, j + 1);
            let d = ring(i, j + 1);
            mesh.add_triangle(Triangle::new([a, b, c]));
            mesh.add_triangle(Triangle::new([a, c, d]));
        }
    }
    for j in 0..slices {
        mesh.add_triangle(Triangle::new([south, ring(stacks - 1, j + 1), ring(stacks - 1, j)]));
    }

    mesh
}

fn generate_cone_mesh(height: f64, r1: f64, r2: f64, segments: u32) -> Mesh {
    let segments = segments as usize;
    let mut mesh = Mesh::new();

    let bottom_center = mesh.add_vertex(Vertex::new(Point3::origin(), -Vector3::z()));
    let top_center = mesh.add_vertex(Vertex::new(Point3::new(0.0, 0.0, height), Vector3::z()));

    let mut bottom = Vec::with_capacity(segments);
    let mut top = Vec::with_capacity(segments);
    for i in 0..segments {
        let angle = 2.0 * PI * i as f64 / segments as f64;
        let (sin, cos) = angle.sin_cos();
        let u = i as f32 / segments as f32;
        bottom.push(mesh.add_vertex(Vertex::with_texcoord(
            Point3::new(r1 * cos, r1 * sin, 0.0),
            Vector3::new(cos, sin, 0.0),
            Vector2::new(u, 0.0),
        )));
        top.push(mesh.add_vertex(Vertex::with_texcoord(
            Point3::new(r2 * cos, r2 * sin, height),
            Vector3::new(cos, sin, 0.0),
            Vector2::new(u, 1.0),
        )));
    }

    for i in 0..segments {
        let next = (i + 1) % segments;
        mesh.add_triangle(Triangle::new([bottom_center, bottom[next], bottom[i]]));
        mesh.add_triangle(Triangle::new([top_center, top[i], top[next]]));
        mesh.add_triangle(Triangle::new([bottom[i], bottom[next], top[i]]));
        mesh.add_triangle(Triangle::new([top[i], bottom[next], top[next]]));
    }

    // Shared rim vertices, so average the cap and side contributions
    mesh.recompute_normals();
    mesh
}
