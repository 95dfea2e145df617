// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! STL import and export

use crate::geometry::{Mesh, Triangle, Vertex};
use anyhow::{Context, Result};
use nalgebra::{Point3, Vector3};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;
use stl_io::{Normal, Triangle as StlTriangle, Vertex as StlVertex};

/// Read an ASCII or binary STL stream. Every facet gets its own three
/// vertices carrying the facet normal.
pub fn read_stl<R: Read + Seek>(reader: &mut R) -> Result<Mesh> {
    let stl = stl_io::read_stl(reader).context("Failed to read STL data")?;

    let mut mesh = Mesh::with_capacity(stl.faces.len() * 3, stl.faces.len());
    for face in &stl.faces {
        let normal = Vector3::new(
            face.normal[0] as f64,
            face.normal[1] as f64,
            face.normal[2] as f64,
        );

        let mut indices = [0usize; 3];
        for (slot, &index) in indices.iter_mut().zip(face.vertices.iter()) {
            let p = stl
                .vertices
                .get(index)
                .with_context(|| format!("STL facet references missing vertex {}", index))?;
            *slot = mesh.add_vertex(Vertex::new(
                Point3::new(p[0] as f64, p[1] as f64, p[2] as f64),
                normal,
            ));
        }
        mesh.add_triangle(Triangle::new(indices));
    }

    Ok(mesh)
}

/// Write a binary STL stream. Facet normals are computed from the triangle
/// geometry rather than from vertex normals.
pub fn write_stl<W: Write>(mesh: &Mesh, writer: &mut W) -> Result<()> {
    let triangles: Vec<StlTriangle> = mesh
        .triangles
        .iter()
        .map(|tri| {
            let corner = |i: usize| {
                let p = &mesh.vertices[tri.indices[i]].position;
                StlVertex::new([p.x as f32, p.y as f32, p.z as f32])
            };
            let normal = tri.face_normal(mesh).unwrap_or_else(Vector3::zeros);

            StlTriangle {
                normal: Normal::new([normal.x as f32, normal.y as f32, normal.z as f32]),
                vertices: [corner(0), corner(1), corner(2)],
            }
        })
        .collect();

    stl_io::write_stl(writer, triangles.iter()).context("Failed to write STL data")?;
    Ok(())
}

/// Load an STL file into a mesh
pub fn load_stl<P: AsRef<Path>>(path: P) -> Result<Mesh> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("Failed to open STL file: {:?}", path))?;
    let mut reader = BufReader::new(file);
    read_stl(&mut reader).with_context(|| format!("Failed to load STL file: {:?}", path))
}

/// Save a mesh as a binary STL file
pub fn save_stl<P: AsRef<Path>>(mesh: &Mesh, path: P) -> Result<()> {
    let path = path.as_ref();
    let file =
        File::create(path).with_context(|| format!("Failed to create STL file: {:?}", path))?;
    let mut writer = BufWriter::new(file);
    write_stl(mesh, &mut writer)?;
    writer
        .flush()
        .with_context(|| format!("Failed to flush STL file: {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{analytics, Primitive};
    use std::io::Cursor;
    use tempfile::TempDir;

    #[test]
    fn test_stream_round_trip() -> Result<()> {
        let cube = Primitive::unit_cube().to_mesh();
        let mut buffer = Vec::new();
        write_stl(&cube, &mut buffer)?;

        // 80 byte header, facet count, 50 bytes per facet
        assert_eq!(buffer.len(), 84 + 50 * cube.triangle_count());

        let loaded = read_stl(&mut Cursor::new(buffer))?;
        assert_eq!(loaded.triangle_count(), cube.triangle_count());
        assert!((analytics::signed_volume(&loaded) - 1.0).abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn test_file_round_trip() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("sphere.stl");
        let sphere = Primitive::sphere(2.0, 16).to_mesh();

        save_stl(&sphere, &path)?;
        let loaded = load_stl(&path)?;
        assert_eq!(loaded.triangle_count(), sphere.triangle_count());
        Ok(())
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = load_stl("/nonexistent/part.stl").unwrap_err();
        assert!(format!("{}", err).contains("part.stl"));
    }
}
