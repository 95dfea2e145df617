// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Triangles of a solid and their classification against the other solid

use super::plane::Plane;
use super::ray::Ray;
use super::solid::Solid;
use super::vertex::{VertexArena, VertexId, VertexStatus};
use super::{CancelToken, CsgError, Environment};
use crate::geometry::analytics::triangle_area;
use crate::geometry::BoundingBox;
use log::trace;
use nalgebra::Point3;
use rand::Rng;

/// Face classification relative to the other solid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaceStatus {
    Unknown,
    Inside,
    Outside,
    /// Coplanar with a face of the other solid, normals aligned
    Same,
    /// Coplanar with a face of the other solid, normals opposed
    Opposite,
}

/// Result of casting a ray from a face
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RayTrace {
    Classified { status: FaceStatus, retries: usize },
    /// The ray kept lying in some plane of the other solid
    Indeterminate { attempts: usize },
}

#[derive(Debug, Clone)]
pub struct Face {
    vertices: [VertexId; 3],
    corners: [Point3<f64>; 3],
    plane: Plane,
    material: i32,
    status: FaceStatus,
    bounds: BoundingBox,
    scan_start: usize,
}

impl Face {
    /// Face over three arena vertices. Pieces of a split face pass their
    /// parent's plane so it never drifts.
    pub fn new(vertices: [VertexId; 3], arena: &VertexArena, plane: Plane, material: i32) -> Self {
        let corners = vertices.map(|id| arena.position(id));
        Self {
            vertices,
            corners,
            plane,
            material,
            status: FaceStatus::Unknown,
            bounds: BoundingBox::from_points(corners.iter()),
            scan_start: 0,
        }
    }

    /// Two corners coincide, or the triangle has no area
    pub fn is_degenerate(corners: &[Point3<f64>; 3], env: &Environment) -> bool {
        env.same_point(&corners[0], &corners[1])
            || env.same_point(&corners[1], &corners[2])
            || env.same_point(&corners[2], &corners[0])
            || triangle_area(&corners[0], &corners[1], &corners[2]) < env.near_zero
    }

    pub fn vertices(&self) -> [VertexId; 3] {
        self.vertices
    }

    pub fn corners(&self) -> &[Point3<f64>; 3] {
        &self.corners
    }

    pub fn plane(&self) -> &Plane {
        &self.plane
    }

    pub fn material(&self) -> i32 {
        self.material
    }

    pub fn status(&self) -> FaceStatus {
        self.status
    }

    pub(crate) fn set_status(&mut self, status: FaceStatus) {
        self.status = status;
    }

    pub fn bounds(&self) -> &BoundingBox {
        &self.bounds
    }

    /// First face of the other solid still to compare against
    pub fn scan_start(&self) -> usize {
        self.scan_start
    }

    pub(crate) fn set_scan_start(&mut self, scan_start: usize) {
        self.scan_start = scan_start;
    }

    pub fn centroid(&self) -> Point3<f64> {
        Point3::from((self.corners[0].coords + self.corners[1].coords + self.corners[2].coords) / 3.0)
    }

    pub fn area(&self) -> f64 {
        triangle_area(&self.corners[0], &self.corners[1], &self.corners[2])
    }

    /// Barycentric weights of a point projected onto the face
    pub fn barycentric(&self, point: &Point3<f64>) -> [f64; 3] {
        let v0 = self.corners[1] - self.corners[0];
        let v1 = self.corners[2] - self.corners[0];
        let v2 = point - self.corners[0];
        let d00 = v0.dot(&v0);
        let d01 = v0.dot(&v1);
        let d11 = v1.dot(&v1);
        let d20 = v2.dot(&v0);
        let d21 = v2.dot(&v1);
        let denom = d00 * d11 - d01 * d01;
        if denom.abs() < f64::MIN_POSITIVE {
            return [1.0, 0.0, 0.0];
        }
        let v = (d11 * d20 - d01 * d21) / denom;
        let w = (d00 * d21 - d01 * d20) / denom;
        [1.0 - v - w, v, w]
    }

    /// Point lies on the face plane and within the triangle, both up to `tolerance`
    pub fn contains_point(&self, point: &Point3<f64>, tolerance: f64) -> bool {
        if self.plane.distance(point).abs() > tolerance {
            return false;
        }
        let slack = self.barycentric_slack(tolerance);
        self.barycentric(point).iter().all(|&w| w >= -slack)
    }

    /// Distance `tolerance` expressed as a barycentric weight of this face
    fn barycentric_slack(&self, tolerance: f64) -> f64 {
        let longest = (self.corners[1] - self.corners[0])
            .norm()
            .max((self.corners[2] - self.corners[1]).norm())
            .max((self.corners[0] - self.corners[2]).norm());
        tolerance / longest.max(f64::MIN_POSITIVE)
    }

    /// Same face with reversed winding and flipped plane
    pub fn inverted(&self, vertices: [VertexId; 3]) -> Face {
        Face {
            vertices,
            corners: [self.corners[0], self.corners[2], self.corners[1]],
            plane: self.plane.flip(),
            ..self.clone()
        }
    }

    /// Return the face and its vertices to `Unknown`
    pub fn reset_status(&mut self, arena: &mut VertexArena) {
        self.status = FaceStatus::Unknown;
        for id in self.vertices {
            arena.set_status(id, VertexStatus::Unknown);
        }
    }

    /// Adopt the status of an already classified vertex. When vertices
    /// disagree all three become boundary vertices and `false` is returned.
    pub fn simple_classify(&mut self, arena: &mut VertexArena) -> bool {
        let statuses = self.vertices.map(|id| arena.status(id));
        let inside = statuses.contains(&VertexStatus::Inside);
        let outside = statuses.contains(&VertexStatus::Outside);

        match (inside, outside) {
            (true, true) => {
                for id in self.vertices {
                    arena.set_status(id, VertexStatus::Boundary);
                }
                false
            }
            (true, false) => {
                self.status = FaceStatus::Inside;
                true
            }
            (false, true) => {
                self.status = FaceStatus::Outside;
                true
            }
            (false, false) => false,
        }
    }

    /// Cast a ray from the centroid along the normal and classify by the
    /// closest face of `other` it passes through.
    pub fn ray_trace_classify<R: Rng>(
        &self,
        other: &Solid,
        env: &Environment,
        cancel: &CancelToken,
        rng: &mut R,
    ) -> Result<RayTrace, CsgError> {
        let centroid = self.centroid();
        let mut ray = match Ray::new(centroid, self.plane.normal(), env.near_zero) {
            Some(ray) => ray,
            None => return Err(CsgError::construction("face normal is degenerate")),
        };

        let mut retries = 0;
        'cast: loop {
            let mut closest: Option<(f64, &Face)> = None;

            for candidate in other.faces() {
                cancel.check()?;

                let alignment = candidate.plane.normal().dot(&ray.direction());
                let offset = candidate.plane.distance(&ray.origin());

                if env.is_zero(alignment) {
                    if offset.abs() < env.on_plane {
                        // Ray runs inside this plane; no reliable answer
                        if retries >= env.max_ray_retries {
                            return Ok(RayTrace::Indeterminate {
                                attempts: retries + 1,
                            });
                        }
                        retries += 1;
                        ray.perturb(rng, env.ray_perturbation);
                        trace!("perturbing classification ray, attempt {}", retries);
                        continue 'cast;
                    }
                    continue;
                }

                let slack = candidate.barycentric_slack(env.on_plane);
                let Some(distance) = ray.intersects_triangle(candidate.corners(), env.near_zero, slack)
                else {
                    continue;
                };

                if distance.abs() < env.on_plane {
                    if candidate.contains_point(&ray.origin(), env.on_plane) {
                        closest = Some((0.0, candidate));
                        break;
                    }
                } else if distance > 0.0
                    && closest.map_or(true, |(best, _)| distance < best)
                {
                    closest = Some((distance, candidate));
                }
            }

            let status = match closest {
                None => FaceStatus::Outside,
                Some((distance, face)) => {
                    let alignment = face.plane.normal().dot(&ray.direction());
                    match (distance == 0.0, alignment > 0.0) {
                        (true, true) => FaceStatus::Same,
                        (true, false) => FaceStatus::Opposite,
                        (false, true) => FaceStatus::Inside,
                        (false, false) => FaceStatus::Outside,
                    }
                }
            };
            return Ok(RayTrace::Classified { status, retries });
        }
    }
}
