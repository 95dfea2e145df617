// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Rays: the line where two face planes meet, and the probe used to classify faces

use super::plane::Plane;
use nalgebra::{Point3, Vector3};
use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    origin: Point3<f64>,
    direction: Vector3<f64>,
}

impl Ray {
    /// Ray with a normalized copy of `direction`; `None` if it is shorter than `near_zero`
    pub fn new(origin: Point3<f64>, direction: Vector3<f64>, near_zero: f64) -> Option<Self> {
        Some(Self {
            origin,
            direction: direction.try_normalize(near_zero)?,
        })
    }

    /// Ray from `from` through `to`
    pub fn through_points(from: &Point3<f64>, to: &Point3<f64>, near_zero: f64) -> Option<Self> {
        Self::new(*from, to - from, near_zero)
    }

    /// Intersection line of two planes, `None` when they are parallel.
    ///
    /// The origin is solved on the coordinate plane perpendicular to the
    /// dominant direction component.
    pub fn from_planes(first: &Plane, second: &Plane, near_zero: f64) -> Option<Self> {
        let (n1, d1) = (first.normal(), first.dot());
        let (n2, d2) = (second.normal(), second.dot());
        let direction = n1.cross(&n2);
        if direction.norm() < near_zero {
            return None;
        }

        let abs = direction.abs();
        let origin = if abs.x >= abs.y && abs.x >= abs.z {
            Point3::new(
                0.0,
                (d1 * n2.z - d2 * n1.z) / direction.x,
                (n1.y * d2 - n2.y * d1) / direction.x,
            )
        } else if abs.y >= abs.z {
            Point3::new(
                (d2 * n1.z - d1 * n2.z) / direction.y,
                0.0,
                (d1 * n2.x - d2 * n1.x) / direction.y,
            )
        } else {
            Point3::new(
                (d1 * n2.y - d2 * n1.y) / direction.z,
                (n1.x * d2 - n2.x * d1) / direction.z,
                0.0,
            )
        };

        Self::new(origin, direction, near_zero)
    }

    pub fn origin(&self) -> Point3<f64> {
        self.origin
    }

    pub fn direction(&self) -> Vector3<f64> {
        self.direction
    }

    pub fn point_at(&self, distance: f64) -> Point3<f64> {
        self.origin + self.direction * distance
    }

    /// Signed distance of a point's projection along the ray
    pub fn distance_along(&self, point: &Point3<f64>) -> f64 {
        (point - self.origin).dot(&self.direction)
    }

    /// Where the ray meets a plane, as a distance along the ray.
    /// `None` when the ray runs parallel to the plane.
    pub fn plane_intersection(&self, plane: &Plane, near_zero: f64) -> Option<f64> {
        let denominator = plane.normal().dot(&self.direction);
        if denominator.abs() < near_zero {
            return None;
        }
        Some(-plane.distance(&self.origin) / denominator)
    }

    /// Möller–Trumbore test. Returns the distance along the ray of the hit,
    /// accepting points up to `tolerance` outside the triangle in barycentric
    /// terms. Hits behind the origin are returned with a negative distance.
    pub fn intersects_triangle(
        &self,
        corners: &[Point3<f64>; 3],
        near_zero: f64,
        tolerance: f64,
    ) -> Option<f64> {
        let edge1 = corners[1] - corners[0];
        let edge2 = corners[2] - corners[0];
        let h = self.direction.cross(&edge2);
        let a = edge1.dot(&h);
        if a.abs() < near_zero {
            return None;
        }

        let f = 1.0 / a;
        let s = self.origin - corners[0];
        let u = f * s.dot(&h);
        if u < -tolerance || u > 1.0 + tolerance {
            return None;
        }

        let q = s.cross(&edge1);
        let v = f * self.direction.dot(&q);
        if v < -tolerance || u + v > 1.0 + tolerance {
            return None;
        }

        Some(f * edge2.dot(&q))
    }

    /// Nudge the direction by a random offset of at most `magnitude` per component
    pub fn perturb<R: Rng>(&mut self, rng: &mut R, magnitude: f64) {
        let offset = Vector3::new(
            rng.gen_range(-magnitude..=magnitude),
            rng.gen_range(-magnitude..=magnitude),
            rng.gen_range(-magnitude..=magnitude),
        );
        let nudged = self.direction + offset;
        if let Some(direction) = nudged.try_normalize(f64::EPSILON) {
            self.direction = direction;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn plane(a: [f64; 3], b: [f64; 3], c: [f64; 3]) -> Plane {
        Plane::from_points(&a.into(), &b.into(), &c.into(), 1e-10).unwrap()
    }

    #[test]
    fn test_ray_from_planes_lies_on_both() {
        let floor = plane([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]);
        let wall = plane([1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [1.0, 0.0, 1.0]);

        let ray = Ray::from_planes(&floor, &wall, 1e-10).unwrap();
        assert_relative_eq!(ray.direction().dot(&Vector3::y()).abs(), 1.0);
        for t in [-3.0, 0.0, 2.5] {
            let p = ray.point_at(t);
            assert!(floor.distance(&p).abs() < 1e-12);
            assert!(wall.distance(&p).abs() < 1e-12);
        }
    }

    #[test]
    fn test_ray_from_oblique_planes() {
        let a = plane([0.0, 0.0, 0.3], [1.0, 0.2, 0.0], [0.0, 1.0, 0.5]);
        let b = plane([0.5, 0.0, 0.0], [0.4, 1.0, 0.2], [0.7, 0.3, 1.0]);
        let ray = Ray::from_planes(&a, &b, 1e-10).unwrap();
        for t in [-1.0, 0.0, 1.0] {
            let p = ray.point_at(t);
            assert!(a.distance(&p).abs() < 1e-9);
            assert!(b.distance(&p).abs() < 1e-9);
        }
    }

    #[test]
    fn test_parallel_planes_have_no_ray() {
        let low = plane([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]);
        let high = plane([0.0, 0.0, 1.0], [1.0, 0.0, 1.0], [0.0, 1.0, 1.0]);
        assert!(Ray::from_planes(&low, &high, 1e-10).is_none());
    }

    #[test]
    fn test_intersects_triangle() {
        let corners = [
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(1.0, 0.0, 1.0),
            Point3::new(0.0, 1.0, 1.0),
        ];
        let hit = Ray::new(Point3::new(0.2, 0.2, 0.0), Vector3::z(), 1e-10).unwrap();
        assert_relative_eq!(hit.intersects_triangle(&corners, 1e-12, 1e-9).unwrap(), 1.0);

        let miss = Ray::new(Point3::new(0.8, 0.8, 0.0), Vector3::z(), 1e-10).unwrap();
        assert!(miss.intersects_triangle(&corners, 1e-12, 1e-9).is_none());

        let behind = Ray::new(Point3::new(0.2, 0.2, 2.0), Vector3::z(), 1e-10).unwrap();
        assert!(behind.intersects_triangle(&corners, 1e-12, 1e-9).unwrap() < 0.0);
    }

    #[test]
    fn test_plane_intersection_and_perturb() {
        let floor = plane([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]);
        let mut ray = Ray::through_points(&Point3::new(0.0, 0.0, 2.0), &Point3::origin(), 1e-10).unwrap();
        assert_relative_eq!(ray.plane_intersection(&floor, 1e-10).unwrap(), 2.0);

        let mut rng = StdRng::seed_from_u64(7);
        ray.perturb(&mut rng, 1e-3);
        assert_relative_eq!(ray.direction().norm(), 1.0, epsilon = 1e-12);
        assert!(ray.direction().z < -0.99);

        let flat = Ray::new(Point3::origin(), Vector3::x(), 1e-10).unwrap();
        assert!(flat.plane_intersection(&floor, 1e-10).is_none());
    }
}
