// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

use crate::geometry::Vertex;
use nalgebra::{Point3, Vector3};

/// Position of a point relative to a plane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Back,
    On,
    Front,
}

impl Side {
    pub fn from_distance(distance: f64, tolerance: f64) -> Self {
        if distance > tolerance {
            Side::Front
        } else if distance < -tolerance {
            Side::Back
        } else {
            Side::On
        }
    }

    pub fn sign(self) -> i8 {
        match self {
            Side::Back => -1,
            Side::On => 0,
            Side::Front => 1,
        }
    }
}

/// Immutable plane `normal · p = dot` with a unit normal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    normal: Vector3<f64>,
    dot: f64,
}

impl Plane {
    /// Plane through three points wound counter-clockwise around the normal.
    /// `None` when the points are collinear within `near_zero`.
    pub fn from_points(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>, near_zero: f64) -> Option<Self> {
        let normal = (b - a).cross(&(c - a)).try_normalize(near_zero)?;
        Some(Self {
            normal,
            dot: normal.dot(&a.coords),
        })
    }

    pub fn from_vertices(a: &Vertex, b: &Vertex, c: &Vertex, near_zero: f64) -> Option<Self> {
        Self::from_points(&a.position, &b.position, &c.position, near_zero)
    }

    pub fn normal(&self) -> Vector3<f64> {
        self.normal
    }

    pub fn dot(&self) -> f64 {
        self.dot
    }

    /// Signed distance, positive on the side the normal points to
    pub fn distance(&self, point: &Point3<f64>) -> f64 {
        self.normal.dot(&point.coords) - self.dot
    }

    pub fn classify(&self, point: &Point3<f64>, tolerance: f64) -> Side {
        Side::from_distance(self.distance(point), tolerance)
    }

    pub fn flip(&self) -> Plane {
        Plane {
            normal: -self.normal,
            dot: -self.dot,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plane_from_points() {
        let plane = Plane::from_points(
            &Point3::new(0.0, 0.0, 2.0),
            &Point3::new(1.0, 0.0, 2.0),
            &Point3::new(0.0, 1.0, 2.0),
            1e-10,
        )
        .unwrap();
        assert_eq!(plane.normal(), Vector3::z());
        assert_eq!(plane.dot(), 2.0);
        assert_eq!(plane.distance(&Point3::new(5.0, 5.0, 3.0)), 1.0);
    }

    #[test]
    fn test_collinear_points_have_no_plane() {
        let plane = Plane::from_points(
            &Point3::new(0.0, 0.0, 0.0),
            &Point3::new(1.0, 1.0, 1.0),
            &Point3::new(2.0, 2.0, 2.0),
            1e-10,
        );
        assert!(plane.is_none());
    }

    #[test]
    fn test_classify_and_flip() {
        let plane = Plane::from_points(
            &Point3::origin(),
            &Point3::new(1.0, 0.0, 0.0),
            &Point3::new(0.0, 1.0, 0.0),
            1e-10,
        )
        .unwrap();
        assert_eq!(plane.classify(&Point3::new(0.0, 0.0, 1.0), 1e-7), Side::Front);
        assert_eq!(plane.classify(&Point3::new(0.0, 0.0, -1.0), 1e-7), Side::Back);
        assert_eq!(plane.classify(&Point3::new(3.0, 4.0, 1e-9), 1e-7), Side::On);

        let flipped = plane.flip();
        assert_eq!(flipped.classify(&Point3::new(0.0, 0.0, 1.0), 1e-7), Side::Back);
        assert_eq!(flipped.normal(), -plane.normal());
        assert_eq!(Side::Front.sign(), 1);
    }
}
