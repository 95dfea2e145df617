// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! The part of an intersection ray that lies within one face

use super::plane::Side;
use super::ray::Ray;
use nalgebra::Point3;

/// A corner of a face
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Corner {
    V1,
    V2,
    V3,
}

impl Corner {
    pub const ALL: [Corner; 3] = [Corner::V1, Corner::V2, Corner::V3];

    pub fn index(self) -> usize {
        match self {
            Corner::V1 => 0,
            Corner::V2 => 1,
            Corner::V3 => 2,
        }
    }

    pub fn from_index(index: usize) -> Corner {
        Corner::ALL[index % 3]
    }
}

/// An edge of a face, named by its corners in winding order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Edge {
    E12,
    E23,
    E31,
}

impl Edge {
    pub const ALL: [Edge; 3] = [Edge::E12, Edge::E23, Edge::E31];

    /// Start and end corner, following the winding
    pub fn corners(self) -> (Corner, Corner) {
        match self {
            Edge::E12 => (Corner::V1, Corner::V2),
            Edge::E23 => (Corner::V2, Corner::V3),
            Edge::E31 => (Corner::V3, Corner::V1),
        }
    }

    pub fn between(a: Corner, b: Corner) -> Option<Edge> {
        Edge::ALL.into_iter().find(|edge| {
            let (s, e) = edge.corners();
            (s == a && e == b) || (s == b && e == a)
        })
    }

    /// Corner shared with another edge, `None` for the same edge
    pub fn shared_corner(self, other: Edge) -> Option<Corner> {
        if self == other {
            return None;
        }
        let (a0, a1) = self.corners();
        let (b0, b1) = other.corners();
        [a0, a1].into_iter().find(|&c| c == b0 || c == b1)
    }
}

/// Where a segment end touches its face
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collision {
    None,
    Vertex(Corner),
    Edge(Edge),
    Interior,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentEnd {
    pub position: Point3<f64>,
    pub distance: f64,
    pub collision: Collision,
}

/// Portion of a ray bounded by one face. `start.distance <= end.distance`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    start: SegmentEnd,
    end: SegmentEnd,
    middle: Collision,
}

impl Segment {
    /// Bound `ray` by a face whose corners sit at the given signed distances
    /// from the other face's plane. `None` unless the corners straddle or
    /// touch that plane.
    pub fn from_face(
        ray: &Ray,
        corners: &[Point3<f64>; 3],
        distances: &[f64; 3],
        sides: &[Side; 3],
    ) -> Option<Segment> {
        if sides.iter().all(|&s| s == sides[0]) {
            return None;
        }

        let mut ends: Vec<SegmentEnd> = Vec::with_capacity(2);
        for corner in Corner::ALL {
            if ends.len() == 2 {
                break;
            }
            let i = corner.index();
            if sides[i] != Side::On {
                continue;
            }
            let end = SegmentEnd {
                position: corners[i],
                distance: ray.distance_along(&corners[i]),
                collision: Collision::Vertex(corner),
            };
            ends.push(end);
            // The other two on the same side: the plane only touches this corner
            if sides[(i + 1) % 3] == sides[(i + 2) % 3] {
                ends.push(end);
            }
        }

        for edge in Edge::ALL {
            if ends.len() == 2 {
                break;
            }
            let (a, b) = edge.corners();
            let (a, b) = (a.index(), b.index());
            if sides[a].sign() * sides[b].sign() != -1 {
                continue;
            }
            let t = distances[a] / (distances[a] - distances[b]);
            let position = corners[a] + (corners[b] - corners[a]) * t;
            ends.push(SegmentEnd {
                position,
                distance: ray.distance_along(&position),
                collision: Collision::Edge(edge),
            });
        }

        if ends.len() != 2 {
            return None;
        }
        let (mut start, mut end) = (ends[0], ends[1]);
        if start.distance > end.distance {
            std::mem::swap(&mut start, &mut end);
        }

        let middle = match (start.collision, end.collision) {
            (Collision::Vertex(a), Collision::Vertex(b)) if a == b => Collision::Vertex(a),
            (Collision::Vertex(a), Collision::Vertex(b)) => {
                Edge::between(a, b).map_or(Collision::Interior, Collision::Edge)
            }
            _ => Collision::Interior,
        };

        Some(Segment { start, end, middle })
    }

    pub fn start(&self) -> &SegmentEnd {
        &self.start
    }

    pub fn end(&self) -> &SegmentEnd {
        &self.end
    }

    /// What the segment crosses between its ends
    pub fn middle(&self) -> Collision {
        self.middle
    }

    pub fn length(&self) -> f64 {
        self.end.distance - self.start.distance
    }

    /// Whether the distance intervals of two segments on the same ray overlap
    /// by more than `tolerance`
    pub fn intersects(&self, other: &Segment, tolerance: f64) -> bool {
        !(self.end.distance < other.start.distance + tolerance
            || other.end.distance < self.start.distance + tolerance)
    }
}
