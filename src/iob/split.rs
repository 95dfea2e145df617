// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Split case table.
//!
//! The collision types at the two ends of a cut pick a [`SplitPlan`]; the plan
//! expands into a [`SplitLayout`] of new points and counter-clockwise pieces.
//! Each layout is written for a canonical rotation `r0, r1, r2` of the face
//! corners, chosen per case.

use super::segment::{Collision, Corner, Edge, SegmentEnd};
use super::stats::SplitCounts;
use nalgebra::{Point3, Vector3};

/// Where a new point lies, which decides how its attributes are interpolated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointSource {
    Edge(Edge),
    Interior,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewPoint {
    pub position: Point3<f64>,
    pub source: PointSource,
}

/// Corner of a piece: an original face corner or one of the new points
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Corner(Corner),
    Point(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SplitLayout {
    pub points: Vec<NewPoint>,
    pub pieces: Vec<[Slot; 3]>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SplitPlan {
    /// The cut only follows existing edges
    Unchanged,
    /// One new point on an edge, fanned to the opposite corner
    EdgeInTwo { edge: Edge, point: Point3<f64> },
    /// Two new points on one edge; `near` is closer to the edge start
    EdgeInThree {
        edge: Edge,
        near: Point3<f64>,
        far: Point3<f64>,
    },
    /// Points on the two edges meeting at `corner`
    CornerCut {
        corner: Corner,
        incoming: Point3<f64>,
        outgoing: Point3<f64>,
    },
    /// Interior point fanned to all corners, starting at `corner`
    VertexFan { corner: Corner, point: Point3<f64> },
    /// Interior point fanned to all corners and to a new edge point
    EdgeInterior {
        edge: Edge,
        edge_point: Point3<f64>,
        interior: Point3<f64>,
    },
    /// Two interior points; `near` is closer to `pivot`
    FiveWay {
        pivot: Corner,
        near: Point3<f64>,
        far: Point3<f64>,
    },
}

fn rotation(first: Corner) -> [Corner; 3] {
    let i = first.index();
    [
        Corner::from_index(i),
        Corner::from_index(i + 1),
        Corner::from_index(i + 2),
    ]
}

fn previous(corner: Corner) -> Corner {
    Corner::from_index(corner.index() + 2)
}

impl SplitPlan {
    /// Pick the split for a cut running from `start` to `end` across a face
    /// with the given corners and normal.
    pub fn choose(
        corners: &[Point3<f64>; 3],
        normal: &Vector3<f64>,
        start: &SegmentEnd,
        end: &SegmentEnd,
        between_points: f64,
    ) -> SplitPlan {
        let coincident = (start.position - end.position).norm() < between_points;

        match (start.collision, end.collision) {
            (Collision::Vertex(_), Collision::Vertex(_)) => SplitPlan::Unchanged,

            (Collision::Vertex(_), Collision::Edge(edge)) => SplitPlan::EdgeInTwo {
                edge,
                point: end.position,
            },
            (Collision::Edge(edge), Collision::Vertex(_)) => SplitPlan::EdgeInTwo {
                edge,
                point: start.position,
            },

            (Collision::Edge(a), Collision::Edge(b)) if a == b => {
                if coincident {
                    return SplitPlan::EdgeInTwo {
                        edge: a,
                        point: start.position,
                    };
                }
                let origin = corners[a.corners().0.index()];
                let (near, far) = if (start.position - origin).norm() <= (end.position - origin).norm() {
                    (start.position, end.position)
                } else {
                    (end.position, start.position)
                };
                SplitPlan::EdgeInThree { edge: a, near, far }
            }

            (Collision::Edge(a), Collision::Edge(b)) => match a.shared_corner(b) {
                Some(corner) => {
                    let (incoming, outgoing) = if a.corners().1 == corner {
                        (start.position, end.position)
                    } else {
                        (end.position, start.position)
                    };
                    SplitPlan::CornerCut {
                        corner,
                        incoming,
                        outgoing,
                    }
                }
                None => SplitPlan::Unchanged,
            },

            (Collision::Vertex(corner), Collision::Interior) => SplitPlan::VertexFan {
                corner,
                point: end.position,
            },
            (Collision::Interior, Collision::Vertex(corner)) => SplitPlan::VertexFan {
                corner,
                point: start.position,
            },

            (Collision::Edge(edge), Collision::Interior) => SplitPlan::EdgeInterior {
                edge,
                edge_point: start.position,
                interior: end.position,
            },
            (Collision::Interior, Collision::Edge(edge)) => SplitPlan::EdgeInterior {
                edge,
                edge_point: end.position,
                interior: start.position,
            },

            (Collision::Interior, Collision::Interior) => {
                if coincident {
                    SplitPlan::VertexFan {
                        corner: Corner::V1,
                        point: start.position,
                    }
                } else {
                    Self::five_way(corners, normal, start.position, end.position)
                }
            }

            (Collision::None, _) | (_, Collision::None) => SplitPlan::Unchanged,
        }
    }

    /// Five-way split around the corner best aligned with the cut. Ties go to
    /// the first corner in V1, V2, V3 order. If that pivot yields an inverted
    /// piece the other corners are tried before settling on it anyway.
    fn five_way(
        corners: &[Point3<f64>; 3],
        normal: &Vector3<f64>,
        start: Point3<f64>,
        end: Point3<f64>,
    ) -> SplitPlan {
        let cut = start - end;
        let score = |corner: Corner| {
            (end - corners[corner.index()])
                .try_normalize(f64::MIN_POSITIVE)
                .map_or(0.0, |dir| cut.dot(&dir).abs())
        };

        let mut best = Corner::V1;
        for corner in [Corner::V2, Corner::V3] {
            if score(corner) > score(best) {
                best = corner;
            }
        }

        let plan_for = |pivot: Corner| {
            let origin = corners[pivot.index()];
            let (near, far) = if (start - origin).norm() <= (end - origin).norm() {
                (start, end)
            } else {
                (end, start)
            };
            SplitPlan::FiveWay { pivot, near, far }
        };

        let heuristic = plan_for(best);
        if !heuristic.layout().has_inverted_piece(corners, normal) {
            return heuristic;
        }
        Corner::ALL
            .into_iter()
            .filter(|&c| c != best)
            .map(plan_for)
            .find(|plan| !plan.layout().has_inverted_piece(corners, normal))
            .unwrap_or(heuristic)
    }

    /// Record this plan in the per-case split counters
    pub fn count(&self, counts: &mut SplitCounts) {
        match self {
            SplitPlan::Unchanged => {}
            SplitPlan::EdgeInTwo { .. } => counts.edge_in_two += 1,
            SplitPlan::EdgeInThree { .. } => counts.edge_in_three += 1,
            SplitPlan::CornerCut { .. } => counts.corner_cut += 1,
            SplitPlan::VertexFan { .. } => counts.vertex_fan += 1,
            SplitPlan::EdgeInterior { .. } => counts.edge_interior += 1,
            SplitPlan::FiveWay { .. } => counts.five_way += 1,
        }
    }

    pub fn layout(&self) -> SplitLayout {
        use Slot::{Corner as C, Point as P};

        let edge_point = |edge: Edge, position| NewPoint {
            position,
            source: PointSource::Edge(edge),
        };
        let interior_point = |position| NewPoint {
            position,
            source: PointSource::Interior,
        };

        match *self {
            SplitPlan::Unchanged => SplitLayout {
                points: Vec::new(),
                pieces: Vec::new(),
            },

            SplitPlan::EdgeInTwo { edge, point } => {
                let [r0, r1, r2] = rotation(edge.corners().0);
                SplitLayout {
                    points: vec![edge_point(edge, point)],
                    pieces: vec![[C(r0), P(0), C(r2)], [P(0), C(r1), C(r2)]],
                }
            }

            SplitPlan::EdgeInThree { edge, near, far } => {
                let [r0, r1, r2] = rotation(edge.corners().0);
                SplitLayout {
                    points: vec![edge_point(edge, near), edge_point(edge, far)],
                    pieces: vec![
                        [C(r0), P(0), C(r2)],
                        [P(0), P(1), C(r2)],
                        [P(1), C(r1), C(r2)],
                    ],
                }
            }

            SplitPlan::CornerCut {
                corner,
                incoming,
                outgoing,
            } => {
                let [r0, r1, r2] = rotation(previous(corner));
                let incoming_edge = Edge::between(r0, r1).unwrap_or(Edge::E12);
                let outgoing_edge = Edge::between(r1, r2).unwrap_or(Edge::E23);
                SplitLayout {
                    points: vec![
                        edge_point(incoming_edge, incoming),
                        edge_point(outgoing_edge, outgoing),
                    ],
                    pieces: vec![
                        [C(r0), P(0), P(1)],
                        [C(r0), P(1), C(r2)],
                        [P(0), C(r1), P(1)],
                    ],
                }
            }

            SplitPlan::VertexFan { corner, point } => {
                let [r0, r1, r2] = rotation(corner);
                SplitLayout {
                    points: vec![interior_point(point)],
                    pieces: vec![
                        [C(r0), C(r1), P(0)],
                        [C(r1), C(r2), P(0)],
                        [C(r2), C(r0), P(0)],
                    ],
                }
            }

            SplitPlan::EdgeInterior {
                edge,
                edge_point: on_edge,
                interior,
            } => {
                let [r0, r1, r2] = rotation(edge.corners().0);
                SplitLayout {
                    points: vec![edge_point(edge, on_edge), interior_point(interior)],
                    pieces: vec![
                        [C(r0), P(0), P(1)],
                        [P(0), C(r1), P(1)],
                        [C(r1), C(r2), P(1)],
                        [C(r2), C(r0), P(1)],
                    ],
                }
            }

            SplitPlan::FiveWay { pivot, near, far } => {
                let [r0, r1, r2] = rotation(pivot);
                SplitLayout {
                    points: vec![interior_point(far), interior_point(near)],
                    pieces: vec![
                        [C(r1), C(r2), P(0)],
                        [C(r1), P(0), P(1)],
                        [C(r2), P(1), P(0)],
                        [C(r1), P(1), C(r0)],
                        [C(r2), C(r0), P(1)],
                    ],
                }
            }
        }
    }
}

impl SplitLayout {
    pub fn resolve(&self, slot: Slot, corners: &[Point3<f64>; 3]) -> Point3<f64> {
        match slot {
            Slot::Corner(corner) => corners[corner.index()],
            Slot::Point(i) => self.points[i].position,
        }
    }

    fn has_inverted_piece(&self, corners: &[Point3<f64>; 3], normal: &Vector3<f64>) -> bool {
        self.pieces.iter().any(|piece| {
            let [a, b, c] = piece.map(|slot| self.resolve(slot, corners));
            (b - a).cross(&(c - a)).dot(normal) < 0.0
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::analytics::triangle_area;

    const TOL: f64 = 1e-7;

    fn face() -> ([Point3<f64>; 3], Vector3<f64>) {
        (
            [
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(4.0, 0.0, 0.0),
                Point3::new(0.0, 4.0, 0.0),
            ],
            Vector3::z(),
        )
    }

    fn end(position: [f64; 3], collision: Collision) -> SegmentEnd {
        SegmentEnd {
            position: position.into(),
            distance: 0.0,
            collision,
        }
    }

    /// Pieces cover the face exactly and all wind like the face
    fn assert_partition(plan: &SplitPlan, pieces: usize) {
        let (corners, normal) = face();
        let layout = plan.layout();
        assert_eq!(layout.pieces.len(), pieces, "{:?}", plan);

        let mut total = 0.0;
        for piece in &layout.pieces {
            let [a, b, c] = piece.map(|slot| layout.resolve(slot, &corners));
            let orientation = (b - a).cross(&(c - a)).dot(&normal);
            assert!(orientation > 0.0, "inverted piece {:?} in {:?}", piece, plan);
            total += triangle_area(&a, &b, &c);
        }
        assert!((total - 8.0).abs() < 1e-9, "area {} for {:?}", total, plan);
    }

    fn choose(start: SegmentEnd, end: SegmentEnd) -> SplitPlan {
        let (corners, normal) = face();
        SplitPlan::choose(&corners, &normal, &start, &end, TOL)
    }

    #[test]
    fn test_vertex_to_vertex_is_unchanged() {
        let plan = choose(
            end([0.0, 0.0, 0.0], Collision::Vertex(Corner::V1)),
            end([4.0, 0.0, 0.0], Collision::Vertex(Corner::V2)),
        );
        assert_eq!(plan, SplitPlan::Unchanged);
        assert!(plan.layout().pieces.is_empty());
    }

    #[test]
    fn test_vertex_to_edge() {
        for edge in [Edge::E12, Edge::E23] {
            let point = match edge {
                Edge::E12 => [1.0, 0.0, 0.0],
                _ => [2.0, 2.0, 0.0],
            };
            let plan = choose(
                end([0.0, 4.0, 0.0], Collision::Vertex(Corner::V3)),
                end(point, Collision::Edge(edge)),
            );
            assert!(matches!(plan, SplitPlan::EdgeInTwo { .. }));
            assert_partition(&plan, 2);
        }

        let plan = choose(
            end([2.0, 2.0, 0.0], Collision::Edge(Edge::E23)),
            end([0.0, 0.0, 0.0], Collision::Vertex(Corner::V1)),
        );
        assert_partition(&plan, 2);
    }

    #[test]
    fn test_same_edge_twice() {
        let plan = choose(
            end([3.0, 0.0, 0.0], Collision::Edge(Edge::E12)),
            end([1.0, 0.0, 0.0], Collision::Edge(Edge::E12)),
        );
        assert_eq!(
            plan,
            SplitPlan::EdgeInThree {
                edge: Edge::E12,
                near: Point3::new(1.0, 0.0, 0.0),
                far: Point3::new(3.0, 0.0, 0.0),
            }
        );
        assert_partition(&plan, 3);

        let plan = choose(
            end([0.0, 3.0, 0.0], Collision::Edge(Edge::E31)),
            end([0.0, 1.0, 0.0], Collision::Edge(Edge::E31)),
        );
        assert_partition(&plan, 3);

        let collapsed = choose(
            end([0.0, 2.0, 0.0], Collision::Edge(Edge::E31)),
            end([0.0, 2.0, 0.0], Collision::Edge(Edge::E31)),
        );
        assert!(matches!(collapsed, SplitPlan::EdgeInTwo { .. }));
    }

    #[test]
    fn test_corner_cuts() {
        let cases = [
            (Edge::E12, [2.0, 0.0, 0.0], Edge::E23, [2.0, 2.0, 0.0], Corner::V2),
            (Edge::E23, [1.0, 3.0, 0.0], Edge::E31, [0.0, 1.0, 0.0], Corner::V3),
            (Edge::E31, [0.0, 1.0, 0.0], Edge::E12, [1.0, 0.0, 0.0], Corner::V1),
        ];
        for (a, pa, b, pb, corner) in cases {
            for (start, stop) in [
                (end(pa, Collision::Edge(a)), end(pb, Collision::Edge(b))),
                (end(pb, Collision::Edge(b)), end(pa, Collision::Edge(a))),
            ] {
                let plan = choose(start, stop);
                match plan {
                    SplitPlan::CornerCut { corner: c, .. } => assert_eq!(c, corner),
                    other => panic!("expected corner cut, got {:?}", other),
                }
                assert_partition(&plan, 3);
            }
        }
    }

    #[test]
    fn test_vertex_to_interior() {
        for corner in Corner::ALL {
            let (corners, _) = face();
            let c = corners[corner.index()];
            let plan = choose(
                end([c.x, c.y, c.z], Collision::Vertex(corner)),
                end([1.0, 1.0, 0.0], Collision::Interior),
            );
            assert!(matches!(plan, SplitPlan::VertexFan { .. }));
            assert_partition(&plan, 3);
        }
    }

    #[test]
    fn test_edge_to_interior() {
        let cases = [
            (Edge::E12, [2.0, 0.0, 0.0]),
            (Edge::E23, [2.0, 2.0, 0.0]),
            (Edge::E31, [0.0, 2.0, 0.0]),
        ];
        for (edge, point) in cases {
            let plan = choose(
                end([1.0, 1.0, 0.0], Collision::Interior),
                end(point, Collision::Edge(edge)),
            );
            assert!(matches!(plan, SplitPlan::EdgeInterior { .. }));
            assert_partition(&plan, 4);
        }
    }

    #[test]
    fn test_interior_to_interior() {
        let plan = choose(
            end([0.5, 0.5, 0.0], Collision::Interior),
            end([1.0, 1.0, 0.0], Collision::Interior),
        );
        match plan {
            SplitPlan::FiveWay { pivot, near, .. } => {
                assert_eq!(pivot, Corner::V1);
                assert_eq!(near, Point3::new(0.5, 0.5, 0.0));
            }
            other => panic!("expected five way split, got {:?}", other),
        }
        assert_partition(&plan, 5);

        // Cut pointing at the second corner
        let plan = choose(
            end([2.0, 0.5, 0.0], Collision::Interior),
            end([3.0, 0.3, 0.0], Collision::Interior),
        );
        assert!(matches!(plan, SplitPlan::FiveWay { pivot: Corner::V2, .. }));
        assert_partition(&plan, 5);

        let plan = choose(
            end([1.0, 1.0, 0.0], Collision::Interior),
            end([1.0, 1.0, 0.0], Collision::Interior),
        );
        assert_partition(&plan, 3);
    }

    #[test]
    fn test_five_way_off_axis_cut() {
        // Cut across the middle, not aimed at any corner
        let plan = choose(
            end([0.5, 1.5, 0.0], Collision::Interior),
            end([1.5, 1.4, 0.0], Collision::Interior),
        );
        assert!(matches!(plan, SplitPlan::FiveWay { .. }));
        let (corners, normal) = face();
        assert!(!plan.layout().has_inverted_piece(&corners, &normal));
    }

    #[test]
    fn test_count_per_case() {
        let mut counts = SplitCounts::default();
        SplitPlan::Unchanged.count(&mut counts);
        SplitPlan::VertexFan {
            corner: Corner::V1,
            point: Point3::origin(),
        }
        .count(&mut counts);
        assert_eq!(counts.vertex_fan, 1);
        assert_eq!(counts.total(), 1);
    }
}
