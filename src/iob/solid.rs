// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! One boolean operand: its faces, vertices and split/classify passes

use super::face::{Face, FaceStatus, RayTrace};
use super::plane::{Plane, Side};
use super::ray::Ray;
use super::segment::{Collision, Segment, SegmentEnd};
use super::split::{NewPoint, PointSource, Slot, SplitPlan};
use super::vertex::{VertexArena, VertexId, VertexStatus};
use super::{CancelToken, CsgError, CsgStats, Environment};
use crate::geometry::{BoundingBox, Mesh, Triangle, Vertex};
use log::{debug, trace, warn};
use nalgebra::Matrix4;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;

/// Outcome of comparing one face against one face of the other solid
enum PairTest {
    /// Bounds do not overlap
    Rejected,
    /// One face lies entirely on one side of the other's plane
    Separate,
    /// Planes are parallel although the corners straddle
    Parallel,
    /// Segments on the shared ray do not overlap
    Disjoint,
    Cut { own: Segment, other: Segment },
}

enum SplitOutcome {
    Unchanged,
    Replaced,
    Removed,
}

fn test_pair(face: &Face, other: &Face, env: &Environment) -> PairTest {
    if !face.bounds().overlaps(other.bounds(), env.between_points) {
        return PairTest::Rejected;
    }

    let own_distances = face.corners().map(|c| other.plane().distance(&c));
    let own_sides = own_distances.map(|d| Side::from_distance(d, env.on_plane));
    // All on one side, or coplanar
    if own_sides.iter().all(|&s| s == own_sides[0]) {
        return PairTest::Separate;
    }

    let other_distances = other.corners().map(|c| face.plane().distance(&c));
    let other_sides = other_distances.map(|d| Side::from_distance(d, env.on_plane));
    if other_sides.iter().all(|&s| s == other_sides[0]) {
        return PairTest::Separate;
    }

    let Some(ray) = Ray::from_planes(face.plane(), other.plane(), env.near_zero) else {
        return PairTest::Parallel;
    };

    let own = Segment::from_face(&ray, face.corners(), &own_distances, &own_sides);
    let theirs = Segment::from_face(&ray, other.corners(), &other_distances, &other_sides);
    match (own, theirs) {
        (Some(own), Some(theirs)) if own.intersects(&theirs, env.between_points) => PairTest::Cut {
            own,
            other: theirs,
        },
        _ => PairTest::Disjoint,
    }
}

/// A solid under construction for one boolean operation
#[derive(Debug, Clone)]
pub struct Solid {
    faces: Vec<Face>,
    vertices: VertexArena,
    bounds: BoundingBox,
    stats: CsgStats,
    issues: Vec<CsgError>,
}

impl Solid {
    pub fn new(env: &Environment) -> Self {
        Self {
            faces: Vec::new(),
            vertices: VertexArena::new(env.between_points),
            bounds: BoundingBox::empty(),
            stats: CsgStats::new(),
            issues: Vec::new(),
        }
    }

    /// Import a mesh, applying `transform` to every vertex once. Degenerate
    /// triangles and out-of-range vertices are dropped and reported as issues.
    pub fn from_mesh(
        mesh: &Mesh,
        transform: &Matrix4<f64>,
        material: Option<i32>,
        env: &Environment,
    ) -> Result<Self, CsgError> {
        mesh.validate()?;

        let mut solid = Self::new(env);
        solid.faces.reserve(mesh.triangle_count());
        let transformed = *transform != Matrix4::identity();

        let mut ids: Vec<Option<VertexId>> = Vec::with_capacity(mesh.vertex_count());
        for (i, source) in mesh.vertices.iter().enumerate() {
            let mut vertex = *source;
            if env.validate_input && vertex.position.coords.iter().any(|c| !c.is_finite()) {
                return Err(CsgError::malformed(format!(
                    "vertex {} has a non-finite coordinate",
                    i
                )));
            }
            if transformed {
                vertex.transform(transform);
            }

            match env.rationalize(env.round(vertex.position)) {
                Some(position) => {
                    vertex.position = position;
                    ids.push(Some(solid.vertices.insert(vertex, VertexStatus::Unknown)));
                }
                None => {
                    solid.record(
                        env,
                        CsgError::invalid_geometry(format!(
                            "vertex {} at {:?} is outside the coordinate range",
                            i, vertex.position
                        )),
                    );
                    ids.push(None);
                }
            }
        }

        for (i, triangle) in mesh.triangles.iter().enumerate() {
            let [a, b, c] = triangle.indices.map(|idx| ids[idx]);
            let (Some(a), Some(b), Some(c)) = (a, b, c) else {
                solid.stats.degenerate_dropped += 1;
                continue;
            };
            let vertices = [a, b, c];
            let corners = vertices.map(|id| solid.vertices.position(id));

            let plane = if Face::is_degenerate(&corners, env) {
                None
            } else {
                Plane::from_points(&corners[0], &corners[1], &corners[2], env.near_zero)
            };
            let Some(plane) = plane else {
                solid.stats.degenerate_dropped += 1;
                solid.record(
                    env,
                    CsgError::invalid_geometry(format!("triangle {} is degenerate", i)),
                );
                continue;
            };

            let material = material.unwrap_or(triangle.material);
            let face = Face::new(vertices, &solid.vertices, plane, material);
            solid.faces.push(face);
        }

        solid.stats.input_faces = solid.faces.len();
        solid.update_bounds();
        debug!(
            "Imported solid: {} faces, {} vertices, {} dropped",
            solid.faces.len(),
            solid.vertices.len(),
            solid.stats.degenerate_dropped
        );
        Ok(solid)
    }

    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    pub fn vertices(&self) -> &VertexArena {
        &self.vertices
    }

    pub fn bounds(&self) -> &BoundingBox {
        &self.bounds
    }

    pub fn stats(&self) -> &CsgStats {
        &self.stats
    }

    pub fn issues(&self) -> &[CsgError] {
        &self.issues
    }

    pub fn take_issues(&mut self) -> Vec<CsgError> {
        std::mem::take(&mut self.issues)
    }

    pub fn len(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    pub fn count_status(&self, status: FaceStatus) -> usize {
        self.faces.iter().filter(|f| f.status() == status).count()
    }

    pub fn total_area(&self) -> f64 {
        self.faces.iter().map(Face::area).sum()
    }

    fn update_bounds(&mut self) {
        self.bounds = BoundingBox::from_points(self.faces.iter().flat_map(|f| f.corners().iter()));
    }

    fn record(&mut self, env: &Environment, issue: CsgError) {
        if env.debug || !issue.is_recoverable() {
            warn!("{}", issue);
        } else {
            debug!("{}", issue);
        }
        self.issues.push(issue);
    }

    /// Split faces until none of them crosses a face of `other`.
    ///
    /// A split piece takes over the slot of its parent (further pieces are
    /// appended) and resumes scanning after the opposing face that produced it.
    pub fn split_faces(
        &mut self,
        other: &Solid,
        env: &Environment,
        cancel: &CancelToken,
    ) -> Result<(), CsgError> {
        if self.faces.is_empty() || other.faces.is_empty() {
            return Ok(());
        }
        if !self.bounds.overlaps(&other.bounds, env.between_points) {
            self.stats.bound_rejections += 1;
            return Ok(());
        }

        let limit = env.split_limit_factor * (self.faces.len() + other.faces.len());
        let mut splits = 0usize;
        let mut i = 0;

        'faces: while i < self.faces.len() {
            cancel.check()?;

            if self.faces[i].bounds().overlaps(&other.bounds, env.between_points) {
                let mut j = self.faces[i].scan_start();
                while j < other.faces.len() {
                    self.stats.pair_tests += 1;
                    match test_pair(&self.faces[i], &other.faces[j], env) {
                        PairTest::Rejected => self.stats.bound_rejections += 1,
                        PairTest::Separate | PairTest::Disjoint => {}
                        PairTest::Parallel => {
                            self.stats.parallel_rays += 1;
                            self.record(
                                env,
                                CsgError::construction(format!(
                                    "faces {} and {} straddle each other on parallel planes",
                                    i, j
                                )),
                            );
                        }
                        PairTest::Cut { own, other: theirs } => {
                            match self.split_face(i, &own, &theirs, j + 1, env) {
                                SplitOutcome::Unchanged => {}
                                SplitOutcome::Replaced => {
                                    splits += 1;
                                    if splits > limit {
                                        return Err(CsgError::construction(format!(
                                            "split limit of {} exceeded",
                                            limit
                                        )));
                                    }
                                    continue 'faces;
                                }
                                SplitOutcome::Removed => continue 'faces,
                            }
                        }
                    }
                    j += 1;
                }
            }
            i += 1;
        }

        self.update_bounds();
        debug!("Split pass done: {} splits, {} faces", splits, self.faces.len());
        Ok(())
    }

    /// Cut face `i` along the overlap of its segment with the other face's
    fn split_face(
        &mut self,
        i: usize,
        own: &Segment,
        theirs: &Segment,
        resume_at: usize,
        env: &Environment,
    ) -> SplitOutcome {
        let face = self.faces[i].clone();
        let tolerance = env.between_points;

        let start = if theirs.start().distance > own.start().distance + tolerance {
            SegmentEnd {
                collision: own.middle(),
                ..*theirs.start()
            }
        } else {
            *own.start()
        };
        let end = if theirs.end().distance < own.end().distance - tolerance {
            SegmentEnd {
                collision: own.middle(),
                ..*theirs.end()
            }
        } else {
            *own.end()
        };

        for cut_end in [&start, &end] {
            if let Collision::Vertex(corner) = cut_end.collision {
                self.vertices
                    .set_status(face.vertices()[corner.index()], VertexStatus::Boundary);
            }
        }

        let plan = SplitPlan::choose(
            face.corners(),
            &face.plane().normal(),
            &start,
            &end,
            env.between_points,
        );
        if plan == SplitPlan::Unchanged {
            return SplitOutcome::Unchanged;
        }
        let layout = plan.layout();

        let mut point_ids = Vec::with_capacity(layout.points.len());
        for point in &layout.points {
            match self.place_point(&face, point, env) {
                Some(id) => point_ids.push(id),
                None => {
                    return self.unsplit(
                        i,
                        resume_at,
                        env,
                        format!("split point {:?} is outside the coordinate range", point.position),
                    )
                }
            }
        }

        let mut pieces = Vec::with_capacity(layout.pieces.len());
        for piece in &layout.pieces {
            let ids = piece.map(|slot| match slot {
                Slot::Corner(corner) => face.vertices()[corner.index()],
                Slot::Point(k) => point_ids[k],
            });
            let corners = ids.map(|id| self.vertices.position(id));
            if ids[0] == ids[1] || ids[1] == ids[2] || ids[2] == ids[0] || Face::is_degenerate(&corners, env) {
                self.stats.degenerate_dropped += 1;
                continue;
            }
            let mut piece = Face::new(ids, &self.vertices, *face.plane(), face.material());
            piece.set_scan_start(resume_at);
            pieces.push(piece);
        }

        if pieces.is_empty() {
            return self.unsplit(i, resume_at, env, format!("{:?} left no valid piece", plan));
        }
        if pieces.len() == 1 {
            let mut before = face.vertices();
            let mut after = pieces[0].vertices();
            before.sort();
            after.sort();
            if before == after {
                // Every new point snapped onto a corner
                return SplitOutcome::Unchanged;
            }
        }

        plan.count(&mut self.stats.splits);
        trace!("Face {} split into {} pieces ({:?})", i, pieces.len(), plan);

        let mut pieces = pieces.into_iter();
        if let Some(first) = pieces.next() {
            self.faces[i] = first;
        }
        self.faces.extend(pieces);
        SplitOutcome::Replaced
    }

    /// Vertex for a new split point: an existing corner when the point lands
    /// on one, otherwise a new boundary vertex with interpolated attributes
    fn place_point(&mut self, face: &Face, point: &NewPoint, env: &Environment) -> Option<VertexId> {
        for (k, corner) in face.corners().iter().enumerate() {
            if env.same_point(corner, &point.position) {
                return Some(face.vertices()[k]);
            }
        }

        let position = env.rationalize(point.position)?;
        let corners: [Vertex; 3] = face.vertices().map(|id| *self.vertices.vertex(id));
        let vertex = match point.source {
            PointSource::Edge(edge) => {
                let (from, to) = edge.corners();
                let (from, to) = (&corners[from.index()], &corners[to.index()]);
                let length = (to.position - from.position).norm();
                let t = if length > 0.0 {
                    ((position - from.position).norm() / length).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                Vertex {
                    position,
                    ..from.interpolate(to, t)
                }
            }
            PointSource::Interior => Vertex::blend(
                [&corners[0], &corners[1], &corners[2]],
                face.barycentric(&position),
                position,
            ),
        };
        Some(self.vertices.insert(vertex, VertexStatus::Boundary))
    }

    fn unsplit(&mut self, i: usize, resume_at: usize, env: &Environment, reason: String) -> SplitOutcome {
        self.record(
            env,
            CsgError::invalid_geometry(format!("face {} could not be split: {}", i, reason)),
        );
        if env.remove_unsplit_face {
            self.faces.remove(i);
            self.stats.unsplit_removed += 1;
            SplitOutcome::Removed
        } else {
            self.faces[i].set_scan_start(resume_at);
            self.stats.unsplit_kept += 1;
            SplitOutcome::Unchanged
        }
    }

    /// Classify every face as inside, outside or coplanar with `other`
    pub fn classify_faces(
        &mut self,
        other: &Solid,
        env: &Environment,
        cancel: &CancelToken,
    ) -> Result<(), CsgError> {
        if !self.bounds.overlaps(&other.bounds, env.between_points) {
            for face in &mut self.faces {
                face.set_status(FaceStatus::Outside);
            }
            debug!("Solids are apart; {} faces outside", self.faces.len());
            return Ok(());
        }

        let mut rng = StdRng::seed_from_u64(env.random_seed);
        for i in 0..self.faces.len() {
            cancel.check()?;
            if self.faces[i].status() != FaceStatus::Unknown {
                continue;
            }
            if self.faces[i].simple_classify(&mut self.vertices) {
                self.stats.simple_classified += 1;
                continue;
            }

            match self.faces[i].ray_trace_classify(other, env, cancel, &mut rng)? {
                RayTrace::Classified { status, retries } => {
                    self.stats.ray_traced += 1;
                    self.stats.ray_retries += retries;
                    self.faces[i].set_status(status);
                    for id in self.faces[i].vertices() {
                        self.vertices.mark_status(id, status);
                    }
                }
                RayTrace::Indeterminate { attempts } => {
                    self.stats.ray_retries += attempts.saturating_sub(1);
                    self.stats.indeterminate += 1;
                    self.record(env, CsgError::ClassificationIndeterminate { face: i, attempts });
                }
            }
        }

        debug!(
            "Classified {} faces: {} inside, {} outside, {} same, {} opposite, {} unknown",
            self.faces.len(),
            self.count_status(FaceStatus::Inside),
            self.count_status(FaceStatus::Outside),
            self.count_status(FaceStatus::Same),
            self.count_status(FaceStatus::Opposite),
            self.count_status(FaceStatus::Unknown)
        );
        Ok(())
    }

    /// New solid holding flipped copies of the faces with the given status
    pub fn invert_faces(&self, status: FaceStatus) -> Solid {
        let mut inverted = Solid {
            faces: Vec::new(),
            vertices: VertexArena::new(self.vertices.tolerance()),
            bounds: BoundingBox::empty(),
            stats: CsgStats::new(),
            issues: Vec::new(),
        };

        let mut remap: HashMap<VertexId, VertexId> = HashMap::new();
        for face in self.faces.iter().filter(|f| f.status() == status) {
            let [a, b, c] = face.vertices().map(|id| {
                *remap.entry(id).or_insert_with(|| {
                    inverted
                        .vertices
                        .insert(self.vertices.vertex(id).flipped(true), self.vertices.status(id))
                })
            });
            inverted.faces.push(face.inverted([a, c, b]));
        }

        inverted.update_bounds();
        inverted
    }

    /// Return every face and vertex to `Unknown`
    pub fn reset_status(&mut self) {
        for face in &mut self.faces {
            face.reset_status(&mut self.vertices);
        }
        self.vertices.reset_status();
    }

    /// Append the faces accepted by `keep` to `mesh`. Returns the number of
    /// triangles added.
    pub fn append_to_mesh(&self, mesh: &mut Mesh, keep: impl Fn(FaceStatus) -> bool, env: &Environment) -> usize {
        let mut remap: HashMap<VertexId, usize> = HashMap::new();
        let mut added = 0;
        for face in self.faces.iter().filter(|f| keep(f.status())) {
            let indices = face.vertices().map(|id| {
                *remap.entry(id).or_insert_with(|| {
                    let mut vertex = *self.vertices.vertex(id);
                    vertex.position = env.round(vertex.position);
                    mesh.add_vertex(vertex)
                })
            });
            mesh.add_triangle(Triangle::with_material(indices, face.material()));
            added += 1;
        }
        added
    }

    pub fn to_mesh(&self, keep: impl Fn(FaceStatus) -> bool, env: &Environment) -> Mesh {
        let mut mesh = Mesh::new();
        self.append_to_mesh(&mut mesh, keep, env);
        mesh
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{analytics, Primitive};
    use crate::iob::{BooleanEngine, BooleanOp};
    use nalgebra::{Point3, Vector3};

    fn cube_at(offset: Vector3<f64>, env: &Environment) -> Solid {
        let mesh = Primitive::unit_cube().to_mesh();
        Solid::from_mesh(&mesh, &Matrix4::new_translation(&offset), None, env).unwrap()
    }

    fn overlapping_pair(env: &Environment) -> (Solid, Solid) {
        let mut a = cube_at(Vector3::zeros(), env);
        let mut b = cube_at(Vector3::new(0.5, 0.5, 0.5), env);
        let cancel = CancelToken::new();
        a.split_faces(&b, env, &cancel).unwrap();
        b.split_faces(&a, env, &cancel).unwrap();
        (a, b)
    }

    #[test]
    fn test_import_links_corners() {
        let env = Environment::default();
        let solid = cube_at(Vector3::zeros(), &env);
        assert_eq!(solid.len(), 12);
        assert_eq!(solid.vertices().len(), 24);

        // Three side vertices meet at every corner
        let first = solid.faces()[0].vertices()[0];
        assert_eq!(solid.vertices().group_members(first).len(), 3);
        assert_eq!(solid.bounds().max, Point3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn test_import_applies_transform_and_material() {
        let env = Environment::default();
        let mesh = Primitive::unit_cube().to_mesh();
        let transform = Matrix4::new_translation(&Vector3::new(5.0, 0.0, 0.0));
        let solid = Solid::from_mesh(&mesh, &transform, Some(4), &env).unwrap();
        assert_eq!(solid.bounds().min.x, 5.0);
        assert!(solid.faces().iter().all(|f| f.material() == 4));
    }

    #[test]
    fn test_import_drops_degenerate_triangles() {
        let env = Environment::default();
        let mut mesh = Primitive::unit_cube().to_mesh();
        mesh.add_triangle(Triangle::new([0, 0, 1]));
        let solid = Solid::from_mesh(&mesh, &Matrix4::identity(), None, &env).unwrap();

        assert_eq!(solid.len(), 12);
        assert_eq!(solid.stats().degenerate_dropped, 1);
        assert!(matches!(solid.issues()[0], CsgError::InvalidGeometry { .. }));
    }

    #[test]
    fn test_import_rejects_malformed_mesh() {
        let env = Environment::default();
        let mut mesh = Primitive::unit_cube().to_mesh();
        mesh.add_triangle(Triangle::new([0, 1, 99]));
        let result = Solid::from_mesh(&mesh, &Matrix4::identity(), None, &env);
        assert!(matches!(result, Err(CsgError::MalformedMesh { .. })));

        let mut mesh = Primitive::unit_cube().to_mesh();
        mesh.vertices[0].position.x = f64::NAN;
        let result = Solid::from_mesh(&mesh, &Matrix4::identity(), None, &env);
        assert!(matches!(result, Err(CsgError::MalformedMesh { .. })));
    }

    #[test]
    fn test_split_preserves_area() {
        let env = Environment::default();
        let (a, b) = overlapping_pair(&env);

        assert!(a.len() > 12);
        assert!(b.len() > 12);
        assert!(a.stats().splits.total() > 0);
        assert!((a.total_area() - 6.0).abs() < 1e-9);
        assert!((b.total_area() - 6.0).abs() < 1e-9);
        assert!(a.issues().is_empty());
    }

    #[test]
    fn test_split_pieces_keep_parent_plane() {
        let env = Environment::default();
        let original = cube_at(Vector3::zeros(), &env);
        let (a, _) = overlapping_pair(&env);
        let planes: Vec<Plane> = original.faces().iter().map(|f| *f.plane()).collect();
        assert!(a.faces().iter().all(|f| planes.contains(f.plane())));
    }

    #[test]
    fn test_disjoint_solids_do_not_split() {
        let env = Environment::default();
        let mut a = cube_at(Vector3::zeros(), &env);
        let b = cube_at(Vector3::new(2.0, 0.0, 0.0), &env);
        a.split_faces(&b, &env, &CancelToken::new()).unwrap();
        assert_eq!(a.len(), 12);
        assert_eq!(a.stats().pair_tests, 0);
    }

    #[test]
    fn test_classification_of_overlapping_cubes() {
        let env = Environment::default();
        let cancel = CancelToken::new();
        let (mut a, mut b) = overlapping_pair(&env);
        a.classify_faces(&b, &env, &cancel).unwrap();
        b.classify_faces(&a, &env, &cancel).unwrap();

        for solid in [&a, &b] {
            assert_eq!(solid.count_status(FaceStatus::Unknown), 0);
            assert_eq!(solid.count_status(FaceStatus::Same), 0);
            // Three sides of each cube poke into the other, a quarter of each
            let inside: f64 = solid
                .faces()
                .iter()
                .filter(|f| f.status() == FaceStatus::Inside)
                .map(Face::area)
                .sum();
            assert!((inside - 0.75).abs() < 1e-9, "inside area {}", inside);
        }
        assert!(a.stats().simple_classified > 0);
    }

    #[test]
    fn test_vertex_groups_agree_after_classification() {
        let env = Environment::default();
        let cancel = CancelToken::new();
        let (mut a, b) = overlapping_pair(&env);
        a.classify_faces(&b, &env, &cancel).unwrap();

        for face in a.faces() {
            for id in face.vertices() {
                let status = a.vertices().status(id);
                for member in a.vertices().group_members(id) {
                    assert_eq!(a.vertices().status(member), status);
                }
            }
        }
    }

    #[test]
    fn test_coincident_solids_classify_same() {
        let env = Environment::default();
        let cancel = CancelToken::new();
        let mut a = cube_at(Vector3::zeros(), &env);
        let b = cube_at(Vector3::zeros(), &env);
        a.split_faces(&b, &env, &cancel).unwrap();
        a.classify_faces(&b, &env, &cancel).unwrap();
        assert_eq!(a.len(), 12);
        assert_eq!(a.count_status(FaceStatus::Same), 12);
    }

    #[test]
    fn test_invert_faces() {
        let env = Environment::default();
        let cancel = CancelToken::new();
        let (a, mut b) = overlapping_pair(&env);
        b.classify_faces(&a, &env, &cancel).unwrap();

        let inverted = b.invert_faces(FaceStatus::Inside);
        assert_eq!(inverted.len(), b.count_status(FaceStatus::Inside));
        assert!(inverted.faces().iter().all(|f| f.status() == FaceStatus::Inside));

        // Flipped winding turns the enclosed volume inside out
        let original = b.to_mesh(|s| s == FaceStatus::Inside, &env);
        let flipped = inverted.to_mesh(|_| true, &env);
        let v1 = analytics::signed_volume(&original);
        let v2 = analytics::signed_volume(&flipped);
        assert!((v1 + v2).abs() < 1e-12);

        let source = b.faces().iter().find(|f| f.status() == FaceStatus::Inside).unwrap();
        let before = b.vertices().vertex(source.vertices()[0]);
        let after = inverted.vertices().vertex(inverted.faces()[0].vertices()[0]);
        assert_eq!(after.position, before.position);
        assert_eq!(after.normal, -before.normal);
    }

    #[test]
    fn test_reset_status() {
        let env = Environment::default();
        let cancel = CancelToken::new();
        let (mut a, b) = overlapping_pair(&env);
        a.classify_faces(&b, &env, &cancel).unwrap();
        a.reset_status();
        assert_eq!(a.count_status(FaceStatus::Unknown), a.len());
        let id = a.faces()[0].vertices()[0];
        assert_eq!(a.vertices().status(id), VertexStatus::Unknown);
    }

    #[test]
    fn test_split_limit() {
        let env = Environment {
            split_limit_factor: 0,
            ..Environment::default()
        };
        let mut a = cube_at(Vector3::zeros(), &env);
        let b = cube_at(Vector3::new(0.5, 0.5, 0.5), &env);
        let result = a.split_faces(&b, &env, &CancelToken::new());
        assert!(matches!(result, Err(CsgError::ConstructionFailed { .. })));
    }

    #[test]
    fn test_split_observes_cancellation() {
        let env = Environment::default();
        let cancel = CancelToken::new();
        cancel.cancel();
        let mut a = cube_at(Vector3::zeros(), &env);
        let b = cube_at(Vector3::new(0.5, 0.5, 0.5), &env);
        assert!(matches!(
            a.split_faces(&b, &env, &cancel),
            Err(CsgError::Interrupted)
        ));
    }

    /// Split `a` against `b` at the first cut pair that ends up unsplit
    fn first_unsplit(env: &Environment) -> (Solid, SplitOutcome, usize, usize) {
        let a = cube_at(Vector3::zeros(), &Environment::default());
        let b = cube_at(Vector3::new(0.5, 0.5, 0.5), &Environment::default());
        for i in 0..a.len() {
            for j in 0..b.len() {
                if let PairTest::Cut { own, other } = test_pair(&a.faces()[i], &b.faces()[j], env) {
                    let mut trial = a.clone();
                    let outcome = trial.split_face(i, &own, &other, j + 1, env);
                    if trial.stats().unsplit_removed + trial.stats().unsplit_kept > 0 {
                        return (trial, outcome, i, j);
                    }
                }
            }
        }
        panic!("no cut pair left its face unsplit");
    }

    // Every point where the second cube cuts the first has a coordinate of 1,
    // so a magnitude ceiling below that rejects all new split points
    fn unsplit_env(remove: bool) -> Environment {
        Environment {
            max_point_magnitude: 0.9,
            remove_unsplit_face: remove,
            ..Environment::default()
        }
    }

    #[test]
    fn test_unsplit_face_removed() {
        let (solid, outcome, _, _) = first_unsplit(&unsplit_env(true));
        assert!(matches!(outcome, SplitOutcome::Removed));
        assert_eq!(solid.len(), 11);
        assert_eq!(solid.stats().unsplit_removed, 1);
        assert_eq!(solid.stats().unsplit_kept, 0);
        assert!(matches!(solid.issues(), [CsgError::InvalidGeometry { .. }]));
    }

    #[test]
    fn test_unsplit_face_kept() {
        let original = cube_at(Vector3::zeros(), &Environment::default());
        let (solid, outcome, i, j) = first_unsplit(&unsplit_env(false));
        assert!(matches!(outcome, SplitOutcome::Unchanged));
        assert_eq!(solid.len(), 12);
        assert_eq!(solid.stats().unsplit_kept, 1);
        assert_eq!(solid.stats().unsplit_removed, 0);
        assert_eq!(solid.faces()[i].vertices(), original.faces()[i].vertices());
        assert_eq!(solid.faces()[i].scan_start(), j + 1);
        assert_eq!(solid.issues().len(), 1);
    }

    #[test]
    fn test_split_pass_applies_unsplit_policy() {
        let cancel = CancelToken::new();
        let b = cube_at(Vector3::new(0.5, 0.5, 0.5), &Environment::default());

        let env = unsplit_env(true);
        let mut removed = cube_at(Vector3::zeros(), &Environment::default());
        removed.split_faces(&b, &env, &cancel).unwrap();
        assert!(removed.stats().unsplit_removed > 0);
        assert_eq!(removed.len(), 12 - removed.stats().unsplit_removed);
        assert_eq!(removed.stats().splits.total(), 0);

        let env = unsplit_env(false);
        let mut kept = cube_at(Vector3::zeros(), &Environment::default());
        kept.split_faces(&b, &env, &cancel).unwrap();
        assert!(kept.stats().unsplit_kept > 0);
        assert_eq!(kept.len(), 12);
        assert_eq!(kept.issues().len(), kept.stats().unsplit_kept);
    }

    #[test]
    fn test_indeterminate_face_is_excluded() {
        let env = Environment {
            max_ray_retries: 0,
            ..Environment::default()
        };
        let cancel = CancelToken::new();

        // Single face whose classification ray runs inside the cube's y = 0 side
        let mut sliver = Mesh::new();
        for [x, y, z] in [[0.5, -0.2, 0.2], [0.5, 0.1, 0.2], [0.5, 0.1, 0.5]] {
            sliver.add_vertex(Vertex::new(Point3::new(x, y, z), Vector3::x()));
        }
        sliver.add_triangle(Triangle::new([0, 1, 2]));

        let mut a = Solid::from_mesh(&sliver, &Matrix4::identity(), Some(5), &env).unwrap();
        let mut b = cube_at(Vector3::zeros(), &env);
        a.classify_faces(&b, &env, &cancel).unwrap();
        b.classify_faces(&a, &env, &cancel).unwrap();

        assert_eq!(a.faces()[0].status(), FaceStatus::Unknown);
        assert_eq!(a.stats().indeterminate, 1);
        assert!(matches!(
            a.issues(),
            [CsgError::ClassificationIndeterminate { face: 0, attempts: 1 }]
        ));

        for op in [BooleanOp::Union, BooleanOp::Difference, BooleanOp::Intersection] {
            let mesh = BooleanEngine::compose(op, &a, &b, &env);
            assert!(mesh.triangles.iter().all(|t| t.material != 5), "{} kept the face", op);
        }
    }
}
