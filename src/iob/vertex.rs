// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Solid-local vertex storage with same-position equivalence groups.
//!
//! Every vertex belongs to a group of vertices sharing its position (within
//! `between_points`). Groups form a union-find forest whose roots carry the
//! classification status, so marking one member classifies them all.

use super::face::FaceStatus;
use crate::geometry::Vertex;
use nalgebra::Point3;
use std::collections::HashMap;

/// Index of a vertex inside one solid's [`VertexArena`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexId(usize);

impl VertexId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Vertex level classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexStatus {
    Unknown,
    Inside,
    Outside,
    Boundary,
}

impl VertexStatus {
    /// Combined status of two groups being linked
    fn merge(self, other: VertexStatus) -> VertexStatus {
        match (self, other) {
            (a, b) if a == b => a,
            (VertexStatus::Unknown, known) | (known, VertexStatus::Unknown) => known,
            _ => VertexStatus::Boundary,
        }
    }
}

impl From<FaceStatus> for VertexStatus {
    fn from(status: FaceStatus) -> Self {
        match status {
            FaceStatus::Unknown => VertexStatus::Unknown,
            FaceStatus::Inside => VertexStatus::Inside,
            FaceStatus::Outside => VertexStatus::Outside,
            FaceStatus::Same | FaceStatus::Opposite => VertexStatus::Boundary,
        }
    }
}

#[derive(Debug, Clone)]
struct GroupRecord {
    parent: usize,
    size: usize,
    status: VertexStatus,
}

#[derive(Debug, Clone)]
struct Slot {
    vertex: Vertex,
    group: usize,
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
struct CellKey {
    x: i64,
    y: i64,
    z: i64,
}

/// Quantized spatial hash; a point's neighbours live in the 27 cells around it
#[derive(Debug, Clone)]
struct PositionIndex {
    cell_size: f64,
    cells: HashMap<CellKey, Vec<VertexId>>,
}

impl PositionIndex {
    fn new(tolerance: f64) -> Self {
        Self {
            cell_size: tolerance.max(1e-12) * 8.0,
            cells: HashMap::new(),
        }
    }

    fn key(&self, p: &Point3<f64>) -> CellKey {
        CellKey {
            x: (p.x / self.cell_size).floor() as i64,
            y: (p.y / self.cell_size).floor() as i64,
            z: (p.z / self.cell_size).floor() as i64,
        }
    }

    fn insert(&mut self, p: &Point3<f64>, id: VertexId) {
        let key = self.key(p);
        self.cells.entry(key).or_default().push(id);
    }

    fn neighbours<'a>(&'a self, p: &Point3<f64>) -> impl Iterator<Item = VertexId> + 'a {
        let center = self.key(p);
        (-1..=1).flat_map(move |dx| {
            (-1..=1).flat_map(move |dy| {
                (-1..=1).flat_map(move |dz| {
                    let key = CellKey {
                        x: center.x + dx,
                        y: center.y + dy,
                        z: center.z + dz,
                    };
                    self.cells.get(&key).into_iter().flatten().copied()
                })
            })
        })
    }
}

/// Vertices of one solid together with their equivalence groups
#[derive(Debug, Clone)]
pub struct VertexArena {
    slots: Vec<Slot>,
    groups: Vec<GroupRecord>,
    index: PositionIndex,
    tolerance: f64,
}

impl VertexArena {
    pub fn new(tolerance: f64) -> Self {
        Self {
            slots: Vec::new(),
            groups: Vec::new(),
            index: PositionIndex::new(tolerance),
            tolerance,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Distance below which inserted vertices join an existing group
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Store a vertex with an initial status and link it to every stored
    /// vertex at the same position
    pub fn insert(&mut self, vertex: Vertex, status: VertexStatus) -> VertexId {
        let id = VertexId(self.slots.len());
        let group = self.groups.len();
        self.groups.push(GroupRecord {
            parent: group,
            size: 1,
            status,
        });
        self.slots.push(Slot { vertex, group });

        let limit = self.tolerance * self.tolerance;
        let coincident: Vec<VertexId> = self
            .index
            .neighbours(&vertex.position)
            .filter(|other| (self.slots[other.0].vertex.position - vertex.position).norm_squared() < limit)
            .collect();
        for other in coincident {
            self.link_same_position(id, other);
        }

        self.index.insert(&vertex.position, id);
        id
    }

    pub fn vertex(&self, id: VertexId) -> &Vertex {
        &self.slots[id.0].vertex
    }

    pub fn position(&self, id: VertexId) -> Point3<f64> {
        self.slots[id.0].vertex.position
    }

    fn root(&self, mut group: usize) -> usize {
        while self.groups[group].parent != group {
            group = self.groups[group].parent;
        }
        group
    }

    fn root_mut(&mut self, group: usize) -> usize {
        let root = self.root(group);
        // Path compression
        let mut current = group;
        while self.groups[current].parent != root {
            let next = self.groups[current].parent;
            self.groups[current].parent = root;
            current = next;
        }
        root
    }

    pub fn status(&self, id: VertexId) -> VertexStatus {
        self.groups[self.root(self.slots[id.0].group)].status
    }

    /// Merge the equivalence groups of two vertices
    pub fn link_same_position(&mut self, a: VertexId, b: VertexId) {
        let ra = self.root_mut(self.slots[a.0].group);
        let rb = self.root_mut(self.slots[b.0].group);
        if ra == rb {
            return;
        }
        let status = self.groups[ra].status.merge(self.groups[rb].status);
        let (big, small) = if self.groups[ra].size >= self.groups[rb].size {
            (ra, rb)
        } else {
            (rb, ra)
        };
        self.groups[small].parent = big;
        self.groups[big].size += self.groups[small].size;
        self.groups[big].status = status;
    }

    pub fn same_group(&self, a: VertexId, b: VertexId) -> bool {
        self.root(self.slots[a.0].group) == self.root(self.slots[b.0].group)
    }

    /// Propagate a face classification to the vertex's group. Groups that are
    /// already classified keep their status. Returns whether anything changed.
    pub fn mark_status(&mut self, id: VertexId, status: FaceStatus) -> bool {
        let status = VertexStatus::from(status);
        let root = self.root_mut(self.slots[id.0].group);
        if status == VertexStatus::Unknown || self.groups[root].status != VertexStatus::Unknown {
            return false;
        }
        self.groups[root].status = status;
        true
    }

    /// Overwrite the status of the vertex's group
    pub fn set_status(&mut self, id: VertexId, status: VertexStatus) {
        let root = self.root_mut(self.slots[id.0].group);
        self.groups[root].status = status;
    }

    /// Return every group to `Unknown`
    pub fn reset_status(&mut self) {
        for group in &mut self.groups {
            group.status = VertexStatus::Unknown;
        }
    }

    /// Members of the vertex's equivalence group, the vertex included
    pub fn group_members(&self, id: VertexId) -> Vec<VertexId> {
        let root = self.root(self.slots[id.0].group);
        (0..self.slots.len())
            .map(VertexId)
            .filter(|other| self.root(self.slots[other.0].group) == root)
            .collect()
    }
}
