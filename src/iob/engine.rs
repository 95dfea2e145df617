// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Boolean engine: split, classify and compose two solids

use super::face::FaceStatus;
use super::solid::Solid;
use super::{CancelToken, CsgError, CsgStats, Environment};
use crate::geometry::Mesh;
use log::{debug, info};
use nalgebra::{Matrix4, Vector3};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;

/// Boolean operation types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BooleanOp {
    Union,
    Difference,
    Intersection,
}

impl fmt::Display for BooleanOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BooleanOp::Union => "union",
            BooleanOp::Difference => "difference",
            BooleanOp::Intersection => "intersection",
        };
        f.write_str(name)
    }
}

/// One input of a boolean operation
#[derive(Debug, Clone, Copy)]
pub struct Operand<'a> {
    pub mesh: &'a Mesh,
    /// Local to world transform, applied once at import
    pub transform: Matrix4<f64>,
    /// Material tag overriding the tag of every triangle
    pub material: Option<i32>,
}

impl<'a> Operand<'a> {
    pub fn new(mesh: &'a Mesh) -> Self {
        Self {
            mesh,
            transform: Matrix4::identity(),
            material: None,
        }
    }

    pub fn with_transform(mut self, transform: Matrix4<f64>) -> Self {
        self.transform = transform;
        self
    }

    pub fn translated(self, offset: Vector3<f64>) -> Self {
        let transform = Matrix4::new_translation(&offset) * self.transform;
        self.with_transform(transform)
    }

    pub fn with_material(mut self, material: i32) -> Self {
        self.material = Some(material);
        self
    }
}

/// Result of a boolean operation
#[derive(Debug, Clone)]
pub struct BooleanOutput {
    /// Every resulting triangle
    pub mesh: Mesh,
    /// One mesh per material tag; empty unless the result carries several tags
    pub sub_meshes: BTreeMap<i32, Mesh>,
    pub stats: CsgStats,
    /// Problems recovered from along the way
    pub issues: Vec<CsgError>,
}

impl BooleanOutput {
    fn new(mesh: Mesh, stats: CsgStats, issues: Vec<CsgError>) -> Self {
        let sub_meshes = if mesh.materials().len() > 1 {
            mesh.split_by_material()
        } else {
            BTreeMap::new()
        };
        Self {
            mesh,
            sub_meshes,
            stats,
            issues,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.mesh.is_empty()
    }

    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }
}

/// Runs boolean operations with one environment and cancellation token
#[derive(Debug, Clone, Default)]
pub struct BooleanEngine {
    env: Environment,
    cancel: CancelToken,
}

impl BooleanEngine {
    pub fn new(env: Environment) -> Self {
        Self {
            env,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    /// Handle for cancelling operations run by this engine
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn union(&self, a: &Mesh, b: &Mesh) -> Result<BooleanOutput, CsgError> {
        self.apply(BooleanOp::Union, a, b)
    }

    pub fn difference(&self, a: &Mesh, b: &Mesh) -> Result<BooleanOutput, CsgError> {
        self.apply(BooleanOp::Difference, a, b)
    }

    pub fn intersection(&self, a: &Mesh, b: &Mesh) -> Result<BooleanOutput, CsgError> {
        self.apply(BooleanOp::Intersection, a, b)
    }

    pub fn apply(&self, op: BooleanOp, a: &Mesh, b: &Mesh) -> Result<BooleanOutput, CsgError> {
        self.apply_operands(op, &Operand::new(a), &Operand::new(b))
    }

    pub fn apply_operands(
        &self,
        op: BooleanOp,
        a: &Operand<'_>,
        b: &Operand<'_>,
    ) -> Result<BooleanOutput, CsgError> {
        let started = Instant::now();
        self.env.validate()?;

        let mut first = Solid::from_mesh(a.mesh, &a.transform, a.material, &self.env)?;
        let mut second = Solid::from_mesh(b.mesh, &b.transform, b.material, &self.env)?;

        if let Err(err) = self.split_and_classify(&mut first, &mut second) {
            let mut issues = first.take_issues();
            issues.extend(second.take_issues());
            return Err(err.chain(issues));
        }

        let mesh = Self::compose(op, &first, &second, &self.env);

        let mut stats = first.stats().clone();
        stats.merge(second.stats());
        stats.output_triangles = mesh.triangle_count();
        stats.output_vertices = mesh.vertex_count();
        stats.elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        let mut issues = first.take_issues();
        issues.extend(second.take_issues());

        info!(
            "{}: {} + {} faces -> {} triangles in {:.2}ms ({} splits, {} issues)",
            op,
            first.stats().input_faces,
            second.stats().input_faces,
            stats.output_triangles,
            stats.elapsed_ms,
            stats.splits.total(),
            issues.len()
        );

        Ok(BooleanOutput::new(mesh, stats, issues))
    }

    fn split_and_classify(&self, first: &mut Solid, second: &mut Solid) -> Result<(), CsgError> {
        first.split_faces(second, &self.env, &self.cancel)?;
        second.split_faces(first, &self.env, &self.cancel)?;
        debug!("Split into {} and {} faces", first.len(), second.len());

        first.classify_faces(second, &self.env, &self.cancel)?;
        second.classify_faces(first, &self.env, &self.cancel)?;
        Ok(())
    }

    /// Select the faces of two split and classified solids for `op`
    pub fn compose(op: BooleanOp, first: &Solid, second: &Solid, env: &Environment) -> Mesh {
        let mut mesh = Mesh::new();
        match op {
            BooleanOp::Union => {
                first.append_to_mesh(
                    &mut mesh,
                    |s| matches!(s, FaceStatus::Outside | FaceStatus::Same),
                    env,
                );
                second.append_to_mesh(&mut mesh, |s| s == FaceStatus::Outside, env);
            }
            BooleanOp::Difference => {
                first.append_to_mesh(
                    &mut mesh,
                    |s| matches!(s, FaceStatus::Outside | FaceStatus::Opposite),
                    env,
                );
                second
                    .invert_faces(FaceStatus::Inside)
                    .append_to_mesh(&mut mesh, |s| s == FaceStatus::Inside, env);
            }
            BooleanOp::Intersection => {
                first.append_to_mesh(
                    &mut mesh,
                    |s| matches!(s, FaceStatus::Inside | FaceStatus::Same),
                    env,
                );
                second.append_to_mesh(&mut mesh, |s| s == FaceStatus::Inside, env);
            }
        }
        mesh
    }

    /// Fold several operations left to right, starting from `base`
    pub fn apply_sequence(
        &self,
        base: &Operand<'_>,
        steps: &[(BooleanOp, Operand<'_>)],
    ) -> Result<BooleanOutput, CsgError> {
        let mut current = base.mesh.clone();
        current.transform(&base.transform);
        if let Some(material) = base.material {
            current.set_material(material);
        }

        let mut stats = CsgStats::new();
        let mut issues = Vec::new();
        for (op, operand) in steps {
            let output = self
                .apply_operands(*op, &Operand::new(&current), operand)
                .map_err(|err| err.chain(std::mem::take(&mut issues)))?;
            stats.merge(&output.stats);
            issues.extend(output.issues);
            current = output.mesh;
        }

        stats.output_triangles = current.triangle_count();
        stats.output_vertices = current.vertex_count();
        Ok(BooleanOutput::new(current, stats, issues))
    }
}
