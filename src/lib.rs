// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Polyframe IOB
//!
//! Boolean operations (union, difference, intersection) on closed triangle
//! meshes. Faces of both solids are split along their mutual intersections,
//! classified as inside, outside or on the boundary of the other solid, and
//! recombined according to the requested operation.

pub mod geometry;
pub mod io;
pub mod iob;

pub use geometry::{Mesh, Primitive, Triangle, Vertex};
pub use io::{load_stl, save_stl};
pub use iob::{
    BooleanEngine, BooleanOp, BooleanOutput, CancelToken, CsgError, CsgStats, Environment,
    Operand,
};

/// Run one boolean operation with the default environment
pub fn boolean(op: BooleanOp, a: &Mesh, b: &Mesh) -> Result<Mesh, CsgError> {
    Ok(BooleanEngine::default().apply(op, a, b)?.mesh)
}
