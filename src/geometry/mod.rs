// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometry module - neutral mesh representation, primitives and analytics

pub mod analytics;
mod bbox;
mod mesh;
mod primitives;

pub use analytics::{analyze, is_closed, is_manifold, GeometryStats};
pub use bbox::BoundingBox;
pub use mesh::{Mesh, Triangle, Vertex, DEFAULT_MATERIAL};
pub use primitives::Primitive;
