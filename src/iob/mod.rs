// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Inside/Outside/Boundary boolean engine.
//!
//! Two solids are split against each other until no face of one crosses a
//! face of the other, every face is classified relative to the other solid,
//! and the result keeps the faces the requested operator selects.

mod cancel;
mod engine;
mod environment;
mod error;
pub mod face;
pub mod plane;
pub mod ray;
pub mod segment;
pub mod solid;
pub mod split;
mod stats;
pub mod vertex;

pub use cancel::CancelToken;
pub use engine::{BooleanEngine, BooleanOp, BooleanOutput, Operand};
pub use environment::{Environment, CONFIG_FILE};
pub use error::CsgError;
pub use face::{Face, FaceStatus};
pub use solid::Solid;
pub use stats::{CsgStats, SplitCounts};
pub use vertex::{VertexArena, VertexId, VertexStatus};

/// Recoverable problems collected during one operation
pub type Issues = Vec<CsgError>;
