// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Error types for boolean operations

use thiserror::Error;

/// Problems raised while importing, splitting or classifying solids.
///
/// Local problems (a single degenerate triangle, an ambiguous classification)
/// are collected as issues on the operation output. Systemic problems abort the
/// operation; when issues were collected before the abort they travel with the
/// fatal error inside [`CsgError::Chained`].
#[derive(Debug, Clone, Error)]
pub enum CsgError {
    /// Splitting did not converge, or a ray could not be built where one was required
    #[error("construction failed: {reason}")]
    ConstructionFailed { reason: String },

    /// Cancellation was requested through the operation's token
    #[error("operation interrupted")]
    Interrupted,

    /// Degenerate vertex, plane or face
    #[error("invalid geometry: {reason}")]
    InvalidGeometry { reason: String },

    /// Ray tracing kept landing inside another plane
    #[error("classification indeterminate for face {face} after {attempts} ray attempts")]
    ClassificationIndeterminate { face: usize, attempts: usize },

    /// Input that is not a triangle mesh
    #[error("malformed mesh: {reason}")]
    MalformedMesh { reason: String },

    /// A fatal error together with every issue accumulated before it
    #[error("{primary} ({} related issue(s))", .related.len())]
    Chained {
        #[source]
        primary: Box<CsgError>,
        related: Vec<CsgError>,
    },
}

impl CsgError {
    pub fn construction(reason: impl Into<String>) -> Self {
        Self::ConstructionFailed {
            reason: reason.into(),
        }
    }

    pub fn invalid_geometry(reason: impl Into<String>) -> Self {
        Self::InvalidGeometry {
            reason: reason.into(),
        }
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedMesh {
            reason: reason.into(),
        }
    }

    /// Attach accumulated issues to this error. Returns `self` unchanged when
    /// there is nothing to attach.
    pub fn chain(self, related: Vec<CsgError>) -> Self {
        if related.is_empty() {
            return self;
        }
        match self {
            Self::Chained {
                primary,
                related: mut existing,
            } => {
                existing.extend(related);
                Self::Chained {
                    primary,
                    related: existing,
                }
            }
            other => Self::Chained {
                primary: Box::new(other),
                related,
            },
        }
    }

    /// The error that ended the operation, looking through a chain
    pub fn primary(&self) -> &CsgError {
        match self {
            Self::Chained { primary, .. } => primary.primary(),
            other => other,
        }
    }

    /// Issues accumulated before the primary error
    pub fn related(&self) -> &[CsgError] {
        match self {
            Self::Chained { related, .. } => related,
            _ => &[],
        }
    }

    /// Whether this kind of problem is handled locally instead of aborting
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InvalidGeometry { .. } | Self::ClassificationIndeterminate { .. }
        )
    }
}
