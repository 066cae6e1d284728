//! Construction-time errors.
//!
//! Simulation itself never fails: degenerate geometry inside a step falls back
//! to fixed directions and static bodies are handled through zero inverse
//! mass. Only malformed input handed to a constructor is reported here.

use thiserror::Error;

/// Errors raised while building shapes and bodies.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum PhysicsError {
    /// A polygon needs at least three vertices.
    #[error("polygon needs at least 3 vertices, got {0}")]
    TooFewVertices(usize),

    /// A polygon exceeded [`MAX_POLYGON_VERTICES`](crate::shape::MAX_POLYGON_VERTICES).
    #[error("polygon has {count} vertices, capacity is {max}")]
    TooManyVertices {
        /// Number of vertices supplied.
        count: usize,
        /// Fixed capacity.
        max: usize,
    },

    /// The internal-edge flag list must have one entry per vertex.
    #[error("internal edge flags length {flags} does not match vertex count {vertices}")]
    InternalEdgeMismatch {
        /// Number of vertices.
        vertices: usize,
        /// Number of flags supplied.
        flags: usize,
    },

    /// A body exceeded [`MAX_COLLIDERS`](crate::body::MAX_COLLIDERS).
    #[error("body has {count} colliders, capacity is {max}")]
    TooManyColliders {
        /// Number of colliders supplied.
        count: usize,
        /// Fixed capacity.
        max: usize,
    },

    /// A body was built without any collider.
    #[error("body needs at least one collider")]
    NoColliders,

    /// Total area, mass or inertia came out non-positive or non-finite.
    #[error("degenerate mass properties: area {area}, mass {mass}, inertia {inertia}")]
    DegenerateMass {
        /// Summed shape area.
        area: f32,
        /// Derived mass.
        mass: f32,
        /// Derived moment of inertia.
        inertia: f32,
    },

    /// A physical parameter that must be strictly positive was not.
    #[error("{name} must be positive and finite, got {value}")]
    InvalidParameter {
        /// Which parameter was rejected.
        name: &'static str,
        /// The value supplied.
        value: f32,
    },
}

/// Pass `value` through if it is strictly positive and finite.
pub(crate) fn require_positive(name: &'static str, value: f32) -> Result<f32, PhysicsError> {
    if value > 0.0 && value.is_finite() {
        Ok(value)
    } else {
        Err(PhysicsError::InvalidParameter { name, value })
    }
}
