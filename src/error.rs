//! Error types for structural operations on the scene.
//!
//! Every fallible operation validates its arguments before touching the
//! tree, so an `Err` always leaves the scene exactly as it was.

use thiserror::Error;

use crate::scene::{NodeId, RenderGroupId};

/// Errors raised by scene and batcher operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// The handle refers to a node that was destroyed (or never existed).
    #[error("node {0:?} is not alive")]
    StaleNode(NodeId),

    /// The handle refers to a render group that was released.
    #[error("render group {0:?} is not alive")]
    StaleRenderGroup(RenderGroupId),

    /// A child index was outside `0..=len` (insert) or `0..len` (access).
    #[error("index {index} is out of bounds for {len} children")]
    IndexOutOfBounds {
        /// The requested index.
        index: usize,
        /// Number of children at the time of the call.
        len: usize,
    },

    /// A child range was outside the children array.
    #[error("range {begin}..{end} is outside the acceptable range for {len} children")]
    RangeOutOfBounds {
        /// Start of the range.
        begin: usize,
        /// End of the range (exclusive).
        end: usize,
        /// Number of children at the time of the call.
        len: usize,
    },

    /// The node is not a direct child of the given parent.
    #[error("node {child:?} is not a child of {parent:?}")]
    NotAChild {
        /// The container that was searched.
        parent: NodeId,
        /// The node that was looked for.
        child: NodeId,
    },

    /// Attaching would make a node its own ancestor.
    #[error("adding {child:?} to {parent:?} would create a cycle")]
    CycleDetected {
        /// The would-be parent.
        parent: NodeId,
        /// The would-be child.
        child: NodeId,
    },

    /// The scene root always keeps its node and its render group.
    #[error("{0:?} is the scene root and must keep its render group")]
    RootNode(NodeId),

    /// A graphics part addresses vertices or indices its geometry does not
    /// have.
    #[error("graphics part {part} is out of range: {reason}")]
    InvalidGeometry {
        /// Position of the part in the view.
        part: usize,
        /// What was out of range.
        reason: String,
    },

    /// Configuration values were rejected.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for scene operations.
pub type SceneResult<T> = Result<T, SceneError>;
