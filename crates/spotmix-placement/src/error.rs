//! Placement error types.

use spotmix_state::StateError;
use thiserror::Error;

/// Boxed collaborator error, as returned by a [`ClusterView`](crate::view::ClusterView)
/// or [`TaskPatcher`](crate::view::TaskPatcher) implementation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that make a node unscorable or abort a cycle.
#[derive(Debug, Error)]
pub enum PlacementError {
    #[error("node not found: {0}")]
    NodeNotFound(String),

    #[error("node lookup failed for {node}: {source}")]
    Lookup { node: String, source: BoxError },

    #[error("sibling query failed for task {task}: {source}")]
    Query { task: String, source: BoxError },

    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error("task already bound: {0}")]
    AlreadyBound(String),

    #[error("scoring worker failed: {0}")]
    Worker(String),

    #[error("state store error: {0}")]
    State(#[from] StateError),
}

pub type PlacementResult<T> = Result<T, PlacementError>;

/// A malformed availability-guarantee label. Always recovered by the
/// caller (treated as zero).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("availability guarantee {value:?} is not a non-negative integer")]
pub struct GuaranteeParseError {
    pub value: String,
}
