//! Error types for the relay engine and its host model

use crate::nodes::{LinkId, NodeId};
use thiserror::Error;

/// Failures surfaced by host operations and engine passes.
///
/// Resolution misses inside a reconciliation pass are not errors; they are
/// skipped and logged. These variants cover requests that cannot be honored.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("node {0} does not exist")]
    NodeNotFound(NodeId),

    #[error("link {0} does not exist")]
    LinkNotFound(LinkId),

    #[error("node {node} has no {side} slot {slot}")]
    SlotNotFound {
        node: NodeId,
        side: &'static str,
        slot: usize,
    },

    #[error("node {node} has no widget named `{name}`")]
    WidgetNotFound { node: NodeId, name: String },

    #[error("cannot connect node {0} to itself")]
    SelfConnection(NodeId),

    #[error("no behavior registered for node kind `{0}`")]
    UnknownKind(String),

    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid serialized data: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RelayError>;
