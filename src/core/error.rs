use std::io;

use crate::network::TickPhase;
use crate::topology::{NodeId, RegionKind};

/// Result type for network operations.
pub type NetworkResult<T> = Result<T, NetworkError>;

/// Errors raised while assembling or driving a network.
///
/// Topology and ordering errors are caller bugs: they are reported before
/// any visible mutation happens, and callers are expected to abort rather
/// than retry.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("node {0} has no identifier and cannot be registered")]
    MissingIdentifier(NodeId),

    #[error("identifier {0:?} is already registered")]
    DuplicateIdentifier(String),

    #[error("unknown node handle {0}")]
    UnknownNode(NodeId),

    #[error("node {source_node} cannot feed {target}: {reason}")]
    InvalidSynapseSource {
        source_node: NodeId,
        target: NodeId,
        reason: &'static str,
    },

    #[error("cannot place node in {region:?}: {reason}")]
    InvalidPlacement {
        region: RegionKind,
        reason: &'static str,
    },

    #[error("node {0} is not an operant neuron")]
    NotOperant(NodeId),

    #[error("expected {expected} sensor inputs, got {found}")]
    InputCountMismatch { expected: usize, found: usize },

    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(&'static str),

    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),

    #[error("tick phase violation: expected {expected:?}, found {found:?}")]
    PhaseViolation {
        expected: &'static [TickPhase],
        found: TickPhase,
    },

    #[error("image error: {0}")]
    Image(#[from] io::Error),
}
