//! Error types shared across the network model and traces.

use thiserror::Error;

use crate::network::model::EquipmentKind;

/// Structural errors raised while building or extending a [`Network`](crate::network::Network).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NetworkError {
    #[error("duplicate mRID \"{0}\"")]
    DuplicateMrid(String),

    #[error("unknown mRID \"{0}\"")]
    UnknownMrid(String),

    #[error("{mrid} ({kind}) requires {expected} terminal(s), got {actual}")]
    TerminalCount {
        mrid: String,
        kind: EquipmentKind,
        expected: usize,
        actual: usize,
    },

    #[error("terminal {0} is already connected to a different node")]
    AlreadyConnected(String),

    #[error("invalid terminal reference \"{0}\" (expected `<mrid>:<sequence>`)")]
    InvalidTerminalRef(String),

    #[error("{equipment} has no terminal on node {node}")]
    NotOnNode { equipment: String, node: String },

    #[error("{0} cannot be attached to an equivalent branch")]
    UnsupportedEquivalent(EquipmentKind),
}

/// Errors returned by trace result queries.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TraceError {
    #[error("leaf tracking was not enabled when the tree builder was created")]
    LeafTrackingDisabled,
}

/// A phase code string that does not parse.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid phase code \"{0}\"")]
pub struct ParsePhaseCodeError(pub String);
