//! Connectivity traces over CIM-style electrical networks.
//!
//! A [`network::Network`] holds equipment, terminals and connectivity nodes.
//! The generic [`traversal`] engine walks any graph with pluggable stop and
//! queue conditions. [`trace`] builds the network-aware traces on top of it:
//! feeder direction assignment, phase energization, associated-terminal
//! walks and equipment trees.

pub mod config;
pub mod error;
pub mod io;
pub mod network;
pub mod report;
pub mod telemetry;
pub mod trace;
pub mod traversal;
