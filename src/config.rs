//! TOML network descriptions and preset definitions.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::error::NetworkError;
use crate::network::model::{EquipmentKind, Network};
use crate::network::phase::PhaseCode;

/// Network description parsed from TOML.
///
/// Load with [`NetworkConfig::from_toml_file`] or pick a built-in layout with
/// [`NetworkConfig::from_preset`]. Call [`NetworkConfig::validate`] before
/// [`NetworkConfig::build_network`] to get every problem at once.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkConfig {
    #[serde(default)]
    pub equipment: Vec<EquipmentConfig>,
    #[serde(default, rename = "connection")]
    pub connections: Vec<ConnectionConfig>,
    #[serde(default, rename = "feeder")]
    pub feeders: Vec<FeederConfig>,
}

/// One `[[equipment]]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EquipmentConfig {
    pub mrid: String,
    pub kind: EquipmentKind,
    /// Nominal phases of every terminal.
    #[serde(default = "default_phases")]
    pub phases: PhaseCode,
    /// Terminal count, only meaningful for junctions.
    #[serde(default)]
    pub terminals: Option<usize>,
    #[serde(default)]
    pub normally_open: bool,
    /// Current open state, defaults to `normally_open`.
    #[serde(default)]
    pub open: Option<bool>,
    #[serde(default = "default_true")]
    pub in_service: bool,
    #[serde(default = "default_true")]
    pub normally_in_service: bool,
    /// Feeder mRIDs this equipment belongs to.
    #[serde(default)]
    pub feeders: Vec<String>,
}

/// One `[[connection]]` table: a node and the terminals joined on it.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionConfig {
    pub node: String,
    /// `<mrid>:<sequence>` references.
    pub terminals: Vec<String>,
}

/// One `[[feeder]]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeederConfig {
    pub mrid: String,
    /// `<mrid>:<sequence>` of the feeder head terminal.
    #[serde(default)]
    pub head: Option<String>,
}

fn default_phases() -> PhaseCode {
    PhaseCode::ABC
}

fn default_true() -> bool {
    true
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"equipment[2].mrid"`).
    pub field: String,
    pub message: String,
}

impl ConfigError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl EquipmentConfig {
    pub fn new(mrid: &str, kind: EquipmentKind) -> Self {
        Self {
            mrid: mrid.to_string(),
            kind,
            phases: PhaseCode::ABC,
            terminals: None,
            normally_open: false,
            open: None,
            in_service: true,
            normally_in_service: true,
            feeders: Vec::new(),
        }
    }

    fn in_feeder(mut self, feeder: &str) -> Self {
        self.feeders.push(feeder.to_string());
        self
    }

    fn is_open(&self) -> bool {
        self.open.unwrap_or(self.normally_open)
    }
}

impl ConnectionConfig {
    pub fn new(node: &str, terminals: &[&str]) -> Self {
        Self {
            node: node.to_string(),
            terminals: terminals.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl FeederConfig {
    pub fn new(mrid: &str, head: &str) -> Self {
        Self {
            mrid: mrid.to_string(),
            head: Some(head.to_string()),
        }
    }
}

impl NetworkConfig {
    /// Source, breaker, three line sections and a load in a row.
    pub fn linear() -> Self {
        use EquipmentKind::*;
        Self {
            equipment: vec![
                EquipmentConfig::new("src", EnergySource),
                EquipmentConfig::new("cb", Breaker).in_feeder("f1"),
                EquipmentConfig::new("l1", AcLineSegment).in_feeder("f1"),
                EquipmentConfig::new("l2", AcLineSegment).in_feeder("f1"),
                EquipmentConfig::new("l3", AcLineSegment).in_feeder("f1"),
                EquipmentConfig::new("load", EnergyConsumer).in_feeder("f1"),
            ],
            connections: vec![
                ConnectionConfig::new("n0", &["src:1", "cb:1"]),
                ConnectionConfig::new("n1", &["cb:2", "l1:1"]),
                ConnectionConfig::new("n2", &["l1:2", "l2:1"]),
                ConnectionConfig::new("n3", &["l2:2", "l3:1"]),
                ConnectionConfig::new("n4", &["l3:2", "load:1"]),
            ],
            feeders: vec![FeederConfig::new("f1", "cb:2")],
        }
    }

    /// A busbar below the breaker with three lines forming a loop back to it.
    pub fn ring() -> Self {
        use EquipmentKind::*;
        Self {
            equipment: vec![
                EquipmentConfig::new("src", EnergySource),
                EquipmentConfig::new("cb", Breaker).in_feeder("f1"),
                EquipmentConfig::new("bus", BusbarSection).in_feeder("f1"),
                EquipmentConfig::new("l1", AcLineSegment).in_feeder("f1"),
                EquipmentConfig::new("l2", AcLineSegment).in_feeder("f1"),
                EquipmentConfig::new("l3", AcLineSegment).in_feeder("f1"),
                EquipmentConfig::new("load", EnergyConsumer).in_feeder("f1"),
            ],
            connections: vec![
                ConnectionConfig::new("n0", &["src:1", "cb:1"]),
                ConnectionConfig::new("bus-cn", &["cb:2", "bus:1", "l1:1", "l3:2"]),
                ConnectionConfig::new("na", &["l1:2", "l2:1"]),
                ConnectionConfig::new("nb", &["l2:2", "l3:1", "load:1"]),
            ],
            feeders: vec![FeederConfig::new("f1", "cb:2")],
        }
    }

    /// Two feeders meeting at a switch that is normally open but currently
    /// closed.
    pub fn open_point() -> Self {
        use EquipmentKind::*;
        let mut open_point = EquipmentConfig::new("op", Disconnector);
        open_point.normally_open = true;
        open_point.open = Some(false);
        Self {
            equipment: vec![
                EquipmentConfig::new("src1", EnergySource),
                EquipmentConfig::new("cb1", Breaker).in_feeder("f1"),
                EquipmentConfig::new("l1", AcLineSegment).in_feeder("f1"),
                open_point.in_feeder("f1").in_feeder("f2"),
                EquipmentConfig::new("l2", AcLineSegment).in_feeder("f2"),
                EquipmentConfig::new("cb2", Breaker).in_feeder("f2"),
                EquipmentConfig::new("src2", EnergySource),
            ],
            connections: vec![
                ConnectionConfig::new("s1", &["src1:1", "cb1:1"]),
                ConnectionConfig::new("n1", &["cb1:2", "l1:1"]),
                ConnectionConfig::new("n2", &["l1:2", "op:1"]),
                ConnectionConfig::new("n3", &["op:2", "l2:1"]),
                ConnectionConfig::new("n4", &["l2:2", "cb2:2"]),
                ConnectionConfig::new("s2", &["src2:1", "cb2:1"]),
            ],
            feeders: vec![
                FeederConfig::new("f1", "cb1:2"),
                FeederConfig::new("f2", "cb2:2"),
            ],
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["linear", "ring", "open_point"];

    /// Loads a network from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "linear" => Ok(Self::linear()),
            "ring" => Ok(Self::ring()),
            "open_point" => Ok(Self::open_point()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a network description from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("network", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a network description from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Validates every table and returns a list of errors.
    ///
    /// Returns an empty vector if the description can be built.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        if self.equipment.is_empty() {
            errors.push(ConfigError::new("equipment", "at least one equipment is required"));
        }

        let feeder_mrids: HashSet<&str> = self.feeders.iter().map(|f| f.mrid.as_str()).collect();
        let mut terminal_counts: HashMap<&str, usize> = HashMap::new();
        for (i, eq) in self.equipment.iter().enumerate() {
            let field = |name: &str| format!("equipment[{i}].{name}");
            if eq.mrid.is_empty() {
                errors.push(ConfigError::new(field("mrid"), "must not be empty"));
            } else if terminal_counts.contains_key(eq.mrid.as_str()) {
                errors.push(ConfigError::new(
                    field("mrid"),
                    format!("duplicate mRID \"{}\"", eq.mrid),
                ));
            }
            if eq.phases.is_empty() {
                errors.push(ConfigError::new(field("phases"), "must name at least one phase"));
            }
            let count = match (eq.kind.terminal_count(), eq.terminals) {
                (Some(fixed), Some(given)) if fixed != given => {
                    errors.push(ConfigError::new(
                        field("terminals"),
                        format!("{} requires {fixed} terminal(s), got {given}", eq.kind),
                    ));
                    fixed
                }
                (Some(fixed), _) => fixed,
                (None, Some(0)) => {
                    errors.push(ConfigError::new(field("terminals"), "must be > 0"));
                    0
                }
                (None, given) => given.unwrap_or(2),
            };
            if (eq.normally_open || eq.is_open()) && !eq.kind.is_switch() {
                errors.push(ConfigError::new(
                    field("normally_open"),
                    format!("{} is not a switch and cannot be opened", eq.kind),
                ));
            }
            for (j, feeder) in eq.feeders.iter().enumerate() {
                if !feeder_mrids.contains(feeder.as_str()) {
                    errors.push(ConfigError::new(
                        format!("equipment[{i}].feeders[{j}]"),
                        format!("unknown feeder \"{feeder}\""),
                    ));
                }
            }
            terminal_counts.entry(eq.mrid.as_str()).or_insert(count);
        }

        let check_reference = |reference: &str| -> Result<(), String> {
            let (mrid, sequence) = reference
                .rsplit_once(':')
                .ok_or_else(|| format!("\"{reference}\" is not of the form <mrid>:<sequence>"))?;
            let sequence: usize = sequence
                .parse()
                .map_err(|_| format!("\"{sequence}\" is not a terminal sequence number"))?;
            let count = terminal_counts
                .get(mrid)
                .ok_or_else(|| format!("unknown equipment \"{mrid}\""))?;
            if sequence == 0 || sequence > *count {
                return Err(format!("{mrid} has no terminal {sequence}"));
            }
            Ok(())
        };

        let mut nodes = HashSet::new();
        let mut joined = HashSet::new();
        for (i, conn) in self.connections.iter().enumerate() {
            if conn.node.is_empty() {
                errors.push(ConfigError::new(format!("connection[{i}].node"), "must not be empty"));
            } else if !nodes.insert(conn.node.as_str()) {
                errors.push(ConfigError::new(
                    format!("connection[{i}].node"),
                    format!("duplicate node \"{}\"", conn.node),
                ));
            }
            for (j, reference) in conn.terminals.iter().enumerate() {
                let field = format!("connection[{i}].terminals[{j}]");
                if let Err(message) = check_reference(reference) {
                    errors.push(ConfigError::new(field, message));
                } else if !joined.insert(reference.as_str()) {
                    errors.push(ConfigError::new(
                        field,
                        format!("terminal {reference} is connected more than once"),
                    ));
                }
            }
        }

        let mut seen_feeders = HashSet::new();
        for (i, feeder) in self.feeders.iter().enumerate() {
            if feeder.mrid.is_empty() {
                errors.push(ConfigError::new(format!("feeder[{i}].mrid"), "must not be empty"));
            } else if !seen_feeders.insert(feeder.mrid.as_str())
                || terminal_counts.contains_key(feeder.mrid.as_str())
            {
                errors.push(ConfigError::new(
                    format!("feeder[{i}].mrid"),
                    format!("duplicate mRID \"{}\"", feeder.mrid),
                ));
            }
            if let Some(Err(message)) = feeder.head.as_deref().map(&check_reference) {
                errors.push(ConfigError::new(format!("feeder[{i}].head"), message));
            }
        }

        errors
    }

    /// Builds the network: equipment first, then feeders and their members,
    /// then one node per connection.
    ///
    /// # Errors
    ///
    /// Returns the first [`NetworkError`] hit while building. A description
    /// that passes [`NetworkConfig::validate`] only fails on mRIDs shared
    /// between feeders and other containers.
    pub fn build_network(&self) -> Result<Network, NetworkError> {
        let mut network = Network::new();
        for eq in &self.equipment {
            let id = match eq.terminals {
                Some(count) => {
                    network.add_equipment_with_terminals(&eq.mrid, eq.kind, eq.phases, count)?
                }
                None => network.add_equipment(&eq.mrid, eq.kind, eq.phases)?,
            };
            let equipment = network.equipment_mut(id);
            equipment.set_normally_open(eq.normally_open);
            equipment.set_open(eq.is_open());
            equipment.set_normally_in_service(eq.normally_in_service);
            equipment.set_in_service(eq.in_service);
        }

        for feeder in &self.feeders {
            let head = feeder
                .head
                .as_deref()
                .map(|reference| network.resolve_terminal(reference))
                .transpose()?;
            network.add_feeder(&feeder.mrid, head)?;
        }
        for eq in &self.equipment {
            let id = network
                .find_equipment(&eq.mrid)
                .ok_or_else(|| NetworkError::UnknownMrid(eq.mrid.clone()))?;
            for feeder in &eq.feeders {
                let container = network
                    .find_container(feeder)
                    .ok_or_else(|| NetworkError::UnknownMrid(feeder.clone()))?;
                network.add_to_container(id, container);
            }
        }

        for conn in &self.connections {
            let node = network.add_node(&conn.node)?;
            for reference in &conn.terminals {
                let terminal = network.resolve_terminal(reference)?;
                network.connect(terminal, node)?;
            }
        }

        debug!(
            equipment = network.equipment_count(),
            nodes = network.node_count(),
            feeders = self.feeders.len(),
            "network built from config"
        );
        Ok(network)
    }
}
