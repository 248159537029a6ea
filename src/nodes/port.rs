//! Port types and functionality for node connections

use super::graph::LinkId;
use serde::{Deserialize, Serialize};

/// Index of a port within its node's input or output list
pub type PortId = usize;

/// Type of port (input or output)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortType {
    Input,
    Output,
}

impl PortType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PortType::Input => "input",
            PortType::Output => "output",
        }
    }
}

/// Represents a connection point on a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    pub name: String,
    pub port_type: PortType,
    /// Accepted data type, `"*"` for anything
    pub data_type: String,
    /// Display label; the name is shown when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Attached links. Inputs hold at most one.
    #[serde(default)]
    pub links: Vec<LinkId>,
}

impl Port {
    /// Creates a new unconnected port
    pub fn new(name: impl Into<String>, port_type: PortType, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            port_type,
            data_type: data_type.into(),
            label: None,
            links: Vec::new(),
        }
    }

    pub fn is_connected(&self) -> bool {
        !self.links.is_empty()
    }

    /// First attached link, the one a proxy output mirrors
    pub fn first_link(&self) -> Option<LinkId> {
        self.links.first().copied()
    }

    /// Label shown on the canvas
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }
}
