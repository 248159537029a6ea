//! Widget relay engine
//!
//! A relay node exposes a growing list of outputs. Wiring an output to a
//! widget-backed input of another node creates a local widget on the relay
//! that mirrors the target widget and forwards edits to it. The engine keeps
//! three things consistent: the links, the output list, and the local
//! widgets.
//!
//! The pieces, leaf first:
//! - [`label`]: full labels and their width-fitted render
//! - [`factory`]: builds a local widget for a target and wires its edits
//! - [`ports`]: output count from the link topology
//! - [`sync`]: reconciles local widgets with live link targets
//! - [`lifecycle`]: the node behavior wiring all of it to host events

pub mod factory;
pub mod label;
pub mod lifecycle;
pub mod naming;
pub mod ports;
pub mod sync;

use crate::config::RelayConfig;
use crate::nodes::Node;

pub use factory::{relay_edit, ProxyKind};
pub use label::{default_label, truncate};
pub use lifecycle::{register, relay_template, RelayBehavior, RELAY_KIND};
pub use ports::{needed_ports, PortChanges};
pub use sync::SyncReport;

/// A relay node borrowed for one engine pass
pub struct ProxyNode<'a> {
    node: &'a mut Node,
    config: &'a RelayConfig,
}

impl<'a> ProxyNode<'a> {
    pub fn new(node: &'a mut Node, config: &'a RelayConfig) -> Self {
        Self { node, config }
    }
}
