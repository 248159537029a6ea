//! Lifecycle controller: drives ports and widgets from host events

use super::naming::{is_proxy_name, port_name};
use super::ProxyNode;
use crate::config::RelayConfig;
use crate::constants::port::ANY_TYPE;
use crate::nodes::{
    ConnectionChange, DeferredTask, DefaultBehavior, Node, NodeBehavior, NodeContext, NodeGraph,
    NodeTemplate, PortType, SerializedNode,
};
use crate::error::Result;
use egui::Vec2;
use log::{debug, info};
use std::rc::Rc;

/// Node kind name the relay registers under
pub const RELAY_KIND: &str = "WidgetRelay";

/// Outputs the relay kind is declared with; creation trims them to one
pub const DECLARED_OUTPUTS: u32 = 10;

/// Node behavior of the relay kind
#[derive(Debug, Clone, Default)]
pub struct RelayBehavior {
    config: RelayConfig,
}

impl RelayBehavior {
    pub fn new(config: RelayConfig) -> Self {
        Self { config }
    }

    fn proxy<'a>(&'a self, node: &'a mut Node) -> ProxyNode<'a> {
        ProxyNode::new(node, &self.config)
    }
}

impl NodeBehavior for RelayBehavior {
    fn on_create(&self, node: &mut Node, ctx: &mut NodeContext<'_>) {
        if node.outputs.is_empty() {
            node.add_output(port_name(1), ANY_TYPE);
        } else if node.outputs.len() > 1 {
            node.truncate_outputs(1);
        }
        let ports = node.outputs.len();
        node.properties.port_labels.retain(|&slot, _| slot < ports);
        node.set_size(Vec2::new(node.size.x, self.config.initial_height));

        ctx.defer(node, DeferredTask::ManagePorts, self.config.delays.after_create);
    }

    fn on_connections_change(&self, node: &mut Node, change: &ConnectionChange, ctx: &mut NodeContext<'_>) {
        if change.side != PortType::Output {
            return;
        }
        debug!(
            "Node {} output {} {} (link {})",
            node.id,
            change.slot,
            if change.connected { "connected" } else { "disconnected" },
            change.link
        );
        self.proxy(node).manage_ports();
        // Let the host finish committing the link before resolving it
        ctx.defer(node, DeferredTask::RefreshWidgets, self.config.delays.after_connection);
    }

    fn on_resize(&self, node: &mut Node, _size: Vec2) {
        self.proxy(node).update_labels_for_width();
    }

    fn on_deferred(&self, node: &mut Node, task: DeferredTask, ctx: &mut NodeContext<'_>) -> Result<()> {
        let mut proxy = self.proxy(node);
        match task {
            DeferredTask::ManagePorts => {
                proxy.manage_ports();
            }
            DeferredTask::RefreshWidgets => {
                proxy.refresh_widgets(ctx.graph);
            }
            DeferredTask::Reconcile => {
                proxy.manage_ports();
                proxy.refresh_widgets(ctx.graph);
            }
        }
        Ok(())
    }

    fn serialize(&self, node: &Node) -> SerializedNode {
        let mut data = DefaultBehavior::serialize_base(node);
        if let Some(widgets) = data.widgets.as_mut() {
            // Proxy widgets are derived from the links, not saved state
            widgets.retain(|w| !is_proxy_name(&w.name));
            if widgets.is_empty() {
                data.widgets = None;
            }
        }
        data
    }

    fn configure(&self, node: &mut Node, data: &SerializedNode, ctx: &mut NodeContext<'_>) {
        DefaultBehavior::configure_base(node, data);

        // Drop declared ports past the saved count before anything renders them
        if node.outputs.len() > data.outputs.len() {
            node.truncate_outputs(data.outputs.len());
        }

        let mut stripped = 0;
        node.widgets.retain_mut(|w| {
            if is_proxy_name(&w.name) || w.relay.is_some() {
                w.release();
                stripped += 1;
                false
            } else {
                true
            }
        });

        self.proxy(node).apply_stored_labels();
        debug!(
            "Restored node {} with {} outputs, {} proxy widgets to rebuild",
            node.id,
            node.outputs.len(),
            stripped
        );

        // Links of sibling nodes may not be loaded yet
        ctx.defer(node, DeferredTask::Reconcile, self.config.delays.after_restore);
    }
}

/// Template the relay kind is declared with
pub fn relay_template() -> NodeTemplate {
    (1..=DECLARED_OUTPUTS).fold(
        NodeTemplate::new(RELAY_KIND).with_title("Widget Relay"),
        |template, ordinal| template.with_output(port_name(ordinal), ANY_TYPE),
    )
}

/// Register the relay kind with a host graph
pub fn register(graph: &mut NodeGraph, config: RelayConfig) {
    graph.register_kind(relay_template(), Rc::new(RelayBehavior::new(config)));
    info!("Registered node kind `{}`", RELAY_KIND);
}
