//! Widget synchronizer
//!
//! Reconciles the local widget list against the live connection targets of
//! the output ports. Every pass recomputes from the current graph, so it is
//! safe to run redundantly.

use super::label::default_label;
use super::naming::{is_proxy_name, parse_ordinal};
use super::ProxyNode;
use crate::nodes::{GraphView, Node, Port, PortId, Widget};
use egui::Vec2;
use log::debug;
use std::collections::HashSet;

/// What a widget pass changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub created: usize,
    pub removed: usize,
}

/// A port's live target, resolved through the link table
struct Resolved<'g> {
    node: &'g Node,
    input_name: &'g str,
    widget: Option<&'g Widget>,
}

fn resolve<'g>(graph: &'g dyn GraphView, port: &Port) -> Option<Resolved<'g>> {
    let link_id = port.first_link()?;
    let Some(link) = graph.link(link_id) else {
        debug!("Port `{}`: link {} not in the link table yet", port.name, link_id);
        return None;
    };
    let Some(node) = graph.node(link.target_id) else {
        debug!("Port `{}`: target node {} not found", port.name, link.target_id);
        return None;
    };
    let Some(input) = node.input(link.target_slot) else {
        debug!("Port `{}`: node {} has no input {}", port.name, node.id, link.target_slot);
        return None;
    };
    Some(Resolved {
        node,
        input_name: &input.name,
        widget: node.find_widget(&input.name),
    })
}

fn is_proxy_widget(widget: &Widget) -> bool {
    widget.relay.is_some() || is_proxy_name(&widget.name)
}

/// Port order of a widget; anything else sorts last
fn sort_key(widget: &Widget) -> u32 {
    widget
        .relay
        .as_ref()
        .and_then(|binding| binding.ordinal)
        .or_else(|| parse_ordinal(&widget.name))
        .unwrap_or(u32::MAX)
}

impl ProxyNode<'_> {
    /// Bring local widgets in line with the current port targets, then
    /// reorder them and grow the node to fit
    pub fn refresh_widgets(&mut self, graph: &dyn GraphView) -> SyncReport {
        let mut report = SyncReport::default();

        // Orphans first, so reconciliation never sees a stale widget
        let live: HashSet<&str> = self.node.outputs.iter().map(|p| p.name.as_str()).collect();
        let orphans: Vec<String> = self
            .node
            .widgets
            .iter()
            .filter(|w| is_proxy_widget(w) && !live.contains(w.name.as_str()))
            .map(|w| w.name.clone())
            .collect();
        for name in orphans {
            if self.remove_local_widget(&name) {
                report.removed += 1;
            }
        }

        for slot in 0..self.node.outputs.len() {
            self.reconcile_port(slot, graph, &mut report);
        }

        self.sort_widgets();
        self.grow_to_fit();
        self.node.set_dirty_canvas();

        if report != SyncReport::default() {
            debug!(
                "Node {} widgets: +{} -{} -> {}",
                self.node.id,
                report.created,
                report.removed,
                self.node.widgets.len()
            );
        }
        report
    }

    fn reconcile_port(&mut self, slot: PortId, graph: &dyn GraphView, report: &mut SyncReport) {
        let port = &self.node.outputs[slot];
        let name = port.name.clone();

        if !port.is_connected() {
            if self.remove_local_widget(&name) {
                report.removed += 1;
            }
            return;
        }

        // Dangling or not yet committed links are retried on the next pass
        let Some(target) = resolve(graph, port) else {
            return;
        };

        // Sockets such as images or latents have no widget to mirror
        let Some(target_widget) = target.widget else {
            if self.remove_local_widget(&name) {
                report.removed += 1;
            }
            return;
        };

        let bound_here = self.node.find_widget(&name).map(|w| {
            w.relay.as_ref().is_some_and(|b| {
                b.target_node == target.node.id && b.target_widget == target_widget.name
            })
        });
        match bound_here {
            Some(true) => {}
            Some(false) => {
                // Rewired: the kind may differ, so rebuild instead of mutating
                self.remove_local_widget(&name);
                report.removed += 1;
                self.create_local_widget(&name, target_widget, target.node);
                report.created += 1;
            }
            None => {
                self.create_local_widget(&name, target_widget, target.node);
                report.created += 1;
            }
        }

        if !self.node.properties.port_labels.contains_key(&slot) {
            let title = if target.node.title.is_empty() {
                &target.node.type_name
            } else {
                &target.node.title
            };
            self.node
                .properties
                .port_labels
                .insert(slot, default_label(title, target.input_name));
        }
        self.render_label(slot);
    }

    /// Order widgets by port ordinal, non-proxy widgets last in their
    /// existing relative order
    pub fn sort_widgets(&mut self) {
        self.node.widgets.sort_by_key(sort_key);
    }

    /// Grow to the computed minimum size; never shrink below the user's size
    fn grow_to_fit(&mut self) {
        let min = self.node.compute_size();
        let current = self.node.size;
        let size = Vec2::new(current.x.max(min.x), current.y.max(min.y));
        if size != current {
            self.node.set_size(size);
            if size.x != current.x {
                self.update_labels_for_width();
            }
        }
    }
}
