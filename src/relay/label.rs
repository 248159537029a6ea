//! Port label formatting
//!
//! Full labels live in `properties.portLabels`; ports and widgets only ever
//! show the form truncated to the current node width. Truncation keeps the
//! tail of the label since the input name at the end is what tells
//! neighbouring ports apart.

use super::ProxyNode;
use crate::config::LabelMetrics;
use crate::constants::label::ELLIPSIS;
use crate::nodes::PortId;

/// Fit `full_label` into the character budget of a node `node_width` wide
pub fn truncate(full_label: &str, node_width: f32, metrics: &LabelMetrics) -> String {
    if full_label.is_empty() {
        return String::new();
    }

    let budget = metrics.char_budget(node_width);
    let len = full_label.chars().count();
    if len <= budget {
        return full_label.to_string();
    }

    let marker = ELLIPSIS.chars().count();
    if budget <= marker {
        return ELLIPSIS.chars().take(budget).collect();
    }

    let keep = budget - marker;
    let tail: String = full_label.chars().skip(len - keep).collect();
    format!("{}{}", ELLIPSIS, tail)
}

/// Label given to a port the first time it mirrors a target
pub fn default_label(target_title: &str, input_name: &str) -> String {
    format!("{}: {}", target_title, input_name)
}

impl ProxyNode<'_> {
    /// Truncate against this node's current width
    pub fn truncate_label(&self, full_label: &str) -> String {
        truncate(full_label, self.node.size.x, &self.config.label)
    }

    /// Re-render stored labels onto ports whose shown label drifted
    pub fn apply_stored_labels(&mut self) {
        for slot in 0..self.node.outputs.len() {
            let Some(full) = self.node.properties.port_labels.get(&slot) else {
                continue;
            };
            let rendered = self.truncate_label(full);
            let port = &mut self.node.outputs[slot];
            if port.label.as_deref() != Some(rendered.as_str()) {
                port.label = Some(rendered);
            }
        }
    }

    /// Render the stored label of `slot` onto its port and local widget
    pub(crate) fn render_label(&mut self, slot: PortId) {
        let Some(full) = self.node.properties.port_labels.get(&slot).cloned() else {
            return;
        };
        let rendered = self.truncate_label(&full);
        let Some(port) = self.node.outputs.get_mut(slot) else {
            return;
        };
        port.label = Some(rendered.clone());
        let name = port.name.clone();
        if let Some(widget) = self.node.find_widget_mut(&name) {
            widget.full_label = Some(full);
            widget.label = Some(rendered);
        }
    }

    /// Re-render every stored label after the node width changed
    pub fn update_labels_for_width(&mut self) {
        let slots: Vec<PortId> = self
            .node
            .properties
            .port_labels
            .keys()
            .copied()
            .filter(|&slot| slot < self.node.outputs.len())
            .collect();
        for slot in slots {
            self.render_label(slot);
        }
        self.node.set_dirty_canvas();
    }

    /// Replace the full label of a port
    pub fn relabel_port(&mut self, slot: PortId, full_label: impl Into<String>) -> bool {
        if slot >= self.node.outputs.len() {
            return false;
        }
        self.node.properties.port_labels.insert(slot, full_label.into());
        self.render_label(slot);
        self.node.set_dirty_canvas();
        true
    }
}
