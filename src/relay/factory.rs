//! Proxy widget factory
//!
//! Builds the local control mirroring a target widget and wires its edit
//! callback so every local edit lands in the target.

use super::naming::parse_ordinal;
use super::ProxyNode;
use crate::nodes::{
    callback, CallbackContext, GraphMut, Node, RelayBinding, Widget, WidgetKind, WidgetValue,
};
use log::debug;

/// Control kinds a proxy widget can take
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyKind {
    Combo,
    Toggle,
    Number,
    Text,
    MultilineText,
}

impl ProxyKind {
    /// Pick the local control for a target, first match wins:
    /// combo, toggle, number, multi-line text, one-line text
    pub fn for_target(target: &Widget) -> Self {
        if target.kind == WidgetKind::Combo || target.options.values.is_some() {
            ProxyKind::Combo
        } else if target.value.is_boolean() || target.kind == WidgetKind::Toggle {
            ProxyKind::Toggle
        } else if target.value.is_number() || target.kind == WidgetKind::Number {
            ProxyKind::Number
        } else if target.kind == WidgetKind::MultilineText || target.options.multiline {
            ProxyKind::MultilineText
        } else {
            ProxyKind::Text
        }
    }

    fn widget_kind(self) -> WidgetKind {
        match self {
            ProxyKind::Combo => WidgetKind::Combo,
            ProxyKind::Toggle => WidgetKind::Toggle,
            ProxyKind::Number => WidgetKind::Number,
            ProxyKind::Text => WidgetKind::Text,
            ProxyKind::MultilineText => WidgetKind::MultilineText,
        }
    }
}

/// Write a local edit into the bound target widget.
///
/// The target's own callback runs with a synthetic context since the edit
/// did not come from a pointer on that widget. Returns false when the
/// target can no longer be found.
pub fn relay_edit(graph: &mut dyn GraphMut, binding: &RelayBinding, value: &WidgetValue) -> bool {
    let Some(target) = graph.widget_mut(binding.target_node, &binding.target_widget) else {
        debug!(
            "Edit target {}::{} is gone, dropping edit",
            binding.target_node, binding.target_widget
        );
        return false;
    };
    target.value = value.clone();
    let target_callback = target.callback.clone();

    if let Some(target_callback) = target_callback {
        let pointer = graph.pointer_pos();
        let mut ctx = CallbackContext {
            node: binding.target_node,
            pointer,
            synthetic: true,
            graph: &mut *graph,
        };
        target_callback(value, &mut ctx);
    }
    graph.mark_dirty(binding.target_node);
    true
}

impl ProxyNode<'_> {
    /// Create and attach the local widget for port `port_name` mirroring
    /// `target` on `target_node`
    pub fn create_local_widget(&mut self, port_name: &str, target: &Widget, target_node: &Node) -> &mut Widget {
        let kind = ProxyKind::for_target(target);
        let binding = RelayBinding {
            ordinal: parse_ordinal(port_name),
            target_node: target_node.id,
            target_widget: target.name.clone(),
        };

        let stored = self
            .node
            .output_index(port_name)
            .and_then(|slot| self.node.properties.port_labels.get(&slot))
            .cloned();
        let (label, full_label) = match stored {
            Some(full) => (self.truncate_label(&full), Some(full)),
            None => (target.label.clone().unwrap_or_else(|| target.name.clone()), None),
        };

        let edit = {
            let binding = binding.clone();
            callback(move |value, ctx| {
                relay_edit(&mut *ctx.graph, &binding, value);
            })
        };

        debug!(
            "Creating {:?} proxy `{}` for {}::{}",
            kind, port_name, target_node.id, target.name
        );
        let widget = match kind {
            ProxyKind::MultilineText => {
                self.node
                    .add_multiline_widget(port_name, target.value.clone(), target.options.clone())
            }
            _ => self.node.add_widget(
                Widget::new(port_name, kind.widget_kind(), target.value.clone())
                    .with_options(target.options.clone()),
            ),
        };
        widget.callback = Some(edit);
        widget.relay = Some(binding);
        widget.label = Some(label);
        widget.full_label = full_label;
        widget
    }

    /// Remove the local widget named `name`, releasing its bound element.
    /// The port it belonged to loses both its shown and stored label.
    pub fn remove_local_widget(&mut self, name: &str) -> bool {
        if self.node.remove_widget(name).is_none() {
            return false;
        }
        if let Some(slot) = self.node.output_index(name) {
            self.node.outputs[slot].label = None;
            self.node.properties.port_labels.remove(&slot);
        }
        debug!("Removed proxy widget `{}` from node {}", name, self.node.id);
        true
    }
}
