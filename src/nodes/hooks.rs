//! Node lifecycle hooks
//!
//! This module provides a trait-based system for node kinds to react to the
//! host's lifecycle: creation, connection changes, resizing, deferred
//! re-entry and the save/load cycle. Behaviors are registered once per kind.

use super::graph::{GraphView, LinkId};
use super::node::{Node, SerializedNode, SerializedWidget};
use super::port::{PortId, PortType};
use super::scheduler::{DeferredTask, Scheduler};
use super::widget::{Widget, WidgetKind};
use crate::error::Result;
use egui::Vec2;
use std::collections::HashMap;
use std::rc::Rc;

/// A link was attached to or detached from one of the node's slots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionChange {
    /// Which side of the node the slot is on
    pub side: PortType,
    pub slot: PortId,
    pub connected: bool,
    pub link: LinkId,
}

/// What a hook may see and do besides mutating its own node
pub struct NodeContext<'a> {
    /// Every other node and all links. The hooked node is detached.
    pub graph: &'a dyn GraphView,
    pub scheduler: &'a mut Scheduler,
}

impl NodeContext<'_> {
    /// Re-enter the node's behavior after the current dispatch
    pub fn defer(&mut self, node: &Node, task: DeferredTask, delay_ms: u64) {
        self.scheduler.schedule(node.id, task, delay_ms);
    }
}

/// Trait for node-kind lifecycle hooks
pub trait NodeBehavior {
    /// Called once after the host built the node from its template
    fn on_create(&self, _node: &mut Node, _ctx: &mut NodeContext<'_>) {
        // Default: no special handling
    }

    /// Called after a link on either side of the node was committed or removed
    fn on_connections_change(&self, _node: &mut Node, _change: &ConnectionChange, _ctx: &mut NodeContext<'_>) {
        // Default: no special handling
    }

    /// Called after the user resized the node
    fn on_resize(&self, _node: &mut Node, _size: Vec2) {
        // Default: no special handling
    }

    /// Called when a task this behavior scheduled comes due
    fn on_deferred(&self, _node: &mut Node, _task: DeferredTask, _ctx: &mut NodeContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Produce the persisted form of the node. May run any number of times.
    fn serialize(&self, node: &Node) -> SerializedNode {
        DefaultBehavior::serialize_base(node)
    }

    /// Restore persisted state onto a freshly created node
    fn configure(&self, node: &mut Node, data: &SerializedNode, _ctx: &mut NodeContext<'_>) {
        DefaultBehavior::configure_base(node, data);
    }
}

/// The host's own behavior, also composed as the base step of custom kinds
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultBehavior;

impl DefaultBehavior {
    pub fn serialize_base(node: &Node) -> SerializedNode {
        let widgets = if node.widgets.is_empty() {
            None
        } else {
            Some(node.widgets.iter().map(SerializedWidget::from).collect())
        };

        SerializedNode {
            id: node.id,
            type_name: node.type_name.clone(),
            title: node.title.clone(),
            size: node.size,
            inputs: node.inputs.clone(),
            outputs: node.outputs.clone(),
            widgets,
            properties: node.properties.clone(),
        }
    }

    /// Copy persisted state slot by slot. Template ports past the persisted
    /// count are left in place for the kind to deal with.
    pub fn configure_base(node: &mut Node, data: &SerializedNode) {
        node.title = data.title.clone();
        node.size = data.size;
        node.properties = data.properties.clone();

        for (slot, port) in data.inputs.iter().enumerate() {
            match node.inputs.get_mut(slot) {
                Some(existing) => *existing = port.clone(),
                None => node.inputs.push(port.clone()),
            }
        }
        for (slot, port) in data.outputs.iter().enumerate() {
            match node.outputs.get_mut(slot) {
                Some(existing) => *existing = port.clone(),
                None => node.outputs.push(port.clone()),
            }
        }

        for saved in data.widgets.iter().flatten() {
            if let Some(existing) = node.find_widget_mut(&saved.name) {
                existing.value = saved.value.clone();
                continue;
            }
            if saved.kind == WidgetKind::MultilineText {
                node.add_multiline_widget(saved.name.clone(), saved.value.clone(), saved.options.clone());
            } else {
                node.add_widget(
                    Widget::new(saved.name.clone(), saved.kind.clone(), saved.value.clone())
                        .with_options(saved.options.clone()),
                );
            }
        }
    }
}

impl NodeBehavior for DefaultBehavior {}

/// Behaviors keyed by node type name
pub struct BehaviorRegistry {
    behaviors: HashMap<String, Rc<dyn NodeBehavior>>,
    fallback: Rc<dyn NodeBehavior>,
}

impl BehaviorRegistry {
    pub fn new() -> Self {
        Self {
            behaviors: HashMap::new(),
            fallback: Rc::new(DefaultBehavior),
        }
    }

    pub fn register(&mut self, type_name: impl Into<String>, behavior: Rc<dyn NodeBehavior>) {
        let type_name = type_name.into();
        log::debug!("Registered behavior for node kind `{}`", type_name);
        self.behaviors.insert(type_name, behavior);
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.behaviors.contains_key(type_name)
    }

    /// Behavior for a kind, the host default when none was registered
    pub fn get(&self, type_name: &str) -> Rc<dyn NodeBehavior> {
        self.behaviors
            .get(type_name)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

impl Default for BehaviorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
