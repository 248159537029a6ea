//! Node types and core node functionality

use super::port::{Port, PortId, PortType};
use super::widget::{ElementHandle, Widget, WidgetKind, WidgetOptions, WidgetValue};
use crate::constants::layout;
use egui::Vec2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Unique identifier for a node
pub type NodeId = usize;

/// Custom key/value data persisted with a node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Properties {
    /// Full (untruncated) port labels keyed by 0-based output slot
    #[serde(rename = "portLabels", default)]
    pub port_labels: BTreeMap<usize, String>,
}

/// Core node structure representing a visual node in the graph
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub type_name: String,
    pub title: String,
    pub size: Vec2,
    pub inputs: Vec<Port>,
    pub outputs: Vec<Port>,
    pub widgets: Vec<Widget>,
    pub properties: Properties,
    /// Set when the node needs a redraw
    pub dirty: bool,
}

impl Node {
    /// Creates a new node with the specified properties
    pub fn new(id: NodeId, type_name: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id,
            type_name: type_name.into(),
            title: title.into(),
            size: Vec2::new(layout::MIN_NODE_WIDTH, layout::SLOT_HEIGHT),
            inputs: vec![],
            outputs: vec![],
            widgets: vec![],
            properties: Properties::default(),
            dirty: false,
        }
    }

    /// Adds an input port to the node
    pub fn add_input(&mut self, name: impl Into<String>, data_type: impl Into<String>) -> &mut Self {
        self.inputs.push(Port::new(name, PortType::Input, data_type));
        self
    }

    /// Adds an output port to the node
    pub fn add_output(&mut self, name: impl Into<String>, data_type: impl Into<String>) -> &mut Self {
        self.outputs.push(Port::new(name, PortType::Output, data_type));
        self
    }

    /// Removes an output port, shifting later ports down one slot.
    ///
    /// Link records still point at the old slots; the graph rebinds them
    /// once the node is back in its table.
    pub fn remove_output(&mut self, slot: PortId) -> Option<Port> {
        if slot < self.outputs.len() {
            Some(self.outputs.remove(slot))
        } else {
            None
        }
    }

    /// Drops every output past `len`, returning the removed ports
    pub fn truncate_outputs(&mut self, len: usize) -> Vec<Port> {
        if self.outputs.len() > len {
            self.outputs.split_off(len)
        } else {
            Vec::new()
        }
    }

    pub fn is_output_connected(&self, slot: PortId) -> bool {
        self.outputs.get(slot).is_some_and(Port::is_connected)
    }

    pub fn output_index(&self, name: &str) -> Option<PortId> {
        self.outputs.iter().position(|port| port.name == name)
    }

    pub fn input(&self, slot: PortId) -> Option<&Port> {
        self.inputs.get(slot)
    }

    pub fn add_widget(&mut self, widget: Widget) -> &mut Widget {
        self.widgets.push(widget);
        let last = self.widgets.len() - 1;
        &mut self.widgets[last]
    }

    /// Host constructor for a multi-line text area with its bound element
    pub fn add_multiline_widget(
        &mut self,
        name: impl Into<String>,
        value: impl Into<WidgetValue>,
        mut options: WidgetOptions,
    ) -> &mut Widget {
        options.multiline = true;
        let mut widget = Widget::new(name, WidgetKind::MultilineText, value).with_options(options);
        widget.element = Some(ElementHandle::new());
        self.add_widget(widget)
    }

    pub fn find_widget(&self, name: &str) -> Option<&Widget> {
        self.widgets.iter().find(|w| w.name == name)
    }

    pub fn find_widget_mut(&mut self, name: &str) -> Option<&mut Widget> {
        self.widgets.iter_mut().find(|w| w.name == name)
    }

    /// Removes a widget by name and releases its bound element
    pub fn remove_widget(&mut self, name: &str) -> Option<Widget> {
        let index = self.widgets.iter().position(|w| w.name == name)?;
        let mut widget = self.widgets.remove(index);
        widget.release();
        Some(widget)
    }

    /// Smallest size that fits the title, all port rows and all widgets
    pub fn compute_size(&self) -> Vec2 {
        let title_width = self.title.chars().count() as f32 * layout::TITLE_CHAR_WIDTH + 40.0;
        let width = layout::MIN_NODE_WIDTH.max(title_width);

        let rows = self.inputs.len().max(self.outputs.len()).max(1) as f32;
        let widgets: f32 = self
            .widgets
            .iter()
            .map(|w| w.height() + layout::WIDGET_SPACING)
            .sum();
        let height = rows * layout::SLOT_HEIGHT + widgets + layout::BOTTOM_PADDING;

        Vec2::new(width, height)
    }

    pub fn set_size(&mut self, size: Vec2) {
        self.size = size;
    }

    /// Flag the node for redraw
    pub fn set_dirty_canvas(&mut self) {
        self.dirty = true;
    }
}

/// Persisted form of a widget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedWidget {
    pub name: String,
    pub kind: WidgetKind,
    pub value: WidgetValue,
    #[serde(default, skip_serializing_if = "is_default_options")]
    pub options: WidgetOptions,
}

fn is_default_options(options: &WidgetOptions) -> bool {
    *options == WidgetOptions::default()
}

impl From<&Widget> for SerializedWidget {
    fn from(widget: &Widget) -> Self {
        Self {
            name: widget.name.clone(),
            kind: widget.kind.clone(),
            value: widget.value.clone(),
            options: widget.options.clone(),
        }
    }
}

/// Persisted form of a node, as written by the host's save cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedNode {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub type_name: String,
    pub title: String,
    #[serde(with = "vec2_serde")]
    pub size: Vec2,
    #[serde(default)]
    pub inputs: Vec<Port>,
    #[serde(default)]
    pub outputs: Vec<Port>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub widgets: Option<Vec<SerializedWidget>>,
    #[serde(default)]
    pub properties: Properties,
}

// Serde helper module for egui sizes
mod vec2_serde {
    use super::*;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(vec: &Vec2, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        [vec.x, vec.y].serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec2, D::Error>
    where
        D: Deserializer<'de>,
    {
        let [x, y] = <[f32; 2]>::deserialize(deserializer)?;
        Ok(Vec2::new(x, y))
    }
}
