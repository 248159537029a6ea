//! Widget types: the interactive controls bound to a node

use super::graph::GraphMut;
use super::node::NodeId;
use crate::constants::layout;
use egui::Pos2;
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// Kind of control a widget renders as
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WidgetKind {
    Combo,
    Toggle,
    Number,
    Text,
    /// Multi-line text area backed by a bound element
    #[serde(rename = "customtext")]
    MultilineText,
    Custom(String),
}

/// Value held by a widget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WidgetValue {
    Boolean(bool),
    Number(f64),
    Text(String),
}

impl WidgetValue {
    pub fn is_boolean(&self) -> bool {
        matches!(self, WidgetValue::Boolean(_))
    }

    pub fn is_number(&self) -> bool {
        matches!(self, WidgetValue::Number(_))
    }
}

impl From<bool> for WidgetValue {
    fn from(value: bool) -> Self {
        WidgetValue::Boolean(value)
    }
}

impl From<f64> for WidgetValue {
    fn from(value: f64) -> Self {
        WidgetValue::Number(value)
    }
}

impl From<&str> for WidgetValue {
    fn from(value: &str) -> Self {
        WidgetValue::Text(value.to_string())
    }
}

impl From<String> for WidgetValue {
    fn from(value: String) -> Self {
        WidgetValue::Text(value)
    }
}

/// Widget options, a subset of what the host understands
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WidgetOptions {
    /// Choices of a combo widget
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub multiline: bool,
}

/// Context handed to a widget callback
pub struct CallbackContext<'a> {
    /// Node owning the widget
    pub node: NodeId,
    /// Canvas pointer position when the edit was applied
    pub pointer: Pos2,
    /// True when the edit did not come from a pointer interaction on this widget
    pub synthetic: bool,
    /// The rest of the graph; the owning node is detached while the callback runs
    pub graph: &'a mut dyn GraphMut,
}

/// Host-side callback invoked after a widget value changes
pub type WidgetCallback = Rc<dyn Fn(&WidgetValue, &mut CallbackContext<'_>)>;

/// Wrap a closure as a widget callback
pub fn callback(f: impl Fn(&WidgetValue, &mut CallbackContext<'_>) + 'static) -> WidgetCallback {
    Rc::new(f)
}

/// Handle to a resource bound to a widget outside the canvas (e.g. a text area)
#[derive(Debug, Clone)]
pub struct ElementHandle {
    live: Rc<Cell<bool>>,
}

impl ElementHandle {
    pub fn new() -> Self {
        Self { live: Rc::new(Cell::new(true)) }
    }

    pub fn release(&self) {
        self.live.set(false);
    }

    pub fn is_live(&self) -> bool {
        self.live.get()
    }
}

impl Default for ElementHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Where a proxy widget forwards its edits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayBinding {
    /// Port ordinal parsed once from the port name
    pub ordinal: Option<u32>,
    pub target_node: NodeId,
    pub target_widget: String,
}

/// An interactive control on a node
#[derive(Clone)]
pub struct Widget {
    pub name: String,
    pub kind: WidgetKind,
    pub value: WidgetValue,
    pub options: WidgetOptions,
    /// Rendered label, possibly truncated
    pub label: Option<String>,
    /// Untruncated label the rendered one was derived from
    pub full_label: Option<String>,
    pub callback: Option<WidgetCallback>,
    /// Set on proxy widgets; edits are forwarded to the bound target
    pub relay: Option<RelayBinding>,
    pub element: Option<ElementHandle>,
}

impl Widget {
    pub fn new(name: impl Into<String>, kind: WidgetKind, value: impl Into<WidgetValue>) -> Self {
        Self {
            name: name.into(),
            kind,
            value: value.into(),
            options: WidgetOptions::default(),
            label: None,
            full_label: None,
            callback: None,
            relay: None,
            element: None,
        }
    }

    pub fn with_options(mut self, options: WidgetOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_callback(mut self, callback: WidgetCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Label shown on the canvas
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }

    /// Vertical space this widget takes in the node body
    pub fn height(&self) -> f32 {
        match self.kind {
            WidgetKind::MultilineText => layout::MULTILINE_WIDGET_HEIGHT,
            _ => layout::WIDGET_HEIGHT,
        }
    }

    /// Release any bound element
    pub fn release(&mut self) {
        if let Some(element) = self.element.take() {
            element.release();
        }
    }
}

impl fmt::Debug for Widget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Widget")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("value", &self.value)
            .field("options", &self.options)
            .field("label", &self.label)
            .field("full_label", &self.full_label)
            .field("callback", &self.callback.is_some())
            .field("relay", &self.relay)
            .field("element", &self.element.as_ref().map(ElementHandle::is_live))
            .finish()
    }
}
