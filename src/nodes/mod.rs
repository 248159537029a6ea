//! Node system - the host graph model the relay engine runs against

// Core node system modules
pub mod graph;
pub mod hooks;
pub mod node;
pub mod port;
pub mod scheduler;
pub mod widget;

// Re-export core types
pub use graph::{GraphMut, GraphStore, GraphView, Link, LinkId, NodeGraph, NodeTemplate, SerializedGraph};
pub use hooks::{BehaviorRegistry, ConnectionChange, DefaultBehavior, NodeBehavior, NodeContext};
pub use node::{Node, NodeId, Properties, SerializedNode, SerializedWidget};
pub use port::{Port, PortId, PortType};
pub use scheduler::{DeferredTask, Scheduler};
pub use widget::{
    callback, CallbackContext, ElementHandle, RelayBinding, Widget, WidgetCallback, WidgetKind,
    WidgetOptions, WidgetValue,
};
