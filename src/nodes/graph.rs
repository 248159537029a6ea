//! Node graph data structures and operations
//!
//! `NodeGraph` is the host runtime: it owns the node and link tables, routes
//! lifecycle events to the behavior registered for each node kind and runs
//! the deferred queue. Behaviors only ever see their own node mutably; the
//! rest of the graph is reachable through [`GraphView`] / [`GraphMut`].

use super::hooks::{BehaviorRegistry, ConnectionChange, NodeBehavior, NodeContext};
use super::node::{Node, NodeId, SerializedNode};
use super::port::{Port, PortId, PortType};
use super::scheduler::{DeferredTask, Scheduler};
use super::widget::{CallbackContext, Widget, WidgetValue};
use crate::error::{RelayError, Result};
use egui::{Pos2, Vec2};
use log::{debug, error, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

/// Unique identifier for a link
pub type LinkId = usize;

/// A committed connection from an output slot to an input slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub id: LinkId,
    pub origin_id: NodeId,
    pub origin_slot: PortId,
    pub target_id: NodeId,
    pub target_slot: PortId,
}

/// Read-only lookups into the host graph
pub trait GraphView {
    fn link(&self, id: LinkId) -> Option<&Link>;
    fn node(&self, id: NodeId) -> Option<&Node>;
}

/// Write access needed to forward an edit into another node
pub trait GraphMut: GraphView {
    fn widget_mut(&mut self, node: NodeId, name: &str) -> Option<&mut Widget>;
    fn mark_dirty(&mut self, node: NodeId);
    /// Last known canvas pointer position
    fn pointer_pos(&self) -> Pos2;
}

/// Node and link tables
#[derive(Debug, Default)]
pub struct GraphStore {
    nodes: HashMap<NodeId, Node>,
    links: HashMap<LinkId, Link>,
    pointer: Pos2,
}

impl GraphView for GraphStore {
    fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(&id)
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }
}

impl GraphMut for GraphStore {
    fn widget_mut(&mut self, node: NodeId, name: &str) -> Option<&mut Widget> {
        self.nodes.get_mut(&node)?.find_widget_mut(name)
    }

    fn mark_dirty(&mut self, node: NodeId) {
        if let Some(node) = self.nodes.get_mut(&node) {
            node.set_dirty_canvas();
        }
    }

    fn pointer_pos(&self) -> Pos2 {
        self.pointer
    }
}

impl GraphStore {
    /// Point every link at its port's current slot and drop links whose
    /// output port no longer exists
    fn rebind_output_links(&mut self, node_id: NodeId) {
        let Some(node) = self.nodes.get(&node_id) else {
            return;
        };

        let mut bound = HashMap::new();
        for (slot, port) in node.outputs.iter().enumerate() {
            for &link in &port.links {
                bound.insert(link, slot);
            }
        }

        let mut orphaned = Vec::new();
        for link in self.links.values_mut().filter(|l| l.origin_id == node_id) {
            match bound.get(&link.id) {
                Some(&slot) => link.origin_slot = slot,
                None => orphaned.push(link.id),
            }
        }

        for id in orphaned {
            if let Some(link) = self.links.remove(&id) {
                debug!("Dropping link {} of removed output on node {}", id, node_id);
                if let Some(input) = self
                    .nodes
                    .get_mut(&link.target_id)
                    .and_then(|n| n.inputs.get_mut(link.target_slot))
                {
                    input.links.retain(|&l| l != id);
                }
            }
        }
    }
}

/// Blueprint the host builds a node kind from
#[derive(Debug, Clone)]
pub struct NodeTemplate {
    pub type_name: String,
    pub title: String,
    pub outputs: Vec<(String, String)>,
}

impl NodeTemplate {
    pub fn new(type_name: impl Into<String>) -> Self {
        let type_name = type_name.into();
        Self {
            title: type_name.clone(),
            type_name,
            outputs: Vec::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_output(mut self, name: impl Into<String>, data_type: impl Into<String>) -> Self {
        self.outputs.push((name.into(), data_type.into()));
        self
    }

    fn instantiate(&self, id: NodeId) -> Node {
        let mut node = Node::new(id, self.type_name.clone(), self.title.clone());
        for (name, data_type) in &self.outputs {
            node.add_output(name.clone(), data_type.clone());
        }
        node.size = node.compute_size();
        node
    }
}

/// Persisted form of a whole graph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SerializedGraph {
    pub nodes: Vec<SerializedNode>,
    pub links: Vec<Link>,
}

/// A graph containing nodes and their connections
pub struct NodeGraph {
    store: GraphStore,
    templates: HashMap<String, NodeTemplate>,
    behaviors: BehaviorRegistry,
    scheduler: Scheduler,
    next_node_id: NodeId,
    next_link_id: LinkId,
}

impl NodeGraph {
    /// Creates a new empty node graph
    pub fn new() -> Self {
        Self {
            store: GraphStore::default(),
            templates: HashMap::new(),
            behaviors: BehaviorRegistry::new(),
            scheduler: Scheduler::new(),
            next_node_id: 1,
            next_link_id: 1,
        }
    }

    /// Register a node kind with its template and lifecycle behavior
    pub fn register_kind(&mut self, template: NodeTemplate, behavior: Rc<dyn NodeBehavior>) {
        self.behaviors.register(template.type_name.clone(), behavior);
        self.templates.insert(template.type_name.clone(), template);
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.store.nodes.get(&id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.store.nodes.get_mut(&id)
    }

    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.store.links.get(&id)
    }

    pub fn link_count(&self) -> usize {
        self.store.links.len()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn set_pointer(&mut self, pointer: Pos2) {
        self.store.pointer = pointer;
    }

    /// Build a node of a registered kind and run its creation hook
    pub fn create_node(&mut self, type_name: &str) -> Result<NodeId> {
        let id = self.next_node_id;
        self.create_node_with_id(type_name, id)
    }

    fn create_node_with_id(&mut self, type_name: &str, id: NodeId) -> Result<NodeId> {
        let template = self
            .templates
            .get(type_name)
            .ok_or_else(|| RelayError::UnknownKind(type_name.to_string()))?;
        let node = template.instantiate(id);
        self.insert(node);
        self.dispatch(id, "on_create", |behavior, node, ctx| behavior.on_create(node, ctx));
        Ok(id)
    }

    /// Insert a hand-built node; its kind's behavior applies if registered
    pub fn add_node(&mut self, mut node: Node) -> NodeId {
        let id = self.next_node_id;
        node.id = id;
        self.insert(node);
        id
    }

    fn insert(&mut self, node: Node) {
        if node.id >= self.next_node_id {
            self.next_node_id = node.id + 1;
        }
        self.store.nodes.insert(node.id, node);
    }

    /// Removes a node and all its connections
    pub fn remove_node(&mut self, id: NodeId) -> Option<Node> {
        let attached: Vec<LinkId> = self
            .store
            .links
            .values()
            .filter(|l| l.origin_id == id || l.target_id == id)
            .map(|l| l.id)
            .collect();
        for link in attached {
            // Already gone links are fine here
            let _ = self.disconnect(link);
        }
        self.store.nodes.remove(&id)
    }

    /// Commit a link and notify both endpoints. An input already holding a
    /// link is disconnected first.
    pub fn connect(
        &mut self,
        origin_id: NodeId,
        origin_slot: PortId,
        target_id: NodeId,
        target_slot: PortId,
    ) -> Result<LinkId> {
        if origin_id == target_id {
            return Err(RelayError::SelfConnection(origin_id));
        }
        let origin = self.node(origin_id).ok_or(RelayError::NodeNotFound(origin_id))?;
        if origin.outputs.get(origin_slot).is_none() {
            return Err(RelayError::SlotNotFound {
                node: origin_id,
                side: PortType::Output.as_str(),
                slot: origin_slot,
            });
        }
        let target = self.node(target_id).ok_or(RelayError::NodeNotFound(target_id))?;
        let existing = target
            .inputs
            .get(target_slot)
            .ok_or(RelayError::SlotNotFound {
                node: target_id,
                side: PortType::Input.as_str(),
                slot: target_slot,
            })?
            .first_link();
        if let Some(existing) = existing {
            self.disconnect(existing)?;
        }

        let id = self.next_link_id;
        self.next_link_id += 1;
        self.store.links.insert(
            id,
            Link {
                id,
                origin_id,
                origin_slot,
                target_id,
                target_slot,
            },
        );
        if let Some(port) = self.port_mut(origin_id, PortType::Output, origin_slot) {
            port.links.push(id);
        }
        if let Some(port) = self.port_mut(target_id, PortType::Input, target_slot) {
            port.links = vec![id];
        }
        debug!(
            "Connected {}:{} -> {}:{} as link {}",
            origin_id, origin_slot, target_id, target_slot, id
        );

        self.notify_connection(origin_id, PortType::Output, origin_slot, true, id);
        self.notify_connection(target_id, PortType::Input, target_slot, true, id);
        Ok(id)
    }

    /// Remove a link and notify both endpoints
    pub fn disconnect(&mut self, link_id: LinkId) -> Result<()> {
        let link = self
            .store
            .links
            .remove(&link_id)
            .ok_or(RelayError::LinkNotFound(link_id))?;
        if let Some(port) = self.port_mut(link.origin_id, PortType::Output, link.origin_slot) {
            port.links.retain(|&l| l != link_id);
        }
        if let Some(port) = self.port_mut(link.target_id, PortType::Input, link.target_slot) {
            port.links.retain(|&l| l != link_id);
        }
        debug!("Removed link {}", link_id);

        self.notify_connection(link.origin_id, PortType::Output, link.origin_slot, false, link_id);
        self.notify_connection(link.target_id, PortType::Input, link.target_slot, false, link_id);
        Ok(())
    }

    /// Remove every link leaving an output slot
    pub fn disconnect_output(&mut self, node_id: NodeId, slot: PortId) -> Result<()> {
        let links = self
            .node(node_id)
            .ok_or(RelayError::NodeNotFound(node_id))?
            .outputs
            .get(slot)
            .map(|port| port.links.clone())
            .unwrap_or_default();
        for link in links {
            self.disconnect(link)?;
        }
        Ok(())
    }

    /// User-driven resize
    pub fn resize_node(&mut self, id: NodeId, size: Vec2) -> Result<()> {
        self.dispatch(id, "on_resize", |behavior, node, _ctx| {
            node.set_size(size);
            behavior.on_resize(node, size);
        })
        .ok_or(RelayError::NodeNotFound(id))
    }

    /// User-driven widget edit: store the value, then run the widget callback
    pub fn edit_widget(&mut self, node_id: NodeId, name: &str, value: WidgetValue) -> Result<()> {
        let mut node = self
            .store
            .nodes
            .remove(&node_id)
            .ok_or(RelayError::NodeNotFound(node_id))?;

        let callback = match node.find_widget_mut(name) {
            Some(widget) => {
                widget.value = value.clone();
                widget.callback.clone()
            }
            None => {
                self.store.nodes.insert(node_id, node);
                return Err(RelayError::WidgetNotFound {
                    node: node_id,
                    name: name.to_string(),
                });
            }
        };
        node.set_dirty_canvas();

        if let Some(callback) = callback {
            let pointer = self.store.pointer;
            let mut ctx = CallbackContext {
                node: node_id,
                pointer,
                synthetic: false,
                graph: &mut self.store,
            };
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| callback(&value, &mut ctx)));
            if outcome.is_err() {
                error!("Widget callback `{}` on node {} panicked", name, node_id);
            }
        }
        self.store.nodes.insert(node_id, node);
        Ok(())
    }

    /// Persisted form of every node, each through its own behavior
    pub fn serialize(&self) -> SerializedGraph {
        let mut ids: Vec<NodeId> = self.store.nodes.keys().copied().collect();
        ids.sort_unstable();
        let nodes = ids
            .iter()
            .filter_map(|id| self.store.nodes.get(id))
            .map(|node| self.behaviors.get(&node.type_name).serialize(node))
            .collect();

        let mut links: Vec<Link> = self.store.links.values().cloned().collect();
        links.sort_by_key(|l| l.id);
        SerializedGraph { nodes, links }
    }

    /// Rebuild a saved graph. Nodes are created and configured first and the
    /// link table is restored afterwards, like a host loading a file.
    pub fn load(&mut self, data: &SerializedGraph) -> Result<()> {
        for saved in &data.nodes {
            if self.templates.contains_key(&saved.type_name) {
                self.create_node_with_id(&saved.type_name, saved.id)?;
            } else {
                self.insert(Node::new(saved.id, saved.type_name.clone(), saved.title.clone()));
            }
            self.dispatch(saved.id, "configure", |behavior, node, ctx| {
                behavior.configure(node, saved, ctx)
            });
        }
        for link in &data.links {
            self.next_link_id = self.next_link_id.max(link.id + 1);
            self.store.links.insert(link.id, link.clone());
        }
        Ok(())
    }

    /// Run every deferred task due within the next `ms` milliseconds
    pub fn advance(&mut self, ms: u64) {
        let until = self.scheduler.now() + ms;
        while let Some((node, task)) = self.scheduler.pop_due(until) {
            self.run_deferred(node, task);
        }
        self.scheduler.advance_to(until);
    }

    /// Run deferred tasks until none are left
    pub fn run_until_idle(&mut self) {
        while let Some((node, task)) = self.scheduler.pop_next() {
            self.run_deferred(node, task);
        }
    }

    fn run_deferred(&mut self, id: NodeId, task: DeferredTask) {
        if !self.store.nodes.contains_key(&id) {
            debug!("Skipping {:?} for node {}: node no longer exists", task, id);
            return;
        }
        let outcome = self.dispatch(id, "on_deferred", |behavior, node, ctx| {
            behavior.on_deferred(node, task, ctx)
        });
        if let Some(Err(e)) = outcome {
            warn!("Deferred {:?} on node {} failed: {}", task, id, e);
        }
    }

    fn notify_connection(&mut self, id: NodeId, side: PortType, slot: PortId, connected: bool, link: LinkId) {
        let change = ConnectionChange {
            side,
            slot,
            connected,
            link,
        };
        self.dispatch(id, "on_connections_change", |behavior, node, ctx| {
            behavior.on_connections_change(node, &change, ctx)
        });
    }

    /// Run a hook on a node detached from the table. A panicking hook is
    /// logged and the node is put back as the hook left it, including any
    /// mutation made before the panic.
    fn dispatch<R>(
        &mut self,
        id: NodeId,
        hook: &str,
        f: impl FnOnce(&dyn NodeBehavior, &mut Node, &mut NodeContext<'_>) -> R,
    ) -> Option<R> {
        let mut node = self.store.nodes.remove(&id)?;
        let behavior = self.behaviors.get(&node.type_name);

        let outcome = {
            let mut ctx = NodeContext {
                graph: &self.store,
                scheduler: &mut self.scheduler,
            };
            panic::catch_unwind(AssertUnwindSafe(|| f(behavior.as_ref(), &mut node, &mut ctx)))
        };

        self.store.nodes.insert(id, node);
        self.store.rebind_output_links(id);

        match outcome {
            Ok(result) => Some(result),
            Err(_) => {
                error!("Hook {} on node {} panicked; node left as is", hook, id);
                None
            }
        }
    }

    fn port_mut(&mut self, node: NodeId, side: PortType, slot: PortId) -> Option<&mut Port> {
        let node = self.store.nodes.get_mut(&node)?;
        match side {
            PortType::Input => node.inputs.get_mut(slot),
            PortType::Output => node.outputs.get_mut(slot),
        }
    }
}

impl Default for NodeGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphView for NodeGraph {
    fn link(&self, id: LinkId) -> Option<&Link> {
        self.store.link(id)
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.store.node(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::widget::{callback, WidgetKind};
    use std::cell::RefCell;

    fn plain(title: &str) -> Node {
        let mut node = Node::new(0, "Plain", title);
        node.add_input("in", "INT").add_output("out", "INT");
        node
    }

    #[test]
    fn test_connection_creation() {
        let mut graph = NodeGraph::new();
        let a = graph.add_node(plain("A"));
        let b = graph.add_node(plain("B"));

        let link = graph.connect(a, 0, b, 0).unwrap();
        assert_eq!(graph.link_count(), 1);
        assert_eq!(graph.node(a).unwrap().outputs[0].links, vec![link]);
        assert_eq!(graph.node(b).unwrap().inputs[0].links, vec![link]);
        assert!(graph.connect(a, 0, a, 0).is_err());
        assert!(graph.connect(a, 3, b, 0).is_err());
    }

    #[test]
    fn test_connecting_occupied_input_replaces_link() {
        let mut graph = NodeGraph::new();
        let a = graph.add_node(plain("A"));
        let b = graph.add_node(plain("B"));
        let c = graph.add_node(plain("C"));

        let first = graph.connect(a, 0, c, 0).unwrap();
        let second = graph.connect(b, 0, c, 0).unwrap();

        assert!(graph.link(first).is_none());
        assert!(graph.node(a).unwrap().outputs[0].links.is_empty());
        assert_eq!(graph.node(c).unwrap().inputs[0].links, vec![second]);
    }

    #[test]
    fn test_remove_node_drops_its_links() {
        let mut graph = NodeGraph::new();
        let a = graph.add_node(plain("A"));
        let b = graph.add_node(plain("B"));
        graph.connect(a, 0, b, 0).unwrap();

        assert!(graph.remove_node(b).is_some());
        assert_eq!(graph.link_count(), 0);
        assert!(!graph.node(a).unwrap().is_output_connected(0));
    }

    #[test]
    fn test_edit_widget_runs_callback_with_graph_access() {
        let mut graph = NodeGraph::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();

        let mut node = plain("A");
        node.add_widget(
            Widget::new("seed", WidgetKind::Number, 0.0).with_callback(callback(move |value, ctx| {
                sink.borrow_mut().push((value.clone(), ctx.synthetic, ctx.graph.node(ctx.node).is_none()));
            })),
        );
        let a = graph.add_node(node);

        graph.edit_widget(a, "seed", WidgetValue::Number(4.0)).unwrap();
        assert_eq!(graph.node(a).unwrap().find_widget("seed").unwrap().value, WidgetValue::Number(4.0));
        // Owner is detached while its callback runs
        assert_eq!(*seen.borrow(), vec![(WidgetValue::Number(4.0), false, true)]);
        assert!(graph.edit_widget(a, "missing", WidgetValue::Number(1.0)).is_err());
        assert!(graph.node(a).is_some());
    }

    #[test]
    fn test_removed_output_rebinds_later_links() {
        struct DropFirstOutput;
        impl NodeBehavior for DropFirstOutput {
            fn on_resize(&self, node: &mut Node, _size: Vec2) {
                node.remove_output(0);
            }
        }

        let mut graph = NodeGraph::new();
        graph.register_kind(
            NodeTemplate::new("Two").with_output("x", "*").with_output("y", "*"),
            Rc::new(DropFirstOutput),
        );
        let two = graph.create_node("Two").unwrap();
        let sink = graph.add_node(plain("Sink"));
        let link = graph.connect(two, 1, sink, 0).unwrap();

        graph.resize_node(two, Vec2::new(200.0, 50.0)).unwrap();
        assert_eq!(graph.link(link).unwrap().origin_slot, 0);
    }

    #[test]
    fn test_deferred_task_for_removed_node_is_skipped() {
        struct Counting(Rc<RefCell<usize>>);
        impl NodeBehavior for Counting {
            fn on_create(&self, node: &mut Node, ctx: &mut NodeContext<'_>) {
                ctx.defer(node, DeferredTask::ManagePorts, 10);
            }
            fn on_deferred(&self, _node: &mut Node, _task: DeferredTask, _ctx: &mut NodeContext<'_>) -> Result<()> {
                *self.0.borrow_mut() += 1;
                Ok(())
            }
        }

        let runs = Rc::new(RefCell::new(0));
        let mut graph = NodeGraph::new();
        graph.register_kind(NodeTemplate::new("Counting"), Rc::new(Counting(runs.clone())));

        let kept = graph.create_node("Counting").unwrap();
        let dropped = graph.create_node("Counting").unwrap();
        graph.remove_node(dropped);
        graph.advance(5);
        assert_eq!(*runs.borrow(), 0);

        graph.advance(5);
        assert_eq!(*runs.borrow(), 1);
        assert!(graph.node(kept).is_some());
    }

    #[test]
    fn test_panicking_hook_keeps_node_and_other_tasks() {
        struct Faulty;
        impl NodeBehavior for Faulty {
            fn on_create(&self, node: &mut Node, ctx: &mut NodeContext<'_>) {
                ctx.defer(node, DeferredTask::RefreshWidgets, 1);
            }
            fn on_deferred(&self, node: &mut Node, _task: DeferredTask, _ctx: &mut NodeContext<'_>) -> Result<()> {
                if node.title == "bad" {
                    node.title = "half done".to_string();
                    panic!("broken refresh");
                }
                node.title = "ran".to_string();
                Ok(())
            }
        }

        let mut graph = NodeGraph::new();
        graph.register_kind(NodeTemplate::new("Faulty").with_title("bad"), Rc::new(Faulty));
        let bad = graph.create_node("Faulty").unwrap();
        let good = graph.create_node("Faulty").unwrap();
        graph.node_mut(good).unwrap().title = "good".to_string();

        graph.run_until_idle();
        // Partial work before the panic is kept
        assert_eq!(graph.node(bad).unwrap().title, "half done");
        assert_eq!(graph.node(good).unwrap().title, "ran");
    }
}
