//! Widget relay - a proxy node for node-graph editors
//!
//! A relay node grows one output per connection. Each output wired to a
//! widget-backed input gets a local control on the relay that mirrors the
//! downstream widget and forwards edits to it, so settings scattered over a
//! graph can be driven from one place.
//!
//! The crate carries a small host model in [`nodes`] and the engine itself
//! in [`relay`].

pub mod config;
pub mod constants;
pub mod error;
pub mod nodes;
pub mod relay;

pub use config::{DeferredDelays, LabelMetrics, RelayConfig};
pub use error::{RelayError, Result};
pub use nodes::{Node, NodeGraph, NodeId};
pub use relay::{register, ProxyNode, RelayBehavior, RELAY_KIND};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::{callback, GraphView, LinkId, Widget, WidgetKind, WidgetOptions, WidgetValue};
    use crate::relay::naming::port_name;
    use egui::{Pos2, Vec2};
    use std::cell::RefCell;
    use std::collections::BTreeSet;
    use std::rc::Rc;

    const AFTER_CONNECTION: u64 = constants::schedule::AFTER_CONNECTION_MS;

    fn relay_graph() -> (NodeGraph, NodeId) {
        let mut graph = NodeGraph::new();
        register(&mut graph, RelayConfig::default());
        let relay = graph.create_node(RELAY_KIND).unwrap();
        graph.run_until_idle();
        (graph, relay)
    }

    fn number_target(graph: &mut NodeGraph, title: &str, input: &str, value: f64) -> NodeId {
        let mut node = Node::new(0, title, title);
        node.add_input(input, "INT");
        node.add_widget(Widget::new(input, WidgetKind::Number, value));
        graph.add_node(node)
    }

    fn combo_target(graph: &mut NodeGraph) -> NodeId {
        let mut node = Node::new(0, "Picker", "Picker");
        node.add_input("mode", "COMBO");
        node.add_widget(
            Widget::new("mode", WidgetKind::Combo, "a").with_options(WidgetOptions {
                values: Some(vec!["a".to_string(), "b".to_string()]),
                ..Default::default()
            }),
        );
        graph.add_node(node)
    }

    fn wire(graph: &mut NodeGraph, relay: NodeId, slot: usize, target: NodeId) -> LinkId {
        let link = graph.connect(relay, slot, target, 0).unwrap();
        graph.advance(AFTER_CONNECTION);
        link
    }

    fn widget_names(node: &Node) -> Vec<String> {
        node.widgets.iter().map(|w| w.name.clone()).collect()
    }

    fn target_value(graph: &NodeGraph, node: NodeId, name: &str) -> WidgetValue {
        graph.node(node).unwrap().find_widget(name).unwrap().value.clone()
    }

    #[test]
    fn test_new_relay_has_one_open_port() {
        let (graph, relay) = relay_graph();
        let node = graph.node(relay).unwrap();
        assert_eq!(node.outputs.len(), 1);
        assert_eq!(node.outputs[0].name, port_name(1));
        assert!(!node.is_output_connected(0));
        assert!(node.widgets.is_empty());
        assert_eq!(node.size.y, constants::layout::INITIAL_NODE_HEIGHT);
    }

    #[test]
    fn test_connecting_combo_target_mirrors_it() {
        let (mut graph, relay) = relay_graph();
        let picker = combo_target(&mut graph);
        wire(&mut graph, relay, 0, picker);

        let node = graph.node(relay).unwrap();
        assert_eq!(node.outputs.len(), 2);
        assert!(node.is_output_connected(0));
        assert!(!node.is_output_connected(1));

        let widget = node.find_widget(&port_name(1)).unwrap();
        assert_eq!(widget.kind, WidgetKind::Combo);
        assert_eq!(widget.value, WidgetValue::from("a"));
        assert_eq!(widget.options.values, Some(vec!["a".to_string(), "b".to_string()]));
        assert_eq!(node.properties.port_labels.get(&0).map(String::as_str), Some("Picker: mode"));
        assert_eq!(widget.full_label.as_deref(), Some("Picker: mode"));
    }

    #[test]
    fn test_disconnecting_shrinks_back_to_one_port() {
        let (mut graph, relay) = relay_graph();
        let picker = combo_target(&mut graph);
        let link = wire(&mut graph, relay, 0, picker);

        graph.disconnect(link).unwrap();
        // Ports follow synchronously, widgets after the deferred pass
        assert_eq!(graph.node(relay).unwrap().outputs.len(), 1);
        graph.advance(AFTER_CONNECTION);

        let node = graph.node(relay).unwrap();
        assert_eq!(node.outputs.len(), 1);
        assert!(!node.is_output_connected(0));
        assert!(node.widgets.is_empty());
        assert!(node.outputs[0].label.is_none());
        assert!(node.properties.port_labels.is_empty());
    }

    #[test]
    fn test_two_numeric_targets_get_ordered_widgets_and_own_edits() {
        let (mut graph, relay) = relay_graph();
        let sampler = number_target(&mut graph, "KSampler", "seed", 1.0);
        let scheduler = number_target(&mut graph, "Scheduler", "steps", 20.0);
        wire(&mut graph, relay, 0, sampler);
        wire(&mut graph, relay, 1, scheduler);

        let node = graph.node(relay).unwrap();
        assert_eq!(node.outputs.len(), 3);
        assert!(node.is_output_connected(0) && node.is_output_connected(1));
        assert!(!node.is_output_connected(2));
        assert_eq!(widget_names(node), vec![port_name(1), port_name(2)]);
        assert!(node.widgets.iter().all(|w| w.kind == WidgetKind::Number));

        graph.edit_widget(relay, &port_name(1), WidgetValue::Number(7.0)).unwrap();
        assert_eq!(target_value(&graph, sampler, "seed"), WidgetValue::Number(7.0));
        assert_eq!(target_value(&graph, scheduler, "steps"), WidgetValue::Number(20.0));

        graph.edit_widget(relay, &port_name(2), WidgetValue::Number(30.0)).unwrap();
        assert_eq!(target_value(&graph, scheduler, "steps"), WidgetValue::Number(30.0));
        assert_eq!(target_value(&graph, sampler, "seed"), WidgetValue::Number(7.0));
        assert!(graph.node(scheduler).unwrap().dirty);
    }

    #[test]
    fn test_target_callback_sees_synthetic_edit() {
        let (mut graph, relay) = relay_graph();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();

        let mut toggle = Node::new(0, "Switch", "Switch");
        toggle.add_input("enabled", "BOOLEAN");
        toggle.add_widget(
            Widget::new("enabled", WidgetKind::Toggle, false).with_callback(callback(move |value, ctx| {
                sink.borrow_mut().push((value.clone(), ctx.synthetic, ctx.node, ctx.pointer));
            })),
        );
        let switch = graph.add_node(toggle);
        wire(&mut graph, relay, 0, switch);
        assert_eq!(graph.node(relay).unwrap().widgets[0].kind, WidgetKind::Toggle);

        graph.set_pointer(Pos2::new(12.0, 34.0));
        graph.edit_widget(relay, &port_name(1), WidgetValue::Boolean(true)).unwrap();
        assert_eq!(
            *seen.borrow(),
            vec![(WidgetValue::Boolean(true), true, switch, Pos2::new(12.0, 34.0))]
        );
        assert_eq!(target_value(&graph, switch, "enabled"), WidgetValue::Boolean(true));
    }

    #[test]
    fn test_narrow_node_truncates_stored_label() {
        let (mut graph, relay) = relay_graph();
        let sampler = number_target(&mut graph, "LongNodeTitle", "seed", 1.0);
        wire(&mut graph, relay, 0, sampler);

        graph.resize_node(relay, Vec2::new(400.0, 120.0)).unwrap();
        let node = graph.node(relay).unwrap();
        assert_eq!(node.outputs[0].label.as_deref(), Some("LongNodeTitle: seed"));

        // (140 - 60) / 10 leaves room for 8 characters
        graph.resize_node(relay, Vec2::new(140.0, 120.0)).unwrap();
        let node = graph.node(relay).unwrap();
        assert_eq!(node.outputs[0].label.as_deref(), Some("... seed"));
        assert_eq!(node.widgets[0].label.as_deref(), Some("... seed"));
        assert_eq!(node.properties.port_labels[&0], "LongNodeTitle: seed");
    }

    #[test]
    fn test_serialize_persists_only_manual_widgets() {
        let (mut graph, relay) = relay_graph();
        let sampler = number_target(&mut graph, "KSampler", "seed", 1.0);
        let scheduler = number_target(&mut graph, "Scheduler", "steps", 20.0);
        wire(&mut graph, relay, 0, sampler);
        wire(&mut graph, relay, 1, scheduler);
        graph
            .node_mut(relay)
            .unwrap()
            .add_widget(Widget::new("note", WidgetKind::Text, "keep me"));

        let saved = graph.serialize();
        let data = saved.nodes.iter().find(|n| n.id == relay).unwrap();
        let names: Vec<&str> = data.widgets.iter().flatten().map(|w| w.name.as_str()).collect();
        assert_eq!(names, vec!["note"]);
        assert_eq!(data.outputs.len(), 3);
        // Serializing leaves the live node alone
        assert_eq!(graph.node(relay).unwrap().widgets.len(), 3);
        assert_eq!(graph.serialize(), saved);
    }

    #[test]
    fn test_save_and_load_rebuilds_widgets() {
        let (mut graph, relay) = relay_graph();
        let sampler = number_target(&mut graph, "KSampler", "seed", 5.0);
        let picker = combo_target(&mut graph);
        wire(&mut graph, relay, 0, sampler);
        wire(&mut graph, relay, 1, picker);
        graph.resize_node(relay, Vec2::new(400.0, 200.0)).unwrap();

        let json = serde_json::to_string(&graph.serialize()).unwrap();
        let saved = serde_json::from_str(&json).unwrap();

        let mut restored = NodeGraph::new();
        register(&mut restored, RelayConfig::default());
        restored.load(&saved).unwrap();

        // Proxy widgets only come back once the links resolve
        let node = restored.node(relay).unwrap();
        assert_eq!(node.outputs.len(), 3);
        assert!(node.widgets.is_empty());
        assert_eq!(node.outputs[0].label.as_deref(), Some("KSampler: seed"));

        restored.run_until_idle();
        let node = restored.node(relay).unwrap();
        assert_eq!(widget_names(node), vec![port_name(1), port_name(2)]);
        assert_eq!(node.widgets[0].value, WidgetValue::Number(5.0));
        assert_eq!(node.widgets[1].kind, WidgetKind::Combo);
        assert_eq!(node.properties.port_labels[&1], "Picker: mode");

        restored.edit_widget(relay, &port_name(1), WidgetValue::Number(8.0)).unwrap();
        assert_eq!(target_value(&restored, sampler, "seed"), WidgetValue::Number(8.0));
    }

    #[test]
    fn test_widgets_join_ports_with_widget_targets() {
        let (mut graph, relay) = relay_graph();
        let sampler = number_target(&mut graph, "KSampler", "seed", 1.0);
        let mut preview = Node::new(0, "Preview", "Preview");
        preview.add_input("images", "IMAGE");
        let preview = graph.add_node(preview);
        let scheduler = number_target(&mut graph, "Scheduler", "steps", 20.0);

        wire(&mut graph, relay, 0, sampler);
        wire(&mut graph, relay, 1, preview);
        wire(&mut graph, relay, 2, scheduler);

        let node = graph.node(relay).unwrap();
        assert_eq!(node.outputs.len(), 4);
        let widgets: BTreeSet<String> = widget_names(node).into_iter().collect();
        let backed: BTreeSet<String> = node
            .outputs
            .iter()
            .filter(|port| {
                port.first_link()
                    .and_then(|id| graph.link(id))
                    .and_then(|link| {
                        let target = GraphView::node(&graph, link.target_id)?;
                        let input = target.input(link.target_slot)?;
                        target.find_widget(&input.name)
                    })
                    .is_some()
            })
            .map(|port| port.name.clone())
            .collect();
        assert_eq!(widgets, backed);
        assert_eq!(widgets.len(), 2);
    }

    #[test]
    fn test_refresh_is_idempotent() {
        let (mut graph, relay) = relay_graph();
        let sampler = number_target(&mut graph, "KSampler", "seed", 1.0);
        wire(&mut graph, relay, 0, sampler);

        let config = RelayConfig::default();
        let mut copy = graph.node(relay).unwrap().clone();
        let report = ProxyNode::new(&mut copy, &config).refresh_widgets(&graph);
        let ports = ProxyNode::new(&mut copy, &config).manage_ports();

        assert_eq!(report, relay::SyncReport::default());
        assert!(ports.is_empty());
        let original = graph.node(relay).unwrap();
        assert_eq!(copy.outputs, original.outputs);
        assert_eq!(widget_names(&copy), widget_names(original));
        assert_eq!(copy.size, original.size);
        assert_eq!(copy.properties, original.properties);
    }

    #[test]
    fn test_rewired_port_rebuilds_its_widget() {
        let (mut graph, relay) = relay_graph();
        let sampler = number_target(&mut graph, "KSampler", "seed", 1.0);
        let picker = combo_target(&mut graph);
        let link = graph.connect(relay, 0, sampler, 0).unwrap();
        graph.advance(AFTER_CONNECTION);
        assert_eq!(graph.node(relay).unwrap().widgets[0].kind, WidgetKind::Number);

        graph.disconnect(link).unwrap();
        graph.connect(relay, 0, picker, 0).unwrap();
        graph.advance(AFTER_CONNECTION);

        let node = graph.node(relay).unwrap();
        assert_eq!(node.widgets.len(), 1);
        let widget = &node.widgets[0];
        assert_eq!(widget.kind, WidgetKind::Combo);
        assert_eq!(widget.relay.as_ref().map(|b| b.target_node), Some(picker));
        assert_eq!(node.properties.port_labels[&0], "Picker: mode");
        assert_eq!(widget.full_label.as_deref(), Some("Picker: mode"));
    }

    #[test]
    fn test_reconnected_port_takes_new_target_label() {
        let (mut graph, relay) = relay_graph();
        let sampler = number_target(&mut graph, "KSampler", "seed", 1.0);
        let picker = combo_target(&mut graph);
        let link = wire(&mut graph, relay, 0, sampler);

        graph.disconnect(link).unwrap();
        graph.advance(AFTER_CONNECTION);
        let node = graph.node(relay).unwrap();
        assert_eq!(node.outputs.len(), 1);
        assert!(node.outputs[0].label.is_none());
        assert!(!node.properties.port_labels.contains_key(&0));

        wire(&mut graph, relay, 0, picker);
        graph.resize_node(relay, Vec2::new(300.0, 120.0)).unwrap();
        let node = graph.node(relay).unwrap();
        let widget = node.find_widget(&port_name(1)).unwrap();
        assert_eq!(widget.kind, WidgetKind::Combo);
        assert_eq!(node.outputs[0].label.as_deref(), Some("Picker: mode"));
        assert_eq!(widget.label.as_deref(), Some("Picker: mode"));
        assert_eq!(node.properties.port_labels[&0], "Picker: mode");
    }

    #[test]
    fn test_removed_relay_ignores_pending_work() {
        let mut graph = NodeGraph::new();
        register(&mut graph, RelayConfig::default());
        let relay = graph.create_node(RELAY_KIND).unwrap();
        let sampler = number_target(&mut graph, "KSampler", "seed", 1.0);
        graph.connect(relay, 0, sampler, 0).unwrap();

        assert!(graph.remove_node(relay).is_some());
        graph.run_until_idle();
        assert!(graph.node(relay).is_none());
        assert!(graph.scheduler().is_idle());
        assert!(graph.node(sampler).unwrap().inputs[0].links.is_empty());
    }

    #[test]
    fn test_removing_target_drops_its_widget() {
        let (mut graph, relay) = relay_graph();
        let sampler = number_target(&mut graph, "KSampler", "seed", 1.0);
        wire(&mut graph, relay, 0, sampler);

        graph.remove_node(sampler);
        graph.advance(AFTER_CONNECTION);
        let node = graph.node(relay).unwrap();
        assert_eq!(node.outputs.len(), 1);
        assert!(node.widgets.is_empty());
    }
}
