//! Widget relay demo
//!
//! Builds a small graph with a relay node, wires it to a few downstream
//! widgets, edits through the relay and prints the saved graph as JSON.
//! An optional first argument names a JSON config file.

use log::info;
use widget_relay::nodes::{SerializedGraph, Widget, WidgetKind, WidgetOptions, WidgetValue};
use widget_relay::relay::naming::port_name;
use widget_relay::{register, Node, NodeGraph, NodeId, RelayConfig, Result, RELAY_KIND};

fn add_target(graph: &mut NodeGraph, title: &str, widget: Widget) -> NodeId {
    let mut node = Node::new(0, title, title);
    node.add_input(widget.name.clone(), "*");
    node.add_widget(widget);
    graph.add_node(node)
}

fn describe(graph: &NodeGraph, relay: NodeId) {
    let Some(node) = graph.node(relay) else {
        return;
    };
    for (slot, port) in node.outputs.iter().enumerate() {
        let widget = node
            .find_widget(&port.name)
            .map(|w| format!("{:?} = {:?}", w.kind, w.value))
            .unwrap_or_else(|| "-".to_string());
        info!(
            "  [{}] {} ({}) label={:?} widget={}",
            slot,
            port.name,
            if port.is_connected() { "connected" } else { "open" },
            port.display_label(),
            widget
        );
    }
}

fn run(config: RelayConfig) -> Result<SerializedGraph> {
    let mut graph = NodeGraph::new();
    register(&mut graph, config);

    let relay = graph.create_node(RELAY_KIND)?;
    let sampler = add_target(&mut graph, "KSampler", Widget::new("seed", WidgetKind::Number, 42.0));
    let picker = add_target(
        &mut graph,
        "Loader",
        Widget::new("ckpt_name", WidgetKind::Combo, "base.safetensors").with_options(WidgetOptions {
            values: Some(vec!["base.safetensors".to_string(), "refiner.safetensors".to_string()]),
            ..Default::default()
        }),
    );
    let prompt = add_target(
        &mut graph,
        "Prompt",
        Widget::new("text", WidgetKind::MultilineText, "a lighthouse at dusk"),
    );
    graph.run_until_idle();

    for (slot, target) in [sampler, picker, prompt].into_iter().enumerate() {
        graph.connect(relay, slot, target, 0)?;
        graph.run_until_idle();
    }
    info!("Relay after wiring:");
    describe(&graph, relay);

    graph.edit_widget(relay, &port_name(1), WidgetValue::Number(7.0))?;
    graph.edit_widget(relay, &port_name(2), WidgetValue::from("refiner.safetensors"))?;
    info!(
        "Targets after editing through the relay: seed={:?} ckpt_name={:?}",
        graph.node(sampler).and_then(|n| n.find_widget("seed")).map(|w| &w.value),
        graph.node(picker).and_then(|n| n.find_widget("ckpt_name")).map(|w| &w.value),
    );

    graph.disconnect_output(relay, 2)?;
    graph.run_until_idle();
    info!("Relay after unplugging the prompt:");
    describe(&graph, relay);

    Ok(graph.serialize())
}

fn main() -> Result<()> {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => RelayConfig::load(path)?,
        None => RelayConfig::default(),
    };
    let saved = run(config)?;
    println!("{}", serde_json::to_string_pretty(&saved)?);
    Ok(())
}
