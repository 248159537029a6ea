//! Port manager: keeps exactly one open output after the last connected one

use super::naming::next_port_name;
use super::ProxyNode;
use crate::constants::port::ANY_TYPE;
use crate::nodes::Port;
use log::debug;

/// What a port pass changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PortChanges {
    pub added: usize,
    pub removed: usize,
}

impl PortChanges {
    pub fn is_empty(&self) -> bool {
        self.added == 0 && self.removed == 0
    }
}

/// Port count the topology calls for: through the last connected port
/// plus one open slot, never fewer than one
pub fn needed_ports(outputs: &[Port]) -> usize {
    match outputs.iter().rposition(Port::is_connected) {
        Some(last) => last + 2,
        None => 1,
    }
}

impl ProxyNode<'_> {
    /// Grow or shrink the output list to the needed count, then repair
    /// shown labels from the stored ones
    pub fn manage_ports(&mut self) -> PortChanges {
        let needed = needed_ports(&self.node.outputs);
        let mut changes = PortChanges::default();

        while self.node.outputs.len() < needed {
            let name = next_port_name(&self.node.outputs);
            self.node.add_output(name, ANY_TYPE);
            changes.added += 1;
        }

        while self.node.outputs.len() > needed && self.node.outputs.len() > 1 {
            let slot = self.node.outputs.len() - 1;
            self.node.properties.port_labels.remove(&slot);
            self.node.remove_output(slot);
            changes.removed += 1;
        }

        self.apply_stored_labels();

        if !changes.is_empty() {
            debug!(
                "Node {} ports: +{} -{} -> {}",
                self.node.id,
                changes.added,
                changes.removed,
                self.node.outputs.len()
            );
        }
        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RelayConfig;
    use crate::nodes::Node;
    use crate::relay::naming::port_name;

    fn relay_node(ports: usize) -> Node {
        let mut node = Node::new(1, "Relay", "Relay");
        for ordinal in 1..=ports {
            node.add_output(port_name(ordinal as u32), ANY_TYPE);
        }
        node
    }

    fn connect(node: &mut Node, slot: usize, link: usize) {
        node.outputs[slot].links.push(link);
    }

    #[test]
    fn test_empty_node_gets_one_open_port() {
        let config = RelayConfig::default();
        let mut node = relay_node(0);

        let changes = ProxyNode::new(&mut node, &config).manage_ports();
        assert_eq!(changes, PortChanges { added: 1, removed: 0 });
        assert_eq!(node.outputs.len(), 1);
        assert_eq!(node.outputs[0].name, port_name(1));
    }

    #[test]
    fn test_connecting_open_port_adds_exactly_one() {
        let config = RelayConfig::default();
        let mut node = relay_node(1);
        connect(&mut node, 0, 10);

        ProxyNode::new(&mut node, &config).manage_ports();
        assert_eq!(node.outputs.len(), 2);
        assert_eq!(node.outputs[1].name, port_name(2));
        assert!(!node.is_output_connected(1));
    }

    #[test]
    fn test_disconnecting_only_port_shrinks_to_one() {
        let config = RelayConfig::default();
        let mut node = relay_node(2);
        node.properties.port_labels.insert(0, "KSampler: seed".to_string());
        node.properties.port_labels.insert(1, "stale".to_string());

        let changes = ProxyNode::new(&mut node, &config).manage_ports();
        assert_eq!(changes.removed, 1);
        assert_eq!(node.outputs.len(), 1);
        assert!(!node.properties.port_labels.contains_key(&1));
        // A port pass drops labels of removed slots only
        assert!(node.properties.port_labels.contains_key(&0));
    }

    #[test]
    fn test_gap_in_connections_keeps_middle_ports() {
        let config = RelayConfig::default();
        let mut node = relay_node(5);
        connect(&mut node, 0, 10);
        connect(&mut node, 2, 11);

        ProxyNode::new(&mut node, &config).manage_ports();
        assert_eq!(node.outputs.len(), 4);
        assert!(!node.is_output_connected(1));
        assert!(!node.is_output_connected(3));
    }

    #[test]
    fn test_count_matches_topology_for_every_prefix() {
        let config = RelayConfig::default();
        for last in 0..6 {
            let mut node = relay_node(8);
            connect(&mut node, last, 100 + last);

            ProxyNode::new(&mut node, &config).manage_ports();
            assert_eq!(node.outputs.len(), last + 2);
            let connected: Vec<bool> = (0..node.outputs.len()).map(|s| node.is_output_connected(s)).collect();
            assert_eq!(connected.iter().rposition(|&c| c), Some(last));
            assert!(!connected[last + 1]);
        }
    }

    #[test]
    fn test_manage_ports_is_idempotent() {
        let config = RelayConfig::default();
        let mut node = relay_node(1);
        connect(&mut node, 0, 10);
        node.properties.port_labels.insert(0, "KSampler: seed".to_string());

        ProxyNode::new(&mut node, &config).manage_ports();
        let first = node.outputs.clone();
        let again = ProxyNode::new(&mut node, &config).manage_ports();

        assert!(again.is_empty());
        assert_eq!(node.outputs, first);
    }

    #[test]
    fn test_stored_labels_are_repaired() {
        let config = RelayConfig::default();
        let mut node = relay_node(2);
        connect(&mut node, 0, 10);
        node.properties.port_labels.insert(0, "KSampler: seed".to_string());
        node.outputs[0].label = Some("outdated".to_string());
        node.size.x = 210.0;

        ProxyNode::new(&mut node, &config).manage_ports();
        assert_eq!(node.outputs[0].label.as_deref(), Some("KSampler: seed"));
    }
}
