//! Proxy port naming
//!
//! Every proxy output is named `connect_to_widget_input_<n>` and its local
//! widget carries the same name; the name is the join key between the two
//! lists. The ordinal is parsed once and stored on the widget binding.

use crate::constants::port::NAME_PREFIX;
use crate::nodes::Port;

pub fn port_name(ordinal: u32) -> String {
    format!("{}{}", NAME_PREFIX, ordinal)
}

/// Ordinal encoded in a proxy name, `None` for any other name
pub fn parse_ordinal(name: &str) -> Option<u32> {
    let digits = name.strip_prefix(NAME_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Whether a widget or port name was generated by the relay
pub fn is_proxy_name(name: &str) -> bool {
    name.starts_with(NAME_PREFIX)
}

/// Name for a port appended after `outputs`: the next ordinal by length,
/// bumped past any name already in use
pub fn next_port_name(outputs: &[Port]) -> String {
    let mut ordinal = outputs.len() as u32 + 1;
    loop {
        let name = port_name(ordinal);
        if !outputs.iter().any(|port| port.name == name) {
            return name;
        }
        ordinal += 1;
    }
}
