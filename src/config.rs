//! Runtime configuration for the relay engine

use crate::constants;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Pixel metrics used to fit port labels into the node width
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelMetrics {
    pub margin: f32,
    pub port_gutter: f32,
    pub average_char_width: f32,
    pub fallback_width: f32,
}

impl Default for LabelMetrics {
    fn default() -> Self {
        Self {
            margin: constants::label::MARGIN,
            port_gutter: constants::label::PORT_GUTTER,
            average_char_width: constants::label::AVERAGE_CHAR_WIDTH,
            fallback_width: constants::label::FALLBACK_NODE_WIDTH,
        }
    }
}

impl LabelMetrics {
    /// Number of characters a label may occupy on a node of `node_width`
    pub fn char_budget(&self, node_width: f32) -> usize {
        let width = if node_width > 0.0 { node_width } else { self.fallback_width };
        let available = width - self.margin * 2.0 - self.port_gutter;
        if available <= 0.0 || self.average_char_width <= 0.0 {
            return 0;
        }
        (available / self.average_char_width).floor() as usize
    }
}

/// Delays before deferred re-entry into the engine (milliseconds)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeferredDelays {
    pub after_create: u64,
    pub after_connection: u64,
    pub after_restore: u64,
}

impl Default for DeferredDelays {
    fn default() -> Self {
        Self {
            after_create: constants::schedule::AFTER_CREATE_MS,
            after_connection: constants::schedule::AFTER_CONNECTION_MS,
            after_restore: constants::schedule::AFTER_RESTORE_MS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub label: LabelMetrics,
    pub delays: DeferredDelays,
    pub initial_height: f32,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            label: LabelMetrics::default(),
            delays: DeferredDelays::default(),
            initial_height: constants::layout::INITIAL_NODE_HEIGHT,
        }
    }
}

impl RelayConfig {
    /// Parse a config from JSON; missing fields fall back to defaults
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }
}
