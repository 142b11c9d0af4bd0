//! Splitter configuration.

use serde::{Deserialize, Serialize};
use crate::Result;

/// Knobs for `make_crossings`. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossingConfig {
    /// Tag every roadway intersection node `highway=crossing`.
    pub mark_intersection_nodes: bool,
}

impl Default for CrossingConfig {
    fn default() -> Self {
        Self { mark_intersection_nodes: true }
    }
}

impl CrossingConfig {
    /// Parse a config from JSON, e.g. a host editor's plugin preferences.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
