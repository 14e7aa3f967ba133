// SPDX-License-Identifier: MIT OR Apache-2.0
//! Saved form of a graph.
//!
//! ```json
//! {
//!   "nodes": [
//!     { "id": 5, "position": { "x": 100, "y": 200 },
//!       "internal-data": { "model-name": "NumberSource", "value": 3.0 } }
//!   ],
//!   "connections": [
//!     { "outNodeId": 5, "outPortIndex": 0, "intNodeId": 6, "inPortIndex": 0 }
//!   ]
//! }
//! ```
//!
//! `internal-data` belongs to the node's delegate. The model only reads the
//! `model-name` key from it.

use crate::connection::ConnectionId;
use crate::error::LoadError;
use crate::node::NodeId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key naming the delegate type inside `internal-data`
pub const MODEL_NAME_KEY: &str = "model-name";

/// Position of a node in a document
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal coordinate
    pub x: f64,
    /// Vertical coordinate
    pub y: f64,
}

impl From<[f32; 2]> for Position {
    fn from(p: [f32; 2]) -> Self {
        Self {
            x: f64::from(p[0]),
            y: f64::from(p[1]),
        }
    }
}

impl From<Position> for [f32; 2] {
    fn from(p: Position) -> Self {
        [p.x as f32, p.y as f32]
    }
}

/// One saved node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDocument {
    /// Id the node had when saved; authoritative on load
    pub id: NodeId,
    /// Canvas position
    #[serde(default)]
    pub position: Position,
    /// Delegate state, including [`MODEL_NAME_KEY`]
    #[serde(rename = "internal-data", default)]
    pub internal_data: Map<String, Value>,
}

impl NodeDocument {
    /// Registered type name of the saved delegate
    pub fn model_name(&self) -> Option<&str> {
        self.internal_data.get(MODEL_NAME_KEY).and_then(Value::as_str)
    }
}

/// A saved graph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    /// Saved nodes
    #[serde(default)]
    pub nodes: Vec<NodeDocument>,
    /// Saved connections
    #[serde(default)]
    pub connections: Vec<ConnectionId>,
}

impl GraphDocument {
    /// Parse a document from JSON text
    pub fn from_json_str(text: &str) -> Result<Self, LoadError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Render the document as pretty JSON text
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Ids of the saved nodes, in document order
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().map(|node| node.id)
    }

    /// Connections in the order a loader applies them.
    ///
    /// With `input_zero_first`, connections into input port 0 come before
    /// all others; each group keeps document order. Some delegates build
    /// their remaining ports from whatever arrives on input 0.
    pub fn ordered_connections(&self, input_zero_first: bool) -> Vec<ConnectionId> {
        if !input_zero_first {
            return self.connections.clone();
        }
        let (first, rest): (Vec<ConnectionId>, Vec<ConnectionId>) =
            self.connections.iter().partition(|id| id.in_port_index == 0);
        first.into_iter().chain(rest).collect()
    }
}
