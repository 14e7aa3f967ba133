// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection (edge) identifiers.

use crate::node::NodeId;
use crate::port::{PortIndex, PortType, INVALID_PORT_INDEX};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a connection: the output endpoint and the input endpoint.
///
/// Equality is structural. While a wire is being dragged one side may hold
/// [`NodeId::INVALID`] / [`INVALID_PORT_INDEX`]; such ids are never committed
/// to a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionId {
    /// Node owning the output port
    #[serde(rename = "outNodeId")]
    pub out_node_id: NodeId,
    /// Index of the output port
    #[serde(rename = "outPortIndex")]
    pub out_port_index: PortIndex,
    /// Node owning the input port
    // Scene files written by earlier editors spell this key "intNodeId".
    #[serde(rename = "intNodeId", alias = "inNodeId")]
    pub in_node_id: NodeId,
    /// Index of the input port
    #[serde(rename = "inPortIndex")]
    pub in_port_index: PortIndex,
}

impl ConnectionId {
    /// Create a connection id from its four components
    pub fn new(
        out_node_id: NodeId,
        out_port_index: PortIndex,
        in_node_id: NodeId,
        in_port_index: PortIndex,
    ) -> Self {
        Self {
            out_node_id,
            out_port_index,
            in_node_id,
            in_port_index,
        }
    }

    /// Connection id filled in on one side only
    pub fn incomplete(node_id: NodeId, port_type: PortType, port_index: PortIndex) -> Self {
        let empty = Self::new(NodeId::INVALID, INVALID_PORT_INDEX, NodeId::INVALID, INVALID_PORT_INDEX);
        empty.with_endpoint(port_type, node_id, port_index)
    }

    /// Node on the given side
    pub fn node_id(&self, port_type: PortType) -> NodeId {
        match port_type {
            PortType::Out => self.out_node_id,
            PortType::In => self.in_node_id,
        }
    }

    /// Port index on the given side
    pub fn port_index(&self, port_type: PortType) -> PortIndex {
        match port_type {
            PortType::Out => self.out_port_index,
            PortType::In => self.in_port_index,
        }
    }

    /// Copy of this id with one side replaced
    pub fn with_endpoint(mut self, port_type: PortType, node_id: NodeId, port_index: PortIndex) -> Self {
        match port_type {
            PortType::Out => {
                self.out_node_id = node_id;
                self.out_port_index = port_index;
            }
            PortType::In => {
                self.in_node_id = node_id;
                self.in_port_index = port_index;
            }
        }
        self
    }

    /// Copy of this id with one side cleared
    pub fn detached(self, port_type: PortType) -> Self {
        self.with_endpoint(port_type, NodeId::INVALID, INVALID_PORT_INDEX)
    }

    /// Fill whichever side is unset
    pub fn completed(self, node_id: NodeId, port_index: PortIndex) -> Self {
        if self.out_node_id.is_valid() {
            self.with_endpoint(PortType::In, node_id, port_index)
        } else {
            self.with_endpoint(PortType::Out, node_id, port_index)
        }
    }

    /// Whether both sides are set
    pub fn is_complete(&self) -> bool {
        self.out_node_id.is_valid()
            && self.in_node_id.is_valid()
            && self.out_port_index != INVALID_PORT_INDEX
            && self.in_port_index != INVALID_PORT_INDEX
    }

    /// Whether either endpoint belongs to `node_id`
    pub fn involves_node(&self, node_id: NodeId) -> bool {
        self.out_node_id == node_id || self.in_node_id == node_id
    }

    /// Whether both endpoints are on the same node
    pub fn is_self_loop(&self) -> bool {
        self.out_node_id == self.in_node_id
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let index = |i: PortIndex| {
            if i == INVALID_PORT_INDEX {
                "INVALID".to_string()
            } else {
                i.to_string()
            }
        };
        write!(
            f,
            "({}, {}, {}, {})",
            self.out_node_id,
            index(self.out_port_index),
            self.in_node_id,
            index(self.in_port_index)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_extraction() {
        let id = ConnectionId::new(NodeId(1), 2, NodeId(3), 4);
        assert_eq!(id.node_id(PortType::Out), NodeId(1));
        assert_eq!(id.port_index(PortType::Out), 2);
        assert_eq!(id.node_id(PortType::In), NodeId(3));
        assert_eq!(id.port_index(PortType::In), 4);
        assert!(id.involves_node(NodeId(3)));
        assert!(!id.involves_node(NodeId(2)));
    }

    #[test]
    fn test_incomplete_then_completed() {
        let dragging = ConnectionId::incomplete(NodeId(7), PortType::Out, 0);
        assert!(!dragging.is_complete());
        assert_eq!(dragging.in_node_id, NodeId::INVALID);

        let done = dragging.completed(NodeId(9), 1);
        assert!(done.is_complete());
        assert_eq!(done, ConnectionId::new(NodeId(7), 0, NodeId(9), 1));

        let from_input = ConnectionId::incomplete(NodeId(9), PortType::In, 1).completed(NodeId(7), 0);
        assert_eq!(from_input, done);
    }

    #[test]
    fn test_detach_and_reattach_shifts_one_side() {
        let id = ConnectionId::new(NodeId(1), 0, NodeId(2), 3);
        let moved = id.detached(PortType::In).completed(NodeId(2), 4);
        assert_eq!(moved.out_node_id, NodeId(1));
        assert_eq!(moved.out_port_index, 0);
        assert_eq!(moved.in_port_index, 4);
    }

    #[test]
    fn test_json_field_names() {
        let id = ConnectionId::new(NodeId(1), 0, NodeId(2), 1);
        let json = serde_json::to_value(id).unwrap();
        assert_eq!(json["outNodeId"], 1);
        assert_eq!(json["intNodeId"], 2);
        assert_eq!(json["inPortIndex"], 1);

        let alt: ConnectionId = serde_json::from_str(
            r#"{"outNodeId":1,"outPortIndex":0,"inNodeId":2,"inPortIndex":1}"#,
        )
        .unwrap();
        assert_eq!(alt, id);
    }

    #[test]
    fn test_display_marks_invalid_indices() {
        let dragging = ConnectionId::incomplete(NodeId(5), PortType::Out, 1);
        assert_eq!(dragging.to_string(), format!("(5, 1, {}, INVALID)", NodeId::INVALID));
    }
}
