// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node identifiers, node roles and the node entity held by a model.

use crate::delegate::{NodeDelegate, NodeProcessingStatus, NodeValidationState};
use crate::port::{PortCount, PortIndex, PortType};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a node.
///
/// Allocated by the model from a monotonically increasing counter and never
/// reused while the model lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Sentinel for "no node"
    pub const INVALID: NodeId = NodeId(u32::MAX);

    /// Whether this id can refer to a node
    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Keys for node-related data served by a graph model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeRole {
    /// Registered type name of the node's delegate
    Type,
    /// Position on the canvas
    Position,
    /// Size of resizable nodes
    Size,
    /// Whether the caption is shown
    CaptionVisible,
    /// Node caption
    Caption,
    /// Delegate state as saved in documents
    InternalData,
    /// Number of input ports
    InPortCount,
    /// Number of output ports
    OutPortCount,
    /// Delegate validation state
    ValidationState,
    /// Delegate processing status
    ProcessingStatus,
}

impl NodeRole {
    /// Port count role for the given port type
    pub fn port_count(port_type: PortType) -> Self {
        match port_type {
            PortType::In => Self::InPortCount,
            PortType::Out => Self::OutPortCount,
        }
    }
}

/// A node property paired with its value
#[derive(Debug, Clone, PartialEq)]
pub enum NodeAttribute {
    /// Value for [`NodeRole::Type`]
    Type(String),
    /// Value for [`NodeRole::Position`]
    Position([f32; 2]),
    /// Value for [`NodeRole::Size`]
    Size([f32; 2]),
    /// Value for [`NodeRole::CaptionVisible`]
    CaptionVisible(bool),
    /// Value for [`NodeRole::Caption`]
    Caption(String),
    /// Value for [`NodeRole::InternalData`]
    InternalData(serde_json::Map<String, serde_json::Value>),
    /// Value for [`NodeRole::InPortCount`]
    InPortCount(PortCount),
    /// Value for [`NodeRole::OutPortCount`]
    OutPortCount(PortCount),
    /// Value for [`NodeRole::ValidationState`]
    ValidationState(NodeValidationState),
    /// Value for [`NodeRole::ProcessingStatus`]
    ProcessingStatus(NodeProcessingStatus),
}

impl NodeAttribute {
    /// The role this value answers
    pub fn role(&self) -> NodeRole {
        match self {
            Self::Type(_) => NodeRole::Type,
            Self::Position(_) => NodeRole::Position,
            Self::Size(_) => NodeRole::Size,
            Self::CaptionVisible(_) => NodeRole::CaptionVisible,
            Self::Caption(_) => NodeRole::Caption,
            Self::InternalData(_) => NodeRole::InternalData,
            Self::InPortCount(_) => NodeRole::InPortCount,
            Self::OutPortCount(_) => NodeRole::OutPortCount,
            Self::ValidationState(_) => NodeRole::ValidationState,
            Self::ProcessingStatus(_) => NodeRole::ProcessingStatus,
        }
    }

    /// Unwrap a port count of either kind
    pub fn as_port_count(&self) -> Option<PortCount> {
        match self {
            Self::InPortCount(n) | Self::OutPortCount(n) => Some(*n),
            _ => None,
        }
    }

    /// Unwrap a position
    pub fn as_position(&self) -> Option<[f32; 2]> {
        match self {
            Self::Position(p) => Some(*p),
            _ => None,
        }
    }

    /// Unwrap a text value (type name or caption)
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Type(s) | Self::Caption(s) => Some(s),
            _ => None,
        }
    }
}

/// Feature flags of a node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeFlags {
    /// The node may be resized by the user
    pub resizable: bool,
    /// The node may not be moved or edited by the user
    pub locked: bool,
}

/// A node instance held by a model
pub struct Node {
    /// Behaviour and port layout
    pub delegate: Box<dyn NodeDelegate>,
    /// Position in the graph UI
    pub position: [f32; 2],
    /// Size in the graph UI
    pub size: [f32; 2],
    /// Whether the node is locked in the UI
    pub locked: bool,
}

impl Node {
    /// Wrap a freshly created delegate
    pub fn new(delegate: Box<dyn NodeDelegate>) -> Self {
        Self {
            delegate,
            position: [0.0, 0.0],
            size: [0.0, 0.0],
            locked: false,
        }
    }

    /// Current number of ports of the given type
    pub fn port_count(&self, port_type: PortType) -> PortCount {
        self.delegate.port_count(port_type)
    }

    /// Whether `index` addresses an existing port
    pub fn has_port(&self, port_type: PortType, index: PortIndex) -> bool {
        index < self.port_count(port_type)
    }

    /// Flags derived from the delegate and the UI state
    pub fn flags(&self) -> NodeFlags {
        NodeFlags {
            resizable: self.delegate.resizable(),
            locked: self.locked,
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("type", &self.delegate.name())
            .field("inputs", &self.port_count(PortType::In))
            .field("outputs", &self.port_count(PortType::Out))
            .field("position", &self.position)
            .field("size", &self.size)
            .field("locked", &self.locked)
            .finish()
    }
}
