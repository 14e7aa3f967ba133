// SPDX-License-Identifier: MIT OR Apache-2.0
//! Port addressing, data types and the values that flow between ports.
//!
//! A port is never stored as an object of its own. It is addressed by
//! `(NodeId, PortType, PortIndex)` and its properties are answered by the
//! delegate that owns the node. Indices are dense and shift whenever ports
//! are inserted or removed, so nothing outside the model should hold on to
//! an index across a port reshape.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Zero-based offset into a node's ordered list of ports of one [`PortType`].
pub type PortIndex = u32;

/// Number of ports of one [`PortType`] on a node.
pub type PortCount = u32;

/// Most ports of one [`PortType`] a node may grow to through a reshape or
/// a restored document.
pub const MAX_PORT_COUNT: PortCount = 1 << 16;

/// Sentinel used by incomplete connections for the unset side.
pub const INVALID_PORT_INDEX: PortIndex = PortIndex::MAX;

/// Port direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PortType {
    /// Input port (consumes data)
    In,
    /// Output port (produces data)
    Out,
}

impl PortType {
    /// Both port types, inputs first
    pub const ALL: [PortType; 2] = [PortType::In, PortType::Out];

    /// The other side of a connection
    pub fn opposite(self) -> Self {
        match self {
            Self::In => Self::Out,
            Self::Out => Self::In,
        }
    }
}

impl fmt::Display for PortType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::In => f.write_str("in"),
            Self::Out => f.write_str("out"),
        }
    }
}

/// How many connections may be attached to a port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionPolicy {
    /// At most one connection
    One,
    /// Any number of connections
    Many,
}

impl ConnectionPolicy {
    /// Policy used when a delegate does not say otherwise: inputs accept a
    /// single connection, outputs fan out freely.
    pub fn default_for(port_type: PortType) -> Self {
        match port_type {
            PortType::In => Self::One,
            PortType::Out => Self::Many,
        }
    }

    /// Whether a port with `connected` existing edges can take one more
    pub fn accepts(self, connected: usize) -> bool {
        match self {
            Self::One => connected == 0,
            Self::Many => true,
        }
    }
}

/// Declared data type of a port.
///
/// Two ports are compatible when their `id`s are equal. The `name` is only
/// a human label and takes no part in comparisons or hashing.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
pub struct NodeDataType {
    /// Identifier compared for compatibility
    pub id: String,
    /// Display name
    pub name: String,
}

impl NodeDataType {
    /// Create a data type with a display name
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Create a data type whose display name equals its id
    pub fn from_id(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
        }
    }
}

impl PartialEq for NodeDataType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl PartialOrd for NodeDataType {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NodeDataType {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl Hash for NodeDataType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for NodeDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Value that can be carried along a connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PortValue {
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Decimal number
    Float(f64),
    /// 2D vector
    Vector2([f32; 2]),
    /// 3D vector
    Vector3([f32; 3]),
    /// 4D vector
    Vector4([f32; 4]),
    /// Text
    String(String),
    /// Arbitrary structured payload
    Json(serde_json::Value),
}

impl PortValue {
    /// Data type id naturally describing this value
    pub fn type_id(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "decimal",
            Self::Vector2(_) => "vector2",
            Self::Vector3(_) => "vector3",
            Self::Vector4(_) => "vector4",
            Self::String(_) => "text",
            Self::Json(_) => "json",
        }
    }

    /// Numeric view of the value, if it has one
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Text view of the value, if it is text
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Keys for port-related data served by a graph model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortRole {
    /// Current value; outputs report their cache, inputs what was last delivered
    Data,
    /// Declared [`NodeDataType`]
    DataType,
    /// [`ConnectionPolicy`] of the port
    ConnectionPolicy,
    /// Whether the caption is shown
    CaptionVisible,
    /// Port caption
    Caption,
}

/// A port property paired with its value
#[derive(Debug, Clone, PartialEq)]
pub enum PortAttribute {
    /// Value for [`PortRole::Data`]; `None` is the empty value
    Data(Option<PortValue>),
    /// Value for [`PortRole::DataType`]
    DataType(NodeDataType),
    /// Value for [`PortRole::ConnectionPolicy`]
    ConnectionPolicy(ConnectionPolicy),
    /// Value for [`PortRole::CaptionVisible`]
    CaptionVisible(bool),
    /// Value for [`PortRole::Caption`]
    Caption(String),
}

impl PortAttribute {
    /// The role this value answers
    pub fn role(&self) -> PortRole {
        match self {
            Self::Data(_) => PortRole::Data,
            Self::DataType(_) => PortRole::DataType,
            Self::ConnectionPolicy(_) => PortRole::ConnectionPolicy,
            Self::CaptionVisible(_) => PortRole::CaptionVisible,
            Self::Caption(_) => PortRole::Caption,
        }
    }

    /// Unwrap a data value
    pub fn into_data(self) -> Option<PortValue> {
        match self {
            Self::Data(value) => value,
            _ => None,
        }
    }

    /// Unwrap a data type
    pub fn into_data_type(self) -> Option<NodeDataType> {
        match self {
            Self::DataType(data_type) => Some(data_type),
            _ => None,
        }
    }

    /// Unwrap a connection policy
    pub fn into_policy(self) -> Option<ConnectionPolicy> {
        match self {
            Self::ConnectionPolicy(policy) => Some(policy),
            _ => None,
        }
    }

    /// Unwrap a caption
    pub fn into_caption(self) -> Option<String> {
        match self {
            Self::Caption(caption) => Some(caption),
            _ => None,
        }
    }
}
