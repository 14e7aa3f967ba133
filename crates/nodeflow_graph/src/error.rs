// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error types.
//!
//! Looking up something that does not exist is not an error: those
//! operations answer `false` or `None`. The types here cover rejected
//! connections, malformed documents and configuration files.

use crate::connection::ConnectionId;
use crate::node::NodeId;
use crate::port::{NodeDataType, PortIndex, PortType};

/// Why a connection cannot be created
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConnectionError {
    /// One side of the id is unset
    #[error("Incomplete connection: {0}")]
    IncompleteConnection(ConnectionId),

    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Port index beyond the node's port count
    #[error("Port {port_type} {index} out of range on node {node_id}")]
    PortOutOfRange {
        /// Node addressed
        node_id: NodeId,
        /// Side addressed
        port_type: PortType,
        /// Index addressed
        index: PortIndex,
    },

    /// Self-loop not allowed
    #[error("Self-loop not allowed on node {0}")]
    SelfLoop(NodeId),

    /// Declared data types differ
    #[error("Incompatible data types: {output} -> {input}")]
    DataTypeMismatch {
        /// Type of the output port
        output: NodeDataType,
        /// Type of the input port
        input: NodeDataType,
    },

    /// The port's connection policy does not allow another edge
    #[error("Port {port_type} {index} on node {node_id} is already connected")]
    PolicyExceeded {
        /// Node addressed
        node_id: NodeId,
        /// Side addressed
        port_type: PortType,
        /// Index addressed
        index: PortIndex,
    },

    /// The edge would close a cycle
    #[error("Connection {0} would create a cycle")]
    WouldCreateCycle(ConnectionId),

    /// The edge is already present
    #[error("Connection {0} already exists")]
    AlreadyExists(ConnectionId),
}

/// Why a document could not be loaded
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The text is not a valid document
    #[error("Malformed document: {0}")]
    Json(#[from] serde_json::Error),

    /// Node document without a `model-name`
    #[error("Node {0} has no model name")]
    MissingModelName(NodeId),

    /// `model-name` not present in the registry
    #[error("No registered model with name {type_name} (node {node_id})")]
    UnknownNodeType {
        /// Node being restored
        node_id: NodeId,
        /// Name that failed to resolve
        type_name: String,
    },

    /// The document uses the invalid sentinel as a node id
    #[error("Invalid node id in document")]
    InvalidNodeId,

    /// The id is used twice, or is already taken in the model
    #[error("Duplicate node id: {0}")]
    DuplicateNodeId(NodeId),

    /// A connection references a node that is not loaded
    #[error("Connection {0} references a missing node")]
    DanglingConnection(ConnectionId),

    /// A connection is not possible in the restored graph
    #[error("Connection {connection} rejected: {source}")]
    ConnectionRejected {
        /// The rejected connection
        connection: ConnectionId,
        /// Why it was rejected
        #[source]
        source: ConnectionError,
    },

    /// A delegate could not restore its internal state
    #[error("Node {node_id} could not restore its state: {source}")]
    DelegateState {
        /// Node being restored
        node_id: NodeId,
        /// Delegate's deserialization error
        #[source]
        source: serde_json::Error,
    },
}

/// Configuration file errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Reading or writing the file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid RON
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// The settings could not be written as RON
    #[error("Serialization error: {0}")]
    Serialize(#[from] ron::Error),

    /// The file was written by a newer version
    #[error("Config version {found} is newer than supported version {supported}")]
    UnsupportedVersion {
        /// Version in the file
        found: u32,
        /// Newest version this build understands
        supported: u32,
    },
}
