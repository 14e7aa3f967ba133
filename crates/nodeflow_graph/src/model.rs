// SPDX-License-Identifier: MIT OR Apache-2.0
//! The graph model contract.
//!
//! [`GraphModel`] is everything a rendering layer, an interaction layer or
//! an undo stack may use. None of them reach into a model's adjacency
//! storage directly.
//!
//! ## Port reshaping
//!
//! Ports are addressed by dense indices, so inserting or removing ports on
//! a live node moves every connection attached at or after the affected
//! range. The reshape happens in two phases:
//!
//! 1. `ports_about_to_be_*` deletes the connections on removed ports,
//!    detaches the connections that are going to move and remembers their
//!    post-reshape ids;
//! 2. the port layout changes;
//! 3. `ports_inserted` / `ports_deleted` recreates the remembered
//!    connections at their new indices.
//!
//! Between the two calls no connection refers to an index that is about to
//! change meaning.

use crate::connection::ConnectionId;
use crate::document::NodeDocument;
use crate::error::{ConnectionError, LoadError};
use crate::events::{GraphObserver, ObserverId};
use crate::node::{NodeAttribute, NodeFlags, NodeId, NodeRole};
use crate::port::{PortAttribute, PortCount, PortIndex, PortRole, PortType};
use indexmap::IndexSet;

/// Connections affected by a port reshape
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortShift {
    /// Connections on ports that disappear
    pub removed: Vec<ConnectionId>,
    /// Connections that survive at another index, as `(before, after)`
    pub moved: Vec<(ConnectionId, ConnectionId)>,
}

impl PortShift {
    /// Whether no connection is affected
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.moved.is_empty()
    }
}

/// Owner of a node graph's topology and gatekeeper of every mutation
pub trait GraphModel {
    /// Every node id, in creation order
    fn all_node_ids(&self) -> IndexSet<NodeId>;

    /// Every connection touching `node_id`, inputs and outputs
    fn all_connection_ids(&self, node_id: NodeId) -> IndexSet<ConnectionId>;

    /// Connections attached to one port
    fn connections(&self, node_id: NodeId, port_type: PortType, index: PortIndex) -> IndexSet<ConnectionId>;

    /// Whether the connection is part of the graph
    fn connection_exists(&self, id: ConnectionId) -> bool;

    /// Whether the node is part of the graph
    fn node_exists(&self, node_id: NodeId) -> bool;

    /// Create a node of a registered type; `None` if the type is unknown
    fn add_node(&mut self, type_name: &str) -> Option<NodeId>;

    /// Explain why a connection could not be added, or `Ok` if it could
    fn check_connection(&self, id: ConnectionId) -> Result<(), ConnectionError>;

    /// Whether `id` could be added right now
    fn connection_possible(&self, id: ConnectionId) -> bool {
        self.check_connection(id).is_ok()
    }

    /// Whether the user may pull an existing connection off a port
    fn detach_possible(&self, _id: ConnectionId) -> bool {
        true
    }

    /// Whether the model accepts cycles
    fn loops_enabled(&self) -> bool {
        true
    }

    /// Validate and add a connection, then push the output value into the
    /// input. Impossible connections are rejected without any change.
    fn add_connection(&mut self, id: ConnectionId) -> Result<(), ConnectionError>;

    /// Remove a connection and push the empty value into its input;
    /// `false` if it did not exist
    fn delete_connection(&mut self, id: ConnectionId) -> bool;

    /// Remove a node after removing all its connections; `false` if it did
    /// not exist
    fn delete_node(&mut self, node_id: NodeId) -> bool;

    /// Read a node property
    fn node_data(&self, node_id: NodeId, role: NodeRole) -> Option<NodeAttribute>;

    /// Write a node property; `false` if the node is unknown, the role is
    /// read-only or `value` does not answer `role`
    fn set_node_data(&mut self, node_id: NodeId, role: NodeRole, value: NodeAttribute) -> bool;

    /// Feature flags of a node
    fn node_flags(&self, _node_id: NodeId) -> NodeFlags {
        NodeFlags::default()
    }

    /// Read a port property
    fn port_data(&self, node_id: NodeId, port_type: PortType, index: PortIndex, role: PortRole) -> Option<PortAttribute>;

    /// Write a port property; same failure rules as
    /// [`GraphModel::set_node_data`]
    fn set_port_data(
        &mut self,
        node_id: NodeId,
        port_type: PortType,
        index: PortIndex,
        value: PortAttribute,
        role: PortRole,
    ) -> bool;

    /// Snapshot of one node for undo or copy
    fn save_node(&self, _node_id: NodeId) -> Option<NodeDocument> {
        None
    }

    /// Restore a node produced by [`GraphModel::save_node`], keeping its id
    fn load_node(&mut self, document: &NodeDocument) -> Result<NodeId, LoadError>;

    /// Phase one of a port removal
    fn ports_about_to_be_deleted(&mut self, node_id: NodeId, port_type: PortType, first: PortIndex, last: PortIndex);

    /// Phase two of a port removal
    fn ports_deleted(&mut self);

    /// Phase one of a port insertion; `first..=last` are the new indices
    fn ports_about_to_be_inserted(&mut self, node_id: NodeId, port_type: PortType, first: PortIndex, last: PortIndex);

    /// Phase two of a port insertion
    fn ports_inserted(&mut self);

    /// Attach an observer of structural changes
    fn subscribe(&mut self, observer: Box<dyn GraphObserver>) -> ObserverId;

    /// Detach an observer
    fn unsubscribe(&mut self, id: ObserverId) -> bool;

    /// Number of ports of one type; 0 for unknown nodes
    fn port_count(&self, node_id: NodeId, port_type: PortType) -> PortCount {
        self.node_data(node_id, NodeRole::port_count(port_type))
            .and_then(|attribute| attribute.as_port_count())
            .unwrap_or(0)
    }

    /// Connections affected by removing ports `first..=last`.
    ///
    /// `last` is clamped to the current port count.
    fn plan_port_removal(&self, node_id: NodeId, port_type: PortType, first: PortIndex, last: PortIndex) -> PortShift {
        let mut shift = PortShift::default();
        let count = self.port_count(node_id, port_type);
        if count == 0 || first >= count || last < first {
            return shift;
        }

        let last = last.min(count - 1);
        for index in first..=last {
            shift.removed.extend(self.connections(node_id, port_type, index));
        }

        let removed_ports = last - first + 1;
        for index in last + 1..count {
            for id in self.connections(node_id, port_type, index) {
                let after = id.with_endpoint(port_type, node_id, index - removed_ports);
                shift.moved.push((id, after));
            }
        }
        shift
    }

    /// Connections affected by inserting ports so that the new ones occupy
    /// `first..=last`.
    ///
    /// The plan is empty when the resulting port count would not fit in a
    /// [`PortCount`].
    fn plan_port_insertion(&self, node_id: NodeId, port_type: PortType, first: PortIndex, last: PortIndex) -> PortShift {
        let mut shift = PortShift::default();
        let count = self.port_count(node_id, port_type);
        if first > count || last < first {
            return shift;
        }
        let Some(new_ports) = inserted_port_count(count, first, last) else {
            return shift;
        };

        for index in first..count {
            for id in self.connections(node_id, port_type, index) {
                let after = id.with_endpoint(port_type, node_id, index + new_ports);
                shift.moved.push((id, after));
            }
        }
        shift
    }
}

/// Number of ports added by inserting `first..=last` into a list of
/// `count`, or `None` if the list would outgrow [`PortCount`].
pub(crate) fn inserted_port_count(count: PortCount, first: PortIndex, last: PortIndex) -> Option<PortCount> {
    let new_ports = last.checked_sub(first)?.checked_add(1)?;
    count.checked_add(new_ports)?;
    Some(new_ports)
}
