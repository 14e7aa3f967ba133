// SPDX-License-Identifier: MIT OR Apache-2.0
//! Directed acyclic graph model.
//!
//! [`DagGraphModel`] owns nodes in an arena keyed by [`NodeId`] and keeps
//! connections twice: once as a set of [`ConnectionId`]s, and once as an
//! adjacency index from `(node, port type, port index)` to the opposite
//! endpoints, so every edge on a port is found without a scan.
//!
//! Every connection that would close a cycle is rejected. Cycle checks are
//! memoized by a fingerprint of the node and edge sets; the memo is dropped
//! wholesale on every structural change.

use crate::config::GraphConfig;
use crate::connection::ConnectionId;
use crate::delegate::{DelegateContext, NodeDelegate};
use crate::document::{GraphDocument, NodeDocument, MODEL_NAME_KEY};
use crate::error::{ConnectionError, LoadError};
use crate::events::{GraphEvent, GraphObserver, ObserverId, Observers};
use crate::model::{inserted_port_count, GraphModel, PortShift};
use crate::node::{Node, NodeAttribute, NodeFlags, NodeId, NodeRole};
use crate::port::{NodeDataType, PortAttribute, PortIndex, PortRole, PortType, MAX_PORT_COUNT};
use crate::propagation::{Propagation, Work};
use crate::registry::DelegateRegistry;
use crate::topology;
use indexmap::{IndexMap, IndexSet};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

/// Address of one port
pub(crate) type PortKey = (NodeId, PortType, PortIndex);

/// Whether a reshape adds or removes ports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReshapeKind {
    Insert,
    Remove,
}

/// State kept between the two phases of a host-driven reshape
#[derive(Debug, Clone)]
struct PendingReshape {
    node_id: NodeId,
    kind: ReshapeKind,
    shift: PortShift,
}

/// Graph model that forbids cycles
#[derive(Debug)]
pub struct DagGraphModel {
    /// Factories for node types
    registry: Rc<DelegateRegistry>,
    /// Settings
    config: GraphConfig,
    /// Next id handed out by `add_node`
    next_node_id: u32,
    /// Nodes in creation order
    pub(crate) nodes: IndexMap<NodeId, Node>,
    /// Every connection, in creation order
    pub(crate) connectivity: IndexSet<ConnectionId>,
    /// Opposite endpoints of every connected port
    pub(crate) adjacency: HashMap<PortKey, IndexSet<(NodeId, PortIndex)>>,
    /// Memoized cycle checks by structure fingerprint
    cyclic_cache: RefCell<HashMap<u64, bool>>,
    /// Reshape started by `ports_about_to_be_*` and not finished yet
    pending_reshape: Option<PendingReshape>,
    /// Change observers
    pub(crate) observers: Observers,
}

impl DagGraphModel {
    /// Create an empty model with default settings
    pub fn new(registry: Rc<DelegateRegistry>) -> Self {
        Self::with_config(registry, GraphConfig::default())
    }

    /// Create an empty model
    pub fn with_config(registry: Rc<DelegateRegistry>, config: GraphConfig) -> Self {
        Self {
            registry,
            config,
            next_node_id: 0,
            nodes: IndexMap::new(),
            connectivity: IndexSet::new(),
            adjacency: HashMap::new(),
            cyclic_cache: RefCell::new(HashMap::new()),
            pending_reshape: None,
            observers: Observers::new(),
        }
    }

    /// The registry nodes are created from
    pub fn registry(&self) -> &Rc<DelegateRegistry> {
        &self.registry
    }

    /// Current settings
    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Whether the model holds neither nodes nor connections
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.connectivity.is_empty()
    }

    /// Number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of connections
    pub fn connection_count(&self) -> usize {
        self.connectivity.len()
    }

    /// Every connection, in creation order
    pub fn all_connections(&self) -> impl Iterator<Item = &ConnectionId> {
        self.connectivity.iter()
    }

    /// The delegate of a node
    pub fn delegate_dyn(&self, node_id: NodeId) -> Option<&dyn NodeDelegate> {
        self.nodes.get(&node_id).map(|node| &*node.delegate)
    }

    /// The delegate of a node, if it has the concrete type `T`
    pub fn delegate<T: NodeDelegate>(&self, node_id: NodeId) -> Option<&T> {
        let delegate = self.delegate_dyn(node_id)?;
        delegate.as_any().downcast_ref::<T>()
    }

    /// Run `f` on a node's delegate and process whatever it asked for.
    ///
    /// This is how a host changes a delegate's state: the outputs the
    /// delegate reports through the context are pushed downstream before
    /// this returns. `None` if the node does not exist or has another type.
    pub fn update_delegate<T, R, F>(&mut self, node_id: NodeId, f: F) -> Option<R>
    where
        T: NodeDelegate,
        F: FnOnce(&mut T, &mut DelegateContext) -> R,
    {
        let node = self.nodes.get_mut(&node_id)?;
        let delegate: &mut dyn NodeDelegate = &mut *node.delegate;
        let delegate = delegate.as_any_mut().downcast_mut::<T>()?;

        let mut ctx = DelegateContext::new(node_id);
        let result = f(delegate, &mut ctx);

        let batch = self.delegate_work(node_id, ctx.into_events());
        self.run(Propagation::with(batch));
        Some(result)
    }

    /// Lock or unlock a node in the UI
    pub fn set_node_locked(&mut self, node_id: NodeId, locked: bool) -> bool {
        let Some(node) = self.nodes.get_mut(&node_id) else {
            return false;
        };
        if node.locked != locked {
            node.locked = locked;
            self.observers.emit(GraphEvent::NodeFlagsUpdated(node_id));
        }
        true
    }

    /// Delete every node and connection
    pub fn clear(&mut self) {
        let ids: Vec<NodeId> = self.nodes.keys().copied().collect();
        for node_id in ids {
            self.delete_node(node_id);
        }
        self.cyclic_cache.borrow_mut().clear();
        self.observers.emit(GraphEvent::ModelReset);
    }

    // ------------------------------------------------------------------
    // Acyclicity
    // ------------------------------------------------------------------

    /// Whether the current connections contain a cycle; never true after a
    /// committed mutation
    pub fn is_cyclic(&self) -> bool {
        let edges: Vec<ConnectionId> = self.connectivity.iter().copied().collect();
        self.is_cyclic_with(&edges)
    }

    /// Whether adding `id` to the current connections would create a cycle.
    ///
    /// The model itself is not changed.
    pub fn will_be_cyclic(&self, id: ConnectionId) -> bool {
        let mut edges: Vec<ConnectionId> = self.connectivity.iter().copied().collect();
        edges.push(id);
        self.is_cyclic_with(&edges)
    }

    fn is_cyclic_with(&self, edges: &[ConnectionId]) -> bool {
        let nodes: Vec<NodeId> = self.nodes.keys().copied().collect();
        if !self.config.memoize_cycle_checks {
            return topology::is_cyclic(&nodes, edges);
        }

        let key = topology::structure_hash(&nodes, edges);
        let cached = self.cyclic_cache.borrow().get(&key).copied();
        if let Some(cyclic) = cached {
            return cyclic;
        }
        let cyclic = topology::is_cyclic(&nodes, edges);
        self.cyclic_cache.borrow_mut().insert(key, cyclic);
        cyclic
    }

    /// Number of memoized cycle-check results
    pub fn cached_cycle_checks(&self) -> usize {
        self.cyclic_cache.borrow().len()
    }

    /// Nodes ordered so that every connection points forward
    pub fn topological_order(&self) -> Vec<NodeId> {
        let nodes: Vec<NodeId> = self.nodes.keys().copied().collect();
        topology::topological_order(&nodes, &self.connectivity)
    }

    /// Whether the graph, ignoring direction, is one component covering
    /// every node. An empty graph is not connected.
    pub fn is_connected(&self) -> bool {
        let nodes: Vec<NodeId> = self.nodes.keys().copied().collect();
        topology::is_connected(&nodes, &self.connectivity)
    }

    fn structure_changed(&self) {
        self.cyclic_cache.borrow_mut().clear();
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Snapshot of every node and connection
    pub fn save(&self) -> GraphDocument {
        GraphDocument {
            nodes: self.nodes.keys().filter_map(|id| self.save_node(*id)).collect(),
            connections: self.connectivity.iter().copied().collect(),
        }
    }

    /// Restore a document into this model.
    ///
    /// Node ids from the document are kept. Node types, id clashes,
    /// self-loops, repeated connections and connection endpoints are
    /// validated before anything is created. A failure after that point
    /// (a delegate that cannot restore its state, or a connection that is
    /// impossible once the nodes exist) deletes every node this call
    /// restored, leaving the model as it was.
    pub fn load(&mut self, document: &GraphDocument) -> Result<(), LoadError> {
        let mut incoming: HashSet<NodeId> = HashSet::new();
        for node in &document.nodes {
            if !node.id.is_valid() {
                return Err(LoadError::InvalidNodeId);
            }
            if !incoming.insert(node.id) || self.node_exists(node.id) {
                return Err(LoadError::DuplicateNodeId(node.id));
            }
            let type_name = node.model_name().ok_or(LoadError::MissingModelName(node.id))?;
            if !self.registry.contains(type_name) {
                return Err(LoadError::UnknownNodeType {
                    node_id: node.id,
                    type_name: type_name.to_string(),
                });
            }
        }

        let mut seen: HashSet<ConnectionId> = HashSet::new();
        for &connection in &document.connections {
            let known = |id: NodeId| incoming.contains(&id) || self.node_exists(id);
            if !known(connection.out_node_id) || !known(connection.in_node_id) {
                return Err(LoadError::DanglingConnection(connection));
            }
            let rejected = if connection.out_node_id == connection.in_node_id {
                Some(ConnectionError::SelfLoop(connection.out_node_id))
            } else if !seen.insert(connection) || self.connection_exists(connection) {
                Some(ConnectionError::AlreadyExists(connection))
            } else {
                None
            };
            if let Some(source) = rejected {
                return Err(LoadError::ConnectionRejected { connection, source });
            }
        }

        let mut restored = Vec::with_capacity(document.nodes.len());
        if let Err(e) = self.restore(document, &mut restored) {
            tracing::warn!(error = %e, nodes = restored.len(), "load failed, removing restored nodes");
            for node_id in restored {
                self.delete_node(node_id);
            }
            return Err(e);
        }

        tracing::debug!(
            nodes = document.nodes.len(),
            connections = document.connections.len(),
            "loaded graph document"
        );
        Ok(())
    }

    fn restore(&mut self, document: &GraphDocument, restored: &mut Vec<NodeId>) -> Result<(), LoadError> {
        for node in &document.nodes {
            restored.push(self.load_node(node)?);
        }
        for connection in document.ordered_connections(self.config.load_input_zero_first) {
            self.add_connection(connection)
                .map_err(|source| LoadError::ConnectionRejected { connection, source })?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Port reshaping driven by the host
    // ------------------------------------------------------------------

    /// Insert ports `first..=last` on a node whose delegate supports it,
    /// moving the connections after them.
    ///
    /// Returns `false` if the node does not exist or its delegate refused;
    /// in that case the connections end up where they were.
    pub fn insert_ports(&mut self, node_id: NodeId, port_type: PortType, first: PortIndex, last: PortIndex) -> bool {
        self.reshape_now(node_id, port_type, first, last, ReshapeKind::Insert)
    }

    /// Remove ports `first..=last`, deleting their connections and moving
    /// the ones after them.
    pub fn remove_ports(&mut self, node_id: NodeId, port_type: PortType, first: PortIndex, last: PortIndex) -> bool {
        self.reshape_now(node_id, port_type, first, last, ReshapeKind::Remove)
    }

    fn reshape_now(&mut self, node_id: NodeId, port_type: PortType, first: PortIndex, last: PortIndex, kind: ReshapeKind) -> bool {
        if !self.node_exists(node_id) {
            return false;
        }
        match kind {
            ReshapeKind::Insert => self.ports_about_to_be_inserted(node_id, port_type, first, last),
            ReshapeKind::Remove => self.ports_about_to_be_deleted(node_id, port_type, first, last),
        }

        let accepted = self.apply_layout(node_id, port_type, first, last, kind);
        if !accepted {
            if let Some(pending) = self.pending_reshape.as_mut() {
                pending.shift = restore_shift(&pending.shift);
            }
        }

        match kind {
            ReshapeKind::Insert => self.ports_inserted(),
            ReshapeKind::Remove => self.ports_deleted(),
        }
        accepted
    }

    // ------------------------------------------------------------------
    // Internals shared with the propagation engine
    // ------------------------------------------------------------------

    fn new_node_id(&mut self) -> Option<NodeId> {
        let id = NodeId(self.next_node_id);
        if !id.is_valid() {
            tracing::warn!("node id space exhausted");
            return None;
        }
        self.next_node_id += 1;
        Some(id)
    }

    fn insert_edge(&mut self, id: ConnectionId) {
        self.connectivity.insert(id);
        self.adjacency
            .entry((id.out_node_id, PortType::Out, id.out_port_index))
            .or_default()
            .insert((id.in_node_id, id.in_port_index));
        self.adjacency
            .entry((id.in_node_id, PortType::In, id.in_port_index))
            .or_default()
            .insert((id.out_node_id, id.out_port_index));
        self.structure_changed();
    }

    fn remove_edge(&mut self, id: ConnectionId) -> bool {
        if !self.connectivity.shift_remove(&id) {
            return false;
        }
        let sides = [
            ((id.out_node_id, PortType::Out, id.out_port_index), (id.in_node_id, id.in_port_index)),
            ((id.in_node_id, PortType::In, id.in_port_index), (id.out_node_id, id.out_port_index)),
        ];
        for (key, opposite) in sides {
            if let Some(set) = self.adjacency.get_mut(&key) {
                set.shift_remove(&opposite);
                if set.is_empty() {
                    self.adjacency.remove(&key);
                }
            }
        }
        self.structure_changed();
        true
    }

    /// Validate and commit a connection; the resulting hooks and value
    /// delivery are appended to `batch`
    pub(crate) fn attach(&mut self, id: ConnectionId, batch: &mut Vec<Work>) -> Result<(), ConnectionError> {
        self.check_connection(id)?;
        self.insert_edge(id);
        tracing::debug!(connection = %id, "connection created");
        self.observers.emit(GraphEvent::ConnectionCreated(id));

        let value = self
            .nodes
            .get(&id.out_node_id)
            .and_then(|node| node.delegate.out_data(id.out_port_index));
        batch.push(Work::InputConnectionCreated(id));
        batch.push(Work::OutputConnectionCreated(id));
        batch.push(Work::Deliver { connection: id, value });
        Ok(())
    }

    /// Remove a connection; the resulting hooks and the empty value for
    /// its input are appended to `batch`
    pub(crate) fn detach(&mut self, id: ConnectionId, batch: &mut Vec<Work>) -> bool {
        if !self.remove_edge(id) {
            return false;
        }
        tracing::debug!(connection = %id, "connection deleted");
        self.observers.emit(GraphEvent::ConnectionDeleted(id));

        batch.push(Work::InputConnectionDeleted(id));
        batch.push(Work::OutputConnectionDeleted(id));
        batch.push(Work::Input {
            node_id: id.in_node_id,
            index: id.in_port_index,
            value: None,
        });
        true
    }

    /// Phase one of a reshape: announce it, plan it and detach everything
    /// the plan touches. Returns the plan.
    pub(crate) fn begin_reshape(
        &mut self,
        node_id: NodeId,
        port_type: PortType,
        first: PortIndex,
        last: PortIndex,
        kind: ReshapeKind,
        batch: &mut Vec<Work>,
    ) -> PortShift {
        let (event, shift) = match kind {
            ReshapeKind::Insert => (
                GraphEvent::PortsAboutToBeInserted { node_id, port_type, first, last },
                self.plan_port_insertion(node_id, port_type, first, last),
            ),
            ReshapeKind::Remove => (
                GraphEvent::PortsAboutToBeDeleted { node_id, port_type, first, last },
                self.plan_port_removal(node_id, port_type, first, last),
            ),
        };
        self.observers.emit(event);
        tracing::debug!(
            node = %node_id,
            %port_type,
            first,
            last,
            removed = shift.removed.len(),
            moved = shift.moved.len(),
            "reshaping ports"
        );

        for id in shift.removed.iter().chain(shift.moved.iter().map(|(before, _)| before)) {
            self.detach(*id, batch);
        }
        shift
    }

    /// Change the delegate's port layout between the two phases
    pub(crate) fn apply_layout(&mut self, node_id: NodeId, port_type: PortType, first: PortIndex, last: PortIndex, kind: ReshapeKind) -> bool {
        if kind == ReshapeKind::Insert {
            let count = self.port_count(node_id, port_type);
            let fits = inserted_port_count(count, first, last).is_some_and(|added| count + added <= MAX_PORT_COUNT);
            if !fits {
                tracing::warn!(node = %node_id, first, last, "port insertion exceeds the port limit");
                return false;
            }
        }
        let Some(node) = self.nodes.get_mut(&node_id) else {
            return false;
        };
        let accepted = match kind {
            ReshapeKind::Insert => node.delegate.insert_ports(port_type, first, last),
            ReshapeKind::Remove => node.delegate.remove_ports(port_type, first, last),
        };
        if !accepted {
            tracing::warn!(node = %node_id, ?kind, "delegate refused to reshape its ports");
        }
        accepted
    }

    /// Phase two of a reshape: recreate the moved connections at their new
    /// indices, then announce completion
    pub(crate) fn finish_reshape(&mut self, node_id: NodeId, kind: ReshapeKind, shift: &PortShift, batch: &mut Vec<Work>) {
        for (_, after) in &shift.moved {
            if let Err(err) = self.attach(*after, batch) {
                tracing::warn!(connection = %after, %err, "could not recreate shifted connection");
            }
        }
        let done = match kind {
            ReshapeKind::Insert => GraphEvent::PortsInserted { node_id },
            ReshapeKind::Remove => GraphEvent::PortsDeleted { node_id },
        };
        batch.push(Work::Notify(done));
    }

    fn run_batch(&mut self, batch: Vec<Work>) {
        if !batch.is_empty() {
            self.run(Propagation::with(batch));
        }
    }
}

/// Plan that puts every connection of `shift` back where it was
pub(crate) fn restore_shift(shift: &PortShift) -> PortShift {
    PortShift {
        removed: Vec::new(),
        moved: shift
            .removed
            .iter()
            .map(|id| (*id, *id))
            .chain(shift.moved.iter().map(|(before, _)| (*before, *before)))
            .collect(),
    }
}

impl GraphModel for DagGraphModel {
    fn all_node_ids(&self) -> IndexSet<NodeId> {
        self.nodes.keys().copied().collect()
    }

    fn all_connection_ids(&self, node_id: NodeId) -> IndexSet<ConnectionId> {
        let Some(node) = self.nodes.get(&node_id) else {
            return IndexSet::new();
        };
        let mut result = IndexSet::new();
        for port_type in PortType::ALL {
            for index in 0..node.port_count(port_type) {
                result.extend(self.connections(node_id, port_type, index));
            }
        }
        result
    }

    fn connections(&self, node_id: NodeId, port_type: PortType, index: PortIndex) -> IndexSet<ConnectionId> {
        let Some(opposites) = self.adjacency.get(&(node_id, port_type, index)) else {
            return IndexSet::new();
        };
        opposites
            .iter()
            .map(|&(other, other_index)| match port_type {
                PortType::Out => ConnectionId::new(node_id, index, other, other_index),
                PortType::In => ConnectionId::new(other, other_index, node_id, index),
            })
            .collect()
    }

    fn connection_exists(&self, id: ConnectionId) -> bool {
        self.connectivity.contains(&id)
    }

    fn node_exists(&self, node_id: NodeId) -> bool {
        self.nodes.contains_key(&node_id)
    }

    fn add_node(&mut self, type_name: &str) -> Option<NodeId> {
        let Some(delegate) = self.registry.create(type_name) else {
            tracing::warn!(type_name, "cannot create node of unregistered type");
            return None;
        };
        let node_id = self.new_node_id()?;
        self.nodes.insert(node_id, Node::new(delegate));
        self.structure_changed();
        tracing::debug!(node = %node_id, type_name, "node created");
        self.observers.emit(GraphEvent::NodeCreated(node_id));
        Some(node_id)
    }

    fn check_connection(&self, id: ConnectionId) -> Result<(), ConnectionError> {
        if !id.is_complete() {
            return Err(ConnectionError::IncompleteConnection(id));
        }
        for node_id in [id.out_node_id, id.in_node_id] {
            if !self.node_exists(node_id) {
                return Err(ConnectionError::NodeNotFound(node_id));
            }
        }
        if id.is_self_loop() {
            return Err(ConnectionError::SelfLoop(id.out_node_id));
        }

        let port_type_of = |port_type: PortType| -> Result<NodeDataType, ConnectionError> {
            let node_id = id.node_id(port_type);
            let index = id.port_index(port_type);
            let node = self.nodes.get(&node_id).ok_or(ConnectionError::NodeNotFound(node_id))?;
            if !node.has_port(port_type, index) {
                return Err(ConnectionError::PortOutOfRange { node_id, port_type, index });
            }
            Ok(node.delegate.data_type(port_type, index))
        };
        let output = port_type_of(PortType::Out)?;
        let input = port_type_of(PortType::In)?;
        if output != input {
            return Err(ConnectionError::DataTypeMismatch { output, input });
        }

        if self.connection_exists(id) {
            return Err(ConnectionError::AlreadyExists(id));
        }

        for port_type in [PortType::Out, PortType::In] {
            let node_id = id.node_id(port_type);
            let index = id.port_index(port_type);
            let connected = self.adjacency.get(&(node_id, port_type, index)).map_or(0, IndexSet::len);
            let policy = self
                .nodes
                .get(&node_id)
                .map(|node| node.delegate.connection_policy(port_type, index))
                .ok_or(ConnectionError::NodeNotFound(node_id))?;
            if !policy.accepts(connected) {
                return Err(ConnectionError::PolicyExceeded { node_id, port_type, index });
            }
        }

        if !self.loops_enabled() && self.will_be_cyclic(id) {
            return Err(ConnectionError::WouldCreateCycle(id));
        }
        Ok(())
    }

    fn loops_enabled(&self) -> bool {
        false
    }

    fn add_connection(&mut self, id: ConnectionId) -> Result<(), ConnectionError> {
        let mut batch = Vec::new();
        if let Err(err) = self.attach(id, &mut batch) {
            tracing::warn!(connection = %id, %err, "connection rejected");
            return Err(err);
        }
        self.run_batch(batch);

        if self.is_cyclic() {
            tracing::error!(connection = %id, "graph became cyclic after adding a connection");
        }
        Ok(())
    }

    fn delete_connection(&mut self, id: ConnectionId) -> bool {
        let mut batch = Vec::new();
        let deleted = self.detach(id, &mut batch);
        self.run_batch(batch);
        deleted
    }

    fn delete_node(&mut self, node_id: NodeId) -> bool {
        if !self.node_exists(node_id) {
            return false;
        }

        let mut batch = Vec::new();
        for id in self.all_connection_ids(node_id) {
            self.detach(id, &mut batch);
        }
        self.run_batch(batch);

        // Propagation may have reshaped ports and reattached connections.
        for id in self.all_connection_ids(node_id) {
            self.delete_connection(id);
        }
        self.adjacency.retain(|(owner, _, _), _| *owner != node_id);

        self.nodes.shift_remove(&node_id);
        self.structure_changed();
        tracing::debug!(node = %node_id, "node deleted");
        self.observers.emit(GraphEvent::NodeDeleted(node_id));
        true
    }

    fn node_data(&self, node_id: NodeId, role: NodeRole) -> Option<NodeAttribute> {
        let node = self.nodes.get(&node_id)?;
        let delegate = &node.delegate;
        let attribute = match role {
            NodeRole::Type => NodeAttribute::Type(delegate.name().to_string()),
            NodeRole::Position => NodeAttribute::Position(node.position),
            NodeRole::Size => NodeAttribute::Size(node.size),
            NodeRole::CaptionVisible => NodeAttribute::CaptionVisible(delegate.caption_visible()),
            NodeRole::Caption => NodeAttribute::Caption(delegate.caption()),
            NodeRole::InternalData => NodeAttribute::InternalData(self.save_node(node_id)?.internal_data),
            NodeRole::InPortCount => NodeAttribute::InPortCount(node.port_count(PortType::In)),
            NodeRole::OutPortCount => NodeAttribute::OutPortCount(node.port_count(PortType::Out)),
            NodeRole::ValidationState => NodeAttribute::ValidationState(delegate.validation_state()),
            NodeRole::ProcessingStatus => NodeAttribute::ProcessingStatus(delegate.processing_status()),
        };
        Some(attribute)
    }

    fn set_node_data(&mut self, node_id: NodeId, role: NodeRole, value: NodeAttribute) -> bool {
        if value.role() != role {
            tracing::warn!(node = %node_id, ?role, ?value, "value does not match node role");
            return false;
        }
        let Some(node) = self.nodes.get_mut(&node_id) else {
            return false;
        };
        match value {
            NodeAttribute::Position(position) => {
                node.position = position;
                self.observers.emit(GraphEvent::NodePositionUpdated(node_id));
                true
            }
            NodeAttribute::Size(size) => {
                node.size = size;
                self.observers.emit(GraphEvent::NodeUpdated(node_id));
                true
            }
            _ => false,
        }
    }

    fn node_flags(&self, node_id: NodeId) -> NodeFlags {
        self.nodes.get(&node_id).map(Node::flags).unwrap_or_default()
    }

    fn port_data(&self, node_id: NodeId, port_type: PortType, index: PortIndex, role: PortRole) -> Option<PortAttribute> {
        let node = self.nodes.get(&node_id)?;
        if !node.has_port(port_type, index) {
            return None;
        }
        let delegate = &node.delegate;
        let attribute = match role {
            PortRole::Data => PortAttribute::Data(match port_type {
                PortType::Out => delegate.out_data(index),
                PortType::In => delegate.in_data(index),
            }),
            PortRole::DataType => PortAttribute::DataType(delegate.data_type(port_type, index)),
            PortRole::ConnectionPolicy => PortAttribute::ConnectionPolicy(delegate.connection_policy(port_type, index)),
            PortRole::CaptionVisible => PortAttribute::CaptionVisible(delegate.port_caption_visible(port_type, index)),
            PortRole::Caption => PortAttribute::Caption(delegate.port_caption(port_type, index)),
        };
        Some(attribute)
    }

    fn set_port_data(
        &mut self,
        node_id: NodeId,
        port_type: PortType,
        index: PortIndex,
        value: PortAttribute,
        role: PortRole,
    ) -> bool {
        if value.role() != role {
            tracing::warn!(node = %node_id, ?role, ?value, "value does not match port role");
            return false;
        }
        let in_range = self
            .nodes
            .get(&node_id)
            .is_some_and(|node| node.has_port(port_type, index));
        if !in_range {
            return false;
        }
        match (port_type, value) {
            (PortType::In, PortAttribute::Data(value)) => {
                self.run_batch(vec![Work::Input { node_id, index, value }]);
                true
            }
            _ => false,
        }
    }

    fn save_node(&self, node_id: NodeId) -> Option<NodeDocument> {
        let node = self.nodes.get(&node_id)?;
        let mut internal_data = node.delegate.save();
        internal_data.insert(MODEL_NAME_KEY.to_string(), Value::String(node.delegate.name().to_string()));
        Some(NodeDocument {
            id: node_id,
            position: node.position.into(),
            internal_data,
        })
    }

    fn load_node(&mut self, document: &NodeDocument) -> Result<NodeId, LoadError> {
        let node_id = document.id;
        if !node_id.is_valid() {
            return Err(LoadError::InvalidNodeId);
        }
        if self.node_exists(node_id) {
            return Err(LoadError::DuplicateNodeId(node_id));
        }
        let type_name = document.model_name().ok_or(LoadError::MissingModelName(node_id))?;
        let mut delegate = self.registry.create(type_name).ok_or_else(|| LoadError::UnknownNodeType {
            node_id,
            type_name: type_name.to_string(),
        })?;

        let mut ctx = DelegateContext::new(node_id);
        delegate
            .load(&document.internal_data, &mut ctx)
            .map_err(|source| LoadError::DelegateState { node_id, source })?;

        self.next_node_id = self.next_node_id.max(node_id.0 + 1);
        let mut node = Node::new(delegate);
        node.position = document.position.into();
        self.nodes.insert(node_id, node);
        self.structure_changed();
        tracing::debug!(node = %node_id, type_name, "node restored");
        self.observers.emit(GraphEvent::NodeCreated(node_id));

        let batch = self.delegate_work(node_id, ctx.into_events());
        self.run_batch(batch);
        Ok(node_id)
    }

    fn ports_about_to_be_deleted(&mut self, node_id: NodeId, port_type: PortType, first: PortIndex, last: PortIndex) {
        self.start_pending(node_id, port_type, first, last, ReshapeKind::Remove);
    }

    fn ports_deleted(&mut self) {
        self.finish_pending();
    }

    fn ports_about_to_be_inserted(&mut self, node_id: NodeId, port_type: PortType, first: PortIndex, last: PortIndex) {
        self.start_pending(node_id, port_type, first, last, ReshapeKind::Insert);
    }

    fn ports_inserted(&mut self) {
        self.finish_pending();
    }

    fn subscribe(&mut self, observer: Box<dyn GraphObserver>) -> ObserverId {
        self.observers.subscribe_boxed(observer)
    }

    fn unsubscribe(&mut self, id: ObserverId) -> bool {
        self.observers.unsubscribe(id)
    }
}

impl DagGraphModel {
    fn start_pending(&mut self, node_id: NodeId, port_type: PortType, first: PortIndex, last: PortIndex, kind: ReshapeKind) {
        if let Some(stale) = self.pending_reshape.take() {
            tracing::warn!(node = %stale.node_id, "previous port reshape was never finished");
            let mut batch = Vec::new();
            self.finish_reshape(stale.node_id, stale.kind, &stale.shift, &mut batch);
            self.run_batch(batch);
        }

        let mut batch = Vec::new();
        let shift = self.begin_reshape(node_id, port_type, first, last, kind, &mut batch);
        self.run_batch(batch);
        self.pending_reshape = Some(PendingReshape { node_id, kind, shift });
    }

    fn finish_pending(&mut self) {
        let Some(pending) = self.pending_reshape.take() else {
            return;
        };
        let mut batch = Vec::new();
        self.finish_reshape(pending.node_id, pending.kind, &pending.shift, &mut batch);
        self.run_batch(batch);
    }
}
