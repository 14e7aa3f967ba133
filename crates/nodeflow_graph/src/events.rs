// SPDX-License-Identifier: MIT OR Apache-2.0
//! Structural-change notifications.
//!
//! Observers are plain synchronous callbacks. They run after the model has
//! committed the change they describe and cannot reach back into the model
//! from inside the callback.

use crate::connection::ConnectionId;
use crate::node::NodeId;
use crate::port::{PortIndex, PortType};

/// A committed change to a graph model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphEvent {
    /// A node was created
    NodeCreated(NodeId),
    /// A node was deleted (after all its connections)
    NodeDeleted(NodeId),
    /// A node needs repainting
    NodeUpdated(NodeId),
    /// A node's flags changed
    NodeFlagsUpdated(NodeId),
    /// A node moved
    NodePositionUpdated(NodeId),
    /// A connection was created
    ConnectionCreated(ConnectionId),
    /// A connection was deleted
    ConnectionDeleted(ConnectionId),
    /// Ports `first..=last` are about to be inserted
    PortsAboutToBeInserted {
        /// Node being reshaped
        node_id: NodeId,
        /// Port type being reshaped
        port_type: PortType,
        /// First new index
        first: PortIndex,
        /// Last new index
        last: PortIndex,
    },
    /// Insertion finished and shifted connections are back
    PortsInserted {
        /// Node that was reshaped
        node_id: NodeId,
    },
    /// Ports `first..=last` are about to be removed
    PortsAboutToBeDeleted {
        /// Node being reshaped
        node_id: NodeId,
        /// Port type being reshaped
        port_type: PortType,
        /// First removed index
        first: PortIndex,
        /// Last removed index
        last: PortIndex,
    },
    /// Removal finished and shifted connections are back
    PortsDeleted {
        /// Node that was reshaped
        node_id: NodeId,
    },
    /// The model wrote data into an input port
    InPortDataWasSet {
        /// Receiving node
        node_id: NodeId,
        /// Receiving input port
        index: PortIndex,
    },
    /// The whole model was cleared
    ModelReset,
}

/// Receiver of [`GraphEvent`]s
pub trait GraphObserver {
    /// Called once per committed change
    fn on_event(&mut self, event: &GraphEvent);
}

impl<F> GraphObserver for F
where
    F: FnMut(&GraphEvent),
{
    fn on_event(&mut self, event: &GraphEvent) {
        self(event);
    }
}

/// Handle returned by [`Observers::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// The observers attached to one model
#[derive(Default)]
pub struct Observers {
    next_id: u64,
    entries: Vec<(ObserverId, Box<dyn GraphObserver>)>,
}

impl Observers {
    /// Create an empty observer list
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an observer
    pub fn subscribe(&mut self, observer: impl GraphObserver + 'static) -> ObserverId {
        self.subscribe_boxed(Box::new(observer))
    }

    /// Attach an already boxed observer
    pub fn subscribe_boxed(&mut self, observer: Box<dyn GraphObserver>) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, observer));
        id
    }

    /// Detach an observer; returns `false` if it was not attached
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    /// Deliver an event to every observer, in subscription order
    pub fn emit(&mut self, event: GraphEvent) {
        tracing::trace!(?event, "graph event");
        for (_, observer) in &mut self.entries {
            observer.on_event(&event);
        }
    }

    /// Number of attached observers
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no observer is attached
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for Observers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observers").field("count", &self.entries.len()).finish()
    }
}
