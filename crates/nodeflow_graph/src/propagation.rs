// SPDX-License-Identifier: MIT OR Apache-2.0
//! Data propagation.
//!
//! Values move through the graph on an explicit work stack owned by the
//! model, never by recursion through delegate callbacks. Each step calls at
//! most one delegate; whatever that delegate records on its
//! [`DelegateContext`] becomes new work pushed on top of the stack, so a
//! value travels depth-first down one branch before the next branch starts.
//!
//! An output with a push already pending is not scheduled again; the pending
//! push reads the output's value when it runs.

use crate::connection::ConnectionId;
use crate::dag::{restore_shift, DagGraphModel, ReshapeKind};
use crate::delegate::{DelegateContext, DelegateEvent, NodeDelegate};
use crate::events::GraphEvent;
use crate::model::{GraphModel, PortShift};
use crate::node::NodeId;
use crate::port::{PortIndex, PortType, PortValue};
use std::collections::HashSet;

/// Where an output port stands in the current propagation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropagationState {
    /// Nothing pending
    Idle,
    /// A push of the output's value is scheduled
    Dirty,
    /// The output's value is being pushed right now
    Propagating,
}

/// One unit of propagation work
#[derive(Debug, Clone)]
pub(crate) enum Work {
    /// Tell the input side of a new connection
    InputConnectionCreated(ConnectionId),
    /// Tell the output side of a new connection
    OutputConnectionCreated(ConnectionId),
    /// Tell the input side of a removed connection
    InputConnectionDeleted(ConnectionId),
    /// Tell the output side of a removed connection
    OutputConnectionDeleted(ConnectionId),
    /// Send an output's current value along all its connections
    Push { node_id: NodeId, index: PortIndex },
    /// Send the empty value along all connections of an output
    Invalidate { node_id: NodeId, index: PortIndex },
    /// Hand a value to the input end of a connection, if it still exists
    Deliver {
        connection: ConnectionId,
        value: Option<PortValue>,
    },
    /// Hand a value to an input port directly
    Input {
        node_id: NodeId,
        index: PortIndex,
        value: Option<PortValue>,
    },
    /// Reshape requested by a delegate: announce, plan and detach
    Reshape {
        node_id: NodeId,
        port_type: PortType,
        first: PortIndex,
        last: PortIndex,
        kind: ReshapeKind,
    },
    /// Change the layout and reattach what `Reshape` detached
    FinishReshape {
        node_id: NodeId,
        port_type: PortType,
        first: PortIndex,
        last: PortIndex,
        kind: ReshapeKind,
        shift: PortShift,
    },
    /// Emit an event once the work scheduled before it is done
    Notify(GraphEvent),
}

/// Pending work of one propagation run
#[derive(Debug, Default)]
pub(crate) struct Propagation {
    stack: Vec<Work>,
    dirty: HashSet<(NodeId, PortIndex)>,
    active: Option<(NodeId, PortIndex)>,
    steps: usize,
}

impl Propagation {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// A run starting with `batch`
    pub(crate) fn with(batch: Vec<Work>) -> Self {
        let mut propagation = Self::new();
        propagation.schedule(batch);
        propagation
    }

    /// Push a batch so that its first item runs next
    pub(crate) fn schedule(&mut self, batch: Vec<Work>) {
        for work in batch.into_iter().rev() {
            if let Work::Push { node_id, index } = work {
                if self.state(node_id, index) == PropagationState::Dirty {
                    continue;
                }
                self.dirty.insert((node_id, index));
            }
            self.stack.push(work);
        }
    }

    /// Take the next item
    pub(crate) fn next_work(&mut self) -> Option<Work> {
        let work = self.stack.pop()?;
        self.active = None;
        if let Work::Push { node_id, index } = work {
            self.dirty.remove(&(node_id, index));
            self.active = Some((node_id, index));
        }
        self.steps += 1;
        Some(work)
    }

    /// Where an output stands in this run
    pub(crate) fn state(&self, node_id: NodeId, index: PortIndex) -> PropagationState {
        if self.dirty.contains(&(node_id, index)) {
            PropagationState::Dirty
        } else if self.active == Some((node_id, index)) {
            PropagationState::Propagating
        } else {
            PropagationState::Idle
        }
    }

    pub(crate) fn pending(&self) -> usize {
        self.stack.len()
    }
}

impl DagGraphModel {
    /// Process work until none is left
    pub(crate) fn run(&mut self, mut propagation: Propagation) {
        while let Some(work) = propagation.next_work() {
            tracing::trace!(?work, pending = propagation.pending(), "propagation step");
            let batch = self.process(work);
            propagation.schedule(batch);
        }
        if propagation.steps > 0 {
            tracing::trace!(steps = propagation.steps, "propagation finished");
        }
    }

    fn process(&mut self, work: Work) -> Vec<Work> {
        match work {
            Work::InputConnectionCreated(id) => {
                self.call_delegate(id.in_node_id, |delegate, ctx| delegate.input_connection_created(&id, ctx))
            }
            Work::OutputConnectionCreated(id) => {
                self.call_delegate(id.out_node_id, |delegate, ctx| delegate.output_connection_created(&id, ctx))
            }
            Work::InputConnectionDeleted(id) => {
                self.call_delegate(id.in_node_id, |delegate, ctx| delegate.input_connection_deleted(&id, ctx))
            }
            Work::OutputConnectionDeleted(id) => {
                self.call_delegate(id.out_node_id, |delegate, ctx| delegate.output_connection_deleted(&id, ctx))
            }
            Work::Push { node_id, index } => {
                let value = self.nodes.get(&node_id).and_then(|node| node.delegate.out_data(index));
                self.fan_out(node_id, index, value)
            }
            Work::Invalidate { node_id, index } => self.fan_out(node_id, index, None),
            Work::Deliver { connection, value } => {
                if !self.connectivity.contains(&connection) {
                    tracing::trace!(%connection, "connection gone before delivery");
                    return Vec::new();
                }
                self.deliver(connection.in_node_id, connection.in_port_index, value)
            }
            Work::Input { node_id, index, value } => self.deliver(node_id, index, value),
            Work::Reshape {
                node_id,
                port_type,
                first,
                last,
                kind,
            } => {
                if !self.node_exists(node_id) {
                    return Vec::new();
                }
                let mut batch = Vec::new();
                let shift = self.begin_reshape(node_id, port_type, first, last, kind, &mut batch);
                batch.push(Work::FinishReshape {
                    node_id,
                    port_type,
                    first,
                    last,
                    kind,
                    shift,
                });
                batch
            }
            Work::FinishReshape {
                node_id,
                port_type,
                first,
                last,
                kind,
                shift,
            } => {
                let shift = if self.apply_layout(node_id, port_type, first, last, kind) {
                    shift
                } else {
                    restore_shift(&shift)
                };
                let mut batch = Vec::new();
                self.finish_reshape(node_id, kind, &shift, &mut batch);
                batch
            }
            Work::Notify(event) => {
                self.observers.emit(event);
                Vec::new()
            }
        }
    }

    /// One delivery per connection of an output, in connection order
    fn fan_out(&self, node_id: NodeId, index: PortIndex, value: Option<PortValue>) -> Vec<Work> {
        self.connections(node_id, PortType::Out, index)
            .into_iter()
            .map(|connection| Work::Deliver {
                connection,
                value: value.clone(),
            })
            .collect()
    }

    fn deliver(&mut self, node_id: NodeId, index: PortIndex, value: Option<PortValue>) -> Vec<Work> {
        let in_range = self
            .nodes
            .get(&node_id)
            .is_some_and(|node| node.has_port(PortType::In, index));
        if !in_range {
            tracing::trace!(node = %node_id, index, "input gone before delivery");
            return Vec::new();
        }

        let batch = self.call_delegate(node_id, |delegate, ctx| delegate.set_in_data(value, index, ctx));
        self.observers.emit(GraphEvent::InPortDataWasSet { node_id, index });
        batch
    }

    fn call_delegate(&mut self, node_id: NodeId, f: impl FnOnce(&mut dyn NodeDelegate, &mut DelegateContext)) -> Vec<Work> {
        let Some(node) = self.nodes.get_mut(&node_id) else {
            return Vec::new();
        };
        let mut ctx = DelegateContext::new(node_id);
        f(&mut *node.delegate, &mut ctx);
        self.delegate_work(node_id, ctx.into_events())
    }

    /// Turn what a delegate recorded into work; repaint requests are
    /// announced right away
    pub(crate) fn delegate_work(&mut self, node_id: NodeId, events: Vec<DelegateEvent>) -> Vec<Work> {
        let mut batch = Vec::with_capacity(events.len());
        for event in events {
            match event {
                DelegateEvent::OutputUpdated(index) => batch.push(Work::Push { node_id, index }),
                DelegateEvent::OutputInvalidated(index) => batch.push(Work::Invalidate { node_id, index }),
                DelegateEvent::ContentUpdated => self.observers.emit(GraphEvent::NodeUpdated(node_id)),
                DelegateEvent::InsertPorts { port_type, first, last } => batch.push(Work::Reshape {
                    node_id,
                    port_type,
                    first,
                    last,
                    kind: ReshapeKind::Insert,
                }),
                DelegateEvent::RemovePorts { port_type, first, last } => batch.push(Work::Reshape {
                    node_id,
                    port_type,
                    first,
                    last,
                    kind: ReshapeKind::Remove,
                }),
            }
        }
        batch
    }
}
