// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-node behaviour.
//!
//! Every node owns exactly one [`NodeDelegate`]. The delegate answers the
//! shape questions (how many ports, which data types, which connection
//! policies) and computes output values from whatever the model delivers to
//! its inputs.
//!
//! Delegates never call back into the model. Anything they want the model
//! to do (push a recomputed output downstream, repaint, reshape their ports)
//! is recorded on the [`DelegateContext`] handed to every mutating callback
//! and processed by the model once the callback has returned.

use crate::connection::ConnectionId;
use crate::node::NodeId;
use crate::port::{ConnectionPolicy, NodeDataType, PortCount, PortIndex, PortType, PortValue};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::any::Any;

/// Access to a value as [`Any`], implemented for every `'static` type.
///
/// Lets the model hand out concrete delegate types through
/// `DagGraphModel::delegate`.
pub trait AsAny: Any {
    /// Borrow as `&dyn Any`
    fn as_any(&self) -> &dyn Any;
    /// Borrow as `&mut dyn Any`
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Behaviour of one kind of node
pub trait NodeDelegate: AsAny {
    /// Registered type name; unique per delegate kind
    fn name(&self) -> &str;

    /// Caption shown in the UI
    fn caption(&self) -> String {
        self.name().to_string()
    }

    /// Whether the caption is shown
    fn caption_visible(&self) -> bool {
        true
    }

    /// Number of ports of the given type
    fn port_count(&self, port_type: PortType) -> PortCount;

    /// Declared data type of a port; only called for indices in range
    fn data_type(&self, port_type: PortType, index: PortIndex) -> NodeDataType;

    /// Connection policy of a port
    fn connection_policy(&self, port_type: PortType, _index: PortIndex) -> ConnectionPolicy {
        ConnectionPolicy::default_for(port_type)
    }

    /// Caption of a port
    fn port_caption(&self, _port_type: PortType, _index: PortIndex) -> String {
        String::new()
    }

    /// Whether a port caption is shown
    fn port_caption_visible(&self, _port_type: PortType, _index: PortIndex) -> bool {
        false
    }

    /// Current value of an output port; `None` is the empty value
    fn out_data(&self, index: PortIndex) -> Option<PortValue>;

    /// Last value delivered to an input port, if the delegate keeps it
    fn in_data(&self, _index: PortIndex) -> Option<PortValue> {
        None
    }

    /// Receive a value (or the empty value) on an input port.
    ///
    /// Call [`DelegateContext::output_updated`] for every output that changed
    /// as a consequence.
    fn set_in_data(&mut self, data: Option<PortValue>, index: PortIndex, ctx: &mut DelegateContext);

    /// Delegate-specific state stored in documents
    fn save(&self) -> Map<String, Value> {
        Map::new()
    }

    /// Restore state produced by [`NodeDelegate::save`]
    fn load(&mut self, _state: &Map<String, Value>, _ctx: &mut DelegateContext) -> Result<(), serde_json::Error> {
        Ok(())
    }

    /// Whether the node can be resized
    fn resizable(&self) -> bool {
        false
    }

    /// Whether the current configuration is usable
    fn validation_state(&self) -> NodeValidationState {
        NodeValidationState::default()
    }

    /// Processing status shown in the UI
    fn processing_status(&self) -> NodeProcessingStatus {
        NodeProcessingStatus::NoStatus
    }

    /// A connection now ends at one of this node's inputs
    fn input_connection_created(&mut self, _id: &ConnectionId, _ctx: &mut DelegateContext) {}

    /// A connection ending at one of this node's inputs was removed
    fn input_connection_deleted(&mut self, _id: &ConnectionId, _ctx: &mut DelegateContext) {}

    /// A connection now starts at one of this node's outputs
    fn output_connection_created(&mut self, _id: &ConnectionId, _ctx: &mut DelegateContext) {}

    /// A connection starting at one of this node's outputs was removed
    fn output_connection_deleted(&mut self, _id: &ConnectionId, _ctx: &mut DelegateContext) {}

    /// Insert ports `first..=last`; returns `false` if the layout is fixed.
    ///
    /// Called by the model between the two phases of a port reshape, when no
    /// connection touches the affected indices.
    fn insert_ports(&mut self, _port_type: PortType, _first: PortIndex, _last: PortIndex) -> bool {
        false
    }

    /// Remove ports `first..=last`; returns `false` if the layout is fixed
    fn remove_ports(&mut self, _port_type: PortType, _first: PortIndex, _last: PortIndex) -> bool {
        false
    }
}

/// Something a delegate asks its model to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelegateEvent {
    /// The output changed; push its value downstream
    OutputUpdated(PortIndex),
    /// The output no longer has a value; push the empty value downstream
    OutputInvalidated(PortIndex),
    /// Internal state changed; the node should be repainted
    ContentUpdated,
    /// Insert ports `first..=last` of the given type
    InsertPorts {
        /// Port type to grow
        port_type: PortType,
        /// First new index
        first: PortIndex,
        /// Last new index
        last: PortIndex,
    },
    /// Remove ports `first..=last` of the given type
    RemovePorts {
        /// Port type to shrink
        port_type: PortType,
        /// First removed index
        first: PortIndex,
        /// Last removed index
        last: PortIndex,
    },
}

/// Outbox handed to delegate callbacks
#[derive(Debug)]
pub struct DelegateContext {
    node_id: NodeId,
    events: Vec<DelegateEvent>,
}

impl DelegateContext {
    /// Create an empty outbox for `node_id`
    pub fn new(node_id: NodeId) -> Self {
        Self {
            node_id,
            events: Vec::new(),
        }
    }

    /// Node owning the delegate being called
    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    /// Announce a new value on an output port
    pub fn output_updated(&mut self, index: PortIndex) {
        self.events.push(DelegateEvent::OutputUpdated(index));
    }

    /// Announce that an output port lost its value
    pub fn output_invalidated(&mut self, index: PortIndex) {
        self.events.push(DelegateEvent::OutputInvalidated(index));
    }

    /// Ask for a repaint
    pub fn content_updated(&mut self) {
        self.events.push(DelegateEvent::ContentUpdated);
    }

    /// Ask the model to insert ports `first..=last`
    pub fn request_port_insertion(&mut self, port_type: PortType, first: PortIndex, last: PortIndex) {
        self.events.push(DelegateEvent::InsertPorts { port_type, first, last });
    }

    /// Ask the model to remove ports `first..=last`
    pub fn request_port_removal(&mut self, port_type: PortType, first: PortIndex, last: PortIndex) {
        self.events.push(DelegateEvent::RemovePorts { port_type, first, last });
    }

    /// Events recorded so far
    pub fn events(&self) -> &[DelegateEvent] {
        &self.events
    }

    pub(crate) fn into_events(self) -> Vec<DelegateEvent> {
        self.events
    }
}

/// Severity of a validation state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationLevel {
    /// All required inputs are present and correct
    #[default]
    Valid,
    /// Processing may be unreliable
    Warning,
    /// Computation cannot succeed
    Error,
}

/// Whether a node configuration is usable, with a message for the UI
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeValidationState {
    /// Severity
    pub level: ValidationLevel,
    /// Explanation shown to the user
    pub message: String,
}

impl NodeValidationState {
    /// A warning with a message
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: ValidationLevel::Warning,
            message: message.into(),
        }
    }

    /// An error with a message
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: ValidationLevel::Error,
            message: message.into(),
        }
    }

    /// Whether the state is [`ValidationLevel::Valid`]
    pub fn is_valid(&self) -> bool {
        self.level == ValidationLevel::Valid
    }
}

/// Processing status of a node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeProcessingStatus {
    /// Nothing is shown
    #[default]
    NoStatus,
    /// Outputs reflect the current inputs
    Updated,
    /// A computation is running
    Processing,
    /// Out of date, waiting to be recomputed
    Pending,
    /// No valid input data
    Empty,
    /// Last computation failed
    Failed,
    /// Only partial results are available
    Partial,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestDelegate;

    #[test]
    fn test_context_records_in_order() {
        let mut ctx = DelegateContext::new(NodeId(3));
        ctx.output_updated(0);
        ctx.content_updated();
        ctx.request_port_insertion(PortType::In, 2, 2);
        ctx.output_invalidated(1);

        assert_eq!(ctx.node_id(), NodeId(3));
        assert_eq!(
            ctx.into_events(),
            vec![
                DelegateEvent::OutputUpdated(0),
                DelegateEvent::ContentUpdated,
                DelegateEvent::InsertPorts {
                    port_type: PortType::In,
                    first: 2,
                    last: 2
                },
                DelegateEvent::OutputInvalidated(1),
            ]
        );
    }

    #[test]
    fn test_default_policies() {
        let delegate = TestDelegate::new("T").input("x").output("x");
        assert_eq!(delegate.connection_policy(PortType::In, 0), ConnectionPolicy::One);
        assert_eq!(delegate.connection_policy(PortType::Out, 0), ConnectionPolicy::Many);
        assert!(delegate.validation_state().is_valid());
        assert_eq!(delegate.caption(), "T");
    }

    #[test]
    fn test_downcast_through_as_any() {
        let boxed: Box<dyn NodeDelegate> = Box::new(TestDelegate::new("T"));
        // Deref first: the box itself is also `Any`.
        assert!((*boxed).as_any().downcast_ref::<TestDelegate>().is_some());
    }

    #[test]
    fn test_validation_constructors() {
        let warning = NodeValidationState::warning("missing input");
        assert_eq!(warning.level, ValidationLevel::Warning);
        assert!(!warning.is_valid());
        assert_eq!(NodeValidationState::error("bad").message, "bad");
    }
}
