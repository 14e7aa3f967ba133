// SPDX-License-Identifier: MIT OR Apache-2.0
//! Delegates and helpers shared by the unit tests.

use crate::connection::ConnectionId;
use crate::dag::DagGraphModel;
use crate::delegate::{DelegateContext, NodeDelegate};
use crate::document::MODEL_NAME_KEY;
use crate::events::GraphEvent;
use crate::model::GraphModel;
use crate::node::NodeId;
use crate::port::{ConnectionPolicy, NodeDataType, PortCount, PortIndex, PortType, PortValue};
use crate::registry::DelegateRegistry;
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug, Clone)]
struct TestPort {
    data_type: NodeDataType,
    policy: Option<ConnectionPolicy>,
}

/// Configurable delegate used by the tests
#[derive(Debug, Clone)]
pub(crate) struct TestDelegate {
    name: String,
    inputs: Vec<TestPort>,
    outputs: Vec<TestPort>,
    in_values: Vec<Option<PortValue>>,
    out_values: Vec<Option<PortValue>>,
    /// Copy every input value to every output
    forwarding: bool,
    /// Accept port insertion and removal
    elastic: bool,
    /// Ask for a spare input whenever the last one gets connected
    growing: bool,
    payload: Map<String, Value>,
    hooks: Vec<String>,
}

impl Default for TestDelegate {
    fn default() -> Self {
        Self::new("TestDelegate")
    }
}

impl TestDelegate {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            in_values: Vec::new(),
            out_values: Vec::new(),
            forwarding: false,
            elastic: false,
            growing: false,
            payload: Map::new(),
            hooks: Vec::new(),
        }
    }

    pub(crate) fn input(self, type_id: &str) -> Self {
        self.port(PortType::In, type_id, None)
    }

    pub(crate) fn output(self, type_id: &str) -> Self {
        self.port(PortType::Out, type_id, None)
    }

    pub(crate) fn input_policy(self, type_id: &str, policy: ConnectionPolicy) -> Self {
        self.port(PortType::In, type_id, Some(policy))
    }

    pub(crate) fn output_policy(self, type_id: &str, policy: ConnectionPolicy) -> Self {
        self.port(PortType::Out, type_id, Some(policy))
    }

    fn port(mut self, port_type: PortType, type_id: &str, policy: Option<ConnectionPolicy>) -> Self {
        let port = TestPort {
            data_type: NodeDataType::from_id(type_id),
            policy,
        };
        match port_type {
            PortType::In => {
                self.inputs.push(port);
                self.in_values.push(None);
            }
            PortType::Out => {
                self.outputs.push(port);
                self.out_values.push(None);
            }
        }
        self
    }

    pub(crate) fn forwarding(mut self) -> Self {
        self.forwarding = true;
        self
    }

    pub(crate) fn elastic(mut self) -> Self {
        self.elastic = true;
        self
    }

    pub(crate) fn growing(mut self) -> Self {
        self.elastic = true;
        self.growing = true;
        self
    }

    /// Set an output value and announce it
    pub(crate) fn set_output(&mut self, index: PortIndex, value: Option<PortValue>, ctx: &mut DelegateContext) {
        let Some(slot) = self.out_values.get_mut(index as usize) else {
            return;
        };
        let announce_value = value.is_some();
        *slot = value;
        if announce_value {
            ctx.output_updated(index);
        } else {
            ctx.output_invalidated(index);
        }
    }

    pub(crate) fn set_payload(&mut self, key: &str, value: Value) {
        self.payload.insert(key.to_string(), value);
    }

    pub(crate) fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    /// Connection hooks seen so far, as `"in+"`, `"in-"`, `"out+"`, `"out-"`
    pub(crate) fn hooks(&self) -> &[String] {
        &self.hooks
    }

    fn ports_mut(&mut self, port_type: PortType) -> (&mut Vec<TestPort>, &mut Vec<Option<PortValue>>) {
        match port_type {
            PortType::In => (&mut self.inputs, &mut self.in_values),
            PortType::Out => (&mut self.outputs, &mut self.out_values),
        }
    }
}

impl NodeDelegate for TestDelegate {
    fn name(&self) -> &str {
        &self.name
    }

    fn port_count(&self, port_type: PortType) -> PortCount {
        let count = match port_type {
            PortType::In => self.inputs.len(),
            PortType::Out => self.outputs.len(),
        };
        count as PortCount
    }

    fn data_type(&self, port_type: PortType, index: PortIndex) -> NodeDataType {
        let ports = match port_type {
            PortType::In => &self.inputs,
            PortType::Out => &self.outputs,
        };
        ports
            .get(index as usize)
            .map(|port| port.data_type.clone())
            .unwrap_or_else(|| NodeDataType::from_id("none"))
    }

    fn connection_policy(&self, port_type: PortType, index: PortIndex) -> ConnectionPolicy {
        let ports = match port_type {
            PortType::In => &self.inputs,
            PortType::Out => &self.outputs,
        };
        ports
            .get(index as usize)
            .and_then(|port| port.policy)
            .unwrap_or_else(|| ConnectionPolicy::default_for(port_type))
    }

    fn out_data(&self, index: PortIndex) -> Option<PortValue> {
        self.out_values.get(index as usize).cloned().flatten()
    }

    fn in_data(&self, index: PortIndex) -> Option<PortValue> {
        self.in_values.get(index as usize).cloned().flatten()
    }

    fn set_in_data(&mut self, data: Option<PortValue>, index: PortIndex, ctx: &mut DelegateContext) {
        if let Some(slot) = self.in_values.get_mut(index as usize) {
            *slot = data.clone();
        }
        if self.forwarding {
            for output in 0..self.out_values.len() {
                self.set_output(output as PortIndex, data.clone(), ctx);
            }
        }
    }

    fn save(&self) -> Map<String, Value> {
        self.payload.clone()
    }

    fn load(&mut self, state: &Map<String, Value>, _ctx: &mut DelegateContext) -> Result<(), serde_json::Error> {
        if let Some(bad) = state.get("fail") {
            serde_json::from_value::<u32>(bad.clone())?;
        }
        self.payload = state.clone();
        self.payload.remove(MODEL_NAME_KEY);
        Ok(())
    }

    fn input_connection_created(&mut self, id: &ConnectionId, ctx: &mut DelegateContext) {
        self.hooks.push("in+".to_string());
        let count = self.port_count(PortType::In);
        if self.growing && id.in_port_index + 1 == count {
            ctx.request_port_insertion(PortType::In, count, count);
        }
    }

    fn input_connection_deleted(&mut self, _id: &ConnectionId, _ctx: &mut DelegateContext) {
        self.hooks.push("in-".to_string());
    }

    fn output_connection_created(&mut self, _id: &ConnectionId, _ctx: &mut DelegateContext) {
        self.hooks.push("out+".to_string());
    }

    fn output_connection_deleted(&mut self, _id: &ConnectionId, _ctx: &mut DelegateContext) {
        self.hooks.push("out-".to_string());
    }

    fn insert_ports(&mut self, port_type: PortType, first: PortIndex, last: PortIndex) -> bool {
        if !self.elastic || last < first {
            return false;
        }
        let (ports, values) = self.ports_mut(port_type);
        let first = first as usize;
        if first > ports.len() {
            return false;
        }
        let template = ports
            .get(first)
            .or_else(|| ports.last())
            .cloned()
            .unwrap_or(TestPort {
                data_type: NodeDataType::from_id("x"),
                policy: None,
            });
        for index in first..=last as usize {
            ports.insert(index, template.clone());
            values.insert(index, None);
        }
        true
    }

    fn remove_ports(&mut self, port_type: PortType, first: PortIndex, last: PortIndex) -> bool {
        if !self.elastic || last < first || last >= self.port_count(port_type) {
            return false;
        }
        let (ports, values) = self.ports_mut(port_type);
        ports.drain(first as usize..=last as usize);
        values.drain(first as usize..=last as usize);
        true
    }
}

/// Registry with the test node types:
///
/// - `Source`: one `x` output
/// - `Relay`: `x` in, `x` out, forwarding
/// - `Sink`: one `x` input
/// - `Pair`: two `x` inputs, two `x` outputs, forwarding
/// - `Text`: one `text` input, one `text` output
/// - `Shared`: one `x` input accepting many connections, one `x` output
///   accepting a single connection
/// - `Elastic`: three `x` inputs, one `x` output, reshapable, forwarding
/// - `Growing`: one `x` input that grows a spare when connected, one `x` output
pub(crate) fn test_registry() -> Rc<DelegateRegistry> {
    let mut registry = DelegateRegistry::new();
    registry.register("Source", "Test", || Box::new(TestDelegate::new("Source").output("x")));
    registry.register("Relay", "Test", || {
        Box::new(TestDelegate::new("Relay").input("x").output("x").forwarding())
    });
    registry.register("Sink", "Test", || Box::new(TestDelegate::new("Sink").input("x")));
    registry.register("Pair", "Test", || {
        Box::new(
            TestDelegate::new("Pair")
                .input("x")
                .input("x")
                .output("x")
                .output("x")
                .forwarding(),
        )
    });
    registry.register("Text", "Test", || Box::new(TestDelegate::new("Text").input("text").output("text")));
    registry.register("Shared", "Test", || {
        Box::new(
            TestDelegate::new("Shared")
                .input_policy("x", ConnectionPolicy::Many)
                .output_policy("x", ConnectionPolicy::One),
        )
    });
    registry.register("Elastic", "Test", || {
        Box::new(
            TestDelegate::new("Elastic")
                .input("x")
                .input("x")
                .input("x")
                .output("x")
                .elastic()
                .forwarding(),
        )
    });
    registry.register("Growing", "Test", || {
        Box::new(TestDelegate::new("Growing").input("x").output("x").growing())
    });
    Rc::new(registry)
}

/// Empty model over [`test_registry`]
pub(crate) fn test_model() -> DagGraphModel {
    DagGraphModel::new(test_registry())
}

/// Add a connection that must be accepted
pub(crate) fn connect(model: &mut DagGraphModel, out: NodeId, out_port: PortIndex, input: NodeId, in_port: PortIndex) -> ConnectionId {
    let id = ConnectionId::new(out, out_port, input, in_port);
    model
        .add_connection(id)
        .unwrap_or_else(|err| panic!("connection {id} rejected: {err}"));
    id
}

/// Structural guarantees every committed state must satisfy
pub(crate) fn assert_invariants(model: &DagGraphModel) {
    let mut per_port: HashMap<(NodeId, PortType, PortIndex), usize> = HashMap::new();
    for id in model.all_connections() {
        assert!(!id.is_self_loop(), "self-loop {id}");
        for port_type in PortType::ALL {
            let node_id = id.node_id(port_type);
            let index = id.port_index(port_type);
            assert!(model.node_exists(node_id), "{id} references missing node {node_id}");
            assert!(
                index < model.port_count(node_id, port_type),
                "{id} references missing {port_type} port {index}"
            );
            *per_port.entry((node_id, port_type, index)).or_default() += 1;
        }
    }
    for ((node_id, port_type, index), count) in per_port {
        let policy = model.delegate_dyn(node_id).map(|d| d.connection_policy(port_type, index));
        if policy == Some(ConnectionPolicy::One) {
            assert!(count <= 1, "{port_type} port {index} of {node_id} has {count} connections");
        }
        assert_eq!(model.connections(node_id, port_type, index).len(), count);
    }
    assert!(!model.is_cyclic(), "graph is cyclic");
}

/// Collects every event a model emits
#[derive(Debug, Clone, Default)]
pub(crate) struct EventRecorder {
    events: Rc<RefCell<Vec<GraphEvent>>>,
}

impl EventRecorder {
    pub(crate) fn attach(model: &mut impl GraphModel) -> Self {
        let recorder = Self::default();
        let events = Rc::clone(&recorder.events);
        model.subscribe(Box::new(move |event: &GraphEvent| events.borrow_mut().push(*event)));
        recorder
    }

    pub(crate) fn events(&self) -> Vec<GraphEvent> {
        self.events.borrow().clone()
    }

    /// Node and connection creations and deletions only
    pub(crate) fn structural(&self) -> Vec<GraphEvent> {
        self.events
            .borrow()
            .iter()
            .filter(|event| {
                matches!(
                    event,
                    GraphEvent::NodeCreated(_)
                        | GraphEvent::NodeDeleted(_)
                        | GraphEvent::ConnectionCreated(_)
                        | GraphEvent::ConnectionDeleted(_)
                )
            })
            .copied()
            .collect()
    }

    pub(crate) fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}
