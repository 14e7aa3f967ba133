// SPDX-License-Identifier: MIT OR Apache-2.0
//! Decimal nodes.

use super::decimal;
use crate::delegate::{DelegateContext, NodeDelegate, NodeProcessingStatus, NodeValidationState};
use crate::port::{NodeDataType, PortCount, PortIndex, PortType, PortValue};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Saved state of a [`NumberSource`]
#[derive(Debug, Default, Deserialize)]
struct NumberState {
    #[serde(default)]
    value: Option<f64>,
}

/// Emits a number set by the user
#[derive(Debug, Clone, Default)]
pub struct NumberSource {
    value: Option<f64>,
}

impl NumberSource {
    /// Source emitting `value`
    pub fn new(value: f64) -> Self {
        Self { value: Some(value) }
    }

    /// Current value
    pub fn value(&self) -> Option<f64> {
        self.value
    }

    /// Change the value and push it downstream
    pub fn set_value(&mut self, value: Option<f64>, ctx: &mut DelegateContext) {
        self.value = value;
        announce(value.is_some(), ctx);
        ctx.content_updated();
    }
}

impl NodeDelegate for NumberSource {
    fn name(&self) -> &str {
        "NumberSource"
    }

    fn caption(&self) -> String {
        "Number".to_string()
    }

    fn port_count(&self, port_type: PortType) -> PortCount {
        match port_type {
            PortType::In => 0,
            PortType::Out => 1,
        }
    }

    fn data_type(&self, _port_type: PortType, _index: PortIndex) -> NodeDataType {
        decimal()
    }

    fn out_data(&self, _index: PortIndex) -> Option<PortValue> {
        self.value.map(PortValue::Float)
    }

    fn set_in_data(&mut self, _data: Option<PortValue>, _index: PortIndex, _ctx: &mut DelegateContext) {}

    fn save(&self) -> Map<String, Value> {
        let mut state = Map::new();
        if let Some(value) = self.value {
            state.insert("value".to_string(), Value::from(value));
        }
        state
    }

    fn load(&mut self, state: &Map<String, Value>, ctx: &mut DelegateContext) -> Result<(), serde_json::Error> {
        let state: NumberState = serde_json::from_value(Value::Object(state.clone()))?;
        self.value = state.value;
        announce(self.value.is_some(), ctx);
        Ok(())
    }

    fn resizable(&self) -> bool {
        true
    }
}

/// Adds its two inputs
#[derive(Debug, Clone, Default)]
pub struct Addition {
    inputs: [Option<f64>; 2],
}

impl Addition {
    /// Sum of both inputs, if both are present
    pub fn result(&self) -> Option<f64> {
        match self.inputs {
            [Some(a), Some(b)] => Some(a + b),
            _ => None,
        }
    }
}

impl NodeDelegate for Addition {
    fn name(&self) -> &str {
        "Addition"
    }

    fn port_count(&self, port_type: PortType) -> PortCount {
        match port_type {
            PortType::In => 2,
            PortType::Out => 1,
        }
    }

    fn data_type(&self, _port_type: PortType, _index: PortIndex) -> NodeDataType {
        decimal()
    }

    fn port_caption(&self, port_type: PortType, index: PortIndex) -> String {
        match (port_type, index) {
            (PortType::In, 0) => "A".to_string(),
            (PortType::In, _) => "B".to_string(),
            (PortType::Out, _) => "Sum".to_string(),
        }
    }

    fn port_caption_visible(&self, _port_type: PortType, _index: PortIndex) -> bool {
        true
    }

    fn out_data(&self, _index: PortIndex) -> Option<PortValue> {
        self.result().map(PortValue::Float)
    }

    fn in_data(&self, index: PortIndex) -> Option<PortValue> {
        self.inputs.get(index as usize).copied().flatten().map(PortValue::Float)
    }

    fn set_in_data(&mut self, data: Option<PortValue>, index: PortIndex, ctx: &mut DelegateContext) {
        let Some(slot) = self.inputs.get_mut(index as usize) else {
            return;
        };
        *slot = data.as_ref().and_then(PortValue::as_f64);
        announce(self.result().is_some(), ctx);
    }

    fn validation_state(&self) -> NodeValidationState {
        if self.result().is_some() {
            NodeValidationState::default()
        } else {
            NodeValidationState::warning("Missing or incorrect inputs")
        }
    }

    fn processing_status(&self) -> NodeProcessingStatus {
        if self.result().is_some() {
            NodeProcessingStatus::Updated
        } else {
            NodeProcessingStatus::Empty
        }
    }
}

/// Shows the last number it received
#[derive(Debug, Clone, Default)]
pub struct NumberDisplay {
    value: Option<f64>,
}

impl NumberDisplay {
    /// Last received value
    pub fn value(&self) -> Option<f64> {
        self.value
    }
}

impl NodeDelegate for NumberDisplay {
    fn name(&self) -> &str {
        "NumberDisplay"
    }

    fn caption(&self) -> String {
        "Result".to_string()
    }

    fn port_count(&self, port_type: PortType) -> PortCount {
        match port_type {
            PortType::In => 1,
            PortType::Out => 0,
        }
    }

    fn data_type(&self, _port_type: PortType, _index: PortIndex) -> NodeDataType {
        decimal()
    }

    fn out_data(&self, _index: PortIndex) -> Option<PortValue> {
        None
    }

    fn in_data(&self, _index: PortIndex) -> Option<PortValue> {
        self.value.map(PortValue::Float)
    }

    fn set_in_data(&mut self, data: Option<PortValue>, _index: PortIndex, ctx: &mut DelegateContext) {
        self.value = data.as_ref().and_then(PortValue::as_f64);
        ctx.content_updated();
    }
}

/// Push a fresh value, or the empty value
fn announce(has_value: bool, ctx: &mut DelegateContext) {
    if has_value {
        ctx.output_updated(0);
    } else {
        ctx.output_invalidated(0);
    }
}
