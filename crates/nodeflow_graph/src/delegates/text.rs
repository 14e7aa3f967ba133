// SPDX-License-Identifier: MIT OR Apache-2.0
//! Text nodes.

use super::text;
use crate::connection::ConnectionId;
use crate::delegate::{DelegateContext, NodeDelegate};
use crate::port::{NodeDataType, PortCount, PortIndex, PortType, PortValue, MAX_PORT_COUNT};
use serde::de::Error as _;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Emits a string set by the user
#[derive(Debug, Clone, Default)]
pub struct TextSource {
    text: String,
}

#[derive(Debug, Default, Deserialize)]
struct TextSourceState {
    #[serde(default)]
    text: String,
}

impl TextSource {
    /// Source emitting `text`
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Current text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Change the text and push it downstream
    pub fn set_text(&mut self, text: impl Into<String>, ctx: &mut DelegateContext) {
        self.text = text.into();
        ctx.output_updated(0);
        ctx.content_updated();
    }
}

impl NodeDelegate for TextSource {
    fn name(&self) -> &str {
        "TextSource"
    }

    fn caption(&self) -> String {
        "Text".to_string()
    }

    fn port_count(&self, port_type: PortType) -> PortCount {
        match port_type {
            PortType::In => 0,
            PortType::Out => 1,
        }
    }

    fn data_type(&self, _port_type: PortType, _index: PortIndex) -> NodeDataType {
        text()
    }

    fn out_data(&self, _index: PortIndex) -> Option<PortValue> {
        Some(PortValue::String(self.text.clone()))
    }

    fn set_in_data(&mut self, _data: Option<PortValue>, _index: PortIndex, _ctx: &mut DelegateContext) {}

    fn save(&self) -> Map<String, Value> {
        let mut state = Map::new();
        state.insert("text".to_string(), Value::String(self.text.clone()));
        state
    }

    fn load(&mut self, state: &Map<String, Value>, ctx: &mut DelegateContext) -> Result<(), serde_json::Error> {
        let state: TextSourceState = serde_json::from_value(Value::Object(state.clone()))?;
        self.text = state.text;
        ctx.output_updated(0);
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct TextJoinState {
    #[serde(default = "default_input_count")]
    inputs: usize,
    #[serde(default = "default_separator")]
    separator: String,
}

fn default_input_count() -> usize {
    1
}

fn default_separator() -> String {
    " ".to_string()
}

/// Joins its inputs with a separator.
///
/// Starts with one input and grows a spare one whenever the last input gets
/// connected, so there is always a free port to drop the next text on.
#[derive(Debug, Clone)]
pub struct TextJoin {
    inputs: Vec<Option<String>>,
    separator: String,
}

impl Default for TextJoin {
    fn default() -> Self {
        Self {
            inputs: vec![None; default_input_count()],
            separator: default_separator(),
        }
    }
}

impl TextJoin {
    /// Joiner using `separator`
    pub fn with_separator(separator: impl Into<String>) -> Self {
        Self {
            separator: separator.into(),
            ..Self::default()
        }
    }

    /// Change the separator and push the new result downstream
    pub fn set_separator(&mut self, separator: impl Into<String>, ctx: &mut DelegateContext) {
        self.separator = separator.into();
        self.announce(ctx);
    }

    /// Joined text of the inputs that have a value
    pub fn joined(&self) -> Option<String> {
        let parts: Vec<&str> = self.inputs.iter().flatten().map(String::as_str).collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(&self.separator))
        }
    }

    fn announce(&self, ctx: &mut DelegateContext) {
        if self.joined().is_some() {
            ctx.output_updated(0);
        } else {
            ctx.output_invalidated(0);
        }
    }
}

impl NodeDelegate for TextJoin {
    fn name(&self) -> &str {
        "TextJoin"
    }

    fn caption(&self) -> String {
        "Join".to_string()
    }

    fn port_count(&self, port_type: PortType) -> PortCount {
        match port_type {
            PortType::In => PortCount::try_from(self.inputs.len()).unwrap_or(PortCount::MAX),
            PortType::Out => 1,
        }
    }

    fn data_type(&self, _port_type: PortType, _index: PortIndex) -> NodeDataType {
        text()
    }

    fn port_caption(&self, port_type: PortType, index: PortIndex) -> String {
        match port_type {
            PortType::In => format!("Text {}", index + 1),
            PortType::Out => "Joined".to_string(),
        }
    }

    fn out_data(&self, _index: PortIndex) -> Option<PortValue> {
        self.joined().map(PortValue::String)
    }

    fn in_data(&self, index: PortIndex) -> Option<PortValue> {
        self.inputs.get(index as usize).cloned().flatten().map(PortValue::String)
    }

    fn set_in_data(&mut self, data: Option<PortValue>, index: PortIndex, ctx: &mut DelegateContext) {
        let Some(slot) = self.inputs.get_mut(index as usize) else {
            return;
        };
        *slot = data.as_ref().and_then(PortValue::as_str).map(str::to_string);
        self.announce(ctx);
    }

    fn save(&self) -> Map<String, Value> {
        let mut state = Map::new();
        state.insert("inputs".to_string(), Value::from(self.inputs.len()));
        state.insert("separator".to_string(), Value::String(self.separator.clone()));
        state
    }

    fn load(&mut self, state: &Map<String, Value>, _ctx: &mut DelegateContext) -> Result<(), serde_json::Error> {
        let state: TextJoinState = serde_json::from_value(Value::Object(state.clone()))?;
        if state.inputs > MAX_PORT_COUNT as usize {
            return Err(serde_json::Error::custom(format!(
                "{} inputs exceed the limit of {MAX_PORT_COUNT}",
                state.inputs
            )));
        }
        self.inputs = vec![None; state.inputs.max(1)];
        self.separator = state.separator;
        Ok(())
    }

    fn input_connection_created(&mut self, id: &ConnectionId, ctx: &mut DelegateContext) {
        let count = self.port_count(PortType::In);
        if id.in_port_index + 1 == count {
            ctx.request_port_insertion(PortType::In, count, count);
        }
    }

    fn insert_ports(&mut self, port_type: PortType, first: PortIndex, last: PortIndex) -> bool {
        let (first, last) = (first as usize, last as usize);
        if port_type != PortType::In || last < first || first > self.inputs.len() {
            return false;
        }
        if self.inputs.len() + (last - first + 1) > MAX_PORT_COUNT as usize {
            return false;
        }
        self.inputs.splice(first..first, std::iter::repeat(None).take(last - first + 1));
        true
    }

    fn remove_ports(&mut self, port_type: PortType, first: PortIndex, last: PortIndex) -> bool {
        let (first, last) = (first as usize, last as usize);
        let removed = last.saturating_sub(first) + 1;
        if port_type != PortType::In || last < first || last >= self.inputs.len() || removed == self.inputs.len() {
            return false;
        }
        self.inputs.drain(first..=last);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::DagGraphModel;
    use crate::delegates::create_standard_registry;
    use crate::document::GraphDocument;
    use crate::error::LoadError;
    use crate::model::GraphModel;
    use crate::node::NodeId;
    use std::rc::Rc;

    fn model() -> DagGraphModel {
        DagGraphModel::new(Rc::new(create_standard_registry()))
    }

    fn joined(model: &DagGraphModel, node_id: NodeId) -> Option<PortValue> {
        model.delegate_dyn(node_id).and_then(|delegate| delegate.out_data(0))
    }

    #[test]
    fn test_join_grows_a_spare_input() {
        let mut model = model();
        let hello = model.add_node("TextSource").unwrap();
        let world = model.add_node("TextSource").unwrap();
        let join = model.add_node("TextJoin").unwrap();
        model.update_delegate::<TextSource, _, _>(hello, |source, ctx| source.set_text("hello", ctx));
        model.update_delegate::<TextSource, _, _>(world, |source, ctx| source.set_text("world", ctx));

        assert_eq!(model.port_count(join, PortType::In), 1);
        model.add_connection(ConnectionId::new(hello, 0, join, 0)).unwrap();
        assert_eq!(model.port_count(join, PortType::In), 2);
        model.add_connection(ConnectionId::new(world, 0, join, 1)).unwrap();
        assert_eq!(model.port_count(join, PortType::In), 3);

        assert_eq!(joined(&model, join), Some(PortValue::String("hello world".into())));
    }

    #[test]
    fn test_join_layout_is_restored_before_connections() {
        let mut model = model();
        let sources: Vec<NodeId> = (0..3).map(|_| model.add_node("TextSource").unwrap()).collect();
        let join = model.add_node("TextJoin").unwrap();
        for (index, source) in sources.iter().enumerate() {
            model
                .update_delegate::<TextSource, _, _>(*source, |s, ctx| s.set_text(format!("t{index}"), ctx));
            model.add_connection(ConnectionId::new(*source, 0, join, index as PortIndex)).unwrap();
        }

        let document = model.save();
        let mut restored = self::model();
        restored.load(&document).unwrap();

        assert_eq!(restored.port_count(join, PortType::In), 4);
        assert_eq!(restored.connection_count(), 3);
        assert_eq!(joined(&restored, join), Some(PortValue::String("t0 t1 t2".into())));

        let json = document.to_json_string().unwrap();
        assert_eq!(GraphDocument::from_json_str(&json).unwrap(), document);
    }

    #[test]
    fn test_join_port_edits() {
        let mut join = TextJoin::with_separator(", ");
        assert!(join.insert_ports(PortType::In, 1, 2));
        assert_eq!(join.port_count(PortType::In), 3);
        assert!(!join.insert_ports(PortType::Out, 0, 0));
        assert!(!join.insert_ports(PortType::In, 9, 9));

        let mut ctx = DelegateContext::new(NodeId(0));
        join.set_in_data(Some(PortValue::String("a".into())), 0, &mut ctx);
        join.set_in_data(Some(PortValue::String("c".into())), 2, &mut ctx);
        assert_eq!(join.joined().as_deref(), Some("a, c"));

        assert!(join.remove_ports(PortType::In, 1, 1));
        assert!(!join.remove_ports(PortType::In, 0, 1));
        assert_eq!(join.joined().as_deref(), Some("a, c"));
    }

    #[test]
    fn test_join_refuses_oversized_layouts() {
        let mut join = TextJoin::with_separator(" ");
        assert!(!join.insert_ports(PortType::In, 0, MAX_PORT_COUNT));
        assert_eq!(join.port_count(PortType::In), 1);

        let mut model = model();
        let source = model.add_node("TextSource").unwrap();
        let join = model.add_node("TextJoin").unwrap();
        let id = ConnectionId::new(source, 0, join, 0);
        model.add_connection(id).unwrap();

        assert!(!model.insert_ports(join, PortType::In, 0, PortIndex::MAX));
        assert!(!model.insert_ports(join, PortType::In, 0, MAX_PORT_COUNT));
        assert_eq!(model.port_count(join, PortType::In), 2);
        assert!(model.connection_exists(id));
    }

    #[test]
    fn test_join_state_with_too_many_inputs_is_rejected() {
        let text = r#"{ "nodes": [
            { "id": 0, "internal-data": { "model-name": "TextJoin", "inputs": 4294967296 } }
        ] }"#;
        let mut model = model();
        let err = model.load(&GraphDocument::from_json_str(text).unwrap()).unwrap_err();
        assert!(matches!(err, LoadError::DelegateState { node_id: NodeId(0), .. }));
        assert!(model.is_empty());
    }
}
