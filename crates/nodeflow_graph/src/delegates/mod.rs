// SPDX-License-Identifier: MIT OR Apache-2.0
//! Built-in node types.
//!
//! Small decimal and text nodes, enough to build and inspect real graphs
//! without writing a delegate first.

pub mod numeric;
pub mod text;

use crate::port::NodeDataType;
use crate::registry::DelegateRegistry;

pub use numeric::{Addition, NumberDisplay, NumberSource};
pub use text::{TextJoin, TextSource};

/// Category of nodes without inputs
pub const SOURCES: &str = "Sources";
/// Category of nodes combining inputs
pub const OPERATORS: &str = "Operators";
/// Category of nodes without outputs
pub const SINKS: &str = "Sinks";

/// Data type carried by numeric ports
pub fn decimal() -> NodeDataType {
    NodeDataType::new("decimal", "Decimal")
}

/// Data type carried by text ports
pub fn text() -> NodeDataType {
    NodeDataType::new("text", "Text")
}

/// Create a registry with every built-in node type
pub fn create_standard_registry() -> DelegateRegistry {
    let mut registry = DelegateRegistry::new();
    register_standard(&mut registry);
    registry
}

/// Add every built-in node type to `registry`
pub fn register_standard(registry: &mut DelegateRegistry) {
    // ========================================================================
    // Numbers
    // ========================================================================

    registry.register_type::<NumberSource>(SOURCES);
    registry.register_type::<Addition>(OPERATORS);
    registry.register_type::<NumberDisplay>(SINKS);

    // ========================================================================
    // Text
    // ========================================================================

    registry.register_type::<TextSource>(SOURCES);
    registry.register_type::<TextJoin>(OPERATORS);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::ConnectionId;
    use crate::dag::DagGraphModel;
    use crate::document::GraphDocument;
    use crate::model::GraphModel;
    use crate::port::PortValue;
    use std::rc::Rc;

    #[test]
    fn test_standard_registry_contents() {
        let registry = create_standard_registry();
        assert_eq!(registry.len(), 5);
        let grouped = registry.types_by_category();
        assert_eq!(grouped[SOURCES], vec!["NumberSource".to_string(), "TextSource".to_string()]);
        assert_eq!(grouped[OPERATORS], vec!["Addition".to_string(), "TextJoin".to_string()]);
        assert_eq!(grouped[SINKS], vec!["NumberDisplay".to_string()]);
    }

    #[test]
    fn test_sum_survives_save_and_load() {
        let mut model = DagGraphModel::new(Rc::new(create_standard_registry()));
        let a = model.add_node("NumberSource").unwrap();
        let b = model.add_node("NumberSource").unwrap();
        let sum = model.add_node("Addition").unwrap();
        let display = model.add_node("NumberDisplay").unwrap();
        for (from, to, port) in [(a, sum, 0), (b, sum, 1), (sum, display, 0)] {
            model.add_connection(ConnectionId::new(from, 0, to, port)).unwrap();
        }
        model.update_delegate::<NumberSource, _, _>(a, |source, ctx| source.set_value(Some(2.0), ctx));
        model.update_delegate::<NumberSource, _, _>(b, |source, ctx| source.set_value(Some(3.5), ctx));
        assert_eq!(model.delegate::<NumberDisplay>(display).unwrap().value(), Some(5.5));

        let text = model.save().to_json_string().unwrap();
        let mut restored = DagGraphModel::new(Rc::new(create_standard_registry()));
        restored.load(&GraphDocument::from_json_str(&text).unwrap()).unwrap();
        assert_eq!(restored.delegate::<NumberDisplay>(display).unwrap().value(), Some(5.5));
        assert_eq!(
            restored.delegate_dyn(sum).and_then(|d| d.out_data(0)),
            Some(PortValue::Float(5.5))
        );
    }

    #[test]
    fn test_typed_access_checks_the_type() {
        let mut model = DagGraphModel::new(Rc::new(create_standard_registry()));
        let node = model.add_node("TextSource").unwrap();
        assert!(model.delegate::<NumberSource>(node).is_none());
        assert!(model
            .update_delegate::<NumberSource, _, _>(node, |source, ctx| source.set_value(Some(1.0), ctx))
            .is_none());
        assert!(model.delegate::<TextSource>(node).is_some());
    }
}
