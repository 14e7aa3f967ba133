// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node graph data model.
//!
//! This crate holds the headless half of a node editor:
//! - Nodes with indexed, typed input and output ports
//! - Connections validated against types, policies and acyclicity
//! - Value propagation from outputs to connected inputs
//! - Save and load as JSON documents
//!
//! ## Architecture
//!
//! [`DagGraphModel`] owns the topology and every node's [`NodeDelegate`].
//! Delegates never call back into the model; they record what they want on
//! a [`DelegateContext`] and the model processes it afterwards. Observers
//! learn about committed changes through [`GraphEvent`]s.

pub mod config;
pub mod connection;
pub mod dag;
pub mod delegate;
pub mod delegates;
pub mod document;
pub mod error;
pub mod events;
pub mod model;
pub mod node;
pub mod port;
pub mod propagation;
pub mod registry;
pub mod topology;

#[cfg(test)]
mod test_support;

pub use config::GraphConfig;
pub use connection::ConnectionId;
pub use dag::DagGraphModel;
pub use delegate::{DelegateContext, DelegateEvent, NodeDelegate, NodeProcessingStatus, NodeValidationState};
pub use document::{GraphDocument, NodeDocument};
pub use error::{ConfigError, ConnectionError, LoadError};
pub use events::{GraphEvent, GraphObserver, ObserverId};
pub use model::{GraphModel, PortShift};
pub use node::{NodeAttribute, NodeFlags, NodeId, NodeRole};
pub use port::{ConnectionPolicy, NodeDataType, PortAttribute, PortIndex, PortRole, PortType, PortValue, MAX_PORT_COUNT};
pub use propagation::PropagationState;
pub use registry::DelegateRegistry;
