// SPDX-License-Identifier: MIT OR Apache-2.0
//! Registry of creatable node types.

use crate::delegate::NodeDelegate;
use indexmap::IndexMap;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Category used when none is given
pub const DEFAULT_CATEGORY: &str = "Nodes";

/// Constructor producing a fresh delegate
pub type DelegateFactory = Box<dyn Fn() -> Box<dyn NodeDelegate>>;

/// Maps node type names to delegate factories, grouped by category.
///
/// The first registration of a name wins; registering the same name again
/// is ignored and reported as `false`. The registry is filled once during
/// setup and only read afterwards.
pub struct DelegateRegistry {
    /// Factories by type name, in registration order
    creators: IndexMap<String, DelegateFactory>,
    /// Category of each type name
    type_categories: IndexMap<String, String>,
    /// Known categories
    categories: BTreeSet<String>,
    /// Category for [`DelegateRegistry::register_default`]
    default_category: String,
}

impl DelegateRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::with_default_category(DEFAULT_CATEGORY)
    }

    /// Create an empty registry with a custom default category
    pub fn with_default_category(category: impl Into<String>) -> Self {
        Self {
            creators: IndexMap::new(),
            type_categories: IndexMap::new(),
            categories: BTreeSet::new(),
            default_category: category.into(),
        }
    }

    /// Register a factory under `name`; returns `false` if the name is taken
    pub fn register<F>(&mut self, name: impl Into<String>, category: impl Into<String>, factory: F) -> bool
    where
        F: Fn() -> Box<dyn NodeDelegate> + 'static,
    {
        let name = name.into();
        if self.creators.contains_key(&name) {
            tracing::debug!(%name, "node type already registered, keeping the first factory");
            return false;
        }

        let category = category.into();
        tracing::debug!(%name, %category, "registered node type");
        self.categories.insert(category.clone());
        self.type_categories.insert(name.clone(), category);
        self.creators.insert(name, Box::new(factory));
        true
    }

    /// Register a delegate type under its own name in the given category.
    ///
    /// The name is taken from a throwaway instance.
    pub fn register_type<T>(&mut self, category: impl Into<String>) -> bool
    where
        T: NodeDelegate + Default,
    {
        let name = T::default().name().to_string();
        self.register(name, category, || Box::new(T::default()))
    }

    /// Register a delegate type in the default category
    pub fn register_default<T>(&mut self) -> bool
    where
        T: NodeDelegate + Default,
    {
        let category = self.default_category.clone();
        self.register_type::<T>(category)
    }

    /// Instantiate a delegate; `None` if the name is unknown
    pub fn create(&self, name: &str) -> Option<Box<dyn NodeDelegate>> {
        self.creators.get(name).map(|factory| factory())
    }

    /// Whether `name` is registered
    pub fn contains(&self, name: &str) -> bool {
        self.creators.contains_key(name)
    }

    /// All registered type names, in registration order
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.creators.keys().map(String::as_str)
    }

    /// All categories
    pub fn categories(&self) -> &BTreeSet<String> {
        &self.categories
    }

    /// Category of a registered type
    pub fn category_of(&self, name: &str) -> Option<&str> {
        self.type_categories.get(name).map(String::as_str)
    }

    /// Type names grouped by category
    pub fn types_by_category(&self) -> BTreeMap<String, Vec<String>> {
        let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, category) in &self.type_categories {
            grouped.entry(category.clone()).or_default().push(name.clone());
        }
        grouped
    }

    /// Category used by [`DelegateRegistry::register_default`]
    pub fn default_category(&self) -> &str {
        &self.default_category
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.creators.len()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.creators.is_empty()
    }
}

impl Default for DelegateRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DelegateRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelegateRegistry")
            .field("types", &self.type_categories)
            .field("default_category", &self.default_category)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::PortType;
    use crate::test_support::TestDelegate;

    #[test]
    fn test_create_known_and_unknown() {
        let mut registry = DelegateRegistry::new();
        registry.register("Source", "Sources", || Box::new(TestDelegate::new("Source").output("x")));

        let delegate = registry.create("Source").expect("registered");
        assert_eq!(delegate.name(), "Source");
        assert_eq!(delegate.port_count(PortType::Out), 1);
        assert!(registry.create("Missing").is_none());
    }

    #[test]
    fn test_first_registration_wins() {
        let mut registry = DelegateRegistry::new();
        assert!(registry.register("Node", "A", || Box::new(TestDelegate::new("Node").input("x"))));
        assert!(!registry.register("Node", "B", || Box::new(TestDelegate::new("Node").output("x"))));

        let delegate = registry.create("Node").unwrap();
        assert_eq!(delegate.port_count(PortType::In), 1);
        assert_eq!(delegate.port_count(PortType::Out), 0);
        assert_eq!(registry.category_of("Node"), Some("A"));
        assert!(!registry.categories().contains("B"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_types_by_category() {
        let mut registry = DelegateRegistry::new();
        registry.register("a", "Sources", || Box::new(TestDelegate::new("a")));
        registry.register("b", "Sinks", || Box::new(TestDelegate::new("b")));
        registry.register("c", "Sources", || Box::new(TestDelegate::new("c")));

        let grouped = registry.types_by_category();
        assert_eq!(grouped["Sources"], vec!["a".to_string(), "c".to_string()]);
        assert_eq!(grouped["Sinks"], vec!["b".to_string()]);
        assert_eq!(
            registry.categories().iter().cloned().collect::<Vec<_>>(),
            vec!["Sinks".to_string(), "Sources".to_string()]
        );
        assert_eq!(registry.type_names().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_register_default_uses_instance_name() {
        let mut registry = DelegateRegistry::with_default_category("Misc");
        assert!(registry.register_default::<TestDelegate>());
        assert_eq!(registry.category_of("TestDelegate"), Some("Misc"));
        assert!(registry.contains("TestDelegate"));
    }
}
