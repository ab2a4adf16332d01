//! Resource registry mapping resource types to adapter factories.
//!
//! The [`ResourceRegistry`] is the single point where deployment code wires
//! concrete adapters to [`ResourceType`] identifiers; everything above it
//! (the lifecycle hooks, the CLI) creates clients only through the
//! registry, which keeps those layers testable with mock factories.

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::error::{QrmiError, QrmiResult};
use crate::resource::QuantumResource;
use crate::resource_type::ResourceType;

/// Factory function type for resource adapters.
///
/// The argument is the configured resource name; adapters read their
/// `{name}_`-prefixed environment at construction.
type ResourceFactory = Box<dyn Fn(&str) -> QrmiResult<Box<dyn QuantumResource>> + Send + Sync>;

/// Central registry for quantum resource adapters.
pub struct ResourceRegistry {
    factories: FxHashMap<ResourceType, ResourceFactory>,
}

impl ResourceRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            factories: FxHashMap::default(),
        }
    }

    /// Register a factory for a resource type.
    ///
    /// A later registration for the same type replaces the earlier one.
    pub fn register(
        &mut self,
        resource_type: ResourceType,
        factory: impl Fn(&str) -> QrmiResult<Box<dyn QuantumResource>> + Send + Sync + 'static,
    ) {
        debug!("Registering resource factory: {}", resource_type);
        self.factories.insert(resource_type, Box::new(factory));
    }

    /// Create a client for a named resource of the given type.
    pub fn create(
        &self,
        name: &str,
        resource_type: ResourceType,
    ) -> QrmiResult<Box<dyn QuantumResource>> {
        match self.factories.get(&resource_type) {
            Some(factory) => factory(name),
            None => Err(QrmiError::UnsupportedResourceType(resource_type)),
        }
    }

    /// Check whether a type has a registered factory.
    pub fn has_type(&self, resource_type: ResourceType) -> bool {
        self.factories.contains_key(&resource_type)
    }

    /// List all registered resource types, sorted by wire name.
    pub fn supported_types(&self) -> Vec<ResourceType> {
        let mut types: Vec<_> = self.factories.keys().copied().collect();
        types.sort_by_key(|t| t.as_str());
        types
    }
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
