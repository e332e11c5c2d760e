//! In-memory metadata sources and a map-backed entity value.
//!
//! These hold everything up front and are meant for tests, fixtures and
//! embedders whose entity model is declared in code or loaded from JSON.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use crate::error::{InvokeError, MetadataError};
use crate::traits::{AnnotationSource, MetadataProvider};
use crate::types::{EntityDescriptor, FieldRegistration};
use crate::value::{EntityObject, RawValue, ResolverArgs};

/// Metadata provider holding all entity descriptors in memory.
#[derive(Debug, Default, Clone)]
pub struct InMemoryMetadataProvider {
    /// Descriptors indexed by fully qualified class name.
    descriptors: HashMap<String, EntityDescriptor>,
    /// Classes that exist but carry no persistence mapping.
    plain_classes: HashSet<String>,
}

impl InMemoryMetadataProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a provider from pre-loaded descriptors.
    pub fn from_descriptors(descriptors: impl IntoIterator<Item = EntityDescriptor>) -> Self {
        let descriptors: HashMap<_, _> = descriptors
            .into_iter()
            .map(|d| (d.class_name.clone(), d))
            .collect();
        debug!(entity_count = descriptors.len(), "InMemoryMetadataProvider initialized");
        Self {
            descriptors,
            plain_classes: HashSet::new(),
        }
    }

    /// Adds an entity.
    #[must_use]
    pub fn with_entity(mut self, descriptor: EntityDescriptor) -> Self {
        self.descriptors
            .insert(descriptor.class_name.clone(), descriptor);
        self
    }

    /// Declares a class that exists but is not a mapped entity.
    #[must_use]
    pub fn with_plain_class(mut self, class_name: impl Into<String>) -> Self {
        self.plain_classes.insert(class_name.into());
        self
    }

    /// Returns the number of mapped entities.
    pub fn entity_count(&self) -> usize {
        self.descriptors.len()
    }
}

impl MetadataProvider for InMemoryMetadataProvider {
    fn is_entity(&self, class_name: &str) -> bool {
        self.descriptors.contains_key(class_name)
    }

    fn descriptor(&self, class_name: &str) -> Result<EntityDescriptor, MetadataError> {
        self.descriptors
            .get(class_name)
            .cloned()
            .ok_or_else(|| MetadataError::not_mapped(class_name))
    }

    fn class_exists(&self, class_name: &str) -> bool {
        self.is_entity(class_name) || self.plain_classes.contains(class_name)
    }
}

/// Annotation source holding registrations and blacklists in memory.
#[derive(Debug, Default, Clone)]
pub struct InMemoryAnnotationSource {
    registrations: HashMap<String, Vec<FieldRegistration>>,
    blacklists: HashMap<String, Vec<String>>,
}

impl InMemoryAnnotationSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field registration to `class_name`, after any existing ones.
    #[must_use]
    pub fn register(mut self, class_name: impl Into<String>, registration: FieldRegistration) -> Self {
        self.registrations
            .entry(class_name.into())
            .or_default()
            .push(registration);
        self
    }

    /// Marks property `field_name` of `class_name` as blacklisted.
    #[must_use]
    pub fn blacklist(mut self, class_name: impl Into<String>, field_name: impl Into<String>) -> Self {
        self.blacklists
            .entry(class_name.into())
            .or_default()
            .push(field_name.into());
        self
    }
}

impl AnnotationSource for InMemoryAnnotationSource {
    fn field_registrations(&self, class_name: &str) -> Vec<FieldRegistration> {
        self.registrations.get(class_name).cloned().unwrap_or_default()
    }

    fn blacklisted_fields(&self, class_name: &str) -> Vec<String> {
        self.blacklists.get(class_name).cloned().unwrap_or_default()
    }
}

/// Method implementation attached to a [`Record`].
pub type RecordMethod =
    Arc<dyn Fn(&Record, &ResolverArgs) -> Result<RawValue, InvokeError> + Send + Sync>;

/// Entity value backed by a map of accessors and methods.
#[derive(Clone)]
pub struct Record {
    class_name: String,
    accessors: IndexMap<String, RawValue>,
    methods: IndexMap<String, RecordMethod>,
}

impl Record {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            accessors: IndexMap::new(),
            methods: IndexMap::new(),
        }
    }

    /// Adds a zero-argument accessor, e.g. `getTitle`.
    #[must_use]
    pub fn with_accessor(mut self, name: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.accessors.insert(name.into(), value.into());
        self
    }

    /// Adds a method callable through [`EntityObject::invoke`].
    #[must_use]
    pub fn with_method<F>(mut self, name: impl Into<String>, method: F) -> Self
    where
        F: Fn(&Record, &ResolverArgs) -> Result<RawValue, InvokeError> + Send + Sync + 'static,
    {
        self.methods.insert(name.into(), Arc::new(method));
        self
    }

    /// Returns the value of accessor `name`, or `Null` if absent.
    pub fn get(&self, name: &str) -> RawValue {
        self.accessors.get(name).cloned().unwrap_or(RawValue::Null)
    }

    /// Wraps the record into a shared entity handle.
    pub fn into_ref(self) -> Arc<dyn EntityObject> {
        Arc::new(self)
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("class_name", &self.class_name)
            .field("accessors", &self.accessors.keys().collect::<Vec<_>>())
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl EntityObject for Record {
    fn class_name(&self) -> &str {
        &self.class_name
    }

    fn accessor(&self, name: &str) -> Option<RawValue> {
        self.accessors.get(name).cloned()
    }

    fn invoke(&self, method: &str, args: &ResolverArgs) -> Result<RawValue, InvokeError> {
        match self.methods.get(method) {
            Some(f) => f(self, args),
            None => Err(InvokeError::unknown_method(&self.class_name, method)),
        }
    }
}
