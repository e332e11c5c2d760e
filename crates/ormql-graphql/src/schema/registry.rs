//! Type registry for generated schema types.
//!
//! The registry is a get-or-create cache from type name to [`SchemaType`].
//! At most one type is ever created per name within a build session, and
//! entries are never evicted until the session is reset with [`clear`].
//!
//! The registry is not a synchronization point between concurrent builders:
//! sessions sharing one registry need external mutual exclusion.
//!
//! [`clear`]: TypeRegistry::clear

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::error::MappingError;
use crate::types::SchemaType;

/// Looks a type up in an external store.
pub type LookupFn = Arc<dyn Fn(&str) -> Option<Arc<SchemaType>> + Send + Sync>;

/// Stores a type in an external store.
///
/// The store must keep the type alive for the rest of the session.
pub type RegisterFn = Arc<dyn Fn(&str, Arc<SchemaType>) + Send + Sync>;

enum Backend {
    InMemory(RwLock<IndexMap<String, Arc<SchemaType>>>),
    External {
        lookup: Option<LookupFn>,
        register: Option<RegisterFn>,
    },
}

/// Name → schema type cache with lazy-shell semantics.
pub struct TypeRegistry {
    backend: Backend,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    /// Creates an empty in-memory registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            backend: Backend::InMemory(RwLock::new(IndexMap::new())),
        }
    }

    /// Creates a registry backed by an external lookup/register pair.
    ///
    /// Either half may be missing; operations that need it then fail with
    /// `MappingError::MissingRegistry`.
    #[must_use]
    pub fn external(lookup: Option<LookupFn>, register: Option<RegisterFn>) -> Self {
        Self {
            backend: Backend::External { lookup, register },
        }
    }

    /// Returns the type registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns `MappingError::MissingRegistry` if an external registry has no lookup.
    pub fn get(&self, name: &str) -> Result<Option<Arc<SchemaType>>, MappingError> {
        match &self.backend {
            Backend::InMemory(types) => Ok(types.read().get(name).cloned()),
            Backend::External { lookup, .. } => {
                let lookup = lookup
                    .as_ref()
                    .ok_or(MappingError::MissingRegistry { missing: "lookup" })?;
                Ok(lookup(name))
            }
        }
    }

    /// Pre-seeds a type under its own name.
    ///
    /// An existing entry with the same name is kept; the registry never holds
    /// two types for one name.
    ///
    /// # Errors
    ///
    /// Returns `MappingError::MissingRegistry` if an external registry has no register.
    pub fn insert(&self, ty: Arc<SchemaType>) -> Result<Arc<SchemaType>, MappingError> {
        match &self.backend {
            Backend::InMemory(types) => {
                let mut types = types.write();
                Ok(Arc::clone(
                    types.entry(ty.name().to_string()).or_insert(ty),
                ))
            }
            Backend::External { register, .. } => {
                let register = register
                    .as_ref()
                    .ok_or(MappingError::MissingRegistry { missing: "register" })?;
                register(ty.name(), Arc::clone(&ty));
                Ok(ty)
            }
        }
    }

    /// Returns the type registered under `name`, creating it with `generator`
    /// on a miss.
    ///
    /// The generator must return a shell whose fields are not yet computed;
    /// the shell is stored before any caller forces its fields. A failing
    /// generator leaves the registry unchanged.
    ///
    /// # Errors
    ///
    /// Returns the generator's error, or `MappingError::MissingRegistry` if
    /// an external registry lacks either half.
    pub fn get_or_create<F>(&self, name: &str, generator: F) -> Result<Arc<SchemaType>, MappingError>
    where
        F: FnOnce(&str) -> Result<Arc<SchemaType>, MappingError>,
    {
        if let Backend::External { lookup, register } = &self.backend {
            if lookup.is_none() {
                return Err(MappingError::MissingRegistry { missing: "lookup" });
            }
            if register.is_none() {
                return Err(MappingError::MissingRegistry { missing: "register" });
            }
        }

        if let Some(existing) = self.get(name)? {
            trace!(type_name = %name, "Type registry hit");
            return Ok(existing);
        }

        let ty = generator(name)?;
        debug!(type_name = %name, class_name = %ty.class_name(), "Registered schema type shell");
        self.insert(ty)
    }

    /// Names of all registered types, in registration order.
    ///
    /// External registries cannot be enumerated and return an empty list.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        match &self.backend {
            Backend::InMemory(types) => types.read().keys().cloned().collect(),
            Backend::External { .. } => Vec::new(),
        }
    }

    /// Number of registered types (0 for external registries).
    #[must_use]
    pub fn len(&self) -> usize {
        match &self.backend {
            Backend::InMemory(types) => types.read().len(),
            Backend::External { .. } => 0,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every registered type, starting a new build session.
    ///
    /// External registries own their storage and are left untouched.
    pub fn clear(&self) {
        if let Backend::InMemory(types) = &self.backend {
            let mut types = types.write();
            debug!(count = types.len(), "Clearing type registry");
            types.clear();
        }
    }
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.backend {
            Backend::InMemory(_) => f
                .debug_struct("TypeRegistry")
                .field("types", &self.names())
                .finish(),
            Backend::External { lookup, register } => f
                .debug_struct("TypeRegistry")
                .field("lookup", &lookup.is_some())
                .field("register", &register.is_some())
                .finish(),
        }
    }
}
