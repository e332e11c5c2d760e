//! Field value resolution.
//!
//! A field is resolved either through a bound method (extended fields) or by
//! convention through the parent's `get<Field>` accessor. The raw result is
//! then coerced: deferred collections are materialized once and coerced per
//! element, anything else is coerced as a whole.

use std::fmt;
use std::sync::Arc;

use ormql_metadata::{EntityRef, RawValue, ResolverArgs};
use tracing::trace;

use crate::error::ResolveError;
use crate::naming::accessor_name;
use crate::types::Eval;

/// Wraps parent values before a field reads them.
///
/// Used for cross-cutting concerns such as authorization or logging. The
/// proxy replaces the receiver only; which accessor or method runs is decided
/// by the field.
#[derive(Clone)]
pub struct ValueProxy(Arc<dyn Fn(EntityRef) -> EntityRef + Send + Sync>);

impl ValueProxy {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(EntityRef) -> EntityRef + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    #[must_use]
    pub fn wrap(&self, value: EntityRef) -> EntityRef {
        (self.0)(value)
    }
}

impl fmt::Debug for ValueProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValueProxy(..)")
    }
}

#[derive(Debug, Clone)]
enum Strategy {
    /// Call the zero-argument accessor with this name.
    Accessor(String),
    /// Invoke the bound method with the field arguments.
    Method(String),
}

/// Resolution strategy of a single field.
#[derive(Debug, Clone)]
pub struct FieldResolver {
    key: String,
    strategy: Strategy,
    eval: Eval,
    proxy: Option<ValueProxy>,
}

impl FieldResolver {
    /// Resolves `key` through the parent's conventional accessor.
    pub fn by_convention(key: impl Into<String>, eval: Eval) -> Self {
        let key = key.into();
        Self {
            strategy: Strategy::Accessor(accessor_name(&key)),
            key,
            eval,
            proxy: None,
        }
    }

    /// Resolves `key` by invoking `method` on the parent.
    pub fn by_method(key: impl Into<String>, method: impl Into<String>, eval: Eval) -> Self {
        Self {
            key: key.into(),
            strategy: Strategy::Method(method.into()),
            eval,
            proxy: None,
        }
    }

    #[must_use]
    pub fn with_proxy(mut self, proxy: Option<ValueProxy>) -> Self {
        self.proxy = proxy;
        self
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Name of the bound method, for extended fields.
    #[must_use]
    pub fn method(&self) -> Option<&str> {
        match &self.strategy {
            Strategy::Method(method) => Some(method),
            Strategy::Accessor(_) => None,
        }
    }

    /// Resolves the field on `parent`.
    ///
    /// A missing conventional accessor resolves to `Null`.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::Invoke` if a bound method is missing or fails.
    pub fn resolve(&self, parent: &EntityRef, args: &ResolverArgs) -> Result<RawValue, ResolveError> {
        let receiver = match &self.proxy {
            Some(proxy) => proxy.wrap(Arc::clone(parent)),
            None => Arc::clone(parent),
        };

        let raw = match &self.strategy {
            Strategy::Method(method) => receiver.invoke(method, args)?,
            Strategy::Accessor(accessor) => receiver.accessor(accessor).unwrap_or_else(|| {
                trace!(
                    class_name = %receiver.class_name(),
                    accessor = %accessor,
                    "No accessor, resolving to null"
                );
                RawValue::Null
            }),
        };

        Ok(self.coerce(raw))
    }

    fn coerce(&self, raw: RawValue) -> RawValue {
        match raw {
            RawValue::Collection(collection) => RawValue::List(
                collection
                    .materialize()
                    .iter()
                    .cloned()
                    .map(|item| self.eval.apply(item))
                    .collect(),
            ),
            other => self.eval.apply(other),
        }
    }
}
