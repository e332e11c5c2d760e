//! Schema types, field specs and field type references.
//!
//! A [`SchemaType`] is created as a shell whose field map is produced by a
//! deferred thunk. The registry stores the shell before the thunk is ever
//! forced, which is what lets entity cycles terminate: the second request for
//! a type finds the shell instead of recursing.

use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

use async_graphql::dynamic::TypeRef;
use indexmap::IndexMap;
use ormql_metadata::{EntityRef, RawValue, ResolverArgs};
use tracing::trace;

use super::scalars::ScalarType;
use crate::error::{MappingError, ResolveError};
use crate::resolvers::FieldResolver;

/// Field name → field spec, in merge order.
pub type FieldMap = IndexMap<String, FieldSpec>;

/// Deferred computation producing a type's fields.
pub type FieldsThunk = Box<dyn Fn() -> Result<FieldMap, MappingError> + Send + Sync>;

/// Where a field came from.
///
/// Sources are ordered by precedence: on a key collision the later source
/// replaces the earlier one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldSource {
    /// A persisted column.
    Scalar,
    /// An association to another entity.
    Association,
    /// A method-bound field registration.
    Extended,
}

/// Lifecycle of a schema type within a build session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeState {
    /// Registered; fields not yet computed.
    ShellRegistered,
    /// Fields computed; the type is immutable from here on.
    FieldsResolved,
}

/// Weak reference to an object type.
///
/// Types point at each other weakly; the registry owns them.
#[derive(Clone)]
pub struct ObjectRef {
    name: String,
    target: Weak<SchemaType>,
}

impl ObjectRef {
    #[must_use]
    pub fn new(target: &Arc<SchemaType>) -> Self {
        Self {
            name: target.name().to_string(),
            target: Arc::downgrade(target),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the referenced type if the session still holds it.
    #[must_use]
    pub fn upgrade(&self) -> Option<Arc<SchemaType>> {
        self.target.upgrade()
    }

    /// Returns `true` if this refers to exactly `ty`.
    #[must_use]
    pub fn points_to(&self, ty: &Arc<SchemaType>) -> bool {
        std::ptr::eq(self.target.as_ptr(), Arc::as_ptr(ty))
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectRef({})", self.name)
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        Weak::ptr_eq(&self.target, &other.target)
    }
}

/// Type of a field or argument.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    Scalar(ScalarType),
    Object(ObjectRef),
    List(Box<FieldType>),
    NonNull(Box<FieldType>),
}

impl FieldType {
    #[must_use]
    pub fn object(target: &Arc<SchemaType>) -> Self {
        Self::Object(ObjectRef::new(target))
    }

    #[must_use]
    pub fn list_of(inner: FieldType) -> Self {
        Self::List(Box::new(inner))
    }

    #[must_use]
    pub fn non_null(inner: FieldType) -> Self {
        Self::NonNull(Box::new(inner))
    }

    /// Returns the innermost object reference, if the named type is an object.
    #[must_use]
    pub fn object_ref(&self) -> Option<&ObjectRef> {
        match self {
            Self::Object(target) => Some(target),
            Self::List(inner) | Self::NonNull(inner) => inner.object_ref(),
            Self::Scalar(_) => None,
        }
    }

    /// Name of the innermost named type.
    #[must_use]
    pub fn named_type(&self) -> &str {
        match self {
            Self::Scalar(scalar) => scalar.type_name(),
            Self::Object(target) => target.name(),
            Self::List(inner) | Self::NonNull(inner) => inner.named_type(),
        }
    }

    /// Converts to an async-graphql type reference.
    #[must_use]
    pub fn to_type_ref(&self) -> TypeRef {
        match self {
            Self::Scalar(scalar) => TypeRef::named(scalar.type_name()),
            Self::Object(target) => TypeRef::named(target.name()),
            Self::List(inner) => TypeRef::List(Box::new(inner.to_type_ref())),
            Self::NonNull(inner) => TypeRef::NonNull(Box::new(inner.to_type_ref())),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(_) | Self::Object(_) => write!(f, "{}", self.named_type()),
            Self::List(inner) => write!(f, "[{inner}]"),
            Self::NonNull(inner) => write!(f, "{inner}!"),
        }
    }
}

/// A declared field argument.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldArgument {
    pub name: String,
    pub field_type: FieldType,
}

/// A field of a schema type.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub description: String,
    pub field_type: FieldType,
    /// Declared arguments; `None` for fields derived from metadata.
    pub args: Option<Vec<FieldArgument>>,
    pub resolver: FieldResolver,
    pub source: FieldSource,
}

impl FieldSpec {
    #[must_use]
    pub fn new(field_type: FieldType, resolver: FieldResolver, source: FieldSource) -> Self {
        Self {
            description: String::new(),
            field_type,
            args: None,
            resolver,
            source,
        }
    }

    #[must_use]
    pub fn with_args(mut self, args: Vec<FieldArgument>) -> Self {
        self.args = Some(args);
        self
    }

    /// Resolves the field's value on `parent`.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly bound method fails.
    pub fn resolve(&self, parent: &EntityRef, args: &ResolverArgs) -> Result<RawValue, ResolveError> {
        self.resolver.resolve(parent, args)
    }
}

/// Merges field entries by [`FieldSource`] precedence.
///
/// Entries are applied scalar first, then association, then extended; on a
/// key collision the later entry replaces the earlier one while the key keeps
/// its first position. Within one source, declaration order decides.
pub fn merge_by_precedence(mut entries: Vec<(String, FieldSpec)>) -> FieldMap {
    entries.sort_by_key(|(_, spec)| spec.source);

    let mut fields = FieldMap::with_capacity(entries.len());
    for (key, spec) in entries {
        if let Some(previous) = fields.get(&key) {
            trace!(
                field = %key,
                replaced = ?previous.source,
                by = ?spec.source,
                "Field overridden by higher-precedence source"
            );
        }
        fields.insert(key, spec);
    }
    fields
}

/// A schema object type with lazily computed fields.
pub struct SchemaType {
    name: String,
    class_name: String,
    description: String,
    fields: OnceLock<FieldMap>,
    thunk: FieldsThunk,
}

impl SchemaType {
    /// Creates a shell whose fields are computed by `thunk` on first access.
    ///
    /// The description defaults to the type name.
    pub fn new(name: impl Into<String>, class_name: impl Into<String>, thunk: FieldsThunk) -> Self {
        let name = name.into();
        Self {
            description: name.clone(),
            name,
            class_name: class_name.into(),
            fields: OnceLock::new(),
            thunk,
        }
    }

    /// Creates a type whose fields are already known.
    #[must_use]
    pub fn resolved(name: impl Into<String>, class_name: impl Into<String>, fields: FieldMap) -> Self {
        let ty = Self::new(name, class_name, Box::new(|| Ok(FieldMap::new())));
        let _ = ty.fields.set(fields);
        ty
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fully qualified class name the type was built from.
    #[must_use]
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the fields, forcing the thunk on first call.
    ///
    /// A failed evaluation caches nothing; the next call runs the thunk again.
    ///
    /// # Errors
    ///
    /// Returns the thunk's error.
    pub fn fields(&self) -> Result<&FieldMap, MappingError> {
        if let Some(fields) = self.fields.get() {
            return Ok(fields);
        }
        trace!(type_name = %self.name, "Forcing field thunk");
        let fields = (self.thunk)()?;
        Ok(self.fields.get_or_init(|| fields))
    }

    /// Looks up a single field, forcing the thunk if needed.
    ///
    /// # Errors
    ///
    /// Returns the thunk's error.
    pub fn field(&self, name: &str) -> Result<Option<&FieldSpec>, MappingError> {
        Ok(self.fields()?.get(name))
    }

    #[must_use]
    pub fn state(&self) -> TypeState {
        if self.fields.get().is_some() {
            TypeState::FieldsResolved
        } else {
            TypeState::ShellRegistered
        }
    }
}

impl fmt::Debug for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaType")
            .field("name", &self.name)
            .field("class_name", &self.class_name)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::types::scalars::Eval;

    fn spec(source: FieldSource, scalar: ScalarType) -> FieldSpec {
        FieldSpec::new(
            FieldType::Scalar(scalar),
            FieldResolver::by_convention("x", Eval::identity()),
            source,
        )
    }

    #[test]
    fn test_thunk_forced_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let ty = SchemaType::new(
            "Post",
            "blog::Post",
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(FieldMap::new())
            }),
        );

        assert_eq!(ty.state(), TypeState::ShellRegistered);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        ty.fields().unwrap();
        ty.fields().unwrap();
        assert_eq!(ty.state(), TypeState::FieldsResolved);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(ty.description(), "Post");
    }

    #[test]
    fn test_failed_thunk_is_not_cached() {
        let ty = SchemaType::new(
            "Post",
            "blog::Post",
            Box::new(|| Err(MappingError::invalid_entity("blog::Post"))),
        );
        assert!(ty.fields().is_err());
        assert_eq!(ty.state(), TypeState::ShellRegistered);
    }

    #[test]
    fn test_merge_precedence() {
        let merged = merge_by_precedence(vec![
            ("status".into(), spec(FieldSource::Extended, ScalarType::Boolean)),
            ("status".into(), spec(FieldSource::Scalar, ScalarType::Int)),
            ("title".into(), spec(FieldSource::Scalar, ScalarType::String)),
            ("status".into(), spec(FieldSource::Association, ScalarType::Float)),
        ]);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged["status"].source, FieldSource::Extended);
        assert_eq!(
            merged["status"].field_type,
            FieldType::Scalar(ScalarType::Boolean)
        );
        assert_eq!(merged.keys().collect::<Vec<_>>(), vec!["status", "title"]);
    }

    #[test]
    fn test_field_type_display_and_type_ref() {
        let ty = Arc::new(SchemaType::resolved("Post", "blog::Post", FieldMap::new()));
        let list = FieldType::list_of(FieldType::object(&ty));
        assert_eq!(list.to_string(), "[Post]");
        assert_eq!(list.named_type(), "Post");
        assert!(list.object_ref().unwrap().points_to(&ty));

        let arg = FieldType::non_null(FieldType::Scalar(ScalarType::Int));
        assert_eq!(arg.to_string(), "Int!");
        assert_eq!(arg.to_type_ref().to_string(), "Int!");
    }
}
