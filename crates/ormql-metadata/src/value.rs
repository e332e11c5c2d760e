//! Runtime values flowing through field resolvers.
//!
//! Entity instances are opaque to the mapper; they are reached through the
//! [`EntityObject`] capability interface instead of reflection. Property and
//! method results come back as [`RawValue`]s which the scalar coercions then
//! turn into their query-layer representation.

use std::fmt;
use std::sync::{Arc, OnceLock};

use indexmap::IndexMap;
use time::{Date, PrimitiveDateTime, Time};

use crate::error::InvokeError;

/// Arguments passed to an explicit resolver, in declaration order.
pub type ResolverArgs = IndexMap<String, RawValue>;

/// Shared handle to an entity instance.
pub type EntityRef = Arc<dyn EntityObject>;

/// An entity instance as seen by field resolvers.
pub trait EntityObject: fmt::Debug + Send + Sync + 'static {
    /// Fully qualified class name of the instance.
    fn class_name(&self) -> &str;

    /// Calls the zero-argument accessor `name` (e.g. `getFirstName`).
    ///
    /// Returns `None` when the entity exposes no accessor of that exact name.
    fn accessor(&self, name: &str) -> Option<RawValue>;

    /// Invokes `method` with `args`.
    ///
    /// # Errors
    ///
    /// Returns `InvokeError::UnknownMethod` by default.
    fn invoke(&self, method: &str, args: &ResolverArgs) -> Result<RawValue, InvokeError> {
        let _ = args;
        Err(InvokeError::unknown_method(self.class_name(), method))
    }
}

/// A value read from an entity before coercion.
#[derive(Clone)]
pub enum RawValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Date(Date),
    Time(Time),
    DateTime(PrimitiveDateTime),
    /// Structured data stored in a json column.
    Json(serde_json::Value),
    List(Vec<RawValue>),
    Entity(EntityRef),
    /// A lazily-loaded to-many association.
    Collection(DeferredCollection),
}

impl RawValue {
    /// Returns `true` for [`RawValue::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_entity(&self) -> Option<&EntityRef> {
        match self {
            Self::Entity(entity) => Some(entity),
            _ => None,
        }
    }

    /// Converts the value to JSON.
    ///
    /// Deferred collections are materialized. Entities have no JSON form and
    /// map to `null`.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;

        match self {
            Self::Null | Self::Entity(_) => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Int(i) => Value::from(*i),
            Self::Float(f) => serde_json::Number::from_f64(*f).map_or(Value::Null, Value::Number),
            Self::String(s) => Value::String(s.clone()),
            Self::Date(d) => Value::String(d.to_string()),
            Self::Time(t) => Value::String(t.to_string()),
            Self::DateTime(dt) => Value::String(dt.to_string()),
            Self::Json(v) => v.clone(),
            Self::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Collection(c) => Value::Array(c.materialize().iter().map(Self::to_json).collect()),
        }
    }

    /// Converts JSON to a raw value. Objects stay [`RawValue::Json`].
    #[must_use]
    pub fn from_json(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => n.as_f64().map_or(Self::Null, Self::Float),
            },
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::List(items.into_iter().map(Self::from_json).collect()),
            obj @ Value::Object(_) => Self::Json(obj),
        }
    }
}

impl fmt::Debug for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "Null"),
            Self::Bool(b) => write!(f, "Bool({b})"),
            Self::Int(i) => write!(f, "Int({i})"),
            Self::Float(x) => write!(f, "Float({x})"),
            Self::String(s) => write!(f, "String({s:?})"),
            Self::Date(d) => write!(f, "Date({d})"),
            Self::Time(t) => write!(f, "Time({t})"),
            Self::DateTime(dt) => write!(f, "DateTime({dt})"),
            Self::Json(v) => write!(f, "Json({v})"),
            Self::List(items) => f.debug_tuple("List").field(items).finish(),
            Self::Entity(e) => write!(f, "Entity({})", e.class_name()),
            Self::Collection(c) => c.fmt(f),
        }
    }
}

impl PartialEq for RawValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Date(a), Self::Date(b)) => a == b,
            (Self::Time(a), Self::Time(b)) => a == b,
            (Self::DateTime(a), Self::DateTime(b)) => a == b,
            (Self::Json(a), Self::Json(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            // Entities compare by identity.
            (Self::Entity(a), Self::Entity(b)) => Arc::ptr_eq(a, b),
            (Self::Collection(a), Self::Collection(b)) => Arc::ptr_eq(&a.inner, &b.inner),
            _ => false,
        }
    }
}

impl From<bool> for RawValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for RawValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for RawValue {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<f64> for RawValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<PrimitiveDateTime> for RawValue {
    fn from(dt: PrimitiveDateTime) -> Self {
        Self::DateTime(dt)
    }
}

impl From<serde_json::Value> for RawValue {
    fn from(v: serde_json::Value) -> Self {
        Self::Json(v)
    }
}

impl From<EntityRef> for RawValue {
    fn from(entity: EntityRef) -> Self {
        Self::Entity(entity)
    }
}

impl From<Vec<RawValue>> for RawValue {
    fn from(items: Vec<RawValue>) -> Self {
        Self::List(items)
    }
}

impl<T: Into<RawValue>> From<Option<T>> for RawValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

type CollectionLoader = Box<dyn Fn() -> Vec<RawValue> + Send + Sync>;

struct CollectionInner {
    items: OnceLock<Vec<RawValue>>,
    loader: CollectionLoader,
}

/// A to-many association whose rows are loaded on first access.
///
/// Cloning shares the underlying rows; the loader runs at most once.
#[derive(Clone)]
pub struct DeferredCollection {
    inner: Arc<CollectionInner>,
}

impl DeferredCollection {
    /// Creates a collection that calls `loader` on first materialization.
    pub fn new<F>(loader: F) -> Self
    where
        F: Fn() -> Vec<RawValue> + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(CollectionInner {
                items: OnceLock::new(),
                loader: Box::new(loader),
            }),
        }
    }

    /// Creates an already-loaded collection.
    #[must_use]
    pub fn loaded(items: Vec<RawValue>) -> Self {
        let collection = Self::new(Vec::new);
        let _ = collection.inner.items.set(items);
        collection
    }

    /// Loads the rows if needed and returns them in order.
    #[must_use]
    pub fn materialize(&self) -> &[RawValue] {
        self.inner.items.get_or_init(|| (self.inner.loader)())
    }

    /// Returns `true` once the rows have been loaded.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.inner.items.get().is_some()
    }
}

impl fmt::Debug for DeferredCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.items.get() {
            Some(items) => f.debug_tuple("Collection").field(items).finish(),
            None => write!(f, "Collection(<not loaded>)"),
        }
    }
}
