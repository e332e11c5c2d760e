//! Storage type → GraphQL scalar mapping.
//!
//! Each storage type key maps to a target type and an `eval` coercion that
//! turns the raw stored value into what the scalar expects. Coercions are
//! defined per element; list handling lives in the field resolver.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_graphql::dynamic::TypeRef;
use ormql_metadata::RawValue;
use time::format_description::OwnedFormatItem;
use time::macros::{date, format_description};
use time::PrimitiveDateTime;
use tracing::warn;

use super::object::FieldType;

/// GraphQL built-in scalars used by the mapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    Int,
    Float,
    String,
    Boolean,
}

impl ScalarType {
    /// GraphQL name of the scalar.
    #[must_use]
    pub fn type_name(self) -> &'static str {
        match self {
            Self::Int => TypeRef::INT,
            Self::Float => TypeRef::FLOAT,
            Self::String => TypeRef::STRING,
            Self::Boolean => TypeRef::BOOLEAN,
        }
    }
}

/// A coercion from a raw stored value to its scalar representation.
#[derive(Clone)]
pub struct Eval(Arc<dyn Fn(RawValue) -> RawValue + Send + Sync>);

impl Eval {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(RawValue) -> RawValue + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Returns the value unchanged.
    #[must_use]
    pub fn identity() -> Self {
        Self::new(|value| value)
    }

    #[must_use]
    pub fn apply(&self, value: RawValue) -> RawValue {
        (self.0)(value)
    }
}

impl fmt::Debug for Eval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Eval(..)")
    }
}

/// Target type and coercion for one storage type key.
#[derive(Debug, Clone)]
pub struct ScalarMapping {
    pub field_type: FieldType,
    pub eval: Eval,
}

impl ScalarMapping {
    /// Creates a mapping with the identity coercion.
    #[must_use]
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            eval: Eval::identity(),
        }
    }

    #[must_use]
    pub fn with_eval(mut self, eval: Eval) -> Self {
        self.eval = eval;
        self
    }
}

/// Output format of the date coercions.
#[derive(Debug, Clone, Default)]
pub enum DateFormat {
    /// `YYYY-MM-DD HH:MM:SS`
    #[default]
    Standard,
    /// A `time` format description.
    Custom(Arc<OwnedFormatItem>),
}

impl DateFormat {
    /// Parses a `time` format description such as `[day]/[month]/[year]`.
    ///
    /// # Errors
    ///
    /// Returns an error if the description is malformed.
    pub fn parse(description: &str) -> Result<Self, time::error::InvalidFormatDescription> {
        let items = time::format_description::parse_owned::<2>(description)?;
        Ok(Self::Custom(Arc::new(items)))
    }

    /// Formats a date-time.
    ///
    /// # Errors
    ///
    /// Returns an error if the format asks for a component the value lacks.
    pub fn format(&self, value: PrimitiveDateTime) -> Result<String, time::error::Format> {
        match self {
            Self::Standard => {
                value.format(format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"))
            }
            Self::Custom(items) => value.format(items.as_ref()),
        }
    }
}

/// Static table from storage type keys to scalar mappings.
#[derive(Debug, Clone)]
pub struct ScalarCoercionTable {
    mappings: HashMap<String, ScalarMapping>,
}

impl Default for ScalarCoercionTable {
    fn default() -> Self {
        Self::standard(DateFormat::Standard)
    }
}

impl ScalarCoercionTable {
    /// Builds the standard table, formatting dates with `date_format`.
    #[must_use]
    pub fn standard(date_format: DateFormat) -> Self {
        let int = ScalarMapping::new(FieldType::Scalar(ScalarType::Int));
        let float = ScalarMapping::new(FieldType::Scalar(ScalarType::Float));
        let string = ScalarMapping::new(FieldType::Scalar(ScalarType::String));
        let boolean = ScalarMapping::new(FieldType::Scalar(ScalarType::Boolean));
        let string_list =
            ScalarMapping::new(FieldType::list_of(FieldType::Scalar(ScalarType::String)));
        let json = ScalarMapping::new(FieldType::Scalar(ScalarType::String)).with_eval(json_text_eval());
        let date = ScalarMapping::new(FieldType::Scalar(ScalarType::String))
            .with_eval(date_eval(date_format));

        let mappings = [
            ("smallint", int.clone()),
            ("integer", int),
            ("float", float.clone()),
            ("decimal", float),
            ("text", string.clone()),
            ("string", string),
            ("boolean", boolean),
            ("array", string_list),
            ("json_array", json),
            ("date", date.clone()),
            ("datetime", date.clone()),
            ("time", date),
        ]
        .into_iter()
        .map(|(key, mapping)| (key.to_string(), mapping))
        .collect();

        Self { mappings }
    }

    /// Adds or replaces the mapping for `key`.
    pub fn insert(&mut self, key: impl Into<String>, mapping: ScalarMapping) {
        self.mappings.insert(key.into(), mapping);
    }

    /// Looks up the mapping for a storage type key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ScalarMapping> {
        self.mappings.get(key)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.mappings.contains_key(key)
    }
}

/// Serializes structured values to JSON text. `null` stays `null`.
#[must_use]
pub fn json_text_eval() -> Eval {
    Eval::new(|value| match value {
        RawValue::Null | RawValue::Json(serde_json::Value::Null) => RawValue::Null,
        RawValue::Json(json) => RawValue::String(json.to_string()),
        other => RawValue::String(other.to_json().to_string()),
    })
}

/// Formats dates, times and date-times. `null` stays `null`.
///
/// Dates are formatted at midnight, times on 1970-01-01. Values of any
/// other kind pass through unchanged.
#[must_use]
pub fn date_eval(format: DateFormat) -> Eval {
    Eval::new(move |value| {
        let datetime = match value {
            RawValue::DateTime(dt) => dt,
            RawValue::Date(d) => d.midnight(),
            RawValue::Time(t) => PrimitiveDateTime::new(date!(1970 - 01 - 01), t),
            other => return other,
        };
        match format.format(datetime) {
            Ok(text) => RawValue::String(text),
            Err(e) => {
                warn!(error = %e, value = %datetime, "Failed to format date value");
                RawValue::Null
            }
        }
    })
}
