//! Error types for schema mapping and field resolution.
//!
//! Mapping errors are configuration errors meant to be fixed by the entity
//! author. They are reported synchronously to the caller; nothing is retried.

use ormql_metadata::{InvokeError, MetadataError};

/// Errors that can occur while building schema types.
#[derive(Debug, thiserror::Error)]
pub enum MappingError {
    /// The class is not a mapped entity.
    #[error("Class {class_name} is not a valid entity")]
    InvalidEntity {
        /// The class that was requested.
        class_name: String,
    },

    /// A storage type has no entry in the scalar coercion table.
    #[error("The storage type {type_key} of {class_name}.{field} has not been mapped")]
    UnmappedStorageType {
        /// Entity declaring the field.
        class_name: String,
        /// Field or argument carrying the type.
        field: String,
        /// The unmapped storage type key.
        type_key: String,
    },

    /// A registered field returns a class that does not exist.
    #[error("{target} is not defined in {declared_in}")]
    UnresolvableRegisteredType {
        /// Resolved class name of the return type.
        target: String,
        /// Entity declaring the registration.
        declared_in: String,
    },

    /// An external registry is missing its lookup or register half.
    #[error("Please define a registry first: {missing} is not set")]
    MissingRegistry {
        /// Which half is missing (`lookup` or `register`).
        missing: &'static str,
    },

    /// Two classes map to the same unqualified type name.
    #[error("Type name {name} is claimed by both {existing} and {requested}")]
    DuplicateTypeName {
        /// The shared type name.
        name: String,
        /// Class already registered under the name.
        existing: String,
        /// Class that was requested.
        requested: String,
    },

    /// A field thunk was forced after its build session was dropped.
    #[error("Build session for {type_name} has ended")]
    SessionClosed {
        /// Type whose fields were requested.
        type_name: String,
    },

    /// Metadata provider failure.
    #[error(transparent)]
    Metadata(#[from] MetadataError),

    /// The exported GraphQL schema could not be built.
    #[error("Failed to build GraphQL schema: {0}")]
    SchemaBuildFailed(String),

    /// Schema is still being built - client should retry.
    #[error("GraphQL schema is initializing, please retry")]
    SchemaInitializing,

    /// Configuration values are invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl MappingError {
    /// Creates a new `InvalidEntity` error.
    #[must_use]
    pub fn invalid_entity(class_name: impl Into<String>) -> Self {
        Self::InvalidEntity {
            class_name: class_name.into(),
        }
    }

    /// Creates a new `UnmappedStorageType` error.
    #[must_use]
    pub fn unmapped_storage_type(
        class_name: impl Into<String>,
        field: impl Into<String>,
        type_key: impl Into<String>,
    ) -> Self {
        Self::UnmappedStorageType {
            class_name: class_name.into(),
            field: field.into(),
            type_key: type_key.into(),
        }
    }

    /// Creates a new `SessionClosed` error.
    #[must_use]
    pub fn session_closed(type_name: impl Into<String>) -> Self {
        Self::SessionClosed {
            type_name: type_name.into(),
        }
    }

    /// Returns `true` if this is an invalid entity error.
    #[must_use]
    pub fn is_invalid_entity(&self) -> bool {
        matches!(self, Self::InvalidEntity { .. })
    }

    /// Returns the error code for GraphQL error extensions and logs.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidEntity { .. } => "INVALID_ENTITY",
            Self::UnmappedStorageType { .. } => "UNMAPPED_STORAGE_TYPE",
            Self::UnresolvableRegisteredType { .. } => "UNRESOLVABLE_REGISTERED_TYPE",
            Self::MissingRegistry { .. } => "MISSING_REGISTRY",
            Self::DuplicateTypeName { .. } => "DUPLICATE_TYPE_NAME",
            Self::SessionClosed { .. } => "SESSION_CLOSED",
            Self::Metadata(_) => "METADATA_ERROR",
            Self::SchemaBuildFailed(_) => "SCHEMA_BUILD_FAILED",
            Self::SchemaInitializing => "SCHEMA_INITIALIZING",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
        }
    }

    /// Returns the Retry-After value in seconds, if applicable.
    #[must_use]
    pub fn retry_after(&self) -> Option<u32> {
        match self {
            Self::SchemaInitializing => Some(5),
            _ => None,
        }
    }
}

/// Errors raised while resolving a field value.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// The bound method failed or does not exist.
    #[error(transparent)]
    Invoke(#[from] InvokeError),

    /// The parent value handed to a field resolver is not an entity.
    #[error("Parent of field {field} is not an entity")]
    ParentNotEntity {
        /// Field being resolved.
        field: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(MappingError::invalid_entity("app::X").error_code(), "INVALID_ENTITY");
        assert_eq!(
            MappingError::MissingRegistry { missing: "lookup" }.error_code(),
            "MISSING_REGISTRY"
        );
        assert_eq!(
            MappingError::from(MetadataError::not_mapped("app::X")).error_code(),
            "METADATA_ERROR"
        );
    }

    #[test]
    fn test_messages() {
        let err = MappingError::unmapped_storage_type("app::Post", "rating", "money");
        assert_eq!(
            err.to_string(),
            "The storage type money of app::Post.rating has not been mapped"
        );
        assert_eq!(
            MappingError::invalid_entity("app::Helper").to_string(),
            "Class app::Helper is not a valid entity"
        );
    }

    #[test]
    fn test_retry_after() {
        assert_eq!(MappingError::SchemaInitializing.retry_after(), Some(5));
        assert_eq!(MappingError::invalid_entity("x").retry_after(), None);
    }
}
