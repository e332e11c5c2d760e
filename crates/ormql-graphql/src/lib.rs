//! # ormql-graphql
//!
//! Maps a graph of persisted entities onto GraphQL object types.
//!
//! Entity descriptors may reference each other in cycles (a `User` with a
//! list of `Post`s, each `Post` pointing back at its author). The mapper
//! creates exactly one schema type per entity within a build session and
//! terminates on cycles by registering every type as a lazy shell before
//! its fields are computed.
//!
//! Fields come from three sources, merged in this order:
//!
//! - scalar columns, coerced through the [`ScalarCoercionTable`]
//! - associations to other entities, mapped recursively
//! - method-bound field registrations, which win on a name collision
//!
//! Properties carrying a blacklist marker are left out of the first two.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use ormql_graphql::{EntitySchemaBuilder, LazySchema, SchemaMapper};
//!
//! let mapper = SchemaMapper::builder()
//!     .with_metadata(Arc::new(metadata))
//!     .with_annotations(Arc::new(annotations))
//!     .with_config(config.clone())
//!     .build()?;
//!
//! let builder = EntitySchemaBuilder::new(mapper, roots, config.to_schema_builder_config())
//!     .with_root("blog::Post");
//! let schema = LazySchema::new(builder);
//! ```
//!
//! ## Configuration
//!
//! ```toml
//! [ormql]
//! unmapped_storage_types = "fail"
//! date_format = "[year]-[month]-[day] [hour]:[minute]:[second]"
//! max_depth = 15
//! max_complexity = 500
//! introspection = true
//! ```
//!
//! ## Modules
//!
//! - [`config`] - Configuration options
//! - [`types`] - Schema types, field specs and scalar coercions
//! - [`resolvers`] - Field value resolution
//! - [`schema`] - Type registry, mapper, export and lazy loading
//! - [`naming`] - Class and field name conventions
//! - [`error`] - Error types

pub mod config;
pub mod error;
pub mod naming;
pub mod resolvers;
pub mod schema;
pub mod types;

// Re-export main types
pub use config::{MapperConfig, UnmappedTypePolicy};
pub use error::{MappingError, ResolveError};
pub use resolvers::{FieldResolver, ValueProxy};
pub use schema::{
    EntitySchemaBuilder, ExtendedFieldRegistrar, LazySchema, RootSource, SchemaBuilderConfig,
    SchemaMapper, SchemaMapperBuilder, SchemaState, TypeRegistry,
};
pub use types::{
    FieldSource, FieldSpec, FieldType, ScalarCoercionTable, ScalarMapping, ScalarType, SchemaType,
    TypeState,
};

/// Result type for mapping operations.
pub type Result<T> = std::result::Result<T, MappingError>;
