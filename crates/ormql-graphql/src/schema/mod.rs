//! Schema type construction, export and lazy loading.
//!
//! ## Components
//!
//! - [`TypeRegistry`] - get-or-create cache of schema types per build session
//! - [`ExtendedFieldRegistrar`] - method-bound fields and blacklists of a class
//! - [`SchemaMapper`] - maps entity classes to lazily resolved schema types
//! - [`EntitySchemaBuilder`] - exports reachable types as an async-graphql schema
//! - [`LazySchema`] - builds the exported schema on first access
//!
//! ## Architecture
//!
//! 1. The mapper registers a shell for the requested entity
//! 2. Reading the shell's fields builds them, registering shells for associations
//! 3. The exporter forces every reachable type and emits dynamic objects
//! 4. `LazySchema::invalidate()` clears the registry and starts over

mod builder;
mod lazy;
mod mapper;
mod registrar;
mod registry;

pub use builder::{EntitySchemaBuilder, QUERY_TYPE_NAME, RootSource, SchemaBuilderConfig};
pub use lazy::{LazySchema, SchemaState};
pub use mapper::{SchemaMapper, SchemaMapperBuilder};
pub use registrar::{Discovery, ExtendedFieldRegistrar, RegisteredField, RegisteredTarget};
pub use registry::{LookupFn, RegisterFn, TypeRegistry};
