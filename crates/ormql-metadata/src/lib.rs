//! # ormql-metadata
//!
//! Contracts between the ormql schema mapper and the persistence layer.
//!
//! This crate defines what the mapper consumes, not how it is produced:
//!
//! - [`MetadataProvider`] - entity descriptors (scalar columns, associations)
//! - [`AnnotationSource`] - method-bound field registrations and blacklists
//! - [`EntityObject`] / [`RawValue`] - the runtime values field resolvers read
//!
//! In-memory implementations of each are provided for tests and for entity
//! models declared in code.
//!
//! ## Example
//!
//! ```ignore
//! use ormql_metadata::{Cardinality, EntityDescriptor, InMemoryMetadataProvider};
//!
//! let provider = InMemoryMetadataProvider::new().with_entity(
//!     EntityDescriptor::new("blog::Post")
//!         .scalar("title", "string")
//!         .association("comments", "blog::Comment", Cardinality::List),
//! );
//! ```

mod error;
pub mod memory;
mod traits;
mod types;
mod value;

pub use error::{InvokeError, MetadataError};
pub use memory::{InMemoryAnnotationSource, InMemoryMetadataProvider, Record, RecordMethod};
pub use traits::{AnnotationSource, MetadataProvider, NoAnnotations};
pub use types::{
    ArgumentSpec, AssociationDescriptor, AssociationKind, BlacklistSet, Cardinality,
    EntityDescriptor, FieldRegistration, ScalarFieldDescriptor,
};
pub use value::{DeferredCollection, EntityObject, EntityRef, RawValue, ResolverArgs};

/// Type alias for a metadata result.
pub type MetadataResult<T> = Result<T, MetadataError>;

/// Type alias for a shared metadata provider.
pub type DynMetadataProvider = std::sync::Arc<dyn MetadataProvider>;

/// Type alias for a shared annotation source.
pub type DynAnnotationSource = std::sync::Arc<dyn AnnotationSource>;
