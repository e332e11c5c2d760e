//! Contracts for the metadata sources the schema mapper consumes.

use crate::error::MetadataError;
use crate::types::{EntityDescriptor, FieldRegistration};

/// Source of persistence mappings, usually backed by an ORM.
///
/// Implementations must be thread-safe (`Send + Sync`). Caching of
/// descriptors, if any, is the provider's concern.
pub trait MetadataProvider: Send + Sync {
    /// Returns `true` if `class_name` is a mapped entity.
    fn is_entity(&self, class_name: &str) -> bool;

    /// Returns the mapping of `class_name`.
    ///
    /// # Errors
    ///
    /// Returns `MetadataError::NotMapped` if the class has no persistence mapping.
    fn descriptor(&self, class_name: &str) -> Result<EntityDescriptor, MetadataError>;

    /// Returns `true` if `class_name` names an existing class, mapped or not.
    fn class_exists(&self, class_name: &str) -> bool {
        self.is_entity(class_name)
    }
}

/// Source of field registrations and blacklist markers.
///
/// Replaces attribute discovery: implementations hand over already-parsed
/// registrations in declaration order.
pub trait AnnotationSource: Send + Sync {
    /// Method-bound field registrations declared on `class_name`.
    fn field_registrations(&self, class_name: &str) -> Vec<FieldRegistration>;

    /// Property names of `class_name` that carry a blacklist marker.
    fn blacklisted_fields(&self, class_name: &str) -> Vec<String>;
}

/// Annotation source for entities that declare nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAnnotations;

impl AnnotationSource for NoAnnotations {
    fn field_registrations(&self, _class_name: &str) -> Vec<FieldRegistration> {
        Vec::new()
    }

    fn blacklisted_fields(&self, _class_name: &str) -> Vec<String> {
        Vec::new()
    }
}
