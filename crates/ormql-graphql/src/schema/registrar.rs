//! Discovery of extended fields and blacklisted properties.
//!
//! Turns the raw registrations handed over by an [`AnnotationSource`] into
//! fields the mapper can build: scalar registrations get their coercion,
//! everything else is treated as an association and resolved to a class.

use ormql_metadata::{AnnotationSource, BlacklistSet, FieldRegistration, MetadataProvider};
use tracing::{trace, warn};

use crate::config::UnmappedTypePolicy;
use crate::error::MappingError;
use crate::naming::qualify;
use crate::types::{FieldArgument, FieldType, ScalarCoercionTable, ScalarMapping};

/// What a registered field returns.
#[derive(Debug, Clone)]
pub enum RegisteredTarget {
    /// A scalar storage type.
    Scalar(ScalarMapping),
    /// Another entity, by fully qualified class name.
    Entity { class_name: String, is_list: bool },
}

/// A registration ready to be turned into a field.
#[derive(Debug, Clone)]
pub struct RegisteredField {
    /// Field key before case normalization.
    pub key: String,
    /// Method bound as the field's resolver.
    pub method: String,
    pub target: RegisteredTarget,
    pub arguments: Vec<FieldArgument>,
}

/// Output of [`ExtendedFieldRegistrar::discover`].
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    pub blacklist: BlacklistSet,
    /// Registered fields in declaration order.
    pub fields: Vec<RegisteredField>,
}

/// Reads field registrations and blacklist markers for entity classes.
pub struct ExtendedFieldRegistrar<'a> {
    metadata: &'a dyn MetadataProvider,
    annotations: &'a dyn AnnotationSource,
    scalars: &'a ScalarCoercionTable,
    unmapped: UnmappedTypePolicy,
}

impl<'a> ExtendedFieldRegistrar<'a> {
    pub fn new(
        metadata: &'a dyn MetadataProvider,
        annotations: &'a dyn AnnotationSource,
        scalars: &'a ScalarCoercionTable,
        unmapped: UnmappedTypePolicy,
    ) -> Self {
        Self {
            metadata,
            annotations,
            scalars,
            unmapped,
        }
    }

    /// Collects the blacklist and registered fields of `class_name`.
    ///
    /// # Errors
    ///
    /// Returns `MappingError::UnresolvableRegisteredType` if a registration
    /// returns a class that does not exist, and
    /// `MappingError::UnmappedStorageType` for an unmapped argument type
    /// under the fail policy.
    pub fn discover(&self, class_name: &str) -> Result<Discovery, MappingError> {
        let blacklist: BlacklistSet = self
            .annotations
            .blacklisted_fields(class_name)
            .into_iter()
            .collect();

        let mut fields = Vec::new();
        for registration in self.annotations.field_registrations(class_name) {
            if let Some(field) = self.build_field(class_name, &registration)? {
                fields.push(field);
            }
        }

        trace!(
            class_name = %class_name,
            blacklisted = blacklist.len(),
            registered = fields.len(),
            "Discovered extended fields"
        );

        Ok(Discovery { blacklist, fields })
    }

    fn build_field(
        &self,
        class_name: &str,
        registration: &FieldRegistration,
    ) -> Result<Option<RegisteredField>, MappingError> {
        let key = registration.field_name().to_string();

        let Some(arguments) = self.build_arguments(class_name, &key, registration)? else {
            return Ok(None);
        };

        let target = match self.scalars.get(&registration.return_type) {
            Some(mapping) => RegisteredTarget::Scalar(mapping.clone()),
            None => RegisteredTarget::Entity {
                class_name: self.resolve_class(class_name, &registration.return_type)?,
                is_list: registration.is_list,
            },
        };

        Ok(Some(RegisteredField {
            key,
            method: registration.method.clone(),
            target,
            arguments,
        }))
    }

    /// Builds the argument list; `None` means the field is omitted.
    fn build_arguments(
        &self,
        class_name: &str,
        key: &str,
        registration: &FieldRegistration,
    ) -> Result<Option<Vec<FieldArgument>>, MappingError> {
        let mut arguments = Vec::with_capacity(registration.arguments.len());
        for arg in &registration.arguments {
            let Some(mapping) = self.scalars.get(&arg.type_key) else {
                let field = format!("{key}({})", arg.name);
                match self.unmapped {
                    UnmappedTypePolicy::Fail => {
                        return Err(MappingError::unmapped_storage_type(
                            class_name,
                            field,
                            &arg.type_key,
                        ));
                    }
                    UnmappedTypePolicy::Omit => {
                        warn!(
                            class_name = %class_name,
                            field = %field,
                            type_key = %arg.type_key,
                            "Omitting field with unmapped argument type"
                        );
                        return Ok(None);
                    }
                }
            };

            let field_type = if arg.nullable {
                mapping.field_type.clone()
            } else {
                FieldType::non_null(mapping.field_type.clone())
            };
            arguments.push(FieldArgument {
                name: arg.name.clone(),
                field_type,
            });
        }
        Ok(Some(arguments))
    }

    /// Resolves a registration's return type to an existing class.
    fn resolve_class(&self, declaring_class: &str, type_key: &str) -> Result<String, MappingError> {
        let class_name = qualify(type_key, declaring_class);
        if !self.metadata.class_exists(&class_name) {
            return Err(MappingError::UnresolvableRegisteredType {
                target: class_name,
                declared_in: declaring_class.to_string(),
            });
        }
        Ok(class_name)
    }
}

#[cfg(test)]
mod tests {
    use ormql_metadata::{EntityDescriptor, InMemoryAnnotationSource, InMemoryMetadataProvider};

    use super::*;
    use crate::types::ScalarType;

    fn metadata() -> InMemoryMetadataProvider {
        InMemoryMetadataProvider::new()
            .with_entity(EntityDescriptor::new("blog::Post"))
            .with_entity(EntityDescriptor::new("blog::User"))
            .with_entity(EntityDescriptor::new("auth::Account"))
    }

    #[test]
    fn test_discover_scalar_and_association() {
        let annotations = InMemoryAnnotationSource::new()
            .register(
                "blog::Post",
                FieldRegistration::new("excerpt", "string").argument("length", "integer", false),
            )
            .register("blog::Post", FieldRegistration::new("author", "User"))
            .register(
                "blog::Post",
                FieldRegistration::new("accounts", "auth::Account")
                    .named("linked_accounts")
                    .list(),
            )
            .blacklist("blog::Post", "secret");
        let metadata = metadata();
        let scalars = ScalarCoercionTable::default();
        let registrar =
            ExtendedFieldRegistrar::new(&metadata, &annotations, &scalars, UnmappedTypePolicy::Fail);

        let discovery = registrar.discover("blog::Post").unwrap();
        assert!(discovery.blacklist.contains("secret"));
        assert_eq!(discovery.fields.len(), 3);

        let excerpt = &discovery.fields[0];
        assert!(matches!(excerpt.target, RegisteredTarget::Scalar(_)));
        assert_eq!(
            excerpt.arguments[0].field_type,
            FieldType::non_null(FieldType::Scalar(ScalarType::Int))
        );

        let author = &discovery.fields[1];
        assert!(matches!(
            &author.target,
            RegisteredTarget::Entity { class_name, is_list: false } if class_name == "blog::User"
        ));

        let accounts = &discovery.fields[2];
        assert_eq!(accounts.key, "linked_accounts");
        assert_eq!(accounts.method, "accounts");
        assert!(matches!(
            &accounts.target,
            RegisteredTarget::Entity { class_name, is_list: true } if class_name == "auth::Account"
        ));
    }

    #[test]
    fn test_nullable_argument_keeps_bare_type() {
        let annotations = InMemoryAnnotationSource::new().register(
            "blog::Post",
            FieldRegistration::new("excerpt", "string").argument("suffix", "string", true),
        );
        let metadata = metadata();
        let scalars = ScalarCoercionTable::default();
        let registrar =
            ExtendedFieldRegistrar::new(&metadata, &annotations, &scalars, UnmappedTypePolicy::Fail);

        let discovery = registrar.discover("blog::Post").unwrap();
        assert_eq!(
            discovery.fields[0].arguments[0].field_type,
            FieldType::Scalar(ScalarType::String)
        );
    }

    #[test]
    fn test_unresolvable_return_type() {
        let annotations = InMemoryAnnotationSource::new()
            .register("blog::Post", FieldRegistration::new("editor", "Editor"));
        let metadata = metadata();
        let scalars = ScalarCoercionTable::default();
        let registrar =
            ExtendedFieldRegistrar::new(&metadata, &annotations, &scalars, UnmappedTypePolicy::Fail);

        let err = registrar.discover("blog::Post").unwrap_err();
        assert!(matches!(
            err,
            MappingError::UnresolvableRegisteredType { ref target, .. } if target == "blog::Editor"
        ));
    }

    #[test]
    fn test_unmapped_argument_type_policies() {
        let annotations = InMemoryAnnotationSource::new().register(
            "blog::Post",
            FieldRegistration::new("price", "float").argument("currency", "money", false),
        );
        let metadata = metadata();
        let scalars = ScalarCoercionTable::default();

        let failing =
            ExtendedFieldRegistrar::new(&metadata, &annotations, &scalars, UnmappedTypePolicy::Fail);
        assert!(matches!(
            failing.discover("blog::Post"),
            Err(MappingError::UnmappedStorageType { .. })
        ));

        let omitting =
            ExtendedFieldRegistrar::new(&metadata, &annotations, &scalars, UnmappedTypePolicy::Omit);
        assert!(omitting.discover("blog::Post").unwrap().fields.is_empty());
    }
}
