//! Recursive entity → schema type mapper.
//!
//! [`SchemaMapper`] turns an entity class into a [`SchemaType`] shell and
//! wires a field thunk into it. When forced, the thunk builds scalar,
//! association and extended fields, recursing into associated entities
//! through the shared [`TypeRegistry`]. Because shells are registered before
//! any thunk runs, cycles in the entity graph resolve to the cached shell.
//!
//! # Example
//!
//! ```ignore
//! let mapper = SchemaMapper::builder()
//!     .with_metadata(Arc::new(metadata))
//!     .with_annotations(Arc::new(annotations))
//!     .build()?;
//!
//! let post = mapper.build_schema_type("blog::Post")?;
//! let fields = post.fields()?;
//! ```

use std::sync::Arc;

use ormql_metadata::{DynAnnotationSource, DynMetadataProvider, EntityDescriptor, NoAnnotations};
use tracing::{debug, warn};

use super::registrar::{Discovery, ExtendedFieldRegistrar, RegisteredField, RegisteredTarget};
use super::registry::TypeRegistry;
use crate::config::{MapperConfig, UnmappedTypePolicy};
use crate::error::MappingError;
use crate::naming::{camel_case, unqualified_name};
use crate::resolvers::{FieldResolver, ValueProxy};
use crate::types::{
    Eval, FieldMap, FieldSource, FieldSpec, FieldType, ScalarCoercionTable, ScalarMapping,
    SchemaType, merge_by_precedence,
};

/// Maps entity classes to schema types.
///
/// Cloning is cheap; clones share one build session.
#[derive(Clone)]
pub struct SchemaMapper {
    inner: Arc<MapperInner>,
}

struct MapperInner {
    metadata: DynMetadataProvider,
    annotations: DynAnnotationSource,
    registry: Arc<TypeRegistry>,
    scalars: ScalarCoercionTable,
    unmapped: UnmappedTypePolicy,
    proxy: Option<ValueProxy>,
    config: MapperConfig,
}

impl SchemaMapper {
    /// Starts building a mapper.
    #[must_use]
    pub fn builder() -> SchemaMapperBuilder {
        SchemaMapperBuilder::default()
    }

    /// The registry holding this session's types.
    #[must_use]
    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.inner.registry
    }

    #[must_use]
    pub fn config(&self) -> &MapperConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn scalars(&self) -> &ScalarCoercionTable {
        &self.inner.scalars
    }

    /// Returns the schema type for `class_name`, creating its shell on first
    /// request.
    ///
    /// Fields are not computed here; they are built when the type's fields
    /// are first read.
    ///
    /// # Errors
    ///
    /// Returns `MappingError::InvalidEntity` if the class is not an entity,
    /// `MappingError::DuplicateTypeName` if another class already claimed the
    /// type name, or a registry error.
    pub fn map_entity(&self, class_name: &str) -> Result<Arc<SchemaType>, MappingError> {
        self.inner.map_entity(class_name)
    }

    /// Maps the root entity of a schema.
    ///
    /// # Errors
    ///
    /// See [`map_entity`](Self::map_entity).
    pub fn build_schema_type(&self, root_class: &str) -> Result<Arc<SchemaType>, MappingError> {
        debug!(root = %root_class, "Building schema type");
        self.map_entity(root_class)
    }

    /// Starts a new build session by clearing the registry.
    pub fn reset(&self) {
        self.inner.registry.clear();
    }
}

impl std::fmt::Debug for SchemaMapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaMapper")
            .field("registry", &self.inner.registry)
            .field("unmapped", &self.inner.unmapped)
            .finish()
    }
}

impl MapperInner {
    fn map_entity(self: &Arc<Self>, class_name: &str) -> Result<Arc<SchemaType>, MappingError> {
        if !self.metadata.is_entity(class_name) {
            return Err(MappingError::invalid_entity(class_name));
        }

        let ty = self
            .registry
            .get_or_create(unqualified_name(class_name), |name| {
                Ok(Arc::new(self.shell(name, class_name)))
            })?;

        if ty.class_name() != class_name {
            return Err(MappingError::DuplicateTypeName {
                name: ty.name().to_string(),
                existing: ty.class_name().to_string(),
                requested: class_name.to_string(),
            });
        }

        Ok(ty)
    }

    /// Creates a type shell whose thunk calls back into this session.
    fn shell(self: &Arc<Self>, name: &str, class_name: &str) -> SchemaType {
        let session = Arc::downgrade(self);
        let type_name = name.to_string();
        let class = class_name.to_string();

        SchemaType::new(
            name,
            class_name,
            Box::new(move || {
                let inner = session
                    .upgrade()
                    .ok_or_else(|| MappingError::session_closed(&type_name))?;
                inner.assemble_fields(&class)
            }),
        )
    }

    fn assemble_fields(self: &Arc<Self>, class_name: &str) -> Result<FieldMap, MappingError> {
        let descriptor = self.metadata.descriptor(class_name)?;
        let discovery = ExtendedFieldRegistrar::new(
            self.metadata.as_ref(),
            self.annotations.as_ref(),
            &self.scalars,
            self.unmapped,
        )
        .discover(class_name)?;

        let mut entries = Vec::new();
        self.scalar_fields(&descriptor, &discovery, &mut entries)?;
        self.association_fields(&descriptor, &discovery, &mut entries)?;
        for field in discovery.fields {
            if let Some(entry) = self.extended_field(class_name, field)? {
                entries.push(entry);
            }
        }

        let fields = merge_by_precedence(entries);
        debug!(
            class_name = %class_name,
            field_count = fields.len(),
            "Resolved schema type fields"
        );
        Ok(fields)
    }

    fn scalar_fields(
        &self,
        descriptor: &EntityDescriptor,
        discovery: &Discovery,
        entries: &mut Vec<(String, FieldSpec)>,
    ) -> Result<(), MappingError> {
        for field in &descriptor.scalar_fields {
            if is_blacklisted(discovery, &field.field_name) {
                continue;
            }

            let Some(mapping) = self.scalars.get(&field.storage_type) else {
                match self.unmapped {
                    UnmappedTypePolicy::Fail => {
                        return Err(MappingError::unmapped_storage_type(
                            &descriptor.class_name,
                            &field.field_name,
                            &field.storage_type,
                        ));
                    }
                    UnmappedTypePolicy::Omit => {
                        warn!(
                            class_name = %descriptor.class_name,
                            field = %field.field_name,
                            type_key = %field.storage_type,
                            "Omitting field with unmapped storage type"
                        );
                        continue;
                    }
                }
            };

            let resolver = self.convention_resolver(&field.field_name, mapping.eval.clone());
            entries.push((
                camel_case(&field.field_name),
                FieldSpec::new(mapping.field_type.clone(), resolver, FieldSource::Scalar),
            ));
        }
        Ok(())
    }

    fn association_fields(
        self: &Arc<Self>,
        descriptor: &EntityDescriptor,
        discovery: &Discovery,
        entries: &mut Vec<(String, FieldSpec)>,
    ) -> Result<(), MappingError> {
        for association in &descriptor.associations {
            if is_blacklisted(discovery, &association.field_name) {
                continue;
            }

            let Some(target) = self.map_target(&descriptor.class_name, &association.target_class)?
            else {
                continue;
            };

            let mut field_type = FieldType::object(&target);
            if association.cardinality.is_list() {
                field_type = FieldType::list_of(field_type);
            }

            let resolver = self.convention_resolver(&association.field_name, Eval::identity());
            entries.push((
                camel_case(&association.field_name),
                FieldSpec::new(field_type, resolver, FieldSource::Association),
            ));
        }
        Ok(())
    }

    fn extended_field(
        self: &Arc<Self>,
        class_name: &str,
        field: RegisteredField,
    ) -> Result<Option<(String, FieldSpec)>, MappingError> {
        let (field_type, eval) = match field.target {
            RegisteredTarget::Scalar(ScalarMapping { field_type, eval }) => (field_type, eval),
            RegisteredTarget::Entity {
                class_name: target_class,
                is_list,
            } => {
                let Some(target) = self.map_target(class_name, &target_class)? else {
                    return Ok(None);
                };
                let field_type = FieldType::object(&target);
                let field_type = if is_list {
                    FieldType::list_of(field_type)
                } else {
                    field_type
                };
                (field_type, Eval::identity())
            }
        };

        let resolver = FieldResolver::by_method(&field.key, &field.method, eval)
            .with_proxy(self.proxy.clone());
        let spec = FieldSpec::new(field_type, resolver, FieldSource::Extended)
            .with_args(field.arguments);
        Ok(Some((camel_case(&field.key), spec)))
    }

    /// Maps an association target; a target that is not an entity is skipped.
    fn map_target(
        self: &Arc<Self>,
        declaring_class: &str,
        target_class: &str,
    ) -> Result<Option<Arc<SchemaType>>, MappingError> {
        match self.map_entity(target_class) {
            Ok(target) => Ok(Some(target)),
            Err(e) if e.is_invalid_entity() => {
                debug!(
                    class_name = %declaring_class,
                    target = %target_class,
                    "Skipping association to non-entity class"
                );
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn convention_resolver(&self, key: &str, eval: Eval) -> FieldResolver {
        FieldResolver::by_convention(key, eval).with_proxy(self.proxy.clone())
    }
}

/// Blacklist entries may use either the stored or the camelCase name.
fn is_blacklisted(discovery: &Discovery, field_name: &str) -> bool {
    discovery.blacklist.contains(field_name) || discovery.blacklist.contains(&camel_case(field_name))
}

/// Builder for [`SchemaMapper`].
#[derive(Default)]
pub struct SchemaMapperBuilder {
    metadata: Option<DynMetadataProvider>,
    annotations: Option<DynAnnotationSource>,
    registry: Option<Arc<TypeRegistry>>,
    proxy: Option<ValueProxy>,
    config: Option<MapperConfig>,
    custom_scalars: Vec<(String, ScalarMapping)>,
}

impl SchemaMapperBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the metadata provider (required).
    #[must_use]
    pub fn with_metadata(mut self, metadata: DynMetadataProvider) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Sets the annotation source. Defaults to [`NoAnnotations`].
    #[must_use]
    pub fn with_annotations(mut self, annotations: DynAnnotationSource) -> Self {
        self.annotations = Some(annotations);
        self
    }

    /// Uses a caller-owned registry instead of a fresh in-memory one.
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<TypeRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Wraps every parent value before fields read it.
    #[must_use]
    pub fn with_proxy(mut self, proxy: ValueProxy) -> Self {
        self.proxy = Some(proxy);
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: MapperConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Adds or replaces a storage type mapping in the coercion table.
    #[must_use]
    pub fn with_scalar(mut self, key: impl Into<String>, mapping: ScalarMapping) -> Self {
        self.custom_scalars.push((key.into(), mapping));
        self
    }

    /// Builds the mapper.
    ///
    /// # Errors
    ///
    /// Returns `MappingError::InvalidConfig` if no metadata provider was set
    /// or the configuration is invalid.
    pub fn build(self) -> Result<SchemaMapper, MappingError> {
        let metadata = self
            .metadata
            .ok_or_else(|| MappingError::InvalidConfig("metadata provider is not set".into()))?;
        let config = self.config.unwrap_or_default();
        config.validate().map_err(MappingError::InvalidConfig)?;

        let mut scalars =
            ScalarCoercionTable::standard(config.date_format().map_err(MappingError::InvalidConfig)?);
        for (key, mapping) in self.custom_scalars {
            scalars.insert(key, mapping);
        }

        Ok(SchemaMapper {
            inner: Arc::new(MapperInner {
                metadata,
                annotations: self.annotations.unwrap_or_else(|| Arc::new(NoAnnotations)),
                registry: self.registry.unwrap_or_default(),
                scalars,
                unmapped: config.unmapped_storage_types,
                proxy: self.proxy,
                config,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use ormql_metadata::{
        AssociationKind, Cardinality, FieldRegistration, InMemoryAnnotationSource,
        InMemoryMetadataProvider,
    };

    use super::*;
    use crate::types::{ScalarType, TypeState};

    fn blog() -> InMemoryMetadataProvider {
        InMemoryMetadataProvider::new()
            .with_entity(
                EntityDescriptor::new("blog::User")
                    .scalar("id", "integer")
                    .scalar("first_name", "string")
                    .association("posts", "blog::Post", AssociationKind::OneToMany),
            )
            .with_entity(
                EntityDescriptor::new("blog::Post")
                    .scalar("id", "integer")
                    .scalar("title", "text")
                    .association("author", "blog::User", AssociationKind::ManyToOne),
            )
    }

    fn mapper(metadata: InMemoryMetadataProvider) -> SchemaMapper {
        SchemaMapper::builder()
            .with_metadata(Arc::new(metadata))
            .build()
            .unwrap()
    }

    #[test]
    fn test_shell_is_lazy() {
        let mapper = mapper(blog());
        let user = mapper.map_entity("blog::User").unwrap();

        assert_eq!(user.name(), "User");
        assert_eq!(user.state(), TypeState::ShellRegistered);
        assert_eq!(mapper.registry().len(), 1);

        let fields = user.fields().unwrap();
        assert_eq!(
            fields.keys().collect::<Vec<_>>(),
            vec!["id", "firstName", "posts"]
        );
        assert_eq!(mapper.registry().len(), 2);
    }

    #[test]
    fn test_cycle_resolves_to_same_instance() {
        let mapper = mapper(blog());
        let user = mapper.map_entity("blog::User").unwrap();
        let post = mapper.map_entity("blog::Post").unwrap();

        let posts = &user.fields().unwrap()["posts"];
        assert_eq!(posts.field_type.to_string(), "[Post]");
        assert!(posts.field_type.object_ref().unwrap().points_to(&post));

        let author = &post.fields().unwrap()["author"];
        assert!(author.field_type.object_ref().unwrap().points_to(&user));
    }

    #[test]
    fn test_invalid_root() {
        let mapper = mapper(blog());
        let err = mapper.build_schema_type("blog::Helper").unwrap_err();
        assert!(err.is_invalid_entity());
        assert!(mapper.registry().is_empty());
    }

    #[test]
    fn test_duplicate_type_name() {
        let metadata = blog().with_entity(EntityDescriptor::new("admin::User"));
        let mapper = mapper(metadata);
        mapper.map_entity("blog::User").unwrap();

        let err = mapper.map_entity("admin::User").unwrap_err();
        assert!(matches!(
            err,
            MappingError::DuplicateTypeName { ref existing, .. } if existing == "blog::User"
        ));
    }

    #[test]
    fn test_session_closed() {
        let registry = Arc::new(TypeRegistry::new());
        let user = {
            let mapper = SchemaMapper::builder()
                .with_metadata(Arc::new(blog()))
                .with_registry(Arc::clone(&registry))
                .build()
                .unwrap();
            mapper.map_entity("blog::User").unwrap()
        };

        let err = user.fields().unwrap_err();
        assert_eq!(err.error_code(), "SESSION_CLOSED");
    }

    #[test]
    fn test_extended_field_wins_and_carries_args() {
        let annotations = InMemoryAnnotationSource::new().register(
            "blog::Post",
            FieldRegistration::new("title", "string").argument("length", "integer", false),
        );
        let mapper = SchemaMapper::builder()
            .with_metadata(Arc::new(blog()))
            .with_annotations(Arc::new(annotations))
            .build()
            .unwrap();

        let post = mapper.map_entity("blog::Post").unwrap();
        let title = &post.fields().unwrap()["title"];
        assert_eq!(title.source, FieldSource::Extended);
        assert_eq!(title.resolver.method(), Some("title"));
        assert_eq!(title.args.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn test_custom_scalar() {
        let metadata = InMemoryMetadataProvider::new().with_entity(
            EntityDescriptor::new("shop::Item").scalar("price", "money"),
        );
        let mapper = SchemaMapper::builder()
            .with_metadata(Arc::new(metadata))
            .with_scalar("money", ScalarMapping::new(FieldType::Scalar(ScalarType::Float)))
            .build()
            .unwrap();

        let item = mapper.map_entity("shop::Item").unwrap();
        assert_eq!(
            item.fields().unwrap()["price"].field_type,
            FieldType::Scalar(ScalarType::Float)
        );
    }

    #[test]
    fn test_reset_starts_new_session() {
        let mapper = mapper(blog());
        let first = mapper.map_entity("blog::User").unwrap();
        mapper.reset();
        let second = mapper.map_entity("blog::User").unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_builder_requires_metadata() {
        let err = SchemaMapper::builder().build().unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");
    }

    #[test]
    fn test_single_cardinality_is_not_a_list() {
        let metadata = InMemoryMetadataProvider::new()
            .with_entity(EntityDescriptor::new("a::Node").association(
                "parent",
                "a::Node",
                Cardinality::Single,
            ));
        let mapper = mapper(metadata);
        let node = mapper.map_entity("a::Node").unwrap();
        let parent = &node.fields().unwrap()["parent"];
        assert_eq!(parent.field_type.to_string(), "Node");
        assert!(parent.field_type.object_ref().unwrap().points_to(&node));
    }
}
