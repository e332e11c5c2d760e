//! async-graphql schema export.
//!
//! [`EntitySchemaBuilder`] forces the field thunks of every type reachable
//! from the configured root entities and registers one dynamic object per
//! schema type. Field resolvers delegate to the [`FieldSpec`] resolvers, so
//! the exported schema reads the same entity values the mapper describes.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use async_graphql::dynamic::{
    Field, FieldFuture, FieldValue, InputValue, Object, ResolverContext, Schema, TypeRef,
};
use async_graphql::Value;
use ormql_metadata::{EntityRef, RawValue, ResolverArgs};
use tracing::{debug, trace};

use super::SchemaMapper;
use crate::error::{MappingError, ResolveError};
use crate::types::{FieldSpec, SchemaType};

/// Name of the generated query root type.
pub const QUERY_TYPE_NAME: &str = "Query";

/// Configuration for the schema builder.
#[derive(Debug, Clone)]
pub struct SchemaBuilderConfig {
    /// Maximum query depth allowed.
    pub max_depth: usize,

    /// Maximum query complexity allowed.
    pub max_complexity: usize,

    /// Whether to enable introspection queries.
    pub introspection_enabled: bool,
}

impl Default for SchemaBuilderConfig {
    fn default() -> Self {
        Self {
            max_depth: 15,
            max_complexity: 500,
            introspection_enabled: true,
        }
    }
}

/// Supplies the entity behind each root query field.
pub trait RootSource: Send + Sync {
    /// Loads the root value for the type named `type_name`.
    fn load(&self, type_name: &str) -> Option<EntityRef>;
}

impl<F> RootSource for F
where
    F: Fn(&str) -> Option<EntityRef> + Send + Sync,
{
    fn load(&self, type_name: &str) -> Option<EntityRef> {
        self(type_name)
    }
}

/// Builds an async-graphql schema from mapped entity types.
///
/// # Example
///
/// ```ignore
/// let builder = EntitySchemaBuilder::new(mapper, Arc::new(roots), SchemaBuilderConfig::default())
///     .with_root("blog::Post");
///
/// let schema = builder.build().await?;
/// ```
pub struct EntitySchemaBuilder {
    mapper: SchemaMapper,
    roots: Vec<String>,
    root_source: Arc<dyn RootSource>,
    config: SchemaBuilderConfig,
}

impl EntitySchemaBuilder {
    /// Creates a new schema builder.
    #[must_use]
    pub fn new(
        mapper: SchemaMapper,
        root_source: Arc<dyn RootSource>,
        config: SchemaBuilderConfig,
    ) -> Self {
        Self {
            mapper,
            roots: Vec::new(),
            root_source,
            config,
        }
    }

    /// Adds a root entity; it becomes a field of the `Query` type.
    #[must_use]
    pub fn with_root(mut self, class_name: impl Into<String>) -> Self {
        self.roots.push(class_name.into());
        self
    }

    #[must_use]
    pub fn mapper(&self) -> &SchemaMapper {
        &self.mapper
    }

    /// Builds the GraphQL schema.
    ///
    /// # Errors
    ///
    /// Returns any mapping error raised while resolving reachable types, or
    /// `MappingError::SchemaBuildFailed` if a reachable entity type is named
    /// like the query root or async-graphql rejects the schema.
    pub async fn build(&self) -> Result<Schema, MappingError> {
        debug!(roots = ?self.roots, "Starting GraphQL schema build");

        let mut root_types = Vec::with_capacity(self.roots.len());
        for class_name in &self.roots {
            root_types.push(self.mapper.build_schema_type(class_name)?);
        }

        let types = collect_reachable(&root_types)?;
        if let Some(clash) = types.iter().find(|ty| ty.name() == QUERY_TYPE_NAME) {
            return Err(MappingError::SchemaBuildFailed(format!(
                "entity {} maps to type name {QUERY_TYPE_NAME}, which is reserved for the query root",
                clash.class_name()
            )));
        }

        let mut schema_builder = Schema::build(QUERY_TYPE_NAME, None, None);
        for ty in &types {
            schema_builder = schema_builder.register(build_object(ty)?);
        }
        schema_builder = schema_builder.register(self.build_query_type(&root_types));

        let mut schema_builder = schema_builder.limit_depth(self.config.max_depth);
        schema_builder = schema_builder.limit_complexity(self.config.max_complexity);

        if !self.config.introspection_enabled {
            schema_builder = schema_builder.disable_introspection();
        }

        let schema = schema_builder
            .finish()
            .map_err(|e| MappingError::SchemaBuildFailed(e.to_string()))?;

        debug!(type_count = types.len(), "GraphQL schema build complete");
        Ok(schema)
    }

    fn build_query_type(&self, root_types: &[Arc<SchemaType>]) -> Object {
        let mut query = Object::new(QUERY_TYPE_NAME).description("Entity query root");

        query = query.field(
            Field::new("_health", TypeRef::named_nn(TypeRef::STRING), |_| {
                FieldFuture::new(async { Ok(Some(Value::String("ok".to_string()))) })
            })
            .description("Health check endpoint"),
        );

        for ty in root_types {
            let type_name = ty.name().to_string();
            let source = Arc::clone(&self.root_source);
            let field_type = TypeRef::named(ty.name());

            query = query.field(
                Field::new(ty.name(), field_type, move |_| {
                    let source = Arc::clone(&source);
                    let type_name = type_name.clone();
                    FieldFuture::new(async move {
                        trace!(type_name = %type_name, "Loading root entity");
                        Ok(source.load(&type_name).map(FieldValue::owned_any))
                    })
                })
                .description(format!("Root {} entity", ty.name())),
            );
        }

        query
    }
}

/// Forces fields breadth-first and returns every reachable type once.
fn collect_reachable(roots: &[Arc<SchemaType>]) -> Result<Vec<Arc<SchemaType>>, MappingError> {
    let mut seen = HashSet::new();
    let mut queue: VecDeque<Arc<SchemaType>> = VecDeque::new();
    let mut types = Vec::new();

    for root in roots {
        if seen.insert(root.name().to_string()) {
            queue.push_back(Arc::clone(root));
        }
    }

    while let Some(ty) = queue.pop_front() {
        for spec in ty.fields()?.values() {
            let Some(target) = spec.field_type.object_ref() else {
                continue;
            };
            if !seen.insert(target.name().to_string()) {
                continue;
            }
            let next = target
                .upgrade()
                .ok_or_else(|| MappingError::session_closed(target.name()))?;
            queue.push_back(next);
        }
        types.push(ty);
    }

    Ok(types)
}

fn build_object(ty: &SchemaType) -> Result<Object, MappingError> {
    let mut object = Object::new(ty.name()).description(ty.description());
    let fields = ty.fields()?;

    // GraphQL requires at least one field per object type.
    if fields.is_empty() {
        return Ok(object.field(Field::new(
            "_placeholder",
            TypeRef::named(TypeRef::STRING),
            |_| FieldFuture::new(async { Ok(None::<Value>) }),
        )));
    }

    for (name, spec) in fields {
        object = object.field(build_field(name, spec));
    }
    Ok(object)
}

fn build_field(name: &str, spec: &FieldSpec) -> Field {
    let spec = Arc::new(spec.clone());
    let field_name = name.to_string();
    let type_ref = spec.field_type.to_type_ref();
    let args = spec.args.clone().unwrap_or_default();

    let mut field = Field::new(name, type_ref, move |ctx| {
        let spec = Arc::clone(&spec);
        let field_name = field_name.clone();
        FieldFuture::new(async move {
            let parent = ctx
                .parent_value
                .try_downcast_ref::<EntityRef>()
                .map_err(|_| ResolveError::ParentNotEntity { field: field_name })?;
            let args = resolver_args(&ctx);
            let value = spec.resolve(parent, &args)?;
            Ok(to_field_value(value))
        })
    });

    for arg in args {
        field = field.argument(InputValue::new(arg.name, arg.field_type.to_type_ref()));
    }
    field
}

fn resolver_args(ctx: &ResolverContext<'_>) -> ResolverArgs {
    ctx.args
        .iter()
        .map(|(name, value)| {
            let raw = value
                .as_value()
                .clone()
                .into_json()
                .map(RawValue::from_json)
                .unwrap_or(RawValue::Null);
            (name.to_string(), raw)
        })
        .collect()
}

fn to_field_value(value: RawValue) -> Option<FieldValue<'static>> {
    match value {
        RawValue::Null => None,
        RawValue::Entity(entity) => Some(FieldValue::owned_any(entity)),
        RawValue::List(items) => Some(FieldValue::list(items.into_iter().map(list_item))),
        RawValue::Collection(collection) => Some(FieldValue::list(
            collection.materialize().iter().cloned().map(list_item),
        )),
        other => Some(FieldValue::value(
            Value::from_json(other.to_json()).unwrap_or(Value::Null),
        )),
    }
}

fn list_item(value: RawValue) -> FieldValue<'static> {
    to_field_value(value).unwrap_or_else(|| FieldValue::value(Value::Null))
}
