//! Integration tests for the exported GraphQL schema.
//!
//! These tests verify the complete flow from entity metadata to an executed
//! GraphQL query, including cyclic associations and lazy collections.

use std::sync::Arc;

use async_graphql::dynamic::Schema;
use ormql_graphql::{
    EntitySchemaBuilder, LazySchema, MapperConfig, MappingError, RootSource, SchemaMapper,
    SchemaState, ValueProxy,
};
use ormql_metadata::{
    AssociationKind, DeferredCollection, EntityDescriptor, EntityObject, EntityRef,
    FieldRegistration, InMemoryAnnotationSource, InMemoryMetadataProvider, RawValue, Record,
};
use serde_json::json;
use time::macros::datetime;

// =============================================================================
// Fixtures
// =============================================================================

fn metadata() -> InMemoryMetadataProvider {
    InMemoryMetadataProvider::new()
        .with_entity(
            EntityDescriptor::new("blog::User")
                .scalar("first_name", "string")
                .scalar("email", "string")
                .association("posts", "blog::Post", AssociationKind::OneToMany),
        )
        .with_entity(
            EntityDescriptor::new("blog::Post")
                .scalar("title", "text")
                .scalar("published_at", "datetime")
                .scalar("tags", "array")
                .association("author", "blog::User", AssociationKind::ManyToOne),
        )
}

fn annotations() -> InMemoryAnnotationSource {
    InMemoryAnnotationSource::new().register(
        "blog::User",
        FieldRegistration::new("greeting", "string").argument("prefix", "string", true),
    )
}

/// A user with three lazily loaded posts, each pointing at a detached author.
fn ada() -> EntityRef {
    let posts = DeferredCollection::new(|| {
        ["Cycles", "Thunks", "Shells"]
            .into_iter()
            .enumerate()
            .map(|(i, title)| {
                let author = Record::new("blog::User")
                    .with_accessor("getFirstName", "Ada")
                    .into_ref();
                RawValue::Entity(
                    Record::new("blog::Post")
                        .with_accessor("getTitle", title)
                        .with_accessor(
                            "getPublishedAt",
                            datetime!(2024-03-01 09:00:00) + time::Duration::days(i as i64),
                        )
                        .with_accessor(
                            "getTags",
                            RawValue::List(vec![RawValue::from("rust"), RawValue::from("graphql")]),
                        )
                        .with_accessor("getAuthor", author)
                        .into_ref(),
                )
            })
            .collect()
    });

    Record::new("blog::User")
        .with_accessor("getFirstName", "Ada")
        .with_accessor("getEmail", "ada@example.com")
        .with_accessor("getPosts", RawValue::Collection(posts))
        .with_method("greeting", |record, args| {
            let prefix = args
                .get("prefix")
                .and_then(RawValue::as_str)
                .unwrap_or("Hello")
                .to_string();
            let name = record.get("getFirstName");
            Ok(RawValue::String(format!(
                "{prefix}, {}",
                name.as_str().unwrap_or_default()
            )))
        })
        .into_ref()
}

fn roots() -> Arc<dyn RootSource> {
    Arc::new(|type_name: &str| -> Option<EntityRef> { (type_name == "User").then(ada) })
}

fn mapper() -> SchemaMapper {
    SchemaMapper::builder()
        .with_metadata(Arc::new(metadata()))
        .with_annotations(Arc::new(annotations()))
        .build()
        .unwrap()
}

async fn build_schema(mapper: SchemaMapper) -> Schema {
    EntitySchemaBuilder::new(mapper, roots(), MapperConfig::default().to_schema_builder_config())
        .with_root("blog::User")
        .build()
        .await
        .unwrap()
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_query_cyclic_graph() {
    let schema = build_schema(mapper()).await;

    let response = schema
        .execute(
            r#"{
                User {
                    firstName
                    posts { title publishedAt tags author { firstName } }
                }
            }"#,
        )
        .await;

    assert!(response.errors.is_empty(), "{:?}", response.errors);
    assert_eq!(
        response.data.into_json().unwrap(),
        json!({
            "User": {
                "firstName": "Ada",
                "posts": [
                    {
                        "title": "Cycles",
                        "publishedAt": "2024-03-01 09:00:00",
                        "tags": ["rust", "graphql"],
                        "author": { "firstName": "Ada" }
                    },
                    {
                        "title": "Thunks",
                        "publishedAt": "2024-03-02 09:00:00",
                        "tags": ["rust", "graphql"],
                        "author": { "firstName": "Ada" }
                    },
                    {
                        "title": "Shells",
                        "publishedAt": "2024-03-03 09:00:00",
                        "tags": ["rust", "graphql"],
                        "author": { "firstName": "Ada" }
                    }
                ]
            }
        })
    );
}

#[tokio::test]
async fn test_extended_field_arguments() {
    let schema = build_schema(mapper()).await;

    let response = schema
        .execute(r#"{ User { a: greeting b: greeting(prefix: "Hi") } }"#)
        .await;

    assert!(response.errors.is_empty(), "{:?}", response.errors);
    assert_eq!(
        response.data.into_json().unwrap(),
        json!({ "User": { "a": "Hello, Ada", "b": "Hi, Ada" } })
    );
}

#[tokio::test]
async fn test_missing_root_is_null() {
    let schema = EntitySchemaBuilder::new(
        mapper(),
        Arc::new(|_: &str| -> Option<EntityRef> { None }),
        Default::default(),
    )
    .with_root("blog::User")
    .build()
    .await
    .unwrap();

    let response = schema.execute("{ User { firstName } _health }").await;
    assert!(response.errors.is_empty(), "{:?}", response.errors);
    assert_eq!(
        response.data.into_json().unwrap(),
        json!({ "User": null, "_health": "ok" })
    );
}

#[tokio::test]
async fn test_proxy_wraps_every_parent() {
    #[derive(Debug)]
    struct Masked(EntityRef);

    impl EntityObject for Masked {
        fn class_name(&self) -> &str {
            self.0.class_name()
        }

        fn accessor(&self, name: &str) -> Option<RawValue> {
            match name {
                "getEmail" => Some(RawValue::from("hidden")),
                other => self.0.accessor(other),
            }
        }
    }

    let mapper = SchemaMapper::builder()
        .with_metadata(Arc::new(metadata()))
        .with_proxy(ValueProxy::new(|inner: EntityRef| -> EntityRef {
            Arc::new(Masked(inner))
        }))
        .build()
        .unwrap();
    let schema = build_schema(mapper).await;

    let response = schema.execute("{ User { firstName email } }").await;
    assert!(response.errors.is_empty(), "{:?}", response.errors);
    assert_eq!(
        response.data.into_json().unwrap(),
        json!({ "User": { "firstName": "Ada", "email": "hidden" } })
    );
}

#[tokio::test]
async fn test_lazy_schema_lifecycle() {
    let mapper = mapper();
    let builder = EntitySchemaBuilder::new(mapper.clone(), roots(), Default::default())
        .with_root("blog::User");
    let lazy = LazySchema::new(builder);

    assert_eq!(lazy.state().await, SchemaState::Uninitialized);
    let schema = lazy.get_or_build_wait().await.unwrap();
    assert!(lazy.is_ready().await);
    assert_eq!(mapper.registry().len(), 2);

    let response = schema.execute("{ User { firstName } }").await;
    assert!(response.errors.is_empty(), "{:?}", response.errors);

    lazy.invalidate().await;
    assert!(mapper.registry().is_empty());
    assert!(lazy.get().await.is_none());

    lazy.get_or_build().await.unwrap();
    assert_eq!(mapper.registry().len(), 2);
}

#[tokio::test]
async fn test_build_error_surfaces_mapping_error() {
    let metadata = InMemoryMetadataProvider::new()
        .with_entity(EntityDescriptor::new("shop::Item").scalar("price", "money"));
    let mapper = SchemaMapper::builder()
        .with_metadata(Arc::new(metadata))
        .build()
        .unwrap();

    let err = EntitySchemaBuilder::new(mapper, roots(), Default::default())
        .with_root("shop::Item")
        .build()
        .await
        .unwrap_err();
    assert!(matches!(err, MappingError::UnmappedStorageType { .. }));
}
