//! Integration tests for descriptor loading and the in-memory sources.

use ormql_metadata::{
    AnnotationSource, Cardinality, DeferredCollection, EntityDescriptor, FieldRegistration,
    InMemoryAnnotationSource, InMemoryMetadataProvider, MetadataProvider, RawValue,
};
use serde_json::json;

#[test]
fn test_provider_from_json_descriptors() {
    let descriptors: Vec<EntityDescriptor> = serde_json::from_value(json!([
        {
            "class_name": "blog::Post",
            "scalar_fields": [
                { "field_name": "title", "storage_type": "string" },
                { "field_name": "published_at", "storage_type": "datetime" }
            ],
            "associations": [
                { "field_name": "comments", "target_class": "blog::Comment", "cardinality": "list" }
            ]
        },
        { "class_name": "blog::Comment" }
    ]))
    .unwrap();

    let provider = InMemoryMetadataProvider::from_descriptors(descriptors);
    assert_eq!(provider.entity_count(), 2);

    let post = provider.descriptor("blog::Post").unwrap();
    assert_eq!(post.scalar_fields[1].storage_type, "datetime");
    assert_eq!(post.associations[0].cardinality, Cardinality::List);

    let comment = provider.descriptor("blog::Comment").unwrap();
    assert!(comment.scalar_fields.is_empty());
    assert!(comment.associations.is_empty());
}

#[test]
fn test_registration_defaults_to_method_name() {
    let source = InMemoryAnnotationSource::new()
        .register("blog::Post", FieldRegistration::new("wordCount", "integer"))
        .register(
            "blog::Post",
            FieldRegistration::new("relatedPosts", "Post").named("related").list(),
        );

    let regs = source.field_registrations("blog::Post");
    assert_eq!(regs[0].field_name(), "wordCount");
    assert_eq!(regs[1].field_name(), "related");
    assert!(regs[1].is_list);
}

#[test]
fn test_deferred_collection_loads_once() {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    let loads = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&loads);
    let collection = DeferredCollection::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        vec![RawValue::from(1), RawValue::from(2)]
    });
    let shared = collection.clone();

    assert!(!collection.is_loaded());
    assert_eq!(collection.materialize().len(), 2);
    assert_eq!(shared.materialize()[1], RawValue::from(2));
    assert_eq!(loads.load(Ordering::SeqCst), 1);

    assert_eq!(
        RawValue::Collection(collection).to_json(),
        json!([1, 2])
    );
}
