//! Integration tests for the declaration front-ends: JSON documents,
//! builder factories and property groups.

use ormeta_core::{
    define_properties, p, EntitySchema, MetadataError, MetadataGraph, PropertyKind, Record,
    SchemaDocument, Value,
};
use pretty_assertions::assert_eq;

const PUBLISHER_DOCUMENT: &str = r#"{
  "entities": [
    {
      "name": "BaseEntity5",
      "abstract": true,
      "properties": {
        "id": { "type": "integer", "primary": true },
        "createdAt": { "type": "Date" },
        "updatedAt": { "type": "datetime", "nullable": true }
      }
    },
    {
      "name": "Publisher4",
      "extends": "BaseEntity5",
      "properties": {
        "name": { "type": "string", "default": "asd" },
        "type": { "enum": true, "items": ["local", "global"], "default": "local" },
        "enum3": { "enum": true, "items": [1, 2, 3], "nullable": true },
        "books": { "kind": "1:m", "entity": "Book4", "mappedBy": "publisher" },
        "tests": { "kind": "m:n", "entity": "Test4", "fixedOrder": true }
      }
    },
    {
      "name": "Book4",
      "extends": "BaseEntity5",
      "properties": {
        "title": { "type": "string" },
        "publisher": { "kind": "m:1", "entity": "Publisher4", "nullable": true, "deleteRule": "set null" }
      }
    },
    {
      "name": "Test4",
      "properties": {
        "id": { "type": "integer", "primary": true },
        "name": { "type": "string", "nullable": true }
      }
    }
  ]
}"#;

#[test]
fn test_json_document_resolves() {
    let mut graph = MetadataGraph::new();
    graph.register_json(PUBLISHER_DOCUMENT).unwrap();
    let graph = graph.finalize().unwrap();

    let publisher = graph.entity("Publisher4").unwrap();
    let names: Vec<_> = publisher.properties.keys().map(String::as_str).collect();
    assert_eq!(
        names,
        vec!["id", "createdAt", "updatedAt", "name", "type", "enum3", "books", "tests"]
    );
    assert_eq!(publisher.primary_keys, vec!["id".to_string()]);

    let kind = publisher.property("type").unwrap();
    assert_eq!(kind.kind, PropertyKind::Enum);
    assert!(kind.is_optional_on_input());
    assert!(kind.enumeration.as_ref().unwrap().contains(&Value::from("global")));

    let created_at = publisher.property("createdAt").unwrap();
    assert_eq!(created_at.scalar_type.as_ref().map(|t| t.name()), Some("datetime"));
    assert_eq!(created_at.declared_by, "BaseEntity5");

    let books = publisher.property("books").unwrap();
    assert!(!books.owner());
    assert_eq!(books.mapped_by(), Some("publisher"));

    let tests = publisher.property("tests").unwrap();
    assert!(tests.owner());
    assert!(tests.relation.as_ref().is_some_and(|r| r.fixed_order));
    let inverse = graph.entity("Test4").and_then(|e| e.property("publisher4_tests")).unwrap();
    assert!(inverse.synthesized);

    let publisher_ref = graph.entity("Book4").and_then(|e| e.property("publisher")).unwrap();
    assert!(publisher_ref.owner());
    assert_eq!(publisher_ref.inversed_by(), Some("books"));
}

#[test]
fn test_json_rejects_unknown_options() {
    let err = EntitySchema::from_json(
        r#"{ "name": "Foo", "properties": { "id": { "type": "integer", "primry": true } } }"#,
    )
    .unwrap_err();

    assert!(matches!(err, MetadataError::Declaration(_)));
}

#[test]
fn test_json_and_builder_agree() {
    let document = SchemaDocument::from_json(PUBLISHER_DOCUMENT).unwrap();
    let mut from_json = MetadataGraph::new();
    from_json.register_document(document).unwrap();

    let mut from_builder = MetadataGraph::new();
    from_builder
        .register_all([
            EntitySchema::new("BaseEntity5")
                .with_abstract()
                .with_property("id", p::integer().primary())
                .with_property("createdAt", p::property("Date"))
                .with_property("updatedAt", p::datetime().nullable(true)),
            EntitySchema::new("Publisher4")
                .extends("BaseEntity5")
                .with_property("name", p::string().with_default("asd"))
                .with_property(
                    "type",
                    p::enumeration(["local", "global"]).with_default("local"),
                )
                .with_property("enum3", p::enumeration([1, 2, 3]).nullable(true))
                .with_property("books", p::one_to_many("Book4", "publisher"))
                .with_property("tests", p::many_to_many("Test4").fixed_order()),
            EntitySchema::new("Book4")
                .extends("BaseEntity5")
                .with_property("title", p::string())
                .with_property(
                    "publisher",
                    p::many_to_one("Publisher4").nullable(true).delete_rule("set null"),
                ),
            EntitySchema::new("Test4")
                .with_property("id", p::integer().primary())
                .with_property("name", p::string().nullable(true)),
        ])
        .unwrap();

    let json_graph = from_json.finalize().unwrap();
    let builder_graph = from_builder.finalize().unwrap();
    assert_eq!(json_graph.snapshot(), builder_graph.snapshot());
    assert_eq!(
        json_graph.fingerprint().unwrap(),
        builder_graph.fingerprint().unwrap()
    );
}

#[test]
fn test_composition_with_property_groups() {
    let with_created_at = EntitySchema::new("WithCreatedAt")
        .with_abstract()
        .with_property("createdAt", p::datetime().on_create(|| Value::from("created")));
    let with_id = define_properties([("id", p::integer().primary())]);
    let with_updated_at = define_properties([(
        "updatedAt",
        p::datetime()
            .on_create(|| Value::from("created"))
            .on_update(|| Value::from("updated")),
    )]);
    let with_deleted_at = define_properties([("deletedAt", p::datetime().nullable(true))]);

    let composed = EntitySchema::new("Composed")
        .with_group(with_id)
        .with_group(with_created_at.property_group())
        .with_group(with_updated_at)
        .with_group(with_deleted_at);
    let foo = EntitySchema::new("Foo")
        .with_group(with_created_at.property_group())
        .with_property("id", p::integer().primary())
        .with_property("byDefault", p::text().with_default("foo"));

    let mut graph = MetadataGraph::new();
    graph.register_all([with_created_at, foo, composed]).unwrap();
    let graph = graph.finalize().unwrap();

    let composed = graph.entity("Composed").unwrap();
    let names: Vec<_> = composed.properties.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["id", "createdAt", "updatedAt", "deletedAt"]);
    assert!(composed.properties.values().all(|p| p.declared_by == "Composed"));

    let created = composed.prepare_create(Record::new()).unwrap();
    assert_eq!(created.get("createdAt"), Some(&Value::from("created")));
    assert_eq!(created.get("updatedAt"), Some(&Value::from("created")));
    assert_eq!(created.get("deletedAt"), Some(&Value::Null));
    assert!(!created.contains_key("id"));

    let foo = graph.entity("Foo").unwrap();
    let created = foo.prepare_create(Record::new()).unwrap();
    assert_eq!(created.get("byDefault"), Some(&Value::from("foo")));

    let tables: Vec<_> = graph.tables().map(|e| e.name.as_str()).collect();
    assert_eq!(tables, vec!["Foo", "Composed"]);
}

#[test]
fn test_later_declaration_overrides_in_place() {
    let schema = EntitySchema::new("Foo")
        .with_property("id", p::integer().primary())
        .with_property("name", p::string())
        .with_property("age", p::integer())
        .with_property("name", p::text().nullable(true));

    let names: Vec<_> = schema.properties.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["id", "name", "age"]);

    let mut graph = MetadataGraph::new();
    graph.register(schema).unwrap();
    let graph = graph.finalize().unwrap();
    let name = graph.entity("Foo").and_then(|e| e.property("name")).unwrap();
    assert!(name.nullable);
    assert_eq!(name.scalar_type.as_ref().map(|t| t.name()), Some("text"));
}

#[test]
fn test_embedded_flattening() {
    let mut graph = MetadataGraph::new();
    graph
        .register_all([
            EntitySchema::new("Geo")
                .embeddable()
                .with_property("lat", p::double())
                .with_property("lng", p::double()),
            EntitySchema::new("Address")
                .embeddable()
                .with_property("city", p::string())
                .with_property("geo", p::embedded("Geo").prefix("g_")),
            EntitySchema::new("Shop")
                .with_property("id", p::integer().primary())
                .with_property("address", p::embedded("Address")),
        ])
        .unwrap();
    let graph = graph.finalize().unwrap();

    let columns: Vec<_> = graph
        .flatten_embedded("Shop")
        .into_iter()
        .map(|c| c.column)
        .collect();
    assert_eq!(columns, vec!["id", "address_city", "address_g_lat", "address_g_lng"]);
}

#[test]
fn test_embedded_cycle_rejected() {
    let mut graph = MetadataGraph::new();
    graph
        .register_all([
            EntitySchema::new("A").embeddable().with_property("b", p::embedded("B")),
            EntitySchema::new("B").embeddable().with_property("a", p::embedded("A")),
        ])
        .unwrap();

    let err = graph.finalize().unwrap_err();
    assert!(err
        .validation_errors()
        .iter()
        .all(|e| e.to_string().contains("creates a cycle")));
    assert!(!err.validation_errors().is_empty());
}
