//! Snapshot and fingerprint behavior over whole graphs.

use ormeta_core::{p, EntitySchema, GraphSnapshot, MetadataGraph};
use pretty_assertions::assert_eq;

fn schema(title_nullable: bool) -> Vec<EntitySchema> {
    vec![
        EntitySchema::new("Author")
            .with_property("id", p::integer().primary())
            .with_property("books", p::one_to_many("Book", "author")),
        EntitySchema::new("Book")
            .with_property("id", p::integer().primary())
            .with_property("title", p::string().nullable(title_nullable))
            .with_property("author", p::many_to_one("Author"))
            .with_property("tags", p::many_to_many("Tag")),
        EntitySchema::new("Tag").with_property("id", p::integer().primary()),
    ]
}

fn fingerprint(schemas: Vec<EntitySchema>) -> String {
    let mut graph = MetadataGraph::new();
    graph.register_all(schemas).unwrap();
    graph.finalize().unwrap().fingerprint().unwrap()
}

#[test]
fn test_fingerprint_tracks_declarations() {
    assert_eq!(fingerprint(schema(false)), fingerprint(schema(false)));
    assert_ne!(fingerprint(schema(false)), fingerprint(schema(true)));
}

#[test]
fn test_snapshot_survives_encoding() {
    let mut graph = MetadataGraph::new();
    graph.register_all(schema(false)).unwrap();
    let snapshot = graph.finalize().unwrap().snapshot();

    let decoded = GraphSnapshot::from_bytes(&snapshot.to_bytes().unwrap()).unwrap();
    assert_eq!(decoded, snapshot);

    let tag = decoded.entity("Tag").unwrap();
    let inverse = tag.property("book_tags").unwrap();
    assert!(inverse.synthesized);
    assert_eq!(inverse.target.as_deref(), Some("Book"));
    assert_eq!(inverse.mapped_by.as_deref(), Some("tags"));
    assert_eq!(inverse.shape, "Collection<Book>");

    let author = decoded.entity("Book").and_then(|e| e.property("author")).unwrap();
    assert_eq!(author.shape, "Author");
}
