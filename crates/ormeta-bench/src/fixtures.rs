//! Synthetic schema generation for benchmarks.
//!
//! Generators are seeded so every run resolves the same schema.

use ormeta_core::{p, EntitySchema, Value};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Scale factor for generated schemas.
#[derive(Clone, Copy, Debug, Default)]
pub enum Scale {
    /// A handful of entities, for quick iteration.
    Tiny,
    /// Roughly the size of a small application.
    Small,
    /// A large application schema.
    #[default]
    Medium,
    /// Stress size.
    Large,
}

impl Scale {
    /// Number of concrete entities generated.
    pub fn entity_count(&self) -> usize {
        match self {
            Scale::Tiny => 8,
            Scale::Small => 50,
            Scale::Medium => 300,
            Scale::Large => 2_000,
        }
    }

    /// Scalar fields per entity.
    pub fn fields_per_entity(&self) -> usize {
        match self {
            Scale::Tiny => 3,
            Scale::Small => 6,
            Scale::Medium | Scale::Large => 10,
        }
    }
}

const SEED: u64 = 12345;

fn entity_name(index: usize) -> String {
    format!("Entity{index}")
}

/// Generate a schema with inheritance, embeddables, enums and every
/// relation kind.
///
/// Every concrete entity extends an abstract `Base`. Entity `i > 0` holds a
/// many-to-one to an earlier entity (whose one-to-many inverse is added),
/// and every third entity declares an unhinted many-to-many so an inverse
/// gets synthesized.
pub fn generate_schema(scale: Scale) -> Vec<EntitySchema> {
    let mut rng = StdRng::seed_from_u64(SEED);
    let count = scale.entity_count();
    let scalar_types = ["string", "text", "integer", "bigint", "double", "boolean", "datetime"];

    let mut schemas = vec![
        EntitySchema::new("Base")
            .with_abstract()
            .with_property("id", p::integer().primary())
            .with_property("createdAt", p::datetime().on_create(|| Value::from("now")))
            .with_property("updatedAt", p::datetime().nullable(true)),
        EntitySchema::new("Address")
            .embeddable()
            .with_property("street", p::string())
            .with_property("city", p::string())
            .with_property("zip", p::string().nullable(true)),
    ];
    let offset = schemas.len();

    for i in 0..count {
        let mut schema = EntitySchema::new(entity_name(i)).extends("Base");
        for f in 0..scale.fields_per_entity() {
            let type_name = scalar_types[rng.gen_range(0..scalar_types.len())];
            let mut options = p::property(type_name);
            if rng.gen_bool(0.3) {
                options = options.nullable(true);
            }
            schema = schema.with_property(format!("field{f}"), options);
        }
        if rng.gen_bool(0.2) {
            schema = schema.with_property("address", p::embedded("Address"));
        }
        if rng.gen_bool(0.2) {
            schema = schema.with_property(
                "status",
                p::enumeration(["active", "inactive", "pending"]).with_default("active"),
            );
        }
        schemas.push(schema);
    }

    for i in 1..count {
        let j = rng.gen_range(0..i);
        let owner = entity_name(i);
        let property = format!("ref{j}");
        schemas[offset + i] = schemas[offset + i]
            .clone()
            .with_property(property.clone(), p::many_to_one(entity_name(j)).nullable(true));
        schemas[offset + j] = schemas[offset + j].clone().with_property(
            format!("{}_{property}", owner.to_lowercase()),
            p::one_to_many(owner, property),
        );

        if i % 3 == 0 {
            let k = rng.gen_range(0..i);
            schemas[offset + i] = schemas[offset + i]
                .clone()
                .with_property(format!("links{k}"), p::many_to_many(entity_name(k)));
        }
    }

    schemas
}
