//! The "graph of the gods" schema and sample dataset.

use crate::{
    provision::SchemaPlan,
    seed::{Dataset, EdgeSeed, VertexSeed},
    store::types::{
        CompositeIndex, DataType, EdgeLabel, ElementKind, GeoPoint, Multiplicity, PropertyKey,
    },
};

pub const NAME_KEY: &str = "name";
pub const AGE_KEY: &str = "age";
pub const TIMESTAMP_KEY: &str = "ts";

/// Present only once the dataset has been seeded.
pub const MARKER_NAME: &str = "saturn";
/// Target of the update cycles.
pub const UPDATE_TARGET: &str = "jupiter";
/// Removed during the draining stage.
pub const DELETE_TARGET: &str = "pluto";

pub const GODS_VERTEX_COUNT: usize = 12;
pub const GODS_EDGE_COUNT: usize = 17;

pub fn gods_schema() -> SchemaPlan {
    SchemaPlan {
        property_keys: vec![
            PropertyKey::new(NAME_KEY, DataType::String),
            PropertyKey::new(AGE_KEY, DataType::Integer),
            PropertyKey::new("time", DataType::Integer),
            PropertyKey::new("reason", DataType::String),
            PropertyKey::new("place", DataType::GeoPoint),
        ],
        vertex_labels: ["titan", "location", "god", "demigod", "human", "monster"]
            .into_iter()
            .map(String::from)
            .collect(),
        edge_labels: vec![
            EdgeLabel::new("father").with_multiplicity(Multiplicity::Many2One),
            EdgeLabel::new("mother").with_multiplicity(Multiplicity::Many2One),
            EdgeLabel::new("lives").with_signature(&["reason"]),
            EdgeLabel::new("pet"),
            EdgeLabel::new("brother"),
            EdgeLabel::new("battled"),
        ],
        indexes: vec![CompositeIndex::new(
            "nameIndex",
            ElementKind::Vertex,
            &[NAME_KEY],
        )],
    }
}

fn named(label: &str, name: &str, age: Option<i64>) -> VertexSeed {
    let mut seed = VertexSeed::new(name, label).property(NAME_KEY, name);
    if let Some(age) = age {
        seed = seed.property(AGE_KEY, age);
    }
    seed
}

fn battle(monster: &str, time: i64, lat: f64, lon: f64) -> EdgeSeed {
    EdgeSeed::new("hercules", "battled", monster)
        .property("time", time)
        .property("place", GeoPoint::new(lat, lon))
}

pub fn gods_dataset() -> Dataset {
    let vertices = vec![
        named("titan", MARKER_NAME, Some(10000)),
        named("location", "sky", None),
        named("location", "sea", None),
        named("god", UPDATE_TARGET, Some(5000)),
        named("god", "neptune", Some(4500)),
        named("demigod", "hercules", Some(30)),
        named("human", "alcmene", Some(45)),
        named("god", DELETE_TARGET, Some(4000)),
        named("monster", "nemean", None),
        named("monster", "hydra", None),
        named("monster", "cerberus", None),
        named("location", "tartarus", None),
    ];

    let edges = vec![
        EdgeSeed::new("jupiter", "father", "saturn"),
        EdgeSeed::new("jupiter", "lives", "sky").property("reason", "loves fresh breezes"),
        EdgeSeed::new("jupiter", "brother", "neptune"),
        EdgeSeed::new("jupiter", "brother", "pluto"),
        EdgeSeed::new("neptune", "lives", "sea").property("reason", "loves waves"),
        EdgeSeed::new("neptune", "brother", "jupiter"),
        EdgeSeed::new("neptune", "brother", "pluto"),
        EdgeSeed::new("hercules", "father", "jupiter"),
        EdgeSeed::new("hercules", "mother", "alcmene"),
        battle("nemean", 1, 38.1, 23.7),
        battle("hydra", 2, 37.7, 23.9),
        battle("cerberus", 12, 39.0, 22.0),
        EdgeSeed::new("pluto", "brother", "jupiter"),
        EdgeSeed::new("pluto", "brother", "neptune"),
        EdgeSeed::new("pluto", "lives", "tartarus").property("reason", "no fear of death"),
        EdgeSeed::new("pluto", "pet", "cerberus"),
        EdgeSeed::new("cerberus", "lives", "tartarus"),
    ];

    Dataset { vertices, edges }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dataset_counts_and_wiring_are_consistent() {
        let dataset = gods_dataset();
        assert_eq!(dataset.vertices.len(), GODS_VERTEX_COUNT);
        assert_eq!(dataset.edges.len(), GODS_EDGE_COUNT);
        assert!(dataset.validate().is_ok());
    }

    #[test]
    fn schema_declares_the_index_after_its_key() {
        let plan = gods_schema();
        assert_eq!(plan.relation_type_count(), 17);
        assert!(plan.property_keys.iter().any(|k| k.name == NAME_KEY));
        assert_eq!(plan.indexes[0].keys, vec![NAME_KEY.to_string()]);
    }
}
