//! End-to-end build tests
//!
//! Builds relational and document schemas from the JSON fixtures and checks
//! the emitted shapes, their stability, and that document schemas validate
//! real documents.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use jsonschema::{Draft, JSONSchema};
use serde_json::{json, Value};

use dictschema::config::CollectionConfig;
use dictschema::{
    BuildConfig, ContentClassifier, DictionaryModel, DictionarySnapshot, InstanceCoverage,
    ItemName, LocatorSet, Profile, Providers, SchemaBuilder, SchemaDefinition, TargetProfile,
};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

fn widget_dictionary() -> DictionarySnapshot {
    DictionarySnapshot::from_json(include_str!("fixtures/widget_dictionary.json")).unwrap()
}

fn catalog_dictionary() -> DictionarySnapshot {
    DictionarySnapshot::from_json(include_str!("fixtures/catalog_dictionary.json")).unwrap()
}

fn catalog_config() -> BuildConfig {
    BuildConfig::from_toml_str(include_str!("fixtures/catalog.toml")).unwrap()
}

fn widget_config() -> BuildConfig {
    let mut config = BuildConfig::default();
    config.content.strict_relations = true;
    config
        .collections
        .insert("widgets".to_string(), CollectionConfig::default());
    config
}

fn relational(dict: &DictionarySnapshot, config: &BuildConfig, target: TargetProfile) -> SchemaDefinition {
    let coverage = InstanceCoverage::bypass();
    SchemaBuilder::new(dict, &coverage, config)
        .unwrap()
        .build_relational(target)
        .unwrap()
}

fn document(dict: &DictionarySnapshot, config: &BuildConfig, target: TargetProfile, collection: &str) -> Value {
    let coverage = InstanceCoverage::bypass();
    SchemaBuilder::new(dict, &coverage, config)
        .unwrap()
        .build_document(target, collection)
        .unwrap()
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn test_widget_sql_unique_index_without_enumeration() {
    let def = relational(&widget_dictionary(), &widget_config(), TargetProfile::Sql);
    let widget = &def.schemas["WIDGET"];
    assert_eq!(widget.indices["p1"].attributes, vec!["WIDGET_ID"]);
    assert!(widget.attribute_info["COLOR"].enumeration.is_none());

    let json = serde_json::to_value(&def).unwrap();
    assert_eq!(json["schemas"]["WIDGET"]["indices"]["p1"]["type"], "UNIQUE");
    assert!(json["schemas"]["WIDGET"]["attributeInfo"]["COLOR"]
        .get("enumeration")
        .is_none());
}

#[test]
fn test_widget_json_color_enumeration() {
    let schema = document(&widget_dictionary(), &widget_config(), TargetProfile::Json, "widgets");
    assert_eq!(
        schema["properties"]["color"],
        json!({ "type": "string", "enum": ["blue", "green", "red"] })
    );
}

#[test]
fn test_int_range_boundaries() {
    let dict = catalog_dictionary();
    let config = catalog_config();
    let model = ContentClassifier::new(&dict, &config.content).classify().unwrap();
    let features = serde_json::to_value(model.attribute("item", "quantity_range").unwrap()).unwrap();
    assert_eq!(features["MIN_VALUE"], 0);
    assert_eq!(features["MAX_VALUE_EXCLUSIVE"], 100);
    assert!(features.get("MIN_VALUE_EXCLUSIVE").is_none());
    assert!(features.get("MAX_VALUE").is_none());
}

#[test]
fn test_iterable_delimiters_and_array_schema() {
    let dict = catalog_dictionary();
    let config = catalog_config();
    let model = ContentClassifier::new(&dict, &config.content).classify().unwrap();
    let tags = serde_json::to_value(model.attribute("item", "tags").unwrap()).unwrap();
    assert_eq!(tags["ITERABLE_DELIMITER"], ",");
    let aliases = model.attribute("item", "aliases").unwrap();
    assert_eq!(aliases.iterable_delimiter.as_deref(), Some(";"));

    let schema = document(&dict, &config, TargetProfile::Json, "items");
    assert_eq!(
        schema["properties"]["tags"],
        json!({ "type": "array", "items": { "type": "string" }, "uniqueItems": true })
    );

    let def = relational(&dict, &config, TargetProfile::Sql);
    assert_eq!(
        def.schemas["ITEM"].attribute_info["ALIASES"].iterable_delimiter.as_deref(),
        Some(";")
    );
}

// =============================================================================
// Properties
// =============================================================================

#[test]
fn test_unique_index_is_sorted_key_list() {
    let dict = catalog_dictionary();
    let config = catalog_config();
    let profile = Profile::new(TargetProfile::Sql, &config);
    let def = relational(&dict, &config, TargetProfile::Sql);
    assert_eq!(def.schemas["ITEM"].indices["p1"].attributes, vec!["CATALOG_ID", "ID"]);
    assert_eq!(
        def.schemas["ITEM_PART"].indices["p1"].attributes,
        vec!["CATALOG_ID", "ITEM_ID", "PART_NO"]
    );
    for category in ["catalog", "catalog_stats", "item", "item_part", "shipment"] {
        let mut natural: Vec<String> = dict
            .category_key_list(category)
            .into_iter()
            .map(|k| k.attribute)
            .collect();
        natural.sort();
        let expected: Vec<String> = natural.iter().map(|a| profile.id(a)).collect();
        let schema = &def.schemas[&profile.id(category)];
        assert_eq!(schema.indices["p1"].attributes, expected, "{} key index", category);
    }
}

#[test]
fn test_merge_index_round_trip() {
    let dict = catalog_dictionary();
    let config = catalog_config();
    let profile = Profile::new(TargetProfile::Sql, &config);
    let def = relational(&dict, &config, TargetProfile::Sql);

    for schema in def.schemas.values() {
        assert_eq!(schema.map_merge_indices.len(), 1);
        let (category, merge) = schema.map_merge_indices.iter().next().unwrap();
        assert_eq!(merge.join_type, "EQUI-JOIN");

        let mut natural: Vec<String> = dict
            .category_key_list(category)
            .into_iter()
            .map(|k| k.attribute)
            .collect();
        natural.sort();
        assert_eq!(merge.attributes, natural);

        let p1 = &schema.indices["p1"].attributes;
        assert_eq!(p1.len(), merge.attributes.len());
        for (id, name) in p1.iter().zip(&merge.attributes) {
            assert_eq!(*id, profile.id(name), "{} p1 out of step with merge index", category);
        }
        assert_eq!(profile.id(category), schema.schema_id);
    }

    // converted ids sort differently from the natural names
    let shipment = &def.schemas["SHIPMENT"];
    assert_eq!(shipment.map_merge_indices["shipment"].attributes, vec!["order", "status"]);
    assert_eq!(shipment.indices["p1"].attributes, vec!["THE_ORDER", "STATUS"]);
}

#[test]
fn test_unobserved_text_stays_bounded() {
    let dict = catalog_dictionary();
    let def = relational(&dict, &catalog_config(), TargetProfile::Sql);
    let notes = &def.schemas["SHIPMENT"].attribute_info["NOTES"];
    assert_eq!(notes.type_name, "char");
    assert_eq!(notes.width, 200);
}

#[test]
fn test_builds_are_byte_identical() {
    let dict = catalog_dictionary();
    let config = catalog_config();
    let coverage = InstanceCoverage::from_json(include_str!("fixtures/catalog_coverage.json")).unwrap();

    for (target, collection) in [
        (TargetProfile::Sql, None),
        (TargetProfile::Any, None),
        (TargetProfile::Json, Some("catalog_full")),
        (TargetProfile::Bson, Some("catalog_slice")),
    ] {
        let first = SchemaBuilder::new(&dict, &coverage, &config)
            .unwrap()
            .build(target, collection)
            .unwrap();
        let second = SchemaBuilder::new(&dict, &coverage, &config)
            .unwrap()
            .build(target, collection)
            .unwrap();
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }
}

#[test]
fn test_slice_closure_completeness() {
    let dict = catalog_dictionary();
    let config = catalog_config();
    let coverage = InstanceCoverage::bypass();
    let builder = SchemaBuilder::new(&dict, &coverage, &config).unwrap();
    let view = builder.slices().get("catalog").unwrap();

    let root = ItemName::new("catalog", "id");
    let descendants = dict.full_descendant_list(&root);
    assert_eq!(descendants.len(), 3);
    for child in descendants {
        let buckets: Vec<&String> = view
            .categories
            .iter()
            .filter(|(_, links)| links.iter().any(|l| l.child_attribute == child.attribute))
            .map(|(cat, _)| cat)
            .filter(|cat| **cat == child.category)
            .collect();
        assert_eq!(buckets.len(), 1, "{} not in exactly one bucket", child);
    }
    assert_eq!(view.children("catalog").len(), 1);
    assert_eq!(view.children("item_part")[0].parent_category, "catalog");

    let expected: BTreeSet<String> = ["catalog", "catalog_stats"].iter().map(|s| s.to_string()).collect();
    assert_eq!(view.unit_cardinality, expected);
}

// =============================================================================
// Documents
// =============================================================================

#[test]
fn test_slice_collection_cardinality() {
    let schema = document(&catalog_dictionary(), &catalog_config(), TargetProfile::Json, "catalog_slice");
    assert_eq!(schema["properties"]["catalog"]["type"], "object");
    assert_eq!(schema["properties"]["catalog_stats"]["type"], "object");
    assert_eq!(schema["properties"]["item"]["type"], "array");
    assert_eq!(schema["properties"]["item_part"]["type"], "array");
    assert_eq!(schema["required"], json!(["catalog"]));
    assert_eq!(schema["$comment"], "schema_version: 2.1.0");
}

#[test]
fn test_document_schema_validates_documents() {
    let schema = document(&catalog_dictionary(), &catalog_config(), TargetProfile::Json, "catalog_full");
    let compiled = JSONSchema::options()
        .with_draft(Draft::Draft4)
        .compile(&schema)
        .expect("schema should compile");

    let valid = json!({
        "catalog": [{ "id": "c1", "title": "Spring" }],
        "item": [{ "catalog_id": "c1", "id": "i1", "tags": ["a", "b"], "weight": 2.5, "finish": "matte" }]
    });
    assert!(compiled.is_valid(&valid));

    let cases = [
        json!({ "item": [{ "catalog_id": "c1", "id": "i1" }] }),
        json!({ "catalog": [] }),
        json!({ "catalog": [{ "title": "No id" }] }),
        json!({ "catalog": [{ "id": "c1", "colour": "red" }] }),
        json!({ "catalog": [{ "id": "c1" }], "item": [{ "catalog_id": "c1", "id": "i1", "weight": 0.0 }] }),
        json!({ "catalog": [{ "id": "c1" }], "item": [{ "catalog_id": "c1", "id": "i1", "tags": ["a", "a"] }] }),
        json!({ "catalog": [{ "id": "c1" }], "item": [{ "catalog_id": "c1", "id": "i1", "finish": "satin" }] }),
    ];
    for case in &cases {
        assert!(!compiled.is_valid(case), "should reject {}", case);
    }
}

#[test]
fn test_document_descriptions_and_examples() {
    let schema = document(&catalog_dictionary(), &catalog_config(), TargetProfile::Json, "catalog_full");
    let title = &schema["properties"]["catalog"]["items"]["properties"]["title"];
    assert_eq!(title["description"], "Display title of the catalog.");
    assert_eq!(title["examples"], json!(["Spring 2024"]));
    assert_eq!(schema["title"], "schema: catalog collection: catalog_full version: 2.0.0");
}

// =============================================================================
// Providers and coverage
// =============================================================================

#[test]
fn test_coverage_revises_widths_and_filters() {
    let dict = catalog_dictionary();
    let config = catalog_config();
    let coverage = InstanceCoverage::from_json(include_str!("fixtures/catalog_coverage.json")).unwrap();
    let def = SchemaBuilder::new(&dict, &coverage, &config)
        .unwrap()
        .build_relational(TargetProfile::Sql)
        .unwrap();

    let ids: Vec<&String> = def.schemas.keys().collect();
    assert_eq!(ids, vec!["CATALOG", "ITEM"]);

    let item = &def.schemas["ITEM"];
    assert_eq!(item.attribute_info["ID"].width, 48);
    assert_eq!(item.attribute_info["TAGS"].width, 360);
    assert_eq!(item.attribute_info["WEIGHT"].precision, 3);
    assert!(!item.attributes.contains_key("QUANTITY_RANGE"));
    assert_eq!(def.schemas["CATALOG"].attribute_info["TITLE"].width, 144);
}

#[test]
fn test_providers_load_fixture_files_once() {
    let providers = Providers::new();
    let dictionaries = LocatorSet::from_paths(&[fixture("catalog_dictionary.json")]);
    let first = providers.dictionary(&dictionaries).unwrap();
    let second = providers.dictionary(&dictionaries).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.bundle_hash().len(), 64);

    let coverage = providers
        .coverage(&LocatorSet::from_paths(&[fixture("catalog_coverage.json")]))
        .unwrap();
    assert!(!coverage.is_bypass());
}

#[test]
fn test_session_from_config_locators() {
    let mut config = catalog_config();
    config.database.dictionary = vec![fixture("catalog_dictionary.json").display().to_string()];
    let session = Providers::new().session(&config).unwrap();
    let builder = SchemaBuilder::from_session(&session, &config).unwrap();
    let def = builder.build_relational(TargetProfile::Sql).unwrap();
    assert_eq!(def.database_name, "catalog");
    assert_eq!(def.schemas.len(), 5);
    assert_eq!(def.slice_parent_items["catalog"][0].category, "CATALOG");
}
