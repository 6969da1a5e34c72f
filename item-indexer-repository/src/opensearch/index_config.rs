//! OpenSearch index configuration and mappings.
//!
//! This module defines the index settings and mappings for the item search index.

use serde_json::{json, Value};

/// The default name of the item search index.
pub const DEFAULT_INDEX_NAME: &str = "items";

/// Names of the dimension fields, in mapping order.
pub const DIMENSION_FIELDS: [&str; 8] = [
    "height",
    "width",
    "depth",
    "weight",
    "length",
    "diameter",
    "volume",
    "thickness",
];

/// Configuration for the search index.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// The index name used for all operations.
    pub name: String,
}

impl IndexConfig {
    /// Create a new index configuration.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self::new(DEFAULT_INDEX_NAME)
    }
}

/// Analyzed text in both locales, with an exact-match `keyword` sub-field.
fn localized_text_with_keyword() -> Value {
    json!({
        "properties": {
            "en": {
                "type": "text",
                "analyzer": "english",
                "fields": { "keyword": { "type": "keyword" } }
            },
            "fr": {
                "type": "text",
                "analyzer": "french",
                "fields": { "keyword": { "type": "keyword" } }
            }
        }
    })
}

fn localized_price() -> Value {
    json!({
        "properties": {
            "amount": { "type": "double" },
            "currency": { "type": "keyword" }
        }
    })
}

/// Get the index settings and mappings for the item search index.
///
/// The mapping is strict: a document carrying a field not listed here is
/// rejected by the backend instead of extending the mapping.
///
/// # Sharding Configuration
///
/// - 1 primary shard
/// - 1 replica for redundancy
pub fn get_index_settings() -> Value {
    let dimensions: serde_json::Map<String, Value> = DIMENSION_FIELDS
        .iter()
        .map(|field| (field.to_string(), json!({ "type": "double" })))
        .collect();

    json!({
        "settings": {
            "number_of_shards": 1,
            "number_of_replicas": 1
        },
        "mappings": {
            "dynamic": "strict",
            "properties": {
                "timestamp": { "type": "long" },
                "source": { "type": "keyword" },
                "urls": {
                    "properties": {
                        "en": { "type": "text" },
                        "fr": { "type": "text" }
                    }
                },
                "name": localized_text_with_keyword(),
                "description": {
                    "properties": {
                        "en": { "type": "text", "analyzer": "english" },
                        "fr": { "type": "text", "analyzer": "french" }
                    }
                },
                "categories": localized_text_with_keyword(),
                "image_urls": { "type": "text" },
                "dimensions": { "properties": dimensions },
                "price": {
                    "properties": {
                        "en": localized_price(),
                        "fr": localized_price()
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use item_indexer_shared::proto::{DimensionName, Lang};
    use item_indexer_shared::{IndexDocument, Localized, PriceValue};

    #[test]
    fn test_index_settings_structure() {
        let settings = get_index_settings();

        assert_eq!(settings["settings"]["number_of_shards"], 1);
        assert_eq!(settings["settings"]["number_of_replicas"], 1);
        assert_eq!(settings["mappings"]["dynamic"], "strict");

        let properties = &settings["mappings"]["properties"];
        assert_eq!(properties["timestamp"]["type"], "long");
        assert_eq!(properties["source"]["type"], "keyword");
        assert_eq!(properties["image_urls"]["type"], "text");
        assert_eq!(properties["urls"]["properties"]["fr"]["type"], "text");
    }

    #[test]
    fn test_localized_text_fields() {
        let settings = get_index_settings();
        let properties = &settings["mappings"]["properties"];

        for field in ["name", "categories"] {
            assert_eq!(properties[field]["properties"]["en"]["analyzer"], "english");
            assert_eq!(properties[field]["properties"]["fr"]["analyzer"], "french");
            assert_eq!(
                properties[field]["properties"]["en"]["fields"]["keyword"]["type"],
                "keyword"
            );
        }

        assert_eq!(properties["description"]["properties"]["fr"]["analyzer"], "french");
        assert!(properties["description"]["properties"]["fr"]
            .get("fields")
            .is_none());
    }

    #[test]
    fn test_dimension_and_price_fields() {
        let settings = get_index_settings();
        let properties = &settings["mappings"]["properties"];

        let dimensions = properties["dimensions"]["properties"].as_object().unwrap();
        assert_eq!(dimensions.len(), 8);
        for field in DIMENSION_FIELDS {
            assert_eq!(dimensions[field]["type"], "double");
        }

        for locale in ["en", "fr"] {
            let price = &properties["price"]["properties"][locale]["properties"];
            assert_eq!(price["amount"]["type"], "double");
            assert_eq!(price["currency"]["type"], "keyword");
        }
    }

    /// Every field of the document must be mapped, or the strict mapping
    /// rejects the write.
    fn assert_mapped(document: &Value, mapping: &Value, path: &str) {
        let Some(fields) = document.as_object() else {
            return;
        };
        for (key, value) in fields {
            let field_path = format!("{}{}", path, key);
            let field_mapping = &mapping["properties"][key.as_str()];
            assert!(!field_mapping.is_null(), "{} is not mapped", field_path);
            if field_mapping.get("type").is_none() {
                assert_mapped(value, field_mapping, &format!("{}.", field_path));
            }
        }
    }

    #[test]
    fn test_mapping_covers_item_document() {
        let mut document = IndexDocument::new(1_700_000_000, "ikea", vec!["a.jpg".to_string()]);
        for lang in [Lang::En, Lang::Fr] {
            let mut localized = IndexDocument::new(0, "", vec![]);
            localized.urls = Localized::new(lang, vec!["https://ikea.com".to_string()]);
            localized.name = Localized::new(lang, "Chair".to_string());
            localized.description = Localized::new(lang, "Wooden".to_string());
            localized.categories = Localized::new(lang, vec!["Chairs".to_string()]);
            localized.price = Some(Localized::new(
                lang,
                PriceValue {
                    amount: 10.0,
                    currency: "EUR".to_string(),
                },
            ));

            let document_json = serde_json::to_value(&localized).unwrap();
            assert_mapped(&document_json, &get_index_settings()["mappings"], "");
        }
        for (index, name) in [
            DimensionName::Height,
            DimensionName::Width,
            DimensionName::Depth,
            DimensionName::Weight,
            DimensionName::Length,
            DimensionName::Diameter,
            DimensionName::Volume,
            DimensionName::Thickness,
        ]
        .into_iter()
        .enumerate()
        {
            document.dimensions.set(name, index as f64);
        }

        let document_json = serde_json::to_value(&document).unwrap();
        assert_eq!(document_json["dimensions"].as_object().unwrap().len(), 8);
        assert_mapped(&document_json, &get_index_settings()["mappings"], "");
    }

    #[test]
    fn test_index_name() {
        assert_eq!(IndexConfig::default().name, "items");
        assert_eq!(IndexConfig::new("items_test").name, "items_test");
    }
}
