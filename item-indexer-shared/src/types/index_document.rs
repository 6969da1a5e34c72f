//! Item document types for the search index.
//!
//! This module defines the document structure that is indexed in the search engine.

use serde::{Deserialize, Serialize};

use crate::proto::{DimensionName, Lang};

/// Build the search index identifier for an item.
///
/// Uses format: `{source}-{id}`.
pub fn document_id(source: &str, id: &str) -> String {
    format!("{}-{}", source, id)
}

/// A value stored under the key of the locale it is written in.
///
/// Only the slot of the item's locale is present; the other one is omitted
/// from the serialized document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Localized<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub en: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fr: Option<T>,
}

impl<T> Localized<T> {
    /// A value with no locale populated.
    pub fn empty() -> Self {
        Self { en: None, fr: None }
    }

    /// A value populated for a single locale.
    pub fn new(lang: Lang, value: T) -> Self {
        match lang {
            Lang::En => Self {
                en: Some(value),
                fr: None,
            },
            Lang::Fr => Self {
                en: None,
                fr: Some(value),
            },
        }
    }

    /// Value stored for the given locale, if any.
    pub fn get(&self, lang: Lang) -> Option<&T> {
        match lang {
            Lang::En => self.en.as_ref(),
            Lang::Fr => self.fr.as_ref(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.en.is_none() && self.fr.is_none()
    }
}

impl<T> Default for Localized<T> {
    fn default() -> Self {
        Self::empty()
    }
}

/// Price of an item in one locale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceValue {
    pub amount: f64,
    pub currency: String,
}

/// Physical dimensions of an item, normalized to their canonical unit.
///
/// Each field is set only when the source item carried that dimension.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diameter: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thickness: Option<f64>,
}

impl Dimensions {
    /// Set the value of a dimension, replacing any previous value.
    pub fn set(&mut self, name: DimensionName, value: f64) {
        *self.slot_mut(name) = Some(value);
    }

    pub fn get(&self, name: DimensionName) -> Option<f64> {
        match name {
            DimensionName::Height => self.height,
            DimensionName::Width => self.width,
            DimensionName::Depth => self.depth,
            DimensionName::Weight => self.weight,
            DimensionName::Length => self.length,
            DimensionName::Diameter => self.diameter,
            DimensionName::Volume => self.volume,
            DimensionName::Thickness => self.thickness,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn slot_mut(&mut self, name: DimensionName) -> &mut Option<f64> {
        match name {
            DimensionName::Height => &mut self.height,
            DimensionName::Width => &mut self.width,
            DimensionName::Depth => &mut self.depth,
            DimensionName::Weight => &mut self.weight,
            DimensionName::Length => &mut self.length,
            DimensionName::Diameter => &mut self.diameter,
            DimensionName::Volume => &mut self.volume,
            DimensionName::Thickness => &mut self.thickness,
        }
    }
}

/// Document representation for the search index.
///
/// # Fields
///
/// - `timestamp`: Write time, in seconds since the Unix epoch
/// - `source`: Identifier of the producer of the item
/// - `urls`, `name`, `description`, `categories`: Locale-keyed text fields
/// - `image_urls`: Image URLs, in source order
/// - `dimensions`: Normalized physical dimensions
/// - `price`: Locale-keyed price, absent when the item has none
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDocument {
    pub timestamp: i64,
    pub source: String,
    #[serde(default)]
    pub urls: Localized<Vec<String>>,
    #[serde(default)]
    pub name: Localized<String>,
    #[serde(default)]
    pub description: Localized<String>,
    #[serde(default)]
    pub categories: Localized<Vec<String>>,
    #[serde(default)]
    pub image_urls: Vec<String>,
    #[serde(default)]
    pub dimensions: Dimensions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Localized<PriceValue>>,
}

impl IndexDocument {
    /// Create a document with no locale-specific field populated.
    pub fn new(timestamp: i64, source: impl Into<String>, image_urls: Vec<String>) -> Self {
        Self {
            timestamp,
            source: source.into(),
            urls: Localized::empty(),
            name: Localized::empty(),
            description: Localized::empty(),
            categories: Localized::empty(),
            image_urls,
            dimensions: Dimensions::default(),
            price: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_document_id() {
        assert_eq!(document_id("ikea", "40299687"), "ikea-40299687");
        assert_eq!(document_id("", ""), "-");
    }

    #[test]
    fn test_localized_populates_one_slot() {
        let value = Localized::new(Lang::En, "Chair".to_string());
        assert_eq!(value.get(Lang::En), Some(&"Chair".to_string()));
        assert!(value.get(Lang::Fr).is_none());

        let value = Localized::new(Lang::Fr, "Chaise".to_string());
        assert!(value.en.is_none());
        assert_eq!(value.fr.as_deref(), Some("Chaise"));
    }

    #[test]
    fn test_absent_locale_is_omitted() {
        let value = Localized::new(Lang::Fr, "Chaise".to_string());
        assert_eq!(serde_json::to_value(&value).unwrap(), json!({"fr": "Chaise"}));
    }

    #[test]
    fn test_dimensions_serialization() {
        let mut dimensions = Dimensions::default();
        assert!(dimensions.is_empty());

        dimensions.set(DimensionName::Weight, 0.5);
        dimensions.set(DimensionName::Depth, 0.0);

        assert_eq!(dimensions.get(DimensionName::Weight), Some(0.5));
        assert_eq!(
            serde_json::to_value(&dimensions).unwrap(),
            json!({"depth": 0.0, "weight": 0.5})
        );
    }

    #[test]
    fn test_document_serialization() {
        let mut doc = IndexDocument::new(1_700_000_000, "ikea", vec!["https://img/1.jpg".into()]);
        doc.name = Localized::new(Lang::En, "Chair".to_string());
        doc.price = Some(Localized::new(
            Lang::En,
            PriceValue {
                amount: 25.0,
                currency: "EUR".to_string(),
            },
        ));

        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["timestamp"], 1_700_000_000);
        assert_eq!(value["source"], "ikea");
        assert_eq!(value["name"], json!({"en": "Chair"}));
        assert_eq!(value["description"], json!({}));
        assert_eq!(value["dimensions"], json!({}));
        assert_eq!(value["price"], json!({"en": {"amount": 25.0, "currency": "EUR"}}));

        let deserialized: IndexDocument = serde_json::from_value(value).unwrap();
        assert_eq!(deserialized, doc);
    }

    #[test]
    fn test_stored_document_deserializes() {
        let value = json!({
            "timestamp": 1_700_000_000,
            "source": "ikea",
            "name": {"fr": "Chaise"},
            "urls": {},
            "price": {"fr": {"amount": 19.99, "currency": "EUR"}}
        });

        let doc: IndexDocument = serde_json::from_value(value).unwrap();
        assert_eq!(doc.name.fr.as_deref(), Some("Chaise"));
        assert!(doc.name.en.is_none());
        assert!(doc.urls.is_empty());
        assert!(doc.categories.is_empty());
        assert!(doc.image_urls.is_empty());

        let price = doc.price.unwrap();
        assert!(price.en.is_none());
        assert_eq!(
            price.fr,
            Some(PriceValue {
                amount: 19.99,
                currency: "EUR".to_string(),
            })
        );
    }

    #[test]
    fn test_document_without_price_omits_it() {
        let doc = IndexDocument::new(0, "ikea", vec![]);
        let value = serde_json::to_value(&doc).unwrap();
        assert!(value.get("price").is_none());
    }
}
