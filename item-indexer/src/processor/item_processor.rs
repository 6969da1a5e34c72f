//! Item processor implementation.
//!
//! Transforms `SourceItem` messages into `IndexDocument` structures for indexing.

use chrono::Utc;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, instrument};

use item_indexer_shared::proto::{Currency, DimensionName, Lang};
use item_indexer_shared::{normalize, IndexDocument, Localized, PriceValue, SourceItem, TransformError};

/// How the processor treats locale and currency values it does not know.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransformPolicy {
    /// Fail the transformation.
    #[default]
    Strict,
    /// Leave the locale-keyed fields empty and the currency name blank.
    Lenient,
}

impl FromStr for TransformPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "lenient" => Ok(Self::Lenient),
            other => Err(format!("unknown transform policy '{}'", other)),
        }
    }
}

impl fmt::Display for TransformPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strict => write!(f, "strict"),
            Self::Lenient => write!(f, "lenient"),
        }
    }
}

/// A document ready to be loaded, with the identifier it is stored under.
#[derive(Debug, Clone)]
pub struct ProcessedItem {
    pub document_id: String,
    pub document: IndexDocument,
}

/// Processor that transforms source items into search documents.
///
/// The processor is responsible for:
/// - Placing text, URLs and price under the item's locale
/// - Converting dimensions to the canonical units
/// - Deriving the document identifier from the item content
///
/// It performs no I/O.
#[derive(Debug, Clone, Default)]
pub struct ItemProcessor {
    policy: TransformPolicy,
}

impl ItemProcessor {
    /// Create a new item processor.
    pub fn new(policy: TransformPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> TransformPolicy {
        self.policy
    }

    /// Transform an item and pair the document with its identifier.
    #[instrument(skip(self, item), fields(source = %item.source, id = %item.id))]
    pub fn process(&self, item: &SourceItem) -> Result<ProcessedItem, TransformError> {
        let document = self.transform(item)?;
        let document_id = item.document_id();

        debug!(document_id = %document_id, "Processed item");
        Ok(ProcessedItem {
            document_id,
            document,
        })
    }

    /// Build the search document for an item.
    ///
    /// Any dimension with an unknown name or unit aborts the whole
    /// transformation. When the same dimension appears twice, the last one wins.
    pub fn transform(&self, item: &SourceItem) -> Result<IndexDocument, TransformError> {
        let mut document = IndexDocument::new(
            Utc::now().timestamp(),
            item.source.clone(),
            item.image_urls.clone(),
        );

        if let Some(lang) = self.locale(item.lang)? {
            document.urls = Localized::new(lang, item.urls.clone());
            document.name = Localized::new(lang, item.name.clone());
            document.description = Localized::new(lang, item.description.clone());
            document.categories = Localized::new(lang, item.categories.clone());

            if let Some(price) = item.price {
                let value = PriceValue {
                    amount: price.amount,
                    currency: self.currency_name(price.currency)?,
                };
                document.price = Some(Localized::new(lang, value));
            }
        }

        for dimension in &item.dimensions {
            let name = DimensionName::try_from(dimension.name)
                .map_err(|_| TransformError::UnknownDimension(dimension.name))?;
            let value = normalize(dimension.value, dimension.unit)?;
            document.dimensions.set(name, value);
        }

        Ok(document)
    }

    fn locale(&self, tag: i32) -> Result<Option<Lang>, TransformError> {
        match Lang::try_from(tag) {
            Ok(lang) => Ok(Some(lang)),
            Err(_) if self.policy == TransformPolicy::Lenient => {
                debug!(lang = tag, "Unknown locale, leaving localized fields empty");
                Ok(None)
            }
            Err(_) => Err(TransformError::UnsupportedLocale(tag)),
        }
    }

    fn currency_name(&self, tag: i32) -> Result<String, TransformError> {
        match Currency::try_from(tag) {
            Ok(currency) => Ok(currency.as_str_name().to_string()),
            Err(_) if self.policy == TransformPolicy::Lenient => Ok(String::new()),
            Err(_) => Err(TransformError::UnsupportedCurrency(tag)),
        }
    }
}
