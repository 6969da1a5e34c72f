//! # Item Indexer Shared
//!
//! This crate defines the data structures shared across the item indexer:
//! the protobuf messages published by the item normalizers, the document
//! stored in the search index, and the unit normalization applied between
//! the two.

pub mod errors;
pub mod proto;
pub mod types;
pub mod units;

pub use errors::TransformError;
pub use proto::SourceItem;
pub use types::index_document::{document_id, Dimensions, IndexDocument, Localized, PriceValue};
pub use units::normalize;
