//! Interface definitions for the search index provider.
//!
//! The `SearchIndexProvider` trait keeps the bulk indexer independent of the
//! search backend so it can be exercised against in-memory providers.

mod search_index_provider;

pub use search_index_provider::SearchIndexProvider;
