//! Error types for the item indexer repository.

mod search_index_error;

pub use search_index_error::SearchIndexError;
