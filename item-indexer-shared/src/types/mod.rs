//! This module defines the document structures written to the search index.
//! It re-exports specific types like `IndexDocument`.

pub mod index_document;

pub use index_document::IndexDocument;
