//! Processor module for the item indexer ingest.
//!
//! Transforms source items into search documents.

mod item_processor;

pub use item_processor::{ItemProcessor, ProcessedItem, TransformPolicy};
