//! Transformation error types.

use thiserror::Error;

/// Errors raised while turning a `SourceItem` into an `IndexDocument`.
///
/// None of these are transient: redelivering the same message produces the
/// same error, so callers reject the message instead of retrying it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformError {
    /// The dimension unit tag is not part of the conversion table.
    #[error("Unsupported unit: {0}")]
    UnsupportedUnit(i32),

    /// The dimension name is not one of the known physical quantities.
    #[error("Unknown dimension: {0}")]
    UnknownDimension(i32),

    /// The item language is outside the supported locale set.
    #[error("Unsupported locale: {0}")]
    UnsupportedLocale(i32),

    /// The price currency has no display name.
    #[error("Unsupported currency: {0}")]
    UnsupportedCurrency(i32),
}
