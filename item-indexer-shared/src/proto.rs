//! Protobuf messages published by the item normalizers.
//!
//! Enum fields are kept as raw `i32` values on the message structs so that
//! tags unknown to this build still decode and can be rejected explicitly by
//! the transformer.

/// A normalized product item, as produced by one source.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SourceItem {
    #[prost(string, tag = "1")]
    pub source: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub id: ::prost::alloc::string::String,
    #[prost(enumeration = "Lang", tag = "3")]
    pub lang: i32,
    #[prost(string, repeated, tag = "4")]
    pub urls: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
    #[prost(string, tag = "5")]
    pub name: ::prost::alloc::string::String,
    #[prost(string, tag = "6")]
    pub description: ::prost::alloc::string::String,
    #[prost(string, repeated, tag = "7")]
    pub categories: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
    #[prost(string, repeated, tag = "8")]
    pub image_urls: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
    #[prost(message, repeated, tag = "9")]
    pub dimensions: ::prost::alloc::vec::Vec<Dimension>,
    #[prost(message, optional, tag = "10")]
    pub price: ::core::option::Option<Price>,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct Dimension {
    #[prost(enumeration = "DimensionName", tag = "1")]
    pub name: i32,
    #[prost(double, tag = "2")]
    pub value: f64,
    #[prost(enumeration = "Unit", tag = "3")]
    pub unit: i32,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct Price {
    #[prost(double, tag = "1")]
    pub amount: f64,
    #[prost(enumeration = "Currency", tag = "2")]
    pub currency: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum Lang {
    En = 0,
    Fr = 1,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum DimensionName {
    Height = 0,
    Width = 1,
    Depth = 2,
    Weight = 3,
    Length = 4,
    Diameter = 5,
    Volume = 6,
    Thickness = 7,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum Unit {
    Cm = 0,
    Mm = 1,
    M = 2,
    G = 3,
    Kg = 4,
    Cm2 = 5,
    Mm2 = 6,
    M2 = 7,
    L = 8,
    Cm3 = 9,
    Mm3 = 10,
    M3 = 11,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum Currency {
    Eur = 0,
    Usd = 1,
    Gbp = 2,
}

impl Currency {
    /// Name of the currency as stored in the search index.
    pub fn as_str_name(&self) -> &'static str {
        match self {
            Self::Eur => "EUR",
            Self::Usd => "USD",
            Self::Gbp => "GBP",
        }
    }
}

impl SourceItem {
    /// Identifier of the document built from this item.
    ///
    /// Derived from the item content only, so a redelivered message maps to
    /// the same document.
    pub fn document_id(&self) -> String {
        crate::types::index_document::document_id(&self.source, &self.id)
    }
}
