//! The catalog shipped with the binaries.

use quote_core::Catalog;

use crate::loader::{CatalogLoader, CatalogLoaderError};

pub const BUILTIN_DEFINITION: &str = include_str!("../data/catalog.toml");
pub const BUILTIN_PRICES: &str = include_str!("../data/price_tables.csv");

/// Parses the embedded catalog.
pub fn builtin_catalog() -> Result<Catalog, CatalogLoaderError> {
    CatalogLoader::from_sources(BUILTIN_DEFINITION, BUILTIN_PRICES)
}
