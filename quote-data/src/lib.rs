pub mod builtin;
pub mod loader;

pub use builtin::{BUILTIN_DEFINITION, BUILTIN_PRICES, builtin_catalog};
pub use loader::{
    CatalogDefinition, CatalogLoader, CatalogLoaderError, LineDefinition, PriceRecord,
    PriceTableLoader,
};
