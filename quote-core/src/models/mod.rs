mod catalog;
mod quote;
mod user;

pub use catalog::{
    BITONO_EXTRA_ID, Catalog, ColorOption, GrilleSurcharge, KitProduct, LineKind, PriceTable,
    PrivilegedDiscountConfig, ProductLine, ProductOption, RAL_EXTRA_ID, WidthSurcharge,
};
pub use quote::{
    ItemSpec, MAX_QUANTITY, QuoteItem, QuoteState, SavedQuote, clamp_quantity,
    normalize_ral_code, parse_quantity,
};
pub use user::{Role, StoredUser, User, normalize_email};
