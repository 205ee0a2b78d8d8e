//! Price calculations: item pricing, discount policies and quote totals.
//!
//! Everything here is pure and works on unrounded [`rust_decimal::Decimal`]
//! values; rounding is left to the documents that display them.

pub mod common;
pub mod discount;
pub mod pricing;
pub mod totals;

pub use discount::{
    DiscountPolicy, DiscountRate, FamilyDiscounts, FlatDiscount, InvalidFamilyDiscount,
    NoDiscount, PrivilegedDiscount, internal_policy,
};
pub use pricing::{PricingEngine, VAT_RATE, frame_factor, vat_of, with_vat};
pub use totals::{LineBreakdown, QuoteTotals, line_breakdowns};
