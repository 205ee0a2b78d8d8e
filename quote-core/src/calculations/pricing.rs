//! Item pricing.
//!
//! A unit price is built in this order:
//!
//! | Step | Description |
//! |------|-------------|
//! | 1    | Kit items: the kit's fixed price, nothing else applies |
//! | 2    | Base price from the `(line, width, length)` table, 0 when absent |
//! | 3    | Frame-count factor on lines that carry one (1→0.85, 2→0.90, 3→0.95, 4→1.00) |
//! | 4    | Model price factor (1 when absent) |
//! | 5    | Standard color surcharge |
//! | 6    | Extras, with grille extras priced by width on lines with a surcharge table |
//!
//! Line prices multiply by quantity, apply the percentage chosen by a
//! [`DiscountPolicy`] and optionally add VAT. No step rounds.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use quote_core::calculations::{NoDiscount, PricingEngine};
//! use quote_core::{Catalog, ItemSpec, PriceTable, PrivilegedDiscountConfig, ProductLine, QuoteState};
//!
//! let mut table = PriceTable::new();
//! table.insert("CLASSIC", 80, 190, dec!(500));
//! let line: ProductLine = serde_json::from_value(serde_json::json!({
//!     "id": "CLASSIC",
//!     "name": "Classic",
//! })).unwrap();
//! let catalog = Catalog::new(vec![line], table, PrivilegedDiscountConfig::default());
//!
//! let item = QuoteState {
//!     product_line: Some("CLASSIC".to_string()),
//!     spec: ItemSpec::Dimensioned { width: Some(80), length: Some(190), struct_frames: None },
//!     quantity: 2,
//!     ..Default::default()
//! };
//!
//! let engine = PricingEngine::new(&catalog);
//! assert_eq!(engine.unit_base_price(&item), dec!(500));
//! assert_eq!(engine.line_item_price(&item, &[], &NoDiscount, false), dec!(1000));
//! assert_eq!(engine.line_item_price(&item, &[], &NoDiscount, true), dec!(1210));
//! ```

use rust_decimal::Decimal;
use tracing::debug;

use crate::calculations::common::{apply_discount, max};
use crate::calculations::discount::DiscountPolicy;
use crate::models::{Catalog, ItemSpec, ProductLine, ProductOption, QuoteItem, QuoteState};

/// Spanish general VAT rate (21%).
pub const VAT_RATE: Decimal = Decimal::from_parts(21, 0, 0, false, 2);

/// Adds VAT to a pre-tax amount.
pub fn with_vat(amount: Decimal) -> Decimal {
    amount * (Decimal::ONE + VAT_RATE)
}

/// VAT due on a pre-tax amount.
pub fn vat_of(amount: Decimal) -> Decimal {
    amount * VAT_RATE
}

/// Base price multiplier for the number of structural frames.
pub fn frame_factor(frames: Option<u8>) -> Decimal {
    match frames {
        Some(1) => Decimal::from_parts(85, 0, 0, false, 2),
        Some(2) => Decimal::from_parts(90, 0, 0, false, 2),
        Some(3) => Decimal::from_parts(95, 0, 0, false, 2),
        _ => Decimal::ONE,
    }
}

/// Prices quote items against a catalog.
#[derive(Debug, Clone, Copy)]
pub struct PricingEngine<'a> {
    catalog: &'a Catalog,
}

impl<'a> PricingEngine<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &'a Catalog {
        self.catalog
    }

    /// Price of one unit before quantity, discount and VAT.
    ///
    /// Missing data never fails: an unknown line, an incomplete
    /// configuration or a dimension pair absent from the price table all
    /// contribute 0.
    pub fn unit_base_price(
        &self,
        item: &QuoteState,
    ) -> Decimal {
        let Some(line) = item
            .product_line
            .as_deref()
            .and_then(|id| self.catalog.line(id))
        else {
            return Decimal::ZERO;
        };

        if let ItemSpec::Kit { kit } = &item.spec {
            return kit.as_ref().map_or(Decimal::ZERO, |kit| kit.price);
        }

        let mut base = self.dimension_price(line, &item.spec);
        if line.frame_discount {
            base *= frame_factor(item.spec.struct_frames());
        }

        let factor = item
            .model
            .as_ref()
            .and_then(|model| model.price_factor)
            .unwrap_or(Decimal::ONE);
        let mut price = base * factor;

        if let Some(color) = &item.color {
            price += color.price;
        }

        for extra in &item.extras {
            price += self.extra_price(line, extra, item.spec.width());
        }

        max(price, Decimal::ZERO)
    }

    /// Quantity-scaled price with the policy's discount, optionally with VAT.
    ///
    /// `all_items` is the set the policy looks at for family totals; pass the
    /// builder's preview list to include an item that is not committed yet.
    pub fn line_item_price(
        &self,
        item: &QuoteState,
        all_items: &[QuoteItem],
        policy: &dyn DiscountPolicy,
        include_vat: bool,
    ) -> Decimal {
        let percentage = policy.discount_percentage(item, all_items);
        self.discounted_line_price(item, percentage, include_vat)
    }

    /// Full catalog price (PVP) of the line, without any discount.
    pub fn original_line_item_price(
        &self,
        item: &QuoteState,
        include_vat: bool,
    ) -> Decimal {
        self.discounted_line_price(item, Decimal::ZERO, include_vat)
    }

    /// Quantity-scaled price reduced by an explicit percentage.
    pub fn discounted_line_price(
        &self,
        item: &QuoteState,
        percentage: Decimal,
        include_vat: bool,
    ) -> Decimal {
        let subtotal = self.unit_base_price(item) * Decimal::from(item.effective_quantity());
        let discounted = apply_discount(subtotal, percentage);
        if include_vat {
            with_vat(discounted)
        } else {
            discounted
        }
    }

    fn dimension_price(
        &self,
        line: &ProductLine,
        spec: &ItemSpec,
    ) -> Decimal {
        let Some((width, length)) = spec.dimensions() else {
            return Decimal::ZERO;
        };
        self.catalog
            .base_price(&line.id, width, length)
            .unwrap_or_else(|| {
                debug!(line = %line.id, width, length, "no price table entry, using 0");
                Decimal::ZERO
            })
    }

    fn extra_price(
        &self,
        line: &ProductLine,
        extra: &ProductOption,
        width: Option<u32>,
    ) -> Decimal {
        line.grille_surcharge
            .as_ref()
            .filter(|surcharge| surcharge.applies_to(&extra.id))
            .zip(width)
            .and_then(|(surcharge, width)| surcharge.price_for_width(width))
            .unwrap_or(extra.price)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::calculations::discount::{FamilyDiscounts, NoDiscount};
    use crate::fixtures;

    fn scenario_item() -> QuoteState {
        let catalog = fixtures::catalog();
        let line = catalog.line("X").unwrap();
        QuoteState {
            product_line: Some("X".to_string()),
            spec: ItemSpec::Dimensioned {
                width: Some(80),
                length: Some(190),
                struct_frames: None,
            },
            quantity: 2,
            model: line.model("m12").cloned(),
            color: line.color("blanco").cloned(),
            extras: vec![line.extra("valvula").cloned().unwrap()],
            ..Default::default()
        }
    }

    // =========================================================================
    // unit_base_price
    // =========================================================================

    #[test]
    fn unit_base_price_combines_table_model_color_and_extras() {
        let catalog = fixtures::catalog();
        let engine = PricingEngine::new(&catalog);

        assert_eq!(engine.unit_base_price(&scenario_item()), dec!(650));
    }

    #[test]
    fn unit_base_price_is_zero_without_line() {
        let catalog = fixtures::catalog();
        let engine = PricingEngine::new(&catalog);

        assert_eq!(engine.unit_base_price(&QuoteState::default()), dec!(0));
    }

    #[test]
    fn unit_base_price_missing_table_entry_falls_back_to_zero() {
        let catalog = fixtures::catalog();
        let engine = PricingEngine::new(&catalog);
        let item = QuoteState {
            product_line: Some("X".to_string()),
            spec: ItemSpec::Dimensioned {
                width: Some(90),
                length: Some(190),
                struct_frames: None,
            },
            ..Default::default()
        };

        assert_eq!(engine.unit_base_price(&item), dec!(0));
    }

    #[test]
    fn unit_base_price_missing_table_entry_still_adds_surcharges() {
        let catalog = fixtures::catalog();
        let engine = PricingEngine::new(&catalog);
        let mut item = scenario_item();
        item.spec = ItemSpec::Dimensioned {
            width: Some(75),
            length: Some(300),
            struct_frames: None,
        };

        assert_eq!(engine.unit_base_price(&item), dec!(50));
    }

    #[test]
    fn unit_base_price_kit_ignores_everything_but_kit_price() {
        let catalog = fixtures::catalog();
        let engine = PricingEngine::new(&catalog);
        let line = catalog.line("KITS").unwrap();
        let item = QuoteState {
            product_line: Some("KITS".to_string()),
            spec: ItemSpec::Kit {
                kit: line.kit("sifon").cloned(),
            },
            quantity: 4,
            color: catalog.line("X").unwrap().color("blanco").cloned(),
            ..Default::default()
        };

        assert_eq!(engine.unit_base_price(&item), dec!(35));
        assert_eq!(engine.original_line_item_price(&item, false), dec!(140));
    }

    #[test]
    fn unit_base_price_kit_without_selection_is_zero() {
        let catalog = fixtures::catalog();
        let engine = PricingEngine::new(&catalog);
        let item = QuoteState {
            product_line: Some("KITS".to_string()),
            spec: ItemSpec::Kit { kit: None },
            ..Default::default()
        };

        assert_eq!(engine.unit_base_price(&item), dec!(0));
    }

    #[test]
    fn frame_factor_steps() {
        assert_eq!(frame_factor(Some(1)), dec!(0.85));
        assert_eq!(frame_factor(Some(2)), dec!(0.90));
        assert_eq!(frame_factor(Some(3)), dec!(0.95));
        assert_eq!(frame_factor(Some(4)), dec!(1));
        assert_eq!(frame_factor(None), dec!(1));
    }

    #[test]
    fn frame_factor_applies_before_model_factor() {
        let catalog = fixtures::catalog();
        let engine = PricingEngine::new(&catalog);
        let line = catalog.line("STRUCT").unwrap();
        let item = QuoteState {
            product_line: Some("STRUCT".to_string()),
            spec: ItemSpec::Dimensioned {
                width: Some(80),
                length: Some(120),
                struct_frames: Some(2),
            },
            model: line.model("reforzado").cloned(),
            ..Default::default()
        };

        // 400 × 0.90 × 1.5
        assert_eq!(engine.unit_base_price(&item), dec!(540));
    }

    #[test]
    fn frame_count_ignored_on_lines_without_frame_discount() {
        let catalog = fixtures::catalog();
        let engine = PricingEngine::new(&catalog);
        let item = QuoteState {
            product_line: Some("X".to_string()),
            spec: ItemSpec::Dimensioned {
                width: Some(80),
                length: Some(190),
                struct_frames: Some(1),
            },
            ..Default::default()
        };

        assert_eq!(engine.unit_base_price(&item), dec!(500));
    }

    #[test]
    fn grille_surcharge_depends_on_width() {
        let catalog = fixtures::catalog();
        let engine = PricingEngine::new(&catalog);
        let line = catalog.line("LUXE").unwrap();
        let grille = line.extra("rejilla").cloned().unwrap();

        for (width, expected) in [(70, dec!(86)), (80, dec!(90)), (90, dec!(94)), (100, dec!(98))] {
            let item = QuoteState {
                product_line: Some("LUXE".to_string()),
                spec: ItemSpec::Dimensioned {
                    width: Some(width),
                    length: Some(120),
                    struct_frames: None,
                },
                extras: vec![grille.clone()],
                ..Default::default()
            };
            let base = catalog.base_price("LUXE", width, 120).unwrap();

            assert_eq!(engine.unit_base_price(&item), base + expected, "width {width}");
        }
    }

    #[test]
    fn grille_surcharge_unknown_width_uses_static_price() {
        let catalog = fixtures::catalog();
        let engine = PricingEngine::new(&catalog);
        let line = catalog.line("LUXE").unwrap();
        let item = QuoteState {
            product_line: Some("LUXE".to_string()),
            spec: ItemSpec::Dimensioned {
                width: Some(75),
                length: Some(120),
                struct_frames: None,
            },
            extras: vec![line.extra("rejilla").cloned().unwrap()],
            ..Default::default()
        };

        assert_eq!(engine.unit_base_price(&item), dec!(50));
    }

    // =========================================================================
    // line prices
    // =========================================================================

    #[test]
    fn end_to_end_line_prices() {
        let catalog = fixtures::catalog();
        let engine = PricingEngine::new(&catalog);
        let item = scenario_item();
        let items = vec![QuoteItem::new("i-1", item.clone())];
        let ten_percent = FamilyDiscounts::new().with("X", dec!(10));

        assert_eq!(engine.original_line_item_price(&item, false), dec!(1300));
        assert_eq!(engine.line_item_price(&item, &items, &ten_percent, false), dec!(1170));
        assert_eq!(engine.line_item_price(&item, &items, &ten_percent, true), dec!(1415.70));
    }

    #[test]
    fn vat_is_a_pure_multiplicative_layer() {
        let catalog = fixtures::catalog();
        let engine = PricingEngine::new(&catalog);
        let mut item = scenario_item();

        for quantity in [1, 2, 7, 31] {
            item.quantity = quantity;
            let net = engine.original_line_item_price(&item, false);
            let gross = engine.original_line_item_price(&item, true);

            assert_eq!(net * (Decimal::ONE + VAT_RATE), gross);
        }
    }

    #[test]
    fn zero_quantity_is_priced_as_one() {
        let catalog = fixtures::catalog();
        let engine = PricingEngine::new(&catalog);
        let mut item = scenario_item();
        item.quantity = 0;

        assert_eq!(engine.line_item_price(&item, &[], &NoDiscount, false), dec!(650));
    }

    #[test]
    fn vat_helpers() {
        assert_eq!(VAT_RATE, dec!(0.21));
        assert_eq!(with_vat(dec!(100)), dec!(121));
        assert_eq!(vat_of(dec!(100)), dec!(21));
    }
}
