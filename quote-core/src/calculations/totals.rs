//! Totals block of a quote.

use rust_decimal::Decimal;

use crate::calculations::common::percentage_of;
use crate::calculations::discount::{DiscountPolicy, FlatDiscount};
use crate::calculations::pricing::{PricingEngine, vat_of};
use crate::models::QuoteItem;

/// Pre-VAT prices of one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineBreakdown {
    pub item_id: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    /// Full catalog price (PVP) of the line.
    pub original: Decimal,
    pub discount_percentage: Decimal,
    pub discounted: Decimal,
}

/// Per-line prices of `items` under `policy`, family totals taken over `items`.
pub fn line_breakdowns(
    engine: &PricingEngine<'_>,
    items: &[QuoteItem],
    policy: &dyn DiscountPolicy,
) -> Vec<LineBreakdown> {
    items
        .iter()
        .map(|item| {
            let percentage = policy.discount_percentage(&item.state, items);
            LineBreakdown {
                item_id: item.id.clone(),
                quantity: item.state.effective_quantity(),
                unit_price: engine.unit_base_price(&item.state),
                original: engine.original_line_item_price(&item.state, false),
                discount_percentage: percentage,
                discounted: engine.discounted_line_price(&item.state, percentage, false),
            }
        })
        .collect()
}

/// Subtotal, discount, taxable base, VAT and total of a set of items.
///
/// Values are unrounded; documents round them for display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuoteTotals {
    /// Sum of full catalog prices, before VAT.
    pub subtotal: Decimal,
    pub discount: Decimal,
    /// `discount` as a share of `subtotal`; 0 when the subtotal is 0.
    pub discount_percentage: Decimal,
    pub taxable_base: Decimal,
    pub vat: Decimal,
    pub total: Decimal,
}

impl QuoteTotals {
    /// Totals with a per-item discount policy.
    pub fn with_policy(
        engine: &PricingEngine<'_>,
        items: &[QuoteItem],
        policy: &dyn DiscountPolicy,
    ) -> Self {
        let breakdowns = line_breakdowns(engine, items, policy);
        let subtotal = breakdowns.iter().map(|line| line.original).sum();
        let taxable_base = breakdowns.iter().map(|line| line.discounted).sum();
        Self::from_amounts(subtotal, taxable_base)
    }

    /// Totals with one percentage taken off the whole pre-VAT amount.
    pub fn with_flat_discount(
        engine: &PricingEngine<'_>,
        items: &[QuoteItem],
        discount: FlatDiscount,
    ) -> Self {
        let subtotal: Decimal = items
            .iter()
            .map(|item| engine.original_line_item_price(&item.state, false))
            .sum();
        Self::from_amounts(subtotal, subtotal - discount.amount(subtotal))
    }

    fn from_amounts(
        subtotal: Decimal,
        taxable_base: Decimal,
    ) -> Self {
        let discount = subtotal - taxable_base;
        let vat = vat_of(taxable_base);
        Self {
            subtotal,
            discount,
            discount_percentage: percentage_of(discount, subtotal),
            taxable_base,
            vat,
            total: taxable_base + vat,
        }
    }

    pub fn has_discount(&self) -> bool {
        !self.discount.is_zero()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::calculations::common::round_half_up;
    use crate::calculations::discount::{FamilyDiscounts, NoDiscount};
    use crate::fixtures;
    use crate::models::{ItemSpec, QuoteState};

    fn plain_item(
        id: &str,
        line: &str,
        width: u32,
        length: u32,
        quantity: u32,
    ) -> QuoteItem {
        QuoteItem::new(
            id,
            QuoteState {
                product_line: Some(line.to_string()),
                spec: ItemSpec::Dimensioned {
                    width: Some(width),
                    length: Some(length),
                    struct_frames: None,
                },
                quantity,
                ..Default::default()
            },
        )
    }

    #[test]
    fn blended_percentage_over_mixed_families() {
        let catalog = fixtures::catalog();
        let engine = PricingEngine::new(&catalog);
        // X 80×190 = 500, LUXE 80×120 = 250
        let items = vec![
            plain_item("a", "X", 80, 190, 2),
            plain_item("b", "LUXE", 80, 120, 2),
        ];
        let policy = FamilyDiscounts::new().with("X", dec!(10));

        let totals = QuoteTotals::with_policy(&engine, &items, &policy);

        assert_eq!(totals.subtotal, dec!(1500));
        assert_eq!(totals.discount, dec!(100));
        assert_eq!(totals.taxable_base, dec!(1400));
        assert_eq!(round_half_up(totals.discount_percentage), dec!(6.67));
        assert_eq!(totals.vat, dec!(294));
        assert_eq!(totals.total, dec!(1694));
    }

    #[test]
    fn no_discount_totals() {
        let catalog = fixtures::catalog();
        let engine = PricingEngine::new(&catalog);
        let items = vec![plain_item("a", "X", 80, 190, 1)];

        let totals = QuoteTotals::with_policy(&engine, &items, &NoDiscount);

        assert!(!totals.has_discount());
        assert_eq!(totals.discount_percentage, dec!(0));
        assert_eq!(totals.total, dec!(605));
    }

    #[test]
    fn flat_discount_applies_once_to_whole_base() {
        let catalog = fixtures::catalog();
        let engine = PricingEngine::new(&catalog);
        let items = vec![
            plain_item("a", "X", 80, 190, 2),
            plain_item("b", "LUXE", 80, 120, 2),
        ];

        let totals = QuoteTotals::with_flat_discount(&engine, &items, FlatDiscount::new(dec!(10)));

        assert_eq!(totals.subtotal, dec!(1500));
        assert_eq!(totals.discount, dec!(150));
        assert_eq!(totals.taxable_base, dec!(1350));
        assert_eq!(totals.discount_percentage, dec!(10));
        assert_eq!(totals.total, dec!(1633.5));
    }

    #[test]
    fn empty_quote_has_zero_totals() {
        let catalog = fixtures::catalog();
        let engine = PricingEngine::new(&catalog);

        let totals = QuoteTotals::with_policy(&engine, &[], &NoDiscount);

        assert_eq!(totals, QuoteTotals::default());
    }

    #[test]
    fn breakdowns_carry_policy_percentage() {
        let catalog = fixtures::catalog();
        let engine = PricingEngine::new(&catalog);
        let items = vec![plain_item("a", "X", 80, 190, 3)];
        let policy = FamilyDiscounts::new().with("X", dec!(20));

        let lines = line_breakdowns(&engine, &items, &policy);

        assert_eq!(
            lines,
            vec![LineBreakdown {
                item_id: "a".to_string(),
                quantity: 3,
                unit_price: dec!(500),
                original: dec!(1500),
                discount_percentage: dec!(20),
                discounted: dec!(1200),
            }]
        );
    }
}
