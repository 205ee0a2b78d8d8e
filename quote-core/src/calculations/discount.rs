//! Discount policies.
//!
//! The pricing engine does not know how a discount is chosen; callers pass
//! one of these policies:
//!
//! - [`PrivilegedDiscount`]: automatic discount for privileged accounts in
//!   internal views. One family is discounted only once its accumulated
//!   quantity reaches a threshold, and then on every unit of the family.
//!   All other families get a flat percentage.
//! - [`FamilyDiscounts`]: per-family percentages typed in for a customer
//!   document.
//! - [`NoDiscount`]: catalog prices.
//!
//! [`FlatDiscount`], used by the simple internal document, is not a per-item
//! policy: it takes one percentage off the whole pre-VAT total.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::warn;

use crate::calculations::common::{apply_discount, clamp_percentage};
use crate::models::{Catalog, PrivilegedDiscountConfig, QuoteItem, QuoteState, User};

/// Chooses the discount percentage (0–100) of one item.
pub trait DiscountPolicy {
    /// `all_items` is the item set family totals are computed over. It may
    /// or may not contain `item` itself.
    fn discount_percentage(
        &self,
        item: &QuoteState,
        all_items: &[QuoteItem],
    ) -> Decimal;
}

impl<P: DiscountPolicy + ?Sized> DiscountPolicy for &P {
    fn discount_percentage(
        &self,
        item: &QuoteState,
        all_items: &[QuoteItem],
    ) -> Decimal {
        (**self).discount_percentage(item, all_items)
    }
}

/// Catalog prices, no discount.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDiscount;

impl DiscountPolicy for NoDiscount {
    fn discount_percentage(
        &self,
        _item: &QuoteState,
        _all_items: &[QuoteItem],
    ) -> Decimal {
        Decimal::ZERO
    }
}

/// Automatic discount for privileged accounts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivilegedDiscount {
    config: PrivilegedDiscountConfig,
}

impl PrivilegedDiscount {
    pub fn new(config: PrivilegedDiscountConfig) -> Self {
        Self { config }
    }

    pub fn from_catalog(catalog: &Catalog) -> Self {
        Self::new(catalog.privileged_discount().clone())
    }

    /// Units of `family` across `items`, saturating at `u32::MAX`.
    pub fn family_quantity(
        family: &str,
        items: &[QuoteItem],
    ) -> u32 {
        items
            .iter()
            .filter(|item| item.state.product_line.as_deref() == Some(family))
            .fold(0, |units, item| units.saturating_add(item.state.effective_quantity()))
    }
}

impl DiscountPolicy for PrivilegedDiscount {
    fn discount_percentage(
        &self,
        item: &QuoteState,
        all_items: &[QuoteItem],
    ) -> Decimal {
        let Some(family) = item.product_line.as_deref() else {
            return Decimal::ZERO;
        };

        if family != self.config.threshold_family {
            return self.config.default_percentage;
        }

        // The whole family flips at the threshold, not only the extra units.
        if Self::family_quantity(family, all_items) >= self.config.threshold_quantity {
            self.config.threshold_percentage
        } else {
            Decimal::ZERO
        }
    }
}

/// Error for a malformed `FAMILY=PERCENT` entry.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("expected FAMILY=PERCENT, got '{0}'")]
pub struct InvalidFamilyDiscount(pub String);

/// Per-family percentages for customer documents.
///
/// Families without an entry get 0%.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FamilyDiscounts {
    by_family: BTreeMap<String, Decimal>,
}

impl FamilyDiscounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(
        mut self,
        family: impl Into<String>,
        percentage: Decimal,
    ) -> Self {
        self.insert(family, percentage);
        self
    }

    /// Sets the percentage for a family, clamped to `0..=100`.
    pub fn insert(
        &mut self,
        family: impl Into<String>,
        percentage: Decimal,
    ) {
        self.by_family
            .insert(family.into(), clamp_percentage(percentage));
    }

    pub fn get(
        &self,
        family: &str,
    ) -> Decimal {
        self.by_family
            .get(family)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Decimal)> {
        self.by_family
            .iter()
            .map(|(family, percentage)| (family.as_str(), *percentage))
    }

    pub fn is_empty(&self) -> bool {
        self.by_family.is_empty()
    }

    /// Parses `FAMILY=PERCENT`. A non-numeric percentage becomes 0.
    pub fn parse_entry(entry: &str) -> Result<(String, Decimal), InvalidFamilyDiscount> {
        let (family, percentage) = entry
            .split_once('=')
            .ok_or_else(|| InvalidFamilyDiscount(entry.to_string()))?;
        let family = family.trim();
        if family.is_empty() {
            return Err(InvalidFamilyDiscount(entry.to_string()));
        }
        Ok((family.to_string(), DiscountRate::parse_lenient(percentage).percentage()))
    }
}

impl FromIterator<(String, Decimal)> for FamilyDiscounts {
    fn from_iter<T: IntoIterator<Item = (String, Decimal)>>(iter: T) -> Self {
        let mut discounts = Self::new();
        for (family, percentage) in iter {
            discounts.insert(family, percentage);
        }
        discounts
    }
}

impl DiscountPolicy for FamilyDiscounts {
    fn discount_percentage(
        &self,
        item: &QuoteState,
        _all_items: &[QuoteItem],
    ) -> Decimal {
        item.product_line
            .as_deref()
            .map_or(Decimal::ZERO, |family| self.get(family))
    }
}

/// A discount percentage in `0..=100`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct DiscountRate(Decimal);

impl DiscountRate {
    pub fn new(percentage: Decimal) -> Self {
        Self(clamp_percentage(percentage))
    }

    /// Parses a typed percentage.
    ///
    /// Accepts `10`, `10.5`, `10,5` and `10%`. Anything unparseable becomes 0.
    pub fn parse_lenient(input: &str) -> Self {
        let normalized = input.trim().trim_end_matches('%').trim().replace(',', ".");
        if normalized.is_empty() {
            return Self::default();
        }
        match normalized.parse::<Decimal>() {
            Ok(value) => Self::new(value),
            Err(e) => {
                warn!(input, "invalid discount percentage coerced to 0: {}", e);
                Self::default()
            }
        }
    }

    pub fn percentage(&self) -> Decimal {
        self.0
    }
}

impl From<Decimal> for DiscountRate {
    fn from(percentage: Decimal) -> Self {
        Self::new(percentage)
    }
}

/// One percentage applied once to the whole pre-VAT total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlatDiscount {
    pub rate: DiscountRate,
}

impl FlatDiscount {
    pub fn new(rate: impl Into<DiscountRate>) -> Self {
        Self { rate: rate.into() }
    }

    /// Amount taken off `base`.
    pub fn amount(
        &self,
        base: Decimal,
    ) -> Decimal {
        base - apply_discount(base, self.rate.percentage())
    }
}

/// Policy for internal price views of `user`.
pub fn internal_policy(
    user: &User,
    catalog: &Catalog,
) -> Box<dyn DiscountPolicy> {
    if user.is_privileged() {
        Box::new(PrivilegedDiscount::from_catalog(catalog))
    } else {
        Box::new(NoDiscount)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::models::{ItemSpec, Role};

    fn item(line: &str, quantity: u32) -> QuoteState {
        QuoteState {
            product_line: Some(line.to_string()),
            spec: ItemSpec::Dimensioned {
                width: Some(80),
                length: Some(120),
                struct_frames: None,
            },
            quantity,
            ..Default::default()
        }
    }

    fn items(lines: &[(&str, u32)]) -> Vec<QuoteItem> {
        lines
            .iter()
            .enumerate()
            .map(|(i, (line, quantity))| QuoteItem::new(format!("i-{i}"), item(line, *quantity)))
            .collect()
    }

    fn privileged() -> PrivilegedDiscount {
        PrivilegedDiscount::new(PrivilegedDiscountConfig::default())
    }

    // =========================================================================
    // PrivilegedDiscount
    // =========================================================================

    #[test]
    fn threshold_family_below_threshold_gets_nothing() {
        let set = items(&[("LUXE", 9)]);

        assert_eq!(privileged().discount_percentage(&set[0].state, &set), dec!(0));
    }

    #[test]
    fn threshold_family_at_threshold_gets_full_discount() {
        let set = items(&[("LUXE", 10)]);

        assert_eq!(privileged().discount_percentage(&set[0].state, &set), dec!(71));
    }

    #[test]
    fn threshold_applies_retroactively_across_items() {
        let before = items(&[("LUXE", 4), ("LUXE", 5)]);
        let after = items(&[("LUXE", 4), ("LUXE", 5), ("LUXE", 1)]);
        let policy = privileged();

        for entry in &before {
            assert_eq!(policy.discount_percentage(&entry.state, &before), dec!(0));
        }
        for entry in &after {
            assert_eq!(policy.discount_percentage(&entry.state, &after), dec!(71));
        }
    }

    #[test]
    fn other_families_do_not_count_towards_threshold() {
        let set = items(&[("LUXE", 9), ("CLASSIC", 30)]);
        let policy = privileged();

        assert_eq!(policy.discount_percentage(&set[0].state, &set), dec!(0));
        assert_eq!(policy.discount_percentage(&set[1].state, &set), dec!(55));
    }

    #[test]
    fn preview_item_counts_when_included_in_set() {
        let committed = items(&[("LUXE", 8)]);
        let preview = item("LUXE", 2);
        let mut with_preview = committed.clone();
        with_preview.push(QuoteItem::new("preview", preview.clone()));

        assert_eq!(privileged().discount_percentage(&preview, &committed), dec!(0));
        assert_eq!(privileged().discount_percentage(&preview, &with_preview), dec!(71));
    }

    #[test]
    fn oversized_family_quantity_keeps_threshold_discount() {
        let set = items(&[("LUXE", u32::MAX), ("LUXE", u32::MAX)]);

        assert_eq!(
            PrivilegedDiscount::family_quantity("LUXE", &set),
            2 * crate::models::MAX_QUANTITY
        );
        assert_eq!(privileged().discount_percentage(&set[0].state, &set), dec!(71));
    }

    #[test]
    fn item_without_line_gets_nothing() {
        assert_eq!(
            privileged().discount_percentage(&QuoteState::default(), &[]),
            dec!(0)
        );
    }

    // =========================================================================
    // FamilyDiscounts
    // =========================================================================

    #[test]
    fn family_discounts_lookup_by_line() {
        let discounts = FamilyDiscounts::new().with("CLASSIC", dec!(10));

        assert_eq!(discounts.discount_percentage(&item("CLASSIC", 1), &[]), dec!(10));
        assert_eq!(discounts.discount_percentage(&item("LUXE", 1), &[]), dec!(0));
    }

    #[test]
    fn family_discounts_clamp_percentages() {
        let discounts = FamilyDiscounts::new()
            .with("A", dec!(120))
            .with("B", dec!(-3));

        assert_eq!(discounts.get("A"), dec!(100));
        assert_eq!(discounts.get("B"), dec!(0));
    }

    #[test]
    fn parse_entry_accepts_family_and_percent() {
        assert_eq!(
            FamilyDiscounts::parse_entry("LUXE=12,5"),
            Ok(("LUXE".to_string(), dec!(12.5)))
        );
        assert_eq!(
            FamilyDiscounts::parse_entry(" CLASSIC = x"),
            Ok(("CLASSIC".to_string(), dec!(0)))
        );
        assert!(FamilyDiscounts::parse_entry("LUXE").is_err());
        assert!(FamilyDiscounts::parse_entry("=10").is_err());
    }

    #[test]
    fn discount_rate_parsing_is_lenient() {
        assert_eq!(DiscountRate::parse_lenient("15").percentage(), dec!(15));
        assert_eq!(DiscountRate::parse_lenient(" 7.5% ").percentage(), dec!(7.5));
        assert_eq!(DiscountRate::parse_lenient("abc").percentage(), dec!(0));
        assert_eq!(DiscountRate::parse_lenient("").percentage(), dec!(0));
        assert_eq!(DiscountRate::parse_lenient("250").percentage(), dec!(100));
    }

    #[test]
    fn flat_discount_amount() {
        assert_eq!(FlatDiscount::new(dec!(10)).amount(dec!(1500)), dec!(150));
        assert_eq!(FlatDiscount::default().amount(dec!(1500)), dec!(0));
    }

    // =========================================================================
    // internal_policy
    // =========================================================================

    #[test]
    fn internal_policy_depends_on_role() {
        let catalog = Catalog::default();
        let mut user = User {
            email: "a@b.es".to_string(),
            name: "A".to_string(),
            role: Role::Agent,
            commercial_name: None,
            prepared_by: None,
        };
        let probe = item("CLASSIC", 1);

        assert_eq!(
            internal_policy(&user, &catalog).discount_percentage(&probe, &[]),
            dec!(0)
        );

        user.role = Role::Privileged;
        assert_eq!(
            internal_policy(&user, &catalog).discount_percentage(&probe, &[]),
            dec!(55)
        );
    }
}
