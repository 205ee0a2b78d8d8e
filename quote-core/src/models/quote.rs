use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::catalog::{BITONO_EXTRA_ID, ColorOption, KitProduct, LineKind, ProductOption, RAL_EXTRA_ID};

static RAL_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(?:ral)?\s*-?\s*(\d{4})\s*$").expect("valid regex"));

/// Product-family specific part of an item.
///
/// Each family only carries the fields it is priced from, so a kit can
/// never hold dimensions and a countertop can never hold a frame count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemSpec {
    #[serde(rename_all = "camelCase")]
    Dimensioned {
        width: Option<u32>,
        length: Option<u32>,
        struct_frames: Option<u8>,
    },
    Countertop {
        width: Option<u32>,
        length: Option<u32>,
    },
    Kit {
        kit: Option<KitProduct>,
    },
}

impl Default for ItemSpec {
    fn default() -> Self {
        Self::Dimensioned {
            width: None,
            length: None,
            struct_frames: None,
        }
    }
}

impl ItemSpec {
    /// Empty spec matching the kind of a product line.
    pub fn for_kind(kind: LineKind) -> Self {
        match kind {
            LineKind::Countertop => Self::Countertop {
                width: None,
                length: None,
            },
            LineKind::Kit => Self::Kit { kit: None },
            LineKind::Dimensioned | LineKind::Custom => Self::default(),
        }
    }

    pub fn width(&self) -> Option<u32> {
        match self {
            Self::Dimensioned { width, .. } | Self::Countertop { width, .. } => *width,
            Self::Kit { .. } => None,
        }
    }

    pub fn length(&self) -> Option<u32> {
        match self {
            Self::Dimensioned { length, .. } | Self::Countertop { length, .. } => *length,
            Self::Kit { .. } => None,
        }
    }

    pub fn struct_frames(&self) -> Option<u8> {
        match self {
            Self::Dimensioned { struct_frames, .. } => *struct_frames,
            _ => None,
        }
    }

    pub fn kit(&self) -> Option<&KitProduct> {
        match self {
            Self::Kit { kit } => kit.as_ref(),
            _ => None,
        }
    }

    /// `(width, length)` once both are chosen.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.width().zip(self.length())
    }

    pub fn is_kit(&self) -> bool {
        matches!(self, Self::Kit { .. })
    }
}

/// The item under construction in the quote builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteState {
    pub product_line: Option<String>,
    #[serde(default)]
    pub spec: ItemSpec,
    pub quantity: u32,
    pub model: Option<ProductOption>,
    pub color: Option<ColorOption>,
    #[serde(default)]
    pub extras: Vec<ProductOption>,
    #[serde(default)]
    pub ral_code: String,
    #[serde(default)]
    pub bitono_color: Option<ColorOption>,
    #[serde(default)]
    pub bitono_ral_code: String,
    #[serde(default)]
    pub invoice_reference: Option<String>,
}

impl Default for QuoteState {
    fn default() -> Self {
        Self {
            product_line: None,
            spec: ItemSpec::default(),
            quantity: 1,
            model: None,
            color: None,
            extras: Vec::new(),
            ral_code: String::new(),
            bitono_color: None,
            bitono_ral_code: String::new(),
            invoice_reference: None,
        }
    }
}

impl QuoteState {
    pub fn has_extra(&self, id: &str) -> bool {
        self.extras.iter().any(|extra| extra.id == id)
    }

    pub fn uses_ral(&self) -> bool {
        self.has_extra(RAL_EXTRA_ID)
    }

    pub fn uses_bitono(&self) -> bool {
        self.has_extra(BITONO_EXTRA_ID)
    }

    /// Quantity used for pricing, within `1..=MAX_QUANTITY` even for
    /// stored items that never went through [`clamp_quantity`].
    pub fn effective_quantity(&self) -> u32 {
        self.quantity.clamp(1, MAX_QUANTITY)
    }

    /// Removes the extra with `id`, returning whether it was present.
    pub fn remove_extra(&mut self, id: &str) -> bool {
        let before = self.extras.len();
        self.extras.retain(|extra| extra.id != id);
        self.extras.len() != before
    }
}

/// A finalized, addressable line of a quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteItem {
    pub id: String,
    #[serde(flatten)]
    pub state: QuoteState,
}

impl QuoteItem {
    pub fn new(id: impl Into<String>, state: QuoteState) -> Self {
        Self {
            id: id.into(),
            state,
        }
    }
}

/// A persisted quote, owned by the user that saved it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedQuote {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub user_email: String,
    pub quote_items: Vec<QuoteItem>,
    pub total_price: Decimal,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub project_reference: Option<String>,
    #[serde(default)]
    pub ordered_timestamp: Option<DateTime<Utc>>,
}

impl SavedQuote {
    pub fn is_ordered(&self) -> bool {
        self.ordered_timestamp.is_some()
    }

    /// Human-facing number printed on documents, derived from the save time.
    pub fn quote_number(&self) -> String {
        format!("P{}", self.timestamp.format("%y%m%d-%H%M%S"))
    }

    pub fn total_units(&self) -> u32 {
        self.quote_items
            .iter()
            .fold(0, |units, item| units.saturating_add(item.state.effective_quantity()))
    }
}

/// Largest quantity a single item can carry.
pub const MAX_QUANTITY: u32 = 9_999;

/// Clamps a raw quantity to `1..=MAX_QUANTITY`.
pub fn clamp_quantity(raw: i64) -> u32 {
    u32::try_from(raw.clamp(1, i64::from(MAX_QUANTITY))).unwrap_or(MAX_QUANTITY)
}

/// Parses user-typed quantity; anything non-numeric becomes 1.
pub fn parse_quantity(input: &str) -> u32 {
    match input.trim().parse::<i64>() {
        Ok(value) => clamp_quantity(value),
        Err(_) => {
            warn!(input, "non-numeric quantity coerced to 1");
            1
        }
    }
}

/// Normalises a RAL code to the `RAL 9010` form.
///
/// Input that does not look like a four-digit RAL code is kept trimmed, as
/// the sales office also accepts free-text color references.
pub fn normalize_ral_code(input: &str) -> String {
    match RAL_CODE.captures(input) {
        Some(caps) => format!("RAL {}", &caps[1]),
        None => input.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn default_state_has_quantity_one() {
        let state = QuoteState::default();

        assert_eq!(state.quantity, 1);
        assert_eq!(state.product_line, None);
        assert!(state.extras.is_empty());
    }

    #[test]
    fn spec_for_kind_matches_family() {
        assert!(ItemSpec::for_kind(LineKind::Kit).is_kit());
        assert_eq!(
            ItemSpec::for_kind(LineKind::Countertop),
            ItemSpec::Countertop {
                width: None,
                length: None
            }
        );
        assert_eq!(ItemSpec::for_kind(LineKind::Dimensioned), ItemSpec::default());
    }

    #[test]
    fn kit_spec_has_no_dimensions() {
        let spec = ItemSpec::Kit {
            kit: Some(KitProduct {
                id: "sifon".to_string(),
                name: "Sifón".to_string(),
                description: String::new(),
                price: dec!(35),
            }),
        };

        assert_eq!(spec.dimensions(), None);
        assert_eq!(spec.struct_frames(), None);
        assert_eq!(spec.kit().map(|k| k.price), Some(dec!(35)));
    }

    #[test]
    fn clamp_quantity_floors_at_one() {
        assert_eq!(clamp_quantity(0), 1);
        assert_eq!(clamp_quantity(-4), 1);
        assert_eq!(clamp_quantity(7), 7);
    }

    #[test]
    fn clamp_quantity_caps_large_input() {
        assert_eq!(clamp_quantity(i64::MAX), MAX_QUANTITY);
        assert_eq!(clamp_quantity(i64::from(u32::MAX) + 1), MAX_QUANTITY);
        assert_eq!(parse_quantity("99999999999"), MAX_QUANTITY);
    }

    #[test]
    fn stored_oversized_quantity_is_capped() {
        let state = QuoteState {
            quantity: u32::MAX,
            ..Default::default()
        };
        let quote = SavedQuote {
            id: "q".to_string(),
            timestamp: Utc::now(),
            user_email: "ana@example.com".to_string(),
            quote_items: vec![
                QuoteItem::new("a", state.clone()),
                QuoteItem::new("b", state.clone()),
            ],
            total_price: Decimal::ZERO,
            customer_name: None,
            project_reference: None,
            ordered_timestamp: None,
        };

        assert_eq!(state.effective_quantity(), MAX_QUANTITY);
        assert_eq!(quote.total_units(), 2 * MAX_QUANTITY);
    }

    #[test]
    fn parse_quantity_coerces_garbage_to_one() {
        assert_eq!(parse_quantity("3"), 3);
        assert_eq!(parse_quantity(" 12 "), 12);
        assert_eq!(parse_quantity("abc"), 1);
        assert_eq!(parse_quantity(""), 1);
        assert_eq!(parse_quantity("-2"), 1);
    }

    #[test]
    fn normalize_ral_code_accepts_common_spellings() {
        assert_eq!(normalize_ral_code("9010"), "RAL 9010");
        assert_eq!(normalize_ral_code("ral9010"), "RAL 9010");
        assert_eq!(normalize_ral_code(" RAL-7016 "), "RAL 7016");
        assert_eq!(normalize_ral_code("  verde oliva "), "verde oliva");
        assert_eq!(normalize_ral_code(""), "");
    }

    #[test]
    fn quote_item_serializes_state_inline() {
        let item = QuoteItem::new("i-1", QuoteState::default());

        let json = serde_json::to_value(&item).unwrap();

        assert_eq!(json["id"], "i-1");
        assert_eq!(json["quantity"], 1);
        assert_eq!(json["spec"]["kind"], "dimensioned");

        let back: QuoteItem = serde_json::from_value(json).unwrap();
        assert_eq!(back, item);
    }

    #[test]
    fn quote_number_uses_timestamp() {
        let quote = SavedQuote {
            id: "q".to_string(),
            timestamp: Utc.with_ymd_and_hms(2025, 3, 7, 9, 5, 1).unwrap(),
            user_email: "a@b.es".to_string(),
            quote_items: vec![],
            total_price: dec!(0),
            customer_name: None,
            project_reference: None,
            ordered_timestamp: None,
        };

        assert_eq!(quote.quote_number(), "P250307-090501");
        assert!(!quote.is_ordered());
    }
}
