//! Reference data for the configurator: product lines, their options and the
//! dimension price table.
//!
//! A [`Catalog`] is built once at startup and only read afterwards. Quote
//! items keep copies of the options they were configured with, so a saved
//! quote stays self-contained even if the catalog changes later.

use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Extra that switches the item to a custom RAL color.
pub const RAL_EXTRA_ID: &str = "ral";

/// Extra that enables the two-tone finish.
pub const BITONO_EXTRA_ID: &str = "bitono";

/// A model variant or an add-on.
///
/// `price` is an absolute surcharge. `price_factor` is only meaningful on
/// models, where it multiplies the dimension base price.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductOption {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: Decimal,
    #[serde(default, alias = "price_factor", skip_serializing_if = "Option::is_none")]
    pub price_factor: Option<Decimal>,
}

/// A standard finish from the color palette.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColorOption {
    pub id: String,
    pub name: String,
    pub hex: String,
    #[serde(default)]
    pub price: Decimal,
}

/// A fixed-price unit sold on a kit line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KitProduct {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
}

/// How items of a product line are configured and priced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    /// Priced from the width × length table.
    #[default]
    Dimensioned,
    /// Priced from the width × length table, no frame count.
    Countertop,
    /// Fixed-price kits, no dimensions.
    Kit,
    /// Made-to-order pieces handled by the sales office.
    Custom,
}

/// Surcharge for a grille extra at a given tray width.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidthSurcharge {
    pub width: u32,
    pub price: Decimal,
}

/// Width-dependent pricing for grille extras.
///
/// Widths missing from `by_width` fall back to the extra's own price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrilleSurcharge {
    pub extra_ids: Vec<String>,
    pub by_width: Vec<WidthSurcharge>,
}

impl GrilleSurcharge {
    pub fn applies_to(&self, extra_id: &str) -> bool {
        self.extra_ids.iter().any(|id| id == extra_id)
    }

    pub fn price_for_width(&self, width: u32) -> Option<Decimal> {
        self.by_width
            .iter()
            .find(|entry| entry.width == width)
            .map(|entry| entry.price)
    }
}

/// A product family. The id doubles as the discount bucket key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductLine {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub kind: LineKind,
    #[serde(default)]
    pub widths: Vec<u32>,
    #[serde(default)]
    pub lengths: Vec<u32>,
    #[serde(default)]
    pub default_width: Option<u32>,
    #[serde(default)]
    pub default_length: Option<u32>,
    #[serde(default)]
    pub models: Vec<ProductOption>,
    #[serde(default)]
    pub colors: Vec<ColorOption>,
    #[serde(default)]
    pub extras: Vec<ProductOption>,
    /// Extras pre-selected when the line is chosen.
    #[serde(default)]
    pub default_extras: Vec<String>,
    /// Groups of extras of which at most one may be selected.
    #[serde(default)]
    pub exclusive_extra_groups: Vec<Vec<String>>,
    #[serde(default)]
    pub kits: Vec<KitProduct>,
    #[serde(default)]
    pub grille_surcharge: Option<GrilleSurcharge>,
    /// Base price is scaled by the number of structural frames.
    #[serde(default)]
    pub frame_discount: bool,
}

impl ProductLine {
    pub fn is_custom(&self) -> bool {
        self.kind == LineKind::Custom
    }

    pub fn model(&self, id: &str) -> Option<&ProductOption> {
        self.models.iter().find(|m| m.id == id)
    }

    pub fn color(&self, id: &str) -> Option<&ColorOption> {
        self.colors.iter().find(|c| c.id == id)
    }

    pub fn extra(&self, id: &str) -> Option<&ProductOption> {
        self.extras.iter().find(|e| e.id == id)
    }

    pub fn kit(&self, id: &str) -> Option<&KitProduct> {
        self.kits.iter().find(|k| k.id == id)
    }

    /// The single model of lines that only offer one.
    pub fn fixed_model(&self) -> Option<&ProductOption> {
        match self.models.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }

    /// Other members of the exclusive group `extra_id` belongs to.
    pub fn conflicting_extras<'a>(&'a self, extra_id: &'a str) -> impl Iterator<Item = &'a str> {
        self.exclusive_extra_groups
            .iter()
            .filter(move |group| group.iter().any(|id| id == extra_id))
            .flat_map(|group| group.iter())
            .map(String::as_str)
            .filter(move |id| *id != extra_id)
    }

    pub fn offers_models(&self) -> bool {
        !self.models.is_empty()
    }

    pub fn offers_colors(&self) -> bool {
        !self.colors.is_empty()
    }
}

/// Base prices keyed by product line, width and length (cm).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriceTable {
    entries: HashMap<String, BTreeMap<u32, BTreeMap<u32, Decimal>>>,
}

impl PriceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a price, returning the one it replaced.
    pub fn insert(
        &mut self,
        line: &str,
        width: u32,
        length: u32,
        price: Decimal,
    ) -> Option<Decimal> {
        self.entries
            .entry(line.to_string())
            .or_default()
            .entry(width)
            .or_default()
            .insert(length, price)
    }

    pub fn get(
        &self,
        line: &str,
        width: u32,
        length: u32,
    ) -> Option<Decimal> {
        self.entries
            .get(line)
            .and_then(|widths| widths.get(&width))
            .and_then(|lengths| lengths.get(&length))
            .copied()
    }

    /// Widths priced for `line`, ascending.
    pub fn widths(&self, line: &str) -> Vec<u32> {
        self.entries
            .get(line)
            .map(|widths| widths.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Lengths priced for `line` at `width`, ascending.
    pub fn lengths(&self, line: &str, width: u32) -> Vec<u32> {
        self.entries
            .get(line)
            .and_then(|widths| widths.get(&width))
            .map(|lengths| lengths.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries
            .values()
            .flat_map(|widths| widths.values())
            .map(BTreeMap::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Parameters of the automatic discount granted to privileged users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivilegedDiscountConfig {
    /// Family whose discount depends on the accumulated quantity.
    pub threshold_family: String,
    /// Units of the family needed to unlock `threshold_percentage`.
    pub threshold_quantity: u32,
    pub threshold_percentage: Decimal,
    /// Flat percentage for every other family.
    pub default_percentage: Decimal,
}

impl Default for PrivilegedDiscountConfig {
    fn default() -> Self {
        Self {
            threshold_family: "LUXE".to_string(),
            threshold_quantity: 10,
            threshold_percentage: Decimal::from(71),
            default_percentage: Decimal::from(55),
        }
    }
}

/// The complete, read-only catalog.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    lines: Vec<ProductLine>,
    price_table: PriceTable,
    privileged_discount: PrivilegedDiscountConfig,
}

impl Catalog {
    pub fn new(
        lines: Vec<ProductLine>,
        price_table: PriceTable,
        privileged_discount: PrivilegedDiscountConfig,
    ) -> Self {
        Self {
            lines,
            price_table,
            privileged_discount,
        }
    }

    /// Product lines in presentation order.
    pub fn lines(&self) -> &[ProductLine] {
        &self.lines
    }

    pub fn line(&self, id: &str) -> Option<&ProductLine> {
        self.lines.iter().find(|line| line.id == id)
    }

    pub fn price_table(&self) -> &PriceTable {
        &self.price_table
    }

    pub fn base_price(
        &self,
        line: &str,
        width: u32,
        length: u32,
    ) -> Option<Decimal> {
        self.price_table.get(line, width, length)
    }

    pub fn privileged_discount(&self) -> &PrivilegedDiscountConfig {
        &self.privileged_discount
    }
}
