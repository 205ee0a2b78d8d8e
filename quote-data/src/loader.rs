use std::collections::HashSet;
use std::fs;
use std::io::Read;
use std::path::Path;

use quote_core::{Catalog, ColorOption, PriceTable, PrivilegedDiscountConfig, ProductLine};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors that can occur when loading catalog data.
#[derive(Debug, Error)]
pub enum CatalogLoaderError {
    #[error("CSV parse error: {0}")]
    CsvParse(String),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("Invalid catalog: {0}")]
    InvalidCatalog(String),

    #[error("Unknown product line '{0}' in price table")]
    UnknownLine(String),

    #[error("Failed to read {path}: {message}")]
    Io { path: String, message: String },
}

impl From<csv::Error> for CatalogLoaderError {
    fn from(err: csv::Error) -> Self {
        CatalogLoaderError::CsvParse(err.to_string())
    }
}

impl From<toml::de::Error> for CatalogLoaderError {
    fn from(err: toml::de::Error) -> Self {
        CatalogLoaderError::TomlParse(err.to_string())
    }
}

/// A single record from a price table CSV file.
///
/// - `line`: product line id (e.g. `CLASSIC`)
/// - `width`, `length`: tray dimensions in centimetres
/// - `price`: pre-VAT catalog price for one unit
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PriceRecord {
    pub line: String,
    pub width: u32,
    pub length: u32,
    pub price: Decimal,
}

/// Loader for `line,width,length,price` CSV files.
pub struct PriceTableLoader;

impl PriceTableLoader {
    /// Parse price records from a CSV reader.
    pub fn parse<R: Read>(reader: R) -> Result<Vec<PriceRecord>, CatalogLoaderError> {
        let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut records = Vec::new();

        for result in csv_reader.deserialize() {
            let record: PriceRecord = result?;
            if record.price.is_sign_negative() {
                return Err(CatalogLoaderError::CsvParse(format!(
                    "negative price for {} {}x{}",
                    record.line, record.width, record.length
                )));
            }
            records.push(record);
        }

        Ok(records)
    }

    /// Collect records into a table. Later rows win over earlier duplicates.
    pub fn build(records: &[PriceRecord]) -> PriceTable {
        let mut table = PriceTable::new();
        for record in records {
            let replaced = table.insert(&record.line, record.width, record.length, record.price);
            if let Some(previous) = replaced {
                warn!(
                    line = %record.line,
                    width = record.width,
                    length = record.length,
                    %previous,
                    "duplicate price entry, keeping the last one"
                );
            }
        }
        table
    }
}

/// A product line as written in the catalog definition.
///
/// `palette` lists ids from the shared palette; those colors are appended to
/// any colors the line defines inline.
#[derive(Debug, Clone, Deserialize)]
pub struct LineDefinition {
    #[serde(flatten)]
    pub line: ProductLine,
    #[serde(default)]
    pub palette: Vec<String>,
}

/// The TOML catalog definition.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogDefinition {
    #[serde(default)]
    pub privileged_discount: PrivilegedDiscountConfig,
    #[serde(default)]
    pub palette: Vec<ColorOption>,
    pub lines: Vec<LineDefinition>,
}

/// Builds a [`Catalog`] from a TOML definition and a price table CSV.
pub struct CatalogLoader;

impl CatalogLoader {
    pub fn parse_definition(source: &str) -> Result<CatalogDefinition, CatalogLoaderError> {
        Ok(toml::from_str(source)?)
    }

    /// Resolve palette references, check cross references and attach prices.
    ///
    /// Every extra a line refers to (defaults, exclusive groups, grille
    /// surcharges) must exist on the line, and every price row must belong
    /// to a known line.
    pub fn build(
        definition: CatalogDefinition,
        prices: PriceTable,
        price_records: &[PriceRecord],
    ) -> Result<Catalog, CatalogLoaderError> {
        let mut seen = HashSet::new();
        let mut lines = Vec::with_capacity(definition.lines.len());

        for LineDefinition { mut line, palette } in definition.lines {
            if !seen.insert(line.id.clone()) {
                return Err(CatalogLoaderError::InvalidCatalog(format!(
                    "duplicate product line '{}'",
                    line.id
                )));
            }

            for color_id in &palette {
                let color = definition
                    .palette
                    .iter()
                    .find(|color| &color.id == color_id)
                    .ok_or_else(|| {
                        CatalogLoaderError::InvalidCatalog(format!(
                            "line '{}' uses unknown palette color '{}'",
                            line.id, color_id
                        ))
                    })?;
                line.colors.push(color.clone());
            }

            Self::check_extra_references(&line)?;
            debug!(line = %line.id, kind = ?line.kind, "catalog line loaded");
            lines.push(line);
        }

        if let Some(record) = price_records.iter().find(|r| !seen.contains(&r.line)) {
            return Err(CatalogLoaderError::UnknownLine(record.line.clone()));
        }

        if !seen.contains(&definition.privileged_discount.threshold_family) {
            warn!(
                family = %definition.privileged_discount.threshold_family,
                "privileged discount threshold family is not a catalog line"
            );
        }

        Ok(Catalog::new(lines, prices, definition.privileged_discount))
    }

    /// Parse both sources and build the catalog.
    pub fn from_sources(definition: &str, prices: &str) -> Result<Catalog, CatalogLoaderError> {
        let definition = Self::parse_definition(definition)?;
        let records = PriceTableLoader::parse(prices.as_bytes())?;
        let table = PriceTableLoader::build(&records);
        Self::build(definition, table, &records)
    }

    /// Read both files and build the catalog.
    pub fn load_files(definition: &Path, prices: &Path) -> Result<Catalog, CatalogLoaderError> {
        let definition = read_to_string(definition)?;
        let prices = read_to_string(prices)?;
        Self::from_sources(&definition, &prices)
    }

    fn check_extra_references(line: &ProductLine) -> Result<(), CatalogLoaderError> {
        let grille_ids = line
            .grille_surcharge
            .iter()
            .flat_map(|surcharge| surcharge.extra_ids.iter());
        let referenced = line
            .default_extras
            .iter()
            .chain(line.exclusive_extra_groups.iter().flatten())
            .chain(grille_ids);

        for extra_id in referenced {
            if line.extra(extra_id).is_none() {
                return Err(CatalogLoaderError::InvalidCatalog(format!(
                    "line '{}' refers to unknown extra '{}'",
                    line.id, extra_id
                )));
            }
        }
        Ok(())
    }
}

fn read_to_string(path: &Path) -> Result<String, CatalogLoaderError> {
    fs::read_to_string(path).map_err(|e| CatalogLoaderError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}
