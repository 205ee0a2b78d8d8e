//! `quoter.toml` configuration.
//!
//! Every section is optional; a missing default file means built-in
//! defaults everywhere.
//!
//! ```toml
//! [database]
//! backend = "sqlite"
//! connection_string = "quoter.db"
//!
//! [logging]
//! level = "info"
//! file = "quoter.log"
//!
//! [catalog]
//! definition = "catalog.toml"
//! price_table = "price_tables.csv"
//!
//! [pdf]
//! output_dir = "presupuestos"
//! issuer = "Baños del Sur S.L."
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use quote_core::Catalog;
use quote_core::db::DbConfig;
use quote_data::{CatalogLoader, CatalogLoaderError, builtin_catalog};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

pub const DEFAULT_CONFIG_FILE: &str = "quoter.toml";
pub const DEFAULT_DATABASE_FILE: &str = "quoter.db";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file '{path}': {message}")]
    Io { path: String, message: String },

    #[error("invalid config file '{path}': {message}")]
    Parse { path: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DbConfig,
    pub logging: LoggingConfig,
    pub catalog: CatalogConfig,
    pub pdf: PdfConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DbConfig {
                backend: "sqlite".to_string(),
                connection_string: DEFAULT_DATABASE_FILE.to_string(),
            },
            logging: LoggingConfig::default(),
            catalog: CatalogConfig::default(),
            pdf: PdfConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Bare level or full `EnvFilter` directive. `RUST_LOG` wins when set.
    pub level: String,
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            file: None,
        }
    }
}

/// Catalog files replacing the built-in catalog. Both or neither.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub definition: Option<PathBuf>,
    pub price_table: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    pub output_dir: PathBuf,
    /// Company printed in the document header when the user has no
    /// commercial name of their own.
    pub issuer: Option<String>,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            issuer: None,
        }
    }
}

impl AppConfig {
    pub fn parse(source: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(source).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Load `path`, or [`DEFAULT_CONFIG_FILE`] when `None`.
    ///
    /// An explicit path must exist; a missing default file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, required) = match path {
            Some(path) => (path, true),
            None => (Path::new(DEFAULT_CONFIG_FILE), false),
        };

        if !required && !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let source = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::parse(&source, path)
    }

    /// The configured catalog files, or the built-in catalog.
    pub fn load_catalog(&self) -> Result<Catalog, CatalogLoaderError> {
        match (&self.catalog.definition, &self.catalog.price_table) {
            (Some(definition), Some(prices)) => {
                info!(
                    definition = %definition.display(),
                    prices = %prices.display(),
                    "loading catalog files"
                );
                CatalogLoader::load_files(definition, prices)
            }
            (None, None) => builtin_catalog(),
            _ => Err(CatalogLoaderError::InvalidCatalog(
                "[catalog] needs both 'definition' and 'price_table'".to_string(),
            )),
        }
    }
}
