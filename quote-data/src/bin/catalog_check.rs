use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use quote_core::{Catalog, LineKind};
use quote_data::{CatalogLoader, builtin_catalog};
use tracing_subscriber::EnvFilter;

/// Validate a catalog definition and price table and print a summary.
///
/// Without arguments the built-in catalog is checked. The price CSV must
/// have the columns `line,width,length,price`.
#[derive(Parser, Debug)]
#[command(name = "quote-catalog-check")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the TOML catalog definition
    #[arg(short, long, requires = "prices")]
    definition: Option<PathBuf>,

    /// Path to the CSV price table
    #[arg(short, long, requires = "definition")]
    prices: Option<PathBuf>,

    /// Fail when a dimensioned line has width/length pairs without a price
    #[arg(long, default_value_t = false)]
    strict: bool,
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();

    let catalog = match (&args.definition, &args.prices) {
        (Some(definition), Some(prices)) => {
            println!("Checking {} with {}", definition.display(), prices.display());
            CatalogLoader::load_files(definition, prices).with_context(|| {
                format!("Failed to load catalog from: {}", definition.display())
            })?
        }
        _ => {
            println!("Checking built-in catalog");
            builtin_catalog().context("Built-in catalog is invalid")?
        }
    };

    let gaps = print_summary(&catalog);
    if args.strict && gaps > 0 {
        bail!("{gaps} width/length combinations have no price");
    }

    Ok(())
}

/// Prints one row per line and returns the number of unpriced dimension pairs.
fn print_summary(catalog: &Catalog) -> usize {
    println!(
        "{:<10} {:<12} {:>7} {:>6} {:>6} {:>6} {:>5}",
        "line", "kind", "prices", "models", "colors", "extras", "kits"
    );

    let mut gaps = 0;
    for line in catalog.lines() {
        let priced = catalog
            .price_table()
            .widths(&line.id)
            .iter()
            .map(|width| catalog.price_table().lengths(&line.id, *width).len())
            .sum::<usize>();

        if matches!(line.kind, LineKind::Dimensioned | LineKind::Countertop) {
            for width in &line.widths {
                for length in &line.lengths {
                    if catalog.base_price(&line.id, *width, *length).is_none() {
                        println!("  missing price: {} {}x{}", line.id, width, length);
                        gaps += 1;
                    }
                }
            }
        }

        println!(
            "{:<10} {:<12} {:>7} {:>6} {:>6} {:>6} {:>5}",
            line.id,
            format!("{:?}", line.kind),
            priced,
            line.models.len(),
            line.colors.len(),
            line.extras.len(),
            line.kits.len()
        );
    }

    println!(
        "{} lines, {} prices, privileged discount: {} from {} units ({}% / {}%)",
        catalog.lines().len(),
        catalog.price_table().len(),
        catalog.privileged_discount().threshold_family,
        catalog.privileged_discount().threshold_quantity,
        catalog.privileged_discount().threshold_percentage,
        catalog.privileged_discount().default_percentage,
    );

    gaps
}
