//! Application services behind the `quoter` commands.
//!
//! [`App`] owns the catalog and the store and resolves the logged-in user for
//! every quote operation, so commands never touch another account's quotes.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use quote_core::calculations::{
    DiscountRate, FamilyDiscounts, FlatDiscount, LineBreakdown, PricingEngine, QuoteTotals,
    internal_policy, line_breakdowns,
};
use quote_core::db::{MemoryStoreFactory, StoreRegistry};
use quote_core::{
    BuilderEvent, Catalog, KeyValueStore, QuoteDetails, QuoteRepository, SavedQuote,
    SessionManager, StoredUser, User, UuidIds, new_saved_quote,
};
use quote_db_sqlite::SqliteStoreFactory;
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::pdf::{Issuer, QuoteDocument, describe_item, render_to_file};
use crate::wizard::{ScriptOutcome, run_script};

pub type Store = Box<dyn KeyValueStore>;

/// Every storage backend the binary can open.
pub fn build_registry() -> StoreRegistry {
    let mut registry = StoreRegistry::new();
    registry.register(Box::new(SqliteStoreFactory));
    registry.register(Box::new(MemoryStoreFactory));
    registry
}

/// One priced line of a quote as the logged-in user sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteLine {
    pub description: String,
    pub prices: LineBreakdown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteView {
    pub lines: Vec<QuoteLine>,
    pub totals: QuoteTotals,
}

pub struct App {
    config: AppConfig,
    catalog: Arc<Catalog>,
    repository: QuoteRepository<Store>,
}

impl App {
    /// Loads the catalog and opens the configured store.
    pub async fn open(config: AppConfig) -> Result<Self> {
        let catalog = config.load_catalog().context("Failed to load catalog")?;

        debug!("connecting to {} backend", config.database.backend);
        let store = build_registry()
            .create(&config.database)
            .await
            .with_context(|| {
                format!(
                    "Failed to open {} store '{}'",
                    config.database.backend, config.database.connection_string
                )
            })?;

        Ok(Self::new(config, Arc::new(catalog), store))
    }

    pub fn new(
        config: AppConfig,
        catalog: Arc<Catalog>,
        store: Store,
    ) -> Self {
        Self {
            config,
            catalog,
            repository: QuoteRepository::new(store),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn repository(&self) -> &QuoteRepository<Store> {
        &self.repository
    }

    pub fn sessions(&self) -> SessionManager<'_, Store> {
        SessionManager::new(&self.repository)
    }

    pub async fn register_user(
        &self,
        user: User,
        password: String,
    ) -> Result<()> {
        let email = user.email.clone();
        self.repository
            .add_user(StoredUser { user, password })
            .await
            .with_context(|| format!("Failed to register '{}'", email))
    }

    async fn current_user(&self) -> Result<User> {
        Ok(self.sessions().require_user().await?)
    }

    /// Runs a builder script and saves the result as a new quote.
    pub async fn create_quote(
        &self,
        events: Vec<BuilderEvent>,
        details: QuoteDetails,
        now: DateTime<Utc>,
    ) -> Result<(SavedQuote, ScriptOutcome)> {
        let user = self.current_user().await?;
        let outcome = run_script(&self.catalog, UuidIds, Vec::new(), events)?;
        let quote = self.save_new(&user, &outcome, details, now).await?;
        Ok((quote, outcome))
    }

    /// Saves a copy of quote `id` under a new id, after applying `events` to
    /// its items. The copy is priced with the current catalog and is not
    /// ordered.
    pub async fn duplicate_quote(
        &self,
        id: &str,
        events: Vec<BuilderEvent>,
        now: DateTime<Utc>,
    ) -> Result<(SavedQuote, ScriptOutcome)> {
        let user = self.current_user().await?;
        let original = self.load_quote(&user, id).await?;
        let details = QuoteDetails {
            customer_name: original.customer_name,
            project_reference: original.project_reference,
        };

        let outcome = run_script(&self.catalog, UuidIds, original.quote_items, events)?;
        let quote = self.save_new(&user, &outcome, details, now).await?;
        info!(from = id, to = %quote.id, "quote duplicated");
        Ok((quote, outcome))
    }

    async fn save_new(
        &self,
        user: &User,
        outcome: &ScriptOutcome,
        details: QuoteDetails,
        now: DateTime<Utc>,
    ) -> Result<SavedQuote> {
        let quote = new_saved_quote(
            user,
            outcome.items.clone(),
            details,
            &self.catalog,
            &mut UuidIds,
            now,
        );
        self.repository
            .save_quote(&quote)
            .await
            .context("Failed to save quote")?;
        Ok(quote)
    }

    /// The logged-in user's quotes, newest first.
    pub async fn list_quotes(&self) -> Result<Vec<SavedQuote>> {
        let user = self.current_user().await?;
        Ok(self.repository.list_quotes(&user.email).await?)
    }

    pub async fn get_quote(
        &self,
        id: &str,
    ) -> Result<SavedQuote> {
        let user = self.current_user().await?;
        self.load_quote(&user, id).await
    }

    async fn load_quote(
        &self,
        user: &User,
        id: &str,
    ) -> Result<SavedQuote> {
        self.repository
            .get_quote(id, &user.email)
            .await
            .with_context(|| format!("Quote '{}' not found", id))
    }

    pub async fn delete_quote(
        &self,
        id: &str,
    ) -> Result<()> {
        let user = self.current_user().await?;
        self.repository
            .delete_quote(id, &user.email)
            .await
            .with_context(|| format!("Failed to delete quote '{}'", id))
    }

    pub async fn order_quote(
        &self,
        id: &str,
        now: DateTime<Utc>,
    ) -> Result<SavedQuote> {
        let user = self.current_user().await?;
        self.repository
            .mark_ordered(id, &user.email, now)
            .await
            .with_context(|| format!("Failed to mark quote '{}' as ordered", id))
    }

    /// Lines and totals of `quote` under the logged-in user's internal
    /// discount, VAT excluded per line.
    pub async fn quote_view(
        &self,
        quote: &SavedQuote,
    ) -> Result<QuoteView> {
        let user = self.current_user().await?;
        let engine = PricingEngine::new(&self.catalog);
        let policy = internal_policy(&user, &self.catalog);

        let lines = line_breakdowns(&engine, &quote.quote_items, policy.as_ref())
            .into_iter()
            .zip(&quote.quote_items)
            .map(|(prices, item)| QuoteLine {
                description: describe_item(&item.state, &self.catalog),
                prices,
            })
            .collect();
        let totals = QuoteTotals::with_policy(&engine, &quote.quote_items, policy.as_ref());

        Ok(QuoteView { lines, totals })
    }

    pub async fn internal_document(
        &self,
        id: &str,
        discount: DiscountRate,
    ) -> Result<QuoteDocument> {
        let user = self.current_user().await?;
        let quote = self.load_quote(&user, id).await?;
        Ok(QuoteDocument::internal(
            &quote,
            self.issuer(&user),
            &self.catalog,
            FlatDiscount::new(discount),
        ))
    }

    pub async fn customer_document(
        &self,
        id: &str,
        discounts: &FamilyDiscounts,
    ) -> Result<QuoteDocument> {
        let user = self.current_user().await?;
        let quote = self.load_quote(&user, id).await?;
        Ok(QuoteDocument::customer(
            &quote,
            self.issuer(&user),
            &self.catalog,
            discounts,
        ))
    }

    fn issuer(
        &self,
        user: &User,
    ) -> Issuer {
        Issuer::for_user(user, self.config.pdf.issuer.as_deref())
    }

    /// Renders `document` into `output_dir` (the configured directory when
    /// `None`), creating the directory if needed.
    pub fn write_document(
        &self,
        document: &QuoteDocument,
        output_dir: Option<&Path>,
    ) -> Result<PathBuf> {
        let dir = output_dir.unwrap_or(self.config.pdf.output_dir.as_path());
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory '{}'", dir.display()))?;

        let path = dir.join(document.file_name());
        render_to_file(document, &path)
            .with_context(|| format!("Failed to write '{}'", path.display()))?;
        Ok(path)
    }
}
