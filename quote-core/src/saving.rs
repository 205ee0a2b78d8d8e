//! Turning builder items into a [`SavedQuote`].

use chrono::{DateTime, Utc};

use crate::calculations::{PricingEngine, QuoteTotals, internal_policy};
use crate::ids::IdGenerator;
use crate::models::{Catalog, QuoteItem, SavedQuote, User};

/// Customer details typed in when saving.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuoteDetails {
    pub customer_name: Option<String>,
    pub project_reference: Option<String>,
}

/// Builds a new quote owned by `user`.
///
/// `total_price` is the VAT-inclusive total as `user` sees it, i.e. with the
/// user's internal discount already applied.
pub fn new_saved_quote(
    user: &User,
    items: Vec<QuoteItem>,
    details: QuoteDetails,
    catalog: &Catalog,
    ids: &mut dyn IdGenerator,
    now: DateTime<Utc>,
) -> SavedQuote {
    let engine = PricingEngine::new(catalog);
    let policy = internal_policy(user, catalog);
    let totals = QuoteTotals::with_policy(&engine, &items, policy.as_ref());

    SavedQuote {
        id: ids.next_id(),
        timestamp: now,
        user_email: user.email.clone(),
        quote_items: items,
        total_price: totals.total,
        customer_name: details.customer_name,
        project_reference: details.project_reference,
        ordered_timestamp: None,
    }
}
