//! Scripted runs of the quote builder.
//!
//! A script is a JSON array of builder events, the same shape the builder
//! serializes them in:
//!
//! ```json
//! [
//!   {"event": "select_product_line", "value": "CLASSIC"},
//!   {"event": "next"},
//!   {"event": "set_width", "value": 80}
//! ]
//! ```
//!
//! Events run in order. A blocked step does not abort the script; the gate
//! failure is recorded and the following events still apply.

use std::fs;
use std::path::Path;

use quote_core::{
    BuilderEvent, Catalog, GateFailure, IdGenerator, QuoteBuilder, QuoteItem, Transition,
};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("cannot read script '{path}': {message}")]
    Io { path: String, message: String },

    #[error("invalid script: {0}")]
    Parse(String),

    #[error("script finished without any quote item")]
    NoItems,
}

/// A gate failure hit while running a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockedEvent {
    /// Zero-based position of the event in the script.
    pub index: usize,
    pub failure: GateFailure,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptOutcome {
    pub items: Vec<QuoteItem>,
    pub blocked: Vec<BlockedEvent>,
    /// A made-to-order line was chosen somewhere in the script.
    pub contact_required: bool,
}

pub fn parse_script(source: &str) -> Result<Vec<BuilderEvent>, ScriptError> {
    serde_json::from_str(source).map_err(|e| ScriptError::Parse(e.to_string()))
}

pub fn load_script(path: &Path) -> Result<Vec<BuilderEvent>, ScriptError> {
    let source = fs::read_to_string(path).map_err(|e| ScriptError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    parse_script(&source)
}

/// Replays `events` on a builder seeded with `items`.
///
/// Fails only when the run ends with no items at all.
pub fn run_script<G: IdGenerator>(
    catalog: &Catalog,
    ids: G,
    items: Vec<QuoteItem>,
    events: Vec<BuilderEvent>,
) -> Result<ScriptOutcome, ScriptError> {
    let mut builder = QuoteBuilder::with_items(catalog, ids, items);
    let mut blocked = Vec::new();
    let mut contact_required = false;

    for (index, event) in events.into_iter().enumerate() {
        match builder.dispatch(event) {
            Transition::Blocked(failure) => {
                warn!(index, %failure, "script event blocked");
                blocked.push(BlockedEvent { index, failure });
            }
            Transition::ContactRequired => contact_required = true,
            _ => {}
        }
    }

    let items = builder.into_items();
    if items.is_empty() {
        return Err(ScriptError::NoItems);
    }

    info!(items = items.len(), blocked = blocked.len(), "script finished");
    Ok(ScriptOutcome {
        items,
        blocked,
        contact_required,
    })
}
