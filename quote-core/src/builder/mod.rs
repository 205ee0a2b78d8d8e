//! The multi-step quote builder.
//!
//! The wizard is an explicit state machine: [`reduce`] takes the current
//! [`BuilderState`] and a [`BuilderEvent`] and returns the next state
//! together with a [`Transition`] describing what happened. Validation
//! failures are reported as [`Transition::Blocked`] and leave the state
//! untouched; no event can panic.
//!
//! [`QuoteBuilder`] wraps the reducer with a catalog and an id generator
//! for callers that just want to push events.

mod gates;
mod reducer;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::ids::IdGenerator;
use crate::models::{Catalog, QuoteItem, QuoteState};

pub use gates::{validate_all, validate_step};
pub use reducer::reduce;

/// Id given to the in-progress item in [`BuilderState::preview_items`].
pub const PREVIEW_ITEM_ID: &str = "preview";

/// Wizard steps in order. `Summary` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    #[default]
    ProductLine,
    Dimensions,
    Model,
    Color,
    Extras,
    Summary,
}

impl Step {
    pub const CONFIGURATION: [Step; 5] = [
        Step::ProductLine,
        Step::Dimensions,
        Step::Model,
        Step::Color,
        Step::Extras,
    ];

    /// 1-based position shown to the user.
    pub fn number(self) -> u8 {
        match self {
            Self::ProductLine => 1,
            Self::Dimensions => 2,
            Self::Model => 3,
            Self::Color => 4,
            Self::Extras => 5,
            Self::Summary => 6,
        }
    }

    pub fn next(self) -> Self {
        match self {
            Self::ProductLine => Self::Dimensions,
            Self::Dimensions => Self::Model,
            Self::Model => Self::Color,
            Self::Color => Self::Extras,
            Self::Extras | Self::Summary => Self::Summary,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Self::ProductLine | Self::Dimensions => Self::ProductLine,
            Self::Model => Self::Dimensions,
            Self::Color => Self::Model,
            Self::Extras => Self::Color,
            Self::Summary => Self::Extras,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::ProductLine => "Product line",
            Self::Dimensions => "Dimensions",
            Self::Model => "Model",
            Self::Color => "Color",
            Self::Extras => "Extras",
            Self::Summary => "Summary",
        }
    }
}

/// Why a step cannot be left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GateFailure {
    #[error("choose a product line")]
    NoProductLine,

    #[error("this product line is made to order, contact the sales office")]
    CustomLine,

    #[error("quantity must be at least 1")]
    InvalidQuantity,

    #[error("choose width and length")]
    MissingDimensions,

    #[error("choose a kit")]
    MissingKit,

    #[error("choose a model")]
    MissingModel,

    #[error("choose a color or a RAL code")]
    MissingColor,

    #[error("enter the RAL code")]
    MissingRalCode,

    #[error("choose the second color of the two-tone finish")]
    MissingBitonoColor,
}

/// Input to the reducer.
///
/// Serialized as `{"event": "select_color", "value": "blanco"}`, which is
/// the format of wizard scripts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "value", rename_all = "snake_case")]
pub enum BuilderEvent {
    Next,
    Prev,
    /// Saves the item being edited without walking the remaining steps.
    Finalize,
    SelectProductLine(String),
    DismissContact,
    SetQuantity(i64),
    SetQuantityInput(String),
    SetWidth(u32),
    SetLength(u32),
    SetStructFrames(u8),
    SelectKit(String),
    SelectModel(String),
    SelectColor(String),
    ToggleExtra(String),
    SetRalCode(String),
    SelectBitonoColor(String),
    SetBitonoRalCode(String),
    SetInvoiceReference(String),
    EditItem(String),
    DeleteItem(String),
    DuplicateItem(String),
    StartNewItem,
    ResetQuote(Vec<QuoteItem>),
}

/// Outcome of one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// The wizard moved to another step.
    Moved(Step),
    /// The in-progress item changed, the step did not.
    Updated,
    /// The event did not apply; state unchanged.
    Ignored,
    /// The current step's gate failed; state unchanged.
    Blocked(GateFailure),
    /// A made-to-order line was chosen.
    ContactRequired,
    ItemAdded(String),
    ItemReplaced(String),
    ItemRemoved(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BuilderState {
    pub step: Step,
    pub current: QuoteState,
    pub items: Vec<QuoteItem>,
    pub editing_item_id: Option<String>,
    pub contact_required: bool,
}

impl BuilderState {
    /// Committed items plus the in-progress one, for live price previews.
    ///
    /// While editing, the in-progress state takes the place of the item it
    /// came from; otherwise it is appended as [`PREVIEW_ITEM_ID`]. Nothing is
    /// added while no product line is chosen.
    pub fn preview_items(&self) -> Vec<QuoteItem> {
        let mut items = self.items.clone();
        if self.current.product_line.is_none() {
            return items;
        }

        let editing = self
            .editing_item_id
            .as_deref()
            .and_then(|id| items.iter().position(|item| item.id == id));
        match editing {
            Some(index) => items[index].state = self.current.clone(),
            None => items.push(QuoteItem::new(PREVIEW_ITEM_ID, self.current.clone())),
        }
        items
    }

    pub fn is_editing(&self) -> bool {
        self.editing_item_id.is_some()
    }
}

/// Reducer bound to a catalog and an id generator.
pub struct QuoteBuilder<'a, G> {
    catalog: &'a Catalog,
    ids: G,
    state: BuilderState,
}

impl<'a, G: IdGenerator> QuoteBuilder<'a, G> {
    pub fn new(
        catalog: &'a Catalog,
        ids: G,
    ) -> Self {
        Self {
            catalog,
            ids,
            state: BuilderState::default(),
        }
    }

    /// Builder seeded with existing items, as when duplicating a quote.
    pub fn with_items(
        catalog: &'a Catalog,
        ids: G,
        items: Vec<QuoteItem>,
    ) -> Self {
        let mut builder = Self::new(catalog, ids);
        builder.dispatch(BuilderEvent::ResetQuote(items));
        builder
    }

    pub fn dispatch(
        &mut self,
        event: BuilderEvent,
    ) -> Transition {
        let from = self.state.step;
        let state = std::mem::take(&mut self.state);
        let (state, transition) = reduce(state, event, self.catalog, &mut self.ids);
        self.state = state;
        debug!(?from, to = ?self.state.step, ?transition, "builder event");
        transition
    }

    pub fn catalog(&self) -> &'a Catalog {
        self.catalog
    }

    pub fn state(&self) -> &BuilderState {
        &self.state
    }

    pub fn items(&self) -> &[QuoteItem] {
        &self.state.items
    }

    pub fn into_items(self) -> Vec<QuoteItem> {
        self.state.items
    }
}
