use tracing::{debug, trace};

use crate::ids::IdGenerator;
use crate::models::{
    BITONO_EXTRA_ID, Catalog, ItemSpec, ProductLine, QuoteItem, QuoteState,
    RAL_EXTRA_ID, clamp_quantity, normalize_ral_code, parse_quantity,
};

use super::gates::{validate_all, validate_step};
use super::{BuilderEvent, BuilderState, Step, Transition};

/// Applies one event to the builder state.
///
/// `ids` is only consulted when an item is appended or duplicated.
pub fn reduce(
    mut state: BuilderState,
    event: BuilderEvent,
    catalog: &Catalog,
    ids: &mut dyn IdGenerator,
) -> (BuilderState, Transition) {
    trace!(?event, step = ?state.step, "reduce");
    let line = state
        .current
        .product_line
        .as_deref()
        .and_then(|id| catalog.line(id));

    let transition = match event {
        BuilderEvent::Next => {
            if state.step == Step::Summary {
                Transition::Ignored
            } else if let Err(failure) = validate_step(state.step, &state.current, catalog) {
                debug!(step = ?state.step, %failure, "step blocked");
                Transition::Blocked(failure)
            } else if state.step == Step::Extras {
                finalize(&mut state, ids)
            } else {
                state.step = state.step.next();
                Transition::Moved(state.step)
            }
        }
        BuilderEvent::Prev => {
            if state.step == Step::ProductLine {
                Transition::Ignored
            } else {
                state.step = state.step.prev();
                Transition::Moved(state.step)
            }
        }
        BuilderEvent::Finalize => {
            if !state.is_editing() {
                Transition::Ignored
            } else if let Err(failure) = validate_all(&state.current, catalog) {
                Transition::Blocked(failure)
            } else {
                finalize(&mut state, ids)
            }
        }
        BuilderEvent::SelectProductLine(id) => match catalog.line(&id) {
            Some(line) => {
                state.current = line_defaults(line, state.current.quantity);
                state.contact_required = line.is_custom();
                if state.contact_required {
                    Transition::ContactRequired
                } else {
                    Transition::Updated
                }
            }
            None => {
                debug!(line = %id, "unknown product line");
                Transition::Ignored
            }
        },
        BuilderEvent::DismissContact => {
            if state.contact_required {
                state.contact_required = false;
                state.current.product_line = None;
                Transition::Updated
            } else {
                Transition::Ignored
            }
        }
        BuilderEvent::SetQuantity(raw) => {
            state.current.quantity = clamp_quantity(raw);
            Transition::Updated
        }
        BuilderEvent::SetQuantityInput(input) => {
            state.current.quantity = parse_quantity(&input);
            Transition::Updated
        }
        BuilderEvent::SetWidth(value) => match &mut state.current.spec {
            ItemSpec::Dimensioned { width, .. } | ItemSpec::Countertop { width, .. } => {
                *width = Some(value);
                Transition::Updated
            }
            ItemSpec::Kit { .. } => Transition::Ignored,
        },
        BuilderEvent::SetLength(value) => match &mut state.current.spec {
            ItemSpec::Dimensioned { length, .. } | ItemSpec::Countertop { length, .. } => {
                *length = Some(value);
                Transition::Updated
            }
            ItemSpec::Kit { .. } => Transition::Ignored,
        },
        BuilderEvent::SetStructFrames(frames) => match &mut state.current.spec {
            ItemSpec::Dimensioned { struct_frames, .. } if (1..=4).contains(&frames) => {
                *struct_frames = Some(frames);
                Transition::Updated
            }
            _ => Transition::Ignored,
        },
        BuilderEvent::SelectKit(id) => {
            let kit = line.and_then(|line| line.kit(&id)).cloned();
            match (&mut state.current.spec, kit) {
                (ItemSpec::Kit { kit: slot }, Some(kit)) => {
                    *slot = Some(kit);
                    Transition::Updated
                }
                _ => Transition::Ignored,
            }
        }
        BuilderEvent::SelectModel(id) => match line.and_then(|line| line.model(&id)) {
            Some(model) => {
                state.current.model = Some(model.clone());
                advance_from(&mut state, Step::Model)
            }
            None => Transition::Ignored,
        },
        BuilderEvent::SelectColor(id) => match line.and_then(|line| line.color(&id)) {
            Some(color) => {
                state.current.color = Some(color.clone());
                state.current.remove_extra(RAL_EXTRA_ID);
                state.current.ral_code.clear();
                advance_from(&mut state, Step::Color)
            }
            None => Transition::Ignored,
        },
        BuilderEvent::ToggleExtra(id) => match line {
            Some(line) => toggle_extra(&mut state.current, line, &id),
            None => Transition::Ignored,
        },
        BuilderEvent::SetRalCode(code) => {
            if state.current.uses_ral() {
                state.current.ral_code = normalize_ral_code(&code);
                Transition::Updated
            } else {
                Transition::Ignored
            }
        }
        BuilderEvent::SelectBitonoColor(id) => {
            match (state.current.uses_bitono(), line.and_then(|line| line.color(&id))) {
                (true, Some(color)) => {
                    state.current.bitono_color = Some(color.clone());
                    state.current.bitono_ral_code.clear();
                    Transition::Updated
                }
                _ => Transition::Ignored,
            }
        }
        BuilderEvent::SetBitonoRalCode(code) => {
            if state.current.uses_bitono() {
                state.current.bitono_ral_code = normalize_ral_code(&code);
                state.current.bitono_color = None;
                Transition::Updated
            } else {
                Transition::Ignored
            }
        }
        BuilderEvent::SetInvoiceReference(reference) => {
            let reference = reference.trim();
            state.current.invoice_reference =
                (!reference.is_empty()).then(|| reference.to_string());
            Transition::Updated
        }
        BuilderEvent::EditItem(id) => match state.items.iter().find(|item| item.id == id) {
            Some(item) => {
                state.current = item.state.clone();
                state.editing_item_id = Some(id);
                state.contact_required = false;
                state.step = Step::ProductLine;
                Transition::Moved(state.step)
            }
            None => Transition::Ignored,
        },
        BuilderEvent::DeleteItem(id) => {
            let before = state.items.len();
            state.items.retain(|item| item.id != id);
            if state.items.len() == before {
                Transition::Ignored
            } else {
                Transition::ItemRemoved(id)
            }
        }
        BuilderEvent::DuplicateItem(id) => {
            match state.items.iter().find(|item| item.id == id).cloned() {
                Some(original) => {
                    let copy = QuoteItem::new(ids.next_id(), original.state);
                    let new_id = copy.id.clone();
                    state.items.push(copy);
                    Transition::ItemAdded(new_id)
                }
                None => Transition::Ignored,
            }
        }
        BuilderEvent::StartNewItem => {
            if state.step == Step::Summary {
                state.current = QuoteState::default();
                state.editing_item_id = None;
                state.contact_required = false;
                state.step = Step::ProductLine;
                Transition::Moved(state.step)
            } else {
                Transition::Ignored
            }
        }
        BuilderEvent::ResetQuote(items) => {
            state.step = if items.is_empty() {
                Step::ProductLine
            } else {
                Step::Summary
            };
            state.items = items;
            state.current = QuoteState::default();
            state.editing_item_id = None;
            state.contact_required = false;
            Transition::Moved(state.step)
        }
    };

    (state, transition)
}

/// Fresh in-progress item for `line`, keeping the quantity already typed.
fn line_defaults(
    line: &ProductLine,
    quantity: u32,
) -> QuoteState {
    let mut spec = ItemSpec::for_kind(line.kind);
    if let ItemSpec::Dimensioned { width, length, .. } | ItemSpec::Countertop { width, length } =
        &mut spec
    {
        *width = line.default_width;
        *length = line.default_length;
    }

    let extras = line
        .default_extras
        .iter()
        .filter_map(|id| line.extra(id))
        .cloned()
        .collect();

    QuoteState {
        product_line: Some(line.id.clone()),
        spec,
        quantity: quantity.max(1),
        model: line.fixed_model().cloned(),
        extras,
        ..Default::default()
    }
}

/// Auto-advance after a selection made on its own step.
fn advance_from(
    state: &mut BuilderState,
    step: Step,
) -> Transition {
    if state.step == step {
        state.step = step.next();
        Transition::Moved(state.step)
    } else {
        Transition::Updated
    }
}

fn toggle_extra(
    current: &mut QuoteState,
    line: &ProductLine,
    id: &str,
) -> Transition {
    if current.has_extra(id) {
        remove_extra(current, id);
        return Transition::Updated;
    }

    let Some(extra) = line.extra(id) else {
        return Transition::Ignored;
    };

    let conflicts: Vec<String> = line.conflicting_extras(id).map(str::to_string).collect();
    for conflict in &conflicts {
        remove_extra(current, conflict);
    }
    if id == RAL_EXTRA_ID {
        current.color = None;
    }
    current.extras.push(extra.clone());
    Transition::Updated
}

/// Removes an extra together with the sub-selections that depend on it.
fn remove_extra(
    current: &mut QuoteState,
    id: &str,
) {
    if !current.remove_extra(id) {
        return;
    }
    match id {
        RAL_EXTRA_ID => current.ral_code.clear(),
        BITONO_EXTRA_ID => {
            current.bitono_color = None;
            current.bitono_ral_code.clear();
        }
        _ => {}
    }
}

fn finalize(
    state: &mut BuilderState,
    ids: &mut dyn IdGenerator,
) -> Transition {
    let current = std::mem::take(&mut state.current);
    let editing = state.editing_item_id.take();
    let position = editing
        .as_deref()
        .and_then(|id| state.items.iter().position(|item| item.id == id));

    let transition = match position {
        Some(index) => {
            state.items[index].state = current;
            Transition::ItemReplaced(state.items[index].id.clone())
        }
        None => {
            let item = QuoteItem::new(ids.next_id(), current);
            let id = item.id.clone();
            state.items.push(item);
            Transition::ItemAdded(id)
        }
    };

    state.contact_required = false;
    state.step = Step::Summary;
    debug!(?transition, items = state.items.len(), "item finalized");
    transition
}
