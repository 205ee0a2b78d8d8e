use crate::models::{Catalog, ItemSpec, QuoteState};

use super::{GateFailure, Step};

/// Checks whether `state` may leave `step`.
///
/// Steps that do not apply to the chosen line (models, colors) always pass.
pub fn validate_step(
    step: Step,
    state: &QuoteState,
    catalog: &Catalog,
) -> Result<(), GateFailure> {
    if step == Step::Summary {
        return Ok(());
    }

    let line = state
        .product_line
        .as_deref()
        .and_then(|id| catalog.line(id))
        .ok_or(GateFailure::NoProductLine)?;

    match step {
        Step::ProductLine => {
            if line.is_custom() {
                return Err(GateFailure::CustomLine);
            }
            if state.quantity < 1 {
                return Err(GateFailure::InvalidQuantity);
            }
        }
        Step::Dimensions => match &state.spec {
            ItemSpec::Kit { kit } => {
                if kit.is_none() {
                    return Err(GateFailure::MissingKit);
                }
            }
            spec => {
                if spec.dimensions().is_none() {
                    return Err(GateFailure::MissingDimensions);
                }
            }
        },
        Step::Model => {
            if line.offers_models() && state.model.is_none() {
                return Err(GateFailure::MissingModel);
            }
        }
        Step::Color => {
            if line.offers_colors() && state.color.is_none() {
                if !state.uses_ral() {
                    return Err(GateFailure::MissingColor);
                }
                if state.ral_code.trim().is_empty() {
                    return Err(GateFailure::MissingRalCode);
                }
            }
        }
        Step::Extras => {
            if state.uses_bitono()
                && state.bitono_color.is_none()
                && state.bitono_ral_code.trim().is_empty()
            {
                return Err(GateFailure::MissingBitonoColor);
            }
        }
        Step::Summary => {}
    }

    Ok(())
}

/// Runs every configuration gate in order, returning the first failure.
pub fn validate_all(
    state: &QuoteState,
    catalog: &Catalog,
) -> Result<(), GateFailure> {
    Step::CONFIGURATION
        .iter()
        .try_for_each(|step| validate_step(*step, state, catalog))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::fixtures;

    fn on_line(line: &str) -> QuoteState {
        QuoteState {
            product_line: Some(line.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn product_line_gate() {
        let catalog = fixtures::catalog();

        assert_eq!(
            validate_step(Step::ProductLine, &QuoteState::default(), &catalog),
            Err(GateFailure::NoProductLine)
        );
        assert_eq!(
            validate_step(Step::ProductLine, &on_line("CUSTOM"), &catalog),
            Err(GateFailure::CustomLine)
        );
        assert_eq!(
            validate_step(Step::ProductLine, &on_line("NOPE"), &catalog),
            Err(GateFailure::NoProductLine)
        );

        let mut zero = on_line("X");
        zero.quantity = 0;
        assert_eq!(
            validate_step(Step::ProductLine, &zero, &catalog),
            Err(GateFailure::InvalidQuantity)
        );
        assert_eq!(validate_step(Step::ProductLine, &on_line("X"), &catalog), Ok(()));
    }

    #[test]
    fn dimensions_gate_needs_both_or_a_kit() {
        let catalog = fixtures::catalog();
        let mut state = on_line("X");
        state.spec = ItemSpec::Dimensioned {
            width: Some(80),
            length: None,
            struct_frames: None,
        };
        assert_eq!(
            validate_step(Step::Dimensions, &state, &catalog),
            Err(GateFailure::MissingDimensions)
        );

        let mut kit = on_line("KITS");
        kit.spec = ItemSpec::Kit { kit: None };
        assert_eq!(
            validate_step(Step::Dimensions, &kit, &catalog),
            Err(GateFailure::MissingKit)
        );
        kit.spec = ItemSpec::Kit {
            kit: catalog.line("KITS").unwrap().kit("tapa").cloned(),
        };
        assert_eq!(validate_step(Step::Dimensions, &kit, &catalog), Ok(()));
    }

    #[test]
    fn model_and_color_gates_skip_lines_without_options() {
        let catalog = fixtures::catalog();
        let kit = on_line("KITS");

        assert_eq!(validate_step(Step::Model, &kit, &catalog), Ok(()));
        assert_eq!(validate_step(Step::Color, &kit, &catalog), Ok(()));
        assert_eq!(
            validate_step(Step::Model, &on_line("X"), &catalog),
            Err(GateFailure::MissingModel)
        );
    }

    #[test]
    fn color_gate_accepts_ral_with_code() {
        let catalog = fixtures::catalog();
        let line = catalog.line("X").unwrap();
        let mut state = on_line("X");
        assert_eq!(
            validate_step(Step::Color, &state, &catalog),
            Err(GateFailure::MissingColor)
        );

        state.extras.push(line.extra("ral").cloned().unwrap());
        assert_eq!(
            validate_step(Step::Color, &state, &catalog),
            Err(GateFailure::MissingRalCode)
        );

        state.ral_code = "RAL 7016".to_string();
        assert_eq!(validate_step(Step::Color, &state, &catalog), Ok(()));
    }

    #[test]
    fn extras_gate_requires_bitono_second_color() {
        let catalog = fixtures::catalog();
        let line = catalog.line("X").unwrap();
        let mut state = on_line("X");
        state.extras.push(line.extra("bitono").cloned().unwrap());
        assert_eq!(
            validate_step(Step::Extras, &state, &catalog),
            Err(GateFailure::MissingBitonoColor)
        );

        state.bitono_ral_code = "RAL 9005".to_string();
        assert_eq!(validate_step(Step::Extras, &state, &catalog), Ok(()));
    }
}
