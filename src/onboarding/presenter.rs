//! Action button presenter — projects wizard state onto the host's primary
//! action button.

use crate::config::ButtonLabels;

use super::state::WizardStep;

/// Rendered state of the primary action button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonState {
    pub label: String,
    pub visible: bool,
    pub enabled: bool,
    /// Show the progress indicator.
    pub busy: bool,
}

impl ButtonState {
    pub fn hidden() -> Self {
        Self {
            label: String::new(),
            visible: false,
            enabled: false,
            busy: false,
        }
    }
}

/// Project `(step, complete, busy)` onto a button.
///
/// While busy the button stays visible but disabled, whatever the completion
/// flag. An incomplete step turns the button into an early exit.
pub fn present(
    labels: &ButtonLabels,
    step: WizardStep,
    complete: bool,
    busy: bool,
) -> ButtonState {
    if step.is_terminal() {
        return ButtonState::hidden();
    }

    let label = match (step, complete) {
        (WizardStep::Done, _) => String::new(),
        (_, false) => labels.finish_later_label.clone(),
        (WizardStep::BuildingProfile, true) => labels.continue_label.clone(),
        (WizardStep::AnsweringSecrets, true) => labels.finish_label.clone(),
    };

    if busy {
        return ButtonState {
            label,
            visible: true,
            enabled: false,
            busy: true,
        };
    }

    ButtonState {
        label,
        visible: true,
        enabled: true,
        busy: false,
    }
}
