//! Wizard step state machine and save markers.

use serde::{Deserialize, Serialize};

use crate::error::WizardError;

/// The steps of the onboarding wizard.
///
/// Progresses linearly and forward-only: BuildingProfile → AnsweringSecrets →
/// Done. No step is revisited or skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    BuildingProfile,
    AnsweringSecrets,
    Done,
}

impl WizardStep {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: WizardStep) -> bool {
        use WizardStep::*;
        matches!(
            (self, target),
            (BuildingProfile, AnsweringSecrets) | (AnsweringSecrets, Done)
        )
    }

    /// Whether this step is terminal (onboarding is done).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Get the next step in the linear progression, if any.
    pub fn next(&self) -> Option<WizardStep> {
        use WizardStep::*;
        match self {
            BuildingProfile => Some(AnsweringSecrets),
            AnsweringSecrets => Some(Done),
            Done => None,
        }
    }

    /// Marker saved when the user confirms this step as complete.
    pub fn completion_marker(&self) -> Option<SaveMarker> {
        match self {
            Self::BuildingProfile => Some(SaveMarker::BuilderDone),
            Self::AnsweringSecrets => Some(SaveMarker::Completed),
            Self::Done => None,
        }
    }

    /// Move the cursor to the next step. Fails at the terminal step.
    pub fn advance(&mut self) -> Result<WizardStep, WizardError> {
        let next = self.next().ok_or(WizardError::InvalidTransition {
            from: *self,
            to: *self,
        })?;
        if !self.can_transition_to(next) {
            return Err(WizardError::InvalidTransition {
                from: *self,
                to: next,
            });
        }
        *self = next;
        Ok(next)
    }
}

impl Default for WizardStep {
    fn default() -> Self {
        Self::BuildingProfile
    }
}

impl std::fmt::Display for WizardStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::BuildingProfile => "building_profile",
            Self::AnsweringSecrets => "answering_secrets",
            Self::Done => "done",
        };
        write!(f, "{s}")
    }
}

/// Why a progress save was made. Sent to the backend as the `step` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveMarker {
    /// The profile builder step was confirmed.
    BuilderDone,
    /// The whole wizard was completed.
    Completed,
    /// The user left before completing the active step.
    OnboardingIncomplete,
}

impl SaveMarker {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BuilderDone => "builder_done",
            Self::Completed => "completed",
            Self::OnboardingIncomplete => "onboarding_incomplete",
        }
    }
}

impl std::fmt::Display for SaveMarker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
