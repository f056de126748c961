//! Configuration types.

use std::time::Duration;

use crate::onboarding::host::Popup;

/// Primary action button labels.
#[derive(Debug, Clone)]
pub struct ButtonLabels {
    /// Profile step complete: move on to the secrets step.
    pub continue_label: String,
    /// Secrets step complete: finish onboarding.
    pub finish_label: String,
    /// Active step incomplete: the button ends the session early.
    pub finish_later_label: String,
}

impl Default for ButtonLabels {
    fn default() -> Self {
        Self {
            continue_label: "Continue".to_string(),
            finish_label: "Finish".to_string(),
            finish_later_label: "Finish later".to_string(),
        }
    }
}

/// Wizard controller configuration (user-facing text).
#[derive(Debug, Clone)]
pub struct WizardConfig {
    pub labels: ButtonLabels,
    /// Alert shown when an awaited save fails.
    pub failure_notice: String,
    /// Alert shown when the host provides no identity token.
    pub unauthenticated_notice: String,
    /// Popup shown after entering the secrets step, if any.
    pub secrets_intro: Option<Popup>,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            labels: ButtonLabels::default(),
            failure_notice: "Something went wrong while saving. Please try again.".to_string(),
            unauthenticated_notice: "Please reopen the app from the chat to continue."
                .to_string(),
            secrets_intro: Some(Popup {
                title: "Your profile is ready".to_string(),
                message: "Now a few secret questions. Only your matches will see them."
                    .to_string(),
            }),
        }
    }
}

/// Backend client configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Base URL of the backend, without the `/api` prefix.
    pub base_url: String,
    /// Per-request transport timeout.
    pub request_timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            request_timeout: Duration::from_secs(15),
        }
    }
}

impl SyncConfig {
    /// Build from `BOLINGO_API_BASE_URL` and `BOLINGO_REQUEST_TIMEOUT_SECS`,
    /// falling back to defaults for anything missing or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let base_url = std::env::var("BOLINGO_API_BASE_URL")
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or(defaults.base_url);

        let request_timeout = std::env::var("BOLINGO_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout);

        Self {
            base_url,
            request_timeout,
        }
    }
}
