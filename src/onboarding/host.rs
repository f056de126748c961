//! Host chrome capability interface.
//!
//! The wizard runs inside a container app that owns the page lifecycle, a
//! single primary action button and the user's identity token. The
//! controller only talks to it through this trait; event subscription is
//! inverted into [`WizardEvent`](super::controller::WizardEvent) values.

use super::presenter::ButtonState;
use super::sync::IdentityToken;

/// A titled popup shown by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Popup {
    pub title: String,
    pub message: String,
}

/// Capabilities the host chrome provides to the wizard.
///
/// All calls are non-blocking UI operations.
pub trait HostChrome: Send + Sync {
    /// Identity token issued by the host, if any.
    fn identity_token(&self) -> Option<IdentityToken>;

    /// Render the primary action button.
    fn set_primary_action(&self, state: &ButtonState);

    fn show_alert(&self, text: &str);

    fn show_popup(&self, popup: &Popup);

    /// Close the wizard.
    fn end_session(&self);
}
