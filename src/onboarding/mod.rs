//! Onboarding wizard — two answer-collection steps run inside a host chrome.
//!
//! The controller owns the session: it records answers, gates each step on
//! completeness, dispatches description generation, and persists progress
//! through the backend so an early exit resumes correctly later.

pub mod answers;
pub mod controller;
pub mod host;
pub mod presenter;
pub mod state;
pub mod sync;

pub use answers::{AnswerSet, AnswerStore, Category};
pub use controller::{ActionOutcome, SettleOutcome, WizardController, WizardEvent};
pub use host::{HostChrome, Popup};
pub use presenter::{ButtonState, present};
pub use state::{SaveMarker, WizardStep};
pub use sync::{GeneratedDescription, HttpProgressSync, IdentityToken, ProgressSync};
